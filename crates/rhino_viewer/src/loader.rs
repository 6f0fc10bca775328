//! Background mesh loading.
//!
//! Each view gets one worker thread that fetches, parses and prepares its
//! mesh, then reports back over a channel the event loop polls every frame.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use rhino_core::{MeshFetcher, MeshSource};
use rhino_viewport::{PrepareOptions, PreparedMesh};

/// Outcome of one view's load, keyed by view index.
pub type LoadResult = (usize, Result<PreparedMesh, String>);

/// One mesh to load into one view.
#[derive(Clone, Debug)]
pub struct LoadJob {
    pub view: usize,
    pub source: MeshSource,
    pub options: PrepareOptions,
}

/// Receiving end of the worker channel.
pub struct Loads {
    rx: Receiver<LoadResult>,
    pending: usize,
}

impl Loads {
    /// Start one worker per job.
    pub fn spawn(fetcher: &MeshFetcher, jobs: Vec<LoadJob>) -> Self {
        let (tx, rx) = mpsc::channel();
        let pending = jobs.len();

        for job in jobs {
            let tx = tx.clone();
            let fetcher = fetcher.clone();
            thread::spawn(move || {
                let result = run(&fetcher, &job);
                // Receiver is gone once the window closed
                let _ = tx.send((job.view, result));
            });
        }

        Self { rx, pending }
    }

    /// Results that arrived since the last poll.
    pub fn poll(&mut self) -> Vec<LoadResult> {
        let mut done = Vec::new();
        while self.pending > 0 {
            match self.rx.try_recv() {
                Ok(result) => {
                    self.pending -= 1;
                    done.push(result);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::error!("{} mesh load(s) ended without a result", self.pending);
                    self.pending = 0;
                }
            }
        }
        done
    }

    pub fn is_finished(&self) -> bool {
        self.pending == 0
    }
}

fn run(fetcher: &MeshFetcher, job: &LoadJob) -> Result<PreparedMesh, String> {
    log::info!("Loading view {} from {}", job.view, job.source.label());
    let mesh = fetcher.load(&job.source).map_err(|e| e.to_string())?;
    Ok(PreparedMesh::prepare(mesh, &job.options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_all(loads: &mut Loads) -> Vec<LoadResult> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut results = Vec::new();
        while !loads.is_finished() && Instant::now() < deadline {
            results.extend(loads.poll());
            thread::sleep(Duration::from_millis(5));
        }
        results.sort_by_key(|(view, _)| *view);
        results
    }

    #[test]
    fn test_local_loads_report_per_view() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("face_obj.obj");
        std::fs::write(&good, "v 0 0 0 1 0 0\nv 1 0 0 0 1 0\nv 0 1 0 0 0 1\nf 1 2 3\n").unwrap();

        let jobs = vec![
            LoadJob {
                view: 0,
                source: MeshSource::Local(good),
                options: PrepareOptions::default(),
            },
            LoadJob {
                view: 1,
                source: MeshSource::Local(dir.path().join("missing.obj")),
                options: PrepareOptions::default(),
            },
        ];

        let mut loads = Loads::spawn(&MeshFetcher::default(), jobs);
        let results = wait_all(&mut loads);

        assert_eq!(results.len(), 2);
        let prepared = results[0].1.as_ref().unwrap();
        assert_eq!(prepared.vertex_count, 3);
        assert!(prepared.has_colors);
        assert!(results[1].1.is_err());
    }

    #[test]
    fn test_no_jobs_is_finished() {
        let mut loads = Loads::spawn(&MeshFetcher::default(), Vec::new());
        assert!(loads.is_finished());
        assert!(loads.poll().is_empty());
    }
}
