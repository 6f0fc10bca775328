//! Score totals and pre/post comparison rows.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::resolve::ResolvedFeature;

/// Highest achievable total across the built-in feature table.
pub const MAX_TOTAL: f32 = 48.0;

/// Sum of all feature scores.
pub fn total_score(features: &[ResolvedFeature]) -> f32 {
    features.iter().map(|f| f.score).sum()
}

/// Total formatted for the score panel, e.g. `"10.0 / 48"`.
pub fn format_total(total: f32) -> String {
    format!("{:.1} / {}", total, MAX_TOTAL)
}

/// Stored pre/post scores, both indexed like the feature table.
///
/// Entries that are not numbers become `None` without affecting the rest
/// of the array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonScores {
    #[serde(default, deserialize_with = "score_slots")]
    pub pre: Vec<Option<f32>>,
    #[serde(default, deserialize_with = "score_slots")]
    pub post: Vec<Option<f32>>,
}

/// One stored score entry; `null` or any non-number reads as missing.
pub(crate) fn score_slot(value: &Value) -> Option<f32> {
    value.as_f64().map(|score| score as f32)
}

fn score_slots<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Option<f32>>, D::Error> {
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.iter().map(score_slot).collect())
}

/// Direction of change for one feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Improved,
    Regressed,
    Unchanged,
}

impl Trend {
    fn of(delta: f32) -> Self {
        if delta > 0.0 {
            Trend::Improved
        } else if delta < 0.0 {
            Trend::Regressed
        } else {
            Trend::Unchanged
        }
    }
}

/// One line of the comparison panel.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonRow {
    pub name: String,
    pub pre: f32,
    pub post: f32,
    pub delta: f32,
    pub trend: Trend,
}

impl ComparisonRow {
    /// `"10 → 12 (+2)"`
    pub fn text(&self) -> String {
        let sign = if self.delta >= 0.0 { "+" } else { "" };
        format!("{} → {} ({}{})", self.pre, self.post, sign, self.delta)
    }
}

/// Pair each feature with the stored scores at the same position.
///
/// Alignment is by index, not by name. Missing or `null` entries read as 0.
pub fn compare(features: &[ResolvedFeature], scores: &ComparisonScores) -> Vec<ComparisonRow> {
    features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let pre = scores.pre.get(i).copied().flatten().unwrap_or(0.0);
            let post = scores.post.get(i).copied().flatten().unwrap_or(0.0);
            let delta = post - pre;
            ComparisonRow {
                name: feature.name.clone(),
                pre,
                post,
                delta,
                trend: Trend::of(delta),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhino_math::Vec3;

    fn features(scores: &[f32]) -> Vec<ResolvedFeature> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ResolvedFeature {
                name: format!("F{}", i),
                center: Vec3::ZERO,
                score,
                radius: 0.15,
                scale: Vec3::ONE,
            })
            .collect()
    }

    #[test]
    fn test_total_of_partial_scores() {
        let mut scores = vec![1.0, 2.0, 3.0, 4.0];
        scores.extend([0.0; 8]);
        let total = total_score(&features(&scores));

        assert_eq!(total, 10.0);
        assert_eq!(format_total(total), "10.0 / 48");
    }

    #[test]
    fn test_comparison_rows() {
        let scores = ComparisonScores {
            pre: vec![Some(10.0), Some(20.0)],
            post: vec![Some(12.0), Some(18.0)],
        };
        let rows = compare(&features(&[0.0, 0.0]), &scores);

        assert_eq!(rows[0].text(), "10 → 12 (+2)");
        assert_eq!(rows[0].trend, Trend::Improved);
        assert_eq!(rows[1].text(), "20 → 18 (-2)");
        assert_eq!(rows[1].trend, Trend::Regressed);
    }

    #[test]
    fn test_missing_scores_read_as_zero() {
        let scores = ComparisonScores {
            pre: vec![Some(2.5)],
            post: vec![],
        };
        let rows = compare(&features(&[1.0, 1.0]), &scores);

        assert_eq!(rows[0].text(), "2.5 → 0 (-2.5)");
        assert_eq!(rows[1].text(), "0 → 0 (+0)");
        assert_eq!(rows[1].trend, Trend::Unchanged);
    }

    #[test]
    fn test_comparison_scores_json_defaults() {
        let scores: ComparisonScores = serde_json::from_str(r#"{"pre": [1, 2]}"#).unwrap();
        assert_eq!(scores.pre, vec![Some(1.0), Some(2.0)]);
        assert!(scores.post.is_empty());
    }

    #[test]
    fn test_null_entry_reads_as_zero_alone() {
        let scores: ComparisonScores =
            serde_json::from_str(r#"{"pre": [4, null, 2], "post": [5, 3, "x"]}"#).unwrap();
        assert_eq!(scores.pre, vec![Some(4.0), None, Some(2.0)]);

        let rows = compare(&features(&[1.0, 1.0, 1.0]), &scores);
        assert_eq!(rows[0].text(), "4 → 5 (+1)");
        assert_eq!(rows[1].text(), "0 → 3 (+3)");
        assert_eq!(rows[2].text(), "2 → 0 (-2)");
    }
}
