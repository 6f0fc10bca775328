//! GPU viewport for reconstruction results.
//!
//! One [`Renderer`] owns the wgpu surface and egui. It draws every view of
//! a [`Page`] into its own pane, then the egui overlay on top.

use std::sync::Arc;

use anyhow::Result;
use wgpu::{util::DeviceExt, Device, Instance, Queue, Surface, SurfaceConfiguration};

use rhino_math::{Camera, Mat4, Vec3};

pub mod geometry;
pub mod markers;
pub mod panels;
pub mod view;

pub use markers::{MarkerInstance, MarkerSet};
pub use view::{Page, PageKind, PaneRect, PrepareOptions, PreparedMesh, View, ViewStatus};

use geometry::{uv_sphere, MarkerVertex};

/// Surface color for vertices the mesh file gives no color for
const DEFAULT_VERTEX_COLOR: [f32; 3] = [0.75, 0.75, 0.75];

/// Segments and rings of the shared marker sphere
const SPHERE_SEGMENTS: u32 = 16;

/// GPU-ready triangle mesh.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Interleave positions, normals and colors of a core mesh.
    pub fn from_core_mesh(mesh: &rhino_core::Mesh) -> Self {
        let vertices = mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, pos)| {
                let normal = mesh
                    .normals
                    .as_ref()
                    .and_then(|n| n.get(i))
                    .copied()
                    .unwrap_or(Vec3::Z);
                let color = mesh
                    .colors
                    .as_ref()
                    .and_then(|c| c.get(i))
                    .copied()
                    .unwrap_or(DEFAULT_VERTEX_COLOR);
                Vertex {
                    position: pos.to_array(),
                    normal: normal.to_array(),
                    color,
                }
            })
            .collect();

        Self {
            vertices,
            indices: mesh.indices.clone(),
        }
    }
}

/// Per-view uniform data for both pipelines
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    camera_pos: [f32; 4],
}

impl SceneUniform {
    fn new(camera: &Camera, model: Mat4) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
        }
    }
}

/// Vertex data for rendering
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
}

/// GPU resources of one view.
struct ViewGpu {
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    mesh: Option<MeshBuffers>,
    marker_buffer: wgpu::Buffer,
    marker_capacity: usize,
    markers: MarkerSet,
}

impl ViewGpu {
    const INITIAL_MARKERS: usize = 32;

    fn new(device: &Device, layout: &wgpu::BindGroupLayout) -> Self {
        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Buffer"),
            size: std::mem::size_of::<SceneUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        Self {
            scene_buffer,
            scene_bind_group,
            mesh: None,
            marker_buffer: Self::marker_buffer(device, Self::INITIAL_MARKERS),
            marker_capacity: Self::INITIAL_MARKERS,
            markers: MarkerSet::default(),
        }
    }

    fn marker_buffer(device: &Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Marker Instance Buffer"),
            size: (capacity * std::mem::size_of::<MarkerInstance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn upload_mesh(&mut self, device: &Device, data: &MeshData) {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        self.mesh = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
            num_indices: data.indices.len() as u32,
        });
    }

    /// Write this frame's uniforms and markers.
    fn write(&mut self, device: &Device, queue: &Queue, view: &View) {
        let model = view.prepared().map_or(Mat4::IDENTITY, |p| p.model);
        queue.write_buffer(
            &self.scene_buffer,
            0,
            bytemuck::cast_slice(&[SceneUniform::new(&view.camera, model)]),
        );

        self.markers = view.markers();
        if self.markers.instances.len() > self.marker_capacity {
            self.marker_capacity = self.markers.instances.len().next_power_of_two();
            self.marker_buffer = Self::marker_buffer(device, self.marker_capacity);
        }
        if !self.markers.is_empty() {
            queue.write_buffer(
                &self.marker_buffer,
                0,
                bytemuck::cast_slice(&self.markers.instances),
            );
        }
    }
}

/// Pixel rectangle of a pane, clipped to the surface.
fn pane_pixels(rect: PaneRect, pixels_per_point: f32, surface: (u32, u32)) -> Option<[u32; 4]> {
    let x0 = (rect.x * pixels_per_point).round().max(0.0) as u32;
    let y0 = (rect.y * pixels_per_point).round().max(0.0) as u32;
    let x1 = (((rect.x + rect.width) * pixels_per_point).round().max(0.0) as u32).min(surface.0);
    let y1 = (((rect.y + rect.height) * pixels_per_point).round().max(0.0) as u32).min(surface.1);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some([x0, y0, x1 - x0, y1 - y0])
}

/// Core renderer managing wgpu state
pub struct Renderer {
    pub surface: Surface<'static>,
    pub device: Device,
    pub queue: Queue,
    pub config: SurfaceConfiguration,
    pub size: (u32, u32),
    mesh_pipeline: wgpu::RenderPipeline,
    marker_pipeline: wgpu::RenderPipeline,
    highlight_pipeline: wgpu::RenderPipeline,
    sphere_vertex_buffer: wgpu::Buffer,
    sphere_index_buffer: wgpu::Buffer,
    sphere_num_indices: u32,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    views: Vec<ViewGpu>,
    pub page: Page,

    // egui state
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    /// Create a depth texture for the given size
    fn create_depth_texture(device: &Device, size: (u32, u32)) -> (wgpu::Texture, wgpu::TextureView) {
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth24Plus,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        (depth_texture, depth_view)
    }

    fn create_pipeline(
        device: &Device,
        label: &str,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        buffers: &[wgpu::VertexBufferLayout],
        format: wgpu::TextureFormat,
        translucent: bool,
    ) -> wgpu::RenderPipeline {
        let blend = if translucent {
            wgpu::BlendState::ALPHA_BLENDING
        } else {
            wgpu::BlendState::REPLACE
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: "vs_main",
                buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Scans are open surfaces, both sides are visible
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth24Plus,
                depth_write_enabled: !translucent,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    /// Create a new renderer for the given window and page
    pub async fn new(window: Arc<winit::window::Window>, page: Page) -> Result<Self> {
        let size = window.inner_size();

        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Rhino Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no texture formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let scene_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&scene_bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });
        let marker_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Marker Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/marker.wgsl").into()),
        });

        let mesh_pipeline = Self::create_pipeline(
            &device,
            "Mesh Pipeline",
            &pipeline_layout,
            &mesh_shader,
            &[Vertex::desc()],
            config.format,
            false,
        );
        let marker_pipeline = Self::create_pipeline(
            &device,
            "Marker Pipeline",
            &pipeline_layout,
            &marker_shader,
            &[MarkerVertex::desc(), MarkerInstance::desc()],
            config.format,
            false,
        );
        let highlight_pipeline = Self::create_pipeline(
            &device,
            "Highlight Pipeline",
            &pipeline_layout,
            &marker_shader,
            &[MarkerVertex::desc(), MarkerInstance::desc()],
            config.format,
            true,
        );

        let (sphere_vertices, sphere_indices) = uv_sphere(SPHERE_SEGMENTS, SPHERE_SEGMENTS);
        let sphere_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Vertex Buffer"),
            contents: bytemuck::cast_slice(&sphere_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sphere_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Index Buffer"),
            contents: bytemuck::cast_slice(&sphere_indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let (depth_texture, depth_view) = Self::create_depth_texture(&device, (config.width, config.height));

        let views = page
            .views
            .iter()
            .map(|_| ViewGpu::new(&device, &scene_bind_group_layout))
            .collect();

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1, false);

        log::info!(
            "Renderer ready: {}x{} {:?}, {} view(s)",
            config.width,
            config.height,
            config.format,
            page.views.len()
        );

        Ok(Self {
            surface,
            device,
            queue,
            size: (config.width, config.height),
            config,
            mesh_pipeline,
            marker_pipeline,
            highlight_pipeline,
            sphere_vertex_buffer,
            sphere_index_buffer,
            sphere_num_indices: sphere_indices.len() as u32,
            depth_texture,
            depth_view,
            views,
            page,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    /// Hand a finished load to its view.
    pub fn set_view_result(&mut self, index: usize, result: Result<PreparedMesh, String>) {
        let (Some(view), Some(gpu)) = (self.page.views.get_mut(index), self.views.get_mut(index)) else {
            log::warn!("Load result for unknown view {}", index);
            return;
        };

        match result {
            Ok(prepared) => {
                log::info!(
                    "{}: {} vertices, {} triangles, colors: {}",
                    view.label,
                    prepared.vertex_count,
                    prepared.triangle_count,
                    prepared.has_colors
                );
                gpu.upload_mesh(&self.device, &prepared.data);
                view.status = ViewStatus::Ready(Box::new(prepared));
            }
            Err(message) => {
                log::error!("{}: {}", view.label, message);
                view.status = ViewStatus::Failed(message);
            }
        }
    }

    /// Advance camera damping. True while any view is still moving.
    pub fn update(&mut self) -> bool {
        self.page.update_controls()
    }

    /// Convert a physical pointer position to egui points.
    pub fn to_points(&self, physical: (f64, f64)) -> (f32, f32) {
        let ppp = self.egui_ctx.pixels_per_point();
        (physical.0 as f32 / ppp, physical.1 as f32 / ppp)
    }

    /// Index of the view under a physical pointer position.
    pub fn view_at(&self, physical: (f64, f64)) -> Option<usize> {
        let (x, y) = self.to_points(physical);
        self.page.view_at(x, y)
    }

    /// Orbit a view by a physical pointer delta.
    pub fn drag(&mut self, index: usize, delta: (f64, f64)) {
        let (dx, dy) = self.to_points(delta);
        if let Some(view) = self.page.views.get_mut(index) {
            view.drag(dx, dy);
        }
    }

    pub fn scroll(&mut self, index: usize, delta: f32) {
        if let Some(view) = self.page.views.get_mut(index) {
            view.scroll(delta);
        }
    }

    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 > 0 && new_size.1 > 0 {
            self.size = new_size;
            self.config.width = new_size.0;
            self.config.height = new_size.1;
            self.surface.configure(&self.device, &self.config);

            let (depth_texture, depth_view) = Self::create_depth_texture(&self.device, new_size);
            self.depth_texture = depth_texture;
            self.depth_view = depth_view;
        }
    }

    /// Handle egui window event - returns true if event was consumed by egui
    pub fn handle_egui_event(&mut self, window: &winit::window::Window, event: &winit::event::WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        response.consumed
    }

    /// Render a frame with the given clear color
    pub fn render(&mut self, clear_color: wgpu::Color, window: &winit::window::Window) -> Result<()> {
        let output = self.surface.get_current_texture()?;
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // egui runs first: it lays out the panes the 3D passes draw into
        let raw_input = self.egui_state.take_egui_input(window);
        let page = &mut self.page;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            panels::draw_page(ctx, page);
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let pixels_per_point = full_output.pixels_per_point;
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.size.0, self.size.1],
            pixels_per_point,
        };

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, pixels_per_point);

        for (gpu, view) in self.views.iter_mut().zip(&self.page.views) {
            gpu.write(&self.device, &self.queue, view);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        // All panes in one pass, each clipped to its own viewport
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (gpu, view) in self.views.iter().zip(&self.page.views) {
                let Some(rect) = view.rect else { continue };
                let Some([x, y, w, h]) = pane_pixels(rect, pixels_per_point, self.size) else {
                    continue;
                };

                render_pass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
                render_pass.set_scissor_rect(x, y, w, h);
                render_pass.set_bind_group(0, &gpu.scene_bind_group, &[]);

                if let Some(mesh) = &gpu.mesh {
                    render_pass.set_pipeline(&self.mesh_pipeline);
                    render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..mesh.num_indices, 0, 0..1);
                }

                if gpu.markers.is_empty() {
                    continue;
                }
                render_pass.set_vertex_buffer(0, self.sphere_vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, gpu.marker_buffer.slice(..));
                render_pass.set_index_buffer(self.sphere_index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                // Opaque spheres before the translucent highlight
                if !gpu.markers.opaque.is_empty() {
                    render_pass.set_pipeline(&self.marker_pipeline);
                    render_pass.draw_indexed(0..self.sphere_num_indices, 0, gpu.markers.opaque.clone());
                }
                if !gpu.markers.translucent.is_empty() {
                    render_pass.set_pipeline(&self.highlight_pipeline);
                    render_pass.draw_indexed(0..self.sphere_num_indices, 0, gpu.markers.translucent.clone());
                }
            }
        }

        // Render egui on top
        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            self.egui_renderer
                .render(&mut egui_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
