//! wgpu graphics context
//!
//! One device drives two windows: the overlay window, drawn by the render
//! loop through [`DisplaySurface`], and the optional camera preview window
//! showing annotated detector frames.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::{Window, WindowId};

use crate::camera::CameraFrame;
use crate::overlay::{OverlayPose, LABEL_COLOR, QUAD_COLOR, QUAD_INDICES, QUAD_VERTICES};
use crate::render::DisplaySurface;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const LABEL_FONT_SIZE: f32 = 18.0;

/// Per-draw overlay uniforms
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct OverlayUniforms {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
}

/// Graphics setup and presentation failures
#[derive(Debug, thiserror::Error)]
pub enum GraphicsError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface has no supported formats on this adapter")]
    UnsupportedSurface,
    #[error("surface error: {0}")]
    Surface(wgpu::SurfaceError),
}

/// A window and its configured swap chain
struct WindowSurface {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl WindowSurface {
    fn configure(
        surface: wgpu::Surface<'static>,
        window: Arc<Window>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
    ) -> Result<Self, GraphicsError> {
        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(adapter);

        // egui-wgpu expects a non-sRGB target
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GraphicsError::UnsupportedSurface)?;

        let present_mode = if surface_caps
            .present_modes
            .contains(&wgpu::PresentMode::Mailbox)
        {
            wgpu::PresentMode::Mailbox
        } else {
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(device, &config);

        log::info!(
            "Surface for '{}': {:?}, {:?}, {}x{}",
            window.title(),
            surface_format,
            present_mode,
            config.width,
            config.height
        );

        Ok(Self {
            window,
            surface,
            config,
        })
    }

    fn resize(&mut self, device: &wgpu::Device, new_size: PhysicalSize<u32>) -> bool {
        if new_size.width == 0 || new_size.height == 0 {
            return false;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(device, &self.config);
        true
    }

    /// Next swap chain texture. `None` skips this frame after a recoverable
    /// surface error.
    fn acquire(&mut self, device: &wgpu::Device) -> Result<Option<wgpu::SurfaceTexture>, GraphicsError> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring...");
                self.surface.configure(device, &self.config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory!");
                Err(GraphicsError::Surface(wgpu::SurfaceError::OutOfMemory))
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
                Ok(None)
            }
        }
    }

    fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }
}

/// Overlay window resources
struct OverlayTarget {
    surface: WindowSurface,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

/// Preview window resources
struct PreviewTarget {
    surface: WindowSurface,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    frame_texture: Option<(wgpu::Texture, wgpu::BindGroup)>,
}

/// GPU context owning both windows' surfaces
pub struct Graphics {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    overlay: OverlayTarget,
    preview: Option<PreviewTarget>,
    label_text: String,
    /// Overlay requested for the frame being built
    pending: Option<OverlayPose>,
}

impl Graphics {
    /// Create the device and set up the overlay window
    pub async fn new(window: Arc<Window>, label_text: String) -> Result<Self, GraphicsError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
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
            .ok_or(GraphicsError::NoAdapter)?;

        log::info!("Using GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Marker Overlay Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let surface = WindowSurface::configure(surface, window, &adapter, &device)?;
        let overlay = Self::create_overlay_target(&device, surface);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            overlay,
            preview: None,
            label_text,
            pending: None,
        })
    }

    fn create_overlay_target(device: &wgpu::Device, surface: WindowSurface) -> OverlayTarget {
        let format = surface.config.format;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/overlay.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Overlay Bind Group Layout"),
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

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Overlay Uniforms"),
            size: std::mem::size_of::<OverlayUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Both faces show while the quad spins
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let depth_view = create_depth_view(device, &surface.config);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &surface.window,
            Some(surface.window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, format, None, 1, false);

        OverlayTarget {
            surface,
            depth_view,
            pipeline,
            uniform_buffer,
            bind_group,
            vertex_buffer,
            index_buffer,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    /// Set up the camera preview window on the shared device
    pub fn attach_preview(&mut self, window: Arc<Window>) -> Result<(), GraphicsError> {
        let surface = self.instance.create_surface(window.clone())?;
        let surface = WindowSurface::configure(surface, window, &self.adapter, &self.device)?;
        let format = surface.config.format;

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Passthrough Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/passthrough.wgsl").into()),
        });

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Passthrough Bind Group Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Passthrough Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Passthrough Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Preview Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        self.preview = Some(PreviewTarget {
            surface,
            pipeline,
            bind_group_layout,
            sampler,
            frame_texture: None,
        });
        Ok(())
    }

    /// Drop the preview surface. The caller may drop the window afterwards.
    pub fn detach_preview(&mut self) {
        if self.preview.take().is_some() {
            log::info!("Preview surface released");
        }
    }

    pub fn overlay_window(&self) -> &Arc<Window> {
        &self.overlay.surface.window
    }

    pub fn preview_window(&self) -> Option<&Arc<Window>> {
        self.preview.as_ref().map(|p| &p.surface.window)
    }

    /// Feed an overlay window event to egui, returning true if consumed
    pub fn handle_overlay_event(&mut self, event: &WindowEvent) -> bool {
        self.overlay
            .egui_state
            .on_window_event(&self.overlay.surface.window, event)
            .consumed
    }

    /// Reconfigure whichever surface belongs to `window_id`
    pub fn resize(&mut self, window_id: WindowId, new_size: PhysicalSize<u32>) {
        if window_id == self.overlay.surface.window.id() {
            if self.overlay.surface.resize(&self.device, new_size) {
                self.overlay.depth_view = create_depth_view(&self.device, &self.overlay.surface.config);
            }
        } else if let Some(preview) = self.preview.as_mut() {
            if window_id == preview.surface.window.id() {
                preview.surface.resize(&self.device, new_size);
            }
        }
    }

    /// Upload an annotated frame for the preview window
    pub fn upload_preview_frame(&mut self, frame: &CameraFrame) {
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        if !frame.is_well_formed() {
            log::warn!("Skipping malformed preview frame {:?}", frame);
            return;
        }

        let needs_new_texture = match &preview.frame_texture {
            None => true,
            Some((texture, _)) => {
                let size = texture.size();
                size.width != frame.width || size.height != frame.height
            }
        };

        if needs_new_texture {
            log::info!("Creating preview texture: {}x{}", frame.width, frame.height);

            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Preview Texture"),
                size: wgpu::Extent3d {
                    width: frame.width,
                    height: frame.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Preview Bind Group"),
                layout: &preview.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&preview.sampler),
                    },
                ],
            });

            preview.frame_texture = Some((texture, bind_group));
        }

        if let Some((texture, _)) = &preview.frame_texture {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &frame.data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(frame.width * 4),
                    rows_per_image: Some(frame.height),
                },
                wgpu::Extent3d {
                    width: frame.width,
                    height: frame.height,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    /// Draw the latest uploaded frame into the preview window
    pub fn render_preview(&mut self) -> Result<(), GraphicsError> {
        let Some(preview) = self.preview.as_mut() else {
            return Ok(());
        };
        let Some(output) = preview.surface.acquire(&self.device)? else {
            return Ok(());
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Preview Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Preview Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some((_, bind_group)) = &preview.frame_texture {
                render_pass.set_pipeline(&preview.pipeline);
                render_pass.set_bind_group(0, bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn draw_quad(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let overlay = &self.overlay;

        if let Some(pose) = &self.pending {
            let uniforms = OverlayUniforms {
                mvp: pose.mvp(overlay.surface.aspect()).to_cols_array_2d(),
                color: [QUAD_COLOR[0], QUAD_COLOR[1], QUAD_COLOR[2], 1.0],
            };
            self.queue
                .write_buffer(&overlay.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &overlay.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if self.pending.is_some() {
            render_pass.set_pipeline(&overlay.pipeline);
            render_pass.set_bind_group(0, &overlay.bind_group, &[]);
            render_pass.set_vertex_buffer(0, overlay.vertex_buffer.slice(..));
            render_pass.set_index_buffer(overlay.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        }
    }

    /// Label text at the projected anchor, drawn with egui on top of the quad
    fn draw_label(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let overlay = &mut self.overlay;
        let window = overlay.surface.window.clone();
        let (width, height) = (overlay.surface.config.width, overlay.surface.config.height);

        let anchor = self
            .pending
            .as_ref()
            .and_then(|pose| pose.label_screen_position(width as f32, height as f32));
        let label_text = &self.label_text;

        let raw_input = overlay.egui_state.take_egui_input(&window);
        let full_output = overlay.egui_ctx.run(raw_input, |ctx| {
            let Some((x, y)) = anchor else {
                return;
            };
            let ppp = ctx.pixels_per_point();
            let [r, g, b] = LABEL_COLOR;
            ctx.layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("overlay_label"),
            ))
            .text(
                egui::pos2(x / ppp, y / ppp),
                egui::Align2::LEFT_BOTTOM,
                label_text,
                egui::FontId::proportional(LABEL_FONT_SIZE),
                egui::Color32::from_rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8),
            );
        });

        overlay
            .egui_state
            .handle_platform_output(&window, full_output.platform_output);

        let paint_jobs = overlay
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            overlay
                .egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: full_output.pixels_per_point,
        };

        overlay.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Label Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
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

            overlay
                .egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            overlay.egui_renderer.free_texture(id);
        }
    }
}

impl DisplaySurface for Graphics {
    type Error = GraphicsError;

    fn clear(&mut self) {
        self.pending = None;
    }

    fn draw_overlay(&mut self, pose: &OverlayPose) {
        self.pending = Some(*pose);
    }

    fn present(&mut self) -> Result<(), GraphicsError> {
        let Some(output) = self.overlay.surface.acquire(&self.device)? else {
            return Ok(());
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Overlay Encoder"),
        });

        self.draw_quad(&mut encoder, &view);
        self.draw_label(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Overlay Depth"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
