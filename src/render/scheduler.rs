//! GPU frame scheduler.
//!
//! Owns the device, both simulation grids, the caustics textures, every
//! uniform buffer and bind group, and the presentation target. Each call to
//! [`FrameBackend::execute`] uploads the frame's parameter blocks and records
//! the plan's stages into one command encoder, submitted as a unit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::config::{SimulationConstants, WaterConfig};
use crate::error::EngineError;
use crate::export::image_export;
use crate::mesh::{LightWaveMesh, FULLSCREEN_QUAD};
use crate::params::{BlurParams, CausticsParams, CopyParams, FrameParams, RenderParams, WaveUpdateParams};
use crate::render::backend::FrameBackend;
use crate::render::graph::{FramePlan, Stage};
use crate::render::kernels::{Kernels, CAUSTICS_FORMAT};
use crate::render::overlay::{Overlay, OverlayFrame};
use crate::render::surface::{fit_to_max_dimension, SurfaceSize};

/// Bytes per grid cell (four `f32` channels).
const CELL_BYTES: u64 = 16;

/// Format of the offscreen target used by headless rendering.
pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

enum Target {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        configured: bool,
    },
    Offscreen {
        texture: wgpu::Texture,
        size: SurfaceSize,
    },
}

impl Target {
    fn size(&self) -> SurfaceSize {
        match self {
            Target::Surface {
                config, configured, ..
            } => {
                if *configured {
                    SurfaceSize::new(config.width, config.height)
                } else {
                    SurfaceSize::new(0, 0)
                }
            }
            Target::Offscreen { size, .. } => *size,
        }
    }

    /// Whether frames drawn into this target can be copied out.
    fn can_capture(&self) -> bool {
        match self {
            Target::Surface { config, .. } => supports_capture(config.usage),
            Target::Offscreen { .. } => true,
        }
    }
}

/// Screenshots copy the frame texture, which needs `COPY_SRC`.
fn supports_capture(usage: wgpu::TextureUsages) -> bool {
    usage.contains(wgpu::TextureUsages::COPY_SRC)
}

/// The texture a frame is drawn into.
enum Frame<'a> {
    Surface(wgpu::SurfaceTexture),
    Offscreen(&'a wgpu::Texture),
}

impl Frame<'_> {
    fn texture(&self) -> &wgpu::Texture {
        match self {
            Frame::Surface(frame) => &frame.texture,
            Frame::Offscreen(texture) => texture,
        }
    }

    fn present(self) {
        if let Frame::Surface(frame) = self {
            frame.present();
        }
    }
}

struct UniformBuffers {
    render: wgpu::Buffer,
    wave: wgpu::Buffer,
    copy: wgpu::Buffer,
    caustics: wgpu::Buffer,
    blur_horizontal: wgpu::Buffer,
    blur_vertical: wgpu::Buffer,
}

impl UniformBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let create = |label: &str, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            render: create("Render Params", std::mem::size_of::<RenderParams>()),
            wave: create("Wave Update Params", std::mem::size_of::<WaveUpdateParams>()),
            copy: create("State Copy Params", std::mem::size_of::<CopyParams>()),
            caustics: create("Caustics Params", std::mem::size_of::<CausticsParams>()),
            blur_horizontal: create("Blur Params (horizontal)", std::mem::size_of::<BlurParams>()),
            blur_vertical: create("Blur Params (vertical)", std::mem::size_of::<BlurParams>()),
        }
    }
}

struct BindGroups {
    wave: wgpu::BindGroup,
    copy: wgpu::BindGroup,
    caustics: wgpu::BindGroup,
    blur_horizontal: wgpu::BindGroup,
    blur_vertical: wgpu::BindGroup,
    render: wgpu::BindGroup,
}

/// A pending copy of the frame texture into a mappable buffer.
struct Capture {
    buffer: wgpu::Buffer,
    padded_bytes_per_row: u32,
    size: SurfaceSize,
}

/// Drop the per-row padding wgpu requires for texture-to-buffer copies.
pub fn strip_row_padding(data: &[u8], width: u32, height: u32, padded_bytes_per_row: u32) -> Vec<u8> {
    let row_bytes = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * padded_bytes_per_row as usize;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

fn floats_from_bytes(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn padded_bytes_per_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * 4).div_ceil(align) * align
}

fn is_bgra(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

/// Map a staging buffer and copy its contents out.
fn map_staging(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<u8>, EngineError> {
    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device.poll(wgpu::Maintain::Wait);

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(EngineError::Readback(e.to_string())),
        Err(_) => return Err(EngineError::Readback("map callback was dropped".to_string())),
    }

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(data)
}

fn create_offscreen_texture(device: &wgpu::Device, size: SurfaceSize) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HEADLESS_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn create_caustics_texture(device: &wgpu::Device, label: &str, size: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: CAUSTICS_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

async fn request_device(adapter: &wgpu::Adapter, label: &str) -> Result<(wgpu::Device, wgpu::Queue), EngineError> {
    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                label: Some(label),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        )
        .await
        .map_err(|e| EngineError::Capability(e.to_string()))
}

fn log_adapter(adapter: &wgpu::Adapter) {
    let info = adapter.get_info();
    log::info!("Using adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
}

/// GPU backend for the frame engine.
pub struct GpuScheduler {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: Target,
    format: wgpu::TextureFormat,
    constants: SimulationConstants,
    kernels: Kernels,
    grid_current: wgpu::Buffer,
    grid_scratch: wgpu::Buffer,
    grid_bytes: u64,
    caustics_view: wgpu::TextureView,
    quad_buffer: wgpu::Buffer,
    light_wave_buffer: wgpu::Buffer,
    light_wave_vertex_count: u32,
    uniforms: UniformBuffers,
    bind_groups: BindGroups,
    overlay: Option<Overlay>,
    screenshot_dir: PathBuf,
    screenshot_requested: bool,
    screenshot_counter: u32,
    last_screenshot: Option<PathBuf>,
}

impl GpuScheduler {
    /// Create a scheduler presenting to `window`.
    pub async fn new(window: Arc<winit::window::Window>, config: &WaterConfig) -> Result<Self, EngineError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| EngineError::Capability(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| EngineError::Capability("no compatible GPU adapter".to_string()))?;
        log_adapter(&adapter);

        let (device, queue) = request_device(&adapter, "Water Device").await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| EngineError::Capability("surface reports no formats".to_string()))?;
        let usage = if surface_caps.usages.contains(wgpu::TextureUsages::COPY_SRC) {
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC
        } else {
            wgpu::TextureUsages::RENDER_ATTACHMENT
        };
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let window_size = window.inner_size();
        let size = fit_to_max_dimension(
            SurfaceSize::new(window_size.width, window_size.height),
            device.limits().max_texture_dimension_2d,
        );
        let surface_config = wgpu::SurfaceConfiguration {
            usage,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let configured = !size.is_empty();
        if configured {
            surface.configure(&device, &surface_config);
        }
        log::info!("Surface format {:?}, {}x{}", format, size.width, size.height);

        let target = Target::Surface {
            surface,
            config: surface_config,
            configured,
        };
        Self::from_parts(device, queue, target, format, config).await
    }

    /// Create a scheduler rendering into an offscreen texture.
    pub async fn new_headless(config: &WaterConfig, width: u32, height: u32) -> Result<Self, EngineError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| EngineError::Capability("no GPU adapter".to_string()))?;
        log_adapter(&adapter);

        let (device, queue) = request_device(&adapter, "Headless Water Device").await?;

        let size = fit_to_max_dimension(
            SurfaceSize::new(width, height),
            device.limits().max_texture_dimension_2d,
        );
        let target = Target::Offscreen {
            texture: create_offscreen_texture(&device, size),
            size,
        };
        Self::from_parts(device, queue, target, HEADLESS_FORMAT, config).await
    }

    async fn from_parts(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: Target,
        format: wgpu::TextureFormat,
        config: &WaterConfig,
    ) -> Result<Self, EngineError> {
        let constants = config.simulation.clone();
        let kernels = Kernels::new(&device, format).await?;

        let resolution = constants.height_resolution as u64;
        let grid_bytes = resolution * resolution * CELL_BYTES;
        let create_grid = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: grid_bytes,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };
        // New buffers are zero-initialised
        let grid_current = create_grid("Grid (current)");
        let grid_scratch = create_grid("Grid (scratch)");

        let caustics_texture = create_caustics_texture(&device, "Caustics", constants.caustics_size);
        let caustics_scratch = create_caustics_texture(&device, "Caustics (scratch)", constants.caustics_size);
        let caustics_view = caustics_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let caustics_scratch_view = caustics_scratch.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Quad"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let light_wave = LightWaveMesh::new(constants.light_wave_subdivision);
        let light_wave_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Wave Mesh"),
            contents: light_wave.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniforms = UniformBuffers::new(&device);

        let bind_groups = BindGroups {
            wave: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Wave Update Bind Group"),
                layout: &kernels.wave_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.wave.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: grid_current.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: grid_scratch.as_entire_binding(),
                    },
                ],
            }),
            copy: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("State Copy Bind Group"),
                layout: &kernels.copy_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.copy.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: grid_scratch.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: grid_current.as_entire_binding(),
                    },
                ],
            }),
            caustics: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Caustics Bind Group"),
                layout: &kernels.caustics_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.caustics.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: grid_current.as_entire_binding(),
                    },
                ],
            }),
            blur_horizontal: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Blur Bind Group (horizontal)"),
                layout: &kernels.blur_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&caustics_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&caustics_scratch_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: uniforms.blur_horizontal.as_entire_binding(),
                    },
                ],
            }),
            blur_vertical: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Blur Bind Group (vertical)"),
                layout: &kernels.blur_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&caustics_scratch_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&caustics_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: uniforms.blur_vertical.as_entire_binding(),
                    },
                ],
            }),
            render: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Composite Bind Group"),
                layout: &kernels.render_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.render.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: grid_current.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&caustics_view),
                    },
                ],
            }),
        };

        log::info!(
            "Simulation grid {}x{}, caustics {}x{}, light-wave mesh {} vertices",
            constants.height_resolution,
            constants.height_resolution,
            constants.caustics_size,
            constants.caustics_size,
            light_wave.vertex_count()
        );

        Ok(Self {
            device,
            queue,
            target,
            format,
            constants,
            kernels,
            grid_current,
            grid_scratch,
            grid_bytes,
            caustics_view,
            quad_buffer,
            light_wave_buffer,
            light_wave_vertex_count: light_wave.vertex_count(),
            uniforms,
            bind_groups,
            overlay: None,
            screenshot_dir: PathBuf::from("screenshots"),
            screenshot_requested: false,
            screenshot_counter: 0,
            last_screenshot: None,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Draw egui on top of every composite from now on.
    pub fn enable_overlay(&mut self) {
        if self.overlay.is_none() {
            self.overlay = Some(Overlay::new(&self.device, self.format));
        }
    }

    /// Hand the next UI frame to the overlay. Ignored when no overlay is enabled.
    pub fn set_overlay_frame(&mut self, frame: OverlayFrame) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.submit(frame);
        }
    }

    /// Re-apply the current surface configuration after a lost or outdated surface.
    pub fn reconfigure(&mut self) {
        if let Target::Surface {
            surface,
            config,
            configured,
        } = &mut self.target
        {
            if config.width > 0 && config.height > 0 {
                surface.configure(&self.device, config);
                *configured = true;
            }
        }
    }

    pub fn set_screenshot_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.screenshot_dir = dir.as_ref().to_path_buf();
    }

    /// Capture the next executed frame to `screenshot_NNNN.png`.
    ///
    /// Returns `false` when the target cannot be copied from.
    pub fn request_screenshot(&mut self) -> bool {
        if !self.target.can_capture() {
            log::warn!("Screenshots are not supported by this surface");
            self.screenshot_requested = false;
            return false;
        }
        self.screenshot_requested = true;
        true
    }

    /// Path of the most recently saved screenshot.
    pub fn last_screenshot(&self) -> Option<&Path> {
        self.last_screenshot.as_deref()
    }

    fn upload(&self, params: &FrameParams) {
        let queue = &self.queue;
        queue.write_buffer(&self.uniforms.render, 0, bytemuck::bytes_of(&params.render));
        queue.write_buffer(&self.uniforms.wave, 0, bytemuck::bytes_of(&params.wave));
        queue.write_buffer(&self.uniforms.copy, 0, bytemuck::bytes_of(&params.copy));
        queue.write_buffer(&self.uniforms.caustics, 0, bytemuck::bytes_of(&params.caustics));
        queue.write_buffer(
            &self.uniforms.blur_horizontal,
            0,
            bytemuck::bytes_of(&params.blur_horizontal),
        );
        queue.write_buffer(
            &self.uniforms.blur_vertical,
            0,
            bytemuck::bytes_of(&params.blur_vertical),
        );
    }

    fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        stage: Stage,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        extent: u32,
    ) {
        let workgroups = self.constants.workgroups_for(extent);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(stage.label()),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(workgroups, workgroups, 1);
    }

    fn record_stage(&self, encoder: &mut wgpu::CommandEncoder, stage: Stage, frame_view: &wgpu::TextureView) {
        let grid = self.constants.height_resolution;
        let caustics = self.constants.caustics_size;
        match stage {
            Stage::WaveUpdate => self.dispatch(
                encoder,
                stage,
                &self.kernels.wave_pipeline,
                &self.bind_groups.wave,
                grid,
            ),
            Stage::StateCopy => self.dispatch(
                encoder,
                stage,
                &self.kernels.copy_pipeline,
                &self.bind_groups.copy,
                grid,
            ),
            Stage::CausticsProjection => {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(stage.label()),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &self.caustics_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.kernels.caustics_pipeline);
                pass.set_bind_group(0, &self.bind_groups.caustics, &[]);
                pass.set_vertex_buffer(0, self.light_wave_buffer.slice(..));
                pass.draw(0..self.light_wave_vertex_count, 0..1);
            }
            Stage::BlurHorizontal => self.dispatch(
                encoder,
                stage,
                &self.kernels.blur_pipeline,
                &self.bind_groups.blur_horizontal,
                caustics,
            ),
            Stage::BlurVertical => self.dispatch(
                encoder,
                stage,
                &self.kernels.blur_pipeline,
                &self.bind_groups.blur_vertical,
                caustics,
            ),
            Stage::Composite => {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(stage.label()),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: frame_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.kernels.render_pipeline);
                pass.set_bind_group(0, &self.bind_groups.render, &[]);
                pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
                pass.draw(0..FULLSCREEN_QUAD.len() as u32, 0..1);
            }
        }
    }

    fn encode_capture(&self, encoder: &mut wgpu::CommandEncoder, texture: &wgpu::Texture, size: SurfaceSize) -> Capture {
        let padded = padded_bytes_per_row(size.width);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Staging Buffer"),
            size: padded as u64 * size.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(size.height),
                },
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        Capture {
            buffer,
            padded_bytes_per_row: padded,
            size,
        }
    }

    /// Map a finished capture into tightly packed RGBA8.
    fn finish_capture(&self, capture: Capture) -> Result<Vec<u8>, EngineError> {
        let data = map_staging(&self.device, &capture.buffer)?;
        let mut pixels = strip_row_padding(
            &data,
            capture.size.width,
            capture.size.height,
            capture.padded_bytes_per_row,
        );
        if is_bgra(self.format) {
            image_export::bgra_to_rgba(&mut pixels);
        }
        Ok(pixels)
    }

    fn save_screenshot(&self, capture: Capture) -> Option<PathBuf> {
        let size = capture.size;
        let pixels = match self.finish_capture(capture) {
            Ok(pixels) => pixels,
            Err(e) => {
                log::error!("Failed to capture frame: {}", e);
                return None;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.screenshot_dir) {
            log::error!("Failed to create {}: {}", self.screenshot_dir.display(), e);
            return None;
        }
        let path = image_export::screenshot_path(&self.screenshot_dir, self.screenshot_counter);
        match image_export::export_frame(&path, size.width, size.height, &pixels) {
            Ok(()) => {
                log::info!("Saved: {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::error!("Failed to export frame: {}", e);
                None
            }
        }
    }

    /// Read the offscreen target as tightly packed RGBA8.
    pub fn read_pixels(&self) -> Result<Vec<u8>, EngineError> {
        let Target::Offscreen { texture, size } = &self.target else {
            return Err(EngineError::Readback(
                "pixel readback requires an offscreen target".to_string(),
            ));
        };
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        let capture = self.encode_capture(&mut encoder, texture, *size);
        self.queue.submit(std::iter::once(encoder.finish()));
        self.finish_capture(capture)
    }

    /// Read both simulation grids, four floats per cell: (current, scratch).
    pub fn read_height_grids(&self) -> Result<(Vec<f32>, Vec<f32>), EngineError> {
        let create_staging = |label: &str| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: self.grid_bytes,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        };
        let current_staging = create_staging("Grid Readback (current)");
        let scratch_staging = create_staging("Grid Readback (scratch)");

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Grid Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.grid_current, 0, &current_staging, 0, self.grid_bytes);
        encoder.copy_buffer_to_buffer(&self.grid_scratch, 0, &scratch_staging, 0, self.grid_bytes);
        self.queue.submit(std::iter::once(encoder.finish()));

        let current = map_staging(&self.device, &current_staging)?;
        let scratch = map_staging(&self.device, &scratch_staging)?;
        Ok((floats_from_bytes(&current), floats_from_bytes(&scratch)))
    }
}

impl FrameBackend for GpuScheduler {
    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn surface_size(&self) -> SurfaceSize {
        self.target.size()
    }

    fn configure_surface(&mut self, size: SurfaceSize) {
        if size.is_empty() {
            return;
        }
        match &mut self.target {
            Target::Surface {
                surface,
                config,
                configured,
            } => {
                config.width = size.width;
                config.height = size.height;
                surface.configure(&self.device, config);
                *configured = true;
            }
            Target::Offscreen {
                texture,
                size: current,
            } => {
                *texture = create_offscreen_texture(&self.device, size);
                *current = size;
            }
        }
    }

    fn reset_simulation(&mut self) {
        let zeros = vec![0u8; self.grid_bytes as usize];
        self.queue.write_buffer(&self.grid_current, 0, &zeros);
        self.queue.write_buffer(&self.grid_scratch, 0, &zeros);
    }

    fn execute(&mut self, plan: &FramePlan, params: &FrameParams) -> Result<(), EngineError> {
        let size = self.target.size();
        if size.is_empty() {
            return Ok(());
        }

        self.upload(params);

        let frame = match &self.target {
            Target::Surface { surface, .. } => Frame::Surface(surface.get_current_texture()?),
            Target::Offscreen { texture, .. } => Frame::Offscreen(texture),
        };
        let view = frame
            .texture()
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        for stage in plan.stages() {
            self.record_stage(&mut encoder, *stage, &view);
        }

        let mut command_buffers = match self.overlay.as_mut() {
            Some(overlay) => overlay.record(&self.device, &self.queue, &mut encoder, &view, size),
            None => Vec::new(),
        };

        let capture = if self.screenshot_requested && self.target.can_capture() {
            Some(self.encode_capture(&mut encoder, frame.texture(), size))
        } else {
            None
        };
        self.screenshot_requested = false;

        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);

        if let Some(capture) = capture {
            if let Some(path) = self.save_screenshot(capture) {
                self.last_screenshot = Some(path);
                self.screenshot_counter += 1;
            }
        }

        frame.present();
        Ok(())
    }
}
