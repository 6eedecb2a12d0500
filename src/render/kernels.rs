//! Pipelines and bind group layouts for the five frame kernels.
//!
//! Layouts are explicit so the bind groups can be built once, up front,
//! against the grids and textures owned by the scheduler.

use crate::error::EngineError;
use crate::mesh::PlaneVertex;

/// Format of the caustics and blur scratch textures.
pub const CAUSTICS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn texture_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Compiled programs and the layouts their bind groups are built against.
pub struct Kernels {
    pub wave_layout: wgpu::BindGroupLayout,
    pub wave_pipeline: wgpu::ComputePipeline,
    pub copy_layout: wgpu::BindGroupLayout,
    pub copy_pipeline: wgpu::ComputePipeline,
    pub caustics_layout: wgpu::BindGroupLayout,
    pub caustics_pipeline: wgpu::RenderPipeline,
    pub blur_layout: wgpu::BindGroupLayout,
    pub blur_pipeline: wgpu::ComputePipeline,
    pub render_layout: wgpu::BindGroupLayout,
    pub render_pipeline: wgpu::RenderPipeline,
}

impl Kernels {
    /// Build every kernel. `surface_format` is the composite's target format.
    pub async fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Result<Self, EngineError> {
        let compute = wgpu::ShaderStages::COMPUTE;
        let vertex = wgpu::ShaderStages::VERTEX;
        let fragment = wgpu::ShaderStages::FRAGMENT;

        // wave: params, current grid (read), scratch grid (write)
        let wave_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Wave Update Bind Group Layout"),
            entries: &[
                uniform_entry(0, compute),
                storage_entry(1, compute, true),
                storage_entry(2, compute, false),
            ],
        });
        let wave_pipeline = load_compute(
            device,
            "wave update",
            include_str!("shaders/heightfield.wgsl"),
            &wave_layout,
        )
        .await?;

        // copy: params, scratch grid (read), current grid (write)
        let copy_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("State Copy Bind Group Layout"),
            entries: &[
                uniform_entry(0, compute),
                storage_entry(1, compute, true),
                storage_entry(2, compute, false),
            ],
        });
        let copy_pipeline = load_compute(
            device,
            "state copy",
            include_str!("shaders/heightfield_copy.wgsl"),
            &copy_layout,
        )
        .await?;

        let caustics_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Caustics Bind Group Layout"),
            entries: &[uniform_entry(0, vertex | fragment), storage_entry(1, vertex, true)],
        });
        let caustics_pipeline = load_render(
            device,
            "caustics projection",
            include_str!("shaders/caustics.wgsl"),
            &caustics_layout,
            wgpu::ColorTargetState {
                format: CAUSTICS_FORMAT,
                blend: Some(wgpu::BlendState {
                    color: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                    alpha: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                }),
                write_mask: wgpu::ColorWrites::ALL,
            },
        )
        .await?;

        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Bind Group Layout"),
            entries: &[
                sampler_entry(0, compute),
                texture_entry(1, compute),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: compute,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: CAUSTICS_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                uniform_entry(3, compute),
            ],
        });
        let blur_pipeline = load_compute(device, "blur", include_str!("shaders/blur.wgsl"), &blur_layout).await?;

        let render_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                uniform_entry(0, vertex | fragment),
                storage_entry(1, fragment, true),
                sampler_entry(2, fragment),
                texture_entry(3, fragment),
            ],
        });
        let render_pipeline = load_render(
            device,
            "composite",
            include_str!("shaders/render.wgsl"),
            &render_layout,
            wgpu::ColorTargetState {
                format: surface_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            },
        )
        .await?;

        Ok(Self {
            wave_layout,
            wave_pipeline,
            copy_layout,
            copy_pipeline,
            caustics_layout,
            caustics_pipeline,
            blur_layout,
            blur_pipeline,
            render_layout,
            render_pipeline,
        })
    }
}

/// Surface any validation error raised since the matching push.
async fn check_scope(device: &wgpu::Device, stage: &'static str) -> Result<(), EngineError> {
    match device.pop_error_scope().await {
        Some(error) => {
            log::error!("Kernel '{}' failed validation: {}", stage, error);
            Err(EngineError::ResourceLoad {
                stage,
                message: error.to_string(),
            })
        }
        None => Ok(()),
    }
}

async fn load_compute(
    device: &wgpu::Device,
    stage: &'static str,
    source: &'static str,
    layout: &wgpu::BindGroupLayout,
) -> Result<wgpu::ComputePipeline, EngineError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(stage),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(stage),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(stage),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: Some("cs_main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    });

    check_scope(device, stage).await?;
    Ok(pipeline)
}

async fn load_render(
    device: &wgpu::Device,
    stage: &'static str,
    source: &'static str,
    layout: &wgpu::BindGroupLayout,
    target: wgpu::ColorTargetState,
) -> Result<wgpu::RenderPipeline, EngineError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(stage),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(stage),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(stage),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &[PlaneVertex::buffer_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(target)],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    });

    check_scope(device, stage).await?;
    Ok(pipeline)
}
