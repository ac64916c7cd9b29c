//! Pipeline construction for the gradient kernel and the surface blit.

use anyhow::{ensure, Result};

use super::dispatch::DispatchStrategy;

const BLEND_SHADER: &str = include_str!("shaders/blend.wgsl");
const BLIT_SHADER: &str = include_str!("shaders/blit.wgsl");

/// Workgroup attribute as written in the checked-in kernel source. The
/// dispatch strategy rewrites it before compilation.
const WORKGROUP_TOKEN: &str = "@workgroup_size(8, 8, 1)";

/// Splices the strategy's workgroup dimensions into the kernel source.
pub(crate) fn assemble_blend_shader(strategy: &dyn DispatchStrategy) -> Result<String> {
    ensure!(
        BLEND_SHADER.contains(WORKGROUP_TOKEN),
        "blend kernel is missing the workgroup attribute token"
    );
    let (width, height) = strategy.workgroup_size();
    Ok(BLEND_SHADER.replace(
        WORKGROUP_TOKEN,
        &format!("@workgroup_size({width}, {height}, 1)"),
    ))
}

/// Compute pipeline plus the layout its bind group must follow.
pub(crate) struct ComputePipeline {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl ComputePipeline {
    pub(crate) fn new(device: &wgpu::Device, strategy: &dyn DispatchStrategy) -> Result<Self> {
        let source = assemble_blend_shader(strategy)?;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gradient blend shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gradient blend bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gradient blend pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("gradient blend pipeline"),
            layout: Some(&layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }
}

/// Render pipeline that copies the gradient texture onto the surface.
pub(crate) struct BlitPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
}

impl BlitPipeline {
    pub(crate) fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gradient blit shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gradient blit bind group layout"),
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

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gradient blit pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("gradient blit pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
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

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("gradient blit sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            bind_group_layout,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::dispatch::{PerPixelDispatch, TiledDispatch};

    #[test]
    fn kernel_source_carries_exactly_one_workgroup_token() {
        assert_eq!(BLEND_SHADER.matches(WORKGROUP_TOKEN).count(), 1);
    }

    #[test]
    fn assembly_rewrites_workgroup_dimensions() {
        let limits = wgpu::Limits::default();
        let strategy = PerPixelDispatch::from_limits(&limits).unwrap();
        let (width, height) = strategy.workgroup_size();
        let source = assemble_blend_shader(&strategy).unwrap();
        assert!(source.contains(&format!("@workgroup_size({width}, {height}, 1)")));
        assert_eq!(source.matches("@workgroup_size").count(), 1);
    }

    #[test]
    fn tiled_assembly_keeps_eight_by_eight() {
        let source = assemble_blend_shader(&TiledDispatch).unwrap();
        assert!(source.contains("@workgroup_size(8, 8, 1)"));
    }
}
