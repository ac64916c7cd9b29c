use anyhow::{Context as AnyhowContext, Result};
use gradient::PackedUniforms;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use super::context::GpuContext;
use super::dispatch::{self, DispatchStrategy};
use super::pipeline::{BlitPipeline, ComputePipeline};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const BYTES_PER_PIXEL: u32 = 4;

/// Storage texture the blend kernel writes into.
struct ColorTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Everything needed to turn packed uniforms into pixels.
///
/// Windowed states additionally hold a blit pipeline that copies the
/// storage texture to the swapchain; headless states read it back instead.
pub(crate) struct GpuState {
    context: GpuContext,
    strategy: Box<dyn DispatchStrategy>,
    compute: ComputePipeline,
    blit: Option<BlitPipeline>,
    uniform_buffer: wgpu::Buffer,
    target: ColorTarget,
    compute_bind_group: wgpu::BindGroup,
    blit_bind_group: Option<wgpu::BindGroup>,
}

impl GpuState {
    pub(crate) fn new<T>(target: &T, initial_size: PhysicalSize<u32>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        Self::from_context(GpuContext::new(target, initial_size)?)
    }

    pub(crate) fn new_headless(size: (u32, u32)) -> Result<Self> {
        Self::from_context(GpuContext::new_headless(size)?)
    }

    fn from_context(context: GpuContext) -> Result<Self> {
        let strategy = dispatch::select_strategy(&context.limits);
        tracing::info!(
            strategy = strategy.name(),
            width = context.size.width,
            height = context.size.height,
            "gradient pipeline ready"
        );

        let compute = ComputePipeline::new(&context.device, strategy.as_ref())?;
        let blit = context
            .surface_format()
            .map(|format| BlitPipeline::new(&context.device, format));

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gradient uniform buffer"),
            size: std::mem::size_of::<PackedUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let target = create_target(&context.device, context.size);
        let compute_bind_group = create_compute_bind_group(
            &context.device,
            &compute.bind_group_layout,
            &uniform_buffer,
            &target.view,
        );
        let blit_bind_group = blit
            .as_ref()
            .map(|blit| create_blit_bind_group(&context.device, blit, &target.view));

        Ok(Self {
            context,
            strategy,
            compute,
            blit,
            uniform_buffer,
            target,
            compute_bind_group,
            blit_bind_group,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.context.resize(new_size);
        self.target = create_target(&self.context.device, self.context.size);
        self.compute_bind_group = create_compute_bind_group(
            &self.context.device,
            &self.compute.bind_group_layout,
            &self.uniform_buffer,
            &self.target.view,
        );
        if let Some(blit) = self.blit.as_ref() {
            self.blit_bind_group = Some(create_blit_bind_group(
                &self.context.device,
                blit,
                &self.target.view,
            ));
        }
    }

    /// Runs the kernel and presents the result on the window surface.
    pub(crate) fn render(&mut self, uniforms: &PackedUniforms) -> Result<(), wgpu::SurfaceError> {
        let frame = self.render_internal(uniforms)?;
        frame.present();
        Ok(())
    }

    fn render_internal(
        &mut self,
        uniforms: &PackedUniforms,
    ) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        let surface = self
            .context
            .surface
            .as_ref()
            .expect("windowed gpu state has a surface");
        let blit = self.blit.as_ref().expect("windowed gpu state has a blit pipeline");
        let blit_bind_group = self
            .blit_bind_group
            .as_ref()
            .expect("windowed gpu state has a blit bind group");

        self.write_uniforms(uniforms);

        let frame = surface.get_current_texture()?;
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("gradient encoder"),
                });

        encode_blend_pass(
            &mut encoder,
            &self.compute,
            &self.compute_bind_group,
            self.strategy.as_ref(),
            self.context.size,
        );

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("gradient blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame_view,
                    depth_slice: None,
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
            pass.set_pipeline(&blit.pipeline);
            pass.set_bind_group(0, blit_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(frame)
    }

    /// Runs the kernel and reads the texture back as tightly packed RGBA rows.
    pub(crate) fn render_headless(&mut self, uniforms: &PackedUniforms) -> Result<Vec<u8>> {
        self.write_uniforms(uniforms);

        let size = self.context.size;
        let unpadded_bytes_per_row = size.width * BYTES_PER_PIXEL;
        let padded_bytes_per_row = unpadded_bytes_per_row
            .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gradient readback buffer"),
            size: u64::from(padded_bytes_per_row) * u64::from(size.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("gradient export encoder"),
                });

        encode_blend_pass(
            &mut encoder,
            &self.compute,
            &self.compute_bind_group,
            self.strategy.as_ref(),
            size,
        );

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(size.height),
                },
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );

        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.context.device.poll(wgpu::PollType::wait());
        receiver
            .recv()
            .context("readback mapping callback dropped")?
            .context("failed to map readback buffer")?;

        let mapped = slice.get_mapped_range();
        let mut pixels =
            Vec::with_capacity((unpadded_bytes_per_row * size.height) as usize);
        for row in mapped.chunks(padded_bytes_per_row as usize) {
            pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
        }
        drop(mapped);
        readback.unmap();

        Ok(pixels)
    }

    // write_buffer stages a copy of the bytes at call time, so frames already
    // encoded against earlier values are unaffected by later edits.
    fn write_uniforms(&self, uniforms: &PackedUniforms) {
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

fn encode_blend_pass(
    encoder: &mut wgpu::CommandEncoder,
    compute: &ComputePipeline,
    bind_group: &wgpu::BindGroup,
    strategy: &dyn DispatchStrategy,
    size: PhysicalSize<u32>,
) {
    let (count_x, count_y) = strategy.workgroup_count(size.width, size.height);
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("gradient blend pass"),
        timestamp_writes: None,
    });
    pass.set_pipeline(&compute.pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.dispatch_workgroups(count_x, count_y, 1);
}

fn create_target(device: &wgpu::Device, size: PhysicalSize<u32>) -> ColorTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("gradient target"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    ColorTarget { texture, view }
}

fn create_compute_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    target_view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("gradient blend bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(target_view),
            },
        ],
    })
}

fn create_blit_bind_group(
    device: &wgpu::Device,
    blit: &BlitPipeline,
    target_view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("gradient blit bind group"),
        layout: &blit.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(target_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&blit.sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradient::{pack, Rgba, Spot, SpotPoint, SpotSet, TuningParams};

    fn two_spot_uniforms(noise: f32) -> PackedUniforms {
        let spots: SpotSet = [
            Spot {
                position: SpotPoint::new(0.2, 0.3),
                color: Rgba::new(1.0, 0.1, 0.0, 1.0),
            },
            Spot {
                position: SpotPoint::new(0.8, 0.7),
                color: Rgba::new(0.0, 0.2, 1.0, 1.0),
            },
        ]
        .into_iter()
        .collect();
        let tuning = TuningParams::new(0.05, 2.5, noise);
        pack(&spots, &tuning).expect("two spots fit the packed layout")
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn headless_state_selects_a_dispatch_strategy() {
        let state = GpuState::new_headless((64, 64)).expect("gpu state");
        assert!(!state.strategy_name().is_empty());
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn kernel_output_matches_cpu_reference() {
        let (width, height) = (48u32, 32u32);
        let mut state = GpuState::new_headless((width, height)).expect("gpu state");
        let uniforms = two_spot_uniforms(0.0);

        let gpu_pixels = state.render_headless(&uniforms).expect("readback");
        let reference = gradient::render_reference(&uniforms, width, height);

        assert_eq!(gpu_pixels.len(), (width * height * 4) as usize);
        for (index, (pixel, expected)) in
            gpu_pixels.chunks(4).zip(reference.iter()).enumerate()
        {
            for (channel, value) in pixel.iter().zip(expected.iter()) {
                let quantized = (value.clamp(0.0, 1.0) * 255.0).round() as i16;
                assert!(
                    (i16::from(*channel) - quantized).abs() <= 2,
                    "pixel {index}: gpu {channel} vs reference {quantized}"
                );
            }
        }
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn opposing_spots_dominate_their_own_corners() {
        let (width, height) = (64u32, 64u32);
        let mut state = GpuState::new_headless((width, height)).expect("gpu state");
        let spots: SpotSet = [
            Spot {
                position: SpotPoint::new(0.0, 0.0),
                color: Rgba::new(1.0, 0.0, 0.0, 1.0),
            },
            Spot {
                position: SpotPoint::new(0.999, 0.999),
                color: Rgba::new(0.0, 0.0, 1.0, 1.0),
            },
        ]
        .into_iter()
        .collect();
        let tuning = TuningParams::new(0.001, 4.0, 0.0);
        let uniforms = pack(&spots, &tuning).expect("two spots fit the packed layout");

        let pixels = state.render_headless(&uniforms).expect("readback");
        let pixel = |x: u32, y: u32| {
            let offset = ((y * width + x) * 4) as usize;
            (pixels[offset], pixels[offset + 2])
        };

        let (red_r, red_b) = pixel(0, 0);
        assert!(red_r > 240 && red_b < 16, "top-left should be red");
        let (blue_r, blue_b) = pixel(width - 1, height - 1);
        assert!(blue_b > 240 && blue_r < 16, "bottom-right should be blue");
    }
}
