//! GPU orchestration for the gradient compute pipeline.
//!
//! The path from spots to pixels is deliberately short:
//! - `context` owns wgpu instance/adapter/device wiring, both for a live
//!   window surface and for headless export, and rebuilds swapchain state
//!   when the window resizes.
//! - `dispatch` probes device limits once and picks how compute workgroups
//!   tile the output surface.
//! - `pipeline` splices the chosen workgroup dimensions into the WGSL
//!   kernel and builds the compute and blit pipelines around one uniform
//!   buffer and one storage texture.
//! - `state` glues everything together and exposes the `GpuState` API used
//!   by `window` and `still`: upload packed uniforms, run the kernel, blit
//!   to the surface or read the texture back.

mod context;
mod dispatch;
mod pipeline;
mod state;

pub(crate) use state::GpuState;
