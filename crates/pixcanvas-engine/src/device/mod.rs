//! GPU device + surface management.
//!
//! Creates the wgpu instance, adapter, device and queue, configures the surface
//! and hands out per-frame encoders. No drawing happens here.

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::{GpuInit, DEFAULT_MAX_TEXTURE_DIMENSION};
