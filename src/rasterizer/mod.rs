//! Software triangle pipeline
//!
//! Indexed triangle lists go through per-triangle transform and culling
//! (`geometry`), a fixed-point half-edge scan converter with perspective-correct
//! interpolation (`scan`), and per-pixel texturing and lighting (`shade`),
//! ending in a depth-tested write to a locked color/depth surface (`surface`).
//! [`Device`] owns the state and drives a draw.

pub mod buffer;
pub mod device;
pub mod fixed;
pub mod geometry;
pub mod math;
pub mod mesh;
pub mod params;
pub mod scan;
pub mod shade;
pub mod surface;
pub mod types;

pub use buffer::*;
pub use device::{Device, DrawStats};
pub use math::*;
pub use params::ParamBlock;
pub use surface::{BresenhamBackend, Framebuffer, PrimitiveBackend, RenderTarget, SurfaceLock, DEPTH_CLEAR};
pub use types::*;

/// Texture units on a device
pub const MAX_TEXTURE_UNITS: usize = 8;

/// Light units on a device
pub const MAX_LIGHTS: usize = 8;
