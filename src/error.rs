//! Error types
//!
//! Culling is never an error. These are wiring mistakes on the caller's side;
//! they abort the current clear/draw and leave the rest of the frame to the
//! caller.

use thiserror::Error;

use crate::rasterizer::{PixelFormat, PolygonMode};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("texture unit {unit} out of range (device has {max})")]
    TextureUnitOutOfRange { unit: usize, max: usize },
    #[error("light unit {unit} out of range (device has {max})")]
    LightUnitOutOfRange { unit: usize, max: usize },
    #[error("pixel format {0:?} is not writable by the software path")]
    UnsupportedPixelFormat(PixelFormat),
    #[error("no render target bound")]
    NoRenderTarget,
    #[error("polygon mode {0:?} needs a primitive backend and none is bound")]
    NoPrimitiveBackend(PolygonMode),
    #[error("render target is already locked")]
    SurfaceLocked,
    #[error("index {index} references past the end of a {vertex_count}-vertex buffer")]
    IndexOutOfRange { index: usize, vertex_count: usize },
    #[error("index count {0} is not a multiple of 3")]
    IndexCountNotTriangles(usize),
    #[error("vertex declaration has no position element")]
    MissingPosition,
    #[error("invalid vertex declaration: {0}")]
    InvalidDeclaration(String),
    #[error("vertex data is {len} bytes, not a multiple of the {stride}-byte stride")]
    VertexDataSize { len: usize, stride: usize },
    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureDataSize { expected: usize, actual: usize },
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Error type for pipeline config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}
