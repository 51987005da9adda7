//! Bonnie pipeline: a CPU triangle rasterizer
//!
//! Vertex/index buffers, textures, a material and up to eight lights go in;
//! depth-tested, perspective-correct, lit pixels come out in a color/depth
//! surface. See [`rasterizer::Device`] for the entry point.

pub mod config;
pub mod error;
pub mod logging;
pub mod rasterizer;

pub use config::{config_from_str, load_config, save_config, PipelineConfig};
pub use error::{ConfigError, RenderError};
pub use logging::{init_logging, LoggingConfig};
