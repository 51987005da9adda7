//! Pipeline settings stored as RON

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rasterizer::{Color, Device, Framebuffer, PixelFormat, PolygonMode, RenderTarget, Viewport};

/// Surface and device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub width: usize,
    pub height: usize,
    pub pixel_format: PixelFormat,
    pub clear_color: Color,
    pub polygon_mode: PolygonMode,
    pub cull_backfaces: bool,
    /// Device depth range (min, max)
    pub depth_range: (f32, f32),
    /// `env_logger` filter; `None` defers to `RUST_LOG`
    pub log_filter: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            pixel_format: PixelFormat::Rgba8,
            clear_color: Color::new(0.1, 0.1, 0.15),
            polygon_mode: PolygonMode::Fill,
            cull_backfaces: true,
            depth_range: (0.0, 1.0),
            log_filter: None,
        }
    }
}

impl PipelineConfig {
    /// A framebuffer matching the configured size and format
    pub fn framebuffer(&self) -> Framebuffer {
        Framebuffer::with_format(self.width, self.height, self.pixel_format)
    }

    /// Push device-level settings. An inverted depth range is ignored.
    pub fn apply<T: RenderTarget>(&self, device: &mut Device<T>) {
        device.set_polygon_mode(self.polygon_mode);
        device.set_cull_backfaces(self.cull_backfaces);

        let (min_z, max_z) = self.depth_range;
        if min_z > max_z {
            warn!("ignoring depth range ({}, {}): min exceeds max", min_z, max_z);
            return;
        }
        let params = device.params_mut();
        params.set_viewport(Viewport { min_z, max_z, ..params.viewport() });
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    config_from_str(&contents)
}

pub fn save_config<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(2)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Parse a config from RON text; missing fields take their defaults
pub fn config_from_str(s: &str) -> Result<PipelineConfig, ConfigError> {
    Ok(ron::from_str(s)?)
}
