//! Core types for the rasterizer

use serde::{Serialize, Deserialize};

use super::math::{Vec3, Vec4};
use crate::error::RenderError;

/// RGBA color, 0.0-1.0 per channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const RED: Color = Color { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const GREEN: Color = Color { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
    pub const BLUE: Color = Color { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        let f = |v: u8| v as f32 / 255.0;
        Self::with_alpha(f(r), f(g), f(b), f(a))
    }

    pub fn from_vec4(v: Vec4) -> Self {
        Self::with_alpha(v.x, v.y, v.z, v.w)
    }

    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r, self.g, self.b, self.a)
    }

    /// Component-wise product (modulate)
    pub fn modulate(self, o: Color) -> Color {
        Color::with_alpha(self.r * o.r, self.g * o.g, self.b * o.b, self.a * o.a)
    }

    /// Scale the color channels, leaving alpha alone
    pub fn scale_rgb(self, s: f32) -> Color {
        Color::with_alpha(self.r * s, self.g * s, self.b * s, self.a)
    }

    pub fn add_rgb(self, o: Color) -> Color {
        Color::with_alpha(self.r + o.r, self.g + o.g, self.b + o.b, self.a)
    }

    pub fn clamp(self) -> Color {
        Color::with_alpha(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }

    /// Clamp and quantize to [r, g, b, a] bytes
    pub fn to_bytes(self) -> [u8; 4] {
        let c = self.clamp();
        let q = |v: f32| (v * 255.0 + 0.5) as u8;
        [q(c.r), q(c.g), q(c.b), q(c.a)]
    }
}

/// Color surface pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Bytes in memory: R, G, B, A
    Rgba8,
    /// Bytes in memory: B, G, R, A
    Bgra8,
    /// 16-bit packed; surfaces may carry it but the fill path cannot write it
    Rgb565,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb565 => 2,
        }
    }

    /// Fail fast before touching a surface the fill path cannot write
    pub fn ensure_writable(self) -> Result<(), RenderError> {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => Ok(()),
            other => Err(RenderError::UnsupportedPixelFormat(other)),
        }
    }

    /// Pack a color for a writable format. Callers check `ensure_writable`
    /// first; an unwritable format packs as RGBA.
    pub fn pack(self, color: Color) -> [u8; 4] {
        let [r, g, b, a] = color.to_bytes();
        match self {
            PixelFormat::Bgra8 => [b, g, r, a],
            _ => [r, g, b, a],
        }
    }

    pub fn unpack(self, bytes: [u8; 4]) -> Color {
        match self {
            PixelFormat::Bgra8 => Color::from_bytes(bytes[2], bytes[1], bytes[0], bytes[3]),
            _ => Color::from_bytes(bytes[0], bytes[1], bytes[2], bytes[3]),
        }
    }
}

/// Texel layout of a [`Texture`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    Rgba8,
    Rgb8,
}

impl TextureFormat {
    pub fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgb8 => 3,
        }
    }
}

/// Texture bound to a texture unit
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub name: String,
}

impl Texture {
    /// Wrap raw texel bytes, checking the length against the dimensions
    pub fn from_raw(
        width: usize,
        height: usize,
        format: TextureFormat,
        data: Vec<u8>,
    ) -> Result<Self, RenderError> {
        let expected = width * height * format.bytes_per_texel();
        if data.len() != expected || width == 0 || height == 0 {
            return Err(RenderError::TextureDataSize { expected, actual: data.len() });
        }
        Ok(Self { width, height, format, data, name: String::new() })
    }

    /// Convert a decoded image; RGB images stay 3 bytes per texel
    pub fn from_image(img: &image::DynamicImage, name: String) -> Result<Self, RenderError> {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let (format, data) = match img {
            image::DynamicImage::ImageRgb8(rgb) => (TextureFormat::Rgb8, rgb.as_raw().clone()),
            other => (TextureFormat::Rgba8, other.to_rgba8().into_raw()),
        };
        let mut tex = Self::from_raw(width, height, format, data)?;
        tex.name = name;
        Ok(tex)
    }

    /// Load texture from an image file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let img = image::open(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let tex = Self::from_image(&img, name)?;
        log::debug!("Loaded texture: {} ({}x{})", tex.name, tex.width, tex.height);
        Ok(tex)
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, cell: usize, color1: Color, color2: Color) -> Self {
        let cell = cell.max(1);
        let mut data = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / cell) + (y / cell)) % 2 == 0;
                let c = if checker { color1 } else { color2 };
                data.extend_from_slice(&c.to_bytes());
            }
        }
        Self { width, height, format: TextureFormat::Rgba8, data, name: "checkerboard".to_string() }
    }

    /// Get texel at x,y coordinates
    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x >= self.width || y >= self.height {
            return Color::BLACK;
        }
        let bpt = self.format.bytes_per_texel();
        let i = (y * self.width + x) * bpt;
        let t = &self.data[i..i + bpt];
        match self.format {
            TextureFormat::Rgba8 => Color::from_bytes(t[0], t[1], t[2], t[3]),
            TextureFormat::Rgb8 => Color::from_bytes(t[0], t[1], t[2], 255),
        }
    }

    /// Nearest-texel sample, each axis clamped to the edge
    pub fn sample(&self, u: f32, v: f32) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::BLACK;
        }
        let axis = |t: f32, size: usize| -> usize {
            let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
            ((t * size as f32) as usize).min(size - 1)
        };
        self.get_pixel(axis(u, self.width), axis(v, self.height))
    }
}

/// Surface material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub emissive: Color,
    pub shininess: f32,
    /// When off, pixels take the unlit base color
    pub lighting: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Color::BLACK,
            diffuse: Color::WHITE,
            specular: Color::BLACK,
            emissive: Color::BLACK,
            shininess: 0.0,
            lighting: false,
        }
    }
}

impl Material {
    /// Unlit material of a single color
    pub fn flat(color: Color) -> Self {
        Self { diffuse: color, ..Default::default() }
    }
}

/// Coefficients of the distance falloff `1 / (constant + linear*d + quadratic*d^2)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub const NONE: Attenuation = Attenuation { constant: 1.0, linear: 0.0, quadratic: 0.0 };

    pub fn factor(&self, distance: f32) -> f32 {
        let denom = self.constant + self.linear * distance + self.quadratic * distance * distance;
        if denom <= f32::EPSILON {
            return 1.0;
        }
        1.0 / denom
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Attenuation::NONE
    }
}

/// Light bound to a light unit. Positions are world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// `w == 0` makes a directional light; `xyz` then points towards the light
    pub position: Vec4,
    pub attenuation: Attenuation,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
}

impl Light {
    pub fn point(position: Vec3, diffuse: Color) -> Self {
        Self {
            position: position.extend(1.0),
            attenuation: Attenuation::NONE,
            ambient: Color::BLACK,
            diffuse,
            specular: Color::BLACK,
        }
    }

    pub fn directional(towards_light: Vec3, diffuse: Color) -> Self {
        Self { position: towards_light.extend(0.0), ..Self::point(Vec3::ZERO, diffuse) }
    }

    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }
}

/// How triangles are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolygonMode {
    Point,
    Wireframe,
    #[default]
    Fill,
}

/// Viewport rectangle and depth range in device space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self { x: 0.0, y: 0.0, width: width as f32, height: height as f32, min_z: 0.0, max_z: 1.0 }
    }
}
