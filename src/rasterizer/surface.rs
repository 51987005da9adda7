//! Color/depth surfaces and the point/line backend boundary

use super::geometry::DevicePoint;
use super::types::{Color, PixelFormat};
use crate::error::RenderError;

/// Depth value of a cleared depth buffer
pub const DEPTH_CLEAR: f32 = f32::MAX;

/// Exclusive access to a target's color and depth buffers.
/// The target is unlocked again when the guard drops.
pub struct SurfaceLock<'a> {
    color: &'a mut [u8],
    depth: &'a mut [f32],
    width: usize,
    height: usize,
    /// Bytes per color row
    stride: usize,
    format: PixelFormat,
    locked: &'a mut bool,
}

impl<'a> SurfaceLock<'a> {
    /// Take the lock over borrowed buffers, failing if `locked` is already set
    pub fn acquire(
        color: &'a mut [u8],
        depth: &'a mut [f32],
        width: usize,
        height: usize,
        format: PixelFormat,
        locked: &'a mut bool,
    ) -> Result<Self, RenderError> {
        if *locked {
            return Err(RenderError::SurfaceLocked);
        }
        *locked = true;
        let stride = width * format.bytes_per_pixel();
        Ok(Self { color, depth, width, height, stride, format, locked })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    fn color_offset(&self, x: usize, y: usize) -> usize {
        y * self.stride + x * self.format.bytes_per_pixel()
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.depth[y * self.width + x]
    }

    /// Store color and depth for a pixel that already passed the depth test
    pub fn write(&mut self, x: usize, y: usize, z: f32, color: Color) {
        self.depth[y * self.width + x] = z;
        self.set_pixel(x, y, color);
    }

    /// Color only, ignoring depth; out-of-bounds pixels are dropped
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let bpp = self.format.bytes_per_pixel();
            let idx = self.color_offset(x, y);
            let bytes = self.format.pack(color);
            self.color[idx..idx + bpp].copy_from_slice(&bytes[..bpp]);
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        let idx = self.color_offset(x, y);
        let mut bytes = [0u8; 4];
        let bpp = self.format.bytes_per_pixel();
        bytes[..bpp].copy_from_slice(&self.color[idx..idx + bpp]);
        self.format.unpack(bytes)
    }

    pub fn fill_color(&mut self, color: Color) {
        let bpp = self.format.bytes_per_pixel();
        let bytes = self.format.pack(color);
        for px in self.color.chunks_exact_mut(bpp) {
            px.copy_from_slice(&bytes[..bpp]);
        }
    }

    pub fn fill_depth(&mut self, z: f32) {
        self.depth.fill(z);
    }
}

impl Drop for SurfaceLock<'_> {
    fn drop(&mut self) {
        *self.locked = false;
    }
}

/// Something the pipeline can draw into
pub trait RenderTarget {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn format(&self) -> PixelFormat;
    fn lock(&mut self) -> Result<SurfaceLock<'_>, RenderError>;
}

/// Owned color + depth buffers
pub struct Framebuffer {
    pub pixels: Vec<u8>,
    pub zbuffer: Vec<f32>,
    pub width: usize,
    pub height: usize,
    format: PixelFormat,
    locked: bool,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_format(width, height, PixelFormat::Rgba8)
    }

    pub fn with_format(width: usize, height: usize, format: PixelFormat) -> Self {
        Self {
            pixels: vec![0; width * height * format.bytes_per_pixel()],
            zbuffer: vec![DEPTH_CLEAR; width * height],
            width,
            height,
            format,
            locked: false,
        }
    }

    /// Reallocate for a new size, dropping the old contents
    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width || height != self.height {
            *self = Self::with_format(width, height, self.format);
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        let bpp = self.format.bytes_per_pixel();
        let idx = (y * self.width + x) * bpp;
        let mut bytes = [0u8; 4];
        bytes[..bpp].copy_from_slice(&self.pixels[idx..idx + bpp]);
        self.format.unpack(bytes)
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.zbuffer[y * self.width + x]
    }
}

impl RenderTarget for Framebuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn lock(&mut self) -> Result<SurfaceLock<'_>, RenderError> {
        let Framebuffer { pixels, zbuffer, width, height, format, locked } = self;
        SurfaceLock::acquire(pixels, zbuffer, *width, *height, *format, locked)
    }
}

/// Point and line drawing for the non-fill polygon modes
pub trait PrimitiveBackend {
    fn draw_points(&mut self, surface: &mut SurfaceLock<'_>, points: &[DevicePoint], color: Color);

    /// Draws each consecutive pair in `segments` as one line
    fn draw_lines(&mut self, surface: &mut SurfaceLock<'_>, segments: &[[DevicePoint; 2]], color: Color);
}

/// Integer line and dot drawing straight into the color buffer
#[derive(Debug, Clone, Copy)]
pub struct BresenhamBackend {
    /// Radius of a drawn point in pixels (0 = single pixel)
    pub point_radius: i32,
}

impl Default for BresenhamBackend {
    fn default() -> Self {
        Self { point_radius: 1 }
    }
}

impl BresenhamBackend {
    /// Filled circle at (cx, cy)
    fn draw_circle(surface: &mut SurfaceLock<'_>, cx: i32, cy: i32, radius: i32, color: Color) {
        let r_sq = radius * radius;
        for y in (cy - radius).max(0)..=(cy + radius).min(surface.height() as i32 - 1) {
            for x in (cx - radius).max(0)..=(cx + radius).min(surface.width() as i32 - 1) {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r_sq {
                    surface.set_pixel(x as usize, y as usize, color);
                }
            }
        }
    }

    fn draw_line(surface: &mut SurfaceLock<'_>, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            if x >= 0 && y >= 0 {
                surface.set_pixel(x as usize, y as usize, color);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// Nearest pixel of a device coordinate. Callers hand in guard-band
/// coordinates, which fit an i32.
fn to_pixel(v: f32) -> i32 {
    v.round() as i32
}

impl PrimitiveBackend for BresenhamBackend {
    fn draw_points(&mut self, surface: &mut SurfaceLock<'_>, points: &[DevicePoint], color: Color) {
        for p in points {
            Self::draw_circle(surface, to_pixel(p.x), to_pixel(p.y), self.point_radius, color);
        }
    }

    fn draw_lines(&mut self, surface: &mut SurfaceLock<'_>, segments: &[[DevicePoint; 2]], color: Color) {
        for [a, b] in segments {
            Self::draw_line(surface, to_pixel(a.x), to_pixel(a.y), to_pixel(b.x), to_pixel(b.y), color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let mut fb = Framebuffer::new(4, 4);
        {
            let mut lock = fb.lock().unwrap();
            lock.write(1, 2, 0.5, Color::RED);
        }
        assert!(!fb.is_locked());
        assert_eq!(fb.get_pixel(1, 2), Color::RED);
        assert_eq!(fb.depth_at(1, 2), 0.5);

        let mut flag = true;
        let mut color = [0u8; 4];
        let mut depth = [0.0f32; 1];
        let again = SurfaceLock::acquire(&mut color, &mut depth, 1, 1, PixelFormat::Rgba8, &mut flag);
        assert!(matches!(again, Err(RenderError::SurfaceLocked)));
    }

    #[test]
    fn test_fill_uses_surface_format() {
        let mut fb = Framebuffer::with_format(3, 2, PixelFormat::Bgra8);
        {
            let mut lock = fb.lock().unwrap();
            lock.fill_color(Color::BLUE);
            lock.fill_depth(0.25);
        }
        assert_eq!(&fb.pixels[0..4], &[255, 0, 0, 255]);
        assert_eq!(fb.get_pixel(2, 1), Color::BLUE);
        assert!(fb.zbuffer.iter().all(|&z| z == 0.25));
    }

    #[test]
    fn test_line_endpoints_and_clipping() {
        let mut fb = Framebuffer::new(16, 16);
        {
            let mut lock = fb.lock().unwrap();
            let seg = [DevicePoint::new(2.0, 3.0, 0.0), DevicePoint::new(12.0, 8.0, 0.0)];
            BresenhamBackend::default().draw_lines(&mut lock, &[seg], Color::GREEN);
            // Partly off the surface, must not panic
            let off = [DevicePoint::new(-5.0, -5.0, 0.0), DevicePoint::new(40.0, 7.0, 0.0)];
            BresenhamBackend::default().draw_lines(&mut lock, &[off], Color::WHITE);
        }
        assert_eq!(fb.get_pixel(2, 3), Color::GREEN);
        assert_eq!(fb.get_pixel(12, 8), Color::GREEN);
    }

    #[test]
    fn test_points_are_dots() {
        let mut fb = Framebuffer::new(8, 8);
        {
            let mut lock = fb.lock().unwrap();
            let mut backend = BresenhamBackend { point_radius: 1 };
            backend.draw_points(&mut lock, &[DevicePoint::new(4.0, 4.0, 0.0)], Color::WHITE);
        }
        for (x, y) in [(4, 4), (3, 4), (5, 4), (4, 3), (4, 5)] {
            assert_eq!(fb.get_pixel(x, y), Color::WHITE);
        }
        assert_eq!(fb.get_pixel(3, 3), Color::TRANSPARENT);
    }

    #[test]
    fn test_resize_reallocates() {
        let mut fb = Framebuffer::with_format(2, 2, PixelFormat::Bgra8);
        fb.resize(5, 3);
        assert_eq!(fb.pixels.len(), 5 * 3 * 4);
        assert_eq!(fb.zbuffer.len(), 15);
        assert_eq!(RenderTarget::format(&fb), PixelFormat::Bgra8);
    }
}
