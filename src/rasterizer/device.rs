//! The drawing device: bound state, render target, and the draw loop

use log::{debug, trace};

use super::buffer::{IndexBuffer, VertexBuffer, VertexReader};
use super::geometry::{setup_triangle, CullReason, Setup, SetupOptions};
use super::params::ParamBlock;
use super::scan::rasterize_triangle;
use super::shade::{Shader, ViewLight};
use super::surface::{Framebuffer, PrimitiveBackend, RenderTarget, DEPTH_CLEAR};
use super::types::{Color, PolygonMode, Texture, Viewport};
use crate::error::RenderError;

/// Per-draw counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub triangles: usize,
    pub backface_culled: usize,
    pub straddling_culled: usize,
    pub offscreen_culled: usize,
    pub guard_band_culled: usize,
    /// Triangles that reached scan conversion or the primitive backend
    pub rasterized: usize,
    /// Covered pixels
    pub fragments: usize,
    pub depth_rejected: usize,
    pub written: usize,
}

impl DrawStats {
    fn record_cull(&mut self, reason: CullReason) {
        match reason {
            CullReason::BackFace => self.backface_culled += 1,
            CullReason::StraddlesEye => self.straddling_culled += 1,
            CullReason::Offscreen => self.offscreen_culled += 1,
            CullReason::GuardBand => self.guard_band_culled += 1,
        }
    }

    pub fn culled(&self) -> usize {
        self.backface_culled + self.straddling_culled + self.offscreen_culled + self.guard_band_culled
    }
}

pub struct Device<T: RenderTarget = Framebuffer> {
    params: ParamBlock,
    target: Option<T>,
    backend: Option<Box<dyn PrimitiveBackend>>,
    polygon_mode: PolygonMode,
    cull_backfaces: bool,
}

impl<T: RenderTarget> Default for Device<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RenderTarget> Device<T> {
    pub fn new() -> Self {
        Self {
            params: ParamBlock::new(Viewport::new(0, 0)),
            target: None,
            backend: None,
            polygon_mode: PolygonMode::Fill,
            cull_backfaces: true,
        }
    }

    pub fn params(&self) -> &ParamBlock {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamBlock {
        &mut self.params
    }

    /// Bind a target and fit the viewport to it, keeping the depth range.
    /// Returns the previously bound target.
    pub fn bind_render_target(&mut self, target: T) -> Option<T> {
        let old = self.params.viewport();
        self.params.set_viewport(Viewport {
            min_z: old.min_z,
            max_z: old.max_z,
            ..Viewport::new(target.width(), target.height())
        });
        debug!(
            "bound {}x{} {:?} render target",
            target.width(),
            target.height(),
            target.format()
        );
        self.target.replace(target)
    }

    pub fn unbind_render_target(&mut self) -> Option<T> {
        self.target.take()
    }

    pub fn render_target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    pub fn render_target_mut(&mut self) -> Option<&mut T> {
        self.target.as_mut()
    }

    pub fn set_backend(&mut self, backend: Option<Box<dyn PrimitiveBackend>>) {
        self.backend = backend;
    }

    pub fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    pub fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.polygon_mode = mode;
    }

    pub fn cull_backfaces(&self) -> bool {
        self.cull_backfaces
    }

    pub fn set_cull_backfaces(&mut self, cull: bool) {
        self.cull_backfaces = cull;
    }

    /// Fill the color buffer (if `color` is given) and reset depth (if `depth`)
    pub fn clear(&mut self, color: Option<Color>, depth: bool) -> Result<(), RenderError> {
        let target = self.target.as_mut().ok_or(RenderError::NoRenderTarget)?;
        target.format().ensure_writable()?;
        let mut surface = target.lock()?;
        if let Some(c) = color {
            surface.fill_color(c);
        }
        if depth {
            surface.fill_depth(DEPTH_CLEAR);
        }
        debug!("clear color={:?} depth={}", color, depth);
        Ok(())
    }

    /// Draw an indexed triangle list with the current state
    pub fn draw_indexed(&mut self, vb: &VertexBuffer, ib: &IndexBuffer) -> Result<DrawStats, RenderError> {
        let Device { params, target, backend, polygon_mode, cull_backfaces } = self;
        let mode = *polygon_mode;

        let reader = VertexReader::new(vb.declaration())?;
        let mut primitive = match mode {
            PolygonMode::Fill => None,
            m => Some(backend.as_deref_mut().ok_or(RenderError::NoPrimitiveBackend(m))?),
        };
        let target = target.as_mut().ok_or(RenderError::NoRenderTarget)?;
        target.format().ensure_writable()?;

        let mut surface = target.lock()?;
        ib.validate(vb.len())?;

        let xf = params.transforms();
        let material = params.material();
        let view = params.view();
        let lights: Vec<ViewLight> = if material.lighting {
            params.bound_lights().map(|l| ViewLight::from_world(l, &view)).collect()
        } else {
            Vec::new()
        };
        let textures: Vec<&Texture> = params.bound_textures().collect();
        let shader = Shader { material, lights: &lights, textures: &textures };
        let opts = SetupOptions { cull_backfaces: *cull_backfaces, view_position: material.lighting };

        trace!(
            "draw {} triangles, {:?}, {} lights, {} textures",
            ib.triangle_count(),
            mode,
            lights.len(),
            textures.len()
        );

        let (width, height) = (surface.width(), surface.height());
        let mut stats = DrawStats::default();
        let mut depth_rejected = 0;
        let mut written = 0;

        for tri in ib.triangles() {
            stats.triangles += 1;
            let raw = tri.map(|i| reader.fetch(vb, i));
            let dev = match setup_triangle(&raw, &xf, opts) {
                Setup::Visible(t) => t,
                Setup::Culled(reason) => {
                    stats.record_cull(reason);
                    continue;
                }
            };
            stats.rasterized += 1;

            match primitive.as_deref_mut() {
                None => {
                    stats.fragments += rasterize_triangle(&dev.points, width, height, |frag| {
                        if frag.z >= surface.depth_at(frag.x, frag.y) {
                            depth_rejected += 1;
                            return;
                        }
                        let color = shader.shade(&frag.recover(), dev.face_normal);
                        surface.write(frag.x, frag.y, frag.z, color);
                        written += 1;
                    });
                }
                Some(backend) => {
                    // Outline color: first vertex color, else the material's
                    let p = &dev.points[0];
                    let color = p
                        .color
                        .map(|c| Color::from_vec4(c.scale(1.0 / p.inv_w)).clamp())
                        .unwrap_or(material.diffuse);
                    let [a, b, c] = dev.points;
                    match mode {
                        PolygonMode::Point => backend.draw_points(&mut surface, &dev.points, color),
                        _ => backend.draw_lines(&mut surface, &[[a, b], [b, c], [c, a]], color),
                    }
                }
            }
        }

        stats.depth_rejected = depth_rejected;
        stats.written = written;
        debug!(
            "draw: {} tris, {} culled, {} rasterized, {} fragments, {} written",
            stats.triangles,
            stats.culled(),
            stats.rasterized,
            stats.fragments,
            stats.written
        );
        Ok(stats)
    }
}
