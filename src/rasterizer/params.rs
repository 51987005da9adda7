//! Transform, material, light and texture state
//!
//! Composite matrices are cached. Every input matrix carries a generation
//! bumped on write; a derived cell remembers the generations it was built
//! from and recomputes only when they differ.

use std::cell::Cell;
use std::rc::Rc;

use super::math::{Mat3, Mat3x4, Mat4, Vec3};
use super::types::{Light, Material, Texture, Viewport};
use super::{MAX_LIGHTS, MAX_TEXTURE_UNITS};
use crate::error::RenderError;

/// Cached output of a pure function of versioned inputs
#[derive(Debug)]
pub struct Derived<K: Copy + PartialEq, T: Copy> {
    slot: Cell<Option<(K, T)>>,
    recomputes: Cell<u32>,
}

impl<K: Copy + PartialEq, T: Copy> Derived<K, T> {
    pub fn new() -> Self {
        Self { slot: Cell::new(None), recomputes: Cell::new(0) }
    }

    /// Return the cached value for `key`, computing it if the key moved on
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> T) -> T {
        if let Some((cached_key, value)) = self.slot.get() {
            if cached_key == key {
                return value;
            }
        }
        let value = compute();
        self.slot.set(Some((key, value)));
        self.recomputes.set(self.recomputes.get() + 1);
        value
    }

    /// How many times the value has been (re)built
    pub fn recomputes(&self) -> u32 {
        self.recomputes.get()
    }
}

impl<K: Copy + PartialEq, T: Copy> Default for Derived<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A matrix input together with the generation of its last write
#[derive(Debug, Clone, Copy)]
struct Versioned {
    value: Mat4,
    generation: u64,
}

impl Versioned {
    fn new() -> Self {
        Self { value: Mat4::IDENTITY, generation: 0 }
    }

    fn set(&mut self, m: Mat4) {
        self.value = m;
        self.generation += 1;
    }
}

/// Matrices needed by the geometry stage for one draw
#[derive(Debug, Clone, Copy)]
pub struct Transforms {
    pub model_view: Mat4,
    pub model_view_projection: Mat4,
    pub normal_matrix: Mat3,
    pub viewport: Mat3x4,
}

/// Device state block, mutated by the caller between draws
pub struct ParamBlock {
    world: Versioned,
    view: Versioned,
    projection: Versioned,
    clip: Versioned,

    world_inverse: Derived<u64, Option<Mat4>>,
    view_inverse: Derived<u64, Option<Mat4>>,
    projection_inverse: Derived<u64, Option<Mat4>>,
    clip_inverse: Derived<u64, Option<Mat4>>,
    model_view: Derived<(u64, u64), Mat4>,
    model_view_projection: Derived<(u64, u64, u64, u64), Mat4>,
    normal_matrix: Derived<(u64, u64), Mat3>,

    viewport: Viewport,
    viewport_matrix: Mat3x4,

    material: Material,
    textures: [Option<Rc<Texture>>; MAX_TEXTURE_UNITS],
    lights: [Option<Light>; MAX_LIGHTS],
}

impl ParamBlock {
    pub fn new(viewport: Viewport) -> Self {
        let mut block = Self {
            world: Versioned::new(),
            view: Versioned::new(),
            projection: Versioned::new(),
            clip: Versioned::new(),
            world_inverse: Derived::new(),
            view_inverse: Derived::new(),
            projection_inverse: Derived::new(),
            clip_inverse: Derived::new(),
            model_view: Derived::new(),
            model_view_projection: Derived::new(),
            normal_matrix: Derived::new(),
            viewport,
            viewport_matrix: Mat3x4::viewport(0.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            material: Material::default(),
            textures: Default::default(),
            lights: [None; MAX_LIGHTS],
        };
        block.set_viewport(viewport);
        block
    }

    // Transform inputs

    pub fn set_world(&mut self, m: Mat4) {
        self.world.set(m);
    }

    pub fn set_view(&mut self, m: Mat4) {
        self.view.set(m);
    }

    pub fn set_projection(&mut self, m: Mat4) {
        self.projection.set(m);
    }

    /// Extra post-projection transform applied after `projection`
    pub fn set_clip(&mut self, m: Mat4) {
        self.clip.set(m);
    }

    pub fn world(&self) -> Mat4 {
        self.world.value
    }

    pub fn view(&self) -> Mat4 {
        self.view.value
    }

    pub fn projection(&self) -> Mat4 {
        self.projection.value
    }

    pub fn clip(&self) -> Mat4 {
        self.clip.value
    }

    pub fn world_inverse(&self) -> Option<Mat4> {
        let w = &self.world;
        self.world_inverse.get_or_compute(w.generation, || w.value.inverse())
    }

    pub fn view_inverse(&self) -> Option<Mat4> {
        let v = &self.view;
        self.view_inverse.get_or_compute(v.generation, || v.value.inverse())
    }

    pub fn projection_inverse(&self) -> Option<Mat4> {
        let p = &self.projection;
        self.projection_inverse.get_or_compute(p.generation, || p.value.inverse())
    }

    pub fn clip_inverse(&self) -> Option<Mat4> {
        let c = &self.clip;
        self.clip_inverse.get_or_compute(c.generation, || c.value.inverse())
    }

    // Derived composites

    pub fn model_view(&self) -> Mat4 {
        let key = (self.world.generation, self.view.generation);
        self.model_view
            .get_or_compute(key, || self.view.value * self.world.value)
    }

    pub fn model_view_projection(&self) -> Mat4 {
        let key = (
            self.world.generation,
            self.view.generation,
            self.projection.generation,
            self.clip.generation,
        );
        self.model_view_projection.get_or_compute(key, || {
            self.clip.value * self.projection.value * self.model_view()
        })
    }

    /// Inverse-transpose of the model-view rotation block
    pub fn normal_matrix(&self) -> Mat3 {
        let key = (self.world.generation, self.view.generation);
        self.normal_matrix.get_or_compute(key, || {
            let mv = Mat3::from_mat4(&self.model_view());
            mv.inverse().map(|inv| inv.transpose()).unwrap_or(mv)
        })
    }

    pub fn transforms(&self) -> Transforms {
        Transforms {
            model_view: self.model_view(),
            model_view_projection: self.model_view_projection(),
            normal_matrix: self.normal_matrix(),
            viewport: self.viewport_matrix,
        }
    }

    /// Recompute counts of (model-view, model-view-projection, normal matrix)
    pub fn derived_recomputes(&self) -> (u32, u32, u32) {
        (
            self.model_view.recomputes(),
            self.model_view_projection.recomputes(),
            self.normal_matrix.recomputes(),
        )
    }

    // Viewport

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.viewport_matrix = Mat3x4::viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            viewport.min_z,
            viewport.max_z,
        );
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // Material, textures, lights

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn set_texture(&mut self, unit: usize, texture: Option<Rc<Texture>>) -> Result<(), RenderError> {
        let slot = self
            .textures
            .get_mut(unit)
            .ok_or(RenderError::TextureUnitOutOfRange { unit, max: MAX_TEXTURE_UNITS })?;
        *slot = texture;
        Ok(())
    }

    pub fn texture(&self, unit: usize) -> Result<Option<&Rc<Texture>>, RenderError> {
        self.textures
            .get(unit)
            .map(Option::as_ref)
            .ok_or(RenderError::TextureUnitOutOfRange { unit, max: MAX_TEXTURE_UNITS })
    }

    /// Bound textures in unit order
    pub fn bound_textures(&self) -> impl Iterator<Item = &Texture> {
        self.textures.iter().flatten().map(|t| &**t)
    }

    pub fn set_light(&mut self, unit: usize, light: Option<Light>) -> Result<(), RenderError> {
        let slot = self
            .lights
            .get_mut(unit)
            .ok_or(RenderError::LightUnitOutOfRange { unit, max: MAX_LIGHTS })?;
        *slot = light;
        Ok(())
    }

    pub fn light(&self, unit: usize) -> Result<Option<&Light>, RenderError> {
        self.lights
            .get(unit)
            .map(Option::as_ref)
            .ok_or(RenderError::LightUnitOutOfRange { unit, max: MAX_LIGHTS })
    }

    pub fn bound_lights(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter().flatten()
    }

    /// Camera position in world space, if the view matrix is invertible
    pub fn eye_position(&self) -> Option<Vec3> {
        self.view_inverse()
            .map(|inv| inv.transform_point(Vec3::ZERO).truncate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::Color;

    fn block() -> ParamBlock {
        ParamBlock::new(Viewport::new(64, 64))
    }

    #[test]
    fn test_derived_recomputes_once_per_change() {
        let mut p = block();
        p.set_world(Mat4::translation(Vec3::new(1.0, 0.0, 0.0)));
        p.set_view(Mat4::translation(Vec3::new(0.0, 0.0, 5.0)));

        let first = p.model_view_projection();
        let again = p.model_view_projection();
        assert_eq!(first, again);
        assert_eq!(p.derived_recomputes(), (1, 1, 0));

        p.set_projection(Mat4::perspective_lh(1.0, 1.0, 0.5, 50.0));
        p.model_view_projection();
        p.model_view_projection();
        // Only the projection moved, so model-view stays cached
        assert_eq!(p.derived_recomputes(), (1, 2, 0));

        p.normal_matrix();
        p.normal_matrix();
        assert_eq!(p.derived_recomputes(), (1, 2, 1));
    }

    #[test]
    fn test_never_stale() {
        let mut p = block();
        p.model_view();
        p.set_world(Mat4::translation(Vec3::new(0.0, 2.0, 0.0)));
        let mv = p.model_view();
        let pt = mv.transform_point(Vec3::ZERO);
        assert_eq!(pt.y, 2.0);
    }

    #[test]
    fn test_normal_matrix_undoes_nonuniform_scale() {
        let mut p = block();
        p.set_world(Mat4::scaling(Vec3::new(2.0, 1.0, 1.0)));
        // Plane x + y = 1 has normal (1,1,0); after scaling x by 2 the plane is
        // x/2 + y = 1 with normal (0.5, 1, 0)
        let n = p.normal_matrix().mul_vec3(Vec3::new(1.0, 1.0, 0.0)).normalize();
        let expected = Vec3::new(0.5, 1.0, 0.0).normalize();
        assert!((n - expected).len() < 1e-5);
    }

    #[test]
    fn test_inverses() {
        let mut p = block();
        p.set_view(Mat4::look_at_lh(Vec3::new(3.0, 1.0, -4.0), Vec3::ZERO, Vec3::UP));
        let eye = p.eye_position().unwrap();
        assert!((eye - Vec3::new(3.0, 1.0, -4.0)).len() < 1e-4);
        p.set_clip(Mat4::scaling(Vec3::new(0.0, 1.0, 1.0)));
        assert!(p.clip_inverse().is_none());
        assert!(p.world_inverse().is_some() && p.projection_inverse().is_some());
    }

    #[test]
    fn test_unit_ranges() {
        let mut p = block();
        let light = Light::point(Vec3::ZERO, Color::WHITE);
        assert!(p.set_light(MAX_LIGHTS - 1, Some(light)).is_ok());
        assert!(matches!(
            p.set_light(MAX_LIGHTS, Some(light)),
            Err(RenderError::LightUnitOutOfRange { .. })
        ));
        let tex = Rc::new(Texture::checkerboard(2, 2, 1, Color::WHITE, Color::BLACK));
        assert!(p.set_texture(0, Some(tex.clone())).is_ok());
        assert!(matches!(
            p.set_texture(MAX_TEXTURE_UNITS, Some(tex)),
            Err(RenderError::TextureUnitOutOfRange { .. })
        ));
        assert_eq!(p.bound_textures().count(), 1);
        assert_eq!(p.bound_lights().count(), 1);
        assert!(p.texture(MAX_TEXTURE_UNITS).is_err());
    }
}
