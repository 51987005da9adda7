//! Per-pixel shading: base color resolve and multi-light accumulation
//!
//! Lighting happens in view space, where the eye sits at the origin.

use super::math::{Mat4, Vec3};
use super::scan::Attributes;
use super::types::{Attenuation, Color, Light, Material, Texture};

#[derive(Debug, Clone, Copy, PartialEq)]
enum LightKind {
    Point(Vec3),
    /// Unit vector towards the light
    Directional(Vec3),
}

/// A bound light moved into view space for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLight {
    kind: LightKind,
    attenuation: Attenuation,
    ambient: Color,
    diffuse: Color,
    specular: Color,
}

impl ViewLight {
    pub fn from_world(light: &Light, view: &Mat4) -> Self {
        let p = light.position.truncate();
        let kind = if light.is_directional() {
            LightKind::Directional(view.transform_dir(p).normalize())
        } else {
            let h = view.transform_point(p.scale(1.0 / light.position.w));
            LightKind::Point(h.truncate())
        };
        Self {
            kind,
            attenuation: light.attenuation,
            ambient: light.ambient,
            diffuse: light.diffuse,
            specular: light.specular,
        }
    }

    /// Unit direction from `pos` to the light and the attenuation factor there
    fn incidence(&self, pos: Vec3) -> (Vec3, f32) {
        match self.kind {
            LightKind::Directional(dir) => (dir, 1.0),
            LightKind::Point(at) => {
                let to_light = at - pos;
                let dist = to_light.len();
                (to_light.normalize(), self.attenuation.factor(dist))
            }
        }
    }
}

/// One light's attenuated contribution, split by term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightTerms {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
}

impl LightTerms {
    pub fn sum(&self) -> Color {
        self.ambient.add_rgb(self.diffuse).add_rgb(self.specular)
    }
}

/// Contribution of `light` at view-space `pos` with unit `normal`
pub fn light_terms(light: &ViewLight, material: &Material, base: Color, pos: Vec3, normal: Vec3) -> LightTerms {
    let (l, attenuation) = light.incidence(pos);
    let n_dot_l = normal.dot(l).max(0.0);

    let ambient = material.ambient.modulate(light.ambient);
    let diffuse = base.modulate(light.diffuse).scale_rgb(n_dot_l);

    let specular = if n_dot_l > 0.0 {
        let to_eye = (-pos).normalize();
        let half = (l + to_eye).normalize();
        let n_dot_h = normal.dot(half).max(0.0);
        material
            .specular
            .modulate(light.specular)
            .scale_rgb(n_dot_h.powf(material.shininess))
    } else {
        Color::TRANSPARENT
    };

    LightTerms {
        ambient: ambient.scale_rgb(attenuation),
        diffuse: diffuse.scale_rgb(attenuation),
        specular: specular.scale_rgb(attenuation),
    }
}

/// Everything a pixel needs from the current state, resolved once per draw
pub struct Shader<'a> {
    pub material: &'a Material,
    pub lights: &'a [ViewLight],
    pub textures: &'a [&'a Texture],
}

impl Shader<'_> {
    /// Vertex color, else the average of every bound texture, else the
    /// material diffuse color
    pub fn base_color(&self, attrs: &Attributes) -> Color {
        if let Some(c) = attrs.color {
            return Color::from_vec4(c);
        }
        if let (Some(uv), false) = (attrs.texcoord, self.textures.is_empty()) {
            let sum = self
                .textures
                .iter()
                .map(|t| t.sample(uv.x, uv.y).to_vec4())
                .fold(Color::TRANSPARENT.to_vec4(), |acc, c| acc + c);
            return Color::from_vec4(sum.scale(1.0 / self.textures.len() as f32));
        }
        self.material.diffuse
    }

    /// Final clamped color of a pixel
    pub fn shade(&self, attrs: &Attributes, face_normal: Vec3) -> Color {
        let base = self.base_color(attrs);
        if !self.material.lighting {
            return base.clamp();
        }

        let pos = attrs.view_pos.unwrap_or(Vec3::ZERO);
        let normal = attrs.normal.map(Vec3::normalize).unwrap_or(face_normal);

        let mut lit = Color::with_alpha(0.0, 0.0, 0.0, base.a);
        for light in self.lights {
            lit = lit.add_rgb(light_terms(light, self.material, base, pos, normal).sum());
        }
        if !self.lights.is_empty() {
            lit = lit.scale_rgb(1.0 / self.lights.len() as f32);
        }

        lit.add_rgb(self.material.emissive).clamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::math::{Vec2, Vec4};

    fn lit_material() -> Material {
        Material {
            diffuse: Color::new(0.5, 0.8, 1.0),
            lighting: true,
            ..Default::default()
        }
    }

    fn attrs(pos: Vec3, normal: Vec3) -> Attributes {
        Attributes { view_pos: Some(pos), normal: Some(normal), color: None, texcoord: None }
    }

    fn close(a: Color, b: Color) -> bool {
        (a.r - b.r).abs() < 1e-5 && (a.g - b.g).abs() < 1e-5 && (a.b - b.b).abs() < 1e-5
    }

    #[test]
    fn test_head_on_point_light() {
        let light = ViewLight::from_world(
            &Light::point(Vec3::ZERO, Color::new(0.6, 0.5, 1.0)),
            &Mat4::IDENTITY,
        );
        let mat = lit_material();
        let terms = light_terms(&light, &mat, mat.diffuse, Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(close(terms.diffuse, Color::new(0.3, 0.4, 1.0)));
    }

    #[test]
    fn test_grazing_light_has_no_diffuse_or_specular() {
        let mut light = Light::point(Vec3::ZERO, Color::WHITE);
        light.specular = Color::WHITE;
        let light = ViewLight::from_world(&light, &Mat4::IDENTITY);
        let mat = Material { specular: Color::WHITE, shininess: 8.0, ..lit_material() };
        // Surface turned 90 degrees: normal perpendicular to the light
        let terms = light_terms(&light, &mat, mat.diffuse, Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(close(terms.diffuse, Color::BLACK));
        assert!(close(terms.specular, Color::BLACK));
    }

    #[test]
    fn test_attenuation_scales_every_term() {
        let mut light = Light::point(Vec3::ZERO, Color::WHITE);
        light.ambient = Color::WHITE;
        light.attenuation = Attenuation { constant: 0.0, linear: 0.0, quadratic: 1.0 };
        let light = ViewLight::from_world(&light, &Mat4::IDENTITY);
        let mat = Material { ambient: Color::WHITE, ..lit_material() };
        let terms = light_terms(&light, &mat, Color::WHITE, Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(close(terms.diffuse, Color::new(0.25, 0.25, 0.25)));
        assert!(close(terms.ambient, Color::new(0.25, 0.25, 0.25)));
    }

    #[test]
    fn test_directional_light_follows_view() {
        // Camera turned so world +x is view -z; light from world +x
        let view = Mat4::rotation_y(std::f32::consts::FRAC_PI_2);
        let light = ViewLight::from_world(&Light::directional(Vec3::new(1.0, 0.0, 0.0), Color::WHITE), &view);
        let mat = lit_material();
        let n = view.transform_dir(Vec3::new(1.0, 0.0, 0.0));
        let terms = light_terms(&light, &mat, Color::WHITE, Vec3::new(3.0, 1.0, 9.0), n);
        assert!(close(terms.diffuse, Color::WHITE));
    }

    #[test]
    fn test_specular_peaks_on_mirror_direction() {
        let mut light = Light::point(Vec3::ZERO, Color::BLACK);
        light.specular = Color::WHITE;
        let light = ViewLight::from_world(&light, &Mat4::IDENTITY);
        let mat = Material { specular: Color::new(1.0, 0.5, 0.0), shininess: 16.0, ..lit_material() };
        // Light and eye coincide, so H = L = N
        let terms = light_terms(&light, &mat, Color::WHITE, Vec3::new(0.0, 0.0, 4.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(close(terms.specular, Color::new(1.0, 0.5, 0.0)));
    }

    #[test]
    fn test_lights_averaged_and_emissive_added() {
        let a = ViewLight::from_world(&Light::point(Vec3::ZERO, Color::new(0.8, 0.0, 0.0)), &Mat4::IDENTITY);
        let b = ViewLight::from_world(&Light::point(Vec3::ZERO, Color::new(0.0, 0.4, 0.0)), &Mat4::IDENTITY);
        let mat = Material {
            diffuse: Color::WHITE,
            emissive: Color::new(0.0, 0.0, 0.25),
            lighting: true,
            ..Default::default()
        };
        let lights = [a, b];
        let shader = Shader { material: &mat, lights: &lights, textures: &[] };
        let c = shader.shade(&attrs(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0)), Vec3::ZERO);
        assert!(close(c, Color::new(0.4, 0.2, 0.25)));
    }

    #[test]
    fn test_no_lights_leaves_emissive() {
        let mat = Material { emissive: Color::new(0.1, 0.2, 0.3), ..lit_material() };
        let shader = Shader { material: &mat, lights: &[], textures: &[] };
        let c = shader.shade(&attrs(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0)), Vec3::ZERO);
        assert!(close(c, Color::new(0.1, 0.2, 0.3)));
    }

    #[test]
    fn test_base_color_priority() {
        let red = Texture::checkerboard(1, 1, 1, Color::RED, Color::RED);
        let blue = Texture::checkerboard(1, 1, 1, Color::BLUE, Color::BLUE);
        let mat = Material::flat(Color::GREEN);
        let textures = [&red, &blue];
        let shader = Shader { material: &mat, lights: &[], textures: &textures };

        let mut a = Attributes { view_pos: None, normal: None, color: None, texcoord: None };
        assert_eq!(shader.shade(&a, Vec3::ZERO), Color::GREEN);

        a.texcoord = Some(Vec2::new(0.5, 0.5));
        assert!(close(shader.shade(&a, Vec3::ZERO), Color::new(0.5, 0.0, 0.5)));

        a.color = Some(Vec4::new(1.0, 1.0, 0.0, 1.0));
        assert_eq!(shader.shade(&a, Vec3::ZERO), Color::new(1.0, 1.0, 0.0));

        // Texcoords without any bound texture fall back to the material
        let bare = Shader { material: &mat, lights: &[], textures: &[] };
        a.color = None;
        assert_eq!(bare.shade(&a, Vec3::ZERO), Color::GREEN);
    }

    #[test]
    fn test_missing_normal_uses_face_normal() {
        let light = ViewLight::from_world(&Light::point(Vec3::ZERO, Color::WHITE), &Mat4::IDENTITY);
        let mat = lit_material();
        let lights = [light];
        let shader = Shader { material: &mat, lights: &lights, textures: &[] };
        let a = Attributes { view_pos: Some(Vec3::new(0.0, 0.0, 2.0)), normal: None, color: None, texcoord: None };
        let facing = shader.shade(&a, Vec3::new(0.0, 0.0, -1.0));
        let away = shader.shade(&a, Vec3::new(0.0, 0.0, 1.0));
        assert!(close(facing, mat.diffuse));
        assert!(close(away, Color::BLACK));
    }
}
