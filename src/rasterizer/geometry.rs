//! Geometry stage: per-triangle transform, culling and projection
//!
//! Every rejection here is a normal outcome, reported as [`Setup::Culled`]
//! and counted by the device, never an error.

use super::buffer::RawVertex;
use super::math::{Vec2, Vec3, Vec4};
use super::params::Transforms;

/// Largest device coordinate the 28.4 edge setup accepts
pub const GUARD_BAND: f32 = 4_194_304.0;

/// A vertex after projection, ready for scan conversion.
///
/// Optional attributes are stored pre-multiplied by `inv_w` so that linear
/// interpolation in screen space followed by a divide by the interpolated
/// `inv_w` gives the perspective-correct value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub inv_w: f32,
    pub view_pos: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub color: Option<Vec4>,
    pub texcoord: Option<Vec2>,
}

impl DevicePoint {
    /// Bare device-space point with `w = 1` and no attributes
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            inv_w: 1.0,
            view_pos: None,
            normal: None,
            color: None,
            texcoord: None,
        }
    }
}

/// Why a triangle produced no pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullReason {
    /// Facing away from the viewer
    BackFace,
    /// Vertices on both sides of the eye plane (w signs disagree)
    StraddlesEye,
    /// Entirely beyond one clip bound
    Offscreen,
    /// Device coordinates too large for the fixed-point edge setup
    GuardBand,
}

/// Accepted triangle in device space
#[derive(Debug, Clone, Copy)]
pub struct DeviceTriangle {
    pub points: [DevicePoint; 3],
    /// Unit view-space face normal, used when vertices carry no normals
    pub face_normal: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub enum Setup {
    Visible(DeviceTriangle),
    Culled(CullReason),
}

#[derive(Debug, Clone, Copy)]
pub struct SetupOptions {
    pub cull_backfaces: bool,
    /// Carry the view-space position through (only lighting needs it)
    pub view_position: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self { cull_backfaces: true, view_position: false }
    }
}

/// Run one triangle through transform, culling and projection
pub fn setup_triangle(verts: &[RawVertex; 3], xf: &Transforms, opts: SetupOptions) -> Setup {
    let view = verts.map(|v| xf.model_view.transform_point(v.position).truncate());

    let face = (view[1] - view[0]).cross(view[2] - view[0]);
    if opts.cull_backfaces && view[0].dot(face) >= 0.0 {
        return Setup::Culled(CullReason::BackFace);
    }

    let clip = verts.map(|v| xf.model_view_projection.transform_point(v.position));

    // NaN or infinite input never maps to a device coordinate
    if !clip.iter().all(|c| c.x.is_finite() && c.y.is_finite() && c.z.is_finite() && c.w.is_finite()) {
        return Setup::Culled(CullReason::GuardBand);
    }

    let front = clip.iter().filter(|c| c.w > 0.0).count();
    let behind = clip.iter().filter(|c| c.w < 0.0).count();
    if front != 3 && behind != 3 {
        return Setup::Culled(CullReason::StraddlesEye);
    }

    let inv_w = clip.map(|c| 1.0 / c.w);
    let ndc: [Vec3; 3] = std::array::from_fn(|i| clip[i].truncate().scale(inv_w[i]));

    if outside_one_bound(&ndc) {
        return Setup::Culled(CullReason::Offscreen);
    }

    let device = ndc.map(|p| xf.viewport.mul_vec4(p.extend(1.0)));
    let in_guard_band = |v: f32| v.is_finite() && v.abs() <= GUARD_BAND;
    if !device.iter().all(|d| in_guard_band(d.x) && in_guard_band(d.y)) {
        return Setup::Culled(CullReason::GuardBand);
    }

    let points = std::array::from_fn(|i| {
        let v = &verts[i];
        let q = inv_w[i];
        DevicePoint {
            x: device[i].x,
            y: device[i].y,
            z: device[i].z,
            inv_w: q,
            view_pos: opts.view_position.then(|| view[i].scale(q)),
            normal: v.normal.map(|n| xf.normal_matrix.mul_vec3(n).scale(q)),
            color: v.color.map(|c| c.scale(q)),
            texcoord: v.texcoord.map(|t| t.scale(q)),
        }
    });

    Setup::Visible(DeviceTriangle { points, face_normal: face.normalize() })
}

/// True when all three vertices lie past the same x, y or z bound
fn outside_one_bound(ndc: &[Vec3; 3]) -> bool {
    let all = |f: &dyn Fn(&Vec3) -> bool| ndc.iter().all(f);
    all(&|p| p.x < -1.0)
        || all(&|p| p.x > 1.0)
        || all(&|p| p.y < -1.0)
        || all(&|p| p.y > 1.0)
        || all(&|p| p.z < 0.0)
        || all(&|p| p.z > 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{Mat4, ParamBlock, Viewport};

    fn raw(x: f32, y: f32, z: f32) -> RawVertex {
        RawVertex { position: Vec3::new(x, y, z), normal: None, color: None, texcoord: None }
    }

    fn perspective() -> Transforms {
        let mut p = ParamBlock::new(Viewport::new(100, 100));
        p.set_projection(Mat4::perspective_lh(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0));
        p.transforms()
    }

    /// Clockwise as seen from the eye (front facing), in front of the camera
    fn front_tri(z: f32) -> [RawVertex; 3] {
        [raw(-1.0, -1.0, z), raw(-1.0, 1.0, z), raw(1.0, 1.0, z)]
    }

    #[test]
    fn test_front_face_accepted() {
        let setup = setup_triangle(&front_tri(5.0), &perspective(), SetupOptions::default());
        let Setup::Visible(tri) = setup else { panic!("culled: {:?}", setup) };
        // Device y flips, NDC (-0.2, 0.2) -> (40, 40)
        assert!((tri.points[1].x - 40.0).abs() < 1e-3);
        assert!((tri.points[1].y - 40.0).abs() < 1e-3);
        assert!((tri.points[0].inv_w - 0.2).abs() < 1e-6);
        assert!((tri.face_normal - Vec3::new(0.0, 0.0, -1.0)).len() < 1e-6);
    }

    #[test]
    fn test_back_face_culled_and_optional() {
        let [a, b, c] = front_tri(5.0);
        let back = [a, c, b];
        let xf = perspective();
        assert!(matches!(
            setup_triangle(&back, &xf, SetupOptions::default()),
            Setup::Culled(CullReason::BackFace)
        ));
        let no_cull = SetupOptions { cull_backfaces: false, ..Default::default() };
        assert!(matches!(setup_triangle(&back, &xf, no_cull), Setup::Visible(_)));
    }

    #[test]
    fn test_straddling_eye_plane_rejected() {
        let tri = [raw(-1.0, -1.0, 5.0), raw(-1.0, 1.0, -5.0), raw(1.0, 1.0, 5.0)];
        let opts = SetupOptions { cull_backfaces: false, ..Default::default() };
        assert!(matches!(
            setup_triangle(&tri, &perspective(), opts),
            Setup::Culled(CullReason::StraddlesEye)
        ));
    }

    #[test]
    fn test_offscreen_rejected() {
        let xf = perspective();
        // Entirely to the right of the frustum
        let right = [raw(20.0, -1.0, 5.0), raw(20.0, 1.0, 5.0), raw(22.0, 1.0, 5.0)];
        assert!(matches!(
            setup_triangle(&right, &xf, SetupOptions::default()),
            Setup::Culled(CullReason::Offscreen)
        ));
        // Beyond the far plane
        assert!(matches!(
            setup_triangle(&front_tri(500.0), &xf, SetupOptions::default()),
            Setup::Culled(CullReason::Offscreen)
        ));
        // In front of the near plane but past the eye: all z < 0
        assert!(matches!(
            setup_triangle(&front_tri(0.5), &xf, SetupOptions::default()),
            Setup::Culled(CullReason::Offscreen)
        ));
    }

    #[test]
    fn test_guard_band_rejects_huge_and_nan() {
        let xf = ParamBlock::new(Viewport::new(64, 64)).transforms();
        let opts = SetupOptions { cull_backfaces: false, ..Default::default() };

        // Device x lands near 3.2e7, past what 28.4 edges can hold
        let huge = [raw(-0.5, 0.5, 0.5), raw(1.0e6, 0.5, 0.5), raw(-0.5, -0.5, 0.5)];
        assert!(matches!(setup_triangle(&huge, &xf, opts), Setup::Culled(CullReason::GuardBand)));
        let huge_neg = [raw(-1.0e6, 0.5, 0.5), raw(0.5, 0.5, 0.5), raw(0.5, -0.5, 0.5)];
        assert!(matches!(setup_triangle(&huge_neg, &xf, opts), Setup::Culled(CullReason::GuardBand)));

        let nan = [raw(-0.5, 0.5, 0.5), raw(f32::NAN, 0.5, 0.5), raw(-0.5, -0.5, 0.5)];
        assert!(matches!(setup_triangle(&nan, &xf, opts), Setup::Culled(CullReason::GuardBand)));

        // Large but inside the band still goes through
        let wide = [raw(-0.5, 0.5, 0.5), raw(1.0e4, 0.5, 0.5), raw(-0.5, -0.5, 0.5)];
        assert!(matches!(setup_triangle(&wide, &xf, opts), Setup::Visible(_)));
    }

    #[test]
    fn test_attributes_premultiplied_by_inv_w() {
        let mut tri = front_tri(4.0);
        for v in tri.iter_mut() {
            v.texcoord = Some(Vec2::new(1.0, 0.5));
            v.color = Some(Vec4::new(1.0, 0.0, 0.0, 1.0));
            v.normal = Some(Vec3::new(0.0, 0.0, -1.0));
        }
        let opts = SetupOptions { view_position: true, ..Default::default() };
        let Setup::Visible(t) = setup_triangle(&tri, &perspective(), opts) else {
            panic!("culled")
        };
        let p = t.points[0];
        assert!((p.inv_w - 0.25).abs() < 1e-6);
        assert_eq!(p.texcoord, Some(Vec2::new(0.25, 0.125)));
        assert_eq!(p.color, Some(Vec4::new(0.25, 0.0, 0.0, 0.25)));
        assert!((p.view_pos.unwrap() - Vec3::new(-0.25, -0.25, 1.0)).len() < 1e-6);
        assert!((p.normal.unwrap() - Vec3::new(0.0, 0.0, -0.25)).len() < 1e-6);
    }
}
