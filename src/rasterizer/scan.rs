//! Half-edge scan converter
//!
//! Vertices are snapped to 28.4 fixed point and each edge becomes a linear
//! function `E(x, y) = c + dx*y - dy*x` that is positive inside the triangle.
//! The functions are evaluated once at the bounding box origin in 56.8 and
//! then stepped: one pixel right subtracts `dy`, one scanline down adds `dx`.
//! Pixel sample points sit on integer coordinates.
//!
//! Fill rule: top and left edges own the pixels lying exactly on them, so
//! triangles sharing an edge never both cover (or both miss) a pixel on it.

use super::fixed::{Acc8, Sub4};
use super::geometry::DevicePoint;
use super::math::{Vec2, Vec3, Vec4};

/// Interpolated floats beyond z and 1/w: view position, normal, color, texcoord
pub const MAX_VARYINGS: usize = 12;

const MAX_PLANES: usize = MAX_VARYINGS + 2;

/// Where each optional attribute lives in the packed varying array
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaryingLayout {
    view_pos: Option<usize>,
    normal: Option<usize>,
    color: Option<usize>,
    texcoord: Option<usize>,
    len: usize,
}

impl VaryingLayout {
    /// Layout of the attributes present on `p`
    pub fn of(p: &DevicePoint) -> Self {
        let mut layout = VaryingLayout::default();
        let mut take = |present: bool, n: usize| {
            present.then(|| {
                let at = layout.len;
                layout.len += n;
                at
            })
        };
        let view_pos = take(p.view_pos.is_some(), 3);
        let normal = take(p.normal.is_some(), 3);
        let color = take(p.color.is_some(), 4);
        let texcoord = take(p.texcoord.is_some(), 2);
        VaryingLayout { view_pos, normal, color, texcoord, ..layout }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn pack(&self, p: &DevicePoint, out: &mut [f32]) {
        if let (Some(at), Some(v)) = (self.view_pos, p.view_pos) {
            out[at..at + 3].copy_from_slice(&[v.x, v.y, v.z]);
        }
        if let (Some(at), Some(n)) = (self.normal, p.normal) {
            out[at..at + 3].copy_from_slice(&[n.x, n.y, n.z]);
        }
        if let (Some(at), Some(c)) = (self.color, p.color) {
            out[at..at + 4].copy_from_slice(&[c.x, c.y, c.z, c.w]);
        }
        if let (Some(at), Some(t)) = (self.texcoord, p.texcoord) {
            out[at..at + 2].copy_from_slice(&[t.x, t.y]);
        }
    }
}

/// Attributes recovered at a pixel (divided back by 1/w)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attributes {
    pub view_pos: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub color: Option<Vec4>,
    pub texcoord: Option<Vec2>,
}

/// One covered pixel
#[derive(Debug)]
pub struct Fragment<'a> {
    pub x: usize,
    pub y: usize,
    pub z: f32,
    /// Interpolated 1/w
    pub inv_w: f32,
    varyings: &'a [f32],
    layout: &'a VaryingLayout,
}

impl Fragment<'_> {
    /// Perspective-correct attribute values at this pixel
    pub fn recover(&self) -> Attributes {
        let w = 1.0 / self.inv_w;
        let v = self.varyings;
        let vec3 = |at: usize| Vec3::new(v[at], v[at + 1], v[at + 2]).scale(w);
        Attributes {
            view_pos: self.layout.view_pos.map(vec3),
            normal: self.layout.normal.map(vec3),
            color: self.layout.color.map(|at| Vec4::new(v[at], v[at + 1], v[at + 2], v[at + 3]).scale(w)),
            texcoord: self.layout.texcoord.map(|at| Vec2::new(v[at], v[at + 1]).scale(w)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HalfEdge {
    dx: Sub4,
    dy: Sub4,
    /// Constant term without the fill bias
    c: Acc8,
    /// Fill-rule bias (0 or one 56.8 unit)
    bias: Acc8,
}

impl HalfEdge {
    fn new(a: (Sub4, Sub4), b: (Sub4, Sub4)) -> Self {
        let dx = a.0 - b.0;
        let dy = a.1 - b.1;
        let c = wide(dy, a.0) - wide(dx, a.1);
        let owns_boundary = dy.is_negative() || (dy.is_zero() && dx.is_positive());
        let bias = if owns_boundary { Acc8::epsilon() } else { Acc8::default() };
        Self { dx, dy, c, bias }
    }

    /// Unbiased value at a point
    fn eval(&self, x: Sub4, y: Sub4) -> Acc8 {
        self.c + wide(self.dx, y) - wide(self.dy, x)
    }

    /// Change per pixel to the right
    fn step_x(&self) -> Acc8 {
        -wide(self.dy, Sub4::one())
    }

    /// Change per scanline down
    fn step_y(&self) -> Acc8 {
        wide(self.dx, Sub4::one())
    }
}

fn wide(a: Sub4, b: Sub4) -> Acc8 {
    a.mul_denorm(b)
}

/// Linear function of screen position for one interpolated quantity
#[derive(Debug, Clone, Copy, Default)]
struct Plane {
    origin: f32,
    step_x: f32,
    step_y: f32,
}

/// Scan-convert a triangle into `emit`, clipped to a `width` x `height`
/// surface. Returns the number of covered pixels. Winding does not matter.
pub fn rasterize_triangle<F>(points: &[DevicePoint; 3], width: usize, height: usize, mut emit: F) -> usize
where
    F: FnMut(&Fragment<'_>),
{
    let snapped = points.map(|p| (Sub4::from_f32(p.x), Sub4::from_f32(p.y)));

    // Twice the signed area in 24.8; the edge functions below are positive
    // inside when it is negative, so flip the winding otherwise.
    let [p0, p1, p2] = snapped;
    let area2 = wide(p1.0 - p0.0, p2.1 - p0.1) - wide(p2.0 - p0.0, p1.1 - p0.1);
    if area2.is_zero() {
        return 0;
    }
    let order = if area2.is_positive() { [0, 2, 1] } else { [0, 1, 2] };
    let v = order.map(|i| snapped[i]);
    let pts = order.map(|i| &points[i]);

    // Edge i is opposite vertex i
    let edges = [
        HalfEdge::new(v[1], v[2]),
        HalfEdge::new(v[2], v[0]),
        HalfEdge::new(v[0], v[1]),
    ];

    let min_x = v.iter().map(|p| p.0).min().unwrap_or_default().ceil_to_int().max(0);
    let min_y = v.iter().map(|p| p.1).min().unwrap_or_default().ceil_to_int().max(0);
    let max_x = v.iter().map(|p| p.0).max().unwrap_or_default().ceil_to_int().min(width as i64);
    let max_y = v.iter().map(|p| p.1).max().unwrap_or_default().ceil_to_int().min(height as i64);
    if min_x >= max_x || min_y >= max_y {
        return 0;
    }

    let ox = Sub4::from_int(min_x);
    let oy = Sub4::from_int(min_y);

    // Interpolation weights from the unbiased edge values at the origin,
    // normalised by twice the area (the value of each edge at its opposite
    // vertex).
    let area = edges[0].eval(v[0].0, v[0].1).raw() as f64;
    let weight_origin = edges.map(|e| e.eval(ox, oy).raw() as f64 / area);
    let weight_dx = edges.map(|e| e.step_x().raw() as f64 / area);
    let weight_dy = edges.map(|e| e.step_y().raw() as f64 / area);

    let layout = VaryingLayout::of(pts[0]);
    let plane_count = 2 + layout.len();
    let mut values = [[0.0f32; MAX_PLANES]; 3];
    for (vals, p) in values.iter_mut().zip(pts.iter()) {
        vals[0] = p.z;
        vals[1] = p.inv_w;
        layout.pack(p, &mut vals[2..]);
    }

    let mut planes = [Plane::default(); MAX_PLANES];
    for (k, plane) in planes.iter_mut().enumerate().take(plane_count) {
        let at = |w: &[f64; 3]| -> f32 {
            (0..3).map(|i| w[i] * values[i][k] as f64).sum::<f64>() as f32
        };
        *plane = Plane {
            origin: at(&weight_origin),
            step_x: at(&weight_dx),
            step_y: at(&weight_dy),
        };
    }

    let step_x = edges.map(|e| e.step_x());
    let step_y = edges.map(|e| e.step_y());
    let mut row_edges = edges.map(|e| e.eval(ox, oy) + e.bias);
    let mut row_values = [0.0f32; MAX_PLANES];
    for k in 0..plane_count {
        row_values[k] = planes[k].origin;
    }

    let mut covered = 0;
    for y in min_y..max_y {
        let mut e = row_edges;
        let mut vals = row_values;

        for x in min_x..max_x {
            if e[0].is_positive() && e[1].is_positive() && e[2].is_positive() {
                let frag = Fragment {
                    x: x as usize,
                    y: y as usize,
                    z: vals[0],
                    inv_w: vals[1],
                    varyings: &vals[2..plane_count],
                    layout: &layout,
                };
                emit(&frag);
                covered += 1;
            }

            for i in 0..3 {
                e[i] += step_x[i];
            }
            for k in 0..plane_count {
                vals[k] += planes[k].step_x;
            }
        }

        for i in 0..3 {
            row_edges[i] += step_y[i];
        }
        for k in 0..plane_count {
            row_values[k] += planes[k].step_y;
        }
    }

    covered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::geometry::{setup_triangle, Setup, SetupOptions};
    use crate::rasterizer::buffer::RawVertex;
    use crate::rasterizer::{Mat4, ParamBlock, Viewport};

    const W: usize = 64;
    const H: usize = 64;

    fn pt(x: f32, y: f32) -> DevicePoint {
        DevicePoint::new(x, y, 0.5)
    }

    fn coverage(tris: &[[DevicePoint; 3]]) -> Vec<u8> {
        let mut counts = vec![0u8; W * H];
        for tri in tris {
            rasterize_triangle(tri, W, H, |f| counts[f.y * W + f.x] += 1);
        }
        counts
    }

    #[test]
    fn test_shared_edge_tiles_exactly() {
        let a = [pt(10.0, 10.0), pt(30.0, 10.0), pt(30.0, 30.0)];
        let b = [pt(10.0, 10.0), pt(30.0, 30.0), pt(10.0, 30.0)];
        let counts = coverage(&[a, b]);

        // Every diagonal pixel on the shared edge is covered exactly once
        for k in 11..30 {
            assert_eq!(counts[k * W + k], 1, "diagonal pixel {}", k);
        }
        // And the square as a whole follows the top-left rule
        for y in 0..H {
            for x in 0..W {
                let inside = (10..30).contains(&x) && (10..30).contains(&y);
                assert_eq!(counts[y * W + x], inside as u8, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_fan_has_no_gaps_or_overlaps() {
        let center = pt(32.3, 31.7);
        let ring: Vec<DevicePoint> = (0..7)
            .map(|i| {
                let a = i as f32 / 7.0 * std::f32::consts::TAU + 0.1;
                pt(32.3 + 20.0 * a.cos(), 31.7 + 20.0 * a.sin())
            })
            .collect();
        let tris: Vec<[DevicePoint; 3]> = (0..7)
            .map(|i| [center, ring[i], ring[(i + 1) % 7]])
            .collect();
        let counts = coverage(&tris);

        assert!(counts.iter().all(|&c| c <= 1));
        for y in 24..40 {
            for x in 24..40 {
                assert_eq!(counts[y * W + x], 1, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_reference_triangle_coverage_either_winding() {
        let cw = [pt(10.0, 10.0), pt(50.0, 10.0), pt(10.0, 50.0)];
        let ccw = [cw[0], cw[2], cw[1]];
        for tri in [cw, ccw] {
            let counts = coverage(&[tri]);
            for y in 0..H {
                for x in 0..W {
                    let inside = x >= 10 && y >= 10 && x + y < 60;
                    assert_eq!(counts[y * W + x], inside as u8, "pixel ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_degenerate_and_offsurface() {
        let line = [pt(5.0, 5.0), pt(10.0, 10.0), pt(20.0, 20.0)];
        assert_eq!(rasterize_triangle(&line, W, H, |_| {}), 0);

        let outside = [pt(-30.0, -30.0), pt(-10.0, -30.0), pt(-30.0, -10.0)];
        assert_eq!(rasterize_triangle(&outside, W, H, |_| {}), 0);

        // Larger than the surface: clipped, never out of bounds
        let huge = [pt(-100.0, -100.0), pt(500.0, -100.0), pt(-100.0, 500.0)];
        let mut max = (0, 0);
        let n = rasterize_triangle(&huge, W, H, |f| max = (max.0.max(f.x), max.1.max(f.y)));
        assert_eq!(n, W * H);
        assert_eq!(max, (W - 1, H - 1));
    }

    #[test]
    fn test_depth_interpolates_linearly() {
        let mut tri = [pt(0.0, 0.0), pt(40.0, 0.0), pt(0.0, 40.0)];
        tri[1].z = 1.0;
        tri[0].z = 0.0;
        tri[2].z = 0.0;
        rasterize_triangle(&tri, W, H, |f| {
            assert!((f.z - f.x as f32 / 40.0).abs() < 1e-4);
            assert!((f.inv_w - 1.0).abs() < 1e-5);
        });
    }

    #[test]
    fn test_perspective_correct_texcoords() {
        // Floor triangle receding from z = 2 to z = 40 below the eye
        let near = 1.0f32;
        let far = 100.0f32;
        let q = far / (far - near);
        let mut params = ParamBlock::new(Viewport::new(100, 100));
        params.set_projection(Mat4::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, q, -near * q],
            [0.0, 0.0, 1.0, 0.0],
        ]));
        let vert = |x: f32, z: f32, u: f32, v: f32| RawVertex {
            position: Vec3::new(x, -1.0, z),
            normal: None,
            color: None,
            texcoord: Some(Vec2::new(u, v)),
        };
        let tri = [vert(-1.0, 2.0, 0.0, 0.0), vert(1.0, 2.0, 1.0, 0.0), vert(-1.0, 40.0, 0.0, 1.0)];
        let opts = SetupOptions { cull_backfaces: false, view_position: false };
        let Setup::Visible(dev) = setup_triangle(&tri, &params.transforms(), opts) else {
            panic!("triangle culled")
        };

        let mut checked = 0;
        let mut max_affine_gap = 0.0f32;
        rasterize_triangle(&dev.points, 100, 100, |f| {
            let t = f.recover().texcoord.expect("texcoord present");

            // Cast the pixel's ray from the eye and hit the floor plane y = -1
            let xn = (f.x as f32 - 50.0) / 50.0;
            let yn = (50.0 - f.y as f32) / 50.0;
            let dist = -1.0 / yn;
            let hit = Vec3::new(xn * dist, -1.0, dist);
            let u = (hit.x + 1.0) / 2.0;
            let v = (hit.z - 2.0) / 38.0;

            assert!((t.x - u).abs() < 2e-3, "u at ({}, {}): {} vs {}", f.x, f.y, t.x, u);
            assert!((t.y - v).abs() < 2e-3, "v at ({}, {}): {} vs {}", f.x, f.y, t.y, v);

            // Screen-linear v for comparison: the row's fraction of the way up
            let affine_v = (75.0 - f.y as f32) / (75.0 - 51.25);
            max_affine_gap = max_affine_gap.max((affine_v - v).abs());
            checked += 1;
        });
        assert!(checked > 100);
        assert!(max_affine_gap > 0.2, "triangle not foreshortened enough");
    }
}
