//! Vector and matrix math for the transform pipeline
//!
//! Matrices are stored row-major and applied to column vectors (`v' = M * v`),
//! so a composite reads right to left: `projection * view * world`.
//! View space is left-handed (x right, y up, z forward) and projection maps
//! depth to [0, 1].

use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

/// 2D Vector (for texture coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scale(self, s: f32) -> Vec2 {
        Vec2 { x: self.x * s, y: self.y * s }
    }
}

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l == 0.0 {
            return Vec3::ZERO;
        }
        self.scale(1.0 / l)
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn extend(self, w: f32) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, w)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

/// Homogeneous 4D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const ZERO: Vec4 = Vec4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn truncate(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn scale(self, s: f32) -> Vec4 {
        Vec4::new(self.x * s, self.y * s, self.z * s, self.w * s)
    }

    fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl Add for Vec4 {
    type Output = Vec4;
    fn add(self, o: Vec4) -> Vec4 {
        Vec4::new(self.x + o.x, self.y + o.y, self.z + o.z, self.w + o.w)
    }
}

impl AddAssign for Vec4 {
    fn add_assign(&mut self, o: Vec4) {
        *self = *self + o;
    }
}

/// 3x3 matrix, used for normal transforms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub m: [[f32; 3]; 3],
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Upper-left 3x3 block of a 4x4 matrix
    pub fn from_mat4(m4: &Mat4) -> Self {
        let mut m = [[0.0; 3]; 3];
        for (r, row) in m.iter_mut().enumerate() {
            row.copy_from_slice(&m4.m[r][..3]);
        }
        Self { m }
    }

    pub fn transpose(&self) -> Mat3 {
        let mut m = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                m[r][c] = self.m[c][r];
            }
        }
        Mat3 { m }
    }

    pub fn determinant(&self) -> f32 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn inverse(&self) -> Option<Mat3> {
        let det = self.determinant();
        if det.abs() < f32::EPSILON {
            return None;
        }
        let m = &self.m;
        let inv_det = 1.0 / det;
        let cof = |r0: usize, r1: usize, c0: usize, c1: usize| {
            m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
        };
        // adjugate = transposed cofactor matrix
        Some(Mat3 {
            m: [
                [cof(1, 2, 1, 2) * inv_det, -cof(0, 2, 1, 2) * inv_det, cof(0, 1, 1, 2) * inv_det],
                [-cof(1, 2, 0, 2) * inv_det, cof(0, 2, 0, 2) * inv_det, -cof(0, 1, 0, 2) * inv_det],
                [cof(1, 2, 0, 1) * inv_det, -cof(0, 2, 0, 1) * inv_det, cof(0, 1, 0, 1) * inv_det],
            ],
        })
    }

    pub fn mul_vec3(&self, v: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3 {
            x: m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            y: m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            z: m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        }
    }
}

/// 4x4 matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_rows(m: [[f32; 4]; 4]) -> Self {
        Self { m }
    }

    pub fn translation(t: Vec3) -> Self {
        let mut out = Mat4::IDENTITY;
        out.m[0][3] = t.x;
        out.m[1][3] = t.y;
        out.m[2][3] = t.z;
        out
    }

    pub fn scaling(s: Vec3) -> Self {
        let mut out = Mat4::IDENTITY;
        out.m[0][0] = s.x;
        out.m[1][1] = s.y;
        out.m[2][2] = s.z;
        out
    }

    pub fn rotation_x(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, -s, 0.0],
            [0.0, s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::from_rows([
            [c, 0.0, s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_z(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::from_rows([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Left-handed camera looking from `eye` towards `target`
    pub fn look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let z = (target - eye).normalize();
        let x = up.cross(z).normalize();
        let y = z.cross(x);
        Mat4::from_rows([
            [x.x, x.y, x.z, -x.dot(eye)],
            [y.x, y.y, y.z, -y.dot(eye)],
            [z.x, z.y, z.z, -z.dot(eye)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Left-handed perspective projection; clip w is view z, depth maps
    /// `near..far` onto `0..1`.
    pub fn perspective_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let y_scale = 1.0 / (fov_y * 0.5).tan();
        let x_scale = y_scale / aspect;
        let q = far / (far - near);
        Mat4::from_rows([
            [x_scale, 0.0, 0.0, 0.0],
            [0.0, y_scale, 0.0, 0.0],
            [0.0, 0.0, q, -near * q],
            [0.0, 0.0, 1.0, 0.0],
        ])
    }

    pub fn transpose(&self) -> Mat4 {
        let mut m = [[0.0; 4]; 4];
        for r in 0..4 {
            for c in 0..4 {
                m[r][c] = self.m[c][r];
            }
        }
        Mat4 { m }
    }

    pub fn mul_vec4(&self, v: Vec4) -> Vec4 {
        let v = v.to_array();
        let row = |r: usize| -> f32 {
            self.m[r].iter().zip(v.iter()).map(|(a, b)| a * b).sum()
        };
        Vec4::new(row(0), row(1), row(2), row(3))
    }

    /// Transform a point (w = 1), keeping the homogeneous result
    pub fn transform_point(&self, p: Vec3) -> Vec4 {
        self.mul_vec4(p.extend(1.0))
    }

    /// Transform a direction (w = 0)
    pub fn transform_dir(&self, d: Vec3) -> Vec3 {
        self.mul_vec4(d.extend(0.0)).truncate()
    }

    /// General inverse by cofactor expansion; `None` when singular
    pub fn inverse(&self) -> Option<Mat4> {
        let a: [f32; 16] = [
            self.m[0][0], self.m[0][1], self.m[0][2], self.m[0][3],
            self.m[1][0], self.m[1][1], self.m[1][2], self.m[1][3],
            self.m[2][0], self.m[2][1], self.m[2][2], self.m[2][3],
            self.m[3][0], self.m[3][1], self.m[3][2], self.m[3][3],
        ];

        let s0 = a[0] * a[5] - a[4] * a[1];
        let s1 = a[0] * a[6] - a[4] * a[2];
        let s2 = a[0] * a[7] - a[4] * a[3];
        let s3 = a[1] * a[6] - a[5] * a[2];
        let s4 = a[1] * a[7] - a[5] * a[3];
        let s5 = a[2] * a[7] - a[6] * a[3];

        let c5 = a[10] * a[15] - a[14] * a[11];
        let c4 = a[9] * a[15] - a[13] * a[11];
        let c3 = a[9] * a[14] - a[13] * a[10];
        let c2 = a[8] * a[15] - a[12] * a[11];
        let c1 = a[8] * a[14] - a[12] * a[10];
        let c0 = a[8] * a[13] - a[12] * a[9];

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if det.abs() < f32::EPSILON * f32::EPSILON {
            return None;
        }
        let d = 1.0 / det;

        Some(Mat4::from_rows([
            [
                (a[5] * c5 - a[6] * c4 + a[7] * c3) * d,
                (-a[1] * c5 + a[2] * c4 - a[3] * c3) * d,
                (a[13] * s5 - a[14] * s4 + a[15] * s3) * d,
                (-a[9] * s5 + a[10] * s4 - a[11] * s3) * d,
            ],
            [
                (-a[4] * c5 + a[6] * c2 - a[7] * c1) * d,
                (a[0] * c5 - a[2] * c2 + a[3] * c1) * d,
                (-a[12] * s5 + a[14] * s2 - a[15] * s1) * d,
                (a[8] * s5 - a[10] * s2 + a[11] * s1) * d,
            ],
            [
                (a[4] * c4 - a[5] * c2 + a[7] * c0) * d,
                (-a[0] * c4 + a[1] * c2 - a[3] * c0) * d,
                (a[12] * s4 - a[13] * s2 + a[15] * s0) * d,
                (-a[8] * s4 + a[9] * s2 - a[11] * s0) * d,
            ],
            [
                (-a[4] * c3 + a[5] * c1 - a[6] * c0) * d,
                (a[0] * c3 - a[1] * c1 + a[2] * c0) * d,
                (-a[12] * s3 + a[13] * s1 - a[14] * s0) * d,
                (a[8] * s3 - a[9] * s1 + a[10] * s0) * d,
            ],
        ]))
    }
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut m = [[0.0; 4]; 4];
        for (r, row) in m.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[r][k] * rhs.m[k][c]).sum();
            }
        }
        Mat4 { m }
    }
}

/// Non-square viewport matrix: NDC `(x, y, z, 1)` to device `(x, y, z)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3x4 {
    pub m: [[f32; 4]; 3],
}

impl Mat3x4 {
    /// Device y grows downwards, so NDC y is flipped.
    pub fn viewport(x: f32, y: f32, width: f32, height: f32, min_z: f32, max_z: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Mat3x4 {
            m: [
                [hw, 0.0, 0.0, x + hw],
                [0.0, -hh, 0.0, y + hh],
                [0.0, 0.0, max_z - min_z, min_z],
            ],
        }
    }

    pub fn mul_vec4(&self, v: Vec4) -> Vec3 {
        let v = v.to_array();
        let row = |r: usize| -> f32 {
            self.m[r].iter().zip(v.iter()).map(|(a, b)| a * b).sum()
        };
        Vec3::new(row(0), row(1), row(2))
    }
}
