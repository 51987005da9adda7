//! Small built-in meshes

use super::buffer::{ElementType, IndexBuffer, Semantic, VertexBuffer, VertexDeclaration};
use super::math::Vec3;
use super::types::Color;
use crate::error::RenderError;

/// Unit cube spanning [-1, 1] with per-face normals and 0..1 texcoords.
/// Faces wind clockwise seen from outside, so back faces cull.
pub fn cube() -> Result<(VertexBuffer, IndexBuffer), RenderError> {
    let decl = VertexDeclaration::packed(&[
        (ElementType::Float3, Semantic::Position),
        (ElementType::Float3, Semantic::Normal),
        (ElementType::Float2, Semantic::Texcoord),
    ])?;

    let x = Vec3::new(1.0, 0.0, 0.0);
    let y = Vec3::UP;
    let z = Vec3::new(0.0, 0.0, 1.0);

    // (normal, u, v) with u x v = normal
    let faces = [
        (x, y, z),
        (-x, z, y),
        (y, z, x),
        (-y, x, z),
        (z, x, y),
        (-z, y, x),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut floats = Vec::with_capacity(6 * 4 * 8);
    let mut indices = Vec::with_capacity(6 * 6);
    for (face_idx, (n, u, v)) in faces.iter().enumerate() {
        for (a, b) in corners {
            let p = *n + u.scale(a) + v.scale(b);
            floats.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z, (a + 1.0) / 2.0, (b + 1.0) / 2.0]);
        }

        // Two triangles per face
        let base = (face_idx * 4) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Ok((VertexBuffer::from_floats(decl, &floats)?, IndexBuffer::new(indices)?))
}

/// One flat-colored triangle
pub fn triangle(points: [Vec3; 3], color: Color) -> Result<(VertexBuffer, IndexBuffer), RenderError> {
    let decl = VertexDeclaration::packed(&[
        (ElementType::Float3, Semantic::Position),
        (ElementType::Color4, Semantic::Color),
    ])?;
    let floats: Vec<f32> = points
        .iter()
        .flat_map(|p| [p.x, p.y, p.z, color.r, color.g, color.b, color.a])
        .collect();
    Ok((VertexBuffer::from_floats(decl, &floats)?, IndexBuffer::new(vec![0, 1, 2])?))
}
