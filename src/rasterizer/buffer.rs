//! Vertex and index buffers handed to the pipeline

use serde::{Serialize, Deserialize};

use super::math::{Vec2, Vec3, Vec4};
use crate::error::RenderError;

/// What a vertex element means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semantic {
    Position,
    Normal,
    Color,
    Texcoord,
}

/// Storage type of a vertex element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    Float2,
    Float3,
    /// Four floats, RGBA
    Color4,
}

impl ElementType {
    pub fn size(self) -> usize {
        self.components() * std::mem::size_of::<f32>()
    }

    pub fn components(self) -> usize {
        match self {
            ElementType::Float2 => 2,
            ElementType::Float3 => 3,
            ElementType::Color4 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexElement {
    pub offset: usize,
    pub ty: ElementType,
    pub semantic: Semantic,
}

impl VertexElement {
    pub fn new(offset: usize, ty: ElementType, semantic: Semantic) -> Self {
        Self { offset, ty, semantic }
    }

    fn end(&self) -> usize {
        self.offset + self.ty.size()
    }
}

/// Ordered layout of one interleaved vertex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexDeclaration {
    elements: Vec<VertexElement>,
    stride: usize,
}

impl VertexDeclaration {
    /// Validates that elements do not overlap, each semantic appears once and
    /// the elements pack the stride exactly.
    pub fn new(elements: Vec<VertexElement>) -> Result<Self, RenderError> {
        let mut sorted = elements.clone();
        sorted.sort_by_key(|e| e.offset);

        for pair in sorted.windows(2) {
            if pair[0].end() > pair[1].offset {
                return Err(RenderError::InvalidDeclaration(format!(
                    "{:?} at {} overlaps {:?} at {}",
                    pair[0].semantic, pair[0].offset, pair[1].semantic, pair[1].offset
                )));
            }
        }

        for (i, e) in elements.iter().enumerate() {
            if elements[..i].iter().any(|o| o.semantic == e.semantic) {
                return Err(RenderError::InvalidDeclaration(format!(
                    "{:?} declared twice",
                    e.semantic
                )));
            }
        }

        let stride: usize = elements.iter().map(|e| e.ty.size()).sum();
        let extent = sorted.last().map(|e| e.end()).unwrap_or(0);
        if extent != stride {
            return Err(RenderError::InvalidDeclaration(format!(
                "elements span {} bytes but sum to {}",
                extent, stride
            )));
        }

        Ok(Self { elements, stride })
    }

    /// Packed layout in the given order, offsets assigned back to back
    pub fn packed(layout: &[(ElementType, Semantic)]) -> Result<Self, RenderError> {
        let mut offset = 0;
        let elements = layout
            .iter()
            .map(|&(ty, semantic)| {
                let e = VertexElement::new(offset, ty, semantic);
                offset += ty.size();
                e
            })
            .collect();
        Self::new(elements)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    pub fn find(&self, semantic: Semantic) -> Option<VertexElement> {
        self.elements.iter().copied().find(|e| e.semantic == semantic)
    }
}

/// Interleaved vertex bytes plus their declaration
#[derive(Debug, Clone)]
pub struct VertexBuffer {
    data: Vec<u8>,
    decl: VertexDeclaration,
}

impl VertexBuffer {
    pub fn new(decl: VertexDeclaration, data: Vec<u8>) -> Result<Self, RenderError> {
        let stride = decl.stride();
        if stride == 0 || data.len() % stride != 0 {
            return Err(RenderError::VertexDataSize { len: data.len(), stride });
        }
        Ok(Self { data, decl })
    }

    /// Build from native-endian floats laid out per the declaration
    pub fn from_floats(decl: VertexDeclaration, floats: &[f32]) -> Result<Self, RenderError> {
        Self::new(decl, bytemuck::cast_slice(floats).to_vec())
    }

    pub fn declaration(&self) -> &VertexDeclaration {
        &self.decl
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.decl.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Read component `i` of an element of vertex `index`
    fn read_f32(&self, index: usize, element: &VertexElement, i: usize) -> f32 {
        let start = index * self.decl.stride() + element.offset + i * 4;
        bytemuck::pod_read_unaligned(&self.data[start..start + 4])
    }

    /// Read an element, padding missing components with 0 (and w/alpha with 1)
    pub fn read(&self, index: usize, element: &VertexElement) -> Vec4 {
        let mut out = [0.0, 0.0, 0.0, 1.0];
        for (i, slot) in out.iter_mut().enumerate().take(element.ty.components()) {
            *slot = self.read_f32(index, element, i);
        }
        Vec4::new(out[0], out[1], out[2], out[3])
    }
}

/// Element locations resolved once per draw
#[derive(Debug, Clone, Copy)]
pub struct VertexReader {
    position: VertexElement,
    normal: Option<VertexElement>,
    color: Option<VertexElement>,
    texcoord: Option<VertexElement>,
}

/// One vertex as fetched from a buffer
#[derive(Debug, Clone, Copy)]
pub struct RawVertex {
    pub position: Vec3,
    pub normal: Option<Vec3>,
    pub color: Option<Vec4>,
    pub texcoord: Option<Vec2>,
}

impl VertexReader {
    pub fn new(decl: &VertexDeclaration) -> Result<Self, RenderError> {
        Ok(Self {
            position: decl.find(Semantic::Position).ok_or(RenderError::MissingPosition)?,
            normal: decl.find(Semantic::Normal),
            color: decl.find(Semantic::Color),
            texcoord: decl.find(Semantic::Texcoord),
        })
    }

    pub fn fetch(&self, vb: &VertexBuffer, index: usize) -> RawVertex {
        let position = vb.read(index, &self.position).truncate();
        RawVertex {
            position,
            normal: self.normal.map(|e| vb.read(index, &e).truncate()),
            color: self.color.map(|e| vb.read(index, &e)),
            texcoord: self.texcoord.map(|e| {
                let t = vb.read(index, &e);
                Vec2::new(t.x, t.y)
            }),
        }
    }
}

/// Triangle-list indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuffer {
    indices: Vec<u16>,
}

impl IndexBuffer {
    pub fn new(indices: Vec<u16>) -> Result<Self, RenderError> {
        if indices.len() % 3 != 0 {
            return Err(RenderError::IndexCountNotTriangles(indices.len()));
        }
        Ok(Self { indices })
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }

    /// Every index must name a vertex in a buffer of `vertex_count`
    pub fn validate(&self, vertex_count: usize) -> Result<(), RenderError> {
        match self.indices.iter().map(|&i| i as usize).find(|&i| i >= vertex_count) {
            Some(index) => Err(RenderError::IndexOutOfRange { index, vertex_count }),
            None => Ok(()),
        }
    }
}
