//! Vertex data for the quad: the interleaved vertex type, the packer that
//! turns parallel position and color arrays into bytes, and the index list.

use cgmath::{Vector2, Vector4};
use std::marker::PhantomData;

use crate::gl_api::layout::{LayoutError, Vertex, VertexLayout};

vertex! {
    /// A 2D position followed by an RGBA color that the GPU reads as
    /// normalized floats. Packs into 12 bytes.
    pub vertex ColoredVertex {
        position: Vector2<f32> => "a_position",
        #[normalized] color: Vector4<u8> => "a_color",
    }
}

/// Vertices packed back to back according to `V`'s layout.
#[derive(Clone, Debug, PartialEq)]
pub struct InterleavedBuffer<V> {
    bytes: Vec<u8>,
    layout: VertexLayout,
    vertex_count: usize,
    _marker: PhantomData<V>,
}

impl<V: Vertex> InterleavedBuffer<V> {
    pub fn from_vertices(vertices: &[V]) -> Result<Self, LayoutError> {
        let layout = V::layout()?;
        let stride = layout.stride();
        let mut bytes = vec![0; stride * vertices.len()];
        for (vertex, out) in vertices.iter().zip(bytes.chunks_exact_mut(stride)) {
            vertex.write(&layout, out);
        }

        Ok(InterleavedBuffer {
            bytes,
            layout,
            vertex_count: vertices.len(),
            _marker: PhantomData,
        })
    }
}

impl<V> InterleavedBuffer<V> {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Number of vertices, not bytes.
    pub fn len(&self) -> usize {
        self.vertex_count
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    /// The bytes of vertex `index`, if there is one.
    pub fn vertex_bytes(&self, index: usize) -> Option<&[u8]> {
        let stride = self.stride();
        let start = index.checked_mul(stride)?;
        self.bytes.get(start..start + stride)
    }
}

/// Interleaves `positions[i]` and `colors[i]` into vertex `i`.
///
/// Each vertex takes 12 bytes: the position as two little-endian `f32`s at
/// offset 0, then the four color bytes at offset 8.
pub fn pack(
    positions: &[Vector2<f32>],
    colors: &[Vector4<u8>],
) -> Result<InterleavedBuffer<ColoredVertex>, LayoutError> {
    if positions.len() != colors.len() {
        return Err(LayoutError::LengthMismatch {
            positions: positions.len(),
            colors: colors.len(),
        });
    }

    let vertices: Vec<_> = positions
        .iter()
        .zip(colors)
        .map(|(&position, &color)| ColoredVertex { position, color })
        .collect();
    InterleavedBuffer::from_vertices(&vertices)
}

/// Triangle indices into a vertex buffer, three per triangle.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IndexList(Vec<u16>);

impl IndexList {
    pub fn new<I: Into<Vec<u16>>>(indices: I) -> Self {
        IndexList(indices.into())
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first index that does not name one of `vertex_count` vertices.
    pub fn first_out_of_range(&self, vertex_count: usize) -> Option<u16> {
        self.0.iter().cloned().find(|&index| usize::from(index) >= vertex_count)
    }
}
