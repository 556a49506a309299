//! Interleaved vertex layouts.
//!
//! A `VertexLayout` is the one description of where every attribute lives
//! inside a vertex. The packer writes fields at the offsets it records and the
//! attribute binding step hands the very same offsets to
//! `glVertexAttribPointer`, so the two can't drift apart.

use cgmath::{Vector2, Vector3, Vector4};
use std::ops::Range;
use thiserror::Error;

use super::context::GraphicsContext;
use super::shader::program::{LinkedProgram, ProgramError};

/// Largest stride GLES 2.0 implementations are required to accept, and the
/// hard limit under WebGL.
pub const MAX_STRIDE: usize = 255;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ComponentType {
    UnsignedByte = gl::UNSIGNED_BYTE,
    Float = gl::FLOAT,
}

impl ComponentType {
    pub fn size(self) -> usize {
        match self {
            ComponentType::UnsignedByte => 1,
            ComponentType::Float => 4,
        }
    }
}

/// How the GPU fetches a single attribute: `components` values of type `ty`,
/// optionally mapped from integers onto `[0, 1]` (unsigned) or `[-1, 1]`
/// (signed) floats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AttribFormat {
    pub components: u8,
    pub ty: ComponentType,
    pub normalized: bool,
}

impl AttribFormat {
    pub const fn new(components: u8, ty: ComponentType) -> Self {
        AttribFormat {
            components,
            ty,
            normalized: false,
        }
    }

    pub const fn normalized(self) -> Self {
        AttribFormat {
            normalized: true,
            ..self
        }
    }

    /// Size of the whole attribute in bytes.
    pub fn size(&self) -> usize {
        self.components as usize * self.ty.size()
    }
}

/// A type that can be stored as one vertex attribute.
pub trait VertexAttribute {
    const FORMAT: AttribFormat;

    /// Writes the components little-endian into `out`, which is exactly
    /// `FORMAT.size()` bytes long.
    fn write_le(&self, out: &mut [u8]);
}

macro_rules! layout_simple {
    ($type:ty: $prim:ty, $gl_type:ident $amount:expr, |$v:ident| [$($component:expr),*]) => {
        impl VertexAttribute for $type {
            const FORMAT: AttribFormat = AttribFormat::new($amount, ComponentType::$gl_type);

            fn write_le(&self, out: &mut [u8]) {
                debug_assert_eq!(out.len(), Self::FORMAT.size());
                let $v = self;
                let size = ::std::mem::size_of::<$prim>();
                for (chunk, component) in out.chunks_exact_mut(size).zip([$($component),*].iter()) {
                    chunk.copy_from_slice(&<$prim>::to_le_bytes(*component));
                }
            }
        }
    };
}

layout_simple!(f32: f32, Float 1, |v| [*v]);
layout_simple!([f32; 2]: f32, Float 2, |v| [v[0], v[1]]);
layout_simple!(Vector2<f32>: f32, Float 2, |v| [v.x, v.y]);
layout_simple!(Vector3<f32>: f32, Float 3, |v| [v.x, v.y, v.z]);
layout_simple!(Vector4<f32>: f32, Float 4, |v| [v.x, v.y, v.z, v.w]);

layout_simple!(u8: u8, UnsignedByte 1, |v| [*v]);
layout_simple!([u8; 3]: u8, UnsignedByte 3, |v| [v[0], v[1], v[2]]);
layout_simple!([u8; 4]: u8, UnsignedByte 4, |v| [v[0], v[1], v[2], v[3]]);
layout_simple!(Vector4<u8>: u8, UnsignedByte 4, |v| [v.x, v.y, v.z, v.w]);

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum LayoutError {
    #[error("got {positions} positions but {colors} colors")]
    LengthMismatch { positions: usize, colors: usize },
    #[error("a vertex layout needs at least one attribute")]
    Empty,
    #[error("attribute names must not be empty")]
    EmptyName,
    #[error("attribute `{0}` is declared twice")]
    DuplicateAttribute(String),
    #[error("attribute `{name}` has {count} components, expected 1 to 4")]
    ComponentCount { name: String, count: u8 },
    #[error("attribute `{name}` at offset {offset} is not aligned to {align} bytes")]
    Misaligned { name: String, offset: usize, align: usize },
    #[error("stride {stride} is not a multiple of {align}")]
    StrideMisaligned { stride: usize, align: usize },
    #[error("stride {0} exceeds the maximum of {}", MAX_STRIDE)]
    StrideTooLarge(usize),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct VertexAttrib {
    name: String,
    format: AttribFormat,
    offset: usize,
}

impl VertexAttrib {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> AttribFormat {
        self.format
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte range of this attribute inside one vertex.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.format.size()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    attribs: Vec<VertexAttrib>,
    stride: usize,
}

impl VertexLayout {
    pub fn builder() -> VertexLayoutBuilder {
        VertexLayoutBuilder::default()
    }

    /// Distance in bytes between the starts of two consecutive vertices.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn attributes(&self) -> &[VertexAttrib] {
        &self.attribs
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttrib> {
        self.attribs.iter().find(|attrib| attrib.name == name)
    }

    /// Points every attribute of `program` at its slice of the buffer bound to
    /// the array target and enables it.
    pub fn bind_attributes<G>(
        &self,
        gl: &mut G,
        program: &mut LinkedProgram,
    ) -> Result<(), ProgramError>
    where
        G: GraphicsContext + ?Sized,
    {
        for attrib in &self.attribs {
            let location = program.attrib_location(gl, &attrib.name)?;
            gl.enable_vertex_attrib_array(location)?;
            gl.vertex_attrib_pointer(location, attrib.format, self.stride, attrib.offset)?;
            log::trace!(
                "attribute `{}` -> location {} ({:?} x{}, stride {}, offset {})",
                attrib.name,
                location.raw(),
                attrib.format.ty,
                attrib.format.components,
                self.stride,
                attrib.offset
            );
        }
        Ok(())
    }
}

/// Collects attributes in declaration order, packing each one directly after
/// the previous one.
#[derive(Clone, Debug, Default)]
pub struct VertexLayoutBuilder {
    attribs: Vec<VertexAttrib>,
    offset: usize,
}

impl VertexLayoutBuilder {
    pub fn attribute<S: Into<String>>(mut self, name: S, format: AttribFormat) -> Self {
        let offset = self.offset;
        self.offset += format.size();
        self.attribs.push(VertexAttrib {
            name: name.into(),
            format,
            offset,
        });
        self
    }

    pub fn build(self) -> Result<VertexLayout, LayoutError> {
        if self.attribs.is_empty() {
            return Err(LayoutError::Empty);
        }

        let stride = self.offset;
        let mut align = 1;
        for (index, attrib) in self.attribs.iter().enumerate() {
            if attrib.name.is_empty() {
                return Err(LayoutError::EmptyName);
            }
            if self.attribs[..index].iter().any(|other| other.name == attrib.name) {
                return Err(LayoutError::DuplicateAttribute(attrib.name.clone()));
            }
            let count = attrib.format.components;
            if count < 1 || count > 4 {
                return Err(LayoutError::ComponentCount {
                    name: attrib.name.clone(),
                    count,
                });
            }
            let component_size = attrib.format.ty.size();
            if attrib.offset % component_size != 0 {
                return Err(LayoutError::Misaligned {
                    name: attrib.name.clone(),
                    offset: attrib.offset,
                    align: component_size,
                });
            }
            align = align.max(component_size);
        }

        if stride % align != 0 {
            return Err(LayoutError::StrideMisaligned { stride, align });
        }
        if stride > MAX_STRIDE {
            return Err(LayoutError::StrideTooLarge(stride));
        }

        Ok(VertexLayout {
            attribs: self.attribs,
            stride,
        })
    }
}

/// A vertex type whose fields are laid out by a `VertexLayout`. Implemented
/// with the `vertex!` macro.
pub trait Vertex: Copy {
    fn layout() -> Result<VertexLayout, LayoutError>;

    /// Writes this vertex into `out`, one stride long, at the offsets of
    /// `layout`.
    fn write(&self, layout: &VertexLayout, out: &mut [u8]);
}

/// Declares a vertex struct and its layout. Fields are packed in declaration
/// order; `#[normalized]` marks integer fields the GPU should read as
/// normalized floats.
///
/// ```
/// use cgmath::{Vector2, Vector4};
///
/// glquad::vertex! {
///     pub vertex Sprite {
///         pos: Vector2<f32> => "a_pos",
///         #[normalized] tint: Vector4<u8> => "a_tint",
///     }
/// }
/// ```
#[macro_export]
macro_rules! vertex {
    (@format $field_type:ty) => {
        <$field_type as $crate::gl_api::layout::VertexAttribute>::FORMAT
    };
    (@format $field_type:ty, normalized) => {
        <$field_type as $crate::gl_api::layout::VertexAttribute>::FORMAT.normalized()
    };

    ($(#[$meta:meta])* $vis:vis vertex $name:ident {
        $($(#[$flag:ident])* $field:ident: $field_type:ty => $attrib:expr,)*
    }) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq)]
        #[repr(C)]
        $vis struct $name {
            $(pub $field: $field_type),*
        }

        impl $crate::gl_api::layout::Vertex for $name {
            fn layout() -> ::std::result::Result<
                $crate::gl_api::layout::VertexLayout,
                $crate::gl_api::layout::LayoutError,
            > {
                $crate::gl_api::layout::VertexLayout::builder()
                    $(.attribute($attrib, $crate::vertex!(@format $field_type $(, $flag)*)))*
                    .build()
            }

            fn write(&self, layout: &$crate::gl_api::layout::VertexLayout, out: &mut [u8]) {
                let mut attribs = layout.attributes().iter();
                $(
                    if let Some(attrib) = attribs.next() {
                        let out = &mut out[attrib.range()];
                        $crate::gl_api::layout::VertexAttribute::write_le(&self.$field, out);
                    }
                )*
            }
        }
    };
}
