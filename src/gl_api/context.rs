//! The graphics context capability.
//!
//! Every GPU-facing operation in this crate goes through a `GraphicsContext`
//! that is passed in by the caller. Nothing here reaches for a global context:
//! the native implementation forwards to whatever context is current on the
//! calling thread, and tests substitute a recording implementation.

use gl::types::*;
use std::fmt;

use super::buffer::{Target, UsageType};
use super::error::GlResult;
use super::layout::AttribFormat;

macro_rules! gl_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(pub(crate) GLuint);

        impl $name {
            /// The raw GL object name.
            pub fn raw(self) -> GLuint {
                self.0
            }
        }
    };
}

gl_handle!(
    /// Name of a shader object.
    ShaderId
);
gl_handle!(
    /// Name of a program object.
    ProgramId
);
gl_handle!(
    /// Name of a buffer object.
    BufferId
);
gl_handle!(
    /// Slot of a vertex attribute in a linked program.
    AttribLocation
);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ShaderStage {
    Vertex = gl::VERTEX_SHADER,
    Fragment = gl::FRAGMENT_SHADER,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum Primitive {
    Triangles = gl::TRIANGLES,
}

/// Element type of an index buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum IndexType {
    UnsignedShort = gl::UNSIGNED_SHORT,
}

impl IndexType {
    pub fn size(self) -> usize {
        match self {
            IndexType::UnsignedShort => 2,
        }
    }
}

/// A single indexed draw, sourced from the currently bound element buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DrawCall {
    pub primitive: Primitive,
    pub count: usize,
    pub index_type: IndexType,
    /// Byte offset into the element buffer.
    pub offset: usize,
}

impl DrawCall {
    pub fn triangles(count: usize) -> Self {
        DrawCall {
            primitive: Primitive::Triangles,
            count,
            index_type: IndexType::UnsignedShort,
            offset: 0,
        }
    }
}

pub trait GraphicsContext {
    fn create_shader(&mut self, stage: ShaderStage) -> Option<ShaderId>;
    fn shader_source(&mut self, shader: ShaderId, source: &str) -> GlResult<()>;
    fn compile_shader(&mut self, shader: ShaderId) -> GlResult<()>;
    fn compile_status(&self, shader: ShaderId) -> GlResult<bool>;
    fn shader_info_log(&self, shader: ShaderId) -> GlResult<String>;
    fn delete_shader(&mut self, shader: ShaderId) -> GlResult<()>;

    fn create_program(&mut self) -> Option<ProgramId>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> GlResult<()>;
    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) -> GlResult<()>;
    fn link_program(&mut self, program: ProgramId) -> GlResult<()>;
    fn link_status(&self, program: ProgramId) -> GlResult<bool>;
    fn program_info_log(&self, program: ProgramId) -> GlResult<String>;
    /// `None` if the program has no active attribute called `name`.
    fn attrib_location(&self, program: ProgramId, name: &str) -> GlResult<Option<AttribLocation>>;
    fn use_program(&mut self, program: ProgramId) -> GlResult<()>;
    fn delete_program(&mut self, program: ProgramId) -> GlResult<()>;

    fn create_buffer(&mut self) -> Option<BufferId>;
    fn bind_buffer(&mut self, target: Target, buffer: BufferId) -> GlResult<()>;
    /// Replaces the data store of the buffer bound to `target`.
    fn buffer_data(&mut self, target: Target, data: &[u8], usage: UsageType) -> GlResult<()>;
    fn delete_buffer(&mut self, buffer: BufferId) -> GlResult<()>;

    /// Describes where attribute `location` is fetched from in the buffer
    /// currently bound to the array target.
    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        format: AttribFormat,
        stride: usize,
        offset: usize,
    ) -> GlResult<()>;
    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) -> GlResult<()>;

    fn draw_elements(&mut self, call: &DrawCall) -> GlResult<()>;

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) -> GlResult<()>;
    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) -> GlResult<()>;
    fn clear_color_buffer(&mut self) -> GlResult<()>;
}
