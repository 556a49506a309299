use bytemuck::Pod;
use std::marker::PhantomData;

use super::context::{BufferId, GraphicsContext};
use super::error::GlResult;
use super::layout::Vertex;
use crate::vertex::InterleavedBuffer;

mod sealed {
    pub trait Sealed {}
}

/// Binding points a buffer object can be attached to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum Target {
    Array = gl::ARRAY_BUFFER,
    Element = gl::ELEMENT_ARRAY_BUFFER,
}

pub trait BufferTarget: sealed::Sealed {
    const TARGET: Target;
}

macro_rules! buffer_target {
    ($name:ident : $target:expr) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
        pub struct $name;
        impl sealed::Sealed for $name {}
        impl BufferTarget for $name {
            const TARGET: Target = $target;
        }
    };
}

buffer_target!(Array: Target::Array);
buffer_target!(Element: Target::Element);

/// Usage hint for a buffer's data store. It does not change what the buffer
/// can do.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum UsageType {
    /// Specified once by the application and drawn from many times.
    StaticDraw = gl::STATIC_DRAW,
}

/// A buffer object holding `T`s, bound to `B`'s target.
///
/// The buffer doesn't know which context it lives in, so it has to be released
/// with `delete` on the context that created it.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct Buffer<T, B: BufferTarget> {
    id: BufferId,
    length: usize,
    _phantom: PhantomData<(*mut T, B)>,
}

impl<T, B: BufferTarget> Buffer<T, B> {
    /// `None` if the context refused to hand out a buffer name.
    pub fn new<G: GraphicsContext + ?Sized>(gl: &mut G) -> Option<Self> {
        let id = gl.create_buffer()?;
        log::trace!("created {:?} buffer {}", B::TARGET, id.raw());
        Some(Buffer {
            id,
            length: 0,
            _phantom: PhantomData,
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn bind<G: GraphicsContext + ?Sized>(&self, gl: &mut G) -> GlResult<()> {
        gl.bind_buffer(B::TARGET, self.id)
    }

    /// Number of elements last uploaded.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn upload_bytes<G>(
        &mut self,
        gl: &mut G,
        bytes: &[u8],
        length: usize,
        usage_type: UsageType,
    ) -> GlResult<()>
    where
        G: GraphicsContext + ?Sized,
    {
        self.bind(gl)?;
        // Could fail if OOM
        gl.buffer_data(B::TARGET, bytes, usage_type)?;
        self.length = length;
        Ok(())
    }

    pub fn delete<G: GraphicsContext + ?Sized>(self, gl: &mut G) -> GlResult<()> {
        log::trace!("deleting {:?} buffer {}", B::TARGET, self.id.raw());
        gl.delete_buffer(self.id)
    }
}

impl<T: Pod, B: BufferTarget> Buffer<T, B> {
    /// Copies data from `data` to the gpu's memory
    pub fn upload<G>(&mut self, gl: &mut G, data: &[T], usage_type: UsageType) -> GlResult<()>
    where
        G: GraphicsContext + ?Sized,
    {
        self.upload_bytes(gl, bytemuck::cast_slice(data), data.len(), usage_type)
    }
}

impl<V: Vertex> Buffer<V, Array> {
    /// Copies an already packed run of vertices to the gpu's memory.
    pub fn upload_interleaved<G>(
        &mut self,
        gl: &mut G,
        data: &InterleavedBuffer<V>,
        usage_type: UsageType,
    ) -> GlResult<()>
    where
        G: GraphicsContext + ?Sized,
    {
        self.upload_bytes(gl, data.as_bytes(), data.len(), usage_type)
    }
}

pub type VertexBuffer<V> = Buffer<V, Array>;
pub type ElementBuffer<T> = Buffer<T, Element>;
