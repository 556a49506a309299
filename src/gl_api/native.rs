//! `GraphicsContext` over the loaded `gl` function pointers.

use gl::types::*;
use std::convert::TryFrom;
use std::ffi::{c_void, CString};
use std::marker::PhantomData;
use std::ptr;

use super::buffer::{Target, UsageType};
use super::context::*;
use super::error::{GlError, GlResult};
use super::layout::AttribFormat;
use crate::error::RenderError;

/// The GL context that is current on the calling thread.
#[derive(Debug)]
pub struct NativeContext {
    _marker: PhantomData<*mut ()>,
}

macro_rules! require_loaded {
    ($($name:ident),* $(,)*) => {
        $(
            if !gl::$name::is_loaded() {
                return Err(RenderError::ContextUnavailable(format!(
                    "gl{} could not be loaded",
                    stringify!($name)
                )));
            }
        )*
    };
}

impl NativeContext {
    /// Loads the GL entry points through `loader`.
    ///
    /// # Safety
    ///
    /// The context the loader resolves symbols for must be current on this
    /// thread for as long as the returned value is used.
    pub unsafe fn load_with<F>(loader: F) -> Result<Self, RenderError>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        require_loaded!(
            CreateShader,
            ShaderSource,
            CompileShader,
            GetShaderiv,
            GetShaderInfoLog,
            DeleteShader,
            CreateProgram,
            AttachShader,
            DetachShader,
            LinkProgram,
            GetProgramiv,
            GetProgramInfoLog,
            GetAttribLocation,
            UseProgram,
            DeleteProgram,
            GenBuffers,
            BindBuffer,
            BufferData,
            DeleteBuffers,
            VertexAttribPointer,
            EnableVertexAttribArray,
            DrawElements,
            Viewport,
            ClearColor,
            Clear,
        );
        Ok(NativeContext {
            _marker: PhantomData,
        })
    }
}

fn read_info_log(
    length: GLint,
    read: impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar) -> GlResult<()>,
) -> GlResult<String> {
    if length <= 0 {
        return Ok(String::new());
    }
    let mut buffer = vec![0u8; length as usize];
    let mut written = 0;
    read(length, &mut written as *mut GLsizei, buffer.as_mut_ptr() as *mut GLchar)?;
    buffer.truncate(written.max(0) as usize);
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

impl GraphicsContext for NativeContext {
    fn create_shader(&mut self, stage: ShaderStage) -> Option<ShaderId> {
        match unsafe { gl_call!(CreateShader(stage as GLenum)) } {
            Ok(0) | Err(_) => None,
            Ok(id) => Some(ShaderId(id)),
        }
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) -> GlResult<()> {
        let text = source.as_ptr() as *const GLchar;
        let length = source.len() as GLint;
        unsafe { gl_call!(ShaderSource(shader.0, 1, &text, &length)) }
    }

    fn compile_shader(&mut self, shader: ShaderId) -> GlResult<()> {
        unsafe { gl_call!(CompileShader(shader.0)) }
    }

    fn compile_status(&self, shader: ShaderId) -> GlResult<bool> {
        let mut status = 0;
        unsafe { gl_call!(GetShaderiv(shader.0, gl::COMPILE_STATUS, &mut status))? };
        Ok(status != 0)
    }

    fn shader_info_log(&self, shader: ShaderId) -> GlResult<String> {
        let mut length = 0;
        unsafe { gl_call!(GetShaderiv(shader.0, gl::INFO_LOG_LENGTH, &mut length))? };
        read_info_log(length, |capacity, written, buffer| unsafe {
            gl_call!(GetShaderInfoLog(shader.0, capacity, written, buffer))
        })
    }

    fn delete_shader(&mut self, shader: ShaderId) -> GlResult<()> {
        unsafe { gl_call!(DeleteShader(shader.0)) }
    }

    fn create_program(&mut self) -> Option<ProgramId> {
        match unsafe { gl_call!(CreateProgram()) } {
            Ok(0) | Err(_) => None,
            Ok(id) => Some(ProgramId(id)),
        }
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> GlResult<()> {
        unsafe { gl_call!(AttachShader(program.0, shader.0)) }
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) -> GlResult<()> {
        unsafe { gl_call!(DetachShader(program.0, shader.0)) }
    }

    fn link_program(&mut self, program: ProgramId) -> GlResult<()> {
        unsafe { gl_call!(LinkProgram(program.0)) }
    }

    fn link_status(&self, program: ProgramId) -> GlResult<bool> {
        let mut status = 0;
        unsafe { gl_call!(GetProgramiv(program.0, gl::LINK_STATUS, &mut status))? };
        Ok(status != 0)
    }

    fn program_info_log(&self, program: ProgramId) -> GlResult<String> {
        let mut length = 0;
        unsafe { gl_call!(GetProgramiv(program.0, gl::INFO_LOG_LENGTH, &mut length))? };
        read_info_log(length, |capacity, written, buffer| unsafe {
            gl_call!(GetProgramInfoLog(program.0, capacity, written, buffer))
        })
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> GlResult<Option<AttribLocation>> {
        // A name with an interior nul can't name anything in GLSL.
        let name = match CString::new(name) {
            Ok(name) => name,
            Err(_) => return Ok(None),
        };
        let location = unsafe { gl_call!(GetAttribLocation(program.0, name.as_ptr()))? };
        Ok(if location < 0 {
            None
        } else {
            Some(AttribLocation(location as GLuint))
        })
    }

    fn use_program(&mut self, program: ProgramId) -> GlResult<()> {
        unsafe { gl_call!(UseProgram(program.0)) }
    }

    fn delete_program(&mut self, program: ProgramId) -> GlResult<()> {
        unsafe { gl_call!(DeleteProgram(program.0)) }
    }

    fn create_buffer(&mut self) -> Option<BufferId> {
        let mut id = 0;
        match unsafe { gl_call!(GenBuffers(1, &mut id)) } {
            Ok(()) if id != 0 => Some(BufferId(id)),
            _ => None,
        }
    }

    fn bind_buffer(&mut self, target: Target, buffer: BufferId) -> GlResult<()> {
        unsafe { gl_call!(BindBuffer(target as GLenum, buffer.0)) }
    }

    fn buffer_data(&mut self, target: Target, data: &[u8], usage: UsageType) -> GlResult<()> {
        let pointer = if data.is_empty() {
            ptr::null()
        } else {
            data.as_ptr() as *const c_void
        };
        unsafe {
            gl_call!(BufferData(
                target as GLenum,
                data.len() as GLsizeiptr,
                pointer,
                usage as GLenum
            ))
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> GlResult<()> {
        unsafe { gl_call!(DeleteBuffers(1, &buffer.0)) }
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        format: AttribFormat,
        stride: usize,
        offset: usize,
    ) -> GlResult<()> {
        let normalized = if format.normalized { gl::TRUE } else { gl::FALSE };
        unsafe {
            gl_call!(VertexAttribPointer(
                location.0,
                GLint::from(format.components),
                format.ty as GLenum,
                normalized,
                stride as GLsizei,
                offset as *const c_void
            ))
        }
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) -> GlResult<()> {
        unsafe { gl_call!(EnableVertexAttribArray(location.0)) }
    }

    fn draw_elements(&mut self, call: &DrawCall) -> GlResult<()> {
        unsafe {
            gl_call!(DrawElements(
                call.primitive as GLenum,
                call.count as GLsizei,
                call.index_type as GLenum,
                call.offset as *const c_void
            ))
        }
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) -> GlResult<()> {
        let size =
            |value: u32| GLsizei::try_from(value).map_err(|_| GlError::new(gl::INVALID_VALUE));
        let (width, height) = (size(width)?, size(height)?);
        unsafe { gl_call!(Viewport(x, y, width, height)) }
    }

    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) -> GlResult<()> {
        unsafe { gl_call!(ClearColor(red, green, blue, alpha)) }
    }

    fn clear_color_buffer(&mut self) -> GlResult<()> {
        unsafe { gl_call!(Clear(gl::COLOR_BUFFER_BIT)) }
    }
}
