use gl::types::GLenum;
use thiserror::Error;

pub type GlResult<T> = Result<T, GlError>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Error)]
#[error("OpenGL returned {name} (0x{code:04X})", name = error_name(.code))]
pub struct GlError {
    code: GLenum,
}

impl GlError {
    pub(crate) fn new(code: GLenum) -> Self {
        GlError { code }
    }

    fn get_raw() -> GLenum {
        unsafe { gl::GetError() }
    }

    pub fn map_value<T>(val: T) -> GlResult<T> {
        match Self::get_raw() {
            gl::NO_ERROR => Ok(val),
            // GL specification states that it is undefined to issue any GL
            // calls after an out of memory error is received.
            gl::OUT_OF_MEMORY => {
                log::error!("GL_OUT_OF_MEMORY reported, aborting");
                ::std::process::abort()
            }
            code => Err(GlError { code }),
        }
    }

    pub fn code(&self) -> GLenum {
        self.code
    }

    pub fn name(&self) -> &'static str {
        error_name(&self.code)
    }
}

fn error_name(code: &GLenum) -> &'static str {
    match *code {
        gl::INVALID_ENUM => "GL_INVALID_ENUM",
        gl::INVALID_VALUE => "GL_INVALID_VALUE",
        gl::INVALID_OPERATION => "GL_INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        _ => "an unknown error",
    }
}

macro_rules! gl_call {
    ($name:ident($($args:expr),*)) => {{
        $crate::gl_api::error::GlError::map_value(::gl::$name($($args),*))
    }}
}
