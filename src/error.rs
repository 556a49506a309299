use thiserror::Error;

use crate::config::ConfigError;
use crate::gl_api::error::GlError;
use crate::gl_api::layout::LayoutError;
use crate::gl_api::shader::{ProgramError, ShaderError};

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Compile(#[from] ShaderError),
    #[error(transparent)]
    Link(#[from] ProgramError),
    #[error("vertex data does not fit its layout: {0}")]
    LayoutMismatch(#[from] LayoutError),
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u16, vertex_count: usize },
    #[error("could not create a buffer object")]
    BufferCreation,
    #[error("no usable GL context: {0}")]
    ContextUnavailable(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gl(#[from] GlError),
}
