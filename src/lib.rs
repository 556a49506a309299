//! Draws a single colored quad through OpenGL ES 2.0.
//!
//! Every GPU call goes through a [`GraphicsContext`](gl_api::context::GraphicsContext)
//! handed in by the caller, so the whole pipeline can run against
//! [`NativeContext`](gl_api::native::NativeContext) in a window or against a
//! fake in tests.

#[macro_use]
pub mod gl_api;

pub mod config;
pub mod error;
#[cfg(feature = "window")]
pub mod logging;
pub mod pipeline;
pub mod vertex;

pub use crate::config::{ClearColor, RenderConfig};
pub use crate::error::{RenderError, RenderResult};
pub use crate::pipeline::{PipelineStage, QuadPipeline, QuadScene, RenderedQuad};
