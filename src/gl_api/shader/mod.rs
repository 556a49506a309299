#[allow(clippy::module_inception)]
pub mod shader;
pub mod program;

pub use self::program::{link, LinkedProgram, ProgramError};
pub use self::shader::{compile, CompiledShader, Shader, ShaderError};
pub use super::context::ShaderStage;
