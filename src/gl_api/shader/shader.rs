use std::marker::PhantomData;
use thiserror::Error;

use crate::gl_api::context::{GraphicsContext, ShaderId, ShaderStage};
use crate::gl_api::error::GlError;

pub type ShaderResult<T> = Result<T, ShaderError>;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("could not create a {0} shader object")]
    Creation(ShaderStage),
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error(transparent)]
    Gl(#[from] GlError),
}

/// A shader object that has not been compiled yet.
#[derive(Debug)]
pub struct Shader {
    id: ShaderId,
    shader_type: ShaderStage,
    _marker: PhantomData<*mut ()>,
}

impl Shader {
    pub fn new<G>(gl: &mut G, shader_type: ShaderStage) -> ShaderResult<Self>
    where
        G: GraphicsContext + ?Sized,
    {
        let id = gl.create_shader(shader_type).ok_or(ShaderError::Creation(shader_type))?;
        log::trace!("created {} shader {}", shader_type, id.raw());
        Ok(Shader {
            id,
            shader_type,
            _marker: PhantomData,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.shader_type
    }

    pub fn source<G>(&self, gl: &mut G, source: &str) -> ShaderResult<()>
    where
        G: GraphicsContext + ?Sized,
    {
        gl.shader_source(self.id, source)?;
        Ok(())
    }

    /// Compiles the shader. On failure the shader object is deleted and the
    /// compiler's log is handed back in the error.
    pub fn compile<G: GraphicsContext + ?Sized>(self, gl: &mut G) -> ShaderResult<CompiledShader> {
        let id = self.id;
        let stage = self.shader_type;

        let compiled = match gl.compile_shader(id) {
            Ok(()) => gl.compile_status(id),
            Err(err) => Err(err),
        };
        match compiled {
            Ok(true) => Ok(CompiledShader {
                shader: self,
            }),
            Ok(false) => {
                let log = match gl.shader_info_log(id) {
                    Ok(log) if !log.trim().is_empty() => log,
                    Ok(_) => String::from("the compiler did not produce a log"),
                    Err(err) => format!("the compiler log could not be read: {}", err),
                };
                self.delete(gl);
                Err(ShaderError::Compile { stage, log })
            }
            Err(err) => {
                self.delete(gl);
                Err(err.into())
            }
        }
    }

    fn delete<G: GraphicsContext + ?Sized>(self, gl: &mut G) {
        if let Err(err) = gl.delete_shader(self.id) {
            log::warn!("failed to delete {} shader {}: {}", self.shader_type, self.id.raw(), err);
        }
    }
}

/// A successfully compiled shader, ready to be attached to a program.
#[derive(Debug)]
pub struct CompiledShader {
    shader: Shader,
}

impl CompiledShader {
    pub fn id(&self) -> ShaderId {
        self.shader.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.shader.shader_type
    }

    /// Releases the shader object. Programs it was linked into keep working.
    pub fn delete<G: GraphicsContext + ?Sized>(self, gl: &mut G) -> ShaderResult<()> {
        log::trace!("deleting {} shader {}", self.stage(), self.id().raw());
        gl.delete_shader(self.id())?;
        Ok(())
    }
}

/// Creates a shader object for `stage`, hands it `source` and compiles it.
pub fn compile<G>(gl: &mut G, stage: ShaderStage, source: &str) -> ShaderResult<CompiledShader>
where
    G: GraphicsContext + ?Sized,
{
    let shader = Shader::new(gl, stage)?;
    if let Err(err) = shader.source(gl, source) {
        shader.delete(gl);
        return Err(err);
    }
    shader.compile(gl)
}
