use std::collections::HashMap;
use std::marker::PhantomData;
use thiserror::Error;

use super::shader::CompiledShader;
use crate::gl_api::context::{AttribLocation, GraphicsContext, ProgramId, ShaderStage};
use crate::gl_api::error::GlError;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("could not create a program object")]
    Creation,
    #[error("program failed to link:\n{log}")]
    Link { log: String },
    #[error("the program has no active attribute named `{0}`")]
    UnknownAttribute(String),
    #[error(transparent)]
    Gl(#[from] GlError),
}

#[derive(Debug)]
pub struct RawProgram {
    id: ProgramId,
    _marker: PhantomData<*mut ()>,
}

impl RawProgram {
    pub(crate) fn new<G: GraphicsContext + ?Sized>(gl: &mut G) -> Option<Self> {
        let id = gl.create_program()?;
        log::trace!("created program {}", id.raw());
        Some(RawProgram {
            id,
            _marker: PhantomData,
        })
    }

    pub(crate) fn attach_shader<G>(
        &self,
        gl: &mut G,
        shader: &CompiledShader,
    ) -> Result<(), ProgramError>
    where
        G: GraphicsContext + ?Sized,
    {
        gl.attach_shader(self.id, shader.id())?;
        Ok(())
    }

    /// Links the attached shaders. A program that fails to link is deleted;
    /// the linker's log is returned in the error.
    pub(crate) fn link<G>(self, gl: &mut G) -> Result<LinkedProgram, ProgramError>
    where
        G: GraphicsContext + ?Sized,
    {
        let linked = match gl.link_program(self.id) {
            Ok(()) => check_link_status(gl, self.id),
            Err(err) => Err(err.into()),
        };
        match linked {
            Ok(()) => Ok(LinkedProgram {
                raw: self,
                attributes: HashMap::new(),
            }),
            Err(err) => {
                self.delete(gl);
                Err(err)
            }
        }
    }

    fn delete<G: GraphicsContext + ?Sized>(self, gl: &mut G) {
        log::trace!("deleting program {}", self.id.raw());
        if let Err(err) = gl.delete_program(self.id) {
            log::warn!("failed to delete program {}: {}", self.id.raw(), err);
        }
    }
}

/// A program that linked successfully. Attribute locations are looked up the
/// first time they are asked for and remembered afterwards.
#[derive(Debug)]
pub struct LinkedProgram {
    raw: RawProgram,
    attributes: HashMap<String, AttribLocation>,
}

impl LinkedProgram {
    pub fn id(&self) -> ProgramId {
        self.raw.id
    }

    /// Makes this the active program for subsequent draws.
    pub fn bind<G: GraphicsContext + ?Sized>(&self, gl: &mut G) -> Result<(), ProgramError> {
        gl.use_program(self.raw.id)?;
        Ok(())
    }

    pub fn attrib_location<G>(
        &mut self,
        gl: &mut G,
        name: &str,
    ) -> Result<AttribLocation, ProgramError>
    where
        G: GraphicsContext + ?Sized,
    {
        if let Some(&location) = self.attributes.get(name) {
            return Ok(location);
        }
        match gl.attrib_location(self.raw.id, name)? {
            Some(location) => {
                self.attributes.insert(name.to_owned(), location);
                Ok(location)
            }
            None => Err(ProgramError::UnknownAttribute(name.to_owned())),
        }
    }

    pub fn delete<G: GraphicsContext + ?Sized>(self, gl: &mut G) -> Result<(), ProgramError> {
        log::trace!("deleting program {}", self.raw.id.raw());
        gl.delete_program(self.raw.id)?;
        Ok(())
    }
}

/// Links a vertex and a fragment shader into a program.
///
/// The shaders are only borrowed: they are detached again once the program
/// has linked and the caller decides when to delete them.
///
/// # Panics
///
/// If `vertex` or `fragment` was compiled for the other stage.
pub fn link<G>(
    gl: &mut G,
    vertex: &CompiledShader,
    fragment: &CompiledShader,
) -> Result<LinkedProgram, ProgramError>
where
    G: GraphicsContext + ?Sized,
{
    assert_eq!(vertex.stage(), ShaderStage::Vertex);
    assert_eq!(fragment.stage(), ShaderStage::Fragment);

    let program = RawProgram::new(gl).ok_or(ProgramError::Creation)?;
    if let Err(err) = attach_pair(gl, &program, vertex, fragment) {
        program.delete(gl);
        return Err(err);
    }

    let linked = program.link(gl)?;
    if let Err(err) = detach_pair(gl, linked.id(), vertex, fragment) {
        linked.raw.delete(gl);
        return Err(err.into());
    }
    Ok(linked)
}

fn attach_pair<G>(
    gl: &mut G,
    program: &RawProgram,
    vertex: &CompiledShader,
    fragment: &CompiledShader,
) -> Result<(), ProgramError>
where
    G: GraphicsContext + ?Sized,
{
    program.attach_shader(gl, vertex)?;
    program.attach_shader(gl, fragment)
}

fn detach_pair<G>(
    gl: &mut G,
    program: ProgramId,
    vertex: &CompiledShader,
    fragment: &CompiledShader,
) -> Result<(), GlError>
where
    G: GraphicsContext + ?Sized,
{
    gl.detach_shader(program, vertex.id())?;
    gl.detach_shader(program, fragment.id())
}

fn check_link_status<G>(gl: &G, id: ProgramId) -> Result<(), ProgramError>
where
    G: GraphicsContext + ?Sized,
{
    if gl.link_status(id)? {
        return Ok(());
    }

    let log = match gl.program_info_log(id) {
        Ok(log) if !log.trim().is_empty() => log,
        Ok(_) => String::from("the linker did not produce a log"),
        Err(err) => format!("the linker log could not be read: {}", err),
    };
    Err(ProgramError::Link { log })
}
