//! The one-shot render pipeline: clear the surface, build the program, pack
//! and upload the quad, wire up its attributes and draw it once.

use cgmath::{Vector2, Vector4};
use std::fmt;

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::gl_api::buffer::{ElementBuffer, UsageType, VertexBuffer};
use crate::gl_api::context::{DrawCall, GraphicsContext, ShaderStage};
use crate::gl_api::layout::VertexLayout;
use crate::gl_api::shader::{self, LinkedProgram};
use crate::vertex::{self, ColoredVertex, IndexList};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PipelineStage {
    Init,
    Compile,
    Link,
    Pack,
    Upload,
    Bind,
    Draw,
    Done,
    Aborted,
}

/// Everything the pipeline draws. `Default` is a two-triangle quad with a
/// different color in each corner.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadScene {
    pub vertex_source: String,
    pub fragment_source: String,
    pub positions: Vec<Vector2<f32>>,
    pub colors: Vec<Vector4<u8>>,
    pub indices: IndexList,
}

impl Default for QuadScene {
    fn default() -> Self {
        QuadScene {
            vertex_source: String::from(include_str!("../res/quad.glslv")),
            fragment_source: String::from(include_str!("../res/quad.glslf")),
            positions: vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(0.0, 0.5),
                Vector2::new(0.7, 0.0),
                Vector2::new(0.7, 0.5),
            ],
            colors: vec![
                Vector4::new(255, 0, 0, 255),
                Vector4::new(0, 255, 0, 255),
                Vector4::new(0, 0, 255, 255),
                Vector4::new(128, 128, 0, 255),
            ],
            indices: IndexList::new(vec![0, 1, 2, 2, 1, 3]),
        }
    }
}

/// The GPU objects behind a finished draw. They stay alive until `release`
/// is called on the context that created them.
#[derive(Debug)]
pub struct RenderedQuad {
    program: LinkedProgram,
    vertices: VertexBuffer<ColoredVertex>,
    elements: ElementBuffer<u16>,
    draw_call: DrawCall,
}

impl RenderedQuad {
    pub fn draw_call(&self) -> DrawCall {
        self.draw_call
    }

    pub fn program(&self) -> &LinkedProgram {
        &self.program
    }

    pub fn vertex_buffer(&self) -> &VertexBuffer<ColoredVertex> {
        &self.vertices
    }

    pub fn element_buffer(&self) -> &ElementBuffer<u16> {
        &self.elements
    }

    /// Clears and issues the same draw again, e.g. after the window was
    /// exposed. Attribute state from the first draw is still in place.
    pub fn redraw<G: GraphicsContext + ?Sized>(&self, gl: &mut G) -> RenderResult<()> {
        gl.clear_color_buffer()?;
        self.program.bind(gl)?;
        self.vertices.bind(gl)?;
        self.elements.bind(gl)?;
        gl.draw_elements(&self.draw_call)?;
        Ok(())
    }

    /// Deletes the program and both buffers. Every object is released even if
    /// an earlier one fails; the first failure is returned.
    pub fn release<G: GraphicsContext + ?Sized>(self, gl: &mut G) -> RenderResult<()> {
        let program = self.program.delete(gl).map_err(RenderError::from);
        let vertices = self.vertices.delete(gl).map_err(RenderError::from);
        let elements = self.elements.delete(gl).map_err(RenderError::from);
        program.and(vertices).and(elements)
    }

    fn discard<G: GraphicsContext + ?Sized>(self, gl: &mut G) {
        discard(self.release(gl), "quad");
    }
}

#[derive(Debug)]
pub struct QuadPipeline {
    scene: QuadScene,
    stage: PipelineStage,
}

impl QuadPipeline {
    pub fn new(scene: QuadScene) -> Self {
        QuadPipeline {
            scene,
            stage: PipelineStage::Init,
        }
    }

    /// The stage the last `run` reached. `Aborted` if it failed.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn scene(&self) -> &QuadScene {
        &self.scene
    }

    /// Runs every stage in order and draws the scene once.
    ///
    /// On failure the error is logged, every GPU object created along the way
    /// is released and the pipeline is left `Aborted`.
    pub fn run<G>(&mut self, gl: &mut G, config: &RenderConfig) -> RenderResult<RenderedQuad>
    where
        G: GraphicsContext + ?Sized,
    {
        self.stage = PipelineStage::Init;
        match self.execute(gl, config) {
            Ok(quad) => {
                self.advance(PipelineStage::Done);
                Ok(quad)
            }
            Err(err) => {
                log::error!("render pipeline aborted during {}: {}", self.stage, err);
                self.stage = PipelineStage::Aborted;
                Err(err)
            }
        }
    }

    fn execute<G>(&mut self, gl: &mut G, config: &RenderConfig) -> RenderResult<RenderedQuad>
    where
        G: GraphicsContext + ?Sized,
    {
        self.init(gl, config)?;
        let program = self.build_program(gl)?;

        let (vertices, elements, layout) = match self.upload(gl) {
            Ok(uploaded) => uploaded,
            Err(err) => {
                discard(program.delete(gl), "program");
                return Err(err);
            }
        };

        let mut quad = RenderedQuad {
            program,
            vertices,
            elements,
            draw_call: DrawCall::triangles(self.scene.indices.len()),
        };
        match self.bind_and_draw(gl, &mut quad, &layout) {
            Ok(()) => Ok(quad),
            Err(err) => {
                quad.discard(gl);
                Err(err)
            }
        }
    }

    fn init<G>(&mut self, gl: &mut G, config: &RenderConfig) -> RenderResult<()>
    where
        G: GraphicsContext + ?Sized,
    {
        config.validate()?;
        let color = config.clear_color;
        if let Some(component) = color.out_of_range() {
            log::warn!(
                "clear color component {} is outside [0, 1] and will be clamped by the GL",
                component
            );
        }

        gl.viewport(0, 0, config.width, config.height)?;
        gl.clear_color(color.red, color.green, color.blue, color.alpha)?;
        gl.clear_color_buffer()?;
        Ok(())
    }

    /// Compiles both stages and links them. The shader objects are released
    /// before returning, whatever the outcome.
    fn build_program<G>(&mut self, gl: &mut G) -> RenderResult<LinkedProgram>
    where
        G: GraphicsContext + ?Sized,
    {
        self.advance(PipelineStage::Compile);
        let vertex = shader::compile(gl, ShaderStage::Vertex, &self.scene.vertex_source)?;
        let fragment_source = &self.scene.fragment_source;
        let fragment = match shader::compile(gl, ShaderStage::Fragment, fragment_source) {
            Ok(fragment) => fragment,
            Err(err) => {
                discard(vertex.delete(gl), "vertex shader");
                return Err(err.into());
            }
        };

        self.advance(PipelineStage::Link);
        let linked = shader::link(gl, &vertex, &fragment);
        discard(vertex.delete(gl), "vertex shader");
        discard(fragment.delete(gl), "fragment shader");
        Ok(linked?)
    }

    fn upload<G>(
        &mut self,
        gl: &mut G,
    ) -> RenderResult<(VertexBuffer<ColoredVertex>, ElementBuffer<u16>, VertexLayout)>
    where
        G: GraphicsContext + ?Sized,
    {
        self.advance(PipelineStage::Pack);
        let packed = vertex::pack(&self.scene.positions, &self.scene.colors)?;
        if let Some(index) = self.scene.indices.first_out_of_range(packed.len()) {
            return Err(RenderError::IndexOutOfRange {
                index,
                vertex_count: packed.len(),
            });
        }

        self.advance(PipelineStage::Upload);
        let mut vertices = VertexBuffer::new(gl).ok_or(RenderError::BufferCreation)?;
        if let Err(err) = vertices.upload_interleaved(gl, &packed, UsageType::StaticDraw) {
            discard(vertices.delete(gl), "vertex buffer");
            return Err(err.into());
        }

        let mut elements = match ElementBuffer::new(gl) {
            Some(elements) => elements,
            None => {
                discard(vertices.delete(gl), "vertex buffer");
                return Err(RenderError::BufferCreation);
            }
        };
        let indices = self.scene.indices.as_slice();
        if let Err(err) = elements.upload(gl, indices, UsageType::StaticDraw) {
            discard(vertices.delete(gl), "vertex buffer");
            discard(elements.delete(gl), "element buffer");
            return Err(err.into());
        }

        Ok((vertices, elements, packed.layout().clone()))
    }

    fn bind_and_draw<G>(
        &mut self,
        gl: &mut G,
        quad: &mut RenderedQuad,
        layout: &VertexLayout,
    ) -> RenderResult<()>
    where
        G: GraphicsContext + ?Sized,
    {
        self.advance(PipelineStage::Bind);
        quad.vertices.bind(gl)?;
        layout.bind_attributes(gl, &mut quad.program)?;
        quad.elements.bind(gl)?;

        self.advance(PipelineStage::Draw);
        quad.program.bind(gl)?;
        gl.draw_elements(&quad.draw_call)?;
        Ok(())
    }

    fn advance(&mut self, stage: PipelineStage) {
        log::debug!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            PipelineStage::Init => "init",
            PipelineStage::Compile => "compile",
            PipelineStage::Link => "link",
            PipelineStage::Pack => "pack",
            PipelineStage::Upload => "upload",
            PipelineStage::Bind => "bind",
            PipelineStage::Draw => "draw",
            PipelineStage::Done => "done",
            PipelineStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

fn discard<E: fmt::Display>(result: Result<(), E>, what: &str) {
    if let Err(err) = result {
        log::warn!("failed to release {}: {}", what, err);
    }
}
