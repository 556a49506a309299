//! A `GraphicsContext` that records every call instead of talking to a GPU.
//!
//! It behaves like a strict GLES 2.0 driver as far as object bookkeeping goes:
//! touching a deleted or unknown name is an error, and so is drawing without a
//! program or with too little index data. Compilation fails for sources that
//! use an identifier which is neither declared in the source nor a GLSL ES
//! keyword or built-in; linking checks that every varying the fragment shader
//! reads is declared with the same type by the vertex shader. Attribute
//! locations are handed out in declaration order.

use gl::types::*;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use super::buffer::{Target, UsageType};
use super::context::*;
use super::error::{GlError, GlResult};
use super::layout::{AttribFormat, MAX_STRIDE};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    CreateShader(ShaderStage, ShaderId),
    ShaderSource(ShaderId),
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    DetachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId),
    UseProgram(ProgramId),
    DeleteProgram(ProgramId),
    CreateBuffer(BufferId),
    BindBuffer(Target, BufferId),
    BufferData { target: Target, len: usize, usage: UsageType },
    DeleteBuffer(BufferId),
    VertexAttribPointer {
        location: AttribLocation,
        format: AttribFormat,
        stride: usize,
        offset: usize,
    },
    EnableVertexAttribArray(AttribLocation),
    DrawElements(DrawCall),
    Viewport(i32, i32, u32, u32),
    ClearColor([f32; 4]),
    Clear,
}

struct FakeShader {
    stage: ShaderStage,
    source: String,
    compiled: Option<Result<(), String>>,
}

struct FakeProgram {
    attached: Vec<ShaderId>,
    /// Active attributes on success, the link log on failure.
    linked: Option<Result<Vec<String>, String>>,
}

#[derive(Default)]
pub(crate) struct RecordingContext {
    calls: Vec<Call>,
    next_name: GLuint,
    refuse_creation: bool,
    refuse_buffers: bool,
    fail_shader_deletes: bool,
    shaders: HashMap<ShaderId, FakeShader>,
    programs: HashMap<ProgramId, FakeProgram>,
    buffers: HashMap<BufferId, Vec<u8>>,
    bindings: HashMap<Target, BufferId>,
    current_program: Option<ProgramId>,
    attrib_queries: Cell<usize>,
}

fn invalid_value() -> GlError {
    GlError::new(gl::INVALID_VALUE)
}

fn invalid_operation() -> GlError {
    GlError::new(gl::INVALID_OPERATION)
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while !rest.is_empty() {
        if rest.starts_with("//") {
            let end = rest.find('\n').unwrap_or(rest.len());
            rest = &rest[end..];
        } else if rest.starts_with("/*") {
            let end = rest[2..].find("*/").map(|i| i + 4).unwrap_or(rest.len());
            // Keep line numbers intact.
            out.extend(rest[..end].chars().filter(|&c| c == '\n'));
            rest = &rest[end..];
        } else {
            let c = rest.chars().next().unwrap();
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

/// GLSL ES 1.00 type names. An identifier right after one of these is being
/// declared.
const TYPES: &[&str] = &[
    "void", "bool", "int", "float", "vec2", "vec3", "vec4", "bvec2", "bvec3", "bvec4", "ivec2",
    "ivec3", "ivec4", "mat2", "mat3", "mat4", "sampler2D", "samplerCube",
];

const KEYWORDS: &[&str] = &[
    "attribute", "const", "uniform", "varying", "break", "continue", "do", "for", "while", "if",
    "else", "in", "out", "inout", "true", "false", "lowp", "mediump", "highp", "precision",
    "invariant", "discard", "return", "struct",
];

const BUILTIN_FUNCTIONS: &[&str] = &[
    "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "atan", "pow", "exp", "log",
    "exp2", "log2", "sqrt", "inversesqrt", "abs", "sign", "floor", "ceil", "fract", "mod", "min",
    "max", "clamp", "mix", "step", "smoothstep", "length", "distance", "dot", "cross",
    "normalize", "faceforward", "reflect", "refract", "matrixCompMult", "lessThan",
    "lessThanEqual", "greaterThan", "greaterThanEqual", "equal", "notEqual", "any", "all", "not",
    "texture2D", "texture2DProj", "texture2DLod", "texture2DProjLod", "textureCube",
    "textureCubeLod",
];

fn is_builtin(ident: &str) -> bool {
    ident.starts_with("gl_")
        || TYPES.contains(&ident)
        || KEYWORDS.contains(&ident)
        || BUILTIN_FUNCTIONS.contains(&ident)
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Token<'a> {
    Ident(&'a str),
    Number,
    Punct(char),
}

fn tokens(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start + c.len_utf8();
            while let Some(&(index, next)) = chars.peek() {
                if !(next.is_ascii_alphanumeric() || next == '_') {
                    break;
                }
                end = index + next.len_utf8();
                chars.next();
            }
            tokens.push(Token::Ident(&source[start..end]));
        } else if c.is_ascii_digit() {
            while let Some(&(_, next)) = chars.peek() {
                if !(next.is_ascii_alphanumeric() || next == '.' || next == '_') {
                    break;
                }
                chars.next();
            }
            tokens.push(Token::Number);
        } else if !c.is_whitespace() {
            tokens.push(Token::Punct(c));
        }
    }
    tokens
}

/// Every name the source declares: globals, locals, parameters and functions.
fn declared_names(source: &str) -> HashSet<&str> {
    tokens(source)
        .windows(2)
        .filter_map(|pair| match (pair[0], pair[1]) {
            (Token::Ident(ty), Token::Ident(name)) if TYPES.contains(&ty) => Some(name),
            _ => None,
        })
        .collect()
}

/// The first identifier on `line` that is not declared and not built in.
/// Names after a `.` are swizzles or fields and are not looked up.
fn first_undeclared<'a>(line: &'a str, declared: &HashSet<&str>) -> Option<&'a str> {
    let tokens = tokens(line);
    tokens.iter().enumerate().find_map(|(index, token)| match *token {
        Token::Ident(ident)
            if !(index > 0 && tokens[index - 1] == Token::Punct('.'))
                && !is_builtin(ident)
                && !declared.contains(ident) =>
        {
            Some(ident)
        }
        _ => None,
    })
}

fn identifiers(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
}

/// `(type, name)` of every declaration introduced by `qualifier`.
fn declarations(source: &str, qualifier: &str) -> Vec<(String, String)> {
    strip_comments(source)
        .split(';')
        .filter_map(|statement| {
            let tokens: Vec<_> = identifiers(statement).collect();
            match tokens.split_first() {
                Some((&first, rest)) if first == qualifier && rest.len() >= 2 => {
                    let name = rest[rest.len() - 1];
                    let ty = rest[rest.len() - 2];
                    Some((ty.to_owned(), name.to_owned()))
                }
                _ => None,
            }
        })
        .collect()
}

impl RecordingContext {
    pub(crate) fn new() -> Self {
        RecordingContext::default()
    }

    /// Makes every following `create_*` call fail.
    pub(crate) fn refuse_object_creation(&mut self) {
        self.refuse_creation = true;
    }

    /// Makes every following `delete_shader` call fail and keep the shader.
    pub(crate) fn fail_shader_deletes(&mut self) {
        self.fail_shader_deletes = true;
    }

    /// Makes every following `create_buffer` call fail.
    pub(crate) fn refuse_buffer_creation(&mut self) {
        self.refuse_buffers = true;
    }

    pub(crate) fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub(crate) fn draw_calls(&self) -> Vec<DrawCall> {
        self.calls
            .iter()
            .filter_map(|call| match *call {
                Call::DrawElements(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|data| &data[..])
    }

    pub(crate) fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub(crate) fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub(crate) fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub(crate) fn live_objects(&self) -> usize {
        self.live_shaders() + self.live_programs() + self.live_buffers()
    }

    pub(crate) fn attrib_queries(&self) -> usize {
        self.attrib_queries.get()
    }

    fn next_name(&mut self) -> Option<GLuint> {
        if self.refuse_creation {
            return None;
        }
        self.next_name += 1;
        Some(self.next_name)
    }

    fn shader(&self, shader: ShaderId) -> GlResult<&FakeShader> {
        self.shaders.get(&shader).ok_or_else(invalid_value)
    }

    fn program(&self, program: ProgramId) -> GlResult<&FakeProgram> {
        self.programs.get(&program).ok_or_else(invalid_value)
    }

    fn run_compiler(&self, source: &str) -> Result<(), String> {
        let source = strip_comments(source);
        let declared = declared_names(&source);
        for (number, line) in source.lines().enumerate() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            if let Some(ident) = first_undeclared(line, &declared) {
                return Err(format!(
                    "ERROR: 0:{}: '{}' : undeclared identifier\n",
                    number + 1,
                    ident
                ));
            }
        }
        if !declared.contains("main") {
            return Err(String::from("ERROR: 0:1: '' : missing main()\n"));
        }
        Ok(())
    }

    fn run_linker(&self, attached: &[ShaderId]) -> Result<Vec<String>, String> {
        let compiled = |stage| {
            attached
                .iter()
                .filter_map(|id| self.shaders.get(id))
                .find(|shader| shader.stage == stage && shader.compiled == Some(Ok(())))
        };
        let stages = (compiled(ShaderStage::Vertex), compiled(ShaderStage::Fragment));
        let (vertex, fragment) = match stages {
            (Some(vertex), Some(fragment)) => (vertex, fragment),
            _ => {
                return Err(String::from(
                    "error: a compiled vertex and fragment shader must be attached\n",
                ))
            }
        };

        let written = declarations(&vertex.source, "varying");
        for (ty, name) in declarations(&fragment.source, "varying") {
            match written.iter().find(|(_, written_name)| *written_name == name) {
                None => {
                    return Err(format!(
                        "error: fragment shader varying {} not written by vertex shader\n",
                        name
                    ))
                }
                Some((written_ty, _)) if *written_ty != ty => {
                    return Err(format!(
                        "error: varying `{}' is {} when written but {} when read\n",
                        name, written_ty, ty
                    ))
                }
                Some(_) => {}
            }
        }

        Ok(declarations(&vertex.source, "attribute")
            .into_iter()
            .map(|(_, name)| name)
            .collect())
    }
}

impl GraphicsContext for RecordingContext {
    fn create_shader(&mut self, stage: ShaderStage) -> Option<ShaderId> {
        let id = ShaderId(self.next_name()?);
        self.shaders.insert(
            id,
            FakeShader {
                stage,
                source: String::new(),
                compiled: None,
            },
        );
        self.calls.push(Call::CreateShader(stage, id));
        Some(id)
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) -> GlResult<()> {
        let fake = self.shaders.get_mut(&shader).ok_or_else(invalid_value)?;
        fake.source = source.to_owned();
        self.calls.push(Call::ShaderSource(shader));
        Ok(())
    }

    fn compile_shader(&mut self, shader: ShaderId) -> GlResult<()> {
        let result = self.run_compiler(&self.shader(shader)?.source);
        if let Some(fake) = self.shaders.get_mut(&shader) {
            fake.compiled = Some(result);
        }
        self.calls.push(Call::CompileShader(shader));
        Ok(())
    }

    fn compile_status(&self, shader: ShaderId) -> GlResult<bool> {
        Ok(self.shader(shader)?.compiled == Some(Ok(())))
    }

    fn shader_info_log(&self, shader: ShaderId) -> GlResult<String> {
        Ok(match self.shader(shader)?.compiled {
            Some(Err(ref log)) => log.clone(),
            _ => String::new(),
        })
    }

    fn delete_shader(&mut self, shader: ShaderId) -> GlResult<()> {
        if self.fail_shader_deletes {
            return Err(invalid_operation());
        }
        self.shaders.remove(&shader).ok_or_else(invalid_value)?;
        self.calls.push(Call::DeleteShader(shader));
        Ok(())
    }

    fn create_program(&mut self) -> Option<ProgramId> {
        let id = ProgramId(self.next_name()?);
        self.programs.insert(
            id,
            FakeProgram {
                attached: Vec::new(),
                linked: None,
            },
        );
        self.calls.push(Call::CreateProgram(id));
        Some(id)
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> GlResult<()> {
        self.shader(shader)?;
        let fake = self.programs.get_mut(&program).ok_or_else(invalid_value)?;
        if fake.attached.contains(&shader) {
            return Err(invalid_operation());
        }
        fake.attached.push(shader);
        self.calls.push(Call::AttachShader(program, shader));
        Ok(())
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) -> GlResult<()> {
        let fake = self.programs.get_mut(&program).ok_or_else(invalid_value)?;
        let index = fake
            .attached
            .iter()
            .position(|&attached| attached == shader)
            .ok_or_else(invalid_operation)?;
        fake.attached.remove(index);
        self.calls.push(Call::DetachShader(program, shader));
        Ok(())
    }

    fn link_program(&mut self, program: ProgramId) -> GlResult<()> {
        let result = self.run_linker(&self.program(program)?.attached);
        if let Some(fake) = self.programs.get_mut(&program) {
            fake.linked = Some(result);
        }
        self.calls.push(Call::LinkProgram(program));
        Ok(())
    }

    fn link_status(&self, program: ProgramId) -> GlResult<bool> {
        Ok(match self.program(program)?.linked {
            Some(Ok(_)) => true,
            _ => false,
        })
    }

    fn program_info_log(&self, program: ProgramId) -> GlResult<String> {
        Ok(match self.program(program)?.linked {
            Some(Err(ref log)) => log.clone(),
            _ => String::new(),
        })
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> GlResult<Option<AttribLocation>> {
        self.attrib_queries.set(self.attrib_queries.get() + 1);
        match self.program(program)?.linked {
            Some(Ok(ref attributes)) => Ok(attributes
                .iter()
                .position(|attribute| attribute == name)
                .map(|index| AttribLocation(index as GLuint))),
            _ => Err(invalid_operation()),
        }
    }

    fn use_program(&mut self, program: ProgramId) -> GlResult<()> {
        match self.program(program)?.linked {
            Some(Ok(_)) => {}
            _ => return Err(invalid_operation()),
        }
        self.current_program = Some(program);
        self.calls.push(Call::UseProgram(program));
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) -> GlResult<()> {
        self.programs.remove(&program).ok_or_else(invalid_value)?;
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.calls.push(Call::DeleteProgram(program));
        Ok(())
    }

    fn create_buffer(&mut self) -> Option<BufferId> {
        if self.refuse_buffers {
            return None;
        }
        let id = BufferId(self.next_name()?);
        self.buffers.insert(id, Vec::new());
        self.calls.push(Call::CreateBuffer(id));
        Some(id)
    }

    fn bind_buffer(&mut self, target: Target, buffer: BufferId) -> GlResult<()> {
        if !self.buffers.contains_key(&buffer) {
            return Err(invalid_operation());
        }
        self.bindings.insert(target, buffer);
        self.calls.push(Call::BindBuffer(target, buffer));
        Ok(())
    }

    fn buffer_data(&mut self, target: Target, data: &[u8], usage: UsageType) -> GlResult<()> {
        let bound = *self.bindings.get(&target).ok_or_else(invalid_operation)?;
        let store = self.buffers.get_mut(&bound).ok_or_else(invalid_operation)?;
        *store = data.to_vec();
        self.calls.push(Call::BufferData {
            target,
            len: data.len(),
            usage,
        });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> GlResult<()> {
        self.buffers.remove(&buffer).ok_or_else(invalid_value)?;
        self.bindings.retain(|_, &mut bound| bound != buffer);
        self.calls.push(Call::DeleteBuffer(buffer));
        Ok(())
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        format: AttribFormat,
        stride: usize,
        offset: usize,
    ) -> GlResult<()> {
        if !self.bindings.contains_key(&Target::Array) {
            return Err(invalid_operation());
        }
        if format.components < 1 || format.components > 4 || stride > MAX_STRIDE {
            return Err(invalid_value());
        }
        self.calls.push(Call::VertexAttribPointer {
            location,
            format,
            stride,
            offset,
        });
        Ok(())
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) -> GlResult<()> {
        self.calls.push(Call::EnableVertexAttribArray(location));
        Ok(())
    }

    fn draw_elements(&mut self, call: &DrawCall) -> GlResult<()> {
        if self.current_program.is_none() {
            return Err(invalid_operation());
        }
        let elements = self
            .bindings
            .get(&Target::Element)
            .and_then(|buffer| self.buffers.get(buffer))
            .ok_or_else(invalid_operation)?;
        if call.offset + call.count * call.index_type.size() > elements.len() {
            return Err(invalid_operation());
        }
        self.calls.push(Call::DrawElements(*call));
        Ok(())
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) -> GlResult<()> {
        self.calls.push(Call::Viewport(x, y, width, height));
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(invalid_value());
        }
        Ok(())
    }

    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) -> GlResult<()> {
        self.calls.push(Call::ClearColor([red, green, blue, alpha]));
        Ok(())
    }

    fn clear_color_buffer(&mut self) -> GlResult<()> {
        self.calls.push(Call::Clear);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_do_not_declare_varyings() {
        let source = "
            // varying vec4 v_hidden;
            /* varying vec2 v_block; */
            varying lowp vec4 v_color;
            void main() {}";
        assert_eq!(
            declarations(source, "varying"),
            vec![(String::from("vec4"), String::from("v_color"))]
        );
    }

    #[test]
    fn undeclared_identifier_is_reported_with_its_line() {
        let gl = RecordingContext::new();
        let err = gl.run_compiler("void main() {\n  gl_Position = missing;\n}").unwrap_err();
        assert!(err.contains("0:2"), "{}", err);
        assert!(err.contains("'missing'"), "{}", err);
    }

    #[test]
    fn declared_names_and_builtins_resolve() {
        let gl = RecordingContext::new();
        let source = "
            #version 100
            precision mediump float;
            uniform sampler2D u_texture;
            varying vec2 v_uv;
            float brighten(float value) {
                return clamp(value * 1.5, 0.0, 1.0);
            }
            void main() {
                vec4 texel = texture2D(u_texture, v_uv.st);
                gl_FragColor = vec4(brighten(texel.r), texel.gb, 1.0e-3);
            }";
        assert_eq!(gl.run_compiler(source), Ok(()));
    }

    #[test]
    fn names_are_only_declared_by_a_type() {
        let gl = RecordingContext::new();
        let err = gl
            .run_compiler("varying vec4 v_color;\nvoid main() {\n  gl_FragColor = v_colour;\n}")
            .unwrap_err();
        assert!(err.contains("0:3: 'v_colour'"), "{}", err);
    }

    #[test]
    fn source_without_main_fails() {
        let gl = RecordingContext::new();
        assert!(gl.run_compiler("attribute vec2 a_position;").is_err());
    }

    #[test]
    fn deleted_names_are_invalid() {
        let mut gl = RecordingContext::new();
        let shader = gl.create_shader(ShaderStage::Vertex).unwrap();
        gl.delete_shader(shader).unwrap();
        assert_eq!(gl.compile_shader(shader), Err(invalid_value()));
    }

    #[test]
    fn drawing_past_the_element_buffer_fails() {
        let mut gl = RecordingContext::new();
        let buffer = gl.create_buffer().unwrap();
        gl.bind_buffer(Target::Element, buffer).unwrap();
        gl.buffer_data(Target::Element, &[0; 4], UsageType::StaticDraw).unwrap();
        gl.current_program = Some(ProgramId(99));
        assert_eq!(gl.draw_elements(&DrawCall::triangles(3)), Err(invalid_operation()));
        assert!(gl.draw_elements(&DrawCall::triangles(2)).is_ok());
    }
}
