use std::rc::Rc;

use glow::{HasContext, NativeBuffer, NativeProgram, NativeTexture, NativeUniformLocation, NativeVertexArray};

use crate::errors::{GpuError, ShaderError};
use crate::viewport::Viewport;

/// Shared handle to the one active graphics context.
///
/// Rendering is single threaded and every GPU object keeps a clone of this so
/// it can release itself on drop.
pub type Gpu = Rc<dyn GraphicsDevice>;

/// One vertex attribute channel: where it lives inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub index: u32,
    pub size: i32,
    pub gl_type: u32,
    pub normalized: bool,
    pub offset: usize,
}

impl Layout {
    pub const fn new(index: u32, size: i32, gl_type: u32, normalized: bool, offset: usize) -> Self {
        Self {
            index,
            size,
            gl_type,
            normalized,
            offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
    Uniform,
}

impl BufferTarget {
    pub fn gl(self) -> u32 {
        match self {
            BufferTarget::Vertex => glow::ARRAY_BUFFER,
            BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
            BufferTarget::Uniform => glow::UNIFORM_BUFFER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Static,
    Dynamic,
}

impl BufferUsage {
    pub fn gl(self) -> u32 {
        match self {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        }
    }
}

/// A value for a plain (non-block) uniform. Matrices are column major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3([f32; 3]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

/// Layout of a uniform block as reported by a linked program.
///
/// `offsets` runs parallel to the member names that were queried; members the
/// program optimized away or never declared are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformBlockLayout {
    pub index: u32,
    pub size: usize,
    pub offsets: Vec<Option<usize>>,
}

/// Global fixed-function state applied once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub cull_back_faces: bool,
    pub depth_test: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            cull_back_faces: true,
            depth_test: true,
        }
    }
}

/// The graphics primitives the renderer is built on.
///
/// Binding state is implicit and shared: callers must not assume any binding
/// survives the next bind call.
pub trait GraphicsDevice {
    fn create_buffer(&self) -> Result<NativeBuffer, GpuError>;
    fn delete_buffer(&self, buffer: NativeBuffer);
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<NativeBuffer>);
    /// Replaces the whole store of the buffer bound to `target`.
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]);
    fn bind_buffer_base(&self, binding: u32, buffer: Option<NativeBuffer>);

    fn create_vertex_array(&self) -> Result<NativeVertexArray, GpuError>;
    fn delete_vertex_array(&self, vertex_array: NativeVertexArray);
    fn bind_vertex_array(&self, vertex_array: Option<NativeVertexArray>);
    fn enable_vertex_attribute(&self, index: u32);
    fn disable_vertex_attribute(&self, index: u32);
    fn vertex_attribute_pointer(&self, layout: &Layout, stride: i32);
    /// Draws `index_count` 32-bit indices from the bound index buffer as triangles.
    fn draw_triangles(&self, index_count: i32);

    fn create_texture(&self) -> Result<NativeTexture, GpuError>;
    fn delete_texture(&self, texture: NativeTexture);
    fn upload_texture_rgba8(&self, texture: NativeTexture, width: u32, height: u32, pixels: &[u8]);
    fn bind_texture(&self, unit: u32, texture: Option<NativeTexture>);

    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<NativeProgram, ShaderError>;
    fn delete_program(&self, program: NativeProgram);
    fn use_program(&self, program: Option<NativeProgram>);
    fn uniform_location(&self, program: NativeProgram, name: &str) -> Option<NativeUniformLocation>;
    /// Sets a uniform of the currently used program.
    fn set_uniform(&self, location: Option<&NativeUniformLocation>, value: UniformValue);
    fn uniform_block_layout(
        &self,
        program: NativeProgram,
        block: &str,
        members: &[&str],
    ) -> Option<UniformBlockLayout>;
    fn bind_uniform_block(&self, program: NativeProgram, block_index: u32, binding: u32);

    fn set_pipeline_state(&self, state: &PipelineState);
    fn clear(&self, color: [f32; 4]);
    fn set_viewport(&self, viewport: &Viewport);
}

impl GraphicsDevice for glow::Context {
    fn create_buffer(&self) -> Result<NativeBuffer, GpuError> {
        unsafe { HasContext::create_buffer(self) }.map_err(|message| GpuError::Allocation {
            resource: "buffer",
            message,
        })
    }

    fn delete_buffer(&self, buffer: NativeBuffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<NativeBuffer>) {
        unsafe { HasContext::bind_buffer(self, target.gl(), buffer) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe { self.buffer_data_u8_slice(target.gl(), data, usage.gl()) }
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe { self.buffer_sub_data_u8_slice(target.gl(), offset as i32, data) }
    }

    fn bind_buffer_base(&self, binding: u32, buffer: Option<NativeBuffer>) {
        unsafe { HasContext::bind_buffer_base(self, glow::UNIFORM_BUFFER, binding, buffer) }
    }

    fn create_vertex_array(&self) -> Result<NativeVertexArray, GpuError> {
        unsafe { HasContext::create_vertex_array(self) }.map_err(|message| GpuError::Allocation {
            resource: "vertex array",
            message,
        })
    }

    fn delete_vertex_array(&self, vertex_array: NativeVertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vertex_array) }
    }

    fn bind_vertex_array(&self, vertex_array: Option<NativeVertexArray>) {
        unsafe { HasContext::bind_vertex_array(self, vertex_array) }
    }

    fn enable_vertex_attribute(&self, index: u32) {
        unsafe { self.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attribute(&self, index: u32) {
        unsafe { self.disable_vertex_attrib_array(index) }
    }

    fn vertex_attribute_pointer(&self, layout: &Layout, stride: i32) {
        unsafe {
            self.vertex_attrib_pointer_f32(
                layout.index,
                layout.size,
                layout.gl_type,
                layout.normalized,
                stride,
                layout.offset as i32,
            )
        }
    }

    fn draw_triangles(&self, index_count: i32) {
        unsafe { self.draw_elements(glow::TRIANGLES, index_count, glow::UNSIGNED_INT, 0) }
    }

    fn create_texture(&self) -> Result<NativeTexture, GpuError> {
        unsafe { HasContext::create_texture(self) }.map_err(|message| GpuError::Allocation {
            resource: "texture",
            message,
        })
    }

    fn delete_texture(&self, texture: NativeTexture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn upload_texture_rgba8(&self, texture: NativeTexture, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            HasContext::bind_texture(self, glow::TEXTURE_2D, Some(texture));

            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            self.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            self.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );

            self.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );

            self.generate_mipmap(glow::TEXTURE_2D);
            HasContext::bind_texture(self, glow::TEXTURE_2D, None);
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<NativeTexture>) {
        unsafe {
            self.active_texture(glow::TEXTURE0 + unit);
            HasContext::bind_texture(self, glow::TEXTURE_2D, texture);
        }
    }

    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<NativeProgram, ShaderError> {
        unsafe {
            let vertex_shader = compile_stage(self, name, glow::VERTEX_SHADER, vertex_source)?;
            let fragment_shader =
                match compile_stage(self, name, glow::FRAGMENT_SHADER, fragment_source) {
                    Ok(shader) => shader,
                    Err(e) => {
                        self.delete_shader(vertex_shader);
                        return Err(e);
                    }
                };

            let program = HasContext::create_program(self).map_err(|message| GpuError::Allocation {
                resource: "program",
                message,
            })?;
            self.attach_shader(program, vertex_shader);
            self.attach_shader(program, fragment_shader);
            self.link_program(program);

            self.detach_shader(program, vertex_shader);
            self.detach_shader(program, fragment_shader);
            self.delete_shader(vertex_shader);
            self.delete_shader(fragment_shader);

            if !self.get_program_link_status(program) {
                let log = self.get_program_info_log(program);
                HasContext::delete_program(self, program);
                return Err(ShaderError::Link {
                    name: name.to_string(),
                    log,
                });
            }

            Ok(program)
        }
    }

    fn delete_program(&self, program: NativeProgram) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn use_program(&self, program: Option<NativeProgram>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn uniform_location(&self, program: NativeProgram, name: &str) -> Option<NativeUniformLocation> {
        unsafe { self.get_uniform_location(program, name) }
    }

    fn set_uniform(&self, location: Option<&NativeUniformLocation>, value: UniformValue) {
        unsafe {
            match value {
                UniformValue::Int(v) => self.uniform_1_i32(location, v),
                UniformValue::Float(v) => self.uniform_1_f32(location, v),
                UniformValue::Vec3([x, y, z]) => self.uniform_3_f32(location, x, y, z),
                UniformValue::Mat3(m) => self.uniform_matrix_3_f32_slice(location, false, &m),
                UniformValue::Mat4(m) => self.uniform_matrix_4_f32_slice(location, false, &m),
            }
        }
    }

    fn uniform_block_layout(
        &self,
        program: NativeProgram,
        block: &str,
        members: &[&str],
    ) -> Option<UniformBlockLayout> {
        unsafe {
            let index = self.get_uniform_block_index(program, block)?;
            let size = self.get_active_uniform_block_parameter_i32(
                program,
                index,
                glow::UNIFORM_BLOCK_DATA_SIZE,
            );

            let indices = self.get_uniform_indices(program, members);
            let found: Vec<u32> = indices.iter().flatten().copied().collect();
            let found_offsets = if found.is_empty() {
                Vec::new()
            } else {
                self.get_active_uniforms_parameter(program, &found, glow::UNIFORM_OFFSET)
            };

            let mut found_offsets = found_offsets.into_iter();
            let offsets = indices
                .iter()
                .map(|index| {
                    index.and_then(|_| found_offsets.next()).and_then(|offset| usize::try_from(offset).ok())
                })
                .collect();

            Some(UniformBlockLayout {
                index,
                size: usize::try_from(size).unwrap_or(0),
                offsets,
            })
        }
    }

    fn bind_uniform_block(&self, program: NativeProgram, block_index: u32, binding: u32) {
        unsafe { self.uniform_block_binding(program, block_index, binding) }
    }

    fn set_pipeline_state(&self, state: &PipelineState) {
        unsafe {
            if state.cull_back_faces {
                self.enable(glow::CULL_FACE);
                self.cull_face(glow::BACK);
            } else {
                self.disable(glow::CULL_FACE);
            }

            if state.depth_test {
                self.enable(glow::DEPTH_TEST);
                self.depth_func(glow::LESS);
            } else {
                self.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn clear(&self, color: [f32; 4]) {
        unsafe {
            self.clear_color(color[0], color[1], color[2], color[3]);
            HasContext::clear(self, glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn set_viewport(&self, viewport: &Viewport) {
        unsafe { self.viewport(viewport.x, viewport.y, viewport.width, viewport.height) }
    }
}

unsafe fn compile_stage(
    gl: &glow::Context,
    name: &str,
    stage: u32,
    source: &str,
) -> Result<glow::NativeShader, ShaderError> {
    let stage_name = if stage == glow::VERTEX_SHADER {
        "vertex"
    } else {
        "fragment"
    };

    let shader = gl.create_shader(stage).map_err(|message| GpuError::Allocation {
        resource: "shader",
        message,
    })?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(ShaderError::Compile {
            name: name.to_string(),
            stage: stage_name,
            log,
        });
    }

    Ok(shader)
}
