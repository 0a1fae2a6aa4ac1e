//! Headless [`GraphicsDevice`] that records every command instead of talking
//! to a driver.
//!
//! Used by the test suite and handy for inspecting what a frame submits
//! without a window. Object names are allocated from one counter, so every
//! buffer, texture, program and uniform location is unique for the lifetime
//! of the device. Uniform blocks get a synthetic layout of one
//! [`RecordingDevice::BLOCK_SLOT`]-byte slot per member, in query order.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::num::NonZeroU32;

use glow::{NativeBuffer, NativeProgram, NativeTexture, NativeUniformLocation, NativeVertexArray};

use crate::errors::{GpuError, ShaderError};
use crate::opengl::{
    BufferTarget, BufferUsage, GraphicsDevice, Layout, PipelineState, UniformBlockLayout,
    UniformValue,
};
use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateBuffer(NativeBuffer),
    DeleteBuffer(NativeBuffer),
    BindBuffer(BufferTarget, Option<NativeBuffer>),
    BufferData {
        target: BufferTarget,
        len: usize,
        usage: BufferUsage,
    },
    BufferSubData {
        target: BufferTarget,
        offset: usize,
        len: usize,
    },
    BindBufferBase {
        binding: u32,
        buffer: Option<NativeBuffer>,
    },
    CreateVertexArray(NativeVertexArray),
    DeleteVertexArray(NativeVertexArray),
    BindVertexArray(Option<NativeVertexArray>),
    EnableAttribute(u32),
    DisableAttribute(u32),
    AttributePointer {
        index: u32,
        size: i32,
        offset: usize,
        stride: i32,
    },
    DrawTriangles {
        index_count: i32,
    },
    CreateTexture(NativeTexture),
    DeleteTexture(NativeTexture),
    UploadTexture {
        texture: NativeTexture,
        width: u32,
        height: u32,
    },
    BindTexture {
        unit: u32,
        texture: Option<NativeTexture>,
    },
    CreateProgram(NativeProgram),
    DeleteProgram(NativeProgram),
    UseProgram(Option<NativeProgram>),
    SetUniform {
        location: u32,
        value: UniformValue,
    },
    BindUniformBlock {
        program: NativeProgram,
        block_index: u32,
        binding: u32,
    },
    SetPipelineState(PipelineState),
    Clear([f32; 4]),
    SetViewport(Viewport),
}

#[derive(Default)]
pub struct RecordingDevice {
    next_name: Cell<u32>,
    commands: RefCell<Vec<GpuCommand>>,

    live_buffers: RefCell<BTreeSet<u32>>,
    live_textures: RefCell<BTreeSet<u32>>,
    live_programs: RefCell<BTreeSet<u32>>,
    live_vertex_arrays: RefCell<BTreeSet<u32>>,

    bound_buffers: RefCell<HashMap<BufferTarget, NativeBuffer>>,
    buffer_contents: RefCell<HashMap<u32, Vec<u8>>>,

    uniform_locations: RefCell<HashMap<(u32, String), u32>>,
    uniform_values: RefCell<HashMap<u32, UniformValue>>,
    block_indices: RefCell<HashMap<(u32, String), u32>>,
    hidden_blocks: RefCell<HashSet<String>>,
    rejected_programs: RefCell<HashSet<String>>,
}

impl RecordingDevice {
    pub const BLOCK_SLOT: usize = 64;

    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every program report that it does not declare `block`.
    pub fn hide_uniform_block(&self, block: &str) {
        self.hidden_blocks.borrow_mut().insert(block.to_string());
    }

    /// Makes linking the program called `name` fail.
    pub fn reject_program(&self, name: &str) {
        self.rejected_programs.borrow_mut().insert(name.to_string());
    }

    pub fn commands(&self) -> Vec<GpuCommand> {
        self.commands.borrow().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.borrow_mut().clear();
    }

    pub fn live_buffers(&self) -> Vec<NativeBuffer> {
        self.live_buffers
            .borrow()
            .iter()
            .filter_map(|name| NonZeroU32::new(*name).map(NativeBuffer))
            .collect()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.borrow().len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.live_textures.borrow().len()
    }

    pub fn live_program_count(&self) -> usize {
        self.live_programs.borrow().len()
    }

    pub fn live_vertex_array_count(&self) -> usize {
        self.live_vertex_arrays.borrow().len()
    }

    pub fn draw_calls(&self) -> Vec<i32> {
        self.commands
            .borrow()
            .iter()
            .filter_map(|command| match command {
                GpuCommand::DrawTriangles { index_count } => Some(*index_count),
                _ => None,
            })
            .collect()
    }

    pub fn buffer_contents(&self, buffer: NativeBuffer) -> Option<Vec<u8>> {
        self.buffer_contents.borrow().get(&buffer.0.get()).cloned()
    }

    /// Last value written to `name` of `program`, if the name was ever resolved.
    pub fn uniform_value(&self, program: NativeProgram, name: &str) -> Option<UniformValue> {
        let location = *self
            .uniform_locations
            .borrow()
            .get(&(program.0.get(), name.to_string()))?;
        self.uniform_values.borrow().get(&location).copied()
    }

    fn record(&self, command: GpuCommand) {
        self.commands.borrow_mut().push(command);
    }

    fn next_name(&self) -> NonZeroU32 {
        let name = self.next_name.get() + 1;
        self.next_name.set(name);
        NonZeroU32::new(name).unwrap_or(NonZeroU32::MIN)
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&self) -> Result<NativeBuffer, GpuError> {
        let buffer = NativeBuffer(self.next_name());
        self.live_buffers.borrow_mut().insert(buffer.0.get());
        self.record(GpuCommand::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn delete_buffer(&self, buffer: NativeBuffer) {
        self.live_buffers.borrow_mut().remove(&buffer.0.get());
        self.buffer_contents.borrow_mut().remove(&buffer.0.get());
        self.bound_buffers.borrow_mut().retain(|_, bound| *bound != buffer);
        self.record(GpuCommand::DeleteBuffer(buffer));
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<NativeBuffer>) {
        let mut bound = self.bound_buffers.borrow_mut();
        match buffer {
            Some(buffer) => bound.insert(target, buffer),
            None => bound.remove(&target),
        };
        self.record(GpuCommand::BindBuffer(target, buffer));
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        if let Some(buffer) = self.bound_buffers.borrow().get(&target) {
            self.buffer_contents
                .borrow_mut()
                .insert(buffer.0.get(), data.to_vec());
        }
        self.record(GpuCommand::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        if let Some(buffer) = self.bound_buffers.borrow().get(&target) {
            let mut contents = self.buffer_contents.borrow_mut();
            let store = contents.entry(buffer.0.get()).or_default();
            if store.len() < offset + data.len() {
                store.resize(offset + data.len(), 0);
            }
            store[offset..offset + data.len()].copy_from_slice(data);
        }
        self.record(GpuCommand::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn bind_buffer_base(&self, binding: u32, buffer: Option<NativeBuffer>) {
        self.record(GpuCommand::BindBufferBase { binding, buffer });
    }

    fn create_vertex_array(&self) -> Result<NativeVertexArray, GpuError> {
        let vertex_array = NativeVertexArray(self.next_name());
        self.live_vertex_arrays.borrow_mut().insert(vertex_array.0.get());
        self.record(GpuCommand::CreateVertexArray(vertex_array));
        Ok(vertex_array)
    }

    fn delete_vertex_array(&self, vertex_array: NativeVertexArray) {
        self.live_vertex_arrays.borrow_mut().remove(&vertex_array.0.get());
        self.record(GpuCommand::DeleteVertexArray(vertex_array));
    }

    fn bind_vertex_array(&self, vertex_array: Option<NativeVertexArray>) {
        self.record(GpuCommand::BindVertexArray(vertex_array));
    }

    fn enable_vertex_attribute(&self, index: u32) {
        self.record(GpuCommand::EnableAttribute(index));
    }

    fn disable_vertex_attribute(&self, index: u32) {
        self.record(GpuCommand::DisableAttribute(index));
    }

    fn vertex_attribute_pointer(&self, layout: &Layout, stride: i32) {
        self.record(GpuCommand::AttributePointer {
            index: layout.index,
            size: layout.size,
            offset: layout.offset,
            stride,
        });
    }

    fn draw_triangles(&self, index_count: i32) {
        self.record(GpuCommand::DrawTriangles { index_count });
    }

    fn create_texture(&self) -> Result<NativeTexture, GpuError> {
        let texture = NativeTexture(self.next_name());
        self.live_textures.borrow_mut().insert(texture.0.get());
        self.record(GpuCommand::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&self, texture: NativeTexture) {
        self.live_textures.borrow_mut().remove(&texture.0.get());
        self.record(GpuCommand::DeleteTexture(texture));
    }

    fn upload_texture_rgba8(&self, texture: NativeTexture, width: u32, height: u32, _pixels: &[u8]) {
        self.record(GpuCommand::UploadTexture {
            texture,
            width,
            height,
        });
    }

    fn bind_texture(&self, unit: u32, texture: Option<NativeTexture>) {
        self.record(GpuCommand::BindTexture { unit, texture });
    }

    fn create_program(
        &self,
        name: &str,
        _vertex_source: &str,
        _fragment_source: &str,
    ) -> Result<NativeProgram, ShaderError> {
        if self.rejected_programs.borrow().contains(name) {
            return Err(ShaderError::Link {
                name: name.to_string(),
                log: "rejected".to_string(),
            });
        }
        let program = NativeProgram(self.next_name());
        self.live_programs.borrow_mut().insert(program.0.get());
        self.record(GpuCommand::CreateProgram(program));
        Ok(program)
    }

    fn delete_program(&self, program: NativeProgram) {
        self.live_programs.borrow_mut().remove(&program.0.get());
        self.record(GpuCommand::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<NativeProgram>) {
        self.record(GpuCommand::UseProgram(program));
    }

    fn uniform_location(&self, program: NativeProgram, name: &str) -> Option<NativeUniformLocation> {
        let key = (program.0.get(), name.to_string());
        if let Some(location) = self.uniform_locations.borrow().get(&key) {
            return Some(NativeUniformLocation(*location));
        }

        let location = self.next_name().get();
        self.uniform_locations.borrow_mut().insert(key, location);
        Some(NativeUniformLocation(location))
    }

    fn set_uniform(&self, location: Option<&NativeUniformLocation>, value: UniformValue) {
        let Some(location) = location else {
            return;
        };
        self.uniform_values.borrow_mut().insert(location.0, value);
        self.record(GpuCommand::SetUniform {
            location: location.0,
            value,
        });
    }

    fn uniform_block_layout(
        &self,
        program: NativeProgram,
        block: &str,
        members: &[&str],
    ) -> Option<UniformBlockLayout> {
        if self.hidden_blocks.borrow().contains(block) {
            return None;
        }

        let key = (program.0.get(), block.to_string());
        let existing = self.block_indices.borrow().get(&key).copied();
        let index = match existing {
            Some(index) => index,
            None => {
                let index = self.block_indices.borrow().len() as u32;
                self.block_indices.borrow_mut().insert(key, index);
                index
            }
        };

        Some(UniformBlockLayout {
            index,
            size: members.len() * Self::BLOCK_SLOT,
            offsets: (0..members.len())
                .map(|slot| Some(slot * Self::BLOCK_SLOT))
                .collect(),
        })
    }

    fn bind_uniform_block(&self, program: NativeProgram, block_index: u32, binding: u32) {
        self.record(GpuCommand::BindUniformBlock {
            program,
            block_index,
            binding,
        });
    }

    fn set_pipeline_state(&self, state: &PipelineState) {
        self.record(GpuCommand::SetPipelineState(*state));
    }

    fn clear(&self, color: [f32; 4]) {
        self.record(GpuCommand::Clear(color));
    }

    fn set_viewport(&self, viewport: &Viewport) {
        self.record(GpuCommand::SetViewport(*viewport));
    }
}
