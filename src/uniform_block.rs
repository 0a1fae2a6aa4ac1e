//! CPU side of a shared uniform block.
//!
//! A block is linked in two steps. [`UniformBlock::resolve`] asks a program
//! where each named member lives, once. After that, members are written into
//! a staging copy and pushed to the GPU with [`UniformBlock::upload`] or
//! [`UniformBlock::upload_members`] as often as needed. If the shader's block
//! declaration changes, call [`UniformBlock::invalidate`] and resolve again;
//! offsets are never guessed.

use glow::NativeBuffer;
use log::{debug, warn};

use crate::errors::GpuError;
use crate::opengl::{BufferTarget, BufferUsage, Gpu, UniformBlockLayout, UniformValue};
use crate::shaders::ShaderProgram;

pub struct UniformBlock {
    name: &'static str,
    binding: u32,
    members: Vec<String>,
    layout: Option<UniformBlockLayout>,
    written: Vec<usize>,
    staging: Vec<u8>,
    buffer: NativeBuffer,
    gpu: Gpu,
}

impl UniformBlock {
    pub fn new(
        gpu: Gpu,
        name: &'static str,
        binding: u32,
        members: Vec<String>,
    ) -> Result<Self, GpuError> {
        let buffer = gpu.create_buffer()?;
        Ok(Self {
            name,
            binding,
            written: vec![0; members.len()],
            members,
            layout: None,
            staging: Vec::new(),
            buffer,
            gpu,
        })
    }

    /// Queries the member layout from `program` and sizes the GPU buffer.
    /// Returns false if the program does not declare this block.
    pub fn resolve(&mut self, program: &ShaderProgram) -> bool {
        let names: Vec<&str> = self.members.iter().map(String::as_str).collect();
        let Some(layout) = self
            .gpu
            .uniform_block_layout(program.program(), self.name, &names)
        else {
            warn!("UniformBlock '{}': not declared by '{}'", self.name, program.name);
            return false;
        };

        for (member, offset) in self.members.iter().zip(&layout.offsets) {
            if offset.is_none() {
                debug!("UniformBlock '{}': member '{}' is inactive", self.name, member);
            }
        }

        self.staging = vec![0; layout.size];
        self.written = vec![0; self.members.len()];

        self.gpu.bind_buffer(BufferTarget::Uniform, Some(self.buffer));
        self.gpu
            .buffer_data(BufferTarget::Uniform, &self.staging, BufferUsage::Dynamic);
        self.gpu.bind_buffer(BufferTarget::Uniform, None);
        self.gpu.bind_buffer_base(self.binding, Some(self.buffer));

        debug!(
            "UniformBlock '{}': {} bytes bound at {}",
            self.name, layout.size, self.binding
        );
        self.layout = Some(layout);
        true
    }

    /// Forgets the resolved layout. Writes are dropped until the next resolve.
    pub fn invalidate(&mut self) {
        self.layout = None;
        self.staging.clear();
    }

    pub fn is_resolved(&self) -> bool {
        self.layout.is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn buffer(&self) -> NativeBuffer {
        self.buffer
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Byte offset of `member` inside the block, if resolved and active.
    pub fn offset(&self, member: usize) -> Option<usize> {
        *self.layout.as_ref()?.offsets.get(member)?
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        let member = self.members.iter().position(|m| m == name)?;
        self.offset(member)
    }

    /// Stages `value` for `member` using std140 packing.
    pub fn write(&mut self, member: usize, value: UniformValue) {
        let Some(offset) = self.offset(member) else {
            return;
        };

        let bytes = std140_bytes(value);
        let end = offset + bytes.len();
        if end > self.staging.len() {
            warn!(
                "UniformBlock '{}': member '{}' overruns the block",
                self.name, self.members[member]
            );
            return;
        }

        self.staging[offset..end].copy_from_slice(&bytes);
        self.written[member] = bytes.len();
    }

    /// Pushes the whole staging copy.
    pub fn upload(&self) {
        if !self.is_resolved() {
            return;
        }

        self.gpu.bind_buffer(BufferTarget::Uniform, Some(self.buffer));
        self.gpu.buffer_sub_data(BufferTarget::Uniform, 0, &self.staging);
        self.gpu.bind_buffer(BufferTarget::Uniform, None);
    }

    /// Pushes only the byte ranges of the given members.
    pub fn upload_members(&self, members: &[usize]) {
        if !self.is_resolved() {
            return;
        }

        self.gpu.bind_buffer(BufferTarget::Uniform, Some(self.buffer));
        for &member in members {
            let (Some(offset), Some(&len)) = (self.offset(member), self.written.get(member)) else {
                continue;
            };
            if len > 0 {
                self.gpu
                    .buffer_sub_data(BufferTarget::Uniform, offset, &self.staging[offset..offset + len]);
            }
        }
        self.gpu.bind_buffer(BufferTarget::Uniform, None);
    }

    /// Staged bytes of `member`, as last written.
    pub fn staged(&self, member: usize) -> Option<&[u8]> {
        let offset = self.offset(member)?;
        let len = *self.written.get(member)?;
        self.staging.get(offset..offset + len)
    }
}

impl Drop for UniformBlock {
    fn drop(&mut self) {
        self.gpu.delete_buffer(self.buffer);
    }
}

/// std140 encoding: scalars and vec3 tightly, matrix columns padded to vec4.
pub fn std140_bytes(value: UniformValue) -> Vec<u8> {
    match value {
        UniformValue::Int(v) => v.to_ne_bytes().to_vec(),
        UniformValue::Float(v) => v.to_ne_bytes().to_vec(),
        UniformValue::Vec3(v) => bytemuck::cast_slice(&v).to_vec(),
        UniformValue::Mat3(m) => {
            let mut padded = [0.0f32; 12];
            for column in 0..3 {
                padded[column * 4..column * 4 + 3].copy_from_slice(&m[column * 3..column * 3 + 3]);
            }
            bytemuck::cast_slice(&padded).to_vec()
        }
        UniformValue::Mat4(m) => bytemuck::cast_slice(&m).to_vec(),
    }
}
