use glow::{NativeProgram, NativeUniformLocation};
use log::debug;

use crate::errors::ShaderError;
use crate::opengl::{Gpu, UniformValue};

/// A linked GPU program. Deleted when dropped.
pub struct ShaderProgram {
    pub name: String,
    program: NativeProgram,
    gpu: Gpu,
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("name", &self.name)
            .field("program", &self.program)
            .finish()
    }
}

impl ShaderProgram {
    pub fn compile(
        gpu: Gpu,
        name: impl Into<String>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let name = name.into();
        let program = gpu.create_program(&name, vertex_source, fragment_source)?;
        debug!("ShaderProgram '{}': linked as {:?}", name, program);

        Ok(Self { name, program, gpu })
    }

    pub fn program(&self) -> NativeProgram {
        self.program
    }

    pub fn activate(&self) {
        self.gpu.use_program(Some(self.program));
    }

    pub fn uniform_location(&self, name: &str) -> Option<NativeUniformLocation> {
        self.gpu.uniform_location(self.program, name)
    }

    /// Sets a uniform through a location resolved earlier. `None` is ignored.
    pub fn set_uniform_at(&self, location: Option<&NativeUniformLocation>, value: UniformValue) {
        self.gpu.set_uniform(location, value);
    }

    /// Points the named uniform block of this program at `binding`.
    /// Returns false if the program does not declare the block.
    pub fn bind_uniform_block(&self, block: &str, binding: u32) -> bool {
        match self.gpu.uniform_block_layout(self.program, block, &[]) {
            Some(layout) => {
                self.gpu.bind_uniform_block(self.program, layout.index, binding);
                true
            }
            None => false,
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        debug!("ShaderProgram '{}': deleted", self.name);
        self.gpu.delete_program(self.program);
    }
}
