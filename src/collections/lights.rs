use log::{debug, warn};

use crate::collections::{Slots, LIGHTS_BINDING};
use crate::errors::{GpuError, RendererError};
use crate::handles::LightHandle;
use crate::light::{Light, LightField, LightType};
use crate::opengl::{Gpu, UniformValue};
use crate::shaders::ShaderProgram;
use crate::uniform_block::UniformBlock;

pub const LIGHTS_BLOCK: &str = "Lights";
/// Must match `MAX_LIGHTS` in `shaders/lighting.glsl`.
pub const MAX_LIGHTS: usize = 8;

const FIELDS_PER_LIGHT: usize = LightField::ALL.len();
const LIGHT_COUNT_MEMBER: usize = MAX_LIGHTS * FIELDS_PER_LIGHT;

fn member_names() -> Vec<String> {
    let mut names = Vec::with_capacity(LIGHT_COUNT_MEMBER + 1);
    for i in 0..MAX_LIGHTS {
        for field in LightField::ALL {
            names.push(format!("lights[{i}].{}", field.glsl_name()));
        }
    }
    names.push("lightCount".to_string());
    names
}

/// Every light in the scene, uploaded together as one uniform block.
pub struct LightsCollection {
    gpu: Gpu,
    lights: Slots<LightHandle, Light>,
    block: Option<UniformBlock>,
}

impl LightsCollection {
    pub fn new(gpu: Gpu) -> Self {
        Self {
            gpu,
            lights: Slots::new(),
            block: None,
        }
    }

    /// Adds a light with default parameters. Only the first [`MAX_LIGHTS`]
    /// live lights reach the shaders.
    pub fn create_light(&mut self, light_type: LightType) -> LightHandle {
        let handle = self.lights.insert(Light::new(light_type));
        if self.lights.len() > MAX_LIGHTS {
            warn!(
                "LightsCollection: {:?} exceeds the {} light limit and will not be shaded",
                handle, MAX_LIGHTS
            );
        }
        debug!("LightsCollection: created {:?} {:?}", light_type, handle);
        handle
    }

    pub fn remove_light(&mut self, handle: LightHandle) -> Option<Light> {
        self.lights.remove(handle)
    }

    pub fn get(&self, handle: LightHandle) -> Option<&Light> {
        self.lights.get(handle)
    }

    pub fn get_mut(&mut self, handle: LightHandle) -> Option<&mut Light> {
        self.lights.get_mut(handle)
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LightHandle, &Light)> {
        self.lights.iter()
    }

    /// Resolves the block layout against `program`.
    pub fn set_uniform_block_info(&mut self, program: &ShaderProgram) -> Result<(), RendererError> {
        let block = match self.block.as_mut() {
            Some(block) => block,
            None => self.block.insert(Self::create_block(self.gpu.clone())?),
        };

        if block.resolve(program) {
            Ok(())
        } else {
            Err(RendererError::MissingUniformBlock(LIGHTS_BLOCK))
        }
    }

    pub fn invalidate_uniform_block_info(&mut self) {
        if let Some(block) = self.block.as_mut() {
            block.invalidate();
        }
    }

    pub fn uniform_block(&self) -> Option<&UniformBlock> {
        self.block.as_ref()
    }

    /// Writes every live light and the light count, then uploads the block.
    pub fn set_uniform_block(&mut self) {
        let Some(block) = self.block.as_mut() else {
            return;
        };

        let mut count = 0;
        for (_, light) in self.lights.iter().take(MAX_LIGHTS) {
            for (field, value) in light.encode() {
                block.write(count * FIELDS_PER_LIGHT + field as usize, value);
            }
            count += 1;
        }

        block.write(LIGHT_COUNT_MEMBER, UniformValue::Int(count as i32));
        block.upload();
    }

    fn create_block(gpu: Gpu) -> Result<UniformBlock, GpuError> {
        UniformBlock::new(gpu, LIGHTS_BLOCK, LIGHTS_BINDING, member_names())
    }
}
