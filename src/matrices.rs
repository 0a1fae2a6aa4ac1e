use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix};

use crate::collections::MATRICES_BINDING;
use crate::errors::{GpuError, RendererError};
use crate::opengl::{Gpu, UniformValue};
use crate::shaders::ShaderProgram;
use crate::uniform_block::UniformBlock;

pub const MATRICES_BLOCK: &str = "Matrices";

const MODEL: usize = 0;
const VIEW: usize = 1;
const PROJECTION: usize = 2;
const MODEL_VIEW: usize = 3;
const MODEL_VIEW_PROJECTION: usize = 4;
const NORMAL: usize = 5;

const MEMBER_NAMES: [&str; 6] = [
    "model",
    "view",
    "projection",
    "modelView",
    "modelViewProjection",
    "normalMatrix",
];

/// Members that stay fixed for a whole frame.
const FRAME_MEMBERS: [usize; 2] = [VIEW, PROJECTION];
/// Members that change with every drawn object.
const OBJECT_MEMBERS: [usize; 4] = [MODEL, MODEL_VIEW, MODEL_VIEW_PROJECTION, NORMAL];

/// The transforms every draw call needs.
///
/// Only model, view and projection can be set. The rest is derived by
/// [`ElementalMatrices::calculate_matrices`], which must run after the
/// setters and before any upload.
pub struct ElementalMatrices {
    model: Matrix4<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    model_view: Matrix4<f32>,
    model_view_projection: Matrix4<f32>,
    normal: Matrix3<f32>,

    block: Option<UniformBlock>,
}

impl Default for ElementalMatrices {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementalMatrices {
    pub fn new() -> Self {
        Self {
            model: Matrix4::identity(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            model_view: Matrix4::identity(),
            model_view_projection: Matrix4::identity(),
            normal: Matrix3::identity(),
            block: None,
        }
    }

    pub fn set_model_matrix(&mut self, value: Matrix4<f32>) {
        self.model = value;
    }

    pub fn set_view_matrix(&mut self, value: Matrix4<f32>) {
        self.view = value;
    }

    pub fn set_projection_matrix(&mut self, value: Matrix4<f32>) {
        self.projection = value;
    }

    pub fn calculate_matrices(&mut self) {
        self.model_view = self.view * self.model;
        self.model_view_projection = self.projection * self.model_view;

        let upper = Matrix3::from_cols(
            self.model_view.x.truncate(),
            self.model_view.y.truncate(),
            self.model_view.z.truncate(),
        );
        // A singular model-view has no inverse; fall back to its rotation part.
        self.normal = upper.invert().map_or(upper, |inverse| inverse.transpose());
    }

    pub fn model(&self) -> &Matrix4<f32> {
        &self.model
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn model_view(&self) -> &Matrix4<f32> {
        &self.model_view
    }

    pub fn model_view_projection(&self) -> &Matrix4<f32> {
        &self.model_view_projection
    }

    pub fn normal(&self) -> &Matrix3<f32> {
        &self.normal
    }

    /// Resolves the block layout against `program`. Only needed once, or
    /// again after [`ElementalMatrices::invalidate_uniform_block_info`].
    pub fn set_uniform_block_info(
        &mut self,
        gpu: Gpu,
        program: &ShaderProgram,
    ) -> Result<(), RendererError> {
        let block = match self.block.as_mut() {
            Some(block) => block,
            None => self.block.insert(Self::create_block(gpu)?),
        };

        if block.resolve(program) {
            Ok(())
        } else {
            Err(RendererError::MissingUniformBlock(MATRICES_BLOCK))
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

    /// Uploads every member.
    pub fn set_uniform_block(&mut self) {
        self.stage(&FRAME_MEMBERS);
        self.stage(&OBJECT_MEMBERS);
        if let Some(block) = &self.block {
            block.upload();
        }
    }

    /// Uploads view and projection; once per frame.
    pub fn set_frame_uniform_block(&mut self) {
        self.stage(&FRAME_MEMBERS);
        if let Some(block) = &self.block {
            block.upload_members(&FRAME_MEMBERS);
        }
    }

    /// Uploads the model matrix and everything derived from it; once per object.
    pub fn set_object_uniform_block(&mut self) {
        self.stage(&OBJECT_MEMBERS);
        if let Some(block) = &self.block {
            block.upload_members(&OBJECT_MEMBERS);
        }
    }

    fn stage(&mut self, members: &[usize]) {
        let values: Vec<(usize, UniformValue)> = members
            .iter()
            .map(|&member| (member, self.value_of(member)))
            .collect();

        if let Some(block) = self.block.as_mut() {
            for (member, value) in values {
                block.write(member, value);
            }
        }
    }

    fn value_of(&self, member: usize) -> UniformValue {
        match member {
            MODEL => UniformValue::Mat4(*self.model.as_ref()),
            VIEW => UniformValue::Mat4(*self.view.as_ref()),
            PROJECTION => UniformValue::Mat4(*self.projection.as_ref()),
            MODEL_VIEW => UniformValue::Mat4(*self.model_view.as_ref()),
            MODEL_VIEW_PROJECTION => UniformValue::Mat4(*self.model_view_projection.as_ref()),
            _ => UniformValue::Mat3(*self.normal.as_ref()),
        }
    }

    fn create_block(gpu: Gpu) -> Result<UniformBlock, GpuError> {
        UniformBlock::new(
            gpu,
            MATRICES_BLOCK,
            MATRICES_BINDING,
            MEMBER_NAMES.iter().map(|name| name.to_string()).collect(),
        )
    }
}
