use cgmath::{One, Rotation3};

/// Position, orientation and scale of anything placed in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: cgmath::vec3(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::vec3(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn from_translation(translation: cgmath::Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    /// Scale first, then rotate, then translate.
    pub fn model_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.translation)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn rotate_axis(&mut self, axis: cgmath::Vector3<f32>, angle: cgmath::Deg<f32>) {
        self.rotation = cgmath::Quaternion::from_axis_angle(axis, angle) * self.rotation;
    }
}

/// Composition point for anything that carries a [`Transform`].
pub trait HasTransform {
    fn transform(&self) -> &Transform;
    fn transform_mut(&mut self) -> &mut Transform;

    fn position(&self) -> cgmath::Vector3<f32> {
        self.transform().translation
    }

    fn set_position(&mut self, position: cgmath::Vector3<f32>) {
        self.transform_mut().translation = position;
    }

    fn set_rotation(&mut self, rotation: cgmath::Quaternion<f32>) {
        self.transform_mut().rotation = rotation;
    }

    fn set_scale(&mut self, scale: cgmath::Vector3<f32>) {
        self.transform_mut().scale = scale;
    }

    fn model_matrix(&self) -> cgmath::Matrix4<f32> {
        self.transform().model_matrix()
    }
}
