use cgmath::{InnerSpace, Rotation};

use crate::components::{HasTransform, Transform};
use crate::opengl::UniformValue;

/// Kinds of light. The discriminant is the tag the shaders switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LightType {
    Directional = 0,
    Spot = 1,
    Point = 2,
}

/// Members of one entry of the `lights` array, in block order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightField {
    Position,
    Direction,
    Color,
    Intensity,
    Attenuation,
    InnerConeAngle,
    OuterConeAngle,
    LightType,
}

impl LightField {
    pub const ALL: [LightField; 8] = [
        LightField::Position,
        LightField::Direction,
        LightField::Color,
        LightField::Intensity,
        LightField::Attenuation,
        LightField::InnerConeAngle,
        LightField::OuterConeAngle,
        LightField::LightType,
    ];

    pub fn glsl_name(self) -> &'static str {
        match self {
            LightField::Position => "position",
            LightField::Direction => "direction",
            LightField::Color => "color",
            LightField::Intensity => "intensity",
            LightField::Attenuation => "attenuation",
            LightField::InnerConeAngle => "innerConeAngle",
            LightField::OuterConeAngle => "outerConeAngle",
            LightField::LightType => "lightType",
        }
    }
}

impl LightType {
    /// The fields each kind of light actually feeds to the shader. The rest
    /// are written as zero.
    pub fn fields(self) -> &'static [LightField] {
        use LightField as F;
        match self {
            LightType::Directional => &[F::Direction, F::Color, F::Intensity, F::LightType],
            LightType::Spot => &LightField::ALL,
            LightType::Point => &[F::Position, F::Color, F::Intensity, F::Attenuation, F::LightType],
        }
    }
}

/// Direction every light points at before its rotation is applied.
const CANONICAL_DIRECTION: cgmath::Vector3<f32> = cgmath::Vector3::new(0.0, -1.0, 0.0);

const MAX_CONE_ANGLE: f32 = 180.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    light_type: LightType,
    color: cgmath::Vector3<f32>,
    intensity: f32,
    attenuation: f32,
    // degrees
    inner_cone_angle: f32,
    outer_cone_angle: f32,
    transform: Transform,
}

impl Light {
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            color: cgmath::vec3(1.0, 1.0, 1.0),
            intensity: 1.0,
            attenuation: 1.0,
            inner_cone_angle: MAX_CONE_ANGLE,
            outer_cone_angle: MAX_CONE_ANGLE,
            transform: Transform::default(),
        }
    }

    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    pub fn set_light_type(&mut self, light_type: LightType) {
        self.light_type = light_type;
    }

    pub fn color(&self) -> cgmath::Vector3<f32> {
        self.color
    }

    pub fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.color = cgmath::vec3(r, g, b);
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.max(0.0);
    }

    pub fn attenuation(&self) -> f32 {
        self.attenuation
    }

    pub fn set_attenuation(&mut self, attenuation: f32) {
        self.attenuation = attenuation.max(0.0);
    }

    pub fn cone_angles(&self) -> (f32, f32) {
        (self.inner_cone_angle, self.outer_cone_angle)
    }

    /// Both angles in degrees. The inner angle never exceeds the outer one.
    pub fn set_cone_angles(&mut self, inner: f32, outer: f32) {
        self.outer_cone_angle = outer.clamp(0.0, MAX_CONE_ANGLE);
        self.inner_cone_angle = inner.clamp(0.0, self.outer_cone_angle);
    }

    /// World space direction: the rotation applied to straight down.
    pub fn direction(&self) -> cgmath::Vector3<f32> {
        self.transform
            .rotation
            .rotate_vector(CANONICAL_DIRECTION)
            .normalize()
    }

    pub fn field_value(&self, field: LightField) -> UniformValue {
        match field {
            LightField::Position => UniformValue::Vec3(self.transform.translation.into()),
            LightField::Direction => UniformValue::Vec3(self.direction().into()),
            LightField::Color => UniformValue::Vec3(self.color.into()),
            LightField::Intensity => UniformValue::Float(self.intensity),
            LightField::Attenuation => UniformValue::Float(self.attenuation),
            LightField::InnerConeAngle => UniformValue::Float(self.inner_cone_angle),
            LightField::OuterConeAngle => UniformValue::Float(self.outer_cone_angle),
            LightField::LightType => UniformValue::Int(self.light_type as i32),
        }
    }

    /// Every field in block order, zeroed where this kind of light ignores it.
    pub fn encode(&self) -> [(LightField, UniformValue); 8] {
        let used = self.light_type.fields();
        LightField::ALL.map(|field| {
            let value = if used.contains(&field) {
                self.field_value(field)
            } else {
                zero_of(field)
            };
            (field, value)
        })
    }
}

fn zero_of(field: LightField) -> UniformValue {
    match field {
        LightField::Position | LightField::Direction | LightField::Color => UniformValue::Vec3([0.0; 3]),
        LightField::LightType => UniformValue::Int(0),
        _ => UniformValue::Float(0.0),
    }
}

impl HasTransform for Light {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}
