use std::collections::BTreeMap;

use log::{info, warn};

use crate::collections::LIGHTS_BLOCK;
use crate::errors::ShaderError;
use crate::matrices::MATRICES_BLOCK;
use crate::opengl::Gpu;
use crate::shaders::ShaderProgram;

/// Binding point of the shared matrices block in every stored program.
pub const MATRICES_BINDING: u32 = 0;
/// Binding point of the shared lights block in every stored program.
pub const LIGHTS_BINDING: u32 = 1;

const SCENE_VERTEX: &str = include_str!("../../shaders/scene.vert");

macro_rules! fragment_source {
    ($file:literal) => {
        concat!(
            "#version 330 core\n",
            include_str!("../../shaders/lighting.glsl"),
            include_str!(concat!("../../shaders/", $file))
        )
    };
}

/// The built-in programs, by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderKind {
    /// Lambert shading of the diffuse map.
    Diffuse,
    /// Blinn-Phong with a specular highlight.
    Phong,
    /// Blinn-Phong with the normal read from a tangent space normal map.
    NormalMapped,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 3] = [ShaderKind::Diffuse, ShaderKind::Phong, ShaderKind::NormalMapped];

    fn sources(self) -> (&'static str, &'static str) {
        match self {
            ShaderKind::Diffuse => (SCENE_VERTEX, fragment_source!("diffuse.frag")),
            ShaderKind::Phong => (SCENE_VERTEX, fragment_source!("phong.frag")),
            ShaderKind::NormalMapped => (SCENE_VERTEX, fragment_source!("normal_mapped.frag")),
        }
    }
}

/// Compiled built-in programs, with the shared uniform blocks bound.
pub struct StoredShaders {
    programs: BTreeMap<ShaderKind, ShaderProgram>,
}

impl StoredShaders {
    pub fn new(gpu: Gpu) -> Result<Self, ShaderError> {
        let mut programs = BTreeMap::new();

        for kind in ShaderKind::ALL {
            let (vertex, fragment) = kind.sources();
            let program = ShaderProgram::compile(gpu.clone(), format!("{kind:?}"), vertex, fragment)?;

            for (block, binding) in [(MATRICES_BLOCK, MATRICES_BINDING), (LIGHTS_BLOCK, LIGHTS_BINDING)] {
                if !program.bind_uniform_block(block, binding) {
                    warn!("StoredShaders: {kind:?} does not declare the '{block}' block");
                }
            }

            programs.insert(kind, program);
        }

        info!("StoredShaders: compiled {} programs", programs.len());
        Ok(Self { programs })
    }

    pub fn get(&self, kind: ShaderKind) -> Option<&ShaderProgram> {
        self.programs.get(&kind)
    }

    pub fn default_kind(&self) -> ShaderKind {
        ShaderKind::Diffuse
    }

    pub fn default_shader(&self) -> Option<&ShaderProgram> {
        self.get(self.default_kind())
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
