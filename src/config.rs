use std::path::PathBuf;

use crate::light::LightType;
use crate::loader::ImportFlags;
use crate::opengl::PipelineState;
use crate::primitives::StoredMesh;

#[derive(Debug, Clone, PartialEq)]
pub struct LightConfig {
    pub light_type: LightType,
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    pub attenuation: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            position: [4.0, 0.0, 2.5],
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            attenuation: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedMesh {
    pub mesh: StoredMesh,
    pub position: [f32; 3],
}

/// Everything the renderer needs to know before `setup`.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 4],
    pub pipeline: PipelineState,

    pub fov: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub camera_position: [f32; 3],

    pub import_flags: ImportFlags,
    /// Model files loaded at setup, in order.
    pub models: Vec<PathBuf>,
    pub stored_meshes: Vec<PlacedMesh>,
    pub lights: Vec<LightConfig>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            pipeline: PipelineState::default(),

            fov: 90.0,
            near_plane: 0.1,
            far_plane: 100.0,
            camera_position: [0.0, 0.0, 5.0],

            import_flags: ImportFlags::default(),
            models: Vec::new(),
            stored_meshes: vec![
                PlacedMesh {
                    mesh: StoredMesh::Cylinder,
                    position: [-3.0, 0.0, 0.0],
                },
                PlacedMesh {
                    mesh: StoredMesh::Torus,
                    position: [0.0, 0.0, 0.0],
                },
                PlacedMesh {
                    mesh: StoredMesh::Sphere,
                    position: [3.0, 0.0, 0.0],
                },
            ],
            lights: vec![LightConfig::default()],
        }
    }
}

impl RendererConfig {
    /// A config with no initial scene content.
    pub fn empty() -> Self {
        Self {
            stored_meshes: Vec::new(),
            lights: Vec::new(),
            ..Self::default()
        }
    }
}
