use std::collections::BTreeMap;
use std::mem::{offset_of, size_of};

use smallvec::SmallVec;

use crate::opengl::Layout;
use crate::textures::TextureType;

/// Interleaved vertex as uploaded to the GPU.
///
/// [`VERTEX_LAYOUTS`] is derived from this struct, so the CPU packing and the
/// attribute pointers cannot drift apart.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

const _: () = assert!(size_of::<Vertex>() == 56);

pub const VERTEX_STRIDE: i32 = size_of::<Vertex>() as i32;

/// Position, UV, normal, tangent, bitangent on channels 0 to 4.
pub const VERTEX_LAYOUTS: [Layout; 5] = [
    Layout::new(0, 3, glow::FLOAT, false, offset_of!(Vertex, position)),
    Layout::new(1, 2, glow::FLOAT, false, offset_of!(Vertex, uv)),
    Layout::new(2, 3, glow::FLOAT, false, offset_of!(Vertex, normal)),
    Layout::new(3, 3, glow::FLOAT, false, offset_of!(Vertex, tangent)),
    Layout::new(4, 3, glow::FLOAT, false, offset_of!(Vertex, bitangent)),
];

/// Index list of one face. Triangles after triangulation, but importers may
/// hand back points or lines for primitives that cannot be triangulated.
pub type Face = SmallVec<[u32; 3]>;

/// One sub-mesh as produced by the asset importer.
#[derive(Debug, Clone, Default)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    pub faces: Vec<Face>,
    pub material_index: usize,
}

impl ImportedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// One material as produced by the asset importer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    /// Texture file names per type, as written in the model file.
    pub textures: BTreeMap<TextureType, Vec<String>>,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            textures: BTreeMap::new(),
            ambient: [0.0; 3],
            diffuse: [0.6; 3],
            specular: [0.0; 3],
            shininess: 1.0,
        }
    }
}

impl ImportedMaterial {
    pub fn texture_count(&self, texture_type: TextureType) -> usize {
        self.textures.get(&texture_type).map_or(0, Vec::len)
    }
}

/// Flat scene handed from the importer to mesh construction.
#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
}
