use std::path::Path;

use glow::NativeBuffer;
use log::{debug, error, info, warn};

use crate::collections::{StoredShaders, TexturesCollection};
use crate::components::{HasTransform, Transform};
use crate::data::{ImportedMesh, ImportedScene, Vertex, VERTEX_LAYOUTS, VERTEX_STRIDE};
use crate::errors::{GpuError, MeshError, TextureError};
use crate::loader::{resolve_texture_path, ImportFlags, SceneImporter};
use crate::material::Material;
use crate::opengl::{BufferTarget, BufferUsage, Gpu};
use crate::textures::TextureType;

/// Texture types mesh import looks for in each material.
pub const IMPORTED_TEXTURE_TYPES: [TextureType; 5] = [
    TextureType::Diffuse,
    TextureType::Height,
    TextureType::Normals,
    TextureType::Specular,
    TextureType::Emissive,
];

/// One sub-mesh on the GPU: a vertex buffer, a triangle index buffer and the
/// index of the material it is drawn with. Immutable once uploaded; both
/// buffers are released on drop.
pub struct MeshEntry {
    vertex_buffer: NativeBuffer,
    index_buffer: NativeBuffer,
    vertex_count: usize,
    index_count: usize,
    material_index: usize,
    gpu: Gpu,
}

impl MeshEntry {
    /// Uploads `vertices` and `indices` once with static usage.
    /// `indices` must hold whole triangles.
    pub fn new(
        gpu: Gpu,
        vertices: &[Vertex],
        indices: &[u32],
        material_index: usize,
    ) -> Result<Self, GpuError> {
        debug_assert_eq!(indices.len() % 3, 0);

        let vertex_buffer = gpu.create_buffer()?;
        let index_buffer = match gpu.create_buffer() {
            Ok(buffer) => buffer,
            Err(e) => {
                gpu.delete_buffer(vertex_buffer);
                return Err(e);
            }
        };

        gpu.bind_buffer(BufferTarget::Vertex, Some(vertex_buffer));
        gpu.buffer_data(BufferTarget::Vertex, bytemuck::cast_slice(vertices), BufferUsage::Static);
        gpu.bind_buffer(BufferTarget::Index, Some(index_buffer));
        gpu.buffer_data(BufferTarget::Index, bytemuck::cast_slice(indices), BufferUsage::Static);

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len(),
            index_count: indices.len(),
            material_index,
            gpu,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn face_count(&self) -> usize {
        self.index_count / 3
    }

    pub fn material_index(&self) -> usize {
        self.material_index
    }

    pub fn vertex_buffer(&self) -> NativeBuffer {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> NativeBuffer {
        self.index_buffer
    }

    /// Binds both buffers and points every attribute channel into the
    /// vertex buffer.
    pub fn bind(&self) {
        self.gpu.bind_buffer(BufferTarget::Vertex, Some(self.vertex_buffer));
        self.gpu.bind_buffer(BufferTarget::Index, Some(self.index_buffer));
        for layout in &VERTEX_LAYOUTS {
            self.gpu.vertex_attribute_pointer(layout, VERTEX_STRIDE);
        }
    }
}

impl Drop for MeshEntry {
    fn drop(&mut self) {
        self.gpu.delete_buffer(self.vertex_buffer);
        self.gpu.delete_buffer(self.index_buffer);
    }
}

impl std::fmt::Debug for MeshEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshEntry")
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_buffer", &self.index_buffer)
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .field("material_index", &self.material_index)
            .finish()
    }
}

/// Outcome of a mesh load that produced geometry.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub entries: usize,
    pub materials: usize,
    /// Textures that fell back to the default texture.
    pub texture_errors: Vec<TextureError>,
}

impl ImportReport {
    pub fn has_errors(&self) -> bool {
        !self.texture_errors.is_empty()
    }
}

/// A drawable model: sub-mesh entries plus the materials they index into.
pub struct Mesh {
    pub name: String,
    transform: Transform,
    entries: Vec<MeshEntry>,
    materials: Vec<Material>,
    gpu: Gpu,
}

impl Mesh {
    pub fn new(gpu: Gpu, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            entries: Vec::new(),
            materials: Vec::new(),
            gpu,
        }
    }

    /// Replaces the contents of this mesh with the model at `path`.
    ///
    /// Previous GPU resources are released first, so loading twice never
    /// leaks. On error the mesh is left empty.
    pub fn load_mesh(
        &mut self,
        path: &Path,
        importer: &dyn SceneImporter,
        flags: ImportFlags,
        textures: &mut TexturesCollection,
    ) -> Result<ImportReport, MeshError> {
        self.clear();
        info!("Mesh '{}': loading {}", self.name, path.display());

        let scene = importer.import(path, flags).map_err(|e| {
            error!("Mesh '{}': {}", self.name, e);
            MeshError::from(e)
        })?;

        let report = self.load_from_scene(path, &scene, textures)?;
        info!(
            "Mesh '{}': {} entries, {} materials{}",
            self.name,
            report.entries,
            report.materials,
            if report.has_errors() { ", with texture errors" } else { "" }
        );
        Ok(report)
    }

    /// Builds entries and materials from an already imported scene. Texture
    /// names are resolved against the directory of `path`.
    pub fn load_from_scene(
        &mut self,
        path: &Path,
        scene: &ImportedScene,
        textures: &mut TexturesCollection,
    ) -> Result<ImportReport, MeshError> {
        self.clear();

        if let Err(e) = self.init_entries(scene) {
            error!("Mesh '{}': {}", self.name, e);
            self.clear();
            return Err(e);
        }

        let mut report = ImportReport {
            entries: self.entries.len(),
            ..ImportReport::default()
        };
        self.init_materials(path, scene, textures, &mut report);
        report.materials = self.materials.len();

        Ok(report)
    }

    fn init_entries(&mut self, scene: &ImportedScene) -> Result<(), MeshError> {
        for (entry, imported) in scene.meshes.iter().enumerate() {
            if imported.material_index >= scene.materials.len() {
                return Err(MeshError::MissingMaterial {
                    entry,
                    material: imported.material_index,
                    available: scene.materials.len(),
                });
            }

            let vertices = build_vertices(imported);
            let indices = build_indices(entry, imported)?;
            self.entries.push(MeshEntry::new(
                self.gpu.clone(),
                &vertices,
                &indices,
                imported.material_index,
            )?);
        }
        Ok(())
    }

    fn init_materials(
        &mut self,
        path: &Path,
        scene: &ImportedScene,
        textures: &mut TexturesCollection,
        report: &mut ImportReport,
    ) {
        for imported in &scene.materials {
            let mut material = Material::from_imported(imported);

            for texture_type in IMPORTED_TEXTURE_TYPES {
                let Some(name) = imported.textures.get(&texture_type).and_then(|names| names.first())
                else {
                    continue;
                };

                if imported.texture_count(texture_type) > 1 {
                    debug!(
                        "Mesh '{}': material '{}' lists {} {:?} textures, keeping '{}'",
                        self.name,
                        imported.name,
                        imported.texture_count(texture_type),
                        texture_type,
                        name
                    );
                }

                let texture_path = resolve_texture_path(path, name);
                match textures.add_texture(&texture_path, texture_type) {
                    Ok(handle) => {
                        material.add_texture(texture_type, handle);
                    }
                    Err(e) => {
                        warn!("Mesh '{}': {}; using the default texture", self.name, e);
                        material.add_fallback_texture(texture_type, textures.default_texture());
                        report.texture_errors.push(e);
                    }
                }
            }

            if material.texture_count() == 0 {
                material.add_texture(TextureType::Diffuse, textures.default_texture());
            }

            let shader = material.guess_material_shader();
            debug!("Mesh '{}': material '{}' uses {:?}", self.name, material.name, shader);
            self.materials.push(material);
        }
    }

    /// Releases every entry. Materials hold no GPU memory of their own.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.materials.clear();
    }

    /// Draws every entry with its material. The caller has already uploaded
    /// the matrices for this mesh.
    pub fn render(&mut self, shaders: &StoredShaders, textures: &TexturesCollection) {
        for layout in &VERTEX_LAYOUTS {
            self.gpu.enable_vertex_attribute(layout.index);
        }

        for entry in &self.entries {
            entry.bind();

            let Some(material) = self.materials.get_mut(entry.material_index) else {
                continue;
            };
            let Some(program) = material.use_material_shader(shaders) else {
                warn!("Mesh '{}': no shader for material '{}'", self.name, material.name);
                continue;
            };

            material.bind_textures(textures);
            material.set_textures_uniforms(program);
            material.set_uniforms(program);

            self.gpu.draw_triangles(entry.index_count as i32);
        }

        for layout in &VERTEX_LAYOUTS {
            self.gpu.disable_vertex_attribute(layout.index);
        }
    }

    pub fn entries(&self) -> &[MeshEntry] {
        &self.entries
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut [Material] {
        &mut self.materials
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HasTransform for Mesh {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

fn build_vertices(imported: &ImportedMesh) -> Vec<Vertex> {
    let channel = |data: &Option<Vec<[f32; 3]>>, i: usize| {
        data.as_ref().and_then(|d| d.get(i)).copied().unwrap_or_default()
    };

    imported
        .positions
        .iter()
        .enumerate()
        .map(|(i, position)| Vertex {
            position: *position,
            uv: imported.uvs.as_ref().and_then(|uvs| uvs.get(i)).copied().unwrap_or_default(),
            normal: channel(&imported.normals, i),
            tangent: channel(&imported.tangents, i),
            bitangent: channel(&imported.bitangents, i),
        })
        .collect()
}

fn build_indices(entry: usize, imported: &ImportedMesh) -> Result<Vec<u32>, MeshError> {
    let vertices = imported.vertex_count();
    let mut indices = Vec::with_capacity(imported.faces.len() * 3);

    for (face, indices_of_face) in imported.faces.iter().enumerate() {
        if indices_of_face.len() != 3 {
            return Err(MeshError::NonTriangularFace {
                entry,
                face,
                indices: indices_of_face.len(),
            });
        }
        if let Some(&index) = indices_of_face.iter().find(|&&i| i as usize >= vertices) {
            return Err(MeshError::IndexOutOfRange {
                entry,
                index,
                vertices,
            });
        }
        indices.extend_from_slice(indices_of_face);
    }

    Ok(indices)
}
