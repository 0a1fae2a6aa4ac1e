use std::path::Path;

use log::debug;

use crate::collections::{Slots, TexturesCollection};
use crate::errors::MeshError;
use crate::handles::MeshHandle;
use crate::loader::{ImportFlags, SceneImporter};
use crate::mesh::{ImportReport, Mesh};
use crate::opengl::Gpu;
use crate::primitives::StoredMesh;

/// The flat list of meshes the renderer draws, in insertion order.
pub struct MeshesCollection {
    gpu: Gpu,
    meshes: Slots<MeshHandle, Mesh>,
}

impl MeshesCollection {
    pub fn new(gpu: Gpu) -> Self {
        Self {
            gpu,
            meshes: Slots::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        let handle = self.meshes.insert(mesh);
        debug!("MeshesCollection: added {:?}", handle);
        handle
    }

    /// Loads a model file into a new mesh. Nothing is added if the load fails.
    pub fn load_file(
        &mut self,
        path: &Path,
        importer: &dyn SceneImporter,
        flags: ImportFlags,
        textures: &mut TexturesCollection,
    ) -> Result<(MeshHandle, ImportReport), MeshError> {
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned());

        let mut mesh = Mesh::new(self.gpu.clone(), name);
        let report = mesh.load_mesh(path, importer, flags, textures)?;
        Ok((self.add_mesh(mesh), report))
    }

    /// Adds one of the built-in shapes.
    pub fn add_stored(
        &mut self,
        stored: StoredMesh,
        textures: &mut TexturesCollection,
    ) -> Result<MeshHandle, MeshError> {
        let mut mesh = Mesh::new(self.gpu.clone(), stored.name());
        mesh.load_from_scene(Path::new(stored.name()), &stored.scene(), textures)?;
        Ok(self.add_mesh(mesh))
    }

    pub fn remove_mesh(&mut self, handle: MeshHandle) -> Option<Mesh> {
        self.meshes.remove(handle)
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle)
    }

    pub fn get_mut(&mut self, handle: MeshHandle) -> Option<&mut Mesh> {
        self.meshes.get_mut(handle)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshHandle, &Mesh)> {
        self.meshes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MeshHandle, &mut Mesh)> {
        self.meshes.iter_mut()
    }

    /// Drops every mesh, releasing their buffers.
    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}
