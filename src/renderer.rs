use std::path::Path;

use glow::NativeVertexArray;
use log::{debug, error, info, trace};

use crate::camera::PerspectiveCamera;
use crate::collections::{CamerasCollection, LightsCollection, MeshesCollection, StoredShaders, TexturesCollection};
use crate::components::HasTransform;
use crate::config::RendererConfig;
use crate::errors::{RendererError, Result};
use crate::handles::MeshHandle;
use crate::loader::{GltfImporter, SceneImporter};
use crate::matrices::{ElementalMatrices, MATRICES_BLOCK};
use crate::mesh::ImportReport;
use crate::opengl::Gpu;
use crate::viewport::Viewport;

/// Lifecycle of a [`Renderer`]. Each state only moves forward; `shutdown`
/// returns to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Loaded,
    SetUp,
    Looping,
}

/// Everything created at setup. Fields drop in declaration order: meshes
/// before the textures they reference, shared blocks last.
pub struct Scene {
    pub meshes: MeshesCollection,
    pub textures: TexturesCollection,
    pub shaders: StoredShaders,
    pub matrices: ElementalMatrices,
    pub lights: LightsCollection,
    pub cameras: CamerasCollection,
    vertex_array: NativeVertexArray,
    gpu: Gpu,
}

impl Drop for Scene {
    fn drop(&mut self) {
        debug!("Scene: releasing {} meshes", self.meshes.mesh_count());
        self.gpu.bind_vertex_array(None);
        self.gpu.delete_vertex_array(self.vertex_array);
    }
}

/// Forward renderer: one pass, every mesh drawn in insertion order.
pub struct Renderer {
    state: RendererState,
    config: RendererConfig,
    viewport: Viewport,
    importer: Box<dyn SceneImporter>,
    gpu: Option<Gpu>,
    scene: Option<Scene>,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self::with_importer(config, Box::new(GltfImporter))
    }

    pub fn with_importer(config: RendererConfig, importer: Box<dyn SceneImporter>) -> Self {
        Self {
            state: RendererState::Uninitialized,
            viewport: Viewport::from_size(config.width, config.height),
            config,
            importer,
            gpu: None,
            scene: None,
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    fn expect_state(&self, expected: RendererState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RendererError::InvalidState {
                expected,
                found: self.state,
            })
        }
    }

    /// Attaches the graphics device. Must come first.
    pub fn load(&mut self, gpu: Gpu) -> Result<()> {
        self.expect_state(RendererState::Uninitialized)?;
        self.gpu = Some(gpu);
        self.state = RendererState::Loaded;
        info!("Renderer: graphics device loaded");
        Ok(())
    }

    /// Creates every collection, links the shared uniform blocks and fills
    /// the scene from the config. Model files that fail to load are logged
    /// and skipped.
    pub fn setup(&mut self) -> Result<()> {
        self.expect_state(RendererState::Loaded)?;
        let gpu = self.gpu.clone().ok_or(RendererError::InvalidState {
            expected: RendererState::Loaded,
            found: RendererState::Uninitialized,
        })?;

        gpu.set_pipeline_state(&self.config.pipeline);
        gpu.set_viewport(&self.viewport);

        let textures = TexturesCollection::new(gpu.clone())?;
        let shaders = StoredShaders::new(gpu.clone())?;

        // Core profiles draw nothing without a bound vertex array. Nothing
        // fallible may run between here and the owning scene.
        let vertex_array = gpu.create_vertex_array()?;
        gpu.bind_vertex_array(Some(vertex_array));

        let mut scene = Scene {
            meshes: MeshesCollection::new(gpu.clone()),
            textures,
            shaders,
            matrices: ElementalMatrices::new(),
            lights: LightsCollection::new(gpu.clone()),
            cameras: CamerasCollection::new(),
            vertex_array,
            gpu: gpu.clone(),
        };

        let default_shader = scene
            .shaders
            .default_shader()
            .ok_or(RendererError::MissingUniformBlock(MATRICES_BLOCK))?;
        scene.matrices.set_uniform_block_info(gpu.clone(), default_shader)?;
        scene.lights.set_uniform_block_info(default_shader)?;

        for light_config in &self.config.lights {
            let handle = scene.lights.create_light(light_config.light_type);
            if let Some(light) = scene.lights.get_mut(handle) {
                light.set_position(light_config.position.into());
                let [r, g, b] = light_config.color;
                light.set_color(r, g, b);
                light.set_intensity(light_config.intensity);
                light.set_attenuation(light_config.attenuation);
            }
        }

        for placed in &self.config.stored_meshes {
            let handle = scene.meshes.add_stored(placed.mesh, &mut scene.textures)?;
            if let Some(mesh) = scene.meshes.get_mut(handle) {
                mesh.set_position(placed.position.into());
            }
        }

        for path in &self.config.models {
            if let Err(e) = scene.meshes.load_file(
                path,
                self.importer.as_ref(),
                self.config.import_flags,
                &mut scene.textures,
            ) {
                error!("Renderer: skipping {}: {}", path.display(), e);
            }
        }

        let camera = PerspectiveCamera::new(
            "main".to_string(),
            self.config.camera_position.into(),
            self.config.fov,
            self.viewport.width.max(0) as u32,
            self.viewport.height.max(0) as u32,
            self.config.near_plane,
            self.config.far_plane,
        );
        scene.cameras.add_camera(Box::new(camera));

        info!(
            "Renderer: set up with {} meshes, {} lights, {} textures",
            scene.meshes.mesh_count(),
            scene.lights.light_count(),
            scene.textures.texture_count()
        );
        self.scene = Some(scene);
        self.state = RendererState::SetUp;
        Ok(())
    }

    /// Loads another model into the running scene.
    pub fn load_model(&mut self, path: &Path) -> Result<(MeshHandle, ImportReport)> {
        let Some(scene) = self.scene.as_mut() else {
            return Err(RendererError::InvalidState {
                expected: RendererState::SetUp,
                found: self.state,
            });
        };

        let loaded = scene.meshes.load_file(
            path,
            self.importer.as_ref(),
            self.config.import_flags,
            &mut scene.textures,
        )?;
        Ok(loaded)
    }

    /// Draws one frame.
    pub fn frame(&mut self) -> Result<()> {
        if self.state != RendererState::Looping {
            self.expect_state(RendererState::SetUp)?;
        }
        let (Some(gpu), Some(scene)) = (self.gpu.as_ref(), self.scene.as_mut()) else {
            return Err(RendererError::InvalidState {
                expected: RendererState::SetUp,
                found: self.state,
            });
        };
        self.state = RendererState::Looping;

        gpu.clear(self.config.clear_color);

        let camera = scene
            .cameras
            .active_camera_mut()
            .ok_or(RendererError::NoActiveCamera)?;
        camera.update_matrices();
        scene.matrices.set_view_matrix(*camera.get_view());
        scene.matrices.set_projection_matrix(*camera.get_projection());

        scene.matrices.set_frame_uniform_block();
        scene.lights.set_uniform_block();

        for (handle, mesh) in scene.meshes.iter_mut() {
            trace!("Renderer: drawing {:?} '{}'", handle, mesh.name);
            scene.matrices.set_model_matrix(mesh.model_matrix());
            scene.matrices.calculate_matrices();
            scene.matrices.set_object_uniform_block();
            mesh.render(&scene.shaders, &scene.textures);
        }

        Ok(())
    }

    /// Applies a new framebuffer size to the viewport and every camera.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::from_size(width, height);
        self.config.width = width;
        self.config.height = height;

        if let Some(gpu) = &self.gpu {
            gpu.set_viewport(&self.viewport);
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.cameras.set_viewport_size(width, height);
        }
        debug!("Renderer: resized to {}x{}", width, height);
    }

    /// Releases every GPU resource and detaches the device.
    pub fn shutdown(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.meshes.clear();
            drop(scene);
        }
        self.gpu = None;
        self.state = RendererState::Uninitialized;
        info!("Renderer: shut down");
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if self.state != RendererState::Uninitialized {
            self.shutdown();
        }
    }
}
