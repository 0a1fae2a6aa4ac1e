//! A small forward renderer for static 3D scenes.
//!
//! Models are imported from glTF, their materials are matched to one of a few
//! built-in shader programs, and every frame draws each mesh once with the
//! shared matrices and lights uniform blocks bound. All GPU traffic goes
//! through [`GraphicsDevice`], implemented for [`glow::Context`] and for the
//! headless [`RecordingDevice`].

pub mod camera;
pub mod collections;
pub mod components;
pub mod config;
pub mod data;
pub mod errors;
pub mod handles;
pub mod light;
pub mod loader;
pub mod material;
pub mod matrices;
pub mod mesh;
pub mod opengl;
pub mod primitives;
pub mod recording;
pub mod renderer;
pub mod shaders;
pub mod textures;
pub mod uniform_block;
pub mod viewport;

pub use config::{LightConfig, PlacedMesh, RendererConfig};
pub use errors::{GpuError, ImportError, MeshError, RendererError, ShaderError, TextureError};
pub use light::{Light, LightType};
pub use loader::{GltfImporter, ImportFlags, SceneImporter};
pub use opengl::{GraphicsDevice, Gpu};
pub use primitives::StoredMesh;
pub use recording::RecordingDevice;
pub use renderer::{Renderer, RendererState, Scene};
pub use textures::TextureType;
