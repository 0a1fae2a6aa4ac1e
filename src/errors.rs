//! Error types
//!
//! Every fallible operation in the renderer returns one of the enums below.
//! They follow the three failure classes of the asset pipeline:
//!
//! - [`ImportError`]: a model file could not be read or parsed. The mesh that
//!   requested it is left empty.
//! - [`TextureError`]: a single texture failed to decode or upload. Mesh
//!   import recovers from these by substituting the default texture.
//! - [`MeshError::NonTriangularFace`]: the importer handed back a face that is
//!   not a triangle. Mesh construction stops instead of uploading corrupt
//!   index data.
//!
//! GPU allocation failures ([`GpuError`]) are not retried; callers are
//! expected to treat them as fatal.

use std::path::PathBuf;

use thiserror::Error;

use crate::renderer::RendererState;

/// Failure to allocate a GPU object.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("failed to create {resource}: {message}")]
    Allocation {
        resource: &'static str,
        message: String,
    },
}

/// Shader compilation or linkage failure.
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("failed to compile {stage} shader '{name}': {log}")]
    Compile {
        name: String,
        stage: &'static str,
        log: String,
    },

    #[error("failed to link shader program '{name}': {log}")]
    Link { name: String, log: String },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// The asset importer could not produce a scene.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("'{}' is missing buffer data: {reason}", path.display())]
    MissingBuffer { path: PathBuf, reason: String },

    #[error("sub-mesh {mesh} of '{}' has no vertex positions", path.display())]
    MissingPositions { path: PathBuf, mesh: usize },
}

/// A single texture failed to load.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to decode texture '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to upload texture '{}': {source}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: GpuError,
    },
}

/// Mesh construction failure. The mesh is empty after any of these.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("sub-mesh {entry}: face {face} has {indices} indices, expected a triangle")]
    NonTriangularFace {
        entry: usize,
        face: usize,
        indices: usize,
    },

    #[error("sub-mesh {entry}: index {index} is out of range for {vertices} vertices")]
    IndexOutOfRange {
        entry: usize,
        index: u32,
        vertices: usize,
    },

    #[error("sub-mesh {entry}: material {material} does not exist ({available} materials)")]
    MissingMaterial {
        entry: usize,
        material: usize,
        available: usize,
    },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Renderer lifecycle and setup failures.
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("renderer is {found:?}, operation requires {expected:?}")]
    InvalidState {
        expected: RendererState,
        found: RendererState,
    },

    #[error("no active camera")]
    NoActiveCamera,

    #[error("shader program does not declare the '{0}' uniform block")]
    MissingUniformBlock(&'static str),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

pub type Result<T, E = RendererError> = std::result::Result<T, E>;
