use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::collections::Slots;
use crate::errors::{GpuError, TextureError};
use crate::handles::TextureHandle;
use crate::opengl::Gpu;
use crate::textures::{DecodedImage, Texture, TextureType};

/// Owns every texture; materials only hold handles into it.
///
/// Textures loaded from files are deduplicated by path: registering the same
/// file twice returns the first handle without decoding again.
pub struct TexturesCollection {
    gpu: Gpu,
    textures: Slots<TextureHandle, Texture>,
    by_filename: HashMap<PathBuf, TextureHandle>,
    default_texture: TextureHandle,
}

impl TexturesCollection {
    /// Creates the collection with its 1x1 white default texture in place.
    pub fn new(gpu: Gpu) -> Result<Self, GpuError> {
        let mut textures = Slots::new();
        let default_texture = textures.next_handle();

        let mut texture = Texture::empty(gpu.clone(), default_texture, TextureType::Diffuse);
        texture.upload(&DecodedImage {
            width: 1,
            height: 1,
            bits_per_pixel: 32,
            pixels: vec![255; 4],
        })?;
        textures.insert(texture);

        Ok(Self {
            gpu,
            textures,
            by_filename: HashMap::new(),
            default_texture,
        })
    }

    /// Registers and loads the texture at `path`.
    ///
    /// A failed load stores nothing, so a later call retries the file.
    pub fn add_texture(
        &mut self,
        path: impl AsRef<Path>,
        texture_type: TextureType,
    ) -> Result<TextureHandle, TextureError> {
        let path = path.as_ref();
        if let Some(handle) = self.by_filename.get(path) {
            debug!("TexturesCollection: reusing {:?} for {}", handle, path.display());
            return Ok(*handle);
        }

        let handle = self.textures.next_handle();
        let mut texture = Texture::from_file(self.gpu.clone(), handle, texture_type, path);
        texture.load()?;

        self.textures.insert(texture);
        self.by_filename.insert(path.to_path_buf(), handle);
        Ok(handle)
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle)
    }

    pub fn find(&self, path: impl AsRef<Path>) -> Option<TextureHandle> {
        self.by_filename.get(path.as_ref()).copied()
    }

    pub fn default_texture(&self) -> TextureHandle {
        self.default_texture
    }

    /// Live textures, including the default one.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Removes and releases a texture. The default texture cannot be removed.
    pub fn remove(&mut self, handle: TextureHandle) -> bool {
        if handle == self.default_texture {
            warn!("TexturesCollection: refusing to remove the default texture");
            return false;
        }

        match self.textures.remove(handle) {
            Some(texture) => {
                if let Some(path) = texture.filename() {
                    self.by_filename.remove(path);
                }
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureHandle, &Texture)> {
        self.textures.iter()
    }
}

impl Drop for TexturesCollection {
    fn drop(&mut self) {
        debug!("TexturesCollection: releasing {} textures", self.textures.len());
        self.textures.clear();
    }
}
