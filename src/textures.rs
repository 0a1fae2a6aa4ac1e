use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{GpuError, TextureError};
use crate::handles::TextureHandle;
use crate::opengl::Gpu;

/// What a texture is sampled for. The declaration order is the binding order
/// key used by materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureType {
    Diffuse,
    Specular,
    Ambient,
    Emissive,
    Height,
    Normals,
    Shininess,
    Opacity,
    Displacement,
    Lightmap,
    Reflection,
}

impl TextureType {
    pub const ALL: [TextureType; 11] = [
        TextureType::Diffuse,
        TextureType::Specular,
        TextureType::Ambient,
        TextureType::Emissive,
        TextureType::Height,
        TextureType::Normals,
        TextureType::Shininess,
        TextureType::Opacity,
        TextureType::Displacement,
        TextureType::Lightmap,
        TextureType::Reflection,
    ];

    /// Sampler uniform each type is exposed to shaders as.
    pub fn sampler_name(self) -> &'static str {
        match self {
            TextureType::Diffuse => "diffuseMap",
            TextureType::Specular => "specularMap",
            TextureType::Ambient => "ambientMap",
            TextureType::Emissive => "emissiveMap",
            TextureType::Height => "heightMap",
            TextureType::Normals => "normalsMap",
            TextureType::Shininess => "shininessMap",
            TextureType::Opacity => "opacityMap",
            TextureType::Displacement => "displacementMap",
            TextureType::Lightmap => "lightMap",
            TextureType::Reflection => "reflectionMap",
        }
    }

    /// Texture unit reserved for this type.
    pub fn unit(self) -> u32 {
        self as u32
    }
}

/// Pixels as handed back by the image decoder, expanded to RGBA8.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Bits per pixel of the source file before expansion.
    pub bits_per_pixel: u16,
    pub pixels: Vec<u8>,
}

/// Decodes an image file, flipped so the first row is the bottom of the image.
pub fn decode_image(path: &Path) -> Result<DecodedImage, TextureError> {
    let img = image::open(path).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let bits_per_pixel = img.color().bits_per_pixel();
    let img = img.flipv().to_rgba8();
    let (width, height) = img.dimensions();

    Ok(DecodedImage {
        width,
        height,
        bits_per_pixel,
        pixels: img.into_raw(),
    })
}

/// One GPU texture. Dimensions and format are fixed once loaded.
pub struct Texture {
    pub id: TextureHandle,
    pub texture_type: TextureType,
    filename: Option<PathBuf>,
    width: u32,
    height: u32,
    bits_per_pixel: u16,
    texture: Option<glow::NativeTexture>,
    gpu: Gpu,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("texture_type", &self.texture_type)
            .field("filename", &self.filename)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("texture", &self.texture)
            .finish()
    }
}

impl Texture {
    /// An unloaded texture with no backing file.
    pub fn empty(gpu: Gpu, id: TextureHandle, texture_type: TextureType) -> Self {
        Self {
            id,
            texture_type,
            filename: None,
            width: 0,
            height: 0,
            bits_per_pixel: 0,
            texture: None,
            gpu,
        }
    }

    /// An unloaded texture that will read `filename` on [`Texture::load`].
    pub fn from_file(
        gpu: Gpu,
        id: TextureHandle,
        texture_type: TextureType,
        filename: impl Into<PathBuf>,
    ) -> Self {
        let mut texture = Self::empty(gpu, id, texture_type);
        texture.filename = Some(filename.into());
        texture
    }

    /// Decodes and uploads the backing file. Does nothing if already loaded.
    pub fn load(&mut self) -> Result<(), TextureError> {
        if self.is_loaded() {
            return Ok(());
        }

        let Some(path) = self.filename.clone() else {
            return Ok(());
        };

        let image = decode_image(&path)?;
        self.upload(&image).map_err(|source| TextureError::Upload {
            path: path.clone(),
            source,
        })?;

        debug!(
            "Texture {:?}: loaded {} ({}x{}, {} bpp)",
            self.id,
            path.display(),
            self.width,
            self.height,
            self.bits_per_pixel
        );
        Ok(())
    }

    /// Uploads already decoded pixels. Does nothing if already loaded.
    pub fn upload(&mut self, image: &DecodedImage) -> Result<(), GpuError> {
        if self.is_loaded() {
            return Ok(());
        }

        let texture = self.gpu.create_texture()?;
        self.gpu
            .upload_texture_rgba8(texture, image.width, image.height, &image.pixels);

        self.texture = Some(texture);
        self.width = image.width;
        self.height = image.height;
        self.bits_per_pixel = image.bits_per_pixel;
        Ok(())
    }

    /// Releases the GPU texture. The texture can be loaded again afterwards.
    pub fn unload(&mut self) {
        if let Some(texture) = self.texture.take() {
            debug!("Texture {:?}: released", self.id);
            self.gpu.delete_texture(texture);
        }
    }

    /// Binds to the unit of `slot`, which may differ from the texture's own
    /// type when it stands in for a missing texture.
    pub fn bind_as(&self, slot: TextureType) {
        self.gpu.bind_texture(slot.unit(), self.texture);
    }

    pub fn is_loaded(&self) -> bool {
        self.texture.is_some()
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    pub fn native(&self) -> Option<glow::NativeTexture> {
        self.texture
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.unload();
    }
}
