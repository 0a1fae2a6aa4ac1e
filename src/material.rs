use std::collections::{BTreeMap, BTreeSet};

use glow::{NativeProgram, NativeUniformLocation};
use log::trace;

use crate::collections::{ShaderKind, StoredShaders, TexturesCollection};
use crate::data::ImportedMaterial;
use crate::handles::TextureHandle;
use crate::opengl::UniformValue;
use crate::shaders::ShaderProgram;
use crate::textures::TextureType;

/// Uniform locations of one program, resolved once.
#[derive(Debug, Clone)]
struct MaterialLocations {
    program: NativeProgram,
    ambient: Option<NativeUniformLocation>,
    diffuse: Option<NativeUniformLocation>,
    specular: Option<NativeUniformLocation>,
    shininess: Option<NativeUniformLocation>,
    samplers: Vec<(TextureType, Option<NativeUniformLocation>)>,
}

impl MaterialLocations {
    fn resolve(program: &ShaderProgram, textures: impl Iterator<Item = TextureType>) -> Self {
        Self {
            program: program.program(),
            ambient: program.uniform_location("material.ambient"),
            diffuse: program.uniform_location("material.diffuse"),
            specular: program.uniform_location("material.specular"),
            shininess: program.uniform_location("material.shininess"),
            samplers: textures
                .map(|t| (t, program.uniform_location(t.sampler_name())))
                .collect(),
        }
    }
}

/// Surface description of one sub-mesh.
///
/// Textures are borrowed by handle from the [`TexturesCollection`]; a
/// material never owns GPU memory. At most one texture is kept per type,
/// and types bind in reverse declaration order. Slots filled with a
/// stand-in for a texture that failed to load are remembered as fallbacks
/// and do not count when picking a shader.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,

    textures: BTreeMap<TextureType, TextureHandle>,
    fallbacks: BTreeSet<TextureType>,
    shader: Option<ShaderKind>,
    locations: Option<MaterialLocations>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_imported(&ImportedMaterial {
            name: name.into(),
            ..ImportedMaterial::default()
        })
    }

    /// Copies the scalar properties. Textures are added separately.
    pub fn from_imported(imported: &ImportedMaterial) -> Self {
        Self {
            name: imported.name.clone(),
            ambient: imported.ambient,
            diffuse: imported.diffuse,
            specular: imported.specular,
            shininess: imported.shininess,
            textures: BTreeMap::new(),
            fallbacks: BTreeSet::new(),
            shader: None,
            locations: None,
        }
    }

    /// Puts `texture` in the `slot` for its type. The first texture per slot
    /// wins; returns false if the slot was already taken.
    pub fn add_texture(&mut self, slot: TextureType, texture: TextureHandle) -> bool {
        if self.textures.contains_key(&slot) {
            return false;
        }
        self.textures.insert(slot, texture);
        self.locations = None;
        true
    }

    /// Like [`Material::add_texture`], but marks the slot as holding a
    /// stand-in rather than the texture the model asked for.
    pub fn add_fallback_texture(&mut self, slot: TextureType, texture: TextureHandle) -> bool {
        let added = self.add_texture(slot, texture);
        if added {
            self.fallbacks.insert(slot);
        }
        added
    }

    pub fn is_fallback(&self, slot: TextureType) -> bool {
        self.fallbacks.contains(&slot)
    }

    pub fn texture(&self, slot: TextureType) -> Option<TextureHandle> {
        self.textures.get(&slot).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (TextureType, TextureHandle)> + '_ {
        self.textures.iter().map(|(slot, handle)| (*slot, *handle))
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn shader(&self) -> Option<ShaderKind> {
        self.shader
    }

    /// Switches program. Cached uniform locations belong to the old program
    /// and are dropped.
    pub fn set_shader(&mut self, kind: ShaderKind) {
        if self.shader != Some(kind) {
            self.shader = Some(kind);
            self.locations = None;
        }
    }

    /// Picks the most specific built-in program this material can feed.
    /// A fallback normal map carries no normals, so it does not select the
    /// normal-mapped program.
    pub fn guess_material_shader(&mut self) -> ShaderKind {
        let has_normal_map =
            self.textures.contains_key(&TextureType::Normals) && !self.is_fallback(TextureType::Normals);
        let kind = if has_normal_map {
            ShaderKind::NormalMapped
        } else if self.specular.iter().any(|c| *c > 0.0) {
            ShaderKind::Phong
        } else {
            ShaderKind::Diffuse
        };
        self.set_shader(kind);
        kind
    }

    /// Activates this material's program, guessing one if none was set, and
    /// makes sure the location cache matches it.
    pub fn use_material_shader<'a>(&mut self, shaders: &'a StoredShaders) -> Option<&'a ShaderProgram> {
        let kind = match self.shader {
            Some(kind) => kind,
            None => self.guess_material_shader(),
        };
        let program = shaders.get(kind).or_else(|| shaders.default_shader())?;
        program.activate();

        let stale = self
            .locations
            .as_ref()
            .map_or(true, |cached| cached.program != program.program());
        if stale {
            trace!("Material '{}': resolving uniforms of '{}'", self.name, program.name);
            self.locations = Some(MaterialLocations::resolve(program, self.textures.keys().copied()));
        }

        Some(program)
    }

    /// Binds every texture to the unit of its slot, highest type first.
    /// Handles that no longer resolve bind the default texture.
    pub fn bind_textures(&self, textures: &TexturesCollection) {
        for (slot, handle) in self.textures.iter().rev() {
            let texture = textures
                .get(*handle)
                .or_else(|| textures.get(textures.default_texture()));
            if let Some(texture) = texture {
                texture.bind_as(*slot);
            }
        }
    }

    /// Points each sampler at the unit of its slot.
    pub fn set_textures_uniforms(&self, program: &ShaderProgram) {
        let Some(locations) = self.cached_locations(program) else {
            return;
        };
        for (slot, location) in &locations.samplers {
            program.set_uniform_at(location.as_ref(), UniformValue::Int(slot.unit() as i32));
        }
    }

    pub fn set_uniforms(&self, program: &ShaderProgram) {
        let Some(locations) = self.cached_locations(program) else {
            return;
        };
        program.set_uniform_at(locations.ambient.as_ref(), UniformValue::Vec3(self.ambient));
        program.set_uniform_at(locations.diffuse.as_ref(), UniformValue::Vec3(self.diffuse));
        program.set_uniform_at(locations.specular.as_ref(), UniformValue::Vec3(self.specular));
        program.set_uniform_at(locations.shininess.as_ref(), UniformValue::Float(self.shininess));
    }

    fn cached_locations(&self, program: &ShaderProgram) -> Option<&MaterialLocations> {
        self.locations
            .as_ref()
            .filter(|cached| cached.program == program.program())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::recording::{GpuCommand, RecordingDevice};

    #[test]
    fn first_texture_per_slot_wins() {
        let mut material = Material::new("m");
        assert!(material.add_texture(TextureType::Diffuse, TextureHandle(1)));
        assert!(!material.add_texture(TextureType::Diffuse, TextureHandle(2)));
        assert_eq!(material.texture(TextureType::Diffuse), Some(TextureHandle(1)));
        assert_eq!(material.texture_count(), 1);
    }

    #[test]
    fn shader_guess_follows_inputs() {
        let mut material = Material::new("m");
        assert_eq!(material.guess_material_shader(), ShaderKind::Diffuse);

        material.specular = [0.5; 3];
        assert_eq!(material.guess_material_shader(), ShaderKind::Phong);

        material.add_texture(TextureType::Normals, TextureHandle(4));
        assert_eq!(material.guess_material_shader(), ShaderKind::NormalMapped);
    }

    #[test]
    fn fallback_normal_map_does_not_pick_the_normal_mapped_shader() {
        let mut material = Material::new("m");
        material.specular = [0.5; 3];
        assert!(material.add_fallback_texture(TextureType::Normals, TextureHandle(0)));
        assert!(material.is_fallback(TextureType::Normals));
        assert_eq!(material.texture(TextureType::Normals), Some(TextureHandle(0)));
        assert_eq!(material.guess_material_shader(), ShaderKind::Phong);

        material.specular = [0.0; 3];
        assert_eq!(material.guess_material_shader(), ShaderKind::Diffuse);

        // A taken slot stays as it was.
        let mut real = Material::new("real");
        real.add_texture(TextureType::Normals, TextureHandle(3));
        assert!(!real.add_fallback_texture(TextureType::Normals, TextureHandle(0)));
        assert!(!real.is_fallback(TextureType::Normals));
        assert_eq!(real.guess_material_shader(), ShaderKind::NormalMapped);
    }

    #[test]
    fn textures_bind_in_reverse_type_order() {
        let device = Rc::new(RecordingDevice::new());
        let textures = TexturesCollection::new(device.clone()).unwrap();
        let default = textures.default_texture();

        let mut material = Material::new("m");
        material.add_texture(TextureType::Diffuse, default);
        material.add_texture(TextureType::Normals, default);
        material.add_texture(TextureType::Specular, default);
        device.clear_commands();

        material.bind_textures(&textures);
        let units: Vec<u32> = device
            .commands()
            .iter()
            .filter_map(|c| match c {
                GpuCommand::BindTexture { unit, .. } => Some(*unit),
                _ => None,
            })
            .collect();
        assert_eq!(
            units,
            vec![
                TextureType::Normals.unit(),
                TextureType::Specular.unit(),
                TextureType::Diffuse.unit()
            ]
        );
    }

    #[test]
    fn locations_are_resolved_once_per_program() {
        let device = Rc::new(RecordingDevice::new());
        let shaders = StoredShaders::new(device.clone()).unwrap();

        let mut material = Material::new("m");
        material.add_texture(TextureType::Diffuse, TextureHandle(0));

        let program = material.use_material_shader(&shaders).unwrap();
        material.set_uniforms(program);
        material.set_textures_uniforms(program);
        assert_eq!(
            device.uniform_value(program.program(), "material.shininess"),
            Some(UniformValue::Float(1.0))
        );
        assert_eq!(
            device.uniform_value(program.program(), "diffuseMap"),
            Some(UniformValue::Int(0))
        );

        let first = material.locations.as_ref().map(|l| l.program);
        material.use_material_shader(&shaders);
        assert_eq!(material.locations.as_ref().map(|l| l.program), first);

        material.set_shader(ShaderKind::Phong);
        assert!(material.locations.is_none());
        let phong = material.use_material_shader(&shaders).unwrap();
        assert_eq!(material.locations.as_ref().map(|l| l.program), Some(phong.program()));
    }
}
