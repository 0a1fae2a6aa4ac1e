mod common;

use std::path::Path;

use smallvec::smallvec;

use scene_renderer::collections::{MeshesCollection, ShaderKind, TexturesCollection};
use scene_renderer::data::{ImportedMaterial, ImportedMesh, ImportedScene};
use scene_renderer::mesh::Mesh;
use scene_renderer::{GltfImporter, ImportError, ImportFlags, MeshError, SceneImporter, TextureType};

use common::{recording_device, Fixture};

#[test]
fn textured_cube_loads_as_one_entry() {
    let fixture = Fixture::new("textured_cube");
    fixture.write_png("crate.png", [200, 120, 40, 255]);
    let model = fixture.write_cube_model("cube.gltf", &[Some("crate.png")]);

    let (device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut meshes = MeshesCollection::new(gpu);

    let (handle, report) = meshes
        .load_file(&model, &GltfImporter, ImportFlags::default(), &mut textures)
        .unwrap();
    assert!(!report.has_errors());
    assert_eq!((report.entries, report.materials), (1, 1));

    let mesh = meshes.get(handle).unwrap();
    assert_eq!(mesh.name, "cube");
    assert_eq!(mesh.entries()[0].vertex_count(), 24);
    assert_eq!(mesh.entries()[0].index_count(), 36);
    assert_eq!(mesh.entries()[0].face_count(), 12);

    let material = &mesh.materials()[0];
    let diffuse = material.texture(TextureType::Diffuse).unwrap();
    assert_ne!(diffuse, textures.default_texture());
    assert_eq!(textures.get(diffuse).unwrap().width(), 2);
    assert_eq!(material.shader(), Some(ShaderKind::Phong));

    // Vertex and index buffer of the single entry.
    assert_eq!(device.live_buffer_count(), 2);
}

#[test]
fn primitive_without_material_gets_a_default_one() {
    let fixture = Fixture::new("no_material");
    let model = fixture.write_cube_model("bare.gltf", &[]);

    let (_device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut mesh = Mesh::new(gpu, "bare");

    let report = mesh
        .load_mesh(&model, &GltfImporter, ImportFlags::default(), &mut textures)
        .unwrap();
    assert_eq!(report.materials, 1);

    let material = &mesh.materials()[0];
    assert_eq!(material.texture(TextureType::Diffuse), Some(textures.default_texture()));
    assert_eq!(material.shader(), Some(ShaderKind::Diffuse));
}

#[test]
fn missing_texture_falls_back_to_the_default() {
    let fixture = Fixture::new("missing_texture");
    let model = fixture.write_cube_model("cube.gltf", &[Some("nowhere.png")]);

    let (_device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut mesh = Mesh::new(gpu, "cube");

    let report = mesh
        .load_mesh(&model, &GltfImporter, ImportFlags::default(), &mut textures)
        .unwrap();
    assert!(report.has_errors());
    assert_eq!(report.texture_errors.len(), 1);
    assert_eq!(mesh.entries().len(), 1);
    assert_eq!(
        mesh.materials()[0].texture(TextureType::Diffuse),
        Some(textures.default_texture())
    );
    assert_eq!(textures.texture_count(), 1);
}

#[test]
fn missing_normal_map_keeps_the_lit_shader() {
    let mut textures_by_type = std::collections::BTreeMap::new();
    textures_by_type.insert(TextureType::Normals, vec!["missing_normal.png".to_string()]);
    let importer = StaticImporter(ImportedScene {
        meshes: vec![triangle_mesh()],
        materials: vec![ImportedMaterial {
            name: "bumpy".to_string(),
            specular: [0.5; 3],
            textures: textures_by_type,
            ..ImportedMaterial::default()
        }],
    });

    let (_device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut mesh = Mesh::new(gpu, "bumpy");

    let report = mesh
        .load_mesh(Path::new("bumpy.obj"), &importer, ImportFlags::default(), &mut textures)
        .unwrap();
    assert!(report.has_errors());

    let material = &mesh.materials()[0];
    assert_eq!(material.texture(TextureType::Normals), Some(textures.default_texture()));
    assert!(material.is_fallback(TextureType::Normals));
    assert_eq!(material.shader(), Some(ShaderKind::Phong));
}

#[test]
fn escaped_uris_reach_files_with_spaces() {
    let fixture = Fixture::new("escaped_uri");
    fixture.write_png("my crate.png", [30, 60, 90, 255]);
    let model = fixture.write_cube_model("my cube.gltf", &[Some("my crate.png")]);
    let json = std::fs::read_to_string(&model).unwrap();
    assert!(json.contains("my%20cube.bin") && json.contains("my%20crate.png"));

    let (_device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut mesh = Mesh::new(gpu, "cube");

    let report = mesh
        .load_mesh(&model, &GltfImporter, ImportFlags::default(), &mut textures)
        .unwrap();
    assert!(!report.has_errors());
    assert_eq!(mesh.entries()[0].index_count(), 36);
    assert_ne!(
        mesh.materials()[0].texture(TextureType::Diffuse),
        Some(textures.default_texture())
    );
}

#[test]
fn shared_texture_is_loaded_once() {
    let fixture = Fixture::new("shared_texture");
    fixture.write_png("shared.png", [255, 255, 255, 255]);
    let first = fixture.write_cube_model("first.gltf", &[Some("shared.png"), Some("shared.png")]);
    let second = fixture.write_cube_model("second.gltf", &[Some("shared.png")]);

    let (device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut meshes = MeshesCollection::new(gpu);

    let (a, _) = meshes
        .load_file(&first, &GltfImporter, ImportFlags::default(), &mut textures)
        .unwrap();
    let (b, _) = meshes
        .load_file(&second, &GltfImporter, ImportFlags::default(), &mut textures)
        .unwrap();

    let a = meshes.get(a).unwrap();
    let b = meshes.get(b).unwrap();
    assert_eq!(a.entries().len(), 2);
    let shared = a.materials()[0].texture(TextureType::Diffuse);
    assert_eq!(a.materials()[1].texture(TextureType::Diffuse), shared);
    assert_eq!(b.materials()[0].texture(TextureType::Diffuse), shared);

    // The default texture plus the shared file.
    assert_eq!(textures.texture_count(), 2);
    assert_eq!(device.live_texture_count(), 2);
}

#[test]
fn reloading_releases_the_previous_buffers() {
    let fixture = Fixture::new("reload");
    let model = fixture.write_cube_model("cube.gltf", &[None, None]);

    let (device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut mesh = Mesh::new(gpu, "cube");

    for _ in 0..3 {
        mesh.load_mesh(&model, &GltfImporter, ImportFlags::default(), &mut textures)
            .unwrap();
        assert_eq!(mesh.entries().len(), 2);
        assert_eq!(device.live_buffer_count(), 4);
    }

    drop(mesh);
    assert_eq!(device.live_buffer_count(), 0);
}

#[test]
fn loading_another_file_releases_the_previous_buffers() {
    let fixture = Fixture::new("reload_other");
    let two = fixture.write_cube_model("two.gltf", &[None, None]);
    let one = fixture.write_cube_model("one.gltf", &[None]);

    let (device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut mesh = Mesh::new(gpu, "cube");

    mesh.load_mesh(&two, &GltfImporter, ImportFlags::default(), &mut textures)
        .unwrap();
    assert_eq!(mesh.entries().len(), 2);
    let first_load = device.live_buffers();
    assert_eq!(first_load.len(), 4);

    mesh.load_mesh(&one, &GltfImporter, ImportFlags::default(), &mut textures)
        .unwrap();
    assert_eq!(mesh.entries().len(), 1);
    assert_eq!(mesh.materials().len(), 1);
    assert_eq!(device.live_buffer_count(), 2);
    let live = device.live_buffers();
    assert!(first_load.iter().all(|buffer| !live.contains(buffer)));
}

/// Hands back a fixed scene regardless of the path.
struct StaticImporter(ImportedScene);

impl SceneImporter for StaticImporter {
    fn import(&self, _path: &Path, _flags: ImportFlags) -> Result<ImportedScene, ImportError> {
        Ok(self.0.clone())
    }
}

fn triangle_mesh() -> ImportedMesh {
    ImportedMesh {
        name: "triangle".to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
        faces: vec![smallvec![0, 1, 2]],
        ..ImportedMesh::default()
    }
}

#[test]
fn quad_face_aborts_the_whole_mesh() {
    let mut quad = triangle_mesh();
    quad.faces = vec![smallvec![0, 1, 2], smallvec![0, 1, 3, 2]];
    let importer = StaticImporter(ImportedScene {
        meshes: vec![triangle_mesh(), quad],
        materials: vec![ImportedMaterial::default()],
    });

    let (device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut mesh = Mesh::new(gpu, "broken");

    let result = mesh.load_mesh(Path::new("broken.obj"), &importer, ImportFlags::default(), &mut textures);
    assert!(matches!(
        result,
        Err(MeshError::NonTriangularFace {
            entry: 1,
            face: 1,
            indices: 4
        })
    ));
    assert!(mesh.is_empty());
    assert!(mesh.materials().is_empty());
    assert_eq!(device.live_buffer_count(), 0);
}

#[test]
fn missing_model_file_is_an_import_error() {
    let (_device, gpu) = recording_device();
    let mut textures = TexturesCollection::new(gpu.clone()).unwrap();
    let mut mesh = Mesh::new(gpu, "ghost");

    let result = mesh.load_mesh(
        Path::new("definitely/not/here.gltf"),
        &GltfImporter,
        ImportFlags::default(),
        &mut textures,
    );
    assert!(matches!(result, Err(MeshError::Import(_))));
    assert!(mesh.is_empty());
}
