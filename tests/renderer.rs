mod common;

use std::path::PathBuf;

use scene_renderer::camera::Camera;
use scene_renderer::opengl::BufferTarget;
use scene_renderer::recording::GpuCommand;
use scene_renderer::{
    LightConfig, LightType, Renderer, RendererConfig, RendererError, RendererState, StoredMesh,
};

use common::{read_f32s, read_i32, recording_device, Fixture};

fn set_up(config: RendererConfig) -> (std::rc::Rc<scene_renderer::RecordingDevice>, Renderer) {
    let (device, gpu) = recording_device();
    let mut renderer = Renderer::new(config);
    renderer.load(gpu).unwrap();
    renderer.setup().unwrap();
    (device, renderer)
}

#[test]
fn lifecycle_must_run_in_order() {
    let (_device, gpu) = recording_device();
    let mut renderer = Renderer::new(RendererConfig::empty());
    assert_eq!(renderer.state(), RendererState::Uninitialized);

    assert!(matches!(
        renderer.frame(),
        Err(RendererError::InvalidState {
            expected: RendererState::SetUp,
            found: RendererState::Uninitialized
        })
    ));
    assert!(matches!(renderer.setup(), Err(RendererError::InvalidState { .. })));

    renderer.load(gpu.clone()).unwrap();
    assert_eq!(renderer.state(), RendererState::Loaded);
    assert!(matches!(renderer.load(gpu), Err(RendererError::InvalidState { .. })));

    renderer.setup().unwrap();
    assert_eq!(renderer.state(), RendererState::SetUp);

    renderer.frame().unwrap();
    renderer.frame().unwrap();
    assert_eq!(renderer.state(), RendererState::Looping);
}

#[test]
fn default_scene_draws_every_stored_mesh() {
    let (device, mut renderer) = set_up(RendererConfig::default());

    let scene = renderer.scene().unwrap();
    assert_eq!(scene.meshes.mesh_count(), 3);
    assert_eq!(scene.lights.light_count(), 1);
    assert_eq!(scene.cameras.camera_count(), 1);
    let expected: Vec<i32> = scene
        .meshes
        .iter()
        .flat_map(|(_, mesh)| mesh.entries().iter().map(|entry| entry.index_count() as i32))
        .collect();
    assert_eq!(expected.len(), 3);

    device.clear_commands();
    renderer.frame().unwrap();
    assert_eq!(device.draw_calls(), expected);

    device.clear_commands();
    renderer.frame().unwrap();
    assert_eq!(device.draw_calls(), expected);
}

/// What a frame did to a uniform buffer, or a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Matrices(usize),
    Lights,
    Draw,
}

#[test]
fn shared_blocks_go_up_once_and_object_matrices_before_each_draw() {
    let (device, mut renderer) = set_up(RendererConfig::default());
    renderer.frame().unwrap();
    device.clear_commands();
    renderer.frame().unwrap();

    let scene = renderer.scene().unwrap();
    let matrices = scene.matrices.uniform_block().unwrap();
    let lights = scene.lights.uniform_block().unwrap();
    let offset = |name: &str| matrices.offset_of(name).unwrap();

    let mut bound = None;
    let mut steps = Vec::new();
    for command in device.commands() {
        match command {
            GpuCommand::BindBuffer(BufferTarget::Uniform, buffer) => bound = buffer,
            GpuCommand::BufferSubData {
                target: BufferTarget::Uniform,
                offset,
                ..
            } => {
                if bound == Some(matrices.buffer()) {
                    steps.push(Step::Matrices(offset));
                } else if bound == Some(lights.buffer()) {
                    steps.push(Step::Lights);
                }
            }
            GpuCommand::DrawTriangles { .. } => steps.push(Step::Draw),
            _ => (),
        }
    }

    let per_object = [
        offset("model"),
        offset("modelView"),
        offset("modelViewProjection"),
        offset("normalMatrix"),
    ]
    .map(Step::Matrices);
    let mut expected = vec![
        Step::Matrices(offset("view")),
        Step::Matrices(offset("projection")),
        Step::Lights,
    ];
    for (_, mesh) in scene.meshes.iter() {
        expected.extend(per_object);
        expected.extend(mesh.entries().iter().map(|_| Step::Draw));
    }
    assert_eq!(scene.meshes.mesh_count(), 3);
    assert_eq!(steps, expected);
}

#[test]
fn frame_uploads_lights_and_camera() {
    let mut config = RendererConfig::empty();
    config.stored_meshes.push(scene_renderer::PlacedMesh {
        mesh: StoredMesh::Cube,
        position: [0.0, 0.0, 0.0],
    });
    config.lights = vec![
        LightConfig {
            position: [1.0, 2.0, 3.0],
            intensity: 2.5,
            ..LightConfig::default()
        },
        LightConfig {
            light_type: LightType::Directional,
            ..LightConfig::default()
        },
    ];
    let (device, mut renderer) = set_up(config);
    renderer.frame().unwrap();

    let scene = renderer.scene().unwrap();

    let lights = scene.lights.uniform_block().unwrap();
    let bytes = device.buffer_contents(lights.buffer()).unwrap();
    assert_eq!(read_i32(&bytes, lights.offset_of("lightCount").unwrap()), 2);
    assert_eq!(
        read_f32s(&bytes, lights.offset_of("lights[0].position").unwrap(), 3),
        vec![1.0, 2.0, 3.0]
    );
    assert_eq!(
        read_f32s(&bytes, lights.offset_of("lights[0].intensity").unwrap(), 1),
        vec![2.5]
    );
    assert_eq!(
        read_i32(&bytes, lights.offset_of("lights[1].lightType").unwrap()),
        LightType::Directional as i32
    );
    // Directional lights have no position.
    assert_eq!(
        read_f32s(&bytes, lights.offset_of("lights[1].position").unwrap(), 3),
        vec![0.0, 0.0, 0.0]
    );

    let matrices = scene.matrices.uniform_block().unwrap();
    let bytes = device.buffer_contents(matrices.buffer()).unwrap();
    let camera = scene.cameras.active_camera().unwrap();
    let projection: &[f32; 16] = camera.get_projection().as_ref();
    assert_eq!(
        read_f32s(&bytes, matrices.offset_of("projection").unwrap(), 16),
        projection.to_vec()
    );
}

#[test]
fn unreadable_models_are_skipped_at_setup() {
    let mut config = RendererConfig::default();
    config.models = vec![PathBuf::from("does/not/exist.gltf")];

    let (_device, renderer) = set_up(config);
    assert_eq!(renderer.state(), RendererState::SetUp);
    assert_eq!(renderer.scene().unwrap().meshes.mesh_count(), 3);
}

#[test]
fn models_can_be_added_while_looping() {
    let fixture = Fixture::new("runtime_model");
    fixture.write_png("crate.png", [90, 90, 90, 255]);
    let model = fixture.write_cube_model("crate.gltf", &[Some("crate.png")]);

    let (device, mut renderer) = set_up(RendererConfig::empty());
    renderer.frame().unwrap();
    assert!(device.draw_calls().is_empty());

    let (_, report) = renderer.load_model(&model).unwrap();
    assert!(!report.has_errors());

    device.clear_commands();
    renderer.frame().unwrap();
    assert_eq!(device.draw_calls(), vec![36]);
}

#[test]
fn frame_without_a_camera_fails() {
    let (_device, mut renderer) = set_up(RendererConfig::empty());

    let scene = renderer.scene_mut().unwrap();
    let active = scene.cameras.active_handle().unwrap();
    scene.cameras.remove_camera(active);

    assert!(matches!(renderer.frame(), Err(RendererError::NoActiveCamera)));
}

#[test]
fn resize_reaches_viewport_and_cameras() {
    let (_device, mut renderer) = set_up(RendererConfig::empty());
    renderer.resize(1024, 512);

    assert_eq!(renderer.viewport().width, 1024);
    assert_eq!(renderer.viewport().height, 512);
    let camera = renderer.scene().unwrap().cameras.active_camera().unwrap();
    assert_eq!((camera.get_width(), camera.get_height()), (1024, 512));
}

#[test]
fn missing_lights_block_fails_setup() {
    let (device, gpu) = recording_device();
    device.hide_uniform_block("Lights");

    let mut renderer = Renderer::new(RendererConfig::empty());
    renderer.load(gpu).unwrap();
    assert!(matches!(
        renderer.setup(),
        Err(RendererError::MissingUniformBlock("Lights"))
    ));
    assert_eq!(renderer.state(), RendererState::Loaded);
    assert!(renderer.scene().is_none());
    assert_eq!(device.live_vertex_array_count(), 0);
}

#[test]
fn failed_shader_build_leaves_no_gpu_objects() {
    let (device, gpu) = recording_device();
    device.reject_program("Phong");

    let mut renderer = Renderer::new(RendererConfig::empty());
    renderer.load(gpu).unwrap();
    assert!(matches!(renderer.setup(), Err(RendererError::Shader(_))));
    assert_eq!(renderer.state(), RendererState::Loaded);
    assert!(renderer.scene().is_none());

    assert!(!device
        .commands()
        .iter()
        .any(|command| matches!(command, GpuCommand::CreateVertexArray(_))));
    assert_eq!(device.live_vertex_array_count(), 0);
    assert_eq!(device.live_program_count(), 0);
    assert_eq!(device.live_texture_count(), 0);
}

#[test]
fn shutdown_releases_everything() {
    let fixture = Fixture::new("shutdown");
    fixture.write_png("crate.png", [10, 20, 30, 255]);
    let model = fixture.write_cube_model("crate.gltf", &[Some("crate.png")]);

    let mut config = RendererConfig::default();
    config.models = vec![model];
    let (device, mut renderer) = set_up(config);
    renderer.frame().unwrap();
    assert!(device.live_buffer_count() > 0);
    assert!(device.live_texture_count() > 0);
    assert!(device.live_program_count() > 0);

    renderer.shutdown();
    assert_eq!(renderer.state(), RendererState::Uninitialized);
    assert!(renderer.scene().is_none());
    assert_eq!(device.live_buffer_count(), 0);
    assert_eq!(device.live_texture_count(), 0);
    assert_eq!(device.live_program_count(), 0);
    assert_eq!(device.live_vertex_array_count(), 0);
}
