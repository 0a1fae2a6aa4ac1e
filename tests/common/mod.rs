#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use scene_renderer::{Gpu, RecordingDevice};

/// A scratch directory of generated model files, removed on drop.
pub struct Fixture {
    pub dir: PathBuf,
}

/// Routes library logs through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

impl Fixture {
    pub fn new(name: &str) -> Self {
        init_logging();
        let dir = std::env::temp_dir().join(format!("scene_renderer_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn write_png(&self, file: &str, rgba: [u8; 4]) -> PathBuf {
        let path = self.path(file);
        image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba))
            .save(&path)
            .unwrap();
        path
    }

    /// Writes `file` (a `.gltf`) and its `.bin`: one mesh with one unit cube
    /// primitive per entry of `materials`. Each entry names the base color
    /// texture of that primitive's material, if any. With no materials, a
    /// single primitive without a material is written.
    pub fn write_cube_model(&self, file: &str, materials: &[Option<&str>]) -> PathBuf {
        let stem = Path::new(file)
            .file_stem()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        let bin_name = format!("{stem}.bin");

        let (positions, normals, uvs, indices) = cube_geometry();
        let mut bin = Vec::new();
        for p in &positions {
            bin.extend(p.iter().flat_map(|v| v.to_le_bytes()));
        }
        for n in &normals {
            bin.extend(n.iter().flat_map(|v| v.to_le_bytes()));
        }
        for uv in &uvs {
            bin.extend(uv.iter().flat_map(|v| v.to_le_bytes()));
        }
        for i in &indices {
            bin.extend(i.to_le_bytes());
        }
        fs::write(self.path(&bin_name), &bin).unwrap();

        let positions_len = positions.len() * 12;
        let normals_len = normals.len() * 12;
        let uvs_len = uvs.len() * 8;
        let indices_len = indices.len() * 4;

        let mut images: Vec<&str> = Vec::new();
        let mut material_json = Vec::new();
        for (i, texture) in materials.iter().copied().enumerate() {
            match texture {
                Some(uri) => {
                    let index = match images.iter().position(|image| *image == uri) {
                        Some(index) => index,
                        None => {
                            images.push(uri);
                            images.len() - 1
                        }
                    };
                    material_json.push(format!(
                        r#"{{"name":"material{i}","pbrMetallicRoughness":{{"baseColorTexture":{{"index":{index}}},"roughnessFactor":0.5}}}}"#
                    ));
                }
                None => material_json.push(format!(
                    r#"{{"name":"material{i}","pbrMetallicRoughness":{{"baseColorFactor":[1.0,0.5,0.25,1.0],"metallicFactor":0.0,"roughnessFactor":1.0}}}}"#
                )),
            }
        }

        let primitive = |material: Option<usize>| {
            let material = material.map_or_else(String::new, |m| format!(r#","material":{m}"#));
            format!(r#"{{"attributes":{{"POSITION":0,"NORMAL":1,"TEXCOORD_0":2}},"indices":3{material}}}"#)
        };
        let primitives: Vec<String> = if materials.is_empty() {
            vec![primitive(None)]
        } else {
            (0..materials.len()).map(|m| primitive(Some(m))).collect()
        };

        let mut extra = String::new();
        if !material_json.is_empty() {
            extra.push_str(&format!(r#","materials":[{}]"#, material_json.join(",")));
        }
        if !images.is_empty() {
            let textures: Vec<String> = (0..images.len())
                .map(|i| format!(r#"{{"source":{i}}}"#))
                .collect();
            let image_list: Vec<String> = images
                .iter()
                .map(|uri| format!(r#"{{"uri":"{}"}}"#, escape_uri(uri))).collect();
            extra.push_str(&format!(
                r#","textures":[{}],"images":[{}]"#,
                textures.join(","),
                image_list.join(",")
            ));
        }

        let json = format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{{"mesh": 0}}],
  "meshes": [{{"name": "cube", "primitives": [{primitives}]}}],
  "buffers": [{{"uri": "{bin_uri}", "byteLength": {total}}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": {positions_len}, "target": 34962}},
    {{"buffer": 0, "byteOffset": {normals_offset}, "byteLength": {normals_len}, "target": 34962}},
    {{"buffer": 0, "byteOffset": {uvs_offset}, "byteLength": {uvs_len}, "target": 34962}},
    {{"buffer": 0, "byteOffset": {indices_offset}, "byteLength": {indices_len}, "target": 34963}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": {vertices}, "type": "VEC3", "min": [-0.5, -0.5, -0.5], "max": [0.5, 0.5, 0.5]}},
    {{"bufferView": 1, "componentType": 5126, "count": {vertices}, "type": "VEC3"}},
    {{"bufferView": 2, "componentType": 5126, "count": {vertices}, "type": "VEC2"}},
    {{"bufferView": 3, "componentType": 5125, "count": {index_count}, "type": "SCALAR"}}
  ]{extra}
}}"#,
            primitives = primitives.join(","),
            bin_uri = escape_uri(&bin_name),
            total = bin.len(),
            normals_offset = positions_len,
            uvs_offset = positions_len + normals_len,
            indices_offset = positions_len + normals_len + uvs_len,
            vertices = positions.len(),
            index_count = indices.len(),
        );

        let path = self.path(file);
        fs::write(&path, json).unwrap();
        path
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

/// Spaces are the only character the fixtures need escaped in a URI.
fn escape_uri(name: &str) -> String {
    name.replace(' ', "%20")
}

type CubeGeometry = (Vec<[f32; 3]>, Vec<[f32; 3]>, Vec<[f32; 2]>, Vec<u32>);

/// 24 vertices, 36 indices, counter-clockwise seen from outside.
pub fn cube_geometry() -> CubeGeometry {
    // (normal, u axis, v axis) with u x v = normal.
    let sides: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let corners = [(-0.5, -0.5, 0.0, 0.0), (0.5, -0.5, 1.0, 0.0), (0.5, 0.5, 1.0, 1.0), (-0.5, 0.5, 0.0, 1.0)];

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();
    for (normal, u, v) in sides {
        let base = positions.len() as u32;
        for (a, b, s, t) in corners {
            positions.push([
                normal[0] * 0.5 + u[0] * a + v[0] * b,
                normal[1] * 0.5 + u[1] * a + v[1] * b,
                normal[2] * 0.5 + u[2] * a + v[2] * b,
            ]);
            normals.push(normal);
            uvs.push([s, t]);
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (positions, normals, uvs, indices)
}

pub fn recording_device() -> (Rc<RecordingDevice>, Gpu) {
    init_logging();
    let device = Rc::new(RecordingDevice::new());
    let gpu: Gpu = device.clone();
    (device, gpu)
}

pub fn read_f32s(bytes: &[u8], offset: usize, count: usize) -> Vec<f32> {
    bytes[offset..offset + count * 4]
        .chunks_exact(4)
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_ne_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}
