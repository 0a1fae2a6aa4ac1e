//! Asset import.
//!
//! [`SceneImporter`] is the seam between mesh construction and whatever
//! parses model files. [`GltfImporter`] reads glTF 2.0 (`.gltf` with external
//! or embedded-GLB buffers) and flattens every primitive of every mesh into
//! an [`ImportedMesh`]. The post-processing steps requested through
//! [`ImportFlags`] run here, so mesh construction only ever sees the final
//! vertex channels.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cgmath::{InnerSpace, Vector2, Vector3};
use gltf::{buffer::Source, mesh::Mode, Gltf};
use log::{debug, warn};
use smallvec::smallvec;

use crate::data::{Face, ImportedMaterial, ImportedMesh, ImportedScene};
use crate::errors::ImportError;
use crate::textures::TextureType;

/// Post-processing applied while importing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFlags {
    /// Turn strips and fans into separate triangles.
    pub triangulate: bool,
    /// Generate area-weighted vertex normals for meshes that carry none.
    pub generate_smooth_normals: bool,
    /// Derive tangents and bitangents from the UVs when the file has none.
    pub calc_tangent_space: bool,
    /// Flip texture coordinates vertically (`v = 1 - v`).
    pub flip_uvs: bool,
}

impl Default for ImportFlags {
    fn default() -> Self {
        Self {
            triangulate: true,
            generate_smooth_normals: true,
            calc_tangent_space: true,
            flip_uvs: true,
        }
    }
}

pub trait SceneImporter {
    fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, ImportError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, ImportError> {
        let gltf = Gltf::open(path).map_err(|source| ImportError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let buffers = load_buffers(path, &gltf)?;

        let mut scene = ImportedScene {
            meshes: Vec::new(),
            materials: gltf.materials().map(|m| convert_material(path, &m)).collect(),
        };
        let mut default_material = None;

        for mesh in gltf.meshes() {
            for primitive in mesh.primitives() {
                let entry = scene.meshes.len();
                let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

                let positions: Vec<[f32; 3]> = reader
                    .read_positions()
                    .ok_or_else(|| ImportError::MissingPositions {
                        path: path.to_path_buf(),
                        mesh: entry,
                    })?
                    .collect();

                let mut normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
                let mut uvs: Option<Vec<[f32; 2]>> =
                    reader.read_tex_coords(0).map(|uvs| uvs.into_f32().collect());

                let (mut tangents, mut bitangents) = match (reader.read_tangents(), &normals) {
                    (Some(tangents), Some(normals)) => {
                        let (t, b) = split_tangents(normals, tangents.collect());
                        (Some(t), Some(b))
                    }
                    _ => (None, None),
                };

                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };
                let faces = build_faces(primitive.mode(), &indices, flags.triangulate);

                if flags.flip_uvs {
                    if let Some(uvs) = uvs.as_mut() {
                        flip_uvs(uvs);
                    }
                }

                if flags.generate_smooth_normals && normals.is_none() {
                    normals = Some(generate_smooth_normals(&positions, &faces));
                }

                if flags.calc_tangent_space && tangents.is_none() {
                    if let Some(uvs) = &uvs {
                        let (t, b) = compute_tangent_space(&positions, uvs, normals.as_deref(), &faces);
                        tangents = Some(t);
                        bitangents = Some(b);
                    }
                }

                let material_index = match primitive.material().index() {
                    Some(index) => index,
                    None => *default_material.get_or_insert_with(|| {
                        scene.materials.push(ImportedMaterial::default());
                        scene.materials.len() - 1
                    }),
                };

                debug!(
                    "GltfImporter: '{}' primitive {} -> {} vertices, {} faces",
                    mesh.name().unwrap_or("unnamed"),
                    primitive.index(),
                    positions.len(),
                    faces.len()
                );

                scene.meshes.push(ImportedMesh {
                    name: mesh
                        .name()
                        .map_or_else(|| format!("mesh{}", mesh.index()), str::to_string),
                    positions,
                    normals,
                    uvs,
                    tangents,
                    bitangents,
                    faces,
                    material_index,
                });
            }
        }

        Ok(scene)
    }
}

fn load_buffers(path: &Path, gltf: &Gltf) -> Result<Vec<Vec<u8>>, ImportError> {
    let mut raw_buffers = Vec::new();

    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            Source::Uri(uri) if uri.starts_with("data:") => {
                return Err(ImportError::MissingBuffer {
                    path: path.to_path_buf(),
                    reason: format!("buffer {} uses an embedded data URI", buffer.index()),
                });
            }
            Source::Uri(uri) => {
                let buffer_path = resolve_texture_path(path, &decode_uri(uri));
                std::fs::read(&buffer_path).map_err(|source| ImportError::Io {
                    path: buffer_path,
                    source,
                })?
            }
            Source::Bin => gltf.blob.clone().ok_or_else(|| ImportError::MissingBuffer {
                path: path.to_path_buf(),
                reason: "GLB binary chunk missing".to_string(),
            })?,
        };

        if data.len() < buffer.length() {
            return Err(ImportError::MissingBuffer {
                path: path.to_path_buf(),
                reason: format!(
                    "buffer {} holds {} bytes, {} declared",
                    buffer.index(),
                    data.len(),
                    buffer.length()
                ),
            });
        }
        raw_buffers.push(data);
    }

    Ok(raw_buffers)
}

/// Maps a metallic-roughness material onto the ambient/diffuse/specular model.
fn convert_material(path: &Path, material: &gltf::Material) -> ImportedMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    let roughness = pbr.roughness_factor().clamp(0.0, 1.0);
    let specular = 1.0 - roughness;

    let mut textures: BTreeMap<TextureType, Vec<String>> = BTreeMap::new();
    let mut add = |texture_type: TextureType, texture: gltf::Texture| {
        match texture.source().source() {
            gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
                textures.entry(texture_type).or_default().push(decode_uri(uri).into_owned());
            }
            _ => warn!(
                "GltfImporter: {}: embedded image for {:?} of '{}' is not supported",
                path.display(),
                texture_type,
                material.name().unwrap_or("unnamed")
            ),
        }
    };

    if let Some(info) = pbr.base_color_texture() {
        add(TextureType::Diffuse, info.texture());
    }
    if let Some(normal) = material.normal_texture() {
        add(TextureType::Normals, normal.texture());
    }
    if let Some(info) = material.emissive_texture() {
        add(TextureType::Emissive, info.texture());
    }
    if let Some(occlusion) = material.occlusion_texture() {
        add(TextureType::Lightmap, occlusion.texture());
    }

    ImportedMaterial {
        name: material
            .name()
            .map_or_else(|| format!("material{}", material.index().unwrap_or(0)), str::to_string),
        textures,
        ambient: [0.0; 3],
        diffuse: [r, g, b],
        specular: [specular; 3],
        shininess: shininess_from_roughness(roughness),
    }
}

/// Blinn-Phong exponent matching a GGX roughness.
pub fn shininess_from_roughness(roughness: f32) -> f32 {
    let alpha = roughness * roughness;
    if alpha <= f32::EPSILON {
        return 1024.0;
    }
    (2.0 / (alpha * alpha) - 2.0).clamp(1.0, 1024.0)
}

/// Splits glTF `vec4` tangents into tangent and bitangent channels.
fn split_tangents(normals: &[[f32; 3]], tangents: Vec<[f32; 4]>) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    tangents
        .iter()
        .zip(normals)
        .map(|([x, y, z, w], n)| {
            let t = Vector3::new(*x, *y, *z);
            let b: [f32; 3] = (Vector3::from(*n).cross(t) * *w).into();
            let t: [f32; 3] = t.into();
            (t, b)
        })
        .unzip()
}

fn build_faces(mode: Mode, indices: &[u32], triangulate: bool) -> Vec<Face> {
    match mode {
        Mode::Triangles => indices.chunks(3).map(Face::from_slice).collect(),
        Mode::TriangleStrip if triangulate => triangulate_strip(indices),
        Mode::TriangleFan if triangulate => triangulate_fan(indices),
        Mode::TriangleStrip | Mode::TriangleFan => vec![Face::from_slice(indices)],
        Mode::Points => indices.iter().map(|&i| smallvec![i]).collect(),
        Mode::Lines => indices.chunks(2).map(Face::from_slice).collect(),
        Mode::LineStrip => indices.windows(2).map(Face::from_slice).collect(),
        Mode::LineLoop => {
            let mut faces: Vec<Face> = indices.windows(2).map(Face::from_slice).collect();
            if let (Some(&first), Some(&last)) = (indices.first(), indices.last()) {
                if indices.len() > 2 {
                    faces.push(smallvec![last, first]);
                }
            }
            faces
        }
    }
}

/// Alternates the winding of every other triangle so all face the same way.
pub fn triangulate_strip(indices: &[u32]) -> Vec<Face> {
    indices
        .windows(3)
        .enumerate()
        .map(|(i, w)| {
            if i % 2 == 0 {
                smallvec![w[0], w[1], w[2]]
            } else {
                smallvec![w[1], w[0], w[2]]
            }
        })
        .collect()
}

pub fn triangulate_fan(indices: &[u32]) -> Vec<Face> {
    match indices.split_first() {
        Some((&center, rest)) => rest.windows(2).map(|w| smallvec![center, w[0], w[1]]).collect(),
        None => Vec::new(),
    }
}

pub fn flip_uvs(uvs: &mut [[f32; 2]]) {
    for uv in uvs {
        uv[1] = 1.0 - uv[1];
    }
}

/// Area-weighted average of the normals of the triangles touching each vertex.
pub fn generate_smooth_normals(positions: &[[f32; 3]], faces: &[Face]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];

    for face in faces.iter().filter(|f| f.len() == 3) {
        let Some([a, b, c]) = triangle(face, positions.len()) else {
            continue;
        };
        let p0 = Vector3::from(positions[a]);
        let face_normal = (Vector3::from(positions[b]) - p0).cross(Vector3::from(positions[c]) - p0);
        for i in [a, b, c] {
            normals[i] += face_normal;
        }
    }

    normals
        .into_iter()
        .map(|n| if n.magnitude2() > 0.0 { n.normalize().into() } else { [0.0; 3] })
        .collect()
}

/// Per-vertex tangent and bitangent from the UV gradient of each triangle.
///
/// Tangents are made orthogonal to the normal where one is known. Vertices
/// that only touch degenerate UV triangles end up with zero vectors.
pub fn compute_tangent_space(
    positions: &[[f32; 3]],
    uvs: &[[f32; 2]],
    normals: Option<&[[f32; 3]]>,
    faces: &[Face],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let zero = Vector3::new(0.0f32, 0.0, 0.0);
    let mut tangents = vec![zero; positions.len()];
    let mut bitangents = vec![zero; positions.len()];
    let vertex_count = positions.len().min(uvs.len());

    for face in faces {
        let Some([a, b, c]) = triangle(face, vertex_count) else {
            continue;
        };

        let p0 = Vector3::from(positions[a]);
        let e1 = Vector3::from(positions[b]) - p0;
        let e2 = Vector3::from(positions[c]) - p0;

        let uv0 = Vector2::from(uvs[a]);
        let d1 = Vector2::from(uvs[b]) - uv0;
        let d2 = Vector2::from(uvs[c]) - uv0;

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let t = (e1 * d2.y - e2 * d1.y) * r;
        let bt = (e2 * d1.x - e1 * d2.x) * r;

        for i in [a, b, c] {
            tangents[i] += t;
            bitangents[i] += bt;
        }
    }

    let normalize = |v: Vector3<f32>| if v.magnitude2() > 0.0 { v.normalize() } else { zero };

    let tangents = tangents
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let t = match normals.and_then(|n| n.get(i)) {
                Some(&n) => {
                    let n = Vector3::from(n);
                    t - n * n.dot(t)
                }
                None => t,
            };
            normalize(t).into()
        })
        .collect();
    let bitangents = bitangents.into_iter().map(|b| normalize(b).into()).collect();

    (tangents, bitangents)
}

fn triangle(face: &Face, vertex_count: usize) -> Option<[usize; 3]> {
    match face.as_slice() {
        &[a, b, c] => {
            let tri = [a as usize, b as usize, c as usize];
            tri.iter().all(|&i| i < vertex_count).then_some(tri)
        }
        _ => None,
    }
}

/// Undoes percent-encoding in a relative glTF URI. Invalid UTF-8 after
/// decoding keeps the URI as written.
fn decode_uri(uri: &str) -> Cow<'_, str> {
    urlencoding::decode(uri).unwrap_or(Cow::Borrowed(uri))
}

/// Resolves a texture name from a model file against the model's directory.
///
/// Both `/` and `\` count as separators, in the model path and in the
/// texture name.
pub fn resolve_texture_path(model_path: &Path, texture: &str) -> PathBuf {
    let model = model_path.to_string_lossy();
    let directory = match model.rfind(|c| c == '/' || c == '\\') {
        Some(split) => &model[..split],
        None => "",
    };

    let texture = texture.replace('\\', "/");
    if directory.is_empty() {
        PathBuf::from(texture)
    } else {
        Path::new(directory).join(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faces(faces: &[Face]) -> Vec<Vec<u32>> {
        faces.iter().map(|f| f.to_vec()).collect()
    }

    #[test]
    fn strips_keep_a_consistent_winding() {
        let strip = triangulate_strip(&[0, 1, 2, 3, 4]);
        assert_eq!(faces(&strip), vec![vec![0, 1, 2], vec![2, 1, 3], vec![2, 3, 4]]);
    }

    #[test]
    fn fans_share_the_first_vertex() {
        let fan = triangulate_fan(&[0, 1, 2, 3]);
        assert_eq!(faces(&fan), vec![vec![0, 1, 2], vec![0, 2, 3]]);
        assert!(triangulate_fan(&[]).is_empty());
    }

    #[test]
    fn untriangulated_strip_stays_one_polygon() {
        let polygon = build_faces(Mode::TriangleStrip, &[0, 1, 2, 3], false);
        assert_eq!(faces(&polygon), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn line_loops_close_themselves() {
        let lines = build_faces(Mode::LineLoop, &[0, 1, 2], true);
        assert_eq!(faces(&lines), vec![vec![0, 1], vec![1, 2], vec![2, 0]]);
    }

    #[test]
    fn texture_paths_resolve_against_the_model_directory() {
        assert_eq!(
            resolve_texture_path(Path::new("assets/models/cube.gltf"), "cube.png"),
            PathBuf::from("assets/models/cube.png")
        );
        assert_eq!(
            resolve_texture_path(Path::new("assets\\models\\cube.gltf"), "tex\\cube.png"),
            Path::new("assets\\models").join("tex/cube.png")
        );
        assert_eq!(
            resolve_texture_path(Path::new("cube.gltf"), "cube.png"),
            PathBuf::from("cube.png")
        );
    }

    #[test]
    fn tangent_handedness_flips_the_bitangent() {
        let normals = [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0]];
        let (tangents, bitangents) = split_tangents(&normals, vec![[1.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, -1.0]]);
        assert_eq!(tangents, vec![[1.0, 0.0, 0.0]; 2]);
        assert_eq!(bitangents, vec![[0.0, 1.0, 0.0], [0.0, -1.0, 0.0]]);
    }

    #[test]
    fn escaped_uris_are_decoded() {
        assert_eq!(decode_uri("my%20cube.bin"), "my cube.bin");
        assert_eq!(decode_uri("plain.png"), "plain.png");
        assert_eq!(decode_uri("bad%FF.png"), "bad%FF.png");
    }

    #[test]
    fn smooth_normals_of_a_flat_quad_point_up() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, -1.0], [0.0, 0.0, -1.0]];
        let quad: Vec<Face> = vec![smallvec![0, 1, 2], smallvec![0, 2, 3]];

        for normal in generate_smooth_normals(&positions, &quad) {
            assert_eq!(normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn tangents_follow_the_uv_axes() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let normals = [[0.0, 0.0, 1.0]; 3];
        let tri: Vec<Face> = vec![smallvec![0, 1, 2]];

        let (tangents, bitangents) = compute_tangent_space(&positions, &uvs, Some(&normals), &tri);
        assert!(tangents.iter().all(|t| *t == [1.0, 0.0, 0.0]));
        assert!(bitangents.iter().all(|b| *b == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn degenerate_uvs_leave_zero_tangents() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let uvs = [[0.5, 0.5]; 3];
        let tri: Vec<Face> = vec![smallvec![0, 1, 2]];

        let (tangents, _) = compute_tangent_space(&positions, &uvs, None, &tri);
        assert!(tangents.iter().all(|t| *t == [0.0; 3]));
    }

    #[test]
    fn rough_materials_are_dull() {
        assert_eq!(shininess_from_roughness(1.0), 1.0);
        assert_eq!(shininess_from_roughness(0.0), 1024.0);
        let mid = shininess_from_roughness(0.5);
        assert!(mid > 1.0 && mid < 1024.0);
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = GltfImporter
            .import(Path::new("does/not/exist.gltf"), ImportFlags::default())
            .unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
        assert!(err.to_string().contains("does/not/exist.gltf"));
    }
}
