//! Procedural meshes that ship with the renderer.
//!
//! Every shape is centered on the origin, wound counter-clockwise seen from
//! outside and carries normals, UVs and tangents, so it goes through the same
//! entry construction as an imported model.

use std::f32::consts::{PI, TAU};

use smallvec::smallvec;

use crate::data::{Face, ImportedMaterial, ImportedMesh, ImportedScene};
use crate::loader::compute_tangent_space;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoredMesh {
    Cube,
    Sphere,
    Cylinder,
    Torus,
}

const SPHERE_STACKS: u32 = 24;
const SPHERE_SLICES: u32 = 32;
const CYLINDER_SLICES: u32 = 32;
const TORUS_RINGS: u32 = 32;
const TORUS_SIDES: u32 = 16;
const TORUS_MAJOR_RADIUS: f32 = 1.0;
const TORUS_MINOR_RADIUS: f32 = 0.25;

impl StoredMesh {
    pub const ALL: [StoredMesh; 4] = [
        StoredMesh::Cube,
        StoredMesh::Sphere,
        StoredMesh::Cylinder,
        StoredMesh::Torus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StoredMesh::Cube => "cube",
            StoredMesh::Sphere => "sphere",
            StoredMesh::Cylinder => "cylinder",
            StoredMesh::Torus => "torus",
        }
    }

    pub fn geometry(self) -> ImportedMesh {
        let mut mesh = match self {
            StoredMesh::Cube => cube(),
            StoredMesh::Sphere => sphere(SPHERE_STACKS, SPHERE_SLICES),
            StoredMesh::Cylinder => cylinder(CYLINDER_SLICES),
            StoredMesh::Torus => torus(TORUS_RINGS, TORUS_SIDES),
        };
        mesh.name = self.name().to_string();

        if let Some(uvs) = &mesh.uvs {
            let (tangents, bitangents) =
                compute_tangent_space(&mesh.positions, uvs, mesh.normals.as_deref(), &mesh.faces);
            mesh.tangents = Some(tangents);
            mesh.bitangents = Some(bitangents);
        }
        mesh
    }

    /// The shape as a one-mesh scene with a default material.
    pub fn scene(self) -> ImportedScene {
        ImportedScene {
            meshes: vec![self.geometry()],
            materials: vec![ImportedMaterial {
                name: self.name().to_string(),
                ..ImportedMaterial::default()
            }],
        }
    }
}

#[derive(Default)]
struct Builder {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    faces: Vec<Face>,
}

impl Builder {
    fn vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        (self.positions.len() - 1) as u32
    }

    /// Triangulates a `(rows + 1) x (columns + 1)` vertex grid starting at
    /// `base`, laid out row by row.
    fn grid(&mut self, base: u32, rows: u32, columns: u32) {
        let stride = columns + 1;
        for row in 0..rows {
            for column in 0..columns {
                let a = base + row * stride + column;
                let b = a + stride;
                self.faces.push(smallvec![a, b, a + 1]);
                self.faces.push(smallvec![a + 1, b, b + 1]);
            }
        }
    }

    fn build(self) -> ImportedMesh {
        ImportedMesh {
            positions: self.positions,
            normals: Some(self.normals),
            uvs: Some(self.uvs),
            faces: self.faces,
            ..ImportedMesh::default()
        }
    }
}

/// Unit cube, four vertices per side so every side has its own normal.
fn cube() -> ImportedMesh {
    // normal, u axis, v axis; u x v == normal
    const SIDES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut builder = Builder::default();
    for (n, u, v) in SIDES {
        let corner = |su: f32, sv: f32| {
            [0, 1, 2].map(|k| 0.5 * (n[k] + su * u[k] + sv * v[k]))
        };
        let base = builder.vertex(corner(-1.0, -1.0), n, [0.0, 0.0]);
        builder.vertex(corner(1.0, -1.0), n, [1.0, 0.0]);
        builder.vertex(corner(1.0, 1.0), n, [1.0, 1.0]);
        builder.vertex(corner(-1.0, 1.0), n, [0.0, 1.0]);
        builder.faces.push(smallvec![base, base + 1, base + 2]);
        builder.faces.push(smallvec![base, base + 2, base + 3]);
    }
    builder.build()
}

/// Unit radius UV sphere.
fn sphere(stacks: u32, slices: u32) -> ImportedMesh {
    let mut builder = Builder::default();
    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let p = [phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos()];
            builder.vertex(
                p,
                p,
                [slice as f32 / slices as f32, 1.0 - stack as f32 / stacks as f32],
            );
        }
    }
    builder.grid(0, stacks, slices);
    builder.build()
}

/// Unit radius cylinder from y = -1 to y = 1, capped at both ends.
fn cylinder(slices: u32) -> ImportedMesh {
    let mut builder = Builder::default();
    let angle = |slice: u32| TAU * slice as f32 / slices as f32;

    for (row, y) in [1.0f32, -1.0].into_iter().enumerate() {
        for slice in 0..=slices {
            let (s, c) = angle(slice).sin_cos();
            builder.vertex([s, y, c], [s, 0.0, c], [slice as f32 / slices as f32, 1.0 - row as f32]);
        }
    }
    builder.grid(0, 1, slices);

    for y in [1.0f32, -1.0] {
        let normal = [0.0, y, 0.0];
        let center = builder.vertex([0.0, y, 0.0], normal, [0.5, 0.5]);
        for slice in 0..=slices {
            let (s, c) = angle(slice).sin_cos();
            builder.vertex([s, y, c], normal, [0.5 + 0.5 * s, 0.5 + 0.5 * c]);
        }
        for slice in 0..slices {
            let ring = center + 1 + slice;
            if y > 0.0 {
                builder.faces.push(smallvec![center, ring, ring + 1]);
            } else {
                builder.faces.push(smallvec![center, ring + 1, ring]);
            }
        }
    }
    builder.build()
}

/// Torus around the y axis.
fn torus(rings: u32, sides: u32) -> ImportedMesh {
    let mut builder = Builder::default();
    for ring in 0..=rings {
        let u = TAU * ring as f32 / rings as f32;
        for side in 0..=sides {
            let v = TAU * side as f32 / sides as f32;
            let normal = [v.cos() * u.sin(), v.sin(), v.cos() * u.cos()];
            let radius = TORUS_MAJOR_RADIUS + TORUS_MINOR_RADIUS * v.cos();
            builder.vertex(
                [radius * u.sin(), TORUS_MINOR_RADIUS * v.sin(), radius * u.cos()],
                normal,
                [ring as f32 / rings as f32, side as f32 / sides as f32],
            );
        }
    }
    builder.grid(0, rings, sides);
    builder.build()
}
