//! Procedural fixture meshes: input surfaces with UVs and tileable maps.
//!
//! Map meshes store `(u, v, w)` in their vertex `Position` attribute.

use std::f64::consts::TAU;

use super::attrib::{Attrib, AttribUse, Domain};
use super::core::Point3;
use super::mesh::{Mesh, MeshBuilder, MeshError};

/// Flat `nx` by `ny` quad grid on `z = 0`, spanning `size` in x and y.
///
/// Corner UVs run from 0 to `uv_scale` along both axes.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn grid_plane(nx: usize, ny: usize, size: f64, uv_scale: f64) -> Result<Mesh, MeshError> {
    let (nx, ny) = (nx.max(1), ny.max(1));
    let mut positions = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            positions.push(Point3::new(size * i as f64 / nx as f64, size * j as f64 / ny as f64, 0.0));
        }
    }
    let index = |i: usize, j: usize| (j * (nx + 1) + i) as u32;

    let mut builder = MeshBuilder::with_positions(&positions);
    let mut uvs = Vec::with_capacity(nx * ny * 8);
    for j in 0..ny {
        for i in 0..nx {
            let quad = [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)];
            builder.add_face(&quad.map(|(a, b)| index(a, b)))?;
            for (a, b) in quad {
                uvs.push(uv_scale * a as f64 / nx as f64);
                uvs.push(uv_scale * b as f64 / ny as f64);
            }
        }
    }
    builder.set_attrib(Domain::Corner, Attrib::float("uv", AttribUse::Uv, 2, uvs));
    builder.build()
}

/// Open cylinder around the z axis with a UV seam at angle 0.
///
/// Vertices on the seam are shared, while the corners on either side carry
/// `u = 0` and `u = 1`, so the seam edges are cut edges.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn uv_cylinder(segments: usize, rings: usize, radius: f64, height: f64) -> Result<Mesh, MeshError> {
    let (segments, rings) = (segments.max(3), rings.max(1));
    let mut positions = Vec::with_capacity(segments * (rings + 1));
    for r in 0..=rings {
        let z = height * r as f64 / rings as f64;
        for s in 0..segments {
            let angle = TAU * s as f64 / segments as f64;
            positions.push(Point3::new(radius * angle.cos(), radius * angle.sin(), z));
        }
    }
    let index = |s: usize, r: usize| (r * segments + s % segments) as u32;

    let mut builder = MeshBuilder::with_positions(&positions);
    let mut uvs = Vec::new();
    for r in 0..rings {
        for s in 0..segments {
            let quad = [(s, r), (s + 1, r), (s + 1, r + 1), (s, r + 1)];
            builder.add_face(&quad.map(|(a, b)| index(a, b)))?;
            for (a, b) in quad {
                uvs.push(a as f64 / segments as f64);
                uvs.push(b as f64 / rings as f64);
            }
        }
    }
    builder.set_attrib(Domain::Corner, Attrib::float("uv", AttribUse::Uv, 2, uvs));
    builder.build()
}

/// Builds a map from `(u, v, w)` vertices and face loops.
pub fn map_mesh(verts: &[[f64; 3]], faces: &[Vec<u32>]) -> Result<Mesh, MeshError> {
    let positions: Vec<Point3> = verts.iter().copied().map(Point3::from).collect();
    Mesh::from_polygons(&positions, faces)
}

/// A single face covering the unit tile at height `w`.
pub fn square_map(w: f64) -> Result<Mesh, MeshError> {
    map_mesh(
        &[[0.0, 0.0, w], [1.0, 0.0, w], [1.0, 1.0, w], [0.0, 1.0, w]],
        &[vec![0, 1, 2, 3]],
    )
}

/// An `n` by `n` grid of quads covering the unit tile at height `w`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn grid_map(n: usize, w: f64) -> Result<Mesh, MeshError> {
    let n = n.max(1);
    let mut verts = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            verts.push([i as f64 / n as f64, j as f64 / n as f64, w]);
        }
    }
    let index = |i: usize, j: usize| (j * (n + 1) + i) as u32;
    let faces: Vec<Vec<u32>> = (0..n)
        .flat_map(|j| (0..n).map(move |i| (i, j)))
        .map(|(i, j)| vec![index(i, j), index(i + 1, j), index(i + 1, j + 1), index(i, j + 1)])
        .collect();
    map_mesh(&verts, &faces)
}

/// A raised panel: an inner square at height `w` inset by `inset` from the
/// tile border, framed by four sloped quads down to height 0.
pub fn panel_map(inset: f64, w: f64) -> Result<Mesh, MeshError> {
    let (a, b) = (inset, 1.0 - inset);
    map_mesh(
        &[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [a, a, w],
            [b, a, w],
            [b, b, w],
            [a, b, w],
        ],
        &[
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![1, 2, 6, 5],
            vec![2, 3, 7, 6],
            vec![3, 0, 4, 7],
        ],
    )
}

/// Two rows of bricks at height `w`. The second row is offset by a quarter
/// tile, so one of its bricks reaches past the tile border and wraps.
pub fn brick_map(w: f64) -> Result<Mesh, MeshError> {
    map_mesh(
        &[
            // row 0
            [0.0, 0.0, w],
            [0.5, 0.0, w],
            [1.0, 0.0, w],
            [1.0, 0.5, w],
            [0.5, 0.5, w],
            [0.0, 0.5, w],
            // row 1
            [0.25, 0.5, w],
            [0.75, 0.5, w],
            [1.25, 0.5, w],
            [1.25, 1.0, w],
            [0.75, 1.0, w],
            [0.25, 1.0, w],
        ],
        &[
            vec![0, 1, 4, 5],
            vec![1, 2, 3, 4],
            vec![6, 7, 10, 11],
            vec![7, 8, 9, 10],
        ],
    )
}
