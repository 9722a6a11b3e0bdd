//! Corner ordering of finished faces and final assembly of the output mesh.

use std::collections::BTreeMap;

use crate::geom::{
    Attrib, AttribUse, AttribValue, Domain, Mesh, MeshBuilder, Tolerance, Uv, centroid, signed_area,
};

use super::clip::SegmentSource;
use super::error::{MeshRole, StuccoError};
use super::identity::IdentityTables;
use super::input::PreparedInput;
use super::map::Map;
use super::materialize::{AttribPlan, ScratchCorner, ScratchFace, weights_through_verts};

/// Orders a direct face by the map face's own corner order, then orients it.
///
/// Returns `None` when fewer than 3 distinct corners remain.
#[must_use]
pub fn order_direct(corners: Vec<ScratchCorner>, ccw: bool) -> Option<Vec<ScratchCorner>> {
    let mut order: Vec<usize> = (0..corners.len()).collect();
    for i in 1..order.len() {
        let mut j = i;
        while j > 0 && corners[order[j - 1]].map_order > corners[order[j]].map_order {
            order.swap(j - 1, j);
            j -= 1;
        }
    }
    orient(reorder(corners, &order), ccw)
}

/// Orders a merged outline by angle around its UV centroid, then orients it.
///
/// The walked order is kept when the angular order changes the outline's
/// area, which happens for outlines that are not star-shaped.
#[must_use]
pub fn order_merged(corners: Vec<ScratchCorner>, ccw: bool) -> Option<Vec<ScratchCorner>> {
    let uvs: Vec<Uv> = corners.iter().map(|c| c.uv).collect();
    let center = centroid(&uvs);
    let polar: Vec<(f64, f64)> = uvs
        .iter()
        .map(|&p| {
            let d = p - center;
            (d.v.atan2(d.u), d.length_squared())
        })
        .collect();
    let mut order: Vec<usize> = (0..corners.len()).collect();
    for i in 1..order.len() {
        let mut j = i;
        while j > 0 && polar_less(polar[order[j]], polar[order[j - 1]]) {
            order.swap(j - 1, j);
            j -= 1;
        }
    }

    let sorted: Vec<Uv> = order.iter().map(|&i| uvs[i]).collect();
    let walked_area = signed_area(&uvs).abs();
    let sorted_area = signed_area(&sorted).abs();
    let agrees = (walked_area - sorted_area).abs() <= Tolerance::LOOSE.eps * walked_area.max(1.0);
    let corners = if agrees { reorder(corners, &order) } else { corners };
    orient(corners, ccw)
}

fn polar_less(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)).is_lt()
}

/// Drops repeated corners, winds the face as requested and rotates it to
/// start at its smallest vertex key.
fn orient(corners: Vec<ScratchCorner>, ccw: bool) -> Option<Vec<ScratchCorner>> {
    let mut corners = dedup_keys(corners);
    if corners.len() < 3 {
        return None;
    }
    let uvs: Vec<Uv> = corners.iter().map(|c| c.uv).collect();
    if (signed_area(&uvs) > 0.0) != ccw {
        let reversed: Vec<usize> = (0..corners.len()).rev().collect();
        corners = reorder(corners, &reversed);
    }
    let start = (0..corners.len())
        .min_by(|&a, &b| corners[a].key.cmp(&corners[b].key))
        .unwrap_or(0);
    corners.rotate_left(start);
    Some(corners)
}

/// Permutes a corner cycle, keeping each corner's segment on the edge to its new successor.
fn reorder(corners: Vec<ScratchCorner>, order: &[usize]) -> Vec<ScratchCorner> {
    let n = corners.len();
    let segs: Vec<SegmentSource> = corners.iter().map(|c| c.seg).collect();
    let mut slots: Vec<Option<ScratchCorner>> = corners.into_iter().map(Some).collect();
    order
        .iter()
        .enumerate()
        .filter_map(|(j, &i)| {
            let next = order[(j + 1) % n];
            let mut corner = slots[i].take()?;
            corner.seg = if next == (i + 1) % n {
                segs[i]
            } else if i == (next + 1) % n {
                segs[next]
            } else {
                SegmentSource::default()
            };
            Some(corner)
        })
        .collect()
}

fn dedup_keys(corners: Vec<ScratchCorner>) -> Vec<ScratchCorner> {
    let mut out: Vec<ScratchCorner> = Vec::with_capacity(corners.len());
    for corner in corners {
        if let Some(last) = out.last_mut() {
            if last.key == corner.key {
                last.seg = corner.seg;
                continue;
            }
        }
        out.push(corner);
    }
    while out.len() > 1 && out.first().map(|c| c.key) == out.last().map(|c| c.key) {
        out.pop();
    }
    out
}

/// The output mesh and what assembly discarded.
#[derive(Debug)]
pub struct Assembled {
    pub mesh: Mesh,
    pub dropped_faces: usize,
}

/// Builds the output mesh from every finished face.
///
/// Faces are sorted by their order key, vertices are welded by key (a vertex
/// takes its data from its first corner in that order), edges are derived
/// and every planned attribute is written.
#[allow(clippy::cast_possible_truncation)]
pub fn assemble_output(
    mut faces: Vec<ScratchFace>,
    plan: &AttribPlan<'_>,
    map: &Map,
    input: &PreparedInput<'_>,
    tolerance: Tolerance,
) -> Result<Assembled, StuccoError> {
    faces.sort_by_key(|f| f.order);

    let mut tables = IdentityTables::new(tolerance);
    let mut vert_sources: Vec<(usize, usize)> = Vec::new();
    let mut loops: Vec<Vec<u32>> = Vec::with_capacity(faces.len());
    for (fi, face) in faces.iter().enumerate() {
        let mut verts: Vec<u32> = Vec::with_capacity(face.corners.len());
        for (ci, corner) in face.corners.iter().enumerate() {
            let (vert, created) = tables.get_or_insert(corner.key, corner.uv);
            if created {
                vert_sources.push((fi, ci));
            }
            verts.push(vert);
        }
        loops.push(verts);
    }

    let mut builder = MeshBuilder::new(vert_sources.len());
    let mut kept: Vec<usize> = Vec::with_capacity(faces.len());
    let mut dropped_faces = 0;
    for (fi, verts) in loops.iter().enumerate() {
        if verts.len() < 3 {
            dropped_faces += 1;
            continue;
        }
        builder
            .add_face(verts)
            .map_err(StuccoError::invalid_mesh(MeshRole::Output))?;
        kept.push(fi);
    }
    let mut mesh = builder
        .build()
        .map_err(StuccoError::invalid_mesh(MeshRole::Output))?;

    let source = |(fi, ci): (usize, usize)| &faces[fi].corners[ci];
    let out_corners: Vec<(usize, usize)> = kept
        .iter()
        .flat_map(|&fi| (0..faces[fi].corners.len()).map(move |ci| (fi, ci)))
        .collect();

    let positions = vert_sources
        .iter()
        .flat_map(|&s| source(s).position.to_array())
        .collect();
    mesh.attribs_mut(Domain::Vert)
        .insert(Attrib::float("position", AttribUse::Position, 3, positions));
    let normals = out_corners
        .iter()
        .flat_map(|&s| source(s).normal.to_array())
        .collect();
    mesh.attribs_mut(Domain::Corner)
        .insert(Attrib::float("normal", AttribUse::Normal, 3, normals));

    let map_verts = &map.mesh().corner_verts;
    let input_verts = &input.mesh.corner_verts;
    let mut first_edge_corner: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for (oc, &s) in out_corners.iter().enumerate() {
        first_edge_corner.entry(mesh.corner_edges[oc]).or_insert(s);
    }

    for planned in &plan.attribs {
        let Some(mut attrib) = planned.template() else {
            continue;
        };
        match planned.domain {
            Domain::Mesh => attrib.push(&planned.sample(&[(0, 1.0)], &[(0, 1.0)])),
            Domain::Face => {
                for &fi in &kept {
                    let face = &faces[fi];
                    attrib.push(&planned.sample(&[(face.map_face, 1.0)], &[(face.input_face, 1.0)]));
                }
            }
            Domain::Corner => {
                for &s in &out_corners {
                    let corner = source(s);
                    attrib.push(&planned.sample(&corner.map_w, &corner.in_w));
                }
            }
            Domain::Vert => {
                for &s in &vert_sources {
                    let corner = source(s);
                    let map_w = weights_through_verts(&corner.map_w, map_verts);
                    let in_w = weights_through_verts(&corner.in_w, input_verts);
                    attrib.push(&planned.sample(&map_w, &in_w));
                }
            }
            Domain::Edge => {
                for edge in 0..mesh.edge_count() as u32 {
                    let value = match first_edge_corner.get(&edge) {
                        Some(&s) => {
                            let seg = source(s).seg;
                            let map_w: Vec<(u32, f64)> = seg.map_edge.map(|e| (e, 1.0)).into_iter().collect();
                            let in_w: Vec<(u32, f64)> = seg.input_edge_id().map(|e| (e, 1.0)).into_iter().collect();
                            planned.sample(&map_w, &in_w)
                        }
                        None => AttribValue::zeroed(attrib.comps()),
                    };
                    attrib.push(&value);
                }
            }
        }
        mesh.attribs_mut(planned.domain).insert(attrib);
    }

    mesh.validate().map_err(StuccoError::invalid_mesh(MeshRole::Output))?;
    log::debug!(
        "assembled {} faces, {} verts, {} edges ({} dropped)",
        mesh.face_count(),
        mesh.vert_count,
        mesh.edge_count(),
        dropped_faces
    );
    Ok(Assembled { mesh, dropped_faces })
}
