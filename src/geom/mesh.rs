use std::collections::HashMap;
use std::ops::Range;

use smallvec::SmallVec;

use super::attrib::{Attrib, AttribSet, AttribUse, AttribValue, Domain};
use super::core::{Point3, Tolerance, Uv, Vec3};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("face offsets must start at 0, be non-decreasing and end at the corner count")]
    FaceOffsets,
    #[error("face {face} has {corners} corners, at least 3 are required")]
    FaceTooSmall { face: usize, corners: usize },
    #[error("corner {corner} references vertex {vert}, but the mesh has {vert_count} vertices")]
    CornerVertOutOfRange { corner: usize, vert: u32, vert_count: usize },
    #[error("corner {corner} references edge {edge}, but the mesh has {edge_count} edges")]
    CornerEdgeOutOfRange { corner: usize, edge: u32, edge_count: usize },
    #[error("corner {corner} uses edge {edge}, which does not connect the corner to its successor")]
    CornerEdgeMismatch { corner: usize, edge: u32 },
    #[error("edge {edge} references vertex {vert}, but the mesh has {vert_count} vertices")]
    EdgeVertOutOfRange { edge: usize, vert: u32, vert_count: usize },
    #[error("edge {edge} is used by {faces} faces, at most 2 are allowed")]
    EdgeOverShared { edge: usize, faces: usize },
    #[error("{domain} attribute '{name}' has {actual} elements, expected {expected}")]
    AttribLength {
        domain: Domain,
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("{domain} attribute '{name}' has a non-finite value at element {elem}")]
    NonFinite { domain: Domain, name: String, elem: usize },
}

/// Read-only view of one face's corner sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRange {
    pub face: u32,
    pub start: u32,
    pub size: u32,
}

impl FaceRange {
    #[must_use]
    pub const fn corners(self) -> Range<usize> {
        self.start as usize..(self.start + self.size) as usize
    }

    /// Global corner index of local corner `local` (wraps around).
    #[must_use]
    pub const fn corner(self, local: usize) -> usize {
        self.start as usize + local % self.size as usize
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.size as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.size == 0
    }
}

/// Polygon mesh with face, corner, edge and vertex domains.
///
/// Face `f` owns corners `face_offsets[f]..face_offsets[f + 1]`. Corner `c`
/// references vertex `corner_verts[c]` and edge `corner_edges[c]`, the edge
/// leading to the next corner of the same face.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub face_offsets: Vec<u32>,
    pub corner_verts: Vec<u32>,
    pub corner_edges: Vec<u32>,
    pub edge_verts: Vec<[u32; 2]>,
    pub vert_count: usize,
    attribs: [AttribSet; 5],
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            face_offsets: vec![0],
            corner_verts: Vec::new(),
            corner_edges: Vec::new(),
            edge_verts: Vec::new(),
            vert_count: 0,
            attribs: Default::default(),
        }
    }
}

impl Mesh {
    /// Builds a mesh from vertex positions and polygon vertex loops.
    pub fn from_polygons(positions: &[Point3], faces: &[Vec<u32>]) -> Result<Self, MeshError> {
        let mut builder = MeshBuilder::with_positions(positions);
        for face in faces {
            builder.add_face(face)?;
        }
        builder.build()
    }

    #[must_use]
    pub fn face_count(&self) -> usize {
        self.face_offsets.len().saturating_sub(1)
    }

    #[must_use]
    pub fn corner_count(&self) -> usize {
        self.corner_verts.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_verts.len()
    }

    /// Number of elements in `domain`. The mesh domain always has one element.
    #[must_use]
    pub fn domain_len(&self, domain: Domain) -> usize {
        match domain {
            Domain::Mesh => 1,
            Domain::Face => self.face_count(),
            Domain::Corner => self.corner_count(),
            Domain::Edge => self.edge_count(),
            Domain::Vert => self.vert_count,
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn face(&self, face: usize) -> FaceRange {
        let start = self.face_offsets[face];
        FaceRange {
            face: face as u32,
            start,
            size: self.face_offsets[face + 1] - start,
        }
    }

    pub fn faces(&self) -> impl Iterator<Item = FaceRange> + '_ {
        (0..self.face_count()).map(|f| self.face(f))
    }

    #[must_use]
    pub fn attribs(&self, domain: Domain) -> &AttribSet {
        &self.attribs[domain.index()]
    }

    /// Appends `other` as disjoint geometry.
    ///
    /// Attributes are matched by name per domain; one missing on either side
    /// is zero-filled there. The mesh domain keeps this mesh's values and only
    /// adopts attributes it lacks.
    #[allow(clippy::cast_possible_truncation)]
    pub fn append(&mut self, other: &Self) {
        let lens = Domain::ALL.map(|d| self.domain_len(d));
        let vert_base = self.vert_count as u32;
        let edge_base = self.edge_count() as u32;
        let corner_base = self.corner_count() as u32;
        self.face_offsets
            .extend(other.face_offsets.iter().skip(1).map(|o| o + corner_base));
        self.corner_verts
            .extend(other.corner_verts.iter().map(|v| v + vert_base));
        self.corner_edges
            .extend(other.corner_edges.iter().map(|e| e + edge_base));
        self.edge_verts
            .extend(other.edge_verts.iter().map(|[a, b]| [a + vert_base, b + vert_base]));
        self.vert_count += other.vert_count;

        for domain in Domain::ALL {
            let theirs = other.attribs(domain);
            let added = if domain == Domain::Mesh { 0 } else { other.domain_len(domain) };
            let set = &mut self.attribs[domain.index()];
            for attrib in set.iter_mut() {
                let src = theirs.get(attrib.name());
                for e in 0..added {
                    let value = src.map_or_else(|| AttribValue::zeroed(attrib.comps()), |a| a.value(e));
                    attrib.push(&value);
                }
            }
            let missing: Vec<&Attrib> = theirs.iter().filter(|a| set.get(a.name()).is_none()).collect();
            for src in missing {
                if domain == Domain::Mesh {
                    set.insert(src.clone());
                    continue;
                }
                let mut attrib = src.empty_like();
                let zero = AttribValue::zeroed(attrib.comps());
                for _ in 0..lens[domain.index()] {
                    attrib.push(&zero);
                }
                for e in 0..added {
                    attrib.push(&src.value(e));
                }
                set.insert(attrib);
            }
        }
    }

    pub fn attribs_mut(&mut self, domain: Domain) -> &mut AttribSet {
        &mut self.attribs[domain.index()]
    }

    /// Vertex positions from the vertex `Position` attribute.
    #[must_use]
    pub fn positions(&self) -> Option<Vec<Point3>> {
        let attr = self.attribs(Domain::Vert).by_usage(AttribUse::Position)?;
        Some(
            (0..self.vert_count)
                .map(|v| Point3::new(attr.component(v, 0), attr.component(v, 1), attr.component(v, 2)))
                .collect(),
        )
    }

    /// Per-corner UVs, read from a corner `Uv` attribute or else a vertex one.
    #[must_use]
    pub fn corner_uvs(&self) -> Option<Vec<Uv>> {
        if let Some(attr) = self.attribs(Domain::Corner).by_usage(AttribUse::Uv) {
            return Some(
                (0..self.corner_count())
                    .map(|c| Uv::new(attr.component(c, 0), attr.component(c, 1)))
                    .collect(),
            );
        }
        let attr = self.attribs(Domain::Vert).by_usage(AttribUse::Uv)?;
        Some(
            self.corner_verts
                .iter()
                .map(|&v| Uv::new(attr.component(v as usize, 0), attr.component(v as usize, 1)))
                .collect(),
        )
    }

    /// Face index owning each corner.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn corner_faces(&self) -> Vec<u32> {
        let mut out = vec![0u32; self.corner_count()];
        for range in self.faces() {
            for c in range.corners() {
                out[c] = range.face;
            }
        }
        out
    }

    /// Corners using each edge, in corner order.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn edge_corners(&self) -> Vec<SmallVec<[u32; 2]>> {
        let mut out = vec![SmallVec::new(); self.edge_count()];
        for (c, &e) in self.corner_edges.iter().enumerate() {
            if let Some(slot) = out.get_mut(e as usize) {
                slot.push(c as u32);
            }
        }
        out
    }

    /// Checks topology references, edge sharing, attribute lengths and finiteness.
    pub fn validate(&self) -> Result<(), MeshError> {
        let corner_count = self.corner_count();
        if self.face_offsets.first() != Some(&0)
            || self.face_offsets.last().map(|&o| o as usize) != Some(corner_count)
            || self.face_offsets.windows(2).any(|w| w[0] > w[1])
            || self.corner_edges.len() != corner_count
        {
            return Err(MeshError::FaceOffsets);
        }
        for range in self.faces() {
            if range.len() < 3 {
                return Err(MeshError::FaceTooSmall {
                    face: range.face as usize,
                    corners: range.len(),
                });
            }
        }
        for (corner, &vert) in self.corner_verts.iter().enumerate() {
            if vert as usize >= self.vert_count {
                return Err(MeshError::CornerVertOutOfRange {
                    corner,
                    vert,
                    vert_count: self.vert_count,
                });
            }
        }
        for (edge, verts) in self.edge_verts.iter().enumerate() {
            if let Some(&vert) = verts.iter().find(|&&v| v as usize >= self.vert_count) {
                return Err(MeshError::EdgeVertOutOfRange {
                    edge,
                    vert,
                    vert_count: self.vert_count,
                });
            }
        }
        for range in self.faces() {
            for local in 0..range.len() {
                let corner = range.corner(local);
                let edge = self.corner_edges[corner];
                let Some(ends) = self.edge_verts.get(edge as usize) else {
                    return Err(MeshError::CornerEdgeOutOfRange {
                        corner,
                        edge,
                        edge_count: self.edge_count(),
                    });
                };
                let a = self.corner_verts[corner];
                let b = self.corner_verts[range.corner(local + 1)];
                if !(*ends == [a, b] || *ends == [b, a]) {
                    return Err(MeshError::CornerEdgeMismatch { corner, edge });
                }
            }
        }
        for (edge, corners) in self.edge_corners().iter().enumerate() {
            if corners.len() > 2 {
                return Err(MeshError::EdgeOverShared {
                    edge,
                    faces: corners.len(),
                });
            }
        }
        for domain in Domain::ALL {
            let expected = self.domain_len(domain);
            for attr in self.attribs(domain).iter() {
                if attr.raw_len() != expected * usize::from(attr.comps()) {
                    return Err(MeshError::AttribLength {
                        domain,
                        name: attr.name().to_string(),
                        expected,
                        actual: attr.raw_len() / usize::from(attr.comps()),
                    });
                }
                if matches!(attr.usage(), AttribUse::Position | AttribUse::Uv) {
                    check_finite(domain, attr)?;
                }
            }
        }
        Ok(())
    }
}

fn check_finite(domain: Domain, attr: &Attrib) -> Result<(), MeshError> {
    for elem in 0..attr.len() {
        if attr.value(elem).as_slice().iter().any(|x| !x.is_finite()) {
            return Err(MeshError::NonFinite {
                domain,
                name: attr.name().to_string(),
                elem,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Incremental mesh construction from polygon loops.
///
/// Edges are derived from consecutive vertex pairs. A vertex pair already used
/// by two faces gets a fresh edge, so no edge is ever shared by more than two faces.
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    mesh: Mesh,
    edge_lookup: HashMap<(u32, u32), SmallVec<[u32; 2]>>,
    edge_use: Vec<u8>,
}

impl MeshBuilder {
    #[must_use]
    pub fn new(vert_count: usize) -> Self {
        let mut builder = Self::default();
        builder.mesh.vert_count = vert_count;
        builder
    }

    /// A builder whose vertices carry the given positions.
    #[must_use]
    pub fn with_positions(positions: &[Point3]) -> Self {
        let mut builder = Self::new(positions.len());
        let flat = positions.iter().flat_map(|p| p.to_array()).collect();
        builder
            .mesh
            .attribs_mut(Domain::Vert)
            .insert(Attrib::float("position", AttribUse::Position, 3, flat));
        builder
    }

    #[must_use]
    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }

    /// Appends a face. Returns its face index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_face(&mut self, verts: &[u32]) -> Result<u32, MeshError> {
        let face = self.mesh.face_count();
        if verts.len() < 3 {
            return Err(MeshError::FaceTooSmall {
                face,
                corners: verts.len(),
            });
        }
        let first_corner = self.mesh.corner_count();
        if let Some((i, &vert)) = verts.iter().enumerate().find(|(_, v)| **v as usize >= self.mesh.vert_count) {
            return Err(MeshError::CornerVertOutOfRange {
                corner: first_corner + i,
                vert,
                vert_count: self.mesh.vert_count,
            });
        }
        for (i, &a) in verts.iter().enumerate() {
            let b = verts[(i + 1) % verts.len()];
            let edge = self.edge_for(a, b);
            self.mesh.corner_verts.push(a);
            self.mesh.corner_edges.push(edge);
        }
        self.mesh.face_offsets.push(self.mesh.corner_count() as u32);
        Ok(face as u32)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn edge_for(&mut self, a: u32, b: u32) -> u32 {
        let key = (a.min(b), a.max(b));
        let candidates = self.edge_lookup.entry(key).or_default();
        if let Some(&edge) = candidates.iter().find(|&&e| self.edge_use[e as usize] < 2) {
            self.edge_use[edge as usize] += 1;
            return edge;
        }
        let edge = self.mesh.edge_verts.len() as u32;
        self.mesh.edge_verts.push([a, b]);
        self.edge_use.push(1);
        candidates.push(edge);
        edge
    }

    pub fn set_attrib(&mut self, domain: Domain, attrib: Attrib) -> &mut Self {
        self.mesh.attribs_mut(domain).insert(attrib);
        self
    }

    /// Finishes the mesh and validates it.
    pub fn build(self) -> Result<Mesh, MeshError> {
        self.mesh.validate()?;
        Ok(self.mesh)
    }
}

// ---------------------------------------------------------------------------
// Vertex welding
// ---------------------------------------------------------------------------

/// Outcome of [`weld_vertices`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeldReport {
    pub welded_verts: usize,
    pub dropped_faces: usize,
}

/// Merges vertices whose positions coincide within `tol`.
///
/// Welded vertices keep the attributes of their first occurrence. Repeated
/// consecutive corners are collapsed and faces left with fewer than 3 corners
/// are dropped. Edges are rederived.
#[allow(clippy::cast_possible_truncation)]
pub fn weld_vertices(mesh: &Mesh, tol: Tolerance) -> Result<(Mesh, WeldReport), MeshError> {
    let Some(points) = mesh.positions() else {
        return Ok((mesh.clone(), WeldReport::default()));
    };
    let (remap, kept_verts) = weld_points(&points, tol);

    let mut builder = MeshBuilder::new(kept_verts.len());
    let mut kept_faces: Vec<usize> = Vec::new();
    let mut kept_corners: Vec<usize> = Vec::new();
    let mut dropped_faces = 0usize;
    for range in mesh.faces() {
        let mut loop_verts: Vec<u32> = Vec::with_capacity(range.len());
        let mut loop_corners: Vec<usize> = Vec::with_capacity(range.len());
        for c in range.corners() {
            let v = remap[mesh.corner_verts[c] as usize];
            if loop_verts.last() != Some(&v) {
                loop_verts.push(v);
                loop_corners.push(c);
            }
        }
        while loop_verts.len() > 1 && loop_verts.first() == loop_verts.last() {
            loop_verts.pop();
            loop_corners.pop();
        }
        if loop_verts.len() < 3 {
            dropped_faces += 1;
            continue;
        }
        builder.add_face(&loop_verts)?;
        kept_faces.push(range.face as usize);
        kept_corners.extend(loop_corners);
    }

    let mut edge_source: Vec<Option<usize>> = vec![None; builder.mesh.edge_count()];
    for (new_corner, &old_corner) in kept_corners.iter().enumerate() {
        let slot = &mut edge_source[builder.mesh.corner_edges[new_corner] as usize];
        if slot.is_none() {
            *slot = Some(mesh.corner_edges[old_corner] as usize);
        }
    }
    let edge_source: Vec<usize> = edge_source.into_iter().map(|e| e.unwrap_or(0)).collect();

    for domain in Domain::ALL {
        let sources: Vec<usize> = match domain {
            Domain::Mesh => vec![0],
            Domain::Face => kept_faces.clone(),
            Domain::Corner => kept_corners.clone(),
            Domain::Edge => edge_source.clone(),
            Domain::Vert => kept_verts.clone(),
        };
        for attr in mesh.attribs(domain).iter() {
            let mut out = attr.empty_like();
            for &src in &sources {
                out.push(&attr.value(src));
            }
            builder.set_attrib(domain, out);
        }
    }

    let welded = builder.build()?;
    let report = WeldReport {
        welded_verts: mesh.vert_count.saturating_sub(welded.vert_count),
        dropped_faces,
    };
    Ok((welded, report))
}

/// Grid-bucketed point welding. Returns the old-to-new index map and, per new
/// vertex, the old vertex it was taken from.
#[allow(clippy::cast_possible_truncation)]
fn weld_points(points: &[Point3], tol: Tolerance) -> (Vec<u32>, Vec<usize>) {
    let cell = (tol.eps * 2.0).max(f64::MIN_POSITIVE);
    let inv = 1.0 / cell;

    fn quantize(value: f64, inv: f64) -> Option<i64> {
        if !value.is_finite() {
            return None;
        }
        let q = (value * inv).floor();
        Some(q.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    }

    let mut buckets: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    let mut remap: Vec<u32> = Vec::with_capacity(points.len());
    let mut kept: Vec<usize> = Vec::with_capacity(points.len());

    for (i, p) in points.iter().copied().enumerate() {
        let key = match (quantize(p.x, inv), quantize(p.y, inv), quantize(p.z, inv)) {
            (Some(kx), Some(ky), Some(kz)) => Some((kx, ky, kz)),
            _ => None,
        };

        let found = key.and_then(|key| {
            for dx in -1i64..=1 {
                for dy in -1i64..=1 {
                    for dz in -1i64..=1 {
                        let Some(candidates) = buckets.get(&(key.0 + dx, key.1 + dy, key.2 + dz)) else {
                            continue;
                        };
                        if let Some(&cand) = candidates
                            .iter()
                            .find(|&&cand| tol.approx_eq_point3(points[kept[cand as usize]], p))
                        {
                            return Some(cand);
                        }
                    }
                }
            }
            None
        });

        let idx = found.unwrap_or_else(|| {
            let idx = kept.len() as u32;
            kept.push(i);
            if let Some(key) = key {
                buckets.entry(key).or_default().push(idx);
            }
            idx
        });
        remap.push(idx);
    }

    (remap, kept)
}

// ---------------------------------------------------------------------------
// Derived input data
// ---------------------------------------------------------------------------

/// Corners welded by (vertex, identical UV).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UvVerts {
    /// UV-vertex id of each corner.
    pub corner_uv_verts: Vec<u32>,
    /// UV of each UV vertex.
    pub uvs: Vec<Uv>,
    /// Mesh vertex of each UV vertex.
    pub verts: Vec<u32>,
}

impl UvVerts {
    #[must_use]
    pub fn len(&self) -> usize {
        self.uvs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uvs.is_empty()
    }
}

#[allow(clippy::cast_possible_truncation)]
pub fn weld_uv_verts(mesh: &Mesh, corner_uvs: &[Uv]) -> UvVerts {
    fn bits(x: f64) -> u64 {
        if x == 0.0 { 0 } else { x.to_bits() }
    }

    let mut lookup: HashMap<(u32, u64, u64), u32> = HashMap::new();
    let mut out = UvVerts {
        corner_uv_verts: Vec::with_capacity(mesh.corner_count()),
        ..UvVerts::default()
    };
    for (c, &vert) in mesh.corner_verts.iter().enumerate() {
        let uv = corner_uvs[c];
        let id = *lookup.entry((vert, bits(uv.u), bits(uv.v))).or_insert_with(|| {
            out.uvs.push(uv);
            out.verts.push(vert);
            (out.uvs.len() - 1) as u32
        });
        out.corner_uv_verts.push(id);
    }
    out
}

/// Why an input edge may not be crossed when joining fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeFlags {
    pub seam: bool,
    pub boundary: bool,
    pub preserve: bool,
}

impl EdgeFlags {
    #[must_use]
    pub const fn is_cut(self) -> bool {
        self.seam || self.boundary || self.preserve
    }
}

/// Seam, boundary and preserve flags per edge.
pub fn edge_flags(mesh: &Mesh, uv_verts: &UvVerts) -> Vec<EdgeFlags> {
    let preserve = mesh.attribs(Domain::Edge).by_usage(AttribUse::PreserveEdge);
    let faces = mesh.corner_faces();
    mesh.edge_corners()
        .iter()
        .enumerate()
        .map(|(edge, corners)| {
            let boundary = corners.len() < 2;
            let seam = match corners.as_slice() {
                [c0, c1] => {
                    let ends = |c: u32| {
                        let range = mesh.face(faces[c as usize] as usize);
                        let local = c as usize - range.start as usize;
                        let next = range.corner(local + 1);
                        [
                            (mesh.corner_verts[c as usize], uv_verts.corner_uv_verts[c as usize]),
                            (mesh.corner_verts[next], uv_verts.corner_uv_verts[next]),
                        ]
                    };
                    let mut a = ends(*c0);
                    let mut b = ends(*c1);
                    a.sort_unstable();
                    b.sort_unstable();
                    a != b
                }
                _ => false,
            };
            let preserve = preserve.is_some_and(|attr| attr.value(edge).as_slice().iter().any(|x| *x != 0.0));
            EdgeFlags { seam, boundary, preserve }
        })
        .collect()
}

/// Newell normal of a polygon, unnormalised.
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Per-corner normals from a corner or vertex `Normal` attribute, or else smooth vertex normals.
#[must_use]
pub fn corner_normals(mesh: &Mesh, positions: &[Point3]) -> Vec<Vec3> {
    let read = |attr: &Attrib, elem: usize| {
        Vec3::new(attr.component(elem, 0), attr.component(elem, 1), attr.component(elem, 2))
    };
    if let Some(attr) = mesh.attribs(Domain::Corner).by_usage(AttribUse::Normal) {
        return (0..mesh.corner_count()).map(|c| read(attr, c)).collect();
    }
    if let Some(attr) = mesh.attribs(Domain::Vert).by_usage(AttribUse::Normal) {
        return mesh.corner_verts.iter().map(|&v| read(attr, v as usize)).collect();
    }
    // Area-weighted face normals accumulated per vertex.
    let mut sums = vec![Vec3::ZERO; mesh.vert_count];
    for range in mesh.faces() {
        let pts: Vec<Point3> = range
            .corners()
            .map(|c| positions[mesh.corner_verts[c] as usize])
            .collect();
        let n = newell_normal(&pts);
        for c in range.corners() {
            let v = mesh.corner_verts[c] as usize;
            sums[v] = sums[v] + n;
        }
    }
    mesh.corner_verts
        .iter()
        .map(|&v| sums[v as usize].normalized().unwrap_or(Vec3::Z))
        .collect()
}

/// Per-corner tangents and tangent signs.
///
/// Read from `Tangent` / `TangentSign` attributes when present, otherwise
/// computed per face from UV gradients and orthogonalised against `normals`.
#[must_use]
pub fn corner_tangents(mesh: &Mesh, positions: &[Point3], uvs: &[Uv], normals: &[Vec3]) -> (Vec<Vec3>, Vec<f64>) {
    let lookup = |usage: AttribUse| {
        mesh.attribs(Domain::Corner)
            .by_usage(usage)
            .map(|a| (a, false))
            .or_else(|| mesh.attribs(Domain::Vert).by_usage(usage).map(|a| (a, true)))
    };
    let elem_of = |per_vert: bool, c: usize| {
        if per_vert { mesh.corner_verts[c] as usize } else { c }
    };

    if let Some((attr, per_vert)) = lookup(AttribUse::Tangent) {
        let tangents = (0..mesh.corner_count())
            .map(|c| {
                let e = elem_of(per_vert, c);
                Vec3::new(attr.component(e, 0), attr.component(e, 1), attr.component(e, 2))
            })
            .collect();
        let signs = lookup(AttribUse::TangentSign).map_or_else(
            || vec![1.0; mesh.corner_count()],
            |(attr, per_vert)| {
                (0..mesh.corner_count())
                    .map(|c| if attr.component(elem_of(per_vert, c), 0) < 0.0 { -1.0 } else { 1.0 })
                    .collect()
            },
        );
        return (tangents, signs);
    }

    let mut tangents = vec![Vec3::X; mesh.corner_count()];
    let mut signs = vec![1.0; mesh.corner_count()];
    for range in mesh.faces() {
        let Some((t, b)) = face_uv_gradient(mesh, range, positions, uvs) else {
            continue;
        };
        for c in range.corners() {
            let n = normals[c];
            let ortho = (t - n * n.dot(t)).normalized();
            if let Some(ortho) = ortho {
                tangents[c] = ortho;
                signs[c] = if n.cross(ortho).dot(b) < 0.0 { -1.0 } else { 1.0 };
            }
        }
    }
    (tangents, signs)
}

/// Object-space directions of increasing `u` and `v` over the first
/// non-degenerate fan triangle of a face.
fn face_uv_gradient(mesh: &Mesh, range: FaceRange, positions: &[Point3], uvs: &[Uv]) -> Option<(Vec3, Vec3)> {
    let c0 = range.corner(0);
    let p0 = positions[mesh.corner_verts[c0] as usize];
    let uv0 = uvs[c0];
    for i in 1..range.len() - 1 {
        let (c1, c2) = (range.corner(i), range.corner(i + 1));
        let e1 = positions[mesh.corner_verts[c1] as usize] - p0;
        let e2 = positions[mesh.corner_verts[c2] as usize] - p0;
        let d1 = uvs[c1] - uv0;
        let d2 = uvs[c2] - uv0;
        let det = d1.cross(d2);
        if det.abs() < 1e-12 {
            continue;
        }
        let inv = 1.0 / det;
        let t = (e1 * d2.v - e2 * d1.v) * inv;
        let b = (e2 * d1.u - e1 * d2.u) * inv;
        return Some((t, b));
    }
    None
}
