//! The indexed, tileable map: per-face UV boxes and windings, optional
//! tangent-space normals, receive edges, and a quadtree over the unit tile.

use std::sync::Arc;

use crate::geom::{
    Attrib, AttribUse, Domain, IndexedAttrib, IndexedAttribSet, Mesh, Tile, Tolerance, Uv, UvBox, Vec3, Winding,
    face_winding, signed_area,
};

use super::error::{MeshRole, StuccoError};
use super::quadtree::{DEFAULT_LEAF_CAPACITY, IndexEntry, QuadTree};
use super::usg::UniformSampleGrid;

/// A tileable surface-detail map.
///
/// The vertex `Position` attribute holds `(u, v, w)`. The map repeats with
/// period 1 along `u` and `v`.
#[derive(Debug, Clone)]
pub struct Map {
    mesh: Mesh,
    uvws: Vec<[f64; 3]>,
    windings: Vec<Option<Winding>>,
    bboxes: Vec<UvBox>,
    normals: Option<Vec<Vec3>>,
    /// Per-edge flags from a `Receive` edge attribute.
    receive: Option<Vec<bool>>,
    index: QuadTree,
    usgs: Vec<Arc<dyn UniformSampleGrid>>,
    material: Option<i64>,
    indexed: IndexedAttribSet,
}

impl Map {
    pub fn new(mesh: Mesh) -> Result<Self, StuccoError> {
        Self::with_leaf_capacity(mesh, DEFAULT_LEAF_CAPACITY)
    }

    /// Builds a map with a custom quadtree leaf capacity.
    pub fn with_leaf_capacity(mesh: Mesh, leaf_capacity: usize) -> Result<Self, StuccoError> {
        mesh.validate().map_err(StuccoError::invalid_mesh(MeshRole::Map))?;
        let positions = mesh.positions().ok_or(StuccoError::MissingAttrib {
            role: MeshRole::Map,
            usage: AttribUse::Position,
        })?;
        let uvws: Vec<[f64; 3]> = positions.iter().map(|p| p.to_array()).collect();

        let mut windings = Vec::with_capacity(mesh.face_count());
        let mut bboxes = Vec::with_capacity(mesh.face_count());
        let mut entries = Vec::new();
        for range in mesh.faces() {
            let uvs: Vec<Uv> = range
                .corners()
                .map(|c| {
                    let p = uvws[mesh.corner_verts[c] as usize];
                    Uv::new(p[0], p[1])
                })
                .collect();
            windings.push(face_winding(&uvs));
            let bbox = UvBox::from_points(uvs.iter().copied()).unwrap_or(UvBox::UNIT);
            bboxes.push(bbox);
            if !bbox.overlaps_open(UvBox::UNIT) {
                continue;
            }
            for tile in bbox.tiles() {
                let shifted = bbox.translate(tile.offset() * -1.0);
                if !shifted.overlaps_open(UvBox::UNIT) {
                    continue;
                }
                let entry = IndexEntry {
                    face: range.face,
                    shift: Tile::new(-tile.u, -tile.v),
                };
                entries.push((entry, shifted));
            }
        }
        let index = QuadTree::build(entries, leaf_capacity);

        let normals = read_normals(&mesh);
        let receive = mesh
            .attribs(Domain::Edge)
            .by_usage(AttribUse::Receive)
            .map(|attr| (0..mesh.edge_count()).map(|e| attr.component(e, 0) != 0.0).collect());
        log::debug!(
            "map: {} faces, {} index entries, {} quadtree cells",
            mesh.face_count(),
            index.entry_count(),
            index.cell_count()
        );

        Ok(Self {
            mesh,
            uvws,
            windings,
            bboxes,
            normals,
            receive,
            index,
            usgs: Vec::new(),
            material: None,
            indexed: IndexedAttribSet::new(),
        })
    }

    /// Restricts the map to input faces whose `Material` attribute equals `material`.
    #[must_use]
    pub const fn with_material(mut self, material: i64) -> Self {
        self.material = Some(material);
        self
    }

    /// Attaches the entry table of one of the map's indexed attributes.
    #[must_use]
    pub fn with_indexed_attrib(mut self, table: IndexedAttrib) -> Self {
        self.indexed.insert(table);
        self
    }

    #[must_use]
    pub const fn material(&self) -> Option<i64> {
        self.material
    }

    #[must_use]
    pub const fn indexed_attribs(&self) -> &IndexedAttribSet {
        &self.indexed
    }

    #[must_use]
    pub fn with_usg(mut self, usg: Arc<dyn UniformSampleGrid>) -> Self {
        self.usgs.push(usg);
        self
    }

    #[must_use]
    pub const fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[must_use]
    pub const fn index(&self) -> &QuadTree {
        &self.index
    }

    #[must_use]
    pub fn usgs(&self) -> &[Arc<dyn UniformSampleGrid>] {
        &self.usgs
    }

    #[must_use]
    pub fn vert_uv(&self, vert: u32) -> Uv {
        let p = self.uvws[vert as usize];
        Uv::new(p[0], p[1])
    }

    #[must_use]
    pub fn vert_w(&self, vert: u32) -> f64 {
        self.uvws[vert as usize][2]
    }

    #[must_use]
    pub fn face_uvs(&self, face: u32) -> Vec<Uv> {
        self.mesh
            .face(face as usize)
            .corners()
            .map(|c| self.vert_uv(self.mesh.corner_verts[c]))
            .collect()
    }

    #[must_use]
    pub fn face_winding(&self, face: u32) -> Option<Winding> {
        self.windings[face as usize]
    }

    #[must_use]
    pub fn face_bbox(&self, face: u32) -> UvBox {
        self.bboxes[face as usize]
    }

    /// True when the face has no winding or an area within `tol`.
    #[must_use]
    pub fn is_degenerate(&self, face: u32, tol: Tolerance) -> bool {
        self.windings[face as usize].is_none() || signed_area(&self.face_uvs(face)).abs() <= tol.eps
    }

    /// Tangent-space normal of a map corner, when the map carries normals.
    #[must_use]
    pub fn corner_normal(&self, corner: usize) -> Option<Vec3> {
        self.normals.as_ref().map(|n| n[corner])
    }

    #[must_use]
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Flags from the map's `Receive` edge attribute, when present.
    #[must_use]
    pub fn receive_flags(&self) -> Option<&[bool]> {
        self.receive.as_deref()
    }

    /// Length of a map edge in `(u, v, w)` space.
    #[must_use]
    pub fn edge_length(&self, edge: u32) -> f64 {
        let [a, b] = self.mesh.edge_verts[edge as usize];
        let (pa, pb) = (self.uvws[a as usize], self.uvws[b as usize]);
        let d = Vec3::new(pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]);
        d.length()
    }
}

fn read_normals(mesh: &Mesh) -> Option<Vec<Vec3>> {
    let read = |attr: &Attrib, e: usize| {
        Vec3::new(attr.component(e, 0), attr.component(e, 1), attr.component(e, 2))
    };
    if let Some(attr) = mesh.attribs(Domain::Corner).by_usage(AttribUse::Normal) {
        return Some((0..mesh.corner_count()).map(|c| read(attr, c)).collect());
    }
    let attr = mesh.attribs(Domain::Vert).by_usage(AttribUse::Normal)?;
    Some(mesh.corner_verts.iter().map(|&v| read(attr, v as usize)).collect())
}
