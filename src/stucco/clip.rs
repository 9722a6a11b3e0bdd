//! UV clipping of map faces against input faces.
//!
//! Both polygons are normalised to counter-clockwise order. The map face is
//! clipped against the input face's edges one half-plane at a time
//! (Sutherland–Hodgman). When a non-convex subject leaves the half-plane and
//! re-enters it, the pieces are re-paired along the clip line and tracked as
//! separate islands. Non-convex input faces are clipped per ear triangle; the
//! triangle pieces that meet along an internal diagonal are stitched back
//! together afterwards.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use smallvec::{SmallVec, smallvec};

use crate::geom::union_find::UnionFind;
use crate::geom::{
    MapCounters, Tile, Tolerance, Uv, UvBox, Winding, barycentric, orient2d, project_param, segment_line_param,
    signed_area,
};

use super::error::StuccoError;
use super::input::PreparedInput;
use super::map::Map;
use super::outline::stitch;

/// Sparse interpolation weights over global corner indices.
pub type Weights = SmallVec<[(u32, f64); 4]>;

/// Where a clipped corner came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// An unclipped map vertex.
    FromMap,
    /// A map vertex coinciding with an input face corner.
    FromInput,
    /// A point on an input edge: an intersection or a map vertex lying on the edge.
    OnEdge,
    /// An intersection that snapped to an input face corner.
    OnVertex,
}

/// Stable identity of an output vertex, independent of which job produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertKey {
    /// A map vertex placed at `tile`.
    Map { vert: u32, tile: Tile },
    /// An input UV vertex.
    Input { uv_vert: u32 },
    /// Map edge `map_edge` at `tile` crossing the input segment between UV vertices `a < b`.
    Crossing { map_edge: u32, tile: Tile, a: u32, b: u32 },
}

/// An input face boundary edge, or an internal diagonal between two of its corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputSeg {
    Edge { edge: u32 },
    Diagonal { a: u32, b: u32 },
}

/// What the segment from a corner to the next one lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SegmentSource {
    pub map_edge: Option<u32>,
    pub input_edge: Option<InputSeg>,
}

impl SegmentSource {
    #[must_use]
    pub const fn input_edge_id(&self) -> Option<u32> {
        match self.input_edge {
            Some(InputSeg::Edge { edge }) => Some(edge),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_diagonal(&self) -> bool {
        matches!(self.input_edge, Some(InputSeg::Diagonal { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipCorner {
    /// Absolute UV (the map face translated by its tile).
    pub uv: Uv,
    pub provenance: Provenance,
    pub key: VertKey,
    /// Weights over map corners.
    pub map_w: Weights,
    /// Weights over input corners.
    pub in_w: Weights,
    /// Segment to the next corner.
    pub seg: SegmentSource,
    /// Local index in the map face, `u32::MAX` for intersections.
    pub map_order: u32,
    pub on_input_edge: bool,
    /// Intersection with an internal diagonal of a non-convex input face.
    pub interior: bool,
    /// Input edge the corner lies on, if any.
    pub on_edge: Option<u32>,
}

/// One island of a map face clipped against an input face at a tile translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub input_face: u32,
    pub map_face: u32,
    pub translation: Tile,
    pub island: u32,
    pub corners: Vec<ClipCorner>,
    pub map_ccw: bool,
    pub input_ccw: bool,
    pub seam: bool,
    pub preserve: bool,
    pub touches_edge: bool,
}

impl Fragment {
    #[must_use]
    pub fn uvs(&self) -> Vec<Uv> {
        self.corners.iter().map(|c| c.uv).collect()
    }

    /// Signed UV area; clipped islands are counter-clockwise.
    #[must_use]
    pub fn area(&self) -> f64 {
        signed_area(&self.uvs())
    }

    /// True when the fragment must go through the boundary merger.
    #[must_use]
    pub fn is_boundary(&self) -> bool {
        self.touches_edge
            || self.seam
            || self.preserve
            || self.corners.iter().any(|c| c.provenance != Provenance::FromMap)
    }

    /// Output orientation: counter-clockwise when both source faces agree.
    #[must_use]
    pub const fn output_ccw(&self) -> bool {
        self.map_ccw == self.input_ccw
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipParams {
    /// Snap distance to input corners.
    pub tolerance: Tolerance,
    pub max_corners: usize,
    /// Upper bound on tiles the input face's UV box may span.
    pub max_tiles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    In,
    On,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Normal,
    Exit,
    Entry,
}

#[derive(Debug, Clone, Copy)]
struct LineEnd {
    corner: u32,
    uv_vert: u32,
    uv: Uv,
}

/// Directed clip line `a -> b`; the inside is on its left.
#[derive(Debug, Clone, Copy)]
struct ClipLine {
    a: LineEnd,
    b: LineEnd,
    source: InputSeg,
}

impl ClipLine {
    fn side(&self, p: Uv) -> Side {
        let d = (self.b.uv - self.a.uv).cross(p - self.a.uv);
        if d > Tolerance::ZERO_LENGTH.eps {
            Side::In
        } else if d < -Tolerance::ZERO_LENGTH.eps {
            Side::Out
        } else {
            Side::On
        }
    }

    fn tau(&self, p: Uv) -> f64 {
        (p - self.a.uv).dot(self.b.uv - self.a.uv)
    }

    const fn is_diagonal(&self) -> bool {
        matches!(self.source, InputSeg::Diagonal { .. })
    }

    const fn edge(&self) -> Option<u32> {
        match self.source {
            InputSeg::Edge { edge } => Some(edge),
            InputSeg::Diagonal { .. } => None,
        }
    }

    fn weights(&self, p: Uv) -> Weights {
        let s = project_param(p, self.a.uv, self.b.uv);
        smallvec![(self.a.corner, 1.0 - s), (self.b.corner, s)]
    }

    fn snap(&self, p: Uv, tol: Tolerance) -> Option<LineEnd> {
        if tol.approx_eq_uv(p, self.a.uv) {
            Some(self.a)
        } else if tol.approx_eq_uv(p, self.b.uv) {
            Some(self.b)
        } else {
            None
        }
    }

    fn nearest_end(&self, p: Uv) -> LineEnd {
        if (p - self.a.uv).length_squared() <= (p - self.b.uv).length_squared() {
            self.a
        } else {
            self.b
        }
    }

    fn crossing_key(&self, map_edge: u32, tile: Tile) -> VertKey {
        VertKey::Crossing {
            map_edge,
            tile,
            a: self.a.uv_vert.min(self.b.uv_vert),
            b: self.a.uv_vert.max(self.b.uv_vert),
        }
    }
}

#[derive(Debug)]
struct Emitted {
    corner: ClipCorner,
    role: Role,
    on_line: bool,
}

/// Clips map faces against one input face.
#[derive(Debug)]
pub struct FaceClipper<'a> {
    map: &'a Map,
    input: &'a PreparedInput<'a>,
    face: u32,
    start: u32,
    ccw: bool,
    bbox: UvBox,
    uvs: Vec<Uv>,
    /// One convex region for convex faces, one per ear triangle otherwise.
    regions: Vec<Vec<ClipLine>>,
    params: ClipParams,
}

impl<'a> FaceClipper<'a> {
    /// Returns `None` for a degenerate input face.
    #[must_use]
    pub fn new(map: &'a Map, input: &'a PreparedInput<'a>, face: u32, params: ClipParams) -> Option<Self> {
        let info = &input.faces[face as usize];
        if info.degenerate {
            return None;
        }
        let ccw = info.winding?.is_ccw();
        let range = input.mesh.face(face as usize);
        let uvs = input.face_uvs(face);
        let n = uvs.len();

        let mut clipper = Self {
            map,
            input,
            face,
            start: range.start,
            ccw,
            bbox: info.bbox,
            uvs,
            regions: Vec::new(),
            params,
        };
        clipper.regions = if info.convex {
            let order: Vec<usize> = if ccw { (0..n).collect() } else { (0..n).rev().collect() };
            vec![(0..n).map(|i| clipper.line(order[i], order[(i + 1) % n])).collect()]
        } else {
            info.triangles
                .iter()
                .map(|tri| {
                    let mut t = tri.map(|l| l as usize);
                    if orient2d(clipper.uvs[t[0]], clipper.uvs[t[1]], clipper.uvs[t[2]]) < 0.0 {
                        t.swap(1, 2);
                    }
                    (0..3).map(|k| clipper.line(t[k], t[(k + 1) % 3])).collect()
                })
                .collect()
        };
        Some(clipper)
    }

    #[must_use]
    pub const fn bbox(&self) -> UvBox {
        self.bbox
    }

    #[allow(clippy::cast_possible_truncation)]
    fn line(&self, x: usize, y: usize) -> ClipLine {
        let n = self.uvs.len();
        let cx = self.start + x as u32;
        let cy = self.start + y as u32;
        let edges = &self.input.mesh.corner_edges;
        let source = if (x + 1) % n == y {
            InputSeg::Edge {
                edge: edges[cx as usize],
            }
        } else if (y + 1) % n == x {
            InputSeg::Edge {
                edge: edges[cy as usize],
            }
        } else {
            InputSeg::Diagonal {
                a: cx.min(cy),
                b: cx.max(cy),
            }
        };
        let end = |local: usize, corner: u32| LineEnd {
            corner,
            uv_vert: self.input.uv_verts.corner_uv_verts[corner as usize],
            uv: self.uvs[local],
        };
        ClipLine {
            a: end(x, cx),
            b: end(y, cy),
            source,
        }
    }

    /// Clips one map face placed at `translation` and returns its islands.
    pub fn clip(&self, map_face: u32, translation: Tile) -> Result<Vec<Fragment>, StuccoError> {
        let subject = self.subject(map_face, translation);
        let mut pieces = Vec::new();
        for lines in &self.regions {
            let mut islands = vec![subject.clone()];
            for line in lines {
                let mut next = Vec::new();
                for island in islands {
                    next.extend(self.clip_by_line(island, line, translation)?);
                }
                islands = next;
                if islands.is_empty() {
                    break;
                }
            }
            pieces.extend(islands);
        }
        let islands = if self.regions.len() > 1 {
            join_diagonals(pieces)
        } else {
            pieces
        };

        #[allow(clippy::cast_possible_truncation)]
        let fragments = islands
            .into_iter()
            .enumerate()
            .map(|(i, corners)| self.finish(map_face, translation, i as u32, corners))
            .collect();
        Ok(fragments)
    }

    /// The map face's corners at `translation`, counter-clockwise.
    #[allow(clippy::cast_possible_truncation)]
    fn subject(&self, map_face: u32, translation: Tile) -> Vec<ClipCorner> {
        let mesh = self.map.mesh();
        let range = mesh.face(map_face as usize);
        let n = range.size as usize;
        let start = range.start as usize;
        let ccw = self.map.face_winding(map_face).is_some_and(Winding::is_ccw);
        let offset = translation.offset();
        (0..n)
            .map(|i| {
                let (local, edge_local) = if ccw {
                    (i, i)
                } else {
                    let k = n - 1 - i;
                    (k, (k + n - 1) % n)
                };
                let corner = start + local;
                let vert = mesh.corner_verts[corner];
                ClipCorner {
                    uv: self.map.vert_uv(vert) + offset,
                    provenance: Provenance::FromMap,
                    key: VertKey::Map {
                        vert,
                        tile: translation,
                    },
                    map_w: smallvec![(corner as u32, 1.0)],
                    in_w: SmallVec::new(),
                    seg: SegmentSource {
                        map_edge: Some(mesh.corner_edges[start + edge_local]),
                        input_edge: None,
                    },
                    map_order: local as u32,
                    on_input_edge: false,
                    interior: false,
                    on_edge: None,
                }
            })
            .collect()
    }

    fn clip_by_line(
        &self,
        poly: Vec<ClipCorner>,
        line: &ClipLine,
        tile: Tile,
    ) -> Result<Vec<Vec<ClipCorner>>, StuccoError> {
        let n = poly.len();
        let sides: Vec<Side> = poly.iter().map(|c| line.side(c.uv)).collect();
        if !sides.contains(&Side::In) {
            return Ok(Vec::new());
        }
        if !sides.contains(&Side::On) && !sides.contains(&Side::Out) {
            return Ok(vec![poly]);
        }

        let neighbour_side = |i: usize, step: usize| {
            let mut j = i;
            loop {
                j = (j + step) % n;
                if sides[j] != Side::On {
                    return sides[j];
                }
            }
        };

        let mut out: Vec<Emitted> = Vec::with_capacity(n + 4);
        for i in 0..n {
            let p = &poly[i];
            let q = &poly[(i + 1) % n];
            match sides[i] {
                Side::In => out.push(Emitted {
                    corner: p.clone(),
                    role: Role::Normal,
                    on_line: false,
                }),
                Side::On => {
                    let before = neighbour_side(i, n - 1);
                    let after = neighbour_side(i, 1);
                    if before == Side::Out && after == Side::Out {
                        continue;
                    }
                    let role = if after == Side::Out && sides[(i + 1) % n] == Side::Out {
                        Role::Exit
                    } else if before == Side::Out && sides[(i + n - 1) % n] == Side::Out {
                        Role::Entry
                    } else {
                        Role::Normal
                    };
                    let mut corner = p.clone();
                    self.touch_line(&mut corner, line);
                    out.push(Emitted {
                        corner,
                        role,
                        on_line: true,
                    });
                }
                Side::Out => {}
            }
            let flip = match (sides[i], sides[(i + 1) % n]) {
                (Side::In, Side::Out) => Some(Role::Exit),
                (Side::Out, Side::In) => Some(Role::Entry),
                _ => None,
            };
            if let Some(role) = flip {
                if let Some(corner) = self.crossing(p, q, line, tile) {
                    out.push(Emitted {
                        corner,
                        role,
                        on_line: false,
                    });
                }
            }
            if out.len() > self.params.max_corners {
                return Err(StuccoError::CapacityExceeded {
                    what: "clip corners",
                    face: self.face as usize,
                    limit: self.params.max_corners,
                });
            }
        }

        let len = out.len();
        for k in 0..len {
            if out[k].role == Role::Exit {
                out[k].corner.seg = SegmentSource {
                    map_edge: None,
                    input_edge: Some(line.source),
                };
            } else if out[k].on_line && out[(k + 1) % len].on_line {
                out[k].corner.seg.input_edge = Some(line.source);
            }
        }

        let islands = reconnect(out, line)
            .into_iter()
            .map(dedup_keys)
            .filter(|island| is_valid_island(island))
            .collect();
        Ok(islands)
    }

    /// Pins a corner lying on the clip line to the input edge or corner.
    fn touch_line(&self, corner: &mut ClipCorner, line: &ClipLine) {
        if corner.provenance != Provenance::FromMap {
            return;
        }
        if let Some(end) = line.snap(corner.uv, self.params.tolerance) {
            corner.uv = end.uv;
            corner.key = VertKey::Input { uv_vert: end.uv_vert };
            corner.provenance = Provenance::FromInput;
            corner.in_w = smallvec![(end.corner, 1.0)];
            corner.on_input_edge = true;
            return;
        }
        if line.is_diagonal() {
            return;
        }
        corner.provenance = Provenance::OnEdge;
        corner.in_w = line.weights(corner.uv);
        corner.on_input_edge = true;
        corner.on_edge = line.edge();
    }

    /// Intersection of the subject segment `p -> q` with the clip line.
    fn crossing(&self, p: &ClipCorner, q: &ClipCorner, line: &ClipLine, tile: Tile) -> Option<ClipCorner> {
        let t = segment_line_param(p.uv, q.uv, line.a.uv, line.b.uv, Tolerance::ZERO_LENGTH)?.clamp(0.0, 1.0);
        let uv = p.uv.lerp(q.uv, t);
        let mut corner = ClipCorner {
            uv,
            provenance: Provenance::OnEdge,
            key: VertKey::Input {
                uv_vert: line.a.uv_vert,
            },
            map_w: lerp_weights(&p.map_w, &q.map_w, t),
            in_w: SmallVec::new(),
            seg: p.seg,
            map_order: u32::MAX,
            on_input_edge: !line.is_diagonal(),
            interior: line.is_diagonal(),
            on_edge: line.edge(),
        };
        match (p.seg.map_edge, line.snap(uv, self.params.tolerance)) {
            (Some(map_edge), None) => {
                corner.key = line.crossing_key(map_edge, tile);
                corner.in_w = line.weights(uv);
            }
            (_, snapped) => {
                // Two clip lines meet only at an input corner.
                let end = snapped.unwrap_or_else(|| line.nearest_end(uv));
                corner.uv = end.uv;
                corner.key = VertKey::Input { uv_vert: end.uv_vert };
                corner.provenance = Provenance::OnVertex;
                corner.in_w = smallvec![(end.corner, 1.0)];
                corner.on_input_edge = true;
                corner.interior = false;
                corner.on_edge = None;
            }
        }
        Some(corner)
    }

    fn finish(&self, map_face: u32, translation: Tile, island: u32, mut corners: Vec<ClipCorner>) -> Fragment {
        for corner in &mut corners {
            if corner.provenance == Provenance::FromMap {
                corner.in_w = self.interior_weights(corner.uv);
            }
        }
        let mut seam = false;
        let mut preserve = false;
        let mut touches_edge = false;
        for corner in &corners {
            touches_edge |= corner.on_input_edge;
            for edge in corner.on_edge.into_iter().chain(corner.seg.input_edge_id()) {
                touches_edge = true;
                let flags = self.input.edge_flags[edge as usize];
                seam |= flags.seam;
                preserve |= flags.preserve;
            }
        }
        Fragment {
            input_face: self.face,
            map_face,
            translation,
            island,
            corners,
            map_ccw: self.map.face_winding(map_face).is_some_and(Winding::is_ccw),
            input_ccw: self.ccw,
            seam,
            preserve,
            touches_edge,
        }
    }

    /// Barycentric weights in the input triangle that contains `uv` best.
    fn interior_weights(&self, uv: Uv) -> Weights {
        let mut best: Option<(f64, [u32; 3], [f64; 3])> = None;
        for tri in &self.input.faces[self.face as usize].triangles {
            let [a, b, c] = tri.map(|l| self.uvs[l as usize]);
            let Some(w) = barycentric(a, b, c, uv) else {
                continue;
            };
            let min = w[0].min(w[1]).min(w[2]);
            if best.is_none_or(|(m, _, _)| min > m) {
                best = Some((min, *tri, w));
            }
        }
        best.map(|(_, tri, w)| {
            tri.iter()
                .zip(w)
                .map(|(&local, weight)| (self.start + local, weight))
                .collect()
        })
        .unwrap_or_default()
    }
}

/// Clips every candidate map face against input face `face`.
pub fn clip_input_face(
    map: &Map,
    input: &PreparedInput<'_>,
    face: u32,
    params: ClipParams,
    counters: &mut MapCounters,
) -> Result<Vec<Fragment>, StuccoError> {
    counters.faces_visited += 1;
    let Some(clipper) = FaceClipper::new(map, input, face, params) else {
        counters.degenerate_faces += 1;
        return Ok(Vec::new());
    };
    let bbox = clipper.bbox();
    match bbox.tile_count() {
        Some(n) if n <= params.max_tiles => {}
        _ => {
            return Err(StuccoError::CapacityExceeded {
                what: "uv tiles",
                face: face as usize,
                limit: params.max_tiles,
            });
        }
    }
    let mut fragments = Vec::new();
    for candidate in map.index().query_periodic(bbox) {
        counters.candidates += 1;
        let placed = map
            .face_bbox(candidate.face)
            .translate(candidate.translation.offset());
        if !placed.overlaps_open(bbox) {
            counters.box_rejects += 1;
            continue;
        }
        if map.is_degenerate(candidate.face, params.tolerance) {
            counters.degenerate_faces += 1;
            continue;
        }
        counters.clips += 1;
        let islands = clipper.clip(candidate.face, candidate.translation)?;
        crate::debug_log!(
            "input face {face} x map face {} @ {:?}: {} islands",
            candidate.face,
            candidate.translation,
            islands.len()
        );
        counters.islands += islands.len();
        fragments.extend(islands);
    }
    Ok(fragments)
}

/// `a * (1 - t) + b * t` over sparse weights.
#[must_use]
pub fn lerp_weights(a: &Weights, b: &Weights, t: f64) -> Weights {
    let mut out = Weights::new();
    for &(id, w) in a {
        add_weight(&mut out, id, w * (1.0 - t));
    }
    for &(id, w) in b {
        add_weight(&mut out, id, w * t);
    }
    out
}

fn add_weight(out: &mut Weights, id: u32, w: f64) {
    if w.abs() <= f64::MIN_POSITIVE {
        return;
    }
    match out.iter_mut().find(|(existing, _)| *existing == id) {
        Some(entry) => entry.1 += w,
        None => out.push((id, w)),
    }
}

/// Re-pairs exits and entries along the clip line into separate cycles.
fn reconnect(out: Vec<Emitted>, line: &ClipLine) -> Vec<Vec<ClipCorner>> {
    let len = out.len();
    let exits = out.iter().filter(|e| e.role == Role::Exit).count();
    if exits < 2 {
        return vec![out.into_iter().map(|e| e.corner).collect()];
    }

    let mut crossings: Vec<(f64, usize)> = out
        .iter()
        .enumerate()
        .filter(|(_, e)| e.role != Role::Normal)
        .map(|(i, e)| (line.tau(e.corner.uv), i))
        .collect();
    crossings.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

    let mut next: Vec<usize> = (0..len).map(|i| (i + 1) % len).collect();
    for pair in crossings.chunks(2) {
        match pair {
            [(_, exit), (_, entry)] if out[*exit].role == Role::Exit && out[*entry].role == Role::Entry => {
                next[*exit] = *entry;
            }
            _ => {
                log::debug!("clip line crossings do not alternate, keeping one cycle");
                return vec![out.into_iter().map(|e| e.corner).collect()];
            }
        }
    }

    let mut slots: Vec<Option<ClipCorner>> = out.into_iter().map(|e| Some(e.corner)).collect();
    let mut islands = Vec::new();
    for start in 0..len {
        let mut island = Vec::new();
        let mut i = start;
        while let Some(corner) = slots[i].take() {
            island.push(corner);
            i = next[i];
        }
        if !island.is_empty() {
            islands.push(island);
        }
    }
    islands
}

/// Collapses consecutive corners with the same identity, keeping the first
/// corner and the later corner's outgoing segment.
fn dedup_keys(corners: Vec<ClipCorner>) -> Vec<ClipCorner> {
    let mut out: Vec<ClipCorner> = Vec::with_capacity(corners.len());
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

fn is_valid_island(corners: &[ClipCorner]) -> bool {
    if corners.len() < 3 {
        return false;
    }
    let uvs: Vec<Uv> = corners.iter().map(|c| c.uv).collect();
    signed_area(&uvs).abs() > Tolerance::ZERO_LENGTH.eps
}

/// Unions triangle pieces sharing a diagonal segment and stitches each group.
#[allow(clippy::cast_possible_truncation)]
fn join_diagonals(pieces: Vec<Vec<ClipCorner>>) -> Vec<Vec<ClipCorner>> {
    let mut uf = UnionFind::new(pieces.len());
    let mut shared: HashMap<(VertKey, VertKey), u32> = HashMap::new();
    for (i, piece) in pieces.iter().enumerate() {
        for (k, corner) in piece.iter().enumerate() {
            if !corner.seg.is_diagonal() {
                continue;
            }
            let a = corner.key;
            let b = piece[(k + 1) % piece.len()].key;
            let pair = if a < b { (a, b) } else { (b, a) };
            match shared.entry(pair) {
                Entry::Occupied(e) => {
                    uf.union(*e.get(), i as u32);
                }
                Entry::Vacant(e) => {
                    e.insert(i as u32);
                }
            }
        }
    }

    let mut slots: Vec<Option<Vec<ClipCorner>>> = pieces.into_iter().map(Some).collect();
    let mut islands = Vec::new();
    for group in uf.groups() {
        let members: Vec<Vec<ClipCorner>> = group.iter().filter_map(|&i| slots[i as usize].take()).collect();
        if members.len() == 1 {
            islands.extend(members);
            continue;
        }
        let keys: Vec<Vec<VertKey>> = members.iter().map(|m| m.iter().map(|c| c.key).collect()).collect();
        match stitch(&keys, |(p, i)| members[p][i].seg.is_diagonal()) {
            Some(cycles) => {
                for cycle in cycles {
                    let corners = cycle.iter().map(|&(p, i)| members[p][i].clone()).collect();
                    islands.push(drop_interior(dedup_keys(corners)));
                }
            }
            None => {
                log::debug!("could not stitch {} pieces across a diagonal", members.len());
                islands.extend(members);
            }
        }
    }
    islands.retain(|island| is_valid_island(island));
    islands
}

/// Drops diagonal crossings that ended up in the middle of a map edge.
fn drop_interior(corners: Vec<ClipCorner>) -> Vec<ClipCorner> {
    let n = corners.len();
    let keep: Vec<bool> = (0..n)
        .map(|i| {
            let corner = &corners[i];
            let prev = &corners[(i + n - 1) % n];
            !(corner.interior
                && corner.provenance == Provenance::OnEdge
                && !corner.seg.is_diagonal()
                && !prev.seg.is_diagonal())
        })
        .collect();
    corners
        .into_iter()
        .zip(keep)
        .filter_map(|(corner, keep)| keep.then_some(corner))
        .collect()
}
