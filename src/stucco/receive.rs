//! Which input edges keep boundary fragments apart during merging.
//!
//! Seam and mesh-boundary edges always do. A preserved edge does too, unless
//! the map marks receive edges: then it only survives inside map faces that
//! receive it.

use crate::geom::{Tile, Tolerance, Uv, segment_line_param};

use super::clip::Fragment;
use super::input::PreparedInput;
use super::map::Map;

/// How many edges of a map face receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
    None,
    Some,
    All,
}

/// Receive flag per map edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveEdges {
    flags: Vec<bool>,
}

impl ReceiveEdges {
    /// Flags from the map's `Receive` attribute, or `None` when the map carries none.
    ///
    /// With `receive_len` set, exactly the edges no longer than it receive,
    /// whether or not the attribute exists.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(map: &Map, receive_len: Option<f64>) -> Option<Self> {
        let flags = match receive_len {
            Some(len) => (0..map.mesh().edge_count())
                .map(|e| map.edge_length(e as u32) <= len)
                .collect(),
            None => map.receive_flags()?.to_vec(),
        };
        Some(Self { flags })
    }

    #[must_use]
    pub fn is_receive(&self, edge: u32) -> bool {
        self.flags.get(edge as usize).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn face_status(&self, map: &Map, face: u32) -> ReceiveStatus {
        let mesh = map.mesh();
        let range = mesh.face(face as usize);
        let count = range
            .corners()
            .filter(|&c| self.is_receive(mesh.corner_edges[c]))
            .count();
        match count {
            0 => ReceiveStatus::None,
            n if n == range.len() => ReceiveStatus::All,
            _ => ReceiveStatus::Some,
        }
    }

    /// Whether a preserved input segment `a -> b` stays cut inside `map_face`
    /// placed at `translation`.
    ///
    /// With only some receive edges, the first map edge the segment crosses
    /// decides; a segment crossing none stays cut.
    #[must_use]
    pub fn keeps_preserve(&self, map: &Map, map_face: u32, translation: Tile, a: Uv, b: Uv) -> bool {
        match self.face_status(map, map_face) {
            ReceiveStatus::None => false,
            ReceiveStatus::All => true,
            ReceiveStatus::Some => {
                let mesh = map.mesh();
                let range = mesh.face(map_face as usize);
                let offset = translation.offset();
                let uvs: Vec<Uv> = map.face_uvs(map_face).into_iter().map(|uv| uv + offset).collect();
                let n = uvs.len();
                for (local, c) in range.corners().enumerate() {
                    let (p, q) = (uvs[local], uvs[(local + 1) % n]);
                    if segments_cross(a, b, p, q) {
                        return self.is_receive(mesh.corner_edges[c]);
                    }
                }
                true
            }
        }
    }
}

fn segments_cross(a: Uv, b: Uv, p: Uv, q: Uv) -> bool {
    let tol = Tolerance::ZERO_LENGTH;
    let unit = 0.0..=1.0;
    segment_line_param(a, b, p, q, tol).is_some_and(|t| unit.contains(&t))
        && segment_line_param(p, q, a, b, tol).is_some_and(|s| unit.contains(&s))
}

/// Cut-edge test shared by piece finding and outline stitching.
#[derive(Debug, Clone)]
pub struct CutEdges<'a> {
    input: &'a PreparedInput<'a>,
    map: &'a Map,
    receive: Option<ReceiveEdges>,
}

impl<'a> CutEdges<'a> {
    #[must_use]
    pub fn new(input: &'a PreparedInput<'a>, map: &'a Map, receive_len: Option<f64>) -> Self {
        Self {
            input,
            map,
            receive: ReceiveEdges::new(map, receive_len),
        }
    }

    /// Whether input edge `edge` separates `fragment` from its neighbours.
    #[must_use]
    pub fn cuts(&self, fragment: &Fragment, edge: u32) -> bool {
        let flags = self.input.edge_flags[edge as usize];
        if !flags.is_cut() {
            return false;
        }
        if flags.seam || flags.boundary {
            return true;
        }
        let Some(receive) = &self.receive else {
            return true;
        };
        match self.input.edge_uvs(fragment.input_face, edge) {
            Some((a, b)) => receive.keeps_preserve(self.map, fragment.map_face, fragment.translation, a, b),
            None => true,
        }
    }
}
