//! Scoped fingerprint tables that give corners shared by several clip results
//! one vertex index.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::geom::{Tile, Tolerance, Uv};

use super::clip::VertKey;

type Chain = SmallVec<[(Uv, u32); 1]>;

/// Entry counts of an [`IdentityTables`] scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentityStats {
    pub map_verts: usize,
    pub input_verts: usize,
    pub crossings: usize,
    /// Entries appended behind an existing key because the geometry differed.
    pub chained: usize,
}

/// Vertex identity within one scope (a worker range, a merge piece or the
/// final assembly).
///
/// A lookup reuses an index only when both the key and the UV (within
/// tolerance) match. A key hit with different geometry chains a new entry.
#[derive(Debug, Clone)]
pub struct IdentityTables {
    map_verts: HashMap<(u32, Tile), Chain>,
    input_verts: HashMap<u32, Chain>,
    crossings: HashMap<(u32, Tile, u32, u32), Chain>,
    tolerance: Tolerance,
    next: u32,
    chained: usize,
}

impl IdentityTables {
    #[must_use]
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            map_verts: HashMap::new(),
            input_verts: HashMap::new(),
            crossings: HashMap::new(),
            tolerance,
            next: 0,
            chained: 0,
        }
    }

    /// Index of the vertex for `key` at `uv`, and whether it was just created.
    pub fn get_or_insert(&mut self, key: VertKey, uv: Uv) -> (u32, bool) {
        let tol = self.tolerance;
        let chain = match key {
            VertKey::Map { vert, tile } => self.map_verts.entry((vert, tile)).or_default(),
            VertKey::Input { uv_vert } => self.input_verts.entry(uv_vert).or_default(),
            VertKey::Crossing { map_edge, tile, a, b } => self.crossings.entry((map_edge, tile, a, b)).or_default(),
        };
        if let Some(&(_, index)) = chain.iter().find(|(seen, _)| tol.approx_eq_uv(*seen, uv)) {
            return (index, false);
        }
        if !chain.is_empty() {
            self.chained += 1;
        }
        let index = self.next;
        chain.push((uv, index));
        self.next += 1;
        (index, true)
    }

    /// Number of distinct vertices handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.next as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    #[must_use]
    pub fn stats(&self) -> IdentityStats {
        IdentityStats {
            map_verts: self.map_verts.values().map(SmallVec::len).sum(),
            input_verts: self.input_verts.values().map(SmallVec::len).sum(),
            crossings: self.crossings.values().map(SmallVec::len).sum(),
            chained: self.chained,
        }
    }
}
