//! Reconciling boundary fragments produced by different input faces (and
//! possibly different workers) into single output faces.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::geom::union_find::UnionFind;
use crate::geom::{MapCounters, Tile, Tolerance, Uv, Vec3, signed_area};

use super::assemble::order_merged;
use super::clip::{ClipParams, Fragment, VertKey};
use super::error::StuccoError;
use super::materialize::{FaceOrderKey, Materializer, ScratchFace, ScratchMesh};
use super::outline::stitch;
use super::receive::CutEdges;

/// Sequence numbers of merged faces start here, above any island index.
pub const MERGED_SEQ_BASE: u32 = 0x1_0000;

/// Boundary fragments of one worker, bucketed by input face.
#[derive(Debug, Clone, Default)]
pub struct BoundaryTable {
    by_face: BTreeMap<u32, Vec<Fragment>>,
}

impl BoundaryTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.by_face.entry(fragment.input_face).or_default().push(fragment);
    }

    /// Total fragments held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_face.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_face.is_empty()
    }

    #[must_use]
    pub fn input_faces(&self) -> Vec<u32> {
        self.by_face.keys().copied().collect()
    }
}

/// Concatenates the tables of all workers per input face, in ascending face order.
#[must_use]
pub fn pool_boundary_tables(tables: Vec<BoundaryTable>) -> BTreeMap<u32, Vec<Fragment>> {
    let mut pooled: BTreeMap<u32, Vec<Fragment>> = BTreeMap::new();
    for table in tables {
        for (face, fragments) in table.by_face {
            pooled.entry(face).or_default().extend(fragments);
        }
    }
    pooled
}

type SegmentKey = (u32, Tile, VertKey, VertKey);

/// Groups pooled fragments joined by shared segments on edges `cuts` lets through.
///
/// Each group lists its fragments in pooled order. Every fragment lands in
/// exactly one group.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn find_pieces(pooled: BTreeMap<u32, Vec<Fragment>>, cuts: &CutEdges<'_>) -> Vec<Vec<Fragment>> {
    let fragments: Vec<Fragment> = pooled.into_values().flatten().collect();
    let mut uf = UnionFind::new(fragments.len());
    let mut shared: HashMap<SegmentKey, (u32, bool)> = HashMap::new();
    for (i, fragment) in fragments.iter().enumerate() {
        let n = fragment.corners.len();
        for (k, corner) in fragment.corners.iter().enumerate() {
            let Some(edge) = corner.seg.input_edge_id() else {
                continue;
            };
            if cuts.cuts(fragment, edge) {
                continue;
            }
            let a = corner.key;
            let b = fragment.corners[(k + 1) % n].key;
            let key = (fragment.map_face, fragment.translation, a.min(b), a.max(b));
            match shared.entry(key) {
                Entry::Occupied(mut e) => {
                    let (other, consumed) = e.get_mut();
                    if !*consumed {
                        uf.union(*other, i as u32);
                        *consumed = true;
                    }
                }
                Entry::Vacant(e) => {
                    e.insert((i as u32, false));
                }
            }
        }
    }

    let mut slots: Vec<Option<Fragment>> = fragments.into_iter().map(Some).collect();
    uf.groups()
        .into_iter()
        .map(|group| group.iter().filter_map(|&i| slots[i as usize].take()).collect())
        .collect()
}

/// Merges every piece into finished faces, each piece in its own identity scope.
///
/// Returns the faces and the number of scope-local vertices created. A
/// stitched outline with more than `params.max_corners` corners is an error.
pub fn merge_pieces(
    pieces: Vec<Vec<Fragment>>,
    materializer: &Materializer<'_>,
    cuts: &CutEdges<'_>,
    params: ClipParams,
    counters: &mut MapCounters,
) -> Result<(Vec<ScratchFace>, usize), StuccoError> {
    let mut faces = Vec::new();
    let mut scope_verts = 0;
    let mut seq = MERGED_SEQ_BASE;
    counters.pieces += pieces.len();
    for piece in pieces {
        let mut scratch = ScratchMesh::new(params.tolerance);
        let merged = piece.len() > 1
            && merge_piece(&piece, materializer, cuts, params, &mut seq, &mut scratch, counters)?;
        if !merged {
            if piece.len() > 1 {
                counters.unmerged_pieces += 1;
                log::debug!(
                    "piece of {} fragments from input face {} did not close, emitting fragments",
                    piece.len(),
                    piece[0].input_face
                );
            }
            for fragment in &piece {
                match single_face(fragment, materializer, counters) {
                    Some(face) => scratch.push(face),
                    None => counters.dropped_faces += 1,
                }
            }
        }
        scope_verts += scratch.vert_count();
        faces.extend(scratch.into_faces());
    }
    Ok((faces, scope_verts))
}

/// Emits one boundary fragment as its own face.
fn single_face(fragment: &Fragment, materializer: &Materializer<'_>, counters: &mut MapCounters) -> Option<ScratchFace> {
    let corners = fragment
        .corners
        .iter()
        .map(|c| materializer.corner(c, fragment.input_face, fragment.translation, None, counters))
        .collect();
    let corners = order_merged(corners, fragment.output_ccw())?;
    Some(ScratchFace {
        order: FaceOrderKey {
            input_face: fragment.input_face,
            map_face: fragment.map_face,
            translation: fragment.translation,
            seq: fragment.island,
        },
        map_face: fragment.map_face,
        input_face: fragment.input_face,
        corners,
    })
}

/// Stitches a multi-fragment piece. Returns false when its outline does not close.
fn merge_piece(
    piece: &[Fragment],
    materializer: &Materializer<'_>,
    cuts: &CutEdges<'_>,
    params: ClipParams,
    seq: &mut u32,
    scratch: &mut ScratchMesh,
    counters: &mut MapCounters,
) -> Result<bool, StuccoError> {
    let keys: Vec<Vec<VertKey>> = piece
        .iter()
        .map(|f| f.corners.iter().map(|c| c.key).collect())
        .collect();
    let cancellable = |(p, i): (usize, usize)| {
        piece[p].corners[i]
            .seg
            .input_edge_id()
            .is_some_and(|e| !cuts.cuts(&piece[p], e))
    };
    let Some(cycles) = stitch(&keys, cancellable) else {
        return Ok(false);
    };
    let outer = |cycle: &Vec<(usize, usize)>| {
        let uvs: Vec<Uv> = cycle.iter().map(|&(p, i)| piece[p].corners[i].uv).collect();
        signed_area(&uvs) > 0.0
    };
    if cycles.is_empty() || !cycles.iter().all(outer) {
        return Ok(false);
    }
    let Some(lead) = piece.iter().min_by_key(|f| f.input_face) else {
        return Ok(false);
    };
    if let Some(cycle) = cycles.iter().find(|c| c.len() > params.max_corners) {
        log::debug!(
            "merged outline of {} corners at input face {} exceeds {}",
            cycle.len(),
            lead.input_face,
            params.max_corners
        );
        return Err(StuccoError::CapacityExceeded {
            what: "merged corners",
            face: lead.input_face as usize,
            limit: params.max_corners,
        });
    }

    // Pieces straddling a seam take one normal per vertex, averaged over
    // every fragment corner sharing its key.
    let mixed = piece.iter().any(|f| f.seam) && piece.iter().any(|f| !f.seam);
    let mut key_normals: HashMap<VertKey, Vec3> = HashMap::new();
    if mixed {
        for c in piece.iter().flat_map(|f| f.corners.iter()) {
            let sum = key_normals.entry(c.key).or_insert(Vec3::ZERO);
            *sum = *sum + materializer.input_normal(&c.in_w);
        }
    }

    for cycle in cycles {
        let corners = cycle
            .iter()
            .map(|&(p, i)| {
                let fragment = &piece[p];
                let corner = &fragment.corners[i];
                let normal_override = mixed.then(|| {
                    key_normals
                        .get(&corner.key)
                        .copied()
                        .filter(|n| n.length() > Tolerance::ZERO_LENGTH.eps)
                        .and_then(Vec3::normalized)
                        .unwrap_or_else(|| materializer.input_normal(&corner.in_w))
                });
                materializer.corner(corner, fragment.input_face, fragment.translation, normal_override, counters)
            })
            .collect();
        match order_merged(corners, lead.output_ccw()) {
            Some(corners) => {
                scratch.push(ScratchFace {
                    order: FaceOrderKey {
                        input_face: lead.input_face,
                        map_face: lead.map_face,
                        translation: lead.translation,
                        seq: *seq,
                    },
                    map_face: lead.map_face,
                    input_face: lead.input_face,
                    corners,
                });
                *seq += 1;
                counters.merged_faces += 1;
            }
            None => counters.dropped_faces += 1,
        }
    }
    Ok(true)
}
