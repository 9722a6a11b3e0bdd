//! Diagnostics returned alongside every map-to-mesh result.
//!
//! # Example
//!
//! ```ignore
//! let out = map_to_mesh(&mut ctx, &map, &input, &common, 1.0)?;
//! if !out.diagnostics.is_clean() {
//!     for warning in &out.diagnostics.warnings {
//!         log::warn!("{warning}");
//!     }
//! }
//! ```

use std::fmt;

use super::metrics::{MapCounters, StuccoTimingReport};

/// Output sizes, work counters and warnings of one `map_to_mesh` call.
///
/// A clean run dropped no faces, left no piece unmerged and recorded no warnings.
/// Degenerate input or map faces are skipped silently and do not make a run unclean.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapToMeshDiagnostics {
    /// Vertices in the output mesh.
    pub vertex_count: usize,
    /// Faces in the output mesh.
    pub face_count: usize,
    /// Corners in the output mesh.
    pub corner_count: usize,
    /// Vertices shared across job and merge scopes, plus those merged by the optional weld.
    pub welded_vertex_count: usize,
    /// Worker jobs that ran.
    pub worker_count: usize,
    pub counters: MapCounters,
    /// Only populated with the `stucco_metrics` feature.
    pub timing: Option<StuccoTimingReport>,
    pub warnings: Vec<String>,
}

impl MapToMeshDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.counters.dropped_faces == 0 && self.counters.unmerged_pieces == 0 && self.warnings.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Sums counts and appends warnings. `timing` of `other` is ignored.
    pub fn merge(&mut self, other: &Self) {
        self.vertex_count += other.vertex_count;
        self.face_count += other.face_count;
        self.corner_count += other.corner_count;
        self.welded_vertex_count += other.welded_vertex_count;
        self.worker_count += other.worker_count;
        self.counters.merge(&other.counters);
        self.warnings.extend(other.warnings.iter().cloned());
    }

    /// Short one-line summary for logging.
    ///
    /// Format: `"V:{vertices} F:{faces} [issues...]"`
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("V:{} F:{}", self.vertex_count, self.face_count)];
        let c = &self.counters;
        if c.merged_faces > 0 {
            parts.push(format!("merged:{}", c.merged_faces));
        }
        if c.unmerged_pieces > 0 {
            parts.push(format!("unmerged:{}", c.unmerged_pieces));
        }
        if c.dropped_faces > 0 {
            parts.push(format!("dropped:{}", c.dropped_faces));
        }
        if c.degenerate_faces > 0 {
            parts.push(format!("degenerate:{}", c.degenerate_faces));
        }
        if self.welded_vertex_count > 0 {
            parts.push(format!("welded:{}", self.welded_vertex_count));
        }
        parts.join(" ")
    }
}

impl fmt::Display for MapToMeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counters;
        writeln!(f, "Map-to-mesh Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Faces: {}", self.face_count)?;
        writeln!(f, "  Workers: {}", self.worker_count)?;
        writeln!(
            f,
            "  Clipping: {} input faces, {} candidates, {} box rejects, {} clips, {} islands",
            c.faces_visited, c.candidates, c.box_rejects, c.clips, c.islands
        )?;
        writeln!(
            f,
            "  Merging: {} direct, {} boundary fragments, {} pieces, {} merged faces",
            c.direct_faces, c.boundary_fragments, c.pieces, c.merged_faces
        )?;

        if c.degenerate_faces > 0 || c.dropped_faces > 0 || c.unmerged_pieces > 0 {
            writeln!(f, "  Skipped:")?;
            if c.degenerate_faces > 0 {
                writeln!(f, "    - Degenerate faces: {}", c.degenerate_faces)?;
            }
            if c.dropped_faces > 0 {
                writeln!(f, "    - Dropped faces: {}", c.dropped_faces)?;
            }
            if c.unmerged_pieces > 0 {
                writeln!(f, "    - Unmerged pieces: {}", c.unmerged_pieces)?;
            }
        }

        if c.masked_faces > 0 {
            writeln!(f, "  Masked input faces: {}", c.masked_faces)?;
        }
        if c.usg_overrides > 0 {
            writeln!(f, "  Sample grid overrides: {}", c.usg_overrides)?;
        }
        if self.welded_vertex_count > 0 {
            writeln!(f, "  Welded vertices: {}", self.welded_vertex_count)?;
        }

        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }

        if let Some(timing) = &self.timing {
            writeln!(f, "  Timing: {} ms total", timing.total_ms())?;
        }

        let status = if self.is_clean() { "CLEAN" } else { "ISSUES DETECTED" };
        writeln!(f, "  Status: {status}")?;
        Ok(())
    }
}
