//! Entry points: projecting a map onto an input mesh.

use std::num::NonZeroUsize;
use std::ops::Range;

use crate::geom::{
    Domain, MapCounters, MapToMeshDiagnostics, Mesh, StuccoMetrics, TimingBucket, Tolerance, weld_vertices,
};

use super::assemble::assemble_output;
use super::blend::{CommonAttrib, CommonAttribList, TypeDefaults};
use super::clip::{ClipParams, clip_input_face};
use super::error::{MeshRole, StuccoError};
use super::input::PreparedInput;
use super::jobs::{partition_faces, run_jobs};
use super::map::Map;
use super::materialize::{AttribPlan, Materializer, ScratchFace, ScratchMesh};
use super::merge::{BoundaryTable, find_pieces, merge_pieces, pool_boundary_tables};
use super::receive::CutEdges;

pub const DEFAULT_MAX_CLIP_CORNERS: usize = 1024;
pub const DEFAULT_MAX_TILES: usize = 4096;

/// Options for [`map_to_mesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapToMeshOptions {
    /// Jobs to split the input faces into; also the pool size.
    pub worker_count: usize,
    /// Upper bound on corners produced by clipping one map face.
    pub max_clip_corners: usize,
    /// Upper bound on map tiles one input face may span in UV.
    pub max_tiles: usize,
    /// Map edges no longer than this receive preserved input edges, replacing
    /// the map's `Receive` attribute.
    pub receive_len: Option<f64>,
    /// Weld coincident output positions after assembly.
    pub weld_tolerance: Option<Tolerance>,
}

impl Default for MapToMeshOptions {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            max_clip_corners: DEFAULT_MAX_CLIP_CORNERS,
            max_tiles: DEFAULT_MAX_TILES,
            receive_len: None,
            weld_tolerance: None,
        }
    }
}

impl MapToMeshOptions {
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    #[must_use]
    pub const fn with_max_clip_corners(mut self, max_clip_corners: usize) -> Self {
        self.max_clip_corners = max_clip_corners;
        self
    }

    #[must_use]
    pub const fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.max_tiles = max_tiles;
        self
    }

    #[must_use]
    pub const fn with_receive_len(mut self, receive_len: Option<f64>) -> Self {
        self.receive_len = receive_len;
        self
    }

    #[must_use]
    pub const fn with_weld_tolerance(mut self, tolerance: Option<Tolerance>) -> Self {
        self.weld_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<(), StuccoError> {
        if self.worker_count == 0 {
            return Err(StuccoError::InvalidConfig("worker_count must be at least 1".into()));
        }
        if self.max_clip_corners < 3 {
            return Err(StuccoError::InvalidConfig(format!(
                "max_clip_corners must be at least 3, got {}",
                self.max_clip_corners
            )));
        }
        if self.max_tiles == 0 {
            return Err(StuccoError::InvalidConfig("max_tiles must be at least 1".into()));
        }
        if let Some(len) = self.receive_len {
            if !len.is_finite() || len < 0.0 {
                return Err(StuccoError::InvalidConfig(format!(
                    "receive_len must be finite and non-negative, got {len}"
                )));
            }
        }
        if let Some(tol) = self.weld_tolerance {
            if !tol.eps.is_finite() || tol.eps < 0.0 {
                return Err(StuccoError::InvalidConfig(format!(
                    "weld tolerance must be finite and non-negative, got {}",
                    tol.eps
                )));
            }
        }
        Ok(())
    }
}

/// Tolerance, options and timing shared by one or more calls.
#[derive(Debug, Clone)]
pub struct StuccoContext {
    pub tolerance: Tolerance,
    pub options: MapToMeshOptions,
    pub metrics: StuccoMetrics,
}

impl StuccoContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tolerance: Tolerance::default_geom(),
            options: MapToMeshOptions::default(),
            metrics: StuccoMetrics::default(),
        }
    }

    #[must_use]
    pub fn with_options(options: MapToMeshOptions) -> Self {
        Self {
            options,
            ..Self::new()
        }
    }
}

impl Default for StuccoContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MapToMeshOutput {
    pub mesh: Mesh,
    pub diagnostics: MapToMeshDiagnostics,
}

/// Lists attributes present under the same name on both meshes, per domain.
///
/// Attributes the pipeline consumes itself are left out. Each entry gets the
/// default config for the input attribute's scalar type.
#[must_use]
pub fn query_common_attribs(map: &Map, input: &Mesh, defaults: &TypeDefaults) -> CommonAttribList {
    let mut list = CommonAttribList::default();
    for domain in Domain::ALL {
        let map_set = map.mesh().attribs(domain);
        let common = input
            .attribs(domain)
            .iter()
            .filter(|a| !a.usage().is_consumed())
            .filter(|a| map_set.get(a.name()).is_some_and(|m| !m.usage().is_consumed()))
            .map(|a| CommonAttrib::from_attrib(a, defaults.for_type(a.scalar())));
        list.domain_mut(domain).extend(common);
    }
    list
}

/// [`map_to_mesh`] with a default context and default blend configs.
pub fn map_to_mesh_with_defaults(map: &Map, input: &Mesh, w_scale: f64) -> Result<MapToMeshOutput, StuccoError> {
    let mut ctx = StuccoContext::new();
    let common = query_common_attribs(map, input, &TypeDefaults::default());
    map_to_mesh(&mut ctx, map, input, &common, w_scale)
}

/// Output of one worker job.
#[derive(Debug)]
struct JobOutput {
    faces: Vec<ScratchFace>,
    scope_verts: usize,
    boundary: BoundaryTable,
    counters: MapCounters,
    metrics: StuccoMetrics,
}

/// Projects `map` onto `input`.
///
/// Input faces are split into `ctx.options.worker_count` jobs. Each job clips
/// its faces against the map, finishes the fragments lying strictly inside
/// their input face and defers the rest. After all jobs complete the deferred
/// fragments are pooled, merged across input faces and everything is
/// assembled in a fixed order, so the output does not depend on the worker
/// count.
///
/// A map restricted with [`Map::with_material`] skips input faces of other
/// materials.
pub fn map_to_mesh(
    ctx: &mut StuccoContext,
    map: &Map,
    input: &Mesh,
    common: &CommonAttribList,
    w_scale: f64,
) -> Result<MapToMeshOutput, StuccoError> {
    ctx.options.validate()?;
    if !w_scale.is_finite() {
        return Err(StuccoError::InvalidConfig(format!("w_scale must be finite, got {w_scale}")));
    }
    common.validate()?;

    ctx.metrics.begin();
    let tolerance = ctx.tolerance;
    let prepared = ctx
        .metrics
        .time(TimingBucket::SpatialIndex, || PreparedInput::new(input, tolerance))?;
    let plan = AttribPlan::new(map.mesh(), input, common);
    let materializer = Materializer::new(map, &prepared, w_scale);
    let params = ClipParams {
        tolerance,
        max_corners: ctx.options.max_clip_corners,
        max_tiles: ctx.options.max_tiles,
    };

    let receive_len = ctx.options.receive_len;
    let worker_count = ctx.options.worker_count;
    let ranges = partition_faces(input.face_count(), worker_count);
    log::debug!(
        "map_to_mesh: {} input faces in {} jobs, {} map faces",
        input.face_count(),
        ranges.len(),
        map.mesh().face_count()
    );
    let results = run_jobs(&ranges, worker_count, |range| {
        run_range(range, map, &prepared, &materializer, params, tolerance)
    })?;

    let mut diagnostics = MapToMeshDiagnostics::new();
    diagnostics.worker_count = ranges.len();
    let mut faces = Vec::new();
    let mut scope_verts = 0;
    let mut tables = Vec::with_capacity(results.len());
    for job in results {
        diagnostics.counters.merge(&job.counters);
        ctx.metrics.merge(&job.metrics);
        faces.extend(job.faces);
        scope_verts += job.scope_verts;
        tables.push(job.boundary);
    }

    let mut merge_counters = MapCounters::default();
    let (merged, merged_verts) = ctx.metrics.time(TimingBucket::Merge, || {
        let pooled = pool_boundary_tables(tables);
        let cuts = CutEdges::new(&prepared, map, receive_len);
        let pieces = find_pieces(pooled, &cuts);
        merge_pieces(pieces, &materializer, &cuts, params, &mut merge_counters)
    })?;
    diagnostics.counters.merge(&merge_counters);
    faces.extend(merged);
    scope_verts += merged_verts;

    let assembled = ctx.metrics.time(TimingBucket::Assemble, || {
        assemble_output(faces, &plan, map, &prepared, tolerance)
    })?;
    diagnostics.counters.dropped_faces += assembled.dropped_faces;
    diagnostics.welded_vertex_count = scope_verts.saturating_sub(assembled.mesh.vert_count);
    let mut mesh = assembled.mesh;

    if let Some(weld_tol) = ctx.options.weld_tolerance {
        let (welded, report) = ctx
            .metrics
            .time(TimingBucket::Assemble, || weld_vertices(&mesh, weld_tol))
            .map_err(StuccoError::invalid_mesh(MeshRole::Output))?;
        diagnostics.welded_vertex_count += report.welded_verts;
        diagnostics.counters.dropped_faces += report.dropped_faces;
        mesh = welded;
    }

    diagnostics.vertex_count = mesh.vert_count;
    diagnostics.face_count = mesh.face_count();
    diagnostics.corner_count = mesh.corner_count();
    diagnostics.timing = ctx.metrics.end();
    if diagnostics.counters.unmerged_pieces > 0 {
        diagnostics.add_warning(format!(
            "{} boundary pieces did not close and were emitted per fragment",
            diagnostics.counters.unmerged_pieces
        ));
    }
    log::debug!("map_to_mesh: {}", diagnostics.summary());

    Ok(MapToMeshOutput { mesh, diagnostics })
}

#[allow(clippy::cast_possible_truncation)]
fn run_range(
    range: Range<usize>,
    map: &Map,
    prepared: &PreparedInput<'_>,
    materializer: &Materializer<'_>,
    params: ClipParams,
    tolerance: Tolerance,
) -> Result<JobOutput, StuccoError> {
    let mut counters = MapCounters::default();
    let mut metrics = StuccoMetrics::default();
    let mut scratch = ScratchMesh::new(tolerance);
    let mut boundary = BoundaryTable::new();

    for face in range.clone() {
        if !prepared.face_selected(face as u32, map.material()) {
            counters.masked_faces += 1;
            continue;
        }
        let fragments = metrics.time(TimingBucket::Clip, || {
            clip_input_face(map, prepared, face as u32, params, &mut counters)
        })?;
        metrics.time(TimingBucket::Materialize, || {
            for fragment in fragments {
                if fragment.is_boundary() {
                    counters.boundary_fragments += 1;
                    boundary.push(fragment);
                    continue;
                }
                match materializer.direct_face(&fragment, &mut counters) {
                    Some(face) => {
                        counters.direct_faces += 1;
                        scratch.push(face);
                    }
                    None => counters.dropped_faces += 1,
                }
            }
        });
    }

    log::debug!(
        "job {range:?}: {} direct faces, {} boundary fragments",
        counters.direct_faces,
        counters.boundary_fragments
    );
    Ok(JobOutput {
        scope_verts: scratch.vert_count(),
        faces: scratch.into_faces(),
        boundary,
        counters,
        metrics,
    })
}
