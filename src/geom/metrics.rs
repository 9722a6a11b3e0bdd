//! Opt-in timing hooks and always-on counters for the map-to-mesh pipeline.
//!
//! Timing is only collected when the `stucco_metrics` feature is enabled. When
//! disabled, [`StuccoMetrics::time`] simply runs the closure and
//! [`StuccoMetrics::end`] returns `None`.
//!
//! [`MapCounters`] are plain counters owned by each worker and summed after the
//! barrier, so they are available in every build.
//!
//! # Usage
//!
//! ```ignore
//! use stucco_engine::geom::{StuccoMetrics, TimingBucket};
//!
//! let mut metrics = StuccoMetrics::default();
//! metrics.begin();
//! let fragments = metrics.time(TimingBucket::Clip, || clip_everything());
//! if let Some(report) = metrics.end() {
//!     println!("clip: {} ns", report.clip_ns);
//! }
//! ```

/// Pipeline phases that accumulate time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Quadtree build and input preparation.
    SpatialIndex,
    /// Worker jobs: candidate queries and clipping.
    Clip,
    /// Corner materialization and attribute blending.
    Materialize,
    /// Boundary pooling and piece merging.
    Merge,
    /// Final ordering, welding and attribute writes.
    Assemble,
}

/// Cumulative nanoseconds per [`TimingBucket`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StuccoTimingReport {
    pub spatial_index_ns: u64,
    pub clip_ns: u64,
    pub materialize_ns: u64,
    pub merge_ns: u64,
    pub assemble_ns: u64,
}

impl StuccoTimingReport {
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.spatial_index_ns
            .saturating_add(self.clip_ns)
            .saturating_add(self.materialize_ns)
            .saturating_add(self.merge_ns)
            .saturating_add(self.assemble_ns)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }
}

/// Accumulator for timing pipeline phases.
#[derive(Debug, Default, Clone)]
pub struct StuccoMetrics {
    #[cfg(feature = "stucco_metrics")]
    report: StuccoTimingReport,
}

impl StuccoMetrics {
    /// Resets all timing counters to zero.
    pub fn begin(&mut self) {
        #[cfg(feature = "stucco_metrics")]
        {
            self.report = StuccoTimingReport::default();
        }
    }

    /// Returns the accumulated report, or `None` when metrics are disabled.
    #[must_use]
    pub fn end(&self) -> Option<StuccoTimingReport> {
        #[cfg(feature = "stucco_metrics")]
        {
            Some(self.report.clone())
        }
        #[cfg(not(feature = "stucco_metrics"))]
        {
            None
        }
    }

    /// Times `f` and adds the elapsed time to `bucket`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(feature = "stucco_metrics")]
        {
            let start = std::time::Instant::now();
            let result = f();
            #[allow(clippy::cast_possible_truncation)]
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            self.add_to_bucket(bucket, nanos);
            result
        }

        #[cfg(not(feature = "stucco_metrics"))]
        {
            let _ = bucket;
            f()
        }
    }

    /// Adds the buckets of `other`, such as the metrics of one worker job.
    pub fn merge(&mut self, other: &Self) {
        #[cfg(feature = "stucco_metrics")]
        {
            let r = &other.report;
            self.add_to_bucket(TimingBucket::SpatialIndex, r.spatial_index_ns);
            self.add_to_bucket(TimingBucket::Clip, r.clip_ns);
            self.add_to_bucket(TimingBucket::Materialize, r.materialize_ns);
            self.add_to_bucket(TimingBucket::Merge, r.merge_ns);
            self.add_to_bucket(TimingBucket::Assemble, r.assemble_ns);
        }

        #[cfg(not(feature = "stucco_metrics"))]
        {
            let _ = other;
        }
    }

    #[cfg(feature = "stucco_metrics")]
    fn add_to_bucket(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = match bucket {
            TimingBucket::SpatialIndex => &mut self.report.spatial_index_ns,
            TimingBucket::Clip => &mut self.report.clip_ns,
            TimingBucket::Materialize => &mut self.report.materialize_ns,
            TimingBucket::Merge => &mut self.report.merge_ns,
            TimingBucket::Assemble => &mut self.report.assemble_ns,
        };
        *slot = slot.saturating_add(nanos);
    }
}

/// Work counters collected per worker and summed after the barrier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapCounters {
    /// Input faces examined.
    pub faces_visited: usize,
    /// Input faces skipped because their material does not match the map's.
    pub masked_faces: usize,
    /// Candidates returned by the spatial index.
    pub candidates: usize,
    /// Candidates rejected by the translated bounding-box test.
    pub box_rejects: usize,
    /// Exact polygon clips performed.
    pub clips: usize,
    /// Map or input faces skipped as degenerate.
    pub degenerate_faces: usize,
    /// Islands produced by clipping.
    pub islands: usize,
    /// Fragments emitted directly, without merging.
    pub direct_faces: usize,
    /// Fragments deferred to the boundary merger.
    pub boundary_fragments: usize,
    /// Connected pieces found by the merger.
    pub pieces: usize,
    /// Faces produced by merging pieces.
    pub merged_faces: usize,
    /// Pieces whose outline could not be walked and were emitted fragment by fragment.
    pub unmerged_pieces: usize,
    /// Finished faces dropped for having fewer than 3 corners.
    pub dropped_faces: usize,
    /// Corners whose base position came from a sample grid.
    pub usg_overrides: usize,
}

impl MapCounters {
    pub fn merge(&mut self, other: &Self) {
        self.faces_visited += other.faces_visited;
        self.masked_faces += other.masked_faces;
        self.candidates += other.candidates;
        self.box_rejects += other.box_rejects;
        self.clips += other.clips;
        self.degenerate_faces += other.degenerate_faces;
        self.islands += other.islands;
        self.direct_faces += other.direct_faces;
        self.boundary_fragments += other.boundary_fragments;
        self.pieces += other.pieces;
        self.merged_faces += other.merged_faces;
        self.unmerged_pieces += other.unmerged_pieces;
        self.dropped_faces += other.dropped_faces;
        self.usg_overrides += other.usg_overrides;
    }
}
