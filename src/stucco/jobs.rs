//! Splitting input faces into contiguous worker ranges and running them.

use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::error::StuccoError;

/// Splits `0..face_count` into at most `worker_count` contiguous ranges.
///
/// Range sizes differ by at most one. When there are fewer faces than
/// workers a single range covers everything; no faces yields no ranges.
#[must_use]
pub fn partition_faces(face_count: usize, worker_count: usize) -> Vec<Range<usize>> {
    if face_count == 0 {
        return Vec::new();
    }
    if worker_count <= 1 || face_count < worker_count {
        return vec![0..face_count];
    }
    let base = face_count / worker_count;
    let extra = face_count % worker_count;
    let mut ranges = Vec::with_capacity(worker_count);
    let mut start = 0;
    for i in 0..worker_count {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Runs `job` once per range and blocks until all are done.
///
/// Results come back in range order. If any job fails, the error of the
/// lowest failing range is returned wrapped in [`StuccoError::Worker`] and
/// every other result is dropped.
pub fn run_jobs<T, F>(ranges: &[Range<usize>], worker_count: usize, job: F) -> Result<Vec<T>, StuccoError>
where
    T: Send,
    F: Fn(Range<usize>) -> Result<T, StuccoError> + Sync,
{
    let results = dispatch(ranges, worker_count, &job)?;
    let mut out = Vec::with_capacity(results.len());
    for (range, result) in ranges.iter().zip(results) {
        match result {
            Ok(value) => out.push(value),
            Err(source) => {
                log::warn!("job over input faces {range:?} failed: {source}");
                return Err(StuccoError::Worker {
                    range: range.clone(),
                    source: Box::new(source),
                });
            }
        }
    }
    Ok(out)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallel")] {
        fn dispatch<T, F>(
            ranges: &[Range<usize>],
            worker_count: usize,
            job: &F,
        ) -> Result<Vec<Result<T, StuccoError>>, StuccoError>
        where
            T: Send,
            F: Fn(Range<usize>) -> Result<T, StuccoError> + Sync,
        {
            if ranges.len() <= 1 {
                return Ok(ranges.iter().cloned().map(job).collect());
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(worker_count.max(1))
                .build()
                .map_err(|err| StuccoError::WorkerPool(err.to_string()))?;
            Ok(pool.install(|| ranges.par_iter().cloned().map(job).collect()))
        }
    } else {
        fn dispatch<T, F>(
            ranges: &[Range<usize>],
            _worker_count: usize,
            job: &F,
        ) -> Result<Vec<Result<T, StuccoError>>, StuccoError>
        where
            T: Send,
            F: Fn(Range<usize>) -> Result<T, StuccoError> + Sync,
        {
            Ok(ranges.iter().cloned().map(job).collect())
        }
    }
}
