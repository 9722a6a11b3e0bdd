use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::stucco::{StuccoError, partition_faces, run_jobs};

#[test]
fn partition_splits_evenly() {
    assert_eq!(partition_faces(10, 3), vec![0..4, 4..7, 7..10]);
    assert_eq!(partition_faces(8, 4), vec![0..2, 2..4, 4..6, 6..8]);
}

#[test]
fn partition_small_inputs() {
    assert!(partition_faces(0, 4).is_empty());
    assert_eq!(partition_faces(2, 4), vec![0..2]);
    assert_eq!(partition_faces(5, 1), vec![0..5]);
    assert_eq!(partition_faces(5, 0), vec![0..5]);
}

#[test]
fn random_partitions_cover_every_face_once() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let faces = rng.random_range(1..400usize);
        let workers = rng.random_range(1..24usize);
        let ranges = partition_faces(faces, workers);

        let expected_jobs = if faces < workers { 1 } else { workers };
        assert_eq!(ranges.len(), expected_jobs, "{faces} faces, {workers} workers");
        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        assert_eq!(ranges.last().map(|r| r.end), Some(faces));
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let sizes: Vec<usize> = ranges.iter().map(ExactSizeIterator::len).collect();
        let min = sizes.iter().min().copied().unwrap_or(0);
        let max = sizes.iter().max().copied().unwrap_or(0);
        assert!(max - min <= 1, "uneven sizes {sizes:?}");
        assert!(min > 0);
    }
}

#[test]
fn jobs_return_in_range_order() {
    let ranges = partition_faces(100, 7);
    let sums = run_jobs(&ranges, 7, |range: Range<usize>| Ok(range.sum::<usize>())).unwrap();
    assert_eq!(sums.len(), 7);
    assert_eq!(sums.iter().sum::<usize>(), (0..100).sum::<usize>());
    let expected: Vec<usize> = ranges.iter().cloned().map(Iterator::sum).collect();
    assert_eq!(sums, expected);
}

#[test]
fn lowest_failing_job_is_reported() {
    let ranges = partition_faces(9, 3);
    let err = run_jobs(&ranges, 3, |range: Range<usize>| {
        if range.start >= 3 {
            Err(StuccoError::InvalidConfig(format!("range at {}", range.start)))
        } else {
            Ok(range.len())
        }
    })
    .unwrap_err();
    match err {
        StuccoError::Worker { range, source } => {
            assert_eq!(range, 3..6);
            assert!(matches!(*source, StuccoError::InvalidConfig(ref msg) if msg == "range at 3"));
        }
        other => panic!("unexpected error {other}"),
    }
}
