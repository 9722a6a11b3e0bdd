//! Stitching polygon outlines that share edges into larger cycles.

use std::collections::BTreeMap;

/// Reference to corner `corner` of polygon `poly`.
pub type CornerRef = (usize, usize);

/// Joins polygons along their shared segments.
///
/// Each polygon contributes the directed segments `key[i] -> key[i + 1]`.
/// A segment for which `cancellable` returns true cancels out against one
/// cancellable segment running the opposite way. The remaining segments are
/// walked into closed cycles; each cycle lists the start corner of every
/// segment it uses.
///
/// Returns `None` when the remaining segments do not form clean cycles: a key
/// with more than one outgoing segment, or a walk that dead-ends.
pub fn stitch<K, F>(polys: &[Vec<K>], cancellable: F) -> Option<Vec<Vec<CornerRef>>>
where
    K: Ord + Copy,
    F: Fn(CornerRef) -> bool,
{
    let segment = |(p, i): CornerRef| {
        let poly = &polys[p];
        (poly[i], poly[(i + 1) % poly.len()])
    };

    let mut open: BTreeMap<(K, K), Vec<CornerRef>> = BTreeMap::new();
    let mut removed: Vec<CornerRef> = Vec::new();
    for (p, poly) in polys.iter().enumerate() {
        for i in 0..poly.len() {
            let corner = (p, i);
            if !cancellable(corner) {
                continue;
            }
            let (from, to) = segment(corner);
            if let Some(partners) = open.get_mut(&(to, from)) {
                if let Some(partner) = partners.pop() {
                    removed.push(partner);
                    removed.push(corner);
                    continue;
                }
            }
            open.entry((from, to)).or_default().push(corner);
        }
    }
    removed.sort_unstable();

    let mut outgoing: BTreeMap<K, CornerRef> = BTreeMap::new();
    let mut remaining = Vec::new();
    for (p, poly) in polys.iter().enumerate() {
        for i in 0..poly.len() {
            let corner = (p, i);
            if removed.binary_search(&corner).is_ok() {
                continue;
            }
            let (from, _) = segment(corner);
            if outgoing.insert(from, corner).is_some() {
                return None;
            }
            remaining.push(corner);
        }
    }

    let mut used: BTreeMap<CornerRef, bool> = remaining.iter().map(|&c| (c, false)).collect();
    let mut cycles = Vec::new();
    for &start in &remaining {
        if used.get(&start).copied().unwrap_or(true) {
            continue;
        }
        let mut cycle = Vec::new();
        let mut current = start;
        loop {
            match used.get_mut(&current) {
                Some(flag) if !*flag => *flag = true,
                _ => return None,
            }
            cycle.push(current);
            let (_, to) = segment(current);
            let next = *outgoing.get(&to)?;
            if next == start {
                break;
            }
            current = next;
        }
        cycles.push(cycle);
    }
    Some(cycles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_squares_join_along_shared_edge() {
        // 0-1-4-3 and 1-2-5-4 share 1-4 / 4-1.
        let polys = vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]];
        let cycles = stitch(&polys, |_| true).unwrap();
        assert_eq!(cycles.len(), 1);
        let keys: Vec<u32> = cycles[0].iter().map(|&(p, i)| polys[p][i]).collect();
        assert_eq!(keys, vec![0, 1, 2, 5, 4, 3]);
    }

    #[test]
    fn test_non_cancellable_edges_stay() {
        let polys = vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]];
        let cycles = stitch(&polys, |_| false);
        // Key 1 and key 4 each start two segments.
        assert!(cycles.is_none());
    }

    #[test]
    fn test_disjoint_polygons_stay_separate() {
        let polys = vec![vec![0, 1, 2], vec![10, 11, 12]];
        let cycles = stitch(&polys, |_| true).unwrap();
        assert_eq!(cycles, vec![vec![(0, 0), (0, 1), (0, 2)], vec![(1, 0), (1, 1), (1, 2)]]);
    }
}
