use super::core::{Tolerance, Uv};
use super::polygon::orient2d;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriangulationError {
    #[error("polygon requires at least 3 corners, got {count}")]
    TooFewCorners { count: usize },
    #[error("polygon corners must be finite")]
    NonFinite,
    #[error("failed to triangulate polygon (no ears found)")]
    NoEars,
}

/// Triangles of a face polygon as local corner indices.
///
/// Triangles and quads use the fixed splits `(0,1,2)` / `(0,2,3)`; other convex
/// polygons use a fan from corner 0. Non-convex polygons are ear-clipped.
pub fn triangulate_face(points: &[Uv], convex: bool, tol: Tolerance) -> Result<Vec<[u32; 3]>, TriangulationError> {
    let n = points.len();
    if n < 3 {
        return Err(TriangulationError::TooFewCorners { count: n });
    }
    if convex || n == 3 {
        return Ok(fan(n));
    }
    earclip(points, tol)
}

/// Fan triangulation from corner 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fan(corner_count: usize) -> Vec<[u32; 3]> {
    (1..corner_count.saturating_sub(1))
        .map(|i| [0, i as u32, i as u32 + 1])
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Node {
    idx: u32,
    point: Uv,
    prev: usize,
    next: usize,
}

/// Ear-clips a simple polygon. Output triangles keep the input orientation.
#[allow(clippy::cast_possible_truncation)]
pub fn earclip(points: &[Uv], tol: Tolerance) -> Result<Vec<[u32; 3]>, TriangulationError> {
    let n = points.len();
    if n < 3 {
        return Err(TriangulationError::TooFewCorners { count: n });
    }
    if points.iter().any(|p| !p.is_finite()) {
        return Err(TriangulationError::NonFinite);
    }

    let mut nodes: Vec<Node> = points
        .iter()
        .enumerate()
        .map(|(i, &point)| Node {
            idx: i as u32,
            point,
            prev: (i + n - 1) % n,
            next: (i + 1) % n,
        })
        .collect();

    let is_ccw = super::polygon::signed_area(points) > 0.0;
    let mut remaining = n;
    let mut ear = 0usize;
    let mut stop = ear;
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining > 3 {
        let prev = nodes[ear].prev;
        let next = nodes[ear].next;
        if is_ear(prev, ear, next, &nodes, is_ccw, tol) {
            triangles.push([nodes[prev].idx, nodes[ear].idx, nodes[next].idx]);
            nodes[prev].next = next;
            nodes[next].prev = prev;
            remaining -= 1;
            ear = next;
            stop = next;
            continue;
        }

        ear = next;
        if ear == stop {
            return Err(TriangulationError::NoEars);
        }
    }

    let prev = nodes[ear].prev;
    let next = nodes[ear].next;
    triangles.push([nodes[prev].idx, nodes[ear].idx, nodes[next].idx]);
    Ok(triangles)
}

fn is_ear(prev: usize, ear: usize, next: usize, nodes: &[Node], is_ccw: bool, tol: Tolerance) -> bool {
    let a = nodes[prev].point;
    let b = nodes[ear].point;
    let c = nodes[next].point;

    let cross = orient2d(a, b, c);
    if (is_ccw && cross <= tol.eps) || (!is_ccw && cross >= -tol.eps) {
        return false;
    }

    let mut p = nodes[next].next;
    let mut guard = 0usize;
    while p != prev {
        guard += 1;
        if guard > nodes.len() {
            break;
        }
        if point_in_triangle(a, b, c, nodes[p].point, is_ccw, tol) {
            return false;
        }
        p = nodes[p].next;
    }

    true
}

fn point_in_triangle(a: Uv, b: Uv, c: Uv, p: Uv, is_ccw: bool, tol: Tolerance) -> bool {
    let ab = orient2d(a, b, p);
    let bc = orient2d(b, c, p);
    let ca = orient2d(c, a, p);

    if is_ccw {
        ab >= -tol.eps && bc >= -tol.eps && ca >= -tol.eps
    } else {
        ab <= tol.eps && bc <= tol.eps && ca <= tol.eps
    }
}
