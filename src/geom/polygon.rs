//! Small UV polygon predicates shared by the clipper, merger and assembler.

use super::core::{Tolerance, Uv};

/// Orientation of a polygon in UV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    Ccw,
    Cw,
}

impl Winding {
    #[must_use]
    pub const fn is_ccw(self) -> bool {
        matches!(self, Self::Ccw)
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Ccw => Self::Cw,
            Self::Cw => Self::Ccw,
        }
    }
}

/// Twice the signed triangle area `abc`; positive for counter-clockwise.
#[must_use]
pub fn orient2d(a: Uv, b: Uv, c: Uv) -> f64 {
    (b - a).cross(c - a)
}

/// Shoelace signed area; positive for counter-clockwise polygons.
#[must_use]
pub fn signed_area(points: &[Uv]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        area += a.cross(b);
    }
    0.5 * area
}

/// Vertex average of a polygon.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(points: &[Uv]) -> Uv {
    if points.is_empty() {
        return Uv::ZERO;
    }
    let sum = points.iter().fold(Uv::ZERO, |acc, p| acc + *p);
    sum * (1.0 / points.len() as f64)
}

/// Winding from the lowest corner (by `u`, then `v`), which always lies on the
/// convex hull.
///
/// When the lowest corner's neighbours are exactly collinear with it, the next
/// lowest corner is tried. Returns `None` when every corner is collinear.
#[must_use]
pub fn face_winding(points: &[Uv]) -> Option<Winding> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .u
            .total_cmp(&points[b].u)
            .then(points[a].v.total_cmp(&points[b].v))
    });
    for &i in &order {
        let prev = points[(i + n - 1) % n];
        let next = points[(i + 1) % n];
        let turn = orient2d(prev, points[i], next);
        if turn > 0.0 {
            return Some(Winding::Ccw);
        }
        if turn < 0.0 {
            return Some(Winding::Cw);
        }
    }
    None
}

/// True when a counter-clockwise polygon has no reflex corner.
#[must_use]
pub fn is_convex_ccw(points: &[Uv], tol: Tolerance) -> bool {
    let n = points.len();
    (0..n).all(|i| {
        let prev = points[(i + n - 1) % n];
        let next = points[(i + 1) % n];
        orient2d(prev, points[i], next) >= -tol.eps
    })
}

/// Barycentric coordinates of `p` in triangle `abc`, or `None` for a degenerate triangle.
#[must_use]
pub fn barycentric(a: Uv, b: Uv, c: Uv, p: Uv) -> Option<[f64; 3]> {
    let area = orient2d(a, b, c);
    if area.abs() <= f64::MIN_POSITIVE {
        return None;
    }
    let wa = orient2d(b, c, p) / area;
    let wb = orient2d(c, a, p) / area;
    Some([wa, wb, 1.0 - wa - wb])
}

/// Parameter of the intersection of segment `p→q` with the infinite line `a→b`.
///
/// Returns `None` when the segment is parallel to the line within `tol`.
#[must_use]
pub fn segment_line_param(p: Uv, q: Uv, a: Uv, b: Uv, tol: Tolerance) -> Option<f64> {
    let dir = b - a;
    let normal = dir.perp();
    let dp = normal.dot(p - a);
    let dq = normal.dot(q - a);
    let denom = dp - dq;
    if denom.abs() <= tol.eps {
        return None;
    }
    Some(dp / denom)
}

/// Parameter of the orthogonal projection of `p` onto segment `a→b`, clamped to `[0, 1]`.
#[must_use]
pub fn project_param(p: Uv, a: Uv, b: Uv) -> f64 {
    let dir = b - a;
    let len2 = dir.length_squared();
    if len2 <= f64::MIN_POSITIVE {
        return 0.0;
    }
    ((p - a).dot(dir) / len2).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Uv> {
        vec![
            Uv::new(0.0, 0.0),
            Uv::new(1.0, 0.0),
            Uv::new(1.0, 1.0),
            Uv::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_signed_area_and_winding() {
        let mut sq = square();
        assert!((signed_area(&sq) - 1.0).abs() < 1e-12);
        assert_eq!(face_winding(&sq), Some(Winding::Ccw));
        sq.reverse();
        assert!((signed_area(&sq) + 1.0).abs() < 1e-12);
        assert_eq!(face_winding(&sq), Some(Winding::Cw));
    }

    #[test]
    fn test_winding_skips_collinear_lowest_corner() {
        // The two lowest corners coincide, so both give a zero turn.
        let pts = vec![
            Uv::new(0.0, 0.0),
            Uv::new(0.0, 0.0),
            Uv::new(1.0, 0.0),
            Uv::new(1.0, 1.0),
        ];
        assert_eq!(face_winding(&pts), Some(Winding::Ccw));
    }

    #[test]
    fn test_collinear_polygon_has_no_winding() {
        let pts = vec![Uv::new(0.0, 0.0), Uv::new(1.0, 1.0), Uv::new(2.0, 2.0)];
        assert_eq!(face_winding(&pts), None);
    }

    #[test]
    fn test_convexity() {
        let tol = Tolerance::default_geom();
        assert!(is_convex_ccw(&square(), tol));
        let arrow = vec![
            Uv::new(0.0, 0.0),
            Uv::new(2.0, 0.0),
            Uv::new(1.0, 0.5),
            Uv::new(2.0, 2.0),
            Uv::new(0.0, 2.0),
        ];
        assert!(!is_convex_ccw(&arrow, tol));
    }

    #[test]
    fn test_barycentric_reproduces_point() {
        let (a, b, c) = (Uv::new(0.0, 0.0), Uv::new(2.0, 0.0), Uv::new(0.0, 2.0));
        let p = Uv::new(0.5, 0.5);
        let w = barycentric(a, b, c, p).expect("valid triangle");
        let back = a * w[0] + b * w[1] + c * w[2];
        assert!(Tolerance::default_geom().approx_eq_uv(back, p));
    }

    #[test]
    fn test_segment_line_param_parallel_is_none() {
        let tol = Tolerance::ZERO_LENGTH;
        let t = segment_line_param(
            Uv::new(0.0, -1.0),
            Uv::new(0.0, 1.0),
            Uv::new(-1.0, 0.0),
            Uv::new(1.0, 0.0),
            tol,
        );
        assert_eq!(t, Some(0.5));
        let parallel = segment_line_param(
            Uv::new(0.0, 1.0),
            Uv::new(1.0, 1.0),
            Uv::new(-1.0, 0.0),
            Uv::new(1.0, 0.0),
            tol,
        );
        assert_eq!(parallel, None);
    }
}
