use crate::geom::{Tolerance, TriangulationError, Uv, earclip, fan, signed_area, triangulate_face};

fn triangle_area_sum(points: &[Uv], tris: &[[u32; 3]]) -> f64 {
    tris.iter()
        .map(|t| signed_area(&[points[t[0] as usize], points[t[1] as usize], points[t[2] as usize]]))
        .sum()
}

#[test]
fn quad_uses_fixed_split() {
    assert_eq!(fan(4), vec![[0, 1, 2], [0, 2, 3]]);
    let quad = [Uv::new(0.0, 0.0), Uv::new(1.0, 0.0), Uv::new(1.0, 1.0), Uv::new(0.0, 1.0)];
    let tris = triangulate_face(&quad, true, Tolerance::default_geom()).unwrap();
    assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
}

#[test]
fn earclip_concave_polygon_preserves_area() {
    let arrow = [
        Uv::new(0.0, 0.0),
        Uv::new(2.0, 0.0),
        Uv::new(1.0, 0.5),
        Uv::new(2.0, 2.0),
        Uv::new(0.0, 2.0),
    ];
    let tris = earclip(&arrow, Tolerance::default_geom()).unwrap();
    assert_eq!(tris.len(), 3);
    assert!((triangle_area_sum(&arrow, &tris) - signed_area(&arrow)).abs() < 1e-12);
    for t in &tris {
        let area = signed_area(&[arrow[t[0] as usize], arrow[t[1] as usize], arrow[t[2] as usize]]);
        assert!(area > 0.0);
    }
}

#[test]
fn earclip_keeps_clockwise_orientation() {
    let mut arrow = vec![
        Uv::new(0.0, 0.0),
        Uv::new(2.0, 0.0),
        Uv::new(1.0, 0.5),
        Uv::new(2.0, 2.0),
        Uv::new(0.0, 2.0),
    ];
    arrow.reverse();
    let tris = earclip(&arrow, Tolerance::default_geom()).unwrap();
    assert!((triangle_area_sum(&arrow, &tris) - signed_area(&arrow)).abs() < 1e-12);
}

#[test]
fn rejects_degenerate_input() {
    let tol = Tolerance::default_geom();
    assert_eq!(
        triangulate_face(&[Uv::new(0.0, 0.0), Uv::new(1.0, 0.0)], false, tol),
        Err(TriangulationError::TooFewCorners { count: 2 })
    );
    let bad = [Uv::new(0.0, 0.0), Uv::new(f64::NAN, 0.0), Uv::new(1.0, 1.0), Uv::new(0.0, 1.0)];
    assert_eq!(earclip(&bad, tol), Err(TriangulationError::NonFinite));
}
