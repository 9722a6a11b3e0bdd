use crate::geom::primitives::{grid_plane, uv_cylinder};
use crate::geom::{
    Attrib, AttribUse, Domain, Mesh, MeshBuilder, MeshError, Point3, Tolerance, Vec3, corner_normals,
    corner_tangents, edge_flags, weld_uv_verts, weld_vertices,
};

fn unit_square_points() -> Vec<Point3> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ]
}

#[test]
fn builder_shares_interior_edges() {
    let mesh = grid_plane(2, 1, 2.0, 1.0).unwrap();
    assert_eq!(mesh.face_count(), 2);
    assert_eq!(mesh.corner_count(), 8);
    assert_eq!(mesh.vert_count, 6);
    assert_eq!(mesh.edge_count(), 7);
    mesh.validate().expect("grid validates");
}

#[test]
fn builder_never_shares_an_edge_between_three_faces() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.5, 1.0, 0.0),
        Point3::new(0.5, -1.0, 0.0),
        Point3::new(0.5, 0.0, 1.0),
    ];
    let mesh = Mesh::from_polygons(&points, &[vec![0, 1, 2], vec![1, 0, 3], vec![0, 1, 4]]).unwrap();
    let fan_edges = mesh
        .edge_verts
        .iter()
        .filter(|e| (e[0].min(e[1]), e[0].max(e[1])) == (0, 1))
        .count();
    assert_eq!(fan_edges, 2);
    assert!(mesh.edge_corners().iter().all(|c| c.len() <= 2));
}

#[test]
fn builder_rejects_small_faces_and_bad_vertices() {
    let mut builder = MeshBuilder::with_positions(&unit_square_points());
    assert_eq!(
        builder.add_face(&[0, 1]),
        Err(MeshError::FaceTooSmall { face: 0, corners: 2 })
    );
    assert!(matches!(
        builder.add_face(&[0, 1, 9]),
        Err(MeshError::CornerVertOutOfRange { vert: 9, .. })
    ));
}

#[test]
fn validate_reports_attribute_length_mismatch() {
    let mut mesh = Mesh::from_polygons(&unit_square_points(), &[vec![0, 1, 2, 3]]).unwrap();
    mesh.attribs_mut(Domain::Corner)
        .insert(Attrib::float("uv", AttribUse::Uv, 2, vec![0.0; 6]));
    assert!(matches!(
        mesh.validate(),
        Err(MeshError::AttribLength { domain: Domain::Corner, expected: 4, actual: 3, .. })
    ));
}

#[test]
fn validate_reports_non_finite_positions() {
    let mut points = unit_square_points();
    points[2].z = f64::NAN;
    let err = Mesh::from_polygons(&points, &[vec![0, 1, 2, 3]]).unwrap_err();
    assert!(matches!(err, MeshError::NonFinite { domain: Domain::Vert, elem: 2, .. }));
}

#[test]
fn validate_reports_corner_out_of_range() {
    let mut mesh = Mesh::from_polygons(&unit_square_points(), &[vec![0, 1, 2, 3]]).unwrap();
    mesh.corner_verts[1] = 7;
    assert!(matches!(
        mesh.validate(),
        Err(MeshError::CornerVertOutOfRange { corner: 1, vert: 7, .. })
    ));
}

#[test]
fn cylinder_seam_edges_are_cut() {
    let mesh = uv_cylinder(6, 2, 1.0, 2.0).unwrap();
    let uvs = mesh.corner_uvs().unwrap();
    let uv_verts = weld_uv_verts(&mesh, &uvs);
    // One extra UV column along the seam.
    assert_eq!(uv_verts.len(), mesh.vert_count + 3);

    let flags = edge_flags(&mesh, &uv_verts);
    let seams = flags.iter().filter(|f| f.seam).count();
    let boundaries = flags.iter().filter(|f| f.boundary).count();
    assert_eq!(seams, 2);
    assert_eq!(boundaries, 12);
    assert_eq!(flags.iter().filter(|f| !f.is_cut()).count(), mesh.edge_count() - 14);
}

#[test]
fn preserve_edge_attribute_marks_cut() {
    let mut mesh = grid_plane(2, 1, 2.0, 1.0).unwrap();
    let mut values = vec![0i64; mesh.edge_count()];
    let interior = mesh.edge_corners().iter().position(|c| c.len() == 2).unwrap();
    values[interior] = 1;
    mesh.attribs_mut(Domain::Edge).insert(Attrib::int(
        "crease",
        crate::geom::ScalarType::I8,
        AttribUse::PreserveEdge,
        1,
        values,
    ));
    let uv_verts = weld_uv_verts(&mesh, &mesh.corner_uvs().unwrap());
    let flags = edge_flags(&mesh, &uv_verts);
    assert!(flags[interior].preserve);
    assert!(!flags[interior].seam);
    assert!(flags.iter().all(|f| f.is_cut()));
}

#[test]
fn flat_plane_frames_follow_uv_axes() {
    let mesh = grid_plane(1, 1, 2.0, 1.0).unwrap();
    let positions = mesh.positions().unwrap();
    let uvs = mesh.corner_uvs().unwrap();
    let normals = corner_normals(&mesh, &positions);
    let (tangents, signs) = corner_tangents(&mesh, &positions, &uvs, &normals);
    let tol = Tolerance::LOOSE;
    for c in 0..mesh.corner_count() {
        assert!(tol.approx_eq_f64(normals[c].dot(Vec3::Z), 1.0));
        assert!(tol.approx_eq_f64(tangents[c].dot(Vec3::X), 1.0));
        assert_eq!(signs[c], 1.0);
    }
}

#[test]
fn weld_merges_coincident_vertices() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(2.0, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
    ];
    let mesh = Mesh::from_polygons(&points, &[vec![0, 1, 2, 3], vec![4, 5, 6, 7]]).unwrap();
    assert_eq!(mesh.edge_count(), 8);

    let (welded, report) = weld_vertices(&mesh, Tolerance::WELD).unwrap();
    assert_eq!(report.welded_verts, 2);
    assert_eq!(report.dropped_faces, 0);
    assert_eq!(welded.vert_count, 6);
    assert_eq!(welded.edge_count(), 7);
    welded.validate().unwrap();
}

#[test]
fn weld_drops_collapsed_faces() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
    ];
    let mesh = Mesh::from_polygons(&points, &[vec![0, 1, 2]]).unwrap();
    let (welded, report) = weld_vertices(&mesh, Tolerance::WELD).unwrap();
    assert_eq!(report.dropped_faces, 1);
    assert_eq!(welded.face_count(), 0);
}

#[test]
fn append_offsets_topology_and_fills_missing_attribs() {
    let mut a = grid_plane(1, 1, 1.0, 1.0).unwrap();
    let mut b = grid_plane(2, 1, 2.0, 1.0).unwrap();
    b.attribs_mut(Domain::Face)
        .insert(Attrib::float("tag", AttribUse::Scalar, 1, vec![3.0, 4.0]));
    a.attribs_mut(Domain::Mesh)
        .insert(Attrib::float("origin", AttribUse::Misc, 1, vec![1.0]));
    b.attribs_mut(Domain::Mesh)
        .insert(Attrib::float("origin", AttribUse::Misc, 1, vec![2.0]));

    a.append(&b);
    a.validate().expect("appended mesh validates");
    assert_eq!(a.face_count(), 3);
    assert_eq!(a.vert_count, 10);
    assert_eq!(a.edge_count(), 11);
    assert_eq!(a.face(1).start, 4);
    assert_eq!(a.corner_verts[4], 4);
    assert!(a.corner_edges[4..].iter().all(|&e| e >= 4));

    let tag = a.attribs(Domain::Face).get("tag").unwrap();
    assert_eq!((0..3).map(|f| tag.component(f, 0)).collect::<Vec<_>>(), vec![0.0, 3.0, 4.0]);
    let origin = a.attribs(Domain::Mesh).get("origin").unwrap();
    assert_eq!(origin.len(), 1);
    assert_eq!(origin.component(0, 0), 1.0);
    let positions = a.positions().unwrap();
    assert_eq!(positions[9], Point3::new(2.0, 1.0, 0.0));
}
