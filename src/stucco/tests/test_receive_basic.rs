use crate::geom::primitives::{grid_plane, square_map};
use crate::geom::{Attrib, AttribUse, Domain, Mesh, ScalarType, Tile, Uv};
use crate::stucco::{
    CommonAttribList, Map, MapToMeshOptions, MapToMeshOutput, ReceiveEdges, ReceiveStatus, StuccoContext, map_to_mesh,
};

/// Two input faces side by side in uv, sharing one preserved edge.
fn preserved_pair() -> Mesh {
    let mut mesh = grid_plane(2, 1, 2.0, 1.0).unwrap();
    let mut values = vec![0i64; mesh.edge_count()];
    let interior = mesh.edge_corners().iter().position(|c| c.len() == 2).unwrap();
    values[interior] = 1;
    mesh.attribs_mut(Domain::Edge).insert(Attrib::int(
        "crease",
        ScalarType::I8,
        AttribUse::PreserveEdge,
        1,
        values,
    ));
    mesh
}

/// Unit square map whose edges receive as listed, in corner order.
fn receiving_square(per_corner: [bool; 4]) -> Map {
    let mut mesh = square_map(0.0).unwrap();
    let mut values = vec![0i64; mesh.edge_count()];
    for (corner, receive) in per_corner.into_iter().enumerate() {
        values[mesh.corner_edges[corner] as usize] = i64::from(receive);
    }
    mesh.attribs_mut(Domain::Edge).insert(Attrib::int(
        "receive",
        ScalarType::I8,
        AttribUse::Receive,
        1,
        values,
    ));
    Map::new(mesh).unwrap()
}

fn run(map: &Map, input: &Mesh, options: MapToMeshOptions) -> MapToMeshOutput {
    let mut ctx = StuccoContext::with_options(options.with_worker_count(2));
    map_to_mesh(&mut ctx, map, input, &CommonAttribList::default(), 1.0).unwrap()
}

#[test]
fn face_status_counts_receiving_edges() {
    let none = receiving_square([false; 4]);
    let some = receiving_square([true, false, false, false]);
    let all = receiving_square([true; 4]);
    let status = |map: &Map| ReceiveEdges::new(map, None).unwrap().face_status(map, 0);
    assert_eq!(status(&none), ReceiveStatus::None);
    assert_eq!(status(&some), ReceiveStatus::Some);
    assert_eq!(status(&all), ReceiveStatus::All);

    let plain = Map::new(square_map(0.0).unwrap()).unwrap();
    assert!(ReceiveEdges::new(&plain, None).is_none());
}

#[test]
fn receive_len_overrides_the_attribute() {
    let map = receiving_square([false; 4]);
    let long = ReceiveEdges::new(&map, Some(1.5)).unwrap();
    assert_eq!(long.face_status(&map, 0), ReceiveStatus::All);
    let short = ReceiveEdges::new(&map, Some(0.5)).unwrap();
    assert_eq!(short.face_status(&map, 0), ReceiveStatus::None);
}

#[test]
fn first_crossed_map_edge_decides() {
    let bottom = receiving_square([true, false, false, false]);
    let top = receiving_square([false, false, true, false]);
    let (a, b) = (Uv::new(0.5, -0.5), Uv::new(0.5, 0.5));
    let origin = Tile::new(0, 0);

    let edges = ReceiveEdges::new(&bottom, None).unwrap();
    assert!(edges.keeps_preserve(&bottom, 0, origin, a, b));
    let edges = ReceiveEdges::new(&top, None).unwrap();
    assert!(!edges.keeps_preserve(&top, 0, origin, a, b));
    // Nothing crossed: the segment stays cut.
    assert!(edges.keeps_preserve(&top, 0, origin, Uv::new(0.2, 0.2), Uv::new(0.8, 0.2)));
    // The same segment one tile over misses the shifted face.
    assert!(edges.keeps_preserve(&top, 0, Tile::new(1, 0), a, b));
}

#[test]
fn preserved_edges_cut_without_receive_data() {
    let map = Map::new(square_map(0.0).unwrap()).unwrap();
    let out = run(&map, &preserved_pair(), MapToMeshOptions::default());
    assert_eq!(out.mesh.face_count(), 2);
    assert_eq!(out.diagnostics.counters.merged_faces, 0);

    let plain = grid_plane(2, 1, 2.0, 1.0).unwrap();
    let out = run(&map, &plain, MapToMeshOptions::default());
    assert_eq!(out.mesh.face_count(), 1);
}

#[test]
fn receive_status_decides_preserved_edges() {
    let input = preserved_pair();
    let out = run(&receiving_square([true; 4]), &input, MapToMeshOptions::default());
    assert_eq!(out.mesh.face_count(), 2);

    let out = run(&receiving_square([false; 4]), &input, MapToMeshOptions::default());
    assert_eq!(out.mesh.face_count(), 1);
    assert_eq!(out.diagnostics.counters.merged_faces, 1);
}

#[test]
fn receive_len_applies_during_merging() {
    let map = Map::new(square_map(0.0).unwrap()).unwrap();
    let input = preserved_pair();
    let out = run(&map, &input, MapToMeshOptions::default().with_receive_len(Some(2.0)));
    assert_eq!(out.mesh.face_count(), 2);
    let out = run(&map, &input, MapToMeshOptions::default().with_receive_len(Some(0.5)));
    assert_eq!(out.mesh.face_count(), 1);
}
