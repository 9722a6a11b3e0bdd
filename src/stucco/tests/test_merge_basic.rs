use crate::geom::primitives::{grid_map, grid_plane, square_map, uv_cylinder};
use crate::geom::{MapCounters, Mesh, Tolerance};
use crate::stucco::{
    BoundaryTable, ClipParams, CommonAttribList, CutEdges, DEFAULT_MAX_CLIP_CORNERS, DEFAULT_MAX_TILES, MERGED_SEQ_BASE, Map,
    MapToMeshOptions, MapToMeshOutput, Materializer, PreparedInput, StuccoContext, StuccoError, TypeDefaults,
    clip_input_face, map_to_mesh, merge_pieces, pool_boundary_tables, query_common_attribs,
};

const PARAMS: ClipParams = ClipParams {
    tolerance: Tolerance::DEFAULT,
    max_corners: DEFAULT_MAX_CLIP_CORNERS,
    max_tiles: DEFAULT_MAX_TILES,
};

fn run(map: Mesh, input: &Mesh, workers: usize) -> MapToMeshOutput {
    let map = Map::new(map).unwrap();
    let mut ctx = StuccoContext::with_options(MapToMeshOptions::default().with_worker_count(workers));
    let common = query_common_attribs(&map, input, &TypeDefaults::default());
    map_to_mesh(&mut ctx, &map, input, &common, 1.0).unwrap()
}

fn distinct_positions(mesh: &Mesh) -> usize {
    let mut keys: Vec<[i64; 3]> = mesh
        .positions()
        .unwrap()
        .iter()
        .map(|p| p.to_array().map(|x| (x * 1e6).round() as i64))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}

#[test]
fn split_map_face_merges_into_one_face() {
    let input = grid_plane(2, 1, 2.0, 1.0).unwrap();
    for workers in [1, 2] {
        let out = run(square_map(0.5).unwrap(), &input, workers);
        assert_eq!(out.mesh.face_count(), 1, "workers {workers}");
        assert_eq!(out.mesh.corner_count(), 6);
        assert_eq!(out.mesh.vert_count, 6);
        let counters = out.diagnostics.counters;
        assert_eq!(counters.boundary_fragments, 2);
        assert_eq!(counters.pieces, 1);
        assert_eq!(counters.merged_faces, 1);
        assert_eq!(counters.unmerged_pieces, 0);
        assert!(out.mesh.positions().unwrap().iter().all(|p| (p.z - 0.5).abs() < 1e-12));
    }
}

#[test]
fn interior_map_faces_take_the_direct_path() {
    let out = run(grid_map(4, 0.0).unwrap(), &grid_plane(1, 1, 1.0, 1.0).unwrap(), 1);
    let counters = out.diagnostics.counters;
    assert_eq!(counters.direct_faces, 4);
    assert_eq!(counters.boundary_fragments, 12);
    assert_eq!(counters.merged_faces, 0);
    assert_eq!(out.mesh.face_count(), 16);
    assert_eq!(out.mesh.vert_count, 25);
}

#[test]
fn seam_edges_stay_cut() {
    let input = uv_cylinder(4, 1, 1.0, 1.0).unwrap();

    let out = run(square_map(0.0).unwrap(), &input, 2);
    assert_eq!(out.mesh.face_count(), 1);
    assert_eq!(out.mesh.vert_count, 10);
    assert_eq!(distinct_positions(&out.mesh), 8);

    let out = run(grid_map(4, 0.0).unwrap(), &input, 3);
    assert_eq!(out.mesh.face_count(), 16);
    assert_eq!(out.mesh.vert_count, 25);
    assert_eq!(distinct_positions(&out.mesh), 20);
}

#[test]
fn pooled_tables_are_ordered_by_input_face() {
    let map = Map::new(square_map(0.0).unwrap()).unwrap();
    let input = grid_plane(3, 1, 3.0, 1.0).unwrap();
    let prepared = PreparedInput::new(&input, Tolerance::DEFAULT).unwrap();
    let params = PARAMS;
    let mut counters = MapCounters::default();
    let mut tables = vec![BoundaryTable::new(), BoundaryTable::new()];
    for (face, table) in [(2, 0), (0, 1), (1, 0)] {
        for fragment in clip_input_face(&map, &prepared, face, params, &mut counters).unwrap() {
            tables[table].push(fragment);
        }
    }
    assert_eq!(tables[0].input_faces(), vec![1, 2]);
    assert_eq!(tables[1].len(), 1);

    let pooled = pool_boundary_tables(tables);
    assert_eq!(pooled.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(pooled.values().all(|fragments| fragments.len() == 1));
}

#[test]
fn seam_pieces_displace_along_each_vertex_normal() {
    let input = uv_cylinder(4, 1, 1.0, 1.0).unwrap();
    let out = run(square_map(0.5).unwrap(), &input, 2);
    assert_eq!(out.mesh.face_count(), 1);
    assert_eq!(out.diagnostics.counters.merged_faces, 1);
    for p in out.mesh.positions().unwrap() {
        let radius = p.x.hypot(p.y);
        assert!((radius - 1.5).abs() < 1e-9, "radius {radius} at {p:?}");
    }
}

#[test]
fn unclosed_piece_falls_back_to_fragments() {
    let map = Map::new(square_map(0.0).unwrap()).unwrap();
    let input = grid_plane(1, 1, 1.0, 1.0).unwrap();
    let prepared = PreparedInput::new(&input, Tolerance::DEFAULT).unwrap();
    let materializer = Materializer::new(&map, &prepared, 1.0);
    let mut counters = MapCounters::default();
    let fragments = clip_input_face(&map, &prepared, 0, PARAMS, &mut counters).unwrap();
    assert_eq!(fragments.len(), 1);

    // The same outline twice gives every key two outgoing segments.
    let piece = vec![fragments[0].clone(), fragments[0].clone()];
    let cuts = CutEdges::new(&prepared, &map, None);
    let mut counters = MapCounters::default();
    let (faces, _) = merge_pieces(vec![piece], &materializer, &cuts, PARAMS, &mut counters).unwrap();
    assert_eq!(counters.pieces, 1);
    assert_eq!(counters.unmerged_pieces, 1);
    assert_eq!(counters.merged_faces, 0);
    assert_eq!(faces.len(), 2);
    for face in &faces {
        assert_eq!(face.corners.len(), 4);
        assert_eq!(face.input_face, 0);
        assert!(face.order.seq < MERGED_SEQ_BASE);
    }
}

#[test]
fn merged_outline_respects_corner_limit() {
    let map = Map::new(square_map(0.0).unwrap()).unwrap();
    let input = grid_plane(2, 1, 2.0, 1.0).unwrap();
    let options = MapToMeshOptions::default().with_worker_count(2).with_max_clip_corners(5);
    let mut ctx = StuccoContext::with_options(options);
    let err = map_to_mesh(&mut ctx, &map, &input, &CommonAttribList::default(), 1.0).unwrap_err();
    assert!(matches!(
        err,
        StuccoError::CapacityExceeded {
            what: "merged corners",
            face: 0,
            limit: 5,
        }
    ));

    let mut ctx = StuccoContext::with_options(options.with_max_clip_corners(6));
    let out = map_to_mesh(&mut ctx, &map, &input, &CommonAttribList::default(), 1.0).unwrap();
    assert_eq!(out.mesh.corner_count(), 6);
}
