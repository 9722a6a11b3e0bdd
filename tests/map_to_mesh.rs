use std::fmt::Write as _;
use std::sync::Arc;

use stucco_engine::geom::primitives::{brick_map, grid_map, grid_plane, map_mesh, panel_map, square_map, uv_cylinder};
use stucco_engine::geom::{
    Attrib, AttribUse, Domain, IndexedAttrib, IndexedAttribSet, Mesh, MeshBuilder, MeshError, Point3, ScalarType, Tolerance,
    UvBox, Vec3,
};
use stucco_engine::stucco::{
    BlendConfig, BlendConfigError, BlendMode, CommonAttribList, DEFAULT_MAX_TILES, Map, MapArrayEntry, MapToMeshOptions,
    MapToMeshOutput, MeshRole, PlanarSampleGrid, StuccoContext, StuccoError, TypeDefaults, map_array_to_mesh, map_to_mesh,
    map_to_mesh_with_defaults, query_common_attribs,
};

const SNAPSHOT_QUANTIZE: f64 = 1e-6;
const SNAPSHOT_DECIMALS: usize = 6;

fn quantize_f64(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let value = if value == -0.0 { 0.0 } else { value };
    let q = (value / SNAPSHOT_QUANTIZE).round() * SNAPSHOT_QUANTIZE;
    if q == -0.0 { 0.0 } else { q }
}

fn write_f64(out: &mut String, value: f64) {
    let value = quantize_f64(value);
    let _ = write!(out, "{value:.SNAPSHOT_DECIMALS$}");
}

fn write_vec3_line(out: &mut String, prefix: &str, v: [f64; 3]) {
    let _ = write!(out, "{prefix} ");
    write_f64(out, v[0]);
    out.push(' ');
    write_f64(out, v[1]);
    out.push(' ');
    write_f64(out, v[2]);
    out.push('\n');
}

fn write_vec2_line(out: &mut String, prefix: &str, v: [f64; 2]) {
    let _ = write!(out, "{prefix} ");
    write_f64(out, v[0]);
    out.push(' ');
    write_f64(out, v[1]);
    out.push('\n');
}

fn snapshot_mesh(mesh: &Mesh) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "verts {}", mesh.vert_count);
    let _ = writeln!(out, "faces {}", mesh.face_count());
    for p in mesh.positions().unwrap() {
        write_vec3_line(&mut out, "v", p.to_array());
    }
    for range in mesh.faces() {
        let verts: Vec<String> = range.corners().map(|c| mesh.corner_verts[c].to_string()).collect();
        let _ = writeln!(out, "f {}", verts.join(" "));
    }
    let normals = mesh.attribs(Domain::Corner).get("normal").unwrap();
    for c in 0..mesh.corner_count() {
        let n = normals.value(c);
        write_vec3_line(&mut out, "vn", [n.get(0), n.get(1), n.get(2)]);
    }
    if let Some(uv) = mesh.attribs(Domain::Corner).get("uv") {
        for c in 0..mesh.corner_count() {
            write_vec2_line(&mut out, "vt", [uv.component(c, 0), uv.component(c, 1)]);
        }
    }
    out
}

fn run_with(map: &Map, input: &Mesh, common: &CommonAttribList, workers: usize, w_scale: f64) -> MapToMeshOutput {
    let mut ctx = StuccoContext::with_options(MapToMeshOptions::default().with_worker_count(workers));
    map_to_mesh(&mut ctx, map, input, common, w_scale).unwrap()
}

fn run(map: &Map, input: &Mesh, workers: usize) -> MapToMeshOutput {
    let common = query_common_attribs(map, input, &TypeDefaults::default());
    run_with(map, input, &common, workers, 1.0)
}

fn unit_plane() -> Mesh {
    grid_plane(1, 1, 1.0, 1.0).unwrap()
}

fn with_attrib(mut mesh: Mesh, domain: Domain, attrib: Attrib) -> Mesh {
    mesh.attribs_mut(domain).insert(attrib);
    mesh
}

fn all_z(mesh: &Mesh, z: f64) -> bool {
    mesh.positions().unwrap().iter().all(|p| (p.z - z).abs() < 1e-9)
}

fn face_points(mesh: &Mesh, positions: &[Point3], face: usize) -> Vec<Point3> {
    mesh.face(face)
        .corners()
        .map(|c| positions[mesh.corner_verts[c] as usize])
        .collect()
}

fn xy_area(points: &[Point3]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

#[test]
fn flat_map_lifts_the_plane() {
    let map = Map::new(square_map(0.5).unwrap()).unwrap();
    let input = unit_plane();
    let out = run(&map, &input, 1);
    assert_eq!(out.mesh.face_count(), 1);
    assert_eq!(out.mesh.vert_count, 4);
    assert!(all_z(&out.mesh, 0.5));
    assert!(out.diagnostics.is_clean());
    assert_eq!(out.diagnostics.face_count, 1);
    assert_eq!(out.diagnostics.vertex_count, 4);

    let defaults = map_to_mesh_with_defaults(&map, &input, 1.0).unwrap();
    assert_eq!(snapshot_mesh(&defaults.mesh), snapshot_mesh(&out.mesh));
}

#[test]
fn map_outside_the_tile_produces_nothing() {
    let far = map_mesh(
        &[[5.0, 5.0, 1.0], [6.0, 5.0, 1.0], [6.0, 6.0, 1.0], [5.0, 6.0, 1.0]],
        &[vec![0, 1, 2, 3]],
    )
    .unwrap();
    let map = Map::new(far).unwrap();
    let out = run(&map, &unit_plane(), 2);
    assert_eq!(out.mesh.face_count(), 0);
    assert_eq!(out.mesh.vert_count, 0);
    assert_eq!(out.diagnostics.counters.candidates, 0);
    assert_eq!(out.diagnostics.counters.clips, 0);
}

#[test]
fn map_face_split_across_workers_is_rejoined() {
    let map = Map::new(square_map(0.25).unwrap()).unwrap();
    let input = grid_plane(2, 1, 2.0, 1.0).unwrap();
    let out = run(&map, &input, 2);
    assert_eq!(out.diagnostics.worker_count, 2);
    assert_eq!(out.mesh.face_count(), 1);
    let range = out.mesh.face(0);
    let mut verts: Vec<u32> = range.corners().map(|c| out.mesh.corner_verts[c]).collect();
    verts.sort_unstable();
    verts.dedup();
    assert_eq!(verts.len(), range.len());
    assert!(all_z(&out.mesh, 0.25));
}

#[test]
fn output_does_not_depend_on_worker_count() {
    let input = grid_plane(4, 4, 4.0, 1.0).unwrap();
    for map in [
        grid_map(3, 0.2).unwrap(),
        panel_map(0.2, 0.1).unwrap(),
        brick_map(0.05).unwrap(),
    ] {
        let map = Map::new(map).unwrap();
        let reference = snapshot_mesh(&run(&map, &input, 1).mesh);
        for workers in 2..=16 {
            let snapshot = snapshot_mesh(&run(&map, &input, workers).mesh);
            assert_eq!(snapshot, reference, "workers {workers}");
        }
    }
}

#[test]
fn flat_output_covers_the_input_area() {
    let map = Map::new(grid_map(3, 0.0).unwrap()).unwrap();
    let input = grid_plane(4, 4, 4.0, 1.0).unwrap();
    let out = run(&map, &input, 3);
    let positions = out.mesh.positions().unwrap();
    let area: f64 = (0..out.mesh.face_count())
        .map(|f| xy_area(&face_points(&out.mesh, &positions, f)).abs())
        .sum();
    assert!((area - 16.0).abs() < 1e-9, "area {area}");
}

#[test]
fn reversed_input_reverses_output_faces() {
    let input = grid_plane(2, 2, 2.0, 1.0).unwrap();
    let uvs = input.corner_uvs().unwrap();
    let positions = input.positions().unwrap();
    let mut builder = MeshBuilder::with_positions(&positions);
    let mut reversed_uvs = Vec::new();
    for range in input.faces() {
        let corners: Vec<usize> = range.corners().rev().collect();
        let verts: Vec<u32> = corners.iter().map(|&c| input.corner_verts[c]).collect();
        builder.add_face(&verts).unwrap();
        for &c in &corners {
            reversed_uvs.extend([uvs[c].u, uvs[c].v]);
        }
    }
    builder.set_attrib(Domain::Corner, Attrib::float("uv", AttribUse::Uv, 2, reversed_uvs));
    let reversed = builder.build().unwrap();

    let map = Map::new(grid_map(3, 0.0).unwrap()).unwrap();
    let summarize = |out: &MapToMeshOutput| {
        let positions = out.mesh.positions().unwrap();
        let mut faces: Vec<(Vec<[i64; 3]>, f64)> = (0..out.mesh.face_count())
            .map(|f| {
                let points = face_points(&out.mesh, &positions, f);
                let mut keys: Vec<[i64; 3]> = points
                    .iter()
                    .map(|p| p.to_array().map(|x| (x / SNAPSHOT_QUANTIZE).round() as i64))
                    .collect();
                keys.sort_unstable();
                (keys, xy_area(&points))
            })
            .collect();
        faces.sort_by(|a, b| a.0.cmp(&b.0));
        faces
    };

    let forward = summarize(&run(&map, &input, 2));
    let backward = summarize(&run(&map, &reversed, 2));
    assert_eq!(forward.len(), backward.len());
    for ((keys_a, area_a), (keys_b, area_b)) in forward.iter().zip(&backward) {
        assert_eq!(keys_a, keys_b);
        assert!(*area_a > 0.0);
        assert!((area_a + area_b).abs() < 1e-9);
    }
}

fn shaded_pair() -> (Map, Mesh) {
    let shade = |value: f64| Attrib::float("shade", AttribUse::Scalar, 1, vec![value; 4]);
    let map = with_attrib(square_map(0.0).unwrap(), Domain::Corner, shade(0.9));
    let input = with_attrib(unit_plane(), Domain::Corner, shade(0.2));
    (Map::new(map).unwrap(), input)
}

fn shade_values(out: &MapToMeshOutput) -> Vec<f64> {
    let attrib = out.mesh.attribs(Domain::Corner).get("shade").unwrap();
    (0..out.mesh.corner_count()).map(|c| attrib.component(c, 0)).collect()
}

#[test]
fn common_attribs_blend_with_their_config() {
    let (map, input) = shaded_pair();
    let mut common = query_common_attribs(&map, &input, &TypeDefaults::default());
    assert_eq!(common.len(), 1);
    assert!(common.get(Domain::Corner, "shade").is_some());

    let out = run_with(&map, &input, &common, 1, 1.0);
    assert!(shade_values(&out).iter().all(|v| (v - 0.9).abs() < 1e-9));

    assert!(common.set_config("shade", BlendConfig::new(BlendMode::Multiply)));
    let out = run_with(&map, &input, &common, 1, 1.0);
    assert!(shade_values(&out).iter().all(|v| (v - 0.18).abs() < 1e-9));

    common.set_config("shade", BlendConfig::new(BlendMode::Multiply).with_opacity(0.5));
    let out = run_with(&map, &input, &common, 1, 1.0);
    assert!(shade_values(&out).iter().all(|v| (v - 0.19).abs() < 1e-9));
}

#[test]
fn one_sided_attribs_are_carried_through() {
    let map = with_attrib(
        square_map(0.0).unwrap(),
        Domain::Face,
        Attrib::int("material", ScalarType::I32, AttribUse::Index, 1, vec![7]),
    );
    let map = Map::new(map).unwrap();
    let input = unit_plane();
    let xs: Vec<f64> = input.positions().unwrap().iter().map(|p| p.x).collect();
    let input = with_attrib(input, Domain::Vert, Attrib::float("weight", AttribUse::Scalar, 1, xs));

    let out = run(&map, &input, 1);
    let material = out.mesh.attribs(Domain::Face).get("material").unwrap();
    assert_eq!(material.len(), out.mesh.face_count());
    assert!((0..material.len()).all(|f| material.component(f, 0) == 7.0));

    let weight = out.mesh.attribs(Domain::Vert).get("weight").unwrap();
    let positions = out.mesh.positions().unwrap();
    for (v, p) in positions.iter().enumerate() {
        assert!((weight.component(v, 0) - p.x).abs() < 1e-9);
    }
    assert!(out.mesh.attribs(Domain::Corner).get("uv").is_some());
}

#[test]
fn sample_grid_overrides_the_base() {
    let grid = PlanarSampleGrid::new(UvBox::UNIT, Point3::new(0.0, 0.0, 2.0), Vec3::Z);
    let map = Map::new(square_map(0.5).unwrap()).unwrap().with_usg(Arc::new(grid));
    let out = run(&map, &unit_plane(), 1);
    assert!(all_z(&out.mesh, 2.5));
    assert!(out.diagnostics.counters.usg_overrides > 0);
}

#[test]
fn height_scales_by_vertex_and_call() {
    let map = Map::new(square_map(0.5).unwrap()).unwrap();
    let input = with_attrib(
        unit_plane(),
        Domain::Vert,
        Attrib::float("wscale", AttribUse::WScale, 1, vec![2.0; 4]),
    );
    let common = query_common_attribs(&map, &input, &TypeDefaults::default());
    assert!(all_z(&run_with(&map, &input, &common, 1, 1.0).mesh, 1.0));

    let plain = unit_plane();
    assert!(all_z(&run_with(&map, &plain, &CommonAttribList::default(), 1, 3.0).mesh, 1.5));
}

#[test]
fn map_normals_are_taken_to_object_space() {
    let normals = Attrib::float("normal", AttribUse::Normal, 3, [1.0, 0.0, 0.0].repeat(4));
    let map = Map::new(with_attrib(square_map(0.0).unwrap(), Domain::Corner, normals)).unwrap();
    let out = run(&map, &unit_plane(), 1);
    let normal = out.mesh.attribs(Domain::Corner).get("normal").unwrap();
    for c in 0..out.mesh.corner_count() {
        let n = normal.value(c);
        assert!((n.get(0) - 1.0).abs() < 1e-9);
        assert!(n.get(1).abs() < 1e-9 && n.get(2).abs() < 1e-9);
    }
}

#[test]
fn weld_option_joins_seam_vertices() {
    let input = uv_cylinder(4, 1, 1.0, 1.0).unwrap();
    let map = Map::new(grid_map(4, 0.0).unwrap()).unwrap();
    let common = query_common_attribs(&map, &input, &TypeDefaults::default());
    let options = MapToMeshOptions::default()
        .with_worker_count(2)
        .with_weld_tolerance(Some(Tolerance::LOOSE));
    let mut ctx = StuccoContext::with_options(options);
    let out = map_to_mesh(&mut ctx, &map, &input, &common, 1.0).unwrap();
    assert_eq!(out.mesh.face_count(), 16);
    assert_eq!(out.mesh.vert_count, 20);
}

#[test]
fn corner_capacity_error_names_the_job() {
    let map = Map::new(square_map(0.0).unwrap()).unwrap();
    let mut ctx = StuccoContext::with_options(
        MapToMeshOptions::default()
            .with_worker_count(1)
            .with_max_clip_corners(3),
    );
    let err = map_to_mesh(&mut ctx, &map, &unit_plane(), &CommonAttribList::default(), 1.0).unwrap_err();
    match err {
        StuccoError::Worker { range, source } => {
            assert_eq!(range, 0..1);
            assert!(matches!(*source, StuccoError::CapacityExceeded { face: 0, limit: 3, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wide_uv_faces_hit_the_tile_limit() {
    let map = Map::new(square_map(0.0).unwrap()).unwrap();
    let uvs = vec![-50000.0, -50000.0, 50000.0, -50000.0, 50000.0, 50000.0, -50000.0, 50000.0];
    let input = with_attrib(unit_plane(), Domain::Corner, Attrib::float("uv", AttribUse::Uv, 2, uvs));
    let mut ctx = StuccoContext::with_options(MapToMeshOptions::default().with_worker_count(1));
    let err = map_to_mesh(&mut ctx, &map, &input, &CommonAttribList::default(), 1.0).unwrap_err();
    match err {
        StuccoError::Worker { range, source } => {
            assert_eq!(range, 0..1);
            assert!(matches!(
                *source,
                StuccoError::CapacityExceeded {
                    what: "uv tiles",
                    face: 0,
                    limit: DEFAULT_MAX_TILES,
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut ctx = StuccoContext::with_options(MapToMeshOptions::default().with_worker_count(1).with_max_tiles(4));
    let small = with_attrib(
        unit_plane(),
        Domain::Corner,
        Attrib::float("uv", AttribUse::Uv, 2, vec![0.0, 0.0, 2.0, 0.0, 2.0, 2.0, 0.0, 2.0]),
    );
    let out = map_to_mesh(&mut ctx, &map, &small, &CommonAttribList::default(), 1.0).unwrap();
    assert_eq!(out.mesh.face_count(), 4);
}

#[test]
fn invalid_inputs_are_rejected() {
    let map = Map::new(square_map(0.0).unwrap()).unwrap();
    let none = CommonAttribList::default();
    let call = |input: &Mesh, options: MapToMeshOptions, common: &CommonAttribList, w_scale: f64| {
        let mut ctx = StuccoContext::with_options(options);
        map_to_mesh(&mut ctx, &map, input, common, w_scale).unwrap_err()
    };
    let options = MapToMeshOptions::default().with_worker_count(1);

    let mut corrupt = unit_plane();
    corrupt.corner_verts[0] = 99;
    assert!(matches!(
        call(&corrupt, options, &none, 1.0),
        StuccoError::InvalidMesh {
            role: MeshRole::Input,
            source: MeshError::CornerVertOutOfRange { vert: 99, .. },
        }
    ));

    let bare = Mesh::from_polygons(
        &[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        &[vec![0, 1, 2]],
    )
    .unwrap();
    assert!(matches!(
        call(&bare, options, &none, 1.0),
        StuccoError::MissingAttrib {
            role: MeshRole::Input,
            usage: AttribUse::Uv,
        }
    ));

    assert!(matches!(
        call(&unit_plane(), options.with_worker_count(0), &none, 1.0),
        StuccoError::InvalidConfig(_)
    ));
    assert!(matches!(
        call(&unit_plane(), options.with_max_tiles(0), &none, 1.0),
        StuccoError::InvalidConfig(_)
    ));
    assert!(matches!(
        call(&unit_plane(), options.with_receive_len(Some(-1.0)), &none, 1.0),
        StuccoError::InvalidConfig(_)
    ));
    assert!(matches!(
        call(&unit_plane(), options, &none, f64::NAN),
        StuccoError::InvalidConfig(_)
    ));

    let (shaded_map, shaded_input) = shaded_pair();
    let mut common = query_common_attribs(&shaded_map, &shaded_input, &TypeDefaults::default());
    common.set_config("shade", BlendConfig::new(BlendMode::Multiply).with_opacity(2.0));
    assert!(matches!(
        call(&shaded_input, options, &common, 1.0),
        StuccoError::Blend(BlendConfigError::Opacity(_))
    ));

    assert!(matches!(
        Map::new(Mesh::default()),
        Err(StuccoError::MissingAttrib {
            role: MeshRole::Map,
            usage: AttribUse::Position,
        })
    ));
}

/// Two input faces side by side, with materials 0 and 1.
fn two_material_plane() -> Mesh {
    with_attrib(
        grid_plane(2, 1, 2.0, 1.0).unwrap(),
        Domain::Face,
        Attrib::int("mat", ScalarType::I32, AttribUse::Material, 1, vec![0, 1]),
    )
}

/// A flat square map with one `pattern` entry per face.
fn patterned_square(w: f64, pattern: i64) -> Mesh {
    with_attrib(
        square_map(w).unwrap(),
        Domain::Face,
        Attrib::int("pattern", ScalarType::I32, AttribUse::Index, 1, vec![pattern]),
    )
}

#[test]
fn material_mask_selects_input_faces() {
    let input = two_material_plane();
    let map = Map::new(square_map(0.0).unwrap()).unwrap().with_material(1);
    let out = run(&map, &input, 2);
    assert_eq!(out.mesh.face_count(), 1);
    assert_eq!(out.diagnostics.counters.masked_faces, 1);
    assert!(out.mesh.positions().unwrap().iter().all(|p| p.x > 1.0 - 1e-9));

    let unused = Map::new(square_map(0.0).unwrap()).unwrap().with_material(7);
    let out = run(&unused, &input, 2);
    assert_eq!(out.mesh.face_count(), 0);
    assert_eq!(out.diagnostics.counters.masked_faces, 2);

    // Without a material attribute every face is selected.
    let out = run(&map, &grid_plane(2, 1, 2.0, 1.0).unwrap(), 2);
    assert_eq!(out.mesh.face_count(), 1);
    assert_eq!(out.diagnostics.counters.masked_faces, 0);
}

#[test]
fn map_array_joins_outputs_and_remaps_tables() {
    let input = two_material_plane();
    let low = Map::new(patterned_square(0.0, 0))
        .unwrap()
        .with_material(0)
        .with_indexed_attrib(IndexedAttrib::new("pattern", ["grout"]));
    let high = Map::new(patterned_square(1.0, 0))
        .unwrap()
        .with_material(1)
        .with_indexed_attrib(IndexedAttrib::new("pattern", ["tile"]));
    let mut input_indexed = IndexedAttribSet::new();
    input_indexed.insert(IndexedAttrib::new("mat", ["stone", "brick"]));

    let entries = [
        MapArrayEntry::new(&low, CommonAttribList::default()),
        MapArrayEntry::new(&high, CommonAttribList::default()),
    ];
    let mut ctx = StuccoContext::with_options(MapToMeshOptions::default().with_worker_count(1));
    let out = map_array_to_mesh(&mut ctx, &entries, &input, &input_indexed, 1.0).unwrap();

    assert_eq!(out.mesh.face_count(), 2);
    assert_eq!(out.diagnostics.face_count, 2);
    assert_eq!(out.diagnostics.counters.masked_faces, 2);
    let positions = out.mesh.positions().unwrap();
    assert!(face_points(&out.mesh, &positions, 0).iter().all(|p| p.z.abs() < 1e-9 && p.x < 1.0 + 1e-9));
    assert!(face_points(&out.mesh, &positions, 1).iter().all(|p| (p.z - 1.0).abs() < 1e-9 && p.x > 1.0 - 1e-9));

    let faces = out.mesh.attribs(Domain::Face);
    let pattern = faces.get("pattern").unwrap();
    assert_eq!([pattern.component(0, 0), pattern.component(1, 0)], [0.0, 1.0]);
    assert_eq!(out.indexed.get("pattern").unwrap().entries, ["grout", "tile"]);
    let mat = faces.get("mat").unwrap();
    assert_eq!([mat.component(0, 0), mat.component(1, 0)], [0.0, 1.0]);
    assert_eq!(out.indexed.get("mat").unwrap().entries, ["stone", "brick"]);
}

#[test]
fn map_array_rejects_bad_table_indices() {
    let input = two_material_plane();
    let map = Map::new(patterned_square(0.0, 3))
        .unwrap()
        .with_indexed_attrib(IndexedAttrib::new("pattern", ["grout"]));
    let mut ctx = StuccoContext::with_options(MapToMeshOptions::default().with_worker_count(1));
    let entries = [MapArrayEntry::new(&map, CommonAttribList::default())];
    let err = map_array_to_mesh(&mut ctx, &entries, &input, &IndexedAttribSet::new(), 1.0).unwrap_err();
    assert!(matches!(
        err,
        StuccoError::IndexOutOfRange { ref name, index: 3, len: 1 } if name == "pattern"
    ));

    let err = map_array_to_mesh(&mut ctx, &[], &input, &IndexedAttribSet::new(), 1.0).unwrap_err();
    assert!(matches!(err, StuccoError::InvalidConfig(_)));
}
