//! `stucco_cli`: runs built-in projection scenarios and writes the results.
//!
//! ```bash
//! stucco_cli list
//! stucco_cli run brick_wall --workers 4 --obj out/brick_wall.obj --snap out/brick_wall.snap
//! stucco_cli run panel_grid --w-scale 2 --blend blend.json
//! ```
//!
//! `--blend` reads a JSON [`TypeDefaults`] object used for every common
//! attribute. Log output is controlled through `RUST_LOG`.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use stucco_engine::geom::primitives::{brick_map, grid_map, grid_plane, panel_map, square_map, uv_cylinder};
use stucco_engine::geom::{Attrib, AttribUse, Domain, Mesh, MeshError, Point3, Uv, UvBox, Vec3};
use stucco_engine::stucco::{
    Map, MapToMeshOptions, MapToMeshOutput, PlanarSampleGrid, StuccoContext, StuccoError, TypeDefaults,
    map_to_mesh, query_common_attribs,
};

const SNAPSHOT_QUANTIZE: f64 = 1e-6;
const SNAPSHOT_DECIMALS: usize = 6;

#[derive(Parser)]
#[command(name = "stucco_cli")]
#[command(about = "Project tileable surface-detail maps onto meshes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in scenarios
    List,
    /// Run one scenario and print or write its snapshot
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    scenario: Scenario,

    /// Worker jobs (defaults to the available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Global multiplier of the map height
    #[arg(long, default_value_t = 1.0)]
    w_scale: f64,

    /// JSON file with default blend configs per scalar type
    #[arg(long)]
    blend: Option<PathBuf>,

    /// Write the output mesh as OBJ
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Write the snapshot here instead of stdout
    #[arg(long)]
    snap: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long)]
    overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
enum Scenario {
    FlatSquare,
    SplitFace,
    CylinderSeam,
    BrickWall,
    PanelGrid,
    UsgFlat,
}

impl Scenario {
    const ALL: &'static [Self] = &[
        Self::FlatSquare,
        Self::SplitFace,
        Self::CylinderSeam,
        Self::BrickWall,
        Self::PanelGrid,
        Self::UsgFlat,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::FlatSquare => "flat_square",
            Self::SplitFace => "split_face",
            Self::CylinderSeam => "cylinder_seam",
            Self::BrickWall => "brick_wall",
            Self::PanelGrid => "panel_grid",
            Self::UsgFlat => "usg_flat",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::FlatSquare => "one square map face on a unit plane",
            Self::SplitFace => "one map face spanning two input faces",
            Self::CylinderSeam => "a grid map wrapped around a cylinder with a UV seam",
            Self::BrickWall => "offset bricks with a blended shade attribute on a 4x4 plane",
            Self::PanelGrid => "raised panels tiled over a 6x6 plane",
            Self::UsgFlat => "a sample grid flattening the center of each tile",
        }
    }

    /// The map and input meshes of the scenario.
    fn build(self) -> Result<(Map, Mesh), CliError> {
        let pair = match self {
            Self::FlatSquare => (Map::new(square_map(0.1)?)?, grid_plane(1, 1, 1.0, 1.0)?),
            Self::SplitFace => (Map::new(square_map(0.1)?)?, grid_plane(2, 1, 2.0, 1.0)?),
            Self::CylinderSeam => (Map::new(grid_map(4, 0.05)?)?, uv_cylinder(12, 3, 1.0, 2.0)?),
            Self::BrickWall => {
                let mut map = brick_map(0.05)?;
                let shades: Vec<f64> = (0..map.corner_count()).map(|c| if c < 8 { 0.8 } else { 0.4 }).collect();
                map.attribs_mut(Domain::Corner)
                    .insert(Attrib::float("shade", AttribUse::Scalar, 1, shades));
                let mut input = grid_plane(4, 4, 4.0, 2.0)?;
                let count = input.corner_count();
                input
                    .attribs_mut(Domain::Corner)
                    .insert(Attrib::float("shade", AttribUse::Scalar, 1, vec![0.5; count]));
                (Map::new(map)?, input)
            }
            Self::PanelGrid => (Map::new(panel_map(0.15, 0.1)?)?, grid_plane(6, 6, 6.0, 3.0)?),
            Self::UsgFlat => {
                let grid = PlanarSampleGrid::new(
                    UvBox::new(Uv::new(0.25, 0.25), Uv::new(0.75, 0.75)),
                    Point3::new(0.0, 0.0, 0.05),
                    Vec3::Z,
                );
                let map = Map::new(grid_map(4, 0.1)?)?.with_usg(Arc::new(grid));
                (map, grid_plane(2, 2, 2.0, 1.0)?)
            }
        };
        Ok(pair)
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Stucco(#[from] StuccoError),
    #[error("invalid fixture mesh: {0}")]
    Mesh(#[from] MeshError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("refusing to overwrite existing file {0} (use --overwrite)")]
    Exists(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CliError {
    let path = path.to_path_buf();
    move |source| CliError::Io { path, source }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::List => {
            for scenario in Scenario::ALL {
                println!("{:<14} {}", scenario.name(), scenario.description());
            }
            Ok(())
        }
        Commands::Run(args) => cmd_run(&args),
    };
    if let Err(err) = result {
        eprintln!("stucco_cli error: {err}");
        std::process::exit(1);
    }
}

fn cmd_run(args: &RunArgs) -> Result<(), CliError> {
    let defaults = match args.blend.as_deref() {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(io_error(path))?;
            serde_json::from_str::<TypeDefaults>(&text).map_err(|source| CliError::Json {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => TypeDefaults::default(),
    };

    let (map, input) = args.scenario.build()?;
    let mut options = MapToMeshOptions::default();
    if let Some(workers) = args.workers {
        options = options.with_worker_count(workers);
    }
    let mut ctx = StuccoContext::with_options(options);
    let common = query_common_attribs(&map, &input, &defaults);
    log::info!(
        "{}: {} input faces, {} map faces, {} common attributes",
        args.scenario.name(),
        input.face_count(),
        map.mesh().face_count(),
        common.len()
    );
    let output = map_to_mesh(&mut ctx, &map, &input, &common, args.w_scale)?;

    let snapshot = snapshot_output(args.scenario.name(), &output);
    if let Some(path) = args.snap.as_deref() {
        write_text_file(path, &snapshot, args.overwrite)?;
        eprintln!("wrote {}", path.display());
    } else {
        print!("{snapshot}");
    }

    if let Some(path) = args.obj.as_deref() {
        write_obj_file(path, &output.mesh, args.scenario.name(), args.overwrite)?;
        eprintln!("wrote {}", path.display());
    }

    eprintln!("{}: {}", args.scenario.name(), output.diagnostics.summary());
    for warning in &output.diagnostics.warnings {
        log::warn!("{warning}");
    }
    Ok(())
}

fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), CliError> {
    if path.exists() && !overwrite {
        return Err(CliError::Exists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::write(path, normalize_snapshot_text(text)).map_err(io_error(path))
}

fn write_obj_file(path: &Path, mesh: &Mesh, name: &str, overwrite: bool) -> Result<(), CliError> {
    if path.exists() && !overwrite {
        return Err(CliError::Exists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let file = File::create(path).map_err(io_error(path))?;
    let mut w = BufWriter::new(file);
    write_obj(&mut w, mesh, name).map_err(io_error(path))?;
    w.flush().map_err(io_error(path))
}

fn write_obj(w: &mut impl Write, mesh: &Mesh, name: &str) -> std::io::Result<()> {
    writeln!(w, "# stucco-engine stucco_cli")?;
    writeln!(w, "o {name}")?;

    for p in mesh.positions().unwrap_or_default() {
        writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
    }

    let uvs = mesh.attribs(Domain::Corner).by_usage(AttribUse::Uv);
    if let Some(uv) = uvs {
        for c in 0..mesh.corner_count() {
            writeln!(w, "vt {} {}", uv.component(c, 0), uv.component(c, 1))?;
        }
    }

    let normals = mesh.attribs(Domain::Corner).by_usage(AttribUse::Normal);
    if let Some(n) = normals {
        for c in 0..mesh.corner_count() {
            writeln!(w, "vn {} {} {}", n.component(c, 0), n.component(c, 1), n.component(c, 2))?;
        }
    }

    for range in mesh.faces() {
        write!(w, "f")?;
        for c in range.corners() {
            let v = mesh.corner_verts[c] + 1;
            let k = c + 1;
            match (uvs.is_some(), normals.is_some()) {
                (true, true) => write!(w, " {v}/{k}/{k}"),
                (true, false) => write!(w, " {v}/{k}"),
                (false, true) => write!(w, " {v}//{k}"),
                (false, false) => write!(w, " {v}"),
            }?;
        }
        writeln!(w)?;
    }
    Ok(())
}

fn snapshot_output(name: &str, output: &MapToMeshOutput) -> String {
    let mesh = &output.mesh;
    let diag = &output.diagnostics;
    let mut out = String::new();
    let _ = writeln!(out, "scenario {name}");
    let _ = writeln!(out, "diag.vertex_count {}", diag.vertex_count);
    let _ = writeln!(out, "diag.face_count {}", diag.face_count);
    let _ = writeln!(out, "diag.corner_count {}", diag.corner_count);
    let _ = writeln!(out, "diag.welded_vertex_count {}", diag.welded_vertex_count);
    let _ = writeln!(out, "diag.direct_faces {}", diag.counters.direct_faces);
    let _ = writeln!(out, "diag.merged_faces {}", diag.counters.merged_faces);
    let _ = writeln!(out, "diag.unmerged_pieces {}", diag.counters.unmerged_pieces);
    let _ = writeln!(out, "diag.warning_count {}", diag.warnings.len());

    for p in mesh.positions().unwrap_or_default() {
        write_vec3_line(&mut out, "v", p.to_array());
    }
    for range in mesh.faces() {
        let verts: Vec<String> = range.corners().map(|c| mesh.corner_verts[c].to_string()).collect();
        let _ = writeln!(out, "f {}", verts.join(" "));
    }
    if let Some(normals) = mesh.attribs(Domain::Corner).by_usage(AttribUse::Normal) {
        for c in 0..mesh.corner_count() {
            write_vec3_line(
                &mut out,
                "vn",
                [normals.component(c, 0), normals.component(c, 1), normals.component(c, 2)],
            );
        }
    }
    if let Some(uv) = mesh.attribs(Domain::Corner).by_usage(AttribUse::Uv) {
        for c in 0..mesh.corner_count() {
            write_vec2_line(&mut out, "vt", [uv.component(c, 0), uv.component(c, 1)]);
        }
    }
    out
}

fn normalize_snapshot_text(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    if normalized.ends_with('\n') {
        normalized
    } else {
        format!("{normalized}\n")
    }
}

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
