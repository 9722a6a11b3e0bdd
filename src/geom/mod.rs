mod attrib;
mod core;
mod diagnostics;
mod mesh;
mod metrics;
mod polygon;
pub mod primitives;
mod triangulation;
pub(crate) mod union_find;

pub use attrib::{
    Attrib, AttribData, AttribSet, AttribUse, AttribValue, Domain, IndexedAttrib, IndexedAttribSet, MAX_COMPONENTS,
    ScalarType,
};
pub use core::{Point3, Tbn, Tile, Tolerance, Uv, UvBox, Vec3};
pub use diagnostics::MapToMeshDiagnostics;
pub use mesh::{
    EdgeFlags, FaceRange, Mesh, MeshBuilder, MeshError, UvVerts, WeldReport, corner_normals, corner_tangents,
    edge_flags, newell_normal, weld_uv_verts, weld_vertices,
};
pub use metrics::{MapCounters, StuccoMetrics, StuccoTimingReport, TimingBucket};
pub use polygon::{
    Winding, barycentric, centroid, face_winding, is_convex_ccw, orient2d, project_param, segment_line_param,
    signed_area,
};
pub use triangulation::{TriangulationError, earclip, fan, triangulate_face};

#[cfg(test)]
mod tests;
