//! Projection of a tileable surface-detail map onto an input mesh.
//!
//! The pipeline runs in stages: the map is indexed once ([`Map`]), input
//! faces are split into jobs, each job clips its faces against candidate map
//! faces and materializes the fragments lying strictly inside their input
//! face, and the remaining boundary fragments are merged across input faces
//! before the output mesh is assembled. [`map_array_to_mesh`] runs several
//! maps, each restricted to one input material, and joins their outputs.

mod assemble;
mod blend;
mod clip;
mod error;
mod identity;
mod input;
mod jobs;
mod map;
mod map_array;
mod map_to_mesh;
mod materialize;
mod merge;
mod outline;
mod quadtree;
mod receive;
mod usg;

pub use assemble::{Assembled, assemble_output, order_direct, order_merged};
pub use blend::{BlendConfig, BlendConfigError, BlendMode, CommonAttrib, CommonAttribList, TypeDefaults};
pub use clip::{
    ClipCorner, ClipParams, FaceClipper, Fragment, InputSeg, Provenance, SegmentSource, VertKey, Weights,
    clip_input_face, lerp_weights,
};
pub use error::{MeshRole, StuccoError};
pub use identity::{IdentityStats, IdentityTables};
pub use input::{InputFace, PreparedInput};
pub use jobs::{partition_faces, run_jobs};
pub use map::Map;
pub use map_array::{MapArrayEntry, MapArrayOutput, map_array_to_mesh};
pub use map_to_mesh::{
    DEFAULT_MAX_CLIP_CORNERS, DEFAULT_MAX_TILES, MapToMeshOptions, MapToMeshOutput, StuccoContext, map_to_mesh, map_to_mesh_with_defaults,
    query_common_attribs,
};
pub use materialize::{
    AttribOrigin, AttribPlan, FaceOrderKey, Materializer, PlannedAttrib, ScratchCorner, ScratchFace, ScratchMesh,
    weights_through_verts,
};
pub use merge::{BoundaryTable, MERGED_SEQ_BASE, find_pieces, merge_pieces, pool_boundary_tables};
pub use outline::{CornerRef, stitch};
pub use quadtree::{Candidate, DEFAULT_LEAF_CAPACITY, IndexEntry, MAX_DEPTH, QuadTree};
pub use receive::{CutEdges, ReceiveEdges, ReceiveStatus};
pub use usg::{PlanarSampleGrid, UniformSampleGrid, UsgSample};

#[cfg(test)]
mod tests;
