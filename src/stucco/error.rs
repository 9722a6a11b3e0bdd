use std::fmt;
use std::ops::Range;

use crate::geom::{AttribUse, MeshError};

use super::blend::BlendConfigError;

/// Which mesh an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshRole {
    Map,
    Input,
    Output,
}

impl fmt::Display for MeshRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Map => "map",
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StuccoError {
    #[error("invalid {role} mesh: {source}")]
    InvalidMesh {
        role: MeshRole,
        #[source]
        source: MeshError,
    },
    #[error("{role} mesh has no {usage:?} attribute")]
    MissingAttrib { role: MeshRole, usage: AttribUse },
    #[error("{what} exceeded the limit of {limit} at input face {face}")]
    CapacityExceeded {
        what: &'static str,
        face: usize,
        limit: usize,
    },
    #[error("{name} value {index} has no entry in its indexed table of {len}")]
    IndexOutOfRange { name: String, index: i64, len: usize },
    #[error("job over input faces {range:?} failed: {source}")]
    Worker {
        range: Range<usize>,
        #[source]
        source: Box<StuccoError>,
    },
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Blend(#[from] BlendConfigError),
}

impl StuccoError {
    pub(crate) fn invalid_mesh(role: MeshRole) -> impl FnOnce(MeshError) -> Self {
        move |source| Self::InvalidMesh { role, source }
    }
}
