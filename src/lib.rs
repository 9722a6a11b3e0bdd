#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Stucco engine: projects tileable surface-detail maps onto UV-mapped
//! polygon meshes.
//!
//! [`geom`] holds the mesh, attribute and polygon primitives, [`stucco`] the
//! projection pipeline built on them.

pub mod geom;
pub mod stucco;

pub use stucco::{Map, MapToMeshOptions, MapToMeshOutput, StuccoContext, StuccoError, map_to_mesh};

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            ::log::debug!($($t)*);
        }
    }};
}
