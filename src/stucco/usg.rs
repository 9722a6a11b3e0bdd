//! Uniform sample grids: regions of a map that override the projected base
//! position and normal with a flat sample.

use std::fmt::Debug;

use crate::geom::{Point3, Tile, Uv, UvBox, Vec3};

/// Flat position and normal replacing the barycentric base of a corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsgSample {
    pub position: Point3,
    pub normal: Vec3,
}

/// A sample grid attached to a map.
///
/// `local_uv` is the corner's UV relative to the map tile it came from,
/// `tile` that tile, `input_face` the input face being projected onto and
/// `base` the barycentric position the sample would replace.
pub trait UniformSampleGrid: Send + Sync + Debug {
    fn sample(&self, local_uv: Uv, tile: Tile, input_face: u32, base: Point3) -> Option<UsgSample>;
}

/// Projects corners inside `region` onto a fixed plane.
///
/// Corners whose base position lies below `cutoff` along the plane normal are left alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarSampleGrid {
    pub region: UvBox,
    pub origin: Point3,
    pub normal: Vec3,
    pub cutoff: f64,
}

impl PlanarSampleGrid {
    #[must_use]
    pub fn new(region: UvBox, origin: Point3, normal: Vec3) -> Self {
        Self {
            region,
            origin,
            normal: normal.normalized().unwrap_or(Vec3::Z),
            cutoff: f64::NEG_INFINITY,
        }
    }

    #[must_use]
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }
}

impl UniformSampleGrid for PlanarSampleGrid {
    fn sample(&self, local_uv: Uv, _tile: Tile, _input_face: u32, base: Point3) -> Option<UsgSample> {
        let inside = local_uv.u >= self.region.min.u
            && local_uv.u <= self.region.max.u
            && local_uv.v >= self.region.min.v
            && local_uv.v <= self.region.max.v;
        if !inside {
            return None;
        }
        let height = self.normal.dot(base - self.origin);
        if height < self.cutoff {
            return None;
        }
        Some(UsgSample {
            position: base.add_vec(self.normal * -height),
            normal: self.normal,
        })
    }
}
