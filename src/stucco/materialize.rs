//! Turning clipped UV corners into 3D corners, and sampling output attributes.

use crate::geom::{Attrib, AttribUse, AttribValue, Domain, MapCounters, Mesh, Point3, Tbn, Tile, Tolerance, Uv, Vec3};

use super::blend::{BlendConfig, CommonAttribList};
use super::clip::{ClipCorner, Fragment, SegmentSource, VertKey, Weights};
use super::identity::IdentityTables;
use super::input::PreparedInput;
use super::map::Map;

/// A materialized output corner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchCorner {
    pub key: VertKey,
    /// Vertex index in the owning scope.
    pub vert: u32,
    pub uv: Uv,
    pub position: Point3,
    pub normal: Vec3,
    pub map_w: Weights,
    pub in_w: Weights,
    pub seg: SegmentSource,
    pub map_order: u32,
}

/// Deterministic position of a face in the output mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceOrderKey {
    pub input_face: u32,
    pub map_face: u32,
    pub translation: Tile,
    pub seq: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScratchFace {
    pub order: FaceOrderKey,
    pub map_face: u32,
    /// Lowest contributing input face.
    pub input_face: u32,
    pub corners: Vec<ScratchCorner>,
}

/// Faces finished inside one scope, with scope-local vertex identities.
#[derive(Debug)]
pub struct ScratchMesh {
    tables: IdentityTables,
    faces: Vec<ScratchFace>,
}

impl ScratchMesh {
    #[must_use]
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            tables: IdentityTables::new(tolerance),
            faces: Vec::new(),
        }
    }

    pub fn push(&mut self, mut face: ScratchFace) {
        for corner in &mut face.corners {
            corner.vert = self.tables.get_or_insert(corner.key, corner.uv).0;
        }
        self.faces.push(face);
    }

    #[must_use]
    pub fn vert_count(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn into_faces(self) -> Vec<ScratchFace> {
        self.faces
    }
}

/// Projects clipped corners onto the input surface.
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'a> {
    map: &'a Map,
    input: &'a PreparedInput<'a>,
    w_scale: f64,
}

impl<'a> Materializer<'a> {
    #[must_use]
    pub const fn new(map: &'a Map, input: &'a PreparedInput<'a>, w_scale: f64) -> Self {
        Self { map, input, w_scale }
    }

    /// Interpolated input normal at a corner.
    #[must_use]
    pub fn input_normal(&self, in_w: &Weights) -> Vec3 {
        in_w.iter()
            .fold(Vec3::ZERO, |acc, &(c, w)| acc + self.input.normals[c as usize] * w)
    }

    /// Materializes one corner.
    ///
    /// `normal_override` replaces the interpolated input normal when building
    /// the tangent frame.
    pub fn corner(
        &self,
        corner: &ClipCorner,
        input_face: u32,
        translation: Tile,
        normal_override: Option<Vec3>,
        counters: &mut MapCounters,
    ) -> ScratchCorner {
        let mut base = Vec3::ZERO;
        let mut tangent = Vec3::ZERO;
        let mut sign = 0.0;
        let mut vert_scale = if corner.in_w.is_empty() { 1.0 } else { 0.0 };
        for &(c, w) in &corner.in_w {
            let ci = c as usize;
            base = base + self.input.corner_position(c).to_vec3() * w;
            tangent = tangent + self.input.tangents[ci] * w;
            sign += self.input.tangent_signs[ci] * w;
            vert_scale += self.input.vert_w_scale(c) * w;
        }
        let normal = normal_override.unwrap_or_else(|| self.input_normal(&corner.in_w));
        let mut tbn = Tbn::from_normal_tangent(normal, tangent, sign);
        let mut base = Point3::ORIGIN + base;

        let local_uv = corner.uv - translation.offset();
        for usg in self.map.usgs() {
            if let Some(sample) = usg.sample(local_uv, translation, input_face, base) {
                base = sample.position;
                tbn = Tbn::from_normal_tangent(sample.normal, tbn.tangent, sign);
                counters.usg_overrides += 1;
                break;
            }
        }

        let map_mesh = self.map.mesh();
        let height: f64 = corner
            .map_w
            .iter()
            .map(|&(c, w)| self.map.vert_w(map_mesh.corner_verts[c as usize]) * w)
            .sum();
        let position = base + tbn.normal * (height * self.w_scale * vert_scale);

        let normal = if self.map.has_normals() {
            let local = corner.map_w.iter().fold(Vec3::ZERO, |acc, &(c, w)| {
                acc + self.map.corner_normal(c as usize).unwrap_or(Vec3::Z) * w
            });
            tbn.to_object(local).normalized().unwrap_or(tbn.normal)
        } else {
            tbn.normal
        };

        ScratchCorner {
            key: corner.key,
            vert: 0,
            uv: corner.uv,
            position,
            normal,
            map_w: corner.map_w.clone(),
            in_w: corner.in_w.clone(),
            seg: corner.seg,
            map_order: corner.map_order,
        }
    }

    /// Materializes a fragment that lies strictly inside its input face.
    ///
    /// Returns `None` when the ordered face has fewer than 3 corners.
    pub fn direct_face(&self, fragment: &Fragment, counters: &mut MapCounters) -> Option<ScratchFace> {
        let corners: Vec<ScratchCorner> = fragment
            .corners
            .iter()
            .map(|c| self.corner(c, fragment.input_face, fragment.translation, None, counters))
            .collect();
        let corners = super::assemble::order_direct(corners, fragment.output_ccw())?;
        Some(ScratchFace {
            order: FaceOrderKey {
                input_face: fragment.input_face,
                map_face: fragment.map_face,
                translation: fragment.translation,
                seq: fragment.island,
            },
            map_face: fragment.map_face,
            input_face: fragment.input_face,
            corners,
        })
    }
}

/// Which mesh an output attribute is read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttribOrigin {
    Map,
    Input,
    Common(BlendConfig),
}

/// One output attribute and its sources.
#[derive(Debug, Clone)]
pub struct PlannedAttrib<'a> {
    pub domain: Domain,
    pub origin: AttribOrigin,
    map: Option<&'a Attrib>,
    input: Option<&'a Attrib>,
}

impl PlannedAttrib<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.input.or(self.map).map_or("", Attrib::name)
    }

    #[must_use]
    pub fn usage(&self) -> Option<AttribUse> {
        self.input.or(self.map).map(Attrib::usage)
    }

    /// An empty output buffer with the source schema.
    #[must_use]
    pub fn template(&self) -> Option<Attrib> {
        self.input.or(self.map).map(Attrib::empty_like)
    }

    /// Value of one output element from map-side and input-side weights.
    ///
    /// A common attribute with only one side available takes that side as is.
    #[must_use]
    pub fn sample(&self, map_w: &[(u32, f64)], in_w: &[(u32, f64)]) -> AttribValue {
        let map_value = self.map.filter(|_| !map_w.is_empty()).map(|a| a.sample(map_w));
        let input_value = self.input.filter(|_| !in_w.is_empty()).map(|a| a.sample(in_w));
        match (self.origin, input_value, map_value) {
            (AttribOrigin::Common(config), Some(a), Some(b)) => {
                let attrib = self.input.or(self.map);
                match attrib {
                    Some(attrib) => config.blend(attrib.scalar(), attrib.usage(), &a, &b),
                    None => a,
                }
            }
            (AttribOrigin::Map, _, Some(b)) => b,
            (AttribOrigin::Input, Some(a), _) | (AttribOrigin::Common(_), Some(a), None) => a,
            (AttribOrigin::Common(_), None, Some(b)) => b,
            _ => AttribValue::zeroed(self.template().map_or(1, |t| t.comps())),
        }
    }
}

/// Every attribute written to the output mesh besides position and normal.
#[derive(Debug, Clone, Default)]
pub struct AttribPlan<'a> {
    pub attribs: Vec<PlannedAttrib<'a>>,
}

impl<'a> AttribPlan<'a> {
    /// Map-only, input-only and common attributes per domain.
    ///
    /// Attributes consumed by the pipeline are skipped. Names present on both
    /// meshes but missing from `common` blend with the default config.
    #[must_use]
    pub fn new(map: &'a Mesh, input: &'a Mesh, common: &CommonAttribList) -> Self {
        let mut attribs = Vec::new();
        for domain in Domain::ALL {
            let map_set = map.attribs(domain);
            let input_set = input.attribs(domain);
            for attrib in input_set.iter().filter(|a| !a.usage().is_consumed()) {
                let partner = map_set.get(attrib.name()).filter(|m| !m.usage().is_consumed());
                let origin = match partner {
                    Some(_) => AttribOrigin::Common(
                        common
                            .get(domain, attrib.name())
                            .map_or_else(BlendConfig::default, |c| c.config),
                    ),
                    None => AttribOrigin::Input,
                };
                attribs.push(PlannedAttrib {
                    domain,
                    origin,
                    map: partner,
                    input: Some(attrib),
                });
            }
            for attrib in map_set.iter().filter(|a| !a.usage().is_consumed()) {
                if input_set.get(attrib.name()).is_some_and(|i| !i.usage().is_consumed()) {
                    continue;
                }
                attribs.push(PlannedAttrib {
                    domain,
                    origin: AttribOrigin::Map,
                    map: Some(attrib),
                    input: None,
                });
            }
        }
        Self { attribs }
    }
}

/// Corner weights re-expressed over the vertices the corners reference.
#[must_use]
pub fn weights_through_verts(weights: &[(u32, f64)], corner_verts: &[u32]) -> Weights {
    let mut out = Weights::new();
    for &(corner, w) in weights {
        let vert = corner_verts[corner as usize];
        match out.iter_mut().find(|(v, _)| *v == vert) {
            Some(entry) => entry.1 += w,
            None => out.push((vert, w)),
        }
    }
    out
}
