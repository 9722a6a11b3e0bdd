//! Input mesh data derived once per call and shared read-only by all workers.

use crate::geom::{
    AttribUse, Domain, EdgeFlags, Mesh, Point3, Tolerance, Uv, UvBox, UvVerts, Vec3, Winding, corner_normals,
    corner_tangents, edge_flags, face_winding, fan, is_convex_ccw, signed_area, triangulate_face, weld_uv_verts,
};

use super::error::{MeshRole, StuccoError};

/// UV-space description of one input face.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFace {
    pub winding: Option<Winding>,
    pub bbox: UvBox,
    pub convex: bool,
    /// Triangles over local corner indices, in the face's own corner order.
    pub triangles: Vec<[u32; 3]>,
    pub degenerate: bool,
}

#[derive(Debug, Clone)]
pub struct PreparedInput<'a> {
    pub mesh: &'a Mesh,
    pub positions: Vec<Point3>,
    pub corner_uvs: Vec<Uv>,
    pub uv_verts: UvVerts,
    pub edge_flags: Vec<EdgeFlags>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub tangent_signs: Vec<f64>,
    /// Per-vertex height multiplier from a `WScale` attribute.
    pub w_scale: Option<Vec<f64>>,
    /// Per-face material slot from a `Material` attribute.
    pub materials: Option<Vec<i64>>,
    pub faces: Vec<InputFace>,
}

impl<'a> PreparedInput<'a> {
    pub fn new(mesh: &'a Mesh, tol: Tolerance) -> Result<Self, StuccoError> {
        mesh.validate().map_err(StuccoError::invalid_mesh(MeshRole::Input))?;
        let positions = mesh.positions().ok_or(StuccoError::MissingAttrib {
            role: MeshRole::Input,
            usage: AttribUse::Position,
        })?;
        let corner_uvs = mesh.corner_uvs().ok_or(StuccoError::MissingAttrib {
            role: MeshRole::Input,
            usage: AttribUse::Uv,
        })?;

        let uv_verts = weld_uv_verts(mesh, &corner_uvs);
        let edge_flags = edge_flags(mesh, &uv_verts);
        let normals = corner_normals(mesh, &positions);
        let (tangents, tangent_signs) = corner_tangents(mesh, &positions, &corner_uvs, &normals);
        let w_scale = mesh
            .attribs(Domain::Vert)
            .by_usage(AttribUse::WScale)
            .map(|attr| (0..mesh.vert_count).map(|v| attr.component(v, 0)).collect());
        #[allow(clippy::cast_possible_truncation)]
        let materials = mesh
            .attribs(Domain::Face)
            .by_usage(AttribUse::Material)
            .map(|attr| (0..mesh.face_count()).map(|f| attr.component(f, 0).round() as i64).collect());

        let faces = mesh
            .faces()
            .map(|range| {
                let uvs: Vec<Uv> = range.corners().map(|c| corner_uvs[c]).collect();
                prepare_face(range.face, &uvs, tol)
            })
            .collect();

        Ok(Self {
            mesh,
            positions,
            corner_uvs,
            uv_verts,
            edge_flags,
            normals,
            tangents,
            tangent_signs,
            w_scale,
            materials,
            faces,
        })
    }

    /// UVs of a face's corners in their own order.
    #[must_use]
    pub fn face_uvs(&self, face: u32) -> Vec<Uv> {
        self.mesh
            .face(face as usize)
            .corners()
            .map(|c| self.corner_uvs[c])
            .collect()
    }

    /// Whether a map restricted to `material` applies to `face`.
    ///
    /// Unrestricted maps and meshes without materials select every face.
    #[must_use]
    pub fn face_selected(&self, face: u32, material: Option<i64>) -> bool {
        match (material, &self.materials) {
            (Some(material), Some(materials)) => materials[face as usize] == material,
            _ => true,
        }
    }

    /// UV endpoints of `edge` as seen from `face`, in the face's corner order.
    #[must_use]
    pub fn edge_uvs(&self, face: u32, edge: u32) -> Option<(Uv, Uv)> {
        let range = self.mesh.face(face as usize);
        range.corners().enumerate().find_map(|(local, c)| {
            (self.mesh.corner_edges[c] == edge).then(|| (self.corner_uvs[c], self.corner_uvs[range.corner(local + 1)]))
        })
    }

    #[must_use]
    pub fn corner_position(&self, corner: u32) -> Point3 {
        self.positions[self.mesh.corner_verts[corner as usize] as usize]
    }

    #[must_use]
    pub fn vert_w_scale(&self, corner: u32) -> f64 {
        self.w_scale
            .as_ref()
            .map_or(1.0, |s| s[self.mesh.corner_verts[corner as usize] as usize])
    }
}

fn prepare_face(face: u32, uvs: &[Uv], tol: Tolerance) -> InputFace {
    let winding = face_winding(uvs);
    let bbox = UvBox::from_points(uvs.iter().copied()).unwrap_or(UvBox::new(Uv::ZERO, Uv::ZERO));
    let degenerate = winding.is_none() || signed_area(uvs).abs() <= tol.eps;
    let convex = match winding {
        Some(Winding::Ccw) => is_convex_ccw(uvs, tol),
        Some(Winding::Cw) => {
            let reversed: Vec<Uv> = uvs.iter().rev().copied().collect();
            is_convex_ccw(&reversed, tol)
        }
        None => false,
    };
    let triangles = if degenerate {
        Vec::new()
    } else {
        triangulate_face(uvs, convex, tol).unwrap_or_else(|err| {
            log::debug!("input face {face}: {err}, using a fan");
            fan(uvs.len())
        })
    };
    InputFace {
        winding,
        bbox,
        convex,
        triangles,
        degenerate,
    }
}
