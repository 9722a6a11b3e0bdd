//! Several maps over one input mesh, each usually restricted to one material.
//!
//! Every map runs through [`map_to_mesh`] on its own. The outputs are
//! appended in array order, and integer attributes that index a name table
//! are rewritten to index one shared output table.

use crate::geom::{AttribUse, AttribValue, IndexedAttrib, IndexedAttribSet, MapToMeshDiagnostics, Mesh};

use super::blend::CommonAttribList;
use super::error::StuccoError;
use super::map::Map;
use super::map_to_mesh::{StuccoContext, map_to_mesh};
use super::materialize::{AttribOrigin, AttribPlan};

/// One map of an array with its blend configuration.
#[derive(Debug, Clone)]
pub struct MapArrayEntry<'a> {
    pub map: &'a Map,
    pub common: CommonAttribList,
}

impl<'a> MapArrayEntry<'a> {
    #[must_use]
    pub fn new(map: &'a Map, common: CommonAttribList) -> Self {
        Self { map, common }
    }
}

#[derive(Debug, Clone)]
pub struct MapArrayOutput {
    pub mesh: Mesh,
    /// Name tables referenced by the output's `Index` and `Material` attributes.
    pub indexed: IndexedAttribSet,
    /// Counters summed over every map.
    pub diagnostics: MapToMeshDiagnostics,
}

/// Projects every map of `entries` onto `input` and joins the results.
///
/// `input_indexed` holds the input mesh's name tables. Output tables start
/// as copies of them, so input-side values keep their meaning; entries only a
/// map references are appended.
pub fn map_array_to_mesh(
    ctx: &mut StuccoContext,
    entries: &[MapArrayEntry<'_>],
    input: &Mesh,
    input_indexed: &IndexedAttribSet,
    w_scale: f64,
) -> Result<MapArrayOutput, StuccoError> {
    let Some((first, rest)) = entries.split_first() else {
        return Err(StuccoError::InvalidConfig("map array is empty".into()));
    };

    let mut indexed = input_indexed.clone();
    let mut diagnostics = MapToMeshDiagnostics::new();
    let mut run = |entry: &MapArrayEntry<'_>, indexed: &mut IndexedAttribSet| -> Result<Mesh, StuccoError> {
        let out = map_to_mesh(ctx, entry.map, input, &entry.common, w_scale)?;
        log::debug!(
            "map array: material {:?} gave {} faces",
            entry.map.material(),
            out.mesh.face_count()
        );
        diagnostics.merge(&out.diagnostics);
        let mut mesh = out.mesh;
        remap_indexed(&mut mesh, entry, input, input_indexed, indexed)?;
        Ok(mesh)
    };

    let mut mesh = run(first, &mut indexed)?;
    for entry in rest {
        let part = run(entry, &mut indexed)?;
        mesh.append(&part);
    }

    diagnostics.vertex_count = mesh.vert_count;
    diagnostics.face_count = mesh.face_count();
    diagnostics.corner_count = mesh.corner_count();
    Ok(MapArrayOutput {
        mesh,
        indexed,
        diagnostics,
    })
}

/// Rewrites indexed attributes of one map's output against the shared tables.
///
/// The source table follows the attribute's origin. A common attribute takes
/// the map's table unless its blend config swaps the operands.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn remap_indexed(
    mesh: &mut Mesh,
    entry: &MapArrayEntry<'_>,
    input: &Mesh,
    input_indexed: &IndexedAttribSet,
    out: &mut IndexedAttribSet,
) -> Result<(), StuccoError> {
    let plan = AttribPlan::new(entry.map.mesh(), input, &entry.common);
    let map_indexed = entry.map.indexed_attribs();
    for planned in &plan.attribs {
        if !matches!(planned.usage(), Some(AttribUse::Index | AttribUse::Material)) {
            continue;
        }
        let name = planned.name();
        let source: Option<&IndexedAttrib> = match planned.origin {
            AttribOrigin::Map => map_indexed.get(name),
            AttribOrigin::Input => input_indexed.get(name),
            AttribOrigin::Common(config) if config.order => input_indexed.get(name),
            AttribOrigin::Common(_) => map_indexed.get(name),
        };
        let Some(source) = source else {
            continue;
        };
        let Some(attrib) = mesh.attribs(planned.domain).get(name) else {
            continue;
        };

        let table = out.get_or_insert(name);
        let mut remapped = attrib.empty_like();
        for e in 0..attrib.len() {
            let old = attrib.component(e, 0).round() as i64;
            let label = source.entry(old).ok_or_else(|| StuccoError::IndexOutOfRange {
                name: name.to_owned(),
                index: old,
                len: source.entries.len(),
            })?;
            let new = table.index_or_push(label);
            remapped.push(&AttribValue::from_slice(&[new as f64]));
        }
        mesh.attribs_mut(planned.domain).insert(remapped);
    }
    Ok(())
}
