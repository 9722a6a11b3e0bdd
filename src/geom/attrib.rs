//! Named, typed, per-domain attribute arrays.
//!
//! Every mesh (map, input, output and worker scratch meshes) stores its data in
//! the same model: an [`AttribSet`] per [`Domain`], each holding [`Attrib`]
//! buffers of 1 to 4 components. Values are kept as `f64` or `i64` component
//! buffers regardless of the declared [`ScalarType`]; the scalar type only
//! drives saturation on write and color normalisation during blending.

use serde::{Deserialize, Serialize};

/// Maximum components per attribute element.
pub const MAX_COMPONENTS: usize = 4;

/// Declared storage type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ScalarType {
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Largest value of the unsigned type of the same width (`I8` -> 255).
    ///
    /// Used to normalise integer colors into `[0, 1]`. Float types return 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn unsigned_max(self) -> f64 {
        match self {
            Self::I8 => f64::from(u8::MAX),
            Self::I16 => f64::from(u16::MAX),
            Self::I32 => f64::from(u32::MAX),
            Self::I64 => u64::MAX as f64,
            Self::F32 | Self::F64 => 1.0,
        }
    }

    /// Signed value range for integer types.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn signed_range(self) -> (f64, f64) {
        match self {
            Self::I8 => (f64::from(i8::MIN), f64::from(i8::MAX)),
            Self::I16 => (f64::from(i16::MIN), f64::from(i16::MAX)),
            Self::I32 => (f64::from(i32::MIN), f64::from(i32::MAX)),
            Self::I64 => (i64::MIN as f64, i64::MAX as f64),
            Self::F32 => (f64::from(f32::MIN), f64::from(f32::MAX)),
            Self::F64 => (f64::MIN, f64::MAX),
        }
    }
}

/// What an attribute means to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttribUse {
    Position,
    Uv,
    Normal,
    Tangent,
    TangentSign,
    /// Per-vertex multiplier of the map height.
    WScale,
    Color,
    /// Discrete counts, masks and ids.
    Index,
    Scalar,
    /// Nonzero on edges that must stay cut during merging.
    PreserveEdge,
    /// Per-face material slot; selects which map of an array applies to a face.
    Material,
    /// Nonzero on map edges that let preserved input edges through.
    Receive,
    Misc,
}

impl AttribUse {
    /// Usages the pipeline computes or consumes itself instead of copying.
    #[must_use]
    pub const fn is_consumed(self) -> bool {
        matches!(
            self,
            Self::Position
                | Self::Normal
                | Self::Tangent
                | Self::TangentSign
                | Self::WScale
                | Self::PreserveEdge
                | Self::Receive
        )
    }

    /// Usages whose values are discrete ids rather than quantities.
    #[must_use]
    pub const fn is_discrete(self) -> bool {
        matches!(self, Self::Index | Self::Material | Self::PreserveEdge | Self::Receive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    Mesh,
    Face,
    Corner,
    Edge,
    Vert,
}

impl Domain {
    pub const ALL: [Self; 5] = [Self::Mesh, Self::Face, Self::Corner, Self::Edge, Self::Vert];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Mesh => 0,
            Self::Face => 1,
            Self::Corner => 2,
            Self::Edge => 3,
            Self::Vert => 4,
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mesh => "mesh",
            Self::Face => "face",
            Self::Corner => "corner",
            Self::Edge => "edge",
            Self::Vert => "vert",
        };
        f.write_str(name)
    }
}

/// Fixed-size temporary buffer holding one attribute element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttribValue {
    comps: u8,
    values: [f64; MAX_COMPONENTS],
}

impl AttribValue {
    #[must_use]
    pub fn zeroed(comps: u8) -> Self {
        Self {
            comps: comps.min(MAX_COMPONENTS as u8),
            values: [0.0; MAX_COMPONENTS],
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_slice(values: &[f64]) -> Self {
        let mut out = Self::zeroed(values.len().min(MAX_COMPONENTS) as u8);
        for (dst, src) in out.values.iter_mut().zip(values) {
            *dst = *src;
        }
        out
    }

    #[must_use]
    pub const fn comps(&self) -> u8 {
        self.comps
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values[..usize::from(self.comps)]
    }

    /// Component `i`, or 0 past the end.
    #[must_use]
    pub fn get(&self, i: usize) -> f64 {
        if i < usize::from(self.comps) { self.values[i] } else { 0.0 }
    }

    pub fn set(&mut self, i: usize, value: f64) {
        if i < usize::from(self.comps) {
            self.values[i] = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttribData {
    Float(Vec<f64>),
    Int(Vec<i64>),
}

impl AttribData {
    fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attrib {
    name: String,
    scalar: ScalarType,
    comps: u8,
    usage: AttribUse,
    interpolate: bool,
    data: AttribData,
}

impl Attrib {
    /// An `F64` attribute. `values` holds `comps` floats per element.
    #[must_use]
    pub fn float(name: impl Into<String>, usage: AttribUse, comps: u8, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            scalar: ScalarType::F64,
            comps: comps.clamp(1, MAX_COMPONENTS as u8),
            usage,
            interpolate: default_interpolate(usage),
            data: AttribData::Float(values),
        }
    }

    /// An integer attribute of the given width.
    #[must_use]
    pub fn int(name: impl Into<String>, scalar: ScalarType, usage: AttribUse, comps: u8, values: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            scalar,
            comps: comps.clamp(1, MAX_COMPONENTS as u8),
            usage,
            interpolate: default_interpolate(usage),
            data: AttribData::Int(values),
        }
    }

    /// An empty attribute with the same schema.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        let data = match self.data {
            AttribData::Float(_) => AttribData::Float(Vec::new()),
            AttribData::Int(_) => AttribData::Int(Vec::new()),
        };
        Self {
            name: self.name.clone(),
            scalar: self.scalar,
            comps: self.comps,
            usage: self.usage,
            interpolate: self.interpolate,
            data,
        }
    }

    #[must_use]
    pub fn with_interpolate(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn scalar(&self) -> ScalarType {
        self.scalar
    }

    #[must_use]
    pub const fn comps(&self) -> u8 {
        self.comps
    }

    #[must_use]
    pub const fn usage(&self) -> AttribUse {
        self.usage
    }

    #[must_use]
    pub const fn interpolate(&self) -> bool {
        self.interpolate
    }

    #[must_use]
    pub const fn data(&self) -> &AttribData {
        &self.data
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / usize::from(self.comps)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the raw component buffer.
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn component(&self, elem: usize, comp: usize) -> f64 {
        let idx = elem * usize::from(self.comps) + comp;
        match &self.data {
            AttribData::Float(v) => v.get(idx).copied().unwrap_or(0.0),
            AttribData::Int(v) => v.get(idx).map_or(0.0, |x| *x as f64),
        }
    }

    #[must_use]
    pub fn value(&self, elem: usize) -> AttribValue {
        let mut out = AttribValue::zeroed(self.comps);
        for c in 0..usize::from(self.comps) {
            out.set(c, self.component(elem, c));
        }
        out
    }

    /// Weighted combination of elements.
    ///
    /// Non-interpolated attributes take the value of the heaviest element.
    #[must_use]
    pub fn sample(&self, weights: &[(u32, f64)]) -> AttribValue {
        if !self.interpolate {
            let heaviest = weights
                .iter()
                .copied()
                .reduce(|best, w| if w.1 > best.1 { w } else { best });
            return heaviest.map_or_else(|| AttribValue::zeroed(self.comps), |(elem, _)| self.value(elem as usize));
        }
        let mut out = AttribValue::zeroed(self.comps);
        for &(elem, w) in weights {
            for c in 0..usize::from(self.comps) {
                out.set(c, out.get(c) + self.component(elem as usize, c) * w);
            }
        }
        out
    }

    /// Appends one element. Integer targets are rounded and saturated to the type range.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push(&mut self, value: &AttribValue) {
        let comps = usize::from(self.comps);
        match &mut self.data {
            AttribData::Float(v) => {
                for c in 0..comps {
                    v.push(value.get(c));
                }
            }
            AttribData::Int(v) => {
                let (lo, hi) = if self.usage == AttribUse::Color {
                    (0.0, self.scalar.unsigned_max())
                } else {
                    self.scalar.signed_range()
                };
                for c in 0..comps {
                    let x = value.get(c);
                    let x = if x.is_finite() { x.round().clamp(lo, hi) } else { 0.0 };
                    v.push(x as i64);
                }
            }
        }
    }
}

fn default_interpolate(usage: AttribUse) -> bool {
    !usage.is_discrete()
}

/// Attributes of one domain, looked up by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttribSet {
    attribs: Vec<Attrib>,
}

impl AttribSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an attribute, returning the one it replaced (same name).
    pub fn insert(&mut self, attrib: Attrib) -> Option<Attrib> {
        if let Some(slot) = self.attribs.iter_mut().find(|a| a.name == attrib.name) {
            return Some(std::mem::replace(slot, attrib));
        }
        self.attribs.push(attrib);
        None
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attrib> {
        self.attribs.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.attribs.iter().position(|a| a.name == name)
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Attrib> {
        self.attribs.get(index)
    }

    /// First attribute declared with `usage`.
    #[must_use]
    pub fn by_usage(&self, usage: AttribUse) -> Option<&Attrib> {
        self.attribs.iter().find(|a| a.usage == usage)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attrib> {
        self.attribs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attrib> {
        self.attribs.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attribs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attribs.is_empty()
    }
}

/// Names referenced by the integer values of an `Index` or `Material` attribute.
///
/// Value `i` of the attribute with the same name refers to `entries[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedAttrib {
    pub name: String,
    pub entries: Vec<String>,
}

impl IndexedAttrib {
    #[must_use]
    pub fn new<S: Into<String>>(name: impl Into<String>, entries: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn entry(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    /// Index of `entry`, appending it when missing.
    #[allow(clippy::cast_possible_wrap)]
    pub fn index_or_push(&mut self, entry: &str) -> i64 {
        if let Some(i) = self.entries.iter().position(|e| e == entry) {
            return i as i64;
        }
        self.entries.push(entry.to_owned());
        (self.entries.len() - 1) as i64
    }
}

/// Indexed attribute tables of one mesh, looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedAttribSet {
    tables: Vec<IndexedAttrib>,
}

impl IndexedAttribSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a table, returning the one it replaced (same name).
    pub fn insert(&mut self, table: IndexedAttrib) -> Option<IndexedAttrib> {
        if let Some(slot) = self.tables.iter_mut().find(|t| t.name == table.name) {
            return Some(std::mem::replace(slot, table));
        }
        self.tables.push(table);
        None
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&IndexedAttrib> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The table named `name`, created empty when missing.
    pub fn get_or_insert(&mut self, name: &str) -> &mut IndexedAttrib {
        let pos = match self.tables.iter().position(|t| t.name == name) {
            Some(pos) => pos,
            None => {
                self.tables.push(IndexedAttrib::new(name, Vec::<String>::new()));
                self.tables.len() - 1
            }
        };
        &mut self.tables[pos]
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedAttrib> {
        self.tables.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_interpolates_floats() {
        let attr = Attrib::float("w", AttribUse::Scalar, 1, vec![0.0, 10.0, 20.0]);
        let v = attr.sample(&[(1, 0.25), (2, 0.75)]);
        assert!((v.get(0) - 17.5).abs() < 1e-12);
    }

    #[test]
    fn test_index_attrib_takes_heaviest() {
        let attr = Attrib::int("id", ScalarType::I32, AttribUse::Index, 1, vec![7, 9]);
        let v = attr.sample(&[(0, 0.4), (1, 0.6)]);
        assert_eq!(v.get(0), 9.0);
    }

    #[test]
    fn test_push_saturates_integer_colors() {
        let mut attr = Attrib::int("col", ScalarType::I8, AttribUse::Color, 1, Vec::new());
        attr.push(&AttribValue::from_slice(&[300.4]));
        attr.push(&AttribValue::from_slice(&[-3.0]));
        attr.push(&AttribValue::from_slice(&[127.6]));
        assert_eq!(attr.data(), &AttribData::Int(vec![255, 0, 128]));
    }

    #[test]
    fn test_insert_replaces_by_name() {
        let mut set = AttribSet::new();
        set.insert(Attrib::float("a", AttribUse::Misc, 1, vec![1.0]));
        let old = set.insert(Attrib::float("a", AttribUse::Misc, 1, vec![2.0]));
        assert!(old.is_some());
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a").map(|a| a.component(0, 0)), Some(2.0));
    }

    #[test]
    fn test_indexed_attrib_appends_missing_entries() {
        let mut set = IndexedAttribSet::new();
        set.insert(IndexedAttrib::new("material", ["stone", "plaster"]));
        let table = set.get_or_insert("material");
        assert_eq!(table.index_or_push("plaster"), 1);
        assert_eq!(table.index_or_push("moss"), 2);
        assert_eq!(table.entry(2), Some("moss"));
        assert_eq!(table.entry(-1), None);
        assert!(set.get_or_insert("slots").entries.is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_discrete_usages_do_not_interpolate() {
        let attr = Attrib::int("mat", ScalarType::I8, AttribUse::Material, 1, vec![1, 4]);
        assert!(!attr.interpolate());
        assert_eq!(attr.sample(&[(0, 0.7), (1, 0.3)]).get(0), 1.0);
        assert!(AttribUse::Receive.is_consumed());
        assert!(!AttribUse::Material.is_consumed());
    }
}
