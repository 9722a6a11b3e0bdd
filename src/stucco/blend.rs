//! Blending of attributes present on both the map and the input mesh.

use serde::{Deserialize, Serialize};

use crate::geom::{Attrib, AttribUse, AttribValue, Domain, ScalarType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Replace,
    Multiply,
    Divide,
    Add,
    Subtract,
    AddSub,
    Lighten,
    Darken,
    Overlay,
    SoftLight,
    ColorDodge,
}

impl BlendMode {
    pub const ALL: [Self; 11] = [
        Self::Replace,
        Self::Multiply,
        Self::Divide,
        Self::Add,
        Self::Subtract,
        Self::AddSub,
        Self::Lighten,
        Self::Darken,
        Self::Overlay,
        Self::SoftLight,
        Self::ColorDodge,
    ];

    /// Combines base `a` with `b`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Replace => b,
            Self::Multiply => a * b,
            Self::Divide => {
                if b == 0.0 {
                    a
                } else {
                    a / b
                }
            }
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::AddSub => a + b - (1.0 - b),
            Self::Lighten => a.max(b),
            Self::Darken => a.min(b),
            Self::Overlay => {
                if a < 0.5 {
                    2.0 * a * b
                } else {
                    1.0 - 2.0 * (1.0 - a) * (1.0 - b)
                }
            }
            Self::SoftLight => {
                if b < 0.5 {
                    2.0 * a * b + a * a * (1.0 - 2.0 * b)
                } else {
                    2.0 * a * (1.0 - b) + a.sqrt() * (2.0 * b - 1.0)
                }
            }
            Self::ColorDodge => {
                let inv = 1.0 - b;
                if inv == 0.0 { 1.0 } else { a / inv }
            }
        }
    }

    /// Whether the mode may be used on attributes of `usage`.
    #[must_use]
    pub const fn allowed_for(self, usage: AttribUse) -> bool {
        match usage {
            AttribUse::Index | AttribUse::Material => matches!(self, Self::Replace | Self::Lighten | Self::Darken),
            AttribUse::Scalar => matches!(
                self,
                Self::Replace | Self::Multiply | Self::Divide | Self::Add | Self::Subtract | Self::Lighten | Self::Darken
            ),
            _ => true,
        }
    }

    /// The mode actually applied to `usage`; disallowed modes become `Replace`.
    #[must_use]
    pub const fn effective(self, usage: AttribUse) -> Self {
        if self.allowed_for(usage) { self } else { Self::Replace }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlendConfigError {
    #[error("opacity {0} is outside [0, 1]")]
    Opacity(f64),
    #[error("float clamp min {min} exceeds max {max}")]
    FloatClamp { min: f64, max: f64 },
    #[error("integer clamp min {min} exceeds max {max}")]
    IntClamp { min: i64, max: i64 },
    #[error("{0} must be finite")]
    NonFinite(&'static str),
}

/// How one common attribute combines its input and map values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub mode: BlendMode,
    pub opacity: f64,
    pub clamp: bool,
    pub f_min: f64,
    pub f_max: f64,
    pub i_min: i64,
    pub i_max: i64,
    /// Swap the operands: the map value becomes the base.
    pub order: bool,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            mode: BlendMode::Replace,
            opacity: 1.0,
            clamp: false,
            f_min: 0.0,
            f_max: 1.0,
            i_min: 0,
            i_max: 255,
            order: false,
        }
    }
}

impl BlendConfig {
    #[must_use]
    pub fn new(mode: BlendMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    #[must_use]
    pub const fn with_float_clamp(mut self, min: f64, max: f64) -> Self {
        self.clamp = true;
        self.f_min = min;
        self.f_max = max;
        self
    }

    #[must_use]
    pub const fn with_int_clamp(mut self, min: i64, max: i64) -> Self {
        self.clamp = true;
        self.i_min = min;
        self.i_max = max;
        self
    }

    #[must_use]
    pub const fn with_order(mut self, order: bool) -> Self {
        self.order = order;
        self
    }

    pub fn validate(&self) -> Result<(), BlendConfigError> {
        if !self.opacity.is_finite() {
            return Err(BlendConfigError::NonFinite("opacity"));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(BlendConfigError::Opacity(self.opacity));
        }
        if !self.f_min.is_finite() || !self.f_max.is_finite() {
            return Err(BlendConfigError::NonFinite("float clamp bounds"));
        }
        if self.clamp && self.f_min > self.f_max {
            return Err(BlendConfigError::FloatClamp {
                min: self.f_min,
                max: self.f_max,
            });
        }
        if self.clamp && self.i_min > self.i_max {
            return Err(BlendConfigError::IntClamp {
                min: self.i_min,
                max: self.i_max,
            });
        }
        Ok(())
    }

    /// Blends one element. `input` is the base operand unless `order` is set.
    ///
    /// Integer colors are normalised to `[0, 1]` by their unsigned range
    /// while blending. Non-finite results fall back to the base operand.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn blend(&self, scalar: ScalarType, usage: AttribUse, input: &AttribValue, map: &AttribValue) -> AttribValue {
        let mode = self.mode.effective(usage);
        let scale = if usage == AttribUse::Color && !scalar.is_float() {
            scalar.unsigned_max()
        } else {
            1.0
        };
        let (base, other) = if self.order { (map, input) } else { (input, map) };
        let comps = input.comps().max(map.comps());
        let mut out = AttribValue::zeroed(comps);
        for c in 0..usize::from(comps) {
            let a = base.get(c) / scale;
            let b = other.get(c) / scale;
            let mut r = mode.apply(a, b);
            if !r.is_finite() {
                r = a;
            }
            r *= scale;
            let a = a * scale;
            if self.clamp {
                r = if scalar.is_float() {
                    r.clamp(self.f_min, self.f_max)
                } else {
                    r.clamp(self.i_min as f64, self.i_max as f64)
                };
            }
            out.set(c, a + (r - a) * self.opacity);
        }
        out
    }
}

/// Default blend configs handed out by `query_common_attribs`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDefaults {
    pub base: BlendConfig,
    /// Per scalar type replacements of `base`.
    pub per_type: Vec<(ScalarType, BlendConfig)>,
}

impl TypeDefaults {
    #[must_use]
    pub fn with_type(mut self, scalar: ScalarType, config: BlendConfig) -> Self {
        self.per_type.retain(|(s, _)| *s != scalar);
        self.per_type.push((scalar, config));
        self
    }

    #[must_use]
    pub fn for_type(&self, scalar: ScalarType) -> BlendConfig {
        self.per_type
            .iter()
            .find(|(s, _)| *s == scalar)
            .map_or(self.base, |(_, config)| *config)
    }
}

/// An attribute with the same name on both meshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonAttrib {
    pub name: String,
    pub scalar: ScalarType,
    pub comps: u8,
    pub usage: AttribUse,
    pub config: BlendConfig,
}

impl CommonAttrib {
    #[must_use]
    pub fn from_attrib(attrib: &Attrib, config: BlendConfig) -> Self {
        Self {
            name: attrib.name().to_owned(),
            scalar: attrib.scalar(),
            comps: attrib.comps(),
            usage: attrib.usage(),
            config,
        }
    }
}

/// Common attributes per domain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonAttribList {
    pub mesh: Vec<CommonAttrib>,
    pub face: Vec<CommonAttrib>,
    pub corner: Vec<CommonAttrib>,
    pub edge: Vec<CommonAttrib>,
    pub vert: Vec<CommonAttrib>,
}

impl CommonAttribList {
    #[must_use]
    pub fn domain(&self, domain: Domain) -> &[CommonAttrib] {
        match domain {
            Domain::Mesh => &self.mesh,
            Domain::Face => &self.face,
            Domain::Corner => &self.corner,
            Domain::Edge => &self.edge,
            Domain::Vert => &self.vert,
        }
    }

    pub fn domain_mut(&mut self, domain: Domain) -> &mut Vec<CommonAttrib> {
        match domain {
            Domain::Mesh => &mut self.mesh,
            Domain::Face => &mut self.face,
            Domain::Corner => &mut self.corner,
            Domain::Edge => &mut self.edge,
            Domain::Vert => &mut self.vert,
        }
    }

    #[must_use]
    pub fn get(&self, domain: Domain, name: &str) -> Option<&CommonAttrib> {
        self.domain(domain).iter().find(|a| a.name == name)
    }

    /// Sets the config of `name` in every domain it appears in. Returns false if it appears nowhere.
    pub fn set_config(&mut self, name: &str, config: BlendConfig) -> bool {
        let mut found = false;
        for domain in Domain::ALL {
            for attrib in self.domain_mut(domain).iter_mut().filter(|a| a.name == name) {
                attrib.config = config;
                found = true;
            }
        }
        found
    }

    #[must_use]
    pub fn len(&self) -> usize {
        Domain::ALL.iter().map(|&d| self.domain(d).len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<(), BlendConfigError> {
        for domain in Domain::ALL {
            for attrib in self.domain(domain) {
                attrib.config.validate()?;
            }
        }
        Ok(())
    }
}
