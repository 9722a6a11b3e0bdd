use std::ops::{Add, Mul, Neg, Sub};

// ─────────────────────────────────────────────────────────────────────────────
// Vec3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[must_use]
    pub const fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    /// Unit-length copy, or `None` for zero/non-finite vectors.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > 0.0 {
            Some(self.mul_scalar(1.0 / len))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn mul_scalar(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        self.mul_scalar(rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[must_use]
    pub const fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[must_use]
    pub const fn add_vec(self, v: Vec3) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    #[must_use]
    pub const fn sub_point(self, rhs: Self) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        p.to_array()
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;
    fn add(self, rhs: Vec3) -> Self::Output {
        self.add_vec(rhs)
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        self.sub_point(rhs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Uv
// ─────────────────────────────────────────────────────────────────────────────

/// A point (or offset) in UV space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Uv {
    pub u: f64,
    pub v: f64,
}

impl Uv {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.u * rhs.u + self.v * rhs.v
    }

    /// 2D cross product (z component of the 3D cross).
    #[must_use]
    pub const fn cross(self, rhs: Self) -> f64 {
        self.u * rhs.v - self.v * rhs.u
    }

    /// Counter-clockwise perpendicular.
    #[must_use]
    pub const fn perp(self) -> Self {
        Self::new(-self.v, self.u)
    }

    #[must_use]
    pub const fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        Self::new(self.u + (rhs.u - self.u) * t, self.v + (rhs.v - self.v) * t)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.u.is_finite() && self.v.is_finite()
    }
}

impl From<[f64; 2]> for Uv {
    fn from(arr: [f64; 2]) -> Self {
        Self::new(arr[0], arr[1])
    }
}

impl Add for Uv {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.u + rhs.u, self.v + rhs.v)
    }
}

impl Sub for Uv {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.u - rhs.u, self.v - rhs.v)
    }
}

impl Mul<f64> for Uv {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.u * rhs, self.v * rhs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tile
// ─────────────────────────────────────────────────────────────────────────────

/// Integer UV tile offset. The map repeats once per tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tile {
    pub u: i32,
    pub v: i32,
}

impl Tile {
    pub const ORIGIN: Self = Self::new(0, 0);

    #[must_use]
    pub const fn new(u: i32, v: i32) -> Self {
        Self { u, v }
    }

    #[must_use]
    pub fn offset(self) -> Uv {
        Uv::new(f64::from(self.u), f64::from(self.v))
    }

    #[must_use]
    pub const fn add(self, rhs: Self) -> Self {
        Self::new(self.u + rhs.u, self.v + rhs.v)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UvBox
// ─────────────────────────────────────────────────────────────────────────────

/// Axis-aligned box in UV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvBox {
    pub min: Uv,
    pub max: Uv,
}

impl UvBox {
    /// The unit tile `[0,1]²`.
    pub const UNIT: Self = Self::new(Uv::new(0.0, 0.0), Uv::new(1.0, 1.0));

    #[must_use]
    pub const fn new(min: Uv, max: Uv) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Uv>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first, first);
        for p in iter {
            bbox.min.u = bbox.min.u.min(p.u);
            bbox.min.v = bbox.min.v.min(p.v);
            bbox.max.u = bbox.max.u.max(p.u);
            bbox.max.v = bbox.max.v.max(p.v);
        }
        Some(bbox)
    }

    #[must_use]
    pub fn center(self) -> Uv {
        self.min.lerp(self.max, 0.5)
    }

    #[must_use]
    pub fn translate(self, offset: Uv) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }

    /// Closed overlap test (touching boxes overlap).
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.min.u <= other.max.u
            && self.max.u >= other.min.u
            && self.min.v <= other.max.v
            && self.max.v >= other.min.v
    }

    /// Overlap with positive area.
    #[must_use]
    pub fn overlaps_open(self, other: Self) -> bool {
        self.min.u < other.max.u
            && self.max.u > other.min.u
            && self.min.v < other.max.v
            && self.max.v > other.min.v
    }

    #[must_use]
    pub fn contains_box(self, other: Self) -> bool {
        other.min.u >= self.min.u
            && other.max.u <= self.max.u
            && other.min.v >= self.min.v
            && other.max.v <= self.max.v
    }

    #[must_use]
    pub fn intersection(self, other: Self) -> Option<Self> {
        let min = Uv::new(self.min.u.max(other.min.u), self.min.v.max(other.min.v));
        let max = Uv::new(self.max.u.min(other.max.u), self.max.v.min(other.max.v));
        (min.u <= max.u && min.v <= max.v).then_some(Self::new(min, max))
    }

    /// Number of tiles [`UvBox::tiles`] would report.
    ///
    /// `None` when a bound is not finite, falls outside the `i32` tile range,
    /// or the count does not fit in `usize`.
    #[must_use]
    pub fn tile_count(self) -> Option<usize> {
        let (u0, u1) = checked_tile_span(self.min.u, self.max.u)?;
        let (v0, v1) = checked_tile_span(self.min.v, self.max.v)?;
        let cols = i64::from(u1).checked_sub(i64::from(u0))?.checked_add(1)?;
        let rows = i64::from(v1).checked_sub(i64::from(v0))?.checked_add(1)?;
        usize::try_from(cols.checked_mul(rows)?).ok()
    }

    /// Integer tiles whose open unit square overlaps this box.
    ///
    /// A box that is degenerate along an axis still reports the tile containing it.
    /// Callers bound the result with [`UvBox::tile_count`] first; unrepresentable
    /// boxes report no tiles.
    #[must_use]
    pub fn tiles(self) -> Vec<Tile> {
        let Some(count) = self.tile_count() else {
            return Vec::new();
        };
        let (Some((u0, u1)), Some((v0, v1))) = (
            checked_tile_span(self.min.u, self.max.u),
            checked_tile_span(self.min.v, self.max.v),
        ) else {
            return Vec::new();
        };
        let mut tiles = Vec::with_capacity(count);
        for v in v0..=v1 {
            for u in u0..=u1 {
                tiles.push(Tile::new(u, v));
            }
        }
        tiles
    }
}

#[allow(clippy::cast_possible_truncation)]
fn checked_tile_span(min: f64, max: f64) -> Option<(i32, i32)> {
    let lo = min.floor();
    let hi = (max.ceil() - 1.0).max(lo);
    let range = f64::from(i32::MIN)..=f64::from(i32::MAX);
    (range.contains(&lo) && range.contains(&hi)).then(|| (lo as i32, hi as i32))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tangent frame
// ─────────────────────────────────────────────────────────────────────────────

/// Orthonormal tangent/bitangent/normal frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tbn {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Tbn {
    pub const IDENTITY: Self = Self {
        tangent: Vec3::X,
        bitangent: Vec3::Y,
        normal: Vec3::Z,
    };

    /// Builds a frame from a (possibly unnormalised) normal and tangent.
    ///
    /// The tangent is Gram-Schmidt orthogonalised against the normal and the
    /// bitangent is `cross(n, t) * sign`. Degenerate tangents are replaced by an
    /// arbitrary perpendicular axis.
    #[must_use]
    pub fn from_normal_tangent(normal: Vec3, tangent: Vec3, sign: f64) -> Self {
        let n = normal.normalized().unwrap_or(Vec3::Z);
        let t = (tangent - n * n.dot(tangent))
            .normalized()
            .unwrap_or_else(|| any_perpendicular(n));
        let sign = if sign < 0.0 { -1.0 } else { 1.0 };
        Self {
            tangent: t,
            bitangent: n.cross(t) * sign,
            normal: n,
        }
    }

    /// Maps a tangent-space vector into object space.
    #[must_use]
    pub fn to_object(self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }
}

impl Default for Tbn {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn any_perpendicular(n: Vec3) -> Vec3 {
    let axis = if n.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    n.cross(axis).normalized().unwrap_or(Vec3::X)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tolerance
// ─────────────────────────────────────────────────────────────────────────────

/// Tolerance configuration for geometric operations.
///
/// Named constants keep epsilons from scattering through the pipeline:
/// - `Tolerance::DEFAULT` - General UV/position comparisons (1e-9)
/// - `Tolerance::ZERO_LENGTH` - On-line classification and clip denominators (1e-12)
/// - `Tolerance::WELD` - Optional post-assembly vertex welding (1e-9)
/// - `Tolerance::LOOSE` - Coarse comparisons in tests and diagnostics (1e-6)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    pub const DEFAULT: Self = Self { eps: 1e-9 };
    pub const ZERO_LENGTH: Self = Self { eps: 1e-12 };
    pub const WELD: Self = Self { eps: 1e-9 };
    pub const LOOSE: Self = Self { eps: 1e-6 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    #[must_use]
    pub const fn default_geom() -> Self {
        Self::DEFAULT
    }

    #[must_use]
    pub const fn eps_squared(self) -> f64 {
        self.eps * self.eps
    }

    #[must_use]
    pub fn approx_eq_f64(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.eps
    }

    #[must_use]
    pub fn approx_eq_uv(self, a: Uv, b: Uv) -> bool {
        (a - b).length_squared() <= self.eps_squared()
    }

    #[must_use]
    pub fn approx_eq_point3(self, a: Point3, b: Point3) -> bool {
        a.sub_point(b).length_squared() <= self.eps_squared()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
