//! Fixed-point geometry for the battlefield.
//!
//! Both peers integrate movement with the same fixed-point arithmetic, so a
//! unit given the same destination ends up on the same pixel on either side.
//! Floats only appear at the wire boundary ([`Vec2Fixed::from_f64`] and
//! [`Vec2Fixed::to_f64`]).

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// 32 integer bits and 32 fractional bits. World coordinates stay well inside
/// the integer range even when squared for distance comparisons.
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Shorthand for an integer-valued fixed-point number.
#[must_use]
pub fn fx(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Clamp a fixed-point value into `[lo, hi]`.
#[must_use]
pub fn clamp(value: Fixed, lo: Fixed, hi: Fixed) -> Fixed {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}

/// Fraction `elapsed / total` clamped into `[0, 1]`.
///
/// A zero `total` counts as already finished.
#[must_use]
pub fn progress_ratio(elapsed_ms: u64, total_ms: u64) -> Fixed {
    if total_ms == 0 {
        return fx(1);
    }
    let elapsed = elapsed_ms.min(total_ms);
    clamp(
        Fixed::from_num(elapsed) / Fixed::from_num(total_ms),
        Fixed::ZERO,
        fx(1),
    )
}

/// Milliseconds to seconds as a fixed-point number.
#[must_use]
pub fn ms_to_seconds(ms: u64) -> Fixed {
    Fixed::from_num(ms) / fx(1000)
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Build from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(fx(x), fx(y))
    }

    /// Build from wire coordinates.
    #[must_use]
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(Fixed::saturating_from_num(x), Fixed::saturating_from_num(y))
    }

    /// Convert to wire coordinates.
    #[must_use]
    pub fn to_f64(self) -> (f64, f64) {
        (self.x.to_num::<f64>(), self.y.to_num::<f64>())
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Whether both components are zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Shorten the vector to `max` if it is longer.
    #[must_use]
    pub fn clamp_length(self, max: Fixed) -> Self {
        let len = self.length();
        if len <= max || len == Fixed::ZERO {
            self
        } else {
            self.scale(max / len)
        }
    }

    /// Clamp each component into the rectangle `[min, max]`.
    #[must_use]
    pub fn clamp_to(self, min: Self, max: Self) -> Self {
        Self::new(clamp(self.x, min.x, max.x), clamp(self.y, min.y, max.y))
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > fx(1) { value } else { fx(1) };

    for _ in 0..48 {
        let mid = (low + high) / fx(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}
