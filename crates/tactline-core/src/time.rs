//! Tick-based timeline positions.
//!
//! All positions and lengths on the arrangement are integer tick counts.
//! A fixed number of ticks make up one tact (bar).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Ticks in one tact (bar).
pub const TICKS_PER_TACT: i64 = 192;

/// A timeline position, length, or signed delta in ticks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ticks(i64);

impl Ticks {
    /// Zero ticks.
    pub const ZERO: Self = Self(0);

    /// One full tact.
    pub const TACT: Self = Self(TICKS_PER_TACT);

    /// Latest representable position.
    pub const MAX: Self = Self(i64::MAX);

    /// Create a tick value.
    #[inline]
    pub const fn new(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Create a tick value from a whole number of tacts, saturating at
    /// the ends of the tick range.
    #[inline]
    pub const fn from_tacts(tacts: i64) -> Self {
        Self(tacts.saturating_mul(TICKS_PER_TACT))
    }

    /// Raw tick count.
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whole tacts contained in this value, rounded down.
    #[inline]
    pub const fn tacts(self) -> i64 {
        self.0.div_euclid(TICKS_PER_TACT)
    }

    /// Ticks past the last whole tact.
    #[inline]
    pub const fn tick_in_tact(self) -> i64 {
        self.0.rem_euclid(TICKS_PER_TACT)
    }

    /// Negative values become zero.
    #[inline]
    pub fn clamped(self) -> Self {
        Self(self.0.max(0))
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl From<i64> for Ticks {
    fn from(ticks: i64) -> Self {
        Self(ticks)
    }
}

// Arithmetic saturates: positions past either end of the range pin
// there instead of wrapping.

impl Add for Ticks {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Ticks {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Ticks {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Ticks {
    type Output = Self;
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Mul<i64> for Ticks {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }
}

impl fmt::Display for Ticks {
    /// Formats as `tact:tick`, tacts counted from 1.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:03}", self.tacts() + 1, self.tick_in_tact())
    }
}

/// A closed tick interval `[start, end]`.
///
/// Closed on both ends: a block ending exactly where the range starts
/// still counts as overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    pub start: Ticks,
    pub end: Ticks,
}

impl TickRange {
    #[inline]
    pub fn new(start: Ticks, end: Ticks) -> Self {
        Self { start, end }
    }

    /// Range covering `tacts` whole tacts starting at tact `first`.
    pub fn tacts(first: i64, tacts: i64) -> Self {
        Self::new(Ticks::from_tacts(first), Ticks::from_tacts(first + tacts))
    }

    #[inline]
    pub fn len(self) -> Ticks {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    #[inline]
    pub fn contains(self, tick: Ticks) -> bool {
        tick >= self.start && tick <= self.end
    }

    /// Whether the span `[start, end]` shares at least one tick with this range.
    #[inline]
    pub fn overlaps(self, start: Ticks, end: Ticks) -> bool {
        start <= self.end && end >= self.start
    }
}
