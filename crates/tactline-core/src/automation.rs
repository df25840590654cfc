//! Automation curves carried by automation blocks.
//!
//! A curve is a sorted list of control points positioned in ticks
//! relative to the start of the owning block. Values between points are
//! interpolated using the progression of the earlier point.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::Ticks;

// ── Progression shapes ──────────────────────────────────────────

/// Cubic Bézier control points for easing (x1, y1, x2, y2).
/// The curve goes from (0,0) to (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn sample_x(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * self.x1 + 3.0 * mt * t * t * self.x2 + t * t * t
    }

    fn sample_y(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * self.y1 + 3.0 * mt * t * t * self.y2 + t * t * t
    }

    fn sample_dx(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * self.x1 + 6.0 * mt * t * (self.x2 - self.x1) + 3.0 * t * t * (1.0 - self.x2)
    }

    /// Map `x` in `[0, 1]` onto the curve using Newton-Raphson on the
    /// parameter, returning the y value.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let mut t = x;
        for _ in 0..8 {
            let err = self.sample_x(t) - x;
            let dx = self.sample_dx(t);
            if dx.abs() < 1e-12 {
                break;
            }
            t = (t - err / dx).clamp(0.0, 1.0);
            if err.abs() < 1e-10 {
                break;
            }
        }

        self.sample_y(t)
    }

    pub const LINEAR: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    pub const EASE_IN: Self = Self::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: Self = Self::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: Self = Self::new(0.42, 0.0, 0.58, 1.0);
}

/// How a value travels from one control point to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Progression {
    /// Keep the value until the next point (step automation).
    Discrete,
    #[default]
    Linear,
    Bezier(CubicBezier),
}

// ── Control point ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Offset from the start of the owning block.
    pub offset: Ticks,
    pub value: f64,
    /// Progression towards the next point.
    pub progression: Progression,
}

// ── Curve ───────────────────────────────────────────────────────

/// The payload of an automation block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AutomationCurve {
    /// Name of the automated parameter, empty while unassigned.
    pub target: String,
    points: Vec<ControlPoint>,
}

impl AutomationCurve {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            points: Vec::new(),
        }
    }

    /// Insert or overwrite the point at `offset`. Negative offsets clamp to zero.
    pub fn set(&mut self, offset: Ticks, value: f64, progression: Progression) {
        let offset = offset.clamped();
        match self.points.binary_search_by(|p| p.offset.cmp(&offset)) {
            Ok(idx) => {
                self.points[idx].value = value;
                self.points[idx].progression = progression;
            }
            Err(idx) => self.points.insert(
                idx,
                ControlPoint {
                    offset,
                    value,
                    progression,
                },
            ),
        }
    }

    pub fn remove(&mut self, offset: Ticks) -> bool {
        match self.points.binary_search_by(|p| p.offset.cmp(&offset)) {
            Ok(idx) => {
                self.points.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    /// Value at `offset` ticks into the block.
    pub fn value_at(&self, offset: Ticks) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if offset <= first.offset {
            return first.value;
        }
        if offset >= last.offset {
            return last.value;
        }
        let idx = self
            .points
            .partition_point(|p| p.offset <= offset)
            .saturating_sub(1);
        Self::interpolate(&self.points[idx], &self.points[idx + 1], offset)
    }

    fn interpolate(a: &ControlPoint, b: &ControlPoint, offset: Ticks) -> f64 {
        let span = (b.offset - a.offset).get();
        if span <= 0 {
            return a.value;
        }
        let t = ((offset - a.offset).get() as f64 / span as f64).clamp(0.0, 1.0);

        match a.progression {
            Progression::Discrete => a.value,
            Progression::Linear => a.value + (b.value - a.value) * t,
            Progression::Bezier(bezier) => a.value + (b.value - a.value) * bezier.evaluate(t),
        }
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Offset of the last control point, if any.
    pub fn last_offset(&self) -> Option<Ticks> {
        self.points.last().map(|p| p.offset)
    }
}

impl fmt::Display for AutomationCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AutomationCurve({}, {} points)", self.target, self.points.len())
    }
}
