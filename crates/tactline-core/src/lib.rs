//! Tactline Core - Foundation types for arrangement editing
//!
//! This crate provides the fundamental types used throughout Tactline:
//! - Tick time representation (Ticks, TickRange)
//! - Automation curves
//! - Error type and configuration

pub mod automation;
pub mod config;
pub mod error;
pub mod time;

pub use automation::{AutomationCurve, ControlPoint, CubicBezier, Progression};
pub use config::TimelineConfig;
pub use error::{Result, TactlineError};
pub use time::{TickRange, Ticks, TICKS_PER_TACT};
