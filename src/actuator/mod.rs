//! Servo actuator: discrete rotation plus an autonomous loiter sweep.
//!
//! The actuator is a single-owner resource. [`ActuatorController`] runs as one
//! actor task that applies commands strictly in arrival order, so `mode` and
//! the commanded angle always change together. Callers talk to it through the
//! cloneable [`ActuatorHandle`].
//!
//! ```text
//! Idle --toggle_loiter--> Loitering --toggle_loiter--> Idle
//! ```
//!
//! Rotation is only accepted while idle. Stopping a sweep is cooperative: the
//! sweep checks for cancellation before each move, so it halts once the move
//! in flight completes (at most one half-sweep at the loiter speed).

pub mod controller;
mod sweep;

pub use controller::{ActuatorController, ActuatorHandle};

use crate::error::{Result, SystemError};
use serde::{Deserialize, Serialize};

/// Lower travel limit in degrees.
pub const MIN_ANGLE: f64 = 0.0;

/// Upper travel limit in degrees.
pub const MAX_ANGLE: f64 = 180.0;

/// Position commanded at startup, before any request is accepted.
pub const NEUTRAL_ANGLE: f64 = 90.0;

/// Tunables for the actuator controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorSettings {
    /// Degrees added or subtracted per rotate command
    pub step_degrees: u32,
    /// Speed of rotate and return moves, degrees per second
    pub move_speed: f64,
    /// Speed of loiter sweep moves, degrees per second
    pub loiter_speed: f64,
}

/// Rotation direction, as seen from behind the servo horn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Left => f.write_str("left"),
            Direction::Right => f.write_str("right"),
        }
    }
}

/// Result of a completed rotate command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub direction: Direction,
    /// Angle after the move
    pub degree: f64,
    pub step_degrees: u32,
}

/// Result of a loiter toggle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoiterToggle {
    /// Whether the actuator is loitering after the toggle
    pub loitering: bool,
    /// Last commanded angle (the position the servo returns to when loitering stops)
    pub degree: f64,
}

/// Snapshot of the actuator state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorStatus {
    pub degree: f64,
    pub loitering: bool,
    pub step_degrees: u32,
}

/// Angle reached by one step from `current`, clamped to the travel limits.
///
/// Fails only when `current` already sits at the limit in that direction.
pub fn next_angle(current: f64, step_degrees: u32, direction: Direction) -> Result<f64> {
    let step = f64::from(step_degrees);
    match direction {
        Direction::Right if current >= MAX_ANGLE => Err(SystemError::range_error("max angle reached")),
        Direction::Left if current <= MIN_ANGLE => Err(SystemError::range_error("max angle reached")),
        Direction::Right => Ok((current + step).min(MAX_ANGLE)),
        Direction::Left => Ok((current - step).max(MIN_ANGLE)),
    }
}
