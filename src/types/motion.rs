//! Motor command types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Motor rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Drive forward (positive control output)
    Forward,
    /// Drive in reverse (negative control output)
    Reverse,
    /// Motor stopped
    Stop,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
            Direction::Stop => write!(f, "stop"),
        }
    }
}

/// Drive side for per-wheel actuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One cycle's actuation command: normalized speed plus direction.
///
/// Derived fresh every cycle and never retained beyond it; only the
/// mapper's `last_direction` memory survives between cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    /// Speed percentage, 0-100
    pub speed: f32,
    /// Rotation direction
    pub direction: Direction,
}

impl MotorCommand {
    /// Stopped command
    pub fn stop() -> Self {
        Self {
            speed: 0.0,
            direction: Direction::Stop,
        }
    }
}
