//! Message types for TCP streaming
//!
//! Outbound: one telemetry sample per control cycle. Inbound: tuning and
//! session-control commands from dashboards or tuning scripts, each
//! acknowledged with a reply frame.

use crate::config::BalanceConfig;
use crate::types::Direction;
use serde::{Deserialize, Serialize};

/// One control cycle's worth of telemetry, published at loop rate
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TelemetrySample {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    /// Filtered roll angle (degrees)
    pub actual_angle: f32,
    /// Setpoint in effect this cycle (degrees)
    pub target_angle: f32,
    /// setpoint - actual (degrees)
    pub error: f32,
    /// Filtered angular velocity (deg/s)
    pub angular_velocity: f32,
    pub p_term: f32,
    pub i_term: f32,
    pub d_term: f32,
    /// Clamped PID output, -100..100
    pub pid_output: f32,
    /// Speed actually commanded to the motors, 0..100
    pub motor_output: f32,
    /// Direction actually commanded
    pub direction: Direction,
}

/// Commands accepted on the tuning channel
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum TuningCommand {
    /// Update live gains and limits; absent fields keep their value.
    /// Applied atomically: all named fields change together or none do.
    UpdateParams {
        kp: Option<f32>,
        ki: Option<f32>,
        kd: Option<f32>,
        alpha: Option<f32>,
        target_angle: Option<f32>,
    },
    /// Fetch the full current configuration
    GetConfig,
    /// Start (or restart) a balancing session
    Start,
    /// Stop the current balancing session
    Stop,
    /// Shut the daemon down
    Shutdown,
}

/// Reply to a tuning command
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum TuningReply {
    /// Command outcome
    Ack { ok: bool, message: String },
    /// Response to `GetConfig`
    Config(BalanceConfig),
}

impl TuningReply {
    pub fn ok(message: impl Into<String>) -> Self {
        TuningReply::Ack {
            ok: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        TuningReply::Ack {
            ok: false,
            message: message.into(),
        }
    }
}
