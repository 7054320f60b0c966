//! PID regulator
//!
//! Turns tilt error plus measured angular rate into a bounded control
//! output. The derivative term uses the gyro's angular velocity instead of
//! a finite difference of successive errors; differencing amplifies sensor
//! noise. Anti-windup clamps the integral accumulator itself, after
//! accumulation and before scaling, so the bound does not shift with the
//! integral gain.

use crate::config::BalanceConfig;

/// P/I/D components of the last computed output, captured for telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

/// PID regulator state. Gains and setpoint live in the shared parameter
/// store and are supplied per cycle via the config snapshot.
#[derive(Debug, Default)]
pub struct PidRegulator {
    integral: f32,
    previous_error: f32,
    terms: PidTerms,
}

impl PidRegulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the control output for one cycle, clamped to [-100, 100].
    ///
    /// `angular_velocity` is the filtered rate from the estimator in
    /// deg/s; the D term opposes it (counters current rotation, not error
    /// decrease).
    pub fn compute(
        &mut self,
        current_angle: f32,
        angular_velocity: f32,
        dt: f32,
        params: &BalanceConfig,
    ) -> f32 {
        let error = params.setpoint - current_angle;

        self.integral += error * dt;
        self.integral = self.integral.clamp(-params.max_i_term, params.max_i_term);

        self.terms = PidTerms {
            p: params.p_gain * error,
            i: params.i_gain * self.integral,
            d: -params.d_gain * angular_velocity,
        };

        self.previous_error = error;

        let output = self.terms.p + self.terms.i + self.terms.d;
        output.clamp(-100.0, 100.0)
    }

    /// Last cycle's term breakdown
    pub fn terms(&self) -> PidTerms {
        self.terms
    }

    /// Current integral accumulator value
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Zero all accumulated state. Must run on every session (re)start so
    /// no integral carries over from a stale session.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
        self.terms = PidTerms::default();
    }
}
