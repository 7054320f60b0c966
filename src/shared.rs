//! Shared parameter store
//!
//! The live configuration is shared between two actors: the fixed-rate
//! control loop (snapshot reader every cycle) and the tuning channel
//! (occasional writer). Access goes through one mutex and always moves
//! whole configurations, so neither side can observe a half-applied update.

use crate::config::BalanceConfig;
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fields a tuning request may change. Absent fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamUpdate {
    pub kp: Option<f32>,
    pub ki: Option<f32>,
    pub kd: Option<f32>,
    pub alpha: Option<f32>,
    pub target_angle: Option<f32>,
}

impl ParamUpdate {
    /// True when the request changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Handle to the live, concurrently accessed parameter set.
///
/// Cloning the handle shares the same underlying store.
#[derive(Clone)]
pub struct SharedParams {
    inner: Arc<Mutex<BalanceConfig>>,
}

impl SharedParams {
    /// Create a store holding the given configuration
    pub fn new(config: BalanceConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(config)),
        }
    }

    /// Copy the full configuration under a single lock hold.
    ///
    /// The control loop calls this once per cycle instead of re-locking
    /// per field.
    pub fn snapshot(&self) -> BalanceConfig {
        self.inner.lock().clone()
    }

    /// Apply a tuning update atomically.
    ///
    /// The update is validated against a modified copy first; on any
    /// rejection the stored configuration is untouched. On success the new
    /// configuration replaces the old in one swap and a snapshot of it is
    /// returned for persistence.
    pub fn apply(&self, update: &ParamUpdate) -> Result<BalanceConfig> {
        let mut guard = self.inner.lock();
        let mut candidate = guard.clone();

        if let Some(kp) = update.kp {
            candidate.p_gain = kp;
        }
        if let Some(ki) = update.ki {
            candidate.i_gain = ki;
        }
        if let Some(kd) = update.kd {
            candidate.d_gain = kd;
        }
        if let Some(alpha) = update.alpha {
            candidate.imu_filter_alpha = alpha;
        }
        if let Some(target) = update.target_angle {
            candidate.setpoint = target;
        }

        candidate.validate()?;
        *guard = candidate.clone();
        Ok(candidate)
    }

    /// Replace the stored configuration wholesale
    pub fn replace(&self, config: BalanceConfig) {
        *self.inner.lock() = config;
    }
}

/// Cross-thread session control flags.
///
/// The supervisor thread polls these non-blockingly; the tuning channel
/// and the signal handler set them. All are level-triggered booleans, no
/// ordering between them matters beyond each flag's own visibility.
#[derive(Debug, Default)]
pub struct SessionControl {
    /// Request to (re)start a balancing session
    pub start: std::sync::atomic::AtomicBool,
    /// Request to stop the current session (user stop)
    pub cancel: std::sync::atomic::AtomicBool,
    /// Daemon shutdown
    pub shutdown: std::sync::atomic::AtomicBool,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_start(&self) {
        self.start.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn request_stop(&self) {
        self.cancel.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(std::sync::atomic::Ordering::Relaxed)
    }
}
