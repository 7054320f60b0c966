//! TCP streaming: outbound telemetry, inbound tuning commands

pub mod messages;
pub mod publisher;
pub mod receiver;
pub mod wire;

pub use messages::{TelemetrySample, TuningCommand, TuningReply};
pub use publisher::TelemetryPublisher;
pub use receiver::TuningReceiver;

/// Sink for per-cycle telemetry samples.
///
/// Implementations must never block the control loop; a full or absent
/// sink silently drops samples.
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, sample: &TelemetrySample);
}
