//! Tuning command receiver
//!
//! Handles one connected client: reads length-prefixed commands, applies
//! tuning updates atomically to the shared parameter store, persists
//! accepted updates, and acknowledges every command. A 500 ms read
//! timeout keeps the loop responsive to daemon shutdown.

use crate::error::{Error, Result};
use crate::shared::{ParamUpdate, SessionControl, SharedParams};
use crate::streaming::messages::{TuningCommand, TuningReply};
use crate::streaming::wire;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Per-client command loop over the tuning channel
pub struct TuningReceiver {
    params: SharedParams,
    control: Arc<SessionControl>,
    config_path: PathBuf,
}

impl TuningReceiver {
    pub fn new(params: SharedParams, control: Arc<SessionControl>, config_path: PathBuf) -> Self {
        Self {
            params,
            control,
            config_path,
        }
    }

    /// Run the receiver loop until the client disconnects or the daemon
    /// shuts down
    pub fn run(&mut self, mut stream: TcpStream) -> Result<()> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        log::info!("Tuning client connected: {}", peer);

        stream.set_read_timeout(Some(Duration::from_millis(500)))?;

        loop {
            if self.control.shutdown_requested() {
                break;
            }

            match wire::read_frame::<_, TuningCommand>(&mut stream) {
                Ok(Some(command)) => {
                    log::debug!("Tuning command from {}: {:?}", peer, command);
                    let reply = self.handle_command(command);
                    if let Err(e) = wire::write_frame(&mut stream, &reply) {
                        log::warn!("Failed to reply to {}: {}", peer, e);
                        break;
                    }
                }
                Ok(None) => {
                    // Read timeout, poll shutdown flag again
                }
                Err(Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof
                        || e.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    log::info!("Tuning client disconnected: {}", peer);
                    return Ok(());
                }
                Err(Error::Serialization(e)) => {
                    // Malformed command: reject it, keep the connection
                    log::warn!("Malformed command from {}: {}", peer, e);
                    let reply = TuningReply::rejected(format!("malformed command: {}", e));
                    if wire::write_frame(&mut stream, &reply).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("Tuning channel error for {}: {}", peer, e);
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, command: TuningCommand) -> TuningReply {
        match command {
            TuningCommand::UpdateParams {
                kp,
                ki,
                kd,
                alpha,
                target_angle,
            } => {
                let update = ParamUpdate {
                    kp,
                    ki,
                    kd,
                    alpha,
                    target_angle,
                };
                self.apply_update(&update)
            }
            TuningCommand::GetConfig => TuningReply::Config(self.params.snapshot()),
            TuningCommand::Start => {
                self.control.request_start();
                TuningReply::ok("balancing session start requested")
            }
            TuningCommand::Stop => {
                self.control.request_stop();
                TuningReply::ok("balancing session stop requested")
            }
            TuningCommand::Shutdown => {
                self.control.request_shutdown();
                TuningReply::ok("daemon shutting down")
            }
        }
    }

    /// Apply a validated update and persist it.
    ///
    /// Rejection leaves the store untouched. A persistence failure keeps
    /// the accepted in-memory values (last-known-good policy) and is only
    /// reported.
    fn apply_update(&mut self, update: &ParamUpdate) -> TuningReply {
        if update.is_empty() {
            return TuningReply::rejected("update names no parameters");
        }

        let applied = match self.params.apply(update) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Tuning update rejected: {}", e);
                return TuningReply::rejected(e.to_string());
            }
        };

        match applied.save(&self.config_path) {
            Ok(()) => TuningReply::ok("parameters applied and saved"),
            Err(e) => {
                log::error!(
                    "Failed to persist accepted parameters to {}: {}",
                    self.config_path.display(),
                    e
                );
                TuningReply::ok("parameters applied; persistence failed, values held in memory")
            }
        }
    }
}
