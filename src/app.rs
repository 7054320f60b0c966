//! Application orchestration for the santulan daemon
//!
//! Wires the estimator, drive, shared parameters, and streaming services
//! together, runs the supervisor on its own thread, and accepts tuning
//! clients until shutdown. The supervisor thread owns all control state;
//! other actors only touch the shared parameter store and the session
//! control flags.

use crate::balance::{BalanceSupervisor, StopReason};
use crate::config::BalanceConfig;
use crate::drivers::{Drive, ImuSensor};
use crate::error::Result;
use crate::estimator::OrientationEstimator;
use crate::shared::{SessionControl, SharedParams};
use crate::streaming::{TelemetryPublisher, TuningReceiver};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Network bind addresses for the streaming services
#[derive(Debug, Clone)]
pub struct StreamingAddresses {
    /// Outbound telemetry stream
    pub telemetry: String,
    /// Inbound tuning/command channel
    pub tuning: String,
}

impl Default for StreamingAddresses {
    fn default() -> Self {
        Self {
            telemetry: "0.0.0.0:6561".to_string(),
            tuning: "0.0.0.0:6562".to_string(),
        }
    }
}

/// Daemon application: owns the threads, flags, and shared stores
pub struct BalanceApp {
    params: SharedParams,
    control: Arc<SessionControl>,
    publisher: Arc<TelemetryPublisher>,
    supervisor: Option<BalanceSupervisor>,
    config_path: PathBuf,
    addresses: StreamingAddresses,
}

impl BalanceApp {
    /// Build the application from loaded configuration and collaborators
    pub fn new(
        config: BalanceConfig,
        config_path: PathBuf,
        imu: Box<dyn ImuSensor>,
        drive: Drive,
        addresses: StreamingAddresses,
    ) -> Result<Self> {
        log::info!("Initializing santulan application");

        let calibration = config.calibration;
        let params = SharedParams::new(config);
        let control = Arc::new(SessionControl::new());

        log::info!("Setting up telemetry publisher on {}", addresses.telemetry);
        let publisher = Arc::new(TelemetryPublisher::new(addresses.telemetry.clone())?);

        let estimator = OrientationEstimator::new(imu, calibration);
        let supervisor = BalanceSupervisor::new(estimator, drive, params.clone())
            .with_telemetry(Arc::clone(&publisher) as Arc<dyn crate::streaming::TelemetrySink>);

        Ok(Self {
            params,
            control,
            publisher,
            supervisor: Some(supervisor),
            config_path,
            addresses,
        })
    }

    /// Session control flags, shared with signal handlers
    pub fn control(&self) -> Arc<SessionControl> {
        Arc::clone(&self.control)
    }

    /// Run until shutdown is requested.
    ///
    /// Balancing starts immediately; after a session ends (safety trip or
    /// user stop) the supervisor thread idles until a `Start` command
    /// requests a fresh session.
    pub fn run(&mut self) -> Result<()> {
        let supervisor_thread = self.start_supervisor_thread()?;
        self.control.request_start();

        let accept_result = self.accept_loop();

        log::info!("Shutting down, waiting for supervisor thread");
        // The supervisor thread only exits on shutdown; a stop alone would
        // leave it idling when the accept loop fails early
        self.control.request_shutdown();
        self.control.request_stop();
        if let Err(e) = supervisor_thread.join() {
            log::error!("Supervisor thread panicked: {:?}", e);
        }

        accept_result
    }

    fn start_supervisor_thread(&mut self) -> Result<JoinHandle<()>> {
        let mut supervisor = self
            .supervisor
            .take()
            .expect("supervisor thread already started");
        let control = Arc::clone(&self.control);

        let handle = thread::Builder::new()
            .name("balance-control".to_string())
            .spawn(move || {
                while !control.shutdown_requested() {
                    if control.start.swap(false, std::sync::atomic::Ordering::Relaxed) {
                        control
                            .cancel
                            .store(false, std::sync::atomic::Ordering::Relaxed);
                        match supervisor.run(&control.cancel) {
                            Ok(StopReason::UserRequested) => {}
                            Ok(StopReason::SafetyLimit { .. }) => {
                                log::warn!("Session ended by safety cutoff, awaiting restart");
                            }
                            Err(e) => {
                                log::error!("Session failed: {}", e);
                            }
                        }
                    } else {
                        thread::sleep(Duration::from_millis(50));
                    }
                }
                log::debug!("Supervisor thread exiting");
            })?;

        Ok(handle)
    }

    /// Accept tuning clients until shutdown; one receiver thread each
    fn accept_loop(&self) -> Result<()> {
        log::info!("Tuning channel listening on {}", self.addresses.tuning);
        let listener = TcpListener::bind(&self.addresses.tuning)?;
        listener.set_nonblocking(true)?;

        while !self.control.shutdown_requested() {
            match listener.accept() {
                Ok((stream, addr)) => {
                    let mut receiver = TuningReceiver::new(
                        self.params.clone(),
                        Arc::clone(&self.control),
                        self.config_path.clone(),
                    );
                    let builder =
                        thread::Builder::new().name(format!("tuning-client-{}", addr.port()));
                    if let Err(e) = builder.spawn(move || {
                        if let Err(e) = receiver.run(stream) {
                            log::error!("Tuning client {} failed: {}", addr, e);
                        }
                    }) {
                        log::error!("Failed to spawn tuning client thread: {}", e);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    log::error!("Tuning accept failed: {}", e);
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }

        log::debug!(
            "Accept loop exiting, {} telemetry samples dropped in total",
            self.publisher.dropped_samples()
        );
        Ok(())
    }
}
