//! Santulan - balance control daemon
//!
//! Runs the fixed-rate balance loop against the in-crate pendulum
//! simulator and serves telemetry/tuning clients over TCP. Hardware
//! deployments construct [`santulan::app::BalanceApp`] with their own
//! driver implementations instead.

use santulan::app::{BalanceApp, StreamingAddresses};
use santulan::config::BalanceConfig;
use santulan::drivers::sim::SimRobot;
use santulan::drivers::Drive;
use santulan::error::Result;
use std::env;
use std::path::PathBuf;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `santulan <path>` (positional)
/// - `santulan --config <path>` (flag-based)
/// - `santulan -c <path>` (short flag)
///
/// Defaults to `santulan.toml` in the working directory.
fn parse_config_path() -> PathBuf {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return PathBuf::from(&args[i + 1]);
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return PathBuf::from(&args[1]);
    }

    PathBuf::from("santulan.toml")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Santulan v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = parse_config_path();
    log::info!("Using config: {}", config_path.display());
    let config = BalanceConfig::load_or_default(&config_path)?;

    // Simulated plant starting slightly off upright
    let (imu, motor) = SimRobot::new(2.0).split();
    let drive = Drive::dual(Box::new(motor));

    let mut app = BalanceApp::new(
        config,
        config_path,
        Box::new(imu),
        drive,
        StreamingAddresses::default(),
    )?;

    let control = app.control();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        control.request_shutdown();
    })
    .map_err(|e| santulan::Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    app.run()?;

    log::info!("Santulan stopped");
    Ok(())
}
