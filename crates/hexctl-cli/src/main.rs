//! `hexctl` – operator console for the hexapod motion supervisor.
//!
//! This binary wires the control core to the simulated HAL (real servo,
//! LED, and sensor drivers live on the robot and are out of scope here):
//!
//! 1. Initialises structured logging from `RUST_LOG`
//!    (`HEXCTL_LOG_FORMAT=json` switches to newline-delimited JSON).
//! 2. Loads `servo_offsets.json` and `pan_tilt_limits.json`, falling back
//!    to defaults when either is missing or malformed.
//! 3. Starts the motion worker and drops into the operator console.
//! 4. Intercepts **Ctrl-C** to engage the stop gate and shut down safely.

mod config;
mod console;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tracing::warn;

use hexctl_core::{ControlConfig, HardwareSet, Supervisor};
use hexctl_hal::sim::{CallJournal, SimBattery, SimBuzzer, SimLed, SimMotion, SimUltrasonic};

#[tokio::main]
async fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("HEXCTL_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let offsets = config::load_offsets();
    let limits = config::load_limits();
    println!(
        "  Pan bounds {}..{}  tilt bounds {}..{}",
        limits.pan_min, limits.pan_max, limits.tilt_min, limits.tilt_max
    );

    // ── Supervisor over the sim HAL ───────────────────────────────────────
    let journal = CallJournal::new();
    let hardware = HardwareSet {
        motion: SimMotion::new(&journal),
        led: SimLed::new(&journal),
        buzzer: SimBuzzer::new(&journal),
        ultrasonic: Box::new(SimUltrasonic { distance_cm: 42.0 }),
        battery: Box::new(SimBattery { volts: 7.4 }),
    };
    let sup = Arc::new(Supervisor::new(
        hardware,
        ControlConfig {
            limits,
            offsets,
            ..ControlConfig::default()
        },
    ));
    let worker = sup.start();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        let sup = sup.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            println!();
            println!("{}", "Ctrl-C received; stopping all actuation.".yellow().bold());
            sup.stop_all();
            shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    // ── Console ───────────────────────────────────────────────────────────
    let console = {
        let shutdown = shutdown.clone();
        let sup = sup.clone();
        let journal = journal.clone();
        tokio::task::spawn_blocking(move || console::run(shutdown, sup, journal))
    };
    if let Err(e) = console.await {
        warn!(error = %e, "console task failed");
    }

    // ── Teardown ──────────────────────────────────────────────────────────
    sup.shutdown();
    let _ = worker.await;
    println!("{}", "All servos relaxed. Bye.".green());
}

fn print_banner() {
    println!();
    println!("{}", "hexctl – hexapod motion supervisor".bold());
    println!("  Type {} for commands.", "help".bold().cyan());
    println!();
}
