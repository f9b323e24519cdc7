//! Diffuser controller: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     LogEventSink   FileStore      SystemClock │
//! │  (HvacInput+Output)  (EventSink)    (State+History) (Clock)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (control loop)                 │    │
//! │  │  Debounce · Activation FSM · Duty cycle · Oil ledger   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                  ▲ ControlHandle (requests, snapshots)         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Environment:
//! - `DIFFUSER_DATA_DIR`: where `state.json` and `history.bin` live (default `.`)
//! - `DIFFUSER_GPIO_CHIP`: gpiochip device (default `/dev/gpiochip0`)
//! - `RUST_LOG`: log filter (default `info`)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use diffuser::adapters::gpio;
use diffuser::adapters::log_sink::LogEventSink;
use diffuser::adapters::storage::FileStore;
use diffuser::adapters::time::SystemClock;
use diffuser::app::ports::{HistoryLogPort, PersistError, StatePort};
use diffuser::app::service::AppService;
use diffuser::config::{CONTROL_PERIOD, StateRecord};
use diffuser::pins;

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("diffuser v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Process settings ───────────────────────────────────
    let data_dir = std::env::var("DIFFUSER_DATA_DIR").unwrap_or_else(|_| ".".to_owned());
    let chip = std::env::var("DIFFUSER_GPIO_CHIP").unwrap_or_else(|_| pins::GPIO_CHIP.to_owned());

    // ── 3. Persisted state ────────────────────────────────────
    let mut store = FileStore::open(&data_dir)
        .with_context(|| format!("opening data directory {data_dir}"))?;

    let record = match store.load() {
        Ok(record) => record,
        Err(PersistError::NotFound) => {
            info!("No saved state, starting with defaults (system disabled)");
            StateRecord::default()
        }
        Err(e) => {
            warn!("Saved state unusable ({e}), starting with defaults");
            StateRecord::default()
        }
    };
    let history = store.load_history().unwrap_or_else(|e| {
        warn!("History log unreadable ({e}), starting empty");
        Vec::new()
    });

    // ── 4. Hardware ───────────────────────────────────────────
    let mut hw =
        gpio::open(&chip).with_context(|| format!("opening GPIO lines on {chip}"))?;
    let clock = SystemClock::new();
    let mut sink = LogEventSink::new();

    // ── 5. Control core ───────────────────────────────────────
    let mut app = AppService::new(record, history, Utc::now());
    if let Err(e) = store.compact(&app.history()) {
        warn!("History compaction at startup failed: {e}");
    }
    app.start(&mut sink);

    // ── 6. Signals ────────────────────────────────────────────
    let should_terminate = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&should_terminate))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&should_terminate))?;

    // ── 7. Control loop ───────────────────────────────────────
    info!("System ready. Entering control loop.");
    let mut next = Instant::now();
    while !should_terminate.load(Ordering::Relaxed) {
        app.tick(&mut hw, &clock, &mut store, &mut sink);

        next += CONTROL_PERIOD;
        let now = Instant::now();
        if next > now {
            std::thread::sleep(next - now);
        } else if now - next > Duration::from_secs(5) {
            warn!("Control loop fell {:?} behind, resynchronising", now - next);
            next = now;
        }
    }

    // ── 8. Shutdown ───────────────────────────────────────────
    info!("Termination requested");
    app.shutdown(&mut hw, &mut store);
    Ok(())
}
