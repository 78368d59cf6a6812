#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod lib_cpu;
pub mod lib_mem;
pub mod metrics;
pub mod service;
pub mod shutdown;
pub mod stats;
pub mod validation;

pub use config::Config;
pub use domain::{AppState, Limits, PressureMode, PressureRequest, PressureSummary, StressQuery};
pub use error::PressureError;
pub use http::{clear, health, root, routes, scrape_metrics, server, stress, ApiError};
pub use lib_cpu::{BurnResult, CpuBurner};
pub use lib_mem::MemoryLedger;
pub use metrics::Metrics;
pub use service::PressureDispatcher;
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome, ShutdownState};
pub use stats::ProcessProbe;
pub use validation::validate_stress;

use anyhow::Result as AnyResult;
use std::sync::Arc;

/// Wires the engine from configuration. The returned state is what the HTTP
/// layer serves; its dispatcher exposes the ledger and coordinator for shutdown.
pub fn build_state(config: &Config) -> AnyResult<AppState> {
    let ledger = Arc::new(match config.reservation_ceiling_bytes() {
        Some(ceiling) => MemoryLedger::with_ceiling(ceiling),
        None => MemoryLedger::new(),
    });
    let shutdown = ShutdownCoordinator::new(config.drain_deadline());
    let probe = Arc::new(ProcessProbe::new()?);
    let metrics = Metrics::new()?;
    let dispatcher =
        PressureDispatcher::new(ledger, shutdown, probe, metrics.clone(), config.limits());
    Ok(AppState {
        dispatcher,
        metrics,
        development: config.development,
    })
}
