#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::{
    ClearSummary, HealthMemory, HealthReport, Limits, PressureRequest, PressureSummary,
};
use crate::error::{PressureError, PressureResult};
use crate::lib_cpu::CpuBurner;
use crate::lib_mem::MemoryLedger;
use crate::metrics::Metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::stats::{to_mb, ProcessProbe};
use crate::validation::check_request;

/// Entry point for pressure work. Cheap to clone; every clone shares the same
/// ledger, coordinator and probe.
#[derive(Clone)]
pub struct PressureDispatcher {
    ledger: Arc<MemoryLedger>,
    burner: CpuBurner,
    shutdown: ShutdownCoordinator,
    probe: Arc<ProcessProbe>,
    metrics: Metrics,
    limits: Limits,
}

impl PressureDispatcher {
    pub fn new(
        ledger: Arc<MemoryLedger>,
        shutdown: ShutdownCoordinator,
        probe: Arc<ProcessProbe>,
        metrics: Metrics,
        limits: Limits,
    ) -> Self {
        Self {
            ledger,
            burner: CpuBurner::new(limits.max_duration_ms),
            shutdown,
            probe,
            metrics,
            limits,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn ledger(&self) -> &Arc<MemoryLedger> {
        &self.ledger
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Applies the requested pressure and only then reports on it.
    pub async fn dispatch(&self, req: PressureRequest) -> PressureResult<PressureSummary> {
        if let Err(e) = check_request(&req, &self.limits) {
            self.metrics.validation_rejections_total.inc();
            return Err(e);
        }
        let _in_flight = match self.shutdown.enter() {
            Ok(guard) => guard,
            Err(e) => {
                self.metrics.drain_rejections_total.inc();
                return Err(e);
            }
        };
        let started = Instant::now();
        info!(
            mode=%req.mode,
            duration_ms = req.duration_ms,
            chunks = req.chunk_count,
            "pressure dispatch"
        );

        let mut chunks_added = 0;
        if req.mode.grows_memory() {
            if let Err(e) = self.ledger.grow(self.limits.chunk_bytes, req.chunk_count) {
                if e.is_validation() {
                    self.metrics.validation_rejections_total.inc();
                }
                return Err(e);
            }
            chunks_added = req.chunk_count;
        }

        let mut result = None;
        if req.mode.burns_cpu() {
            let duration =
                i64::try_from(req.duration_ms).map_err(|_| PressureError::CeilingExceeded {
                    field: "duration",
                    value: req.duration_ms,
                    ceiling: self.burner.max_duration_ms(),
                })?;
            let active = self.metrics.burn_started();
            let burn = self.burner.run(duration, self.limits.yield_every_ops).await;
            drop(active);
            let burn = burn?;
            self.metrics.cpu_burn_millis_total.inc_by(burn.elapsed_ms);
            result = Some(burn.work_counter);
        }

        let stats = self.probe.snapshot()?;
        let total = self.ledger.total_bytes();
        self.metrics.dispatch_total.inc();
        let summary = PressureSummary {
            message: "Stress test completed".to_string(),
            mode: req.mode,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            memory_used_mb: to_mb(stats.resident_bytes),
            total_memory_stored_mb: to_mb(total),
            total_memory_stored_bytes: total,
            chunks_added,
            result,
        };
        info!(duration_ms=summary.duration_ms, total_bytes=total, "pressure applied");
        Ok(summary)
    }

    /// Releases the whole reservation. Allowed while draining.
    pub fn clear(&self) -> ClearSummary {
        let before = self.resident_bytes();
        let freed_bytes = self.ledger.release();
        let after = self.resident_bytes();
        let reclaimed = match (before, after) {
            (Some(b), Some(a)) => b.saturating_sub(a),
            _ => 0,
        };
        ClearSummary {
            message: "Memory cleared".to_string(),
            freed_mb: to_mb(freed_bytes),
            freed_bytes,
            reclaimed_mb: to_mb(reclaimed),
        }
    }

    /// Ambient read only; never touches the ledger or the burner.
    pub fn health(&self) -> HealthReport {
        let (status, memory) = match self.probe.snapshot() {
            Ok(stats) => (
                "healthy",
                HealthMemory {
                    heap_used_mb: to_mb(stats.resident_bytes),
                    heap_total_mb: to_mb(stats.virtual_bytes),
                },
            ),
            Err(e) => {
                warn!(error=%format!("{e:#}"), "process stats unavailable");
                (
                    "degraded",
                    HealthMemory {
                        heap_used_mb: 0,
                        heap_total_mb: 0,
                    },
                )
            }
        };
        HealthReport {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.probe.uptime().as_secs_f64(),
            memory,
            shutdown_state: self.shutdown.state(),
        }
    }

    pub fn encode_metrics(&self) -> anyhow::Result<Vec<u8>> {
        self.metrics
            .observe(self.ledger.total_bytes(), self.ledger.block_count(), &self.shutdown);
        self.metrics.encode_text()
    }

    fn resident_bytes(&self) -> Option<u64> {
        match self.probe.snapshot() {
            Ok(stats) => Some(stats.resident_bytes),
            Err(e) => {
                warn!(error=%format!("{e:#}"), "process stats unavailable");
                None
            }
        }
    }
}
