#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{Context, Result as AnyResult};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

use crate::shutdown::{ShutdownCoordinator, ShutdownState};

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub reservation_bytes: IntGauge,
    pub reservation_blocks: IntGauge,
    pub cpu_burn_active: IntGauge,
    pub cpu_burn_millis_total: IntCounter,
    pub dispatch_total: IntCounter,
    pub validation_rejections_total: IntCounter,
    pub drain_rejections_total: IntCounter,
    pub in_flight: IntGauge,
    pub draining: IntGauge,
}

impl Metrics {
    pub fn new() -> AnyResult<Self> {
        let registry = Registry::new();
        let reservation_bytes = gauge(
            &registry,
            "agent_reservation_bytes",
            "bytes held by the memory ledger",
        )?;
        let reservation_blocks = gauge(
            &registry,
            "agent_reservation_blocks",
            "blocks held by the memory ledger",
        )?;
        let cpu_burn_active = gauge(&registry, "agent_cpu_burn_active", "burns in progress")?;
        let cpu_burn_millis_total = counter(
            &registry,
            "agent_cpu_burn_millis_total",
            "wall milliseconds spent burning",
        )?;
        let dispatch_total = counter(
            &registry,
            "agent_dispatch_total",
            "pressure requests applied",
        )?;
        let validation_rejections_total = counter(
            &registry,
            "agent_validation_rejections_total",
            "pressure requests rejected as invalid",
        )?;
        let drain_rejections_total = counter(
            &registry,
            "agent_drain_rejections_total",
            "pressure requests rejected while draining",
        )?;
        let in_flight = gauge(&registry, "agent_in_flight", "pressure requests in flight")?;
        let draining = gauge(&registry, "agent_draining", "1 once shutdown has begun")?;
        Ok(Self {
            registry,
            reservation_bytes,
            reservation_blocks,
            cpu_burn_active,
            cpu_burn_millis_total,
            dispatch_total,
            validation_rejections_total,
            drain_rejections_total,
            in_flight,
            draining,
        })
    }

    /// Copies point-in-time values that are owned elsewhere into gauges.
    pub fn observe(&self, total_bytes: u64, blocks: usize, shutdown: &ShutdownCoordinator) {
        self.reservation_bytes
            .set(i64::try_from(total_bytes).unwrap_or(i64::MAX));
        self.reservation_blocks
            .set(i64::try_from(blocks).unwrap_or(i64::MAX));
        self.in_flight
            .set(i64::try_from(shutdown.in_flight()).unwrap_or(i64::MAX));
        self.draining
            .set(i64::from(shutdown.state() != ShutdownState::Running));
    }

    /// Marks a burn as running until the returned guard is dropped, including
    /// when the dispatch future is cancelled mid-burn.
    #[must_use]
    pub fn burn_started(&self) -> ActiveBurn {
        self.cpu_burn_active.inc();
        ActiveBurn {
            gauge: self.cpu_burn_active.clone(),
        }
    }

    pub fn encode_text(&self) -> AnyResult<Vec<u8>> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf).context("encode metrics")?;
        Ok(buf)
    }
}

pub struct ActiveBurn {
    gauge: IntGauge,
}

impl Drop for ActiveBurn {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

fn gauge(registry: &Registry, name: &str, help: &str) -> AnyResult<IntGauge> {
    let g = IntGauge::with_opts(Opts::new(name, help)).with_context(|| format!("create {name}"))?;
    registry
        .register(Box::new(g.clone()))
        .with_context(|| format!("register {name}"))?;
    Ok(g)
}

fn counter(registry: &Registry, name: &str, help: &str) -> AnyResult<IntCounter> {
    let c =
        IntCounter::with_opts(Opts::new(name, help)).with_context(|| format!("create {name}"))?;
    registry
        .register(Box::new(c.clone()))
        .with_context(|| format!("register {name}"))?;
    Ok(c)
}
