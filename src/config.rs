#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use clap::Parser;
use tokio::time::Duration;

use crate::domain::{Limits, PressureMode};

/// Runtime configuration. Every flag can also be set through its environment variable.
#[derive(Clone, Debug, Parser)]
#[command(name = "pressure-agent", version, about)]
pub struct Config {
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 80)]
    pub port: u16,

    /// Ceiling for the `duration` parameter of /stress.
    #[arg(long, env = "MAX_DURATION_MS", default_value_t = 10_000)]
    pub max_duration_ms: u64,

    /// Ceiling for the `chunks` parameter of /stress.
    #[arg(long, env = "MAX_CHUNKS", default_value_t = 100)]
    pub max_chunks: u64,

    #[arg(long, env = "CHUNK_BYTES", default_value_t = 1_000_000,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_bytes: u64,

    #[arg(long, env = "DEFAULT_DURATION_MS", default_value_t = 3_000)]
    pub default_duration_ms: u64,

    #[arg(long, env = "DEFAULT_CHUNKS", default_value_t = 10)]
    pub default_chunks: u64,

    /// cpu, memory or combined.
    #[arg(long, env = "STRESS_MODE", default_value = "combined")]
    pub stress_mode: PressureMode,

    #[arg(long, env = "YIELD_EVERY_OPS", default_value_t = 10_000,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub yield_every_ops: u32,

    /// Total reservation ceiling across requests, 0 disables it.
    #[arg(long, env = "MAX_RESERVATION_MB", default_value_t = 0)]
    pub max_reservation_mb: u64,

    #[arg(long, env = "DRAIN_DEADLINE_MS", default_value_t = 30_000)]
    pub drain_deadline_ms: u64,

    /// Worker threads, defaults to the number of physical cores.
    #[arg(long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Include internal error details in 500 responses.
    #[arg(long, env = "DEVELOPMENT", value_parser = clap::builder::FalseyValueParser::new())]
    pub development: bool,
}

impl Config {
    pub fn limits(&self) -> Limits {
        Limits {
            max_duration_ms: self.max_duration_ms,
            max_chunks: self.max_chunks,
            chunk_bytes: self.chunk_bytes,
            default_duration_ms: self.default_duration_ms,
            default_chunks: self.default_chunks,
            default_mode: self.stress_mode,
            yield_every_ops: self.yield_every_ops,
        }
    }

    pub fn drain_deadline(&self) -> Duration {
        Duration::from_millis(self.drain_deadline_ms)
    }

    pub fn reservation_ceiling_bytes(&self) -> Option<u64> {
        (self.max_reservation_mb > 0).then(|| self.max_reservation_mb.saturating_mul(1024 * 1024))
    }

    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}
