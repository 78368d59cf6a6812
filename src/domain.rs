#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PressureError;
use crate::shutdown::ShutdownState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureMode {
    Cpu,
    Memory,
    #[default]
    Combined,
}

impl PressureMode {
    pub fn burns_cpu(self) -> bool {
        matches!(self, Self::Cpu | Self::Combined)
    }

    pub fn grows_memory(self) -> bool {
        matches!(self, Self::Memory | Self::Combined)
    }
}

impl std::fmt::Display for PressureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PressureMode::Cpu => f.write_str("cpu"),
            PressureMode::Memory => f.write_str("memory"),
            PressureMode::Combined => f.write_str("combined"),
        }
    }
}

impl FromStr for PressureMode {
    type Err = PressureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "memory" | "mem" => Ok(Self::Memory),
            "combined" | "both" => Ok(Self::Combined),
            other => Err(PressureError::validation(
                "mode",
                format!("unsupported mode: {other}"),
            )),
        }
    }
}

/// Ceilings and defaults applied to every pressure request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_duration_ms: u64,
    pub max_chunks: u64,
    pub chunk_bytes: u64,
    pub default_duration_ms: u64,
    pub default_chunks: u64,
    pub default_mode: PressureMode,
    pub yield_every_ops: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_duration_ms: 10_000,
            max_chunks: 100,
            chunk_bytes: 1_000_000,
            default_duration_ms: 3_000,
            default_chunks: 10,
            default_mode: PressureMode::Combined,
            yield_every_ops: 10_000,
        }
    }
}

/// A validated pressure request. Build it through `validation::validate_stress`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PressureRequest {
    pub mode: PressureMode,
    pub duration_ms: u64,
    pub chunk_count: u64,
}

/// Raw `/stress` query string. Signed so negatives reach validation instead
/// of failing as a parse error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StressQuery {
    pub duration: Option<i64>,
    pub chunks: Option<i64>,
    pub mode: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PressureSummary {
    pub message: String,
    pub mode: PressureMode,
    pub duration_ms: u64,
    #[serde(rename = "memoryUsedMB")]
    pub memory_used_mb: u64,
    #[serde(rename = "totalMemoryStoredMB")]
    pub total_memory_stored_mb: u64,
    pub total_memory_stored_bytes: u64,
    pub chunks_added: u64,
    /// Opaque work counter of the burn, absent when no CPU was burned.
    pub result: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearSummary {
    pub message: String,
    #[serde(rename = "freedMB")]
    pub freed_mb: u64,
    pub freed_bytes: u64,
    /// Measured drop in resident memory. An estimate: the allocator may keep
    /// freed pages around, so this can be 0 even when `freed_bytes` is not.
    #[serde(rename = "reclaimedMB")]
    pub reclaimed_mb: u64,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct HealthMemory {
    #[serde(rename = "heapUsedMB")]
    pub heap_used_mb: u64,
    #[serde(rename = "heapTotalMB")]
    pub heap_total_mb: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub timestamp: String,
    pub uptime_seconds: f64,
    pub memory: HealthMemory,
    pub shutdown_state: ShutdownState,
}

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: crate::service::PressureDispatcher,
    pub metrics: crate::metrics::Metrics,
    /// Expose internal error details in 500 responses.
    pub development: bool,
}
