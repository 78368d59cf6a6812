#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use serde::Serialize;
use std::hint::black_box;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::error::{PressureError, PressureResult};

/// Keeps the work counter far away from `u64::MAX` (largest 32-bit prime).
const WORK_MODULUS: u64 = 4_294_967_291;
/// Reading the clock every single op would dominate the loop.
const CLOCK_STRIDE: u64 = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnResult {
    pub elapsed_ms: u64,
    pub work_counter: u64,
}

/// Stateless CPU consumer. Each `run` is self-contained.
#[derive(Clone, Copy, Debug)]
pub struct CpuBurner {
    max_duration_ms: u64,
}

impl CpuBurner {
    pub fn new(max_duration_ms: u64) -> Self {
        Self { max_duration_ms }
    }

    pub fn max_duration_ms(&self) -> u64 {
        self.max_duration_ms
    }

    /// Spins for `duration_ms` of wall time, yielding to the runtime every
    /// `yield_every_ops` operations so other tasks on this worker keep running.
    ///
    /// Returns no earlier than the requested duration. A burn is not
    /// cancellable from inside; only process termination stops it.
    pub async fn run(&self, duration_ms: i64, yield_every_ops: u32) -> PressureResult<BurnResult> {
        let duration_ms = u64::try_from(duration_ms)
            .map_err(|_| PressureError::validation("duration", "must be >= 0"))?;
        if duration_ms > self.max_duration_ms {
            return Err(PressureError::CeilingExceeded {
                field: "duration",
                value: duration_ms,
                ceiling: self.max_duration_ms,
            });
        }
        if yield_every_ops == 0 {
            return Err(PressureError::validation("yieldEveryOps", "must be > 0"));
        }

        let budget = Duration::from_millis(duration_ms);
        let yield_every = u64::from(yield_every_ops);
        let started = Instant::now();
        let mut counter: u64 = 1;
        let mut ops: u64 = 0;
        let mut yields: u64 = 0;
        loop {
            if ops % CLOCK_STRIDE == 0 && started.elapsed() >= budget {
                break;
            }
            counter = black_box(step(counter, ops));
            ops += 1;
            if ops % yield_every == 0 {
                tokio::task::yield_now().await;
                yields += 1;
            }
        }
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(duration_ms, elapsed_ms, ops, yields, "burn finished");
        Ok(BurnResult {
            elapsed_ms,
            work_counter: counter,
        })
    }
}

fn step(counter: u64, op: u64) -> u64 {
    let mixed = counter
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(op ^ 0x9E37_79B9_7F4A_7C15);
    (mixed ^ (mixed >> 29)) % WORK_MODULUS
}
