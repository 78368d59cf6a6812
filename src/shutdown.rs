#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{timeout, Duration, Instant};
use tracing::{error, info, warn};

use crate::error::{PressureError, PressureResult};
use crate::lib_mem::MemoryLedger;

pub const COOPERATIVE_EXIT_CODE: i32 = 0;
pub const FORCED_EXIT_CODE: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownState {
    Running,
    Draining,
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Transport stopped, in-flight work finished and the ledger was released.
    Drained,
    /// The drain deadline fired first. The process is expected to exit
    /// immediately; running burns are abandoned without a response.
    Forced,
}

impl ShutdownOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Drained => COOPERATIVE_EXIT_CODE,
            Self::Forced => FORCED_EXIT_CODE,
        }
    }
}

struct Inner {
    state: Mutex<ShutdownState>,
    in_flight: watch::Sender<usize>,
    deadline: Duration,
}

/// Gates pressure dispatches and sequences the drain.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

/// Held by an accepted dispatch for as long as it applies pressure.
pub struct InFlight {
    inner: Arc<Inner>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.inner.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl ShutdownCoordinator {
    pub fn new(deadline: Duration) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ShutdownState::Running),
                in_flight,
                deadline,
            }),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.inner.state.lock()
    }

    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    /// Registers a new dispatch, or refuses it once draining has begun.
    pub fn enter(&self) -> PressureResult<InFlight> {
        let state = self.inner.state.lock();
        if *state != ShutdownState::Running {
            return Err(PressureError::Draining);
        }
        // Counted while the state lock is held so begin_drain never misses it.
        self.inner.in_flight.send_modify(|n| *n += 1);
        drop(state);
        Ok(InFlight {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Moves Running to Draining. Returns false if draining already started.
    pub fn begin_drain(&self) -> bool {
        let mut state = self.inner.state.lock();
        if *state == ShutdownState::Running {
            *state = ShutdownState::Draining;
            info!(in_flight = self.in_flight(), "draining started");
            true
        } else {
            false
        }
    }

    /// Resolves once no dispatch is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot error.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Full shutdown sequence: drain, wait for `stop_listening` and in-flight
    /// work, release the ledger. Bounded by the configured deadline.
    pub async fn drain<F>(&self, stop_listening: F, ledger: &MemoryLedger) -> ShutdownOutcome
    where
        F: Future<Output = ()>,
    {
        if !self.begin_drain() {
            warn!("drain requested again, keeping the first deadline");
        }
        let started = Instant::now();
        let cooperative = async {
            stop_listening.await;
            info!("http server closed");
            self.wait_idle().await;
            let freed = ledger.release();
            info!(freed_bytes = freed, "reservation released before exit");
        };
        let outcome = match timeout(self.inner.deadline, cooperative).await {
            Ok(()) => ShutdownOutcome::Drained,
            Err(_) => {
                let deadline_ms =
                    u64::try_from(self.inner.deadline.as_millis()).unwrap_or(u64::MAX);
                error!(
                    deadline_ms,
                    in_flight = self.in_flight(),
                    "forced shutdown after drain deadline"
                );
                ShutdownOutcome::Forced
            }
        };
        *self.inner.state.lock() = ShutdownState::Terminated;
        info!(
            ?outcome,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "terminated"
        );
        outcome
    }
}
