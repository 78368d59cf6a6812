#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{anyhow, Context, Result as AnyResult};
use parking_lot::Mutex;
use sysinfo::{Pid, System};
use tokio::time::{Duration, Instant};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Rounds to the nearest whole mebibyte.
pub fn to_mb(bytes: u64) -> u64 {
    bytes.saturating_add(BYTES_PER_MB / 2) / BYTES_PER_MB
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessStats {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
}

/// Reads ambient statistics of the current process.
pub struct ProcessProbe {
    pid: Pid,
    started: Instant,
    system: Mutex<System>,
}

impl ProcessProbe {
    pub fn new() -> AnyResult<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| anyhow!(e))
            .context("resolve current pid")?;
        Ok(Self {
            pid,
            started: Instant::now(),
            system: Mutex::new(System::new()),
        })
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> AnyResult<ProcessStats> {
        let mut system = self.system.lock();
        if !system.refresh_process(self.pid) {
            return Err(anyhow!("process {} not visible to sysinfo", self.pid));
        }
        let process = system
            .process(self.pid)
            .with_context(|| format!("read stats of process {}", self.pid))?;
        Ok(ProcessStats {
            resident_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        })
    }
}
