#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::error::{PressureError, PressureResult};

/// One retained allocation. The payload is never read back; it only has to
/// stay resident until the ledger is flushed.
struct Block {
    tag: u64,
    payload: Vec<u8>,
}

impl Block {
    fn new(tag: u64, bytes: usize) -> Self {
        // Non-zero fill forces every page to be touched, a zeroed vec could be
        // handed out lazily by the allocator and never show up in RSS.
        let fill = u8::try_from(tag % 255).unwrap_or(0) + 1;
        Self {
            tag,
            payload: vec![fill; bytes],
        }
    }

    fn len(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Process-wide synthetic memory reservation.
///
/// Mutation goes through a single mutex. `total_bytes` mirrors the block sum
/// and is only written while that mutex is held, so readers never see a
/// partially grown or partially released ledger.
#[derive(Default)]
pub struct MemoryLedger {
    blocks: Mutex<Vec<Block>>,
    total_bytes: AtomicU64,
    next_tag: AtomicU64,
    ceiling_bytes: Option<u64>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger refusing growth past `ceiling_bytes` in total.
    pub fn with_ceiling(ceiling_bytes: u64) -> Self {
        Self {
            ceiling_bytes: Some(ceiling_bytes),
            ..Self::default()
        }
    }

    /// Appends `chunk_count` blocks of `chunk_bytes` each and returns the new total.
    pub fn grow(&self, chunk_bytes: u64, chunk_count: u64) -> PressureResult<u64> {
        if chunk_bytes == 0 {
            return Err(PressureError::validation("chunkBytes", "must be > 0"));
        }
        if chunk_count == 0 {
            return Ok(self.total_bytes());
        }
        let requested = chunk_bytes
            .checked_mul(chunk_count)
            .ok_or_else(|| PressureError::validation("chunks", "requested size overflows"))?;
        let block_len = usize::try_from(chunk_bytes)
            .map_err(|_| PressureError::validation("chunkBytes", "too large for this platform"))?;
        self.check_ceiling(self.total_bytes(), requested)?;

        // Allocate outside the lock, one fixed chunk at a time.
        let first_tag = self.next_tag.fetch_add(chunk_count, Ordering::Relaxed);
        let fresh: Vec<Block> = (0..chunk_count)
            .map(|i| Block::new(first_tag + i, block_len))
            .collect();

        let mut blocks = self.blocks.lock();
        let current = self.total_bytes.load(Ordering::Acquire);
        // Re-check under the lock, a concurrent grow may have landed meanwhile.
        self.check_ceiling(current, requested)?;
        blocks.extend(fresh);
        let total = current + requested;
        self.total_bytes.store(total, Ordering::Release);
        debug!(
            chunk_bytes,
            chunk_count,
            first_tag,
            last_tag = blocks.last().map(|b| b.tag),
            total,
            "ledger grown"
        );
        Ok(total)
    }

    /// Drops every block and returns the number of bytes the ledger held.
    pub fn release(&self) -> u64 {
        let mut blocks = self.blocks.lock();
        self.total_bytes.store(0, Ordering::Release);
        let drained = std::mem::take(&mut *blocks);
        drop(blocks);
        let freed: u64 = drained.iter().map(Block::len).sum();
        let count = drained.len();
        drop(drained);
        if count > 0 {
            info!(blocks = count, freed_bytes = freed, "ledger released");
        }
        freed
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Acquire)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }

    fn check_ceiling(&self, current: u64, requested: u64) -> PressureResult<()> {
        match self.ceiling_bytes {
            Some(ceiling) if current.saturating_add(requested) > ceiling => {
                Err(PressureError::CeilingExceeded {
                    field: "reservationBytes",
                    value: current.saturating_add(requested),
                    ceiling,
                })
            }
            _ => Ok(()),
        }
    }
}
