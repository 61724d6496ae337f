//! Transfer serialization: at most one issuance in flight
//!
//! Every issued transfer consumes exactly one sequence number, and the
//! sequence oracle is a remote read, so the consumption path must be
//! exclusive: a second issuance may not fetch a sequence number until
//! the previous one has reached a terminal outcome. The exclusion is
//! an explicit object rather than implicit call ordering so it can be
//! tested directly.

use tokio::sync::{Mutex, MutexGuard};

/// Per-wallet admission gate plus the cached next sequence number
///
/// The cache is a performance hint only: it is populated solely from a
/// confirmed submission and dropped on any outcome that leaves the
/// chain state uncertain. The chain remains authoritative.
#[derive(Debug, Default)]
pub struct TransferSerializer {
    slot: Mutex<SeqnoSlot>,
}

#[derive(Debug, Default)]
struct SeqnoSlot {
    next_seqno: Option<u32>,
}

impl TransferSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for admission; callers are admitted strictly one at a
    /// time in arrival order (the tokio mutex queue is fair).
    ///
    /// Dropping the returned future before it resolves abandons the
    /// queue slot with no side effect, which is what makes queued
    /// issuances cancellable. Once a permit is held the issuance is
    /// committed and can only be awaited to an outcome.
    pub async fn admit(&self) -> TransferPermit<'_> {
        TransferPermit {
            slot: self.slot.lock().await,
        }
    }
}

/// Exclusive permit for one issuance, held until the outcome is known
pub struct TransferPermit<'a> {
    slot: MutexGuard<'a, SeqnoSlot>,
}

impl TransferPermit<'_> {
    /// Next sequence number cached from the immediately preceding
    /// confirmed transfer, if still valid
    pub fn cached_next_seqno(&self) -> Option<u32> {
        self.slot.next_seqno
    }

    /// Record a confirmed submission that consumed `seqno`
    pub fn record_confirmed(&mut self, seqno: u32) {
        self.slot.next_seqno = seqno.checked_add(1);
    }

    /// Drop the cache; the next issuance must consult the oracle
    pub fn invalidate(&mut self) {
        self.slot.next_seqno = None;
    }
}
