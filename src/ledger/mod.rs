//! Usage allowance ledger.
//!
//! Tracks how many grace periods each tier may still grant. Every consumed
//! use is paired with exactly one restoration request handed to the host's
//! [`DeferredScheduler`]; the ledger itself runs no timers. Restorations
//! never raise a tier above its maximum: a surplus restore is dropped.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TierTable;
use crate::host::{Clock, DeferredScheduler, RestoreRequest};
use crate::types::Tier;

/// A restoration that has been scheduled but not yet delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRestore {
    id: Uuid,
    tier: Tier,
    due_at_millis: u64,
}

/// Per-tier remaining-use counts with scheduled restoration.
pub struct UsageLedger {
    tiers: TierTable,
    /// One sender per tier; the sender is the storage for the count.
    counts: [watch::Sender<u32>; 3],
    pending: Mutex<Vec<PendingRestore>>,
    scheduler: Arc<dyn DeferredScheduler>,
    clock: Arc<dyn Clock>,
}

impl UsageLedger {
    /// Creates a ledger with every tier at its maximum.
    pub fn new(
        tiers: TierTable,
        scheduler: Arc<dyn DeferredScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let counts = Tier::ALL.map(|tier| watch::Sender::new(tiers.get(tier).max_uses));
        Self {
            tiers,
            counts,
            pending: Mutex::new(Vec::new()),
            scheduler,
            clock,
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Vec<PendingRestore>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("UsageLedger: pending mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn count(&self, tier: Tier) -> &watch::Sender<u32> {
        &self.counts[tier.index()]
    }

    /// Returns true if the tier has at least one use left.
    pub fn can_consume(&self, tier: Tier) -> bool {
        self.remaining_count(tier) > 0
    }

    /// Takes one use from the tier and schedules its restoration.
    ///
    /// Returns false, leaving the ledger unchanged, when the tier is
    /// exhausted or the scheduler rejects the restoration request.
    pub fn consume(&self, tier: Tier) -> bool {
        let taken = self.count(tier).send_if_modified(|count| {
            if *count > 0 {
                *count -= 1;
                true
            } else {
                false
            }
        });
        if !taken {
            debug!(%tier, "No uses left, consume ignored");
            return false;
        }

        let delay = self.tiers.get(tier).restore_after();
        let request = RestoreRequest::new(tier, delay);
        if let Err(e) = self.scheduler.schedule(request) {
            warn!(%tier, error = %e, "Could not schedule restoration, returning the use");
            let max = self.tiers.get(tier).max_uses;
            self.count(tier)
                .send_modify(|count| *count = count.saturating_add(1).min(max));
            return false;
        }

        let due_at_millis = self
            .clock
            .now_millis()
            .saturating_add(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self.lock_pending().push(PendingRestore {
            id: request.id,
            tier,
            due_at_millis,
        });

        info!(
            %tier,
            remaining = self.remaining_count(tier),
            restore_in_secs = delay.as_secs(),
            "Tier used"
        );
        true
    }

    /// Gives one use back to the tier, unless it is already at its maximum.
    ///
    /// Returns true if the count changed.
    pub fn restore(&self, tier: Tier) -> bool {
        let max = self.tiers.get(tier).max_uses;
        let restored = self.count(tier).send_if_modified(|count| {
            if *count < max {
                *count += 1;
                true
            } else {
                false
            }
        });
        if restored {
            info!(%tier, remaining = self.remaining_count(tier), "Tier use restored");
        } else {
            debug!(%tier, max, "Tier already at maximum, restoration capped");
        }
        restored
    }

    /// Entry point for a delivered [`RestoreRequest`].
    ///
    /// Requests scheduled by a previous process are not in the pending list;
    /// they still restore their tier.
    pub fn handle_restore(&self, request: &RestoreRequest) -> bool {
        self.lock_pending().retain(|pending| pending.id != request.id);
        self.restore(request.tier)
    }

    /// Returns the uses left for the tier.
    pub fn remaining_count(&self, tier: Tier) -> u32 {
        *self.count(tier).borrow()
    }

    /// Returns the tier's maximum number of uses.
    pub fn max_count(&self, tier: Tier) -> u32 {
        self.tiers.get(tier).max_uses
    }

    /// Observes the tier's remaining count.
    pub fn subscribe(&self, tier: Tier) -> watch::Receiver<u32> {
        self.count(tier).subscribe()
    }

    /// Time until the tier's earliest pending restoration, if any.
    pub fn next_restore_in(&self, tier: Tier) -> Option<Duration> {
        let now = self.clock.now_millis();
        self.lock_pending()
            .iter()
            .filter(|pending| pending.tier == tier)
            .map(|pending| pending.due_at_millis)
            .min()
            .map(|due| Duration::from_millis(due.saturating_sub(now)))
    }

    /// Number of restorations scheduled and not yet delivered.
    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
