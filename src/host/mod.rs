//! Host collaborator interfaces.
//!
//! The limiter core never talks to the operating system directly. The host
//! (the mobile shell embedding this crate) provides four capabilities:
//!
//! ```text
//! ┌──────────────────────┐
//! │   LimiterContext     │
//! └──────────┬───────────┘
//!            │
//!  ┌─────────┼──────────────┬──────────────────┬─────────┐
//!  ▼         ▼              ▼                  ▼         │
//! IdentityResolver   HomeScreen   DeferredScheduler    Clock
//! (package → label)  (go home)    (durable restore)    (ms since epoch)
//! ```
//!
//! Each capability is a trait so tests can substitute the `Mock*` types
//! from [`mock`].

mod error;
pub mod mock;
mod scheduler;

pub use error::HostError;
pub use mock::{MockClock, MockHomeScreen, MockIdentityResolver, MockScheduler};
pub use scheduler::InProcessScheduler;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Tier;

/// Maps a raw app identity (package name) to its user-facing label.
pub trait IdentityResolver: Send + Sync {
    /// Resolves the display name of an installed app.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::IdentityNotFound`] if no installed app matches.
    fn resolve_display_name(&self, app_identity: &str) -> Result<String, HostError>;
}

/// Sends the user back to the launcher.
pub trait HomeScreen: Send + Sync {
    /// Fire-and-forget global "home" action.
    fn return_to_home_screen(&self);
}

/// A durable deferred-execution facility.
///
/// Implementations must deliver each accepted request exactly once, after
/// its delay, by calling [`UsageLedger::handle_restore`](crate::ledger::UsageLedger::handle_restore).
pub trait DeferredScheduler: Send + Sync {
    /// Queues a restoration request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request was not accepted.
    fn schedule(&self, request: RestoreRequest) -> Result<(), HostError>;
}

/// Wall-clock source in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now_millis(&self) -> u64;
}

/// Payload of a deferred allowance restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRequest {
    /// Unique request id
    pub id: Uuid,
    /// Tier whose allowance is given back
    pub tier: Tier,
    /// Delay from scheduling to delivery
    pub delay: Duration,
}

impl RestoreRequest {
    /// Creates a request with a fresh id.
    pub fn new(tier: Tier, delay: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            tier,
            delay,
        }
    }
}

/// [`Clock`] backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX)
    }
}
