//! App Limiter Library
//!
//! Core state machine of a personal app-usage limiter for a mobile device.
//! When the user opens a blocked app while no grace period is running, the
//! limiter sends them back to the home screen. It includes:
//! - Usage allowance ledger for the three grace-period tiers
//! - Registry of blocked apps and the global countdown
//! - Foreground watcher reacting to host window events
//! - Grace-period controller for the visible countdown
//! - Host collaborator traits with test doubles
//! - Configuration and logging setup
//!
//! UI and OS integration live in the host shell, which talks to the core
//! through [`LimiterContext`].

pub mod config;
pub mod context;
pub mod grace;
pub mod host;
pub mod ledger;
pub mod logging;
pub mod registry;
pub mod types;
pub mod watcher;

// Re-export commonly used types for convenience
pub use config::{ConfigError, LimiterConfig, TierConfig, TierTable};
pub use context::{HostServices, LimiterContext, UiBindings};
pub use grace::{GraceError, GracePeriodController};
pub use ledger::UsageLedger;
pub use registry::Registry;
pub use types::{Countdown, ForegroundApp, HostEvent, Tier};
pub use watcher::{AttemptCounter, EventOutcome, ForegroundWatcher};

// Re-export host collaborator types
pub use host::{
    Clock, DeferredScheduler, HomeScreen, HostError, IdentityResolver, InProcessScheduler,
    MockClock, MockHomeScreen, MockIdentityResolver, MockScheduler, RestoreRequest, SystemClock,
};
