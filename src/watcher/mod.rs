//! Foreground watcher.
//!
//! Reacts to host window notifications, keeps the registry's foreground
//! record current, and sends the user home when a blocked app comes to the
//! front while the global timer is expired.
//!
//! # Transitions
//!
//! ```text
//! WindowStateChanged(id)
//!   ├─ id matches launcher/system UI ──────────────▶ ignored (unchanged)
//!   ├─ id does not resolve ────────────────────────▶ ignored (unchanged)
//!   └─ resolves to name ──▶ Focused(name)
//!         ├─ name not blocked ─────────────────────▶ Focused(name)
//!         ├─ blocked, timer running ───────────────▶ Focused(name)
//!         └─ blocked, timer expired ─▶ attempt + home ─▶ Unfocused
//! WindowsChanged ──────────────────────────────────▶ Unfocused
//! Unrecognized ────────────────────────────────────▶ ignored (unchanged)
//! ```
//!
//! Handling is synchronous and never awaits, so [`ForegroundWatcher::run`]
//! can drain the event channel without falling behind.

mod attempts;

pub use attempts::AttemptCounter;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::config::LimiterConfig;
use crate::host::{Clock, HomeScreen, IdentityResolver};
use crate::registry::Registry;
use crate::types::{ForegroundApp, HostEvent};

/// What the watcher did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event left all state unchanged
    Ignored,
    /// The app was recorded as focused and needs no intervention
    Focused(String),
    /// A blocked app was allowed because a grace period is running
    Allowed(String),
    /// A blocked app was sent home
    Blocked {
        /// Display name of the blocked app
        app: String,
        /// False if the attempt fell inside the cooldown
        counted: bool,
    },
    /// No app is in focus any more
    Cleared,
}

/// Event-driven foreground state machine.
pub struct ForegroundWatcher {
    config: LimiterConfig,
    registry: Arc<Registry>,
    resolver: Arc<dyn IdentityResolver>,
    home: Arc<dyn HomeScreen>,
    clock: Arc<dyn Clock>,
    attempts: AttemptCounter,
}

impl ForegroundWatcher {
    /// Creates a watcher writing into `registry`.
    pub fn new(
        config: LimiterConfig,
        registry: Arc<Registry>,
        resolver: Arc<dyn IdentityResolver>,
        home: Arc<dyn HomeScreen>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let attempts = AttemptCounter::new(config.cooldown(), config.attempt_window());
        Self {
            config,
            registry,
            resolver,
            home,
            clock,
            attempts,
        }
    }

    /// Handles one host event.
    pub fn handle_event(&self, event: &HostEvent) -> EventOutcome {
        match event {
            HostEvent::WindowStateChanged { app_identity } => {
                self.handle_window_state_changed(app_identity)
            }
            HostEvent::WindowsChanged => {
                self.registry.set_foreground(ForegroundApp::Unfocused);
                debug!("No valid app detected, foreground cleared");
                EventOutcome::Cleared
            }
            HostEvent::Unrecognized { event_type } => {
                debug!(event_type, "Unhandled event type");
                EventOutcome::Ignored
            }
        }
    }

    fn handle_window_state_changed(&self, app_identity: &str) -> EventOutcome {
        if self.config.is_ignored_identity(app_identity) {
            debug!(identity = %app_identity, "System launcher or UI detected, ignoring");
            return EventOutcome::Ignored;
        }

        let app = match self.resolver.resolve_display_name(app_identity) {
            Ok(app) => app,
            Err(e) => {
                debug!(identity = %app_identity, error = %e, "Could not resolve app, ignoring");
                return EventOutcome::Ignored;
            }
        };

        self.registry
            .set_foreground(ForegroundApp::Focused(app.clone()));
        debug!(app = %app, "App opened");

        if !self.registry.is_blocked(&app) {
            return EventOutcome::Focused(app);
        }

        if !self.registry.is_timer_expired() {
            debug!(
                app = %app,
                timer = %self.registry.get_timer(),
                "Allowing app, grace period active"
            );
            return EventOutcome::Allowed(app);
        }

        let counted = self.attempts.record(self.clock.now_millis());
        info!(app = %app, counted, "Blocking app (timer 0:00)");
        self.home.return_to_home_screen();
        self.registry.set_foreground(ForegroundApp::Unfocused);
        EventOutcome::Blocked { app, counted }
    }

    /// Drains host events until every sender is dropped.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<HostEvent>) {
        info!("Foreground watcher started");
        while let Some(event) = events.recv().await {
            self.handle_event(&event);
        }
        info!("Foreground watcher stopped, event channel closed");
    }

    /// Returns the number of blocked attempts in the current window.
    pub fn attempt_count(&self) -> usize {
        self.attempts.count(self.clock.now_millis())
    }

    /// Prunes expired attempts and republishes the count.
    pub fn refresh_attempts(&self) -> usize {
        self.attempt_count()
    }

    /// Observes the blocked-attempt count.
    pub fn subscribe_attempts(&self) -> watch::Receiver<usize> {
        self.attempts.subscribe()
    }

    /// Returns the recorded foreground app.
    pub fn foreground(&self) -> ForegroundApp {
        self.registry.foreground()
    }
}

// ============================================================================
// Tests
// ============================================================================
