//! Selection & foreground registry.
//!
//! This module owns the state the watcher consults on every event:
//! - The insertion-ordered set of blocked app identities
//! - The single global countdown (blocking is active at (0, 0))
//! - The currently recorded foreground app
//!
//! The countdown is driven by a tokio task ticking once per second. Arming
//! a new countdown supersedes the running one. When the countdown reaches
//! (0, 0) the task stops and sends the user home if the recorded foreground
//! app is blocked.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::host::HomeScreen;
use crate::types::{Countdown, ForegroundApp};

/// Result of applying one decrement tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    /// Time remains on the countdown
    Running,
    /// The countdown just reached (0, 0)
    Expired,
    /// A newer countdown replaced the one this loop belongs to
    Superseded,
}

/// Bookkeeping for the live decrement loop.
#[derive(Debug, Default)]
struct CountdownSlot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Blocked-app set, global countdown and recorded foreground app.
pub struct Registry {
    blocked: RwLock<Vec<String>>,
    timer: watch::Sender<Countdown>,
    slot: Mutex<CountdownSlot>,
    foreground: RwLock<ForegroundApp>,
    home: Arc<dyn HomeScreen>,
}

impl Registry {
    /// Creates an empty registry with an expired countdown.
    pub fn new(home: Arc<dyn HomeScreen>) -> Self {
        Self {
            blocked: RwLock::new(Vec::new()),
            timer: watch::Sender::new(Countdown::ZERO),
            slot: Mutex::new(CountdownSlot::default()),
            foreground: RwLock::new(ForegroundApp::Unfocused),
            home,
        }
    }

    fn read_blocked(&self) -> RwLockReadGuard<'_, Vec<String>> {
        self.blocked.read().unwrap_or_else(|poisoned| {
            warn!("Registry: blocked-set lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_blocked(&self) -> RwLockWriteGuard<'_, Vec<String>> {
        self.blocked.write().unwrap_or_else(|poisoned| {
            warn!("Registry: blocked-set lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_slot(&self) -> MutexGuard<'_, CountdownSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| {
            warn!("Registry: countdown lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    // ------------------------------------------------------------------------
    // Blocked set
    // ------------------------------------------------------------------------

    /// Adds an identity to the blocked set.
    ///
    /// Returns false if it was already present.
    pub fn add_blocked_app(&self, identity: impl Into<String>) -> bool {
        let identity = identity.into();
        let mut blocked = self.write_blocked();
        if blocked.contains(&identity) {
            return false;
        }
        info!(app = %identity, "App added to blocked list");
        blocked.push(identity);
        true
    }

    /// Removes an identity from the blocked set.
    ///
    /// Returns false if it was not present.
    pub fn remove_blocked_app(&self, identity: &str) -> bool {
        let mut blocked = self.write_blocked();
        let before = blocked.len();
        blocked.retain(|app| app != identity);
        let removed = blocked.len() != before;
        if removed {
            info!(app = %identity, "App removed from blocked list");
        }
        removed
    }

    /// Returns true if the identity is blocked.
    pub fn is_blocked(&self, identity: &str) -> bool {
        self.read_blocked().iter().any(|app| app == identity)
    }

    /// Returns the blocked identities in the order they were added.
    pub fn blocked_apps(&self) -> Vec<String> {
        self.read_blocked().clone()
    }

    // ------------------------------------------------------------------------
    // Global countdown
    // ------------------------------------------------------------------------

    /// Replaces any running countdown with (minutes, seconds) and starts it.
    ///
    /// Arming with (0, 0) expires immediately.
    ///
    /// # Panics
    ///
    /// Arming a non-zero countdown spawns a tokio task and must happen
    /// inside a tokio runtime.
    pub fn arm_timer(self: &Arc<Self>, minutes: u32, seconds: u32) {
        let countdown = Countdown::new(minutes, seconds);
        {
            let mut slot = self.lock_slot();
            slot.generation += 1;
            if let Some(task) = slot.task.take() {
                task.abort();
            }
            self.timer.send_replace(countdown);
            if !countdown.is_zero() {
                slot.task = Some(self.spawn_countdown(slot.generation));
            }
        }

        info!(timer = %countdown, "Global timer is set");
        if countdown.is_zero() {
            self.enforce_on_expiry();
        }
    }

    /// Cancels the running countdown and expires the timer now.
    pub fn disarm_timer(self: &Arc<Self>) {
        debug!("Disarming global timer");
        self.arm_timer(0, 0);
    }

    /// Stops the decrement loop, leaving the countdown value as it is.
    fn cancel_countdown(&self) {
        let mut slot = self.lock_slot();
        slot.generation += 1;
        if let Some(task) = slot.task.take() {
            task.abort();
        }
    }

    /// Stops the decrement loop and sets the countdown to (0, 0) without
    /// sending anyone home. The next window event enforces blocking.
    pub(crate) fn expire_timer(&self) {
        let mut slot = self.lock_slot();
        slot.generation += 1;
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        self.timer.send_replace(Countdown::ZERO);
        debug!("Global timer expired without enforcement");
    }

    /// Returns true if the countdown is at (0, 0).
    pub fn is_timer_expired(&self) -> bool {
        self.timer.borrow().is_zero()
    }

    /// Returns a snapshot of the countdown.
    pub fn get_timer(&self) -> Countdown {
        *self.timer.borrow()
    }

    /// Observes the countdown.
    pub fn subscribe_timer(&self) -> watch::Receiver<Countdown> {
        self.timer.subscribe()
    }

    fn spawn_countdown(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                match registry.tick(generation) {
                    TickOutcome::Running => {}
                    TickOutcome::Expired => {
                        info!("Global timer hit 0:00");
                        registry.enforce_on_expiry();
                        break;
                    }
                    TickOutcome::Superseded => break,
                }
            }
        })
    }

    fn tick(&self, generation: u64) -> TickOutcome {
        let mut slot = self.lock_slot();
        if slot.generation != generation {
            return TickOutcome::Superseded;
        }

        self.timer.send_modify(|countdown| *countdown = countdown.decremented());
        if self.timer.borrow().is_zero() {
            slot.task = None;
            TickOutcome::Expired
        } else {
            TickOutcome::Running
        }
    }

    /// Sends the user home if the recorded foreground app is blocked.
    fn enforce_on_expiry(&self) {
        match self.foreground() {
            ForegroundApp::Focused(app) if self.is_blocked(&app) => {
                info!(app = %app, "Grace period over, blocking foreground app");
                self.home.return_to_home_screen();
            }
            ForegroundApp::Focused(app) => {
                debug!(app = %app, "Foreground app is not blocked");
            }
            ForegroundApp::Unfocused => {
                debug!("No foreground app detected");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Foreground app
    // ------------------------------------------------------------------------

    /// Returns the recorded foreground app.
    pub fn foreground(&self) -> ForegroundApp {
        self.foreground
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Records the foreground app. Only the watcher writes this.
    pub(crate) fn set_foreground(&self, app: ForegroundApp) {
        *self
            .foreground
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = app;
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.cancel_countdown();
    }
}

// ============================================================================
// Tests
// ============================================================================
