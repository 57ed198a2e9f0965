//! Grace-period controller.
//!
//! Drives the countdown the user sees after pressing a grace-period button.
//! Starting a grace period arms the registry's global timer for the same
//! length and runs a display countdown alongside it; both tick once per
//! second from the same instant, so they reach (0, 0) on the same tick.
//! Stopping early also disarms the global timer so blocking resumes at once.
//!
//! The two loops are separate tasks. On a multi-threaded runtime the
//! completion callback may run just before the global timer's final tick.

mod error;

pub use error::GraceError;

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::registry::Registry;
use crate::types::Countdown;

/// Completion callback fired when a grace period runs out.
pub type OnComplete = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct DisplaySlot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Visible grace-period countdown.
pub struct GracePeriodController {
    registry: Arc<Registry>,
    remaining: watch::Sender<Countdown>,
    running: watch::Sender<bool>,
    slot: Mutex<DisplaySlot>,
}

impl GracePeriodController {
    /// Creates an idle controller.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            remaining: watch::Sender::new(Countdown::ZERO),
            running: watch::Sender::new(false),
            slot: Mutex::new(DisplaySlot::default()),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, DisplaySlot> {
        self.slot.lock().unwrap_or_else(|poisoned| {
            warn!("GracePeriodController: display lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Starts a grace period of `minutes`, replacing any running one.
    ///
    /// `on_complete` runs once when the countdown reaches (0, 0). It does not
    /// run if the grace period is stopped or replaced first.
    ///
    /// # Panics
    ///
    /// Must be called inside a tokio runtime when `minutes > 0`.
    pub fn start_grace_period<F>(self: &Arc<Self>, minutes: u32, on_complete: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.registry.arm_timer(minutes, 0);
        let countdown = Countdown::new(minutes, 0);

        {
            let mut slot = self.lock_slot();
            slot.generation += 1;
            if let Some(task) = slot.task.take() {
                task.abort();
            }
            self.remaining.send_replace(countdown);

            if !countdown.is_zero() {
                self.running.send_replace(true);
                slot.task = Some(self.spawn_display(slot.generation, Box::new(on_complete)));
                info!(minutes, "Grace period started");
                return;
            }
            self.running.send_replace(false);
        }

        debug!("Zero-length grace period, completing immediately");
        on_complete();
    }

    /// Cancels the running grace period and resumes blocking.
    ///
    /// Returns false if no grace period was running.
    pub fn stop_grace_period(&self) -> bool {
        {
            let mut slot = self.lock_slot();
            slot.generation += 1;
            if let Some(task) = slot.task.take() {
                task.abort();
            }
            if !self.running.send_replace(false) {
                return false;
            }
            self.remaining.send_replace(Countdown::ZERO);
        }

        info!("Grace period stopped early");
        self.registry.disarm_timer();
        true
    }

    /// Stops the display loop and clears the display without touching the
    /// global timer. The completion callback is dropped unrun.
    pub(crate) fn cancel(&self) {
        let mut slot = self.lock_slot();
        slot.generation += 1;
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        self.running.send_replace(false);
        self.remaining.send_replace(Countdown::ZERO);
    }

    /// Returns the displayed time left.
    pub fn remaining_time(&self) -> Countdown {
        *self.remaining.borrow()
    }

    /// Returns true while a grace period is counting down.
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Observes the displayed time left.
    pub fn subscribe_remaining(&self) -> watch::Receiver<Countdown> {
        self.remaining.subscribe()
    }

    /// Observes the running flag.
    pub fn subscribe_running(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }

    fn spawn_display(self: &Arc<Self>, generation: u64, on_complete: OnComplete) -> JoinHandle<()> {
        let controller: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    return;
                };
                match controller.tick(generation) {
                    Some(true) => break,
                    Some(false) => {}
                    None => return,
                }
            }

            info!("Grace period complete");
            on_complete();
        })
    }

    /// Applies one display tick; `None` if superseded, `Some(done)` otherwise.
    fn tick(&self, generation: u64) -> Option<bool> {
        let mut slot = self.lock_slot();
        if slot.generation != generation {
            return None;
        }

        self.remaining
            .send_modify(|countdown| *countdown = countdown.decremented());
        if self.remaining.borrow().is_zero() {
            self.running.send_replace(false);
            slot.task = None;
            Some(true)
        } else {
            Some(false)
        }
    }
}

impl Drop for GracePeriodController {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// Tests
// ============================================================================
