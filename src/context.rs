//! Limiter context.
//!
//! [`LimiterContext`] owns one instance of every component and wires them to
//! the host collaborators. There is no global state: the embedding shell
//! creates a context at application start, feeds it host events through the
//! sender returned by [`LimiterContext::start`], and calls
//! [`LimiterContext::shutdown`] when it stops.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, LimiterConfig};
use crate::grace::{GraceError, GracePeriodController};
use crate::host::{Clock, DeferredScheduler, HomeScreen, IdentityResolver, RestoreRequest};
use crate::ledger::UsageLedger;
use crate::registry::Registry;
use crate::types::{Countdown, HostEvent, Tier};
use crate::watcher::ForegroundWatcher;

/// Capabilities the host shell provides.
#[derive(Clone)]
pub struct HostServices {
    /// Package name → label lookup
    pub resolver: Arc<dyn IdentityResolver>,
    /// Global "home" action
    pub home: Arc<dyn HomeScreen>,
    /// Deferred restoration facility
    pub scheduler: Arc<dyn DeferredScheduler>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
}

/// Receivers for every value the UI redraws from.
#[derive(Debug, Clone)]
pub struct UiBindings {
    /// Blocked attempts in the last window
    pub attempt_count: watch::Receiver<usize>,
    /// Displayed grace-period time left
    pub remaining_time: watch::Receiver<Countdown>,
    /// Whether a grace period is counting down
    pub is_grace_period_running: watch::Receiver<bool>,
    /// Global timer value
    pub global_timer: watch::Receiver<Countdown>,
    /// Remaining uses, indexed in [`Tier::ALL`] order
    pub remaining_allowance: [watch::Receiver<u32>; 3],
}

impl UiBindings {
    /// Returns the remaining-use receiver for a tier.
    pub fn allowance(&self, tier: Tier) -> &watch::Receiver<u32> {
        &self.remaining_allowance[tier.index()]
    }
}

/// Explicitly owned limiter state and its background tasks.
pub struct LimiterContext {
    config: LimiterConfig,
    ledger: Arc<UsageLedger>,
    registry: Arc<Registry>,
    watcher: Arc<ForegroundWatcher>,
    grace: Arc<GracePeriodController>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    events: Mutex<Option<mpsc::UnboundedSender<HostEvent>>>,
}

impl LimiterContext {
    /// Validates `config` and builds every component.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: LimiterConfig, host: HostServices) -> Result<Self, ConfigError> {
        config.validate()?;

        let ledger = Arc::new(UsageLedger::new(
            config.tiers,
            host.scheduler,
            host.clock.clone(),
        ));
        let registry = Arc::new(Registry::new(host.home.clone()));
        let watcher = Arc::new(ForegroundWatcher::new(
            config.clone(),
            registry.clone(),
            host.resolver,
            host.home,
            host.clock,
        ));
        let grace = Arc::new(GracePeriodController::new(registry.clone()));

        Ok(Self {
            config,
            ledger,
            registry,
            watcher,
            grace,
            tasks: Mutex::new(Vec::new()),
            events: Mutex::new(None),
        })
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| {
            warn!("LimiterContext: task list mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_events(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<HostEvent>>> {
        self.events.lock().unwrap_or_else(|poisoned| {
            warn!("LimiterContext: event sender mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Spawns the watcher task and returns the sender for host events.
    ///
    /// Only one watcher runs at a time: calling this again before
    /// [`shutdown`](Self::shutdown) returns another handle to the same
    /// channel. The watcher runs until shutdown even if every returned
    /// sender is dropped.
    ///
    /// # Panics
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self) -> mpsc::UnboundedSender<HostEvent> {
        let mut events = self.lock_events();
        if let Some(event_tx) = events.as_ref() {
            debug!("Limiter already started, reusing event channel");
            return event_tx.clone();
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let watcher = Arc::clone(&self.watcher);
        let task = tokio::spawn(async move { watcher.run(event_rx).await });
        self.lock_tasks().push(task);
        *events = Some(event_tx.clone());
        info!("Limiter started");
        event_tx
    }

    /// Spawns a task delivering due restorations from an in-process queue.
    ///
    /// Pair with [`InProcessScheduler`](crate::host::InProcessScheduler).
    ///
    /// # Panics
    ///
    /// Must be called inside a tokio runtime.
    pub fn attach_restore_queue(&self, mut due: mpsc::UnboundedReceiver<RestoreRequest>) {
        let ledger = Arc::clone(&self.ledger);
        let task = tokio::spawn(async move {
            while let Some(request) = due.recv().await {
                ledger.handle_restore(&request);
            }
        });
        self.lock_tasks().push(task);
    }

    /// Stops every background task.
    ///
    /// Any running grace period ends without its completion callback and
    /// the global timer is left expired, so blocking is in force if the
    /// context is started again. Allowance counts and the blocked set are
    /// kept.
    pub fn shutdown(&self) {
        self.lock_events().take();
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
        self.grace.cancel();
        self.registry.expire_timer();
        info!("Limiter stopped");
    }

    /// Adds an app (by display name) to the blocked set.
    pub fn add_blocked_app(&self, identity: impl Into<String>) -> bool {
        self.registry.add_blocked_app(identity)
    }

    /// Handles a grace-period button press for `tier`.
    ///
    /// Spends one use of the tier and starts a grace period of the tier's
    /// length. Nothing happens if the tier cannot be spent.
    ///
    /// # Errors
    ///
    /// Returns [`GraceError`] if the tier has no uses left, if no tokio
    /// runtime is available to run the countdown, or if the tier's
    /// restoration could not be scheduled. The ledger is untouched in
    /// every case.
    pub fn request_grace_period<F>(&self, tier: Tier, on_complete: F) -> Result<(), GraceError>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.ledger.can_consume(tier) {
            info!(%tier, "Grace period refused, no uses left");
            return Err(GraceError::AllowanceExhausted(tier));
        }
        if Handle::try_current().is_err() {
            warn!(%tier, "Grace period refused, no async runtime");
            return Err(GraceError::RuntimeUnavailable(tier));
        }
        if !self.ledger.consume(tier) {
            return Err(if self.ledger.can_consume(tier) {
                GraceError::RestoreNotScheduled(tier)
            } else {
                GraceError::AllowanceExhausted(tier)
            });
        }

        let minutes = self.config.tiers.get(tier).minutes;
        self.grace.start_grace_period(minutes, on_complete);
        Ok(())
    }

    /// Ends the running grace period early.
    pub fn stop_grace_period(&self) -> bool {
        self.grace.stop_grace_period()
    }

    /// Returns receivers for every UI-observable value.
    pub fn bindings(&self) -> UiBindings {
        UiBindings {
            attempt_count: self.watcher.subscribe_attempts(),
            remaining_time: self.grace.subscribe_remaining(),
            is_grace_period_running: self.grace.subscribe_running(),
            global_timer: self.registry.subscribe_timer(),
            remaining_allowance: Tier::ALL.map(|tier| self.ledger.subscribe(tier)),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Returns the usage ledger.
    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns the foreground watcher.
    pub fn watcher(&self) -> &Arc<ForegroundWatcher> {
        &self.watcher
    }

    /// Returns the grace-period controller.
    pub fn grace(&self) -> &Arc<GracePeriodController> {
        &self.grace
    }
}

impl Drop for LimiterContext {
    fn drop(&mut self) {
        self.lock_events().take();
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
    }
}
