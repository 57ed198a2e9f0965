//! Test doubles for the host collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{Clock, DeferredScheduler, HomeScreen, HostError, IdentityResolver, RestoreRequest};

/// Resolver backed by a fixed identity → label table.
#[derive(Debug, Default)]
pub struct MockIdentityResolver {
    labels: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl MockIdentityResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an installed app.
    #[must_use]
    pub fn with_app(self, identity: impl Into<String>, label: impl Into<String>) -> Self {
        self.insert(identity, label);
        self
    }

    pub fn insert(&self, identity: impl Into<String>, label: impl Into<String>) {
        self.labels
            .lock()
            .unwrap()
            .insert(identity.into(), label.into());
    }

    /// Simulates an uninstall.
    pub fn remove(&self, identity: &str) {
        self.labels.lock().unwrap().remove(identity);
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityResolver for MockIdentityResolver {
    fn resolve_display_name(&self, app_identity: &str) -> Result<String, HostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.labels
            .lock()
            .unwrap()
            .get(app_identity)
            .cloned()
            .ok_or_else(|| HostError::IdentityNotFound(app_identity.to_string()))
    }
}

/// Counts home-screen actions.
#[derive(Debug, Default)]
pub struct MockHomeScreen {
    calls: AtomicUsize,
}

impl MockHomeScreen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_count(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

impl HomeScreen for MockHomeScreen {
    fn return_to_home_screen(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records scheduled requests instead of running them.
///
/// Tests fire a request by passing it to
/// [`UsageLedger::handle_restore`](crate::ledger::UsageLedger::handle_restore).
#[derive(Debug, Default)]
pub struct MockScheduler {
    scheduled: Mutex<Vec<RestoreRequest>>,
    should_fail: AtomicBool,
}

impl MockScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }

    #[must_use]
    pub fn get_scheduled(&self) -> Vec<RestoreRequest> {
        self.scheduled.lock().unwrap().clone()
    }

    /// Removes and returns everything scheduled so far.
    pub fn take_scheduled(&self) -> Vec<RestoreRequest> {
        std::mem::take(&mut *self.scheduled.lock().unwrap())
    }
}

impl DeferredScheduler for MockScheduler {
    fn schedule(&self, request: RestoreRequest) -> Result<(), HostError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(HostError::ScheduleRejected("mock failure".to_string()));
        }
        self.scheduled.lock().unwrap().push(request);
        Ok(())
    }
}

/// Manually driven clock.
#[derive(Debug, Default)]
pub struct MockClock {
    now_millis: AtomicU64,
}

impl MockClock {
    #[must_use]
    pub fn new(start_millis: u64) -> Self {
        Self {
            now_millis: AtomicU64::new(start_millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now_millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now_millis.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u64 {
        self.now_millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tier;

    #[test]
    fn test_mock_resolver() {
        let resolver = MockIdentityResolver::new().with_app("com.chat", "ChatApp");

        assert_eq!(resolver.resolve_display_name("com.chat").unwrap(), "ChatApp");
        assert!(resolver
            .resolve_display_name("com.other")
            .unwrap_err()
            .is_identity_not_found());
        assert_eq!(resolver.call_count(), 2);

        resolver.remove("com.chat");
        assert!(resolver.resolve_display_name("com.chat").is_err());
    }

    #[test]
    fn test_mock_home_screen() {
        let home = MockHomeScreen::new();
        home.return_to_home_screen();
        home.return_to_home_screen();
        assert_eq!(home.call_count(), 2);

        home.reset_count();
        assert_eq!(home.call_count(), 0);
    }

    #[test]
    fn test_mock_scheduler_failure() {
        let scheduler = MockScheduler::new();
        scheduler.set_should_fail(true);

        let result = scheduler.schedule(RestoreRequest::new(Tier::Short, Duration::from_secs(1)));
        assert!(result.is_err());
        assert_eq!(scheduler.scheduled_count(), 0);
    }

    #[test]
    fn test_mock_scheduler_take() {
        let scheduler = MockScheduler::new();
        scheduler
            .schedule(RestoreRequest::new(Tier::Medium, Duration::from_secs(1)))
            .unwrap();

        assert_eq!(scheduler.take_scheduled().len(), 1);
        assert_eq!(scheduler.scheduled_count(), 0);
    }

    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new(1_000);
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.now_millis(), 3_000);
    }
}
