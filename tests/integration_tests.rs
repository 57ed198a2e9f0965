//! Integration tests for the limiter as the host shell drives it.
//!
//! These tests go through [`LimiterContext`] only:
//! - Blocking a blocked app when no grace period runs
//! - Letting it through during a grace period
//! - Refusing grace periods once a tier is spent
//! - Sending the user home when a grace period lapses inside a blocked app

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Duration;

use app_limiter::{
    Countdown, ForegroundApp, GraceError, HostEvent, HostServices, InProcessScheduler,
    LimiterConfig, LimiterContext, MockClock, MockHomeScreen, MockIdentityResolver,
    MockScheduler, Tier,
};

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    ctx: LimiterContext,
    home: Arc<MockHomeScreen>,
    scheduler: Arc<MockScheduler>,
    clock: Arc<MockClock>,
    events: mpsc::UnboundedSender<HostEvent>,
}

fn create_harness() -> Harness {
    let home = Arc::new(MockHomeScreen::new());
    let scheduler = Arc::new(MockScheduler::new());
    let clock = Arc::new(MockClock::new(1_700_000_000_000));
    let resolver = Arc::new(
        MockIdentityResolver::new()
            .with_app("com.example.chat", "ChatApp")
            .with_app("com.example.notes", "Notes"),
    );
    let host = HostServices {
        resolver,
        home: home.clone(),
        scheduler: scheduler.clone(),
        clock: clock.clone(),
    };
    let ctx = LimiterContext::new(LimiterConfig::default(), host).unwrap();
    let events = ctx.start();
    Harness {
        ctx,
        home,
        scheduler,
        clock,
        events,
    }
}

/// Lets the watcher task drain everything sent so far.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn open(app_identity: &str) -> HostEvent {
    HostEvent::window_state_changed(app_identity)
}

// ============================================================================
// Blocking
// ============================================================================

#[tokio::test(start_paused = true)]
async fn blocked_app_with_expired_timer_is_sent_home() {
    let h = create_harness();
    h.ctx.add_blocked_app("ChatApp");
    h.ctx.registry().arm_timer(0, 0);

    h.events.send(open("com.example.chat")).unwrap();
    settle().await;

    assert_eq!(h.home.call_count(), 1);
    assert_eq!(h.ctx.watcher().foreground(), ForegroundApp::Unfocused);
    assert_eq!(h.ctx.watcher().attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn blocked_app_with_running_timer_is_allowed() {
    let h = create_harness();
    h.ctx.add_blocked_app("ChatApp");
    h.ctx.registry().arm_timer(1, 0);

    h.events.send(open("com.example.chat")).unwrap();
    settle().await;

    assert_eq!(h.home.call_count(), 0);
    assert_eq!(
        h.ctx.watcher().foreground(),
        ForegroundApp::Focused("ChatApp".to_string())
    );
    assert_eq!(h.ctx.watcher().attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn attempt_count_binding_follows_cooldown() {
    let h = create_harness();
    h.ctx.add_blocked_app("ChatApp");
    let bindings = h.ctx.bindings();

    h.events.send(open("com.example.chat")).unwrap();
    settle().await;
    h.clock.advance(Duration::from_secs(2));
    h.events.send(open("com.example.chat")).unwrap();
    settle().await;
    assert_eq!(*bindings.attempt_count.borrow(), 1);

    h.clock.advance(Duration::from_secs(6));
    h.events.send(open("com.example.chat")).unwrap();
    settle().await;
    assert_eq!(*bindings.attempt_count.borrow(), 2);
    assert_eq!(h.home.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn minimizing_everything_clears_foreground() {
    let h = create_harness();

    h.events.send(open("com.example.notes")).unwrap();
    settle().await;
    assert_eq!(h.ctx.watcher().foreground().identity(), Some("Notes"));

    h.events.send(HostEvent::WindowsChanged).unwrap();
    settle().await;
    assert_eq!(h.ctx.watcher().foreground(), ForegroundApp::Unfocused);
}

// ============================================================================
// Grace Periods
// ============================================================================

#[tokio::test(start_paused = true)]
async fn grace_period_lapse_sends_user_home() {
    let h = create_harness();
    h.ctx.add_blocked_app("ChatApp");
    let completed = Arc::new(AtomicUsize::new(0));
    let on_complete = {
        let completed = completed.clone();
        move || {
            completed.fetch_add(1, Ordering::SeqCst);
        }
    };

    h.ctx.request_grace_period(Tier::Short, on_complete).unwrap();
    h.events.send(open("com.example.chat")).unwrap();
    settle().await;
    assert_eq!(h.home.call_count(), 0);

    tokio::time::sleep(Duration::from_millis(60_500)).await;

    assert_eq!(h.home.call_count(), 1);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert!(!h.ctx.grace().is_running());
    assert!(h.ctx.registry().is_timer_expired());
}

#[tokio::test(start_paused = true)]
async fn exhausted_tier_does_not_arm_timer() {
    let h = create_harness();
    h.ctx.request_grace_period(Tier::Long, || {}).unwrap();
    assert!(h.ctx.stop_grace_period());
    assert_eq!(h.ctx.ledger().remaining_count(Tier::Long), 0);

    let result = h.ctx.request_grace_period(Tier::Long, || {});

    assert_eq!(result, Err(GraceError::AllowanceExhausted(Tier::Long)));
    assert!(h.ctx.registry().is_timer_expired());
    assert_eq!(h.ctx.registry().get_timer(), Countdown::ZERO);
    assert!(!h.ctx.grace().is_running());
    assert_eq!(h.scheduler.scheduled_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stopping_grace_period_resumes_blocking() {
    let h = create_harness();
    h.ctx.add_blocked_app("ChatApp");

    h.ctx.request_grace_period(Tier::Medium, || {}).unwrap();
    h.events.send(open("com.example.chat")).unwrap();
    settle().await;
    assert_eq!(h.home.call_count(), 0);

    h.ctx.stop_grace_period();
    assert_eq!(h.home.call_count(), 1);

    h.events.send(open("com.example.chat")).unwrap();
    settle().await;
    assert_eq!(h.home.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn spent_use_comes_back_when_restoration_fires() {
    let h = create_harness();
    let before = h.ctx.ledger().remaining_count(Tier::Medium);

    h.ctx.request_grace_period(Tier::Medium, || {}).unwrap();
    assert_eq!(h.ctx.ledger().remaining_count(Tier::Medium), before - 1);

    for request in h.scheduler.take_scheduled() {
        h.ctx.ledger().handle_restore(&request);
    }

    assert_eq!(h.ctx.ledger().remaining_count(Tier::Medium), before);
}

// ============================================================================
// In-process Scheduler
// ============================================================================

#[tokio::test(start_paused = true)]
async fn in_process_scheduler_restores_after_tier_delay() {
    let (scheduler, due) = InProcessScheduler::new();
    let host = HostServices {
        resolver: Arc::new(MockIdentityResolver::new()),
        home: Arc::new(MockHomeScreen::new()),
        scheduler: Arc::new(scheduler),
        clock: Arc::new(MockClock::new(0)),
    };
    let ctx = LimiterContext::new(LimiterConfig::default(), host).unwrap();
    ctx.attach_restore_queue(due);

    ctx.request_grace_period(Tier::Long, || {}).unwrap();
    assert!(!ctx.ledger().can_consume(Tier::Long));

    tokio::time::sleep(Duration::from_secs(20 * 60 * 60 - 1)).await;
    assert!(!ctx.ledger().can_consume(Tier::Long));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(ctx.ledger().can_consume(Tier::Long));
    assert_eq!(ctx.ledger().pending_count(), 0);

    ctx.shutdown();
}
