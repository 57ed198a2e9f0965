//! Blocked-attempt counter.
//!
//! Timestamps of blocked attempts inside a sliding window, with a cooldown
//! so quick repeated events for the same launch count once.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct AttemptLog {
    timestamps: VecDeque<u64>,
    /// Kept apart from `timestamps` so pruning never shortens the cooldown.
    last_recorded: Option<u64>,
}

impl AttemptLog {
    fn prune(&mut self, now_millis: u64, window_millis: u64) {
        while let Some(&oldest) = self.timestamps.front() {
            if now_millis.saturating_sub(oldest) < window_millis {
                break;
            }
            self.timestamps.pop_front();
        }
    }
}

/// Sliding-window count of blocked attempts.
#[derive(Debug)]
pub struct AttemptCounter {
    cooldown_millis: u64,
    window_millis: u64,
    log: Mutex<AttemptLog>,
    count: watch::Sender<usize>,
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AttemptCounter {
    /// Creates an empty counter.
    pub fn new(cooldown: Duration, window: Duration) -> Self {
        Self {
            cooldown_millis: as_millis(cooldown),
            window_millis: as_millis(window),
            log: Mutex::new(AttemptLog::default()),
            count: watch::Sender::new(0),
        }
    }

    fn lock_log(&self) -> MutexGuard<'_, AttemptLog> {
        self.log.lock().unwrap_or_else(|poisoned| {
            warn!("AttemptCounter: log mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn publish(&self, len: usize) {
        self.count.send_if_modified(|count| {
            if *count == len {
                false
            } else {
                *count = len;
                true
            }
        });
    }

    /// Records an attempt at `now_millis`.
    ///
    /// Returns false if the attempt fell inside the cooldown and was dropped.
    pub fn record(&self, now_millis: u64) -> bool {
        let mut log = self.lock_log();
        if let Some(last) = log.last_recorded {
            if now_millis.saturating_sub(last) < self.cooldown_millis {
                debug!("Cooldown active, attempt not counted");
                return false;
            }
        }

        log.prune(now_millis, self.window_millis);
        log.timestamps.push_back(now_millis);
        log.last_recorded = Some(now_millis);
        let len = log.timestamps.len();
        drop(log);

        self.publish(len);
        true
    }

    /// Returns the number of attempts inside the window ending at `now_millis`.
    pub fn count(&self, now_millis: u64) -> usize {
        let mut log = self.lock_log();
        log.prune(now_millis, self.window_millis);
        let len = log.timestamps.len();
        drop(log);

        self.publish(len);
        len
    }

    /// Observes the attempt count.
    ///
    /// The published value only changes on [`record`](Self::record) or
    /// [`count`](Self::count); expired attempts drop out on the next call.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }
}
