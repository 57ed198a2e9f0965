//! Core data types for the app limiter.
//!
//! This module defines the value types shared by every component:
//! - Grace-period tiers
//! - The (minutes, seconds) countdown value
//! - The foreground-app state
//! - Host window events

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Tier
// ============================================================================

/// One of the three grace-period buttons, each with its own allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// 1-minute grace period (button 1)
    Short,
    /// 5-minute grace period (button 2)
    Medium,
    /// 10-minute grace period (button 3)
    Long,
}

impl Tier {
    /// All tiers in button order.
    pub const ALL: [Tier; 3] = [Tier::Short, Tier::Medium, Tier::Long];

    /// Returns the numeric button id (1, 2 or 3).
    pub fn id(&self) -> u8 {
        match self {
            Tier::Short => 1,
            Tier::Medium => 2,
            Tier::Long => 3,
        }
    }

    /// Maps a numeric button id back to a tier.
    ///
    /// Deferred-task payloads carry the id, so unknown values must be
    /// tolerated rather than trusted.
    pub fn from_id(id: u8) -> Option<Tier> {
        match id {
            1 => Some(Tier::Short),
            2 => Some(Tier::Medium),
            3 => Some(Tier::Long),
            _ => None,
        }
    }

    /// Returns the string representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Short => "short",
            Tier::Medium => "medium",
            Tier::Long => "long",
        }
    }

    pub(crate) fn index(&self) -> usize {
        usize::from(self.id() - 1)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Countdown
// ============================================================================

/// A (minutes, seconds) countdown value with seconds always in `0..60`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    /// Whole minutes remaining
    pub minutes: u32,
    /// Seconds remaining within the current minute (0-59)
    pub seconds: u32,
}

impl Countdown {
    /// The expired countdown, (0, 0).
    pub const ZERO: Countdown = Countdown {
        minutes: 0,
        seconds: 0,
    };

    /// Creates a countdown, carrying any seconds >= 60 into minutes.
    ///
    /// The total length is capped at `u32::MAX` seconds; larger requests
    /// saturate to that cap.
    pub fn new(minutes: u32, seconds: u32) -> Self {
        Self::from_total_seconds(minutes.saturating_mul(60).saturating_add(seconds))
    }

    /// Splits a total number of seconds into (minutes, seconds).
    pub fn from_total_seconds(total: u32) -> Self {
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    /// Returns minutes * 60 + seconds, saturating at `u32::MAX`.
    pub fn total_seconds(&self) -> u32 {
        self.minutes.saturating_mul(60).saturating_add(self.seconds)
    }

    /// Returns true at (0, 0).
    pub fn is_zero(&self) -> bool {
        self.total_seconds() == 0
    }

    /// Returns the countdown one second later, stopping at (0, 0).
    #[must_use]
    pub fn decremented(&self) -> Self {
        Self::from_total_seconds(self.total_seconds().saturating_sub(1))
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes, self.seconds)
    }
}

// ============================================================================
// ForegroundApp
// ============================================================================

/// The app currently occupying the visible window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum ForegroundApp {
    /// A resolved app is in focus
    Focused(String),
    /// Launcher, system UI, or nothing determinable is in focus
    #[default]
    Unfocused,
}

impl ForegroundApp {
    /// Returns the focused identity, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            ForegroundApp::Focused(identity) => Some(identity),
            ForegroundApp::Unfocused => None,
        }
    }

    /// Returns true if an app is focused.
    pub fn is_focused(&self) -> bool {
        matches!(self, ForegroundApp::Focused(_))
    }
}

// ============================================================================
// HostEvent
// ============================================================================

/// Foreground-change notification delivered by the host OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    /// A window came to the front; carries the raw app identity (package name)
    WindowStateChanged {
        /// Raw identity reported by the host
        #[serde(rename = "appIdentity")]
        app_identity: String,
    },
    /// The window list changed with no app attached (all minimized/closed)
    WindowsChanged,
    /// Any other host event type
    Unrecognized {
        /// Host-specific event type code
        #[serde(rename = "eventType")]
        event_type: u32,
    },
}

impl HostEvent {
    /// Convenience constructor for a window-state change.
    pub fn window_state_changed(app_identity: impl Into<String>) -> Self {
        HostEvent::WindowStateChanged {
            app_identity: app_identity.into(),
        }
    }

    /// Returns the string representation of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::WindowStateChanged { .. } => "window_state_changed",
            HostEvent::WindowsChanged => "windows_changed",
            HostEvent::Unrecognized { .. } => "unrecognized",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Tier Tests
    // ------------------------------------------------------------------------

    mod tier_tests {
        use super::*;

        #[test]
        fn test_tier_ids() {
            assert_eq!(Tier::Short.id(), 1);
            assert_eq!(Tier::Medium.id(), 2);
            assert_eq!(Tier::Long.id(), 3);
        }

        #[test]
        fn test_tier_from_id() {
            for tier in Tier::ALL {
                assert_eq!(Tier::from_id(tier.id()), Some(tier));
            }
            assert_eq!(Tier::from_id(0), None);
            assert_eq!(Tier::from_id(4), None);
        }

        #[test]
        fn test_tier_serialize() {
            let json = serde_json::to_string(&Tier::Medium).unwrap();
            assert_eq!(json, "\"medium\"");
        }

        #[test]
        fn test_tier_display() {
            assert_eq!(Tier::Long.to_string(), "long");
        }
    }

    // ------------------------------------------------------------------------
    // Countdown Tests
    // ------------------------------------------------------------------------

    mod countdown_tests {
        use super::*;

        #[test]
        fn test_new_normalizes_seconds() {
            let c = Countdown::new(1, 75);
            assert_eq!(c, Countdown { minutes: 2, seconds: 15 });
        }

        #[test]
        fn test_decrement_borrows_from_minutes() {
            let c = Countdown::new(1, 0).decremented();
            assert_eq!(c, Countdown { minutes: 0, seconds: 59 });
        }

        #[test]
        fn test_decrement_stops_at_zero() {
            assert_eq!(Countdown::ZERO.decremented(), Countdown::ZERO);
            assert!(Countdown::new(0, 1).decremented().is_zero());
        }

        #[test]
        fn test_total_seconds() {
            assert_eq!(Countdown::new(10, 5).total_seconds(), 605);
        }

        #[test]
        fn test_huge_request_saturates() {
            let c = Countdown::new(u32::MAX, 59);
            assert_eq!(c.total_seconds(), u32::MAX);
            assert_eq!(c, Countdown::from_total_seconds(u32::MAX));
            assert!(!c.is_zero());
        }

        #[test]
        fn test_display() {
            assert_eq!(Countdown::new(4, 7).to_string(), "4:07");
            assert_eq!(Countdown::ZERO.to_string(), "0:00");
        }
    }

    // ------------------------------------------------------------------------
    // ForegroundApp Tests
    // ------------------------------------------------------------------------

    mod foreground_tests {
        use super::*;

        #[test]
        fn test_default_is_unfocused() {
            assert_eq!(ForegroundApp::default(), ForegroundApp::Unfocused);
            assert!(ForegroundApp::default().identity().is_none());
        }

        #[test]
        fn test_focused_identity() {
            let app = ForegroundApp::Focused("ChatApp".to_string());
            assert!(app.is_focused());
            assert_eq!(app.identity(), Some("ChatApp"));
        }
    }

    // ------------------------------------------------------------------------
    // HostEvent Tests
    // ------------------------------------------------------------------------

    mod host_event_tests {
        use super::*;

        #[test]
        fn test_deserialize_window_state_changed() {
            let json = r#"{"kind":"window_state_changed","appIdentity":"com.chat"}"#;
            let event: HostEvent = serde_json::from_str(json).unwrap();
            assert_eq!(event, HostEvent::window_state_changed("com.chat"));
        }

        #[test]
        fn test_deserialize_windows_changed() {
            let event: HostEvent = serde_json::from_str(r#"{"kind":"windows_changed"}"#).unwrap();
            assert_eq!(event, HostEvent::WindowsChanged);
        }

        #[test]
        fn test_event_kind() {
            assert_eq!(
                HostEvent::Unrecognized { event_type: 2048 }.kind(),
                "unrecognized"
            );
        }
    }
}
