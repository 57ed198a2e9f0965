//! Configuration error types.

use thiserror::Error;

use crate::types::Tier;

/// Errors raised when a [`LimiterConfig`](super::LimiterConfig) is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A tier was configured with a zero-minute grace period.
    #[error("tier '{0}' must grant at least one minute")]
    ZeroMinutes(Tier),

    /// A tier was configured with no uses at all.
    #[error("tier '{0}' must allow at least one use")]
    ZeroUses(Tier),

    /// A tier restores its uses immediately, which defeats the limit.
    #[error("tier '{0}' must wait at least one second before restoring a use")]
    ZeroRestoreDelay(Tier),

    /// The attempt window is shorter than the cooldown.
    #[error("attempt window ({window_secs}s) must be longer than the cooldown ({cooldown_ms}ms)")]
    WindowShorterThanCooldown {
        /// Configured window in seconds
        window_secs: u64,
        /// Configured cooldown in milliseconds
        cooldown_ms: u64,
    },

    /// The JSON document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Returns the tier the error refers to, if any.
    #[must_use]
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::ZeroMinutes(tier) | Self::ZeroUses(tier) | Self::ZeroRestoreDelay(tier) => {
                Some(*tier)
            }
            Self::WindowShorterThanCooldown { .. } | Self::Parse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_zero_minutes() {
        let err = ConfigError::ZeroMinutes(Tier::Short);
        assert!(err.to_string().contains("short"));
        assert!(err.to_string().contains("one minute"));
    }

    #[test]
    fn test_error_display_window() {
        let err = ConfigError::WindowShorterThanCooldown {
            window_secs: 1,
            cooldown_ms: 5000,
        };
        assert!(err.to_string().contains("1s"));
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn test_error_tier() {
        assert_eq!(ConfigError::ZeroUses(Tier::Long).tier(), Some(Tier::Long));
        assert_eq!(ConfigError::Parse("x".into()).tier(), None);
    }
}
