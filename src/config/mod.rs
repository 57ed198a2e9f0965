//! Limiter configuration.
//!
//! Every tunable constant of the limiter lives here: the blocked-attempt
//! cooldown and window, the identity patterns treated as launcher/system UI,
//! and the per-tier grace-period length, allowance and restoration delay.
//! All fields have serde defaults, so a host can ship a partial JSON
//! document or nothing at all.

mod error;

pub use error::ConfigError;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::Tier;

fn default_cooldown_ms() -> u64 {
    5_000
}

fn default_attempt_window_secs() -> u64 {
    24 * 60 * 60
}

fn default_ignored_identity_patterns() -> Vec<String> {
    vec!["launcher".to_string(), "systemui".to_string()]
}

// ============================================================================
// TierConfig
// ============================================================================

/// Settings for a single grace-period tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Length of the grace period in minutes
    pub minutes: u32,
    /// Maximum (and initial) number of uses
    pub max_uses: u32,
    /// Delay before a spent use is given back, in seconds
    pub restore_after_secs: u64,
}

impl TierConfig {
    /// Returns the restoration delay as a [`Duration`].
    pub fn restore_after(&self) -> Duration {
        Duration::from_secs(self.restore_after_secs)
    }
}

fn default_short_tier() -> TierConfig {
    TierConfig {
        minutes: 1,
        max_uses: 5,
        restore_after_secs: 2 * 60 * 60,
    }
}

fn default_medium_tier() -> TierConfig {
    TierConfig {
        minutes: 5,
        max_uses: 3,
        restore_after_secs: 7 * 60 * 60,
    }
}

fn default_long_tier() -> TierConfig {
    TierConfig {
        minutes: 10,
        max_uses: 1,
        restore_after_secs: 20 * 60 * 60,
    }
}

/// The three tier settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    /// 1-minute button
    #[serde(default = "default_short_tier")]
    pub short: TierConfig,
    /// 5-minute button
    #[serde(default = "default_medium_tier")]
    pub medium: TierConfig,
    /// 10-minute button
    #[serde(default = "default_long_tier")]
    pub long: TierConfig,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            short: default_short_tier(),
            medium: default_medium_tier(),
            long: default_long_tier(),
        }
    }
}

impl TierTable {
    /// Returns the settings for a tier.
    pub fn get(&self, tier: Tier) -> &TierConfig {
        match tier {
            Tier::Short => &self.short,
            Tier::Medium => &self.medium,
            Tier::Long => &self.long,
        }
    }

    fn get_mut(&mut self, tier: Tier) -> &mut TierConfig {
        match tier {
            Tier::Short => &mut self.short,
            Tier::Medium => &mut self.medium,
            Tier::Long => &mut self.long,
        }
    }
}

// ============================================================================
// LimiterConfig
// ============================================================================

/// Top-level limiter configuration.
///
/// # Example
///
/// ```
/// use app_limiter::config::LimiterConfig;
/// use app_limiter::types::Tier;
///
/// let config = LimiterConfig::default();
/// assert_eq!(config.cooldown_ms, 5_000);
/// assert_eq!(config.tiers.get(Tier::Short).max_uses, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Minimum spacing between two recorded blocked attempts, in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Sliding window over which blocked attempts are counted, in seconds.
    #[serde(default = "default_attempt_window_secs")]
    pub attempt_window_secs: u64,

    /// Case-insensitive substrings marking launcher or system-UI identities.
    #[serde(default = "default_ignored_identity_patterns")]
    pub ignored_identity_patterns: Vec<String>,

    /// Per-tier grace-period settings.
    #[serde(default)]
    pub tiers: TierTable,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            attempt_window_secs: default_attempt_window_secs(),
            ignored_identity_patterns: default_ignored_identity_patterns(),
            tiers: TierTable::default(),
        }
    }
}

impl LimiterConfig {
    /// Sets the blocked-attempt cooldown.
    #[must_use]
    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Sets the attempt-counting window.
    #[must_use]
    pub fn with_attempt_window_secs(mut self, secs: u64) -> Self {
        self.attempt_window_secs = secs;
        self
    }

    /// Replaces the settings for one tier.
    #[must_use]
    pub fn with_tier(mut self, tier: Tier, settings: TierConfig) -> Self {
        *self.tiers.get_mut(tier) = settings;
        self
    }

    /// Returns the cooldown as a [`Duration`].
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Returns the attempt window as a [`Duration`].
    pub fn attempt_window(&self) -> Duration {
        Duration::from_secs(self.attempt_window_secs)
    }

    /// Returns true if `identity` matches a launcher/system-UI pattern.
    pub fn is_ignored_identity(&self, identity: &str) -> bool {
        let identity = identity.to_lowercase();
        self.ignored_identity_patterns
            .iter()
            .any(|pattern| identity.contains(&pattern.to_lowercase()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first rule the configuration breaks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in Tier::ALL {
            let settings = self.tiers.get(tier);
            if settings.minutes == 0 {
                return Err(ConfigError::ZeroMinutes(tier));
            }
            if settings.max_uses == 0 {
                return Err(ConfigError::ZeroUses(tier));
            }
            if settings.restore_after_secs == 0 {
                return Err(ConfigError::ZeroRestoreDelay(tier));
            }
        }
        if self.attempt_window_secs.saturating_mul(1000) <= self.cooldown_ms {
            return Err(ConfigError::WindowShorterThanCooldown {
                window_secs: self.attempt_window_secs,
                cooldown_ms: self.cooldown_ms,
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json_str(&json)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded limiter configuration");
        Ok(config)
    }
}
