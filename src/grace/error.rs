//! Grace-period request errors.

use thiserror::Error;

use crate::types::Tier;

/// Reasons a grace-period button press was refused.
///
/// In every case nothing was started and no allowance was spent; the UI
/// shows the button as disabled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GraceError {
    /// The tier has no uses left until a restoration fires.
    #[error("no '{0}' grace periods left, wait for one to be restored")]
    AllowanceExhausted(Tier),

    /// The restoration for the use could not be scheduled.
    #[error("could not schedule restoration for a '{0}' grace period")]
    RestoreNotScheduled(Tier),

    /// No tokio runtime is available to drive the countdown.
    #[error("no async runtime to run a '{0}' grace period")]
    RuntimeUnavailable(Tier),
}

impl GraceError {
    /// Returns the tier whose button was pressed.
    #[must_use]
    pub fn tier(&self) -> Tier {
        match self {
            Self::AllowanceExhausted(tier)
            | Self::RestoreNotScheduled(tier)
            | Self::RuntimeUnavailable(tier) => *tier,
        }
    }

    /// Returns true if the tier is simply out of uses.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::AllowanceExhausted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraceError::AllowanceExhausted(Tier::Long);
        assert!(err.to_string().contains("'long'"));
        assert!(err.to_string().contains("restored"));
    }

    #[test]
    fn test_error_tier() {
        assert_eq!(GraceError::AllowanceExhausted(Tier::Short).tier(), Tier::Short);
        assert_eq!(GraceError::RestoreNotScheduled(Tier::Medium).tier(), Tier::Medium);
        assert_eq!(GraceError::RuntimeUnavailable(Tier::Long).tier(), Tier::Long);
    }

    #[test]
    fn test_is_exhausted() {
        assert!(GraceError::AllowanceExhausted(Tier::Short).is_exhausted());
        assert!(!GraceError::RestoreNotScheduled(Tier::Short).is_exhausted());
        assert!(!GraceError::RuntimeUnavailable(Tier::Short).is_exhausted());
    }
}
