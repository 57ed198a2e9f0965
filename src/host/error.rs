//! Host collaborator error types.
//!
//! Every error here is absorbed inside the core: an unresolvable identity
//! means the event is ignored, a rejected schedule means the allowance is
//! left untouched. None of them stop the limiter.

use thiserror::Error;

/// Errors reported by host-provided collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The identity resolver has no display name for this identity.
    #[error("no installed app matches identity '{0}'")]
    IdentityNotFound(String),

    /// The deferred-task scheduler refused the request.
    #[error("failed to schedule deferred task: {0}")]
    ScheduleRejected(String),

    /// No scheduler backend is reachable (e.g. no async runtime).
    #[error("deferred-task scheduler is unavailable")]
    SchedulerUnavailable,
}

impl HostError {
    /// Returns true if this error is an identity-resolution failure.
    #[must_use]
    pub fn is_identity_not_found(&self) -> bool {
        matches!(self, Self::IdentityNotFound(_))
    }

    /// Returns true if this error came from the deferred-task scheduler.
    #[must_use]
    pub fn is_scheduler_error(&self) -> bool {
        matches!(self, Self::ScheduleRejected(_) | Self::SchedulerUnavailable)
    }
}
