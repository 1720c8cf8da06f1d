/// The main error type for LeakLock engine operations
#[derive(Debug, thiserror::Error)]
pub enum LeakLockError {
    /// An operation's state precondition was violated (e.g. declaring an
    /// intended action on a non-active subscription). Always
    /// caller-correctable; never retried automatically.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The billing-evidence probe could not answer. Treated as
    /// "inconclusive", not as a failure of the engine: a pending change is
    /// left untouched for the next sweep.
    #[error("Billing evidence unavailable: {0}")]
    ProbeUnavailable(String),

    /// Propagated from the persistence collaborator unchanged. The engine
    /// performs no retry itself; in-memory state is not authoritative after
    /// a failed save.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl LeakLockError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn probe_unavailable(msg: impl Into<String>) -> Self {
        Self::ProbeUnavailable(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a verification sweep should treat this error as "try again
    /// next sweep" rather than a hard failure.
    #[must_use]
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::ProbeUnavailable(_))
    }
}

/// Result type alias using LeakLockError
pub type Result<T> = std::result::Result<T, LeakLockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LeakLockError::invalid_state("cannot declare on a paused subscription");
        assert_eq!(
            err.to_string(),
            "Invalid state: cannot declare on a paused subscription"
        );
    }

    #[test]
    fn test_anyhow_passthrough() {
        let err: LeakLockError = anyhow::anyhow!("backend exploded").into();
        assert_eq!(err.to_string(), "backend exploded");
    }

    #[test]
    fn test_probe_unavailable_is_inconclusive() {
        assert!(LeakLockError::probe_unavailable("timeout").is_inconclusive());
        assert!(!LeakLockError::persistence("write failed").is_inconclusive());
    }
}
