//! User-visible lifecycle notices.
//!
//! Provides a trait-based notification sink for the signals the engine
//! emits: failed or confirmed pending-change verifications, surfaced
//! detected changes, and due renewal reminders. Delivery (push, in-app
//! toast) belongs to the hosting application.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::subscription::{EvidenceKind, Status, SubscriptionId};

/// Notices the engine emits for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleNotice {
    /// A charge was detected during the grace window; the requested change
    /// did not take effect and the record was left as it was.
    PendingChangeFailed {
        subscription_id: SubscriptionId,
        merchant: String,
        amount: f64,
    },
    /// The declared change was confirmed and the averted charge credited.
    PendingChangeConfirmed {
        subscription_id: SubscriptionId,
        merchant: String,
        new_status: Status,
        averted_amount: f64,
    },
    /// Evidence suggests the provider-side status differs; the user must
    /// confirm before anything changes.
    ChangeDetected {
        subscription_id: SubscriptionId,
        merchant: String,
        kind: EvidenceKind,
        suggested_status: Status,
    },
    /// A reminder window was hit for an upcoming renewal.
    RenewalDue {
        subscription_id: SubscriptionId,
        merchant: String,
        renews_at: DateTime<Utc>,
        amount: f64,
    },
}

impl fmt::Display for LifecycleNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingChangeFailed { merchant, amount, .. } => {
                write!(
                    f,
                    "Charge of {} detected for {}; the requested change did not take effect",
                    amount, merchant
                )
            }
            Self::PendingChangeConfirmed { merchant, new_status, averted_amount, .. } => {
                write!(
                    f,
                    "{} is now {}; averted charge of {} credited to savings",
                    merchant, new_status, averted_amount
                )
            }
            Self::ChangeDetected { merchant, kind, suggested_status, .. } => {
                write!(
                    f,
                    "Detected a possible status change for {} ({} evidence, suggests {})",
                    merchant, kind, suggested_status
                )
            }
            Self::RenewalDue { merchant, renews_at, amount, .. } => {
                write!(
                    f,
                    "{} renews on {} for {}",
                    merchant,
                    renews_at.format("%Y-%m-%d"),
                    amount
                )
            }
        }
    }
}

/// Trait for notification sinks.
///
/// Implementations should handle failures gracefully (e.g. log and drop)
/// to avoid disrupting lifecycle operations.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: LifecycleNotice);
}

/// No-op notifier that drops every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(&self, _notice: LifecycleNotice) {
        // No-op
    }
}

/// Tracing-based notifier.
///
/// Emits notices as structured log events under the `leaklock::notify`
/// target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notice: LifecycleNotice) {
        match &notice {
            LifecycleNotice::PendingChangeFailed { subscription_id, .. } => {
                tracing::warn!(
                    target: "leaklock::notify",
                    subscription_id = %subscription_id,
                    "{notice}"
                );
            }
            _ => {
                tracing::info!(
                    target: "leaklock::notify",
                    "{notice}"
                );
            }
        }
    }
}

/// Notifier implementations for testing.
#[cfg(any(test, feature = "test-store"))]
pub mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every notice for later assertions.
    #[derive(Clone, Default)]
    pub struct RecordingNotifier {
        notices: Arc<Mutex<Vec<LifecycleNotice>>>,
    }

    impl RecordingNotifier {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn notices(&self) -> Vec<LifecycleNotice> {
            self.notices.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notice: LifecycleNotice) {
            self.notices.lock().unwrap().push(notice);
        }
    }
}
