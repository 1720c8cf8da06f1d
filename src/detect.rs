//! Detected-change surfacing and the prompt queue.
//!
//! Evidence collaborators feed missed charges and explicit signals in;
//! nothing here mutates `status`. A detected change sits on the record
//! until the user resolves it, and at most one change is shown at a time
//! system-wide, first discovered first shown; the rest queue behind it.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::subscription::{DetectedChange, EvidenceKind, Status, Subscription, SubscriptionId};

/// The user's answer to a surfaced detected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The provider-side change is real; apply the suggested status.
    Confirm,
    /// Unsure; watch the subscription and re-evaluate on the next sweep.
    NotSure,
    /// The record is correct as-is; drop the evidence.
    Dismiss,
}

/// Build the soft-evidence change for accumulated missed charges.
#[must_use]
pub fn soft_change_for_missed_charges(missed: u32, now: DateTime<Utc>) -> DetectedChange {
    let plural = if missed == 1 { "" } else { "s" };
    DetectedChange {
        kind: EvidenceKind::Soft,
        // Repeated missed charges suggest a pause more often than a
        // cancellation; the user picks the final status on confirmation.
        resulting_status: Status::Paused,
        evidence: format!("No charges seen on the last {missed} renewal{plural}"),
        detected_at: now,
    }
}

/// Whether a subscription is eligible to have evidence surfaced on it.
///
/// Pending and detected changes are mutually exclusive, a record already
/// carrying a detected change keeps it, and a watched record waits for the
/// next sweep to clear the watch flag.
#[must_use]
pub fn can_surface(sub: &Subscription) -> bool {
    sub.pending_change.is_none() && sub.detected_change.is_none() && !sub.reactivation_watch
}

/// FIFO queue of subscriptions with an unresolved detected change.
///
/// Only the front entry is presented to the user; the rest wait so the
/// user is never interrupted by several prompts at once.
#[derive(Debug, Default)]
pub struct DetectionQueue {
    entries: VecDeque<SubscriptionId>,
}

impl DetectionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a subscription; already-queued ids are kept in place.
    pub fn push(&mut self, id: SubscriptionId) {
        if !self.entries.contains(&id) {
            self.entries.push_back(id);
        }
    }

    /// The subscription whose prompt should currently be shown.
    #[must_use]
    pub fn current(&self) -> Option<SubscriptionId> {
        self.entries.front().copied()
    }

    /// Drop a subscription from the queue after its change was resolved
    /// (or the record deleted).
    pub fn remove(&mut self, id: SubscriptionId) {
        self.entries.retain(|queued| *queued != id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
