//! Subscription lifecycle engine.
//!
//! Owns the status state machine, pending-change verification,
//! detected-change surfacing, and savings recomputation. The engine holds
//! no record state between invocations: every operation loads from the
//! store, applies the lifecycle rules, and saves back. If a save fails the
//! error propagates unchanged and callers must reload before trusting
//! anything they hold.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::detect::{self, DetectionQueue, Resolution};
use crate::error::{LeakLockError, Result};
use crate::notify::{LifecycleNotice, Notifier};
use crate::probe::BillingEvidenceProbe;
use crate::reminders::{due_reminders, Reminder};
use crate::store::SubscriptionStore;
use crate::subscription::{
    savings, Cycle, DetectedChange, EvidenceKind, PendingAction, SavingsSummary, Source, Status,
    Subscription, SubscriptionId,
};

/// Outcome of one verification sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Pending changes confirmed (no charge in the grace window).
    pub confirmed: Vec<SubscriptionId>,
    /// Pending changes that failed (a charge was observed).
    pub failed: Vec<SubscriptionId>,
    /// Verifications deferred because the probe could not answer.
    pub deferred: Vec<SubscriptionId>,
}

/// An auto-detected subscription candidate awaiting user acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedCandidate {
    pub merchant: String,
    pub amount: f64,
    pub cycle: Cycle,
    pub next_renewal: DateTime<Utc>,
}

/// The lifecycle engine.
///
/// Generic over the persistence store, the billing-evidence probe, and the
/// notification sink so tests can inject deterministic collaborators.
pub struct LifecycleEngine<S, P, N> {
    store: S,
    probe: P,
    notifier: N,
    config: EngineConfig,
    queue: Mutex<DetectionQueue>,
}

impl<S, P, N> LifecycleEngine<S, P, N>
where
    S: SubscriptionStore,
    P: BillingEvidenceProbe,
    N: Notifier,
{
    /// Create a new engine.
    #[must_use]
    pub fn new(store: S, probe: P, notifier: N, config: EngineConfig) -> Self {
        Self {
            store,
            probe,
            notifier,
            config,
            queue: Mutex::new(DetectionQueue::new()),
        }
    }

    // A poisoned queue mutex only means a panic mid-push; the queue itself
    // is always in a usable state.
    fn queue(&self) -> std::sync::MutexGuard<'_, DetectionQueue> {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn load(&self, id: SubscriptionId) -> Result<Subscription> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LeakLockError::not_found(format!("subscription {id}")))
    }

    /// Fetch a subscription with its savings fields brought current.
    pub async fn get(&self, id: SubscriptionId, now: DateTime<Utc>) -> Result<Subscription> {
        let mut sub = self.load(id).await?;
        savings::recompute(&mut sub, now);
        Ok(sub)
    }

    /// All of a user's subscriptions with savings brought current.
    pub async fn list(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<Subscription>> {
        let mut subs = self.store.list(user_id).await?;
        for sub in &mut subs {
            savings::recompute(sub, now);
        }
        Ok(subs)
    }

    /// Dashboard aggregates for a user.
    pub async fn savings_summary(&self, user_id: &str, now: DateTime<Utc>) -> Result<SavingsSummary> {
        let subs = self.list(user_id, now).await?;
        Ok(SavingsSummary::for_subscriptions(&subs))
    }

    /// Persist a new subscription.
    pub async fn create(&self, subscription: &Subscription) -> Result<()> {
        self.store.save(subscription).await
    }

    /// Create subscriptions from accepted auto-detected candidates.
    pub async fn accept_detected(
        &self,
        user_id: &str,
        candidates: Vec<DetectedCandidate>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>> {
        let mut created = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let mut sub = Subscription::new(
                user_id,
                candidate.merchant,
                candidate.amount,
                candidate.cycle,
                candidate.next_renewal,
                now,
            );
            sub.source = Source::Auto;
            self.store.save(&sub).await?;
            created.push(sub);
        }
        Ok(created)
    }

    /// Delete a subscription and drop any queued prompt for it.
    pub async fn delete(&self, id: SubscriptionId) -> Result<()> {
        self.store.delete(id).await?;
        self.queue().remove(id);
        Ok(())
    }

    /// Move a subscription to `new_status`.
    ///
    /// Idempotent; clearing of pending/detected changes and timestamp
    /// stamping follow the state machine rules.
    pub async fn transition_status(
        &self,
        id: SubscriptionId,
        new_status: Status,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let mut sub = self.load(id).await?;
        let had_detected = sub.detected_change.is_some();
        sub.transition(new_status, now);
        savings::recompute(&mut sub, now);
        self.store.save(&sub).await?;
        // A same-status call is a no-op and leaves the detected change in
        // place; the prompt must stay queued with it.
        if had_detected && sub.detected_change.is_none() {
            self.queue().remove(id);
        }
        tracing::info!(
            target: "leaklock::engine",
            subscription_id = %id,
            status = %new_status,
            "status transition"
        );
        Ok(sub)
    }

    /// Resume/resubscribe: back to active with the renewal pushed out one
    /// cycle.
    pub async fn renew(&self, id: SubscriptionId, now: DateTime<Utc>) -> Result<Subscription> {
        let mut sub = self.load(id).await?;
        sub.renew(now);
        savings::recompute(&mut sub, now);
        self.store.save(&sub).await?;
        Ok(sub)
    }

    /// Declare an intended action for verification at the next renewal.
    ///
    /// The subscription must be active; the declared action does not touch
    /// `status` until [`verify_pending_changes`](Self::verify_pending_changes)
    /// confirms it.
    pub async fn declare_intended_action(
        &self,
        id: SubscriptionId,
        action: PendingAction,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let mut sub = self.load(id).await?;
        sub.declare(action, self.config.verification.grace_days, now)?;
        self.store.save(&sub).await?;
        tracing::info!(
            target: "leaklock::engine",
            subscription_id = %id,
            action = %action,
            for_cycle = %sub.next_renewal,
            "intended action declared"
        );
        Ok(sub)
    }

    /// Verify every expired grace window for a user.
    ///
    /// Consults the probe exactly once per pending subscription per sweep.
    /// No charge confirms the declared action; a charge clears the pending
    /// change and emits a failure notice with the status untouched; an
    /// unavailable probe leaves the record as-is for the next sweep.
    /// Re-invoking after a pending change has been cleared is a no-op.
    pub async fn verify_pending_changes(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        for sub in self.store.list(user_id).await? {
            let mut sub = sub;

            // A watch set by a "not sure" answer lasts exactly one sweep.
            if sub.reactivation_watch && sub.detected_change.is_none() {
                sub.reactivation_watch = false;
                self.store.save(&sub).await?;
            }

            let Some(pending) = sub.pending_change.clone() else {
                continue;
            };
            if !pending.is_verifiable(now) {
                continue;
            }

            match self.probe.charge_occurred(&sub).await {
                Ok(true) => {
                    sub.pending_change = None;
                    sub.updated_at = now;
                    savings::recompute(&mut sub, now);
                    self.store.save(&sub).await?;
                    self.notifier
                        .notify(LifecycleNotice::PendingChangeFailed {
                            subscription_id: sub.id,
                            merchant: sub.merchant.clone(),
                            amount: sub.amount,
                        })
                        .await;
                    outcome.failed.push(sub.id);
                }
                Ok(false) => {
                    let averted = sub.amount;
                    let new_status = match pending.action {
                        PendingAction::Cancel => {
                            sub.transition(Status::Canceled, now);
                            Status::Canceled
                        }
                        PendingAction::PauseNCycles => {
                            sub.transition(Status::Paused, now);
                            Status::Paused
                        }
                        PendingAction::SkipThisCycle => {
                            // One charge skipped; billing continues from the
                            // following cycle.
                            sub.pending_change = None;
                            sub.next_renewal = sub.cycle.advance(sub.next_renewal);
                            sub.updated_at = now;
                            Status::Active
                        }
                    };
                    sub.push_saving_event(
                        averted,
                        format!("averted {} charge", sub.merchant.clone()),
                        now,
                    );
                    savings::recompute(&mut sub, now);
                    self.store.save(&sub).await?;
                    self.notifier
                        .notify(LifecycleNotice::PendingChangeConfirmed {
                            subscription_id: sub.id,
                            merchant: sub.merchant.clone(),
                            new_status,
                            averted_amount: averted,
                        })
                        .await;
                    outcome.confirmed.push(sub.id);
                }
                Err(err) if err.is_inconclusive() => {
                    tracing::warn!(
                        target: "leaklock::engine",
                        subscription_id = %sub.id,
                        error = %err,
                        "billing evidence unavailable, deferring verification"
                    );
                    outcome.deferred.push(sub.id);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(outcome)
    }

    /// Record that an expected charge was not observed.
    ///
    /// Once the configured threshold of consecutive missed charges is
    /// reached on an active subscription, soft evidence is surfaced for
    /// user confirmation.
    pub async fn record_missed_charge(
        &self,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let mut sub = self.load(id).await?;
        sub.missed_charges += 1;
        sub.updated_at = now;

        let threshold = self.config.detection.soft_evidence_threshold;
        if sub.is_active() && sub.missed_charges >= threshold && detect::can_surface(&sub) {
            let change = detect::soft_change_for_missed_charges(sub.missed_charges, now);
            return self.attach_detected_change(sub, change).await;
        }

        self.store.save(&sub).await?;
        Ok(sub)
    }

    /// Surface hard evidence of a provider-side status change.
    ///
    /// The record's `status` is untouched until the user confirms. Fails
    /// with `InvalidState` while a pending change is awaiting verification;
    /// a record that already carries a detected change keeps the first one.
    pub async fn surface_detected_change(
        &self,
        id: SubscriptionId,
        resulting_status: Status,
        evidence: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let mut sub = self.load(id).await?;
        if sub.pending_change.is_some() {
            return Err(LeakLockError::invalid_state(
                "a pending change is awaiting verification",
            ));
        }
        if sub.detected_change.is_some() {
            // First evidence wins; the prompt is already queued.
            return Ok(sub);
        }
        // Hard evidence overrides a reactivation watch.
        sub.reactivation_watch = false;
        let change = DetectedChange {
            kind: EvidenceKind::Hard,
            resulting_status,
            evidence: evidence.into(),
            detected_at: now,
        };
        self.attach_detected_change(sub, change).await
    }

    async fn attach_detected_change(
        &self,
        mut sub: Subscription,
        change: DetectedChange,
    ) -> Result<Subscription> {
        let kind = change.kind;
        let suggested = change.resulting_status;
        sub.detected_change = Some(change);
        self.store.save(&sub).await?;
        self.queue().push(sub.id);
        self.notifier
            .notify(LifecycleNotice::ChangeDetected {
                subscription_id: sub.id,
                merchant: sub.merchant.clone(),
                kind,
                suggested_status: suggested,
            })
            .await;
        Ok(sub)
    }

    /// Resolve a surfaced detected change with the user's decision.
    pub async fn resolve_detected_change(
        &self,
        id: SubscriptionId,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let mut sub = self.load(id).await?;
        let Some(change) = sub.detected_change.clone() else {
            return Err(LeakLockError::invalid_state(
                "no detected change to resolve",
            ));
        };

        match resolution {
            Resolution::Confirm => {
                sub.transition(change.resulting_status, now);
                sub.missed_charges = 0;
            }
            Resolution::NotSure => {
                sub.detected_change = None;
                sub.reactivation_watch = true;
                sub.updated_at = now;
            }
            Resolution::Dismiss => {
                sub.detected_change = None;
                sub.missed_charges = 0;
                sub.updated_at = now;
            }
        }

        savings::recompute(&mut sub, now);
        self.store.save(&sub).await?;
        self.queue().remove(id);
        Ok(sub)
    }

    /// The subscription whose detected-change prompt should be shown, if
    /// any.
    #[must_use]
    pub fn current_prompt(&self) -> Option<SubscriptionId> {
        self.queue().current()
    }

    /// Emit renewal reminders due today for a user and return them.
    pub async fn send_due_reminders(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reminder>> {
        let today = now.date_naive();
        let mut due = Vec::new();
        for sub in self.store.list(user_id).await? {
            if let Some(reminder) = due_reminders(&sub, today) {
                self.notifier
                    .notify(LifecycleNotice::RenewalDue {
                        subscription_id: sub.id,
                        merchant: sub.merchant.clone(),
                        renews_at: sub.next_renewal,
                        amount: sub.amount,
                    })
                    .await;
                due.push(reminder);
            }
        }
        Ok(due)
    }
}
