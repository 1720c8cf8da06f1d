//! The subscription record and its lifecycle rules.

use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LeakLockError, Result};

/// Opaque subscription identifier.
pub type SubscriptionId = Uuid;

/// A tracked subscription.
///
/// This is the sole entity the engine operates on. Status changes go through
/// [`Subscription::transition`]; nothing else writes `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: SubscriptionId,
    /// Owning user, supplied by the auth collaborator.
    pub user_id: String,
    /// How the subscription entered the system.
    pub source: Source,
    /// Normalized merchant name (e.g. "Netflix").
    pub merchant: String,
    /// Plan label shown to the user, when known.
    pub plan_name: Option<String>,
    /// Positive charge amount per cycle, minor-unit-agnostic.
    pub amount: f64,
    /// ISO-ish currency code.
    pub currency: String,
    pub cycle: Cycle,
    pub start_date: DateTime<Utc>,
    /// Next expected charge.
    pub next_renewal: DateTime<Utc>,
    /// Last confirmed charge, if any.
    pub last_payment_at: Option<DateTime<Utc>>,
    pub status: Status,
    /// Stamped on every transition that changes `status`; None while the
    /// subscription has been active since creation.
    pub status_changed_at: Option<DateTime<Utc>>,
    /// Incremented by the billing-evidence collaborator when an expected
    /// charge is not observed.
    pub missed_charges: u32,
    /// A user-declared intended action awaiting real-world verification.
    pub pending_change: Option<PendingChange>,
    /// A system-surfaced, unconfirmed suspicion that the provider-side
    /// status differs from the recorded status.
    pub detected_change: Option<DetectedChange>,
    /// Set when the user answered "not sure" to a detected change; the
    /// subscription is re-evaluated on the next evidence sweep instead of
    /// being re-surfaced immediately.
    pub reactivation_watch: bool,
    pub reminders: ReminderConfig,
    /// One-time averted-charge credits from confirmed pending changes.
    pub saving_events: Vec<SavingEvent>,
    /// Derived; recomputed on read, never an input to a transition.
    pub savings_month_to_date: i64,
    /// Derived; recomputed on read, never an input to a transition.
    pub savings_lifetime: i64,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Create a new active subscription with defaults matching a manual add.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        merchant: impl Into<String>,
        amount: f64,
        cycle: Cycle,
        next_renewal: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            source: Source::Manual,
            merchant: merchant.into(),
            plan_name: None,
            amount,
            currency: "INR".to_string(),
            cycle,
            start_date: now,
            next_renewal,
            last_payment_at: None,
            status: Status::Active,
            status_changed_at: None,
            missed_charges: 0,
            pending_change: None,
            detected_change: None,
            reactivation_watch: false,
            reminders: ReminderConfig::default(),
            saving_events: Vec::new(),
            savings_month_to_date: 0,
            savings_lifetime: 0,
            category: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Human label: plan name, falling back to the merchant name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.plan_name.as_deref().unwrap_or(&self.merchant)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.status == Status::Paused
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.status == Status::Canceled
    }

    /// Move to `new_status`.
    ///
    /// Idempotent: if the status is unchanged this is a no-op and
    /// `status_changed_at` keeps its previous value. On a real change the
    /// timestamp is stamped and any outstanding pending or detected change
    /// is cleared, keeping the two mutually exclusive.
    pub fn transition(&mut self, new_status: Status, now: DateTime<Utc>) {
        if new_status == self.status {
            return;
        }
        self.status = new_status;
        self.status_changed_at = Some(now);
        self.pending_change = None;
        self.detected_change = None;
        self.updated_at = now;
    }

    /// Declare an intended action against the next renewal.
    ///
    /// The action is provisional until verified against billing evidence;
    /// `status` is untouched here.
    pub fn declare(
        &mut self,
        action: PendingAction,
        grace_days: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != Status::Active {
            return Err(LeakLockError::invalid_state(format!(
                "cannot declare an intended action on a {} subscription",
                self.status
            )));
        }
        if self.detected_change.is_some() {
            return Err(LeakLockError::invalid_state(
                "a detected change is awaiting confirmation; resolve it first",
            ));
        }
        self.pending_change = Some(PendingChange {
            action,
            for_cycle_date: self.next_renewal,
            grace_days,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Resume or resubscribe: back to active, renewal pushed out one cycle,
    /// payment date stamped.
    pub fn renew(&mut self, now: DateTime<Utc>) {
        self.transition(Status::Active, now);
        self.next_renewal = self.cycle.advance(self.next_renewal);
        self.last_payment_at = Some(now);
        self.updated_at = now;
    }

    /// Record a one-time averted-charge credit.
    pub fn push_saving_event(&mut self, amount: f64, reason: impl Into<String>, at: DateTime<Utc>) {
        self.saving_events.push(SavingEvent {
            amount,
            reason: reason.into(),
            at,
        });
    }
}

/// Subscription status.
///
/// All three states are reachable from each other; every write goes through
/// [`Subscription::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Billing as expected.
    Active,
    /// Temporarily stopped; savings accrue.
    Paused,
    /// Stopped; savings accrue.
    Canceled,
}

impl Status {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "paused" => Self::Paused,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Active,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing cycle, determining how `amount` normalizes to a monthly cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cycle {
    Monthly,
    Quarterly,
    Yearly,
    /// Unknown/irregular cadence; treated as monthly for cost purposes.
    Custom,
}

impl Cycle {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "quarterly" => Self::Quarterly,
            "yearly" | "annual" | "year" => Self::Yearly,
            "custom" => Self::Custom,
            _ => Self::Monthly,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Custom => "custom",
        }
    }

    /// Normalize a nominal amount to its monthly-equivalent cost.
    #[must_use]
    pub fn monthly_equivalent(&self, amount: f64) -> f64 {
        match self {
            Self::Monthly | Self::Custom => amount,
            Self::Quarterly => amount / 3.0,
            Self::Yearly => amount / 12.0,
        }
    }

    /// The renewal date one cycle after `date`.
    #[must_use]
    pub fn advance(&self, date: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Monthly | Self::Custom => date + Months::new(1),
            Self::Quarterly => date + Months::new(3),
            Self::Yearly => date
                .with_year(date.year() + 1)
                .unwrap_or(date + Months::new(12)),
        }
    }
}

impl std::fmt::Display for Cycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a subscription entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Detected from billing signals and accepted by the user.
    Auto,
    /// Entered by hand.
    Manual,
}

impl Source {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-declared intended action awaiting verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingChange {
    pub action: PendingAction,
    /// The renewal the action targets.
    pub for_cycle_date: DateTime<Utc>,
    /// Days after `for_cycle_date` to wait before concluding.
    pub grace_days: u32,
}

impl PendingChange {
    /// Whether the grace window has elapsed and the change can be verified.
    #[must_use]
    pub fn is_verifiable(&self, now: DateTime<Utc>) -> bool {
        now >= self.for_cycle_date + chrono::Duration::days(i64::from(self.grace_days))
    }
}

/// The action a user declared they performed at the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    /// Skip the upcoming charge, then continue as before.
    SkipThisCycle,
    /// Stop for a few cycles.
    PauseNCycles,
    Cancel,
}

impl PendingAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipThisCycle => "skip_this_cycle",
            Self::PauseNCycles => "pause_n_cycles",
            Self::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for PendingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evidence strength behind a detected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// A single high-confidence signal, e.g. an explicit cancellation notice.
    Hard,
    /// An accumulated pattern, e.g. repeated missed charges.
    Soft,
}

impl EvidenceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A surfaced suspicion that the provider-side status changed.
///
/// Requires explicit user confirmation before any status change takes
/// effect; false positives must never silently alter a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedChange {
    pub kind: EvidenceKind,
    /// The status the evidence points at.
    pub resulting_status: Status,
    /// Human-readable summary of what was found.
    pub evidence: String,
    pub detected_at: DateTime<Utc>,
}

/// Per-subscription reminder settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReminderConfig {
    pub enabled: bool,
    /// One-shot reminders, as days before renewal (T-n).
    pub days_before: Vec<u32>,
    /// When set, daily reminders from T-n until renewal.
    pub daily_from: Option<u32>,
}

/// A one-time savings credit, recorded when a declared change is confirmed
/// and the expected charge never landed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingEvent {
    pub amount: f64,
    pub reason: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn sample(status: Status) -> Subscription {
        let now = ts(2025, 1, 1);
        let mut sub = Subscription::new("user-1", "Netflix", 649.0, Cycle::Monthly, ts(2025, 1, 10), now);
        sub.status = status;
        sub
    }

    #[test]
    fn test_transition_stamps_changed_at() {
        let mut sub = sample(Status::Active);
        assert!(sub.status_changed_at.is_none());

        sub.transition(Status::Paused, ts(2025, 1, 5));
        assert_eq!(sub.status, Status::Paused);
        assert_eq!(sub.status_changed_at, Some(ts(2025, 1, 5)));
    }

    #[test]
    fn test_transition_is_idempotent() {
        let mut sub = sample(Status::Active);
        sub.transition(Status::Canceled, ts(2025, 1, 5));
        let first = sub.clone();

        // Same target again, later: state must be identical.
        sub.transition(Status::Canceled, ts(2025, 2, 1));
        assert_eq!(sub, first);
    }

    #[test]
    fn test_transition_clears_pending_and_detected() {
        let mut sub = sample(Status::Active);
        sub.declare(PendingAction::Cancel, 3, ts(2025, 1, 2)).unwrap();
        assert!(sub.pending_change.is_some());

        sub.transition(Status::Paused, ts(2025, 1, 5));
        assert!(sub.pending_change.is_none());
        assert!(sub.detected_change.is_none());
    }

    #[test]
    fn test_declare_sets_pending_without_status_change() {
        let mut sub = sample(Status::Active);
        sub.declare(PendingAction::Cancel, 3, ts(2025, 1, 2)).unwrap();

        assert_eq!(sub.status, Status::Active);
        let pending = sub.pending_change.as_ref().unwrap();
        assert_eq!(pending.action, PendingAction::Cancel);
        assert_eq!(pending.for_cycle_date, ts(2025, 1, 10));
        assert_eq!(pending.grace_days, 3);
    }

    #[test]
    fn test_declare_rejected_unless_active() {
        for status in [Status::Paused, Status::Canceled] {
            let mut sub = sample(status);
            let before = sub.clone();
            let err = sub.declare(PendingAction::Cancel, 3, ts(2025, 1, 2)).unwrap_err();
            assert!(matches!(err, LeakLockError::InvalidState(_)));
            assert_eq!(sub, before, "a rejected declare must not modify the record");
        }
    }

    #[test]
    fn test_declare_rejected_while_detected_change_outstanding() {
        let mut sub = sample(Status::Active);
        sub.detected_change = Some(DetectedChange {
            kind: EvidenceKind::Hard,
            resulting_status: Status::Canceled,
            evidence: "cancellation notice".to_string(),
            detected_at: ts(2025, 1, 1),
        });
        assert!(sub.declare(PendingAction::Cancel, 3, ts(2025, 1, 2)).is_err());
    }

    #[test]
    fn test_pending_change_grace_window() {
        let pending = PendingChange {
            action: PendingAction::Cancel,
            for_cycle_date: ts(2025, 1, 10),
            grace_days: 3,
        };
        assert!(!pending.is_verifiable(ts(2025, 1, 12)));
        assert!(pending.is_verifiable(ts(2025, 1, 13)));
        assert!(pending.is_verifiable(ts(2025, 1, 14)));
    }

    #[test]
    fn test_renew_advances_cycle() {
        let mut sub = sample(Status::Paused);
        sub.status_changed_at = Some(ts(2024, 12, 1));
        sub.renew(ts(2025, 1, 5));

        assert_eq!(sub.status, Status::Active);
        assert_eq!(sub.next_renewal, ts(2025, 2, 10));
        assert_eq!(sub.last_payment_at, Some(ts(2025, 1, 5)));
    }

    #[test]
    fn test_cycle_advance() {
        let d = ts(2025, 1, 10);
        assert_eq!(Cycle::Monthly.advance(d), ts(2025, 2, 10));
        assert_eq!(Cycle::Quarterly.advance(d), ts(2025, 4, 10));
        assert_eq!(Cycle::Yearly.advance(d), ts(2026, 1, 10));
        assert_eq!(Cycle::Custom.advance(d), ts(2025, 2, 10));
    }

    #[test]
    fn test_monthly_equivalent_monotonic() {
        // yearly-equivalent <= quarterly-equivalent <= monthly for equal
        // nominal amount
        let amount = 1200.0;
        let yearly = Cycle::Yearly.monthly_equivalent(amount);
        let quarterly = Cycle::Quarterly.monthly_equivalent(amount);
        let monthly = Cycle::Monthly.monthly_equivalent(amount);
        assert!(yearly <= quarterly);
        assert!(quarterly <= monthly);
    }

    #[test]
    fn test_display_name_fallback() {
        let mut sub = sample(Status::Active);
        assert_eq!(sub.display_name(), "Netflix");
        sub.plan_name = Some("Premium 4K".to_string());
        assert_eq!(sub.display_name(), "Premium 4K");
    }

    #[test]
    fn test_enum_round_trips() {
        assert_eq!(Status::from_str("paused"), Status::Paused);
        assert_eq!(Status::from_str("cancelled"), Status::Canceled);
        assert_eq!(Status::from_str("anything"), Status::Active);
        assert_eq!(Cycle::from_str("annual"), Cycle::Yearly);
        assert_eq!(Cycle::from_str("unknown"), Cycle::Monthly);
        assert_eq!(PendingAction::Cancel.as_str(), "cancel");
        assert_eq!(EvidenceKind::Soft.to_string(), "soft");
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Status::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
        let action: PendingAction = serde_json::from_str("\"skip_this_cycle\"").unwrap();
        assert_eq!(action, PendingAction::SkipThisCycle);
    }
}
