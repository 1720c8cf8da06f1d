//! Subscription records and the pure lifecycle rules that govern them.
//!
//! The types here own the status state machine: every status change goes
//! through [`Subscription::transition`], and the savings fields are always
//! recomputed from `(status, status_changed_at, amount, cycle, now)` plus
//! the recorded saving events, never mutated independently.

pub mod migrate;
pub mod model;
pub mod savings;

pub use migrate::{migrate, RawSubscription, SCHEMA_VERSION};
pub use model::{
    Cycle, DetectedChange, EvidenceKind, PendingAction, PendingChange, ReminderConfig, SavingEvent,
    Source, Status, Subscription, SubscriptionId,
};
pub use savings::{Savings, SavingsSummary};
