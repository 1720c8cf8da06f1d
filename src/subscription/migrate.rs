//! Versioned record migration, run once at the persistence boundary.
//!
//! Early clients let records grow optional fields ad hoc and patched them
//! on every load. Here the shape evolution is explicit: persistence
//! implementations deserialize into [`RawSubscription`] and call
//! [`migrate`]; engine logic only ever sees the current schema.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{LeakLockError, Result};

use super::model::{
    Cycle, DetectedChange, PendingChange, ReminderConfig, SavingEvent, Source, Status,
    Subscription,
};

/// Current record schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// A stored subscription as found on disk, any schema version.
///
/// Version 1 records carry `name`/`renewal` and may omit status, cycle,
/// currency and the reminder/savings fields entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSubscription {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub plan_name: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub cycle: Option<Cycle>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_renewal: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_payment_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub status_changed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub missed_charges: Option<u32>,
    #[serde(default)]
    pub pending_change: Option<PendingChange>,
    #[serde(default)]
    pub detected_change: Option<DetectedChange>,
    #[serde(default)]
    pub reactivation_watch: Option<bool>,
    #[serde(default)]
    pub reminders: Option<ReminderConfig>,
    #[serde(default)]
    pub saving_events: Option<Vec<SavingEvent>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    // Version 1 field names.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub renewal: Option<DateTime<Utc>>,
}

/// Upgrade a raw record to the current schema.
///
/// Defaults match what early clients applied on load: missing status
/// becomes active, missing cycle monthly, missing currency INR, and the
/// v1 `name`/`renewal` fields feed the merchant and next-renewal slots.
pub fn migrate(raw: RawSubscription, now: DateTime<Utc>) -> Result<Subscription> {
    let merchant = raw
        .merchant
        .or(raw.name.clone())
        .ok_or_else(|| LeakLockError::persistence("record has neither merchant nor name"))?;
    let next_renewal = raw
        .next_renewal
        .or(raw.renewal)
        .ok_or_else(|| LeakLockError::persistence("record has no renewal date"))?;

    let mut sub = Subscription {
        id: raw.id.unwrap_or_else(Uuid::new_v4),
        user_id: raw.user_id.unwrap_or_default(),
        source: raw.source.unwrap_or(Source::Manual),
        merchant,
        plan_name: raw.plan_name.or(raw.name),
        amount: raw.amount,
        currency: raw.currency.unwrap_or_else(|| "INR".to_string()),
        cycle: raw.cycle.unwrap_or(Cycle::Monthly),
        start_date: raw.start_date.unwrap_or(now),
        next_renewal,
        last_payment_at: raw.last_payment_at,
        status: raw.status.unwrap_or(Status::Active),
        status_changed_at: raw.status_changed_at,
        missed_charges: raw.missed_charges.unwrap_or(0),
        pending_change: raw.pending_change,
        detected_change: raw.detected_change,
        reactivation_watch: raw.reactivation_watch.unwrap_or(false),
        reminders: raw.reminders.unwrap_or_default(),
        saving_events: raw.saving_events.unwrap_or_default(),
        savings_month_to_date: 0,
        savings_lifetime: 0,
        category: raw.category,
        notes: raw.notes,
        created_at: raw.created_at.unwrap_or(now),
        updated_at: raw.updated_at.unwrap_or(now),
    };
    super::savings::recompute(&mut sub, now);
    Ok(sub)
}

/// Parse and migrate a JSON record in one step.
pub fn from_json(json: &str, now: DateTime<Utc>) -> Result<Subscription> {
    let raw: RawSubscription = serde_json::from_str(json)
        .map_err(|e| LeakLockError::persistence(format!("malformed subscription record: {e}")))?;
    migrate(raw, now)
}
