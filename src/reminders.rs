//! Renewal proximity and reminder scheduling.
//!
//! Reminders are per-subscription: a set of one-shot T-n offsets plus an
//! optional daily window starting at T-n. Only active subscriptions with
//! reminders enabled produce anything.

use chrono::{DateTime, NaiveDate, Utc};

use crate::subscription::{Subscription, SubscriptionId};

/// How close a renewal is, bucketed the way the dashboard presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalUrgency {
    /// The renewal date has passed.
    Expired,
    Today,
    Tomorrow,
    /// Within the highlight window (2-3 days out).
    Soon(u32),
    /// Further out.
    Later(u32),
}

impl RenewalUrgency {
    /// Bucket a renewal date relative to `now`, by whole days (ceiling).
    #[must_use]
    pub fn of(next_renewal: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let seconds = (next_renewal - now).num_seconds();
        if seconds < 0 {
            return Self::Expired;
        }
        let days = ((seconds as f64) / 86_400.0).ceil() as u32;
        match days {
            0 => Self::Today,
            1 => Self::Tomorrow,
            2..=3 => Self::Soon(days),
            _ => Self::Later(days),
        }
    }

    /// Whether this bucket should be visually highlighted.
    #[must_use]
    pub fn is_expiring(&self) -> bool {
        matches!(self, Self::Today | Self::Tomorrow | Self::Soon(_))
    }
}

impl std::fmt::Display for RenewalUrgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => write!(f, "Expired"),
            Self::Today => write!(f, "Today"),
            Self::Tomorrow => write!(f, "Tomorrow"),
            Self::Soon(days) | Self::Later(days) => write!(f, "{} days", days),
        }
    }
}

/// Why a reminder fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    /// A configured T-n offset was hit exactly.
    DaysBefore(u32),
    /// Inside the daily-from-T window.
    Daily,
}

/// A reminder due today for one subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub subscription_id: SubscriptionId,
    pub merchant: String,
    pub kind: ReminderKind,
    pub renews_on: NaiveDate,
}

/// Reminders due on `today` for a single subscription.
///
/// A day can yield at most one reminder: an exact T-n match wins over the
/// daily window so the user is not pinged twice.
#[must_use]
pub fn due_reminders(sub: &Subscription, today: NaiveDate) -> Option<Reminder> {
    if !sub.reminders.enabled || !sub.is_active() {
        return None;
    }
    let renews_on = sub.next_renewal.date_naive();
    let days_until = (renews_on - today).num_days();
    if days_until < 0 {
        return None;
    }
    let days_until = days_until as u32;

    if sub.reminders.days_before.contains(&days_until) {
        return Some(Reminder {
            subscription_id: sub.id,
            merchant: sub.merchant.clone(),
            kind: ReminderKind::DaysBefore(days_until),
            renews_on,
        });
    }
    if let Some(from) = sub.reminders.daily_from {
        if days_until <= from {
            return Some(Reminder {
                subscription_id: sub.id,
                merchant: sub.merchant.clone(),
                kind: ReminderKind::Daily,
                renews_on,
            });
        }
    }
    None
}
