//! Savings accrual.
//!
//! Savings are credited only for full elapsed calendar months since a
//! pause/cancel, modeling "you stopped paying starting this cycle". The
//! derived `savings_*` fields on a record are a pure function of
//! `(status, status_changed_at, amount, cycle, now)` plus the recorded
//! one-time saving events; they are never an input to a transition.

use chrono::{DateTime, Datelike, Utc};

use super::model::{Status, Subscription};

/// Computed savings for a single subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Savings {
    /// Credit for the current calendar month.
    pub monthly: i64,
    /// Credit since the status change.
    pub lifetime: i64,
}

/// Ongoing monthly accrual, excluding one-time saving events.
///
/// Returns zero unless the subscription is paused or canceled with a known
/// status-change timestamp.
#[must_use]
pub fn accrued(sub: &Subscription, now: DateTime<Utc>) -> Savings {
    if !matches!(sub.status, Status::Paused | Status::Canceled) {
        return Savings::default();
    }
    let Some(changed_at) = sub.status_changed_at else {
        return Savings::default();
    };

    let cost = sub.cycle.monthly_equivalent(sub.amount);
    let months = months_elapsed(changed_at, now);
    let lifetime = ((cost * months as f64).round() as i64).max(0);

    let same_month = changed_at.year() == now.year() && changed_at.month() == now.month();
    let monthly = if same_month { cost.round() as i64 } else { 0 };

    Savings { monthly, lifetime }
}

/// Full calendar months between two instants, floored at zero.
#[must_use]
pub fn months_elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    let months =
        (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    months.max(0) as u32
}

/// Recompute the derived savings fields on a record.
///
/// Lifetime savings is the monthly accrual plus every recorded saving
/// event; month-to-date additionally restricts events to the current
/// calendar month. The one-time averted-charge bonus and the ongoing
/// accrual are additive: they represent distinct savings events.
pub fn recompute(sub: &mut Subscription, now: DateTime<Utc>) {
    let accrual = accrued(sub, now);

    let events_total: f64 = sub.saving_events.iter().map(|e| e.amount).sum();
    let events_this_month: f64 = sub
        .saving_events
        .iter()
        .filter(|e| e.at.year() == now.year() && e.at.month() == now.month())
        .map(|e| e.amount)
        .sum();

    sub.savings_lifetime = accrual.lifetime + events_total.round() as i64;
    sub.savings_month_to_date = accrual.monthly + events_this_month.round() as i64;
}

/// Dashboard aggregates over a user's subscriptions.
#[derive(Debug, Clone, PartialEq, Default)]
#[must_use]
pub struct SavingsSummary {
    pub plan_count: usize,
    pub active_count: usize,
    pub total_amount: f64,
    /// Earliest upcoming renewal among active subscriptions.
    pub next_renewal: Option<DateTime<Utc>>,
    pub savings_month_to_date: i64,
    pub savings_lifetime: i64,
}

impl SavingsSummary {
    /// Summarize a slice of subscriptions whose savings fields are current.
    pub fn for_subscriptions(subs: &[Subscription]) -> Self {
        let mut summary = Self {
            plan_count: subs.len(),
            ..Self::default()
        };
        for sub in subs {
            summary.total_amount += sub.amount;
            summary.savings_month_to_date += sub.savings_month_to_date;
            summary.savings_lifetime += sub.savings_lifetime;
            if sub.is_active() {
                summary.active_count += 1;
                summary.next_renewal = match summary.next_renewal {
                    Some(current) if current <= sub.next_renewal => Some(current),
                    _ => Some(sub.next_renewal),
                };
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::model::Cycle;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn sub(status: Status, amount: f64, cycle: Cycle, changed: Option<DateTime<Utc>>) -> Subscription {
        let mut s = Subscription::new("u", "Test", amount, cycle, ts(2025, 6, 1), ts(2024, 1, 1));
        s.status = status;
        s.status_changed_at = changed;
        s
    }

    #[test]
    fn test_active_always_zero() {
        // Savings are zero for active subscriptions regardless of other
        // fields.
        let mut s = sub(Status::Active, 999.0, Cycle::Monthly, Some(ts(2024, 1, 1)));
        s.missed_charges = 5;
        assert_eq!(accrued(&s, ts(2025, 1, 1)), Savings::default());
    }

    #[test]
    fn test_paused_without_timestamp_is_zero() {
        let s = sub(Status::Paused, 999.0, Cycle::Monthly, None);
        assert_eq!(accrued(&s, ts(2025, 1, 1)), Savings::default());
    }

    #[test]
    fn test_yearly_accrual_scenario() {
        // Paused 2024-11-05 at 1499/yearly; by 2025-01-20 two calendar
        // months have elapsed: lifetime = round(124.92 * 2) = 250, monthly
        // = 0 (not the month of the status change).
        let s = sub(Status::Paused, 1499.0, Cycle::Yearly, Some(ts(2024, 11, 5)));
        let savings = accrued(&s, ts(2025, 1, 20));
        assert_eq!(savings.lifetime, 250);
        assert_eq!(savings.monthly, 0);
    }

    #[test]
    fn test_same_month_credits_monthly() {
        let s = sub(Status::Canceled, 649.0, Cycle::Monthly, Some(ts(2025, 1, 3)));
        let savings = accrued(&s, ts(2025, 1, 28));
        assert_eq!(savings.monthly, 649);
        assert_eq!(savings.lifetime, 0);
    }

    #[test]
    fn test_months_elapsed_floors_at_zero() {
        assert_eq!(months_elapsed(ts(2025, 3, 1), ts(2025, 1, 1)), 0);
        assert_eq!(months_elapsed(ts(2024, 11, 5), ts(2025, 1, 20)), 2);
        assert_eq!(months_elapsed(ts(2025, 1, 31), ts(2025, 2, 1)), 1);
    }

    #[test]
    fn test_recompute_adds_saving_events() {
        let mut s = sub(Status::Canceled, 649.0, Cycle::Monthly, Some(ts(2025, 1, 14)));
        s.push_saving_event(649.0, "averted charge", ts(2025, 1, 14));

        recompute(&mut s, ts(2025, 1, 20));
        // Accrual credits this month's 649 plus the averted charge.
        assert_eq!(s.savings_month_to_date, 649 + 649);
        assert_eq!(s.savings_lifetime, 649);

        recompute(&mut s, ts(2025, 3, 20));
        // Two full months of accrual plus the event; the event no longer
        // counts toward the (March) month-to-date figure.
        assert_eq!(s.savings_lifetime, 649 * 2 + 649);
        assert_eq!(s.savings_month_to_date, 0);
    }

    #[test]
    fn test_summary_aggregates() {
        let now = ts(2025, 2, 10);
        let mut a = sub(Status::Active, 199.0, Cycle::Monthly, None);
        a.next_renewal = ts(2025, 2, 20);
        let mut b = sub(Status::Active, 299.0, Cycle::Monthly, None);
        b.next_renewal = ts(2025, 2, 12);
        let mut c = sub(Status::Canceled, 649.0, Cycle::Monthly, Some(ts(2025, 1, 1)));
        recompute(&mut c, now);

        let summary = SavingsSummary::for_subscriptions(&[a, b, c.clone()]);
        assert_eq!(summary.plan_count, 3);
        assert_eq!(summary.active_count, 2);
        assert_eq!(summary.total_amount, 199.0 + 299.0 + 649.0);
        assert_eq!(summary.next_renewal, Some(ts(2025, 2, 12)));
        assert_eq!(summary.savings_lifetime, c.savings_lifetime);
    }
}
