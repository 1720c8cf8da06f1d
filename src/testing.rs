//! Test fixtures and factory pattern for generating subscription data
//!
//! This module provides helpers for creating test data in a consistent way.
//! Available under `#[cfg(test)]` and the `test-store` feature.

use chrono::{DateTime, TimeZone, Utc};

use crate::subscription::{Cycle, Status, Subscription};

/// Helper functions for generating fake test data
pub mod fake {
    use uuid::Uuid;

    /// Generate a fake user id
    pub fn user_id() -> String {
        format!("user-{}", &Uuid::new_v4().simple().to_string()[..8])
    }

    /// Generate a fake merchant name
    pub fn merchant() -> String {
        const NAMES: &[&str] = &["Streamly", "Tunebox", "Cloudbin", "Newsdesk", "Fitpass"];
        let name = NAMES[fastrand::usize(0..NAMES.len())];
        format!("{} {}", name, fastrand::u32(10..99))
    }

    /// Generate a plausible monthly price
    pub fn amount() -> f64 {
        f64::from(fastrand::u32(49..1999))
    }

    /// Generate a random integer between min and max
    pub fn int(min: i32, max: i32) -> i32 {
        fastrand::i32(min..=max)
    }
}

/// A stable timestamp for tests that need deterministic dates.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Builder for subscription records in tests.
pub struct SubscriptionFactory {
    user_id: Option<String>,
    merchant: Option<String>,
    amount: Option<f64>,
    cycle: Cycle,
    status: Status,
    next_renewal: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
}

impl Default for SubscriptionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionFactory {
    /// Create a new factory with generated defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            user_id: None,
            merchant: None,
            amount: None,
            cycle: Cycle::Monthly,
            status: Status::Active,
            next_renewal: None,
            now: fixed_now(),
        }
    }

    /// Set the owning user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the merchant name.
    #[must_use]
    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    /// Set the per-cycle amount.
    #[must_use]
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set the billing cycle.
    #[must_use]
    pub fn with_cycle(mut self, cycle: Cycle) -> Self {
        self.cycle = cycle;
        self
    }

    /// Set the initial status.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Set the next renewal date.
    #[must_use]
    pub fn with_next_renewal(mut self, next_renewal: DateTime<Utc>) -> Self {
        self.next_renewal = Some(next_renewal);
        self
    }

    /// Set the creation timestamp.
    #[must_use]
    pub fn created_at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Build the subscription.
    #[must_use]
    pub fn build(self) -> Subscription {
        let now = self.now;
        let next_renewal = self
            .next_renewal
            .unwrap_or_else(|| self.cycle.advance(now));
        let mut sub = Subscription::new(
            self.user_id.unwrap_or_else(fake::user_id),
            self.merchant.unwrap_or_else(fake::merchant),
            self.amount.unwrap_or_else(fake::amount),
            self.cycle,
            next_renewal,
            now,
        );
        if self.status != Status::Active {
            sub.transition(self.status, now);
        }
        sub
    }
}
