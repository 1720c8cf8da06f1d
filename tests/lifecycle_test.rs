use chrono::{DateTime, TimeZone, Utc};
use leaklock::notify::test::RecordingNotifier;
use leaklock::probe::test::{FixedProbe, ScriptedProbe, UnavailableProbe};
use leaklock::store::test::{FailingSaveStore, InMemorySubscriptionStore};
use leaklock::{
    ConfigBuilder, Cycle, LeakLockError, LifecycleEngine, LifecycleNotice, PendingAction, Status,
    SubscriptionFactory,
};

fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn test_confirmed_cancellation_applies_status_and_credits_savings() {
    let store = InMemorySubscriptionStore::new();
    let notifier = RecordingNotifier::new();
    let sub = SubscriptionFactory::new()
        .with_user("u-1")
        .with_merchant("Netflix")
        .with_amount(649.0)
        .with_next_renewal(ts(2025, 1, 10))
        .created_at(ts(2025, 1, 1))
        .build();
    let id = sub.id;
    store.seed(vec![sub]);

    let engine = LifecycleEngine::new(
        store,
        FixedProbe::new(false),
        notifier.clone(),
        ConfigBuilder::new().build(),
    );

    engine
        .declare_intended_action(id, PendingAction::Cancel, ts(2025, 1, 2))
        .await
        .unwrap();

    // Status is untouched while the change is pending.
    let pending = engine.get(id, ts(2025, 1, 5)).await.unwrap();
    assert_eq!(pending.status, Status::Active);
    assert!(pending.pending_change.is_some());

    // Renewal Jan 10 + 3 day grace = verifiable from Jan 13.
    let outcome = engine
        .verify_pending_changes("u-1", ts(2025, 1, 14))
        .await
        .unwrap();
    assert_eq!(outcome.confirmed, vec![id]);

    let sub = engine.get(id, ts(2025, 1, 14)).await.unwrap();
    assert_eq!(sub.status, Status::Canceled);
    assert_eq!(sub.status_changed_at, Some(ts(2025, 1, 14)));
    assert!(sub.pending_change.is_none());
    // The averted charge is a one-time saving; the cancel month also
    // accrues its monthly credit.
    assert_eq!(sub.savings_lifetime, 649);
    assert_eq!(sub.savings_month_to_date, 649 + 649);

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0],
        LifecycleNotice::PendingChangeConfirmed { new_status: Status::Canceled, .. }
    ));
}

#[tokio::test]
async fn test_charge_during_grace_window_fails_the_change() {
    let store = InMemorySubscriptionStore::new();
    let notifier = RecordingNotifier::new();
    let sub = SubscriptionFactory::new()
        .with_user("u-1")
        .with_merchant("Spotify")
        .with_amount(119.0)
        .with_next_renewal(ts(2025, 1, 10))
        .created_at(ts(2025, 1, 1))
        .build();
    let id = sub.id;
    store.seed(vec![sub]);

    let engine = LifecycleEngine::new(
        store,
        FixedProbe::new(true),
        notifier.clone(),
        ConfigBuilder::new().build(),
    );

    engine
        .declare_intended_action(id, PendingAction::PauseNCycles, ts(2025, 1, 2))
        .await
        .unwrap();
    let outcome = engine
        .verify_pending_changes("u-1", ts(2025, 1, 14))
        .await
        .unwrap();
    assert_eq!(outcome.failed, vec![id]);

    // The record stays as it was, minus the pending change.
    let sub = engine.get(id, ts(2025, 1, 14)).await.unwrap();
    assert_eq!(sub.status, Status::Active);
    assert!(sub.pending_change.is_none());
    assert_eq!(sub.savings_lifetime, 0);

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0],
        LifecycleNotice::PendingChangeFailed { .. }
    ));
}

#[tokio::test]
async fn test_unavailable_probe_defers_without_touching_the_record() {
    let store = InMemorySubscriptionStore::new();
    let sub = SubscriptionFactory::new()
        .with_user("u-1")
        .with_next_renewal(ts(2025, 1, 10))
        .created_at(ts(2025, 1, 1))
        .build();
    let id = sub.id;
    store.seed(vec![sub]);

    let engine = LifecycleEngine::new(
        store,
        UnavailableProbe,
        RecordingNotifier::new(),
        ConfigBuilder::new().build(),
    );

    engine
        .declare_intended_action(id, PendingAction::Cancel, ts(2025, 1, 2))
        .await
        .unwrap();
    let outcome = engine
        .verify_pending_changes("u-1", ts(2025, 1, 14))
        .await
        .unwrap();
    assert_eq!(outcome.deferred, vec![id]);
    assert!(outcome.confirmed.is_empty());
    assert!(outcome.failed.is_empty());

    // Still pending, ready for the next sweep.
    let sub = engine.get(id, ts(2025, 1, 14)).await.unwrap();
    assert_eq!(sub.status, Status::Active);
    assert!(sub.pending_change.is_some());
}

#[tokio::test]
async fn test_sweep_handles_mixed_results_per_merchant() {
    let store = InMemorySubscriptionStore::new();
    let canceled_ok = SubscriptionFactory::new()
        .with_user("u-1")
        .with_merchant("Newsdesk")
        .with_amount(299.0)
        .with_next_renewal(ts(2025, 1, 10))
        .created_at(ts(2025, 1, 1))
        .build();
    let still_charging = SubscriptionFactory::new()
        .with_user("u-1")
        .with_merchant("Fitpass")
        .with_amount(999.0)
        .with_next_renewal(ts(2025, 1, 10))
        .created_at(ts(2025, 1, 2))
        .build();
    let (ok_id, charged_id) = (canceled_ok.id, still_charging.id);
    store.seed(vec![canceled_ok, still_charging]);

    let probe = ScriptedProbe::new()
        .with_answer("Newsdesk", false)
        .with_answer("Fitpass", true);
    let engine = LifecycleEngine::new(
        store,
        probe,
        RecordingNotifier::new(),
        ConfigBuilder::new().build(),
    );

    engine
        .declare_intended_action(ok_id, PendingAction::Cancel, ts(2025, 1, 3))
        .await
        .unwrap();
    engine
        .declare_intended_action(charged_id, PendingAction::Cancel, ts(2025, 1, 3))
        .await
        .unwrap();

    let outcome = engine
        .verify_pending_changes("u-1", ts(2025, 1, 14))
        .await
        .unwrap();
    assert_eq!(outcome.confirmed, vec![ok_id]);
    assert_eq!(outcome.failed, vec![charged_id]);

    assert_eq!(
        engine.get(ok_id, ts(2025, 1, 14)).await.unwrap().status,
        Status::Canceled
    );
    assert_eq!(
        engine.get(charged_id, ts(2025, 1, 14)).await.unwrap().status,
        Status::Active
    );
}

#[tokio::test]
async fn test_persistence_errors_propagate_unchanged() {
    let inner = InMemorySubscriptionStore::new();
    let sub = SubscriptionFactory::new().with_user("u-1").build();
    let id = sub.id;
    inner.seed(vec![sub]);
    let store = FailingSaveStore::new(inner);
    store.fail_saves(true);

    let engine = LifecycleEngine::new(
        store,
        FixedProbe::new(false),
        RecordingNotifier::new(),
        ConfigBuilder::new().build(),
    );

    let err = engine
        .transition_status(id, Status::Paused, ts(2025, 1, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, LeakLockError::Persistence(_)));

    let err = engine
        .declare_intended_action(id, PendingAction::Cancel, ts(2025, 1, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, LeakLockError::Persistence(_)));
}

#[tokio::test]
async fn test_savings_summary_counts_paused_months_and_renewals() {
    let store = InMemorySubscriptionStore::new();
    // 1499/year paused on 2024-11-05: two month boundaries crossed by
    // 2025-01-20 at ~125/month.
    let paused = SubscriptionFactory::new()
        .with_user("u-1")
        .with_merchant("Amazon Prime")
        .with_amount(1499.0)
        .with_cycle(Cycle::Yearly)
        .with_status(Status::Paused)
        .with_next_renewal(ts(2025, 11, 5))
        .created_at(ts(2024, 11, 5))
        .build();
    let active = SubscriptionFactory::new()
        .with_user("u-1")
        .with_merchant("Netflix")
        .with_amount(649.0)
        .with_next_renewal(ts(2025, 2, 3))
        .created_at(ts(2025, 1, 1))
        .build();
    store.seed(vec![paused, active]);

    let engine = LifecycleEngine::new(
        store,
        FixedProbe::new(false),
        RecordingNotifier::new(),
        ConfigBuilder::new().build(),
    );

    let summary = engine.savings_summary("u-1", ts(2025, 1, 20)).await.unwrap();
    assert_eq!(summary.plan_count, 2);
    assert_eq!(summary.active_count, 1);
    assert_eq!(summary.savings_lifetime, 250);
    // January is not the month the pause happened, so nothing this month.
    assert_eq!(summary.savings_month_to_date, 0);
    assert_eq!(summary.next_renewal, Some(ts(2025, 2, 3)));
}

#[tokio::test]
async fn test_renew_reactivates_and_advances_the_cycle() {
    let store = InMemorySubscriptionStore::new();
    let sub = SubscriptionFactory::new()
        .with_user("u-1")
        .with_status(Status::Canceled)
        .with_next_renewal(ts(2025, 1, 10))
        .created_at(ts(2025, 1, 1))
        .build();
    let id = sub.id;
    store.seed(vec![sub]);

    let engine = LifecycleEngine::new(
        store,
        FixedProbe::new(false),
        RecordingNotifier::new(),
        ConfigBuilder::new().build(),
    );

    let renewed = engine.renew(id, ts(2025, 1, 15)).await.unwrap();
    assert_eq!(renewed.status, Status::Active);
    assert_eq!(renewed.next_renewal, ts(2025, 2, 10));
    assert_eq!(renewed.last_payment_at, Some(ts(2025, 1, 15)));
}
