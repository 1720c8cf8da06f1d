//! LeakLock - a subscription lifecycle engine
//!
//! LeakLock tracks recurring subscriptions and, unlike a plain tracker,
//! verifies that a pause or cancellation actually took effect before
//! trusting it: a declared change is held as pending until billing
//! evidence from the grace window after the renewal date confirms or
//! refutes it. Evidence flowing the other way (charges that stop on a
//! supposedly active subscription, or land on a canceled one) is surfaced
//! to the user for confirmation rather than applied silently.
//!
//! # Features
//!
//! - **Lifecycle**: active/paused/canceled state machine with audit stamps
//! - **Verification**: grace-window sweeps against a pluggable billing probe
//! - **Detection**: evidence-based change surfacing with a single-prompt queue
//! - **Savings**: calendar-month accrual plus one-time averted charges
//! - **Assistant**: provider-specific cancellation/pause instructions
//! - **Testing**: in-memory store, scripted probes, and record factories
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use leaklock::{ConfigBuilder, LifecycleEngine, NoOpNotifier};
//! # use leaklock::probe::BillingEvidenceProbe;
//! # use leaklock::store::SubscriptionStore;
//! # async fn demo<S: SubscriptionStore, P: BillingEvidenceProbe>(store: S, probe: P) {
//! leaklock::init_tracing();
//!
//! let config = ConfigBuilder::new().from_env().build();
//! let engine = LifecycleEngine::new(store, probe, NoOpNotifier, config);
//!
//! let outcome = engine
//!     .verify_pending_changes("user-1", chrono::Utc::now())
//!     .await
//!     .unwrap();
//! println!("confirmed {} changes", outcome.confirmed.len());
//! # }
//! ```

pub mod assistant;
mod config;
pub mod detect;
mod engine;
mod error;
pub mod notify;
pub mod probe;
pub mod reminders;
pub mod store;
pub mod subscription;
#[cfg(any(test, feature = "test-store"))]
pub mod testing;
pub mod utils;

// Re-exports for public API
pub use assistant::{ActionGuide, ActionKind, AssistantClient, StaticAssistant};
pub use config::{ConfigBuilder, DetectionConfig, EngineConfig, LoggingConfig, VerificationConfig};
pub use detect::{DetectionQueue, Resolution};
pub use engine::{DetectedCandidate, LifecycleEngine, SweepOutcome};
pub use error::{LeakLockError, Result};
pub use notify::{LifecycleNotice, NoOpNotifier, Notifier, TracingNotifier};
pub use probe::BillingEvidenceProbe;
pub use reminders::{due_reminders, Reminder, ReminderKind, RenewalUrgency};
pub use store::SubscriptionStore;
pub use subscription::{
    migrate, Cycle, DetectedChange, EvidenceKind, PendingAction, PendingChange, RawSubscription,
    ReminderConfig, SavingEvent, Savings, SavingsSummary, Source, Status, Subscription,
    SubscriptionId,
};
#[cfg(any(test, feature = "test-store"))]
pub use testing::SubscriptionFactory;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main()
/// before creating the engine.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "leaklock=debug")
/// - `LEAKLOCK_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("LEAKLOCK_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &EngineConfig) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
