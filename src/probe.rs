//! Billing-evidence probe seam.
//!
//! The signal source is an injected strategy so the engine stays
//! deterministic and testable: the sweep asks the probe whether a charge
//! landed in the grace window and treats an unavailable probe as
//! "inconclusive", never as confirmation or failure.

use async_trait::async_trait;

use crate::error::Result;
use crate::subscription::Subscription;

/// Answers "did a charge occur in the grace window?" for one subscription.
///
/// Implementations are bounded, best-effort calls (bank SMS scan, statement
/// API, ...). Return `Err(LeakLockError::ProbeUnavailable)` when the signal
/// source cannot answer; the engine reschedules verification for the next
/// sweep.
#[async_trait]
pub trait BillingEvidenceProbe: Send + Sync {
    async fn charge_occurred(&self, subscription: &Subscription) -> Result<bool>;
}

/// Probe implementations for testing.
#[cfg(any(test, feature = "test-store"))]
pub mod test {
    use super::*;
    use crate::error::LeakLockError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Probe returning a fixed answer, counting invocations.
    #[derive(Clone)]
    pub struct FixedProbe {
        answer: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FixedProbe {
        #[must_use]
        pub fn new(answer: bool) -> Self {
            Self {
                answer,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// How many times the probe was consulted.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BillingEvidenceProbe for FixedProbe {
        async fn charge_occurred(&self, _subscription: &Subscription) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    /// Probe that always fails, for exercising the inconclusive path.
    #[derive(Clone, Copy, Default)]
    pub struct UnavailableProbe;

    #[async_trait]
    impl BillingEvidenceProbe for UnavailableProbe {
        async fn charge_occurred(&self, _subscription: &Subscription) -> Result<bool> {
            Err(LeakLockError::probe_unavailable("signal source offline"))
        }
    }

    /// Probe answering per merchant name; unknown merchants report no
    /// charge.
    #[derive(Clone, Default)]
    pub struct ScriptedProbe {
        answers: HashMap<String, bool>,
    }

    impl ScriptedProbe {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_answer(mut self, merchant: impl Into<String>, charged: bool) -> Self {
            self.answers.insert(merchant.into(), charged);
            self
        }
    }

    #[async_trait]
    impl BillingEvidenceProbe for ScriptedProbe {
        async fn charge_occurred(&self, subscription: &Subscription) -> Result<bool> {
            Ok(self
                .answers
                .get(&subscription.merchant)
                .copied()
                .unwrap_or(false))
        }
    }
}
