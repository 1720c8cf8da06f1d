//! Storage trait for subscription records.
//!
//! Implement this trait to persist subscriptions to your database. The
//! engine treats the store as the sole source of truth and never caches
//! records across invocations. An in-memory implementation is provided for
//! testing.

use async_trait::async_trait;

use crate::error::Result;
use crate::subscription::{Subscription, SubscriptionId};

/// Trait for persisting subscription records.
///
/// Implementations should run [`crate::subscription::migrate`] when loading
/// records written by older schema versions; the engine assumes every
/// record it receives is current.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// All subscriptions belonging to a user.
    async fn list(&self, user_id: &str) -> Result<Vec<Subscription>>;

    /// Fetch a single subscription.
    async fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>>;

    /// Insert or update a record.
    async fn save(&self, subscription: &Subscription) -> Result<()>;

    /// Delete a record. Deleting a missing record is not an error.
    async fn delete(&self, id: SubscriptionId) -> Result<()>;
}

/// In-memory subscription store for testing.
#[cfg(any(test, feature = "test-store"))]
pub mod test {
    use super::*;
    use crate::error::LeakLockError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, RwLock};

    /// In-memory subscription store for testing.
    ///
    /// Wraps data in Arc for cheap cloning.
    #[derive(Default, Clone)]
    pub struct InMemorySubscriptionStore {
        inner: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
    }

    impl InMemorySubscriptionStore {
        /// Create a new in-memory store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed records for testing.
        pub fn seed(&self, subs: Vec<Subscription>) {
            let mut map = self.inner.write().unwrap();
            for sub in subs {
                map.insert(sub.id, sub);
            }
        }

        /// Number of stored records (for testing).
        pub fn len(&self) -> usize {
            self.inner.read().unwrap().len()
        }

        /// Whether the store is empty (for testing).
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl SubscriptionStore for InMemorySubscriptionStore {
        async fn list(&self, user_id: &str) -> Result<Vec<Subscription>> {
            let map = self.inner.read().unwrap();
            let mut subs: Vec<Subscription> = map
                .values()
                .filter(|s| s.user_id == user_id)
                .cloned()
                .collect();
            subs.sort_by_key(|s| s.created_at);
            Ok(subs)
        }

        async fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
            Ok(self.inner.read().unwrap().get(&id).cloned())
        }

        async fn save(&self, subscription: &Subscription) -> Result<()> {
            self.inner
                .write()
                .unwrap()
                .insert(subscription.id, subscription.clone());
            Ok(())
        }

        async fn delete(&self, id: SubscriptionId) -> Result<()> {
            self.inner.write().unwrap().remove(&id);
            Ok(())
        }
    }

    /// Store wrapper whose writes can be made to fail, for exercising
    /// persistence-error propagation.
    #[derive(Clone)]
    pub struct FailingSaveStore {
        inner: InMemorySubscriptionStore,
        fail_saves: Arc<AtomicBool>,
    }

    impl FailingSaveStore {
        #[must_use]
        pub fn new(inner: InMemorySubscriptionStore) -> Self {
            Self {
                inner,
                fail_saves: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn fail_saves(&self, enabled: bool) {
            self.fail_saves.store(enabled, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SubscriptionStore for FailingSaveStore {
        async fn list(&self, user_id: &str) -> Result<Vec<Subscription>> {
            self.inner.list(user_id).await
        }

        async fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
            self.inner.get(id).await
        }

        async fn save(&self, subscription: &Subscription) -> Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(LeakLockError::persistence("save failed"));
            }
            self.inner.save(subscription).await
        }

        async fn delete(&self, id: SubscriptionId) -> Result<()> {
            self.inner.delete(id).await
        }
    }
}
