use crate::*;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Push subscriptions reported by pages, keyed by endpoint
#[derive(Clone, Default)]
pub struct SubscriptionStore(Arc<RwLock<HashMap<String, PushSubscription>>>);

impl SubscriptionStore {
    /// Stores or refreshes the subscription, returns whether its endpoint was unknown
    pub async fn upsert(&self, subscription: PushSubscription) -> Result<bool> {
        let endpoint = subscription
            .endpoint()
            .ok_or(Error::MissingEndpoint)?
            .to_owned();
        let previous = self.0.write().await.insert(endpoint, subscription);
        Ok(previous.is_none())
    }

    pub async fn get(&self, endpoint: &str) -> Option<PushSubscription> {
        self.0.read().await.get(endpoint).cloned()
    }

    pub async fn remove(&self, endpoint: &str) -> Option<PushSubscription> {
        self.0.write().await.remove(endpoint)
    }

    pub async fn all(&self) -> Vec<PushSubscription> {
        self.0.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.0.read().await.len()
    }
}
