//! In-memory storage handler

use async_trait::async_trait;
use handover_core::effects::StorageEffects;
use handover_core::HandoverResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage handler.
///
/// Clones share the same map, which lets a test simulate a reload by building a
/// second coordinator over the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageHandler {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorageHandler {
    /// Create a new memory storage handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handler pre-populated with entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }
}

#[async_trait]
impl StorageEffects for MemoryStorageHandler {
    async fn retrieve(&self, key: &str) -> HandoverResult<Option<String>> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn store(&self, key: &str, value: String) -> HandoverResult<()> {
        let mut data = self.data.write().await;
        data.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> HandoverResult<bool> {
        let mut data = self.data.write().await;
        Ok(data.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_retrieve_remove() {
        let storage = MemoryStorageHandler::new();
        assert_eq!(storage.retrieve("k").await.unwrap(), None);

        storage.store("k", "v1".to_string()).await.unwrap();
        storage.store("k", "v2".to_string()).await.unwrap();
        assert_eq!(storage.retrieve("k").await.unwrap().as_deref(), Some("v2"));

        assert!(storage.remove("k").await.unwrap());
        assert!(!storage.remove("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let storage = MemoryStorageHandler::with_entries([("handover.build_hash", "abc")]);
        let reloaded = storage.clone();
        assert_eq!(
            reloaded.retrieve("handover.build_hash").await.unwrap().as_deref(),
            Some("abc")
        );
    }
}
