//! Durable key/value storage interface
//!
//! Holds the only state that survives a reload: the last confirmed build hash
//! and the unverified-activation counter.

use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable string storage (localStorage-like)
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Read a value
    async fn retrieve(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn store(&self, key: &str, value: String) -> Result<()>;

    /// Delete a value, returning whether it existed
    async fn remove(&self, key: &str) -> Result<bool>;
}

/// Blanket implementation for Arc<T> where T: StorageEffects
#[async_trait]
impl<T: StorageEffects + ?Sized> StorageEffects for Arc<T> {
    async fn retrieve(&self, key: &str) -> Result<Option<String>> {
        (**self).retrieve(key).await
    }

    async fn store(&self, key: &str, value: String) -> Result<()> {
        (**self).store(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key).await
    }
}
