//! `Storage` trait: keyed JSON record store behind conversation/user state.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;

/// Backend-agnostic key → JSON record store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the record stored under `key`.
    async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Insert or replace the record stored under `key`.
    async fn write(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError>;

    /// Remove the record under `key`. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-process storage. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        self.records
            .write()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.records.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read() {
        let storage = MemoryStorage::new();
        storage
            .write("test/users/u1", &serde_json::json!({"a": 1}))
            .await
            .unwrap();

        let value = storage.read("test/users/u1").await.unwrap().unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn read_missing_is_none() {
        let storage = MemoryStorage::new();
        assert!(storage.read("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_overwrites() {
        let storage = MemoryStorage::new();
        storage.write("k", &serde_json::json!({"v": 1})).await.unwrap();
        storage.write("k", &serde_json::json!({"v": 2})).await.unwrap();
        assert_eq!(storage.read("k").await.unwrap().unwrap()["v"], 2);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let storage = MemoryStorage::new();
        storage.write("k", &serde_json::json!({})).await.unwrap();
        assert!(storage.delete("k").await.unwrap());
        assert!(!storage.delete("k").await.unwrap());
        assert!(storage.is_empty().await);
    }
}
