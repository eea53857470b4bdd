use super::{KvBackend, KvResult};
use crate::error::SessionStoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-process backend. Mirrors the remote store's per-value ceiling when one
/// is configured, so size-related behaviour can be exercised offline.
#[derive(Debug, Default)]
pub struct MemoryKvBackend {
    entries: RwLock<BTreeMap<String, String>>,
    max_value_len: Option<usize>,
}

impl MemoryKvBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_value_len(max_value_len: usize) -> Self {
        Self {
            entries: RwLock::default(),
            max_value_len: Some(max_value_len),
        }
    }

    /// Snapshot of every stored key, sorted.
    pub async fn keys_snapshot(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn glob_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl KvBackend for MemoryKvBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        if let Some(max) = self.max_value_len
            && value.len() > max
        {
            return Err(SessionStoreError::Backend {
                backend: self.name().to_string(),
                op: "SET".into(),
                message: format!("value of {} bytes exceeds limit of {max}", value.len()),
            });
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> KvResult<u64> {
        let mut entries = self.entries.write().await;
        Ok(keys.iter().filter(|k| entries.remove(*k).is_some()).count() as u64)
    }

    async fn exists(&self, keys: &[String]) -> KvResult<u64> {
        let entries = self.entries.read().await;
        Ok(keys.iter().filter(|k| entries.contains_key(*k)).count() as u64)
    }

    async fn keys(&self, pattern: &str) -> KvResult<Option<Vec<String>>> {
        let entries = self.entries.read().await;
        Ok(Some(
            entries
                .keys()
                .filter(|k| glob_matches(pattern, k))
                .cloned()
                .collect(),
        ))
    }

    async fn ping(&self) -> KvResult<()> {
        Ok(())
    }
}
