pub mod memory;
pub mod retry;
pub mod upstash;

pub use memory::MemoryKvBackend;
pub use retry::RetryConfig;
pub use upstash::UpstashRestBackend;

use crate::error::SessionStoreError;
use async_trait::async_trait;

pub type KvResult<T> = Result<T, SessionStoreError>;

/// String-valued key-value backend with a per-value size ceiling.
#[async_trait]
pub trait KvBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Delete keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> KvResult<u64>;

    /// Count how many of `keys` exist without transferring their values.
    async fn exists(&self, keys: &[String]) -> KvResult<u64> {
        let mut found = 0;
        for key in keys {
            if self.get(key).await?.is_some() {
                found += 1;
            }
        }
        Ok(found)
    }

    /// List keys matching a glob pattern. `None` when the backend cannot list.
    async fn keys(&self, _pattern: &str) -> KvResult<Option<Vec<String>>> {
        Ok(None)
    }

    async fn ping(&self) -> KvResult<()>;
}
