use crate::remote_auth::RetryConfig;
use crate::remote_auth::store::{DEFAULT_FETCH_CONCURRENCY, DEFAULT_MAX_CHUNK_CHARS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Smallest accepted backup period.
pub const MIN_BACKUP_INTERVAL_MS: u64 = 60_000;

/// Per-value ceiling of the backend; chunks must fit under it.
pub const BACKEND_VALUE_CEILING: usize = 10 * 1024 * 1024;

#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteAuthConfig {
    /// REST endpoint of the key-value database, e.g. `https://xyz.upstash.io`.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "default_backup_interval_ms")]
    pub backup_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Strip browser caches from the archive before upload.
    #[serde(default = "default_true")]
    pub junk_filter: bool,
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// Where the session archive and profile directory live.
    /// Defaults to `~/.zaprelay/sessions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_client_id() -> String {
    "anderson-bot".into()
}

fn default_key_prefix() -> String {
    crate::remote_auth::meta::DEFAULT_KEY_PREFIX.into()
}

fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHUNK_CHARS
}

fn default_backup_interval_ms() -> u64 {
    600_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_fetch_concurrency() -> usize {
    DEFAULT_FETCH_CONCURRENCY
}

impl Default for RemoteAuthConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            client_id: default_client_id(),
            key_prefix: default_key_prefix(),
            max_chunk_chars: default_max_chunk_chars(),
            backup_interval_ms: default_backup_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            junk_filter: default_true(),
            fetch_concurrency: default_fetch_concurrency(),
            data_dir: None,
            retry: RetryConfig::default(),
        }
    }
}

impl fmt::Debug for RemoteAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteAuthConfig")
            .field("url", &self.url)
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("client_id", &self.client_id)
            .field("key_prefix", &self.key_prefix)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("backup_interval_ms", &self.backup_interval_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("junk_filter", &self.junk_filter)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("data_dir", &self.data_dir)
            .field("retry", &self.retry)
            .finish()
    }
}
