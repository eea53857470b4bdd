use super::super::{ObservabilityConfig, RemoteAuthConfig};
use crate::remote_auth::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// State directory (`~/.zaprelay`) - computed from home, not serialized
    #[serde(skip)]
    pub state_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub remote_auth: RemoteAuthConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Directory holding the session archive and the unpacked profile.
    pub fn data_dir(&self) -> PathBuf {
        self.remote_auth
            .data_dir
            .clone()
            .unwrap_or_else(|| self.state_dir.join("sessions"))
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_millis(self.remote_auth.backup_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_auth.request_timeout_secs)
    }

    pub fn store_options(&self) -> StoreOptions {
        let defaults = StoreOptions::default();
        StoreOptions {
            key_prefix: self.remote_auth.key_prefix.clone(),
            max_chunk_chars: self.remote_auth.max_chunk_chars,
            junk_patterns: if self.remote_auth.junk_filter {
                defaults.junk_patterns
            } else {
                Vec::new()
            },
            fetch_concurrency: self.remote_auth.fetch_concurrency,
        }
    }
}
