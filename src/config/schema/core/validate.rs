use super::super::remote_auth::{BACKEND_VALUE_CEILING, MIN_BACKUP_INTERVAL_MS};
use super::Config;
use crate::error::ConfigError;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ra = &self.remote_auth;

        if ra.max_chunk_chars == 0 || ra.max_chunk_chars > BACKEND_VALUE_CEILING {
            return Err(ConfigError::Validation(format!(
                "remote_auth.max_chunk_chars must be between 1 and {BACKEND_VALUE_CEILING}, got {}",
                ra.max_chunk_chars
            )));
        }

        if ra.backup_interval_ms < MIN_BACKUP_INTERVAL_MS {
            return Err(ConfigError::Validation(format!(
                "remote_auth.backup_interval_ms must be at least {MIN_BACKUP_INTERVAL_MS}, got {}",
                ra.backup_interval_ms
            )));
        }

        if ra.fetch_concurrency == 0 {
            return Err(ConfigError::Validation(
                "remote_auth.fetch_concurrency must be at least 1".into(),
            ));
        }

        if ra.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote_auth.request_timeout_secs must be at least 1".into(),
            ));
        }

        if !ra.url.is_empty() {
            let parsed = url::Url::parse(&ra.url).map_err(|e| {
                ConfigError::Validation(format!("remote_auth.url is not a valid URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(format!(
                    "remote_auth.url must use http or https, got {}",
                    parsed.scheme()
                )));
            }
        }

        if ra.client_id.is_empty()
            || !ra
                .client_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "remote_auth.client_id must be non-empty and use only [A-Za-z0-9_-], got {:?}",
                ra.client_id
            )));
        }

        if ra.key_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "remote_auth.key_prefix must not be empty".into(),
            ));
        }

        Ok(())
    }
}
