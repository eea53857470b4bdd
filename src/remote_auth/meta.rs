use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_KEY_PREFIX: &str = "remoteauth";

/// Describes a chunked session: how many parts exist and how long their
/// concatenation is. Serialized as `{"parts":N,"totalLen":L,"ts":<epoch ms>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub parts: usize,
    #[serde(rename = "totalLen")]
    pub total_len: usize,
    #[serde(rename = "ts")]
    pub written_at_ms: i64,
}

impl MetaRecord {
    /// Stamp a new record with the current time.
    pub fn describe(total_len: usize, parts: usize) -> Self {
        Self {
            parts,
            total_len,
            written_at_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn written_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.written_at_ms).single()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Deterministic key layout for one session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    base: String,
}

impl SessionKeys {
    pub fn new(prefix: &str, session_id: &str) -> Self {
        Self {
            base: format!("{prefix}:{session_id}"),
        }
    }

    /// Key of the single unsegmented value.
    pub fn mono(&self) -> String {
        self.base.clone()
    }

    pub fn meta(&self) -> String {
        format!("{}:meta", self.base)
    }

    pub fn part(&self, index: usize) -> String {
        format!("{}:part:{index}", self.base)
    }

    /// Pattern matching every part key, for backends that can list keys.
    pub fn part_pattern(&self) -> String {
        format!("{}:part:*", self.base)
    }

    pub fn chunk_keys_for(&self, parts: usize) -> Vec<String> {
        (0..parts).map(|i| self.part(i)).collect()
    }
}
