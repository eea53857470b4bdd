//! Junk filtering for browser-profile archives.
//!
//! A profile archive carries a lot of regenerable browser state (caches,
//! service-worker storage, quota bookkeeping). Dropping it before upload keeps
//! the encoded blob well under the backend's per-value ceiling. Restoring a
//! login never depends on any of these directories.

use super::archive::ArchiveEntry;
use serde::{Deserialize, Serialize};

/// Directories that are safe to drop, relative to the profile root. Each one
/// is matched both at the root and under the `Default/` profile directory.
const JUNK_DIRS: &[&str] = &[
    "IndexedDB/",
    "Service Worker/",
    "Cache/",
    "GPUCache/",
    "Code Cache/",
    "databases/",
    "Storage/",
    "QuotaManager/",
    "DawnCache/",
    "GrShaderCache/",
];

const PROFILE_DIR: &str = "Default/";

/// A case-sensitive path-prefix rule identifying archive entries that can be
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunkPattern(String);

impl JunkPattern {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(normalize_path(&prefix.into()))
    }

    pub fn prefix(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, path: &str) -> bool {
        !self.0.is_empty() && normalize_path(path).starts_with(&self.0)
    }
}

/// The reviewed default pattern set.
pub fn default_junk_patterns() -> Vec<JunkPattern> {
    JUNK_DIRS
        .iter()
        .flat_map(|dir| {
            [
                JunkPattern::new(*dir),
                JunkPattern::new(format!("{PROFILE_DIR}{dir}")),
            ]
        })
        .collect()
}

/// Normalize an archive path: forward slashes, no leading `./` or `/`.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut rest = unified.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.to_string()
}

pub fn is_junk(path: &str, patterns: &[JunkPattern]) -> bool {
    patterns.iter().any(|p| p.matches(path))
}

/// Keep every entry that matches no pattern, in input order.
pub fn filter(entries: Vec<ArchiveEntry>, patterns: &[JunkPattern]) -> Vec<ArchiveEntry> {
    if patterns.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| !is_junk(&entry.path, patterns))
        .collect()
}
