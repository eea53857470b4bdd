use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `zaprelay`.
///
/// Library callers match on these to decide recovery strategy; application
/// glue (config loading, CLI dispatch) keeps using `anyhow::Result` for
/// ad-hoc context chains.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Remote session store ────────────────────────────────────────────
    #[error("session store: {0}")]
    SessionStore(#[from] SessionStoreError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Session store errors ───────────────────────────────────────────────────

/// Failures of the remote session store and its key-value backend.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Backend unreachable, timed out, throttled or returned a 5xx.
    /// Retryable with backoff.
    #[error("backend {backend} unreachable during {op}: {message}")]
    Connectivity {
        backend: String,
        op: String,
        message: String,
    },

    /// Stored chunks or metadata do not reassemble into a valid archive.
    /// The caller must discard the record and re-authenticate.
    #[error("corrupt session {session}: {reason}")]
    CorruptSession { session: String, reason: String },

    /// The local archive could not be read, packed or written.
    #[error("archive {path}: {message}")]
    Serialization { path: String, message: String },

    /// The backend rejected the configured credentials.
    #[error("backend {backend} rejected credentials (HTTP {status})")]
    Auth { backend: String, status: u16 },

    /// The backend answered with an error that is neither transient nor an
    /// auth failure, e.g. a value above its size ceiling.
    #[error("backend {backend} rejected {op}: {message}")]
    Backend {
        backend: String,
        op: String,
        message: String,
    },
}

impl SessionStoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    pub(crate) fn corrupt(session: &str, reason: impl Into<String>) -> Self {
        Self::CorruptSession {
            session: session.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn serialization(path: impl AsRef<std::path::Path>, err: impl ToString) -> Self {
        Self::Serialization {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, RelayError>;
