use std::sync::{LazyLock, Mutex, MutexGuard};

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Every override variable `apply_env_overrides` reads.
pub(super) const OVERRIDE_VARS: &[&str] = &[
    "ZAPRELAY_KV_URL",
    "UPSTASH_REDIS_REST_URL",
    "ZAPRELAY_KV_TOKEN",
    "UPSTASH_REDIS_REST_TOKEN",
    "ZAPRELAY_CLIENT_ID",
    "REMOTEAUTH_CLIENT_ID",
    "ZAPRELAY_MAX_CHUNK_CHARS",
    "REMOTEAUTH_MAX_CHUNK_CHARS",
    "ZAPRELAY_BACKUP_EVERY_MS",
    "BACKUP_EVERY_MS",
    "ZAPRELAY_LOG_LEVEL",
];

/// Holds the process-wide env lock with every override variable cleared.
/// Variables are restored when the scope drops.
pub(super) struct CleanEnv {
    guards: Vec<EnvVarGuard>,
    _lock: MutexGuard<'static, ()>,
}

impl CleanEnv {
    pub(super) fn acquire() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let guards = OVERRIDE_VARS.iter().map(|&k| EnvVarGuard::unset(k)).collect();
        Self {
            guards,
            _lock: lock,
        }
    }

    pub(super) fn set(&mut self, key: &'static str, value: &str) {
        self.guards.push(EnvVarGuard::set(key, value));
    }
}

impl Drop for CleanEnv {
    fn drop(&mut self) {
        // restore in reverse so the oldest saved value wins
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &str) -> Self {
        let previous = std::env::var(key).ok();
        // SAFETY: only called while ENV_LOCK is held.
        unsafe {
            std::env::set_var(key, value);
        }
        Self { key, previous }
    }

    fn unset(key: &'static str) -> Self {
        let previous = std::env::var(key).ok();
        // SAFETY: only called while ENV_LOCK is held.
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: guards live inside CleanEnv, which still holds ENV_LOCK.
        unsafe {
            match &self.previous {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }
}
