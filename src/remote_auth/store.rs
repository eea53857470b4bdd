use super::archive;
use super::chunker;
use super::junk::{JunkPattern, default_junk_patterns};
use super::kv::KvBackend;
use super::meta::{DEFAULT_KEY_PREFIX, MetaRecord, SessionKeys};
use crate::error::SessionStoreError;
use futures_util::{StreamExt, TryStreamExt, stream};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// 9 MiB: 90% of the backend's 10 MiB per-value ceiling.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 9 * 1024 * 1024;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

type StoreResult<T> = Result<T, SessionStoreError>;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key_prefix: String,
    pub max_chunk_chars: usize,
    /// Empty disables filtering; archives are then stored verbatim.
    pub junk_patterns: Vec<JunkPattern>,
    pub fetch_concurrency: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.into(),
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            junk_patterns: default_junk_patterns(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StorageMode {
    Mono,
    Chunked,
}

/// Persisted state of one session id, as seen through backend reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Mono,
    Chunked(MetaRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub mode: StorageMode,
    pub parts: usize,
    pub total_len: usize,
    /// Part keys of the previous record that were removed.
    pub retired_parts: usize,
    /// Archive entries dropped by the junk filter.
    pub dropped_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { mode: StorageMode, bytes: usize },
    Absent,
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored { .. })
    }
}

/// Saves, restores and deletes one session archive per id against a
/// size-limited key-value backend.
///
/// A small archive is stored as a single value under the mono key. A large
/// one is split into part keys followed by a metadata record. Writes go
/// delete-old-state first, metadata last, so a reader that finds metadata can
/// rely on every part it names being present. Saves for the same id are
/// serialized; `extract` must not race a save for the same id.
pub struct RemoteSessionStore {
    backend: Arc<dyn KvBackend>,
    options: StoreOptions,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    failed_saves: AtomicU64,
}

impl RemoteSessionStore {
    pub fn new(backend: Arc<dyn KvBackend>, options: StoreOptions) -> Self {
        Self {
            backend,
            options,
            write_locks: Mutex::new(HashMap::new()),
            failed_saves: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &dyn KvBackend {
        self.backend.as_ref()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn keys(&self, session: &str) -> SessionKeys {
        SessionKeys::new(&self.options.key_prefix, session)
    }

    /// Number of `save` calls that failed since this store was created.
    pub fn failed_saves(&self) -> u64 {
        self.failed_saves.load(Ordering::Relaxed)
    }

    async fn write_lock(&self, session: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().await;
        Arc::clone(locks.entry(session.to_string()).or_default())
    }

    /// Forget the lock for `session` once no other caller holds or waits on it.
    async fn release_write_lock(&self, session: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.write_locks.lock().await;
        drop(lock);
        if locks
            .get(session)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(session);
        }
    }

    #[cfg(test)]
    pub(super) async fn tracked_locks(&self) -> usize {
        self.write_locks.lock().await.len()
    }

    /// True when either a mono value or a metadata record exists.
    pub async fn exists(&self, session: &str) -> StoreResult<bool> {
        let keys = self.keys(session);
        let found = self.backend.exists(&[keys.mono(), keys.meta()]).await?;
        Ok(found > 0)
    }

    pub async fn inspect(&self, session: &str) -> StoreResult<SessionState> {
        let keys = self.keys(session);
        if let Some(raw) = self.backend.get(&keys.meta()).await? {
            let meta = MetaRecord::from_json(&raw)
                .map_err(|e| SessionStoreError::corrupt(session, format!("unreadable metadata: {e}")))?;
            return Ok(SessionState::Chunked(meta));
        }
        if self.backend.exists(&[keys.mono()]).await? > 0 {
            return Ok(SessionState::Mono);
        }
        Ok(SessionState::Absent)
    }

    /// Best-effort backup: failures are logged and counted, never raised.
    pub async fn save(&self, session: &str, archive_path: &Path) {
        match self.try_save(session, archive_path).await {
            Ok(report) => tracing::info!(
                session,
                mode = %report.mode,
                parts = report.parts,
                total_len = report.total_len,
                dropped_entries = report.dropped_entries,
                "session backed up"
            ),
            Err(e) => {
                self.failed_saves.fetch_add(1, Ordering::Relaxed);
                tracing::error!(session, "session backup failed, remote copy not updated: {e}");
            }
        }
    }

    /// Replace the stored archive for `session` with the one at
    /// `archive_path`.
    pub async fn try_save(&self, session: &str, archive_path: &Path) -> StoreResult<SaveReport> {
        let lock = self.write_lock(session).await;
        let result = {
            let _guard = lock.lock().await;
            self.save_locked(session, archive_path).await
        };
        self.release_write_lock(session, lock).await;
        result
    }

    async fn save_locked(&self, session: &str, archive_path: &Path) -> StoreResult<SaveReport> {
        let (blob, dropped_entries) = self.load_blob(archive_path).await?;
        let encoded = chunker::encode_and_split(&blob, self.options.max_chunk_chars);
        drop(blob);

        let keys = self.keys(session);
        let retired_parts = self.clear(session, &keys).await?;

        if encoded.total_len < self.options.max_chunk_chars {
            let value = encoded.chunks.first().map_or("", String::as_str);
            self.backend.set(&keys.mono(), value).await?;
            return Ok(SaveReport {
                mode: StorageMode::Mono,
                parts: 1,
                total_len: encoded.total_len,
                retired_parts,
                dropped_entries,
            });
        }

        for (index, chunk) in encoded.chunks.iter().enumerate() {
            if let Err(e) = self.backend.set(&keys.part(index), chunk).await {
                self.discard_parts(session, &keys.chunk_keys_for(index)).await;
                return Err(e);
            }
        }
        let meta = MetaRecord::describe(encoded.total_len, encoded.parts());
        if let Err(e) = self.backend.set(&keys.meta(), &meta.to_json()).await {
            self.discard_parts(session, &keys.chunk_keys_for(meta.parts)).await;
            return Err(e);
        }

        Ok(SaveReport {
            mode: StorageMode::Chunked,
            parts: meta.parts,
            total_len: meta.total_len,
            retired_parts,
            dropped_entries,
        })
    }

    /// Reassemble the stored archive and write it to `destination`.
    pub async fn extract(&self, session: &str, destination: &Path) -> StoreResult<RestoreOutcome> {
        let keys = self.keys(session);

        let (mode, encoded_chunks) = if let Some(raw) = self.backend.get(&keys.meta()).await? {
            let meta = MetaRecord::from_json(&raw)
                .map_err(|e| SessionStoreError::corrupt(session, format!("unreadable metadata: {e}")))?;
            (StorageMode::Chunked, self.fetch_chunks(session, &keys, &meta).await?)
        } else if let Some(mono) = self.backend.get(&keys.mono()).await? {
            (StorageMode::Mono, vec![mono])
        } else {
            return Ok(RestoreOutcome::Absent);
        };

        let blob = chunker::join_and_decode(&encoded_chunks)
            .map_err(|e| SessionStoreError::corrupt(session, format!("archive does not decode: {e}")))?;
        drop(encoded_chunks);

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SessionStoreError::serialization(parent, e))?;
        }
        tokio::fs::write(destination, &blob)
            .await
            .map_err(|e| SessionStoreError::serialization(destination, e))?;

        tracing::info!(session, %mode, bytes = blob.len(), "session restored");
        Ok(RestoreOutcome::Restored {
            mode,
            bytes: blob.len(),
        })
    }

    /// Remove every trace of `session`. Deleting an absent session is a no-op.
    pub async fn delete(&self, session: &str) -> StoreResult<()> {
        let lock = self.write_lock(session).await;
        let result = {
            let _guard = lock.lock().await;
            self.clear(session, &self.keys(session)).await
        };
        self.release_write_lock(session, lock).await;

        let retired = result?;
        tracing::info!(session, retired_parts = retired, "session deleted");
        Ok(())
    }

    /// Best-effort removal of parts written by a save that failed before
    /// publishing metadata.
    async fn discard_parts(&self, session: &str, part_keys: &[String]) {
        if part_keys.is_empty() {
            return;
        }
        if let Err(e) = self.backend.del(part_keys).await {
            tracing::warn!(
                session,
                parts = part_keys.len(),
                "could not remove parts of a failed save: {e}"
            );
        }
    }

    async fn load_blob(&self, archive_path: &Path) -> StoreResult<(Vec<u8>, usize)> {
        if self.options.junk_patterns.is_empty() {
            let bytes = tokio::fs::read(archive_path)
                .await
                .map_err(|e| SessionStoreError::serialization(archive_path, e))?;
            return Ok((bytes, 0));
        }

        let path = archive_path.to_path_buf();
        let patterns = self.options.junk_patterns.clone();
        let filtered = tokio::task::spawn_blocking(move || {
            archive::repack_without_junk(&path, &patterns)
        })
        .await
        .map_err(|e| SessionStoreError::serialization(archive_path, e))??;

        Ok((filtered.bytes, filtered.dropped))
    }

    async fn fetch_chunks(
        &self,
        session: &str,
        keys: &SessionKeys,
        meta: &MetaRecord,
    ) -> StoreResult<Vec<String>> {
        if meta.parts == 0 {
            return Err(SessionStoreError::corrupt(session, "metadata names zero parts"));
        }

        let fetched: Vec<Option<String>> = stream::iter(keys.chunk_keys_for(meta.parts))
            .map(|key| async move { self.backend.get(&key).await })
            .buffered(self.options.fetch_concurrency.max(1))
            .try_collect()
            .await?;

        let mut chunks = Vec::with_capacity(meta.parts);
        for (index, chunk) in fetched.into_iter().enumerate() {
            let Some(chunk) = chunk else {
                return Err(SessionStoreError::corrupt(
                    session,
                    format!("missing chunk {index}/{}", meta.parts),
                ));
            };
            chunks.push(chunk);
        }

        let joined_len: usize = chunks.iter().map(String::len).sum();
        if joined_len != meta.total_len {
            return Err(SessionStoreError::corrupt(
                session,
                format!(
                    "chunks hold {joined_len} chars, metadata expects {}",
                    meta.total_len
                ),
            ));
        }

        Ok(chunks)
    }

    /// Delete part keys, then the metadata key, then the mono key. Returns the
    /// number of part keys retired.
    ///
    /// Without metadata, parts left behind by an interrupted save are found by
    /// listing when the backend supports it.
    async fn clear(&self, session: &str, keys: &SessionKeys) -> StoreResult<usize> {
        let raw_meta = self.backend.get(&keys.meta()).await?;

        let part_keys = match raw_meta.as_deref().map(MetaRecord::from_json) {
            Some(Ok(meta)) => keys.chunk_keys_for(meta.parts),
            Some(Err(e)) => {
                tracing::warn!(session, "unreadable metadata ({e}), listing part keys instead");
                self.backend
                    .keys(&keys.part_pattern())
                    .await?
                    .unwrap_or_else(|| {
                        tracing::warn!(
                            session,
                            "backend {} cannot list keys; old parts may be orphaned",
                            self.backend.name()
                        );
                        Vec::new()
                    })
            }
            None => {
                let stray = self
                    .backend
                    .keys(&keys.part_pattern())
                    .await?
                    .unwrap_or_default();
                if !stray.is_empty() {
                    tracing::warn!(session, parts = stray.len(), "removing parts with no metadata");
                }
                stray
            }
        };

        if !part_keys.is_empty() {
            self.backend.del(&part_keys).await?;
        }
        if raw_meta.is_some() {
            self.backend.del(&[keys.meta()]).await?;
        }
        self.backend.del(&[keys.mono()]).await?;
        Ok(part_keys.len())
    }
}
