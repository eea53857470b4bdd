use super::archive;
use super::store::RemoteSessionStore;
use crate::error::SessionStoreError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Remote-auth strategy for the browser session: restores the profile
/// directory from the store at startup and backs it up on a timer.
///
/// The profile lives in `<data_dir>/RemoteAuth-<client_id>/`; archives pass
/// through `<data_dir>/RemoteAuth-<client_id>.zip` and are removed after use.
pub struct RemoteAuth {
    store: Arc<RemoteSessionStore>,
    client_id: String,
    data_dir: PathBuf,
    backup_interval: Duration,
}

impl RemoteAuth {
    pub fn new(
        store: Arc<RemoteSessionStore>,
        client_id: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        backup_interval: Duration,
    ) -> Self {
        Self {
            store,
            client_id: client_id.into(),
            data_dir: data_dir.into(),
            backup_interval: backup_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn store(&self) -> &RemoteSessionStore {
        &self.store
    }

    pub fn session_name(&self) -> String {
        format!("RemoteAuth-{}", self.client_id)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.zip", self.session_name()))
    }

    pub fn profile_dir(&self) -> PathBuf {
        self.data_dir.join(self.session_name())
    }

    /// Restore the profile directory. Any failure means "no session": the
    /// caller falls back to a fresh login.
    pub async fn restore(&self) -> bool {
        match self.try_restore().await {
            Ok(restored) => restored,
            Err(e) => {
                tracing::warn!(
                    session = %self.session_name(),
                    "session restore failed, starting without a saved login: {e}"
                );
                false
            }
        }
    }

    async fn try_restore(&self) -> Result<bool, SessionStoreError> {
        let session = self.session_name();
        if !self.store.exists(&session).await? {
            tracing::info!(session, "no saved session, a fresh login is required");
            return Ok(false);
        }

        let archive_path = self.archive_path();
        if !self.store.extract(&session, &archive_path).await?.is_restored() {
            return Ok(false);
        }

        let bytes = tokio::fs::read(&archive_path)
            .await
            .map_err(|e| SessionStoreError::serialization(&archive_path, e))?;
        let profile = self.profile_dir();
        let unpacked = tokio::task::spawn_blocking(move || archive::unpack_into(&bytes, &profile))
            .await
            .map_err(|e| SessionStoreError::serialization(&archive_path, e))??;

        self.discard_archive().await;
        tracing::info!(session, files = unpacked, "saved session unpacked");
        Ok(true)
    }

    /// Pack the profile directory and hand it to the store. Best effort.
    pub async fn backup_once(&self) {
        let session = self.session_name();
        let archive_path = self.archive_path();
        let profile = self.profile_dir();

        let packed = tokio::task::spawn_blocking(move || archive::pack_directory(&profile))
            .await
            .map_err(|e| SessionStoreError::serialization(self.profile_dir(), e))
            .and_then(|packed| packed);
        let bytes = match packed {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(session, "could not pack profile for backup: {e}");
                return;
            }
        };

        if let Err(e) = tokio::fs::write(&archive_path, &bytes).await {
            tracing::error!(session, "could not write {}: {e}", archive_path.display());
            return;
        }

        self.store.save(&session, &archive_path).await;
        self.discard_archive().await;
    }

    /// Back up every `backup_interval` until `cancel` fires. The first backup
    /// happens one interval after start.
    pub async fn run_backup_loop(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.backup_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => self.backup_once().await,
            }
        }
        tracing::debug!(session = %self.session_name(), "backup loop stopped");
    }

    /// Drop the remote copy and the local profile.
    pub async fn logout(&self) -> Result<(), SessionStoreError> {
        self.store.delete(&self.session_name()).await?;

        let profile = self.profile_dir();
        match tokio::fs::remove_dir_all(&profile).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionStoreError::serialization(&profile, e)),
        }
    }

    async fn discard_archive(&self) {
        let archive_path = self.archive_path();
        if let Err(e) = tokio::fs::remove_file(&archive_path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("could not remove {}: {e}", archive_path.display());
        }
    }
}
