use crate::cli::commands::{Cli, Commands, SessionCommands};
use crate::config::Config;
use crate::remote_auth::{
    KvBackend, MemoryKvBackend, RemoteAuth, RemoteSessionStore, RestoreOutcome,
    UpstashRestBackend,
};
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::status::{render_session_state, render_status};

/// Build the configured backend. `in_memory` swaps in a process-local map.
pub fn build_backend(config: &Config, in_memory: bool) -> Result<Arc<dyn KvBackend>> {
    if in_memory {
        return Ok(Arc::new(MemoryKvBackend::new()));
    }

    let ra = &config.remote_auth;
    if ra.url.is_empty() || ra.token.is_empty() {
        bail!(
            "remote_auth.url and remote_auth.token must be set \
             (or UPSTASH_REDIS_REST_URL / UPSTASH_REDIS_REST_TOKEN)"
        );
    }
    Ok(Arc::new(UpstashRestBackend::new(
        &ra.url,
        &ra.token,
        config.request_timeout(),
        ra.retry.clone(),
    )))
}

/// Build the backend and check it answers before anything else runs.
pub async fn connect(config: &Config, in_memory: bool) -> Result<Arc<dyn KvBackend>> {
    let backend = build_backend(config, in_memory)?;
    backend
        .ping()
        .await
        .with_context(|| format!("backend {} did not answer PING", backend.name()))?;
    info!(backend = backend.name(), "connected to session backend");
    Ok(backend)
}

pub fn build_remote_auth(config: &Config, backend: Arc<dyn KvBackend>) -> RemoteAuth {
    let store = Arc::new(RemoteSessionStore::new(backend, config.store_options()));
    RemoteAuth::new(
        store,
        config.remote_auth.client_id.clone(),
        config.data_dir(),
        config.backup_interval(),
    )
}

/// Restore, then back up on a timer until `shutdown` resolves.
pub async fn run_until<F>(remote_auth: Arc<RemoteAuth>, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()>,
{
    if remote_auth.restore().await {
        info!(
            profile = %remote_auth.profile_dir().display(),
            "saved session restored"
        );
    } else {
        info!("no session restored, a QR login is needed");
    }

    let cancel = CancellationToken::new();
    let backup_loop = tokio::spawn({
        let remote_auth = Arc::clone(&remote_auth);
        let cancel = cancel.clone();
        async move { remote_auth.run_backup_loop(cancel).await }
    });

    shutdown.await;
    info!("shutting down");
    cancel.cancel();
    backup_loop.await.context("backup loop panicked")?;

    let failed = remote_auth.store().failed_saves();
    if failed > 0 {
        tracing::warn!(failed_saves = failed, "some backups failed during this run");
    }
    Ok(())
}

async fn run_session_command(
    config: &Config,
    remote_auth: &RemoteAuth,
    command: SessionCommands,
) -> Result<()> {
    let store = remote_auth.store();
    let default_id = remote_auth.session_name();

    match command {
        SessionCommands::Status { id } => {
            let id = id.unwrap_or(default_id);
            let state = store.inspect(&id).await?;
            println!("{}", render_session_state(&id, &state));
            Ok(())
        }

        SessionCommands::Save { id, archive } => {
            let id = id.unwrap_or(default_id);
            if !archive.is_file() {
                bail!("archive {} does not exist", archive.display());
            }
            let report = store.try_save(&id, &archive).await?;
            println!(
                "Saved {id}: {} mode, {} part(s), {} encoded chars, {} junk entries dropped",
                report.mode, report.parts, report.total_len, report.dropped_entries
            );
            Ok(())
        }

        SessionCommands::Restore { id, out } => {
            let id = id.unwrap_or(default_id);
            let out = out.unwrap_or_else(|| config.data_dir().join(format!("{id}.zip")));
            match store.extract(&id, &out).await? {
                RestoreOutcome::Restored { mode, bytes } => {
                    println!("Restored {id} ({mode}, {bytes} bytes) to {}", out.display());
                }
                RestoreOutcome::Absent => println!("No stored session for {id}"),
            }
            Ok(())
        }

        SessionCommands::Delete { id } => {
            let id = id.unwrap_or(default_id);
            store.delete(&id).await?;
            println!("Deleted {id}");
            Ok(())
        }
    }
}

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command {
        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }

        Commands::Ping => {
            let backend = connect(&config, cli.memory).await?;
            println!("{} is reachable", backend.name());
            Ok(())
        }

        Commands::Run => {
            let backend = connect(&config, cli.memory).await?;
            let remote_auth = Arc::new(build_remote_auth(&config, backend));
            run_until(remote_auth, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("could not listen for Ctrl-C: {e}");
                }
            })
            .await
        }

        Commands::Session { session_command } => {
            let backend = connect(&config, cli.memory).await?;
            let remote_auth = build_remote_auth(&config, backend);
            run_session_command(&config, &remote_auth, session_command).await
        }

        Commands::Logout => {
            let backend = connect(&config, cli.memory).await?;
            let remote_auth = build_remote_auth(&config, backend);
            remote_auth.logout().await?;
            println!(
                "Logged out {}; removed {}",
                remote_auth.session_name(),
                remote_auth.profile_dir().display()
            );
            Ok(())
        }
    }
}

/// Config from `--config` when given, else `~/.zaprelay/config.toml`.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load_or_init(),
    }
}
