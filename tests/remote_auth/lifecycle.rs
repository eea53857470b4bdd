use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use zaprelay::remote_auth::{
    KvBackend, MemoryKvBackend, RemoteAuth, RemoteSessionStore, StoreOptions,
};

use crate::fake_upstash;

fn remote_auth(backend: Arc<dyn KvBackend>, data_dir: &Path, every: Duration) -> RemoteAuth {
    let store = Arc::new(RemoteSessionStore::new(backend, StoreOptions::default()));
    RemoteAuth::new(store, "bot", data_dir, every)
}

fn seed_profile(profile: &Path) {
    let files: [(&str, &[u8]); 5] = [
        ("Default/Cookies", b"cookie-jar"),
        ("Default/Local Storage/leveldb/000003.log", b"wa-keys"),
        ("Default/Cache/Cache_Data/data_0", &[7u8; 4096]),
        ("Default/IndexedDB/https_web.whatsapp.com_0.indexeddb.leveldb/LOG", b"idb"),
        ("Local State", b"{}"),
    ];
    for (rel, data) in files {
        let path = profile.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }
}

#[tokio::test]
async fn backup_then_restore_on_a_fresh_machine() {
    let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new());

    let first = TempDir::new().unwrap();
    let old_host = remote_auth(Arc::clone(&backend), first.path(), Duration::from_secs(60));
    seed_profile(&old_host.profile_dir());
    old_host.backup_once().await;

    assert!(old_host.store().exists("RemoteAuth-bot").await.unwrap());
    assert!(!old_host.archive_path().exists());

    let second = TempDir::new().unwrap();
    let new_host = remote_auth(backend, second.path(), Duration::from_secs(60));
    assert!(new_host.restore().await);

    let profile = new_host.profile_dir();
    assert_eq!(fs::read(profile.join("Default/Cookies")).unwrap(), b"cookie-jar");
    assert_eq!(
        fs::read(profile.join("Default/Local Storage/leveldb/000003.log")).unwrap(),
        b"wa-keys"
    );
    assert!(profile.join("Local State").exists());
    assert!(!profile.join("Default/Cache").exists());
    assert!(!profile.join("Default/IndexedDB").exists());
    assert!(!new_host.archive_path().exists());
}

#[tokio::test]
async fn restore_without_saved_session_is_a_fresh_login() {
    let tmp = TempDir::new().unwrap();
    let auth = remote_auth(
        Arc::new(MemoryKvBackend::new()),
        tmp.path(),
        Duration::from_secs(60),
    );
    assert!(!auth.restore().await);
    assert!(!auth.profile_dir().exists());
}

#[tokio::test]
async fn corrupt_session_is_treated_as_no_session() {
    let tmp = TempDir::new().unwrap();
    let backend = Arc::new(MemoryKvBackend::new());
    backend
        .set("remoteauth:RemoteAuth-bot:meta", r#"{"parts":3,"totalLen":12,"ts":0}"#)
        .await
        .unwrap();

    let auth = remote_auth(backend, tmp.path(), Duration::from_secs(60));
    assert!(!auth.restore().await);
    assert!(!auth.archive_path().exists());
}

#[tokio::test]
async fn backup_without_profile_is_logged_not_raised() {
    let tmp = TempDir::new().unwrap();
    let auth = remote_auth(
        Arc::new(MemoryKvBackend::new()),
        tmp.path(),
        Duration::from_secs(60),
    );
    auth.backup_once().await;
    assert!(!auth.store().exists("RemoteAuth-bot").await.unwrap());
}

#[tokio::test]
async fn logout_clears_remote_and_local_state() {
    let tmp = TempDir::new().unwrap();
    let backend = Arc::new(MemoryKvBackend::new());
    let auth = remote_auth(backend.clone(), tmp.path(), Duration::from_secs(60));
    seed_profile(&auth.profile_dir());
    auth.backup_once().await;
    assert!(!backend.is_empty().await);

    auth.logout().await.unwrap();
    assert!(backend.is_empty().await);
    assert!(!auth.profile_dir().exists());

    // nothing left to remove
    auth.logout().await.unwrap();
}

#[tokio::test]
async fn backup_loop_saves_until_cancelled() {
    let tmp = TempDir::new().unwrap();
    let auth = Arc::new(remote_auth(
        Arc::new(MemoryKvBackend::new()),
        tmp.path(),
        Duration::from_millis(40),
    ));
    seed_profile(&auth.profile_dir());

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let auth = Arc::clone(&auth);
        let cancel = cancel.clone();
        async move { auth.run_backup_loop(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("backup loop did not stop")
        .unwrap();

    assert!(auth.store().exists("RemoteAuth-bot").await.unwrap());
    assert_eq!(auth.store().failed_saves(), 0);
}

#[tokio::test]
async fn session_moves_between_hosts_over_rest() {
    let (server, fake) = fake_upstash::start().await;

    let first = TempDir::new().unwrap();
    let old_host = remote_auth(
        Arc::new(fake_upstash::client(&server)),
        first.path(),
        Duration::from_secs(60),
    );
    seed_profile(&old_host.profile_dir());
    old_host.backup_once().await;
    assert!(fake.keys().contains(&"remoteauth:RemoteAuth-bot".to_string()));

    let second = TempDir::new().unwrap();
    let new_host = remote_auth(
        Arc::new(fake_upstash::client(&server)),
        second.path(),
        Duration::from_secs(60),
    );
    assert!(new_host.restore().await);
    assert_eq!(
        fs::read(new_host.profile_dir().join("Default/Cookies")).unwrap(),
        b"cookie-jar"
    );
}
