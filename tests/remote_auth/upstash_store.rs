use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use zaprelay::SessionStoreError;
use zaprelay::remote_auth::{
    MetaRecord, RemoteSessionStore, RestoreOutcome, SessionState, StorageMode, StoreOptions,
};

use crate::fake_upstash::{self, FakeUpstash};

fn blob(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn options(max_chunk_chars: usize) -> StoreOptions {
    StoreOptions {
        max_chunk_chars,
        junk_patterns: Vec::new(),
        ..StoreOptions::default()
    }
}

fn archive(dir: &Path, bytes: &[u8]) -> PathBuf {
    let path = dir.join("session.zip");
    std::fs::write(&path, bytes).unwrap();
    path
}

async fn store_over(
    fake: FakeUpstash,
    max_chunk_chars: usize,
) -> (wiremock::MockServer, FakeUpstash, RemoteSessionStore) {
    let (server, fake) = fake_upstash::start_with(fake).await;
    let store = RemoteSessionStore::new(
        Arc::new(fake_upstash::client(&server)),
        options(max_chunk_chars),
    );
    (server, fake, store)
}

#[tokio::test]
async fn chunked_session_round_trips_over_rest() {
    let tmp = TempDir::new().unwrap();
    let (_server, fake, store) = store_over(FakeUpstash::default(), 64).await;

    let original = blob(500);
    let report = store
        .try_save("RemoteAuth-bot", &archive(tmp.path(), &original))
        .await
        .unwrap();
    assert_eq!(report.mode, StorageMode::Chunked);
    assert_eq!(report.parts, 11);

    let out = tmp.path().join("restored/session.zip");
    let outcome = store.extract("RemoteAuth-bot", &out).await.unwrap();
    assert_eq!(
        outcome,
        RestoreOutcome::Restored {
            mode: StorageMode::Chunked,
            bytes: 500
        }
    );
    assert_eq!(std::fs::read(&out).unwrap(), original);
    assert_eq!(fake.keys().len(), 12);
}

#[tokio::test]
async fn metadata_is_written_after_every_part() {
    let tmp = TempDir::new().unwrap();
    let (_server, fake, store) = store_over(FakeUpstash::default(), 64).await;

    store
        .try_save("s", &archive(tmp.path(), &blob(200)))
        .await
        .unwrap();

    let sets = fake.set_keys();
    assert_eq!(sets.last().map(String::as_str), Some("remoteauth:s:meta"));
    assert_eq!(sets.len(), 6);
    assert!(sets[..5].iter().all(|k| k.starts_with("remoteauth:s:part:")));
}

#[tokio::test]
async fn metadata_matches_the_stored_json_layout() {
    let tmp = TempDir::new().unwrap();
    let (_server, fake, store) = store_over(FakeUpstash::default(), 64).await;

    store
        .try_save("s", &archive(tmp.path(), &blob(200)))
        .await
        .unwrap();

    let raw = fake.get("remoteauth:s:meta").unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["parts"], 5);
    assert_eq!(json["totalLen"], 268);
    assert!(json["ts"].as_i64().unwrap() > 1_700_000_000_000);
}

#[tokio::test]
async fn exists_is_a_single_round_trip() {
    let (_server, fake, store) = store_over(FakeUpstash::default(), 64).await;
    fake.insert("remoteauth:s:meta", r#"{"parts":1,"totalLen":4,"ts":0}"#);

    assert!(store.exists("s").await.unwrap());
    assert_eq!(fake.commands(), vec!["EXISTS"]);
}

#[tokio::test]
async fn chunks_sized_to_the_ceiling_are_accepted() {
    let tmp = TempDir::new().unwrap();
    let (_server, _fake, store) = store_over(FakeUpstash::with_max_value_len(100), 100).await;

    let original = blob(1_000);
    store
        .try_save("s", &archive(tmp.path(), &original))
        .await
        .unwrap();

    let out = tmp.path().join("out.zip");
    assert!(store.extract("s", &out).await.unwrap().is_restored());
    assert_eq!(std::fs::read(&out).unwrap(), original);
}

#[tokio::test]
async fn oversized_chunks_fail_the_save_without_metadata() {
    let tmp = TempDir::new().unwrap();
    let (_server, fake, store) = store_over(FakeUpstash::with_max_value_len(100), 200).await;

    let err = store
        .try_save("s", &archive(tmp.path(), &blob(1_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionStoreError::Backend { .. }), "{err}");
    assert!(fake.get("remoteauth:s:meta").is_none());

    store.save("s", &archive(tmp.path(), &blob(1_000))).await;
    assert_eq!(store.failed_saves(), 1);
}

#[tokio::test]
async fn missing_part_is_reported_as_corrupt() {
    let tmp = TempDir::new().unwrap();
    let (_server, fake, store) = store_over(FakeUpstash::default(), 64).await;

    store
        .try_save("s", &archive(tmp.path(), &blob(144)))
        .await
        .unwrap();
    fake.remove("remoteauth:s:part:1");

    let err = store
        .extract("s", &tmp.path().join("out.zip"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionStoreError::CorruptSession { .. }), "{err}");
}

#[tokio::test]
async fn records_written_by_the_previous_bot_restore() {
    let tmp = TempDir::new().unwrap();
    let (_server, fake, store) = store_over(FakeUpstash::default(), 64).await;
    fake.insert("remoteauth:legacy:part:0", "UEsDBBQAAAAI");
    fake.insert("remoteauth:legacy:part:1", "AA==");
    fake.insert(
        "remoteauth:legacy:meta",
        r#"{"parts":2,"totalLen":16,"ts":1718900000000}"#,
    );

    match store.inspect("legacy").await.unwrap() {
        SessionState::Chunked(MetaRecord { parts, total_len, .. }) => {
            assert_eq!((parts, total_len), (2, 16));
        }
        other => panic!("unexpected state {other:?}"),
    }

    let out = tmp.path().join("legacy.zip");
    store.extract("legacy", &out).await.unwrap();
    assert_eq!(
        std::fs::read(&out).unwrap(),
        [0x50, 0x4b, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00, 0x08, 0x00]
    );
}

#[tokio::test]
async fn delete_with_unreadable_metadata_lists_parts() {
    let (_server, fake, store) = store_over(FakeUpstash::default(), 64).await;
    fake.insert("remoteauth:s:part:0", "AAAA");
    fake.insert("remoteauth:s:part:1", "AAAA");
    fake.insert("remoteauth:s:part:2", "AAAA");
    fake.insert("remoteauth:s:meta", "garbage");
    fake.insert("remoteauth:other", "AAAA");

    store.delete("s").await.unwrap();

    assert!(fake.commands().contains(&"KEYS".to_string()));
    assert_eq!(fake.keys(), vec!["remoteauth:other"]);
}

#[tokio::test]
async fn smaller_save_leaves_no_orphans() {
    let tmp = TempDir::new().unwrap();
    let (_server, fake, store) = store_over(FakeUpstash::default(), 64).await;

    store
        .try_save("s", &archive(tmp.path(), &blob(600)))
        .await
        .unwrap();
    store
        .try_save("s", &archive(tmp.path(), &blob(60)))
        .await
        .unwrap();

    assert_eq!(
        fake.keys(),
        vec!["remoteauth:s:meta", "remoteauth:s:part:0", "remoteauth:s:part:1"]
    );

    store.delete("s").await.unwrap();
    assert!(fake.keys().is_empty());
}
