//! Several replicas sharing one document on a real kenangan-server

use kenangan_core::{Album, Mutation, Photo, Snapshot};
use kenangan_server::{config::StorageSettings, router, AppState};
use kenangan_syncd::{HttpDocumentStore, PullOutcome, SyncEngine, SyncOptions};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn spawn_server(max_body_bytes: usize) -> (String, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageSettings {
        data_dir: dir.path().to_path_buf(),
        max_body_bytes,
    };
    let app = router(AppState::open(&storage).await.unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api/documents/albums"), dir)
}

fn client(endpoint: &str) -> SyncEngine {
    let store = HttpDocumentStore::new(endpoint.to_string(), Duration::from_secs(5), 1024 * 1024).unwrap();
    SyncEngine::start(
        Arc::new(store),
        SyncOptions {
            quiet_period: Duration::ZERO,
            ..Default::default()
        },
    )
}

fn album_ids(engine: &SyncEngine) -> Vec<String> {
    engine.read(|s| s.albums.iter().map(|a| a.id.clone()).collect())
}

#[tokio::test]
async fn test_empty_store_bootstraps_to_empty_collection() {
    let (endpoint, _dir) = spawn_server(1024 * 1024).await;
    let alice = client(&endpoint);

    assert!(matches!(
        alice.force_pull().await,
        PullOutcome::Applied { found: false, albums: 0, .. }
    ));
    assert!(alice.snapshot().is_empty());

    alice
        .apply(Mutation::CreateAlbum(Album::new("1", "Trip", 1000)))
        .outcome()
        .await
        .unwrap();

    let bob = client(&endpoint);
    assert!(matches!(
        bob.force_pull().await,
        PullOutcome::Applied { found: true, albums: 1, .. }
    ));
    assert_eq!(bob.snapshot(), alice.snapshot());
}

#[tokio::test]
async fn test_stale_replica_overwrites_concurrent_album() {
    let (endpoint, _dir) = spawn_server(1024 * 1024).await;
    let alice = client(&endpoint);
    let bob = client(&endpoint);
    alice.force_pull().await;
    bob.force_pull().await;

    alice
        .apply(Mutation::CreateAlbum(Album::new("1", "Trip", 1000)))
        .outcome()
        .await
        .unwrap();
    // Bob never saw album 1, so his full snapshot replaces it
    bob.apply(Mutation::CreateAlbum(Album::new("2", "Party", 2000)))
        .outcome()
        .await
        .unwrap();

    assert!(alice.pull().await.is_applied());
    assert_eq!(album_ids(&alice), vec!["2"]);
    assert_eq!(album_ids(&bob), vec!["2"]);
}

#[tokio::test]
async fn test_pull_before_write_keeps_both_albums() {
    let (endpoint, _dir) = spawn_server(1024 * 1024).await;
    let alice = client(&endpoint);
    let bob = client(&endpoint);
    alice.force_pull().await;
    bob.force_pull().await;

    alice
        .apply(Mutation::CreateAlbum(Album::new("1", "Trip", 1000)))
        .outcome()
        .await
        .unwrap();
    assert!(bob.pull().await.is_applied());
    bob.apply(Mutation::CreateAlbum(Album::new("2", "Party", 2000)))
        .outcome()
        .await
        .unwrap();

    assert!(alice.pull().await.is_applied());
    let mut ids = album_ids(&alice);
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_server_413_keeps_local_edit() {
    let (endpoint, _dir) = spawn_server(512).await;
    let alice = client(&endpoint);
    alice.force_pull().await;
    alice
        .apply(Mutation::CreateAlbum(Album::new("1", "Trip", 1000)))
        .outcome()
        .await
        .unwrap();

    let photos = (0..20)
        .map(|i| Photo::new(format!("https://cdn.example/photo-{i}.jpg"), Some("Ani".into())))
        .collect();
    let err = alice
        .apply(Mutation::AddPhotos {
            album_id: "1".into(),
            photos,
        })
        .outcome()
        .await
        .unwrap_err();

    assert!(err.is_payload_too_large());
    assert_eq!(alice.snapshot().album("1").unwrap().photos.len(), 20);
    assert!(alice.status().is_error());

    let bob = client(&endpoint);
    bob.force_pull().await;
    assert_eq!(bob.snapshot(), Snapshot::new(vec![Album::new("1", "Trip", 1000)]));
}

#[tokio::test]
async fn test_archive_and_restore_reach_other_replicas() {
    let (endpoint, _dir) = spawn_server(1024 * 1024).await;
    let alice = client(&endpoint);
    let bob = client(&endpoint);
    alice.force_pull().await;

    alice
        .apply(Mutation::CreateAlbum(Album::new("1", "Trip", 1000)))
        .outcome()
        .await
        .unwrap();
    alice
        .archive(kenangan_core::EntityRef::album("1"))
        .outcome()
        .await
        .unwrap();

    bob.force_pull().await;
    assert!(bob.snapshot().album("1").unwrap().is_archived());

    bob.restore(kenangan_core::EntityRef::album("1"))
        .outcome()
        .await
        .unwrap();
    assert!(alice.pull().await.is_applied());
    assert!(!alice.snapshot().album("1").unwrap().is_archived());
}
