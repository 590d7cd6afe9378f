//! Integration tests for the SQLite key/value store

use tempfile::TempDir;

use nandi_chat::config::StorageConfig;
use nandi_chat::storage::{KeyValueStore, SqliteKeyValueStore, TOTAL_POINTS_KEY};

fn file_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        path: dir.path().join("nested").join("nandi.db"),
        max_connections: 2,
    }
}

#[tokio::test]
async fn test_in_memory_set_get_remove() {
    let store = SqliteKeyValueStore::new_in_memory().await.unwrap();

    assert_eq!(store.get(TOTAL_POINTS_KEY).await.unwrap(), None);

    store.set(TOTAL_POINTS_KEY, "10").await.unwrap();
    store.set(TOTAL_POINTS_KEY, "42").await.unwrap();
    assert_eq!(
        store.get(TOTAL_POINTS_KEY).await.unwrap(),
        Some("42".to_string())
    );

    store.remove(TOTAL_POINTS_KEY).await.unwrap();
    assert_eq!(store.get(TOTAL_POINTS_KEY).await.unwrap(), None);

    // Removing a missing key is not an error
    store.remove(TOTAL_POINTS_KEY).await.unwrap();
}

#[tokio::test]
async fn test_clear_drops_every_key() {
    let store = SqliteKeyValueStore::new_in_memory().await.unwrap();
    store.set("a", "1").await.unwrap();
    store.set("b", "2").await.unwrap();

    store.clear().await.unwrap();

    assert_eq!(store.get("a").await.unwrap(), None);
    assert_eq!(store.get("b").await.unwrap(), None);
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);

    {
        let store = SqliteKeyValueStore::new(&config).await.unwrap();
        store.set(TOTAL_POINTS_KEY, "77").await.unwrap();
        store.pool().close().await;
    }

    let reopened = SqliteKeyValueStore::new(&config).await.unwrap();
    assert_eq!(
        reopened.get(TOTAL_POINTS_KEY).await.unwrap(),
        Some("77".to_string())
    );
}
