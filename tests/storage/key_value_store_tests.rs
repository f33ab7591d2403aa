//! KeyValueStore interface tests.
//!
//! These tests verify the contract of the KeyValueStore trait.
//! Each storage implementation should run these tests.

use roadlog::storage::KeyValueStore;

// =============================================================================
// KeyValueStore::get_item tests
// =============================================================================

pub async fn test_get_missing<S: KeyValueStore>(store: &S) {
    let result = store
        .get_item("test_missing")
        .await
        .expect("get should succeed");
    assert!(result.is_none(), "missing key should be None, not an error");
}

// =============================================================================
// KeyValueStore::set_item tests
// =============================================================================

pub async fn test_set_and_get<S: KeyValueStore>(store: &S) {
    store
        .set_item("test_set_get", r#"[{"latitude":1.0}]"#)
        .await
        .expect("set should succeed");

    let result = store
        .get_item("test_set_get")
        .await
        .expect("get should succeed");
    assert_eq!(result.as_deref(), Some(r#"[{"latitude":1.0}]"#));
}

pub async fn test_set_overwrites<S: KeyValueStore>(store: &S) {
    store.set_item("test_overwrite", "first").await.unwrap();
    store.set_item("test_overwrite", "second").await.unwrap();

    let result = store.get_item("test_overwrite").await.unwrap();
    assert_eq!(result.as_deref(), Some("second"), "last write should win");
}

pub async fn test_empty_value_round_trips<S: KeyValueStore>(store: &S) {
    store.set_item("test_empty", "").await.unwrap();

    let result = store.get_item("test_empty").await.unwrap();
    assert_eq!(result.as_deref(), Some(""), "empty string is a value, not absence");
}

pub async fn test_raw_secret_kept_verbatim<S: KeyValueStore>(store: &S) {
    let token = "eyJhbGciOiJIUzI1NiJ9.payload.\"sig\"";
    store.set_item("test_secret", token).await.unwrap();

    let result = store.get_item("test_secret").await.unwrap();
    assert_eq!(result.as_deref(), Some(token));
}

// =============================================================================
// KeyValueStore::remove_item tests
// =============================================================================

pub async fn test_remove<S: KeyValueStore>(store: &S) {
    store.set_item("test_remove", "value").await.unwrap();
    store
        .remove_item("test_remove")
        .await
        .expect("remove should succeed");

    let result = store.get_item("test_remove").await.unwrap();
    assert!(result.is_none(), "removed key should be gone");
}

pub async fn test_remove_missing_is_ok<S: KeyValueStore>(store: &S) {
    store
        .remove_item("test_never_written")
        .await
        .expect("removing a missing key should succeed");
}

// =============================================================================
// Isolation tests
// =============================================================================

pub async fn test_key_isolation<S: KeyValueStore>(store: &S) {
    store.set_item("test_iso_a", "a").await.unwrap();
    store.set_item("test_iso_b", "b").await.unwrap();
    store.remove_item("test_iso_a").await.unwrap();

    assert!(store.get_item("test_iso_a").await.unwrap().is_none());
    assert_eq!(
        store.get_item("test_iso_b").await.unwrap().as_deref(),
        Some("b"),
        "removing one key must not touch another"
    );
}

// =============================================================================
// KeyValueStore::clear tests (run last, wipes the store)
// =============================================================================

pub async fn test_clear<S: KeyValueStore>(store: &S) {
    store.set_item("test_clear_a", "a").await.unwrap();
    store.set_item("test_clear_b", "b").await.unwrap();

    store.clear().await.expect("clear should succeed");

    assert!(store.get_item("test_clear_a").await.unwrap().is_none());
    assert!(store.get_item("test_clear_b").await.unwrap().is_none());
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all KeyValueStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_key_value_store_tests {
    ($store:expr) => {
        use $crate::storage::key_value_store_tests::*;

        // get tests
        test_get_missing($store).await;
        println!("  test_get_missing: PASSED");

        // set tests
        test_set_and_get($store).await;
        println!("  test_set_and_get: PASSED");

        test_set_overwrites($store).await;
        println!("  test_set_overwrites: PASSED");

        test_empty_value_round_trips($store).await;
        println!("  test_empty_value_round_trips: PASSED");

        test_raw_secret_kept_verbatim($store).await;
        println!("  test_raw_secret_kept_verbatim: PASSED");

        // remove tests
        test_remove($store).await;
        println!("  test_remove: PASSED");

        test_remove_missing_is_ok($store).await;
        println!("  test_remove_missing_is_ok: PASSED");

        // isolation tests
        test_key_isolation($store).await;
        println!("  test_key_isolation: PASSED");

        // clear tests
        test_clear($store).await;
        println!("  test_clear: PASSED");
    };
}
