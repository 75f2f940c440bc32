//! Error propagation and partial-failure behavior.

use std::sync::Arc;

use rampart_acl::{Adapter, Error, PolicyAdapter, PolicyModel};
use rampart_storage::{MemoryStore, PolicyStore};

use crate::common::*;

#[tokio::test]
async fn test_load_returns_mid_stream_error() {
    let adapter = PolicyAdapter::new(Arc::new(FailingStore::new(2)), DATABASE, TABLE)
        .await
        .unwrap();
    adapter.save_policy(&sample_model()).await.unwrap();

    let mut model = PolicyModel::new();
    let err = adapter.load_policy(&mut model).await.unwrap_err();

    match &err {
        Error::Operation {
            operation, table, ..
        } => {
            assert_eq!(*operation, "load_policy");
            assert_eq!(table, "casbin.casbin_rule");
        }
        other => unreachable!("Expected Operation error, got {other:?}"),
    }
    assert!(err.to_string().contains("cursor lost"));
    assert!(err.is_retryable());

    // Rows read before the failure stay in the model.
    assert_eq!(model.rule_count(), 2);
}

#[tokio::test]
async fn test_load_fails_immediately_on_empty_prefix() {
    let adapter = PolicyAdapter::new(Arc::new(FailingStore::new(0)), DATABASE, TABLE)
        .await
        .unwrap();

    let mut model = PolicyModel::new();
    assert!(adapter.load_policy(&mut model).await.is_err());
    assert!(model.is_empty());
}

#[tokio::test]
async fn test_init_failure_is_returned() {
    let store = Arc::new(MemoryStore::new());
    store.close().await.unwrap();

    let err = PolicyAdapter::new(store, "authz", "rules")
        .await
        .err()
        .unwrap();
    match err {
        Error::Init {
            database, table, ..
        } => {
            assert_eq!(database, "authz");
            assert_eq!(table, "rules");
        }
        other => unreachable!("Expected Init error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_filtered_delete_error_is_returned() {
    let store = Arc::new(MemoryStore::new());
    let adapter = PolicyAdapter::new(store.clone(), DATABASE, TABLE)
        .await
        .unwrap();
    store.close().await.unwrap();

    let err = adapter
        .remove_filtered_policy("p", "p", 0, &tokens(&["alice"]))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("remove_filtered_policy on casbin.casbin_rule"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_save_and_remove_errors_carry_operation() {
    let store = Arc::new(MemoryStore::new());
    let adapter = PolicyAdapter::new(store.clone(), DATABASE, TABLE)
        .await
        .unwrap();
    store.close().await.unwrap();

    let err = adapter.save_policy(&sample_model()).await.unwrap_err();
    assert!(err.to_string().starts_with("save_policy"));

    let err = adapter
        .remove_policy("p", "p", &tokens(&["a"]))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("remove_policy"));
}

#[tokio::test]
async fn test_close_reports_shared_store_as_detached() {
    let store: Arc<dyn PolicyStore> = Arc::new(MemoryStore::new());
    let adapter = PolicyAdapter::new(store.clone(), DATABASE, TABLE)
        .await
        .unwrap();

    adapter.close().await.unwrap();
    store.ensure_database("still-open").await.unwrap();
}
