//! Lazy client lifecycle tests against an in-memory cluster.
//!
//! Run with: `cargo test -p spanstore-persistence --test lazy_client_tests`

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockCluster;
use spanstore_persistence::{
    BackendError, ClientState, ClusterHealth, StorageConfig, StorageError, TemplateError,
};

fn config() -> StorageConfig {
    StorageConfig {
        cluster_name: "cluster".to_string(),
        hosts: vec!["host1".to_string(), "host2".to_string()],
        ..Default::default()
    }
}

// ============================================================================
// Exactly-once initialization
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_initializes_once() {
    let cluster = MockCluster::new("5.0.0").with_connect_delay(Duration::from_millis(100));
    let client = Arc::new(cluster.lazy_client(config()));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.get().await })
        })
        .collect();

    let mut clients = Vec::new();
    for handle in handles {
        clients.push(handle.await.unwrap().unwrap());
    }

    assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
    {
        let state = cluster.state();
        assert_eq!(state.connects, 1);
        assert_eq!(state.version_queries, 1);
        assert_eq!(state.submissions, 1);
    }
    assert_eq!(client.state(), ClientState::Ready);
}

#[tokio::test]
async fn test_ready_client_is_cached() {
    let cluster = MockCluster::new("2.4.0");
    let client = cluster.lazy_client(config());

    let first = client.get().await.unwrap();
    let second = client.get().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let state = cluster.state();
    assert_eq!(state.connects, 1);
    assert_eq!(state.version_queries, 1);
    assert_eq!(state.submissions, 1);
}

#[tokio::test]
async fn test_installs_version_specific_template() {
    let cluster = MockCluster::new("2.4.0");
    let client = cluster.lazy_client(StorageConfig {
        strict_trace_id: false,
        ..config()
    });

    client.get().await.unwrap();

    let installed = cluster.template("zipkin_template").unwrap();
    assert!(installed.contains(r#""traceId":{"type":"string","analyzer":"traceId_analyzer"}"#));
    assert!(installed.contains(r#""template":"zipkin-*""#));
}

#[tokio::test]
async fn test_template_name_follows_index() {
    let cluster = MockCluster::new("5.0.0");
    let client = cluster.lazy_client(StorageConfig {
        index: "traces".to_string(),
        ..config()
    });

    client.get().await.unwrap();

    assert!(cluster.template("traces_template").is_some());
    assert!(cluster.template("zipkin_template").is_none());
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_retries_after_connectivity_error() {
    let cluster = MockCluster::new("5.0.0");
    cluster.fail_next_connects(1);
    let client = cluster.lazy_client(config());

    let err = client.get().await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Backend(BackendError::Connectivity { .. })
    ));
    assert!(err.is_retryable());
    assert_eq!(client.state(), ClientState::Failed);

    client.get().await.unwrap();
    assert_eq!(client.state(), ClientState::Ready);

    let state = cluster.state();
    assert_eq!(state.connects, 2);
    assert_eq!(state.submissions, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_failure() {
    let cluster = MockCluster::new("5.0.0").with_connect_delay(Duration::from_millis(300));
    cluster.fail_next_connects(1);
    let client = Arc::new(cluster.lazy_client(config()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.get().await })
        })
        .collect();

    let mut errors = Vec::new();
    for handle in handles {
        errors.push(handle.await.unwrap().unwrap_err());
    }

    assert!(errors.iter().all(|e| e == &errors[0]));
    assert_eq!(cluster.state().connects, 1);

    // A caller arriving after the failure starts a new attempt
    client.get().await.unwrap();
    assert_eq!(cluster.state().connects, 2);
}

#[tokio::test]
async fn test_invalid_version_closes_partial_client() {
    let cluster = MockCluster::new("not-a-version");
    let client = cluster.lazy_client(config());

    let err = client.get().await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Template(TemplateError::InvalidVersion { .. })
    ));
    assert!(!err.is_retryable());

    let state = cluster.state();
    assert_eq!(state.submissions, 0);
    assert_eq!(state.closes, 1);
}

#[tokio::test]
async fn test_rejected_template_is_surfaced() {
    let cluster = MockCluster::new("5.0.0");
    cluster.reject_templates();
    let client = cluster.lazy_client(config());

    let err = client.get().await.unwrap_err();
    assert_eq!(
        err,
        StorageError::Backend(BackendError::TemplateSubmission {
            template_name: "zipkin_template".to_string(),
            message: "mapper_parsing_exception".to_string(),
        })
    );
    assert_eq!(client.state(), ClientState::Failed);
    assert_eq!(cluster.state().closes, 1);
}

// ============================================================================
// Idempotent template submission
// ============================================================================

#[tokio::test]
async fn test_resubmitting_identical_template_changes_nothing() {
    let cluster = MockCluster::new("5.0.0");

    cluster.lazy_client(config()).get().await.unwrap();
    let after_first = cluster.state().templates.clone();

    cluster.lazy_client(config()).get().await.unwrap();
    let after_second = cluster.state().templates.clone();

    assert_eq!(after_first, after_second);
    assert_eq!(after_second.len(), 1);
    assert_eq!(cluster.state().submissions, 2);
}

// ============================================================================
// Close
// ============================================================================

#[tokio::test]
async fn test_close_releases_client_once() {
    let cluster = MockCluster::new("5.0.0");
    let client = cluster.lazy_client(config());

    client.get().await.unwrap();
    client.close().await;
    client.close().await;

    assert_eq!(cluster.state().closes, 1);
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(
        client.get().await.unwrap_err(),
        StorageError::Backend(BackendError::Closed)
    );
    assert_eq!(cluster.state().connects, 1);
}

#[tokio::test]
async fn test_close_before_first_use_never_connects() {
    let cluster = MockCluster::new("5.0.0");
    let client = cluster.lazy_client(config());

    client.close().await;

    assert!(client.get().await.is_err());
    let state = cluster.state();
    assert_eq!(state.connects, 0);
    assert_eq!(state.closes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_waits_for_inflight_initialization() {
    let cluster = MockCluster::new("5.0.0").with_connect_delay(Duration::from_millis(100));
    let client = Arc::new(cluster.lazy_client(config()));

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.state(), ClientState::Initializing);

    client.close().await;

    assert!(pending.await.unwrap().is_ok());
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(cluster.state().closes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_get_closes_connected_client() {
    let cluster = MockCluster::new("5.0.0").with_version_delay(Duration::from_millis(500));
    let client = cluster.lazy_client(config());

    let timed_out = tokio::time::timeout(Duration::from_millis(50), client.get()).await;
    assert!(timed_out.is_err());
    assert_eq!(client.state(), ClientState::Uninitialized);

    // The abandoned client is closed on a spawned task
    for _ in 0..10 {
        if cluster.state().closes > 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    {
        let state = cluster.state();
        assert_eq!(state.connects, 1);
        assert_eq!(state.closes, state.connects);
        assert_eq!(state.submissions, 0);
    }

    // The next caller starts over and the earlier close is not repeated
    client.get().await.unwrap();
    client.close().await;
    let state = cluster.state();
    assert_eq!(state.connects, 2);
    assert_eq!(state.closes, 2);
}

// ============================================================================
// Health and diagnostics
// ============================================================================

#[tokio::test]
async fn test_check_reports_health() {
    let cluster = MockCluster::new("5.0.0");
    let client = cluster.lazy_client(config());

    cluster.set_health(ClusterHealth::Yellow);
    assert_eq!(client.check().await.unwrap(), ClusterHealth::Yellow);

    cluster.set_health(ClusterHealth::Red);
    assert!(matches!(
        client.check().await,
        Err(StorageError::Backend(BackendError::Unavailable { .. }))
    ));
}

#[tokio::test]
async fn test_to_string_is_independent_of_state() {
    let cluster = MockCluster::new("5.0.0");
    let client = cluster.lazy_client(config());
    let expected = r#"{"clusterName": "cluster", "hosts": ["host1", "host2"]}"#;

    assert_eq!(client.to_string(), expected);
    client.get().await.unwrap();
    assert_eq!(client.to_string(), expected);
    client.close().await;
    assert_eq!(client.to_string(), expected);
}
