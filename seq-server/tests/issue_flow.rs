//! End-to-end issuance flows over the in-memory backends:
//! issue → counter advance → format → queue → consumer → audit row,
//! plus reconciliation, reset and failure behavior.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use seq_server::consumer::AuditConsumer;
use seq_server::counter::{CounterError, CounterStore, MemoryCounterStore};
use seq_server::db::{AuditStore, MemoryAuditStore};
use seq_server::queue::MemoryQueue;
use seq_server::reconcile::Reconciler;
use seq_server::service::{SequenceService, ServiceTimeouts};
use shared::error::ErrorCode;
use shared::models::{AuditEvent, BatchRequest, ConfigUpdateRequest, PrefixConfig, ResetRequest};

struct TestApp {
    service: Arc<SequenceService>,
    counter: Arc<MemoryCounterStore>,
    store: Arc<MemoryAuditStore>,
    queue: Arc<MemoryQueue>,
}

fn test_app() -> TestApp {
    let counter = Arc::new(MemoryCounterStore::new());
    let store = Arc::new(MemoryAuditStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let service = Arc::new(SequenceService::new(
        counter.clone(),
        store.clone(),
        queue.clone(),
        ServiceTimeouts::default(),
        Duration::from_secs(30),
    ));
    TestApp {
        service,
        counter,
        store,
        queue,
    }
}

impl TestApp {
    async fn seed_config(&self, prefix: &str, padding: i32, template: &str) {
        self.service
            .update_config(
                prefix,
                ConfigUpdateRequest {
                    padding_length: Some(padding),
                    format_template: Some(template.to_string()),
                    reset_rule: None,
                    admin_user: "ops".into(),
                    create_if_not_exists: true,
                },
            )
            .await
            .unwrap();
    }

    fn start_consumer(&self) -> (CancellationToken, JoinHandle<()>) {
        let consumer = AuditConsumer::new(self.store.clone(), self.queue.clone(), 2);
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { consumer.run(cancel).await })
        };
        (cancel, handle)
    }
}

/// Poll until the condition holds, within a bounded window.
async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within bounded time");
}

#[tokio::test]
async fn test_simple_issue_lands_audit_row() {
    let app = test_app();
    app.seed_config("SG", 6, "%s%06d").await;
    let (cancel, handle) = app.start_consumer();

    let issued = app
        .service
        .issue("SG", "erp", "alice", Some("r1".into()))
        .await
        .unwrap();
    assert_eq!(issued.counter, 1);
    assert_eq!(issued.full_number, "SG000001");
    assert_eq!(issued.prefix, "SG");

    let store = app.store.clone();
    wait_for(move || store.rows_for("SG").len() == 1).await;

    let rows = app.store.rows_for("SG");
    assert_eq!(rows[0].counter_value, 1);
    assert_eq!(rows[0].full_number, "SG000001");
    assert_eq!(rows[0].client_id.as_deref(), Some("erp"));
    assert_eq!(rows[0].generated_by.as_deref(), Some("alice"));
    assert_eq!(rows[0].correlation_id.as_deref(), Some("r1"));
    assert_eq!(rows[0].message_id, issued.message_id);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_issuers_get_contiguous_distinct_counters() {
    let app = test_app();
    app.seed_config("SG", 6, "%s%06d").await;
    let (cancel, handle) = app.start_consumer();

    let mut joins = Vec::new();
    for _ in 0..100 {
        let service = app.service.clone();
        joins.push(tokio::spawn(async move {
            service.issue("SG", "erp", "load-test", None).await.unwrap()
        }));
    }

    let mut counters = Vec::new();
    let mut message_ids = std::collections::HashSet::new();
    for join in joins {
        let issued = join.await.unwrap();
        counters.push(issued.counter);
        message_ids.insert(issued.message_id);
    }

    counters.sort_unstable();
    assert_eq!(counters, (1..=100).collect::<Vec<i64>>());
    assert_eq!(message_ids.len(), 100);

    let store = app.store.clone();
    wait_for(move || store.rows_for("SG").len() == 100).await;

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_batch_shares_batch_id() {
    let app = test_app();
    app.seed_config("PO", 8, "%s%08d").await;
    let (cancel, handle) = app.start_consumer();

    let response = app
        .service
        .issue_batch(
            "PO",
            BatchRequest {
                count: 5,
                client_id: "erp".into(),
                generated_by: "alice".into(),
                correlation_id: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(response.count, 5);
    let numbers: Vec<&str> = response.ids.iter().map(|id| id.full_number.as_str()).collect();
    assert_eq!(
        numbers,
        vec![
            "PO00000001",
            "PO00000002",
            "PO00000003",
            "PO00000004",
            "PO00000005"
        ]
    );

    let store = app.store.clone();
    wait_for(move || store.rows_for("PO").len() == 5).await;

    let rows = app.store.rows_for("PO");
    assert!(rows
        .iter()
        .all(|row| row.batch_id.as_deref() == Some(response.batch_id.as_str())));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_yearly_template() {
    let app = test_app();
    app.seed_config("INV", 4, "INV%d-%04d").await;
    app.counter.set("INV", 42).await.unwrap();

    let issued = app.service.issue("INV", "erp", "alice", None).await.unwrap();
    assert_eq!(issued.counter, 43);
    assert_eq!(
        issued.full_number,
        format!("INV{}-0043", Utc::now().year())
    );
}

#[tokio::test]
async fn test_unsafe_reset_rejected_and_counter_unchanged() {
    let app = test_app();
    app.counter.set("SG", 1000).await.unwrap();

    let err = app
        .service
        .reset(
            "SG",
            ResetRequest {
                set_to: 500,
                reason: "x".into(),
                admin_user: "op".into(),
                force: false,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsafeReset);
    assert_eq!(app.counter.read("SG").await.unwrap(), 1000);
    assert!(app.store.reset_logs().is_empty());
}

#[tokio::test]
async fn test_forced_reset_logs_and_checkpoints() {
    let app = test_app();
    app.counter.set("SG", 1000).await.unwrap();

    let response = app
        .service
        .reset(
            "SG",
            ResetRequest {
                set_to: 500,
                reason: "rollover drill".into(),
                admin_user: "op".into(),
                force: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(response.old_value, 1000);
    assert_eq!(response.new_value, 500);
    assert_eq!(app.counter.read("SG").await.unwrap(), 500);

    let logs = app.store.reset_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].old_value, 1000);
    assert_eq!(logs[0].new_value, 500);
    assert_eq!(logs[0].reset_id, response.reset_id);

    let checkpoint = app.store.get_checkpoint("SG").await.unwrap().unwrap();
    assert_eq!(checkpoint.last_counter_synced, 500);
    assert_eq!(checkpoint.synced_by.as_deref(), Some("op"));
}

#[tokio::test]
async fn test_reset_validation() {
    let app = test_app();
    for req in [
        ResetRequest {
            set_to: -1,
            reason: "x".into(),
            admin_user: "op".into(),
            force: false,
        },
        ResetRequest {
            set_to: 10,
            reason: "".into(),
            admin_user: "op".into(),
            force: false,
        },
        ResetRequest {
            set_to: 10,
            reason: "x".into(),
            admin_user: "".into(),
            force: false,
        },
    ] {
        let err = app.service.reset("SG", req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }
}

#[tokio::test]
async fn test_startup_reconciliation_resumes_after_audit_max() {
    let app = test_app();
    // Simulate a recovered deployment: the audit store remembers 777,
    // the counter store key is gone.
    app.store
        .create_config(&PrefixConfig {
            format_template: "%s%06d".into(),
            ..PrefixConfig::with_defaults("SG", None)
        })
        .await
        .unwrap();
    app.store
        .insert_audit_row(&AuditEvent {
            message_id: Uuid::new_v4(),
            prefix: "SG".into(),
            counter: 777,
            full_number: "SG000777".into(),
            generated_by: "old-node".into(),
            client_id: "erp".into(),
            correlation_id: None,
            generated_at: Utc::now(),
            published_at: Utc::now(),
            retry_count: 0,
            batch_id: None,
        })
        .await
        .unwrap();

    Reconciler::new(app.counter.clone(), app.store.clone())
        .sync_all()
        .await
        .unwrap();

    let issued = app.service.issue("SG", "erp", "alice", None).await.unwrap();
    assert_eq!(issued.counter, 778);
}

#[tokio::test]
async fn test_redelivered_event_inserts_exactly_once() {
    let app = test_app();
    let event = AuditEvent {
        message_id: Uuid::new_v4(),
        prefix: "SG".into(),
        counter: 9,
        full_number: "SG000009".into(),
        generated_by: "alice".into(),
        client_id: "erp".into(),
        correlation_id: None,
        generated_at: Utc::now(),
        published_at: Utc::now(),
        retry_count: 0,
        batch_id: None,
    };
    // The broker may deliver the same event any number of times.
    for _ in 0..3 {
        let payload = serde_json::to_vec(&event).unwrap();
        app.queue.publish_raw(payload);
    }

    let (cancel, handle) = app.start_consumer();
    let store = app.store.clone();
    wait_for(move || store.rows_for("SG").len() == 1).await;
    // Let the duplicates drain too, then confirm nothing else landed.
    let queue = app.queue.clone();
    wait_for(move || queue.pending_count() == 0).await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(app.store.rows_for("SG").len(), 1);
    assert_eq!(app.queue.dead_letter_count(), 0);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_publish_failure_still_issues_and_counts_gap() {
    let app = test_app();
    app.seed_config("SG", 6, "%s%06d").await;
    app.queue.fail_publishes(true);

    let issued = app.service.issue("SG", "erp", "alice", None).await.unwrap();
    assert_eq!(issued.counter, 1);
    assert_eq!(issued.full_number, "SG000001");

    // The value is a gap: no audit row, but the loss is accounted for.
    assert_eq!(app.store.row_count(), 0);
    assert_eq!(app.service.audit_events_lost(), 1);

    let status = app.service.status("SG").await.unwrap();
    assert_eq!(status.current_counter, 1);
    assert_eq!(status.audit_events_lost, 1);

    // The counter is not rolled back; the next issuance moves on.
    app.queue.fail_publishes(false);
    let next = app.service.issue("SG", "erp", "alice", None).await.unwrap();
    assert_eq!(next.counter, 2);
}

#[tokio::test]
async fn test_counter_outage_surfaces_as_retryable() {
    let app = test_app();
    app.seed_config("SG", 6, "%s%06d").await;
    app.counter
        .inject_failure(CounterError::Unavailable("connection refused".into()));

    let err = app.service.issue("SG", "erp", "alice", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CounterUnavailable);
    assert!(err.is_retryable());

    // Back up: issuance resumes from an untouched counter.
    let issued = app.service.issue("SG", "erp", "alice", None).await.unwrap();
    assert_eq!(issued.counter, 1);
}

#[tokio::test]
async fn test_status_reflects_audit_lag() {
    let app = test_app();
    app.seed_config("SG", 6, "%s%06d").await;
    let (cancel, handle) = app.start_consumer();

    for _ in 0..3 {
        app.service.issue("SG", "erp", "alice", None).await.unwrap();
    }
    let store = app.store.clone();
    wait_for(move || store.rows_for("SG").len() == 3).await;

    let status = app.service.status("SG").await.unwrap();
    assert_eq!(status.current_counter, 3);
    assert_eq!(status.next_counter, 4);
    assert_eq!(status.last_audit_counter, 3);
    assert!(status.counter_store_healthy);
    assert!(status.audit_store_healthy);
    assert!(status.queue_healthy);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_health_reports_down_component() {
    let app = test_app();
    app.counter.set_down(true);

    let health = app.service.health().await;
    assert!(!health.healthy);
    assert!(health.components["counter_store"].starts_with("unhealthy"));
    assert_eq!(health.components["audit_store"], "healthy");
    assert_eq!(health.components["queue"], "healthy");
}

#[tokio::test]
async fn test_audit_page_newest_first() {
    let app = test_app();
    app.seed_config("SG", 6, "%s%06d").await;
    let (cancel, handle) = app.start_consumer();

    for _ in 0..5 {
        app.service.issue("SG", "erp", "alice", None).await.unwrap();
    }
    let store = app.store.clone();
    wait_for(move || store.rows_for("SG").len() == 5).await;

    let page = app.service.audit_page("SG", 2, 0).await.unwrap();
    let counters: Vec<i64> = page.iter().map(|row| row.counter_value).collect();
    assert_eq!(counters, vec![5, 4]);

    let page = app.service.audit_page("SG", 2, 2).await.unwrap();
    let counters: Vec<i64> = page.iter().map(|row| row.counter_value).collect();
    assert_eq!(counters, vec![3, 2]);

    cancel.cancel();
    handle.await.unwrap();
}
