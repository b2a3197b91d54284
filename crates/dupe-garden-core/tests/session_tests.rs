mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use dupe_garden_core::activity::NullSink;
use dupe_garden_core::model::{DuplicateKind, Service};
use dupe_garden_core::{DashboardSession, Error, ScanOutcome, ScanScope, SortKey};
use support::{duplicate, Call, FakeBackend, FakeScan, RecordingSink};

fn storage_scope() -> ScanScope {
    ScanScope::new("proj-1", Service::Storage)
}

fn two_records() -> Vec<dupe_garden_core::DuplicateRecord> {
    vec![
        duplicate("a", DuplicateKind::Text, Some("alpha.txt"), Some(0.97)),
        duplicate("b", DuplicateKind::File, Some("beta.png"), Some(0.6)),
    ]
}

fn session_with(backend: &Arc<FakeBackend>, sink: &Arc<RecordingSink>) -> DashboardSession {
    DashboardSession::new("user-1", backend.clone(), sink.clone())
}

fn view_ids(session: &DashboardSession) -> Vec<String> {
    session.view().into_iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn test_scan_populates_cache_and_records_activity() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let sink = Arc::new(RecordingSink::default());
    let session = session_with(&backend, &sink);

    let outcome = session.scan(&storage_scope()).await.unwrap();
    assert_eq!(outcome, ScanOutcome::Completed { records: 2 });
    assert_eq!(session.record_count(), 2);
    assert_eq!(session.scope(), Some(storage_scope()));

    match &backend.calls()[0] {
        Call::Scan(request) => {
            assert_eq!(request.user_id, "user-1");
            assert_eq!(request.project_id, "proj-1");
            assert_eq!(request.service, Service::Storage);
            assert_eq!(request.database_id, None);
        }
        other => panic!("unexpected call {:?}", other),
    }

    assert_eq!(
        sink.messages(),
        vec![
            "Started duplicate scan for storage".to_string(),
            "Scanned duplicates for STORAGE".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_rescan_replaces_cache_wholesale() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let session = DashboardSession::new("user-1", backend.clone(), Arc::new(NullSink));
    session.scan(&storage_scope()).await.unwrap();
    session.toggle("a");

    backend.set_scan(FakeScan::Records(vec![duplicate(
        "c",
        DuplicateKind::Text,
        None,
        None,
    )]));
    session.scan(&storage_scope()).await.unwrap();

    assert_eq!(view_ids(&session), vec!["c"]);
    assert!(!session.contains("a"));
    assert!(!session.contains("b"));
    assert_eq!(session.selection_len(), 0);
}

#[tokio::test]
async fn test_failed_scan_keeps_last_known_good_cache() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let sink = Arc::new(RecordingSink::default());
    let session = session_with(&backend, &sink);
    session.scan(&storage_scope()).await.unwrap();

    backend.set_scan(FakeScan::HttpError(500, "boom".to_string()));
    let err = session.scan(&storage_scope()).await.unwrap_err();
    assert!(matches!(err, Error::Backend { status: 500, .. }));
    assert_eq!(session.record_count(), 2);

    backend.set_scan(FakeScan::Status("error".to_string()));
    let err = session.scan(&storage_scope()).await.unwrap_err();
    assert!(matches!(err, Error::Rejected(_)));
    assert_eq!(session.record_count(), 2);

    // failed scans never log a completed-scan activity
    let completed = sink
        .messages()
        .iter()
        .filter(|m| m.starts_with("Scanned"))
        .count();
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn test_first_scan_failure_leaves_cache_empty() {
    let backend = Arc::new(FakeBackend::default());
    backend.set_scan(FakeScan::HttpError(502, "bad gateway".to_string()));
    let session = DashboardSession::new("user-1", backend.clone(), Arc::new(NullSink));

    assert!(session.scan(&storage_scope()).await.is_err());
    assert_eq!(session.record_count(), 0);
    assert_eq!(session.scope(), None);
    assert!(!session.is_scanning(&storage_scope()));
}

#[tokio::test]
async fn test_invalid_scope_makes_no_request() {
    let backend = Arc::new(FakeBackend::default());
    let session = DashboardSession::new("user-1", backend.clone(), Arc::new(NullSink));

    let scope = ScanScope::new("proj-1", Service::Database).with_collection("c1");
    assert!(matches!(
        session.scan(&scope).await,
        Err(Error::InvalidScope(_))
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_scan_of_same_scope_is_dropped() {
    let backend = Arc::new(FakeBackend::with_records(two_records()).holding_first_scan());
    let session = Arc::new(DashboardSession::new(
        "user-1",
        backend.clone(),
        Arc::new(NullSink),
    ));
    let scope = storage_scope();

    let first = {
        let session = Arc::clone(&session);
        let scope = scope.clone();
        tokio::spawn(async move { session.scan(&scope).await })
    };

    backend.wait_until_scanning().await;
    assert!(session.is_scanning(&scope));

    let second = session.scan(&scope).await.unwrap();
    assert_eq!(second, ScanOutcome::AlreadyRunning);
    assert_eq!(backend.scan_calls(), 1);

    backend.release();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first, ScanOutcome::Completed { records: 2 });
    assert!(!session.is_scanning(&scope));

    // the guard is gone, so a fresh scan goes through
    session.scan(&scope).await.unwrap();
    assert_eq!(backend.scan_calls(), 2);
}

#[tokio::test]
async fn test_scans_of_different_scopes_run_concurrently() {
    let backend = Arc::new(FakeBackend::with_records(two_records()).holding_first_scan());
    let session = Arc::new(DashboardSession::new(
        "user-1",
        backend.clone(),
        Arc::new(NullSink),
    ));
    let db_scope = ScanScope::new("proj-1", Service::Database).with_database("db1");

    let first = {
        let session = Arc::clone(&session);
        let scope = db_scope.clone();
        tokio::spawn(async move { session.scan(&scope).await })
    };
    backend.wait_until_scanning().await;

    let other = session.scan(&storage_scope()).await.unwrap();
    assert_eq!(other, ScanOutcome::Completed { records: 2 });
    assert_eq!(backend.scan_calls(), 2);

    backend.release();
    first.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_view_follows_search_and_sort() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let session = DashboardSession::new("user-1", backend, Arc::new(NullSink));
    session.scan(&storage_scope()).await.unwrap();

    session.set_sort(SortKey::Similarity);
    assert_eq!(view_ids(&session), vec!["a", "b"]);

    session.set_sort(SortKey::Type);
    assert_eq!(view_ids(&session), vec!["b", "a"]);

    session.set_search("BETA");
    assert_eq!(view_ids(&session), vec!["b"]);
    // the view is a projection; the cache is untouched
    assert_eq!(session.record_count(), 2);

    let stats = session.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.similarity.count("95-100%"), 1);
    assert_eq!(stats.similarity.count("50-75%"), 1);
    assert!((stats.mean_similarity - 0.785).abs() < 1e-9);
}

#[tokio::test]
async fn test_select_all_is_scoped_to_visible_records() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let session = DashboardSession::new("user-1", backend, Arc::new(NullSink));
    session.scan(&storage_scope()).await.unwrap();

    session.set_search("alpha");
    session.select_all();
    assert_eq!(session.selected_ids(), vec!["a"]);

    session.select_all();
    assert_eq!(session.selection_len(), 0);

    session.set_search("");
    session.select_all();
    assert_eq!(session.selected_ids(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_toggle_ignores_ids_outside_cache() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let session = DashboardSession::new("user-1", backend, Arc::new(NullSink));
    session.scan(&storage_scope()).await.unwrap();

    assert!(!session.toggle("ghost"));
    assert!(session.toggle("a"));
    assert_eq!(session.selected_ids(), vec!["a"]);
    assert!(!session.toggle("a"));
    assert_eq!(session.selection_len(), 0);
}

#[tokio::test]
async fn test_bulk_delete_clears_cache_and_selection() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    backend.set_bulk_response(2, 0);
    let sink = Arc::new(RecordingSink::default());
    let session = session_with(&backend, &sink);
    session.scan(&storage_scope()).await.unwrap();

    session.select_all();
    let outcome = session.delete_selected(false).await.unwrap();

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.fail_count, 0);
    assert_eq!(session.record_count(), 0);
    assert_eq!(session.selection_len(), 0);

    let bulk_calls: Vec<_> = backend
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::DeleteBulk(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(bulk_calls.len(), 1);
    assert_eq!(bulk_calls[0].duplicate_ids, vec!["a", "b"]);
    assert!(!bulk_calls[0].delete_data);
    assert!(!backend
        .calls()
        .iter()
        .any(|c| matches!(c, Call::DeleteSingle(_))));

    assert_eq!(
        sink.messages().last().map(String::as_str),
        Some("Deleted 2 duplicate(s) from STORAGE")
    );
}

#[tokio::test]
async fn test_single_selection_uses_single_delete() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let sink = Arc::new(RecordingSink::default());
    let session = session_with(&backend, &sink);
    session.scan(&storage_scope()).await.unwrap();

    session.toggle("b");
    let outcome = session.delete_selected(true).await.unwrap();
    assert_eq!(outcome.success_count, 1);
    assert_eq!(view_ids(&session), vec!["a"]);
    assert_eq!(session.selection_len(), 0);

    let calls = backend.calls();
    match calls.last() {
        Some(Call::DeleteSingle(request)) => {
            assert_eq!(request.duplicate_id, "b");
            assert!(request.delete_data);
        }
        other => panic!("expected a single delete, got {:?}", other),
    }
    assert_eq!(
        sink.messages().last().map(String::as_str),
        Some("Deleted 1 duplicate from STORAGE")
    );
}

#[tokio::test]
async fn test_single_delete_failure_leaves_cache_unchanged() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    backend.single_fails.store(true, Ordering::SeqCst);
    let sink = Arc::new(RecordingSink::default());
    let session = session_with(&backend, &sink);
    session.scan(&storage_scope()).await.unwrap();

    session.toggle("a");
    let err = session.delete_selected(false).await.unwrap_err();
    assert!(matches!(err, Error::Backend { status: 500, .. }));
    assert!(session.contains("a"));
    assert_eq!(session.selected_ids(), vec!["a"]);
    assert!(!sink.messages().iter().any(|m| m.starts_with("Deleted")));
}

#[tokio::test]
async fn test_partial_bulk_failure_drops_every_attempted_id() {
    let mut records = two_records();
    records.push(duplicate("c", DuplicateKind::Text, Some("gamma"), None));
    let backend = Arc::new(FakeBackend::with_records(records));
    backend.set_bulk_response(1, 1);
    let session = DashboardSession::new("user-1", backend.clone(), Arc::new(NullSink));
    session.scan(&storage_scope()).await.unwrap();

    session.toggle("a");
    session.toggle("b");
    let outcome = session.delete_selected(false).await.unwrap();

    assert!(outcome.is_partial());
    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.fail_count, 1);
    assert_eq!(view_ids(&session), vec!["c"]);
    assert_eq!(session.selection_len(), 0);
}

#[tokio::test]
async fn test_bulk_with_no_success_keeps_records_and_selection() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    backend.set_bulk_response(0, 2);
    let sink = Arc::new(RecordingSink::default());
    let session = session_with(&backend, &sink);
    session.scan(&storage_scope()).await.unwrap();

    session.select_all();
    let outcome = session.delete_selected(false).await.unwrap();
    assert_eq!(outcome.fail_count, 2);
    assert!(outcome.removed.is_empty());
    assert_eq!(session.record_count(), 2);
    assert_eq!(session.selection_len(), 2);
    assert!(!sink.messages().iter().any(|m| m.starts_with("Deleted")));
}

#[tokio::test]
async fn test_bulk_transport_failure_leaves_cache_unchanged() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let session = DashboardSession::new("user-1", backend.clone(), Arc::new(NullSink));
    session.scan(&storage_scope()).await.unwrap();

    session.select_all();
    assert!(session.delete_selected(false).await.is_err());
    assert_eq!(session.record_count(), 2);
}

#[tokio::test]
async fn test_delete_with_empty_selection_is_rejected() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let session = DashboardSession::new("user-1", backend.clone(), Arc::new(NullSink));
    session.scan(&storage_scope()).await.unwrap();

    assert!(matches!(
        session.delete_selected(false).await,
        Err(Error::EmptySelection)
    ));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_activity_failures_never_block_the_workflow() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    backend.set_bulk_response(2, 0);
    let sink = Arc::new(RecordingSink::default());
    sink.fail.store(true, Ordering::SeqCst);
    let session = session_with(&backend, &sink);

    assert_eq!(
        session.scan(&storage_scope()).await.unwrap(),
        ScanOutcome::Completed { records: 2 }
    );
    session.select_all();
    assert_eq!(session.delete_selected(false).await.unwrap().success_count, 2);
    assert_eq!(session.record_count(), 0);
}

#[tokio::test]
async fn test_selection_stays_within_cache_across_operations() {
    let mut records = two_records();
    records.push(duplicate("c", DuplicateKind::Text, Some("gamma"), Some(0.9)));
    let backend = Arc::new(FakeBackend::with_records(records));
    backend.set_bulk_response(2, 0);
    let session = DashboardSession::new("user-1", backend.clone(), Arc::new(NullSink));
    session.scan(&storage_scope()).await.unwrap();

    let contained = |session: &DashboardSession| {
        session
            .selected_ids()
            .iter()
            .all(|id| session.contains(id))
    };

    session.toggle("a");
    session.toggle("ghost");
    assert!(contained(&session));

    session.select_all();
    assert!(contained(&session));

    session.toggle("c");
    session.delete_selected(false).await.unwrap();
    assert!(contained(&session));
    assert_eq!(view_ids(&session), vec!["c"]);

    backend.set_scan(FakeScan::Records(vec![duplicate(
        "z",
        DuplicateKind::File,
        None,
        None,
    )]));
    session.toggle("c");
    session.scan(&storage_scope()).await.unwrap();
    assert!(contained(&session));
    assert_eq!(session.selection_len(), 0);
}

#[tokio::test]
async fn test_query_and_selection_accessors() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let session = DashboardSession::new("user-1", backend, Arc::new(NullSink));
    assert_eq!(session.user_id(), "user-1");
    session.scan(&storage_scope()).await.unwrap();

    session.set_search("alpha");
    session.set_sort(SortKey::Service);
    let query = session.query();
    assert_eq!(query.search_text, "alpha");
    assert_eq!(query.sort_key, SortKey::Service);

    session.select_all();
    assert_eq!(session.selection_len(), 1);
    session.clear_selection();
    assert_eq!(session.selection_len(), 0);
}

#[tokio::test]
async fn test_malformed_record_does_not_sink_the_scan() {
    let backend = Arc::new(FakeBackend::default());
    backend.set_scan(FakeScan::Body(
        r#"{
            "status": "success",
            "data": [
                {"$id": "a", "service": "storage", "type": "file", "duplicateId": "f1",
                 "duplicateData": "{\"name\":\"a.png\",\"similarity_score\":0.9}", "status": "active"},
                {"$id": "b", "service": "storage", "type": "file", "duplicateId": "f2"},
                {"$id": "c", "type": "file", "duplicateId": "f3", "status": "active"}
            ]
        }"#
        .to_string(),
    ));
    let session = DashboardSession::new("user-1", backend, Arc::new(NullSink));

    let outcome = session.scan(&storage_scope()).await.unwrap();
    assert_eq!(outcome, ScanOutcome::Completed { records: 2 });
    assert!(session.contains("a"));
    assert!(session.contains("b"));
    assert!(!session.contains("c"));
}

#[tokio::test]
async fn test_repeated_ids_are_deleted_once() {
    let backend = Arc::new(FakeBackend::with_records(two_records()));
    let sink = Arc::new(RecordingSink::default());
    let session = session_with(&backend, &sink);
    session.scan(&storage_scope()).await.unwrap();

    let ids = vec!["a".to_string(), "a".to_string()];
    let outcome = session.delete(&ids, false).await.unwrap();
    assert_eq!(outcome.success_count, 1);
    assert_eq!(view_ids(&session), vec!["b"]);

    match backend.calls().last() {
        Some(Call::DeleteSingle(request)) => assert_eq!(request.duplicate_id, "a"),
        other => panic!("expected a single delete, got {:?}", other),
    }
    assert!(!backend
        .calls()
        .iter()
        .any(|c| matches!(c, Call::DeleteBulk(_))));
    assert_eq!(
        sink.messages().last().map(String::as_str),
        Some("Deleted 1 duplicate from STORAGE")
    );
}
