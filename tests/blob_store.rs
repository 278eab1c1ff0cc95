//! Append-blob store against a fake blob service.

use std::sync::Arc;
use std::time::Duration;

use wiretrail::observability::{self, Destinations, Level, LogEvent, RemoteDestination};
use wiretrail::storage::{
    AppendError, AppendLogSink, AppendStore, BlobStore, RemoteAppendTarget, SinkState, SinkWriter,
    StoreError,
};

mod common;

use common::FakeBlobService;

async fn blob_store(service: &FakeBlobService) -> Arc<BlobStore> {
    let connection = service.start().await;
    Arc::new(BlobStore::from_connection_string(&connection, Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn test_end_to_end_append_log() {
    let service = FakeBlobService::default();
    let store = blob_store(&service).await;
    let sink = Arc::new(AppendLogSink::new(
        store,
        RemoteAppendTarget::new("c1", "2024-01-01-log.txt"),
    ));

    // Not ready yet: refused locally, nothing created remotely.
    assert!(matches!(sink.append("hello").await, Err(AppendError::NotReady)));
    assert!(service.blob("c1", "2024-01-01-log.txt").is_none());
    assert!(service.queries().is_empty());

    assert_eq!(sink.ensure_ready().await.unwrap(), SinkState::Ready);
    assert_eq!(service.blob("c1", "2024-01-01-log.txt").unwrap(), b"");

    sink.append("hello").await.unwrap();
    assert_eq!(service.blob("c1", "2024-01-01-log.txt").unwrap(), b"hello\n");

    let a = tokio::spawn({
        let sink = sink.clone();
        async move { sink.append("world").await }
    });
    let b = tokio::spawn({
        let sink = sink.clone();
        async move { sink.append("world").await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(service.lines("c1", "2024-01-01-log.txt"), ["hello", "world", "world"]);
}

#[tokio::test]
async fn test_existing_container_and_blob_are_reused() {
    let service = FakeBlobService::default();
    let store = blob_store(&service).await;
    let target = RemoteAppendTarget::new("graph-logs", "2024-01-01-http-log.txt");

    let first = AppendLogSink::new(store.clone(), target.clone());
    first.ensure_ready().await.unwrap();
    first.append("from first process").await.unwrap();

    // A second process sees 409 for both resources and still becomes ready.
    let second = AppendLogSink::new(store, target);
    assert_eq!(second.ensure_ready().await.unwrap(), SinkState::Ready);
    second.append("from second process").await.unwrap();

    assert_eq!(
        service.lines("graph-logs", "2024-01-01-http-log.txt"),
        ["from first process", "from second process"]
    );
}

#[tokio::test]
async fn test_requests_carry_sas() {
    let service = FakeBlobService::default();
    let store = blob_store(&service).await;
    let sink = AppendLogSink::new(store, RemoteAppendTarget::new("auth-logs", "log.txt"));

    sink.ensure_ready().await.unwrap();
    sink.append("line").await.unwrap();

    let queries = service.queries();
    assert_eq!(queries.len(), 3);
    assert!(queries.iter().all(|q| q.contains("\"sig\"")));
}

#[tokio::test]
async fn test_append_to_missing_blob_fails_softly() {
    let service = FakeBlobService::default();
    let store = blob_store(&service).await;
    store.create_container_if_not_exists("c1").await.unwrap();

    let err = store
        .append_block(&RemoteAppendTarget::new("c1", "missing.txt"), b"x\n".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_unreachable_service_leaves_sink_uninitialized() {
    let addr = common::closed_port().await;
    let connection = format!("BlobEndpoint=http://{addr}/;SharedAccessSignature=sig=x");
    let store = Arc::new(BlobStore::from_connection_string(&connection, Duration::from_secs(2)).unwrap());
    let sink = AppendLogSink::new(store, RemoteAppendTarget::new("c1", "log.txt"));

    assert!(sink.ensure_ready().await.is_err());
    assert_eq!(sink.state(), SinkState::Uninitialized);
    assert!(matches!(sink.append("dropped").await, Err(AppendError::NotReady)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_stay_intact() {
    let service = FakeBlobService::default();
    let store = blob_store(&service).await;
    let sink = Arc::new(AppendLogSink::new(store, RemoteAppendTarget::new("c1", "log.txt")));
    sink.ensure_ready().await.unwrap();

    let mut handles = Vec::new();
    for worker in 0..8 {
        let sink = sink.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..10 {
                sink.append(&format!("worker-{worker} event-{i} {}", "y".repeat(512)))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let lines = service.lines("c1", "log.txt");
    assert_eq!(lines.len(), 80);
    for line in &lines {
        assert!(line.starts_with("worker-"));
        assert!(line.ends_with(&"y".repeat(512)));
    }
}

#[tokio::test]
async fn test_remote_destination_does_not_log_its_own_traffic() {
    let service = FakeBlobService::default();
    let store = blob_store(&service).await;
    let sink = Arc::new(AppendLogSink::new(
        store,
        RemoteAppendTarget::new("graph-logs", "2024-01-01-http-log.txt"),
    ));
    sink.ensure_ready().await.unwrap();
    let (writer, _task) = SinkWriter::spawn(sink.clone());

    let destinations = Destinations {
        remote: Some(RemoteDestination {
            writer,
            level: Level::Verbose,
        }),
        ..Destinations::default()
    };
    let (subscriber, guard) = observability::build(destinations, Level::Verbose).unwrap();
    // Current-thread runtime: the writer task and the HTTP client it drives
    // run under this default subscriber too.
    let _default = tracing::subscriber::set_default(subscriber);

    observability::emit(&LogEvent::new(Level::Information, "one application event"));
    tokio::time::sleep(Duration::from_millis(500)).await;
    guard.shutdown().await;

    let lines = service.lines("graph-logs", "2024-01-01-http-log.txt");
    assert_eq!(lines.len(), 1, "{lines:#?}");
    assert!(lines[0].ends_with(": Information one application event"));
}
