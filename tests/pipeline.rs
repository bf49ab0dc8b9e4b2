//! End-to-end tests for the dispatch and consume pipeline.
//!
//! These tests run the full record path in-process: records are dispatched
//! over the in-memory transport, consumed by real workers with a stubbed
//! completion backend, and persisted as conversation files.
//!
//! The Redis-backed tests need a live server. Run with:
//! PROFILE_FORGE_TEST_REDIS_URL=redis://localhost:6379/15 cargo test --test pipeline -- --ignored

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{broadcast, Mutex};

use profile_forge::completion::{CompletionBackend, CompletionError};
use profile_forge::dispatch::Dispatcher;
use profile_forge::queue::{queue_name, MemoryTransport, QueueTransport};
use profile_forge::sink::{Conversation, ConversationSink};
use profile_forge::worker::{SharedPoolStats, Worker, WorkerPoolConfig};

const PREFIX: &str = "profiles";

/// Backend that answers every prompt with the same canned analysis.
struct FixedBackend {
    reply: &'static str,
}

#[async_trait]
impl CompletionBackend for FixedBackend {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Ok(self.reply.to_string())
    }
}

/// Backend that records every prompt it sees before answering.
struct RecordingBackend {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionBackend for RecordingBackend {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().await.push(prompt.to_string());
        Ok("{\"confidence_score\": 88}".to_string())
    }
}

/// Backend that fails a fixed number of calls, then succeeds.
struct FlakyBackend {
    failures_left: Mutex<u32>,
}

#[async_trait]
impl CompletionBackend for FlakyBackend {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        let mut failures = self.failures_left.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(CompletionError::RequestFailed(
                "endpoint unreachable".to_string(),
            ));
        }
        Ok("recovered".to_string())
    }
}

fn sample_records(count: usize) -> Vec<serde_json::Value> {
    (0..count)
        .map(|i| serde_json::json!({"position": i, "name": format!("profile-{}", i)}))
        .collect()
}

/// Spawns a worker for one queue with fast test timeouts.
fn spawn_worker(
    queue_index: usize,
    endpoint_id: &str,
    transport: Arc<MemoryTransport>,
    backend: Arc<dyn CompletionBackend>,
    output_dir: &Path,
    shutdown_tx: &broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    let config = WorkerPoolConfig::new(1)
        .with_poll_timeout(Duration::from_millis(20))
        .with_error_backoff(Duration::from_millis(1));

    let worker = Worker::new(
        format!("worker-{}", queue_index),
        queue_name(PREFIX, queue_index),
        endpoint_id.to_string(),
        transport,
        backend,
        ConversationSink::new(output_dir),
        shutdown_tx.subscribe(),
        &config,
        Arc::new(SharedPoolStats::new()),
    );

    tokio::spawn(worker.run())
}

/// Polls until the file exists or the deadline passes.
async fn wait_for_file(path: &Path, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !path.exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting for {}",
            path.display()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn read_conversation(path: &Path) -> Conversation {
    let contents = std::fs::read_to_string(path).expect("conversation file should be readable");
    serde_json::from_str(&contents).expect("conversation file should parse")
}

#[tokio::test]
async fn test_records_flow_from_dispatch_to_conversation_files() {
    let transport = Arc::new(MemoryTransport::new());
    let output = TempDir::new().expect("tempdir");
    let (shutdown_tx, _) = broadcast::channel(1);

    let dispatcher = Dispatcher::new(transport.clone(), PREFIX);
    let report = dispatcher
        .dispatch(sample_records(5), 2)
        .await
        .expect("dispatch");
    assert!(report.is_complete());

    let backend = Arc::new(FixedBackend {
        reply: "analysis complete",
    });
    let handle0 = spawn_worker(
        0,
        "9000",
        Arc::clone(&transport),
        backend.clone(),
        output.path(),
        &shutdown_tx,
    );
    let handle1 = spawn_worker(
        1,
        "9001",
        Arc::clone(&transport),
        backend,
        output.path(),
        &shutdown_tx,
    );

    // Queue 0 got positions 0, 2, 4; queue 1 got 1, 3.
    wait_for_file(&output.path().join("9000_3.json"), Duration::from_secs(5)).await;
    wait_for_file(&output.path().join("9001_2.json"), Duration::from_secs(5)).await;

    shutdown_tx.send(()).expect("send shutdown");
    handle0.await.expect("worker 0 should stop cleanly");
    handle1.await.expect("worker 1 should stop cleanly");

    let first = read_conversation(&output.path().join("9000_1.json"));
    assert_eq!(first.messages.len(), 2);
    assert_eq!(first.messages[0].role, "user");
    assert_eq!(first.messages[1].role, "assistant");
    assert!(first.messages[0].content.contains("profile-0"));
    assert_eq!(first.messages[1].content, "analysis complete");

    // FIFO per queue: the second file on queue 0 holds the record from
    // position 2, not position 4.
    let second = read_conversation(&output.path().join("9000_2.json"));
    assert!(second.messages[0].content.contains("profile-2"));

    let other_queue = read_conversation(&output.path().join("9001_1.json"));
    assert!(other_queue.messages[0].content.contains("profile-1"));
}

#[tokio::test]
async fn test_fifo_order_preserved_within_a_queue() {
    let transport = Arc::new(MemoryTransport::new());
    let output = TempDir::new().expect("tempdir");
    let (shutdown_tx, _) = broadcast::channel(1);

    let dispatcher = Dispatcher::new(transport.clone(), PREFIX);
    dispatcher
        .dispatch(sample_records(4), 1)
        .await
        .expect("dispatch");

    let backend = Arc::new(RecordingBackend {
        prompts: Mutex::new(Vec::new()),
    });
    let recorder = Arc::clone(&backend);
    let handle = spawn_worker(
        0,
        "9000",
        Arc::clone(&transport),
        recorder,
        output.path(),
        &shutdown_tx,
    );

    wait_for_file(&output.path().join("9000_4.json"), Duration::from_secs(5)).await;
    shutdown_tx.send(()).expect("send shutdown");
    handle.await.expect("worker should stop cleanly");

    let prompts = backend.prompts.lock().await;
    assert_eq!(prompts.len(), 4);
    for (i, prompt) in prompts.iter().enumerate() {
        assert!(
            prompt.contains(&format!("profile-{}", i)),
            "Prompt {} should carry the record dispatched at position {}",
            i,
            i
        );
    }
}

#[tokio::test]
async fn test_completion_failure_drops_record_and_reuses_slot() {
    let transport = Arc::new(MemoryTransport::new());
    let output = TempDir::new().expect("tempdir");
    let (shutdown_tx, _) = broadcast::channel(1);

    let dispatcher = Dispatcher::new(transport.clone(), PREFIX);
    dispatcher
        .dispatch(sample_records(2), 1)
        .await
        .expect("dispatch");

    let backend = Arc::new(FlakyBackend {
        failures_left: Mutex::new(1),
    });
    let handle = spawn_worker(
        0,
        "9000",
        Arc::clone(&transport),
        backend,
        output.path(),
        &shutdown_tx,
    );

    // The first record is dropped on the failed completion, so the second
    // record lands in slot 1.
    wait_for_file(&output.path().join("9000_1.json"), Duration::from_secs(5)).await;
    shutdown_tx.send(()).expect("send shutdown");
    handle.await.expect("worker should stop cleanly");

    let saved = read_conversation(&output.path().join("9000_1.json"));
    assert!(saved.messages[0].content.contains("profile-1"));
    assert_eq!(saved.messages[1].content, "recovered");
    assert!(!output.path().join("9000_2.json").exists());
}

#[tokio::test]
async fn test_worker_picks_up_jobs_pushed_after_start() {
    let transport = Arc::new(MemoryTransport::new());
    let output = TempDir::new().expect("tempdir");
    let (shutdown_tx, _) = broadcast::channel(1);

    let backend = Arc::new(FixedBackend {
        reply: "late analysis",
    });
    let handle = spawn_worker(
        0,
        "9000",
        Arc::clone(&transport),
        backend,
        output.path(),
        &shutdown_tx,
    );

    // Let the worker idle through a few empty polls first.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!output.path().join("9000_1.json").exists());

    let dispatcher = Dispatcher::new(transport.clone(), PREFIX);
    dispatcher
        .dispatch(sample_records(1), 1)
        .await
        .expect("dispatch");

    wait_for_file(&output.path().join("9000_1.json"), Duration::from_secs(5)).await;
    shutdown_tx.send(()).expect("send shutdown");
    handle.await.expect("worker should stop cleanly");
}

// ============================================================================
// Redis-backed tests
// ============================================================================

fn redis_test_url() -> String {
    std::env::var("PROFILE_FORGE_TEST_REDIS_URL")
        .expect("PROFILE_FORGE_TEST_REDIS_URL must be set for Redis-backed tests")
}

#[tokio::test]
#[ignore] // Run with: PROFILE_FORGE_TEST_REDIS_URL=... cargo test --test pipeline -- --ignored
async fn test_redis_transport_round_trip() {
    use profile_forge::queue::RedisTransport;

    let transport = RedisTransport::connect(&redis_test_url())
        .await
        .expect("connect");
    let queue = format!("pipeline-test:{}:queue:0", uuid::Uuid::new_v4());

    transport.push(&queue, "first").await.expect("push");
    transport.push(&queue, "second").await.expect("push");
    assert_eq!(transport.len(&queue).await.expect("len"), 2);

    let timeout = Duration::from_secs(1);
    assert_eq!(
        transport.blocking_pop(&queue, timeout).await.expect("pop"),
        Some("first".to_string())
    );
    assert_eq!(
        transport.blocking_pop(&queue, timeout).await.expect("pop"),
        Some("second".to_string())
    );
    assert_eq!(transport.len(&queue).await.expect("len"), 0);
}

#[tokio::test]
#[ignore]
async fn test_dispatch_over_redis_spreads_records() {
    use profile_forge::queue::RedisTransport;

    let transport = Arc::new(
        RedisTransport::connect(&redis_test_url())
            .await
            .expect("connect"),
    );
    let prefix = format!("pipeline-test:{}", uuid::Uuid::new_v4());

    let dispatcher = Dispatcher::new(transport.clone(), prefix.clone());
    let report = dispatcher
        .dispatch(sample_records(5), 2)
        .await
        .expect("dispatch");
    assert!(report.is_complete());

    assert_eq!(transport.len(&queue_name(&prefix, 0)).await.expect("len"), 3);
    assert_eq!(transport.len(&queue_name(&prefix, 1)).await.expect("len"), 2);

    // Drain the test queues so reruns start clean.
    for index in 0..2 {
        let queue = queue_name(&prefix, index);
        while transport
            .blocking_pop(&queue, Duration::from_secs(1))
            .await
            .expect("pop")
            .is_some()
        {}
    }
}
