//! End-to-end pipeline tests against in-memory queue and store fakes.
//!
//! The real consumer loop, service, and processor run unchanged; only the
//! external collaborators (SQS, S3) are substituted.

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thumbnail_worker::config::OutputConfig;
use thumbnail_worker::error::{Result, WorkerError};
use thumbnail_worker::queue::{NotificationQueue, QueuedNotification};
use thumbnail_worker::services::thumbnail::{
    ConsumerConfig, NotificationConsumer, RedeliveryPolicy, ThumbnailConfig, ThumbnailService,
};
use thumbnail_worker::storage::ObjectStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    uploads: Mutex<Vec<(String, String)>>,
    download_attempts: Mutex<u32>,
}

impl MemoryStore {
    fn put(&self, bucket: &str, key: &str, data: Bytes) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }

    fn download_attempts(&self) -> u32 {
        *self.download_attempts.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, bucket: &str, key: &str) -> Result<Bytes> {
        *self.download_attempts.lock().unwrap() += 1;
        self.get(bucket, key)
            .ok_or_else(|| WorkerError::ObjectNotFound(format!("{bucket}/{key}")))
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<()> {
        self.put(bucket, key, data);
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct MemoryQueue {
    pending: Mutex<VecDeque<QueuedNotification>>,
    acknowledged: Mutex<Vec<String>>,
    dead_lettered: Mutex<Vec<String>>,
}

impl MemoryQueue {
    fn push(&self, notification: QueuedNotification) {
        self.pending.lock().unwrap().push_back(notification);
    }

    fn pending_empty(&self) -> bool {
        self.pending.lock().unwrap().is_empty()
    }

    fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }

    fn dead_lettered(&self) -> Vec<String> {
        self.dead_lettered.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationQueue for MemoryQueue {
    async fn receive(&self) -> Result<Vec<QueuedNotification>> {
        let batch: Vec<QueuedNotification> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain(..).collect()
        };
        if batch.is_empty() {
            // emulate long-poll on an empty queue
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(batch)
    }

    async fn acknowledge(&self, receipt: &str) -> Result<()> {
        self.acknowledged.lock().unwrap().push(receipt.to_string());
        Ok(())
    }

    async fn dead_letter(&self, notification: &QueuedNotification) -> Result<()> {
        self.dead_lettered
            .lock()
            .unwrap()
            .push(notification.body.clone());
        self.acknowledge(&notification.receipt).await
    }
}

fn event_body(bucket: &str, key: &str) -> String {
    format!(
        r#"{{"Records":[{{"s3":{{"bucket":{{"name":"{bucket}"}},"object":{{"key":"{key}"}}}}}}]}}"#
    )
}

fn notification(id: &str, body: String, receive_count: u32) -> QueuedNotification {
    QueuedNotification {
        message_id: Some(id.to_string()),
        body,
        receipt: format!("rcpt-{id}"),
        receive_count,
    }
}

fn jpeg_bytes(width: u32, height: u32) -> Bytes {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(90))
        .expect("encode test image");
    Bytes::from(buf)
}

fn spawn_consumer(
    queue: &Arc<MemoryQueue>,
    store: &Arc<MemoryStore>,
    max_receive_count: u32,
) -> (watch::Sender<bool>, JoinHandle<Result<()>>) {
    let service = Arc::new(ThumbnailService::new(
        Arc::clone(store),
        ThumbnailConfig::default(),
        OutputConfig {
            destination_bucket: None,
            destination_folder: "Processed".to_string(),
            filename_prefix: "tb-".to_string(),
        },
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let config = ConsumerConfig {
        concurrency: 2,
        poll_backoff: Duration::from_millis(10),
        redelivery: RedeliveryPolicy { max_receive_count },
    };
    let mut consumer =
        NotificationConsumer::new(Arc::clone(queue), service, config, shutdown_rx);
    let handle = tokio::spawn(async move { consumer.run().await });
    (shutdown_tx, handle)
}

async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached within deadline"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Drive the consumer until the queue is drained, then shut down gracefully.
/// `run` only returns after in-flight notifications finish, so all effects
/// are settled when this returns.
async fn drain_and_stop(
    queue: &Arc<MemoryQueue>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<()>>,
) {
    wait_until(|| queue.pending_empty()).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn processes_notification_end_to_end() {
    let store = Arc::new(MemoryStore::default());
    store.put("photos", "uploads/cat.jpg", jpeg_bytes(800, 600));
    let queue = Arc::new(MemoryQueue::default());
    queue.push(notification("m1", event_body("photos", "uploads/cat.jpg"), 1));

    let (shutdown_tx, handle) = spawn_consumer(&queue, &store, 5);
    drain_and_stop(&queue, shutdown_tx, handle).await;

    // Notification acknowledged only after the thumbnail landed.
    assert_eq!(queue.acknowledged(), vec!["rcpt-m1".to_string()]);
    assert!(queue.dead_lettered().is_empty());

    let thumb = store
        .get("photos", "Processed/tb-cat.jpg")
        .expect("thumbnail uploaded");
    let img = image::load_from_memory(&thumb).unwrap();
    assert_eq!(img.dimensions(), (100, 75));
}

#[tokio::test]
async fn malformed_notification_is_left_on_queue() {
    let store = Arc::new(MemoryStore::default());
    let queue = Arc::new(MemoryQueue::default());
    queue.push(notification("m1", r#"{"foo": 1}"#.to_string(), 1));

    let (shutdown_tx, handle) = spawn_consumer(&queue, &store, 5);
    drain_and_stop(&queue, shutdown_tx, handle).await;

    // Nothing fetched, nothing uploaded, nothing acknowledged.
    assert_eq!(store.download_attempts(), 0);
    assert!(store.uploads().is_empty());
    assert!(queue.acknowledged().is_empty());
}

#[tokio::test]
async fn missing_object_leaves_message_and_loop_continues() {
    let store = Arc::new(MemoryStore::default());
    store.put("photos", "uploads/ok.jpg", jpeg_bytes(800, 600));
    let queue = Arc::new(MemoryQueue::default());
    queue.push(notification("bad", event_body("photos", "uploads/gone.jpg"), 1));
    queue.push(notification("good", event_body("photos", "uploads/ok.jpg"), 1));

    let (shutdown_tx, handle) = spawn_consumer(&queue, &store, 5);
    drain_and_stop(&queue, shutdown_tx, handle).await;

    // The failed fetch did not stop the loop from handling the next message.
    assert_eq!(store.download_attempts(), 2);
    assert_eq!(queue.acknowledged(), vec!["rcpt-good".to_string()]);
    assert!(store.get("photos", "Processed/tb-ok.jpg").is_some());
    assert!(store.get("photos", "Processed/tb-gone.jpg").is_none());
}

#[tokio::test]
async fn redelivered_notification_overwrites_same_target_key() {
    let store = Arc::new(MemoryStore::default());
    store.put("photos", "uploads/cat.jpg", jpeg_bytes(800, 600));
    let queue = Arc::new(MemoryQueue::default());
    queue.push(notification("m1", event_body("photos", "uploads/cat.jpg"), 1));
    queue.push(notification("m2", event_body("photos", "uploads/cat.jpg"), 2));

    let (shutdown_tx, handle) = spawn_consumer(&queue, &store, 5);
    drain_and_stop(&queue, shutdown_tx, handle).await;

    let mut acknowledged = queue.acknowledged();
    acknowledged.sort();
    assert_eq!(
        acknowledged,
        vec!["rcpt-m1".to_string(), "rcpt-m2".to_string()]
    );

    // Both uploads targeted the same key: overwrite, not duplicate.
    let uploads = store.uploads();
    assert_eq!(uploads.len(), 2);
    assert!(uploads
        .iter()
        .all(|(bucket, key)| bucket == "photos" && key == "Processed/tb-cat.jpg"));
}

#[tokio::test]
async fn exhausted_notification_is_dead_lettered_without_processing() {
    let store = Arc::new(MemoryStore::default());
    store.put("photos", "uploads/poison.jpg", jpeg_bytes(800, 600));
    let queue = Arc::new(MemoryQueue::default());
    let body = event_body("photos", "uploads/poison.jpg");
    queue.push(notification("m1", body.clone(), 6));

    let (shutdown_tx, handle) = spawn_consumer(&queue, &store, 5);
    drain_and_stop(&queue, shutdown_tx, handle).await;

    assert_eq!(queue.dead_lettered(), vec![body]);
    assert_eq!(store.download_attempts(), 0);
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn notification_at_the_bound_is_still_processed() {
    let store = Arc::new(MemoryStore::default());
    store.put("photos", "uploads/cat.jpg", jpeg_bytes(800, 600));
    let queue = Arc::new(MemoryQueue::default());
    queue.push(notification("m1", event_body("photos", "uploads/cat.jpg"), 5));

    let (shutdown_tx, handle) = spawn_consumer(&queue, &store, 5);
    drain_and_stop(&queue, shutdown_tx, handle).await;

    assert!(queue.dead_lettered().is_empty());
    assert_eq!(queue.acknowledged(), vec!["rcpt-m1".to_string()]);
}

#[tokio::test]
async fn shutdown_with_empty_queue_exits_cleanly() {
    let store = Arc::new(MemoryStore::default());
    let queue = Arc::new(MemoryQueue::default());

    let (shutdown_tx, handle) = spawn_consumer(&queue, &store, 5);
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert!(queue.acknowledged().is_empty());
    assert!(store.uploads().is_empty());
}
