//! Record queue for reliable composition.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::Instant;
use xrelay_types::TransactionRecord;

/// Queued record awaiting composition.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedRecord {
    pub record: TransactionRecord,
    pub retries: u32,
    pub last_error: Option<String>,
    #[serde(skip)]
    ready_at: Instant,
}

impl QueuedRecord {
    pub fn new(record: TransactionRecord) -> Self {
        Self {
            record,
            retries: 0,
            last_error: None,
            ready_at: Instant::now(),
        }
    }
}

/// Create a queue fed by a bounded channel of `capacity` records.
pub fn channel(capacity: usize) -> (mpsc::Sender<QueuedRecord>, RecordQueue) {
    let (sender, receiver) = mpsc::channel(capacity);
    (sender, RecordQueue::new(receiver))
}

/// Record queue with delayed retry support.
///
/// New records arrive through the channel; retries wait in a local deque
/// until their backoff has elapsed and take priority once ready.
pub struct RecordQueue {
    queue: Mutex<VecDeque<QueuedRecord>>,
    receiver: Mutex<mpsc::Receiver<QueuedRecord>>,
    pushed: Notify,
}

impl RecordQueue {
    pub fn new(receiver: mpsc::Receiver<QueuedRecord>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            receiver: Mutex::new(receiver),
            pushed: Notify::new(),
        }
    }

    /// Pop the next record to compose. Returns `None` once the channel is
    /// closed and no retries remain.
    pub async fn pop(&self) -> Option<QueuedRecord> {
        loop {
            let next_ready = {
                let mut queue = self.queue.lock().await;
                let now = Instant::now();
                if let Some(pos) = queue.iter().position(|q| q.ready_at <= now) {
                    return queue.remove(pos);
                }
                queue.iter().map(|q| q.ready_at).min()
            };

            let mut receiver = self.receiver.lock().await;
            let wake = next_ready.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
            tokio::select! {
                item = receiver.recv() => match item {
                    Some(item) => return Some(item),
                    None => {
                        let Some(ready_at) = next_ready else {
                            return None;
                        };
                        drop(receiver);
                        tokio::time::sleep_until(ready_at).await;
                    }
                },
                _ = self.pushed.notified() => {}
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    /// Push a record back for retry after `delay`.
    pub async fn push(&self, mut item: QueuedRecord, delay: Duration) {
        item.retries += 1;
        self.defer(item, delay).await;
    }

    /// Put a record back after `delay` without counting a retry.
    pub async fn defer(&self, mut item: QueuedRecord, delay: Duration) {
        item.ready_at = Instant::now() + delay;
        self.queue.lock().await.push_back(item);
        self.pushed.notify_one();
    }

    /// Number of records waiting for retry.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
