//! Per-chain scan loops and composition workers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use xrelay_types::{Message, RelayError, TransactionRecord, TxKind};

use crate::clients::EpochProvider;
use crate::config::QueueConfig;
use crate::inflight::InFlight;
use crate::listeners::Listener;
use crate::queue::{self, QueuedRecord, RecordQueue};
use crate::submitters::SubmitterSet;

/// Delay before re-checking a record another worker is composing.
const IN_FLIGHT_RECHECK: Duration = Duration::from_millis(200);

/// What happened to one queued record.
#[derive(Debug)]
pub enum Outcome {
    /// Composed and submitted; carries the submission hash.
    Submitted(String),
    /// Re-queued after a retryable failure.
    Retrying { retries: u32, delay: Duration },
    /// Another worker holds the record; put back without counting a retry.
    Deferred,
    /// Dropped for good.
    Dropped(String),
}

/// Whether the shutdown flag is raised or its sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) -> bool {
    match shutdown.changed().await {
        Ok(()) => *shutdown.borrow(),
        Err(_) => true,
    }
}

/// Scan `listener` block by block, handing records to `sender`.
///
/// A failed scan retries the same height after `listen_check`; the cursor
/// only advances past a height once all of its records were queued.
/// Returns the next height that would have been scanned.
pub async fn scan_loop(
    listener: Arc<dyn Listener>,
    sender: mpsc::Sender<QueuedRecord>,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut height = listener.start_height();
    info!("Starting {} listener at height {}", listener.name(), height);

    loop {
        if *shutdown.borrow() || sender.is_closed() {
            break;
        }

        let progressed = match scan_once(listener.as_ref(), &mut height, &sender).await {
            Ok(progressed) => progressed,
            Err(e) => {
                warn!("Failed to scan {} at height {}: {}", listener.name(), height, e);
                false
            }
        };
        if progressed {
            continue;
        }

        tokio::select! {
            _ = tokio::time::sleep(listener.listen_check()) => {}
            stop = shutdown_requested(&mut shutdown) => {
                if stop {
                    break;
                }
            }
        }
    }

    info!("Stopped {} listener at height {}", listener.name(), height);
    height
}

async fn scan_once(
    listener: &dyn Listener,
    height: &mut u64,
    sender: &mpsc::Sender<QueuedRecord>,
) -> Result<bool, RelayError> {
    let latest = listener.latest_height().await?;
    if *height == 0 {
        *height = latest;
    }
    if height.saturating_add(listener.defer()) > latest {
        return Ok(false);
    }

    let records = listener.scan(*height).await?;
    debug!("{} height {}: {} record(s)", listener.name(), height, records.len());
    for record in records {
        sender
            .send(QueuedRecord::new(record))
            .await
            .map_err(|_| RelayError::Configuration("record queue closed".into()))?;
    }
    *height += 1;
    Ok(true)
}

/// The relayer: listeners feeding composition workers feeding submitters.
pub struct RelayerService {
    relay_chain_id: u64,
    queue_config: QueueConfig,
    relay: Arc<dyn Listener>,
    sources: HashMap<u64, Arc<dyn Listener>>,
    epochs: Arc<dyn EpochProvider>,
    submitters: SubmitterSet,
    inflight: InFlight,
}

impl RelayerService {
    pub fn new(
        relay: Arc<dyn Listener>,
        epochs: Arc<dyn EpochProvider>,
        submitters: SubmitterSet,
        queue_config: QueueConfig,
    ) -> Self {
        Self {
            relay_chain_id: relay.chain_id(),
            queue_config,
            relay,
            sources: HashMap::new(),
            epochs,
            submitters,
            inflight: InFlight::new(),
        }
    }

    pub fn with_source(mut self, listener: Arc<dyn Listener>) -> Self {
        self.sources.insert(listener.chain_id(), listener);
        self
    }

    pub fn inflight(&self) -> &InFlight {
        &self.inflight
    }

    /// Listener able to compose `record`.
    fn listener_for(&self, record: &TransactionRecord) -> Result<&Arc<dyn Listener>, RelayError> {
        match record.kind {
            TxKind::RelayOriginated => Ok(&self.relay),
            TxKind::SourceOriginated => self.sources.get(&record.chain_id).ok_or_else(|| {
                RelayError::Configuration(format!("no listener for chain {}", record.chain_id))
            }),
        }
    }

    /// Fill in what the destination currently trusts.
    async fn with_epoch(&self, mut record: TransactionRecord) -> Result<TransactionRecord, RelayError> {
        if record.kind == TxKind::RelayOriginated && record.dest_epoch_start_height == 0 {
            let anchor = self.epochs.epoch_anchor(record.dest_chain_id).await?;
            debug!(
                "chain {} trusts epoch starting at {}",
                record.dest_chain_id, anchor.start_height
            );
            record.dest_epoch_start_height = anchor.start_height;
            record.dest_keeper_commitment = anchor.keeper_commitment;
        }
        Ok(record)
    }

    fn is_retryable(&self, err: &RelayError) -> bool {
        err.is_retryable()
            || (self.queue_config.retry_not_found && matches!(err, RelayError::NotFound(_)))
    }

    async fn compose(&self, record: &TransactionRecord) -> Result<Message, RelayError> {
        let record = self.with_epoch(record.clone()).await?;
        let composed = self.listener_for(&record)?.compose(&record).await?;
        match composed.kind {
            TxKind::SourceOriginated => Ok(Message::SourceProof(composed)),
            TxKind::RelayOriginated => {
                let bundle = composed.bundle.clone().ok_or_else(|| {
                    RelayError::Configuration(format!("{} composed without a bundle", composed.key()))
                })?;
                Ok(Message::RelayProof {
                    record: composed,
                    bundle,
                })
            }
        }
    }

    async fn retry(&self, queue: &RecordQueue, mut item: QueuedRecord, reason: String) -> Outcome {
        if item.retries >= self.queue_config.max_retries {
            error!(
                "Giving up on {} after {} retries: {}",
                item.record.key(),
                item.retries,
                reason
            );
            return Outcome::Dropped(reason);
        }
        let retries = item.retries + 1;
        let delay = self.queue_config.backoff(retries);
        warn!(
            "Retrying {} in {:?} (attempt {}): {}",
            item.record.key(),
            delay,
            retries,
            reason
        );
        item.last_error = Some(reason);
        queue.push(item, delay).await;
        Outcome::Retrying { retries, delay }
    }

    /// Compose and submit one record, re-queueing it when appropriate.
    pub async fn process(&self, item: QueuedRecord, queue: &RecordQueue) -> Outcome {
        let key = item.record.key();
        let Some(_guard) = self.inflight.try_acquire(key.clone()) else {
            debug!("{} already in flight, deferring", key);
            queue.defer(item, IN_FLIGHT_RECHECK).await;
            return Outcome::Deferred;
        };

        let message = match self.compose(&item.record).await {
            Ok(message) => message,
            Err(e) if self.is_retryable(&e) => return self.retry(queue, item, e.to_string()).await,
            Err(e) => {
                error!("Dropping {}: {}", item.record.provenance(), e);
                return Outcome::Dropped(e.to_string());
            }
        };

        match self.submitters.submit(&message).await {
            Ok(hash) => {
                info!(
                    "Submitted {} to chain {}: {}",
                    key,
                    message.target_chain_id(self.relay_chain_id),
                    hash
                );
                Outcome::Submitted(hash)
            }
            Err(e) => self.retry(queue, item, format!("submission failed: {:#}", e)).await,
        }
    }

    async fn worker(self: Arc<Self>, id: usize, queue: Arc<RecordQueue>, mut shutdown: watch::Receiver<bool>) {
        debug!("composition worker {} started", id);
        loop {
            if *shutdown.borrow() {
                break;
            }
            let item = tokio::select! {
                item = queue.pop() => match item {
                    Some(item) => item,
                    None => break,
                },
                stop = shutdown_requested(&mut shutdown) => {
                    if stop {
                        break;
                    }
                    continue;
                }
            };
            tokio::select! {
                outcome = self.process(item, &queue) => debug!("worker {}: {:?}", id, outcome),
                stop = shutdown_requested(&mut shutdown) => {
                    if stop {
                        break;
                    }
                }
            }
        }
        debug!("composition worker {} stopped", id);
    }

    /// Run every scan loop and worker until `shutdown` is raised.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        for (chain, healthy) in self.submitters.health().await {
            if !healthy {
                warn!("Submitter for {} is unhealthy", chain);
            }
        }

        let (sender, queue) = queue::channel(self.queue_config.capacity);
        let queue = Arc::new(queue);
        let mut handles = Vec::new();

        for listener in std::iter::once(&self.relay).chain(self.sources.values()) {
            let listener = Arc::clone(listener);
            let sender = sender.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                scan_loop(listener, sender, shutdown).await;
            }));
        }
        drop(sender);

        for id in 0..self.queue_config.workers {
            handles.push(tokio::spawn(Arc::clone(&self).worker(
                id,
                Arc::clone(&queue),
                shutdown.clone(),
            )));
        }

        info!(
            "Relayer running: {} source chain(s), {} worker(s)",
            self.sources.len(),
            self.queue_config.workers
        );

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("Relayer task failed: {}", e);
            }
        }
        info!("Relayer stopped");
    }
}
