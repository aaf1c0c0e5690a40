//! Listener for the relay chain itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use xrelay_types::{Notification, ProofNotification, RelayError, TransactionRecord};

use super::{HeaderBytes, Listener};
use crate::clients::RelayChainClient;
use crate::composer::ProofComposer;
use crate::config::RelayConfig;

pub struct RelayListener {
    config: RelayConfig,
    client: Arc<dyn RelayChainClient>,
    composer: ProofComposer,
}

impl RelayListener {
    pub fn new(config: RelayConfig, client: Arc<dyn RelayChainClient>) -> Self {
        let composer = ProofComposer::new(client.clone(), config.ccm_address.clone());
        Self {
            config,
            client,
            composer,
        }
    }

    fn narrow_height(height: u64) -> Result<u32, RelayError> {
        u32::try_from(height)
            .map_err(|_| RelayError::Configuration(format!("relay height {} overflows u32", height)))
    }

    /// First proof notification in `notifications`, as a relay-originated record.
    fn record_from(
        &self,
        relay_tx_hash: &str,
        relay_height: u32,
        notifications: &[Notification],
    ) -> Option<TransactionRecord> {
        notifications.iter().find_map(|notification| {
            match ProofNotification::parse(notification, &self.config.ccm_address) {
                Ok(Some(proof)) => Some(TransactionRecord::detected_on_relay(
                    proof.from_chain_id,
                    proof.to_chain_id,
                    proof.tx_hash,
                    relay_tx_hash,
                    relay_height,
                    proof.key,
                )),
                Ok(None) => None,
                Err(e) => {
                    warn!("Skipping malformed notification in relay tx {}: {}", relay_tx_hash, e);
                    None
                }
            }
        })
    }
}

#[async_trait]
impl Listener for RelayListener {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn name(&self) -> &str {
        "relay"
    }

    async fn latest_height(&self) -> Result<u64, RelayError> {
        Ok(self.client.height().await? as u64)
    }

    async fn scan(&self, height: u64) -> Result<Vec<TransactionRecord>, RelayError> {
        let height = Self::narrow_height(height)?;
        let events = self.client.events_by_block(height).await?;
        let records: Vec<_> = events
            .iter()
            .filter_map(|event| self.record_from(&event.tx_hash, height, &event.notifications))
            .collect();
        if !records.is_empty() {
            info!("Found {} proof(s) on relay chain at height {}", records.len(), height);
        }
        Ok(records)
    }

    async fn scan_tx(&self, hash: &str) -> Result<Option<TransactionRecord>, RelayError> {
        let height = match self.client.height_by_tx_hash(hash).await {
            Ok(height) => height,
            Err(RelayError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let notifications = self.client.event_by_tx_hash(hash).await?;
        let record = self.record_from(hash, height, &notifications);
        if record.is_none() {
            debug!("relay tx {} carries no proof notification", hash);
        }
        Ok(record)
    }

    async fn compose(&self, record: &TransactionRecord) -> Result<TransactionRecord, RelayError> {
        self.composer.compose(record).await
    }

    async fn header(&self, height: u64) -> Result<HeaderBytes, RelayError> {
        let header = self.client.header_by_height(Self::narrow_height(height)?).await?;
        Ok(HeaderBytes {
            raw: header.raw,
            hash: header.hash.to_vec(),
        })
    }

    fn listen_check(&self) -> Duration {
        super::listen_check_secs(self.config.listen_check_secs)
    }

    fn start_height(&self) -> u64 {
        self.config.start_height
    }
}
