//! Listener for EVM-family source chains.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha3::{Digest, Keccak256};
use tracing::{debug, info};
use xrelay_types::{MakeTxParam, RelayError, TransactionRecord, TxStatus};

use super::{HeaderBytes, Listener};
use crate::clients::SourceChainClient;
use crate::config::SourceConfig;

/// Storage slot of the cross-chain data contract's request mapping.
const REQUEST_MAPPING_SLOT: u8 = 0x01;

/// Storage key of the request recorded for `tx_id`:
/// `keccak256(leftpad32(tx_id) || leftpad32(slot))`.
pub fn storage_key(tx_id: &[u8]) -> Result<[u8; 32], RelayError> {
    if tx_id.len() > 32 {
        return Err(RelayError::Configuration(format!(
            "cross-chain id of {} bytes does not fit a storage word",
            tx_id.len()
        )));
    }
    let mut preimage = [0u8; 64];
    preimage[32 - tx_id.len()..32].copy_from_slice(tx_id);
    preimage[63] = REQUEST_MAPPING_SLOT;
    Ok(Keccak256::digest(preimage).into())
}

pub struct EvmListener {
    config: SourceConfig,
    client: Arc<dyn SourceChainClient>,
}

impl EvmListener {
    pub fn new(config: SourceConfig, client: Arc<dyn SourceChainClient>) -> Self {
        Self { config, client }
    }

    fn record_from_event(
        &self,
        event: crate::clients::SourceEvent,
    ) -> Result<TransactionRecord, RelayError> {
        let param = MakeTxParam::decode(&event.raw_param).map_err(|e| {
            RelayError::decode(
                format!(
                    "cross-chain param of chain {} tx {} at height {}",
                    self.config.chain_id, event.tx_hash, event.height
                ),
                e,
            )
        })?;
        if param.to_chain_id != event.to_chain_id {
            return Err(RelayError::decode(
                format!("chain {} tx {}", self.config.chain_id, event.tx_hash),
                format!(
                    "event targets chain {} but param targets {}",
                    event.to_chain_id, param.to_chain_id
                ),
            ));
        }

        let mut record = TransactionRecord::detected_on_source(
            self.config.chain_id,
            event.to_chain_id,
            hex::encode(&event.tx_id),
            event.tx_hash,
            event.height,
            event.raw_param,
        );
        record.payload = Some(param);
        Ok(record)
    }
}

#[async_trait]
impl Listener for EvmListener {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn latest_height(&self) -> Result<u64, RelayError> {
        self.client.height().await
    }

    async fn scan(&self, height: u64) -> Result<Vec<TransactionRecord>, RelayError> {
        let events = self.client.filter_events(height, height).await?;
        let records = events
            .into_iter()
            .map(|event| self.record_from_event(event))
            .collect::<Result<Vec<_>, _>>()?;
        if !records.is_empty() {
            info!(
                "Found {} cross-chain tx(s) on {} at height {}",
                records.len(),
                self.config.name,
                height
            );
        }
        Ok(records)
    }

    async fn scan_tx(&self, hash: &str) -> Result<Option<TransactionRecord>, RelayError> {
        Err(RelayError::Unsupported(format!(
            "{} cannot look up tx {} by hash",
            self.config.name, hash
        )))
    }

    async fn compose(&self, record: &TransactionRecord) -> Result<TransactionRecord, RelayError> {
        record.ensure_unproven()?;
        if record.source_height == 0 {
            return Err(RelayError::Configuration(format!(
                "record {} has no source height",
                record.key()
            )));
        }
        if record.tx_id.is_empty() || record.source_event.is_empty() {
            return Err(RelayError::Configuration(format!(
                "record {} has no cross-chain id or source event",
                record.key()
            )));
        }

        let tx_id = hex::decode(record.tx_id.trim_start_matches("0x"))
            .map_err(|e| RelayError::decode(format!("cross-chain id of {}", record.provenance()), e))?;
        let key = storage_key(&tx_id)?;

        let latest = self.client.height().await?;
        let proof_height = latest.saturating_sub(self.config.confirmations);
        if record.source_height >= proof_height {
            return Err(RelayError::ProofUnavailable(format!(
                "{} tx {} at height {} not yet confirmed (proof height {})",
                self.config.name, record.tx_hash, record.source_height, proof_height
            )));
        }

        let proof = self.client.proof(&key, proof_height).await?;
        debug!(
            "fetched {} byte storage proof for {} at height {}",
            proof.len(),
            record.provenance(),
            proof_height
        );

        Ok(TransactionRecord {
            status: TxStatus::ProofComposed,
            source_proof_height: proof_height,
            source_proof: Some(proof),
            ..record.clone()
        })
    }

    async fn header(&self, height: u64) -> Result<HeaderBytes, RelayError> {
        let header = self.client.header(height).await?;
        Ok(HeaderBytes {
            raw: header.raw,
            hash: header.hash,
        })
    }

    fn listen_check(&self) -> Duration {
        super::listen_check_secs(self.config.listen_check_secs)
    }

    fn defer(&self) -> u64 {
        self.config.defer
    }

    fn start_height(&self) -> u64 {
        self.config.start_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_pads_both_words() {
        let key = storage_key(&[0xab, 0xcd]).unwrap();
        let mut preimage = vec![0u8; 30];
        preimage.extend_from_slice(&[0xab, 0xcd]);
        preimage.extend_from_slice(&[0u8; 31]);
        preimage.push(1);
        let expected: [u8; 32] = Keccak256::digest(&preimage).into();
        assert_eq!(key, expected);
    }

    #[test]
    fn test_storage_key_rejects_oversized_id() {
        assert!(storage_key(&[0u8; 32]).is_ok());
        assert!(matches!(
            storage_key(&[0u8; 33]),
            Err(RelayError::Configuration(_))
        ));
    }
}
