//! Collaborator interfaces for chain access.
//!
//! Implementations live outside this crate. Every call is an idempotent read
//! (or a submission handled by [`crate::submitters`]) and reports a
//! classified [`RelayError`]: `NotFound` for data the chain does not have,
//! `TransientNetwork` for anything else that failed on the way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use xrelay_types::{Notification, RelayError, RelayEvent, RelayHeader};

/// Cross-chain event as emitted by a source chain's cross-chain manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEvent {
    /// Source transaction hash, hex.
    pub tx_hash: String,
    /// Cross-chain id assigned by the source contract.
    #[serde(with = "hex::serde")]
    pub tx_id: Vec<u8>,
    pub to_chain_id: u64,
    /// Serialized `MakeTxParam`.
    #[serde(with = "hex::serde")]
    pub raw_param: Vec<u8>,
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHeader {
    #[serde(with = "hex::serde")]
    pub raw: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub hash: Vec<u8>,
    pub height: u64,
}

/// Access to a source chain.
#[async_trait]
pub trait SourceChainClient: Send + Sync {
    /// Latest block height.
    async fn height(&self) -> Result<u64, RelayError>;

    async fn header(&self, height: u64) -> Result<SourceHeader, RelayError>;

    /// Storage proof for `storage_key` in the cross-chain data contract at `height`.
    async fn proof(&self, storage_key: &[u8], height: u64) -> Result<Vec<u8>, RelayError>;

    /// Cross-chain events in `[from_height, to_height]`.
    async fn filter_events(
        &self,
        from_height: u64,
        to_height: u64,
    ) -> Result<Vec<SourceEvent>, RelayError>;
}

/// Access to the relay chain.
#[async_trait]
pub trait RelayChainClient: Send + Sync {
    /// Latest block height.
    async fn height(&self) -> Result<u32, RelayError>;

    /// Height of the block containing `hash`; `NotFound` if unknown.
    async fn height_by_tx_hash(&self, hash: &str) -> Result<u32, RelayError>;

    async fn header_by_height(&self, height: u32) -> Result<RelayHeader, RelayError>;

    /// Audit path proving the block root at `from_height` under the header at `to_height`.
    async fn merkle_proof(&self, from_height: u32, to_height: u32) -> Result<Vec<u8>, RelayError>;

    async fn event_by_tx_hash(&self, hash: &str) -> Result<Vec<Notification>, RelayError>;

    async fn events_by_block(&self, height: u32) -> Result<Vec<RelayEvent>, RelayError>;

    /// Audit path for the cross-states entry `key` recorded at `height`.
    async fn cross_states_proof(&self, height: u32, key: &str) -> Result<Vec<u8>, RelayError>;
}

/// Epoch a destination chain currently trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochAnchor {
    /// Relay height at which the trusted keeper set took over.
    pub start_height: u32,
    #[serde(with = "hex::serde")]
    pub keeper_commitment: Vec<u8>,
}

/// Destination-side view of the relay chain's epochs.
#[async_trait]
pub trait EpochProvider: Send + Sync {
    async fn epoch_anchor(&self, chain_id: u64) -> Result<EpochAnchor, RelayError>;
}
