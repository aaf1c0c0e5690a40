//! Cross-chain transaction records.

use serde::{Deserialize, Serialize};

use crate::header::RelayHeader;
use crate::message::ProofBundle;
use crate::params::{MakeTxParam, ToMerkleValue};
use crate::RelayError;

/// Chain a record was first observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    SourceOriginated,
    RelayOriginated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Detected,
    ProofComposed,
}

/// A cross-chain transaction as it moves through the relayer.
///
/// Records are never mutated once a proof is attached; composition returns
/// a fresh record so earlier proofs stay auditable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub kind: TxKind,
    pub status: TxStatus,
    /// Origin chain.
    pub chain_id: u64,
    pub dest_chain_id: u64,
    /// Origin-chain cross-chain id, hex.
    pub tx_id: String,
    /// Origin-chain transaction hash, hex.
    pub tx_hash: String,

    pub relay_tx_hash: Option<String>,
    pub relay_height: Option<u32>,
    /// Cross-states key announced by the relay chain.
    pub relay_key: Option<String>,

    /// Relay height at which the destination's trusted epoch began; 0 means
    /// the destination has not been consulted.
    pub dest_epoch_start_height: u32,
    #[serde(with = "hex::serde")]
    pub dest_keeper_commitment: Vec<u8>,

    pub source_height: u64,
    #[serde(with = "hex::serde")]
    pub source_event: Vec<u8>,
    pub source_proof_height: u64,
    #[serde(default, with = "hex_opt")]
    pub source_proof: Option<Vec<u8>>,

    pub payload: Option<MakeTxParam>,
    pub relay_merkle_value: Option<ToMerkleValue>,
    pub relay_header: Option<RelayHeader>,
    pub anchor_header: Option<RelayHeader>,
    pub bundle: Option<ProofBundle>,
}

impl TransactionRecord {
    /// A record first seen on a source chain.
    pub fn detected_on_source(
        chain_id: u64,
        dest_chain_id: u64,
        tx_id: impl Into<String>,
        tx_hash: impl Into<String>,
        source_height: u64,
        source_event: Vec<u8>,
    ) -> Self {
        Self {
            kind: TxKind::SourceOriginated,
            source_height,
            source_event,
            ..Self::empty(chain_id, dest_chain_id, tx_id.into(), tx_hash.into())
        }
    }

    /// A record first seen on the relay chain.
    pub fn detected_on_relay(
        chain_id: u64,
        dest_chain_id: u64,
        tx_hash: impl Into<String>,
        relay_tx_hash: impl Into<String>,
        relay_height: u32,
        relay_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: TxKind::RelayOriginated,
            relay_tx_hash: Some(relay_tx_hash.into()),
            relay_height: Some(relay_height),
            relay_key: Some(relay_key.into()),
            ..Self::empty(chain_id, dest_chain_id, String::new(), tx_hash.into())
        }
    }

    fn empty(chain_id: u64, dest_chain_id: u64, tx_id: String, tx_hash: String) -> Self {
        Self {
            kind: TxKind::SourceOriginated,
            status: TxStatus::Detected,
            chain_id,
            dest_chain_id,
            tx_id,
            tx_hash,
            relay_tx_hash: None,
            relay_height: None,
            relay_key: None,
            dest_epoch_start_height: 0,
            dest_keeper_commitment: Vec::new(),
            source_height: 0,
            source_event: Vec::new(),
            source_proof_height: 0,
            source_proof: None,
            payload: None,
            relay_merkle_value: None,
            relay_header: None,
            anchor_header: None,
            bundle: None,
        }
    }

    /// Key used to keep at most one composition in flight per transaction.
    pub fn key(&self) -> String {
        match self.kind {
            TxKind::SourceOriginated => format!("src:{}:{}", self.chain_id, self.tx_hash),
            TxKind::RelayOriginated => format!(
                "relay:{}",
                self.relay_tx_hash.as_deref().unwrap_or(&self.tx_hash)
            ),
        }
    }

    pub fn has_proof(&self) -> bool {
        self.source_proof.is_some() || self.bundle.is_some()
    }

    /// Refuse to compose onto a record that already carries a proof.
    pub fn ensure_unproven(&self) -> Result<(), RelayError> {
        if self.has_proof() {
            return Err(RelayError::Configuration(format!(
                "record {} already carries a proof; compose a new record instead",
                self.key()
            )));
        }
        Ok(())
    }

    /// Provenance string for log lines and decode errors.
    pub fn provenance(&self) -> String {
        match (&self.relay_tx_hash, self.relay_height) {
            (Some(hash), Some(height)) => format!("relay tx {} at height {}", hash, height),
            (Some(hash), None) => format!("relay tx {}", hash),
            _ => format!(
                "chain {} tx {} at height {}",
                self.chain_id, self.tx_hash, self.source_height
            ),
        }
    }
}

// Optional bytes as a hex string or null.
pub(crate) mod hex_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
