//! Payloads handed to chain submitters.

use serde::{Deserialize, Serialize};

use crate::audit_path::AuditPath;
use crate::header::RelayHeader;
use crate::keepers::KeeperUpdate;
use crate::params::ToMerkleValue;
use crate::record::TransactionRecord;

/// Everything a destination verifier needs to accept a relayed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBundle {
    /// Header sealing the event (`relay height + 1`).
    pub relay_header: RelayHeader,
    /// Header from an epoch the destination already trusts, when needed.
    pub anchor_header: Option<RelayHeader>,
    /// Audit path linking `relay_header` to `anchor_header`.
    #[serde(default, with = "crate::record::hex_opt")]
    pub inter_epoch_proof: Option<Vec<u8>>,
    pub merkle_value: ToMerkleValue,
    /// Cross-states audit path proving `merkle_value`.
    pub audit_path: AuditPath,
    /// Signatures of the authoritative header, `r || s || v` each.
    #[serde(with = "hex::serde")]
    pub signatures: Vec<u8>,
    /// New keeper set when the relay header rotated the epoch.
    pub keeper_update: Option<KeeperUpdate>,
}

impl ProofBundle {
    /// Header whose signatures the destination checks.
    pub fn authoritative_header(&self) -> &RelayHeader {
        self.anchor_header.as_ref().unwrap_or(&self.relay_header)
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len() / crate::signature::EVM_SIGNATURE_LEN
    }
}

/// Work item for a chain submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Source-originated record with its source inclusion proof, bound for
    /// the relay chain.
    SourceProof(TransactionRecord),
    /// Relay-originated record with its destination proof bundle.
    RelayProof {
        record: TransactionRecord,
        bundle: ProofBundle,
    },
}

impl Message {
    /// Chain the message must be submitted to.
    pub fn target_chain_id(&self, relay_chain_id: u64) -> u64 {
        match self {
            Message::SourceProof(_) => relay_chain_id,
            Message::RelayProof { record, .. } => record.dest_chain_id,
        }
    }

    pub fn record(&self) -> &TransactionRecord {
        match self {
            Message::SourceProof(record) => record,
            Message::RelayProof { record, .. } => record,
        }
    }
}
