//! Relay-side proof composition.
//!
//! Composition is a small state machine. Each state owns its data and is
//! consumed by [`ComposeState::advance`], so a dropped future never leaves
//! a half-updated record behind: the caller only sees the new record once
//! the bundle is complete.
//!
//! ```text
//! NeedHeight -> FetchHeader -> DetermineAnchor -> [FetchAnchor] -> ExtractValue -> BundleReady
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};
use xrelay_types::keepers::{is_new_epoch, KeeperUpdate};
use xrelay_types::signature::convert_all;
use xrelay_types::{
    AuditPath, ProofBundle, ProofNotification, RelayError, RelayHeader, ToMerkleValue,
    TransactionRecord, TxStatus,
};

use crate::clients::RelayChainClient;

/// Whether the destination needs an anchor header to trust the relay header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorDecision {
    NotNeeded,
    At(u32),
}

impl AnchorDecision {
    pub fn height(&self) -> Option<u32> {
        match self {
            AnchorDecision::NotNeeded => None,
            AnchorDecision::At(height) => Some(*height),
        }
    }
}

/// Decide the anchor for an event at `relay_height`.
///
/// `header` is the header at `relay_height + 1`. Events before the
/// destination's epoch start (strictly) anchor at `epoch_start + 1`. Events
/// inside it anchor at `relay_height + 2` only if `header` rotates the
/// keeper set; `relay_height + 1` is the header being proven, never the
/// anchor.
pub fn decide_anchor(
    relay_height: u32,
    epoch_start: u32,
    header: &RelayHeader,
    known_commitment: &[u8],
) -> Result<(AnchorDecision, Option<KeeperUpdate>), RelayError> {
    if epoch_start == 0 {
        return Err(RelayError::Configuration(
            "destination epoch start height not specified".into(),
        ));
    }

    if relay_height < epoch_start {
        let anchor = checked_height(epoch_start, 1)?;
        return Ok((AnchorDecision::At(anchor), None));
    }

    if known_commitment.is_empty() {
        return Err(RelayError::Configuration(
            "destination keeper commitment not provided".into(),
        ));
    }
    if header.is_epoch_terminal() {
        return Ok((AnchorDecision::NotNeeded, None));
    }

    let keepers = header.announced_keepers()?.ok_or_else(|| {
        RelayError::decode(
            format!("header at height {}", header.height),
            "next keeper set without chain config",
        )
    })?;
    let update = keepers.update()?;

    if is_new_epoch(&update.commitment, known_commitment)? {
        let anchor = checked_height(relay_height, 2)?;
        Ok((AnchorDecision::At(anchor), Some(update)))
    } else {
        Ok((AnchorDecision::NotNeeded, None))
    }
}

fn checked_height(height: u32, delta: u32) -> Result<u32, RelayError> {
    height
        .checked_add(delta)
        .ok_or_else(|| RelayError::Configuration(format!("relay height {} overflows", height)))
}

/// Header plus whatever anchor material the destination needs.
#[derive(Debug, Clone)]
pub struct Anchored {
    pub header: RelayHeader,
    pub anchor: Option<RelayHeader>,
    pub inter_epoch_proof: Option<Vec<u8>>,
    pub keeper_update: Option<KeeperUpdate>,
}

/// One step of the composition state machine.
#[derive(Debug, Clone)]
pub enum ComposeState {
    NeedHeight {
        record: TransactionRecord,
    },
    FetchHeader {
        record: TransactionRecord,
        relay_height: u32,
    },
    DetermineAnchor {
        record: TransactionRecord,
        relay_height: u32,
        chain_height: u32,
        header: RelayHeader,
    },
    FetchAnchor {
        record: TransactionRecord,
        relay_height: u32,
        chain_height: u32,
        header: RelayHeader,
        anchor_height: u32,
        keeper_update: Option<KeeperUpdate>,
    },
    ExtractValue {
        record: TransactionRecord,
        relay_height: u32,
        anchored: Anchored,
    },
    BundleReady {
        record: TransactionRecord,
    },
}

impl ComposeState {
    pub fn name(&self) -> &'static str {
        match self {
            ComposeState::NeedHeight { .. } => "need_height",
            ComposeState::FetchHeader { .. } => "fetch_header",
            ComposeState::DetermineAnchor { .. } => "determine_anchor",
            ComposeState::FetchAnchor { .. } => "fetch_anchor",
            ComposeState::ExtractValue { .. } => "extract_value",
            ComposeState::BundleReady { .. } => "bundle_ready",
        }
    }
}

/// Builds destination proof bundles from relay-chain data.
#[derive(Clone)]
pub struct ProofComposer {
    relay: Arc<dyn RelayChainClient>,
    ccm_address: String,
}

impl ProofComposer {
    /// `ccm_address` is the relay chain's cross-chain manager contract, whose
    /// `makeProof` notifications carry the committed values.
    pub fn new(relay: Arc<dyn RelayChainClient>, ccm_address: impl Into<String>) -> Self {
        Self {
            relay,
            ccm_address: ccm_address.into(),
        }
    }

    /// Compose a bundle for `record`, returning a new record with the bundle
    /// attached. `record` itself is left untouched.
    pub async fn compose(&self, record: &TransactionRecord) -> Result<TransactionRecord, RelayError> {
        record.ensure_unproven()?;
        if record.relay_tx_hash.as_deref().map_or(true, str::is_empty) {
            return Err(RelayError::Configuration(format!(
                "record {} has no relay-chain hash",
                record.key()
            )));
        }
        if record.dest_epoch_start_height == 0 {
            return Err(RelayError::Configuration(format!(
                "destination chain {} epoch start height not specified",
                record.dest_chain_id
            )));
        }

        let mut state = ComposeState::NeedHeight {
            record: record.clone(),
        };
        loop {
            debug!(state = state.name(), "composing {}", record.key());
            state = match state {
                ComposeState::BundleReady { record } => return Ok(record),
                other => self.advance(other).await?,
            };
        }
    }

    /// Run one transition.
    pub async fn advance(&self, state: ComposeState) -> Result<ComposeState, RelayError> {
        match state {
            ComposeState::NeedHeight { record } => {
                let relay_height = match record.relay_height {
                    Some(height) => height,
                    None => {
                        let hash = relay_hash(&record)?;
                        let height = self.relay.height_by_tx_hash(hash).await.map_err(|e| match e {
                            RelayError::NotFound(_) => {
                                RelayError::NotFound(format!("relay tx {} not found", hash))
                            }
                            other => other,
                        })?;
                        debug!("resolved relay tx {} to height {}", hash, height);
                        height
                    }
                };
                Ok(ComposeState::FetchHeader {
                    record,
                    relay_height,
                })
            }

            ComposeState::FetchHeader {
                record,
                relay_height,
            } => {
                let header_height = checked_height(relay_height, 1)?;
                let chain_height = self.relay.height().await?;
                if chain_height < header_height {
                    return Err(RelayError::ProofUnavailable(format!(
                        "relay chain at {} has not sealed height {}",
                        chain_height, relay_height
                    )));
                }
                let header = self.relay.header_by_height(header_height).await?;
                Ok(ComposeState::DetermineAnchor {
                    record,
                    relay_height,
                    chain_height,
                    header,
                })
            }

            ComposeState::DetermineAnchor {
                record,
                relay_height,
                chain_height,
                header,
            } => {
                let (decision, keeper_update) = decide_anchor(
                    relay_height,
                    record.dest_epoch_start_height,
                    &header,
                    &record.dest_keeper_commitment,
                )
                .map_err(|e| with_provenance(e, &record))?;

                match decision {
                    AnchorDecision::NotNeeded => Ok(ComposeState::ExtractValue {
                        record,
                        relay_height,
                        anchored: Anchored {
                            header,
                            anchor: None,
                            inter_epoch_proof: None,
                            keeper_update: None,
                        },
                    }),
                    AnchorDecision::At(anchor_height) => {
                        if keeper_update.is_some() {
                            info!(
                                "keeper set rotated at relay height {}, anchoring at {}",
                                header.height, anchor_height
                            );
                        }
                        Ok(ComposeState::FetchAnchor {
                            record,
                            relay_height,
                            chain_height,
                            header,
                            anchor_height,
                            keeper_update,
                        })
                    }
                }
            }

            ComposeState::FetchAnchor {
                record,
                relay_height,
                chain_height,
                header,
                anchor_height,
                keeper_update,
            } => {
                if chain_height < anchor_height {
                    let latest = self.relay.height().await?;
                    if latest < anchor_height {
                        return Err(RelayError::ProofUnavailable(format!(
                            "relay chain at {} has not reached anchor height {}",
                            latest, anchor_height
                        )));
                    }
                }
                let header_height = checked_height(relay_height, 1)?;
                let anchor = self.relay.header_by_height(anchor_height).await?;
                let proof = self.relay.merkle_proof(header_height, anchor_height).await?;
                AuditPath::decode(&proof).map_err(|e| {
                    RelayError::decode(
                        format!(
                            "inter-epoch proof {}..{} for {}",
                            header_height,
                            anchor_height,
                            record.provenance()
                        ),
                        e,
                    )
                })?;
                Ok(ComposeState::ExtractValue {
                    record,
                    relay_height,
                    anchored: Anchored {
                        header,
                        anchor: Some(anchor),
                        inter_epoch_proof: Some(proof),
                        keeper_update,
                    },
                })
            }

            ComposeState::ExtractValue {
                record,
                relay_height,
                anchored,
            } => {
                let (merkle_value, audit_path) = self.extract_value(&record, relay_height).await?;

                let authoritative = anchored.anchor.as_ref().unwrap_or(&anchored.header);
                let signatures = convert_all(authoritative.signatures.iter().map(|s| s.0.as_slice()))
                    .map_err(|e| {
                        RelayError::decode(
                            format!("signatures of header at height {}", authoritative.height),
                            e,
                        )
                    })?;

                let bundle = ProofBundle {
                    relay_header: anchored.header.clone(),
                    anchor_header: anchored.anchor.clone(),
                    inter_epoch_proof: anchored.inter_epoch_proof,
                    merkle_value: merkle_value.clone(),
                    audit_path,
                    signatures,
                    keeper_update: anchored.keeper_update,
                };

                let composed = TransactionRecord {
                    status: TxStatus::ProofComposed,
                    relay_height: Some(relay_height),
                    relay_header: Some(anchored.header),
                    anchor_header: anchored.anchor,
                    relay_merkle_value: Some(merkle_value),
                    bundle: Some(bundle),
                    ..record
                };
                info!(
                    "composed bundle for {} (anchor: {:?})",
                    composed.provenance(),
                    composed.anchor_header.as_ref().map(|h| h.height)
                );
                Ok(ComposeState::BundleReady { record: composed })
            }

            ready @ ComposeState::BundleReady { .. } => Ok(ready),
        }
    }

    /// Find the proof-bearing notification and recover the committed value.
    async fn extract_value(
        &self,
        record: &TransactionRecord,
        relay_height: u32,
    ) -> Result<(ToMerkleValue, AuditPath), RelayError> {
        let hash = relay_hash(record)?;
        let notifications = self.relay.event_by_tx_hash(hash).await?;

        let mut found = None;
        for notification in &notifications {
            match ProofNotification::parse(notification, &self.ccm_address) {
                Ok(Some(parsed)) => {
                    found = Some(parsed);
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!("skipping malformed notification in relay tx {}: {}", hash, e),
            }
        }
        let notification = found.ok_or_else(|| {
            RelayError::NotFound(format!("no proof found in relay tx {}", hash))
        })?;

        let provenance = format!("cross-states proof for relay tx {} at height {}", hash, relay_height);
        let raw = self
            .relay
            .cross_states_proof(relay_height, &notification.key)
            .await?;
        let path = AuditPath::decode(&raw).map_err(|e| RelayError::decode(&provenance, e))?;
        let value =
            ToMerkleValue::decode(&path.value).map_err(|e| RelayError::decode(&provenance, e))?;
        Ok((value, path))
    }
}

fn relay_hash(record: &TransactionRecord) -> Result<&str, RelayError> {
    record
        .relay_tx_hash
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| RelayError::Configuration(format!("record {} has no relay-chain hash", record.key())))
}

fn with_provenance(err: RelayError, record: &TransactionRecord) -> RelayError {
    match err {
        RelayError::Decode { context, reason } => RelayError::Decode {
            context: format!("{} ({})", context, record.provenance()),
            reason,
        },
        other => other,
    }
}
