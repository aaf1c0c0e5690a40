//! In-memory chain collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use xrelay_relayer::clients::{
    EpochAnchor, EpochProvider, RelayChainClient, SourceChainClient, SourceEvent, SourceHeader,
};
use xrelay_types::header::{ChainConfig, ConsensusInfo, PeerConfig};
use xrelay_types::{
    AuditPath, KeeperKey, KeeperSet, MakeTxParam, Notification, RelayError, RelayEvent,
    RelayHeader, Signature, ToMerkleValue,
};

pub const CCM: &str = "0300000000000000000000000000000000000000";
pub const DEST_CHAIN: u64 = 6;
pub const SOURCE_CHAIN: u64 = 2;
pub const RELAY_TX: &str = "aa11";
pub const CROSS_STATES_KEY: &str = "beef";

// === Keys and headers ===

pub fn keeper(seed: u8) -> KeeperKey {
    let secret = k256::SecretKey::from_slice(&[seed; 32]).unwrap();
    KeeperKey::Secp256k1(secret.public_key())
}

pub fn p256_keeper(seed: u8) -> KeeperKey {
    let secret = p256::SecretKey::from_slice(&[seed; 32]).unwrap();
    KeeperKey::P256(secret.public_key())
}

pub fn commitment(keys: &[KeeperKey]) -> Vec<u8> {
    KeeperSet::new(keys.to_vec()).commitment().unwrap()
}

/// Recoverable ECDSA signature, scheme byte first.
pub fn signature(fill: u8) -> Signature {
    let mut sig = vec![5u8, 28];
    sig.extend_from_slice(&[fill; 64]);
    Signature(sig)
}

pub fn header(height: u32, keepers: Option<&[KeeperKey]>) -> RelayHeader {
    header_with_ids(
        height,
        keepers.map(|keys| {
            keys.iter()
                .map(|k| hex::encode(k.encode_native().unwrap()))
                .collect()
        }),
    )
}

pub fn header_with_ids(height: u32, ids: Option<Vec<String>>) -> RelayHeader {
    let info = ConsensusInfo {
        proposer: 1,
        last_config_block_num: height,
        new_chain_config: ids.as_ref().map(|ids| ChainConfig {
            version: 1,
            view: 2,
            peers: ids
                .iter()
                .enumerate()
                .map(|(i, id)| PeerConfig {
                    index: i as u32 + 1,
                    id: id.clone(),
                })
                .collect(),
        }),
    };
    RelayHeader {
        raw: height.to_be_bytes().to_vec(),
        hash: [height as u8; 32],
        height,
        consensus_payload: serde_json::to_vec(&info).unwrap(),
        next_keeper: if ids.is_some() { [7u8; 20] } else { [0u8; 20] },
        signatures: vec![signature(height as u8), signature(height as u8 + 1)],
    }
}

// === Cross-chain payloads ===

pub fn sample_param() -> MakeTxParam {
    MakeTxParam {
        tx_hash: vec![0x11; 32],
        cross_chain_id: vec![0x01],
        from_contract: vec![0x22; 20],
        to_chain_id: DEST_CHAIN,
        to_contract: vec![0x33; 20],
        method: "unlock".to_string(),
        args: vec![0x44; 40],
    }
}

pub fn sample_merkle_value() -> ToMerkleValue {
    ToMerkleValue {
        tx_hash: vec![0xaa, 0x11],
        from_chain_id: SOURCE_CHAIN,
        param: sample_param(),
    }
}

pub fn make_proof(height: u32) -> Notification {
    Notification {
        contract_address: CCM.to_string(),
        states: json!(["makeProof", SOURCE_CHAIN, DEST_CHAIN, "1111", height, CROSS_STATES_KEY]),
    }
}

pub fn audit_path_for(value: Vec<u8>, depth: u8) -> Vec<u8> {
    let directions = (0..depth).map(|i| i % 2).collect();
    let siblings = (0..depth).map(|i| [i + 1; 32]).collect();
    AuditPath::new(value, directions, siblings).encode().unwrap()
}

// === Relay chain ===

#[derive(Default)]
pub struct MockRelay {
    pub height: Mutex<u32>,
    pub headers: Mutex<HashMap<u32, RelayHeader>>,
    pub tx_heights: Mutex<HashMap<String, u32>>,
    pub notifications: Mutex<HashMap<String, Vec<Notification>>>,
    pub blocks: Mutex<HashMap<u32, Vec<RelayEvent>>>,
    pub cross_states: Mutex<HashMap<(u32, String), Vec<u8>>>,
    pub merkle_calls: Mutex<Vec<(u32, u32)>>,
}

impl MockRelay {
    /// Relay chain at `chain_height` with a `makeProof` event in `RELAY_TX`
    /// at `event_height`, committing [`sample_merkle_value`].
    pub fn with_event(chain_height: u32, event_height: u32) -> Self {
        let relay = Self::default();
        *relay.height.lock().unwrap() = chain_height;
        relay
            .tx_heights
            .lock()
            .unwrap()
            .insert(RELAY_TX.to_string(), event_height);
        relay
            .notifications
            .lock()
            .unwrap()
            .insert(RELAY_TX.to_string(), vec![make_proof(event_height)]);
        relay.blocks.lock().unwrap().insert(
            event_height,
            vec![RelayEvent {
                tx_hash: RELAY_TX.to_string(),
                notifications: vec![make_proof(event_height)],
            }],
        );
        relay.cross_states.lock().unwrap().insert(
            (event_height, CROSS_STATES_KEY.to_string()),
            audit_path_for(sample_merkle_value().encode(), 3),
        );
        relay
    }

    pub fn put_header(&self, header: RelayHeader) {
        self.headers.lock().unwrap().insert(header.height, header);
    }
}

#[async_trait]
impl RelayChainClient for MockRelay {
    async fn height(&self) -> Result<u32, RelayError> {
        Ok(*self.height.lock().unwrap())
    }

    async fn height_by_tx_hash(&self, hash: &str) -> Result<u32, RelayError> {
        self.tx_heights
            .lock()
            .unwrap()
            .get(hash)
            .copied()
            .ok_or_else(|| RelayError::NotFound(format!("tx {}", hash)))
    }

    async fn header_by_height(&self, height: u32) -> Result<RelayHeader, RelayError> {
        self.headers
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .ok_or_else(|| RelayError::NotFound(format!("header {}", height)))
    }

    async fn merkle_proof(&self, from_height: u32, to_height: u32) -> Result<Vec<u8>, RelayError> {
        self.merkle_calls.lock().unwrap().push((from_height, to_height));
        Ok(audit_path_for(vec![from_height as u8; 32], 2))
    }

    async fn event_by_tx_hash(&self, hash: &str) -> Result<Vec<Notification>, RelayError> {
        self.notifications
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| RelayError::NotFound(format!("event {}", hash)))
    }

    async fn events_by_block(&self, height: u32) -> Result<Vec<RelayEvent>, RelayError> {
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_default())
    }

    async fn cross_states_proof(&self, height: u32, key: &str) -> Result<Vec<u8>, RelayError> {
        self.cross_states
            .lock()
            .unwrap()
            .get(&(height, key.to_string()))
            .cloned()
            .ok_or_else(|| RelayError::NotFound(format!("cross states {} at {}", key, height)))
    }
}

// === Source chain ===

#[derive(Default)]
pub struct MockSource {
    pub height: Mutex<u64>,
    pub events: Mutex<HashMap<u64, Vec<SourceEvent>>>,
    /// Heights whose next `filter_events` call fails once.
    pub flaky: Mutex<Vec<u64>>,
    pub scanned: Mutex<Vec<u64>>,
    pub proof_requests: Mutex<Vec<(Vec<u8>, u64)>>,
}

impl MockSource {
    pub fn at_height(height: u64) -> Self {
        let source = Self::default();
        *source.height.lock().unwrap() = height;
        source
    }

    pub fn put_event(&self, height: u64, tx_hash: &str, tx_id: Vec<u8>) {
        self.events
            .lock()
            .unwrap()
            .entry(height)
            .or_default()
            .push(SourceEvent {
                tx_hash: tx_hash.to_string(),
                tx_id,
                to_chain_id: DEST_CHAIN,
                raw_param: sample_param().encode(),
                height,
            });
    }
}

#[async_trait]
impl SourceChainClient for MockSource {
    async fn height(&self) -> Result<u64, RelayError> {
        Ok(*self.height.lock().unwrap())
    }

    async fn header(&self, height: u64) -> Result<SourceHeader, RelayError> {
        Ok(SourceHeader {
            raw: height.to_le_bytes().to_vec(),
            hash: vec![height as u8; 32],
            height,
        })
    }

    async fn proof(&self, storage_key: &[u8], height: u64) -> Result<Vec<u8>, RelayError> {
        self.proof_requests
            .lock()
            .unwrap()
            .push((storage_key.to_vec(), height));
        Ok(vec![0xcc; 16])
    }

    async fn filter_events(&self, from_height: u64, to_height: u64) -> Result<Vec<SourceEvent>, RelayError> {
        assert_eq!(from_height, to_height);
        self.scanned.lock().unwrap().push(from_height);
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(pos) = flaky.iter().position(|h| *h == from_height) {
                flaky.remove(pos);
                return Err(RelayError::TransientNetwork(format!("timeout at {}", from_height)));
            }
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(&from_height)
            .cloned()
            .unwrap_or_default())
    }
}

// === Destination ===

pub struct MockEpochs {
    pub anchor: EpochAnchor,
}

impl MockEpochs {
    pub fn new(start_height: u32, keepers: &[KeeperKey]) -> Self {
        Self {
            anchor: EpochAnchor {
                start_height,
                keeper_commitment: commitment(keepers),
            },
        }
    }
}

#[async_trait]
impl EpochProvider for MockEpochs {
    async fn epoch_anchor(&self, chain_id: u64) -> Result<EpochAnchor, RelayError> {
        if chain_id != DEST_CHAIN {
            return Err(RelayError::NotFound(format!("chain {}", chain_id)));
        }
        Ok(self.anchor.clone())
    }
}
