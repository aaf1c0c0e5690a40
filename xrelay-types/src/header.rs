//! Relay-chain block headers.
//!
//! Headers are opaque signed blobs; only the fields the proof composer needs
//! are extracted by the relay-chain client.

use serde::{Deserialize, Serialize};

use crate::codec::ADDRESS_SIZE;
use crate::keepers::KeeperSet;
use crate::RelayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayHeader {
    /// Serialized header exactly as the relay chain signed it.
    #[serde(with = "hex::serde")]
    pub raw: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub hash: [u8; 32],
    pub height: u32,
    /// JSON consensus payload.
    #[serde(with = "hex::serde")]
    pub consensus_payload: Vec<u8>,
    /// All zero on headers that do not announce a new keeper set.
    #[serde(with = "hex::serde")]
    pub next_keeper: [u8; ADDRESS_SIZE],
    /// Keeper signatures in the relay chain's native format.
    pub signatures: Vec<Signature>,
}

/// A keeper signature, hex encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(#[serde(with = "hex::serde")] pub Vec<u8>);

impl RelayHeader {
    /// Whether this header closes an epoch without announcing a new keeper set.
    pub fn is_epoch_terminal(&self) -> bool {
        self.next_keeper.iter().all(|b| *b == 0)
    }

    pub fn consensus_info(&self) -> Result<ConsensusInfo, RelayError> {
        serde_json::from_slice(&self.consensus_payload).map_err(|e| {
            RelayError::decode(format!("consensus payload at height {}", self.height), e)
        })
    }

    /// Keeper set announced by this header, or `None` if the header does
    /// not carry a chain config.
    pub fn announced_keepers(&self) -> Result<Option<KeeperSet>, RelayError> {
        let info = self.consensus_info()?;
        let Some(config) = info.new_chain_config else {
            return Ok(None);
        };
        let set = KeeperSet::from_native_hex(config.peers.iter().map(|p| p.id.as_str()))
            .map_err(|e| {
                RelayError::decode(format!("keeper id at height {}", self.height), e)
            })?;
        Ok(Some(set))
    }
}

/// Consensus payload carried in each relay-chain header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusInfo {
    #[serde(default, rename = "leader")]
    pub proposer: u32,
    #[serde(default)]
    pub last_config_block_num: u32,
    #[serde(default)]
    pub new_chain_config: Option<ChainConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub view: u32,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub index: u32,
    /// Hex-encoded native public key.
    pub id: String,
}


#[cfg(test)]
mod tests {
    use super::fixtures::header_with;
    use super::*;
    use crate::keys::test_keys::random_key;
    use crate::keys::Curve;

    #[test]
    fn test_terminal_marker() {
        assert!(header_with(10, None).is_epoch_terminal());
        let keys = [random_key(Curve::Secp256k1)];
        assert!(!header_with(10, Some(&keys)).is_epoch_terminal());
    }

    #[test]
    fn test_announced_keepers() {
        let keys = vec![random_key(Curve::Secp256k1), random_key(Curve::P256)];
        let header = header_with(12, Some(&keys));
        let set = header.announced_keepers().unwrap().unwrap();
        assert_eq!(set, KeeperSet::new(keys));

        assert!(header_with(12, None).announced_keepers().unwrap().is_none());
    }

    #[test]
    fn test_payload_field_names() {
        let json = br#"{"leader":3,"vrf_value":"","last_config_block_num":9,
            "new_chain_config":{"version":1,"view":2,"n":7,"peers":[{"index":1,"id":"abcd"}]}}"#;
        let mut header = header_with(1, None);
        header.consensus_payload = json.to_vec();
        let info = header.consensus_info().unwrap();
        assert_eq!(info.proposer, 3);
        assert_eq!(info.last_config_block_num, 9);
        assert_eq!(info.new_chain_config.unwrap().peers[0].id, "abcd");
    }

    #[test]
    fn test_bad_keeper_id_is_decode_error() {
        let mut header = header_with(5, None);
        header.consensus_payload =
            br#"{"new_chain_config":{"peers":[{"index":1,"id":"not-hex"}]}}"#.to_vec();
        let err = header.announced_keepers().unwrap_err();
        assert!(matches!(err, RelayError::Decode { ref context, .. } if context.contains("height 5")));
    }

    #[test]
    fn test_malformed_payload_is_decode_error() {
        let mut header = header_with(5, None);
        header.consensus_payload = b"{".to_vec();
        assert!(matches!(header.consensus_info(), Err(RelayError::Decode { .. })));
    }
}
