//! Keeper-set commitments used to detect epoch rotation.
//!
//! The commitment is an address list rather than a hash tree:
//! `u64 LE count || varbytes(fingerprint)*` over the canonically sorted
//! keys, where a fingerprint is the low 20 bytes of
//! `keccak256(uncompressed point without its 0x04 marker)`.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::codec::{Sink, ADDRESS_SIZE};
use crate::keys::KeeperKey;
use crate::{KeyError, RelayError};

/// A keeper set in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperSet {
    keys: Vec<KeeperKey>,
}

impl KeeperSet {
    /// Sort the keys into the canonical order both sides of a chain pair use.
    pub fn new(mut keys: Vec<KeeperKey>) -> Self {
        keys.sort();
        Self { keys }
    }

    /// Parse keys from their native hex encodings.
    pub fn from_native_hex<I, S>(ids: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = ids
            .into_iter()
            .map(|id| {
                let id = id.as_ref();
                let bytes = hex::decode(id.trim_start_matches("0x"))
                    .map_err(|e| KeyError::InvalidKey(format!("{}: {}", id, e)))?;
                KeeperKey::decode_native(&bytes)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(keys))
    }

    pub fn keys(&self) -> &[KeeperKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Deterministic commitment over the whole set. Fails if any key cannot
    /// be fingerprinted; no key is ever skipped.
    pub fn commitment(&self) -> Result<Vec<u8>, KeyError> {
        let mut sink = Sink::with_capacity(8 + self.keys.len() * (ADDRESS_SIZE + 1));
        sink.write_u64(self.keys.len() as u64);
        for key in &self.keys {
            sink.write_var_bytes(&fingerprint(key)?);
        }
        Ok(sink.into_bytes())
    }

    /// Concatenated native encodings, in canonical order.
    pub fn native_keys(&self) -> Result<Vec<u8>, KeyError> {
        let mut out = Vec::new();
        for key in &self.keys {
            out.extend_from_slice(&key.encode_native()?);
        }
        Ok(out)
    }

    /// Commitment plus native key list, for handing to a destination chain.
    pub fn update(&self) -> Result<KeeperUpdate, KeyError> {
        Ok(KeeperUpdate {
            commitment: self.commitment()?,
            native_keys: self.native_keys()?,
        })
    }
}

/// Commit to a key set given in any order.
pub fn commit(keys: Vec<KeeperKey>) -> Result<Vec<u8>, KeyError> {
    KeeperSet::new(keys).commitment()
}

/// Address-style fingerprint of a single keeper key.
pub fn fingerprint(key: &KeeperKey) -> Result<[u8; ADDRESS_SIZE], KeyError> {
    let point = key.encode_evm_compatible()?;
    let digest = Keccak256::digest(&point[1..]);
    let mut out = [0u8; ADDRESS_SIZE];
    out.copy_from_slice(&digest[32 - ADDRESS_SIZE..]);
    Ok(out)
}

/// Byte-exact comparison against the destination's known commitment.
///
/// An empty `known` commitment means the destination was never configured,
/// which is reported rather than treated as a rotation.
pub fn is_new_epoch(candidate: &[u8], known: &[u8]) -> Result<bool, RelayError> {
    if known.is_empty() {
        return Err(RelayError::Configuration(
            "destination keeper commitment not provided".into(),
        ));
    }
    Ok(candidate != known)
}

/// New keeper set announced by an epoch-change header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperUpdate {
    #[serde(with = "hex::serde")]
    pub commitment: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub native_keys: Vec<u8>,
}
