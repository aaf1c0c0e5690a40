//! Binary Merkle audit paths produced by the relay chain.
//!
//! Layout: `varbytes(value) || (direction: u8, sibling: [u8; 32])*`. The pair
//! count is `remaining / 32`; the direction byte is not part of the 32-byte
//! unit, so a well-formed path never carries more than
//! [`MAX_AUDIT_PATH_DEPTH`] siblings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{Sink, Source, HASH_SIZE};
use crate::CodecError;

/// Deepest path whose pair count survives the `remaining / 32` rule.
pub const MAX_AUDIT_PATH_DEPTH: usize = 31;

/// Sibling sits to the left of the running hash.
pub const DIRECTION_LEFT: u8 = 0x00;
/// Sibling sits to the right of the running hash.
pub const DIRECTION_RIGHT: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPath {
    /// Committed leaf value.
    pub value: Vec<u8>,
    /// One direction byte per sibling.
    pub directions: Vec<u8>,
    pub siblings: Vec<[u8; 32]>,
}

impl AuditPath {
    pub fn new(value: Vec<u8>, directions: Vec<u8>, siblings: Vec<[u8; 32]>) -> Self {
        Self {
            value,
            directions,
            siblings,
        }
    }

    /// Decode a path in one forward scan. Running out of input before a
    /// declared pair is complete is an error, never a shorter path.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut source = Source::new(bytes);
        let value = source.next_var_bytes("audit path value")?.to_vec();

        let count = source.remaining() / HASH_SIZE;
        let mut directions = Vec::with_capacity(count);
        let mut siblings = Vec::with_capacity(count);
        for _ in 0..count {
            directions.push(source.next_u8("audit path direction")?);
            siblings.push(source.next_hash("audit path sibling")?);
        }

        Ok(Self {
            value,
            directions,
            siblings,
        })
    }

    /// Exact inverse of [`AuditPath::decode`].
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        if self.directions.len() != self.siblings.len() {
            return Err(CodecError::Invalid(format!(
                "{} directions for {} siblings",
                self.directions.len(),
                self.siblings.len()
            )));
        }
        if self.siblings.len() > MAX_AUDIT_PATH_DEPTH {
            return Err(CodecError::Invalid(format!(
                "audit path depth {} exceeds {}",
                self.siblings.len(),
                MAX_AUDIT_PATH_DEPTH
            )));
        }

        let mut sink = Sink::with_capacity(self.value.len() + 9 + self.siblings.len() * 33);
        sink.write_var_bytes(&self.value);
        for (direction, sibling) in self.directions.iter().zip(&self.siblings) {
            sink.write_u8(*direction).write_raw(sibling);
        }
        Ok(sink.into_bytes())
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// `sha256(0x00 || value)`.
    pub fn leaf_hash(&self) -> [u8; 32] {
        hash_leaf(&self.value)
    }

    /// Fold the siblings over the leaf hash to recover the Merkle root.
    pub fn root(&self) -> Result<[u8; 32], CodecError> {
        let mut hash = self.leaf_hash();
        for (direction, sibling) in self.directions.iter().zip(&self.siblings) {
            hash = match *direction {
                DIRECTION_LEFT => hash_children(sibling, &hash),
                DIRECTION_RIGHT => hash_children(&hash, sibling),
                other => return Err(CodecError::InvalidDirection(other)),
            };
        }
        Ok(hash)
    }

    /// Check the path against an expected root.
    pub fn verify(&self, root: &[u8; 32]) -> Result<bool, CodecError> {
        Ok(&self.root()? == root)
    }
}

pub fn hash_leaf(value: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([0x00]);
    hasher.update(value);
    hasher.finalize().into()
}

pub fn hash_children(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([0x01]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}
