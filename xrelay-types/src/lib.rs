//! xrelay-types
//!
//! Wire formats and data model for relaying cross-chain transactions through
//! a relay chain: the binary audit-path codec, multi-curve keeper keys, the
//! keeper-set commitment used to detect epoch rotation, relay headers and
//! the transaction records that flow between listeners and submitters.
//!
//! Everything here is synchronous and free of shared state.

pub mod audit_path;
pub mod codec;
pub mod error;
pub mod header;
pub mod keepers;
pub mod keys;
pub mod message;
pub mod notification;
pub mod params;
pub mod record;
pub mod signature;

pub use audit_path::AuditPath;
pub use error::{CodecError, KeyError, RelayError};
pub use header::{ConsensusInfo, RelayHeader, Signature};
pub use keepers::{commit, fingerprint, is_new_epoch, KeeperSet, KeeperUpdate};
pub use keys::{curve_label, Curve, KeeperKey};
pub use message::{Message, ProofBundle};
pub use notification::{Notification, ProofNotification, RelayEvent};
pub use params::{MakeTxParam, ToMerkleValue};
pub use record::{TransactionRecord, TxKind, TxStatus};

/// Chain id the relay chain uses for itself.
pub const RELAY_CHAIN_ID: u64 = 0;
