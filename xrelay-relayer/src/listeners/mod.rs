//! Chain listeners.
//!
//! A listener turns one chain's blocks into [`TransactionRecord`]s and knows
//! how to attach that chain's proof to them. One variant exists per source
//! chain family, plus the relay chain itself.

mod evm;
mod relay;

pub use evm::{storage_key, EvmListener};
pub use relay::RelayListener;

use std::time::Duration;

use async_trait::async_trait;
use xrelay_types::{RelayError, TransactionRecord};

/// Default interval between polls of a chain.
pub const DEFAULT_LISTEN_CHECK: Duration = Duration::from_secs(1);

/// Poll interval for a configured number of seconds; 0 falls back to
/// [`DEFAULT_LISTEN_CHECK`].
pub(crate) fn listen_check_secs(secs: u64) -> Duration {
    if secs > 0 {
        Duration::from_secs(secs)
    } else {
        DEFAULT_LISTEN_CHECK
    }
}

/// Serialized header plus its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBytes {
    pub raw: Vec<u8>,
    pub hash: Vec<u8>,
}

/// Scan, lookup and proof capabilities of one chain.
#[async_trait]
pub trait Listener: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Human-readable chain name for logs.
    fn name(&self) -> &str;

    async fn latest_height(&self) -> Result<u64, RelayError>;

    /// Cross-chain records emitted in the block at `height`. An empty block
    /// yields an empty vec.
    async fn scan(&self, height: u64) -> Result<Vec<TransactionRecord>, RelayError>;

    /// Point lookup by transaction hash; `Ok(None)` when the transaction
    /// carries no cross-chain record. Chains without random access return
    /// `Unsupported`.
    async fn scan_tx(&self, hash: &str) -> Result<Option<TransactionRecord>, RelayError>;

    /// Attach this chain's proof, returning a new record.
    async fn compose(&self, record: &TransactionRecord) -> Result<TransactionRecord, RelayError>;

    async fn header(&self, height: u64) -> Result<HeaderBytes, RelayError>;

    fn listen_check(&self) -> Duration {
        DEFAULT_LISTEN_CHECK
    }

    /// Blocks to stay behind the chain tip before scanning.
    fn defer(&self) -> u64 {
        0
    }

    /// Height scanning starts from.
    fn start_height(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_listen_check_uses_default() {
        assert_eq!(listen_check_secs(0), DEFAULT_LISTEN_CHECK);
        assert_eq!(listen_check_secs(5), Duration::from_secs(5));
    }
}
