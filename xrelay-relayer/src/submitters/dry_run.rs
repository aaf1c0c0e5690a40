//! Submitter that records messages instead of sending them.
//!
//! Useful for operators verifying a deployment before enabling real
//! submission, and as a sink in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha3::{Digest, Keccak256};
use tokio::sync::Mutex;
use tracing::info;
use xrelay_types::Message;

use super::Submitter;

pub struct DryRunSubmitter {
    chain_id: u64,
    chain_name: String,
    submitted: Mutex<Vec<Message>>,
}

impl DryRunSubmitter {
    pub fn new(chain_id: u64, chain_name: impl Into<String>) -> Self {
        Self {
            chain_id,
            chain_name: chain_name.into(),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Messages accepted so far.
    pub async fn submitted(&self) -> Vec<Message> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl Submitter for DryRunSubmitter {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn chain_name(&self) -> &str {
        &self.chain_name
    }

    async fn submit(&self, message: &Message) -> Result<String> {
        let body = serde_json::to_vec(message).context("Failed to serialize message")?;
        let hash = format!("0x{}", hex::encode(Keccak256::digest(&body)));
        info!(
            "[dry run] {} <- {} ({} bytes, hash {})",
            self.chain_name,
            message.record().key(),
            body.len(),
            hash
        );
        self.submitted.lock().await.push(message.clone());
        Ok(hash)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
