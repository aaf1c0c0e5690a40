//! Chain submitters for composed proofs.

mod dry_run;

pub use dry_run::DryRunSubmitter;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use xrelay_types::Message;

/// Trait for chain submitters.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Chain the submitter delivers to.
    fn chain_id(&self) -> u64;

    /// Get the chain name.
    fn chain_name(&self) -> &str;

    /// Submit a message to the target chain, returning the transaction hash.
    async fn submit(&self, message: &Message) -> Result<String>;

    /// Check if the submitter is healthy.
    async fn health_check(&self) -> Result<bool>;
}

/// Submitters keyed by chain id.
pub struct SubmitterSet {
    relay_chain_id: u64,
    submitters: HashMap<u64, Arc<dyn Submitter>>,
}

impl SubmitterSet {
    pub fn new(relay_chain_id: u64) -> Self {
        Self {
            relay_chain_id,
            submitters: HashMap::new(),
        }
    }

    /// Register a submitter, replacing any previous one for its chain.
    pub fn insert(&mut self, submitter: Arc<dyn Submitter>) {
        self.submitters.insert(submitter.chain_id(), submitter);
    }

    pub fn route(&self, message: &Message) -> Option<&Arc<dyn Submitter>> {
        self.submitters
            .get(&message.target_chain_id(self.relay_chain_id))
    }

    pub async fn submit(&self, message: &Message) -> Result<String> {
        let target = message.target_chain_id(self.relay_chain_id);
        let submitter = self
            .route(message)
            .ok_or_else(|| anyhow!("no submitter for chain {}", target))?;
        submitter.submit(message).await
    }

    /// Health of every registered submitter, by chain name.
    pub async fn health(&self) -> Vec<(String, bool)> {
        let mut out = Vec::with_capacity(self.submitters.len());
        for submitter in self.submitters.values() {
            let healthy = submitter.health_check().await.unwrap_or(false);
            out.push((submitter.chain_name().to_string(), healthy));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.submitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submitters.is_empty()
    }
}
