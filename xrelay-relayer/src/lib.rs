//! xrelay-relayer
//!
//! Relayer service moving cross-chain transactions through the relay chain.
//!
//! Architecture:
//! 1. Per-chain listeners scan blocks for cross-chain records
//! 2. Records are queued for composition
//! 3. Source records get a storage proof; relay records get a destination
//!    proof bundle from the [`composer::ProofComposer`]
//! 4. Composed messages are routed to the submitter for their target chain
//!
//! Concrete chain clients live outside this crate behind the traits in
//! [`clients`].

pub mod clients;
pub mod composer;
pub mod config;
pub mod inflight;
pub mod listeners;
pub mod queue;
pub mod service;
pub mod submitters;
pub mod telemetry;

pub use clients::{EpochAnchor, EpochProvider, RelayChainClient, SourceChainClient, SourceEvent, SourceHeader};
pub use composer::{decide_anchor, AnchorDecision, ComposeState, ProofComposer};
pub use config::RelayerConfig;
pub use inflight::InFlight;
pub use listeners::{EvmListener, Listener, RelayListener};
pub use queue::{QueuedRecord, RecordQueue};
pub use service::{scan_loop, Outcome, RelayerService};
pub use submitters::{DryRunSubmitter, Submitter, SubmitterSet};
