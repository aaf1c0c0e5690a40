use std::{fmt, fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use xrelay_relayer::config::RelayerConfig;
use xrelay_relayer::telemetry::init_tracing;
use xrelay_types::signature::to_evm_compatible;
use xrelay_types::{curve_label, fingerprint, AuditPath, ConsensusInfo, KeeperSet};

#[derive(Parser)]
#[command(
    name = "xrelay-tools",
    about = "Offline inspection of relay-chain proofs, keepers and configuration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a binary audit path and recompute its root.
    DecodePath(DecodePathArgs),
    /// Compute the keeper commitment announced by a consensus payload.
    Keepers(KeepersArgs),
    /// Print the label of a named curve.
    CurveLabel(CurveLabelArgs),
    /// Convert a native keeper signature to `r || s || v`.
    ConvertSig(ConvertSigArgs),
    /// Load and validate a relayer configuration.
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
struct DecodePathArgs {
    /// Hex-encoded audit path; read from --file when omitted.
    hex: Option<String>,
    /// File holding the hex-encoded audit path.
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct KeepersArgs {
    /// JSON consensus payload file.
    payload: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CurveLabelArgs {
    name: String,
}

#[derive(Args)]
struct ConvertSigArgs {
    /// Hex-encoded native signature, scheme byte first.
    hex: String,
}

#[derive(Args)]
struct CheckConfigArgs {
    /// Config file; defaults to `XRELAY_CONFIG` or `xrelay.toml`, after `.env`.
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing("xrelay_tools=info", false);
    let cli = Cli::parse();
    match cli.command {
        Commands::DecodePath(args) => decode_path(args),
        Commands::Keepers(args) => keepers(args),
        Commands::CurveLabel(args) => {
            println!("{}", curve_label(&args.name)?);
            Ok(())
        }
        Commands::ConvertSig(args) => convert_sig(args),
        Commands::CheckConfig(args) => check_config(args),
    }
}

fn decode_hex(input: &str) -> Result<Vec<u8>> {
    hex::decode(input.trim().trim_start_matches("0x")).context("input is not valid hex")
}

fn decode_path(args: DecodePathArgs) -> Result<()> {
    let input = match (args.hex, args.file) {
        (Some(hex), _) => hex,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => return Err(anyhow!("pass an audit path or --file")),
    };
    let bytes = decode_hex(&input)?;
    let path = AuditPath::decode(&bytes).context("failed to decode audit path")?;
    debug!("decoded {} byte audit path", bytes.len());

    let summary = PathSummary {
        value: hex::encode(&path.value),
        depth: path.depth(),
        directions: path.directions.clone(),
        siblings: path.siblings.iter().map(hex::encode).collect(),
        leaf_hash: hex::encode(path.leaf_hash()),
        root: hex::encode(path.root().context("failed to fold audit path")?),
    };
    output_summary(&summary, args.json)
}

fn keepers(args: KeepersArgs) -> Result<()> {
    let payload = fs::read(&args.payload)
        .with_context(|| format!("failed to read {}", args.payload.display()))?;
    let info: ConsensusInfo =
        serde_json::from_slice(&payload).context("invalid consensus payload")?;
    let config = info
        .new_chain_config
        .ok_or_else(|| anyhow!("payload announces no chain config"))?;

    let set = KeeperSet::from_native_hex(config.peers.iter().map(|p| p.id.as_str()))?;
    let fingerprints = set
        .keys()
        .iter()
        .map(|key| fingerprint(key).map(hex::encode))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = KeepersSummary {
        count: set.len(),
        commitment: hex::encode(set.commitment()?),
        fingerprints,
    };
    output_summary(&summary, args.json)
}

fn convert_sig(args: ConvertSigArgs) -> Result<()> {
    let sig = decode_hex(&args.hex)?;
    let converted = to_evm_compatible(&sig).context("signature is not convertible")?;
    println!("{}", hex::encode(converted));
    Ok(())
}

fn check_config(args: CheckConfigArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => RelayerConfig::load_from(path)?,
        None => RelayerConfig::load()?,
    };
    let summary = ConfigSummary {
        relay_chain_id: config.relay.chain_id,
        ccm_address: config.relay.ccm_address.clone(),
        sources: config
            .sources
            .iter()
            .map(|s| format!("{} ({})", s.name, s.chain_id))
            .collect(),
        workers: config.queue.workers,
        max_retries: config.queue.max_retries,
    };
    output_summary(&summary, args.json)
}

fn output_summary<T>(summary: &T, json: bool) -> Result<()>
where
    T: Serialize + fmt::Display,
{
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

#[derive(Serialize)]
struct PathSummary {
    value: String,
    depth: usize,
    directions: Vec<u8>,
    siblings: Vec<String>,
    leaf_hash: String,
    root: String,
}

impl fmt::Display for PathSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "value: {}", self.value)?;
        writeln!(f, "depth: {}", self.depth)?;
        for (direction, sibling) in self.directions.iter().zip(&self.siblings) {
            let side = if *direction == 0 { "left " } else { "right" };
            writeln!(f, "  {} {}", side, sibling)?;
        }
        writeln!(f, "leaf: {}", self.leaf_hash)?;
        writeln!(f, "root: {}", self.root)
    }
}

#[derive(Serialize)]
struct KeepersSummary {
    count: usize,
    commitment: String,
    fingerprints: Vec<String>,
}

impl fmt::Display for KeepersSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "keepers: {}", self.count)?;
        for fp in &self.fingerprints {
            writeln!(f, "  0x{}", fp)?;
        }
        writeln!(f, "commitment: {}", self.commitment)
    }
}

#[derive(Serialize)]
struct ConfigSummary {
    relay_chain_id: u64,
    ccm_address: String,
    sources: Vec<String>,
    workers: usize,
    max_retries: u32,
}

impl fmt::Display for ConfigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "relay chain: {}", self.relay_chain_id)?;
        writeln!(f, "ccm address: {}", self.ccm_address)?;
        writeln!(f, "sources: {}", self.sources.join(", "))?;
        writeln!(f, "workers: {}", self.workers)?;
        writeln!(f, "max retries: {}", self.max_retries)
    }
}
