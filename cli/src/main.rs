//! ChainSync CLI: inspect contract interfaces, decode calls and logs, and
//! manage log-sync checkpoints.
//!
//! # Commands
//! ```
//! chainsync selectors         --abi <path.json>
//! chainsync signature         --abi <path.json>
//! chainsync decode-call       --abi <path.json> --calldata <hex>
//! chainsync decode-constructor --abi <path.json> --data <hex>
//! chainsync decode-log        --abi <path.json> --log <json>
//! chainsync decode-logs       --abi <path.json> --file <logs.json> [--parallel]
//! chainsync checkpoint        show|clear --dir <path> --address <addr> [--topic <t>...]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chainsync_core::{event::parse_hex, DecodedEvent, DecodedParam, LogEntry};
use chainsync_evm::Decoder;
use chainsync_logs::{CheckpointStore, FileCheckpointStore, LogFilter, TopicFilter};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

mod logging;

use logging::LogConfig;

#[derive(Parser)]
#[command(
    name = "chainsync",
    about = "Contract interface decoder and log-sync toolkit",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the selector / topic table built from an ABI file
    Selectors {
        /// Path to the ABI JSON file
        #[arg(long)]
        abi: PathBuf,
    },

    /// Print the canonical signature of every ABI entry
    Signature {
        #[arg(long)]
        abi: PathBuf,
    },

    /// Decode function call data
    #[command(name = "decode-call")]
    DecodeCall {
        #[arg(long)]
        abi: PathBuf,
        /// Raw calldata (0x-prefixed hex)
        #[arg(long)]
        calldata: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode constructor arguments (no selector prefix)
    #[command(name = "decode-constructor")]
    DecodeConstructor {
        #[arg(long)]
        abi: PathBuf,
        /// Encoded arguments (0x-prefixed hex)
        #[arg(long)]
        data: String,
        #[arg(long)]
        json: bool,
    },

    /// Decode one log entry given as RPC-style JSON
    #[command(name = "decode-log")]
    DecodeLog {
        #[arg(long)]
        abi: PathBuf,
        /// e.g. '{"address":"0x…","topics":["0xddf2…"],"data":"0x…","blockNumber":1,"logIndex":0}'
        #[arg(long)]
        log: String,
        #[arg(long)]
        json: bool,
    },

    /// Decode a JSON array of log entries from a file
    #[command(name = "decode-logs")]
    DecodeLogs {
        #[arg(long)]
        abi: PathBuf,
        #[arg(long)]
        file: PathBuf,
        /// Decode on all cores (output order is unchanged)
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        json: bool,
    },

    /// Inspect or delete a file-backed sync checkpoint
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },
}

#[derive(Subcommand)]
enum CheckpointAction {
    /// Print the stored checkpoint
    Show {
        #[command(flatten)]
        target: CheckpointTarget,
    },
    /// Delete the stored checkpoint, forcing a full resync on next start
    Clear {
        #[command(flatten)]
        target: CheckpointTarget,
    },
}

#[derive(clap::Args)]
struct CheckpointTarget {
    /// Checkpoint directory
    #[arg(long, default_value = "./checkpoints")]
    dir: PathBuf,
    /// Contract address of the synchronizer
    #[arg(long)]
    address: String,
    /// Topic filter positions in order; `any` for a wildcard
    #[arg(long = "topic")]
    topics: Vec<String>,
    /// Schema version the synchronizer was built with
    #[arg(long, default_value = "1")]
    version: String,
}

impl CheckpointTarget {
    fn key(&self) -> String {
        let filter = LogFilter {
            address: self.address.clone(),
            topics: self
                .topics
                .iter()
                .map(|t| match t.as_str() {
                    "any" | "null" | "*" => TopicFilter::Any,
                    exact => TopicFilter::exact(exact),
                })
                .collect(),
        };
        filter.checkpoint_key(&self.version)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_tracing(&LogConfig::for_cli(cli.verbose, cli.log_json));

    match cli.command {
        Commands::Selectors { abi } => cmd_selectors(&abi),
        Commands::Signature { abi } => cmd_signature(&abi),
        Commands::DecodeCall { abi, calldata, json } => cmd_decode_call(&abi, &calldata, json),
        Commands::DecodeConstructor { abi, data, json } => cmd_decode_constructor(&abi, &data, json),
        Commands::DecodeLog { abi, log, json } => cmd_decode_log(&abi, &log, json),
        Commands::DecodeLogs { abi, file, parallel, json } => {
            cmd_decode_logs(&abi, &file, parallel, json)
        }
        Commands::Checkpoint { action } => match action {
            CheckpointAction::Show { target } => cmd_checkpoint_show(&target).await,
            CheckpointAction::Clear { target } => cmd_checkpoint_clear(&target).await,
        },
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn load_decoder(abi_path: &Path) -> Result<Decoder> {
    let abi_json = std::fs::read_to_string(abi_path)
        .with_context(|| format!("read ABI file '{}'", abi_path.display()))?;
    let mut decoder = Decoder::new();
    let written = decoder
        .register_json(&abi_json)
        .with_context(|| format!("register ABI '{}'", abi_path.display()))?;
    debug!(
        path = %abi_path.display(),
        entries = decoder.schemas().len(),
        selectors = written,
        "ABI loaded"
    );
    Ok(decoder)
}

fn print_params(params: &[DecodedParam]) {
    for p in params {
        println!("  {} ({}): {}", p.name, p.ty, p.value);
    }
}

fn print_event(event: &DecodedEvent) {
    println!("Event:     {}", event.schema_name);
    println!("Contract:  {}", event.contract_address);
    println!("Params:");
    print_params(&event.params);
}

// ─── Commands ─────────────────────────────────────────────────────────────────

fn cmd_selectors(abi_path: &Path) -> Result<()> {
    let decoder = load_decoder(abi_path)?;
    for (selector, entry) in decoder.selectors() {
        println!("{:<68} {:<9} {}", selector.to_string(), entry.kind.to_string(), entry.signature());
    }
    Ok(())
}

fn cmd_signature(abi_path: &Path) -> Result<()> {
    let decoder = load_decoder(abi_path)?;
    for entry in decoder.schemas() {
        let anon = if entry.anonymous { " (anonymous)" } else { "" };
        println!("{:<11} {}{}", entry.kind.to_string(), entry.signature(), anon);
    }
    Ok(())
}

fn cmd_decode_call(abi_path: &Path, calldata: &str, as_json: bool) -> Result<()> {
    let decoder = load_decoder(abi_path)?;
    let decoded = decoder
        .decode_method_call_hex(calldata)
        .context("decode calldata")?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        println!("Function:  {}", decoded.schema_name);
        println!("Selector:  {}", decoded.selector_hex());
        println!("Inputs:");
        print_params(&decoded.params);
    }
    Ok(())
}

fn cmd_decode_constructor(abi_path: &Path, data: &str, as_json: bool) -> Result<()> {
    let decoder = load_decoder(abi_path)?;
    let bytes = parse_hex(data).context("invalid constructor data hex")?;
    let decoded = decoder.decode_constructor(&bytes)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        println!("Constructor:");
        print_params(&decoded.params);
    }
    Ok(())
}

fn cmd_decode_log(abi_path: &Path, log_json: &str, as_json: bool) -> Result<()> {
    let decoder = load_decoder(abi_path)?;
    let entry: LogEntry = serde_json::from_str(log_json).context("parse log JSON")?;

    match decoder.decode_log(&entry)? {
        Some(event) if as_json => println!("{}", serde_json::to_string_pretty(&event)?),
        Some(event) => print_event(&event),
        None => {
            let topic = entry.topics.first().map_or("<none>", String::as_str);
            println!("No registered event matches topic {topic}");
        }
    }
    Ok(())
}

fn cmd_decode_logs(abi_path: &Path, file: &Path, parallel: bool, as_json: bool) -> Result<()> {
    let decoder = load_decoder(abi_path)?;
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("read logs file '{}'", file.display()))?;
    let entries: Vec<LogEntry> = serde_json::from_str(&raw).context("parse logs JSON array")?;

    let events = if parallel {
        decoder.decode_logs_par(&entries)?
    } else {
        decoder.decode_logs(&entries)?
    };
    info!(total = entries.len(), decoded = events.len(), "Logs decoded");

    if as_json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        for event in &events {
            print_event(event);
            println!();
        }
        println!("{} of {} entries matched a registered event", events.len(), entries.len());
    }
    Ok(())
}

async fn cmd_checkpoint_show(target: &CheckpointTarget) -> Result<()> {
    let store = FileCheckpointStore::open(&target.dir).await?;
    let key = target.key();
    match store.get(&key).await? {
        Some(cp) => {
            let saved = chrono::DateTime::from_timestamp(cp.updated_at, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".into());
            println!("Key:                 {key}");
            println!("Last processed block: {}", cp.last_processed_block);
            println!("Results:             {}", cp.results.len());
            println!("Saved at:            {saved}");
        }
        None => println!("No checkpoint for {key}"),
    }
    Ok(())
}

async fn cmd_checkpoint_clear(target: &CheckpointTarget) -> Result<()> {
    let store = FileCheckpointStore::open(&target.dir).await?;
    let key = target.key();
    store.delete(&key).await?;
    println!("Cleared checkpoint {key}");
    Ok(())
}
