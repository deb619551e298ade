//! merklelog CLI
//!
//! Command-line tools for reading tenant massif logs.
//!
//! # Commands
//!
//! - `find-trie-entries` - Find leaves by application id
//! - `find-mmr-entries` - Find leaves by entry payload
//! - `replicate-logs` - Verify and copy massifs into a local replica
//! - `watch` - Show the latest massif and seal per tenant
//! - `verify-included` - Prove one MMR node against its massif's seal

mod commands;
mod http;

use clap::{Parser, Subcommand};
use commands::RemoteArgs;
use merklelog_core::search::DEFAULT_MASSIF_HEIGHT;
use merklelog_core::IndexKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Search, verify and replicate merklelog massif logs.
#[derive(Parser)]
#[command(name = "merklelog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the remote log store
    #[arg(global = true, long, conflicts_with = "data_local")]
    data_url: Option<String>,

    /// Local directory standing in for the remote log store
    #[arg(global = true, long)]
    data_local: Option<PathBuf>,

    /// Massif height of the log
    #[arg(global = true, long, default_value_t = DEFAULT_MASSIF_HEIGHT)]
    height: u8,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find leaves whose trie key matches an application id
    FindTrieEntries {
        /// Tenant identity, e.g. tenant/<uuid>
        #[arg(long)]
        tenant: String,

        /// Log id to key on instead of the tenant's encodings (tenant, uuid or hex)
        #[arg(long)]
        log_id: Option<String>,

        /// Trie key domain byte
        #[arg(long, default_value_t = 0)]
        domain: u8,

        /// Application id
        #[arg(long)]
        app_id: String,

        /// First massif to scan
        #[arg(long, default_value_t = 0)]
        massif_start: u32,

        /// Last massif to scan (default: until the log ends)
        #[arg(long)]
        massif_end: Option<u32>,

        /// Report leaf indices or MMR indices
        #[arg(long, default_value_t = IndexKind::Leaf)]
        output_index: IndexKind,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Find leaves whose value is the leaf hash of an entry payload
    FindMmrEntries {
        /// Tenant identity
        #[arg(long)]
        tenant: String,

        /// Hex-encoded entry payload (repeatable)
        #[arg(long = "app-entry", required = true)]
        app_entries: Vec<String>,

        /// First massif to scan
        #[arg(long, default_value_t = 0)]
        massif_start: u32,

        /// Last massif to scan (default: until the log ends)
        #[arg(long)]
        massif_end: Option<u32>,

        /// Report leaf indices or MMR indices
        #[arg(long, default_value_t = IndexKind::Leaf)]
        output_index: IndexKind,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify remote massifs and copy them into a local replica
    ReplicateLogs {
        /// Tenant to replicate (repeatable)
        #[arg(long = "tenant", conflicts_with_all = ["all", "changes"])]
        tenants: Vec<String>,

        /// Replicate every tenant found in the remote listing
        #[arg(long, conflicts_with = "changes")]
        all: bool,

        /// JSON file of tenant changes, as printed by `watch --format json`
        #[arg(long)]
        changes: Option<PathBuf>,

        /// Last massif index to replicate (default: each tenant's head)
        #[arg(long)]
        massif: Option<u32>,

        /// Number of massifs before the last to keep verified
        #[arg(long)]
        ancestors: Option<u32>,

        /// Local replica directory
        #[arg(long)]
        replicadir: PathBuf,

        /// Hex-encoded Ed25519 public key seals must be signed with
        #[arg(long)]
        sealer_key: Option<String>,

        /// Tenants replicated at once
        #[arg(long, default_value_t = 8)]
        concurrency: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the most recent massif and seal per tenant
    Watch {
        /// Restrict to one tenant
        #[arg(long)]
        tenant: Option<String>,

        /// Skip blobs modified before this time (Unix milliseconds)
        #[arg(long)]
        modified_since: Option<u64>,

        /// Listing pages to read before stopping
        #[arg(long, default_value_t = 16)]
        max_pages: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Prove an MMR index against its massif's seal
    VerifyIncluded {
        /// Tenant identity
        #[arg(long)]
        tenant: String,

        /// MMR index of the node to prove
        #[arg(long)]
        mmr_index: u64,

        /// Hex-encoded Ed25519 public key the seal must be signed with
        #[arg(long)]
        sealer_key: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let remote = RemoteArgs {
        data_url: cli.data_url,
        data_local: cli.data_local,
        height: cli.height,
    };

    match cli.command {
        Commands::FindTrieEntries {
            tenant,
            log_id,
            domain,
            app_id,
            massif_start,
            massif_end,
            output_index,
            format,
        } => {
            let query = commands::find::TrieQuery {
                tenant: &tenant,
                log_id: log_id.as_deref(),
                domain,
                app_id: &app_id,
            };
            let range = commands::find::Range {
                start: massif_start,
                end: massif_end,
                output_index,
            };
            commands::find::run_trie(&remote, &query, &range, &format)?;
        }
        Commands::FindMmrEntries {
            tenant,
            app_entries,
            massif_start,
            massif_end,
            output_index,
            format,
        } => {
            let range = commands::find::Range {
                start: massif_start,
                end: massif_end,
                output_index,
            };
            commands::find::run_mmr(&remote, &tenant, &app_entries, &range, &format)?;
        }
        Commands::ReplicateLogs {
            tenants,
            all,
            changes,
            massif,
            ancestors,
            replicadir,
            sealer_key,
            concurrency,
            format,
        } => {
            let selection = if all {
                commands::replicate::Selection::All
            } else if let Some(path) = changes {
                commands::replicate::Selection::ChangesFile(path)
            } else if !tenants.is_empty() {
                commands::replicate::Selection::Tenants(tenants)
            } else {
                return Err("one of --tenant, --all or --changes is required".into());
            };
            let options = commands::replicate::Options {
                massif,
                ancestors,
                replicadir,
                sealer_key,
                concurrency,
            };
            commands::replicate::run(&remote, selection, &options, &format)?;
        }
        Commands::Watch {
            tenant,
            modified_since,
            max_pages,
            format,
        } => {
            commands::watch::run(&remote, tenant, modified_since, max_pages, &format)?;
        }
        Commands::VerifyIncluded {
            tenant,
            mmr_index,
            sealer_key,
            format,
        } => {
            commands::verify_included::run(
                &remote,
                &tenant,
                mmr_index,
                sealer_key.as_deref(),
                &format,
            )?;
        }
        Commands::Version => {
            println!("merklelog CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
