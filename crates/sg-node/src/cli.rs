//! Command-line surface: `init`, `ingest`, `ingest-text`, `search`,
//! `verify`, `list`, `get`, `stats`, `connect`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sg-node", version, about = "Verifiable semantic knowledge graph node")]
pub struct Cli {
    /// Directory holding this node's persisted state.
    #[arg(long, global = true, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Emit machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the data directory layout and default config if absent.
    Init,

    /// Ingest the contents of a file.
    Ingest {
        file: PathBuf,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value = "text")]
        source_type: String,
    },

    /// Ingest a text literal given on the command line.
    IngestText {
        content: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value = "text")]
        source_type: String,
    },

    /// Search for the nearest neurons to a query string.
    Search {
        query: String,
        #[arg(long, default_value_t = sg_08_query::DEFAULT_TOP_K)]
        top_k: usize,
    },

    /// Recompute and check a neuron's Merkle root. Checks every neuron
    /// if no id is given.
    Verify { id: Option<uuid::Uuid> },

    /// List every known neuron id.
    List,

    /// Fetch a single neuron by id.
    Get { id: uuid::Uuid },

    /// Report neuron count and journal length.
    Stats {
        /// Also print the Prometheus text exposition of every counter.
        #[arg(long)]
        metrics: bool,
    },

    /// Sync against a peer node rooted at another data directory.
    Connect { peer_data_dir: PathBuf },

    /// Run one compaction pass: reclaim HNSW tombstones, GC unreferenced
    /// chunks, and trim the change journal.
    Compact,
}
