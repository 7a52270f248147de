use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tstore",
    about = "topic-store: records with large binary payloads over a document store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage config file (TOML). Defaults to ./tstore.toml when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use file-backed stores under this directory, overriding the config endpoint
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Collection to operate on, overriding the config
    #[arg(long, global = true)]
    pub collection: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Insert a record from a JSON object
    Insert(InsertArgs),
    /// Show one record by id
    Get(GetArgs),
    /// List records, optionally for one session
    Find(FindArgs),
    /// Delete a record and every blob it references
    Delete(DeleteArgs),
    /// Summarize sessions: first capture time and record count
    Sessions,
    /// Show the effective configuration and endpoint
    Config,
}

#[derive(Args)]
pub struct InsertArgs {
    /// Record body as a JSON object
    pub json: String,
    /// Attach a file as a binary field: KEY=PATH (KEY may be dotted)
    #[arg(short, long = "attach", value_name = "KEY=PATH")]
    pub attachments: Vec<String>,
    #[arg(short, long)]
    pub session: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
    /// Write binary fields into this directory, one file per dotted key
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct FindArgs {
    #[arg(short, long)]
    pub session: Option<String>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub id: String,
}
