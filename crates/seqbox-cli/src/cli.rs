use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "seqbox",
    about = "Numbered image uploads over a versioned object store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file.
    #[arg(short, long, global = true, env = "SEQBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use a local directory store at this path, overriding `[backend]`.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the upload server
    Serve(ServeArgs),
    /// Store an image as the next numbered entry
    Submit(SubmitArgs),
    /// Show the number the next upload would try first
    Next,
    /// List the index records
    Index,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on, overriding the configuration.
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Image file to upload.
    pub file: PathBuf,

    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Extension to store under; defaults to the file's own extension.
    #[arg(short, long)]
    pub ext: Option<String>,

    /// Idempotency token; a second submission with it is rejected.
    #[arg(long, conflicts_with = "auto_token")]
    pub token: Option<String>,

    /// Generate a fresh idempotency token.
    #[arg(long)]
    pub auto_token: bool,
}
