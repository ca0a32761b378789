use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "anno",
    about = "anno: Web Annotation collections over a flat key-value store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the annotation server
    Serve(ServeArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
    /// Rewrite a store log keeping only live keys
    Compact(CompactArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen address, overrides the configuration file
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Store log path, overrides the configured storage backend
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompactArgs {
    /// Store log to compact
    pub data: PathBuf,
}
