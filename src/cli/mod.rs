//! CLI module for Regis
//!
//! Command-line interface definitions and handlers for the Regis AI Studio backend.
//!
//! # Commands
//!
//! - `serve` - Start the Regis server
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! regis serve
//!
//! # Start on another port with command safety checks forced on
//! regis serve -p 8100 --safe-mode
//!
//! # Generate shell completions
//! regis completions bash > ~/.bash_completion.d/regis
//! ```

pub mod completions;
pub mod config;
pub mod serve;

pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Regis - local backend for Regis AI Studio
#[derive(Parser, Debug)]
#[command(
    name = "regis",
    version,
    about = "Chat backend for Regis AI Studio (Claude, Gemini, Grok)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Regis server
    Serve(ServeArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "regis.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Block deny-listed shell commands regardless of SAFE_MODE
    #[arg(long)]
    pub safe_mode: bool,

    /// Do not write the server log and transcripts to disk
    #[arg(long)]
    pub no_file_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "regis.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
