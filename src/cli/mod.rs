// src/cli/mod.rs — CLI definition (clap derive)

pub mod keys;
pub mod migrate;
pub mod status;
pub mod tokens;
pub mod update;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "eveapi",
    about = "Sync EVE Online XML API and ESI data into SQLite",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one update pass over every key and token
    Update,
    /// Repeat update passes in the foreground
    Daemon {
        #[command(subcommand)]
        action: Option<DaemonAction>,
    },
    /// Manage XML API key pairs
    Keys {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Manage SSO refresh tokens
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Database migration management
    Migrate {
        /// Show applied migrations without running anything
        #[arg(long)]
        status: bool,
        /// Undo the most recent migration
        #[arg(long)]
        rollback: bool,
    },
    /// Show database location and row counts
    Status,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DaemonAction {
    /// Start the update loop
    Start,
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

#[derive(Subcommand, Clone, Debug)]
pub enum KeyAction {
    /// Register a key pair (re-enables it if already known)
    Add { key_id: i64, v_code: String },
    /// List registered keys
    List,
    /// Remove a key pair
    Remove { key_id: i64 },
}

#[derive(Subcommand, Clone, Debug)]
pub enum TokenAction {
    /// Store a refresh token for a character
    Add {
        #[arg(long)]
        character_id: i64,
        #[arg(long)]
        refresh_token: String,
        /// Space or comma separated scope list
        #[arg(long, default_value = "")]
        scopes: String,
    },
    /// List stored tokens
    List,
    /// Forget a character's token
    Remove { character_id: i64 },
}
