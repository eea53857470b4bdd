use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod subcommands;

pub use subcommands::SessionCommands;

/// `zaprelay` - keeps a WhatsApp Web login alive across restarts by storing
/// the browser session in a remote key-value database.
#[derive(Parser, Debug)]
#[command(name = "zaprelay")]
#[command(version)]
#[command(about = "Remote session persistence for a WhatsApp bot.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.zaprelay/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use an in-process store instead of the configured backend
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore the session, then back it up periodically until Ctrl-C
    Run,

    /// Check backend connectivity and credentials
    Ping,

    /// Show the effective configuration
    Status,

    /// Inspect or manage the stored session
    Session {
        #[command(subcommand)]
        session_command: SessionCommands,
    },

    /// Delete the stored session and the local browser profile
    Logout,
}
