use clap::Subcommand;
use std::path::PathBuf;

/// Operator access to the stored session record
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionCommands {
    /// Show whether a session is stored, and how
    Status {
        /// Session id (default: RemoteAuth-<client_id>)
        #[arg(long)]
        id: Option<String>,
    },
    /// Upload a session archive, replacing the stored one
    Save {
        #[arg(long)]
        id: Option<String>,
        /// Zip archive of the browser profile
        #[arg(long)]
        archive: PathBuf,
    },
    /// Download the stored archive to a file
    Restore {
        #[arg(long)]
        id: Option<String>,
        /// Destination file (default: <data_dir>/<id>.zip)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Remove every stored key of the session
    Delete {
        #[arg(long)]
        id: Option<String>,
    },
}
