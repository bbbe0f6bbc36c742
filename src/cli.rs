use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tradmin")]
#[command(version = "0.1.0")]
#[command(about = "Configuration lifecycle orchestrator for a trading service stack", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings directory (default.toml, <env>.toml)
    #[arg(short, long, default_value = "settings")]
    pub settings: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon: config watcher plus status server
    Watch,
    /// Apply a candidate configuration: pause, validate, save, resume
    Apply {
        /// Path of the candidate configuration file
        file: PathBuf,
        /// Acknowledge a previous resume failure before applying
        #[arg(long)]
        acknowledge: bool,
    },
    /// Print the composite status snapshot
    Status {
        /// Emit JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Validate a configuration file without applying it
    Validate {
        /// File to validate (defaults to the live config)
        file: Option<PathBuf>,
    },
    /// Print field metadata for presentation layers
    Schema,
    /// Manage configuration backups
    Backups {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Send a test message through an alert channel
    AlertTest {
        /// Channel: email or slack
        channel: String,
    },
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// List available backups, oldest first
    List,
    /// Restore a backup over the live configuration
    Restore {
        /// Backup file path
        file: PathBuf,
    },
}
