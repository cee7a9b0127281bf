//! # kosync
//!
//! Command-line client for KOReader progress sync.
//!
//! ## Commands
//!
//! - `login`: Connect to a KOSync server (registers the account if needed)
//! - `logout`: Forget the credential and disable sync
//! - `status`: Show the stored settings
//! - `config`: Change strategy, checksum method, tolerance or device name
//! - `digest`: Print the document digest of a file
//! - `pull`: Show the progress the server holds for a file
//! - `push`: Store progress for a file
//!
//! ## Example
//!
//! ```bash
//! kosync login --server https://sync.koreader.rocks --username alice
//! kosync digest ~/Books/dune.epub
//! kosync push ~/Books/scan.pdf --page 12 --total 240
//! kosync pull ~/Books/scan.pdf
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sync_types::{ChecksumMethod, SyncStrategy};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::push::PushTarget;
use commands::settings::SettingsChange;
use commands::{digest, login, logout, pull, push, settings, status, CliContext};

/// Command-line client for KOReader progress sync.
#[derive(Parser, Debug)]
#[command(name = "kosync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the settings file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Relay endpoint URL, used for servers outside the local network
    #[arg(long, global = true)]
    relay: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a sync server, registering the account if it does not exist
    Login {
        /// Server base URL
        #[arg(long)]
        server: String,

        /// Account name
        #[arg(long, short)]
        username: String,

        /// Password (will prompt if not provided)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Forget the credential and disable sync
    Logout,

    /// Show the stored settings
    Status,

    /// Change sync settings
    Config {
        /// prompt, silent, send, receive or disabled
        #[arg(long)]
        strategy: Option<SyncStrategy>,

        /// binary or filename
        #[arg(long)]
        checksum: Option<ChecksumMethod>,

        /// Percentage tolerance as a power of ten (4 means 0.0001)
        #[arg(long)]
        tolerance_precision: Option<u32>,

        /// Device name sent with pushes (empty to use the default)
        #[arg(long)]
        device_name: Option<String>,
    },

    /// Print the document digest of a file
    Digest {
        /// Document file
        file: PathBuf,

        /// Override the configured checksum method
        #[arg(long)]
        method: Option<ChecksumMethod>,
    },

    /// Show the progress stored on the server for a file
    Pull {
        /// Document file
        file: PathBuf,
    },

    /// Store progress for a file
    Push {
        /// Document file
        file: PathBuf,

        /// 1-based page of a fixed-layout document
        #[arg(
            long,
            requires = "total",
            conflicts_with_all = ["pointer", "percentage"],
            required_unless_present = "pointer"
        )]
        page: Option<u32>,

        /// Page count of a fixed-layout document
        #[arg(long, requires = "page")]
        total: Option<u32>,

        /// Position pointer of a reflowable document
        #[arg(long, requires = "percentage")]
        pointer: Option<String>,

        /// Completion fraction between 0 and 1
        #[arg(long, requires = "pointer")]
        percentage: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    let ctx = CliContext::new(data_dir, cli.relay);

    match cli.command {
        Commands::Login {
            server,
            username,
            password,
        } => {
            login::run(&ctx, &server, &username, password).await?;
        }
        Commands::Logout => {
            logout::run(&ctx)?;
        }
        Commands::Status => {
            status::run(&ctx)?;
        }
        Commands::Config {
            strategy,
            checksum,
            tolerance_precision,
            device_name,
        } => {
            settings::run(
                &ctx,
                SettingsChange {
                    strategy,
                    checksum,
                    tolerance_precision,
                    device_name,
                },
            )?;
        }
        Commands::Digest { file, method } => {
            digest::run(&ctx, &file, method).await?;
        }
        Commands::Pull { file } => {
            pull::run(&ctx, &file).await?;
        }
        Commands::Push {
            file,
            page,
            total,
            pointer,
            percentage,
        } => {
            let target = match (page, total, pointer, percentage) {
                (Some(page), Some(total), _, _) => PushTarget::Page { page, total },
                (_, _, Some(pointer), Some(percentage)) => PushTarget::Pointer {
                    pointer,
                    percentage,
                },
                _ => anyhow::bail!("Specify --page with --total, or --pointer with --percentage"),
            };
            push::run(&ctx, &file, target).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for kosync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("org", "kosync", "kosync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
