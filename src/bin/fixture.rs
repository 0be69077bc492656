//! downpore-fixture - test torrent generator
//!
//! Creates random payloads with matching `.torrent` files and magnet links
//! for end-to-end runs, and removes them again.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use downpore::fixture::{self, FixtureOptions, DEFAULT_PIECE_SIZE};
use downpore::ClientError;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "downpore-fixture")]
#[command(about = "Generate and clean up test torrents", long_about = None)]
struct FixtureArgs {
    #[command(subcommand)]
    command: FixtureCommand,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum FixtureCommand {
    /// Write a random payload, its .torrent and magnet link
    Create {
        /// Payload size in MB
        #[arg(long, default_value_t = 40)]
        size: u64,

        /// Announce to a local UDP tracker on this port
        #[arg(long)]
        tracker_port: Option<u16>,

        /// Piece size in bytes
        #[arg(long, default_value_t = DEFAULT_PIECE_SIZE)]
        piece_size: u64,

        /// Parent directory (defaults to the system temp dir)
        #[arg(long, value_name = "DIR")]
        base_dir: Option<PathBuf>,

        /// Also write the magnet link to this file
        #[arg(long, value_name = "FILE")]
        magnet_file: Option<PathBuf>,
    },
    /// Remove the fixture directory containing FILE
    Cleanup {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = FixtureArgs::parse();

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    debug!("Fixture arguments: {:?}", args);

    match run(args.command).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<ClientError>())
                .map_or(1, ClientError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}

async fn run(command: FixtureCommand) -> Result<String> {
    let value = match command {
        FixtureCommand::Create {
            size,
            tracker_port,
            piece_size,
            base_dir,
            magnet_file,
        } => {
            let mut options = FixtureOptions::new(size);
            options.tracker_port = tracker_port;
            options.piece_size = piece_size;
            options.magnet_file = magnet_file;
            if let Some(dir) = base_dir {
                options.base_dir = dir;
            }

            let created = fixture::create(&options).await.context("Failed to create test torrent")?;
            serde_json::to_value(&created)?
        }
        FixtureCommand::Cleanup { file } => {
            let removed = fixture::cleanup(&file)
                .await
                .with_context(|| format!("Failed to clean up {}", file.display()))?;
            json!({ "removed": removed, "path": file })
        }
    };

    Ok(serde_json::to_string_pretty(&value)?)
}
