//! CLI actions
//!
//! A `Command` is built and validated from the configuration before any
//! connection is made, so malformed input never costs a daemon request.
//! `execute` then runs it against a session and assembles the report.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::cli::args::Action;
use crate::cli::report::{
    AddReport, DownloadReport, FilesReport, RemoveReport, Report, StatusEnvelope, StatusReport, WaitReport,
};
use crate::cli::Config;
use crate::completion::{collect_files, resolve, Clock, CompletionTracker, PollSettings};
use crate::daemon::{project, DaemonSession, DownloadRecord, Gid, StatusSnapshot};
use crate::error::{ClientError, Result};
use crate::torrent::MagnetLink;

/// What to hand the daemon for add/download
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Magnet(MagnetLink),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add { source: Source },
    Status { gid: Gid },
    Wait { gid: Gid, settings: PollSettings },
    Files { gid: Gid },
    Remove { gid: Gid, delete_files: bool },
    Download { source: Source, settings: PollSettings },
}

impl Command {
    /// Validate the options required by the configured action
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(match config.action {
            Action::Add => Command::Add {
                source: source(config, "add")?,
            },
            Action::Status => Command::Status {
                gid: gid(config, "status")?,
            },
            Action::Wait => Command::Wait {
                gid: gid(config, "wait")?,
                settings: config.poll_settings(),
            },
            Action::Files => Command::Files {
                gid: gid(config, "files")?,
            },
            Action::Remove => Command::Remove {
                gid: gid(config, "remove")?,
                delete_files: config.delete_files,
            },
            Action::Download => Command::Download {
                source: source(config, "download")?,
                settings: config.poll_settings(),
            },
        })
    }
}

fn source(config: &Config, action: &str) -> Result<Source> {
    if let Some(link) = &config.magnet_link {
        return Ok(Source::Magnet(MagnetLink::parse(link)?));
    }

    if let Some(path) = &config.torrent_file {
        if !path.is_file() {
            return Err(ClientError::invalid_input_with_field(
                format!("Torrent file not found: {}", path.display()),
                "torrent-file",
            ));
        }
        return Ok(Source::File(path.clone()));
    }

    Err(ClientError::invalid_input(format!(
        "Either --magnet-link or --torrent-file required for {} action",
        action
    )))
}

fn gid(config: &Config, action: &str) -> Result<Gid> {
    match config.torrent_hash.as_deref().map(str::trim) {
        Some(gid) if !gid.is_empty() => Ok(gid.to_string()),
        _ => Err(ClientError::invalid_input_with_field(
            format!("Torrent hash required for {} action", action),
            "torrent-hash",
        )),
    }
}

/// Run one command against a connected session
pub async fn execute<S, C>(session: &S, clock: &C, command: &Command) -> Result<Report>
where
    S: DaemonSession + ?Sized,
    C: Clock + ?Sized,
{
    debug!("Executing {:?}", command);

    match command {
        Command::Add { source } => {
            let gid = add(session, source).await?;
            let snapshot = current_status(session, &gid).await?;
            Ok(Report::Add(AddReport {
                success: true,
                torrent_hash: gid,
                status: StatusReport::from(&snapshot),
            }))
        }

        Command::Status { gid } => {
            let snapshot = current_status(session, gid).await?;
            Ok(Report::Status(StatusEnvelope {
                success: true,
                status: StatusReport::from(&snapshot),
            }))
        }

        Command::Wait { gid, settings } => {
            let content = CompletionTracker::new(session, clock, *settings).wait(gid).await?;
            let records = session.list_all().await?;
            let snapshot = project(&lookup(session, &records, &content).await?);
            Ok(Report::Wait(WaitReport {
                success: true,
                completed: snapshot.is_complete,
                final_status: StatusReport::from(&snapshot),
            }))
        }

        Command::Files { gid } => {
            let records = session.list_all().await?;
            let files = match resolve(&records, gid) {
                Some(content) => collect_files(&records, gid, Some(&content.gid)),
                None => session.get_one(gid).await?.file_paths(),
            };
            Ok(Report::Files(FilesReport { success: true, files }))
        }

        Command::Remove { gid, delete_files } => {
            let removal = session.remove_one(gid, *delete_files).await?;
            if removal.removed {
                info!("Removed {}", gid);
            } else {
                info!("{} was not registered; nothing to remove", gid);
            }
            if *delete_files && removal.removed && !removal.deleted_files {
                warn!("No local files of {} were deleted", gid);
            }
            Ok(Report::Remove(RemoveReport {
                success: true,
                removed: removal.removed,
                deleted_files: removal.deleted_files,
            }))
        }

        Command::Download { source, settings } => {
            let gid = add(session, source).await?;
            let content = CompletionTracker::new(session, clock, *settings).wait(&gid).await?;

            let records = session.list_all().await?;
            let snapshot = project(&lookup(session, &records, &content).await?);
            let files = collect_files(&records, &gid, Some(&content));
            info!("Download of {} complete: {} file(s)", snapshot.name, files.len());

            Ok(Report::Download(DownloadReport::assemble(&gid, &snapshot, files)))
        }
    }
}

async fn add<S>(session: &S, source: &Source) -> Result<Gid>
where
    S: DaemonSession + ?Sized,
{
    let gid = match source {
        Source::Magnet(magnet) => session.add_by_locator(magnet).await?,
        Source::File(path) => session.add_by_file(path).await?,
    };
    info!("Added download {}", gid);
    Ok(gid)
}

/// Status of the record currently holding `gid`'s content
async fn current_status<S>(session: &S, gid: &str) -> Result<StatusSnapshot>
where
    S: DaemonSession + ?Sized,
{
    let records = session.list_all().await?;
    match resolve(&records, gid) {
        Some(record) => Ok(project(record)),
        None => Ok(project(&session.get_one(gid).await?)),
    }
}

async fn lookup<S>(session: &S, records: &[DownloadRecord], gid: &str) -> Result<DownloadRecord>
where
    S: DaemonSession + ?Sized,
{
    match records.iter().find(|r| r.gid == gid) {
        Some(record) => Ok(record.clone()),
        None => session.get_one(gid).await,
    }
}
