//! Completion tracking
//!
//! Polls the daemon until the logical download reaches a terminal state.
//! Within one poll a failed record anywhere in the daemon's registry wins
//! over a completed one. The deadline is checked before every poll, no poll
//! is issued once it has passed, and no sleep extends beyond it.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::cli::progress::{format_duration, progress_line};
use crate::completion::clock::Clock;
use crate::completion::correlate::{LogicalDownload, Phase};
use crate::daemon::{project, DaemonSession, DownloadRecord, Gid};
use crate::error::{ClientError, Result};

/// Default pause between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default overall deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Outcome of tracking a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionState {
    Waiting,
    /// `gid` is the record that holds the finished content
    Complete { gid: Gid },
    Failed { gid: Gid, message: String },
    TimedOut,
}

impl CompletionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CompletionState::Waiting)
    }
}

/// Poll loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Classify one poll's records
pub fn step(records: &[DownloadRecord], download: &mut LogicalDownload) -> Result<CompletionState> {
    if let Some(failed) = records.iter().find(|r| r.has_failed()) {
        return Ok(CompletionState::Failed {
            gid: failed.gid.clone(),
            message: failed.error_text(),
        });
    }

    Ok(match download.observe(records)? {
        Phase::Done { content } => CompletionState::Complete { gid: content.clone() },
        _ => CompletionState::Waiting,
    })
}

/// Drives the poll loop for one session
pub struct CompletionTracker<'a, S: ?Sized, C: ?Sized> {
    session: &'a S,
    clock: &'a C,
    settings: PollSettings,
}

impl<'a, S, C> CompletionTracker<'a, S, C>
where
    S: DaemonSession + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(session: &'a S, clock: &'a C, settings: PollSettings) -> Self {
        Self { session, clock, settings }
    }

    /// Poll until `gid` reaches a terminal state
    pub async fn run(&self, gid: &str) -> Result<CompletionState> {
        info!(
            "Waiting for {} (timeout {}, polling every {})",
            gid,
            format_duration(self.settings.timeout),
            format_duration(self.settings.interval)
        );

        let start = self.clock.now();
        let mut download = LogicalDownload::new(gid);
        let mut polls = 0u64;

        loop {
            let elapsed = self.clock.now().saturating_sub(start);
            if elapsed >= self.settings.timeout {
                warn!("{} still incomplete after {} polls", gid, polls);
                return Ok(CompletionState::TimedOut);
            }

            polls += 1;
            trace!("Poll {} for {}", polls, gid);
            let records = self.session.list_all().await?;

            let state = step(&records, &mut download)?;
            if state.is_terminal() {
                info!("{} finished after {} polls: {:?}", gid, polls, state);
                return Ok(state);
            }

            if let Some(record) = records.iter().find(|r| r.gid == download.tracked()) {
                debug!("{}", progress_line(&project(record)));
            }

            let remaining = self.settings.timeout.saturating_sub(self.clock.now().saturating_sub(start));
            let pause = self.settings.interval.min(remaining);
            if !pause.is_zero() {
                self.clock.sleep(pause).await;
            }
        }
    }

    /// Poll until complete; failure and timeout become errors
    ///
    /// Returns the identifier of the record holding the content.
    pub async fn wait(&self, gid: &str) -> Result<Gid> {
        match self.run(gid).await? {
            CompletionState::Complete { gid: content } => Ok(content),
            CompletionState::Failed { gid: failed, message } => Err(ClientError::download_failed(failed, message)),
            CompletionState::TimedOut | CompletionState::Waiting => {
                Err(ClientError::timeout(gid, self.settings.timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::clock::ManualClock;
    use crate::daemon::record::{DownloadState, RecordFile};
    use crate::daemon::Removal;
    use crate::torrent::MagnetLink;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Session that replays one record set per poll, repeating the last
    struct ScriptedSession {
        polls: Mutex<Vec<Vec<DownloadRecord>>>,
        count: Mutex<usize>,
    }

    impl ScriptedSession {
        fn new(polls: Vec<Vec<DownloadRecord>>) -> Self {
            Self {
                polls: Mutex::new(polls),
                count: Mutex::new(0),
            }
        }

        fn poll_count(&self) -> usize {
            *self.count.lock().unwrap()
        }
    }

    #[async_trait]
    impl DaemonSession for ScriptedSession {
        async fn add_by_locator(&self, _magnet: &MagnetLink) -> Result<Gid> {
            unreachable!()
        }

        async fn add_by_file(&self, _path: &Path) -> Result<Gid> {
            unreachable!()
        }

        async fn list_all(&self) -> Result<Vec<DownloadRecord>> {
            *self.count.lock().unwrap() += 1;
            let mut polls = self.polls.lock().unwrap();
            if polls.len() > 1 {
                Ok(polls.remove(0))
            } else {
                Ok(polls[0].clone())
            }
        }

        async fn get_one(&self, gid: &str) -> Result<DownloadRecord> {
            Err(ClientError::not_found(gid))
        }

        async fn remove_one(&self, _gid: &str, _purge_files: bool) -> Result<Removal> {
            unreachable!()
        }
    }

    fn record(gid: &str, status: DownloadState) -> DownloadRecord {
        DownloadRecord {
            gid: gid.to_string(),
            status,
            total_length: 41_943_040,
            files: vec![RecordFile {
                path: format!("/downloads/{}.bin", gid),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn metadata(gid: &str, status: DownloadState, followed_by: &[&str]) -> DownloadRecord {
        DownloadRecord {
            gid: gid.to_string(),
            status,
            followed_by: followed_by.iter().map(|s| s.to_string()).collect(),
            files: vec![RecordFile {
                path: "[METADATA]dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn failed(gid: &str, message: &str) -> DownloadRecord {
        DownloadRecord {
            error_message: Some(message.to_string()),
            ..record(gid, DownloadState::Error)
        }
    }

    fn settings(timeout_secs: u64) -> PollSettings {
        PollSettings {
            timeout: Duration::from_secs(timeout_secs),
            interval: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_failure_dominates_unrelated_completion() {
        let mut download = LogicalDownload::new("c1");
        let records = [
            record("c1", DownloadState::Active),
            record("done", DownloadState::Complete),
            failed("bad", "No peers"),
        ];
        let state = step(&records, &mut download).unwrap();
        assert_eq!(
            state,
            CompletionState::Failed {
                gid: "bad".to_string(),
                message: "No peers".to_string()
            }
        );
    }

    #[test]
    fn test_failure_dominates_own_completion() {
        let mut download = LogicalDownload::new("c1");
        let records = [record("c1", DownloadState::Complete), failed("bad", "disk full")];
        assert!(matches!(step(&records, &mut download).unwrap(), CompletionState::Failed { .. }));
    }

    #[test]
    fn test_metadata_only_completion_is_waiting() {
        let mut download = LogicalDownload::new("m1");
        let records = [metadata("m1", DownloadState::Complete, &[])];
        assert_eq!(step(&records, &mut download).unwrap(), CompletionState::Waiting);
    }

    #[tokio::test]
    async fn test_completes_after_metadata_resolves() {
        let session = ScriptedSession::new(vec![
            vec![metadata("m1", DownloadState::Active, &[])],
            vec![
                metadata("m1", DownloadState::Complete, &["c1"]),
                record("c1", DownloadState::Active),
            ],
            vec![
                metadata("m1", DownloadState::Complete, &["c1"]),
                record("c1", DownloadState::Complete),
            ],
        ]);
        let clock = ManualClock::default();
        let tracker = CompletionTracker::new(&session, &clock, settings(60));

        let state = tracker.run("m1").await.unwrap();
        assert_eq!(state, CompletionState::Complete { gid: "c1".to_string() });
        assert_eq!(session.poll_count(), 3);
        assert_eq!(clock.now(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_times_out_without_polling_past_deadline() {
        let session = ScriptedSession::new(vec![vec![record("c1", DownloadState::Active)]]);
        let clock = ManualClock::default();
        let tracker = CompletionTracker::new(&session, &clock, settings(12));

        let state = tracker.run("c1").await.unwrap();
        assert_eq!(state, CompletionState::TimedOut);
        // polls at t=0, 5 and 10; t=15 is past the deadline
        assert_eq!(session.poll_count(), 3);
    }

    #[tokio::test]
    async fn test_sleep_is_clamped_to_deadline() {
        let session = ScriptedSession::new(vec![vec![record("c1", DownloadState::Active)]]);
        let clock = ManualClock::default();
        let settings = PollSettings {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(600),
        };
        let tracker = CompletionTracker::new(&session, &clock, settings);

        assert_eq!(tracker.run("c1").await.unwrap(), CompletionState::TimedOut);
        assert_eq!(clock.now(), Duration::from_secs(60));
        assert_eq!(session.poll_count(), 1);
    }

    #[tokio::test]
    async fn test_final_sleep_stops_at_deadline() {
        let session = ScriptedSession::new(vec![vec![record("c1", DownloadState::Active)]]);
        let clock = ManualClock::default();
        let tracker = CompletionTracker::new(&session, &clock, settings(12));

        assert_eq!(tracker.run("c1").await.unwrap(), CompletionState::TimedOut);
        assert_eq!(clock.now(), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_zero_timeout_never_polls() {
        let session = ScriptedSession::new(vec![vec![record("c1", DownloadState::Complete)]]);
        let clock = ManualClock::default();
        let tracker = CompletionTracker::new(&session, &clock, settings(0));

        assert_eq!(tracker.run("c1").await.unwrap(), CompletionState::TimedOut);
        assert_eq!(session.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_stops_polling() {
        let session = ScriptedSession::new(vec![
            vec![record("c1", DownloadState::Active)],
            vec![failed("c1", "Checksum mismatch")],
            vec![record("c1", DownloadState::Complete)],
        ]);
        let clock = ManualClock::default();
        let tracker = CompletionTracker::new(&session, &clock, settings(60));

        let err = tracker.wait("c1").await.unwrap_err();
        assert!(matches!(err, ClientError::DownloadFailed { .. }));
        assert!(err.to_string().contains("Checksum mismatch"));
        assert_eq!(session.poll_count(), 2);
    }

    #[tokio::test]
    async fn test_wait_maps_timeout_to_error() {
        let session = ScriptedSession::new(vec![vec![metadata("m1", DownloadState::Complete, &[])]]);
        let clock = ManualClock::default();
        let tracker = CompletionTracker::new(&session, &clock, settings(20));

        let err = tracker.wait("m1").await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { timeout_secs: 20, .. }));
    }

    #[tokio::test]
    async fn test_unknown_gid_is_not_found() {
        let session = ScriptedSession::new(vec![vec![record("c1", DownloadState::Complete)]]);
        let clock = ManualClock::default();
        let tracker = CompletionTracker::new(&session, &clock, settings(60));

        let err = tracker.wait("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(session.poll_count(), 1);
    }
}
