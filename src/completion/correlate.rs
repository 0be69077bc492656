//! Logical download correlation
//!
//! A magnet addition registers a metadata-only record first. Once metadata
//! resolves, the daemon registers a second record for the content under a
//! new identifier. `LogicalDownload` follows one requested identifier through
//! `AwaitingMetadata → AwaitingContent → Done`.
//!
//! The successor of a resolved metadata record is, in order of preference:
//! its `followedBy` link, a record whose `following` points back at it, or
//! the only non-metadata record that appeared after tracking began.

use std::collections::HashSet;

use tracing::debug;

use crate::daemon::{DownloadRecord, Gid};
use crate::error::{ClientError, Result};

/// Upper bound on metadata → content hops followed in one resolution
const MAX_HOPS: usize = 4;

/// Where the tracked download currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    AwaitingMetadata { metadata: Gid },
    AwaitingContent { content: Gid },
    Done { content: Gid },
}

/// One user-visible download, possibly spanning several daemon records
#[derive(Debug, Clone)]
pub struct LogicalDownload {
    requested: Gid,
    phase: Option<Phase>,
    baseline: HashSet<Gid>,
}

impl LogicalDownload {
    pub fn new(requested: impl Into<Gid>) -> Self {
        Self {
            requested: requested.into(),
            phase: None,
            baseline: HashSet::new(),
        }
    }

    /// Identifier of the record currently being followed
    pub fn tracked(&self) -> &str {
        match &self.phase {
            Some(Phase::AwaitingMetadata { metadata }) => metadata,
            Some(Phase::AwaitingContent { content }) | Some(Phase::Done { content }) => content,
            None => &self.requested,
        }
    }

    /// Advance the phase using one poll's worth of records
    ///
    /// Fails with `NotFound` if the requested identifier is missing from the
    /// first poll.
    pub fn observe(&mut self, records: &[DownloadRecord]) -> Result<&Phase> {
        if self.phase.is_none() {
            let record = find(records, &self.requested)
                .ok_or_else(|| ClientError::not_found(self.requested.clone()))?;
            self.baseline = records.iter().map(|r| r.gid.clone()).collect();
            self.phase = Some(if record.is_metadata() {
                Phase::AwaitingMetadata { metadata: record.gid.clone() }
            } else {
                Phase::AwaitingContent { content: record.gid.clone() }
            });
        }

        for _ in 0..MAX_HOPS {
            let next = match &self.phase {
                Some(Phase::AwaitingMetadata { metadata }) => {
                    let resolved = find(records, metadata).map_or(true, |r| r.is_complete());
                    if !resolved {
                        break;
                    }
                    match self.successor(metadata, records) {
                        Some(content) => {
                            debug!("Metadata {} resolved into {}", metadata, content);
                            Phase::AwaitingContent { content }
                        }
                        None => break,
                    }
                }
                Some(Phase::AwaitingContent { content }) => match find(records, content) {
                    Some(record) if record.is_metadata() => Phase::AwaitingMetadata { metadata: content.clone() },
                    Some(record) if record.is_complete() => Phase::Done { content: content.clone() },
                    _ => break,
                },
                Some(Phase::Done { .. }) | None => break,
            };
            self.phase = Some(next);
        }

        self.phase
            .as_ref()
            .ok_or_else(|| ClientError::not_found(self.requested.clone()))
    }

    fn successor(&self, metadata: &str, records: &[DownloadRecord]) -> Option<Gid> {
        if let Some(linked) = linked_successor(metadata, records) {
            return Some(linked);
        }

        let mut fresh = records
            .iter()
            .filter(|r| !r.is_metadata() && !self.baseline.contains(&r.gid));
        match (fresh.next(), fresh.next()) {
            (Some(only), None) => Some(only.gid.clone()),
            _ => None,
        }
    }
}

fn find<'r>(records: &'r [DownloadRecord], gid: &str) -> Option<&'r DownloadRecord> {
    records.iter().find(|r| r.gid == gid)
}

fn linked_successor(metadata: &str, records: &[DownloadRecord]) -> Option<Gid> {
    if let Some(next) = find(records, metadata).and_then(|r| r.followed_by.first()) {
        return Some(next.clone());
    }
    records
        .iter()
        .find(|r| r.following.as_deref() == Some(metadata))
        .map(|r| r.gid.clone())
}

/// Resolve an identifier to the record holding its content
///
/// Follows explicit metadata → content links only; a metadata record whose
/// successor is unknown resolves to itself.
pub fn resolve<'r>(records: &'r [DownloadRecord], gid: &str) -> Option<&'r DownloadRecord> {
    let mut current = find(records, gid)?;
    for _ in 0..MAX_HOPS {
        if !current.is_metadata() {
            break;
        }
        match linked_successor(&current.gid, records).and_then(|next| find(records, &next)) {
            Some(next) => current = next,
            None => break,
        }
    }
    Some(current)
}

/// File paths for a download: the content record's, else the requested one's
pub fn collect_files(records: &[DownloadRecord], requested: &str, content: Option<&str>) -> Vec<String> {
    let candidates = [content, Some(requested)];
    candidates
        .into_iter()
        .flatten()
        .filter_map(|gid| find(records, gid))
        .filter(|r| !r.is_metadata())
        .map(|r| r.file_paths())
        .find(|paths| !paths.is_empty())
        .unwrap_or_default()
}
