//! Progress formatting
//!
//! Human-readable sizes, rates and durations for log output. stdout carries
//! JSON only, so progress is reported through `tracing` rather than a
//! terminal progress bar.

use std::time::Duration;

use crate::daemon::StatusSnapshot;

/// Format bytes to human readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format speed to human readable string
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// Format duration to human readable string
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Estimated time left at the current rate
pub fn calculate_eta(completed: u64, total: u64, bytes_per_sec: u64) -> Option<Duration> {
    if bytes_per_sec == 0 || completed >= total {
        return None;
    }

    let remaining = total - completed;
    Some(Duration::from_secs(remaining.div_ceil(bytes_per_sec)))
}

/// One-line summary of a snapshot for the poll log
pub fn progress_line(snapshot: &StatusSnapshot) -> String {
    let eta = calculate_eta(snapshot.completed_bytes, snapshot.total_bytes, snapshot.rate_bytes_per_sec)
        .map(format_duration)
        .unwrap_or_else(|| "∞".to_string());

    format!(
        "{} {:.1}% | {} / {} | ↓ {} | ETA: {}",
        if snapshot.name.is_empty() { &snapshot.gid } else { &snapshot.name },
        snapshot.progress_percent(),
        format_bytes(snapshot.completed_bytes),
        format_bytes(snapshot.total_bytes),
        format_speed(snapshot.rate_bytes_per_sec),
        eta,
    )
}
