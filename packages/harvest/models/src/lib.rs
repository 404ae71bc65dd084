#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Checkpoint, progress, and result types for resumable harvests.
//!
//! A harvest may span many invocations. Each invocation starts from an
//! optional [`Checkpoint`], and ends with a [`HarvestResult`] that carries
//! the checkpoint to feed into the next one.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Counters that describe how far a harvest has got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Offset of the next page to fetch.
    pub offset: u64,
    /// Records fetched so far, important or not.
    pub total_fetched: u64,
    /// Records that passed the importance filter so far.
    pub important_count: u64,
    /// Number to assign to the next batch.
    pub batch_number: u64,
}

/// A snapshot of harvest progress, persisted so a later invocation can
/// pick up where this one stopped.
///
/// Every field has a default so a checkpoint supplied by a caller only
/// needs the counters it cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    /// When the checkpoint was taken (UTC), stored with microsecond
    /// precision in the same form as [`timestamp_string`](Self::timestamp_string).
    #[serde(serialize_with = "serialize_micros")]
    pub timestamp: DateTime<Utc>,
    /// Offset of the next page to fetch.
    pub offset: u64,
    /// Records fetched so far.
    pub total_fetched: u64,
    /// Records kept so far.
    pub important_count: u64,
    /// Number to assign to the next batch.
    pub batch_number: u64,
    /// `true` only once the source has run out of pages.
    pub execution_complete: bool,
    /// Why the invocation that wrote this checkpoint stopped, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Checkpoint {
    /// Builds a checkpoint from `progress` taken at `timestamp`, truncated
    /// to microseconds so it survives a round trip through storage.
    #[must_use]
    pub fn new(
        progress: Progress,
        execution_complete: bool,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(6),
            offset: progress.offset,
            total_fetched: progress.total_fetched,
            important_count: progress.important_count,
            batch_number: progress.batch_number,
            execution_complete,
            error,
        }
    }

    /// The counters a resumed harvest starts from.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        Progress {
            offset: self.offset,
            total_fetched: self.total_fetched,
            important_count: self.important_count,
            batch_number: self.batch_number,
        }
    }

    /// The timestamp as an ISO-8601 string with microsecond precision,
    /// the form used to name history copies.
    #[must_use]
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_micros<S: serde::Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// How much time the host environment says is left, if it says at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingTime {
    /// The host reports this much time left before it kills the process.
    Known(Duration),
    /// The host gives no signal.
    Unknown,
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HarvestStatus {
    /// Stopped early to stay inside the time budget. Not an error.
    Paused,
    /// Stopped on a fetch or storage error.
    Failed,
    /// The source ran out of pages.
    Completed,
}

/// Totals reported when a harvest completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records fetched across every invocation of the harvest.
    pub total_series_processed: u64,
    /// Records kept across every invocation of the harvest.
    pub important_series_saved: u64,
    /// Wall-clock time of the final invocation.
    pub execution_time_seconds: f64,
}

/// What an invocation hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestResult {
    /// How the invocation ended.
    pub status: HarvestStatus,
    /// Human-readable description of the outcome.
    pub message: String,
    /// The latest progress; pass it back in to resume.
    pub checkpoint: Checkpoint,
    /// Totals, present only on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

impl HarvestResult {
    /// Whether another invocation is needed to finish the harvest.
    #[must_use]
    pub const fn should_resume(&self) -> bool {
        matches!(self.status, HarvestStatus::Paused)
    }
}
