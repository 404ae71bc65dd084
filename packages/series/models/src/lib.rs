#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! FRED series metadata records and the documents built from them.
//!
//! A [`SeriesRecord`] is one entry of the `seriess` array returned by the
//! `/fred/series/updates` endpoint. Records that pass the importance filter
//! are written to storage as a [`BatchDocument`], and every batch is later
//! folded into a single [`SeriesIndex`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One series metadata entry from the remote source.
///
/// Every attribute is optional because the remote payload is not
/// guaranteed to carry all of them. Fields this type does not name, and
/// named fields that arrived as `null`, are kept in
/// [`extra`](Self::extra) so a persisted batch holds the record exactly as
/// it was received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct SeriesRecord {
    /// Stable series identifier (e.g. `"GDP"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Update frequency label (`"Daily"`, `"Weekly"`, `"Monthly"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    /// Units label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// First observation date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_start: Option<String>,
    /// Last observation date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_end: Option<String>,
    /// When the remote source last updated this series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Relative popularity score, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<i64>,
    /// Remaining fields of the remote payload, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for SeriesRecord {
    type Error = serde_json::Error;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: take_field(&mut fields, "id")?,
            title: take_field(&mut fields, "title")?,
            frequency: take_field(&mut fields, "frequency")?,
            units: take_field(&mut fields, "units")?,
            observation_start: take_field(&mut fields, "observation_start")?,
            observation_end: take_field(&mut fields, "observation_end")?,
            last_updated: take_field(&mut fields, "last_updated")?,
            popularity: take_field(&mut fields, "popularity")?,
            extra: fields,
        })
    }
}

/// Moves `name` out of `fields` and parses it. A `null` stays behind so
/// it is written back out unchanged.
fn take_field<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    name: &str,
) -> Result<Option<T>, serde_json::Error> {
    if fields.get(name).is_none_or(Value::is_null) {
        return Ok(None);
    }
    fields.remove(name).map(serde_json::from_value).transpose()
}

impl SeriesRecord {
    /// Popularity score, treating an absent value as `0`.
    #[must_use]
    pub fn popularity(&self) -> i64 {
        self.popularity.unwrap_or(0)
    }

    /// The last observation date, if present and non-empty.
    #[must_use]
    pub fn observation_end(&self) -> Option<&str> {
        self.observation_end.as_deref().filter(|s| !s.is_empty())
    }
}

/// One page of the `/fred/series/updates` response.
///
/// Only `seriess` matters for pagination; the remaining fields are the
/// pagination metadata the source echoes back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesPage {
    /// Total number of series matching the query, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Offset the source applied to this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Page size the source applied to this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// The records on this page. An empty list marks the end of the data.
    #[serde(default, rename = "seriess")]
    pub records: Vec<SeriesRecord>,
}

/// The stored form of one batch of important series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchDocument {
    /// Number of records in [`series`](Self::series).
    pub count: usize,
    /// The important records from a single page, in page order.
    #[serde(default)]
    pub series: Vec<SeriesRecord>,
}

impl BatchDocument {
    /// Wraps `series` with its count.
    #[must_use]
    pub fn new(series: Vec<SeriesRecord>) -> Self {
        Self {
            count: series.len(),
            series,
        }
    }
}

/// A [`SeriesRecord`] projected down to the fields kept in the index.
///
/// Absent text fields become empty strings and an absent popularity
/// becomes `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub title: String,
    pub frequency: String,
    pub units: String,
    pub observation_start: String,
    pub observation_end: String,
    pub last_updated: String,
    pub popularity: i64,
}

impl From<&SeriesRecord> for IndexEntry {
    fn from(record: &SeriesRecord) -> Self {
        let text = |field: &Option<String>| field.clone().unwrap_or_default();

        Self {
            id: text(&record.id),
            title: text(&record.title),
            frequency: text(&record.frequency),
            units: text(&record.units),
            observation_start: text(&record.observation_start),
            observation_end: text(&record.observation_end),
            last_updated: text(&record.last_updated),
            popularity: record.popularity(),
        }
    }
}

/// Consolidated index over every persisted batch, most popular first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesIndex {
    /// Number of entries in [`series`](Self::series).
    pub count: usize,
    /// When the index was built.
    pub last_updated: DateTime<Utc>,
    /// Index entries sorted by descending popularity.
    pub series: Vec<IndexEntry>,
}
