#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Decides which FRED series are worth keeping.
//!
//! The `/fred/series/updates` endpoint only exposes a handful of fields per
//! series, so importance is judged from those alone. Rules are applied in
//! this order and the first one that matches decides:
//!
//! 1. `observation_end` earlier than the discontinuation cutoff: **not**
//!    important, no matter what else the record says.
//! 2. `popularity` above the threshold: important.
//! 3. `frequency` is one of the high-update frequencies: important.
//! 4. `id` is on the curated list of well-known indicators: important.
//! 5. Otherwise: not important.

use std::collections::BTreeSet;

use fred_metadata_series_models::SeriesRecord;
use serde::{Deserialize, Serialize};

/// Series whose last observation is before this date are treated as
/// discontinued.
pub const DEFAULT_DISCONTINUED_BEFORE: &str = "2023-01-01";

/// Popularity strictly above this value marks a series as important.
pub const DEFAULT_POPULARITY_THRESHOLD: i64 = 50;

/// Frequencies that indicate an actively maintained series.
pub const DEFAULT_HIGH_FREQUENCIES: &[&str] = &["Daily", "Weekly", "Monthly"];

/// Widely used economic and financial indicators.
pub const DEFAULT_CURATED_IDS: &[&str] = &[
    "GDP",             // Gross Domestic Product
    "GDPC1",           // Real Gross Domestic Product
    "UNRATE",          // Unemployment Rate
    "CPIAUCSL",        // Consumer Price Index
    "FEDFUNDS",        // Federal Funds Effective Rate
    "SP500",           // S&P 500 Index
    "DGS10",           // 10-Year Treasury Constant Maturity Rate
    "PAYEMS",          // All Employees: Total Nonfarm
    "INDPRO",          // Industrial Production Index
    "PCE",             // Personal Consumption Expenditures
    "M2",              // M2 Money Stock
    "HOUST",           // Housing Starts
    "RSAFS",           // Retail Sales
    "USREC",           // NBER Recession Indicators
    "DCOILWTICO",      // Crude Oil Prices: WTI
    "GFDEGDQ188S",     // Federal Debt: Total Public Debt as % of GDP
    "T10Y2Y",          // 10-Year Treasury Minus 2-Year Treasury
    "USAGDPDEFQISMEI", // GDP Implicit Price Deflator
    "UMCSENT",         // Consumer Sentiment Index
    "EXUSEU",          // U.S. / Euro Foreign Exchange Rate
    "DAAA",            // Moody's Seasoned Aaa Corporate Bond Yield
    "DBAA",            // Moody's Seasoned Baa Corporate Bond Yield
    "PCEPI",           // PCE: Chain-type Price Index
];

/// Tunable inputs of the importance decision.
///
/// Every field has a default, so a partial TOML document such as
///
/// ```toml
/// discontinued_before = "2024-01-01"
/// curated_ids = ["GDP", "UNRATE"]
/// ```
///
/// only overrides what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceCriteria {
    /// Zero-padded `YYYY-MM-DD` cutoff. Compared as a string.
    pub discontinued_before: String,
    /// Popularity must be strictly greater than this.
    pub popularity_threshold: i64,
    /// Frequency labels that mark a series as important.
    pub high_frequencies: BTreeSet<String>,
    /// Series IDs that are always important unless discontinued.
    pub curated_ids: BTreeSet<String>,
}

impl Default for ImportanceCriteria {
    fn default() -> Self {
        Self {
            discontinued_before: DEFAULT_DISCONTINUED_BEFORE.to_string(),
            popularity_threshold: DEFAULT_POPULARITY_THRESHOLD,
            high_frequencies: DEFAULT_HIGH_FREQUENCIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            curated_ids: DEFAULT_CURATED_IDS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Which rule decided a record's importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// `observation_end` is before the cutoff.
    Discontinued,
    /// Popularity is above the threshold.
    Popular,
    /// Frequency is in the high-update set.
    HighFrequency,
    /// ID is on the curated list.
    Curated,
    /// No rule matched.
    Unremarkable,
}

impl Verdict {
    /// Whether this verdict keeps the record.
    #[must_use]
    pub const fn is_important(self) -> bool {
        matches!(self, Self::Popular | Self::HighFrequency | Self::Curated)
    }
}

/// Pure predicate over [`SeriesRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct ImportanceFilter {
    criteria: ImportanceCriteria,
}

impl ImportanceFilter {
    /// Creates a filter using `criteria`.
    #[must_use]
    pub const fn new(criteria: ImportanceCriteria) -> Self {
        Self { criteria }
    }

    /// Classifies `record` by the first matching rule.
    #[must_use]
    pub fn verdict(&self, record: &SeriesRecord) -> Verdict {
        if record
            .observation_end()
            .is_some_and(|end| end < self.criteria.discontinued_before.as_str())
        {
            return Verdict::Discontinued;
        }

        if record.popularity() > self.criteria.popularity_threshold {
            return Verdict::Popular;
        }

        if record
            .frequency
            .as_ref()
            .is_some_and(|f| self.criteria.high_frequencies.contains(f))
        {
            return Verdict::HighFrequency;
        }

        if record
            .id
            .as_ref()
            .is_some_and(|id| self.criteria.curated_ids.contains(id))
        {
            return Verdict::Curated;
        }

        Verdict::Unremarkable
    }

    /// Returns `true` if `record` should be kept.
    #[must_use]
    pub fn is_important(&self, record: &SeriesRecord) -> bool {
        self.verdict(record).is_important()
    }

    /// Keeps the important records of `records`, preserving their order.
    #[must_use]
    pub fn retain_important(&self, records: &[SeriesRecord]) -> Vec<SeriesRecord> {
        records
            .iter()
            .filter(|record| self.is_important(record))
            .cloned()
            .collect()
    }
}
