//! The resumable harvest loop.
//!
//! [`Harvester::run`] is one invocation. It keeps fetching pages until the
//! source runs dry, an error occurs, or the time budget is nearly spent,
//! and always hands back a checkpoint the next invocation can resume from.
//!
//! Counters only advance after a page has been fully handled (fetched,
//! filtered, and its batch written), so a failed page is retried from
//! scratch by the next invocation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fred_metadata_filter::ImportanceFilter;
use fred_metadata_harvest_models::{
    Checkpoint, HarvestResult, HarvestStatus, Progress, RunSummary,
};
use fred_metadata_source::PageFetcher;

use crate::batch::BatchPersister;
use crate::budget::{ExecutionBudget, Unbounded};
use crate::checkpoint::CheckpointManager;
use crate::config::HarvestSettings;
use crate::index::IndexBuilder;
use crate::progress::{ProgressCallback, null_progress};
use crate::{HarvestContext, HarvestError};

/// Where the loop is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoopState {
    Running,
    PausedForTimeout,
    Failed(String),
    Completed,
}

/// What handling one page did.
enum PageOutcome {
    /// The page had records and progress advanced.
    Harvested,
    /// The page was empty: nothing more to fetch.
    Exhausted,
}

/// Drives fetch, filter, persist, and checkpoint for one invocation.
pub struct Harvester {
    fetcher: Arc<dyn PageFetcher>,
    filter: ImportanceFilter,
    settings: HarvestSettings,
    budget: Arc<dyn ExecutionBudget>,
    progress: Arc<dyn ProgressCallback>,
    batches: BatchPersister,
    checkpoints: CheckpointManager,
    index: IndexBuilder,
}

impl Harvester {
    /// Creates a harvester with default filter criteria, default settings,
    /// no host deadline, and no progress reporting.
    #[must_use]
    pub fn new(context: HarvestContext, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            filter: ImportanceFilter::default(),
            settings: HarvestSettings::default(),
            budget: Arc::new(Unbounded),
            progress: null_progress(),
            batches: BatchPersister::new(context.clone()),
            checkpoints: CheckpointManager::new(context.clone()),
            index: IndexBuilder::new(context),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ImportanceFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub const fn with_settings(mut self, settings: HarvestSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses `budget` as the host's remaining-time signal.
    #[must_use]
    pub fn with_budget(mut self, budget: Arc<dyn ExecutionBudget>) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Runs one invocation, starting from `resume` if given or from the
    /// beginning otherwise.
    ///
    /// Never returns an error: failures are reported as a
    /// [`HarvestStatus::Failed`] result whose checkpoint carries the error
    /// message and the progress made before it.
    pub async fn run(&self, resume: Option<Checkpoint>) -> HarvestResult {
        let start = Instant::now();
        let time_box = self.settings.time_box();

        let mut progress = resume.as_ref().map(Checkpoint::progress).unwrap_or_default();
        if resume.is_some() {
            log::info!(
                "Resuming execution from checkpoint: offset={}, batch={}, total_fetched={}",
                progress.offset,
                progress.batch_number,
                progress.total_fetched
            );
        }
        self.progress.set_position(progress.total_fetched);

        let mut api_calls: u64 = 0;
        let mut state = LoopState::Running;

        while state == LoopState::Running {
            let elapsed = start.elapsed();
            if time_box.should_pause(elapsed, self.budget.remaining()) {
                log::info!(
                    "Approaching timeout. Creating checkpoint after {:.2}s",
                    elapsed.as_secs_f64()
                );
                state = LoopState::PausedForTimeout;
                continue;
            }

            api_calls += 1;
            state = match self.harvest_page(&mut progress).await {
                Ok(PageOutcome::Exhausted) => {
                    log::info!("No more series found. Completing execution.");
                    LoopState::Completed
                }
                Ok(PageOutcome::Harvested) => {
                    self.rate_limit_pause(api_calls).await;
                    LoopState::Running
                }
                Err(e) => {
                    let message = format!("Error in batch {}: {e}", progress.batch_number);
                    log::error!("{message}");
                    LoopState::Failed(message)
                }
            };
        }

        match state {
            LoopState::PausedForTimeout => {
                let checkpoint = self.checkpoints.save(progress, false, None).await;
                HarvestResult {
                    status: HarvestStatus::Paused,
                    message: "Execution paused and checkpointed due to approaching timeout"
                        .to_string(),
                    checkpoint,
                    summary: None,
                }
            }
            LoopState::Failed(message) => {
                let checkpoint = self
                    .checkpoints
                    .save(progress, false, Some(message.clone()))
                    .await;
                HarvestResult {
                    status: HarvestStatus::Failed,
                    message,
                    checkpoint,
                    summary: None,
                }
            }
            LoopState::Completed | LoopState::Running => self.finish(progress, start).await,
        }
    }

    /// Fetches, filters, and persists the page at `progress.offset`.
    ///
    /// `progress` is only touched once the page has been handled in full.
    async fn harvest_page(&self, progress: &mut Progress) -> Result<PageOutcome, HarvestError> {
        let limit = self.settings.page_limit;

        log::info!(
            "Fetching batch {} (offset: {})",
            progress.batch_number,
            progress.offset
        );
        let page = self.fetcher.fetch_page(progress.offset, limit).await?;

        if page.records.is_empty() {
            return Ok(PageOutcome::Exhausted);
        }

        if let Some(total) = page.count {
            self.progress.set_total(total);
        }

        let fetched = page.records.len() as u64;
        let important = self.filter.retain_important(&page.records);
        let important_count = important.len() as u64;

        log::info!(
            "Batch {}: Found {important_count} important series out of {fetched}",
            progress.batch_number
        );

        if !important.is_empty() {
            self.batches.persist(progress.batch_number, important).await?;
        }

        progress.total_fetched += fetched;
        progress.important_count += important_count;
        progress.offset += limit;
        progress.batch_number += 1;

        self.progress.inc(fetched);
        self.progress.set_message(format!(
            "{} important of {} fetched",
            progress.important_count, progress.total_fetched
        ));

        Ok(PageOutcome::Harvested)
    }

    /// Sleeps after every `calls_per_pause`-th fetch.
    async fn rate_limit_pause(&self, api_calls: u64) {
        let every = self.settings.calls_per_pause;
        let pause = self.settings.rate_limit_pause;

        if every == 0 || pause == Duration::ZERO || api_calls % every != 0 {
            return;
        }

        log::info!(
            "Pausing for {}s to respect API rate limits",
            pause.as_secs_f64()
        );
        tokio::time::sleep(pause).await;
    }

    /// Writes the final checkpoint and rebuilds the index.
    async fn finish(&self, progress: Progress, start: Instant) -> HarvestResult {
        let checkpoint = self.checkpoints.save(progress, true, None).await;

        if let Err(e) = self.index.build(progress.batch_number).await {
            log::error!("Failed to create series index: {e}");
        }

        let summary = RunSummary {
            total_series_processed: progress.total_fetched,
            important_series_saved: progress.important_count,
            execution_time_seconds: start.elapsed().as_secs_f64(),
        };

        self.progress.finish(format!(
            "{} important series saved out of {} processed",
            summary.important_series_saved, summary.total_series_processed
        ));

        HarvestResult {
            status: HarvestStatus::Completed,
            message: "Successfully completed FRED series metadata collection".to_string(),
            checkpoint,
            summary: Some(summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use fred_metadata_harvest_models::RemainingTime;
    use fred_metadata_series_models::{SeriesIndex, SeriesPage, SeriesRecord};
    use fred_metadata_source::SourceError;
    use fred_metadata_storage::{MemoryStore, ObjectStore, StorageError, get_json};

    use super::*;

    const LIMIT: u64 = 3;

    fn series(id: &str, popularity: i64, end: &str) -> SeriesRecord {
        SeriesRecord {
            id: Some(id.to_string()),
            popularity: Some(popularity),
            frequency: Some("Annual".to_string()),
            observation_end: Some(end.to_string()),
            ..SeriesRecord::default()
        }
    }

    /// Serves a fixed dataset in pages of whatever limit is asked for, and
    /// can be told to fail at given offsets.
    struct FakeSource {
        records: Vec<SeriesRecord>,
        fail_at: Mutex<BTreeMap<u64, u32>>,
        delay: Duration,
        calls: Mutex<Vec<u64>>,
    }

    impl FakeSource {
        fn new(records: Vec<SeriesRecord>) -> Self {
            Self {
                records,
                fail_at: Mutex::new(BTreeMap::new()),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_once_at(self, offset: u64) -> Self {
            self.fail_at.lock().unwrap().insert(offset, 1);
            self
        }

        const fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> Vec<u64> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeSource {
        async fn fetch_page(&self, offset: u64, limit: u64) -> Result<SeriesPage, SourceError> {
            self.calls.lock().unwrap().push(offset);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            {
                let mut fail_at = self.fail_at.lock().unwrap();
                if let Some(remaining) = fail_at.get_mut(&offset)
                    && *remaining > 0
                {
                    *remaining -= 1;
                    return Err(SourceError::Status {
                        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                        url: "https://api.stlouisfed.org/fred/series/updates".to_string(),
                        message: "try later".to_string(),
                    });
                }
            }

            let start = usize::try_from(offset).unwrap().min(self.records.len());
            let end = (start + usize::try_from(limit).unwrap()).min(self.records.len());

            Ok(SeriesPage {
                count: Some(self.records.len() as u64),
                offset: Some(offset),
                limit: Some(limit),
                records: self.records[start..end].to_vec(),
            })
        }
    }

    /// A [`MemoryStore`] whose writes fail for keys containing a marker.
    struct FlakyStore {
        inner: MemoryStore,
        fail_marker: &'static str,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        fn location(&self, key: &str) -> String {
            self.inner.location(key)
        }

        async fn put(
            &self,
            key: &str,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<(), StorageError> {
            if key.contains(self.fail_marker) {
                return Err(StorageError::Put {
                    location: self.location(key),
                    source: "access denied".into(),
                });
            }
            self.inner.put(key, body, content_type).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key).await
        }
    }

    /// Reports plenty of time for the first `checks` checks, then almost none.
    struct RunsOutAfter {
        checks: usize,
        seen: AtomicUsize,
    }

    impl RunsOutAfter {
        const fn new(checks: usize) -> Self {
            Self {
                checks,
                seen: AtomicUsize::new(0),
            }
        }
    }

    impl ExecutionBudget for RunsOutAfter {
        fn remaining(&self) -> RemainingTime {
            if self.seen.fetch_add(1, Ordering::SeqCst) < self.checks {
                RemainingTime::Known(Duration::from_secs(3600))
            } else {
                RemainingTime::Known(Duration::from_secs(10))
            }
        }
    }

    fn test_settings() -> HarvestSettings {
        HarvestSettings {
            page_limit: LIMIT,
            rate_limit_pause: Duration::ZERO,
            ..HarvestSettings::default()
        }
    }

    fn harvester(store: Arc<dyn ObjectStore>, source: Arc<FakeSource>) -> Harvester {
        Harvester::new(HarvestContext::new(store, "fred"), source).with_settings(test_settings())
    }

    /// Eight records over three pages: [A B C] [D E F] [G H].
    fn dataset() -> Vec<SeriesRecord> {
        vec![
            series("A", 60, "2024-01-01"),
            series("B", 1, "2024-01-01"),
            series("C", 80, "2024-01-01"),
            series("D", 2, "2024-01-01"),
            series("E", 3, "2024-01-01"),
            series("F", 4, "2024-01-01"),
            series("G", 70, "2024-01-01"),
            series("UNRATE", 5, "2024-01-01"),
        ]
    }

    async fn stored_objects(store: &MemoryStore, prefix: &str) -> BTreeMap<String, Vec<u8>> {
        let mut objects = BTreeMap::new();
        for key in store.keys_with_prefix(prefix) {
            let body = store.get(&key).await.unwrap().unwrap();
            objects.insert(key, body);
        }
        objects
    }

    #[tokio::test]
    async fn keeps_important_series_and_counts_everything() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::new(vec![
            series("GDP", 10, "2024-01-01"),
            series("X1", 60, "2024-01-01"),
            series("X2", 5, "2020-01-01"),
        ]));

        let result = harvester(store.clone(), source.clone()).run(None).await;

        assert_eq!(result.status, HarvestStatus::Completed);
        assert_eq!(result.checkpoint.total_fetched, 3);
        assert_eq!(result.checkpoint.important_count, 2);
        assert_eq!(result.checkpoint.batch_number, 1);
        assert!(result.checkpoint.execution_complete);

        let batch: serde_json::Value = get_json(store.as_ref(), "fred/batches/batch_0.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch["count"], 2);
        assert_eq!(batch["series"][0]["id"], "GDP");
        assert_eq!(batch["series"][1]["id"], "X1");

        let summary = result.summary.unwrap();
        assert_eq!(summary.total_series_processed, 3);
        assert_eq!(summary.important_series_saved, 2);
    }

    #[tokio::test]
    async fn empty_first_page_completes_without_batches() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::new(Vec::new()));

        let result = harvester(store.clone(), source.clone()).run(None).await;

        assert_eq!(result.status, HarvestStatus::Completed);
        assert_eq!(result.checkpoint.offset, 0);
        assert_eq!(result.checkpoint.batch_number, 0);
        assert!(store.keys_with_prefix("fred/batches/").is_empty());
        assert_eq!(source.calls(), vec![0]);

        let index: SeriesIndex = get_json(store.as_ref(), "fred/series_index.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(index.count, 0);
    }

    #[tokio::test]
    async fn full_run_writes_batches_checkpoints_and_sorted_index() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::new(dataset()));

        let result = harvester(store.clone(), source.clone()).run(None).await;

        assert_eq!(result.status, HarvestStatus::Completed);
        assert_eq!(source.calls(), vec![0, 3, 6, 9]);
        assert_eq!(result.checkpoint.offset, 9);
        assert_eq!(result.checkpoint.batch_number, 3);
        assert_eq!(result.checkpoint.total_fetched, 8);
        assert_eq!(result.checkpoint.important_count, 4);

        // page [D E F] has nothing important, so batch 1 is never written
        assert_eq!(
            store.keys_with_prefix("fred/batches/"),
            vec![
                "fred/batches/batch_0.json".to_string(),
                "fred/batches/batch_2.json".to_string(),
            ]
        );

        let index: SeriesIndex = get_json(store.as_ref(), "fred/series_index.json")
            .await
            .unwrap()
            .unwrap();
        let ids: Vec<_> = index.series.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "G", "A", "UNRATE"]);

        let latest: Checkpoint = get_json(store.as_ref(), "fred/checkpoint.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest, result.checkpoint);
    }

    #[tokio::test]
    async fn resumes_at_checkpoint_offset_and_batch_number() {
        let store = Arc::new(MemoryStore::new());
        let records: Vec<_> = (0..5003)
            .map(|i| series(&format!("S{i}"), 90, "2024-01-01"))
            .collect();
        let source = Arc::new(FakeSource::new(records));
        let harvester = Harvester::new(HarvestContext::new(store.clone(), "fred"), source.clone())
            .with_settings(HarvestSettings {
                page_limit: 1000,
                rate_limit_pause: Duration::ZERO,
                ..HarvestSettings::default()
            });

        let resume = Checkpoint {
            offset: 5000,
            total_fetched: 5000,
            important_count: 5000,
            batch_number: 5,
            ..Checkpoint::default()
        };

        let result = harvester.run(Some(resume)).await;

        assert_eq!(source.calls(), vec![5000, 6000]);
        assert_eq!(
            store.keys_with_prefix("fred/batches/"),
            vec!["fred/batches/batch_5.json".to_string()]
        );
        assert_eq!(result.checkpoint.batch_number, 6);
        assert_eq!(result.checkpoint.total_fetched, 5003);
    }

    #[tokio::test]
    async fn paused_checkpoint_resumes_where_it_stopped() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::new(dataset()));

        let first = harvester(store.clone(), source.clone())
            .with_budget(Arc::new(RunsOutAfter::new(1)))
            .run(None)
            .await;

        assert_eq!(first.status, HarvestStatus::Paused);
        assert!(first.should_resume());
        assert!(!first.checkpoint.execution_complete);
        assert_eq!(first.checkpoint.offset, 3);
        assert_eq!(first.checkpoint.batch_number, 1);
        assert!(store.keys().contains(&"fred/checkpoint.json".to_string()));
        assert!(!store.keys().contains(&"fred/series_index.json".to_string()));

        let second = harvester(store.clone(), source.clone())
            .run(Some(first.checkpoint))
            .await;

        assert_eq!(second.status, HarvestStatus::Completed);
        assert_eq!(source.calls(), vec![0, 3, 6, 9]);
        assert_eq!(second.checkpoint.total_fetched, 8);
        assert_eq!(second.checkpoint.important_count, 4);
    }

    #[tokio::test]
    async fn interrupted_run_stores_the_same_batches_as_an_uninterrupted_one() {
        let straight_store = Arc::new(MemoryStore::new());
        harvester(straight_store.clone(), Arc::new(FakeSource::new(dataset())))
            .run(None)
            .await;

        let resumed_store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::new(dataset()));
        let mut checkpoint = None;
        for _ in 0..10 {
            let result = harvester(resumed_store.clone(), source.clone())
                .with_budget(Arc::new(RunsOutAfter::new(1)))
                .run(checkpoint.take())
                .await;
            if result.status == HarvestStatus::Completed {
                break;
            }
            checkpoint = Some(result.checkpoint);
        }

        assert_eq!(
            stored_objects(&straight_store, "fred/batches/").await,
            stored_objects(&resumed_store, "fred/batches/").await
        );
    }

    /// Runs `pages` one-record pages and returns how much (virtual) time
    /// the rate-limit pauses took.
    async fn rate_limited_run(pages: usize, calls_per_pause: u64) -> (Duration, usize) {
        let records = (0..pages)
            .map(|i| series(&format!("S{i}"), 90, "2024-01-01"))
            .collect();
        let source = Arc::new(FakeSource::new(records));
        let harvester = Harvester::new(
            HarvestContext::new(Arc::new(MemoryStore::new()), "fred"),
            source.clone(),
        )
        .with_settings(HarvestSettings {
            page_limit: 1,
            calls_per_pause,
            rate_limit_pause: Duration::from_secs(5),
            ..HarvestSettings::default()
        });

        let start = tokio::time::Instant::now();
        let result = harvester.run(None).await;
        assert_eq!(result.status, HarvestStatus::Completed);

        (start.elapsed(), source.calls().len())
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_after_every_tenth_fetch() {
        let (slept, calls) = rate_limited_run(25, 10).await;

        assert_eq!(calls, 26);
        assert_eq!(slept, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn final_empty_page_does_not_trigger_a_pause() {
        // the 20th call is the empty page
        let (slept, calls) = rate_limited_run(19, 10).await;

        assert_eq!(calls, 20);
        assert_eq!(slept, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_calls_per_pause_never_sleeps() {
        let (slept, calls) = rate_limited_run(25, 0).await;

        assert_eq!(calls, 26);
        assert_eq!(slept, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_does_not_trigger_a_pause() {
        let records = (0..12)
            .map(|i| series(&format!("S{i}"), 90, "2024-01-01"))
            .collect();
        let source = Arc::new(FakeSource::new(records).failing_once_at(9));
        let harvester = Harvester::new(
            HarvestContext::new(Arc::new(MemoryStore::new()), "fred"),
            source,
        )
        .with_settings(HarvestSettings {
            page_limit: 1,
            calls_per_pause: 10,
            rate_limit_pause: Duration::from_secs(5),
            ..HarvestSettings::default()
        });

        let start = tokio::time::Instant::now();
        let result = harvester.run(None).await;

        assert_eq!(result.status, HarvestStatus::Failed);
        assert_eq!(result.checkpoint.offset, 9);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn pauses_once_runtime_ceiling_is_exceeded() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::new(dataset()).with_delay(Duration::from_millis(20)));

        let result = harvester(store, source.clone())
            .with_settings(HarvestSettings {
                max_runtime: Duration::from_millis(5),
                ..test_settings()
            })
            .run(None)
            .await;

        assert_eq!(result.status, HarvestStatus::Paused);
        assert_eq!(source.calls(), vec![0]);
        assert_eq!(result.checkpoint.offset, 3);
    }

    #[tokio::test]
    async fn fetch_error_fails_with_progress_so_far() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::new(dataset()).failing_once_at(3));

        let result = harvester(store.clone(), source.clone()).run(None).await;

        assert_eq!(result.status, HarvestStatus::Failed);
        assert!(result.message.starts_with("Error in batch 1: HTTP 503"));
        assert_eq!(result.checkpoint.error.as_deref(), Some(result.message.as_str()));
        assert_eq!(result.checkpoint.offset, 3);
        assert_eq!(result.checkpoint.batch_number, 1);
        assert_eq!(result.checkpoint.total_fetched, 3);
        assert!(!result.checkpoint.execution_complete);

        let latest: Checkpoint = get_json(store.as_ref(), "fred/checkpoint.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.error, result.checkpoint.error);

        let retry = harvester(store.clone(), source.clone())
            .run(Some(result.checkpoint))
            .await;

        assert_eq!(retry.status, HarvestStatus::Completed);
        assert_eq!(source.calls(), vec![0, 3, 3, 6, 9]);
        assert_eq!(retry.checkpoint.total_fetched, 8);
        assert!(retry.checkpoint.error.is_none());
    }

    #[tokio::test]
    async fn batch_write_failure_fails_without_advancing() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_marker: "batch_0",
        });
        let source = Arc::new(FakeSource::new(dataset()));

        let result = harvester(store, source).run(None).await;

        assert_eq!(result.status, HarvestStatus::Failed);
        assert!(result.message.starts_with("Error in batch 0: Failed to write"));
        assert_eq!(result.checkpoint.offset, 0);
        assert_eq!(result.checkpoint.batch_number, 0);
        assert_eq!(result.checkpoint.total_fetched, 0);
    }

    #[tokio::test]
    async fn checkpoint_write_failure_does_not_hide_the_fetch_error() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_marker: "checkpoint",
        });
        let source = Arc::new(FakeSource::new(dataset()).failing_once_at(0));

        let result = harvester(store.clone(), source).run(None).await;

        assert_eq!(result.status, HarvestStatus::Failed);
        assert!(result.message.contains("HTTP 503"));
        assert_eq!(result.checkpoint.error.as_deref(), Some(result.message.as_str()));
        assert!(store.inner.keys_with_prefix("fred/checkpoint").is_empty());
    }

    #[tokio::test]
    async fn index_failure_still_completes() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_marker: "series_index",
        });
        let source = Arc::new(FakeSource::new(dataset()));

        let result = harvester(store, source).run(None).await;

        assert_eq!(result.status, HarvestStatus::Completed);
        assert!(result.checkpoint.execution_complete);
    }
}
