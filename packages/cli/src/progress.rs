//! Terminal output: the fetched-series bar and the logger that draws
//! around it.

use std::sync::Arc;
use std::time::Duration;

use fred_metadata_harvest::progress::ProgressCallback;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{spinner:.cyan} [{elapsed_precise}] {human_pos}/{human_len} series ({percent}%) {msg}";

/// Counts fetched series against the total FRED reports for the query.
pub struct SeriesBar {
    bar: ProgressBar,
}

impl SeriesBar {
    /// Adds a bar to `multi`. Its length stays `0` until the first page
    /// reports a total.
    #[must_use]
    pub fn add_to(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));

        Arc::new(Self { bar })
    }
}

impl ProgressCallback for SeriesBar {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`, and returns the [`MultiProgress`] it draws
/// through.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
