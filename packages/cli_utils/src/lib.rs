#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the transit map toolchain.
//!
//! [`IndicatifProgress`] renders scrape progress as terminal bars behind the
//! scraper's [`ProgressCallback`] trait, and [`init_logger`] routes `log`
//! output through `indicatif-log-bridge` so log lines are printed above
//! the bars instead of through them.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use transit_map_scraper::progress::ProgressCallback;

pub use indicatif::MultiProgress;

const TICK: Duration = Duration::from_millis(100);

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style applied once a total is known.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// A spinner that becomes a bar with position, percentage and ETA once
    /// the scraper reports how many bus routes it will fetch.
    #[must_use]
    pub fn scrape_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar_style = ProgressStyle::with_template(
            "  {msg:<24} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self {
            bar: spinner(multi, message, "{spinner:.cyan} {msg}"),
            bar_style,
        })
    }

    /// A spinner for work with no meaningful total, such as a single POI
    /// request or rendering a map.
    #[must_use]
    pub fn task_spinner(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = spinner(multi, message, "{spinner:.yellow} {msg} [{elapsed}]");
        let bar_style = bar.style();
        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
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

fn spinner(multi: &MultiProgress, message: &str, template: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new_spinner());
    bar.enable_steady_tick(TICK);
    bar.set_style(
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every progress bar must be added to. A
/// logger that is already installed is left in place.
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
