//! Progress/log surface (C8): a small reporter trait with a plain-log
//! implementation (used in `--no-progress` mode and in tests) and an
//! `indicatif`-backed implementation for interactive terminals, mirroring
//! the overall/per-item bar split the pack uses for Drive transfers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::info;

/// Narrates a source's acquisition: how many items were discovered while
/// listing, and how many have completed downloading.
pub trait ProgressReporter: Send + Sync {
    fn listing_tick(&self, discovered: usize);
    fn downloads_total(&self, total: usize);
    fn download_advanced(&self);
    fn message(&self, text: &str);
    fn finish(&self);
}

/// Emits periodic log lines instead of drawing bars; grounded in the
/// source's own "log every 5 seconds" fallback for non-interactive runs.
pub struct LogReporter {
    last_log: std::sync::Mutex<Instant>,
    downloaded: AtomicUsize,
}

impl LogReporter {
    pub fn new() -> Self {
        LogReporter { last_log: std::sync::Mutex::new(Instant::now()), downloaded: AtomicUsize::new(0) }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for LogReporter {
    fn listing_tick(&self, discovered: usize) {
        let mut last = self.last_log.lock().unwrap();
        if last.elapsed() >= Duration::from_secs(5) {
            info!("Enumerated {discovered} file(s) so far...");
            *last = Instant::now();
        }
    }

    fn downloads_total(&self, total: usize) {
        info!("Scheduled {total} download(s)");
    }

    fn download_advanced(&self) {
        let n = self.downloaded.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 50 == 0 {
            info!("Downloaded {n} file(s) so far...");
        }
    }

    fn message(&self, text: &str) {
        info!("{text}");
    }

    fn finish(&self) {}
}

/// Draws a `MultiProgress` pair: an overall bar plus a spinner/bar for the
/// listing phase, in the style used for the photos-backup overall bar.
pub struct IndicatifReporter {
    multi: MultiProgress,
    listing: ProgressBar,
    downloads: ProgressBar,
}

impl IndicatifReporter {
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let listing = multi.add(ProgressBar::new_spinner());
        listing.set_style(
            ProgressStyle::with_template("{spinner:.cyan} listing  {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
        );
        listing.enable_steady_tick(Duration::from_millis(100));

        let downloads = multi.add(ProgressBar::new(0));
        downloads.set_style(
            ProgressStyle::with_template("[{pos}/{len}] {bar:40.green/white} {msg}")
                .unwrap()
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );

        IndicatifReporter { multi, listing, downloads }
    }
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for IndicatifReporter {
    fn listing_tick(&self, discovered: usize) {
        self.listing.set_message(format!("{discovered} found"));
    }

    fn downloads_total(&self, total: usize) {
        self.downloads.set_length(total as u64);
    }

    fn download_advanced(&self) {
        self.downloads.inc(1);
    }

    fn message(&self, text: &str) {
        self.multi.println(text).ok();
    }

    fn finish(&self) {
        self.listing.finish_and_clear();
        self.downloads.finish_and_clear();
    }
}

/// Build the reporter implied by the `--progress`/`--no-progress` flag and
/// whether stderr is a terminal.
pub fn reporter(use_progress: bool) -> Box<dyn ProgressReporter> {
    if use_progress {
        Box::new(IndicatifReporter::new())
    } else {
        Box::new(LogReporter::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_reporter_counts_downloads() {
        let reporter = LogReporter::new();
        for _ in 0..3 {
            reporter.download_advanced();
        }
        assert_eq!(reporter.downloaded.load(Ordering::SeqCst), 3);
    }
}
