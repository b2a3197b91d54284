use colored::*;
use dupe_garden_core::{DeleteOutcome, Error, ProgressReporter, ScanScope};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// CLI progress reporter: a spinner while a request is in flight, then a
/// coloured one-line result.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show a spinner with `message` until [`finish`](Self::finish).
    pub fn spin(&self, message: impl Into<String>) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut guard = self.bar();
        if let Some(old) = guard.replace(pb) {
            old.finish_and_clear();
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = self.bar().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, scope: &ScanScope) {
        self.spin(format!("Scanning {} for duplicates...", scope));
    }

    fn on_scan_complete(&self, _scope: &ScanScope, records: usize, duration_secs: f64) {
        self.finish();
        eprintln!(
            "  {} Scan complete: {} duplicates in {:.2}s",
            "✓".green(),
            records,
            duration_secs
        );
    }

    fn on_scan_failed(&self, scope: &ScanScope, error: &Error) {
        self.finish();
        eprintln!("  {} Scan of {} failed: {}", "✗".red(), scope, error);
    }

    fn on_delete_start(&self, count: usize) {
        self.spin(format!("Deleting {} duplicate(s)...", count));
    }

    fn on_delete_complete(&self, outcome: &DeleteOutcome, duration_secs: f64) {
        self.finish();
        if outcome.success_count == 0 {
            eprintln!(
                "  {} No duplicates deleted ({} failed)",
                "✗".red(),
                outcome.fail_count
            );
        } else if outcome.fail_count > 0 {
            eprintln!(
                "  {} Deleted {} duplicate(s), {} failed, in {:.2}s",
                "!".yellow(),
                outcome.success_count,
                outcome.fail_count,
                duration_secs
            );
        } else {
            eprintln!(
                "  {} Deleted {} duplicate(s) in {:.2}s",
                "✓".green(),
                outcome.success_count,
                duration_secs
            );
        }
    }

    fn on_delete_failed(&self, error: &Error) {
        self.finish();
        eprintln!("  {} Delete failed: {}", "✗".red(), error);
    }
}
