use crate::error::Error;
use crate::mutation::DeleteOutcome;
use crate::scope::ScanScope;

/// Trait for reporting session progress and user-visible notices.
///
/// CLI implements with indicatif/colored output. Skipped re-entrant scans are
/// never reported. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _scope: &ScanScope) {}
    fn on_scan_complete(&self, _scope: &ScanScope, _records: usize, _duration_secs: f64) {}
    fn on_scan_failed(&self, _scope: &ScanScope, _error: &Error) {}
    fn on_delete_start(&self, _count: usize) {}
    fn on_delete_complete(&self, _outcome: &DeleteOutcome, _duration_secs: f64) {}
    fn on_delete_failed(&self, _error: &Error) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
