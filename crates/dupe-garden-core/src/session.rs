use crate::activity::{ActivityKind, ActivitySink, NewActivity};
use crate::backend::DuplicateBackend;
use crate::cache::ResultCache;
use crate::error::Error;
use crate::model::DuplicateRecord;
use crate::mutation::{BulkMutationExecutor, DeleteOutcome};
use crate::orchestrator::ScanOrchestrator;
use crate::progress::{ProgressReporter, SilentReporter};
use crate::scope::ScanScope;
use crate::selection::Selection;
use crate::stats::DuplicateStats;
use crate::view::{self, SortKey, ViewQuery};
use ahash::AHashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// What became of a `scan` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The cache now holds exactly this many records from the scan.
    Completed { records: usize },
    /// A scan for the same scope was already running; nothing was requested.
    AlreadyRunning,
}

#[derive(Default)]
struct SessionState {
    cache: ResultCache,
    selection: Selection,
    query: ViewQuery,
    /// Scope of the records currently in the cache.
    scope: Option<ScanScope>,
}

/// One user's working set of duplicates: the result cache, the selection and
/// the current view query, plus the scan and delete workflows over them.
///
/// The state lock is only taken for synchronous steps and never held across
/// a backend call.
pub struct DashboardSession {
    user_id: String,
    orchestrator: ScanOrchestrator,
    executor: BulkMutationExecutor,
    activities: Arc<dyn ActivitySink>,
    reporter: Arc<dyn ProgressReporter>,
    state: Mutex<SessionState>,
}

impl DashboardSession {
    pub fn new(
        user_id: impl Into<String>,
        backend: Arc<dyn DuplicateBackend>,
        activities: Arc<dyn ActivitySink>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            orchestrator: ScanOrchestrator::new(Arc::clone(&backend)),
            executor: BulkMutationExecutor::new(backend),
            activities,
            reporter: Arc::new(SilentReporter),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_scanning(&self, scope: &ScanScope) -> bool {
        self.orchestrator.is_scanning(scope)
    }

    /// Scan `scope` and replace the cache with the result.
    ///
    /// A second call for a scope that is still scanning returns
    /// [`ScanOutcome::AlreadyRunning`] without contacting the backend. On
    /// failure the cache keeps its previous contents.
    pub async fn scan(&self, scope: &ScanScope) -> Result<ScanOutcome, Error> {
        scope.validate()?;

        let Some(guard) = self.orchestrator.try_begin(scope) else {
            debug!("Scan already in progress for {}, skipping", scope);
            return Ok(ScanOutcome::AlreadyRunning);
        };

        info!("Scanning duplicates for {}", scope);
        self.reporter.on_scan_start(scope);
        self.emit(
            format!("Started duplicate scan for {}{}", scope.service, scope.qualifiers()),
            ActivityKind::Scan,
            &scope.project_id,
        )
        .await;

        let started = Instant::now();
        let records = match self.orchestrator.fetch(&guard, &self.user_id, scope).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Scan failed for {}: {}", scope, e);
                self.reporter.on_scan_failed(scope, &e);
                return Err(e);
            }
        };

        let count = {
            let mut state = self.state();
            state.cache.replace(records);
            state.selection.clear();
            state.scope = Some(scope.clone());
            state.cache.len()
        };
        drop(guard);

        let elapsed = started.elapsed().as_secs_f64();
        info!("Scan of {} returned {} duplicates in {:.2}s", scope, count, elapsed);
        self.reporter.on_scan_complete(scope, count, elapsed);
        self.emit(
            format!(
                "Scanned duplicates for {}{}",
                scope.service.as_str().to_uppercase(),
                scope.qualifiers()
            ),
            ActivityKind::Scan,
            &scope.project_id,
        )
        .await;

        Ok(ScanOutcome::Completed { records: count })
    }

    /// Scope of the records currently loaded, if any scan has succeeded.
    pub fn scope(&self) -> Option<ScanScope> {
        self.state().scope.clone()
    }

    pub fn query(&self) -> ViewQuery {
        self.state().query.clone()
    }

    pub fn set_search(&self, search_text: impl Into<String>) {
        self.state().query.search_text = search_text.into();
    }

    pub fn set_sort(&self, sort_key: SortKey) {
        self.state().query.sort_key = sort_key;
    }

    /// The filtered and sorted records for the current query.
    pub fn view(&self) -> Vec<DuplicateRecord> {
        let state = self.state();
        view::derive(state.cache.records(), &state.query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Aggregates over the whole cache, independent of the search filter.
    pub fn stats(&self) -> DuplicateStats {
        DuplicateStats::compute(self.state().cache.records())
    }

    pub fn record_count(&self) -> usize {
        self.state().cache.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state().cache.contains(id)
    }

    /// Flip selection of a cached record. Unknown ids are ignored and return `false`.
    pub fn toggle(&self, id: &str) -> bool {
        let mut state = self.state();
        if !state.cache.contains(id) {
            debug!("Ignoring selection of unknown duplicate {}", id);
            return false;
        }
        state.selection.toggle(id)
    }

    /// Select every record in the current view, or clear if that is already the selection.
    pub fn select_all(&self) {
        let mut state = self.state();
        let SessionState {
            cache,
            selection,
            query,
            ..
        } = &mut *state;
        let visible = view::derive(cache.records(), query);
        selection.select_all(visible.iter().map(|r| r.id.as_str()));
    }

    pub fn clear_selection(&self) {
        self.state().selection.clear();
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.state().selection.to_sorted_vec()
    }

    pub fn selection_len(&self) -> usize {
        self.state().selection.len()
    }

    /// Delete the current selection. See [`delete`](Self::delete).
    pub async fn delete_selected(&self, delete_from_source: bool) -> Result<DeleteOutcome, Error> {
        let ids = self.selected_ids();
        self.delete(&ids, delete_from_source).await
    }

    /// Delete `ids` from the backend and drop the confirmed ones from the
    /// cache and the selection. Repeated ids are sent once.
    ///
    /// `delete_from_source` is passed through to the backend untouched.
    pub async fn delete(
        &self,
        ids: &[String],
        delete_from_source: bool,
    ) -> Result<DeleteOutcome, Error> {
        let ids: Vec<String> = {
            let mut seen = AHashSet::with_capacity(ids.len());
            ids.iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect()
        };
        if ids.is_empty() {
            return Err(Error::EmptySelection);
        }
        let scope = self
            .scope()
            .ok_or_else(|| Error::Other("no scan results are loaded".to_string()))?;

        self.reporter.on_delete_start(ids.len());
        let started = Instant::now();
        let outcome = match self
            .executor
            .execute(&self.user_id, &scope.project_id, &ids, delete_from_source)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Delete of {} duplicate(s) failed: {}", ids.len(), e);
                self.reporter.on_delete_failed(&e);
                return Err(e);
            }
        };

        {
            let mut state = self.state();
            let removed = state.cache.remove_ids(&outcome.removed);
            state.selection.remove(&removed);
        }

        info!(
            "Deleted {} duplicate(s), {} failed",
            outcome.success_count, outcome.fail_count
        );
        self.reporter
            .on_delete_complete(&outcome, started.elapsed().as_secs_f64());

        if outcome.success_count > 0 {
            let service = scope.service.as_str().to_uppercase();
            let message = if ids.len() == 1 {
                format!("Deleted 1 duplicate from {}", service)
            } else {
                format!("Deleted {} duplicate(s) from {}", outcome.success_count, service)
            };
            self.emit(message, ActivityKind::Delete, &scope.project_id)
                .await;
        }

        Ok(outcome)
    }

    async fn emit(&self, message: String, kind: ActivityKind, project_id: &str) {
        let activity = NewActivity {
            user_id: self.user_id.clone(),
            message,
            kind,
            project_id: Some(project_id.to_string()),
        };
        if let Err(e) = self.activities.record(&activity).await {
            warn!("Failed to record activity '{}': {}", activity.message, e);
        }
    }
}
