use crate::backend::{DuplicateBackend, ScanRequest};
use crate::error::Error;
use crate::model::DuplicateRecord;
use crate::scope::ScanScope;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Issues scan requests, allowing at most one in flight per scope.
pub struct ScanOrchestrator {
    backend: Arc<dyn DuplicateBackend>,
    in_flight: DashMap<ScanScope, Instant>,
}

/// Marks a scope as scanning until dropped, including when the scan future is dropped early.
pub struct InFlightGuard<'a> {
    in_flight: &'a DashMap<ScanScope, Instant>,
    scope: ScanScope,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.scope);
    }
}

impl ScanOrchestrator {
    pub fn new(backend: Arc<dyn DuplicateBackend>) -> Self {
        Self {
            backend,
            in_flight: DashMap::new(),
        }
    }

    /// Claim `scope`, or `None` if a scan for it is already running.
    pub fn try_begin(&self, scope: &ScanScope) -> Option<InFlightGuard<'_>> {
        match self.in_flight.entry(scope.clone()) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
            }
        }
        Some(InFlightGuard {
            in_flight: &self.in_flight,
            scope: scope.clone(),
        })
    }

    pub fn is_scanning(&self, scope: &ScanScope) -> bool {
        self.in_flight.contains_key(scope)
    }

    /// Run one scan while holding `guard`. The caller obtains the guard from
    /// [`try_begin`](Self::try_begin) so it can react to a skipped scan first.
    pub async fn fetch(
        &self,
        _guard: &InFlightGuard<'_>,
        user_id: &str,
        scope: &ScanScope,
    ) -> Result<Vec<DuplicateRecord>, Error> {
        let request = ScanRequest::new(user_id, scope);
        debug!("Requesting scan for {}", scope);

        let response = self.backend.scan(&request).await?;
        if !response.is_success() {
            return Err(Error::Rejected(
                response
                    .message
                    .unwrap_or_else(|| format!("status '{}'", response.status)),
            ));
        }
        if let Some(message) = &response.message {
            info!("Backend note for {}: {}", scope, message);
        }
        Ok(response.data)
    }
}
