use crate::backend::{DeleteBulkRequest, DeleteSingleRequest, DuplicateBackend};
use crate::error::Error;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one delete call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub success_count: usize,
    pub fail_count: usize,
    /// Ids to drop locally. For a batch with any success this is every
    /// attempted id, since the backend only reports counts.
    pub removed: Vec<String>,
}

impl DeleteOutcome {
    pub fn is_partial(&self) -> bool {
        self.success_count > 0 && self.fail_count > 0
    }
}

/// Deletes duplicates: one id goes through the single-item call, more through one batch call.
pub struct BulkMutationExecutor {
    backend: Arc<dyn DuplicateBackend>,
}

impl BulkMutationExecutor {
    pub fn new(backend: Arc<dyn DuplicateBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute(
        &self,
        user_id: &str,
        project_id: &str,
        ids: &[String],
        delete_from_source: bool,
    ) -> Result<DeleteOutcome, Error> {
        match ids {
            [] => Err(Error::EmptySelection),
            [id] => {
                debug!("Deleting duplicate {} (delete_from_source={})", id, delete_from_source);
                self.backend
                    .delete_single(&DeleteSingleRequest {
                        user_id: user_id.to_string(),
                        project_id: project_id.to_string(),
                        duplicate_id: id.clone(),
                        delete_data: delete_from_source,
                    })
                    .await?;
                Ok(DeleteOutcome {
                    success_count: 1,
                    fail_count: 0,
                    removed: vec![id.clone()],
                })
            }
            _ => {
                debug!(
                    "Deleting {} duplicates in one batch (delete_from_source={})",
                    ids.len(),
                    delete_from_source
                );
                let response = self
                    .backend
                    .delete_bulk(&DeleteBulkRequest {
                        user_id: user_id.to_string(),
                        project_id: project_id.to_string(),
                        duplicate_ids: ids.to_vec(),
                        delete_data: delete_from_source,
                    })
                    .await?;

                for message in &response.errors {
                    warn!("Bulk delete: {}", message);
                }

                // Failed ids are unknown, so any success drops the whole batch locally.
                let removed = if response.success_count > 0 {
                    ids.to_vec()
                } else {
                    Vec::new()
                };
                Ok(DeleteOutcome {
                    success_count: response.success_count,
                    fail_count: response.fail_count,
                    removed,
                })
            }
        }
    }
}
