//! Bulk lead deletion.
//!
//! ```text
//! ids ──dedupe──> first id alone ────┬─ Unavailable ──> abort, nothing confirmed
//!                                    └─ ok / gone / other error
//!                                          │
//!                     chunks of `chunk_size`, each chunk via join_all
//!                                          │
//!                     Unavailable in a chunk ──> count it, stop before the next
//! ```
//!
//! Deleting the first id alone keeps an offline backend from producing one
//! failure per id. Deleting an id the backend no longer has counts as
//! deleted. The run only talks to the backend; the workspace applies the
//! report to the cache, the usage counter and the store.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{ApiError, LeadsApi};
use crate::refresh::DeletionFlag;

/// Default number of deletes issued concurrently per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of one bulk deletion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkDeleteReport {
    /// Distinct ids requested.
    pub requested: usize,
    /// Ids confirmed gone, in request order. Includes `already_absent`.
    pub deleted: Vec<String>,
    /// Ids the backend reported as not found.
    pub already_absent: usize,
    pub errors: usize,
    pub failures: Vec<DeleteFailure>,
    /// The backend became unreachable and remaining ids were not attempted.
    pub aborted: bool,
}

impl BulkDeleteReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Ids neither deleted nor failed because the run stopped early.
    pub fn skipped(&self) -> usize {
        self.requested - self.deleted.len() - self.errors
    }

    fn record(&mut self, id: &str, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                self.deleted.push(id.to_string());
                false
            }
            Err(e) if e.is_gone() => {
                debug!(lead_id = id, "Lead already absent on the backend");
                self.deleted.push(id.to_string());
                self.already_absent += 1;
                false
            }
            Err(e) => {
                let offline = e.is_connectivity();
                self.errors += 1;
                self.failures.push(DeleteFailure {
                    id: id.to_string(),
                    error: e.to_string(),
                });
                offline
            }
        }
    }
}

pub struct BulkDeleter {
    api: Arc<dyn LeadsApi>,
    chunk_size: usize,
    flag: DeletionFlag,
}

/// Remove repeated ids, keeping the first occurrence.
pub fn dedupe_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

impl BulkDeleter {
    pub fn new(api: Arc<dyn LeadsApi>, flag: DeletionFlag) -> Self {
        Self {
            api,
            chunk_size: DEFAULT_CHUNK_SIZE,
            flag,
        }
    }

    /// A chunk size of 0 is treated as 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Delete `ids` on the backend. `progress` receives `(processed, total)`
    /// after the first id and after each chunk.
    pub async fn run<F>(&self, ids: &[String], mut progress: F) -> BulkDeleteReport
    where
        F: FnMut(usize, usize) + Send,
    {
        let ids = dedupe_ids(ids);
        let total = ids.len();
        let mut report = BulkDeleteReport {
            requested: total,
            ..BulkDeleteReport::default()
        };
        let Some((first, rest)) = ids.split_first() else {
            return report;
        };

        let _deleting = self.flag.begin();
        info!(total, chunk_size = self.chunk_size, "Starting bulk delete");

        let first_result = self.api.delete_lead(first).await;
        if let Err(e) = &first_result
            && e.is_connectivity()
        {
            warn!(error = %e, "Backend unreachable; bulk delete aborted before any change");
            report.record(first, first_result);
            report.aborted = true;
            return report;
        }
        report.record(first, first_result);
        let mut processed = 1;
        progress(processed, total);

        for chunk in rest.chunks(self.chunk_size) {
            let api = &self.api;
            let results = join_all(chunk.iter().map(|id| async move {
                (id, api.delete_lead(id).await)
            }))
            .await;

            let mut offline = false;
            for (id, result) in results {
                offline |= report.record(id, result);
            }
            processed += chunk.len();
            progress(processed, total);
            debug!(processed, total, "Bulk delete chunk settled");

            if offline {
                report.aborted = true;
                warn!(
                    processed,
                    remaining = total - processed,
                    "Backend went offline; remaining chunks not attempted"
                );
                break;
            }
        }

        info!(
            deleted = report.deleted.len(),
            already_absent = report.already_absent,
            errors = report.errors,
            aborted = report.aborted,
            "Bulk delete finished"
        );
        report
    }
}
