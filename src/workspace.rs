//! The `Workspace` facade.
//!
//! One cloneable handle over everything a LeadsFlow client session needs:
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   CLI / UI ───> │ Workspace                                    │
//!                 │   api:    Arc<dyn LeadsApi>  (remote)        │
//!                 │   cache:  SharedCache        (leads)         │
//!                 │   board:  StageBoard         (funnel)        │
//!                 │   store:  Store              (device-local)  │
//!                 │   usage:  UsageCounter                       │
//!                 │   deleting: DeletionFlag  <── Poller checks  │
//!                 └──────────────────────────────────────────────┘
//! ```
//!
//! Single-lead mutations are optimistic (see [`crate::optimistic`]); bulk
//! deletion goes through [`BulkDeleter`]. Stage, task, preference and tour
//! changes are written to the store immediately.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use chrono::Utc;
use leadsflow_common::{FunnelStage, Lead, LeadFlag, LeadPatch, NewLead, StageOutcome};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{HttpLeadsApi, ImportSummary, LeadsApi, RemoteSettings};
use crate::bulk_delete::{BulkDeleteReport, BulkDeleter, DEFAULT_CHUNK_SIZE};
use crate::cache::SharedCache;
use crate::config::{Config, DEFAULT_USER};
use crate::errors::{StageError, TaskError, ValidationError, WorkspaceError};
use crate::funnel::{
    DragController, DropAction, FunnelSummary, StageBoard, StageColumn, group_by_stage, summarize,
};
use crate::optimistic;
use crate::refresh::DeletionFlag;
use crate::store::{Preferences, Store, StoreData};
use crate::tasks::TaskBook;
use crate::usage::UsageCounter;
use crate::validate::{DuplicateGroup, find_duplicates, validate_new_lead, validate_patch};

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    pub user: String,
    pub lead_limit: Option<usize>,
    pub chunk_size: usize,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            lead_limit: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl WorkspaceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user: config.user.clone(),
            lead_limit: config.lead_limit,
            chunk_size: config.chunk_size,
        }
    }
}

/// What one refresh changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStats {
    /// Leads returned by the backend.
    pub fetched: usize,
    /// Returned leads hidden because this device deleted them.
    pub hidden: usize,
    /// Tracked deleted ids dropped because the backend no longer has them.
    pub pruned: usize,
    /// Leads now in the cache.
    pub cached: usize,
}

/// A row rejected locally during import.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRow {
    /// Zero-based position in the input.
    pub index: usize,
    pub name: String,
    pub error: ValidationError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub invalid: Vec<InvalidRow>,
    /// Valid rows not sent because the plan limit would be exceeded.
    pub over_limit: usize,
}

/// Result of [`Workspace::delete_leads`].
pub struct BulkDeleteOutcome {
    pub report: BulkDeleteReport,
    /// Background refetch reconciling the cache with the backend. `None`
    /// when nothing was requested or the backend went offline.
    pub reconcile: Option<JoinHandle<WorkspaceResult<RefreshStats>>>,
}

#[derive(Clone)]
pub struct Workspace {
    api: Arc<dyn LeadsApi>,
    cache: SharedCache,
    board: Arc<Mutex<StageBoard>>,
    store: Arc<Mutex<Store>>,
    usage: UsageCounter,
    deleting: DeletionFlag,
    user: String,
    chunk_size: usize,
}

impl Workspace {
    pub fn new(api: Arc<dyn LeadsApi>, store: Store, options: WorkspaceOptions) -> Self {
        let board = StageBoard::new(store.data().funnel_stages.clone());
        Self {
            api,
            cache: SharedCache::default(),
            board: Arc::new(Mutex::new(board)),
            store: Arc::new(Mutex::new(store)),
            usage: UsageCounter::new(options.lead_limit),
            deleting: DeletionFlag::default(),
            user: options.user,
            chunk_size: options.chunk_size.max(1),
        }
    }

    /// Build the HTTP client and open the store under the configured home.
    pub fn connect(config: &Config) -> anyhow::Result<Self> {
        let api = HttpLeadsApi::new(&config.api_url, config.api_token.clone(), config.timeout)?;
        let store = Store::open(&config.home)
            .with_context(|| format!("Failed to open store in {}", config.home.display()))?;
        debug!(api_url = %config.api_url, user = %config.user, "Workspace connected");
        Ok(Self::new(
            Arc::new(api),
            store,
            WorkspaceOptions::from_config(config),
        ))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn usage(&self) -> &UsageCounter {
        &self.usage
    }

    pub fn deletion_flag(&self) -> &DeletionFlag {
        &self.deleting
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting.is_active()
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn store_snapshot(&self) -> StoreData {
        lock(&self.store).data().clone()
    }

    fn update_store<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> WorkspaceResult<R> {
        Ok(lock(&self.store).update(f)?)
    }

    fn record_deleted(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        let user = self.user.clone();
        if let Err(e) = self.update_store(|d| d.record_deleted(&user, ids)) {
            warn!(error = %e, count = ids.len(), "Failed to persist deleted lead ids");
        }
    }

    // ── Leads ────────────────────────────────────────────────────────────

    /// Refetch the lead list and replace the cache.
    pub async fn refresh(&self) -> WorkspaceResult<RefreshStats> {
        let leads = self.api.list_leads().await?;
        let fetched = leads.len();

        let tracked: HashSet<String> =
            lock(&self.store).data().deleted_for(&self.user).iter().cloned().collect();
        let server_ids: HashSet<String> = leads.iter().map(|l| l.id.clone()).collect();

        let mut pruned = 0;
        if tracked.iter().any(|id| !server_ids.contains(id)) {
            let user = self.user.clone();
            match self.update_store(|d| d.prune_deleted(&user, &server_ids)) {
                Ok(n) => pruned = n,
                Err(e) => warn!(error = %e, "Failed to prune deleted lead ids"),
            }
        }

        let visible: Vec<Lead> = leads
            .into_iter()
            .filter(|l| !tracked.contains(&l.id))
            .collect();
        let stats = RefreshStats {
            fetched,
            hidden: fetched - visible.len(),
            pruned,
            cached: visible.len(),
        };
        self.cache.with(|c| c.replace_all(visible));
        self.usage.set(stats.cached);
        debug!(?stats, "Leads refreshed");
        Ok(stats)
    }

    pub fn leads(&self) -> Vec<Lead> {
        self.cache.snapshot()
    }

    pub fn lead(&self, id: &str) -> Option<Lead> {
        self.cache.get(id)
    }

    fn cached(&self, id: &str) -> WorkspaceResult<Lead> {
        self.cache
            .get(id)
            .ok_or_else(|| WorkspaceError::LeadNotCached(id.to_string()))
    }

    /// Validate, check the plan limit, then create on the backend. Leads
    /// without a status start in the first stage.
    pub async fn create_lead(&self, lead: NewLead) -> WorkspaceResult<Lead> {
        let mut lead = validate_new_lead(&lead)?;
        if let Some(limit) = self.usage.limit()
            && self.usage.at_limit()
        {
            return Err(WorkspaceError::LimitReached { limit });
        }
        if lead.status.as_deref().is_none_or(|s| s.trim().is_empty()) {
            lead.status = Some(lock(&self.board).first().effective_status().to_string());
        }

        let created = self.api.create_lead(&lead).await?;
        self.cache.with(|c| c.upsert(created.clone()));
        self.usage.increment();
        info!(lead_id = %created.id, "Lead created");
        Ok(created)
    }

    /// Import a batch. Invalid rows and rows beyond the plan limit are
    /// reported and never sent.
    pub async fn import_leads(&self, leads: Vec<NewLead>) -> WorkspaceResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut valid = Vec::with_capacity(leads.len());
        for (index, lead) in leads.iter().enumerate() {
            match validate_new_lead(lead) {
                Ok(lead) => valid.push(lead),
                Err(error) => report.invalid.push(InvalidRow {
                    index,
                    name: lead.name.clone(),
                    error,
                }),
            }
        }

        if let Some(remaining) = self.usage.remaining()
            && valid.len() > remaining
        {
            report.over_limit = valid.len() - remaining;
            valid.truncate(remaining);
        }
        if valid.is_empty() {
            return Ok(report);
        }

        report.summary = self.api.import_leads(&valid).await?;
        info!(
            imported = report.summary.imported,
            skipped = report.summary.skipped,
            invalid = report.invalid.len(),
            "Leads imported"
        );
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after import failed");
        }
        Ok(report)
    }

    /// Local preview of what server-side duplicate removal would target.
    pub fn find_duplicates(&self) -> Vec<DuplicateGroup> {
        self.cache.with(|c| find_duplicates(c.as_slice()))
    }

    pub async fn remove_duplicates(&self) -> WorkspaceResult<usize> {
        let removed = self.api.remove_duplicates().await?;
        info!(removed, "Duplicate leads removed");
        self.refresh().await?;
        Ok(removed)
    }

    async fn patch_lead(&self, id: &str, patch: LeadPatch) -> WorkspaceResult<Lead> {
        self.cached(id)?;
        let api = Arc::clone(&self.api);
        let remote_patch = patch.clone();
        let owned_id = id.to_string();
        let updated = optimistic::mutate(
            &self.cache,
            id,
            |c| {
                c.update(id, |lead| patch.apply(lead));
            },
            move || async move { api.update_lead(&owned_id, &remote_patch).await },
        )
        .await?;
        self.cache.with(|c| c.upsert(updated.clone()));
        Ok(updated)
    }

    pub async fn edit_lead(&self, id: &str, patch: LeadPatch) -> WorkspaceResult<Lead> {
        if patch.is_empty() {
            return Err(WorkspaceError::EmptyPatch);
        }
        let patch = validate_patch(&patch)?;
        self.patch_lead(id, patch).await
    }

    /// Set a lead's status. Entering a won stage stamps `converted_at`.
    pub async fn change_status(&self, id: &str, status: &str) -> WorkspaceResult<Lead> {
        let status = status.trim();
        if status.is_empty() {
            return Err(WorkspaceError::EmptyPatch);
        }
        let lead = self.cached(id)?;
        let mut patch = LeadPatch::status(status);
        let won = lock(&self.board)
            .stages()
            .iter()
            .find(|s| s.matches_status(status))
            .is_some_and(|s| s.outcome == StageOutcome::Won);
        if won && lead.converted_at.is_none() {
            patch.converted_at = Some(Utc::now());
        }
        let updated = self.patch_lead(id, patch).await?;
        info!(lead_id = id, from = %lead.status, to = status, "Lead status changed");
        Ok(updated)
    }

    pub async fn set_flag(&self, id: &str, flag: LeadFlag, value: bool) -> WorkspaceResult<Lead> {
        self.patch_lead(id, LeadPatch::flag(flag, value)).await
    }

    pub async fn toggle_flag(&self, id: &str, flag: LeadFlag) -> WorkspaceResult<Lead> {
        let current = self.cached(id)?.flag(flag);
        self.set_flag(id, flag, !current).await
    }

    /// Optimistic single delete. A lead the backend no longer has counts as
    /// deleted.
    pub async fn delete_lead(&self, id: &str) -> WorkspaceResult<()> {
        let was_cached = self.cache.get(id).is_some();
        let api = Arc::clone(&self.api);
        let owned_id = id.to_string();
        optimistic::mutate(
            &self.cache,
            id,
            |c| {
                c.remove(id);
            },
            move || async move {
                match api.delete_lead(&owned_id).await {
                    Err(e) if e.is_gone() => Ok(()),
                    other => other,
                }
            },
        )
        .await?;
        if was_cached {
            self.usage.decrement(1);
        }
        self.record_deleted(&[id.to_string()]);
        info!(lead_id = id, "Lead deleted");
        Ok(())
    }

    /// Bulk delete, then apply confirmed ids to the cache, the usage counter
    /// and the deleted-ids tracking list, and start a reconcile refetch.
    pub async fn delete_leads<F>(&self, ids: &[String], progress: F) -> BulkDeleteOutcome
    where
        F: FnMut(usize, usize) + Send,
    {
        let deleting = self.deleting.begin();
        let deleter = BulkDeleter::new(Arc::clone(&self.api), self.deleting.clone())
            .with_chunk_size(self.chunk_size);
        let report = deleter.run(ids, progress).await;

        if !report.deleted.is_empty() {
            let confirmed: HashSet<String> = report.deleted.iter().cloned().collect();
            let removed = self.cache.with(|c| c.retain_ids_not_in(&confirmed));
            self.usage.decrement(removed);
            self.record_deleted(&report.deleted);
        }
        drop(deleting);

        let reconcile = (!report.aborted && report.requested > 0).then(|| {
            let workspace = self.clone();
            tokio::spawn(async move { workspace.refresh().await })
        });
        BulkDeleteOutcome { report, reconcile }
    }

    // ── Funnel ───────────────────────────────────────────────────────────

    pub fn stages(&self) -> Vec<FunnelStage> {
        lock(&self.board).stages().to_vec()
    }

    pub fn subscribe_stages(&self) -> watch::Receiver<Vec<FunnelStage>> {
        lock(&self.board).subscribe()
    }

    pub fn board(&self) -> Vec<StageColumn> {
        let stages = self.stages();
        self.cache.with(|c| group_by_stage(&stages, c.as_slice()))
    }

    pub fn summary(&self) -> FunnelSummary {
        summarize(&self.board())
    }

    /// Resolve a finished drag against the current board and cache.
    pub fn end_drag(&self, drag: &mut DragController) -> DropAction {
        let board = lock(&self.board);
        self.cache.with(|c| drag.drag_end(&board, c))
    }

    /// Carry out a resolved drop. Returns the updated lead for lead moves.
    pub async fn apply_drop(&self, action: DropAction) -> WorkspaceResult<Option<Lead>> {
        match action {
            DropAction::ReorderStages { from, to } => {
                self.move_stage(from, to)?;
                Ok(None)
            }
            DropAction::MoveLead {
                lead_id, to_status, ..
            } => Ok(Some(self.change_status(&lead_id, &to_status).await?)),
            DropAction::None => Ok(None),
        }
    }

    /// Drop a lead onto a stage by id.
    pub async fn move_lead_to_stage(&self, lead_id: &str, stage_id: &str) -> WorkspaceResult<Lead> {
        let target = lock(&self.board)
            .find(stage_id)
            .map(|s| s.effective_status().to_string())
            .ok_or_else(|| StageError::NotFound(stage_id.to_string()))?;
        let lead = self.cached(lead_id)?;
        if lead.status == target {
            return Ok(lead);
        }
        self.change_status(lead_id, &target).await
    }

    /// Apply `f` to the saved stage list, then publish it once the store
    /// write has landed.
    fn update_board<R>(
        &self,
        f: impl FnOnce(&mut StageBoard) -> Result<R, StageError>,
    ) -> WorkspaceResult<R> {
        let mut board = lock(&self.board);
        let (result, stages) = lock(&self.store).try_update(|d| {
            let mut draft = StageBoard::new(std::mem::take(&mut d.funnel_stages));
            let result = f(&mut draft)?;
            d.funnel_stages = draft.stages().to_vec();
            Ok::<_, WorkspaceError>((result, d.funnel_stages.clone()))
        })?;
        board.replace(stages);
        Ok(result)
    }

    pub fn add_stage(&self, label: &str, color: &str) -> WorkspaceResult<FunnelStage> {
        self.update_board(|b| b.add(label, color).cloned())
    }

    pub fn rename_stage(&self, id: &str, label: &str) -> WorkspaceResult<()> {
        self.update_board(|b| b.rename(id, label))
    }

    pub fn recolor_stage(&self, id: &str, color: &str) -> WorkspaceResult<()> {
        self.update_board(|b| b.recolor(id, color))
    }

    pub fn set_stage_outcome(&self, id: &str, outcome: StageOutcome) -> WorkspaceResult<()> {
        self.update_board(|b| b.set_outcome(id, outcome))
    }

    pub fn remove_stage(&self, id: &str) -> WorkspaceResult<FunnelStage> {
        self.update_board(|b| b.remove(id))
    }

    pub fn move_stage(&self, from: usize, to: usize) -> WorkspaceResult<()> {
        self.update_board(|b| b.move_stage(from, to))
    }

    pub fn reset_stages(&self) -> WorkspaceResult<()> {
        self.update_board(|b| {
            b.reset();
            Ok(())
        })
    }

    // ── Tasks, preferences, tours ────────────────────────────────────────

    pub fn tasks(&self) -> TaskBook {
        TaskBook::new(lock(&self.store).data().tasks.clone())
    }

    /// Run `f` on the task book and persist the result when it succeeds.
    pub fn update_tasks<R>(
        &self,
        f: impl FnOnce(&mut TaskBook) -> Result<R, TaskError>,
    ) -> WorkspaceResult<R> {
        lock(&self.store).try_update(|d| {
            let mut book = TaskBook::new(std::mem::take(&mut d.tasks));
            let result = f(&mut book)?;
            d.tasks = book.into_inner();
            Ok(result)
        })
    }

    pub fn preferences(&self) -> Preferences {
        lock(&self.store).data().preferences.clone()
    }

    pub fn set_preference(&self, key: &str, value: &str) -> WorkspaceResult<Preferences> {
        lock(&self.store).try_update(|d| {
            d.preferences
                .set(key, value)
                .map_err(WorkspaceError::InvalidPreference)?;
            Ok(d.preferences.clone())
        })
    }

    pub fn complete_tour(&self, name: &str) -> WorkspaceResult<()> {
        self.update_store(|d| d.complete_tour(name))
    }

    pub fn tour_completed(&self, name: &str) -> bool {
        lock(&self.store).data().tour_completed(name)
    }

    // ── Remote settings ──────────────────────────────────────────────────

    pub async fn remote_settings(&self) -> WorkspaceResult<RemoteSettings> {
        Ok(self.api.get_settings().await?)
    }

    /// Read-modify-write one key of the backend settings object.
    pub async fn set_remote_setting(&self, key: &str, value: Value) -> WorkspaceResult<RemoteSettings> {
        let mut settings = self.api.get_settings().await?;
        settings.insert(key.to_string(), value);
        self.api.save_settings(&settings).await?;
        info!(key, "Remote setting saved");
        Ok(settings)
    }
}
