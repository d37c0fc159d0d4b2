//! In-process `LeadsApi` used by tests and offline demos.
//!
//! Behaves like the real backend (ids, timestamps, not-found semantics) and
//! lets tests inject failures: a fully offline backend, an outage that starts
//! after N deletes, per-id rejections, and an artificial per-call delay for
//! observing concurrency.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use leadsflow_common::{Lead, LeadPatch, NewLead};

use super::{ApiError, ApiResult, ImportSummary, LeadsApi, RemoteSettings};

#[derive(Default)]
struct State {
    leads: Vec<Lead>,
    next_id: u64,
    settings: RemoteSettings,
    rejected_ids: HashSet<String>,
    reject_updates: bool,
    deletes_before_outage: Option<usize>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct InMemoryLeadsApi {
    state: Mutex<State>,
    offline: AtomicBool,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryLeadsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing leads (ids are kept as given).
    pub fn with_leads(leads: Vec<Lead>) -> Self {
        let api = Self::new();
        api.state().leads = leads;
        api
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call fails as `Unavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Deletes of this id fail as `Rejected`.
    pub fn reject_id(&self, id: &str) {
        self.state().rejected_ids.insert(id.to_string());
    }

    /// All updates fail as `Rejected`.
    pub fn set_reject_updates(&self, reject: bool) {
        self.state().reject_updates = reject;
    }

    /// Allow `n` more deletes, then go offline.
    pub fn go_offline_after_deletes(&self, n: usize) {
        self.state().deletes_before_outage = Some(n);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Calls made so far, e.g. `"delete:a"`, `"list"`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn stored_leads(&self) -> Vec<Lead> {
        self.state().leads.clone()
    }

    /// Change a lead behind the client's back, as another device would.
    pub fn set_remote_status(&self, id: &str, status: &str) {
        if let Some(lead) = self.state().leads.iter_mut().find(|l| l.id == id) {
            lead.status = status.to_string();
        }
    }

    async fn enter(&self, call: String) -> ApiResult<InFlight<'_>> {
        self.state().calls.push(call);
        let guard = InFlight::new(self);
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::unavailable("backend offline"));
        }
        Ok(guard)
    }

    fn insert(&self, new: &NewLead) -> Lead {
        let mut state = self.state();
        state.next_id += 1;
        let lead = Lead {
            id: format!("mem-{}", state.next_id),
            name: new.name.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            interest: new.interest.clone(),
            origin: new.origin.clone(),
            status: new.status.clone().unwrap_or_default(),
            deal_value: new.deal_value,
            favorite: false,
            ai_enabled: false,
            created_at: Utc::now(),
            converted_at: None,
            updated_at: None,
        };
        state.leads.push(lead.clone());
        lead
    }
}

/// Tracks concurrent calls for `max_in_flight`.
struct InFlight<'a> {
    api: &'a InMemoryLeadsApi,
}

impl<'a> InFlight<'a> {
    fn new(api: &'a InMemoryLeadsApi) -> Self {
        let now = api.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        api.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { api }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.api.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LeadsApi for InMemoryLeadsApi {
    async fn list_leads(&self) -> ApiResult<Vec<Lead>> {
        let _call = self.enter("list".to_string()).await?;
        Ok(self.state().leads.clone())
    }

    async fn get_lead(&self, id: &str) -> ApiResult<Lead> {
        let _call = self.enter(format!("get:{}", id)).await?;
        self.state()
            .leads
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Lead {}", id)))
    }

    async fn create_lead(&self, lead: &NewLead) -> ApiResult<Lead> {
        let _call = self.enter("create".to_string()).await?;
        Ok(self.insert(lead))
    }

    async fn update_lead(&self, id: &str, patch: &LeadPatch) -> ApiResult<Lead> {
        let _call = self.enter(format!("update:{}", id)).await?;
        let mut state = self.state();
        if state.reject_updates {
            return Err(ApiError::rejected("update rejected").with_status(422));
        }
        let lead = state
            .leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Lead {}", id)))?;
        patch.apply(lead);
        lead.updated_at = Some(Utc::now());
        Ok(lead.clone())
    }

    async fn delete_lead(&self, id: &str) -> ApiResult<()> {
        let _call = self.enter(format!("delete:{}", id)).await?;
        let mut state = self.state();
        match state.deletes_before_outage {
            Some(0) => {
                drop(state);
                self.set_offline(true);
                return Err(ApiError::unavailable("backend went offline"));
            }
            Some(n) => state.deletes_before_outage = Some(n - 1),
            None => {}
        }
        if state.rejected_ids.contains(id) {
            return Err(ApiError::rejected(format!("Lead {} is locked", id)).with_status(409));
        }
        let before = state.leads.len();
        state.leads.retain(|l| l.id != id);
        if state.leads.len() == before {
            return Err(ApiError::not_found(format!("Lead {}", id)).with_status(404));
        }
        Ok(())
    }

    async fn import_leads(&self, leads: &[NewLead]) -> ApiResult<ImportSummary> {
        let _call = self.enter(format!("import:{}", leads.len())).await?;
        let mut summary = ImportSummary::default();
        for new in leads {
            let duplicate = self.state().leads.iter().any(|l| {
                new.phone.is_some() && l.phone == new.phone
                    || new.email.is_some() && l.email == new.email
            });
            if duplicate {
                summary.skipped += 1;
            } else {
                self.insert(new);
                summary.imported += 1;
            }
        }
        Ok(summary)
    }

    async fn remove_duplicates(&self) -> ApiResult<usize> {
        let _call = self.enter("remove_duplicates".to_string()).await?;
        let mut state = self.state();
        let mut seen = HashSet::new();
        let before = state.leads.len();
        state.leads.retain(|l| {
            let key = l
                .phone
                .clone()
                .or_else(|| l.email.clone())
                .unwrap_or_else(|| l.id.clone());
            seen.insert(key)
        });
        Ok(before - state.leads.len())
    }

    async fn get_settings(&self) -> ApiResult<RemoteSettings> {
        let _call = self.enter("get_settings".to_string()).await?;
        Ok(self.state().settings.clone())
    }

    async fn save_settings(&self, settings: &RemoteSettings) -> ApiResult<()> {
        let _call = self.enter("save_settings".to_string()).await?;
        self.state().settings = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_list_delete() {
        let api = InMemoryLeadsApi::new();
        let lead = api.create_lead(&NewLead::named("Ana")).await.unwrap();
        assert_eq!(api.list_leads().await.unwrap().len(), 1);
        api.delete_lead(&lead.id).await.unwrap();
        let err = api.delete_lead(&lead.id).await.unwrap_err();
        assert!(err.is_gone());
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let api = InMemoryLeadsApi::new();
        api.set_offline(true);
        assert!(api.list_leads().await.unwrap_err().is_connectivity());
        assert_eq!(api.call_count("list"), 1);
    }

    #[tokio::test]
    async fn test_outage_after_n_deletes() {
        let api = InMemoryLeadsApi::new();
        for name in ["a", "b", "c"] {
            api.create_lead(&NewLead::named(name)).await.unwrap();
        }
        api.go_offline_after_deletes(1);
        api.delete_lead("mem-1").await.unwrap();
        assert!(api.delete_lead("mem-2").await.unwrap_err().is_connectivity());
        assert!(api.delete_lead("mem-3").await.unwrap_err().is_connectivity());
        assert_eq!(api.stored_leads().len(), 2);
    }

    #[tokio::test]
    async fn test_import_skips_duplicates() {
        let api = InMemoryLeadsApi::new();
        let mut a = NewLead::named("A");
        a.phone = Some("11999990000".into());
        let summary = api.import_leads(&[a.clone(), a]).await.unwrap();
        assert_eq!(summary, ImportSummary { imported: 1, skipped: 1 });
    }
}
