//! In-memory lead cache.
//!
//! Holds the client's transient copy of the backend's leads in list order.
//! A refetch overwrites it wholesale; between refetches local writes win.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use leadsflow_common::Lead;

#[derive(Debug, Clone, Default)]
pub struct LeadCache {
    leads: Vec<Lead>,
}

/// Snapshot of one lead taken before an optimistic write.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    id: String,
    /// `None` when the lead was not cached at checkpoint time.
    entry: Option<(usize, Lead)>,
}

impl Checkpoint {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lead(&self) -> Option<&Lead> {
        self.entry.as_ref().map(|(_, lead)| lead)
    }
}

impl LeadCache {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self { leads }
    }

    pub fn replace_all(&mut self, leads: Vec<Lead>) {
        self.leads = leads;
    }

    pub fn get(&self, id: &str) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.leads.iter().position(|l| l.id == id)
    }

    /// Replace the lead with the same id in place, or append it.
    pub fn upsert(&mut self, lead: Lead) {
        match self.position(&lead.id) {
            Some(idx) => self.leads[idx] = lead,
            None => self.leads.push(lead),
        }
    }

    /// Run `f` on the cached lead. Returns false when it is not cached.
    pub fn update(&mut self, id: &str, f: impl FnOnce(&mut Lead)) -> bool {
        match self.leads.iter_mut().find(|l| l.id == id) {
            Some(lead) => {
                f(lead);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Lead> {
        self.position(id).map(|idx| self.leads.remove(idx))
    }

    /// Drop every lead whose id is in `ids`. Returns how many were removed.
    pub fn retain_ids_not_in(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.leads.len();
        self.leads.retain(|l| !ids.contains(&l.id));
        before - self.leads.len()
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lead> {
        self.leads.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.leads.iter().map(|l| l.id.clone()).collect()
    }

    pub fn as_slice(&self) -> &[Lead] {
        &self.leads
    }

    pub fn checkpoint(&self, id: &str) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            entry: self
                .position(id)
                .map(|idx| (idx, self.leads[idx].clone())),
        }
    }

    /// Put the checkpointed state back.
    ///
    /// A lead that was removed since is reinserted at its old index (clamped
    /// to the current length). A lead that did not exist at checkpoint time
    /// is removed again.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        match checkpoint.entry {
            Some((idx, lead)) => match self.position(&checkpoint.id) {
                Some(current) => self.leads[current] = lead,
                None => {
                    let idx = idx.min(self.leads.len());
                    self.leads.insert(idx, lead);
                }
            },
            None => {
                self.remove(&checkpoint.id);
            }
        }
    }
}

/// Cache shared between the workspace, the poller and in-flight mutations.
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    inner: Arc<Mutex<LeadCache>>,
}

impl SharedCache {
    pub fn new(cache: LeadCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Run `f` with the cache locked. A poisoned lock is recovered: the cache
    /// is plain data and the next refetch replaces it anyway.
    pub fn with<R>(&self, f: impl FnOnce(&mut LeadCache) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> Vec<Lead> {
        self.with(|c| c.leads.clone())
    }

    pub fn get(&self, id: &str) -> Option<Lead> {
        self.with(|c| c.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.with(|c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
