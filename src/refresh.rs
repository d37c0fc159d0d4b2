//! Periodic refetch and the deletion-in-progress flag.
//!
//! The poller refreshes the workspace on a fixed interval. A bulk deletion
//! holds the [`DeletionFlag`] for its whole run; ticks that land inside it
//! are skipped so a half-applied deletion is never overwritten by a list
//! fetched mid-run. Failed refreshes are logged and retried on the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::workspace::{RefreshStats, Workspace};

/// Shared "a deletion is running" flag. Clones share state; overlapping
/// runs keep it set until the last one finishes.
#[derive(Debug, Clone, Default)]
pub struct DeletionFlag {
    active: Arc<AtomicUsize>,
}

/// Clears its share of the flag on drop.
#[derive(Debug)]
pub struct DeletionGuard {
    active: Arc<AtomicUsize>,
}

impl DeletionFlag {
    pub fn begin(&self) -> DeletionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        DeletionGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }
}

impl Drop for DeletionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Poller;

impl Poller {
    /// Refresh every `interval` until `shutdown` turns true or its sender is
    /// dropped.
    pub fn spawn(
        workspace: Workspace,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        Self::spawn_with(workspace, interval, shutdown, |_| {})
    }

    /// Like [`Poller::spawn`], calling `on_refresh` after each successful tick.
    pub fn spawn_with<F>(
        workspace: Workspace,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
        mut on_refresh: F,
    ) -> JoinHandle<()>
    where
        F: FnMut(&RefreshStats) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            if *shutdown.borrow() {
                return;
            }

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if workspace.is_deleting() {
                            debug!("Deletion in progress; skipping refresh tick");
                            continue;
                        }
                        match workspace.refresh().await {
                            Ok(stats) => on_refresh(&stats),
                            Err(e) => warn!(error = %e, "Periodic refresh failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("Poller shutting down");
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryLeadsApi;
    use crate::cache::tests::lead;
    use crate::workspace::tests::workspace_with;

    #[test]
    fn test_guard_clears_flag() {
        let flag = DeletionFlag::default();
        {
            let _a = flag.begin();
            let _b = flag.clone().begin();
            assert!(flag.is_active());
        }
        assert!(!flag.is_active());
    }

    #[test]
    fn test_overlapping_guards_keep_flag_set() {
        let flag = DeletionFlag::default();
        let first = flag.begin();
        let second = flag.begin();
        drop(first);
        assert!(flag.is_active());
        drop(second);
        assert!(!flag.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_refreshes_and_stops() {
        let api = std::sync::Arc::new(InMemoryLeadsApi::with_leads(vec![lead("a", "novo")]));
        let workspace = workspace_with(api.clone());
        let (tx, rx) = watch::channel(false);
        let handle = Poller::spawn(workspace.clone(), Duration::from_secs(30), rx);

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(workspace.leads().len(), 1);
        assert_eq!(api.call_count("list"), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_skips_ticks_during_deletion() {
        let api = std::sync::Arc::new(InMemoryLeadsApi::with_leads(vec![lead("a", "novo")]));
        let workspace = workspace_with(api.clone());
        let guard = workspace.deletion_flag().begin();
        let (tx, rx) = watch::channel(false);
        let handle = Poller::spawn(workspace.clone(), Duration::from_secs(10), rx);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(api.call_count("list"), 0);

        drop(guard);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.call_count("list"), 1);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_survives_failed_refresh() {
        let api = std::sync::Arc::new(InMemoryLeadsApi::with_leads(vec![lead("a", "novo")]));
        api.set_offline(true);
        let workspace = workspace_with(api.clone());
        let (tx, rx) = watch::channel(false);
        let handle = Poller::spawn(workspace.clone(), Duration::from_secs(10), rx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        api.set_offline(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(workspace.leads().len(), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
