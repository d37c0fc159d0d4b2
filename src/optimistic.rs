//! Optimistic single-lead mutations.
//!
//! The local cache is changed first so the UI reflects the edit immediately,
//! then the remote call runs. When the remote call fails the lead is rolled
//! back to its checkpoint.
//!
//! If a refetch replaced the lead while the call was in flight, the cached
//! entry no longer matches what this mutation wrote and the server copy is
//! kept instead of the checkpoint.

use std::fmt::Display;
use std::future::Future;

use tracing::{debug, warn};

use crate::cache::{LeadCache, SharedCache};

/// Apply `apply` to the cache, then await `remote`. On error the cached
/// lead is restored and the error returned unchanged.
pub async fn mutate<T, E, F, Fut>(
    cache: &SharedCache,
    lead_id: &str,
    apply: impl FnOnce(&mut LeadCache),
    remote: F,
) -> Result<T, E>
where
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let (checkpoint, applied) = cache.with(|c| {
        let checkpoint = c.checkpoint(lead_id);
        apply(c);
        (checkpoint, c.get(lead_id).cloned())
    });

    match remote().await {
        Ok(value) => Ok(value),
        Err(e) => {
            let rolled_back = cache.with(|c| {
                if c.get(lead_id).cloned() == applied {
                    c.restore(checkpoint);
                    true
                } else {
                    false
                }
            });
            if rolled_back {
                warn!(lead_id, error = %e, "Remote update failed; local change rolled back");
            } else {
                debug!(lead_id, error = %e, "Remote update failed; cache already refreshed");
            }
            Err(e)
        }
    }
}
