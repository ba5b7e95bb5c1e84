/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::db::CacheDb;
use crate::mutation::Mutation;
use crate::timeline::Timeline;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Live-observation counts per timeline id. One registry per store instance.
#[derive(Default)]
pub struct EphemeralRegistry {
    counts: Mutex<HashMap<String, usize>>,
}

impl EphemeralRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the count after the increment.
    pub fn acquire(&self, timeline_id: &str) -> usize {
        let mut counts = self.lock();
        let n = counts.entry(timeline_id.to_string()).or_insert(0);
        *n += 1;
        *n
    }

    /// Returns the count after the decrement.
    pub fn release(&self, timeline_id: &str) -> usize {
        let mut counts = self.lock();
        let Some(n) = counts.get_mut(timeline_id) else {
            return 0;
        };
        *n = n.saturating_sub(1);
        let left = *n;
        if left == 0 {
            counts.remove(timeline_id);
        }
        left
    }

    pub fn count(&self, timeline_id: &str) -> usize {
        self.lock().get(timeline_id).copied().unwrap_or(0)
    }

    /// Runs `f` only if nobody observes `timeline_id`, keeping new observations out
    /// until it returns.
    pub(crate) fn run_if_unobserved<T>(&self, timeline_id: &str, f: impl FnOnce() -> T) -> Option<T> {
        let counts = self.lock();
        if counts.get(timeline_id).copied().unwrap_or(0) > 0 {
            return None;
        }
        let out = f();
        drop(counts);
        Some(out)
    }
}

/// Keeps one observation of a timeline registered. When the last lease on an
/// ephemeral timeline goes away its rows are deleted in the background.
pub(crate) struct TimelineLease {
    registry: Arc<EphemeralRegistry>,
    db: Arc<CacheDb>,
    timeline: Timeline,
}

impl TimelineLease {
    pub(crate) fn acquire(
        registry: Arc<EphemeralRegistry>,
        db: Arc<CacheDb>,
        timeline: Timeline,
    ) -> Self {
        let n = registry.acquire(&timeline.id());
        debug!(timeline_id = %timeline.id(), observers = n, "timeline observed");
        Self {
            registry,
            db,
            timeline,
        }
    }
}

impl Drop for TimelineLease {
    fn drop(&mut self) {
        let timeline_id = self.timeline.id();
        let left = self.registry.release(&timeline_id);
        if left > 0 || !self.timeline.is_ephemeral() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(timeline_id, "no runtime, ephemeral timeline left for the next clean");
            return;
        };
        let registry = self.registry.clone();
        let db = self.db.clone();
        let timeline = self.timeline.clone();
        handle.spawn_blocking(move || {
            // Somebody may have started observing again in the meantime.
            let deleted = registry.run_if_unobserved(&timeline_id, || {
                db.write(vec![Mutation::DeleteTimeline(timeline)])
            });
            match deleted {
                None => debug!(timeline_id, "timeline observed again, kept"),
                Some(Ok(_)) => debug!(timeline_id, "ephemeral timeline deleted"),
                Some(Err(e)) => warn!(timeline_id, "ephemeral timeline cleanup failed: {e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_go_back_to_zero() {
        let reg = EphemeralRegistry::default();
        assert_eq!(reg.acquire("tag-rust"), 1);
        assert_eq!(reg.acquire("tag-rust"), 2);
        assert_eq!(reg.release("tag-rust"), 1);
        assert_eq!(reg.count("tag-rust"), 1);
        assert_eq!(reg.release("tag-rust"), 0);
        assert_eq!(reg.release("tag-rust"), 0);
        assert_eq!(reg.count("tag-rust"), 0);
    }

    #[test]
    fn cleanup_waits_for_the_last_observer() {
        let reg = EphemeralRegistry::default();
        reg.acquire("tag-rust");
        assert_eq!(reg.run_if_unobserved("tag-rust", || "deleted"), None);
        reg.release("tag-rust");
        assert_eq!(reg.run_if_unobserved("tag-rust", || "deleted"), Some("deleted"));
        // Other timelines never block each other.
        reg.acquire("tag-go");
        assert_eq!(reg.run_if_unobserved("tag-rust", || 1), Some(1));
    }
}
