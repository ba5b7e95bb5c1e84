/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Live queries: re-run a read whenever a committed write touched one of its tables
//! and deliver the result if it differs from the previous one.

use crate::changes::TableSet;
use crate::db::{CacheDb, Reader};
use crate::error::Result;
use crate::registry::TimelineLease;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type Fetch<T> = dyn Fn(&Reader<'_>) -> Result<T> + Send + Sync;

/// A read plus the tables it depends on.
pub struct Query<T> {
    tables: TableSet,
    fetch: Arc<Fetch<T>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables,
            fetch: self.fetch.clone(),
        }
    }
}

impl<T> Query<T> {
    pub fn new(
        tables: TableSet,
        fetch: impl Fn(&Reader<'_>) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            tables,
            fetch: Arc::new(fetch),
        }
    }

    pub fn tables(&self) -> TableSet {
        self.tables
    }

    pub(crate) fn run(&self, reader: &Reader<'_>) -> Result<T> {
        (self.fetch)(reader)
    }
}

/// Stream of query results. Dropping it stops the observation and releases any
/// ephemeral timeline it kept alive.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<Result<T>>,
    task: JoinHandle<()>,
    _lease: Option<TimelineLease>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Next distinct result, or `None` once the store went away.
    pub async fn next(&mut self) -> Option<Result<T>> {
        self.rx.recv().await
    }

    /// A result that is already waiting, without suspending.
    pub fn try_next(&mut self) -> Option<Result<T>> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn with_lease(mut self, lease: TimelineLease) -> Self {
        self._lease = Some(lease);
        self
    }

    /// Emits `f(a, b)` whenever either side produced a new value, once both have one.
    /// Errors from either side are passed through.
    pub fn combine_latest<U, V, F>(self, other: Subscription<U>, f: F) -> Subscription<V>
    where
        U: Send + 'static,
        V: PartialEq + Clone + Send + 'static,
        F: Fn(&T, &U) -> V + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let (mut a, mut b) = (self, other);
            let mut left: Option<T> = None;
            let mut right: Option<U> = None;
            let mut last: Option<V> = None;
            loop {
                tokio::select! {
                    item = a.rx.recv() => match item {
                        Some(Ok(v)) => left = Some(v),
                        Some(Err(e)) => {
                            if tx.send(Err(e)).is_err() { return; }
                            continue;
                        }
                        None => return,
                    },
                    item = b.rx.recv() => match item {
                        Some(Ok(v)) => right = Some(v),
                        Some(Err(e)) => {
                            if tx.send(Err(e)).is_err() { return; }
                            continue;
                        }
                        None => return,
                    },
                    _ = tx.closed() => return,
                }
                let (Some(l), Some(r)) = (&left, &right) else {
                    continue;
                };
                let out = f(l, r);
                if last.as_ref() == Some(&out) {
                    continue;
                }
                if tx.send(Ok(out.clone())).is_err() {
                    return;
                }
                last = Some(out);
            }
        });
        Subscription {
            rx,
            task,
            _lease: None,
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn fetch<T: Send + 'static>(db: &Arc<CacheDb>, query: &Query<T>) -> Result<T> {
    let db = db.clone();
    let query = query.clone();
    tokio::task::spawn_blocking(move || db.read(|r| query.run(r))).await?
}

/// Starts observing `query`. The first result is delivered as soon as it is read; later
/// ones only when they differ from the last delivered value.
///
/// Must be called from within a tokio runtime.
pub(crate) fn observe<T>(db: Arc<CacheDb>, query: Query<T>) -> Subscription<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    // Subscribe before the first read so no commit can slip in between.
    let mut changes = db.subscribe();
    let task = tokio::spawn(async move {
        let mut last: Option<T> = None;
        loop {
            match fetch(&db, &query).await {
                Ok(value) => {
                    if last.as_ref() != Some(&value) {
                        if tx.send(Ok(value.clone())).is_err() {
                            return;
                        }
                        last = Some(value);
                    }
                }
                Err(e) => {
                    warn!("observed query failed: {e}");
                    if tx.send(Err(e)).is_err() {
                        return;
                    }
                }
            }

            loop {
                tokio::select! {
                    _ = tx.closed() => return,
                    ev = changes.recv() => match ev {
                        Ok(ev) if ev.tables.intersects(query.tables()) => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "change feed lagged, re-reading");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                }
            }
        }
    });
    Subscription {
        rx,
        task,
        _lease: None,
    }
}
