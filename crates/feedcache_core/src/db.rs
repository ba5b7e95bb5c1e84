/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::changes::{ChangeEvent, Table, TableSet};
use crate::cipher::PayloadCodec;
use crate::error::Result;
use crate::mutation::Mutation;
use crate::schema;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

enum Backing {
    File(PathBuf),
    Memory,
}

/// SQLite-backed store with a single writer connection.
///
/// File-backed stores open a fresh connection per read, so WAL snapshots keep readers
/// and the writer out of each other's way. In-memory stores only have the writer
/// connection and reads queue behind it.
pub struct CacheDb {
    backing: Backing,
    writer: Mutex<Connection>,
    codec: PayloadCodec,
    changes: broadcast::Sender<ChangeEvent>,
    busy_timeout: Duration,
}

impl CacheDb {
    pub fn open(
        path: impl AsRef<Path>,
        codec: PayloadCodec,
        busy_timeout: Duration,
        channel_capacity: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        schema::configure(&conn, busy_timeout)?;
        schema::migrate(&conn, false)?;
        debug!(path = %path.display(), sealed = codec.is_sealed(), "content cache opened");
        Ok(Self::with_connection(
            Backing::File(path),
            conn,
            codec,
            busy_timeout,
            channel_capacity,
        ))
    }

    pub fn open_in_memory(codec: PayloadCodec, channel_capacity: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let busy_timeout = Duration::from_secs(5);
        schema::configure(&conn, busy_timeout)?;
        schema::migrate(&conn, true)?;
        Ok(Self::with_connection(
            Backing::Memory,
            conn,
            codec,
            busy_timeout,
            channel_capacity,
        ))
    }

    fn with_connection(
        backing: Backing,
        conn: Connection,
        codec: PayloadCodec,
        busy_timeout: Duration,
        channel_capacity: usize,
    ) -> Self {
        let (changes, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            backing,
            writer: Mutex::new(conn),
            codec,
            changes,
            busy_timeout,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    /// Runs a read against a consistent snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&Reader<'_>) -> Result<T>) -> Result<T> {
        match &self.backing {
            Backing::File(path) => {
                let mut conn = Connection::open(path)?;
                schema::configure(&conn, self.busy_timeout)?;
                let tx = conn.transaction()?;
                let out = f(&Reader {
                    conn: &tx,
                    codec: &self.codec,
                })?;
                tx.finish()?;
                Ok(out)
            }
            Backing::Memory => {
                let conn = self.lock_writer();
                f(&Reader {
                    conn: &conn,
                    codec: &self.codec,
                })
            }
        }
    }

    /// Applies the mutations in order inside one transaction and announces the touched
    /// tables once it committed. Any failure rolls the whole list back.
    pub fn write(&self, mutations: Vec<Mutation>) -> Result<TableSet> {
        let touched = {
            let mut conn = self.lock_writer();
            let tx = conn.transaction()?;
            let mut ctx = WriteCtx {
                conn: &tx,
                codec: &self.codec,
                touched: TableSet::EMPTY,
            };
            for m in &mutations {
                m.apply(&mut ctx)?;
            }
            let touched = ctx.touched;
            tx.commit()?;
            touched
        };
        if !touched.is_empty() {
            // No receivers simply means nobody is observing.
            let _ = self.changes.send(ChangeEvent::new(touched));
        }
        Ok(touched)
    }

    fn lock_writer(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-write dropped its transaction, so the connection is still usable.
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read side of a snapshot: the connection plus the payload codec.
pub struct Reader<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) codec: &'a PayloadCodec,
}

/// Write side of a transaction. Every helper records the tables it modified.
pub(crate) struct WriteCtx<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) codec: &'a PayloadCodec,
    pub(crate) touched: TableSet,
}

impl WriteCtx<'_> {
    pub(crate) fn touch(&mut self, table: Table) {
        self.touched.insert(table);
    }

    /// Records `table` only when the statement changed at least one row.
    pub(crate) fn touch_if(&mut self, table: Table, changed: usize) -> usize {
        if changed > 0 {
            self.touch(table);
        }
        changed
    }

    pub(crate) fn reader(&self) -> Reader<'_> {
        Reader {
            conn: self.conn,
            codec: self.codec,
        }
    }
}

pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
