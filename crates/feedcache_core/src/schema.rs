/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::error::Result;
use rusqlite::Connection;
use std::time::Duration;

/// Per-connection settings. Foreign keys are off by default in SQLite and every cascade
/// below relies on them.
pub(crate) fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(())
}

pub(crate) fn migrate(conn: &Connection, in_memory: bool) -> Result<()> {
    if !in_memory {
        // journal_mode returns a row, so it cannot go through execute_batch reliably.
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |r| r.get(0))?;
    }
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
          id TEXT PRIMARY KEY,
          url TEXT NOT NULL,
          moved_id TEXT NULL REFERENCES accounts(id) ON DELETE SET NULL,
          payload BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_accounts_url ON accounts(url);

        CREATE TABLE IF NOT EXISTS statuses (
          id TEXT PRIMARY KEY,
          account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
          reblog_id TEXT NULL REFERENCES statuses(id) ON DELETE CASCADE,
          quote_id TEXT NULL REFERENCES statuses(id) ON DELETE SET NULL,
          url TEXT NULL,
          created_at_ms INTEGER NOT NULL,
          payload BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_statuses_account ON statuses(account_id);
        CREATE INDEX IF NOT EXISTS idx_statuses_reblog ON statuses(reblog_id);
        CREATE INDEX IF NOT EXISTS idx_statuses_quote ON statuses(quote_id);
        CREATE INDEX IF NOT EXISTS idx_statuses_url ON statuses(url);

        CREATE TABLE IF NOT EXISTS timelines (
          id TEXT PRIMARY KEY,
          kind TEXT NOT NULL,
          param TEXT NULL,
          title TEXT NULL,
          ordered INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS timeline_status_joins (
          timeline_id TEXT NOT NULL REFERENCES timelines(id) ON DELETE CASCADE,
          status_id TEXT NOT NULL REFERENCES statuses(id) ON DELETE CASCADE,
          ord INTEGER NULL,
          PRIMARY KEY(timeline_id, status_id)
        );
        CREATE INDEX IF NOT EXISTS idx_tsj_status ON timeline_status_joins(status_id);

        CREATE TABLE IF NOT EXISTS load_mores (
          timeline_id TEXT NOT NULL REFERENCES timelines(id) ON DELETE CASCADE,
          after_status_id TEXT NOT NULL,
          before_status_id TEXT NOT NULL,
          PRIMARY KEY(timeline_id, after_status_id, before_status_id)
        );

        CREATE TABLE IF NOT EXISTS status_ancestor_joins (
          parent_id TEXT NOT NULL,
          status_id TEXT NOT NULL REFERENCES statuses(id) ON DELETE CASCADE,
          ord INTEGER NOT NULL,
          PRIMARY KEY(parent_id, status_id)
        );
        CREATE TABLE IF NOT EXISTS status_descendant_joins (
          parent_id TEXT NOT NULL,
          status_id TEXT NOT NULL REFERENCES statuses(id) ON DELETE CASCADE,
          ord INTEGER NOT NULL,
          PRIMARY KEY(parent_id, status_id)
        );

        CREATE TABLE IF NOT EXISTS account_pinned_status_joins (
          account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
          status_id TEXT NOT NULL REFERENCES statuses(id) ON DELETE CASCADE,
          ord INTEGER NOT NULL,
          PRIMARY KEY(account_id, status_id)
        );

        CREATE TABLE IF NOT EXISTS account_lists (
          id TEXT PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS account_list_joins (
          list_id TEXT NOT NULL REFERENCES account_lists(id) ON DELETE CASCADE,
          account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
          ord INTEGER NOT NULL,
          PRIMARY KEY(list_id, account_id)
        );

        CREATE TABLE IF NOT EXISTS familiar_follower_joins (
          account_id TEXT NOT NULL,
          follower_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
          PRIMARY KEY(account_id, follower_id)
        );

        CREATE TABLE IF NOT EXISTS relationships (
          account_id TEXT PRIMARY KEY,
          payload BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS status_show_content_toggles (
          status_id TEXT PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS status_show_attachments_toggles (
          status_id TEXT PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS notifications (
          id TEXT PRIMARY KEY,
          kind TEXT NOT NULL,
          account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
          status_id TEXT NULL REFERENCES statuses(id) ON DELETE CASCADE,
          created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_account ON notifications(account_id);

        CREATE TABLE IF NOT EXISTS conversations (
          id TEXT PRIMARY KEY,
          unread INTEGER NOT NULL,
          last_status_id TEXT NULL REFERENCES statuses(id) ON DELETE SET NULL
        );
        CREATE TABLE IF NOT EXISTS conversation_account_joins (
          conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
          account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
          ord INTEGER NOT NULL,
          PRIMARY KEY(conversation_id, account_id)
        );

        CREATE TABLE IF NOT EXISTS filters (
          id TEXT PRIMARY KEY,
          expires_at_ms INTEGER NULL,
          payload BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_filters_expires ON filters(expires_at_ms);

        CREATE TABLE IF NOT EXISTS followed_tags (
          name TEXT PRIMARY KEY,
          payload BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS emojis (
          shortcode TEXT PRIMARY KEY,
          visible_in_picker INTEGER NOT NULL,
          category TEXT NULL,
          payload BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS emoji_uses (
          emoji TEXT NOT NULL,
          system INTEGER NOT NULL,
          count INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          PRIMARY KEY(emoji, system)
        );

        CREATE TABLE IF NOT EXISTS instance (
          uri TEXT PRIMARY KEY,
          contact_account_id TEXT NULL REFERENCES accounts(id) ON DELETE SET NULL,
          payload BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rules (
          id TEXT PRIMARY KEY,
          ord INTEGER NOT NULL,
          payload BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS announcements (
          id TEXT PRIMARY KEY,
          published_at_ms INTEGER NOT NULL,
          read INTEGER NOT NULL,
          payload BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS last_read (
          timeline_id TEXT PRIMARY KEY,
          status_id TEXT NOT NULL
        );
        "#,
    )?;
    // Canonical URIs arrived after the first schema; lookups match on url or uri.
    ensure_columns(conn, "accounts", &[("uri", "TEXT NULL")])?;
    ensure_columns(conn, "statuses", &[("uri", "TEXT NOT NULL DEFAULT ''")])?;
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_accounts_uri ON accounts(uri);
        CREATE INDEX IF NOT EXISTS idx_statuses_uri ON statuses(uri);
        "#,
    )?;
    Ok(())
}

fn ensure_columns(conn: &Connection, table: &str, cols: &[(&str, &str)]) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut existing = std::collections::HashSet::new();
    for r in rows {
        existing.insert(r?);
    }
    for (name, ty) in cols {
        if !existing.contains(*name) {
            conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {name} {ty}"), [])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        configure(&conn, Duration::from_secs(1)).unwrap();
        migrate(&conn, true).unwrap();
        migrate(&conn, true).unwrap();
        let cols: Vec<String> = conn
            .prepare("PRAGMA table_info(statuses)")
            .unwrap()
            .query_map([], |r| r.get(1))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(cols.iter().filter(|c| c.as_str() == "uri").count(), 1);
    }
}
