/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Entity rows. Nested references (author, reblog, quote, moved-to) are stored as ids
//! and resolved again on read.

use crate::changes::Table;
use crate::db::{Reader, WriteCtx};
use crate::error::Result;
use feedcache_entities::{Account, AccountProfile, Id, Status, StatusBody};
use rusqlite::{params, OptionalExtension};

/// Reblog-of-reblog or moved-to chains deeper than this are cut on read.
const MAX_NESTING: usize = 4;

impl WriteCtx<'_> {
    pub(crate) fn upsert_account(&mut self, account: &Account) -> Result<()> {
        if let Some(moved) = &account.moved {
            self.upsert_account(moved)?;
        }
        let payload = self.codec.encode(&account.profile)?;
        self.conn.execute(
            r#"
            INSERT INTO accounts(id, url, uri, moved_id, payload)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
              url=excluded.url,
              uri=excluded.uri,
              moved_id=excluded.moved_id,
              payload=excluded.payload
            "#,
            params![
                account.id.as_str(),
                account.profile.url,
                account.profile.uri,
                account.moved.as_ref().map(|m| m.id.as_str()),
                payload
            ],
        )?;
        self.touch(Table::Accounts);
        Ok(())
    }

    /// Upserts the status after its author and the statuses it reblogs or quotes, so
    /// every foreign key already resolves. Rows are updated in place: a REPLACE would
    /// delete first and cascade into joins and reblogs.
    pub(crate) fn upsert_status(&mut self, status: &Status) -> Result<()> {
        self.upsert_account(&status.account)?;
        if let Some(reblog) = &status.reblog {
            self.upsert_status(reblog)?;
        }
        if let Some(quote) = &status.quote {
            self.upsert_status(quote)?;
        }
        let payload = self.codec.encode(&status.body)?;
        self.conn.execute(
            r#"
            INSERT INTO statuses(id, account_id, reblog_id, quote_id, url, uri, created_at_ms, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
              account_id=excluded.account_id,
              reblog_id=excluded.reblog_id,
              quote_id=excluded.quote_id,
              url=excluded.url,
              uri=excluded.uri,
              created_at_ms=excluded.created_at_ms,
              payload=excluded.payload
            "#,
            params![
                status.id.as_str(),
                status.account.id.as_str(),
                status.reblog.as_ref().map(|r| r.id.as_str()),
                status.quote.as_ref().map(|q| q.id.as_str()),
                status.body.url,
                status.body.uri,
                status.body.created_at.timestamp_millis(),
                payload
            ],
        )?;
        self.touch(Table::Statuses);
        Ok(())
    }

    pub(crate) fn upsert_statuses(&mut self, statuses: &[Status]) -> Result<()> {
        for status in statuses {
            self.upsert_status(status)?;
        }
        Ok(())
    }

    pub(crate) fn upsert_accounts(&mut self, accounts: &[Account]) -> Result<()> {
        for account in accounts {
            self.upsert_account(account)?;
        }
        Ok(())
    }
}

impl Reader<'_> {
    pub fn account(&self, id: &Id) -> Result<Option<Account>> {
        self.account_at_depth(id, 0)
    }

    fn account_at_depth(&self, id: &Id, depth: usize) -> Result<Option<Account>> {
        let row: Option<(Option<String>, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT moved_id, payload FROM accounts WHERE id=?1",
                params![id.as_str()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((moved_id, payload)) = row else {
            return Ok(None);
        };
        let profile: AccountProfile = self.codec.decode(&payload)?;
        let moved = match moved_id {
            Some(moved_id) if depth < MAX_NESTING => self
                .account_at_depth(&Id::from(moved_id), depth + 1)?
                .map(Box::new),
            _ => None,
        };
        Ok(Some(Account {
            id: id.clone(),
            moved,
            profile,
        }))
    }

    pub fn status(&self, id: &Id) -> Result<Option<Status>> {
        self.status_at_depth(id, 0)
    }

    fn status_at_depth(&self, id: &Id, depth: usize) -> Result<Option<Status>> {
        let row: Option<(String, Option<String>, Option<String>, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT account_id, reblog_id, quote_id, payload FROM statuses WHERE id=?1",
                params![id.as_str()],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;
        let Some((account_id, reblog_id, quote_id, payload)) = row else {
            return Ok(None);
        };
        let Some(account) = self.account(&Id::from(account_id))? else {
            return Ok(None);
        };
        let body: StatusBody = self.codec.decode(&payload)?;
        let nested = |nested_id: Option<String>| -> Result<Option<Box<Status>>> {
            match nested_id {
                Some(nested_id) if depth < MAX_NESTING => Ok(self
                    .status_at_depth(&Id::from(nested_id), depth + 1)?
                    .map(Box::new)),
                _ => Ok(None),
            }
        };
        Ok(Some(Status {
            id: id.clone(),
            account,
            reblog: nested(reblog_id)?,
            quote: nested(quote_id)?,
            body,
        }))
    }

    /// Resolves the ids in order, skipping the ones that are gone.
    pub fn statuses(&self, ids: &[Id]) -> Result<Vec<Status>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(status) = self.status(id)? {
                out.push(status);
            }
        }
        Ok(out)
    }

    pub fn accounts(&self, ids: &[Id]) -> Result<Vec<Account>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(account) = self.account(id)? {
                out.push(account);
            }
        }
        Ok(out)
    }

    pub(crate) fn ids(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Id>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().map(Id::from).collect())
    }
}
