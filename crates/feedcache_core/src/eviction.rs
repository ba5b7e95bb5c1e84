/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Home-timeline cleanup run when the app goes to the background.

use crate::changes::Table;
use crate::db::WriteCtx;
use crate::error::Result;
use crate::timeline::Timeline;
use feedcache_entities::Id;
use rusqlite::{params, OptionalExtension};
use std::collections::HashSet;
use tracing::info;

const HOME: &str = "home";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanPolicy {
    /// Keep a window around the last-read home status instead of wiping statuses.
    pub preserve_position: bool,
    /// Statuses kept from the last-read one downwards.
    pub retention: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub statuses_deleted: usize,
    pub accounts_deleted: usize,
}

/// Home ids (newest first) kept by a position-preserving clean: everything above the
/// last-read status plus `retention` statuses starting at it. Without a usable
/// last-read id the newest status is the anchor.
pub(crate) fn home_window<'a>(ids_desc: &'a [Id], last_read: Option<&Id>, retention: usize) -> &'a [Id] {
    let anchor = last_read
        .and_then(|lr| ids_desc.iter().position(|id| id == lr))
        .unwrap_or(0);
    let end = anchor.saturating_add(retention).min(ids_desc.len());
    &ids_desc[..end]
}

impl WriteCtx<'_> {
    pub(crate) fn clean_home_timeline(&mut self, policy: CleanPolicy) -> Result<CleanReport> {
        for (sql, table) in [
            ("DELETE FROM notifications", Table::Notifications),
            ("DELETE FROM conversations", Table::Conversations),
            ("DELETE FROM status_ancestor_joins", Table::ContextJoins),
            ("DELETE FROM status_descendant_joins", Table::ContextJoins),
            ("DELETE FROM account_lists", Table::AccountLists),
        ] {
            let changed = self.conn.execute(sql, [])?;
            self.touch_if(table, changed);
        }

        let report = if policy.preserve_position {
            self.retain_home_window(policy.retention)?
        } else {
            self.wipe_statuses()?
        };
        if report.statuses_deleted > 0 || report.accounts_deleted > 0 {
            self.touch(Table::Statuses);
            self.touch(Table::Accounts);
            self.touch(Table::TimelineStatuses);
            self.touch(Table::PinnedStatuses);
            self.touch(Table::FamiliarFollowers);
        }
        info!(
            statuses_deleted = report.statuses_deleted,
            accounts_deleted = report.accounts_deleted,
            preserve_position = policy.preserve_position,
            "home timeline cleaned"
        );
        Ok(report)
    }

    fn wipe_statuses(&mut self) -> Result<CleanReport> {
        let protected: Vec<String> = Timeline::DEFAULTS
            .iter()
            .map(Timeline::kind)
            .chain(["list"])
            .map(|kind| format!("'{kind}'"))
            .collect();
        let timelines = self.conn.execute(
            &format!(
                "DELETE FROM timelines WHERE kind NOT IN ({})",
                protected.join(", ")
            ),
            [],
        )?;
        if timelines > 0 {
            self.touch(Table::Timelines);
            self.touch(Table::LoadMores);
        }
        let statuses_deleted = self.conn.execute("DELETE FROM statuses", [])?;
        let accounts_deleted = self.conn.execute("DELETE FROM accounts", [])?;
        let gaps = self.conn.execute("DELETE FROM load_mores", [])?;
        self.touch_if(Table::LoadMores, gaps);
        Ok(CleanReport {
            statuses_deleted,
            accounts_deleted,
        })
    }

    fn retain_home_window(&mut self, retention: usize) -> Result<CleanReport> {
        let mut home = self.reader().ids(
            "SELECT status_id FROM timeline_status_joins WHERE timeline_id=?1",
            params![HOME],
        )?;
        home.sort_by(|a, b| b.cmp(a));
        let last_read: Option<Id> = self
            .conn
            .query_row(
                "SELECT status_id FROM last_read WHERE timeline_id=?1",
                params![HOME],
                |r| r.get::<_, String>(0),
            )
            .optional()?
            .map(Id::from);

        let window = home_window(&home, last_read.as_ref(), retention);
        let in_window: HashSet<&Id> = window.iter().collect();
        let mut unjoined = 0usize;
        // Statuses below the window leave home even when something else keeps their row.
        for id in home.iter().filter(|id| !in_window.contains(id)) {
            unjoined += self.conn.execute(
                "DELETE FROM timeline_status_joins WHERE timeline_id=?1 AND status_id=?2",
                params![HOME, id.as_str()],
            )?;
        }
        self.touch_if(Table::TimelineStatuses, unjoined);

        let mut seeds: HashSet<Id> = window.iter().cloned().collect();
        seeds.extend(self.reader().ids(
            "SELECT status_id FROM timeline_status_joins WHERE timeline_id<>?1",
            params![HOME],
        )?);
        seeds.extend(
            self.reader()
                .ids("SELECT status_id FROM account_pinned_status_joins", [])?,
        );
        let retained = self.close_over_references(seeds)?;

        let mut statuses_deleted = 0usize;
        for id in self.reader().ids("SELECT id FROM statuses", [])? {
            if !retained.contains(&id) {
                statuses_deleted += self
                    .conn
                    .execute("DELETE FROM statuses WHERE id=?1", params![id.as_str()])?;
            }
        }
        let dropped_joins = self.conn.execute(
            "DELETE FROM load_mores WHERE timeline_id=?1 AND after_status_id NOT IN (SELECT status_id FROM timeline_status_joins WHERE timeline_id=?1)",
            params![HOME],
        )?;
        self.touch_if(Table::LoadMores, dropped_joins);

        let mut authors: HashSet<Id> = self
            .reader()
            .ids("SELECT DISTINCT account_id FROM statuses", [])?
            .into_iter()
            .collect();
        let mut frontier: Vec<Id> = authors.iter().cloned().collect();
        while let Some(id) = frontier.pop() {
            let moved: Option<String> = self
                .conn
                .query_row(
                    "SELECT moved_id FROM accounts WHERE id=?1",
                    params![id.as_str()],
                    |r| r.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
            if let Some(moved) = moved.map(Id::from) {
                if authors.insert(moved.clone()) {
                    frontier.push(moved);
                }
            }
        }

        let mut accounts_deleted = 0usize;
        for id in self.reader().ids("SELECT id FROM accounts", [])? {
            if !authors.contains(&id) {
                accounts_deleted += self
                    .conn
                    .execute("DELETE FROM accounts WHERE id=?1", params![id.as_str()])?;
            }
        }
        Ok(CleanReport {
            statuses_deleted,
            accounts_deleted,
        })
    }

    /// Adds every status reachable through reblog and quote references.
    fn close_over_references(&self, mut retained: HashSet<Id>) -> Result<HashSet<Id>> {
        let mut frontier: Vec<Id> = retained.iter().cloned().collect();
        let mut stmt = self
            .conn
            .prepare("SELECT reblog_id, quote_id FROM statuses WHERE id=?1")?;
        while let Some(id) = frontier.pop() {
            let refs: Option<(Option<String>, Option<String>)> = stmt
                .query_row(params![id.as_str()], |r| Ok((r.get(0)?, r.get(1)?)))
                .optional()?;
            let Some((reblog, quote)) = refs else {
                continue;
            };
            for next in [reblog, quote].into_iter().flatten().map(Id::from) {
                if retained.insert(next.clone()) {
                    frontier.push(next);
                }
            }
        }
        Ok(retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: std::ops::RangeInclusive<u32>) -> Vec<Id> {
        n.rev().map(|i| Id::new(i.to_string())).collect()
    }

    #[test]
    fn window_keeps_everything_above_the_anchor() {
        let home = ids(1..=100);
        let window = home_window(&home, Some(&Id::from("80")), 10);
        assert_eq!(window.len(), 30);
        assert_eq!(window.first(), Some(&Id::from("100")));
        assert_eq!(window.last(), Some(&Id::from("71")));
    }

    #[test]
    fn missing_anchor_falls_back_to_newest() {
        let home = ids(1..=100);
        let window = home_window(&home, Some(&Id::from("5000")), 40);
        assert_eq!(window.len(), 40);
        assert_eq!(window.last(), Some(&Id::from("61")));
        assert_eq!(home_window(&home, None, 40).len(), 40);
    }

    #[test]
    fn window_is_capped_by_the_timeline() {
        let home = ids(1..=5);
        assert_eq!(home_window(&home, Some(&Id::from("2")), 40).len(), 5);
        assert!(home_window(&[], None, 40).is_empty());
    }
}
