/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Membership rows linking timelines, threads, profiles and lists to entities.

use crate::changes::Table;
use crate::db::WriteCtx;
use crate::error::Result;
use crate::timeline::Timeline;
use feedcache_entities::Id;
use rusqlite::params;
use std::collections::HashSet;
use tracing::debug;

/// Ordered membership tables sharing the `(owner, member, ord)` layout.
#[derive(Clone, Copy)]
pub(crate) enum OrderedJoin {
    Ancestors,
    Descendants,
    Pinned,
    ConversationAccounts,
}

impl OrderedJoin {
    fn table(self) -> &'static str {
        match self {
            Self::Ancestors => "status_ancestor_joins",
            Self::Descendants => "status_descendant_joins",
            Self::Pinned => "account_pinned_status_joins",
            Self::ConversationAccounts => "conversation_account_joins",
        }
    }

    fn columns(self) -> (&'static str, &'static str) {
        match self {
            Self::Ancestors | Self::Descendants => ("parent_id", "status_id"),
            Self::Pinned => ("account_id", "status_id"),
            Self::ConversationAccounts => ("conversation_id", "account_id"),
        }
    }

    fn change(self) -> Table {
        match self {
            Self::Ancestors | Self::Descendants => Table::ContextJoins,
            Self::Pinned => Table::PinnedStatuses,
            Self::ConversationAccounts => Table::Conversations,
        }
    }
}

impl WriteCtx<'_> {
    pub(crate) fn save_timeline(&mut self, timeline: &Timeline) -> Result<()> {
        let row = timeline.row();
        let changed = self.conn.execute(
            r#"
            INSERT INTO timelines(id, kind, param, title, ordered)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET title=excluded.title
            WHERE timelines.title IS NOT excluded.title
            "#,
            params![
                row.id,
                row.kind,
                row.param,
                row.title,
                if row.ordered { 1 } else { 0 }
            ],
        )?;
        self.touch_if(Table::Timelines, changed);
        Ok(())
    }

    pub(crate) fn delete_timeline(&mut self, timeline_id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM timelines WHERE id=?1", params![timeline_id])?;
        if changed > 0 {
            self.touch(Table::Timelines);
            self.touch(Table::TimelineStatuses);
            self.touch(Table::LoadMores);
        }
        Ok(())
    }

    /// Joins `status_ids` into the timeline.
    ///
    /// The batch is the authoritative content of its id range: stale joins inside
    /// `[min, max]` are dropped. Unordered timelines also record a gap when the batch
    /// lands entirely above what was stored. Ordered timelines append new members after
    /// the existing ones; their position is action time, so a disjoint id range says
    /// nothing about missing members and no gap is recorded.
    pub(crate) fn join_timeline(&mut self, timeline: &Timeline, status_ids: &[Id]) -> Result<()> {
        self.save_timeline(timeline)?;
        let timeline_id = timeline.id();

        let (Some(min), Some(max)) = (status_ids.iter().min(), status_ids.iter().max()) else {
            return Ok(());
        };
        let present = self.reader().ids(
            "SELECT status_id FROM timeline_status_joins WHERE timeline_id=?1",
            params![timeline_id],
        )?;
        let previous_max = present.iter().max().cloned();

        if timeline.is_ordered() {
            let mut next: i64 = self.conn.query_row(
                "SELECT COALESCE(MAX(ord), -1) + 1 FROM timeline_status_joins WHERE timeline_id=?1",
                params![timeline_id],
                |r| r.get(0),
            )?;
            for id in status_ids {
                let changed = self.conn.execute(
                    "INSERT OR IGNORE INTO timeline_status_joins(timeline_id, status_id, ord) VALUES (?1, ?2, ?3)",
                    params![timeline_id, id.as_str(), next],
                )?;
                if self.touch_if(Table::TimelineStatuses, changed) > 0 {
                    next += 1;
                }
            }
        } else {
            for id in status_ids {
                let changed = self.conn.execute(
                    "INSERT OR IGNORE INTO timeline_status_joins(timeline_id, status_id, ord) VALUES (?1, ?2, NULL)",
                    params![timeline_id, id.as_str()],
                )?;
                self.touch_if(Table::TimelineStatuses, changed);
            }
        }

        let batch: HashSet<&Id> = status_ids.iter().collect();
        let mut pruned = 0usize;
        for stale in present
            .iter()
            .filter(|id| *id >= min && *id <= max && !batch.contains(id))
        {
            pruned += self.conn.execute(
                "DELETE FROM timeline_status_joins WHERE timeline_id=?1 AND status_id=?2",
                params![timeline_id, stale.as_str()],
            )?;
        }
        if self.touch_if(Table::TimelineStatuses, pruned) > 0 {
            debug!(timeline_id, pruned, "pruned stale timeline joins");
        }

        if timeline.is_ordered() {
            return Ok(());
        }
        if let Some(previous_max) = previous_max {
            if *min > previous_max {
                self.insert_gap(&timeline_id, min, &previous_max)?;
            }
        }
        Ok(())
    }

    /// Makes the members of `owner` exactly `members`, in that order.
    pub(crate) fn replace_ordered_join(
        &mut self,
        join: OrderedJoin,
        owner: &str,
        members: &[Id],
    ) -> Result<()> {
        let table = join.table();
        let (owner_col, member_col) = join.columns();
        let existing = self.reader().ids(
            &format!("SELECT {member_col} FROM {table} WHERE {owner_col}=?1"),
            params![owner],
        )?;

        let mut changed = 0usize;
        for (ord, member) in members.iter().enumerate() {
            changed += self.conn.execute(
                &format!(
                    "INSERT INTO {table}({owner_col}, {member_col}, ord) VALUES (?1, ?2, ?3) \
                     ON CONFLICT({owner_col}, {member_col}) DO UPDATE SET ord=excluded.ord \
                     WHERE {table}.ord IS NOT excluded.ord"
                ),
                params![owner, member.as_str(), ord as i64],
            )?;
        }
        let keep: HashSet<&Id> = members.iter().collect();
        for gone in existing.iter().filter(|id| !keep.contains(id)) {
            changed += self.conn.execute(
                &format!("DELETE FROM {table} WHERE {owner_col}=?1 AND {member_col}=?2"),
                params![owner, gone.as_str()],
            )?;
        }
        self.touch_if(join.change(), changed);
        Ok(())
    }

    pub(crate) fn create_account_list(&mut self, list_id: &str) -> Result<()> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO account_lists(id) VALUES (?1)",
            params![list_id],
        )?;
        self.touch_if(Table::AccountLists, changed);
        Ok(())
    }

    /// Appends accounts after the current tail of the list. Accounts already in it keep
    /// their position.
    pub(crate) fn append_account_list(&mut self, list_id: &str, account_ids: &[Id]) -> Result<()> {
        self.create_account_list(list_id)?;
        let mut next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(ord), -1) + 1 FROM account_list_joins WHERE list_id=?1",
            params![list_id],
            |r| r.get(0),
        )?;
        for id in account_ids {
            let changed = self.conn.execute(
                "INSERT OR IGNORE INTO account_list_joins(list_id, account_id, ord) VALUES (?1, ?2, ?3)",
                params![list_id, id.as_str(), next],
            )?;
            if self.touch_if(Table::AccountLists, changed) > 0 {
                next += 1;
            }
        }
        Ok(())
    }

    pub(crate) fn replace_familiar_followers(
        &mut self,
        account_id: &Id,
        follower_ids: &[Id],
    ) -> Result<()> {
        let existing = self.reader().ids(
            "SELECT follower_id FROM familiar_follower_joins WHERE account_id=?1",
            params![account_id.as_str()],
        )?;
        let mut changed = 0usize;
        for follower in follower_ids {
            changed += self.conn.execute(
                "INSERT OR IGNORE INTO familiar_follower_joins(account_id, follower_id) VALUES (?1, ?2)",
                params![account_id.as_str(), follower.as_str()],
            )?;
        }
        let keep: HashSet<&Id> = follower_ids.iter().collect();
        for gone in existing.iter().filter(|id| !keep.contains(id)) {
            changed += self.conn.execute(
                "DELETE FROM familiar_follower_joins WHERE account_id=?1 AND follower_id=?2",
                params![account_id.as_str(), gone.as_str()],
            )?;
        }
        self.touch_if(Table::FamiliarFollowers, changed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::cipher::PayloadCodec;
    use crate::db::CacheDb;
    use crate::mutation::Mutation;
    use crate::records::fixtures::*;
    use crate::timeline::Timeline;
    use feedcache_entities::Id;

    fn ids(raw: &[&str]) -> Vec<Id> {
        raw.iter().map(|s| Id::from(*s)).collect()
    }

    fn home_ids(db: &CacheDb) -> Vec<Id> {
        let mut out = db
            .read(|r| {
                r.ids(
                    "SELECT status_id FROM timeline_status_joins WHERE timeline_id='home'",
                    [],
                )
            })
            .unwrap();
        out.sort();
        out
    }

    fn insert(db: &CacheDb, timeline: Timeline, raw: &[&str]) {
        db.write(vec![
            Mutation::UpsertStatuses(statuses(raw)),
            Mutation::JoinTimeline {
                timeline,
                status_ids: ids(raw),
            },
        ])
        .unwrap();
    }

    #[test]
    fn batch_replaces_its_id_range() {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        insert(&db, Timeline::Home, &["1", "3", "5", "7", "9"]);
        insert(&db, Timeline::Home, &["3", "5", "9"]);
        assert_eq!(home_ids(&db), ids(&["1", "3", "5", "9"]));
        // The status row itself survives; only the membership went away.
        assert!(db.read(|r| r.status(&Id::from("7"))).unwrap().is_some());
    }

    #[test]
    fn range_uses_numeric_order() {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        insert(&db, Timeline::Home, &["95", "99", "100", "120"]);
        insert(&db, Timeline::Home, &["99", "120"]);
        assert_eq!(home_ids(&db), ids(&["95", "99", "120"]));
    }

    #[test]
    fn newer_disjoint_batch_records_a_gap() {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        insert(&db, Timeline::Home, &["1", "50"]);
        insert(&db, Timeline::Home, &["100", "150"]);
        let gaps = db.read(|r| r.load_mores("home")).unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].after_status_id, Id::from("100"));
        assert_eq!(gaps[0].before_status_id, Id::from("50"));
    }

    #[test]
    fn overlapping_batch_records_no_gap() {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        insert(&db, Timeline::Home, &["1", "50"]);
        insert(&db, Timeline::Home, &["50", "60"]);
        assert!(db.read(|r| r.load_mores("home")).unwrap().is_empty());
    }

    #[test]
    fn ordered_timelines_append_in_server_order() {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        insert(&db, Timeline::Favorites, &["9", "4", "7"]);
        insert(&db, Timeline::Favorites, &["4", "2"]);
        let order = db
            .read(|r| {
                r.ids(
                    "SELECT status_id FROM timeline_status_joins WHERE timeline_id='favorites' ORDER BY ord",
                    [],
                )
            })
            .unwrap();
        assert_eq!(order, ids(&["9", "4", "7", "2"]));
        assert!(db.read(|r| r.load_mores("favorites")).unwrap().is_empty());
    }

    #[test]
    fn ordered_batch_prunes_its_id_range() {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        insert(&db, Timeline::Bookmarks, &["10", "40", "90"]);
        insert(&db, Timeline::Bookmarks, &["90", "10"]);
        let order = db
            .read(|r| {
                r.ids(
                    "SELECT status_id FROM timeline_status_joins WHERE timeline_id='bookmarks' ORDER BY ord",
                    [],
                )
            })
            .unwrap();
        assert_eq!(order, ids(&["10", "90"]));
        assert!(db.read(|r| r.status(&Id::from("40"))).unwrap().is_some());
    }

    #[test]
    fn context_is_replaced_by_set_difference() {
        let db = CacheDb::open_in_memory(PayloadCodec::plain(), 16).unwrap();
        let write_context = |ancestors: &[&str], descendants: &[&str]| {
            let mut all = vec!["10"];
            all.extend_from_slice(ancestors);
            all.extend_from_slice(descendants);
            db.write(vec![
                Mutation::UpsertStatuses(statuses(&all)),
                Mutation::ReplaceContext {
                    parent_id: Id::from("10"),
                    ancestors: ids(ancestors),
                    descendants: ids(descendants),
                },
            ])
            .unwrap()
        };
        write_context(&["2", "5"], &["11", "12"]);
        write_context(&["5"], &["12", "13"]);
        let descendants = db
            .read(|r| {
                r.ids(
                    "SELECT status_id FROM status_descendant_joins WHERE parent_id='10' ORDER BY ord",
                    [],
                )
            })
            .unwrap();
        assert_eq!(descendants, ids(&["12", "13"]));

        // Same context again changes nothing.
        let touched = write_context(&["5"], &["12", "13"]);
        assert!(!touched.contains(crate::changes::Table::ContextJoins));
    }
}
