/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Read models assembled from entity rows and joins.

use crate::changes::{Table, TableSet};
use crate::db::{now_ms, Reader};
use crate::error::Result;
use crate::gaps::LoadMore;
use crate::timeline::Timeline;
use chrono::{DateTime, TimeZone, Utc};
use feedcache_entities::{
    Account, Announcement, Emoji, Filter, Id, Instance, List, NotificationKind, Relationship,
    Rule, SearchResults, Status, Tag,
};
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

pub(crate) const STATUS_TABLES: TableSet =
    TableSet::of(&[Table::Statuses, Table::Accounts, Table::Toggles]);
pub(crate) const TIMELINE_TABLES: TableSet = TableSet::of(&[
    Table::Statuses,
    Table::Accounts,
    Table::Toggles,
    Table::Timelines,
    Table::TimelineStatuses,
    Table::LoadMores,
]);
pub(crate) const CONTEXT_TABLES: TableSet = TableSet::of(&[
    Table::Statuses,
    Table::Accounts,
    Table::Toggles,
    Table::ContextJoins,
]);
pub(crate) const PROFILE_TABLES: TableSet = TableSet::of(&[
    Table::Statuses,
    Table::Accounts,
    Table::Toggles,
    Table::Relationships,
    Table::FamiliarFollowers,
    Table::PinnedStatuses,
]);
pub(crate) const NOTIFICATION_TABLES: TableSet = TableSet::of(&[
    Table::Notifications,
    Table::Statuses,
    Table::Accounts,
    Table::Toggles,
]);
pub(crate) const CONVERSATION_TABLES: TableSet = TableSet::of(&[
    Table::Conversations,
    Table::Statuses,
    Table::Accounts,
    Table::Toggles,
]);

/// A status as displayed: the entity plus per-status view state.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusView {
    pub status: Status,
    pub show_content: bool,
    pub show_attachments: bool,
    /// Phrases of matching `warn` filters.
    pub filtered: Vec<String>,
}

impl StatusView {
    pub fn plain(status: Status) -> Self {
        Self {
            status,
            show_content: false,
            show_attachments: false,
            filtered: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimelineItem {
    Status(StatusView),
    LoadMore(LoadMore),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContextView {
    pub parent: Option<StatusView>,
    pub ancestors: Vec<StatusView>,
    pub descendants: Vec<StatusView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProfileView {
    pub account: Account,
    pub relationship: Option<Relationship>,
    pub familiar_followers: Vec<Account>,
    pub pinned: Vec<StatusView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NotificationView {
    pub id: Id,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub account: Account,
    pub status: Option<StatusView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversationView {
    pub id: Id,
    pub unread: bool,
    pub accounts: Vec<Account>,
    pub last_status: Option<StatusView>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnouncementCounts {
    pub total: usize,
    pub unread: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmojiUse {
    pub emoji: String,
    pub system: bool,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchView {
    pub accounts: Vec<Account>,
    pub statuses: Vec<StatusView>,
    pub hashtags: Vec<Tag>,
}

impl Reader<'_> {
    fn payloads<T: DeserializeOwned>(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let blobs = stmt
            .query_map(params, |r| r.get::<_, Vec<u8>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        blobs.iter().map(|b| self.codec.decode(b)).collect()
    }

    fn toggled(&self, table: &str, id: &Id) -> Result<bool> {
        let hit = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {table} WHERE status_id=?1"),
                params![id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    /// Toggles are keyed by the id of the status actually displayed, so a reblog shares
    /// its state with the original.
    pub fn status_view(&self, status: Status) -> Result<StatusView> {
        let shown = status.displayed().id.clone();
        Ok(StatusView {
            show_content: self.toggled("status_show_content_toggles", &shown)?,
            show_attachments: self.toggled("status_show_attachments_toggles", &shown)?,
            filtered: Vec::new(),
            status,
        })
    }

    pub fn status_views(&self, ids: &[Id]) -> Result<Vec<StatusView>> {
        self.statuses(ids)?
            .into_iter()
            .map(|s| self.status_view(s))
            .collect()
    }

    pub fn has_timeline(&self, timeline_id: &str) -> Result<bool> {
        let hit = self
            .conn
            .query_row(
                "SELECT 1 FROM timelines WHERE id=?1",
                params![timeline_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    /// Every stored timeline; rows of unknown kinds are skipped.
    pub fn timelines(&self) -> Result<Vec<Timeline>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, param, title FROM timelines ORDER BY id")?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Option<String>>(1)?,
                    r.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows
            .iter()
            .filter_map(|(kind, param, title)| {
                Timeline::from_row(kind, param.as_deref(), title.as_deref())
            })
            .collect())
    }

    /// Member ids in display order: the stored order for ordered timelines, newest
    /// first otherwise.
    pub fn timeline_status_ids(&self, timeline: &Timeline) -> Result<Vec<Id>> {
        let timeline_id = timeline.id();
        if timeline.is_ordered() {
            return self.ids(
                "SELECT status_id FROM timeline_status_joins WHERE timeline_id=?1 ORDER BY ord ASC",
                params![timeline_id],
            );
        }
        let mut ids = self.ids(
            "SELECT status_id FROM timeline_status_joins WHERE timeline_id=?1",
            params![timeline_id],
        )?;
        ids.sort_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Statuses with every load-more marker placed right below the status it starts at.
    pub fn timeline_items(&self, timeline: &Timeline) -> Result<Vec<TimelineItem>> {
        let ids = self.timeline_status_ids(timeline)?;
        let mut markers: HashMap<Id, Vec<LoadMore>> = HashMap::new();
        for lm in self.load_mores(&timeline.id())? {
            markers.entry(lm.after_status_id.clone()).or_default().push(lm);
        }
        let mut items = Vec::with_capacity(ids.len() + markers.len());
        for view in self.status_views(&ids)? {
            let below = markers.remove(&view.status.id);
            items.push(TimelineItem::Status(view));
            if let Some(mut below) = below {
                below.sort_by(|a, b| b.before_status_id.cmp(&a.before_status_id));
                items.extend(below.into_iter().map(TimelineItem::LoadMore));
            }
        }
        Ok(items)
    }

    pub fn context_view(&self, id: &Id) -> Result<ContextView> {
        let parent = match self.status(id)? {
            Some(s) => Some(self.status_view(s)?),
            None => None,
        };
        let mut ancestor_ids = self.ids(
            "SELECT status_id FROM status_ancestor_joins WHERE parent_id=?1",
            params![id.as_str()],
        )?;
        ancestor_ids.sort();
        let descendant_ids = self.ids(
            "SELECT status_id FROM status_descendant_joins WHERE parent_id=?1 ORDER BY ord ASC",
            params![id.as_str()],
        )?;
        Ok(ContextView {
            parent,
            ancestors: self.status_views(&ancestor_ids)?,
            descendants: self.status_views(&descendant_ids)?,
        })
    }

    pub fn relationship(&self, account_id: &Id) -> Result<Option<Relationship>> {
        Ok(self
            .payloads(
                "SELECT payload FROM relationships WHERE account_id=?1",
                params![account_id.as_str()],
            )?
            .into_iter()
            .next())
    }

    pub fn profile_view(&self, account_id: &Id) -> Result<Option<ProfileView>> {
        let Some(account) = self.account(account_id)? else {
            return Ok(None);
        };
        let followers = self.ids(
            "SELECT follower_id FROM familiar_follower_joins WHERE account_id=?1 ORDER BY follower_id",
            params![account_id.as_str()],
        )?;
        let pinned = self.ids(
            "SELECT status_id FROM account_pinned_status_joins WHERE account_id=?1 ORDER BY ord ASC",
            params![account_id.as_str()],
        )?;
        Ok(Some(ProfileView {
            relationship: self.relationship(account_id)?,
            familiar_followers: self.accounts(&followers)?,
            pinned: self.status_views(&pinned)?,
            account,
        }))
    }

    pub fn account_list(&self, list_id: &str) -> Result<Vec<Account>> {
        let ids = self.ids(
            "SELECT account_id FROM account_list_joins WHERE list_id=?1 ORDER BY ord ASC",
            params![list_id],
        )?;
        self.accounts(&ids)
    }

    pub fn lists(&self) -> Result<Vec<List>> {
        let mut stmt = self.conn.prepare(
            "SELECT param, title FROM timelines WHERE kind='list' ORDER BY title COLLATE NOCASE, param",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(List {
                    id: Id::from(r.get::<_, String>(0)?),
                    title: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Filters that have not expired yet (`active`) or the ones that have.
    pub fn filters(&self, active: bool) -> Result<Vec<Filter>> {
        let sql = if active {
            "SELECT payload FROM filters WHERE expires_at_ms IS NULL OR expires_at_ms > ?1 ORDER BY id"
        } else {
            "SELECT payload FROM filters WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?1 ORDER BY id"
        };
        self.payloads(sql, params![now_ms()])
    }

    pub fn followed_tags(&self) -> Result<Vec<Tag>> {
        self.payloads("SELECT payload FROM followed_tags ORDER BY name", [])
    }

    pub fn notification_views(&self, excluded: &[NotificationKind]) -> Result<Vec<NotificationView>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, account_id, status_id, created_at_ms FROM notifications",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, i64>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, kind, account_id, status_id, created_at_ms) in rows {
            let kind: NotificationKind = serde_json::from_value(serde_json::Value::String(kind))?;
            if excluded.contains(&kind) {
                continue;
            }
            let Some(account) = self.account(&Id::from(account_id))? else {
                continue;
            };
            let status = match status_id {
                Some(sid) => match self.status(&Id::from(sid))? {
                    Some(s) => Some(self.status_view(s)?),
                    None => continue,
                },
                None => None,
            };
            let Some(created_at) = Utc.timestamp_millis_opt(created_at_ms).single() else {
                continue;
            };
            out.push(NotificationView {
                id: Id::from(id),
                kind,
                created_at,
                account,
                status,
            });
        }
        out.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(out)
    }

    pub fn conversation_views(&self) -> Result<Vec<ConversationView>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, unread, last_status_id FROM conversations")?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, bool>(1)?,
                    r.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, unread, last_status_id) in rows {
            let members = self.ids(
                "SELECT account_id FROM conversation_account_joins WHERE conversation_id=?1 ORDER BY ord ASC",
                params![id],
            )?;
            let last_status = match last_status_id {
                Some(sid) => match self.status(&Id::from(sid))? {
                    Some(s) => Some(self.status_view(s)?),
                    None => None,
                },
                None => None,
            };
            out.push(ConversationView {
                id: Id::from(id),
                unread,
                accounts: self.accounts(&members)?,
                last_status,
            });
        }
        out.sort_by(|a, b| {
            let key = |c: &ConversationView| c.last_status.as_ref().map(|v| v.status.id.clone());
            key(b).cmp(&key(a))
        });
        Ok(out)
    }

    pub fn instance(&self) -> Result<Option<Instance>> {
        let row: Option<(Option<String>, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT contact_account_id, payload FROM instance LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((contact_id, payload)) = row else {
            return Ok(None);
        };
        let mut instance: Instance = self.codec.decode(&payload)?;
        instance.contact_account = match contact_id {
            Some(id) => self.account(&Id::from(id))?,
            None => None,
        };
        Ok(Some(instance))
    }

    pub fn announcements(&self) -> Result<Vec<Announcement>> {
        self.payloads(
            "SELECT payload FROM announcements ORDER BY published_at_ms DESC, id DESC",
            [],
        )
    }

    pub fn announcement_counts(&self) -> Result<AnnouncementCounts> {
        let (total, unread): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN read=0 THEN 1 ELSE 0 END), 0) FROM announcements",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(AnnouncementCounts {
            total: total.max(0) as usize,
            unread: unread.max(0) as usize,
        })
    }

    pub fn picker_emojis(&self) -> Result<Vec<Emoji>> {
        self.payloads(
            "SELECT payload FROM emojis WHERE visible_in_picker=1 ORDER BY category, shortcode",
            [],
        )
    }

    pub fn top_emoji_uses(&self, limit: usize) -> Result<Vec<EmojiUse>> {
        let mut stmt = self.conn.prepare(
            "SELECT emoji, system, count FROM emoji_uses ORDER BY count DESC, updated_at_ms DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |r| {
                Ok(EmojiUse {
                    emoji: r.get(0)?,
                    system: r.get(1)?,
                    count: r.get::<_, i64>(2)?.max(0) as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn rules(&self) -> Result<Vec<Rule>> {
        self.payloads("SELECT payload FROM rules ORDER BY ord ASC", [])
    }

    /// Re-reads search hits from the store so local edits show through. `limit` caps
    /// each category.
    pub fn search_view(&self, results: &SearchResults, limit: Option<usize>) -> Result<SearchView> {
        let cap = limit.unwrap_or(usize::MAX);
        let account_ids: Vec<Id> = results.accounts.iter().take(cap).map(|a| a.id.clone()).collect();
        let status_ids: Vec<Id> = results.statuses.iter().take(cap).map(|s| s.id.clone()).collect();
        Ok(SearchView {
            accounts: self.accounts(&account_ids)?,
            statuses: self.status_views(&status_ids)?,
            hashtags: results.hashtags.iter().take(cap).cloned().collect(),
        })
    }

    pub fn last_read(&self, timeline_id: &str) -> Result<Option<Id>> {
        Ok(self
            .conn
            .query_row(
                "SELECT status_id FROM last_read WHERE timeline_id=?1",
                params![timeline_id],
                |r| r.get::<_, String>(0),
            )
            .optional()?
            .map(Id::from))
    }

    pub fn account_id_by_url(&self, url: &str) -> Result<Option<Id>> {
        Ok(self
            .ids(
                "SELECT id FROM accounts WHERE url=?1 OR uri=?1 LIMIT 1",
                params![url],
            )?
            .into_iter()
            .next())
    }

    pub fn status_id_by_url(&self, url: &str) -> Result<Option<Id>> {
        Ok(self
            .ids(
                "SELECT id FROM statuses WHERE url=?1 OR uri=?1 LIMIT 1",
                params![url],
            )?
            .into_iter()
            .next())
    }
}
