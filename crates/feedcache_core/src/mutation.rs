/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::changes::Table;
use crate::db::{now_ms, WriteCtx};
use crate::error::Result;
use crate::eviction::CleanPolicy;
use crate::gaps::{GapFill, LoadMore};
use crate::joins::OrderedJoin;
use crate::timeline::Timeline;
use feedcache_entities::{
    Account, Announcement, Conversation, Emoji, Filter, Id, Instance, List, Notification,
    Relationship, Rule, Status, Tag,
};
use rusqlite::params;
use std::collections::HashSet;

/// One step of a write. A write is an ordered list of these applied in a single
/// transaction; the list either commits as a whole or not at all.
#[derive(Clone, Debug)]
pub enum Mutation {
    UpsertStatuses(Vec<Status>),
    UpsertAccounts(Vec<Account>),
    SaveTimeline(Timeline),
    DeleteTimeline(Timeline),
    JoinTimeline {
        timeline: Timeline,
        status_ids: Vec<Id>,
    },
    InsertGap(LoadMore),
    FillGap {
        fill: GapFill,
        inserted: Vec<Id>,
    },
    ReplaceContext {
        parent_id: Id,
        ancestors: Vec<Id>,
        descendants: Vec<Id>,
    },
    ReplacePinned {
        account_id: Id,
        status_ids: Vec<Id>,
    },
    AppendAccountList {
        list_id: String,
        account_ids: Vec<Id>,
    },
    ReplaceFamiliarFollowers {
        account_id: Id,
        follower_ids: Vec<Id>,
    },
    UpsertRelationships(Vec<Relationship>),
    ToggleShowContent(Id),
    ToggleShowAttachments(Id),
    ReplaceLists(Vec<List>),
    DeleteList(Id),
    ReplaceFilters(Vec<Filter>),
    DeleteFilter(Id),
    ReplaceFollowedTags(Vec<Tag>),
    UpdateInstance(Instance),
    ReplaceRules(Vec<Rule>),
    ReplaceEmojis(Vec<Emoji>),
    RecordEmojiUse {
        emoji: String,
        system: bool,
    },
    ReplaceAnnouncements(Vec<Announcement>),
    UpsertNotifications(Vec<Notification>),
    UpsertConversations(Vec<Conversation>),
    DeleteStatus(Id),
    /// Drops the account's statuses from the home timeline.
    Unfollow(Id),
    /// Drops the account's statuses and notifications.
    Mute(Id),
    /// Drops the account and everything that references it.
    Block(Id),
    SetLastRead {
        timeline_id: String,
        status_id: Id,
    },
    CleanHomeTimeline(CleanPolicy),
}

/// Tables a status deletion can cascade into.
const STATUS_CASCADE: [Table; 6] = [
    Table::Statuses,
    Table::TimelineStatuses,
    Table::ContextJoins,
    Table::PinnedStatuses,
    Table::Notifications,
    Table::Conversations,
];

impl Mutation {
    pub(crate) fn apply(&self, ctx: &mut WriteCtx<'_>) -> Result<()> {
        match self {
            Self::UpsertStatuses(statuses) => ctx.upsert_statuses(statuses),
            Self::UpsertAccounts(accounts) => ctx.upsert_accounts(accounts),
            Self::SaveTimeline(timeline) => ctx.save_timeline(timeline),
            Self::DeleteTimeline(timeline) => ctx.delete_timeline(&timeline.id()),
            Self::JoinTimeline {
                timeline,
                status_ids,
            } => ctx.join_timeline(timeline, status_ids),
            Self::InsertGap(lm) => {
                ctx.insert_gap(&lm.timeline_id, &lm.after_status_id, &lm.before_status_id)
            }
            Self::FillGap { fill, inserted } => ctx.fill_gap(fill, inserted),
            Self::ReplaceContext {
                parent_id,
                ancestors,
                descendants,
            } => {
                ctx.replace_ordered_join(OrderedJoin::Ancestors, parent_id.as_str(), ancestors)?;
                ctx.replace_ordered_join(
                    OrderedJoin::Descendants,
                    parent_id.as_str(),
                    descendants,
                )
            }
            Self::ReplacePinned {
                account_id,
                status_ids,
            } => ctx.replace_ordered_join(OrderedJoin::Pinned, account_id.as_str(), status_ids),
            Self::AppendAccountList {
                list_id,
                account_ids,
            } => ctx.append_account_list(list_id, account_ids),
            Self::ReplaceFamiliarFollowers {
                account_id,
                follower_ids,
            } => ctx.replace_familiar_followers(account_id, follower_ids),
            Self::UpsertRelationships(relationships) => {
                for rel in relationships {
                    let payload = ctx.codec.encode(rel)?;
                    ctx.conn.execute(
                        "INSERT INTO relationships(account_id, payload) VALUES (?1, ?2) \
                         ON CONFLICT(account_id) DO UPDATE SET payload=excluded.payload",
                        params![rel.id.as_str(), payload],
                    )?;
                    ctx.touch(Table::Relationships);
                }
                Ok(())
            }
            Self::ToggleShowContent(id) => toggle(ctx, "status_show_content_toggles", id),
            Self::ToggleShowAttachments(id) => toggle(ctx, "status_show_attachments_toggles", id),
            Self::ReplaceLists(lists) => {
                let keep: HashSet<String> = lists.iter().map(|l| l.id.to_string()).collect();
                for list in lists {
                    ctx.save_timeline(&Timeline::List {
                        id: list.id.clone(),
                        title: list.title.clone(),
                    })?;
                }
                let existing = ctx
                    .reader()
                    .ids("SELECT param FROM timelines WHERE kind='list'", [])?;
                for gone in existing.iter().filter(|id| !keep.contains(id.as_str())) {
                    ctx.delete_timeline(&format!("list-{gone}"))?;
                }
                Ok(())
            }
            Self::DeleteList(id) => ctx.delete_timeline(&format!("list-{id}")),
            Self::ReplaceFilters(filters) => {
                let changed = ctx.conn.execute("DELETE FROM filters", [])?;
                ctx.touch_if(Table::Filters, changed);
                for filter in filters {
                    let payload = ctx.codec.encode(filter)?;
                    ctx.conn.execute(
                        "INSERT OR REPLACE INTO filters(id, expires_at_ms, payload) VALUES (?1, ?2, ?3)",
                        params![
                            filter.id.as_str(),
                            filter.expires_at.map(|t| t.timestamp_millis()),
                            payload
                        ],
                    )?;
                    ctx.touch(Table::Filters);
                }
                Ok(())
            }
            Self::DeleteFilter(id) => {
                let changed = ctx
                    .conn
                    .execute("DELETE FROM filters WHERE id=?1", params![id.as_str()])?;
                ctx.touch_if(Table::Filters, changed);
                Ok(())
            }
            Self::ReplaceFollowedTags(tags) => {
                let changed = ctx.conn.execute("DELETE FROM followed_tags", [])?;
                ctx.touch_if(Table::FollowedTags, changed);
                for tag in tags {
                    let payload = ctx.codec.encode(tag)?;
                    ctx.conn.execute(
                        "INSERT OR REPLACE INTO followed_tags(name, payload) VALUES (?1, ?2)",
                        params![tag.name.to_lowercase(), payload],
                    )?;
                    ctx.touch(Table::FollowedTags);
                }
                Ok(())
            }
            Self::UpdateInstance(instance) => {
                if let Some(contact) = &instance.contact_account {
                    ctx.upsert_account(contact)?;
                }
                let mut stored = instance.clone();
                stored.contact_account = None;
                let payload = ctx.codec.encode(&stored)?;
                ctx.conn.execute(
                    "DELETE FROM instance WHERE uri<>?1",
                    params![instance.uri],
                )?;
                ctx.conn.execute(
                    "INSERT INTO instance(uri, contact_account_id, payload) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(uri) DO UPDATE SET contact_account_id=excluded.contact_account_id, payload=excluded.payload",
                    params![
                        instance.uri,
                        instance.contact_account.as_ref().map(|a| a.id.as_str()),
                        payload
                    ],
                )?;
                ctx.touch(Table::Instance);
                Ok(())
            }
            Self::ReplaceRules(rules) => {
                let changed = ctx.conn.execute("DELETE FROM rules", [])?;
                ctx.touch_if(Table::Rules, changed);
                for (ord, rule) in rules.iter().enumerate() {
                    let payload = ctx.codec.encode(rule)?;
                    ctx.conn.execute(
                        "INSERT OR REPLACE INTO rules(id, ord, payload) VALUES (?1, ?2, ?3)",
                        params![rule.id.as_str(), ord as i64, payload],
                    )?;
                    ctx.touch(Table::Rules);
                }
                Ok(())
            }
            Self::ReplaceEmojis(emojis) => {
                let changed = ctx.conn.execute("DELETE FROM emojis", [])?;
                ctx.touch_if(Table::Emojis, changed);
                for emoji in emojis {
                    let payload = ctx.codec.encode(emoji)?;
                    ctx.conn.execute(
                        "INSERT OR REPLACE INTO emojis(shortcode, visible_in_picker, category, payload) VALUES (?1, ?2, ?3, ?4)",
                        params![
                            emoji.shortcode,
                            emoji.visible_in_picker,
                            emoji.category,
                            payload
                        ],
                    )?;
                    ctx.touch(Table::Emojis);
                }
                Ok(())
            }
            Self::RecordEmojiUse { emoji, system } => {
                ctx.conn.execute(
                    "INSERT INTO emoji_uses(emoji, system, count, updated_at_ms) VALUES (?1, ?2, 1, ?3) \
                     ON CONFLICT(emoji, system) DO UPDATE SET count=emoji_uses.count + 1, updated_at_ms=excluded.updated_at_ms",
                    params![emoji, system, now_ms()],
                )?;
                ctx.touch(Table::EmojiUses);
                Ok(())
            }
            Self::ReplaceAnnouncements(announcements) => {
                let changed = ctx.conn.execute("DELETE FROM announcements", [])?;
                ctx.touch_if(Table::Announcements, changed);
                for a in announcements {
                    let payload = ctx.codec.encode(a)?;
                    ctx.conn.execute(
                        "INSERT OR REPLACE INTO announcements(id, published_at_ms, read, payload) VALUES (?1, ?2, ?3, ?4)",
                        params![a.id.as_str(), a.published_at.timestamp_millis(), a.read, payload],
                    )?;
                    ctx.touch(Table::Announcements);
                }
                Ok(())
            }
            Self::UpsertNotifications(notifications) => {
                for n in notifications {
                    ctx.upsert_account(&n.account)?;
                    if let Some(status) = &n.status {
                        ctx.upsert_status(status)?;
                    }
                    ctx.conn.execute(
                        r#"
                        INSERT INTO notifications(id, kind, account_id, status_id, created_at_ms)
                        VALUES (?1, ?2, ?3, ?4, ?5)
                        ON CONFLICT(id) DO UPDATE SET
                          kind=excluded.kind,
                          account_id=excluded.account_id,
                          status_id=excluded.status_id,
                          created_at_ms=excluded.created_at_ms
                        "#,
                        params![
                            n.id.as_str(),
                            n.kind.as_str(),
                            n.account.id.as_str(),
                            n.status.as_ref().map(|s| s.id.as_str()),
                            n.created_at.timestamp_millis()
                        ],
                    )?;
                    ctx.touch(Table::Notifications);
                }
                Ok(())
            }
            Self::UpsertConversations(conversations) => {
                for c in conversations {
                    ctx.upsert_accounts(&c.accounts)?;
                    if let Some(status) = &c.last_status {
                        ctx.upsert_status(status)?;
                    }
                    ctx.conn.execute(
                        "INSERT INTO conversations(id, unread, last_status_id) VALUES (?1, ?2, ?3) \
                         ON CONFLICT(id) DO UPDATE SET unread=excluded.unread, last_status_id=excluded.last_status_id",
                        params![
                            c.id.as_str(),
                            c.unread,
                            c.last_status.as_ref().map(|s| s.id.as_str())
                        ],
                    )?;
                    ctx.touch(Table::Conversations);
                    let members: Vec<Id> = c.accounts.iter().map(|a| a.id.clone()).collect();
                    ctx.replace_ordered_join(
                        OrderedJoin::ConversationAccounts,
                        c.id.as_str(),
                        &members,
                    )?;
                }
                Ok(())
            }
            Self::DeleteStatus(id) => {
                let changed = ctx
                    .conn
                    .execute("DELETE FROM statuses WHERE id=?1", params![id.as_str()])?;
                if changed > 0 {
                    STATUS_CASCADE.iter().for_each(|t| ctx.touch(*t));
                }
                Ok(())
            }
            Self::Unfollow(account_id) => {
                let changed = ctx.conn.execute(
                    "DELETE FROM timeline_status_joins WHERE timeline_id='home' AND status_id IN \
                     (SELECT id FROM statuses WHERE account_id=?1)",
                    params![account_id.as_str()],
                )?;
                ctx.touch_if(Table::TimelineStatuses, changed);
                Ok(())
            }
            Self::Mute(account_id) => {
                let statuses = ctx.conn.execute(
                    "DELETE FROM statuses WHERE account_id=?1",
                    params![account_id.as_str()],
                )?;
                if statuses > 0 {
                    STATUS_CASCADE.iter().for_each(|t| ctx.touch(*t));
                }
                let notifications = ctx.conn.execute(
                    "DELETE FROM notifications WHERE account_id=?1",
                    params![account_id.as_str()],
                )?;
                ctx.touch_if(Table::Notifications, notifications);
                Ok(())
            }
            Self::Block(account_id) => {
                let changed = ctx.conn.execute(
                    "DELETE FROM accounts WHERE id=?1",
                    params![account_id.as_str()],
                )?;
                if changed > 0 {
                    STATUS_CASCADE.iter().for_each(|t| ctx.touch(*t));
                    ctx.touch(Table::Accounts);
                    ctx.touch(Table::AccountLists);
                    ctx.touch(Table::FamiliarFollowers);
                    ctx.touch(Table::Instance);
                }
                Ok(())
            }
            Self::SetLastRead {
                timeline_id,
                status_id,
            } => {
                let changed = ctx.conn.execute(
                    "INSERT INTO last_read(timeline_id, status_id) VALUES (?1, ?2) \
                     ON CONFLICT(timeline_id) DO UPDATE SET status_id=excluded.status_id \
                     WHERE last_read.status_id<>excluded.status_id",
                    params![timeline_id, status_id.as_str()],
                )?;
                ctx.touch_if(Table::LastRead, changed);
                Ok(())
            }
            Self::CleanHomeTimeline(policy) => ctx.clean_home_timeline(*policy).map(|_| ()),
        }
    }
}

fn toggle(ctx: &mut WriteCtx<'_>, table: &str, id: &Id) -> Result<()> {
    let removed = ctx.conn.execute(
        &format!("DELETE FROM {table} WHERE status_id=?1"),
        params![id.as_str()],
    )?;
    if removed == 0 {
        ctx.conn.execute(
            &format!("INSERT INTO {table}(status_id) VALUES (?1)"),
            params![id.as_str()],
        )?;
    }
    ctx.touch(Table::Toggles);
    Ok(())
}
