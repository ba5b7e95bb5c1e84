/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::changes::{Table, TableSet};
use crate::cipher::{KeySource, NoKey, PayloadCodec};
use crate::config::CacheConfig;
use crate::db::{CacheDb, Reader};
use crate::error::{CacheError, NotFound, NotFoundSignal, Result};
use crate::eviction::CleanPolicy;
use crate::filters;
use crate::gaps::GapFill;
use crate::mutation::Mutation;
use crate::observe::{observe, Query, Subscription};
use crate::paths;
use crate::reconcile::{self, UrlLookup};
use crate::registry::{EphemeralRegistry, TimelineLease};
use crate::timeline::Timeline;
use crate::views::{
    self, AnnouncementCounts, ContextView, ConversationView, EmojiUse, NotificationView,
    ProfileView, SearchView, TimelineItem,
};
use feedcache_entities::{
    Account, Announcement, Conversation, Emoji, Filter, Id, Instance, List, Notification,
    NotificationKind, Relationship, Rule, SearchResults, Status, Tag,
};
use rand::RngCore;
use std::sync::Arc;
use tracing::{info, warn};

/// Local cache of remote social content for one identity.
///
/// Writes and one-shot reads run on the blocking pool; observations stream their
/// results and must be started from within a tokio runtime.
#[derive(Clone)]
pub struct ContentStore {
    db: Arc<CacheDb>,
    registry: Arc<EphemeralRegistry>,
    config: Arc<CacheConfig>,
}

impl ContentStore {
    /// Opens (or creates) the cache of `identity`. With payload encryption on, a key the
    /// `keys` source cannot produce makes opening fail.
    pub fn open(config: CacheConfig, identity: &str, keys: &dyn KeySource) -> Result<Self> {
        let codec = if config.encrypts_payloads() {
            let key = keys
                .cache_key()
                .map_err(|e| CacheError::KeyUnavailable(format!("{e:#}")))?;
            PayloadCodec::sealed(&key)?
        } else {
            PayloadCodec::plain()
        };

        let db = if config.is_in_memory() {
            CacheDb::open_in_memory(codec, config.channel_capacity())?
        } else {
            let root = config
                .data_dir()
                .map_err(|e| CacheError::Config(format!("{e:#}")))?;
            let path = paths::database_path(&root, identity)
                .map_err(|e| CacheError::Config(format!("{e:#}")))?;
            info!(identity, path = %path.display(), "opening content cache");
            CacheDb::open(
                path,
                codec,
                config.busy_timeout(),
                config.channel_capacity(),
            )?
        };
        Ok(Self {
            db: Arc::new(db),
            registry: Arc::new(EphemeralRegistry::default()),
            config: Arc::new(config),
        })
    }

    /// Unencrypted, memory-only store.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(CacheConfig::in_memory(), "memory", &NoKey)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Applies `mutations` in order as one transaction.
    pub async fn apply(&self, mutations: Vec<Mutation>) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.write(mutations)).await??;
        Ok(())
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Reader<'_>) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.read(f)).await?
    }

    fn observe<T>(&self, tables: TableSet, fetch: impl Fn(&Reader<'_>) -> Result<T> + Send + Sync + 'static) -> Subscription<T>
    where
        T: PartialEq + Clone + Send + 'static,
    {
        observe(self.db.clone(), Query::new(tables, fetch))
    }

    // --- timelines ---

    /// Stores a page of `timeline` and joins it in. With `gap`, the page was fetched to
    /// fill that load-more marker.
    pub async fn insert_statuses(
        &self,
        timeline: &Timeline,
        statuses: Vec<Status>,
        gap: Option<GapFill>,
    ) -> Result<()> {
        let ids: Vec<Id> = statuses.iter().map(|s| s.id.clone()).collect();
        let mut mutations = vec![
            Mutation::UpsertStatuses(statuses),
            Mutation::JoinTimeline {
                timeline: timeline.clone(),
                status_ids: ids.clone(),
            },
        ];
        if let Some(fill) = gap {
            mutations.push(Mutation::FillGap {
                fill,
                inserted: ids,
            });
        }
        self.apply(mutations).await
    }

    pub async fn set_last_read(&self, timeline: &Timeline, status_id: Id) -> Result<()> {
        self.apply(vec![Mutation::SetLastRead {
            timeline_id: timeline.id(),
            status_id,
        }])
        .await
    }

    pub async fn last_read(&self, timeline: &Timeline) -> Result<Option<Id>> {
        let timeline_id = timeline.id();
        self.read(move |r| r.last_read(&timeline_id)).await
    }

    pub async fn timeline_status_ids(&self, timeline: &Timeline) -> Result<Vec<Id>> {
        let timeline = timeline.clone();
        self.read(move |r| r.timeline_status_ids(&timeline)).await
    }

    pub async fn has_timeline(&self, timeline: &Timeline) -> Result<bool> {
        let timeline_id = timeline.id();
        self.read(move |r| r.has_timeline(&timeline_id)).await
    }

    pub async fn timelines(&self) -> Result<Vec<Timeline>> {
        self.read(|r| r.timelines()).await
    }

    /// Observes the timeline. Ephemeral timelines are deleted once the last observer
    /// is dropped.
    pub fn timeline(&self, timeline: &Timeline) -> Subscription<Vec<TimelineItem>> {
        let lease =
            TimelineLease::acquire(self.registry.clone(), self.db.clone(), timeline.clone());
        let t = timeline.clone();
        self.observe(views::TIMELINE_TABLES, move |r| r.timeline_items(&t))
            .with_lease(lease)
    }

    /// [`ContentStore::timeline`] with the active filters of the timeline's context
    /// applied.
    pub fn filtered_timeline(&self, timeline: &Timeline) -> Subscription<Vec<TimelineItem>> {
        let context = timeline.filter_context();
        self.timeline(timeline)
            .combine_latest(self.active_filters(), move |items, active| {
                filters::apply(items.clone(), active, context)
            })
    }

    pub async fn clean_home_timeline(&self) -> Result<()> {
        let policy = CleanPolicy {
            preserve_position: self.config.uses_last_read_position(),
            retention: self.config.retention_after_last_read(),
        };
        self.apply(vec![Mutation::CleanHomeTimeline(policy)]).await
    }

    // --- statuses and threads ---

    pub async fn status(&self, id: &Id) -> Result<Option<Status>> {
        let id = id.clone();
        self.read(move |r| r.status(&id)).await
    }

    pub async fn insert_context(
        &self,
        parent: Status,
        ancestors: Vec<Status>,
        descendants: Vec<Status>,
    ) -> Result<()> {
        let parent_id = parent.id.clone();
        let ancestor_ids = ancestors.iter().map(|s| s.id.clone()).collect();
        let descendant_ids = descendants.iter().map(|s| s.id.clone()).collect();
        let mut all = Vec::with_capacity(1 + ancestors.len() + descendants.len());
        all.push(parent);
        all.extend(ancestors);
        all.extend(descendants);
        self.apply(vec![
            Mutation::UpsertStatuses(all),
            Mutation::ReplaceContext {
                parent_id,
                ancestors: ancestor_ids,
                descendants: descendant_ids,
            },
        ])
        .await
    }

    pub fn context(&self, id: &Id) -> Subscription<ContextView> {
        let id = id.clone();
        self.observe(views::CONTEXT_TABLES, move |r| r.context_view(&id))
    }

    pub async fn toggle_show_content(&self, id: &Id) -> Result<()> {
        self.apply(vec![Mutation::ToggleShowContent(id.clone())]).await
    }

    pub async fn toggle_show_attachments(&self, id: &Id) -> Result<()> {
        self.apply(vec![Mutation::ToggleShowAttachments(id.clone())])
            .await
    }

    pub async fn delete_status(&self, id: &Id) -> Result<()> {
        self.apply(vec![Mutation::DeleteStatus(id.clone())]).await
    }

    // --- accounts ---

    pub async fn account(&self, id: &Id) -> Result<Option<Account>> {
        let id = id.clone();
        self.read(move |r| r.account(&id)).await
    }

    pub async fn insert_account(&self, account: Account) -> Result<()> {
        self.apply(vec![Mutation::UpsertAccounts(vec![account])])
            .await
    }

    pub async fn insert_pinned(&self, account_id: &Id, statuses: Vec<Status>) -> Result<()> {
        let status_ids = statuses.iter().map(|s| s.id.clone()).collect();
        self.apply(vec![
            Mutation::UpsertStatuses(statuses),
            Mutation::ReplacePinned {
                account_id: account_id.clone(),
                status_ids,
            },
        ])
        .await
    }

    pub async fn insert_familiar_followers(
        &self,
        account_id: &Id,
        followers: Vec<Account>,
    ) -> Result<()> {
        let follower_ids = followers.iter().map(|a| a.id.clone()).collect();
        self.apply(vec![
            Mutation::UpsertAccounts(followers),
            Mutation::ReplaceFamiliarFollowers {
                account_id: account_id.clone(),
                follower_ids,
            },
        ])
        .await
    }

    pub async fn insert_relationships(&self, relationships: Vec<Relationship>) -> Result<()> {
        self.apply(vec![Mutation::UpsertRelationships(relationships)])
            .await
    }

    /// Creates a new account list (followers, favourited-by, ...) and returns its id.
    pub async fn insert_account_list(&self, accounts: Vec<Account>) -> Result<String> {
        let list_id = random_list_id();
        self.append_account_list(&list_id, accounts).await?;
        Ok(list_id)
    }

    pub async fn append_account_list(&self, list_id: &str, accounts: Vec<Account>) -> Result<()> {
        let account_ids = accounts.iter().map(|a| a.id.clone()).collect();
        self.apply(vec![
            Mutation::UpsertAccounts(accounts),
            Mutation::AppendAccountList {
                list_id: list_id.to_string(),
                account_ids,
            },
        ])
        .await
    }

    pub fn account_list(&self, list_id: &str) -> Subscription<Vec<Account>> {
        let list_id = list_id.to_string();
        self.observe(
            TableSet::of(&[Table::AccountLists, Table::Accounts]),
            move |r| r.account_list(&list_id),
        )
    }

    pub fn profile(&self, account_id: &Id) -> Subscription<Option<ProfileView>> {
        let id = account_id.clone();
        self.observe(views::PROFILE_TABLES, move |r| r.profile_view(&id))
    }

    pub fn relationship(&self, account_id: &Id) -> Subscription<Option<Relationship>> {
        let id = account_id.clone();
        self.observe(TableSet::of(&[Table::Relationships]), move |r| {
            r.relationship(&id)
        })
    }

    pub async fn unfollow(&self, account_id: &Id) -> Result<()> {
        self.apply(vec![Mutation::Unfollow(account_id.clone())]).await
    }

    pub async fn mute(&self, account_id: &Id) -> Result<()> {
        self.apply(vec![Mutation::Mute(account_id.clone())]).await
    }

    pub async fn block(&self, account_id: &Id) -> Result<()> {
        self.apply(vec![Mutation::Block(account_id.clone())]).await
    }

    // --- lists, filters, tags ---

    pub async fn set_lists(&self, lists: Vec<List>) -> Result<()> {
        self.apply(vec![Mutation::ReplaceLists(lists)]).await
    }

    pub async fn delete_list(&self, id: &Id) -> Result<()> {
        self.apply(vec![Mutation::DeleteList(id.clone())]).await
    }

    pub fn lists(&self) -> Subscription<Vec<List>> {
        self.observe(TableSet::of(&[Table::Timelines]), |r| r.lists())
    }

    pub async fn set_filters(&self, filters: Vec<Filter>) -> Result<()> {
        self.apply(vec![Mutation::ReplaceFilters(filters)]).await
    }

    pub async fn delete_filter(&self, id: &Id) -> Result<()> {
        self.apply(vec![Mutation::DeleteFilter(id.clone())]).await
    }

    /// Filters not expired at the time of the read.
    pub fn active_filters(&self) -> Subscription<Vec<Filter>> {
        self.observe(TableSet::of(&[Table::Filters]), |r| r.filters(true))
    }

    pub fn expired_filters(&self) -> Subscription<Vec<Filter>> {
        self.observe(TableSet::of(&[Table::Filters]), |r| r.filters(false))
    }

    pub async fn set_followed_tags(&self, tags: Vec<Tag>) -> Result<()> {
        self.apply(vec![Mutation::ReplaceFollowedTags(tags)]).await
    }

    pub fn followed_tags(&self) -> Subscription<Vec<Tag>> {
        self.observe(TableSet::of(&[Table::FollowedTags]), |r| {
            r.followed_tags()
        })
    }

    // --- notifications, conversations, search ---

    pub async fn insert_notifications(&self, notifications: Vec<Notification>) -> Result<()> {
        self.apply(vec![Mutation::UpsertNotifications(notifications)])
            .await
    }

    pub fn notifications(&self, excluded: Vec<NotificationKind>) -> Subscription<Vec<NotificationView>> {
        self.observe(views::NOTIFICATION_TABLES, move |r| {
            r.notification_views(&excluded)
        })
    }

    pub async fn insert_conversations(&self, conversations: Vec<Conversation>) -> Result<()> {
        self.apply(vec![Mutation::UpsertConversations(conversations)])
            .await
    }

    pub fn conversations(&self) -> Subscription<Vec<ConversationView>> {
        self.observe(views::CONVERSATION_TABLES, |r| r.conversation_views())
    }

    /// Stores the entities of a search response so [`ContentStore::search_results`]
    /// can serve them.
    pub async fn insert_results(&self, results: &SearchResults) -> Result<()> {
        self.apply(vec![
            Mutation::UpsertAccounts(results.accounts.clone()),
            Mutation::UpsertStatuses(results.statuses.clone()),
        ])
        .await
    }

    pub fn search_results(&self, results: SearchResults, limit: Option<usize>) -> Subscription<SearchView> {
        self.observe(views::STATUS_TABLES, move |r| {
            r.search_view(&results, limit)
        })
    }

    // --- instance metadata ---

    pub async fn update_instance(&self, instance: Instance) -> Result<()> {
        self.apply(vec![Mutation::UpdateInstance(instance)]).await
    }

    pub fn instance(&self) -> Subscription<Option<Instance>> {
        self.observe(TableSet::of(&[Table::Instance, Table::Accounts]), |r| {
            r.instance()
        })
    }

    pub async fn update_rules(&self, rules: Vec<Rule>) -> Result<()> {
        self.apply(vec![Mutation::ReplaceRules(rules)]).await
    }

    pub fn rules(&self) -> Subscription<Vec<Rule>> {
        self.observe(TableSet::of(&[Table::Rules]), |r| r.rules())
    }

    pub async fn update_emojis(&self, emojis: Vec<Emoji>) -> Result<()> {
        self.apply(vec![Mutation::ReplaceEmojis(emojis)]).await
    }

    pub fn picker_emojis(&self) -> Subscription<Vec<Emoji>> {
        self.observe(TableSet::of(&[Table::Emojis]), |r| r.picker_emojis())
    }

    pub async fn record_emoji_use(&self, emoji: &str, system: bool) -> Result<()> {
        self.apply(vec![Mutation::RecordEmojiUse {
            emoji: emoji.to_string(),
            system,
        }])
        .await
    }

    pub fn top_emoji_uses(&self, limit: usize) -> Subscription<Vec<EmojiUse>> {
        self.observe(TableSet::of(&[Table::EmojiUses]), move |r| {
            r.top_emoji_uses(limit)
        })
    }

    pub async fn update_announcements(&self, announcements: Vec<Announcement>) -> Result<()> {
        self.apply(vec![Mutation::ReplaceAnnouncements(announcements)])
            .await
    }

    pub fn announcements(&self) -> Subscription<Vec<Announcement>> {
        self.observe(TableSet::of(&[Table::Announcements]), |r| {
            r.announcements()
        })
    }

    pub fn announcement_counts(&self) -> Subscription<AnnouncementCounts> {
        self.observe(TableSet::of(&[Table::Announcements]), |r| {
            r.announcement_counts()
        })
    }

    // --- lookup and reconciliation ---

    pub async fn lookup_by_url(&self, url: &str) -> Result<Option<UrlLookup>> {
        reconcile::lookup_by_url(self.db.clone(), url.to_string()).await
    }

    /// Removes whatever the remote side reported as gone.
    pub async fn reconcile_not_found(&self, nf: &NotFound) -> Result<()> {
        match reconcile::deletion_for(nf) {
            Some(m) => self.apply(vec![m]).await,
            None => Ok(()),
        }
    }

    /// Passes `err` through after dropping the entity it names, if any. A failing
    /// cleanup is logged and does not replace `err`.
    pub async fn catch_not_found<E: NotFoundSignal>(&self, err: E) -> E {
        if let Some(nf) = err.not_found() {
            if let Err(e) = self.reconcile_not_found(nf).await {
                warn!(entity = %nf, "not-found cleanup failed: {e}");
            }
        }
        err
    }
}

fn random_list_id() -> String {
    let mut bytes = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
