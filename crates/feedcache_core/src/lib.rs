/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod changes;
pub mod cipher;
pub mod config;
pub mod db;
pub mod error;
pub mod eviction;
pub mod filters;
pub mod gaps;
mod joins;
pub mod mutation;
pub mod observe;
pub mod paths;
pub mod reconcile;
mod records;
pub mod registry;
mod schema;
pub mod store;
pub mod timeline;
pub mod views;

pub use changes::{ChangeEvent, Table, TableSet};
pub use cipher::{KeySource, NoKey, StaticKey};
pub use config::CacheConfig;
pub use error::{CacheError, EntityKind, NotFound, NotFoundSignal, Result};
pub use eviction::CleanPolicy;
pub use gaps::{Direction, GapFill, LoadMore};
pub use mutation::Mutation;
pub use observe::{Query, Subscription};
pub use reconcile::UrlLookup;
pub use store::ContentStore;
pub use timeline::{ProfileCollection, Timeline};
pub use views::{
    AnnouncementCounts, ContextView, ConversationView, EmojiUse, NotificationView, ProfileView,
    SearchView, StatusView, TimelineItem,
};

pub use feedcache_entities as entities;
