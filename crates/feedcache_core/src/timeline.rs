/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use feedcache_entities::{FilterContext, Id};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProfileCollection {
    Statuses,
    StatusesAndReplies,
    Media,
}

impl ProfileCollection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Statuses => "statuses",
            Self::StatusesAndReplies => "statuses_and_replies",
            Self::Media => "media",
        }
    }

    fn parse(input: &str) -> Option<Self> {
        match input {
            "statuses" => Some(Self::Statuses),
            "statuses_and_replies" => Some(Self::StatusesAndReplies),
            "media" => Some(Self::Media),
            _ => None,
        }
    }
}

/// A named, independently paginated feed of statuses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Timeline {
    Home,
    Local,
    Federated,
    List { id: Id, title: String },
    Tag(String),
    Profile {
        account_id: Id,
        collection: ProfileCollection,
    },
    Favorites,
    Bookmarks,
}

impl Timeline {
    /// Timelines a full clean never deletes, besides lists.
    pub const DEFAULTS: [Timeline; 3] = [Timeline::Home, Timeline::Local, Timeline::Federated];

    /// Stable key combining kind and parameter. Two timelines with the same key share rows.
    pub fn id(&self) -> String {
        match self {
            Self::Home => "home".to_string(),
            Self::Local => "local".to_string(),
            Self::Federated => "federated".to_string(),
            Self::List { id, .. } => format!("list-{id}"),
            Self::Tag(name) => format!("tag-{}", name.trim_start_matches('#').to_lowercase()),
            Self::Profile {
                account_id,
                collection,
            } => format!("profile-{account_id}-{}", collection.as_str()),
            Self::Favorites => "favorites".to_string(),
            Self::Bookmarks => "bookmarks".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Local => "local",
            Self::Federated => "federated",
            Self::List { .. } => "list",
            Self::Tag(_) => "tag",
            Self::Profile { .. } => "profile",
            Self::Favorites => "favorites",
            Self::Bookmarks => "bookmarks",
        }
    }

    fn param(&self) -> Option<String> {
        match self {
            Self::List { id, .. } => Some(id.to_string()),
            Self::Tag(name) => Some(name.trim_start_matches('#').to_lowercase()),
            Self::Profile {
                account_id,
                collection,
            } => Some(format!("{account_id}:{}", collection.as_str())),
            _ => None,
        }
    }

    fn title(&self) -> Option<&str> {
        match self {
            Self::List { title, .. } => Some(title),
            _ => None,
        }
    }

    /// Ordered timelines keep the server's order in an explicit column; the others are
    /// sorted by status id, newest first.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Favorites | Self::Bookmarks)
    }

    /// Ephemeral timelines only keep rows while somebody observes them.
    pub fn is_ephemeral(&self) -> bool {
        matches!(
            self,
            Self::Tag(_) | Self::Profile { .. } | Self::Favorites | Self::Bookmarks
        )
    }

    pub fn filter_context(&self) -> Option<FilterContext> {
        match self {
            Self::Home | Self::List { .. } => Some(FilterContext::Home),
            Self::Local | Self::Federated | Self::Tag(_) => Some(FilterContext::Public),
            Self::Profile { .. } => Some(FilterContext::Account),
            Self::Favorites | Self::Bookmarks => None,
        }
    }

    pub(crate) fn row(&self) -> TimelineRow {
        TimelineRow {
            id: self.id(),
            kind: self.kind(),
            param: self.param(),
            title: self.title().map(str::to_string),
            ordered: self.is_ordered(),
        }
    }

    pub(crate) fn from_row(kind: &str, param: Option<&str>, title: Option<&str>) -> Option<Self> {
        Some(match kind {
            "home" => Self::Home,
            "local" => Self::Local,
            "federated" => Self::Federated,
            "list" => Self::List {
                id: Id::from(param?),
                title: title.unwrap_or_default().to_string(),
            },
            "tag" => Self::Tag(param?.to_string()),
            "profile" => {
                let (account_id, collection) = param?.rsplit_once(':')?;
                Self::Profile {
                    account_id: Id::from(account_id),
                    collection: ProfileCollection::parse(collection)?,
                }
            }
            "favorites" => Self::Favorites,
            "bookmarks" => Self::Bookmarks,
            _ => return None,
        })
    }
}

pub(crate) struct TimelineRow {
    pub id: String,
    pub kind: &'static str,
    pub param: Option<String>,
    pub title: Option<String>,
    pub ordered: bool,
}
