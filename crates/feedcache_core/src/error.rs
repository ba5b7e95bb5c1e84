/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use feedcache_entities::Id;
use std::fmt;
use thiserror::Error;

pub type Result<T, E = CacheError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(String),

    /// The credential collaborator could not hand out the cache key. Fatal for `open`.
    #[error("cache key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("not found: {0}")]
    NotFound(NotFound),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Kinds of remote entity a "not found" answer can refer to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Account,
    Status,
    Filter,
    List,
    /// Anything the reconciler has no deletion for.
    Other(String),
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account => f.write_str("account"),
            Self::Status => f.write_str("status"),
            Self::Filter => f.write_str("filter"),
            Self::List => f.write_str("list"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotFound {
    pub kind: EntityKind,
    pub id: Id,
}

impl NotFound {
    pub fn new(kind: EntityKind, id: impl Into<Id>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Errors that may carry a remote "entity not found" payload.
///
/// The network layer implements this for its own error type so failures can be routed
/// through [`crate::ContentStore::catch_not_found`].
pub trait NotFoundSignal {
    fn not_found(&self) -> Option<&NotFound>;
}

impl NotFoundSignal for CacheError {
    fn not_found(&self) -> Option<&NotFound> {
        match self {
            Self::NotFound(nf) => Some(nf),
            _ => None,
        }
    }
}

impl From<NotFound> for CacheError {
    fn from(value: NotFound) -> Self {
        Self::NotFound(value)
    }
}
