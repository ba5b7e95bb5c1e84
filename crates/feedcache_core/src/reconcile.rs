/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Cache corrections driven by remote answers.

use crate::db::CacheDb;
use crate::error::{EntityKind, NotFound, Result};
use crate::mutation::Mutation;
use feedcache_entities::Id;
use std::sync::Arc;
use tracing::error;

/// What a URL resolved to in the local cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UrlLookup {
    Account(Id),
    Status(Id),
}

/// Looks the URL up among accounts and statuses at the same time and returns the first
/// hit. When both sides already finished the account wins.
pub(crate) async fn lookup_by_url(db: Arc<CacheDb>, url: String) -> Result<Option<UrlLookup>> {
    let mut accounts = tokio::task::spawn_blocking({
        let db = db.clone();
        let url = url.clone();
        move || db.read(|r| r.account_id_by_url(&url))
    });
    let mut statuses = tokio::task::spawn_blocking(move || db.read(|r| r.status_id_by_url(&url)));

    let mut accounts_done = false;
    let mut statuses_done = false;
    loop {
        tokio::select! {
            biased;
            res = &mut accounts, if !accounts_done => {
                accounts_done = true;
                if let Some(id) = res?? {
                    return Ok(Some(UrlLookup::Account(id)));
                }
            }
            res = &mut statuses, if !statuses_done => {
                statuses_done = true;
                if let Some(id) = res?? {
                    return Ok(Some(UrlLookup::Status(id)));
                }
            }
            else => return Ok(None),
        }
    }
}

/// The local deletion matching a "not found" answer, if there is one.
pub(crate) fn deletion_for(nf: &NotFound) -> Option<Mutation> {
    match &nf.kind {
        EntityKind::Account => Some(Mutation::Block(nf.id.clone())),
        EntityKind::Status => Some(Mutation::DeleteStatus(nf.id.clone())),
        EntityKind::Filter => Some(Mutation::DeleteFilter(nf.id.clone())),
        EntityKind::List => Some(Mutation::DeleteList(nf.id.clone())),
        EntityKind::Other(kind) => {
            error!(kind = %kind, id = %nf.id, "no local deletion for not-found entity");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kinds_have_no_deletion() {
        let nf = NotFound::new(EntityKind::Other("poll".to_string()), "3");
        assert!(deletion_for(&nf).is_none());
        let nf = NotFound::new(EntityKind::Status, "3");
        assert!(matches!(deletion_for(&nf), Some(Mutation::DeleteStatus(id)) if id == Id::from("3")));
    }
}
