/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use feedcache_core::entities::{Account, AccountProfile, Id, Status, StatusBody, Visibility};
use feedcache_core::{CacheConfig, ContentStore, NoKey, TimelineItem};

pub fn store_with(config: CacheConfig) -> ContentStore {
    ContentStore::open(config, "tester@example.social", &NoKey).expect("open store")
}

pub fn memory_store() -> ContentStore {
    ContentStore::open_in_memory().expect("open store")
}

pub fn account(id: &str) -> Account {
    Account {
        id: Id::from(id),
        moved: None,
        profile: AccountProfile {
            username: format!("user{id}"),
            acct: format!("user{id}@remote.example"),
            display_name: format!("User {id}"),
            note: String::new(),
            url: format!("https://remote.example/@user{id}"),
            uri: Some(format!("https://remote.example/users/user{id}")),
            avatar: String::new(),
            header: String::new(),
            locked: false,
            bot: false,
            followers_count: 0,
            following_count: 0,
            statuses_count: 0,
            created_at: None,
            emojis: vec![],
        },
    }
}

pub fn status_by(id: &str, author: &str) -> Status {
    let n: i64 = id.parse().unwrap_or(0);
    Status {
        id: Id::from(id),
        account: account(author),
        reblog: None,
        quote: None,
        body: StatusBody {
            uri: format!("https://remote.example/users/user{author}/statuses/{id}"),
            url: Some(format!("https://remote.example/@user{author}/{id}")),
            created_at: Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap(),
            in_reply_to_id: None,
            in_reply_to_account_id: None,
            content: format!("<p>post number {id}</p>"),
            spoiler_text: String::new(),
            sensitive: false,
            visibility: Visibility::Public,
            language: Some("en".to_string()),
            media_attachments: vec![],
            poll: None,
            emojis: vec![],
            replies_count: 0,
            reblogs_count: 0,
            favourites_count: 0,
            favourited: false,
            reblogged: false,
            bookmarked: false,
            muted: false,
            pinned: None,
        },
    }
}

pub fn status(id: &str) -> Status {
    status_by(id, "1")
}

pub fn statuses(ids: impl IntoIterator<Item = u64>) -> Vec<Status> {
    ids.into_iter().map(|i| status(&i.to_string())).collect()
}

pub fn reblog(id: &str, by: &str, of: Status) -> Status {
    let mut s = status_by(id, by);
    s.reblog = Some(Box::new(of));
    s
}

pub fn ids(raw: &[&str]) -> Vec<Id> {
    raw.iter().map(|s| Id::from(*s)).collect()
}

pub fn range_desc(lo: u64, hi: u64) -> Vec<Id> {
    (lo..=hi).rev().map(|i| Id::new(i.to_string())).collect()
}

/// Status ids of a timeline view, markers left out.
pub fn status_ids(items: &[TimelineItem]) -> Vec<Id> {
    items
        .iter()
        .filter_map(|i| match i {
            TimelineItem::Status(v) => Some(v.status.id.clone()),
            TimelineItem::LoadMore(_) => None,
        })
        .collect()
}
