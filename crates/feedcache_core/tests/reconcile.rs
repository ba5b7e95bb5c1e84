/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

mod common;

use common::*;
use feedcache_core::entities::{Filter, FilterAction, FilterContext, Id, List};
use feedcache_core::{CacheError, EntityKind, NotFound, Timeline, UrlLookup};

#[tokio::test]
async fn urls_resolve_to_cached_accounts_and_statuses() {
    let store = memory_store();
    store
        .insert_statuses(&Timeline::Home, vec![status_by("12", "4")], None)
        .await
        .unwrap();

    assert_eq!(
        store
            .lookup_by_url("https://remote.example/@user4")
            .await
            .unwrap(),
        Some(UrlLookup::Account(Id::from("4")))
    );
    assert_eq!(
        store
            .lookup_by_url("https://remote.example/users/user4")
            .await
            .unwrap(),
        Some(UrlLookup::Account(Id::from("4")))
    );
    assert_eq!(
        store
            .lookup_by_url("https://remote.example/@user4/12")
            .await
            .unwrap(),
        Some(UrlLookup::Status(Id::from("12")))
    );
    assert_eq!(
        store
            .lookup_by_url("https://remote.example/users/user4/statuses/12")
            .await
            .unwrap(),
        Some(UrlLookup::Status(Id::from("12")))
    );
    assert_eq!(
        store
            .lookup_by_url("https://elsewhere.example/@nobody")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn url_shared_by_account_and_status_resolves_to_the_account() {
    let store = memory_store();
    let mut s = status_by("12", "4");
    s.body.url = Some("https://remote.example/@user4".to_string());
    store
        .insert_statuses(&Timeline::Home, vec![s], None)
        .await
        .unwrap();

    for _ in 0..25 {
        assert_eq!(
            store
                .lookup_by_url("https://remote.example/@user4")
                .await
                .unwrap(),
            Some(UrlLookup::Account(Id::from("4")))
        );
    }
}

#[tokio::test]
async fn missing_status_is_dropped_and_the_error_passed_on() {
    let store = memory_store();
    store
        .insert_statuses(&Timeline::Home, statuses([5, 6]), None)
        .await
        .unwrap();

    let err = CacheError::from(NotFound::new(EntityKind::Status, "5"));
    let back = store.catch_not_found(err).await;
    assert!(matches!(back, CacheError::NotFound(ref nf) if nf.id == Id::from("5")));

    assert!(store.status(&Id::from("5")).await.unwrap().is_none());
    assert_eq!(
        store.timeline_status_ids(&Timeline::Home).await.unwrap(),
        ids(&["6"])
    );
}

#[tokio::test]
async fn missing_account_takes_its_statuses_along() {
    let store = memory_store();
    store
        .insert_statuses(
            &Timeline::Home,
            vec![status_by("1", "3"), status_by("2", "4")],
            None,
        )
        .await
        .unwrap();
    store
        .reconcile_not_found(&NotFound::new(EntityKind::Account, "3"))
        .await
        .unwrap();

    assert!(store.account(&Id::from("3")).await.unwrap().is_none());
    assert_eq!(
        store.timeline_status_ids(&Timeline::Home).await.unwrap(),
        ids(&["2"])
    );
}

#[tokio::test]
async fn missing_filter_and_list_are_removed() {
    let store = memory_store();
    store
        .set_filters(vec![Filter {
            id: Id::from("9"),
            phrase: "spoiler".to_string(),
            context: vec![FilterContext::Home],
            expires_at: None,
            irreversible: false,
            whole_word: false,
            action: FilterAction::Hide,
        }])
        .await
        .unwrap();
    store
        .set_lists(vec![List {
            id: Id::from("2"),
            title: "friends".to_string(),
        }])
        .await
        .unwrap();

    store
        .reconcile_not_found(&NotFound::new(EntityKind::Filter, "9"))
        .await
        .unwrap();
    store
        .reconcile_not_found(&NotFound::new(EntityKind::List, "2"))
        .await
        .unwrap();

    let mut filters = store.active_filters();
    assert!(filters.next().await.unwrap().unwrap().is_empty());
    let mut lists = store.lists();
    assert!(lists.next().await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_kinds_and_other_errors_leave_the_cache_alone() {
    let store = memory_store();
    store
        .insert_statuses(&Timeline::Home, statuses([5]), None)
        .await
        .unwrap();

    store
        .reconcile_not_found(&NotFound::new(EntityKind::Other("poll".to_string()), "5"))
        .await
        .unwrap();
    let back = store
        .catch_not_found(CacheError::Config("offline".to_string()))
        .await;
    assert!(matches!(back, CacheError::Config(_)));

    assert_eq!(
        store.timeline_status_ids(&Timeline::Home).await.unwrap(),
        ids(&["5"])
    );
}
