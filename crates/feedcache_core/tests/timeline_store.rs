/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Writing timeline pages: idempotence, range pruning, gaps and referential cleanup.

mod common;

use common::*;
use feedcache_core::entities::{Id, List};
use feedcache_core::{Direction, GapFill, LoadMore, Timeline, TimelineItem};

#[tokio::test]
async fn same_batch_twice_changes_nothing() {
    let store = memory_store();
    let batch = statuses([10, 20, 30]);
    store
        .insert_statuses(&Timeline::Home, batch.clone(), None)
        .await
        .unwrap();
    let first = store.timeline_status_ids(&Timeline::Home).await.unwrap();
    store
        .insert_statuses(&Timeline::Home, batch, None)
        .await
        .unwrap();
    let second = store.timeline_status_ids(&Timeline::Home).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second, ids(&["30", "20", "10"]));
}

#[tokio::test]
async fn batch_prunes_stale_members_of_its_range() {
    let store = memory_store();
    store
        .insert_statuses(&Timeline::Home, statuses([1, 3, 5, 7, 9]), None)
        .await
        .unwrap();
    store
        .insert_statuses(&Timeline::Home, statuses([3, 5, 9]), None)
        .await
        .unwrap();

    assert_eq!(
        store.timeline_status_ids(&Timeline::Home).await.unwrap(),
        ids(&["9", "5", "3", "1"])
    );
    // Only the membership went away.
    assert!(store.status(&Id::from("7")).await.unwrap().is_some());
}

#[tokio::test]
async fn disjoint_newer_page_leaves_a_gap_that_can_be_filled() {
    let store = memory_store();
    store
        .insert_statuses(&Timeline::Home, statuses(1..=50), None)
        .await
        .unwrap();
    store
        .insert_statuses(&Timeline::Home, statuses(101..=150), None)
        .await
        .unwrap();

    let mut sub = store.timeline(&Timeline::Home);
    let items = sub.next().await.unwrap().unwrap();
    let gap = items
        .iter()
        .find_map(|i| match i {
            TimelineItem::LoadMore(lm) => Some(lm.clone()),
            TimelineItem::Status(_) => None,
        })
        .expect("gap marker");
    assert_eq!(gap.after_status_id, Id::from("101"));
    assert_eq!(gap.before_status_id, Id::from("50"));
    // The marker sits right below the status it starts at.
    let at = items
        .iter()
        .position(|i| matches!(i, TimelineItem::LoadMore(_)))
        .unwrap();
    match &items[at - 1] {
        TimelineItem::Status(v) => assert_eq!(v.status.id, Id::from("101")),
        other => panic!("unexpected item above gap: {other:?}"),
    }

    // The page reaches the status above the gap, so nothing is left to load.
    store
        .insert_statuses(
            &Timeline::Home,
            statuses(51..=101),
            Some(GapFill {
                load_more: gap,
                direction: Direction::Up,
            }),
        )
        .await
        .unwrap();
    let items = sub.next().await.unwrap().unwrap();
    assert!(items.iter().all(|i| matches!(i, TimelineItem::Status(_))));
    assert_eq!(status_ids(&items), range_desc(1, 150));
}

#[tokio::test]
async fn partial_fill_keeps_the_rest_of_the_gap() {
    let store = memory_store();
    store
        .insert_statuses(&Timeline::Local, statuses([10, 100]), None)
        .await
        .unwrap();
    let gap = LoadMore {
        timeline_id: Timeline::Local.id(),
        after_status_id: Id::from("100"),
        before_status_id: Id::from("10"),
    };
    store
        .apply(vec![feedcache_core::Mutation::InsertGap(gap.clone())])
        .await
        .unwrap();
    store
        .insert_statuses(
            &Timeline::Local,
            statuses([90, 80]),
            Some(GapFill {
                load_more: gap,
                direction: Direction::Down,
            }),
        )
        .await
        .unwrap();

    let mut sub = store.timeline(&Timeline::Local);
    let items = sub.next().await.unwrap().unwrap();
    let gaps: Vec<LoadMore> = items
        .iter()
        .filter_map(|i| match i {
            TimelineItem::LoadMore(lm) => Some(lm.clone()),
            TimelineItem::Status(_) => None,
        })
        .collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].after_status_id, Id::from("80"));
    assert_eq!(gaps[0].before_status_id, Id::from("10"));
}

#[tokio::test]
async fn deleting_a_status_removes_its_reblogs_everywhere() {
    let store = memory_store();
    let original = status_by("100", "7");
    let boost = reblog("200", "2", original.clone());
    store
        .insert_statuses(&Timeline::Home, vec![boost, status("150")], None)
        .await
        .unwrap();
    store
        .insert_context(original, vec![], vec![status("101")])
        .await
        .unwrap();

    store.delete_status(&Id::from("100")).await.unwrap();

    assert!(store.status(&Id::from("200")).await.unwrap().is_none());
    assert_eq!(
        store.timeline_status_ids(&Timeline::Home).await.unwrap(),
        ids(&["150"])
    );
    let mut ctx = store.context(&Id::from("100"));
    let view = ctx.next().await.unwrap().unwrap();
    assert!(view.parent.is_none());
    // Descendant joins are keyed by the parent id and stay until the next context load.
    assert_eq!(view.descendants.len(), 1);
}

#[tokio::test]
async fn blocking_drops_the_account_and_its_content() {
    let store = memory_store();
    store
        .insert_statuses(
            &Timeline::Home,
            vec![
                status_by("10", "5"),
                status_by("11", "6"),
                reblog("12", "6", status_by("9", "5")),
            ],
            None,
        )
        .await
        .unwrap();
    store.block(&Id::from("5")).await.unwrap();

    assert!(store.account(&Id::from("5")).await.unwrap().is_none());
    assert_eq!(
        store.timeline_status_ids(&Timeline::Home).await.unwrap(),
        ids(&["11"])
    );
}

#[tokio::test]
async fn unfollow_only_touches_home() {
    let store = memory_store();
    let batch = vec![status_by("10", "5"), status_by("11", "6")];
    store
        .insert_statuses(&Timeline::Home, batch.clone(), None)
        .await
        .unwrap();
    store
        .insert_statuses(&Timeline::Federated, batch, None)
        .await
        .unwrap();
    store.unfollow(&Id::from("5")).await.unwrap();

    assert_eq!(
        store.timeline_status_ids(&Timeline::Home).await.unwrap(),
        ids(&["11"])
    );
    assert_eq!(
        store
            .timeline_status_ids(&Timeline::Federated)
            .await
            .unwrap(),
        ids(&["11", "10"])
    );
}

#[tokio::test]
async fn list_sync_drops_lists_gone_from_the_server() {
    let store = memory_store();
    let list = |id: &str, title: &str| List {
        id: Id::from(id),
        title: title.to_string(),
    };
    store
        .set_lists(vec![list("1", "friends"), list("2", "Art")])
        .await
        .unwrap();
    let friends = Timeline::List {
        id: Id::from("1"),
        title: "friends".to_string(),
    };
    store
        .insert_statuses(&friends, statuses([5, 6]), None)
        .await
        .unwrap();

    let mut lists = store.lists();
    let first = lists.next().await.unwrap().unwrap();
    assert_eq!(
        first.iter().map(|l| l.title.as_str()).collect::<Vec<_>>(),
        vec!["Art", "friends"]
    );

    store.set_lists(vec![list("2", "Art")]).await.unwrap();
    let second = lists.next().await.unwrap().unwrap();
    assert_eq!(second.len(), 1);
    assert!(!store.has_timeline(&friends).await.unwrap());
}

#[tokio::test]
async fn ordered_timelines_keep_server_order() {
    let store = memory_store();
    store
        .insert_statuses(&Timeline::Bookmarks, statuses([40, 90, 10]), None)
        .await
        .unwrap();
    store
        .insert_statuses(&Timeline::Bookmarks, statuses([5]), None)
        .await
        .unwrap();
    assert_eq!(
        store
            .timeline_status_ids(&Timeline::Bookmarks)
            .await
            .unwrap(),
        ids(&["40", "90", "10", "5"])
    );
}
