/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! On-disk stores with sealed payloads.

mod common;

use common::*;
use feedcache_core::entities::Id;
use feedcache_core::{CacheConfig, CacheError, ContentStore, NoKey, StaticKey, Timeline};
use std::path::Path;
use tempfile::TempDir;

const IDENTITY: &str = "alice@example.social";
const MARKER: &str = "zebra-crossing-7731";

fn config(dir: &TempDir) -> CacheConfig {
    CacheConfig {
        data_dir: Some(dir.path().to_string_lossy().into_owned()),
        in_memory: Some(false),
        encrypt_payloads: Some(true),
        ..CacheConfig::default()
    }
}

fn any_file_contains(dir: &Path, needle: &[u8]) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        if path.is_dir() {
            any_file_contains(&path, needle)
        } else {
            std::fs::read(&path)
                .map(|bytes| bytes.windows(needle.len()).any(|w| w == needle))
                .unwrap_or(false)
        }
    })
}

#[tokio::test]
async fn sealed_payloads_survive_a_reopen() {
    let dir = TempDir::new().unwrap();
    let key = StaticKey([7u8; 32]);
    let mut s = status("42");
    s.body.content = format!("<p>{MARKER}</p>");

    {
        let store = ContentStore::open(config(&dir), IDENTITY, &key).unwrap();
        store
            .insert_statuses(&Timeline::Home, vec![s.clone()], None)
            .await
            .unwrap();
        assert!(!any_file_contains(dir.path(), MARKER.as_bytes()));
    }

    let store = ContentStore::open(config(&dir), IDENTITY, &key).unwrap();
    assert_eq!(store.status(&Id::from("42")).await.unwrap(), Some(s));
    assert_eq!(
        store.timeline_status_ids(&Timeline::Home).await.unwrap(),
        ids(&["42"])
    );
}

#[tokio::test]
async fn opening_without_a_key_fails() {
    let dir = TempDir::new().unwrap();
    match ContentStore::open(config(&dir), IDENTITY, &NoKey) {
        Err(CacheError::KeyUnavailable(_)) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("store opened without a key"),
    }
}

#[tokio::test]
async fn a_different_key_cannot_read_payloads() {
    let dir = TempDir::new().unwrap();
    {
        let store = ContentStore::open(config(&dir), IDENTITY, &StaticKey([1u8; 32])).unwrap();
        store
            .insert_statuses(&Timeline::Home, statuses([1]), None)
            .await
            .unwrap();
    }

    let store = ContentStore::open(config(&dir), IDENTITY, &StaticKey([2u8; 32])).unwrap();
    match store.status(&Id::from("1")).await {
        Err(CacheError::Crypto(_)) => {}
        other => panic!("expected a crypto error, got {other:?}"),
    }
}

#[tokio::test]
async fn identities_do_not_share_a_cache() {
    let dir = TempDir::new().unwrap();
    let key = StaticKey([3u8; 32]);
    let alice = ContentStore::open(config(&dir), IDENTITY, &key).unwrap();
    let bob = ContentStore::open(config(&dir), "bob@example.social", &key).unwrap();
    alice
        .insert_statuses(&Timeline::Home, statuses([1]), None)
        .await
        .unwrap();
    assert!(bob
        .timeline_status_ids(&Timeline::Home)
        .await
        .unwrap()
        .is_empty());
}
