/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Inspect an on-disk content cache.
//!
//! ```text
//! feedcache_inspect <identity> timelines
//! feedcache_inspect <identity> timeline <home|local|federated|favorites|bookmarks|tag:NAME|list:ID>
//! feedcache_inspect <identity> lookup <url>
//! feedcache_inspect <identity> clean
//! ```
//!
//! `FEEDCACHE_CONFIG` points at a JSON config; without it the defaults apply.

use anyhow::{bail, Context, Result};
use feedcache_core::{CacheConfig, ContentStore, NoKey, StaticKey, Timeline, UrlLookup};
use feedcache_core::entities::Id;
use tracing::info;

fn parse_timeline(raw: &str) -> Result<Timeline> {
    Ok(match raw {
        "home" => Timeline::Home,
        "local" => Timeline::Local,
        "federated" => Timeline::Federated,
        "favorites" => Timeline::Favorites,
        "bookmarks" => Timeline::Bookmarks,
        _ => match raw.split_once(':') {
            Some(("tag", name)) if !name.is_empty() => Timeline::Tag(name.to_string()),
            Some(("list", id)) if !id.is_empty() => Timeline::List {
                id: Id::from(id),
                title: String::new(),
            },
            _ => bail!("unknown timeline: {raw}"),
        },
    })
}

fn key_from_env() -> Result<Option<StaticKey>> {
    let Ok(raw) = std::env::var("FEEDCACHE_KEY_HEX") else {
        return Ok(None);
    };
    let bytes = hex::decode(raw.trim()).context("FEEDCACHE_KEY_HEX is not hex")?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("FEEDCACHE_KEY_HEX must be 32 bytes"))?;
    Ok(Some(StaticKey(key)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (identity, command) = match args.as_slice() {
        [identity, command, ..] => (identity.as_str(), command.as_str()),
        _ => bail!("usage: feedcache_inspect <identity> <timelines|timeline|lookup|clean> [arg]"),
    };
    let arg = args.get(2).map(String::as_str);

    let config = match std::env::var("FEEDCACHE_CONFIG") {
        Ok(path) => CacheConfig::load(&path)?,
        Err(_) => CacheConfig::default(),
    };
    let store = match key_from_env()? {
        Some(key) => ContentStore::open(config, identity, &key)?,
        None => ContentStore::open(config, identity, &NoKey)?,
    };

    match (command, arg) {
        ("timelines", _) => {
            for timeline in store.timelines().await? {
                let ids = store.timeline_status_ids(&timeline).await?;
                println!("{}\t{} statuses", timeline.id(), ids.len());
            }
        }
        ("timeline", Some(raw)) => {
            let timeline = parse_timeline(raw)?;
            let last_read = store.last_read(&timeline).await?;
            for id in store.timeline_status_ids(&timeline).await? {
                let marker = if last_read.as_ref() == Some(&id) { " <- last read" } else { "" };
                match store.status(&id).await? {
                    Some(status) => println!(
                        "{id}\t@{}\t{}{marker}",
                        status.account.profile.acct,
                        status.body.url.as_deref().unwrap_or(&status.body.uri)
                    ),
                    None => println!("{id}\t<missing>{marker}"),
                }
            }
        }
        ("lookup", Some(url)) => match store.lookup_by_url(url).await? {
            Some(UrlLookup::Account(id)) => println!("account {id}"),
            Some(UrlLookup::Status(id)) => println!("status {id}"),
            None => println!("not cached"),
        },
        ("clean", _) => {
            store.clean_home_timeline().await?;
            info!("clean finished");
        }
        (other, _) => bail!("unknown command or missing argument: {other}"),
    }
    Ok(())
}
