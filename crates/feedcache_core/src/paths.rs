/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::{
    fs,
    path::{Path, PathBuf},
};

const DB_FILE_NAME: &str = "content.sqlite3";

pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(v) = std::env::var("FEEDCACHE_DATA_DIR") {
        return Ok(PathBuf::from(v));
    }
    let proj = ProjectDirs::from("net", "feedcache", "Feedcache")
        .context("unable to determine platform data dir")?;
    Ok(proj.data_local_dir().to_path_buf())
}

/// Directory holding the cache of one logical identity (e.g. `alice@example.social`).
pub fn identity_dir(root: impl AsRef<Path>, identity: &str) -> PathBuf {
    root.as_ref().join(sanitize_identity(identity))
}

/// Creates the identity directory if needed and returns the database file inside it.
pub fn database_path(root: impl AsRef<Path>, identity: &str) -> Result<PathBuf> {
    let dir = identity_dir(root, identity);
    fs::create_dir_all(&dir).with_context(|| format!("create data dir: {}", dir.display()))?;
    Ok(dir.join(DB_FILE_NAME))
}

fn sanitize_identity(identity: &str) -> String {
    let cleaned: String = identity
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}
