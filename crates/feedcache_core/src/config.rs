/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Number of home statuses kept below the last-read position by a position-preserving clean.
pub const DEFAULT_RETENTION_AFTER_LAST_READ: u32 = 40;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CacheConfig {
    /// Root directory; each identity gets its own sub-directory below it.
    pub data_dir: Option<String>,
    /// Keep everything in memory (tests, previews, logged-out browsing).
    pub in_memory: Option<bool>,
    /// Seal entity payloads with the key handed out by the `KeySource`.
    pub encrypt_payloads: Option<bool>,

    /// When true the home clean keeps a window around the last-read status instead of wiping.
    pub use_last_read_position: Option<bool>,
    pub home_retention_after_last_read: Option<u32>,

    pub change_channel_capacity: Option<usize>,
    pub busy_timeout_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            in_memory: Some(false),
            encrypt_payloads: Some(false),
            use_last_read_position: Some(true),
            home_retention_after_last_read: Some(DEFAULT_RETENTION_AFTER_LAST_READ),
            change_channel_capacity: Some(512),
            busy_timeout_ms: Some(5_000),
        }
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self {
            in_memory: Some(true),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse cache config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read cache config: {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn is_in_memory(&self) -> bool {
        self.in_memory.unwrap_or(false)
    }

    pub fn encrypts_payloads(&self) -> bool {
        self.encrypt_payloads.unwrap_or(false)
    }

    pub fn uses_last_read_position(&self) -> bool {
        self.use_last_read_position.unwrap_or(true)
    }

    pub fn retention_after_last_read(&self) -> usize {
        self.home_retention_after_last_read
            .unwrap_or(DEFAULT_RETENTION_AFTER_LAST_READ)
            .max(1) as usize
    }

    pub fn channel_capacity(&self) -> usize {
        self.change_channel_capacity.unwrap_or(512).clamp(16, 65_536)
    }

    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.busy_timeout_ms.unwrap_or(5_000))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match self.data_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => crate::paths::default_data_dir(),
        }
    }
}
