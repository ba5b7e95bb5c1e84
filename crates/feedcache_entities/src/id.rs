/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Opaque server identifier for statuses, accounts, notifications and the like.
///
/// Servers hand out monotonically increasing ids encoded as strings. Ordering compares
/// length first and bytes second, so numeric ids of different widths ("99" < "100")
/// sort the same way the server assigned them, while equal-width ids keep plain
/// lexicographic order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wider_ids_sort_after_narrower_ones() {
        assert!(Id::from("99") < Id::from("100"));
        assert!(Id::from("109876543210") > Id::from("9"));
    }

    #[test]
    fn equal_width_ids_sort_lexicographically() {
        let mut ids: Vec<Id> = ["105", "101", "110"].into_iter().map(Id::from).collect();
        ids.sort();
        assert_eq!(
            ids.iter().map(Id::as_str).collect::<Vec<_>>(),
            vec!["101", "105", "110"]
        );
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = Id::from("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
        let back: Id = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back, id);
    }
}
