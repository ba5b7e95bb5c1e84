/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: Id,
    pub phrase: String,
    #[serde(default)]
    pub context: Vec<FilterContext>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub irreversible: bool,
    #[serde(default)]
    pub whole_word: bool,
    #[serde(default)]
    pub action: FilterAction,
}

impl Filter {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t > now).unwrap_or(true)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterContext {
    Home,
    Notifications,
    Public,
    Thread,
    Account,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    #[default]
    Warn,
    Hide,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn filters_without_expiry_stay_active() {
        let f: Filter = serde_json::from_str(r#"{"id":"1","phrase":"spoiler"}"#).unwrap();
        assert!(f.is_active_at(Utc::now()));
        assert_eq!(f.action, FilterAction::Warn);
    }

    #[test]
    fn expired_filters_are_inactive() {
        let now = Utc::now();
        let f = Filter {
            id: Id::from("2"),
            phrase: "x".to_string(),
            context: vec![FilterContext::Home],
            expires_at: Some(now - Duration::minutes(1)),
            irreversible: false,
            whole_word: true,
            action: FilterAction::Hide,
        };
        assert!(!f.is_active_at(now));
    }
}
