/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

mod account;
mod filter;
mod id;
mod instance;
mod notification;
mod status;

pub use account::{Account, AccountProfile, Relationship};
pub use filter::{Filter, FilterAction, FilterContext};
pub use id::Id;
pub use instance::{
    Announcement, AnnouncementReaction, Emoji, Instance, List, Rule, SearchResults, Tag,
};
pub use notification::{Conversation, Notification, NotificationKind};
pub use status::{Attachment, Poll, PollOption, Status, StatusBody, Visibility};

#[cfg(test)]
mod tests {
    use super::*;

    const REBLOG_JSON: &str = r#"{
      "id": "110",
      "uri": "https://a.example/users/bob/statuses/110/activity",
      "created_at": "2024-03-01T10:00:00Z",
      "account": {"id": "2", "username": "bob", "acct": "bob", "url": "https://a.example/@bob"},
      "content": "",
      "reblog": {
        "id": "100",
        "uri": "https://b.example/users/ann/statuses/100",
        "url": "https://b.example/@ann/100",
        "created_at": "2024-03-01T09:00:00Z",
        "account": {
          "id": "1", "username": "ann", "acct": "ann@b.example", "url": "https://b.example/@ann",
          "moved": {"id": "3", "username": "ann2", "acct": "ann2@c.example", "url": "https://c.example/@ann2"}
        },
        "content": "<p>hello</p>",
        "visibility": "unlisted",
        "poll": {"id": "7", "options": [{"title": "yes", "votes_count": 2}]}
      }
    }"#;

    #[test]
    fn decodes_nested_reblog_and_moved_account() {
        let status: Status = serde_json::from_str(REBLOG_JSON).unwrap();
        let original = status.displayed();
        assert_eq!(original.id, Id::from("100"));
        assert_eq!(original.body.visibility, Visibility::Unlisted);
        assert_eq!(
            original.account.moved.as_ref().map(|a| a.id.clone()),
            Some(Id::from("3"))
        );
        assert_eq!(original.body.poll.as_ref().map(|p| p.options.len()), Some(1));
        assert!(status.quote.is_none());
    }

    #[test]
    fn unknown_notification_kinds_decode() {
        let n: Notification = serde_json::from_str(
            r#"{"id":"9","type":"severed_relationships","created_at":"2024-01-01T00:00:00Z",
                "account":{"id":"1","username":"a","acct":"a","url":"https://x/@a"}}"#,
        )
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Unknown);
        assert_eq!(NotificationKind::AdminSignUp.as_str(), "admin.sign_up");
    }
}
