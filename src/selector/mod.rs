//! Selector Infrastructure
//!
//! A [`SelectorMap`] describes how to find the parts of a comment on one site
//! layout: one CSS locator per semantic [`SelectorField`]. The maps come from
//! the selector cache or from the AI oracle and are checked against the live
//! document with the deep query engine ([`deep`]) before anything trusts them.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod comments;
pub mod deep;
pub mod utils;

/// Semantic field of a comment layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorField {
    CommentContainer,
    CommentItem,
    Username,
    Content,
    Timestamp,
    Likes,
    ReplyToggle,
    ReplyContainer,
    ReplyItem,
    Avatar,
}

impl SelectorField {
    /// Every field, in prompt/serialization order.
    pub const ALL: [SelectorField; 10] = [
        SelectorField::CommentContainer,
        SelectorField::CommentItem,
        SelectorField::Username,
        SelectorField::Content,
        SelectorField::Timestamp,
        SelectorField::Likes,
        SelectorField::ReplyToggle,
        SelectorField::ReplyContainer,
        SelectorField::ReplyItem,
        SelectorField::Avatar,
    ];

    /// Fields a selector map must name.
    pub const REQUIRED: [SelectorField; 4] = [
        SelectorField::CommentContainer,
        SelectorField::CommentItem,
        SelectorField::Username,
        SelectorField::Content,
    ];

    /// Fields that must resolve to at least one live node for a map to be valid.
    pub const MUST_MATCH: [SelectorField; 3] = [
        SelectorField::CommentItem,
        SelectorField::Username,
        SelectorField::Content,
    ];

    /// The camelCase name used in prompts, JSON and feedback.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SelectorField::CommentContainer => "commentContainer",
            SelectorField::CommentItem => "commentItem",
            SelectorField::Username => "username",
            SelectorField::Content => "content",
            SelectorField::Timestamp => "timestamp",
            SelectorField::Likes => "likes",
            SelectorField::ReplyToggle => "replyToggle",
            SelectorField::ReplyContainer => "replyContainer",
            SelectorField::ReplyItem => "replyItem",
            SelectorField::Avatar => "avatar",
        }
    }

    /// Whether zero live matches disqualifies the whole map.
    #[must_use]
    pub fn must_match(self) -> bool {
        Self::MUST_MATCH.contains(&self)
    }
}

impl fmt::Display for SelectorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field CSS locators for one site layout.
///
/// Blank strings are treated exactly like absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_toggle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl SelectorMap {
    /// The selector for `field`, `None` when absent or blank.
    #[must_use]
    pub fn get(&self, field: SelectorField) -> Option<&str> {
        let slot = match field {
            SelectorField::CommentContainer => &self.comment_container,
            SelectorField::CommentItem => &self.comment_item,
            SelectorField::Username => &self.username,
            SelectorField::Content => &self.content,
            SelectorField::Timestamp => &self.timestamp,
            SelectorField::Likes => &self.likes,
            SelectorField::ReplyToggle => &self.reply_toggle,
            SelectorField::ReplyContainer => &self.reply_container,
            SelectorField::ReplyItem => &self.reply_item,
            SelectorField::Avatar => &self.avatar,
        };
        slot.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Set `field`; a blank value clears it.
    pub fn set(&mut self, field: SelectorField, value: Option<String>) {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let slot = match field {
            SelectorField::CommentContainer => &mut self.comment_container,
            SelectorField::CommentItem => &mut self.comment_item,
            SelectorField::Username => &mut self.username,
            SelectorField::Content => &mut self.content,
            SelectorField::Timestamp => &mut self.timestamp,
            SelectorField::Likes => &mut self.likes,
            SelectorField::ReplyToggle => &mut self.reply_toggle,
            SelectorField::ReplyContainer => &mut self.reply_container,
            SelectorField::ReplyItem => &mut self.reply_item,
            SelectorField::Avatar => &mut self.avatar,
        };
        *slot = value;
    }

    /// Fields that currently carry a selector.
    pub fn present(&self) -> impl Iterator<Item = (SelectorField, &str)> + '_ {
        SelectorField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|sel| (field, sel)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Required fields with no selector at all.
    #[must_use]
    pub fn missing_required(&self) -> Vec<SelectorField> {
        SelectorField::REQUIRED
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    /// Copy of `self` with blank strings cleared and whitespace trimmed.
    #[must_use]
    pub fn normalized(&self) -> SelectorMap {
        let mut out = SelectorMap::default();
        for (field, sel) in self.present() {
            out.set(field, Some(sel.to_string()));
        }
        out
    }

    /// Fill fields that are absent here from `later`.
    ///
    /// A field already present is only replaced when it is listed in
    /// `overwritable`.
    pub fn merge_from(&mut self, later: &SelectorMap, overwritable: &[SelectorField]) {
        for (field, sel) in later.present() {
            if self.get(field).is_none() || overwritable.contains(&field) {
                self.set(field, Some(sel.to_string()));
            }
        }
    }

    /// Force every field of `proven` onto `self`.
    pub fn overlay(&mut self, proven: &SelectorMap) {
        for (field, sel) in proven.present() {
            self.set(field, Some(sel.to_string()));
        }
    }
}
