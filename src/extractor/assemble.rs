//! Comment assembly.
//!
//! Builds [`Comment`] records from `commentItem` nodes. Field selectors are
//! resolved relative to the item, never the document.

use sha2::{Digest, Sha256};

use crate::dom::{normalize_text, DomTree};
use crate::patterns::{LIKES_NOISE, LIKES_VALUE, LIKES_WORDS};
use crate::result::Comment;
use crate::selector::{deep, SelectorField, SelectorMap};

/// Hex chars kept from the id digest.
const ID_LEN: usize = 16;

/// Separator between hashed id components.
const ID_SEPARATOR: char = '\u{1f}';

/// Parse a displayed like count.
///
/// Everything except digits, the decimal point and magnitude markers is
/// dropped first, so `"1,234"` reads as 1234. Markers: `k`/`K` ×1e3,
/// `m`/`M` ×1e6, `万` ×1e4, `亿` ×1e8. Unreadable text is 0.
///
/// ```rust
/// use rs_comment_harvest::extractor::assemble::parse_likes;
///
/// assert_eq!(parse_likes("1.2K"), 1200);
/// assert_eq!(parse_likes("2亿"), 200_000_000);
/// assert_eq!(parse_likes("abc"), 0);
/// ```
#[must_use]
pub fn parse_likes(text: &str) -> u64 {
    let words_removed = LIKES_WORDS.replace_all(text, "");
    let cleaned = LIKES_NOISE.replace_all(&words_removed, "");
    let Some(caps) = LIKES_VALUE.captures(&cleaned) else {
        return 0;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return 0;
    };
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        Some("k" | "K") => 1e3,
        Some("m" | "M") => 1e6,
        Some("万") => 1e4,
        Some("亿") => 1e8,
        _ => 1.0,
    };
    let likes = (value * multiplier).round();
    if likes.is_finite() && likes > 0.0 {
        likes as u64
    } else {
        0
    }
}

/// Deterministic comment id.
///
/// Same text at the same position gives the same id across passes; the
/// position keeps identical texts apart. Reply ids also hash the parent id.
#[must_use]
pub fn comment_id(username: &str, content: &str, timestamp: &str, index: usize, parent: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    for part in [username, content, timestamp] {
        hasher.update(part.as_bytes());
        hasher.update(ID_SEPARATOR.to_string().as_bytes());
    }
    hasher.update(index.to_string().as_bytes());
    if let Some(parent) = parent {
        hasher.update(ID_SEPARATOR.to_string().as_bytes());
        hasher.update(parent.as_bytes());
    }
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_LEN);
    id
}

/// Builds comments from one page with one selector map.
pub struct Assembler<'a, D: DomTree> {
    dom: &'a D,
    selectors: &'a SelectorMap,
    anonymous: &'a str,
}

impl<'a, D: DomTree> Assembler<'a, D> {
    #[must_use]
    pub fn new(dom: &'a D, selectors: &'a SelectorMap, anonymous: &'a str) -> Self {
        Self {
            dom,
            selectors,
            anonymous,
        }
    }

    /// Nodes matching `commentContainer`, or the document root when the
    /// field is absent or matches nothing.
    #[must_use]
    pub fn containers(&self) -> Vec<D::Node> {
        let root = self.dom.root();
        let found = self
            .selectors
            .get(SelectorField::CommentContainer)
            .map(|sel| deep::query_all(self.dom, &root, sel))
            .unwrap_or_default();
        if found.is_empty() {
            vec![root]
        } else {
            found
        }
    }

    /// Every comment currently in the document, in tree order.
    ///
    /// The positional index runs across all containers and counts every
    /// item, kept or not, so positions stay stable between passes.
    #[must_use]
    pub fn extract_visible(&self) -> Vec<Comment> {
        let Some(item_sel) = self.selectors.get(SelectorField::CommentItem) else {
            return Vec::new();
        };

        let mut comments = Vec::new();
        let mut seen_items: Vec<D::Node> = Vec::new();
        let mut reply_nodes: Vec<D::Node> = Vec::new();
        let mut index = 0;

        for container in self.containers() {
            for item in deep::query_all(self.dom, &container, item_sel) {
                // Nested containers yield the same items twice; replies may
                // share the item selector.
                if seen_items.contains(&item) || reply_nodes.contains(&item) {
                    continue;
                }
                seen_items.push(item.clone());
                let position = index;
                index += 1;

                let replies_found = self.reply_items(&item);
                let Some(mut comment) = self.build(&item, position, None) else {
                    reply_nodes.extend(replies_found);
                    continue;
                };
                comment.replies = replies_found
                    .iter()
                    .enumerate()
                    .filter_map(|(i, reply)| self.build(reply, i, Some(&comment.id)))
                    .collect();
                reply_nodes.extend(replies_found);
                comments.push(comment);
            }
        }
        comments
    }

    /// Reply items belonging to `item`: `replyItem` inside the item's
    /// `replyContainer`, or inside the item itself when there is none.
    fn reply_items(&self, item: &D::Node) -> Vec<D::Node> {
        let Some(reply_sel) = self.selectors.get(SelectorField::ReplyItem) else {
            return Vec::new();
        };
        let scopes = self
            .selectors
            .get(SelectorField::ReplyContainer)
            .map(|sel| deep::query_all(self.dom, item, sel))
            .filter(|found| !found.is_empty())
            .unwrap_or_else(|| vec![item.clone()]);

        let mut replies: Vec<D::Node> = Vec::new();
        for scope in &scopes {
            for reply in deep::query_all(self.dom, scope, reply_sel) {
                if &reply != item && !replies.contains(&reply) {
                    replies.push(reply);
                }
            }
        }
        replies
    }

    /// One comment from `item`, `None` when its content is empty.
    fn build(&self, item: &D::Node, index: usize, parent: Option<&str>) -> Option<Comment> {
        let content = self.field_text(item, SelectorField::Content);
        if content.is_empty() {
            return None;
        }

        let username = Some(self.field_text(item, SelectorField::Username))
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.anonymous.to_string());
        let timestamp = self.timestamp(item);
        let likes = self
            .field_node(item, SelectorField::Likes)
            .map(|node| {
                let text = normalize_text(&self.dom.text(&node));
                if text.is_empty() {
                    self.dom.attr(&node, "aria-label").unwrap_or_default()
                } else {
                    text
                }
            })
            .map_or(0, |text| parse_likes(&text));
        let avatar = self.field_node(item, SelectorField::Avatar).and_then(|node| {
            self.dom
                .attr(&node, "src")
                .or_else(|| self.dom.attr(&node, "data-src"))
                .filter(|src| !src.trim().is_empty())
        });

        Some(Comment {
            id: comment_id(&username, &content, &timestamp, index, parent),
            username,
            content,
            timestamp,
            likes,
            avatar,
            replies: Vec::new(),
        })
    }

    fn field_node(&self, item: &D::Node, field: SelectorField) -> Option<D::Node> {
        let sel = self.selectors.get(field)?;
        deep::query_first(self.dom, item, sel)
    }

    fn field_text(&self, item: &D::Node, field: SelectorField) -> String {
        self.field_node(item, field)
            .map(|node| normalize_text(&self.dom.text(&node)))
            .unwrap_or_default()
    }

    /// Timestamp text, falling back to `datetime` then `title`.
    fn timestamp(&self, item: &D::Node) -> String {
        let Some(node) = self.field_node(item, SelectorField::Timestamp) else {
            return String::new();
        };
        let text = normalize_text(&self.dom.text(&node));
        if !text.is_empty() {
            return text;
        }
        ["datetime", "title"]
            .iter()
            .find_map(|name| self.dom.attr(&node, name).map(|v| normalize_text(&v)).filter(|v| !v.is_empty()))
            .unwrap_or_default()
    }
}
