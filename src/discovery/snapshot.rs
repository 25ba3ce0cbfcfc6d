//! DOM snapshot serialization.
//!
//! The oracle never sees HTML. It sees one line per element, indented by
//! depth, carrying only what a selector could be written against:
//!
//! ```text
//! div#comments.thread
//!   ul.list[role=list]
//!     li.item[data-id="42"]
//!       span.author  "ann"
//!   x-comments
//!     #shadow-root
//!       div.body  "first!"
//! ```

use crate::discovery::chunk::truncate_to_char_boundary;
use crate::dom::{normalize_text, DomTree};
use crate::selector::comments::{find_comment_sections, is_comment_debris};
use crate::selector::deep;
use crate::selector::utils::ElementFacts;
use crate::selector::{SelectorField, SelectorMap};

/// Longest line emitted, in bytes.
pub const MAX_LINE_BYTES: usize = 200;

/// Longest leaf text excerpt, in chars.
const MAX_TEXT_CHARS: usize = 60;

const MAX_CLASSES: usize = 4;
const MAX_DATA_ATTRS: usize = 3;

/// Marker line for an open shadow root.
pub const SHADOW_MARKER: &str = "#shadow-root";

/// Tags that never help locate comments.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "path", "link", "meta", "head", "iframe",
];

/// Subtree to serialize for the oracle.
///
/// A proven `commentContainer` wins, then the first heuristic comment
/// section, then the whole document.
#[must_use]
pub fn snapshot_root<D: DomTree>(dom: &D, proven: &SelectorMap) -> D::Node {
    let root = dom.root();
    if let Some(container) = proven
        .get(SelectorField::CommentContainer)
        .and_then(|sel| deep::query_first(dom, &root, sel))
    {
        return container;
    }
    find_comment_sections(dom, &root)
        .into_iter()
        .next()
        .unwrap_or(root)
}

/// Serialize the subtree under `root` to snapshot lines, at most `max_depth`
/// element levels deep.
#[must_use]
pub fn serialize<D: DomTree>(dom: &D, root: &D::Node, max_depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if dom.tag_name(root).is_some() {
        write_element(dom, root, 0, max_depth, &mut lines);
    } else {
        write_children(dom, root, 0, max_depth, &mut lines);
    }
    lines
}

fn write_children<D: DomTree>(dom: &D, parent: &D::Node, depth: usize, max_depth: usize, lines: &mut Vec<String>) {
    for child in dom.children(parent) {
        write_element(dom, &child, depth, max_depth, lines);
    }
}

fn write_element<D: DomTree>(dom: &D, node: &D::Node, depth: usize, max_depth: usize, lines: &mut Vec<String>) {
    if depth >= max_depth {
        return;
    }
    let facts = ElementFacts::of(dom, node);
    if facts.tag.is_empty() || SKIPPED_TAGS.contains(&facts.tag.as_str()) || is_comment_debris(&facts) {
        return;
    }

    // html/body wrappers add depth without information. Shadow roots are
    // held as a body wrapper too.
    if matches!(facts.tag.as_str(), "html" | "body") {
        write_children(dom, node, depth, max_depth, lines);
        return;
    }

    let children = dom.children(node);
    let shadow = dom.shadow_root(node);
    let mut line = format!("{}{}", indent(depth), describe(dom, node, &facts));
    if children.is_empty() && shadow.is_none() {
        let text = normalize_text(&dom.text(node));
        if !text.is_empty() {
            let excerpt: String = text.chars().take(MAX_TEXT_CHARS).collect();
            line.push_str(&format!("  {excerpt:?}"));
        }
    }
    lines.push(truncate_to_char_boundary(&line, MAX_LINE_BYTES).to_string());

    if let Some(shadow) = shadow {
        if depth + 1 < max_depth {
            lines.push(format!("{}{SHADOW_MARKER}", indent(depth + 1)));
            write_children(dom, &shadow, depth + 2, max_depth, lines);
        }
    }
    for child in &children {
        write_element(dom, child, depth + 1, max_depth, lines);
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// `tag#id.class[role=..][aria-label=".."][data-x=".."]`
fn describe<D: DomTree>(dom: &D, node: &D::Node, facts: &ElementFacts) -> String {
    let mut out = facts.tag.clone();
    if !facts.id.trim().is_empty() {
        out.push('#');
        out.push_str(facts.id.trim());
    }
    for class in facts.class.split_whitespace().take(MAX_CLASSES) {
        out.push('.');
        out.push_str(class);
    }
    if let Some(role) = dom.attr(node, "role").filter(|r| !r.trim().is_empty()) {
        out.push_str(&format!("[role={}]", role.trim()));
    }
    if let Some(label) = dom.attr(node, "aria-label").filter(|l| !l.trim().is_empty()) {
        let label: String = label.trim().chars().take(MAX_TEXT_CHARS).collect();
        out.push_str(&format!("[aria-label={label:?}]"));
    }
    let key_attr = match facts.tag.as_str() {
        "time" => Some("datetime"),
        "img" => Some("src"),
        _ => None,
    };
    if let Some(name) = key_attr {
        if let Some(value) = dom.attr(node, name) {
            let value: String = value.chars().take(MAX_TEXT_CHARS).collect();
            out.push_str(&format!("[{name}={value:?}]"));
        }
    }
    for (name, value) in data_attrs(dom, node).into_iter().take(MAX_DATA_ATTRS) {
        let value: String = value.chars().take(MAX_TEXT_CHARS).collect();
        out.push_str(&format!("[{name}={value:?}]"));
    }
    out
}

/// Well-known `data-*` attributes used by comment widgets.
fn data_attrs<D: DomTree>(dom: &D, node: &D::Node) -> Vec<(&'static str, String)> {
    const NAMES: &[&str] = &[
        "data-testid",
        "data-id",
        "data-comment-id",
        "data-role",
        "data-type",
        "data-e2e",
        "data-author",
    ];
    NAMES
        .iter()
        .filter_map(|name| dom.attr(node, name).map(|v| (*name, v)))
        .collect()
}
