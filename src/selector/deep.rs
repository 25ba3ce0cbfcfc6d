//! Deep Query Engine
//!
//! Evaluates a CSS selector against a root that may contain nested shadow
//! trees, returning matches at any depth of shadow encapsulation.
//!
//! For each root the engine:
//! 1. runs the selector directly against the light tree;
//! 2. recurses into the root's own shadow root, if it hosts one;
//! 3. splits the selector at its first top-level descendant/child combinator
//!    into `(current, rest)`, finds `current` deeply, and evaluates `rest`
//!    below each candidate, in its light tree and in its shadow root;
//! 4. walks every light descendant that hosts a shadow root and repeats the
//!    whole selector inside it.
//!
//! Results are deduplicated by node identity. A selector the backend refuses
//! to parse yields zero matches.

use std::time::Duration;

use tracing::debug;

use crate::dom::DomTree;

/// Bound on nested recursion (shadow levels plus combinator splits).
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
}

/// Split `selector` at its first top-level descendant or child combinator.
///
/// Brackets, parentheses, quotes and escapes are respected, so
/// `[title="a b"]` and `:not(.x .y)` are never split internally. Sibling
/// combinators (`+`, `~`) stay inside their compound.
///
/// ```rust
/// use rs_comment_harvest::selector::deep::{split_first_combinator, Combinator};
///
/// assert_eq!(
///     split_first_combinator(r#"div[title="a b"] > span"#),
///     Some((r#"div[title="a b"]"#, Combinator::Child, "span"))
/// );
/// assert_eq!(split_first_combinator(".single"), None);
/// ```
#[must_use]
pub fn split_first_combinator(selector: &str) -> Option<(&str, Combinator, &str)> {
    let selector = selector.trim();
    let bytes = selector.as_bytes();
    let mut brackets = 0usize;
    let mut parens = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' | b'\'' => quote = Some(b),
            b'[' => brackets += 1,
            b']' => brackets = brackets.saturating_sub(1),
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            _ if brackets == 0 && parens == 0 && is_combinator_byte(b) => {
                let start = i;
                let mut end = i;
                while end < bytes.len() && is_combinator_byte(bytes[end]) {
                    end += 1;
                }
                let region = &selector[start..end];
                if region.contains(['+', '~']) {
                    i = end;
                    continue;
                }
                let current = selector[..start].trim();
                let rest = selector[end..].trim();
                if current.is_empty() || rest.is_empty() {
                    return None;
                }
                let combinator = if region.contains('>') {
                    Combinator::Child
                } else {
                    Combinator::Descendant
                };
                return Some((current, combinator, rest));
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_combinator_byte(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'>' | b'+' | b'~')
}

/// Split a selector list at its top-level commas.
#[must_use]
pub fn split_selector_list(selector: &str) -> Vec<&str> {
    let bytes = selector.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match (quote, b) {
            (_, b'\\') => {
                i += 2;
                continue;
            }
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'[' | b'(') => depth += 1,
            (None, b']' | b')') => depth = depth.saturating_sub(1),
            (None, b',') if depth == 0 => {
                parts.push(selector[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(selector[start.min(selector.len())..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// All nodes below `root` matching `selector`, including shadow-enclosed ones.
#[must_use]
pub fn query_all<D: DomTree>(dom: &D, root: &D::Node, selector: &str) -> Vec<D::Node> {
    query_limited(dom, root, selector, usize::MAX)
}

/// First node below `root` matching `selector`, preferring light-tree order.
#[must_use]
pub fn query_first<D: DomTree>(dom: &D, root: &D::Node, selector: &str) -> Option<D::Node> {
    query_limited(dom, root, selector, 1).into_iter().next()
}

/// Number of deep matches for `selector` below `root`.
#[must_use]
pub fn count<D: DomTree>(dom: &D, root: &D::Node, selector: &str) -> usize {
    query_all(dom, root, selector).len()
}

fn query_limited<D: DomTree>(dom: &D, root: &D::Node, selector: &str, limit: usize) -> Vec<D::Node> {
    let mut out = Vec::new();
    for part in split_selector_list(selector) {
        let mut query = Query { dom, limit };
        query.collect(root, part, &mut out, 0);
        if out.len() >= limit {
            break;
        }
    }
    out
}

struct Query<'d, D: DomTree> {
    dom: &'d D,
    limit: usize,
}

impl<D: DomTree> Query<'_, D> {
    fn full(&self, out: &[D::Node]) -> bool {
        out.len() >= self.limit
    }

    fn push(&self, out: &mut Vec<D::Node>, node: D::Node) {
        if !self.full(out) && !out.contains(&node) {
            out.push(node);
        }
    }

    fn collect(&mut self, root: &D::Node, selector: &str, out: &mut Vec<D::Node>, depth: usize) {
        if depth > MAX_DEPTH || self.full(out) {
            return;
        }

        match self.dom.select_light(root, selector) {
            Ok(nodes) => {
                for node in nodes {
                    self.push(out, node);
                }
            }
            Err(err) => {
                debug!(%err, "deep query: selector rejected, treating as no match");
                return;
            }
        }

        if let Some(shadow) = self.dom.shadow_root(root) {
            self.collect(&shadow, selector, out, depth + 1);
        }

        if let Some((current, combinator, rest)) = split_first_combinator(selector) {
            let mut candidates = Vec::new();
            let mut inner = Query {
                dom: self.dom,
                limit: usize::MAX,
            };
            inner.collect(root, current, &mut candidates, depth + 1);
            for candidate in &candidates {
                if self.full(out) {
                    return;
                }
                match combinator {
                    Combinator::Descendant => self.collect(candidate, rest, out, depth + 1),
                    Combinator::Child => self.collect_children(candidate, rest, out, depth + 1),
                }
            }
        }

        for node in self.dom.descendants(root) {
            if self.full(out) {
                return;
            }
            if let Some(shadow) = self.dom.shadow_root(&node) {
                self.collect(&shadow, selector, out, depth + 1);
            }
        }
    }

    /// Evaluate `rest` against the direct children of `parent`, both light
    /// children and the top level of its shadow root.
    fn collect_children(&mut self, parent: &D::Node, rest: &str, out: &mut Vec<D::Node>, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }

        let (head, tail) = match split_first_combinator(rest) {
            Some((head, combinator, tail)) => (head, Some((combinator, tail))),
            None => (rest, None),
        };

        let mut children = self.dom.children(parent);
        if let Some(shadow) = self.dom.shadow_root(parent) {
            children.extend(self.dom.children(&shadow));
        }

        for child in children {
            if self.full(out) {
                return;
            }
            if !self.dom.matches(&child, head) {
                continue;
            }
            match tail {
                None => self.push(out, child),
                Some((Combinator::Descendant, tail)) => self.collect(&child, tail, out, depth + 1),
                Some((Combinator::Child, tail)) => self.collect_children(&child, tail, out, depth + 1),
            }
        }
    }
}

/// Poll for `selector` until it appears or `timeout` elapses.
///
/// Not finding the element is a normal outcome, never an error.
pub async fn wait_for_element<D: DomTree>(
    dom: &D,
    root: &D::Node,
    selector: &str,
    timeout: Duration,
    interval: Duration,
) -> Option<D::Node> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(node) = query_first(dom, root, selector) {
            return Some(node);
        }
        if tokio::time::Instant::now() >= deadline {
            debug!(selector, timeout_ms = timeout.as_millis(), "deep query: element never appeared");
            return None;
        }
        tokio::time::sleep(interval).await;
    }
}
