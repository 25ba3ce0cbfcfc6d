//! Utility functions for selector pattern matching
//!
//! Heuristic rules never talk to a [`DomTree`] directly. They look at an
//! [`ElementFacts`] snapshot of one element (tag, id, class), which keeps
//! each rule a plain `fn` and lets rule tables stay `static`.

use crate::dom::DomTree;

/// A heuristic rule over one element.
pub type Rule = fn(&ElementFacts) -> bool;

/// Attributes of one element that heuristic rules inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementFacts {
    pub tag: String,
    pub id: String,
    pub class: String,
}

impl ElementFacts {
    /// Read the facts for `node`. Missing attributes become empty strings.
    #[must_use]
    pub fn of<D: DomTree>(dom: &D, node: &D::Node) -> Self {
        Self {
            tag: dom.tag_name(node).unwrap_or_default(),
            id: dom.attr(node, "id").unwrap_or_default(),
            class: dom.attr(node, "class").unwrap_or_default(),
        }
    }

    /// Id and class concatenated, for rules that accept either.
    ///
    /// ```rust
    /// use rs_comment_harvest::selector::utils::ElementFacts;
    ///
    /// let facts = ElementFacts {
    ///     id: "main".into(),
    ///     class: "comment-list".into(),
    ///     ..ElementFacts::default()
    /// };
    /// assert!(facts.id_class().contains("comment-list"));
    /// ```
    #[must_use]
    pub fn id_class(&self) -> String {
        format!("{}{}", self.id, self.class)
    }

    #[inline]
    #[must_use]
    pub fn tag_is(&self, tags: &[&str]) -> bool {
        tags.contains(&self.tag.as_str())
    }
}

/// Whether any rule in `rules` accepts `facts`.
#[must_use]
pub fn any_rule(rules: &[Rule], facts: &ElementFacts) -> bool {
    rules.iter().any(|rule| rule(facts))
}

/// Light-tree descendants of `scope` accepted by any of `rules`, in tree order.
#[must_use]
pub fn query_rules<D: DomTree>(dom: &D, scope: &D::Node, rules: &[Rule]) -> Vec<D::Node> {
    dom.descendants(scope)
        .into_iter()
        .filter(|node| any_rule(rules, &ElementFacts::of(dom, node)))
        .collect()
}
