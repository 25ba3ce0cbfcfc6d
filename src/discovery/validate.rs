//! Live validation of selector maps.
//!
//! Every present field is resolved with the deep query engine. A map is
//! valid when all required fields are named and `commentItem`, `username`
//! and `content` each match at least one node. Optional fields with zero
//! matches are legitimate (a page without replies has no reply toggle).

use crate::discovery::prompt::failure_feedback;
use crate::dom::DomTree;
use crate::selector::{deep, SelectorField, SelectorMap};

/// Match count for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub field: SelectorField,
    pub selector: String,
    pub matches: usize,
}

/// Per-field outcome of testing a map against the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub checks: Vec<FieldCheck>,
    /// Required fields the map does not name at all.
    pub missing: Vec<SelectorField>,
}

impl Validation {
    /// Must-match fields that resolved to nothing.
    #[must_use]
    pub fn unmatched(&self) -> Vec<SelectorField> {
        self.checks
            .iter()
            .filter(|c| c.field.must_match() && c.matches == 0)
            .map(|c| c.field)
            .collect()
    }

    /// Fields failing the required-field invariant.
    #[must_use]
    pub fn failed(&self) -> Vec<SelectorField> {
        let mut failed = self.missing.clone();
        failed.extend(self.unmatched());
        failed.sort();
        failed.dedup();
        failed
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.unmatched().is_empty()
    }

    /// Fields that matched at least one node.
    #[must_use]
    pub fn successful(&self) -> SelectorMap {
        let mut map = SelectorMap::default();
        for check in self.checks.iter().filter(|c| c.matches > 0) {
            map.set(check.field, Some(check.selector.clone()));
        }
        map
    }

    /// Corrective feedback for the next attempt, `None` when valid.
    #[must_use]
    pub fn feedback(&self) -> Option<String> {
        failure_feedback(&self.missing, &self.unmatched())
    }
}

/// Test every field of `map` below `root`.
#[must_use]
pub fn validate<D: DomTree>(dom: &D, root: &D::Node, map: &SelectorMap) -> Validation {
    let checks = map
        .present()
        .map(|(field, selector)| FieldCheck {
            field,
            selector: selector.to_string(),
            matches: deep::count(dom, root, selector),
        })
        .collect();
    Validation {
        checks,
        missing: map.missing_required(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ShadowDocument;

    const PAGE: &str = r#"
        <div id="comments">
            <div class="c"><span class="u">ann</span><p class="t">hello</p></div>
        </div>"#;

    fn map(content: &str) -> SelectorMap {
        SelectorMap {
            comment_container: Some("#comments".into()),
            comment_item: Some(".c".into()),
            username: Some(".u".into()),
            content: Some(content.into()),
            reply_toggle: Some(".more-replies".into()),
            ..SelectorMap::default()
        }
    }

    #[test]
    fn test_valid_map_with_unmatched_optional_field() {
        let doc = ShadowDocument::parse(PAGE);
        let result = validate(&doc, &doc.root(), &map(".t"));
        assert!(result.is_valid());
        assert_eq!(result.feedback(), None);
        assert_eq!(result.successful().get(SelectorField::ReplyToggle), None);
        assert_eq!(result.successful().get(SelectorField::Content), Some(".t"));
    }

    #[test]
    fn test_unmatched_content_fails() {
        let doc = ShadowDocument::parse(PAGE);
        let result = validate(&doc, &doc.root(), &map(".nope"));
        assert!(!result.is_valid());
        assert_eq!(result.failed(), vec![SelectorField::Content]);
        assert_eq!(result.feedback().as_deref(), Some("zero matches for: content"));
    }

    #[test]
    fn test_missing_container_fails_even_when_everything_matches() {
        let doc = ShadowDocument::parse(PAGE);
        let mut partial = map(".t");
        partial.comment_container = None;
        let result = validate(&doc, &doc.root(), &partial);
        assert!(!result.is_valid());
        assert_eq!(result.failed(), vec![SelectorField::CommentContainer]);
    }

    #[test]
    fn test_invalid_selector_counts_as_zero() {
        let doc = ShadowDocument::parse(PAGE);
        let result = validate(&doc, &doc.root(), &map("p[["));
        assert_eq!(result.unmatched(), vec![SelectorField::Content]);
    }
}
