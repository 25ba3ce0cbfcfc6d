//! Comment Section Selectors
//!
//! Heuristic rules for locating the comment-bearing part of an unknown page
//! before any selector map exists, and for recognising comment debris (reply
//! forms, sign-in prompts) that is noise to the selector oracle.

use crate::dom::DomTree;
use crate::patterns::{COMMENT_CLASS, COMMENT_ID};
use crate::selector::utils::{any_rule, query_rules, ElementFacts, Rule};

const SECTION_TAGS: &[&str] = &["div", "ol", "ul", "dl", "section", "aside"];

// ============================================================
// COMMENT FINDING RULES
// ============================================================

/// Comment section rules, strongest signal first.
pub static COMMENTS: &[Rule] = &[
    comments_rule_1,
    comments_rule_2,
    comments_rule_3,
    comments_rule_4,
];

/// Rule 1: comment list containers
///
/// Patterns: commentlist, comment-page, comment-list, comments-content, post-comments
#[must_use]
pub fn comments_rule_1(facts: &ElementFacts) -> bool {
    if !facts.tag_is(SECTION_TAGS) {
        return false;
    }
    let id_class = facts.id_class();
    id_class.contains("commentlist")
        || facts.class.contains("comment-page")
        || id_class.contains("comment-list")
        || facts.class.contains("comments-content")
        || facts.class.contains("post-comments")
}

/// Rule 2: comment section containers
///
/// Patterns: comments*, Comments*, comment-*, article-comments
#[must_use]
pub fn comments_rule_2(facts: &ElementFacts) -> bool {
    if !facts.tag_is(SECTION_TAGS) {
        return false;
    }
    let id_class = facts.id_class();
    id_class.starts_with("comments")
        || facts.class.starts_with("Comments")
        || id_class.starts_with("comment-")
        || facts.class.contains("article-comments")
}

/// Rule 3: third-party comment systems, matched on id
#[must_use]
pub fn comments_rule_3(facts: &ElementFacts) -> bool {
    if !facts.tag_is(SECTION_TAGS) {
        return false;
    }
    facts.id.starts_with("comol")
        || facts.id.starts_with("disqus_thread")
        || facts.id.starts_with("dsq_comments")
        || COMMENT_ID.is_match(&facts.id)
}

/// Rule 4: generic comment markers, any tag
#[must_use]
pub fn comments_rule_4(facts: &ElementFacts) -> bool {
    COMMENT_CLASS.is_match(&facts.class) || facts.tag == "ytd-comments"
}

// ============================================================
// COMMENT DEBRIS RULES
// ============================================================

/// Parts of a comment section that never hold comments.
pub static DISCARDED_COMMENTS: &[Rule] = &[discarded_comments_rule_1, discarded_comments_rule_2];

/// Rule 1: respond/reply forms
#[must_use]
pub fn discarded_comments_rule_1(facts: &ElementFacts) -> bool {
    facts.tag_is(&["div", "section", "form"]) && facts.id.starts_with("respond")
}

/// Rule 2: comment UI chrome
///
/// Patterns: nocomments, signin, akismet
#[must_use]
pub fn discarded_comments_rule_2(facts: &ElementFacts) -> bool {
    facts.class.contains("nocomments")
        || facts.class.contains("signin")
        || facts.id_class().contains("akismet")
}

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// Light-tree comment sections below `root`, outermost first.
///
/// Sections nested inside an earlier hit are dropped so the caller gets
/// whole sections rather than their sub-lists.
#[must_use]
pub fn find_comment_sections<D: DomTree>(dom: &D, root: &D::Node) -> Vec<D::Node> {
    for rules in [&COMMENTS[..3], &COMMENTS[3..]] {
        let hits = query_rules(dom, root, rules);
        if hits.is_empty() {
            continue;
        }
        let mut outermost: Vec<D::Node> = Vec::new();
        for hit in hits {
            let nested = outermost
                .iter()
                .any(|outer| dom.descendants(outer).contains(&hit));
            if !nested {
                outermost.push(hit);
            }
        }
        return outermost;
    }
    Vec::new()
}

#[must_use]
pub fn is_comment_debris(facts: &ElementFacts) -> bool {
    any_rule(DISCARDED_COMMENTS, facts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(tag: &str, id: &str, class: &str) -> ElementFacts {
        ElementFacts {
            tag: tag.into(),
            id: id.into(),
            class: class.into(),
        }
    }

    #[test]
    fn test_comments_rule_1_commentlist() {
        assert!(comments_rule_1(&facts("div", "commentlist", "")));
        assert!(comments_rule_1(&facts("ul", "", "comment-list")));
        assert!(comments_rule_1(&facts("section", "", "post-comments")));
    }

    #[test]
    fn test_comments_rule_1_wrong_tag() {
        assert!(!comments_rule_1(&facts("article", "commentlist", "")));
    }

    #[test]
    fn test_comments_rule_2_prefixes() {
        assert!(comments_rule_2(&facts("div", "comments-section", "")));
        assert!(comments_rule_2(&facts("section", "", "Comments")));
        assert!(comments_rule_2(&facts("div", "", "comment-area")));
        assert!(!comments_rule_2(&facts("article", "comments", "")));
    }

    #[test]
    fn test_comments_rule_3_third_party() {
        assert!(comments_rule_3(&facts("div", "disqus_thread", "")));
        assert!(comments_rule_3(&facts("section", "dsq_comments", "")));
        assert!(comments_rule_3(&facts("div", "comol-comments", "")));
        assert!(!comments_rule_3(&facts("article", "disqus_thread", "")));
    }

    #[test]
    fn test_comments_rule_4_generic_marker() {
        assert!(comments_rule_4(&facts("article", "", "user comment")));
        assert!(comments_rule_4(&facts("ytd-comments", "", "")));
        assert!(!comments_rule_4(&facts("div", "", "commentary")));
    }

    #[test]
    fn test_debris() {
        assert!(is_comment_debris(&facts("div", "respond", "")));
        assert!(is_comment_debris(&facts("p", "", "signin-prompt")));
        assert!(!is_comment_debris(&facts("div", "", "comment")));
    }

    #[test]
    fn test_find_comment_sections_prefers_outermost() {
        use crate::dom::ShadowDocument;

        let doc = ShadowDocument::parse(
            r#"
            <article>content</article>
            <div id="comments"><ol class="comment-list"><li>a</li></ol></div>
            <div id="disqus_thread">disqus</div>
        "#,
        );
        let found = find_comment_sections(&doc, &doc.root());
        let ids: Vec<Option<String>> = found.iter().map(|n| doc.attr(n, "id")).collect();
        assert_eq!(ids, vec![Some("comments".to_string()), Some("disqus_thread".to_string())]);
    }

    #[test]
    fn test_find_comment_sections_empty() {
        use crate::dom::ShadowDocument;

        let doc = ShadowDocument::parse("<article><p>text</p></article>");
        assert!(find_comment_sections(&doc, &doc.root()).is_empty());
    }
}
