//! Prompt construction for the selector oracle.

use std::fmt::Write as _;

use crate::selector::{SelectorField, SelectorMap};

/// Fixed instructions, sent ahead of every chunk.
pub const INSTRUCTIONS: &str = "\
You locate user comments on a web page. Below is a simplified outline of part \
of the page: one element per line as tag#id.class[attributes], indented by \
depth, with short text excerpts in quotes. Lines reading #shadow-root open the \
shadow tree of the element above them; plain descendant selectors reach into it.

Return ONLY a JSON object of this shape:
{\"selectors\": {\"commentContainer\": \"...\", \"commentItem\": \"...\", \"username\": \"...\", \
\"content\": \"...\", \"timestamp\": \"...\", \"likes\": \"...\", \"replyToggle\": \"...\", \
\"replyContainer\": \"...\", \"replyItem\": \"...\", \"avatar\": \"...\"}, \
\"structure\": \"one sentence describing the comment layout\", \"confidence\": 0.0}

Rules:
- Use CSS selectors only. commentContainer, commentItem, username and content are required.
- username, content, timestamp and likes are looked up inside one commentItem.
- replyToggle is the button that reveals hidden replies; replyContainer and \
replyItem locate replies inside a comment. Leave out fields the page does not have.
- confidence is a number between 0 and 1.";

/// Everything that goes into one prompt besides the outline itself.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Fields proven by earlier attempts.
    pub hints: &'a SelectorMap,
    /// Why the previous attempt failed, if it did.
    pub feedback: Option<&'a str>,
    pub chunk_index: usize,
    pub chunk_count: usize,
}

/// Build the prompt for one snapshot chunk.
#[must_use]
pub fn build_prompt(lines: &[String], ctx: PromptContext<'_>) -> String {
    let mut prompt = String::from(INSTRUCTIONS);

    if !ctx.hints.is_empty() {
        prompt.push_str("\n\nThese selectors are already verified on the live page. Keep them unchanged:\n");
        for (field, selector) in ctx.hints.present() {
            let _ = writeln!(prompt, "- {field}: {selector}");
        }
    }

    if let Some(feedback) = ctx.feedback.filter(|f| !f.trim().is_empty()) {
        prompt.push_str("\nThe previous answer failed validation: ");
        prompt.push_str(feedback.trim());
        prompt.push_str("\nPropose different selectors for those fields.\n");
    }

    let _ = write!(
        prompt,
        "\nPage outline (part {} of {}):\n",
        ctx.chunk_index + 1,
        ctx.chunk_count.max(1)
    );
    for line in lines {
        prompt.push_str(line);
        prompt.push('\n');
    }
    prompt
}

/// Feedback naming the fields that failed validation.
#[must_use]
pub fn failure_feedback(missing: &[SelectorField], unmatched: &[SelectorField]) -> Option<String> {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required fields: {}", join(missing)));
    }
    if !unmatched.is_empty() {
        parts.push(format!("zero matches for: {}", join(unmatched)));
    }
    (!parts.is_empty()).then(|| parts.join("; "))
}

fn join(fields: &[SelectorField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_hints_feedback_and_outline() {
        let hints = SelectorMap {
            username: Some(".author".into()),
            ..SelectorMap::default()
        };
        let lines = vec!["div.list".to_string(), "  p.text".to_string()];
        let prompt = build_prompt(
            &lines,
            PromptContext {
                hints: &hints,
                feedback: Some("zero matches for: content"),
                chunk_index: 1,
                chunk_count: 2,
            },
        );
        assert!(prompt.contains("- username: .author"));
        assert!(prompt.contains("failed validation: zero matches for: content"));
        assert!(prompt.contains("(part 2 of 2)"));
        assert!(prompt.ends_with("div.list\n  p.text\n"));
    }

    #[test]
    fn test_first_attempt_has_no_hints_or_feedback() {
        let prompt = build_prompt(
            &[],
            PromptContext {
                hints: &SelectorMap::default(),
                feedback: None,
                chunk_index: 0,
                chunk_count: 1,
            },
        );
        assert!(!prompt.contains("already verified"));
        assert!(!prompt.contains("failed validation"));
    }

    #[test]
    fn test_failure_feedback() {
        assert_eq!(failure_feedback(&[], &[]), None);
        assert_eq!(
            failure_feedback(&[SelectorField::CommentContainer], &[SelectorField::Content]).as_deref(),
            Some("missing required fields: commentContainer; zero matches for: content")
        );
    }
}
