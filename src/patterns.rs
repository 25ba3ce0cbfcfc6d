//! Compiled regex patterns for comment extraction.
//!
//! All patterns are compiled once at startup using `LazyLock` for efficiency.
//! Patterns are organized by their purpose in the extraction pipeline.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Visibility Patterns
// =============================================================================

/// Matches inline styles that take an element out of the rendered page.
pub static HIDDEN_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("HIDDEN_STYLE regex")
});

// =============================================================================
// Comment Section Patterns
// =============================================================================

/// Matches class names of comment sections.
pub static COMMENT_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(comment|comments|comment[-_]?list|discussion|disqus|fb[-_]?comments)\b")
        .expect("COMMENT_CLASS regex")
});

/// Matches well-known ids of comment sections.
pub static COMMENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(comments|comment-section|disqus_thread|discussion)$")
        .expect("COMMENT_ID regex")
});

// =============================================================================
// Likes Parsing Patterns
// =============================================================================

/// Latin words ("likes", "Like") whose letters would read as unit markers.
pub static LIKES_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z]{2,}").expect("LIKES_WORDS regex")
});

/// Everything that is not a digit, a decimal point, or a magnitude marker.
pub static LIKES_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^0-9.kKmM万亿]").expect("LIKES_NOISE regex")
});

/// A number with an optional magnitude marker, after noise has been stripped.
pub static LIKES_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)([kKmM万亿])?").expect("LIKES_VALUE regex")
});

// =============================================================================
// Text Cleaning Patterns
// =============================================================================

/// Matches multiple whitespace characters for normalization.
pub static WHITESPACE_NORMALIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("WHITESPACE_NORMALIZE regex")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_style_variants() {
        assert!(HIDDEN_STYLE.is_match("display:none"));
        assert!(HIDDEN_STYLE.is_match("color: red; display : none;"));
        assert!(HIDDEN_STYLE.is_match("VISIBILITY: hidden"));
        assert!(!HIDDEN_STYLE.is_match("display: block"));
        assert!(!HIDDEN_STYLE.is_match("visibility: visible"));
    }

    #[test]
    fn test_comment_class_matches_word_boundaries() {
        assert!(COMMENT_CLASS.is_match("comment-list"));
        assert!(COMMENT_CLASS.is_match("post comments"));
        assert!(!COMMENT_CLASS.is_match("commentary-box"));
    }

    #[test]
    fn test_likes_noise_keeps_units() {
        assert_eq!(LIKES_NOISE.replace_all(" 1.2K ", ""), "1.2K");
        assert_eq!(LIKES_NOISE.replace_all("赞 3万", ""), "3万");
        assert_eq!(LIKES_NOISE.replace_all("1,234", ""), "1234");
    }

    #[test]
    fn test_likes_words_leave_single_units() {
        assert_eq!(LIKES_WORDS.replace_all("1.2K likes", ""), "1.2K ");
        assert_eq!(LIKES_WORDS.replace_all("3M", ""), "3M");
    }
}
