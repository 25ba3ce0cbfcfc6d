//! Extraction session state.
//!
//! One [`ExtractionSession`] lives for exactly one extraction call: the
//! accumulated comments, the ids already seen, and the loop counters. It is
//! never persisted.

use std::collections::HashSet;

use crate::result::Comment;

/// Running state of one extraction.
#[derive(Debug)]
pub struct ExtractionSession {
    max_comments: usize,
    seen: HashSet<String>,
    comments: Vec<Comment>,
    /// Consecutive cycles that added nothing.
    stalls: u32,
    cycles: u32,
    scrolls: u32,
}

impl ExtractionSession {
    #[must_use]
    pub fn new(max_comments: usize) -> Self {
        Self {
            max_comments,
            seen: HashSet::new(),
            comments: Vec::new(),
            stalls: 0,
            cycles: 0,
            scrolls: 0,
        }
    }

    /// Add unseen comments in order, stopping as soon as the target is hit.
    /// Returns how many were added.
    pub fn merge(&mut self, batch: Vec<Comment>) -> usize {
        let mut added = 0;
        for comment in batch {
            if self.is_full() {
                break;
            }
            if self.seen.insert(comment.id.clone()) {
                self.comments.push(comment);
                added += 1;
            }
        }
        added
    }

    /// Record the outcome of one cycle. Returns the current stall streak.
    pub fn record_cycle(&mut self, added: usize) -> u32 {
        self.cycles += 1;
        if added == 0 {
            self.stalls += 1;
        } else {
            self.stalls = 0;
        }
        self.stalls
    }

    pub fn record_scroll(&mut self) {
        self.scrolls += 1;
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.comments.len() >= self.max_comments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    #[must_use]
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    #[must_use]
    pub fn scrolls(&self) -> u32 {
        self.scrolls
    }

    #[must_use]
    pub fn into_comments(self) -> Vec<Comment> {
        self.comments
    }
}
