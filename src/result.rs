//! Result types for discovery and extraction output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::selector::SelectorMap;

/// One extracted comment.
///
/// `content` is never empty: items without text are dropped during assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Deterministic id, stable for the same text at the same position.
    pub id: String,

    pub username: String,

    pub content: String,

    /// Display timestamp as shown on the page. Not parsed.
    pub timestamp: String,

    pub likes: u64,

    /// Avatar image URL, when the layout has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Direct replies. Replies never carry replies of their own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

/// Where a discovered selector map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorSource {
    /// A cached map that still validated.
    Cache,
    /// A map produced by the oracle during this call.
    Oracle,
}

/// A selector map with the trust attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredSelectors {
    pub selectors: SelectorMap,

    /// Confidence in [0, 1].
    pub confidence: f64,

    /// Structural summary reported by the oracle, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<String>,

    pub source: SelectorSource,
}

/// Outcome of selector discovery.
///
/// Low confidence is a distinct variant rather than an error: the caller
/// decides whether a best-effort map is worth extracting with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Discovery {
    /// The map passed live validation at or above the usability threshold.
    Accepted(DiscoveredSelectors),

    /// Either the retry budget ran out, holding every field proven along
    /// the way, or a validated map came back below the usability threshold.
    BestEffort(DiscoveredSelectors),
}

impl Discovery {
    #[must_use]
    pub fn selectors(&self) -> &SelectorMap {
        &self.inner().selectors
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.inner().confidence
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Discovery::Accepted(_))
    }

    #[must_use]
    pub fn into_inner(self) -> DiscoveredSelectors {
        match self {
            Discovery::Accepted(inner) | Discovery::BestEffort(inner) => inner,
        }
    }

    fn inner(&self) -> &DiscoveredSelectors {
        match self {
            Discovery::Accepted(inner) | Discovery::BestEffort(inner) => inner,
        }
    }
}

/// Why the extraction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// `max_comments` were collected.
    TargetReached,
    /// Too many consecutive cycles added nothing.
    Stalled,
    /// The scroll-attempt budget was used up.
    ScrollBudgetExhausted,
    /// Scrolling is off; one pass was made.
    ScrollingDisabled,
    /// The caller cancelled the task.
    Cancelled,
}

/// Comments collected by one extraction, with how the loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    /// Deduplicated comments in discovery order.
    pub comments: Vec<Comment>,
    pub stop_reason: StopReason,
    /// Extraction passes performed.
    pub cycles: u32,
    /// Scroll primitive invocations.
    pub scrolls: u32,
}

impl ExtractionReport {
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.stop_reason == StopReason::Cancelled
    }
}

/// Stage label reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckingCache,
    ValidatingCached,
    QueryingOracle { attempt: u32, chunk: usize, chunks: usize },
    Validating { attempt: u32 },
    ExpandingReplies,
    Extracting { cycle: u32 },
    Scrolling { scroll: u32 },
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::CheckingCache => f.write_str("Checking selector cache"),
            Stage::ValidatingCached => f.write_str("Validating cached selectors"),
            Stage::QueryingOracle { attempt, chunk, chunks } => write!(
                f,
                "Analyzing page structure (attempt {attempt}, part {}/{chunks})",
                chunk + 1
            ),
            Stage::Validating { attempt } => write!(f, "Testing selectors (attempt {attempt})"),
            Stage::ExpandingReplies => f.write_str("Expanding replies"),
            Stage::Extracting { cycle } => write!(f, "Extracting comments (pass {})", cycle + 1),
            Stage::Scrolling { scroll } => write!(f, "Scrolling for more ({scroll})"),
            Stage::Done => f.write_str("Done"),
        }
    }
}

/// Observability-only progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub stage: Stage,
    /// Running count: comments collected, or fields proven during discovery.
    pub count: usize,
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.stage, self.count)
    }
}

/// Progress callback accepted by the caller-facing operations.
pub type Progress<'a> = Option<&'a dyn Fn(ProgressUpdate)>;

pub(crate) fn report(progress: Progress<'_>, stage: Stage, count: usize) {
    if let Some(callback) = progress {
        callback(ProgressUpdate { stage, count });
    }
}
