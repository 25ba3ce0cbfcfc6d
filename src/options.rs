//! Configuration options for selector discovery and comment extraction.
//!
//! [`DiscoveryOptions`] is derived from the persisted [`Settings`] document so
//! the protocol always runs with what the storage service holds.
//! [`ScrollOptions`] is supplied per extraction call.

use std::time::Duration;

use crate::cache::Settings;
use crate::selector::SelectorField;

/// Configuration for the selector discovery protocol.
///
/// # Example
///
/// ```rust
/// use rs_comment_harvest::DiscoveryOptions;
///
/// let options = DiscoveryOptions {
///     retry_budget: 5,
///     ..DiscoveryOptions::default()
/// };
/// assert_eq!(options.max_chunks, 4);
/// ```
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Maximum number of oracle attempts before returning a best-effort result.
    ///
    /// Default: `3`
    pub retry_budget: u32,

    /// Maximum element depth serialized into the DOM snapshot.
    ///
    /// Default: `12`
    pub dom_analysis_depth: usize,

    /// Context size of the target model, in tokens.
    ///
    /// Default: `8000`
    pub model_max_tokens: usize,

    /// Share of `model_max_tokens` kept free for the surrounding prompt.
    ///
    /// Chunks are sized to `model_max_tokens * (1 - prompt_reserve_fraction)`.
    ///
    /// Default: `0.4`
    pub prompt_reserve_fraction: f64,

    /// Confidence below which a result is not considered usable.
    ///
    /// Best-effort results always report less than this.
    ///
    /// Default: `0.6`
    pub usability_threshold: f64,

    /// Maximum snapshot chunks sent per attempt. Extra chunks are dropped.
    ///
    /// Default: `4`
    pub max_chunks: usize,

    /// Time allowed for one oracle reply.
    ///
    /// Default: 60 seconds
    pub oracle_timeout: Duration,

    /// Fields a later chunk may overwrite during chunk merging.
    ///
    /// Default: empty (later chunks only add)
    pub overwritable_fields: Vec<SelectorField>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            retry_budget: 3,
            dom_analysis_depth: 12,
            model_max_tokens: 8000,
            prompt_reserve_fraction: 0.4,
            usability_threshold: 0.6,
            max_chunks: 4,
            oracle_timeout: Duration::from_secs(60),
            overwritable_fields: Vec::new(),
        }
    }
}

impl DiscoveryOptions {
    /// Options carrying the configuration stored in `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            retry_budget: settings.retry_budget,
            dom_analysis_depth: settings.dom_analysis_depth,
            model_max_tokens: settings.model_max_tokens,
            prompt_reserve_fraction: settings.prompt_reserve_fraction,
            ..Self::default()
        }
    }

    /// Token budget for one snapshot chunk.
    #[must_use]
    pub fn chunk_token_budget(&self) -> usize {
        let reserve = self.prompt_reserve_fraction.clamp(0.0, 1.0);
        let budget = (self.model_max_tokens as f64 * (1.0 - reserve)).floor() as usize;
        budget.max(1)
    }
}

/// Configuration for the scroll-expand-extract loop.
#[derive(Debug, Clone)]
pub struct ScrollOptions {
    /// Scroll between extraction passes.
    ///
    /// When `false` the loop performs exactly one pass over what is visible.
    ///
    /// Default: `true`
    pub enabled: bool,

    /// Maximum number of scrolls in one extraction.
    ///
    /// Default: `20`
    pub max_scroll_attempts: u32,

    /// Wait after each scroll before the next cycle.
    ///
    /// Default: 1500 ms
    pub scroll_delay: Duration,

    /// Consecutive cycles without new comments before giving up.
    ///
    /// Default: `3`
    pub stall_limit: u32,

    /// Run reply expansion on the first cycle and every Nth cycle after it.
    ///
    /// Default: `3`
    pub expand_every: u32,

    /// Wait between scrolling a toggle into view and activating it.
    ///
    /// Default: 150 ms
    pub toggle_settle_delay: Duration,

    /// Upper bound on the pause after each toggle activation.
    ///
    /// The pause itself is half of `scroll_delay`.
    ///
    /// Default: 1000 ms
    pub toggle_pacing_cap: Duration,

    /// How long to wait for the first comment item to appear.
    ///
    /// Default: 5 seconds
    pub initial_wait_timeout: Duration,

    /// Poll interval while waiting for the first comment item.
    ///
    /// Default: 100 ms
    pub initial_wait_interval: Duration,

    /// Username recorded when a comment has none.
    ///
    /// Default: `"Anonymous"`
    pub anonymous_username: String,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_scroll_attempts: 20,
            scroll_delay: Duration::from_millis(1500),
            stall_limit: 3,
            expand_every: 3,
            toggle_settle_delay: Duration::from_millis(150),
            toggle_pacing_cap: Duration::from_millis(1000),
            initial_wait_timeout: Duration::from_secs(5),
            initial_wait_interval: Duration::from_millis(100),
            anonymous_username: "Anonymous".to_string(),
        }
    }
}

impl ScrollOptions {
    /// Pause after each toggle activation.
    #[must_use]
    pub fn toggle_pacing(&self) -> Duration {
        (self.scroll_delay / 2).min(self.toggle_pacing_cap)
    }

    /// Whether reply expansion runs on `cycle` (zero-based).
    #[must_use]
    pub fn expands_on(&self, cycle: u32) -> bool {
        cycle == 0 || (self.expand_every > 0 && cycle % self.expand_every == 0)
    }
}
