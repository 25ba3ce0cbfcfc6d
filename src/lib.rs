//! # rs-comment-harvest
//!
//! Comment extraction engine for script-heavy web pages whose markup is not
//! known in advance.
//!
//! It finds comments with a per-site selector map that is either cached or
//! discovered with an AI oracle, then scrolls and expands the page until
//! no new comments appear.
//!
//! ## Quick Start
//!
//! ```rust
//! use rs_comment_harvest::{extract_comments, ScrollOptions, SelectorMap, ShadowDocument};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let page = ShadowDocument::parse(r#"<div id="comments">
//!     <div class="c"><b class="u">ann</b><p class="t">Nice post</p></div>
//! </div>"#);
//!
//! let selectors = SelectorMap {
//!     comment_container: Some("#comments".into()),
//!     comment_item: Some(".c".into()),
//!     username: Some(".u".into()),
//!     content: Some(".t".into()),
//!     ..SelectorMap::default()
//! };
//! let options = ScrollOptions { enabled: false, ..ScrollOptions::default() };
//!
//! let report = extract_comments(&page, &selectors, 20, &options, None, None).await;
//! assert_eq!(report.comments[0].username, "ann");
//! # }
//! ```
//!
//! ## Features
//!
//! - **Deep queries**: CSS selectors that reach into nested open shadow roots
//! - **Selector discovery**: cache check, then oracle attempts with live
//!   validation, retry feedback and token-budgeted DOM snapshots
//! - **Scroll loop**: reply expansion, id-based dedup and stall detection
//! - **Cooperative cancellation** between cycles

mod error;
mod options;
mod patterns;
mod result;

/// DOM abstraction with shadow-root support.
pub mod dom;

/// Selector maps, deep queries and comment-section heuristics.
pub mod selector;

/// Settings document, selector cache and storage backends.
pub mod cache;

/// AI oracle interface and reply parsing.
pub mod oracle;

/// Selector discovery protocol.
pub mod discovery;

/// Comment assembly, reply expansion and the scroll loop.
pub mod extractor;

/// Page primitives: scrolling and input events.
pub mod page;

/// Cooperative cancellation.
pub mod cancel;

/// Site identity for cache keys.
pub mod site;

// Public API - re-exports
pub use cache::{JsonFileStore, MemoryStore, SelectorCacheEntry, Settings, SettingsStore};
pub use cancel::{CancelToken, TaskRegistry};
pub use discovery::SelectorDiscovery;
pub use dom::{DomTree, NodeHandle, ShadowDocument};
pub use error::{Error, OracleError, PageError, Result, SelectorError};
pub use options::{DiscoveryOptions, ScrollOptions};
pub use oracle::{OracleReply, SelectorOracle};
pub use page::{Interaction, Page, Viewport, ACTIVATION_SEQUENCE};
pub use result::{
    Comment, DiscoveredSelectors, Discovery, ExtractionReport, Progress, ProgressUpdate, SelectorSource, Stage,
    StopReason,
};
pub use selector::{SelectorField, SelectorMap};
pub use site::SiteIdentity;

/// Find a selector map for `site` on the page `dom`.
///
/// A cached map that still validates is returned at confidence 1.0 without
/// calling the oracle. Otherwise the oracle is asked, within the retry budget
/// stored in the settings, and a validated answer is cached.
///
/// # Errors
///
/// Only when the settings store fails. Oracle trouble and low confidence
/// come back as [`Discovery::BestEffort`].
pub async fn discover_selectors<D: DomTree>(
    dom: &D,
    site: &SiteIdentity,
    store: &dyn SettingsStore,
    oracle: &dyn SelectorOracle,
    progress: Progress<'_>,
) -> Result<Discovery> {
    SelectorDiscovery::new(store, oracle).run(dom, site, progress).await
}

/// Collect up to `max_comments` comments from `page` using `selectors`.
///
/// Scrolls and expands replies per `options` until the target is reached,
/// the page stops producing new comments, the scroll budget runs out, or
/// `cancel` is set. The report says which.
pub async fn extract_comments<P: Page + ?Sized>(
    page: &P,
    selectors: &SelectorMap,
    max_comments: usize,
    options: &ScrollOptions,
    cancel: Option<&CancelToken>,
    progress: Progress<'_>,
) -> ExtractionReport {
    extractor::scroll_extract(page, selectors, max_comments, options, cancel, progress).await
}
