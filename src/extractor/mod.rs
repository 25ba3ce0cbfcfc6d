//! Comment extraction module.
//!
//! # Module Structure
//!
//! - `assemble`: Comment records from DOM nodes (ids, likes, anonymous fallback)
//! - `expand`: Reply toggle activation
//! - `session`: Per-call accumulator and loop counters
//! - `scroll`: The scroll-expand-extract loop
//!
//! # Usage
//!
//! ```rust,ignore
//! use rs_comment_harvest::extractor::{scroll_extract, Assembler};
//!
//! // One static pass over what is visible
//! let comments = Assembler::new(&doc, &selectors, "Anonymous").extract_visible();
//!
//! // Or the full loop against a live page
//! let report = scroll_extract(&page, &selectors, 100, &options, Some(&token), None).await;
//! ```

pub mod assemble;
pub mod expand;
pub mod scroll;
pub mod session;

pub use assemble::{comment_id, parse_likes, Assembler};
pub use expand::expand_replies;
pub use scroll::scroll_extract;
pub use session::ExtractionSession;
