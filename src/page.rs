//! Page primitives.
//!
//! The engine drives a live page through [`Page`]: read its DOM, scroll it,
//! bring a node into view, and deliver input events. Browser bindings
//! implement it outside this crate; [`ShadowDocument`] implements it as a
//! static snapshot that never grows.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::dom::{DomTree, NodeHandle, ShadowDocument};
use crate::error::PageError;

/// Upper bound on steps in one incremental scroll, against infinite-scroll
/// pages that grow faster than we move.
pub const MAX_SCROLL_STEPS: u32 = 20;

/// One stage of a user interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Pointer/mouse button down.
    Press,
    /// Pointer/mouse button up.
    Release,
    /// Primary activation (`click`).
    Activate,
}

/// Sequence dispatched, in order, to activate a reply toggle.
pub const ACTIVATION_SEQUENCE: [Interaction; 3] =
    [Interaction::Press, Interaction::Release, Interaction::Activate];

/// A live page the extraction loop can observe and drive.
///
/// Futures are not `Send`: DOM handles are tied to the page's thread.
#[async_trait(?Send)]
pub trait Page {
    type Dom: DomTree;

    /// The page's current document.
    fn dom(&self) -> &Self::Dom;

    /// Scroll one increment toward the bottom and wait for it to settle.
    async fn scroll_to_bottom(&self) -> Result<(), PageError>;

    async fn scroll_into_view(&self, node: &<Self::Dom as DomTree>::Node) -> Result<(), PageError>;

    /// Deliver one interaction stage to `node`.
    async fn dispatch(
        &self,
        node: &<Self::Dom as DomTree>::Node,
        interaction: Interaction,
    ) -> Result<(), PageError>;
}

#[async_trait(?Send)]
impl Page for ShadowDocument {
    type Dom = ShadowDocument;

    fn dom(&self) -> &ShadowDocument {
        self
    }

    async fn scroll_to_bottom(&self) -> Result<(), PageError> {
        Ok(())
    }

    async fn scroll_into_view(&self, node: &NodeHandle) -> Result<(), PageError> {
        if self.is_connected(node) {
            Ok(())
        } else {
            Err(PageError::Detached)
        }
    }

    async fn dispatch(&self, node: &NodeHandle, _interaction: Interaction) -> Result<(), PageError> {
        if self.is_connected(node) {
            Ok(())
        } else {
            Err(PageError::Detached)
        }
    }
}

/// Scroll geometry of a document, as a browser binding exposes it.
#[async_trait(?Send)]
pub trait Viewport {
    /// Full scrollable height of the document.
    async fn scroll_height(&self) -> Result<u64, PageError>;

    /// Current vertical offset.
    async fn scroll_offset(&self) -> Result<u64, PageError>;

    async fn scroll_to(&self, offset: u64) -> Result<(), PageError>;
}

/// Scroll to the bottom in `step`-sized increments, waiting `settle` after
/// each one.
///
/// The height is re-read after every step, so content inserted while
/// scrolling extends the walk. Returns the number of steps taken.
pub async fn scroll_incrementally<V: Viewport + ?Sized>(
    viewport: &V,
    step: u64,
    settle: Duration,
) -> Result<u32, PageError> {
    let step = step.max(1);
    let mut offset = viewport.scroll_offset().await?;
    let mut steps = 0;

    while steps < MAX_SCROLL_STEPS {
        let height = viewport.scroll_height().await?;
        if offset >= height {
            break;
        }
        offset = (offset + step).min(height);
        if let Err(e) = viewport.scroll_to(offset).await {
            warn!(step = steps, error = %e, "scroll: step failed");
            return Err(e);
        }
        steps += 1;
        tokio::time::sleep(settle).await;
    }

    if steps == MAX_SCROLL_STEPS {
        debug!(offset, "scroll: step cap reached before bottom");
    }
    Ok(steps)
}
