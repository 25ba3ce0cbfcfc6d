//! Reply expansion.
//!
//! Finds "show more replies" toggles inside each comment container and
//! activates them one at a time. Each toggle is re-checked right before use:
//! earlier activations re-render the page and may have removed it.

use tracing::{debug, warn};

use crate::dom::DomTree;
use crate::extractor::assemble::Assembler;
use crate::options::ScrollOptions;
use crate::page::{Page, ACTIVATION_SEQUENCE};
use crate::selector::{deep, SelectorField, SelectorMap};

/// Activate every visible reply toggle. Returns the number of toggles that
/// received the full activation sequence.
pub async fn expand_replies<P: Page + ?Sized>(page: &P, selectors: &SelectorMap, options: &ScrollOptions) -> usize {
    let Some(toggle_sel) = selectors.get(SelectorField::ReplyToggle) else {
        return 0;
    };

    let toggles = collect_toggles(page.dom(), selectors, toggle_sel);
    if toggles.is_empty() {
        return 0;
    }
    debug!(candidates = toggles.len(), "expand: reply toggles found");

    let pacing = options.toggle_pacing();
    let mut activated = 0;
    for toggle in &toggles {
        let dom = page.dom();
        if !dom.is_connected(toggle) || !dom.is_visible(toggle) {
            debug!("expand: toggle gone or hidden, skipping");
            continue;
        }

        if let Err(e) = page.scroll_into_view(toggle).await {
            debug!(error = %e, "expand: could not scroll toggle into view");
            continue;
        }
        tokio::time::sleep(options.toggle_settle_delay).await;

        let mut delivered = true;
        for stage in ACTIVATION_SEQUENCE {
            if let Err(e) = page.dispatch(toggle, stage).await {
                warn!(?stage, error = %e, "expand: interaction failed");
                delivered = false;
                break;
            }
        }
        if delivered {
            activated += 1;
        }
        tokio::time::sleep(pacing).await;
    }

    debug!(activated, "expand: pass complete");
    activated
}

/// Toggles inside every container, deduplicated, in document order.
fn collect_toggles<D: DomTree>(dom: &D, selectors: &SelectorMap, toggle_sel: &str) -> Vec<D::Node> {
    let mut toggles: Vec<D::Node> = Vec::new();
    for container in Assembler::new(dom, selectors, "").containers() {
        for toggle in deep::query_all(dom, &container, toggle_sel) {
            if !toggles.contains(&toggle) {
                toggles.push(toggle);
            }
        }
    }
    toggles
}
