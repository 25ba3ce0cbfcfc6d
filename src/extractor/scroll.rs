//! Scroll-expand-extract loop.
//!
//! Each cycle:
//! 1. checks for cancellation;
//! 2. expands replies on the first cycle and every Nth one after;
//! 3. extracts visible comments and merges them by id;
//! 4. stops on target, stall streak, disabled scrolling or scroll budget;
//! 5. otherwise scrolls and waits.
//!
//! Pages give no "end of list" signal, so a streak of cycles that add
//! nothing is taken as the end.

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::dom::DomTree;
use crate::extractor::assemble::Assembler;
use crate::extractor::expand::expand_replies;
use crate::extractor::session::ExtractionSession;
use crate::options::ScrollOptions;
use crate::page::Page;
use crate::result::{report, ExtractionReport, Progress, Stage, StopReason};
use crate::selector::{deep, SelectorField, SelectorMap};

/// Collect up to `max_comments` deduplicated comments from `page`.
///
/// Never fails: an empty page is an empty report, and page-level errors are
/// logged and absorbed.
pub async fn scroll_extract<P: Page + ?Sized>(
    page: &P,
    selectors: &SelectorMap,
    max_comments: usize,
    options: &ScrollOptions,
    cancel: Option<&CancelToken>,
    progress: Progress<'_>,
) -> ExtractionReport {
    let mut session = ExtractionSession::new(max_comments);
    if session.is_full() {
        return finish(session, StopReason::TargetReached, progress);
    }

    if let Some(item_sel) = selectors.get(SelectorField::CommentItem) {
        let dom = page.dom();
        let found = deep::wait_for_element(
            dom,
            &dom.root(),
            item_sel,
            options.initial_wait_timeout,
            options.initial_wait_interval,
        )
        .await;
        if found.is_none() {
            debug!(selector = item_sel, "scroll: no comment item yet, extracting anyway");
        }
    }

    let stall_limit = options.stall_limit.max(1);
    let mut cycle: u32 = 0;
    let stop = loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            info!(cycle, collected = session.len(), "scroll: cancelled");
            break StopReason::Cancelled;
        }

        if options.expands_on(cycle) {
            report(progress, Stage::ExpandingReplies, session.len());
            let activated = expand_replies(page, selectors, options).await;
            if activated > 0 {
                tokio::time::sleep(options.toggle_pacing()).await;
            }
        }

        report(progress, Stage::Extracting { cycle }, session.len());
        let batch = Assembler::new(page.dom(), selectors, &options.anonymous_username).extract_visible();
        let visible = batch.len();
        let added = session.merge(batch);
        let stalls = session.record_cycle(added);
        info!(cycle, visible, added, total = session.len(), stalls, "scroll: cycle complete");

        if session.is_full() {
            break StopReason::TargetReached;
        }
        if stalls >= stall_limit {
            break StopReason::Stalled;
        }
        if !options.enabled {
            break StopReason::ScrollingDisabled;
        }
        if session.scrolls() >= options.max_scroll_attempts {
            break StopReason::ScrollBudgetExhausted;
        }

        report(
            progress,
            Stage::Scrolling {
                scroll: session.scrolls() + 1,
            },
            session.len(),
        );
        if let Err(e) = page.scroll_to_bottom().await {
            warn!(cycle, error = %e, "scroll: scroll failed, continuing");
        }
        session.record_scroll();
        tokio::time::sleep(options.scroll_delay).await;
        cycle += 1;
    };

    finish(session, stop, progress)
}

fn finish(session: ExtractionSession, stop_reason: StopReason, progress: Progress<'_>) -> ExtractionReport {
    let cycles = session.cycles();
    let scrolls = session.scrolls();
    let comments = session.into_comments();
    info!(?stop_reason, comments = comments.len(), cycles, scrolls, "scroll: extraction finished");
    report(progress, Stage::Done, comments.len());
    ExtractionReport {
        comments,
        stop_reason,
        cycles,
        scrolls,
    }
}
