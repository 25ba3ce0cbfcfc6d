//! Fakes shared by the integration suites.

#![allow(dead_code, clippy::unwrap_used)]

use std::cell::{Cell, RefCell};
use std::sync::Mutex;

use async_trait::async_trait;
use rs_comment_harvest::{
    DomTree, Interaction, NodeHandle, OracleError, Page, PageError, ScrollOptions, SelectorMap, SelectorOracle,
    ShadowDocument,
};

/// Oracle that plays back canned replies and records every prompt.
pub struct ScriptedOracle {
    replies: Mutex<Vec<Result<String, OracleError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<Result<&str, OracleError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().map(|r| r.map(str::to_string)).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Same reply for every call.
    pub fn repeating(reply: &str, times: usize) -> Self {
        Self::new(vec![Ok(reply); times])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SelectorOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(OracleError::Request("script exhausted".into())))
    }
}

pub fn comment_html(i: usize) -> String {
    format!(
        r#"<div class="comment" data-id="{i}"><a class="author">user{i}</a><time>{i}h ago</time><p class="text">comment number {i}</p><span class="likes">{i}</span></div>"#
    )
}

pub fn thread_selectors() -> SelectorMap {
    SelectorMap {
        comment_container: Some("#comments".into()),
        comment_item: Some(".comment".into()),
        username: Some(".author".into()),
        content: Some(".text".into()),
        timestamp: Some("time".into()),
        likes: Some(".likes".into()),
        ..SelectorMap::default()
    }
}

/// Static page holding comments `0..n`.
pub fn static_thread(n: usize) -> ShadowDocument {
    let items: String = (0..n).map(comment_html).collect();
    ShadowDocument::parse(&format!(
        r#"<html><body><article><h1>Post</h1></article><section id="comments">{items}</section></body></html>"#
    ))
}

/// Scroll loop options with scrolling on and all waits short.
pub fn fast_scroll() -> ScrollOptions {
    ScrollOptions {
        initial_wait_timeout: std::time::Duration::ZERO,
        ..ScrollOptions::default()
    }
}

/// Infinite-scroll page: shows `per_load` comments, and every scroll to the
/// bottom appends the next `per_load` until `total` are on the page.
pub struct LazyPage {
    doc: ShadowDocument,
    total: usize,
    per_load: usize,
    loaded: Cell<usize>,
    scrolls: Cell<u32>,
}

impl LazyPage {
    pub fn new(total: usize, per_load: usize) -> Self {
        let first = per_load.min(total);
        Self {
            doc: static_thread(first),
            total,
            per_load,
            loaded: Cell::new(first),
            scrolls: Cell::new(0),
        }
    }

    pub fn loaded(&self) -> usize {
        self.loaded.get()
    }

    pub fn scrolls(&self) -> u32 {
        self.scrolls.get()
    }
}

#[async_trait(?Send)]
impl Page for LazyPage {
    type Dom = ShadowDocument;

    fn dom(&self) -> &ShadowDocument {
        &self.doc
    }

    async fn scroll_to_bottom(&self) -> Result<(), PageError> {
        self.scrolls.set(self.scrolls.get() + 1);
        let start = self.loaded.get();
        let end = (start + self.per_load).min(self.total);
        if start == end {
            return Ok(());
        }
        let container = self
            .doc
            .select_first(&self.doc.root(), "#comments")
            .ok_or(PageError::Detached)?;
        let batch: String = (start..end).map(comment_html).collect();
        self.doc.append_html(&container, &batch);
        self.loaded.set(end);
        Ok(())
    }

    async fn scroll_into_view(&self, node: &NodeHandle) -> Result<(), PageError> {
        self.doc.scroll_into_view(node).await
    }

    async fn dispatch(&self, node: &NodeHandle, interaction: Interaction) -> Result<(), PageError> {
        self.doc.dispatch(node, interaction).await
    }
}

/// Page whose reply toggles only react to a press, then a release, then an
/// activation. A completed sequence inserts two replies and removes the
/// toggle.
pub struct TogglePage {
    doc: ShadowDocument,
    pending: RefCell<Vec<(NodeHandle, Interaction)>>,
    activations: Cell<usize>,
}

impl TogglePage {
    /// `n` comments, every one with a reply toggle. Toggles listed in
    /// `hidden` are styled `display:none`.
    pub fn new(n: usize, hidden: &[usize]) -> Self {
        let items: String = (0..n)
            .map(|i| {
                let style = if hidden.contains(&i) { r#" style="display:none""# } else { "" };
                format!(
                    r#"<div class="comment" data-id="{i}"><a class="author">user{i}</a><p class="text">comment number {i}</p><div class="replies"></div><button class="more" data-for="{i}"{style}>Show replies</button></div>"#
                )
            })
            .collect();
        Self {
            doc: ShadowDocument::parse(&format!(r#"<section id="comments">{items}</section>"#)),
            pending: RefCell::new(Vec::new()),
            activations: Cell::new(0),
        }
    }

    pub fn selectors() -> SelectorMap {
        SelectorMap {
            comment_container: Some("#comments".into()),
            comment_item: Some(".comment".into()),
            username: Some(".author".into()),
            content: Some(".text".into()),
            reply_toggle: Some("button.more".into()),
            reply_container: Some(".replies".into()),
            reply_item: Some(".reply".into()),
            ..SelectorMap::default()
        }
    }

    pub fn activations(&self) -> usize {
        self.activations.get()
    }

    fn reveal(&self, toggle: &NodeHandle) {
        let Some(parent) = self.doc.attr(toggle, "data-for") else {
            return;
        };
        let root = self.doc.root();
        if let Some(replies) = self
            .doc
            .select_first(&root, &format!(r#".comment[data-id="{parent}"] .replies"#))
        {
            self.doc.append_html(
                &replies,
                &format!(
                    r#"<div class="reply"><a class="author">r{parent}a</a><p class="text">first reply to {parent}</p></div><div class="reply"><a class="author">r{parent}b</a><p class="text">second reply to {parent}</p></div>"#
                ),
            );
        }
        self.doc.remove(toggle);
        self.activations.set(self.activations.get() + 1);
    }
}

#[async_trait(?Send)]
impl Page for TogglePage {
    type Dom = ShadowDocument;

    fn dom(&self) -> &ShadowDocument {
        &self.doc
    }

    async fn scroll_to_bottom(&self) -> Result<(), PageError> {
        Ok(())
    }

    async fn scroll_into_view(&self, node: &NodeHandle) -> Result<(), PageError> {
        self.doc.scroll_into_view(node).await
    }

    async fn dispatch(&self, node: &NodeHandle, interaction: Interaction) -> Result<(), PageError> {
        if !self.doc.is_connected(node) {
            return Err(PageError::Detached);
        }
        let complete = {
            let mut pending = self.pending.borrow_mut();
            let seen: Vec<Interaction> = pending
                .iter()
                .filter(|(n, _)| n == node)
                .map(|(_, i)| *i)
                .collect();
            pending.push((*node, interaction));
            interaction == Interaction::Activate && seen == [Interaction::Press, Interaction::Release]
        };
        if complete {
            self.reveal(node);
        }
        Ok(())
    }
}
