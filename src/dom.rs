//! DOM Operations Adapter
//!
//! The extraction engine never touches a concrete DOM type. It sees a page
//! through [`DomTree`]: a set of light trees, each of which may host nested
//! shadow boundaries. [`ShadowDocument`] is the `dom_query`-backed
//! implementation: one `dom_query::Document` per tree, with open shadow roots
//! attached to host elements the way `attachShadow` does in a browser.

use std::cell::RefCell;
use std::fmt;

pub use dom_query::{Document, Selection};
use dom_query::{Matcher, NodeId};

use crate::error::SelectorError;
use crate::patterns::HIDDEN_STYLE;

/// Upper bound on ancestor walks, guarding against malformed trees.
const MAX_ANCESTOR_WALK: usize = 1024;

/// A tree of elements that may contain nested shadow boundaries.
///
/// `select_light` only sees the light tree below `scope`: it never crosses a
/// shadow boundary. Crossing boundaries is the deep query engine's job
/// (see [`crate::selector::deep`]).
pub trait DomTree {
    /// Opaque node handle. Equality is node identity.
    type Node: Clone + PartialEq + fmt::Debug;

    /// The document root.
    fn root(&self) -> Self::Node;

    /// Light-tree descendants of `scope` matching `selector`, in tree order.
    fn select_light(&self, scope: &Self::Node, selector: &str) -> Result<Vec<Self::Node>, SelectorError>;

    /// The shadow root hosted by `node`, if any.
    fn shadow_root(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Light-tree element children of `node`.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Every light-tree element below `scope`, in tree order.
    fn descendants(&self, scope: &Self::Node) -> Vec<Self::Node>;

    /// Whether `node` itself matches `selector`. Invalid selectors never match.
    fn matches(&self, node: &Self::Node, selector: &str) -> bool;

    /// Text content of `node` and its light-tree descendants.
    fn text(&self, node: &Self::Node) -> String;

    fn attr(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Lowercase tag name, `None` for non-element nodes.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    /// Whether `node` is still attached to the live document.
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Whether `node` would be rendered: connected, not `hidden`, and not
    /// styled away by itself or an ancestor.
    fn is_visible(&self, node: &Self::Node) -> bool;
}

/// Handle to a node inside a [`ShadowDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle {
    tree: usize,
    id: NodeId,
}

impl NodeHandle {
    /// Index of the tree this node lives in (0 is the main document).
    #[must_use]
    pub fn tree_index(&self) -> usize {
        self.tree
    }
}

struct Tree {
    doc: Document,
    /// Node that stands for this tree's root: the document node for the main
    /// tree, the `<body>` wrapper for a shadow tree.
    scope: NodeId,
    host: Option<NodeHandle>,
}

/// A parsed page with support for nested open shadow roots.
///
/// Mutations go through `&self`: `dom_query` keeps its trees behind interior
/// mutability, and the engine has a single mutator at a time.
pub struct ShadowDocument {
    trees: RefCell<Vec<Tree>>,
    main_root: NodeId,
}

impl fmt::Debug for ShadowDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowDocument")
            .field("trees", &self.trees.borrow().len())
            .finish()
    }
}

impl ShadowDocument {
    /// Parse an HTML document as the main light tree.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let doc = Document::from(html);
        let scope = doc.root().id;
        Self {
            trees: RefCell::new(vec![Tree { doc, scope, host: None }]),
            main_root: scope,
        }
    }

    /// Attach an open shadow root to `host`, populated from `html`.
    ///
    /// Returns the new shadow root, or `None` if `host` is unknown or already
    /// hosts a shadow root.
    pub fn attach_shadow(&self, host: &NodeHandle, html: &str) -> Option<NodeHandle> {
        if self.node_exists(host).is_none() || self.shadow_root(host).is_some() {
            return None;
        }

        let doc = Document::from(html);
        let body = doc.select("body").nodes().first().map(|n| n.id)?;

        let mut trees = self.trees.borrow_mut();
        trees.push(Tree {
            doc,
            scope: body,
            host: Some(*host),
        });
        Some(NodeHandle {
            tree: trees.len() - 1,
            id: body,
        })
    }

    /// First light-tree match of `selector` below `scope`.
    #[must_use]
    pub fn select_first(&self, scope: &NodeHandle, selector: &str) -> Option<NodeHandle> {
        self.select_light(scope, selector)
            .ok()
            .and_then(|nodes| nodes.into_iter().next())
    }

    /// Append parsed `html` as the last children of `node`.
    pub fn append_html(&self, node: &NodeHandle, html: &str) {
        self.with_selection(node, |sel| sel.append_html(html));
    }

    /// Detach `node` from its tree.
    pub fn remove(&self, node: &NodeHandle) {
        self.with_selection(node, |sel| sel.remove());
    }

    pub fn set_attr(&self, node: &NodeHandle, name: &str, value: &str) {
        self.with_selection(node, |sel| sel.set_attr(name, value));
    }

    fn node_exists(&self, node: &NodeHandle) -> Option<()> {
        let trees = self.trees.borrow();
        let tree = trees.get(node.tree)?;
        tree.doc.tree.get(&node.id).map(|_| ())
    }

    fn with_selection<R>(&self, node: &NodeHandle, f: impl FnOnce(&Selection) -> R) -> Option<R> {
        let trees = self.trees.borrow();
        let tree = trees.get(node.tree)?;
        let node_ref = tree.doc.tree.get(&node.id)?;
        let sel = Selection::from(node_ref);
        Some(f(&sel))
    }

    fn handles(tree: usize, sel: &Selection) -> Vec<NodeHandle> {
        sel.nodes()
            .iter()
            .map(|n| NodeHandle { tree, id: n.id })
            .collect()
    }

    fn parent_of(&self, node: &NodeHandle) -> Option<NodeHandle> {
        self.with_selection(node, |sel| {
            sel.parent().nodes().first().map(|n| NodeHandle {
                tree: node.tree,
                id: n.id,
            })
        })
        .flatten()
    }

    fn is_tree_scope(&self, node: &NodeHandle) -> bool {
        self.trees
            .borrow()
            .get(node.tree)
            .is_some_and(|t| t.scope == node.id)
    }

    fn host_of(&self, node: &NodeHandle) -> Option<NodeHandle> {
        self.trees.borrow().get(node.tree).and_then(|t| t.host)
    }

    fn is_hidden_element(&self, node: &NodeHandle) -> bool {
        if self.attr(node, "hidden").is_some() {
            return true;
        }
        self.attr(node, "style")
            .is_some_and(|style| HIDDEN_STYLE.is_match(&style))
    }
}

impl DomTree for ShadowDocument {
    type Node = NodeHandle;

    fn root(&self) -> NodeHandle {
        NodeHandle {
            tree: 0,
            id: self.main_root,
        }
    }

    fn select_light(&self, scope: &NodeHandle, selector: &str) -> Result<Vec<NodeHandle>, SelectorError> {
        let matcher =
            Matcher::new(selector).map_err(|_| SelectorError::Invalid(selector.to_string()))?;
        Ok(self
            .with_selection(scope, |sel| Self::handles(scope.tree, &sel.select_matcher(&matcher)))
            .unwrap_or_default())
    }

    fn shadow_root(&self, node: &NodeHandle) -> Option<NodeHandle> {
        self.trees
            .borrow()
            .iter()
            .enumerate()
            .find(|(_, t)| t.host.as_ref() == Some(node))
            .map(|(index, t)| NodeHandle {
                tree: index,
                id: t.scope,
            })
    }

    fn children(&self, node: &NodeHandle) -> Vec<NodeHandle> {
        self.with_selection(node, |sel| Self::handles(node.tree, &sel.children()))
            .unwrap_or_default()
    }

    fn descendants(&self, scope: &NodeHandle) -> Vec<NodeHandle> {
        self.with_selection(scope, |sel| Self::handles(scope.tree, &sel.select("*")))
            .unwrap_or_default()
    }

    fn matches(&self, node: &NodeHandle, selector: &str) -> bool {
        let Ok(matcher) = Matcher::new(selector) else {
            return false;
        };
        let trees = self.trees.borrow();
        let Some(tree) = trees.get(node.tree) else {
            return false;
        };
        let root = Selection::from(tree.doc.root());
        root.select_matcher(&matcher)
            .nodes()
            .iter()
            .any(|n| n.id == node.id)
    }

    fn text(&self, node: &NodeHandle) -> String {
        self.with_selection(node, |sel| sel.text().to_string())
            .unwrap_or_default()
    }

    fn attr(&self, node: &NodeHandle, name: &str) -> Option<String> {
        self.with_selection(node, |sel| sel.attr(name).map(|v| v.to_string()))
            .flatten()
    }

    fn tag_name(&self, node: &NodeHandle) -> Option<String> {
        self.with_selection(node, |sel| {
            sel.nodes()
                .first()
                .filter(|n| n.is_element())
                .and_then(dom_query::NodeRef::node_name)
                .map(|t| t.to_lowercase())
        })
        .flatten()
    }

    fn is_connected(&self, node: &NodeHandle) -> bool {
        let host = {
            let trees = self.trees.borrow();
            let Some(tree) = trees.get(node.tree) else {
                return false;
            };
            if node.id != tree.scope {
                let root = Selection::from(tree.doc.root());
                if !root.select("*").nodes().iter().any(|n| n.id == node.id) {
                    return false;
                }
            }
            tree.host
        };
        host.is_none_or(|h| self.is_connected(&h))
    }

    fn is_visible(&self, node: &NodeHandle) -> bool {
        if !self.is_connected(node) {
            return false;
        }

        let mut current = Some(*node);
        let mut steps = 0;
        while let Some(n) = current {
            steps += 1;
            if steps > MAX_ANCESTOR_WALK {
                break;
            }
            if self.is_hidden_element(&n) {
                return false;
            }
            current = if self.is_tree_scope(&n) {
                self.host_of(&n)
            } else {
                self.parent_of(&n)
            };
        }
        true
    }
}

/// Collapse runs of whitespace and trim.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    crate::patterns::WHITESPACE_NORMALIZE
        .replace_all(text.trim(), " ")
        .into_owned()
}
