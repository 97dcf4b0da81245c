//! Document tree model shared by every transformation phase.
//!
//! The tree uses a parent-pointer / first-child / next-sibling arena for
//! efficient traversal and minimal memory overhead:
//! - Nodes with semantic roles (paragraphs, headings, spans, notes, etc.)
//! - Global text buffer with range references
//! - Sparse attribute storage ([`AttrMap`])
//! - Citation items attached to citation nodes
//! - Structural edits (append, insert, replace, unwrap) and a rewriting
//!   walker whose visitors return an explicit [`Visit`] result
//!
//! # Example
//!
//! ```
//! use tufte::{Document, Node, NodeId, Role};
//!
//! let mut doc = Document::new();
//! let para = doc.alloc_node(Node::new(Role::Paragraph));
//! doc.append_child(NodeId::ROOT, para);
//! let range = doc.append_text("Hello, World!");
//! let text = doc.alloc_node(Node::text(range));
//! doc.append_child(para, text);
//!
//! assert_eq!(doc.children(NodeId::ROOT).count(), 1);
//! ```

mod attrs;
mod node;

pub use attrs::AttrMap;
pub use node::{Node, NodeId, Role, SrcSpan, TextRange};

use std::collections::HashMap;

use crate::Result;
use crate::cite::CiteItem;

/// A parsed document in tree form.
///
/// Built by an external tokenizer through [`alloc_node`](Document::alloc_node),
/// [`append_child`](Document::append_child), and [`append_text`](Document::append_text),
/// then rewritten in place by the transform pipeline. A document is owned by
/// one transformation run; nodes are never shared across documents.
#[derive(Debug, Clone)]
pub struct Document {
    /// All nodes in the tree (index 0 is always the root).
    nodes: Vec<Node>,
    /// Global text buffer (text nodes reference ranges into this).
    text: String,
    /// Sparse per-node attributes.
    pub attrs: AttrMap,
    /// Citation items for Citation and TextCitation nodes.
    citations: HashMap<NodeId, Vec<CiteItem>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a new empty document with a root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(Role::Root)],
            text: String::new(),
            attrs: AttrMap::new(),
            citations: HashMap::new(),
        }
    }

    /// Get the root node ID.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Get the number of nodes (including detached ones).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The role of a node, or `Role::Root` for an invalid ID.
    pub fn role(&self, id: NodeId) -> Role {
        self.node(id).map(|n| n.role).unwrap_or(Role::Root)
    }

    /// Allocate a new node and return its ID.
    pub fn alloc_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Append text to the global buffer and return the range.
    pub fn append_text(&mut self, text: &str) -> TextRange {
        let start = self.text.len() as u32;
        self.text.push_str(text);
        TextRange::new(start, text.len() as u32)
    }

    /// Get text from a range.
    pub fn text(&self, range: TextRange) -> &str {
        let start = range.start as usize;
        let end = range.end() as usize;
        &self.text[start..end]
    }

    /// Attach citation items to a citation node.
    pub fn set_cite_items(&mut self, id: NodeId, items: Vec<CiteItem>) {
        self.citations.insert(id, items);
    }

    /// The citation items of a citation node.
    pub fn cite_items(&self, id: NodeId) -> &[CiteItem] {
        self.citations.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append a child node to a parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(child_node) = self.nodes.get_mut(child.0 as usize) {
            child_node.parent = Some(parent);
            child_node.next_sibling = None;
        }

        match self.node(parent).and_then(|n| n.first_child) {
            Some(first) => {
                let mut last = first;
                while let Some(next) = self.node(last).and_then(|n| n.next_sibling) {
                    last = next;
                }
                if let Some(last_node) = self.node_mut(last) {
                    last_node.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(parent_node) = self.node_mut(parent) {
                    parent_node.first_child = Some(child);
                }
            }
        }
    }

    /// Insert a detached node directly after an attached one.
    pub fn insert_after(&mut self, after: NodeId, id: NodeId) {
        let (parent, next) = match self.node(after) {
            Some(n) => (n.parent, n.next_sibling),
            None => return,
        };
        if let Some(node) = self.node_mut(id) {
            node.parent = parent;
            node.next_sibling = next;
        }
        if let Some(after_node) = self.node_mut(after) {
            after_node.next_sibling = Some(id);
        }
    }

    /// The sibling preceding a node, if any.
    fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id)?.parent?;
        let mut current = self.node(parent)?.first_child?;
        if current == id {
            return None;
        }
        while let Some(node) = self.node(current) {
            match node.next_sibling {
                Some(next) if next == id => return Some(current),
                Some(next) => current = next,
                None => return None,
            }
        }
        None
    }

    /// Replace an attached node with zero or more detached nodes.
    ///
    /// The replacements take the node's position among its siblings, in
    /// order. The detached node keeps its `next_sibling` link so that an
    /// in-progress walk can continue past it; its subtree simply becomes
    /// unreachable from the root.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) {
        let Some(parent) = self.node(old).and_then(|n| n.parent) else {
            return;
        };
        let next = self.node(old).and_then(|n| n.next_sibling);
        let prev = self.prev_sibling(old);

        // Chain the replacements together.
        for pair in replacements.windows(2) {
            if let Some(node) = self.node_mut(pair[0]) {
                node.next_sibling = Some(pair[1]);
            }
        }
        for &id in replacements {
            if let Some(node) = self.node_mut(id) {
                node.parent = Some(parent);
            }
        }
        if let Some(&last) = replacements.last() {
            if let Some(node) = self.node_mut(last) {
                node.next_sibling = next;
            }
        }

        // Splice into the parent's child chain.
        let head = replacements.first().copied().or(next);
        match prev {
            Some(prev) => {
                if let Some(node) = self.node_mut(prev) {
                    node.next_sibling = head;
                }
            }
            None => {
                if let Some(parent_node) = self.node_mut(parent) {
                    parent_node.first_child = head;
                }
            }
        }

        if let Some(old_node) = self.node_mut(old) {
            old_node.parent = None;
        }
    }

    /// Remove an attached node, splicing its children into its place.
    pub fn unwrap(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        if let Some(node) = self.node_mut(id) {
            node.first_child = None;
        }
        self.replace_with(id, &children);
    }

    /// Deep-copy a subtree, returning the ID of the detached copy.
    ///
    /// Roles, spans, text ranges, attributes, and citation items are all
    /// carried over; text and attribute data is shared through the buffers.
    pub fn copy_subtree(&mut self, src: NodeId) -> NodeId {
        let copy = match self.node(src) {
            Some(node) => Node {
                parent: None,
                first_child: None,
                next_sibling: None,
                ..node.clone()
            },
            None => Node::new(Role::Text),
        };
        let copy_id = self.alloc_node(copy);
        self.attrs.copy_node(src, copy_id);
        if let Some(items) = self.citations.get(&src) {
            let items = items.clone();
            self.citations.insert(copy_id, items);
        }
        let children: Vec<NodeId> = self.children(src).collect();
        for child in children {
            let child_copy = self.copy_subtree(child);
            self.append_child(copy_id, child_copy);
        }
        copy_id
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildIter<'_> {
        let first_child = self.node(parent).and_then(|n| n.first_child);
        ChildIter {
            doc: self,
            current: first_child,
        }
    }

    /// Iterate over all nodes reachable from the root, in pre-order
    /// depth-first document order.
    pub fn iter_dfs(&self) -> DfsIter<'_> {
        self.iter_subtree(NodeId::ROOT)
    }

    /// Iterate over a subtree (root included), in pre-order depth-first
    /// document order.
    pub fn iter_subtree(&self, id: NodeId) -> DfsIter<'_> {
        DfsIter {
            doc: self,
            stack: vec![id],
        }
    }
}

/// Iterator over children of a node.
pub struct ChildIter<'a> {
    doc: &'a Document,
    current: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.doc.node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Depth-first iterator over a subtree.
pub struct DfsIter<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for DfsIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        // Push children in reverse order so they're visited left-to-right.
        let mut children: Vec<NodeId> = self.doc.children(current).collect();
        children.reverse();
        self.stack.extend(children);

        Some(current)
    }
}

/// Edit decision returned by a rewrite visitor.
#[derive(Debug)]
pub enum Visit {
    /// Keep the node and descend into its children.
    Continue,
    /// Keep the node, do not descend.
    SkipChildren,
    /// Replace the node (and its subtree) with the given detached nodes.
    /// The walker performs the splice and continues after the replacements
    /// without visiting them.
    Replace(Vec<NodeId>),
}

/// Walk the tree in pre-order and let the visitor rewrite it.
///
/// All structural edits go through the walker, so visitors never invalidate
/// the traversal: a replaced node's siblings are still reached, and
/// replacement nodes are not re-visited.
pub fn rewrite<F>(doc: &mut Document, mut visitor: F) -> Result<()>
where
    F: FnMut(&mut Document, NodeId) -> Result<Visit>,
{
    walk(doc, NodeId::ROOT, &mut visitor)
}

fn walk<F>(doc: &mut Document, id: NodeId, visitor: &mut F) -> Result<()>
where
    F: FnMut(&mut Document, NodeId) -> Result<Visit>,
{
    match visitor(doc, id)? {
        Visit::Replace(replacements) => {
            doc.replace_with(id, &replacements);
            return Ok(());
        }
        Visit::SkipChildren => return Ok(()),
        Visit::Continue => {}
    }

    let mut child = doc.node(id).and_then(|n| n.first_child);
    while let Some(current) = child {
        walk(doc, current, visitor)?;
        // A replaced node keeps its sibling link, so this continues past
        // any replacements without re-visiting them.
        child = doc.node(current).and_then(|n| n.next_sibling);
    }
    Ok(())
}
