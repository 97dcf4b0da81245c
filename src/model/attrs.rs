//! Sparse attribute storage for document nodes.
//!
//! Most nodes carry no attributes. Attributes are stored only for nodes that
//! have them, as ordered name/value pairs. All strings live in a single
//! contiguous buffer, with `TextRange` references into that buffer, avoiding
//! per-attribute allocations.
//!
//! Multi-valued `class` is stored space-separated and accessed as a list.

use std::collections::HashMap;

use super::node::{NodeId, TextRange};

/// Sparse map from nodes to their attributes.
#[derive(Debug, Default, Clone)]
pub struct AttrMap {
    /// Contiguous buffer for all attribute names and values.
    buffer: String,
    /// Ordered (name, value) pairs per node.
    attrs: HashMap<NodeId, Vec<(TextRange, TextRange)>>,
}

impl AttrMap {
    /// Create a new empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string to the buffer and return its range.
    fn intern(&mut self, s: &str) -> TextRange {
        let start = self.buffer.len() as u32;
        self.buffer.push_str(s);
        TextRange::new(start, s.len() as u32)
    }

    /// Get a string slice from a range.
    fn get_str(&self, range: TextRange) -> &str {
        let start = range.start as usize;
        let end = range.end() as usize;
        &self.buffer[start..end]
    }

    /// Set an attribute on a node, replacing any existing value.
    pub fn set(&mut self, node: NodeId, name: &str, value: &str) {
        let name_range = self.intern(name);
        let value_range = self.intern(value);
        let pairs = self.attrs.entry(node).or_default();
        for (existing_name, existing_value) in pairs.iter_mut() {
            let start = existing_name.start as usize;
            let end = existing_name.end() as usize;
            if &self.buffer[start..end] == name {
                *existing_value = value_range;
                return;
            }
        }
        pairs.push((name_range, value_range));
    }

    /// Get an attribute value for a node.
    pub fn get(&self, node: NodeId, name: &str) -> Option<&str> {
        let pairs = self.attrs.get(&node)?;
        pairs
            .iter()
            .find(|(n, _)| self.get_str(*n) == name)
            .map(|(_, v)| self.get_str(*v))
    }

    /// Whether a node carries an attribute with the given name.
    pub fn has(&self, node: NodeId, name: &str) -> bool {
        self.get(node, name).is_some()
    }

    /// The attribute names present on a node, in insertion order.
    pub fn names(&self, node: NodeId) -> Vec<&str> {
        match self.attrs.get(&node) {
            Some(pairs) => pairs.iter().map(|(n, _)| self.get_str(*n)).collect(),
            None => Vec::new(),
        }
    }

    /// The class list of a node (whitespace-split `class` attribute).
    pub fn classes(&self, node: NodeId) -> Vec<&str> {
        match self.get(node, "class") {
            Some(value) => value.split_whitespace().collect(),
            None => Vec::new(),
        }
    }

    /// Whether the node's class list contains the given class.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).contains(&class)
    }

    /// Append a class to the node's class list (no-op if already present).
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let value = match self.get(node, "class") {
            Some(existing) => format!("{existing} {class}"),
            None => class.to_string(),
        };
        self.set(node, "class", &value);
    }

    /// Copy all attributes of one node onto another (which must have none).
    ///
    /// Ranges reference the shared buffer, so this copies no string data.
    pub fn copy_node(&mut self, from: NodeId, to: NodeId) {
        if let Some(pairs) = self.attrs.get(&from) {
            let pairs = pairs.clone();
            self.attrs.insert(to, pairs);
        }
    }

    // --- Named accessors for well-known attributes ---

    /// The `id` attribute.
    pub fn id(&self, node: NodeId) -> Option<&str> {
        self.get(node, "id")
    }

    /// The `label` attribute (margin notes).
    pub fn label(&self, node: NodeId) -> Option<&str> {
        self.get(node, "label")
    }

    /// The `identifier` attribute (footnotes, notes, citations).
    pub fn identifier(&self, node: NodeId) -> Option<&str> {
        self.get(node, "identifier")
    }

    /// The `name` attribute (directive name).
    pub fn directive_name(&self, node: NodeId) -> Option<&str> {
        self.get(node, "name")
    }

    /// The `src` attribute (images, iframes).
    pub fn src(&self, node: NodeId) -> Option<&str> {
        self.get(node, "src")
    }

    /// The `href` attribute (links).
    pub fn href(&self, node: NodeId) -> Option<&str> {
        self.get(node, "href")
    }

    /// The `title` attribute (images).
    pub fn title(&self, node: NodeId) -> Option<&str> {
        self.get(node, "title")
    }
}
