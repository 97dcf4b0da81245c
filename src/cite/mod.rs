//! Citation recognition and rendering.
//!
//! Citations reach the pipeline two ways: structured inline citation nodes
//! produced by the tokenizer, and a bare `@key [suffix]` textual pattern
//! recognized inside plain text by [`recognize`]. Both are rendered by
//! [`render`] against a preloaded bibliography.

pub mod recognize;
pub mod render;

pub use recognize::recognize_citations;
pub use render::{CitationOutput, RenderedCitation, render_citation};

/// One cited work within a citation node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiteItem {
    /// Bibliography lookup key.
    pub key: String,
    /// Free text rendered before the item.
    pub prefix: Option<String>,
    /// Free text rendered after the item (e.g. a page locator).
    pub suffix: Option<String>,
    /// Omit the author from the rendering.
    pub suppress_author: bool,
    /// Render as an author-in-text citation: `Doe (2020, p. 5)`.
    pub author_in_text: bool,
}

impl CiteItem {
    /// A plain citation of the given key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }
}
