//! The document transformation pipeline.
//!
//! Phases run in a fixed order, each a complete pre-order traversal of the
//! tree finishing before the next starts:
//!
//! 1. Schema validation (fail-fast; classifies spans and directives)
//! 2. Sectionizing
//! 3. Textual citation recognition
//! 4. Epigraph retagging
//! 5. Figure rewriting (margin, inline, embedded)
//! 6. Note rewriting (margin spans, footnote resolution)
//! 7. Fullwidth retagging and unwrapping
//!
//! Traversal order is part of the observable contract: the run context's
//! collision maps are mutated in document order, so later identical inputs
//! receive later disambiguating suffixes.

pub mod epigraph;
pub mod figures;
pub mod fullwidth;
pub mod lint;
pub mod notes;
pub mod sectionize;

pub use lint::{Classified, DirectiveRole, SpanRole};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::cite::recognize_citations;
use crate::model::Document;

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Heading level that starts a new section.
    pub section_level: u8,
    /// Also start a new section at a `newthought` span.
    pub newthought_sections: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            section_level: 2,
            newthought_sections: false,
        }
    }
}

/// Mutable state scoped to one document-transformation run.
///
/// Holds the two collision maps. Both are initialized empty, mutated
/// monotonically in traversal order, and discarded at the end of the run;
/// the context is threaded by reference through every phase and handler
/// that needs it. Construct a fresh context per document.
#[derive(Debug, Default)]
pub struct Context {
    /// Computed figure label -> next numeric suffix.
    labels: HashMap<String, u32>,
    /// Joined citation key list -> occurrence count.
    references: HashMap<String, u32>,
}

impl Context {
    /// Create an empty run context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a figure label against the label collision map.
    ///
    /// The first use of a label consumes it unchanged; every subsequent use
    /// appends an incrementing numeric suffix.
    pub fn resolve_label(&mut self, label: &str) -> String {
        match self.labels.get_mut(label) {
            Some(next) => {
                let index = *next;
                *next += 1;
                format!("{label}-{index}")
            }
            None => {
                self.labels.insert(label.to_string(), 1);
                label.to_string()
            }
        }
    }

    /// Count an occurrence of a citation reference (joined key list) and
    /// return its 1-based occurrence number.
    pub fn next_reference(&mut self, reference: &str) -> u32 {
        let count = self.references.entry(reference.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Run the full transformation pipeline over a document.
///
/// On success the document's top level consists of section nodes and every
/// extension construct has been rewritten to its semantic form. On error
/// the run aborts immediately; the document must be considered unusable
/// (there is no partial output).
pub fn transform(doc: &mut Document, options: &Options, ctx: &mut Context) -> Result<()> {
    let classified = lint::lint(doc, options)?;
    tracing::debug!(
        spans = classified.span_count(),
        directives = classified.directive_count(),
        "validated document"
    );

    sectionize::sectionize(doc, options, &classified);
    recognize_citations(doc)?;
    epigraph::rewrite_epigraphs(doc, &classified);
    figures::rewrite_figures(doc, &classified, ctx)?;
    notes::rewrite_notes(doc, &classified)?;
    fullwidth::retag_fullwidth(doc, &classified);
    fullwidth::unwrap_fullwidth(doc);

    tracing::debug!(nodes = doc.node_count(), "transformed document");
    Ok(())
}
