//! # tufte
//!
//! Document tree transforms for Tufte-style long-form publishing: sections,
//! margin and side notes, epigraphs, figures, fullwidth blocks, and
//! citations.
//!
//! The crate is a pure, synchronous, in-memory tree-to-tree transform: an
//! external tokenizer builds a [`Document`], the pipeline validates the
//! extension syntax and rewrites the tree into its semantic form, and an
//! external serializer renders the result. Citations are rendered per node
//! during serialization against a preloaded [`Bibliography`].
//!
//! ## Quick Start
//!
//! ```
//! use tufte::{Context, Document, Node, NodeId, Options, Role, transform};
//!
//! // Tokenizers build documents through the model API.
//! let mut doc = Document::new();
//! let heading = doc.alloc_node(Node::new(Role::Heading(2)));
//! doc.append_child(NodeId::ROOT, heading);
//! let range = doc.append_text("Birds");
//! let text = doc.alloc_node(Node::text(range));
//! doc.append_child(heading, text);
//!
//! let mut ctx = Context::new();
//! transform(&mut doc, &Options::default(), &mut ctx)?;
//!
//! // The document's top level now consists of sections.
//! let top: Vec<_> = doc.children(NodeId::ROOT).collect();
//! assert_eq!(top.len(), 1);
//! assert_eq!(doc.role(top[0]), Role::Section);
//! # Ok::<(), tufte::Error>(())
//! ```
//!
//! ## Rendering citations
//!
//! ```
//! use tufte::{
//!     AuthorDateStyle, Bibliography, CitationOutput, CiteItem, Context, Document, Node,
//!     NodeId, Record, Role, render_citation,
//! };
//!
//! let bib = Bibliography::from_records(vec![Record {
//!     id: "doe2020".into(),
//!     ..Default::default()
//! }])?;
//!
//! let mut doc = Document::new();
//! let cite = doc.alloc_node(Node::new(Role::Citation));
//! doc.append_child(NodeId::ROOT, cite);
//! doc.set_cite_items(cite, vec![CiteItem::new("doe2020")]);
//!
//! let mut ctx = Context::new();
//! let output = render_citation(&doc, cite, &bib, &AuthorDateStyle, &mut ctx)?;
//! match output {
//!     CitationOutput::Rendered(rendered) => assert_eq!(rendered.control_id, "doe20201"),
//!     CitationOutput::Literal(_) => unreachable!("structured citations never fall back"),
//! }
//! # Ok::<(), tufte::Error>(())
//! ```

pub mod bib;
pub mod cite;
pub mod error;
pub mod model;
pub mod transform;
pub(crate) mod util;

pub use bib::{AuthorDateStyle, Bibliography, BibliographyEntry, Record, Style};
pub use cite::{CitationOutput, CiteItem, RenderedCitation, render_citation};
pub use error::{Error, Result};
pub use model::{
    AttrMap, ChildIter, DfsIter, Document, Node, NodeId, Role, SrcSpan, TextRange, Visit, rewrite,
};
pub use transform::{Classified, Context, DirectiveRole, Options, SpanRole, transform};
