//! Document tree node types and roles.

use std::fmt;

/// Unique identifier for a node within a [`Document`](super::Document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root node ID (always 0).
    pub const ROOT: NodeId = NodeId(0);
}

/// Semantic role of a node.
///
/// The input grammar (everything an external tokenizer may produce) and the
/// output grammar (everything the transform pipeline may synthesize) share
/// this one closed set. String payloads (class lists, identifiers, URLs,
/// directive names) live in the document's [`AttrMap`](super::AttrMap);
/// citation items live on the document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Root document node.
    Root,
    /// Section container introduced by the sectionizer. Owns a contiguous
    /// run of former top-level nodes; never restructured afterward.
    Section,
    /// Headings with level 1-6.
    Heading(u8),
    /// Paragraph - a block-level text container.
    Paragraph,
    /// Leaf text content node. References a range in the document's text
    /// buffer.
    #[default]
    Text,
    /// Emphasized inline content.
    Emphasis,
    /// Strongly emphasized inline content.
    Strong,
    /// Inline code span.
    InlineCode,
    /// Fenced or indented code block.
    CodeBlock,
    /// Block quote.
    BlockQuote,
    /// Ordered list.
    OrderedList,
    /// Unordered list.
    UnorderedList,
    /// Individual list items.
    ListItem,
    /// Hard line break (leaf).
    Break,
    /// Thematic break (leaf).
    Rule,
    /// Images. `src`, `alt`, and `title` are in the attribute map.
    Image,
    /// Hyperlinks. `href` is in the attribute map.
    Link,
    /// Generic inline span carrying a class list, e.g. `[text]{.newthought}`.
    /// The schema validator classifies every span into a closed role set.
    Span,
    /// Named block-level container directive, e.g. `:::epigraph`. The
    /// directive name is the `name` attribute.
    Directive,
    /// Footnote reference, resolved against its definition by `identifier`.
    FootnoteReference,
    /// Footnote definition. Consumed (and removed) by note resolution.
    FootnoteDefinition,
    /// Structured inline citation with one or more citation items.
    Citation,
    /// Citation recognized inside plain text (`@key [suffix]`). Keeps the
    /// literal `@key` text as its text range for fallback rendering.
    TextCitation,
    /// Margin note: an aside with a toggle `identifier` and optional `label`.
    MarginNote,
    /// Side note: a numbered aside with a toggle `identifier`.
    SideNote,
    /// Epigraph quotation block (retagged `epigraph` directive).
    Epigraph,
    /// Citation attribution inside an epigraph (retagged `cite` span).
    Attribution,
    /// Attribution footer inside an epigraph (retagged `footer` span).
    Footer,
    /// Figure wrapper (retagged paragraph, synthesized wrapper, or retagged
    /// `iframe` directive).
    Figure,
    /// Embedded frame element synthesized from an `iframe` directive.
    Embed,
    /// Fullwidth block (retagged `fullwidth` directive). Spliced out by the
    /// unwrap pass after marking its figures and code blocks.
    Fullwidth,
}

impl Role {
    /// Whether nodes of this role are inline (phrasing) content.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            Role::Text
                | Role::Emphasis
                | Role::Strong
                | Role::InlineCode
                | Role::Break
                | Role::Image
                | Role::Link
                | Role::Span
                | Role::FootnoteReference
                | Role::Citation
                | Role::TextCitation
                | Role::MarginNote
                | Role::SideNote
        )
    }

    /// Lowercase name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Role::Root => "root",
            Role::Section => "section",
            Role::Heading(_) => "heading",
            Role::Paragraph => "paragraph",
            Role::Text => "text",
            Role::Emphasis => "emphasis",
            Role::Strong => "strong",
            Role::InlineCode => "inline code",
            Role::CodeBlock => "code block",
            Role::BlockQuote => "block quote",
            Role::OrderedList => "ordered list",
            Role::UnorderedList => "unordered list",
            Role::ListItem => "list item",
            Role::Break => "break",
            Role::Rule => "rule",
            Role::Image => "image",
            Role::Link => "link",
            Role::Span => "span",
            Role::Directive => "directive",
            Role::FootnoteReference => "footnote reference",
            Role::FootnoteDefinition => "footnote definition",
            Role::Citation => "citation",
            Role::TextCitation => "text citation",
            Role::MarginNote => "margin note",
            Role::SideNote => "side note",
            Role::Epigraph => "epigraph",
            Role::Attribution => "attribution",
            Role::Footer => "footer",
            Role::Figure => "figure",
            Role::Embed => "embed",
            Role::Fullwidth => "fullwidth",
        }
    }
}

/// Range into the document's global text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRange {
    /// Byte offset into the buffer.
    pub start: u32,
    /// Length in bytes.
    pub len: u32,
}

impl TextRange {
    /// Create a new text range.
    pub fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// Check if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the end offset.
    pub fn end(&self) -> u32 {
        self.start + self.len
    }
}

/// Source position of a node: a line/column range (1-based, as reported by
/// the tokenizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcSpan {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SrcSpan {
    /// Create a span from start and end line/column pairs.
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

impl fmt::Display for SrcSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// A node in the document tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Semantic role.
    pub role: Role,
    /// Parent node (None for root and detached nodes).
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Next sibling node.
    pub next_sibling: Option<NodeId>,
    /// Source position, when the tokenizer provided one.
    pub span: Option<SrcSpan>,
    /// Text content range (Text nodes, and the preserved literal of a
    /// TextCitation).
    pub text: TextRange,
}

impl Node {
    /// Create a new node with default values.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            parent: None,
            first_child: None,
            next_sibling: None,
            span: None,
            text: TextRange::default(),
        }
    }

    /// Create a text node with the given range.
    pub fn text(range: TextRange) -> Self {
        Self {
            role: Role::Text,
            parent: None,
            first_child: None,
            next_sibling: None,
            span: None,
            text: range,
        }
    }

    /// Attach a source span.
    pub fn with_span(mut self, span: SrcSpan) -> Self {
        self.span = Some(span);
        self
    }
}
