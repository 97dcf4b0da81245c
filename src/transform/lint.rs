//! Schema validation.
//!
//! The extension syntax is an open substrate: a tokenizer will happily
//! produce spans with arbitrary class names and directives with arbitrary
//! names. This linter is the single place that converts "anything is
//! syntactically possible" into "only these semantic roles exist": it
//! rejects everything outside the closed schema and classifies every span
//! and directive into a closed role set, so later phases can pattern-match
//! exhaustively without defensive checks.
//!
//! The walk is pre-order, depth-first, left-to-right; the first violation
//! aborts the run. The tree is never mutated, so validating an unchanged
//! tree twice yields the same result.

use std::collections::HashMap;

use crate::model::{Document, NodeId, Role};
use crate::transform::Options;
use crate::{Error, Result};

/// Closed role of a validated span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanRole {
    /// `[text]{.newthought}`: opening phrase of a section.
    Newthought,
    /// `[text]{.cite}`: citation attribution inside an epigraph.
    Cite,
    /// `[text]{.footer}`: attribution footer inside an epigraph.
    Footer,
    /// `[text]{.margin id=... label=...}`: margin note or margin figure.
    Margin,
}

/// Closed role of a validated directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveRole {
    /// `:::epigraph`
    Epigraph,
    /// `:::fullwidth`
    Fullwidth,
    /// `:::iframe{src=...}`
    Iframe,
}

/// Role classification produced by a successful validation, keyed by node.
#[derive(Debug, Default)]
pub struct Classified {
    spans: HashMap<NodeId, SpanRole>,
    directives: HashMap<NodeId, DirectiveRole>,
}

impl Classified {
    /// The validated role of a span node.
    pub fn span_role(&self, id: NodeId) -> Option<SpanRole> {
        self.spans.get(&id).copied()
    }

    /// The validated role of a directive node.
    pub fn directive_role(&self, id: NodeId) -> Option<DirectiveRole> {
        self.directives.get(&id).copied()
    }

    /// Number of classified spans.
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Number of classified directives.
    pub fn directive_count(&self) -> usize {
        self.directives.len()
    }
}

/// Validate a document against the closed extension schema.
///
/// Returns the span/directive classification on success, or the first
/// violation in document order. Never mutates the tree.
pub fn lint(doc: &Document, options: &Options) -> Result<Classified> {
    let mut classified = Classified::default();
    check(doc, doc.root(), false, options, &mut classified)?;
    Ok(classified)
}

fn check(
    doc: &Document,
    id: NodeId,
    in_epigraph: bool,
    options: &Options,
    classified: &mut Classified,
) -> Result<()> {
    let Some(node) = doc.node(id) else {
        return Ok(());
    };

    let mut inside = in_epigraph;
    match node.role {
        Role::Heading(depth) => {
            if depth > options.section_level + 1 {
                return Err(Error::schema(
                    format!("unsupported heading of depth {depth}"),
                    node.span,
                ));
            }
        }
        Role::Span => {
            let role = classify_span(doc, id, in_epigraph)?;
            classified.spans.insert(id, role);
        }
        Role::Directive => {
            let role = classify_directive(doc, id)?;
            if role == DirectiveRole::Epigraph {
                inside = true;
            }
            classified.directives.insert(id, role);
        }
        _ => {}
    }

    for child in doc.children(id) {
        check(doc, child, inside, options, classified)?;
    }
    Ok(())
}

fn classify_span(doc: &Document, id: NodeId, in_epigraph: bool) -> Result<SpanRole> {
    let span = doc.node(id).and_then(|n| n.span);
    let classes = doc.attrs.classes(id);

    if classes.contains(&"newthought") {
        ensure_only_class(doc, id, "newthought")?;
        return Ok(SpanRole::Newthought);
    }

    if classes.contains(&"cite") {
        ensure_only_class(doc, id, "cite")?;
        if !in_epigraph {
            return Err(Error::schema(
                "unsupported cite span outside of epigraph directive",
                span,
            ));
        }
        return Ok(SpanRole::Cite);
    }

    if classes.contains(&"footer") {
        ensure_only_class(doc, id, "footer")?;
        if !in_epigraph {
            return Err(Error::schema(
                "unsupported footer span outside of epigraph directive",
                span,
            ));
        }
        return Ok(SpanRole::Footer);
    }

    if classes.contains(&"margin") {
        if classes != ["margin"] {
            return Err(Error::schema("unsupported class on margin span", span));
        }
        let extras: Vec<&str> = doc
            .attrs
            .names(id)
            .into_iter()
            .filter(|name| !matches!(*name, "class" | "id" | "label"))
            .collect();
        if !extras.is_empty() {
            return Err(Error::schema(
                format!("unsupported property on margin span: {}", extras.join(", ")),
                span,
            ));
        }
        // The id may be omitted only on a margin figure, whose identifier
        // is computed later from its image.
        if doc.attrs.id(id).is_none() && !has_image_child(doc, id) {
            return Err(Error::schema("cannot omit id on a margin span", span));
        }
        return Ok(SpanRole::Margin);
    }

    Err(Error::schema(
        format!("unsupported span with attributes {}", describe_attrs(doc, id)),
        span,
    ))
}

/// Ensure the span carries exactly `{class: "<class>"}` and nothing else.
fn ensure_only_class(doc: &Document, id: NodeId, class: &str) -> Result<()> {
    let span = doc.node(id).and_then(|n| n.span);
    if doc.attrs.classes(id) != [class] || doc.attrs.names(id) != ["class"] {
        return Err(Error::schema(
            format!("unsupported property on {class} span"),
            span,
        ));
    }
    Ok(())
}

fn classify_directive(doc: &Document, id: NodeId) -> Result<DirectiveRole> {
    let span = doc.node(id).and_then(|n| n.span);
    let name = doc.attrs.directive_name(id).unwrap_or("");

    match name {
        "epigraph" | "fullwidth" => {
            if doc.attrs.names(id) != ["name"] {
                return Err(Error::schema(
                    format!("unsupported property on {name}"),
                    span,
                ));
            }
            Ok(match name {
                "epigraph" => DirectiveRole::Epigraph,
                _ => DirectiveRole::Fullwidth,
            })
        }
        "iframe" => {
            let extras: Vec<&str> = doc
                .attrs
                .names(id)
                .into_iter()
                .filter(|attr| {
                    !matches!(
                        *attr,
                        "name" | "width" | "height" | "src" | "frameborder" | "allowfullscreen"
                    )
                })
                .collect();
            if !extras.is_empty() {
                return Err(Error::schema(
                    format!("unsupported property on iframe: {}", extras.join(", ")),
                    span,
                ));
            }
            Ok(DirectiveRole::Iframe)
        }
        "" => Err(Error::schema("unsupported unnamed directive", span)),
        other => Err(Error::schema(format!("unsupported {other} directive"), span)),
    }
}

fn has_image_child(doc: &Document, id: NodeId) -> bool {
    doc.children(id).any(|child| doc.role(child) == Role::Image)
}

fn describe_attrs(doc: &Document, id: NodeId) -> String {
    let pairs: Vec<String> = doc
        .attrs
        .names(id)
        .into_iter()
        .map(|name| {
            let value = doc.attrs.get(id, name).unwrap_or("");
            format!("{name}: {value:?}")
        })
        .collect();
    format!("{{{}}}", pairs.join(", "))
}
