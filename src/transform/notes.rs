//! Note rewriting: margin spans and footnote resolution.
//!
//! Margin spans (validated to carry an `id`) become margin notes in place.
//! Footnote references are resolved against their definitions: the
//! definition's content is flattened to inline-only content, copied into a
//! note, and the reference is replaced by it. References whose identifier
//! carries the reserved `mn-` prefix become margin notes; all others become
//! side notes. Consumed definitions are removed from the tree.

use std::collections::HashMap;

use crate::model::{Document, Node, NodeId, Role};
use crate::transform::lint::{Classified, SpanRole};
use crate::{Error, Result};

/// Identifier prefix reserving a footnote for the margin.
const MARGIN_NOTE_PREFIX: &str = "mn-";

/// Rewrite margin spans and resolve all footnotes.
pub fn rewrite_notes(doc: &mut Document, classified: &Classified) -> Result<()> {
    rewrite_margin_spans(doc, classified);
    resolve_footnotes(doc)
}

/// Replace every remaining margin span by a margin note carrying its `id`
/// as identifier and its optional `label`.
///
/// Runs before footnote resolution so that margin notes inside footnote
/// definitions are already in note form when definition content is copied.
fn rewrite_margin_spans(doc: &mut Document, classified: &Classified) {
    let spans: Vec<NodeId> = doc
        .iter_dfs()
        .filter(|&id| {
            doc.role(id) == Role::Span && classified.span_role(id) == Some(SpanRole::Margin)
        })
        .collect();

    for span_id in spans {
        // Margin spans without an id are margin figures, consumed earlier.
        let Some(identifier) = doc.attrs.id(span_id).map(String::from) else {
            continue;
        };
        let label = doc.attrs.label(span_id).map(String::from);
        let src_span = doc.node(span_id).and_then(|n| n.span);

        let note = doc.alloc_node(Node::new(Role::MarginNote));
        if let Some(node) = doc.node_mut(note) {
            node.span = src_span;
        }
        doc.attrs.set(note, "identifier", &identifier);
        if let Some(label) = label {
            doc.attrs.set(note, "label", &label);
        }

        let children: Vec<NodeId> = doc.children(span_id).collect();
        if let Some(node) = doc.node_mut(span_id) {
            node.first_child = None;
        }
        for child in children {
            doc.append_child(note, child);
        }
        doc.replace_with(span_id, &[note]);
    }
}

fn resolve_footnotes(doc: &mut Document) -> Result<()> {
    let mut definitions: HashMap<String, NodeId> = HashMap::new();
    for id in doc.iter_dfs().collect::<Vec<_>>() {
        if doc.role(id) == Role::FootnoteDefinition {
            if let Some(identifier) = doc.attrs.identifier(id) {
                definitions.insert(identifier.to_string(), id);
            }
        }
    }

    let references: Vec<NodeId> = doc
        .iter_dfs()
        .filter(|&id| doc.role(id) == Role::FootnoteReference)
        .collect();
    for reference in references {
        let mut stack = Vec::new();
        let note = build_note(doc, reference, &definitions, &mut stack)?;
        doc.replace_with(reference, &[note]);
    }

    // Every reference now holds a copy of its definition's content; the
    // definitions themselves are no longer part of the document.
    for &definition in definitions.values() {
        doc.replace_with(definition, &[]);
    }
    Ok(())
}

/// Build a note from a footnote reference, resolving nested references
/// recursively.
fn build_note(
    doc: &mut Document,
    reference: NodeId,
    definitions: &HashMap<String, NodeId>,
    stack: &mut Vec<String>,
) -> Result<NodeId> {
    let ref_span = doc.node(reference).and_then(|n| n.span);
    let identifier = doc
        .attrs
        .identifier(reference)
        .unwrap_or_default()
        .to_string();

    let Some(&definition) = definitions.get(&identifier) else {
        return Err(Error::UnknownFootnote {
            identifier,
            span: ref_span,
        });
    };
    if stack.contains(&identifier) {
        return Err(Error::FootnoteCycle {
            identifier,
            span: ref_span,
        });
    }
    stack.push(identifier.clone());

    let mut content = Vec::new();
    flatten_definition(doc, definition, &mut content)?;

    let role = if identifier.starts_with(MARGIN_NOTE_PREFIX) {
        Role::MarginNote
    } else {
        Role::SideNote
    };
    let note = doc.alloc_node(Node::new(role));
    if let Some(node) = doc.node_mut(note) {
        node.span = ref_span;
    }
    doc.attrs.set(note, "identifier", &identifier);
    for child in content {
        doc.append_child(note, child);
    }

    // The copied content may itself contain footnote references.
    let nested: Vec<NodeId> = doc
        .iter_subtree(note)
        .filter(|&id| doc.role(id) == Role::FootnoteReference)
        .collect();
    for inner in nested {
        let built = build_note(doc, inner, definitions, stack)?;
        doc.replace_with(inner, &[built]);
    }

    stack.pop();
    Ok(note)
}

/// Copy a definition's content as inline-only nodes: paragraphs and nested
/// definitions are unwrapped recursively; any other block content is an
/// authoring error.
fn flatten_definition(doc: &mut Document, id: NodeId, out: &mut Vec<NodeId>) -> Result<()> {
    let children: Vec<NodeId> = doc.children(id).collect();
    for child in children {
        let role = doc.role(child);
        if role.is_inline() {
            out.push(doc.copy_subtree(child));
        } else {
            match role {
                Role::Paragraph | Role::FootnoteDefinition => {
                    flatten_definition(doc, child, out)?;
                }
                other => {
                    return Err(Error::FootnoteContent {
                        role: other.name(),
                        span: doc.node(child).and_then(|n| n.span),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Options, lint};

    fn add_definition(doc: &mut Document, identifier: &str, text: &str) -> NodeId {
        let definition = doc.alloc_node(Node::new(Role::FootnoteDefinition));
        doc.append_child(NodeId::ROOT, definition);
        doc.attrs.set(definition, "identifier", identifier);
        let para = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(definition, para);
        let range = doc.append_text(text);
        let t = doc.alloc_node(Node::text(range));
        doc.append_child(para, t);
        definition
    }

    fn add_reference(doc: &mut Document, parent: NodeId, identifier: &str) -> NodeId {
        let reference = doc.alloc_node(Node::new(Role::FootnoteReference));
        doc.append_child(parent, reference);
        doc.attrs.set(reference, "identifier", identifier);
        reference
    }

    fn run(doc: &mut Document) -> Result<()> {
        let classified = lint::lint(doc, &Options::default()).unwrap();
        rewrite_notes(doc, &classified)
    }

    #[test]
    fn test_footnote_reference_becomes_sidenote() {
        let mut doc = Document::new();
        let p = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p);
        add_reference(&mut doc, p, "fn-1");
        let definition = add_definition(&mut doc, "fn-1", "the aside");

        run(&mut doc).unwrap();

        let children: Vec<_> = doc.children(p).collect();
        assert_eq!(children.len(), 1);
        let note = children[0];
        assert_eq!(doc.role(note), Role::SideNote);
        assert_eq!(doc.attrs.identifier(note), Some("fn-1"));

        // The definition content was flattened to inline content.
        let note_children: Vec<_> = doc.children(note).collect();
        assert_eq!(note_children.len(), 1);
        assert_eq!(doc.role(note_children[0]), Role::Text);
        assert_eq!(doc.text(doc.node(note_children[0]).unwrap().text), "the aside");

        // The definition is no longer in the tree.
        assert!(doc.node(definition).unwrap().parent.is_none());
        assert!(
            doc.iter_dfs()
                .all(|id| doc.role(id) != Role::FootnoteDefinition)
        );
    }

    #[test]
    fn test_margin_prefix_selects_margin_note() {
        let mut doc = Document::new();
        let p = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p);
        add_reference(&mut doc, p, "mn-aside");
        add_definition(&mut doc, "mn-aside", "in the margin");

        run(&mut doc).unwrap();

        let note = doc.children(p).next().unwrap();
        assert_eq!(doc.role(note), Role::MarginNote);
        assert_eq!(doc.attrs.identifier(note), Some("mn-aside"));
    }

    #[test]
    fn test_unknown_footnote_fails() {
        let mut doc = Document::new();
        let p = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p);
        add_reference(&mut doc, p, "missing");

        let err = run(&mut doc).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownFootnote { identifier, .. } if identifier == "missing"
        ));
    }

    #[test]
    fn test_block_content_in_definition_fails() {
        let mut doc = Document::new();
        let p = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p);
        add_reference(&mut doc, p, "fn-1");

        let definition = doc.alloc_node(Node::new(Role::FootnoteDefinition));
        doc.append_child(NodeId::ROOT, definition);
        doc.attrs.set(definition, "identifier", "fn-1");
        let code = doc.alloc_node(Node::new(Role::CodeBlock));
        doc.append_child(definition, code);

        let err = run(&mut doc).unwrap_err();
        assert!(matches!(
            err,
            Error::FootnoteContent { role, .. } if role == "code block"
        ));
    }

    #[test]
    fn test_two_references_get_independent_copies() {
        let mut doc = Document::new();
        let p1 = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p1);
        add_reference(&mut doc, p1, "fn-1");
        let p2 = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p2);
        add_reference(&mut doc, p2, "fn-1");
        add_definition(&mut doc, "fn-1", "shared");

        run(&mut doc).unwrap();

        let note1 = doc.children(p1).next().unwrap();
        let note2 = doc.children(p2).next().unwrap();
        assert_ne!(note1, note2);
        let text1 = doc.children(note1).next().unwrap();
        let text2 = doc.children(note2).next().unwrap();
        assert_ne!(text1, text2);
        assert_eq!(doc.text(doc.node(text2).unwrap().text), "shared");
    }

    #[test]
    fn test_nested_reference_is_resolved() {
        let mut doc = Document::new();
        let p = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p);
        add_reference(&mut doc, p, "outer");

        // The outer definition references the inner one mid-sentence.
        let outer = doc.alloc_node(Node::new(Role::FootnoteDefinition));
        doc.append_child(NodeId::ROOT, outer);
        doc.attrs.set(outer, "identifier", "outer");
        let para = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(outer, para);
        let range = doc.append_text("see also ");
        let t = doc.alloc_node(Node::text(range));
        doc.append_child(para, t);
        add_reference(&mut doc, para, "inner");

        add_definition(&mut doc, "inner", "the inner note");

        run(&mut doc).unwrap();

        let note = doc.children(p).next().unwrap();
        assert_eq!(doc.role(note), Role::SideNote);
        let note_children: Vec<_> = doc.children(note).collect();
        assert_eq!(note_children.len(), 2);
        assert_eq!(doc.role(note_children[1]), Role::SideNote);
        assert_eq!(doc.attrs.identifier(note_children[1]), Some("inner"));
    }

    #[test]
    fn test_reference_cycle_fails() {
        let mut doc = Document::new();
        let p = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p);
        add_reference(&mut doc, p, "a");

        let def_a = doc.alloc_node(Node::new(Role::FootnoteDefinition));
        doc.append_child(NodeId::ROOT, def_a);
        doc.attrs.set(def_a, "identifier", "a");
        let para_a = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(def_a, para_a);
        add_reference(&mut doc, para_a, "b");

        let def_b = doc.alloc_node(Node::new(Role::FootnoteDefinition));
        doc.append_child(NodeId::ROOT, def_b);
        doc.attrs.set(def_b, "identifier", "b");
        let para_b = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(def_b, para_b);
        add_reference(&mut doc, para_b, "a");

        let err = run(&mut doc).unwrap_err();
        assert!(matches!(err, Error::FootnoteCycle { .. }));
    }

    #[test]
    fn test_margin_span_becomes_margin_note() {
        let mut doc = Document::new();
        let p = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, p);
        let span = doc.alloc_node(Node::new(Role::Span));
        doc.append_child(p, span);
        doc.attrs.set(span, "class", "margin");
        doc.attrs.set(span, "id", "mn-widget");
        doc.attrs.set(span, "label", "widget");
        let range = doc.append_text("margin content");
        let t = doc.alloc_node(Node::text(range));
        doc.append_child(span, t);

        run(&mut doc).unwrap();

        let note = doc.children(p).next().unwrap();
        assert_eq!(doc.role(note), Role::MarginNote);
        assert_eq!(doc.attrs.identifier(note), Some("mn-widget"));
        assert_eq!(doc.attrs.label(note), Some("widget"));
        let content = doc.children(note).next().unwrap();
        assert_eq!(doc.text(doc.node(content).unwrap().text), "margin content");
    }
}
