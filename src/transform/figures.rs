//! Figure rewriting: margin figures, inline figures, and embedded frames.
//!
//! Three shapes, processed in this order (the label collision map is
//! consumed in traversal order, so the order is part of the contract):
//!
//! - *Margin figure*: a `margin` span containing an image becomes a margin
//!   note; image titles become trailing caption text.
//! - *Inline figure*: an image (or margin note) directly inside a
//!   paragraph, section, or the root is promoted to a figure; image titles
//!   become margin-note captions.
//! - *Embedded figure*: an `iframe` directive becomes a figure wrapper
//!   holding an embed element built from its validated attributes.

use std::borrow::Cow;
use std::path::Path;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::model::{Document, Node, NodeId, Role};
use crate::transform::Context;
use crate::transform::lint::{Classified, DirectiveRole, SpanRole};
use crate::{Error, Result};

/// Rewrite all figure shapes in the document.
pub fn rewrite_figures(doc: &mut Document, classified: &Classified, ctx: &mut Context) -> Result<()> {
    rewrite_margin_figures(doc, classified, ctx)?;
    rewrite_inline_figures(doc, ctx)?;
    rewrite_embedded_figures(doc, classified)?;
    Ok(())
}

// ============================================================================
// Margin figures
// ============================================================================

fn rewrite_margin_figures(
    doc: &mut Document,
    classified: &Classified,
    ctx: &mut Context,
) -> Result<()> {
    let spans: Vec<NodeId> = doc
        .iter_dfs()
        .filter(|&id| {
            doc.role(id) == Role::Span
                && classified.span_role(id) == Some(SpanRole::Margin)
                && doc.children(id).any(|child| doc.role(child) == Role::Image)
        })
        .collect();

    for span_id in spans {
        let identifier = match doc.attrs.id(span_id) {
            Some(id) => id.to_string(),
            None => subtree_label(doc, span_id, ctx)?,
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

        reparent_children(doc, span_id, note);
        doc.replace_with(span_id, &[note]);
        append_image_titles(doc, note);
    }
    Ok(())
}

/// Insert each titled image's title as a text node directly after it.
fn append_image_titles(doc: &mut Document, note: NodeId) {
    let titled: Vec<(NodeId, String)> = doc
        .iter_subtree(note)
        .filter(|&id| doc.role(id) == Role::Image)
        .filter_map(|id| doc.attrs.title(id).map(|title| (id, title.to_string())))
        .collect();
    for (image, title) in titled {
        let range = doc.append_text(&title);
        let text = doc.alloc_node(Node::text(range));
        doc.insert_after(image, text);
    }
}

// ============================================================================
// Inline figures
// ============================================================================

fn rewrite_inline_figures(doc: &mut Document, ctx: &mut Context) -> Result<()> {
    walk_inline(doc, NodeId::ROOT, ctx)
}

/// Walk for images and margin notes sitting directly in flowing content.
/// Does not descend into margin notes: their images are not figures.
fn walk_inline(doc: &mut Document, id: NodeId, ctx: &mut Context) -> Result<()> {
    let children: Vec<NodeId> = doc.children(id).collect();
    for child in children {
        match doc.role(child) {
            Role::MarginNote => {
                if doc.role(id) == Role::Paragraph && doc.children(id).count() == 1 {
                    if let Some(node) = doc.node_mut(id) {
                        node.role = Role::Figure;
                    }
                }
            }
            Role::Image => {
                if matches!(doc.role(id), Role::Paragraph | Role::Section | Role::Root) {
                    promote_image(doc, id, child, ctx)?;
                }
            }
            _ => walk_inline(doc, child, ctx)?,
        }
    }
    Ok(())
}

fn promote_image(
    doc: &mut Document,
    parent: NodeId,
    image: NodeId,
    ctx: &mut Context,
) -> Result<()> {
    let title = doc.attrs.title(image).map(String::from);

    if doc.role(parent) == Role::Paragraph && doc.children(parent).count() == 1 {
        // The image is the paragraph's sole content: the paragraph itself
        // becomes the figure.
        if let Some(node) = doc.node_mut(parent) {
            node.role = Role::Figure;
        }
        if let Some(title) = title {
            let note = title_note(doc, image, &title, ctx)?;
            doc.append_child(parent, note);
        }
    } else {
        let figure = doc.alloc_node(Node::new(Role::Figure));
        if let Some(span) = doc.node(image).and_then(|n| n.span) {
            if let Some(node) = doc.node_mut(figure) {
                node.span = Some(span);
            }
        }
        doc.replace_with(image, &[figure]);
        doc.append_child(figure, image);
        if let Some(title) = title {
            let note = title_note(doc, image, &title, ctx)?;
            doc.append_child(figure, note);
        }
    }
    Ok(())
}

/// Build a margin note holding an image's title, labeled from the image URL.
fn title_note(doc: &mut Document, image: NodeId, title: &str, ctx: &mut Context) -> Result<NodeId> {
    let src_span = doc.node(image).and_then(|n| n.span);
    let src = doc
        .attrs
        .src(image)
        .ok_or(Error::Label { span: src_span })?;
    let identifier = ctx.resolve_label(&base_label(src));

    let note = doc.alloc_node(Node::new(Role::MarginNote));
    doc.attrs.set(note, "identifier", &identifier);
    let range = doc.append_text(title);
    let text = doc.alloc_node(Node::text(range));
    doc.append_child(note, text);
    Ok(note)
}

// ============================================================================
// Embedded figures
// ============================================================================

fn rewrite_embedded_figures(doc: &mut Document, classified: &Classified) -> Result<()> {
    let iframes: Vec<NodeId> = doc
        .iter_dfs()
        .filter(|&id| {
            doc.role(id) == Role::Directive
                && classified.directive_role(id) == Some(DirectiveRole::Iframe)
        })
        .collect();

    for id in iframes {
        let src_span = doc.node(id).and_then(|n| n.span);
        let src = doc
            .attrs
            .src(id)
            .ok_or(Error::MissingSrc { span: src_span })?
            .to_string();
        let width = doc.attrs.get(id, "width").map(String::from);
        let height = doc.attrs.get(id, "height").map(String::from);
        let frameborder = doc
            .attrs
            .get(id, "frameborder")
            .unwrap_or("0")
            .to_string();
        let allowfullscreen = doc.attrs.get(id, "allowfullscreen").map(String::from);

        if let Some(node) = doc.node_mut(id) {
            node.role = Role::Figure;
        }
        doc.attrs.add_class(id, "iframe-wrapper");

        let embed = doc.alloc_node(Node::new(Role::Embed));
        if let Some(node) = doc.node_mut(embed) {
            node.span = src_span;
        }
        if let Some(width) = width {
            doc.attrs.set(embed, "width", &width);
        }
        if let Some(height) = height {
            doc.attrs.set(embed, "height", &height);
        }
        doc.attrs.set(embed, "src", &src);
        doc.attrs.set(embed, "frameborder", &frameborder);
        if let Some(allowfullscreen) = allowfullscreen {
            doc.attrs.set(embed, "allowfullscreen", &allowfullscreen);
        }
        doc.append_child(id, embed);
    }
    Ok(())
}

// ============================================================================
// Label computation
// ============================================================================

/// Compute a collision-resolved label from the first image or link URL in a
/// subtree.
fn subtree_label(doc: &Document, id: NodeId, ctx: &mut Context) -> Result<String> {
    let url = doc.iter_subtree(id).find_map(|node| match doc.role(node) {
        Role::Image => doc.attrs.src(node),
        Role::Link => doc.attrs.href(node),
        _ => None,
    });
    match url {
        Some(url) => Ok(ctx.resolve_label(&base_label(url))),
        None => Err(Error::Label {
            span: doc.node(id).and_then(|n| n.span),
        }),
    }
}

/// Candidate label from a URL-or-path string: the final path segment,
/// percent-decoded, without its extension.
fn base_label(path_or_url: &str) -> String {
    let path: Cow<'_, str> = match Url::parse(path_or_url) {
        Ok(url) => Cow::Owned(url.path().to_string()),
        Err(_) => Cow::Borrowed(path_or_url),
    };
    let segment = path.rsplit('/').next().unwrap_or("");
    let decoded = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    let stem = Path::new(&decoded)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());
    stem.unwrap_or(decoded)
}

/// Move all children of one node onto another (which must be childless).
fn reparent_children(doc: &mut Document, from: NodeId, to: NodeId) {
    let children: Vec<NodeId> = doc.children(from).collect();
    if let Some(node) = doc.node_mut(from) {
        node.first_child = None;
    }
    for child in children {
        doc.append_child(to, child);
    }
}
