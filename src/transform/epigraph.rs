//! Epigraph rewriting.
//!
//! A validated `epigraph` directive is retagged as a quotation block
//! carrying the `epigraph` marker class; `cite` and `footer` spans nested
//! inside it are retagged to their semantic roles in place. Content is
//! never changed.

use crate::model::{Document, NodeId, Role};
use crate::transform::lint::{Classified, DirectiveRole, SpanRole};

/// Retag every epigraph directive and its attribution spans.
pub fn rewrite_epigraphs(doc: &mut Document, classified: &Classified) {
    let epigraphs: Vec<NodeId> = doc
        .iter_dfs()
        .filter(|&id| {
            doc.role(id) == Role::Directive
                && classified.directive_role(id) == Some(DirectiveRole::Epigraph)
        })
        .collect();

    for id in epigraphs {
        if let Some(node) = doc.node_mut(id) {
            node.role = Role::Epigraph;
        }
        doc.attrs.add_class(id, "epigraph");

        let spans: Vec<(NodeId, SpanRole)> = doc
            .iter_subtree(id)
            .filter(|&child| doc.role(child) == Role::Span)
            .filter_map(|child| classified.span_role(child).map(|role| (child, role)))
            .collect();
        for (span, role) in spans {
            let retagged = match role {
                SpanRole::Cite => Role::Attribution,
                SpanRole::Footer => Role::Footer,
                SpanRole::Newthought | SpanRole::Margin => continue,
            };
            if let Some(node) = doc.node_mut(span) {
                node.role = retagged;
            }
        }
    }
}
