//! Fullwidth rewriting, in two independent passes.
//!
//! The retag pass turns validated `fullwidth` directives into fullwidth
//! blocks on the structural grammar. The unwrap pass runs on the rewritten
//! (rendered-role) grammar: it pushes the `fullwidth` marker class down
//! onto nested figures and code blocks, then splices the block's children
//! into its parent. The two passes are connected only by that marker
//! class.

use crate::model::{Document, NodeId, Role};
use crate::transform::lint::{Classified, DirectiveRole};

/// Retag every validated `fullwidth` directive as a fullwidth block.
pub fn retag_fullwidth(doc: &mut Document, classified: &Classified) {
    let directives: Vec<NodeId> = doc
        .iter_dfs()
        .filter(|&id| {
            doc.role(id) == Role::Directive
                && classified.directive_role(id) == Some(DirectiveRole::Fullwidth)
        })
        .collect();
    for id in directives {
        if let Some(node) = doc.node_mut(id) {
            node.role = Role::Fullwidth;
        }
        doc.attrs.add_class(id, "fullwidth");
    }
}

/// Mark figures and code blocks inside fullwidth blocks, then splice each
/// block's children into its parent at the block's position.
pub fn unwrap_fullwidth(doc: &mut Document) {
    let blocks: Vec<NodeId> = doc
        .iter_dfs()
        .filter(|&id| doc.role(id) == Role::Fullwidth)
        .collect();

    for block in blocks {
        let nested: Vec<NodeId> = doc
            .iter_subtree(block)
            .filter(|&id| matches!(doc.role(id), Role::Figure | Role::CodeBlock))
            .collect();
        for id in nested {
            doc.attrs.add_class(id, "fullwidth");
        }
        doc.unwrap(block);
    }
}
