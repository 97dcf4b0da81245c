//! Sectionizing: regroup the document's flat top-level block sequence into
//! section nodes.
//!
//! A single linear pass over the root's children. The grouping boundary is
//! decided purely by a local predicate (no lookahead, no backtracking): a
//! node starts a new section if it is a heading at the configured level,
//! or, when enabled, if it leads with a newthought span. The pass does not
//! descend into children beyond the leading-span probe.

use crate::model::{Document, Node, NodeId, Role};
use crate::transform::lint::{Classified, SpanRole};
use crate::transform::Options;

/// Replace the root's child sequence with section nodes, each owning a
/// contiguous run of the original top-level nodes.
///
/// Content before the first section start becomes its own leading section;
/// a document with no section starts becomes one single section.
pub fn sectionize(doc: &mut Document, options: &Options, classified: &Classified) {
    let top: Vec<NodeId> = doc.children(doc.root()).collect();

    let mut groups: Vec<Vec<NodeId>> = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    for id in top {
        if starts_section(doc, id, options, classified) && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        current.push(id);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    // Rebuild the root's child chain as one section node per group.
    if let Some(root) = doc.node_mut(NodeId::ROOT) {
        root.first_child = None;
    }
    let count = groups.len();
    for group in groups {
        let section = doc.alloc_node(Node::new(Role::Section));
        doc.append_child(NodeId::ROOT, section);
        for member in group {
            doc.append_child(section, member);
        }
    }
    tracing::debug!(sections = count, "sectionized document");
}

/// Whether a top-level node starts a new section.
fn starts_section(
    doc: &Document,
    id: NodeId,
    options: &Options,
    classified: &Classified,
) -> bool {
    if doc.role(id) == Role::Heading(options.section_level) {
        return true;
    }
    options.newthought_sections && leads_with_newthought(doc, id, classified)
}

/// Whether the node, or its first descendant found by repeatedly taking
/// the first child, is a newthought span.
fn leads_with_newthought(doc: &Document, id: NodeId, classified: &Classified) -> bool {
    if classified.span_role(id) == Some(SpanRole::Newthought) {
        return true;
    }
    match doc.node(id).and_then(|n| n.first_child) {
        Some(first) => leads_with_newthought(doc, first, classified),
        None => false,
    }
}
