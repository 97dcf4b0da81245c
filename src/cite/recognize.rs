//! Textual citation recognition.
//!
//! Recognizes the `@key [suffix]` pattern inside plain text nodes and splits
//! them into text/citation runs. Recognition is speculative: it pattern-
//! matches arbitrary prose, so a non-match simply leaves the node untouched,
//! and downstream formatting failures fall back to the literal text.

use std::sync::LazyLock;

use regex::Regex;

use super::CiteItem;
use crate::Result;
use crate::model::{Document, Node, NodeId, Role, TextRange, Visit, rewrite};

/// Matches `@key`, optionally followed by a bracketed suffix. Keys are
/// alphanumeric runs joined by single separator characters. The greedy
/// prefix means the last candidate in the node wins; the pattern is applied
/// at most once per text node.
static CITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<before>.*)@(?P<key>[A-Za-z0-9]+(?:[:.#$%&-+?<>~/][A-Za-z0-9]+)*)(?:\s*\[(?P<suffix>[^\]]+)\])?(?P<after>.*)$",
    )
    .unwrap()
});

/// Split every plain-text node containing a textual citation into
/// (before-text, citation, after-text) runs.
///
/// Code content and existing citation nodes are not scanned, and the
/// emitted runs are never re-scanned: the walker continues past the
/// replacements.
pub fn recognize_citations(doc: &mut Document) -> Result<()> {
    let mut recognized = 0usize;
    rewrite(doc, |doc, id| match doc.role(id) {
        Role::CodeBlock | Role::InlineCode | Role::Citation | Role::TextCitation => {
            Ok(Visit::SkipChildren)
        }
        Role::Text => match split_text_node(doc, id) {
            Some(replacements) => {
                recognized += 1;
                Ok(Visit::Replace(replacements))
            }
            None => Ok(Visit::Continue),
        },
        _ => Ok(Visit::Continue),
    })?;
    if recognized > 0 {
        tracing::debug!(recognized, "recognized textual citations");
    }
    Ok(())
}

/// Build the replacement runs for one text node, or None if it holds no
/// citation.
fn split_text_node(doc: &mut Document, id: NodeId) -> Option<Vec<NodeId>> {
    let node = doc.node(id)?;
    let (range, span) = (node.text, node.span);
    let text = doc.text(range).to_string();
    let captures = CITE_RE.captures(&text)?;

    let before = captures.name("before").expect("group always present");
    let key = captures.name("key").expect("group always present");
    let suffix = captures.name("suffix").map(|m| m.as_str().to_string());
    let after = captures.name("after").expect("group always present");

    // All emitted runs are sub-ranges of the original node's range; no new
    // text is appended to the buffer.
    let sub =
        |start: usize, end: usize| TextRange::new(range.start + start as u32, (end - start) as u32);

    let mut replacements = Vec::with_capacity(3);
    if !before.is_empty() {
        let mut node = Node::text(sub(before.start(), before.end()));
        node.span = span;
        replacements.push(doc.alloc_node(node));
    }

    // The citation keeps its literal `@key` text for fallback rendering.
    let mut cite = Node::new(Role::TextCitation);
    cite.text = sub(before.end(), key.end());
    cite.span = span;
    let cite_id = doc.alloc_node(cite);
    doc.set_cite_items(
        cite_id,
        vec![CiteItem {
            key: key.as_str().to_string(),
            suffix,
            author_in_text: true,
            ..Default::default()
        }],
    );
    replacements.push(cite_id);

    if !after.is_empty() {
        let mut node = Node::text(sub(after.start(), after.end()));
        node.span = span;
        replacements.push(doc.alloc_node(node));
    }

    Some(replacements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn doc_with_text(text: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let para = doc.alloc_node(Node::new(Role::Paragraph));
        doc.append_child(NodeId::ROOT, para);
        let range = doc.append_text(text);
        let node = doc.alloc_node(Node::text(range));
        doc.append_child(para, node);
        (doc, para)
    }

    fn run_text(doc: &Document, id: NodeId) -> String {
        doc.text(doc.node(id).unwrap().text).to_string()
    }

    #[test]
    fn test_splits_into_three_runs() {
        let (mut doc, para) = doc_with_text("see @doe2020 [p. 5] for details");
        recognize_citations(&mut doc).unwrap();

        let children: Vec<_> = doc.children(para).collect();
        assert_eq!(children.len(), 3);

        assert_eq!(doc.role(children[0]), Role::Text);
        assert_eq!(run_text(&doc, children[0]), "see ");

        assert_eq!(doc.role(children[1]), Role::TextCitation);
        assert_eq!(run_text(&doc, children[1]), "@doe2020");
        let items = doc.cite_items(children[1]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "doe2020");
        assert_eq!(items[0].suffix.as_deref(), Some("p. 5"));
        assert!(items[0].author_in_text);

        assert_eq!(doc.role(children[2]), Role::Text);
        assert_eq!(run_text(&doc, children[2]), " for details");
    }

    #[test]
    fn test_no_match_leaves_node_untouched() {
        let (mut doc, para) = doc_with_text("no citations here");
        recognize_citations(&mut doc).unwrap();

        let children: Vec<_> = doc.children(para).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.role(children[0]), Role::Text);
        assert_eq!(run_text(&doc, children[0]), "no citations here");
    }

    #[test]
    fn test_bare_citation_omits_empty_runs() {
        let (mut doc, para) = doc_with_text("@doe2020");
        recognize_citations(&mut doc).unwrap();

        let children: Vec<_> = doc.children(para).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.role(children[0]), Role::TextCitation);
        assert_eq!(doc.cite_items(children[0])[0].key, "doe2020");
        assert_eq!(doc.cite_items(children[0])[0].suffix, None);
    }

    #[test]
    fn test_key_with_separators() {
        let (mut doc, para) = doc_with_text("cf. @doe.smith2003 here");
        recognize_citations(&mut doc).unwrap();

        let children: Vec<_> = doc.children(para).collect();
        assert_eq!(doc.cite_items(children[1])[0].key, "doe.smith2003");
    }

    #[test]
    fn test_trailing_separator_not_part_of_key() {
        let (mut doc, para) = doc_with_text("by @doe2020. Next sentence");
        recognize_citations(&mut doc).unwrap();

        let children: Vec<_> = doc.children(para).collect();
        assert_eq!(doc.cite_items(children[1])[0].key, "doe2020");
        assert_eq!(run_text(&doc, children[2]), ". Next sentence");
    }

    #[test]
    fn test_whitespace_before_suffix_is_stripped() {
        let (mut doc, para) = doc_with_text("@doe2020   [ch. 2]");
        recognize_citations(&mut doc).unwrap();

        let children: Vec<_> = doc.children(para).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(
            doc.cite_items(children[0])[0].suffix.as_deref(),
            Some("ch. 2")
        );
    }

    #[test]
    fn test_code_content_is_not_scanned() {
        let mut doc = Document::new();
        let code = doc.alloc_node(Node::new(Role::CodeBlock));
        doc.append_child(NodeId::ROOT, code);
        let range = doc.append_text("user = fetch(@doe2020)");
        let text = doc.alloc_node(Node::text(range));
        doc.append_child(code, text);

        recognize_citations(&mut doc).unwrap();

        let children: Vec<_> = doc.children(code).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.role(children[0]), Role::Text);
    }

    #[test]
    fn test_at_most_one_citation_per_node() {
        // The greedy prefix makes the last candidate win; earlier ones are
        // left in the surrounding text untouched.
        let (mut doc, para) = doc_with_text("@first and @second");
        recognize_citations(&mut doc).unwrap();

        let children: Vec<_> = doc.children(para).collect();
        assert_eq!(children.len(), 2);
        assert_eq!(run_text(&doc, children[0]), "@first and ");
        assert_eq!(doc.cite_items(children[1])[0].key, "second");
    }

    proptest! {
        #[test]
        fn prop_never_panics(text in ".{0,120}") {
            let (mut doc, _) = doc_with_text(&text);
            recognize_citations(&mut doc).unwrap();
        }

        #[test]
        fn prop_simple_key_is_recognized(key in "[a-z][a-z0-9]{0,12}") {
            let (mut doc, para) = doc_with_text(&format!("see @{key} here"));
            recognize_citations(&mut doc).unwrap();
            let children: Vec<_> = doc.children(para).collect();
            prop_assert_eq!(children.len(), 3);
            prop_assert_eq!(doc.cite_items(children[1])[0].key.clone(), key);
        }
    }
}
