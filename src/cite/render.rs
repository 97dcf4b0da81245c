//! Citation rendering against a preloaded bibliography.
//!
//! Invoked per citation node during final serialization, after the tree
//! transform. Consumes the same run [`Context`] as the transform so that
//! repeated citations receive distinct rendering-control identifiers.

use super::CiteItem;
use crate::bib::{BibliographyEntry, Bibliography, Style};
use crate::model::{Document, NodeId, Role};
use crate::transform::Context;
use crate::util::escape_xml;
use crate::{Error, Result};

/// A fully rendered citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCitation {
    /// Unique identifier for the rendering toggle control, minted from the
    /// joined item keys plus an occurrence count.
    pub control_id: String,
    /// The short citation string shown in the text.
    pub text: String,
    /// Bibliography fragments, one per item key, each wrapped with a
    /// `data-cite-key` attribute and the `inline-bib-entry` marker class.
    pub entries: Vec<BibliographyEntry>,
}

/// Outcome of rendering a citation node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationOutput {
    /// The citation was formatted.
    Rendered(RenderedCitation),
    /// Formatting a text-derived citation failed; emit this literal text
    /// unchanged.
    Literal(String),
}

/// Render a citation node.
///
/// Structured citations (`Role::Citation`) propagate formatting errors:
/// they are explicit user intent. Text-derived citations
/// (`Role::TextCitation`) are speculative pattern matches over prose, so a
/// formatting failure recovers to the original literal text.
pub fn render_citation(
    doc: &Document,
    id: NodeId,
    bib: &Bibliography,
    style: &dyn Style,
    ctx: &mut Context,
) -> Result<CitationOutput> {
    let items = doc.cite_items(id);

    let text = match doc.role(id) {
        Role::Citation => style.citation(bib, items)?,
        Role::TextCitation => {
            let literal = doc.text(doc.node(id).map(|n| n.text).unwrap_or_default());
            match items.first().map(|item| author_in_text(bib, style, item)) {
                Some(Ok(text)) => text,
                Some(Err(err)) => {
                    tracing::debug!(%err, literal, "text citation fell back to literal");
                    return Ok(CitationOutput::Literal(literal.to_string()));
                }
                None => return Ok(CitationOutput::Literal(literal.to_string())),
            }
        }
        other => {
            let span = doc.node(id).and_then(|n| n.span);
            return Err(Error::schema(
                format!("cannot render {} node as a citation", other.name()),
                span,
            ));
        }
    };

    // Mint the control identifier after formatting succeeds, so fallbacks
    // never consume an occurrence count.
    let keys: Vec<&str> = items.iter().map(|item| item.key.as_str()).collect();
    let reference = keys.join("-");
    let count = ctx.next_reference(&reference);
    let control_id = format!("{reference}{count}");

    let entries = bibliography_fragments(bib, style, &keys)?;

    Ok(CitationOutput::Rendered(RenderedCitation {
        control_id,
        text,
        entries,
    }))
}

/// Author-in-text rendering: an author-only fragment and a
/// suppressed-author fragment, space-joined into `Doe (2020, p. 5)`.
fn author_in_text(bib: &Bibliography, style: &dyn Style, item: &CiteItem) -> Result<String> {
    let author = style.author_only(bib, &item.key)?;
    let rest = style.suppress_author(bib, item)?;
    Ok(format!("{author} {rest}"))
}

/// Render one wrapped bibliography fragment per distinct key.
fn bibliography_fragments(
    bib: &Bibliography,
    style: &dyn Style,
    keys: &[&str],
) -> Result<Vec<BibliographyEntry>> {
    let mut distinct = Vec::with_capacity(keys.len());
    for &key in keys {
        if !distinct.contains(&key) {
            distinct.push(key);
        }
    }
    let entries = style.bibliography(bib, &distinct)?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let html = format!(
                r#"<span class="inline-bib-entry" data-cite-key="{}">{}</span>"#,
                escape_xml(&entry.key),
                entry.html
            );
            BibliographyEntry {
                key: entry.key,
                html,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bib::{AuthorDateStyle, Name, Record};
    use crate::model::Node;

    fn bib() -> Bibliography {
        Bibliography::from_records(vec![
            Record {
                id: "doe2020".to_string(),
                author: vec![Name {
                    family: Some("Doe".to_string()),
                    ..Default::default()
                }],
                issued: Some(serde_json::from_str(r#"{"date-parts": [[2020]]}"#).unwrap()),
                ..Default::default()
            },
            Record {
                id: "smith2019".to_string(),
                author: vec![Name {
                    family: Some("Smith".to_string()),
                    ..Default::default()
                }],
                issued: Some(serde_json::from_str(r#"{"date-parts": [[2019]]}"#).unwrap()),
                ..Default::default()
            },
        ])
        .unwrap()
    }

    fn structured_citation(doc: &mut Document, items: Vec<CiteItem>) -> NodeId {
        let id = doc.alloc_node(Node::new(Role::Citation));
        doc.append_child(NodeId::ROOT, id);
        doc.set_cite_items(id, items);
        id
    }

    fn text_citation(doc: &mut Document, key: &str, suffix: Option<&str>) -> NodeId {
        let range = doc.append_text(&format!("@{key}"));
        let mut node = Node::new(Role::TextCitation);
        node.text = range;
        let id = doc.alloc_node(node);
        doc.append_child(NodeId::ROOT, id);
        doc.set_cite_items(
            id,
            vec![CiteItem {
                key: key.to_string(),
                suffix: suffix.map(String::from),
                author_in_text: true,
                ..Default::default()
            }],
        );
        id
    }

    fn rendered(output: CitationOutput) -> RenderedCitation {
        match output {
            CitationOutput::Rendered(rendered) => rendered,
            CitationOutput::Literal(text) => panic!("unexpected literal fallback: {text}"),
        }
    }

    #[test]
    fn test_multi_item_citation() {
        let mut doc = Document::new();
        let id = structured_citation(
            &mut doc,
            vec![CiteItem::new("doe2020"), CiteItem::new("smith2019")],
        );
        let mut ctx = Context::new();

        let out = rendered(render_citation(&doc, id, &bib(), &AuthorDateStyle, &mut ctx).unwrap());
        assert_eq!(out.text, "(Doe, 2020; Smith, 2019)");
        assert_eq!(out.control_id, "doe2020-smith20191");
        assert_eq!(out.entries.len(), 2);
        assert!(out.entries[0].html.contains(r#"data-cite-key="doe2020""#));
        assert!(out.entries[0].html.contains("inline-bib-entry"));
    }

    #[test]
    fn test_author_in_text_citation() {
        let mut doc = Document::new();
        let id = text_citation(&mut doc, "doe2020", Some("p. 5"));
        let mut ctx = Context::new();

        let out = rendered(render_citation(&doc, id, &bib(), &AuthorDateStyle, &mut ctx).unwrap());
        assert_eq!(out.text, "Doe (2020, p. 5)");
        assert_eq!(out.control_id, "doe20201");
    }

    #[test]
    fn test_repeated_citation_gets_distinct_control_ids() {
        let mut doc = Document::new();
        let first = structured_citation(&mut doc, vec![CiteItem::new("doe2020")]);
        let second = structured_citation(&mut doc, vec![CiteItem::new("doe2020")]);
        let mut ctx = Context::new();
        let b = bib();

        let out1 = rendered(render_citation(&doc, first, &b, &AuthorDateStyle, &mut ctx).unwrap());
        let out2 = rendered(render_citation(&doc, second, &b, &AuthorDateStyle, &mut ctx).unwrap());
        assert_eq!(out1.control_id, "doe20201");
        assert_eq!(out2.control_id, "doe20202");
    }

    #[test]
    fn test_text_citation_falls_back_to_literal() {
        let mut doc = Document::new();
        let id = text_citation(&mut doc, "unknown99", None);
        let mut ctx = Context::new();

        let out = render_citation(&doc, id, &bib(), &AuthorDateStyle, &mut ctx).unwrap();
        assert_eq!(out, CitationOutput::Literal("@unknown99".to_string()));

        // The fallback consumed no occurrence count.
        let ok = text_citation(&mut doc, "doe2020", None);
        let out = rendered(render_citation(&doc, ok, &bib(), &AuthorDateStyle, &mut ctx).unwrap());
        assert_eq!(out.control_id, "doe20201");
    }

    #[test]
    fn test_structured_citation_propagates_unknown_key() {
        let mut doc = Document::new();
        let id = structured_citation(&mut doc, vec![CiteItem::new("unknown99")]);
        let mut ctx = Context::new();

        let result = render_citation(&doc, id, &bib(), &AuthorDateStyle, &mut ctx);
        assert!(matches!(result, Err(Error::UnknownKey(key)) if key == "unknown99"));
    }

    #[test]
    fn test_duplicate_keys_deduplicated_in_fragments() {
        let mut doc = Document::new();
        let id = structured_citation(
            &mut doc,
            vec![CiteItem::new("doe2020"), CiteItem::new("doe2020")],
        );
        let mut ctx = Context::new();

        let out = rendered(render_citation(&doc, id, &bib(), &AuthorDateStyle, &mut ctx).unwrap());
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.control_id, "doe2020-doe20201");
    }
}
