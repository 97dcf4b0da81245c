//! Citation formatting interface and the built-in author-date style.
//!
//! The transform core supplies well-formed requests and treats the
//! formatter as pure given the same bibliography: the same request always
//! produces the same string.

use super::{Bibliography, DateParts, Name, Record};
use crate::cite::CiteItem;
use crate::util::escape_xml;
use crate::{Error, Result};

/// One formatted bibliography entry, keyed for downstream deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibliographyEntry {
    /// Citation key of the entry.
    pub key: String,
    /// Formatted entry as an HTML fragment.
    pub html: String,
}

/// A citation style: renders citations and bibliography entries from a
/// bibliography.
///
/// The four request forms mirror what the pipeline needs: a full combined
/// citation, an author-only fragment, a suppressed-author fragment (the two
/// halves of an author-in-text citation), and bibliography entries for a
/// set of keys.
pub trait Style {
    /// Render one combined citation for all items.
    fn citation(&self, bib: &Bibliography, items: &[CiteItem]) -> Result<String>;

    /// Render only the author of a record.
    fn author_only(&self, bib: &Bibliography, key: &str) -> Result<String>;

    /// Render one item with its author suppressed (year, prefix, suffix).
    fn suppress_author(&self, bib: &Bibliography, item: &CiteItem) -> Result<String>;

    /// Render one bibliography entry per key, in the given order.
    fn bibliography(&self, bib: &Bibliography, keys: &[&str]) -> Result<Vec<BibliographyEntry>>;
}

/// Built-in author-date style: `(Doe, 2020, p. 5)` citations and
/// `Doe, Jane (2020). Title.` bibliography entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorDateStyle;

impl AuthorDateStyle {
    fn lookup<'a>(&self, bib: &'a Bibliography, key: &str) -> Result<&'a Record> {
        bib.get(key).ok_or_else(|| Error::UnknownKey(key.to_string()))
    }

    /// Short author form: `Doe`, `Doe and Smith`, or `Doe et al.`
    fn authors(&self, record: &Record) -> String {
        let names: Vec<&str> = record.author.iter().filter_map(Name::short).collect();
        match names.as_slice() {
            [] => "Anonymous".to_string(),
            [one] => (*one).to_string(),
            [first, second] => format!("{first} and {second}"),
            [first, ..] => format!("{first} et al."),
        }
    }

    fn year(&self, record: &Record) -> String {
        record
            .issued
            .as_ref()
            .and_then(DateParts::year)
            .map(|y| y.to_string())
            .unwrap_or_else(|| "n.d.".to_string())
    }

    /// The inner text of one cited item: `[prefix ]Author, Year[, suffix]`.
    fn item_text(&self, bib: &Bibliography, item: &CiteItem) -> Result<String> {
        let record = self.lookup(bib, &item.key)?;
        let mut text = String::new();
        if let Some(prefix) = &item.prefix {
            text.push_str(prefix);
            text.push(' ');
        }
        if !item.suppress_author {
            text.push_str(&self.authors(record));
            text.push_str(", ");
        }
        text.push_str(&self.year(record));
        if let Some(suffix) = &item.suffix {
            text.push_str(", ");
            text.push_str(suffix);
        }
        Ok(text)
    }
}

impl Style for AuthorDateStyle {
    fn citation(&self, bib: &Bibliography, items: &[CiteItem]) -> Result<String> {
        let parts = items
            .iter()
            .map(|item| self.item_text(bib, item))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("({})", parts.join("; ")))
    }

    fn author_only(&self, bib: &Bibliography, key: &str) -> Result<String> {
        let record = self.lookup(bib, key)?;
        Ok(self.authors(record))
    }

    fn suppress_author(&self, bib: &Bibliography, item: &CiteItem) -> Result<String> {
        let suppressed = CiteItem {
            suppress_author: true,
            ..item.clone()
        };
        self.citation(bib, std::slice::from_ref(&suppressed))
    }

    fn bibliography(&self, bib: &Bibliography, keys: &[&str]) -> Result<Vec<BibliographyEntry>> {
        keys.iter()
            .map(|key| {
                let record = self.lookup(bib, key)?;
                Ok(BibliographyEntry {
                    key: (*key).to_string(),
                    html: self.entry_html(record),
                })
            })
            .collect()
    }
}

impl AuthorDateStyle {
    /// One bibliography entry: `Doe, Jane (2020). <em>Title</em>. Publisher.`
    fn entry_html(&self, record: &Record) -> String {
        let mut html = String::new();
        let names: Vec<String> = record
            .author
            .iter()
            .map(|name| match (&name.family, &name.given) {
                (Some(family), Some(given)) => format!("{family}, {given}"),
                (Some(family), None) => family.clone(),
                _ => name.literal.clone().unwrap_or_default(),
            })
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            html.push_str("Anonymous");
        } else {
            html.push_str(&escape_xml(&names.join("; ")));
        }
        html.push_str(&format!(" ({})", self.year(record)));
        if let Some(title) = &record.title {
            html.push_str(&format!(". <em>{}</em>", escape_xml(title)));
        }
        if let Some(container) = &record.container_title {
            html.push_str(&format!(". {}", escape_xml(container)));
        }
        if let Some(publisher) = &record.publisher {
            html.push_str(&format!(". {}", escape_xml(publisher)));
        }
        html.push('.');
        html
    }
}
