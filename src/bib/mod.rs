//! Bibliography records and loading.
//!
//! A bibliography is an ordered collection of CSL-JSON-shaped records, each
//! addressable by its citation key. It is loaded once before the transform
//! pipeline runs and treated as immutable, shared-read-only state for the
//! remainder of the run.

pub mod style;

pub use style::{AuthorDateStyle, BibliographyEntry, Style};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// A contributor name. CSL-JSON uses `family`/`given` pairs for personal
/// names and `literal` for institutional ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Name {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub given: Option<String>,
    #[serde(default)]
    pub literal: Option<String>,
}

impl Name {
    /// The display form used in short citations: family name, or the
    /// literal name for institutions.
    pub fn short(&self) -> Option<&str> {
        self.family.as_deref().or(self.literal.as_deref())
    }
}

/// A CSL-JSON date: `{"date-parts": [[year, month, day]]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateParts {
    #[serde(default, rename = "date-parts")]
    parts: Vec<Vec<i32>>,
}

impl DateParts {
    /// The year component, when present.
    pub fn year(&self) -> Option<i32> {
        self.parts.first().and_then(|p| p.first()).copied()
    }
}

/// A bibliographic record in CSL-JSON shape.
///
/// Unknown CSL fields are ignored; only the fields the built-in style
/// renders are kept. `id` is the citation key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub author: Vec<Name>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "container-title")]
    pub container_title: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub issued: Option<DateParts>,
    #[serde(default, rename = "URL")]
    pub url: Option<String>,
}

/// An ordered, key-indexed collection of bibliographic records.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl Bibliography {
    /// Build a bibliography from records, preserving order.
    ///
    /// Keys must be unique within one load; a duplicate key is a
    /// configuration error.
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), i).is_some() {
                return Err(Error::DuplicateKey(record.id.clone()));
            }
        }
        Ok(Self { records, index })
    }

    /// Load a CSL-JSON bibliography (a JSON array of records) from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let records: Vec<Record> = serde_json::from_str(&content)?;
        Self::from_records(records)
    }

    /// Look up a record by citation key.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Iterate over records in load order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the bibliography is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn record(key: &str, family: &str, year: i32) -> Record {
        Record {
            id: key.to_string(),
            author: vec![Name {
                family: Some(family.to_string()),
                ..Default::default()
            }],
            issued: Some(DateParts {
                parts: vec![vec![year]],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_records_indexes_by_key() {
        let bib = Bibliography::from_records(vec![
            record("doe2020", "Doe", 2020),
            record("smith2019", "Smith", 2019),
        ])
        .unwrap();

        assert_eq!(bib.len(), 2);
        assert_eq!(bib.get("doe2020").unwrap().author[0].short(), Some("Doe"));
        assert!(bib.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = Bibliography::from_records(vec![
            record("doe2020", "Doe", 2020),
            record("doe2020", "Doe", 2021),
        ]);
        assert!(matches!(result, Err(Error::DuplicateKey(key)) if key == "doe2020"));
    }

    #[test]
    fn test_load_csl_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{
                    "id": "kuhn1962",
                    "type": "book",
                    "author": [{{"family": "Kuhn", "given": "Thomas"}}],
                    "title": "The Structure of Scientific Revolutions",
                    "issued": {{"date-parts": [[1962]]}}
                }}
            ]"#
        )
        .unwrap();

        let bib = Bibliography::load(file.path()).unwrap();
        assert_eq!(bib.len(), 1);
        let kuhn = bib.get("kuhn1962").unwrap();
        assert_eq!(kuhn.issued.as_ref().unwrap().year(), Some(1962));
        assert_eq!(kuhn.kind.as_deref(), Some("book"));
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Bibliography::load(file.path()),
            Err(Error::Bibliography(_))
        ));
    }
}
