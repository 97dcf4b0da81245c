//! Error types for document transformation.

use thiserror::Error;

use crate::model::SrcSpan;

/// Format the optional source span suffix used in error messages.
fn spanned(span: &Option<SrcSpan>) -> String {
    match span {
        Some(span) => format!(" at {span}"),
        None => String::new(),
    }
}

/// Errors that can occur while transforming a document or rendering citations.
///
/// Every variant carries a human-readable message; variants raised from a
/// specific node also carry that node's source span when the tokenizer
/// provided one.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bibliography: {0}")]
    Bibliography(#[from] serde_json::Error),

    #[error("duplicate bibliography key: {0}")]
    DuplicateKey(String),

    #[error("unknown citation key: {0}")]
    UnknownKey(String),

    #[error("{message}{}", spanned(.span))]
    Schema {
        message: String,
        span: Option<SrcSpan>,
    },

    #[error("unknown footnote {identifier}{}", spanned(.span))]
    UnknownFootnote {
        identifier: String,
        span: Option<SrcSpan>,
    },

    #[error("unexpected {role} node in footnote definition{}", spanned(.span))]
    FootnoteContent {
        role: &'static str,
        span: Option<SrcSpan>,
    },

    #[error("circular footnote reference {identifier}{}", spanned(.span))]
    FootnoteCycle {
        identifier: String,
        span: Option<SrcSpan>,
    },

    #[error("missing src on iframe directive{}", spanned(.span))]
    MissingSrc { span: Option<SrcSpan> },

    #[error("could not compute figure label{}", spanned(.span))]
    Label { span: Option<SrcSpan> },
}

impl Error {
    /// Build a schema violation error for a node.
    pub(crate) fn schema(message: impl Into<String>, span: Option<SrcSpan>) -> Self {
        Error::Schema {
            message: message.into(),
            span,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
