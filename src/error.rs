use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Problems with the recognition tables or template. Any of these aborts the
/// whole run, since every document would be parsed with the same bad rules.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid {field} pattern {pattern:?}: {source}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("section {section:?} has an empty heading variant")]
    EmptyHeading { section: String },

    #[error("section {0:?} declares no heading variants")]
    NoHeadings(String),

    #[error("section name {0:?} is declared twice")]
    DuplicateSection(String),

    #[error("heading variant {variant:?} is claimed by both {first:?} and {second:?}")]
    DuplicateHeading {
        variant: String,
        first: String,
        second: String,
    },

    #[error("metadata field {0} is declared twice")]
    DuplicateField(&'static str),

    #[error("metadata field {0} has an empty label")]
    EmptyLabel(&'static str),

    #[error("label {label:?} is claimed by both {first} and {second}")]
    DuplicateLabel {
        label: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("{0:?} is configured as both a section heading and a metadata label")]
    AmbiguousLine(String),

    #[error("actions.pattern {0:?} needs two capture groups (marker, text)")]
    ActionPattern(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("failed to read template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where in the per-document flow a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Extract,
    Segment,
    Assemble,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Read => "read",
            Stage::Extract => "text extraction",
            Stage::Segment => "segmentation",
            Stage::Assemble => "assembly",
            Stage::Write => "write",
        };
        f.write_str(s)
    }
}

/// A failure confined to one source document. The run reports it and moves on.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot read source: {0}")]
    Read(#[source] std::io::Error),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("source contains no text")]
    Empty,

    #[error("no recognized section headings (unrecognized layout)")]
    NoSections,

    #[error("cannot derive a slug from file name {0:?}")]
    NoSlug(String),

    #[error("slug {slug:?} is already taken by {other}")]
    DuplicateSlug { slug: String, other: String },

    #[error("cannot write output: {0}")]
    Write(#[source] std::io::Error),
}

impl DocumentError {
    pub fn stage(&self) -> Stage {
        match self {
            DocumentError::Read(_) => Stage::Read,
            DocumentError::Extraction(_) | DocumentError::Empty => Stage::Extract,
            DocumentError::NoSections => Stage::Segment,
            DocumentError::NoSlug(_) | DocumentError::DuplicateSlug { .. } => Stage::Assemble,
            DocumentError::Write(_) => Stage::Write,
        }
    }
}
