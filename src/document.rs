//! Assemble one extracted report into its final document model.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::{MetaField, Rules};
use crate::error::DocumentError;
use crate::index::IndexEntry;
use crate::parser::extract::{Content, ReportSection};
use crate::parser::metadata::Metadata;
use crate::parser::Extraction;
use crate::source::RawDocument;
use crate::utils::{date_prefix, find_date, slugify, title_from_stem};

/// Why a document converted but needs a human look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    PlaceholderTitle,
    MissingField(MetaField),
    MissingDate,
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::PlaceholderTitle => f.write_str("placeholder title"),
            Flag::MissingField(field) => write!(f, "missing {}", field),
            Flag::MissingDate => f.write_str("missing date"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub slug: String,
    pub date: Option<NaiveDate>,
    pub source_file: String,
    pub title: String,
    pub metadata: Metadata,
    pub sections: Vec<ReportSection>,
    pub flags: Vec<Flag>,
}

impl ReportDocument {
    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry {
            date: self.date,
            title: self.title.clone(),
            status: self.metadata.get(MetaField::Status).map(str::to_string),
            duration: self.metadata.get(MetaField::Duration).map(str::to_string),
            slug: self.slug.clone(),
            source_file: self.source_file.clone(),
        }
    }
}

/// Slug from the file stem; an empty one means nothing can be linked.
pub fn slug_for(raw: &RawDocument) -> Result<String, DocumentError> {
    let slug = slugify(&raw.stem);
    if slug.is_empty() {
        return Err(DocumentError::NoSlug(raw.file_name.clone()));
    }
    Ok(slug)
}

/// Combine the stage outputs with identifiers derived from the source path.
///
/// Missing pieces get placeholders and a flag rather than failing the document.
pub fn assemble(raw: &RawDocument, extraction: Extraction, rules: &Rules) -> Result<ReportDocument, DocumentError> {
    let slug = slug_for(raw)?;
    let mut flags = Vec::new();

    let title = match extraction.title {
        Some(title) => title,
        None => {
            flags.push(Flag::PlaceholderTitle);
            title_from_stem(&raw.stem)
        }
    };

    for &field in &rules.expected {
        if extraction.metadata.get(field).is_none() {
            flags.push(Flag::MissingField(field));
        }
    }

    let date = report_date(&raw.stem, &extraction.metadata, &extraction.sections);
    if date.is_none() {
        flags.push(Flag::MissingDate);
    }
    debug!(%slug, ?date, flags = flags.len(), "assembled report");

    Ok(ReportDocument {
        slug,
        date,
        source_file: raw.file_name.clone(),
        title,
        metadata: extraction.metadata,
        sections: extraction.sections,
        flags,
    })
}

/// File name prefix first, then any date in the header fields, then the first
/// timeline day header.
fn report_date(stem: &str, metadata: &Metadata, sections: &[ReportSection]) -> Option<NaiveDate> {
    date_prefix(stem)
        .or_else(|| metadata.fields().find_map(|(_, value)| find_date(value)))
        .or_else(|| {
            sections.iter().find_map(|s| match &s.content {
                Content::Timeline(t) => t.entries.iter().find_map(|e| e.day.as_deref().and_then(find_date)),
                _ => None,
            })
        })
}
