pub mod extract;
pub mod lines;
pub mod metadata;
pub mod sections;
pub mod title;

use crate::config::{MetaField, Rules};
use crate::error::DocumentError;
use extract::ReportSection;
use metadata::Metadata;

/// Everything the stages recovered from one document's text.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub metadata: Metadata,
    pub title: Option<String>,
    pub sections: Vec<ReportSection>,
}

/// lines → tags → metadata → title → sections → timeline / action items.
/// Each stage starts where the previous one stopped.
pub fn extract_document<S: AsRef<str>>(raw: &[S], rules: &Rules) -> Result<Extraction, DocumentError> {
    let lines = lines::classify_lines(raw, rules);
    if lines.iter().all(|l| l.is_blank()) {
        return Err(DocumentError::Empty);
    }
    let (mut metadata, cursor) = metadata::extract(&lines, rules);
    let span = title::extract(&lines, cursor, rules);
    if let Some(status) = span.status {
        metadata.insert_first(MetaField::Status, status);
    }
    let segmented = sections::segment(&lines, span.cursor, rules)?;
    for (field, value) in segmented.metadata {
        metadata.insert_first(field, value);
    }
    metadata::fill_inline(&lines, rules, &mut metadata);
    Ok(Extraction {
        metadata,
        title: span.title,
        sections: extract::extract_all(segmented.sections, rules),
    })
}
