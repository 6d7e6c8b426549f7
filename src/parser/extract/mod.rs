pub mod actions;
pub mod timeline;

use serde::Serialize;

use super::sections::Section;
use crate::config::{Rules, SectionKind};
use actions::ActionItem;
use timeline::Timeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    Prose(String),
    Timeline(Timeline),
    Actions(Vec<ActionItem>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    #[serde(flatten)]
    pub section: Section,
    pub content: Content,
}

/// Parse each section's body according to its configured kind.
pub fn extract_all(sections: Vec<Section>, rules: &Rules) -> Vec<ReportSection> {
    sections
        .into_iter()
        .map(|section| {
            let content = match section.kind {
                SectionKind::Prose => Content::Prose(section.body()),
                SectionKind::Timeline => Content::Timeline(timeline::parse(section.trimmed_lines(), rules)),
                SectionKind::Actions => {
                    let items = actions::parse(section.trimmed_lines(), rules);
                    // Nothing checkbox-shaped: keep the text rather than lose it.
                    if items.is_empty() {
                        Content::Prose(section.body())
                    } else {
                        Content::Actions(items)
                    }
                }
            };
            ReportSection { section, content }
        })
        .collect()
}
