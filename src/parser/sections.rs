use serde::Serialize;

use tracing::debug;

use super::lines::{Line, Tag};
use super::metadata::{disclaimer_zone, value_end};
use crate::config::{MetaField, Rules, SectionKind, SectionSpec};
use crate::error::DocumentError;

pub const PREAMBLE: &str = "preamble";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub title: String,
    pub kind: SectionKind,
    #[serde(skip)]
    pub lines: Vec<String>,
}

impl Section {
    fn open(spec: &SectionSpec) -> Self {
        Section {
            name: spec.name.clone(),
            title: spec.title.clone(),
            kind: spec.kind,
            lines: Vec::new(),
        }
    }

    fn preamble() -> Self {
        Section {
            name: PREAMBLE.to_string(),
            title: String::new(),
            kind: SectionKind::Prose,
            lines: Vec::new(),
        }
    }

    pub fn is_preamble(&self) -> bool {
        self.name == PREAMBLE
    }

    /// Body lines without leading or trailing blank lines.
    pub fn trimmed_lines(&self) -> &[String] {
        let start = self.lines.iter().position(|l| !l.is_empty()).unwrap_or(self.lines.len());
        let end = self.lines.iter().rposition(|l| !l.is_empty()).map_or(start, |p| p + 1);
        &self.lines[start..end]
    }

    pub fn body(&self) -> String {
        self.trimmed_lines().join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.trimmed_lines().is_empty()
    }
}

/// Sections of the body plus header fields found below the title.
#[derive(Debug, Clone, Default)]
pub struct Segmented {
    pub sections: Vec<Section>,
    /// Label/value pairs and the disclaimer zone met inside the body, in
    /// source order. They never become section text.
    pub metadata: Vec<(MetaField, String)>,
}

/// Split the stream after the title at recognized headings.
///
/// Content ahead of the first heading is kept as a preamble section. Trailing
/// sections with no body are dropped. A stream with no recognized heading at
/// all is an unrecognized layout.
pub fn segment(lines: &[Line], cursor: usize, rules: &Rules) -> Result<Segmented, DocumentError> {
    let mut out = Segmented::default();
    let mut current = Section::preamble();
    let mut matched = false;

    let mut i = cursor.min(lines.len());
    while i < lines.len() {
        let line = &lines[i];
        match line.tag {
            Tag::Heading(id) => {
                if !(current.is_preamble() && current.is_empty()) {
                    out.sections.push(current);
                }
                current = Section::open(rules.section(id));
                matched = true;
            }
            Tag::Disclaimer => {
                let (zone, next) = disclaimer_zone(lines, i, rules);
                if let Some(zone) = zone {
                    out.metadata.push((MetaField::Timezone, zone));
                }
                i = next;
                continue;
            }
            Tag::Label(field) => {
                let j = value_end(lines, i, lines.len(), rules);
                if j > i + 1 {
                    let value = lines[i + 1..j].iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join(" ");
                    debug!(%field, %value, "metadata label inside the body");
                    out.metadata.push((field, value));
                    i = j;
                    continue;
                }
                current.lines.push(line.text.clone());
            }
            _ if rules.placeholder_lines.iter().any(|p| p == &line.text) => {}
            _ => current.lines.push(line.text.clone()),
        }
        i += 1;
    }
    if !(current.is_preamble() && current.is_empty()) {
        out.sections.push(current);
    }

    if !matched {
        return Err(DocumentError::NoSections);
    }

    while out.sections.last().is_some_and(Section::is_empty) {
        out.sections.pop();
    }
    Ok(out)
}
