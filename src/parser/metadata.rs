use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::lines::{Line, Tag};
use crate::config::{MetaField, Rules};

/// Header fields of one report. Each field is stored at most once and the
/// first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<MetaField, String>);

impl Metadata {
    /// Store `value` unless the field is already set. Returns whether it was stored.
    pub fn insert_first(&mut self, field: MetaField, value: String) -> bool {
        if self.0.contains_key(&field) {
            debug!(%field, ignored = %value, "duplicate metadata field, keeping first value");
            return false;
        }
        self.0.insert(field, value);
        true
    }

    pub fn get(&self, field: MetaField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (MetaField, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read the metadata block at the top of the document.
///
/// Returns the fields and the index of the first line not consumed.
pub fn extract(lines: &[Line], rules: &Rules) -> (Metadata, usize) {
    let mut meta = Metadata::default();

    // A disclaimer ahead of any status marker or heading bounds the block;
    // everything before it is header material, recognized or not.
    let disclaimer = lines
        .iter()
        .take_while(|l| !matches!(l.tag, Tag::Status(_) | Tag::Heading(_)))
        .position(|l| l.tag == Tag::Disclaimer);

    let cursor = match disclaimer {
        Some(end) => {
            let mut i = 0;
            while i < end {
                match lines[i].tag {
                    Tag::Label(field) => {
                        let j = value_end(lines, i, end, rules);
                        store(field, &lines[i + 1..j], &mut meta);
                        i = j;
                    }
                    _ => {
                        if !lines[i].is_blank() {
                            debug!(line = %lines[i].text, "ignoring unrecognized header line");
                        }
                        i += 1;
                    }
                }
            }
            let (zone, next) = disclaimer_zone(lines, end, rules);
            if let Some(zone) = zone {
                meta.insert_first(MetaField::Timezone, zone);
            }
            next
        }
        None => {
            let mut i = 0;
            while i < lines.len() {
                match lines[i].tag {
                    Tag::Blank => i += 1,
                    Tag::Label(field) => {
                        let mut j = value_end(lines, i, lines.len(), rules);
                        // Running straight into the status marker would leave
                        // nothing for the title; only the first line is the value.
                        if j > i + 2 && matches!(lines.get(j).map(|l| &l.tag), Some(Tag::Status(_))) {
                            j = i + 2;
                        }
                        store(field, &lines[i + 1..j], &mut meta);
                        i = j;
                    }
                    _ => break,
                }
            }
            i
        }
    };

    (meta, cursor)
}

/// End (exclusive) of the value following the label at `at`: body lines up
/// to a blank line, another label, `end` or the configured cap.
pub(super) fn value_end(lines: &[Line], at: usize, end: usize, rules: &Rules) -> usize {
    let cap = rules.max_value_lines.unwrap_or(usize::MAX);
    let mut j = at + 1;
    while j < end && j - at - 1 < cap && lines[j].tag == Tag::Body {
        j += 1;
    }
    j
}

fn store(field: MetaField, value: &[Line], meta: &mut Metadata) {
    if value.is_empty() {
        debug!(%field, "metadata label without a value");
        return;
    }
    let text = value.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join(" ");
    meta.insert_first(field, text);
}

/// Zone named by the disclaimer at `at`, and the index after it and any
/// timezone-description continuation lines.
pub(super) fn disclaimer_zone(lines: &[Line], at: usize, rules: &Rules) -> (Option<String>, usize) {
    // "*All times listed in Pacific Time (US & Canada)." -> "Pacific Time (US & Canada)."
    let rest = &lines[at].text[rules.disclaimer_prefix.len()..];
    let mut zone = rest
        .split_whitespace()
        .skip_while(|w| matches!(w.to_ascii_lowercase().as_str(), "listed" | "are" | "in"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut j = at + 1;
    while !zone.ends_with('.') && j < lines.len() && rules.is_timezone_description(&lines[j].text) {
        if !zone.is_empty() {
            zone.push(' ');
        }
        zone.push_str(&lines[j].text);
        j += 1;
    }

    let zone = zone.trim_end_matches('.').trim();
    ((!zone.is_empty()).then(|| zone.to_string()), j)
}

/// Fill fields no label supplied from the configured inline patterns, first
/// matching body line wins (`from Sep 6 at 05:25 to Sep 6 at 10:48`).
pub fn fill_inline(lines: &[Line], rules: &Rules, meta: &mut Metadata) {
    for (field, re) in &rules.inline_fields {
        if meta.get(*field).is_some() {
            continue;
        }
        let found = lines.iter().filter(|l| l.tag == Tag::Body).find_map(|l| {
            let caps = re.captures(&l.text)?;
            caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str().trim().to_string())
        });
        if let Some(value) = found {
            debug!(%field, %value, "recovered from body text");
            meta.insert_first(*field, value);
        }
    }
}
