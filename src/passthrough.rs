//! Hand-written markdown reports: copied through with their frontmatter
//! completed, never re-parsed.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{MetaField, Rules};
use crate::document::{slug_for, Flag};
use crate::error::DocumentError;
use crate::index::IndexEntry;
use crate::render::yaml_scalar;
use crate::source::RawDocument;
use crate::utils::{date_prefix, find_date, title_from_stem};

#[derive(Debug, Clone)]
pub struct Passthrough {
    pub slug: String,
    pub content: String,
    pub entry: IndexEntry,
    pub flags: Vec<Flag>,
}

/// A leading `---` block. `close` is the index of the closing delimiter line.
struct Frontmatter {
    close: usize,
    fields: BTreeMap<String, Value>,
    keys: Vec<String>,
}

impl Frontmatter {
    fn find(lines: &[String]) -> Option<Self> {
        let first = lines.first()?.trim_start_matches('\u{feff}').trim_end();
        if first != "---" {
            return None;
        }
        let close = lines
            .iter()
            .skip(1)
            .position(|l| matches!(l.trim_end(), "---" | "..."))?
            + 1;
        let yaml = lines[1..close].join("\n");
        let fields = parse_yaml_map(&yaml).unwrap_or_else(|| {
            if !yaml.trim().is_empty() {
                warn!("frontmatter is not a YAML mapping, keeping it verbatim");
            }
            BTreeMap::new()
        });
        // Top-level keys as written, so a block serde_yaml rejects still
        // isn't given a second `title:`.
        let keys = lines[1..close]
            .iter()
            .filter(|l| !l.starts_with([' ', '\t', '-', '#']))
            .filter_map(|l| l.split_once(':').map(|(k, _)| k.trim().to_string()))
            .collect();
        Some(Frontmatter { close, fields, keys })
    }

    fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key) || self.keys.iter().any(|k| k == key)
    }

    fn scalar(&self, key: &str) -> Option<String> {
        let text = match self.fields.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

fn parse_yaml_map(yaml: &str) -> Option<BTreeMap<String, Value>> {
    let yaml_value: serde_yaml::Value = serde_yaml::from_str(yaml).ok()?;
    match serde_json::to_value(yaml_value).ok()? {
        Value::Object(map) => Some(map.into_iter().collect()),
        _ => None,
    }
}

fn first_heading(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .filter_map(|l| l.trim_end().strip_prefix("# "))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

pub fn convert(raw: &RawDocument, rules: &Rules) -> Result<Passthrough, DocumentError> {
    if raw.is_blank() {
        return Err(DocumentError::Empty);
    }
    let slug = slug_for(raw)?;
    let front = Frontmatter::find(&raw.lines);
    let body = match &front {
        Some(f) => &raw.lines[f.close + 1..],
        None => &raw.lines[..],
    };
    let field = |key: &str| front.as_ref().and_then(|f| f.scalar(key));

    let mut flags = Vec::new();
    let title = match field("title").or_else(|| first_heading(body)) {
        Some(title) => title,
        None => {
            flags.push(Flag::PlaceholderTitle);
            title_from_stem(&raw.stem)
        }
    };
    let date: Option<NaiveDate> = field("date")
        .and_then(|d| find_date(&d))
        .or_else(|| date_prefix(&raw.stem));

    let has = |key: &str| front.as_ref().is_some_and(|f| f.has(key));
    let mut added: Vec<String> = Vec::new();
    if !has("title") {
        added.push(format!("title: {}", yaml_scalar(&title)));
    }
    if front.is_none() {
        if let Some(date) = date {
            added.push(format!("date: {}", date));
        }
    }
    if !has("downloads") {
        added.push("downloads:".to_string());
        added.push(format!("  - file: {}", yaml_scalar(&format!("{}{}", rules.download_prefix, raw.file_name))));
        added.push("    title: Download Source Report".to_string());
    }
    debug!(%slug, added = added.len(), "completing frontmatter");

    let mut out: Vec<&str> = Vec::with_capacity(raw.lines.len() + added.len() + 3);
    match &front {
        Some(f) => {
            out.extend(raw.lines[..f.close].iter().map(String::as_str));
            out.extend(added.iter().map(String::as_str));
            out.extend(raw.lines[f.close..].iter().map(String::as_str));
        }
        None => {
            out.push("---");
            out.extend(added.iter().map(String::as_str));
            out.push("---");
            out.push("");
            out.extend(raw.lines.iter().map(String::as_str));
        }
    }
    let mut content = out.join("\n");
    content.push('\n');

    for &expected in &rules.expected {
        if field(expected.as_str()).is_none() {
            flags.push(Flag::MissingField(expected));
        }
    }
    if date.is_none() {
        flags.push(Flag::MissingDate);
    }

    let entry = IndexEntry {
        date,
        title,
        status: field(MetaField::Status.as_str()),
        duration: field(MetaField::Duration.as_str()),
        slug: slug.clone(),
        source_file: raw.file_name.clone(),
    };
    Ok(Passthrough { slug, content, entry, flags })
}
