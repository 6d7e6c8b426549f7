//! MyST markdown output: template substitution plus section bodies.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::{MetaField, Rules};
use crate::document::ReportDocument;
use crate::parser::extract::actions::ActionItem;
use crate::parser::extract::timeline::Timeline;
use crate::parser::extract::{Content, ReportSection};

/// `{{ name }}` or `{{ name | filter }}`
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\|\s*([a-z]+)\s*)?\}\}").unwrap()
});

pub fn render(doc: &ReportDocument, rules: &Rules) -> String {
    fill(&rules.template, &values(doc, rules))
}

/// Substitute placeholders. Unknown names render empty so a custom template
/// never leaves `{{ }}` in the output.
pub fn fill(template: &str, values: &BTreeMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let value = values.get(&caps[1]).map(String::as_str).unwrap_or("");
            match caps.get(2).map(|m| m.as_str()) {
                Some("yaml") => yaml_scalar(value),
                Some("table") => table_cell(value),
                _ => value.to_string(),
            }
        })
        .into_owned()
}

fn values<'a>(doc: &ReportDocument, rules: &Rules) -> BTreeMap<&'a str, String> {
    let mut values = BTreeMap::new();
    values.insert("title", doc.title.clone());
    values.insert("date", doc.date.map(|d| d.to_string()).unwrap_or_default());
    values.insert("slug", doc.slug.clone());
    values.insert("source_file", doc.source_file.clone());
    values.insert("source_link", format!("{}{}", rules.download_prefix, doc.source_file));
    for field in MetaField::ALL {
        values.insert(field.as_str(), doc.metadata.get(field).unwrap_or("").to_string());
    }
    values.insert("sections", render_sections(&doc.sections));
    values.insert("review_note", review_note(doc));
    values
}

/// Double-quoted YAML scalar. JSON string syntax is a subset of it, so an
/// empty value comes out as an explicit `""`.
pub fn yaml_scalar(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn table_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', "<br>")
}

fn review_note(doc: &ReportDocument) -> String {
    if doc.flags.is_empty() {
        return String::new();
    }
    let reasons: Vec<String> = doc.flags.iter().map(|f| f.to_string()).collect();
    format!(
        "\n:::{{note}}\nThis report was converted automatically and needs review: {}.\n:::\n",
        reasons.join(", ")
    )
}

/// Sections in source order. Empty ones are dropped; the preamble has no heading.
pub fn render_sections(sections: &[ReportSection]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    for s in sections {
        let body = match &s.content {
            Content::Prose(text) => text.clone(),
            Content::Timeline(t) => render_timeline(t),
            Content::Actions(items) => render_actions(items),
        };
        if body.trim().is_empty() {
            continue;
        }
        if s.section.is_preamble() {
            blocks.push(body);
        } else {
            blocks.push(format!("## {}\n\n{}", s.section.title, body));
        }
    }
    blocks.join("\n\n")
}

fn render_timeline(timeline: &Timeline) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !timeline.lead.is_empty() {
        parts.push(timeline.lead.join("\n"));
    }

    let mut i = 0;
    while i < timeline.entries.len() {
        let day = &timeline.entries[i].day;
        let run = timeline.entries[i..]
            .iter()
            .take_while(|e| &e.day == day)
            .count();
        if let Some(day) = day {
            parts.push(format!("### {}", day));
        }
        let mut table = String::from("| Time | Event |\n| --- | --- |");
        for e in &timeline.entries[i..i + run] {
            table.push_str(&format!("\n| {} | {} |", table_cell(&e.timestamp), table_cell(&e.event)));
        }
        parts.push(table);
        i += run;
    }
    parts.join("\n\n")
}

fn render_actions(items: &[ActionItem]) -> String {
    items
        .iter()
        .map(|item| format!("- [{}] {}", if item.done { "x" } else { " " }, item.text))
        .collect::<Vec<_>>()
        .join("\n")
}
