//! Recognition tables: section headings, metadata labels, patterns, paths and
//! the output template.
//!
//! Settings come from TOML (the embedded default or a user file) overlaid with
//! `POSTMORTEM_*` environment variables, then get compiled into [`Rules`], an
//! immutable value every pipeline stage reads.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, Environment, FileFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils::{normalize_heading, normalize_label};

pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/report.md");

/// The fixed set of metadata fields a report header can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaField {
    Owner,
    ImpactTime,
    Duration,
    Status,
    Timezone,
}

impl MetaField {
    pub const ALL: [MetaField; 5] = [
        MetaField::Owner,
        MetaField::ImpactTime,
        MetaField::Duration,
        MetaField::Status,
        MetaField::Timezone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetaField::Owner => "owner",
            MetaField::ImpactTime => "impact_time",
            MetaField::Duration => "duration",
            MetaField::Status => "status",
            MetaField::Timezone => "timezone",
        }
    }
}

impl fmt::Display for MetaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    #[default]
    Prose,
    Timeline,
    Actions,
}

/// How continuation lines of a timeline event are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Join {
    #[default]
    Newline,
    Space,
}

impl Join {
    pub fn separator(self) -> &'static str {
        match self {
            Join::Newline => "\n",
            Join::Space => " ",
        }
    }
}

// ── Raw settings, as deserialized ──

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: Paths,
    pub metadata: MetadataSettings,
    #[serde(default)]
    pub title: TitleSettings,
    pub timeline: TimelineSettings,
    #[serde(default)]
    pub segmenter: SegmenterSettings,
    pub actions: ActionSettings,
    #[serde(default)]
    pub index: IndexSettings,
    pub sections: Vec<SectionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paths {
    pub reports_dir: PathBuf,
    pub output_dir: PathBuf,
    pub index_file: String,
    #[serde(default)]
    pub template: Option<PathBuf>,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            reports_dir: PathBuf::from("reports"),
            output_dir: PathBuf::from("doc/report"),
            index_file: "report-table.txt".to_string(),
            template: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataSettings {
    /// Cap on value lines per label; 0 means a value runs to the next blank
    /// line, label or block end.
    #[serde(default)]
    pub max_value_lines: usize,
    pub status_marker: String,
    pub disclaimer_prefix: String,
    #[serde(default)]
    pub timezone_indicators: Vec<String>,
    #[serde(default)]
    pub expected: Vec<MetaField>,
    pub fields: Vec<FieldLabels>,
    #[serde(default)]
    pub inline: Vec<InlinePattern>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldLabels {
    pub field: MetaField,
    pub labels: Vec<String>,
}

/// Last-resort pattern for a field the header never labelled, searched in body text.
#[derive(Debug, Clone, Deserialize)]
pub struct InlinePattern {
    pub field: MetaField,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleSettings {
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    #[serde(default)]
    pub strip_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineSettings {
    pub timestamp_patterns: Vec<String>,
    #[serde(default)]
    pub day_header_patterns: Vec<String>,
    #[serde(default)]
    pub skip_prefixes: Vec<String>,
    #[serde(default)]
    pub join: Join,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmenterSettings {
    #[serde(default)]
    pub placeholder_lines: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionSettings {
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexSettings {
    pub link_prefix: String,
    pub download_prefix: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            link_prefix: "./report/".to_string(),
            download_prefix: "../../reports/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub kind: SectionKind,
    pub variants: Vec<String>,
}

/// Load settings from `path`, or from the embedded default table when `None`,
/// with environment overrides (`POSTMORTEM_PATHS__OUTPUT_DIR=...`).
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let builder = Config::builder();
    let builder = match path {
        Some(p) => builder.add_source(config::File::new(&p.to_string_lossy(), FileFormat::Toml)),
        None => builder.add_source(config::File::from_str(DEFAULT_CONFIG, FileFormat::Toml)),
    };
    let settings = builder
        .add_source(
            Environment::with_prefix("POSTMORTEM")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    Ok(settings.try_deserialize()?)
}

// ── Compiled rules ──

/// Index into [`Rules::sections`].
pub type SectionId = usize;

#[derive(Debug, Clone)]
pub struct Rules {
    pub sections: Vec<SectionSpec>,
    headings: BTreeMap<String, SectionId>,
    labels: BTreeMap<String, MetaField>,
    pub max_value_lines: Option<usize>,
    pub status_marker: String,
    pub disclaimer_prefix: String,
    pub timezone_indicators: Vec<String>,
    pub expected: Vec<MetaField>,
    pub inline_fields: Vec<(MetaField, Regex)>,
    pub title_skip: Vec<Regex>,
    pub title_strip: Vec<Regex>,
    pub timestamps: Vec<Regex>,
    pub day_headers: Vec<Regex>,
    pub timeline_skip_prefixes: Vec<String>,
    pub join: Join,
    pub placeholder_lines: Vec<String>,
    pub action_item: Regex,
    pub link_prefix: String,
    pub download_prefix: String,
    pub template: String,
}

impl Rules {
    /// Validate and compile settings. Every error here is fatal for the run.
    pub fn compile(settings: &Settings) -> Result<Self, ConfigError> {
        let template = match &settings.paths.template {
            Some(path) => fs::read_to_string(path).map_err(|source| ConfigError::Template {
                path: path.clone(),
                source,
            })?,
            None => DEFAULT_TEMPLATE.to_string(),
        };
        Self::compile_with_template(settings, template)
    }

    pub fn compile_with_template(settings: &Settings, template: String) -> Result<Self, ConfigError> {
        if settings.sections.is_empty() {
            return Err(ConfigError::Empty("sections"));
        }
        if settings.metadata.status_marker.trim().is_empty() {
            return Err(ConfigError::Empty("metadata.status_marker"));
        }
        if settings.metadata.disclaimer_prefix.trim().is_empty() {
            return Err(ConfigError::Empty("metadata.disclaimer_prefix"));
        }
        if settings.timeline.timestamp_patterns.is_empty() {
            return Err(ConfigError::Empty("timeline.timestamp_patterns"));
        }

        let action_item = compile("actions.pattern", &settings.actions.pattern)?;
        if action_item.captures_len() < 3 {
            return Err(ConfigError::ActionPattern(settings.actions.pattern.clone()));
        }

        let mut headings: BTreeMap<String, SectionId> = BTreeMap::new();
        for (id, spec) in settings.sections.iter().enumerate() {
            if settings.sections[..id].iter().any(|s| s.name == spec.name) {
                return Err(ConfigError::DuplicateSection(spec.name.clone()));
            }
            if spec.variants.is_empty() {
                return Err(ConfigError::NoHeadings(spec.name.clone()));
            }
            for variant in &spec.variants {
                let key = normalize_heading(variant);
                if key.is_empty() {
                    return Err(ConfigError::EmptyHeading {
                        section: spec.name.clone(),
                    });
                }
                if let Some(&prev) = headings.get(&key) {
                    // Two spellings of one section that normalize alike are harmless.
                    if prev == id {
                        continue;
                    }
                    return Err(ConfigError::DuplicateHeading {
                        variant: variant.clone(),
                        first: settings.sections[prev].name.clone(),
                        second: spec.name.clone(),
                    });
                }
                headings.insert(key, id);
            }
        }

        let mut labels: BTreeMap<String, MetaField> = BTreeMap::new();
        for (i, entry) in settings.metadata.fields.iter().enumerate() {
            let field = entry.field;
            if settings.metadata.fields[..i].iter().any(|f| f.field == field) {
                return Err(ConfigError::DuplicateField(field.as_str()));
            }
            for label in &entry.labels {
                let key = normalize_label(label);
                if key.is_empty() {
                    return Err(ConfigError::EmptyLabel(field.as_str()));
                }
                if let Some(&prev) = labels.get(&key) {
                    return Err(ConfigError::DuplicateLabel {
                        label: label.clone(),
                        first: prev.as_str(),
                        second: field.as_str(),
                    });
                }
                if headings.contains_key(&normalize_heading(label)) {
                    return Err(ConfigError::AmbiguousLine(label.clone()));
                }
                labels.insert(key, field);
            }
        }

        Ok(Rules {
            sections: settings.sections.clone(),
            headings,
            labels,
            max_value_lines: Some(settings.metadata.max_value_lines).filter(|&n| n > 0),
            status_marker: settings.metadata.status_marker.trim().to_string(),
            disclaimer_prefix: settings.metadata.disclaimer_prefix.trim().to_string(),
            timezone_indicators: settings.metadata.timezone_indicators.clone(),
            expected: settings.metadata.expected.clone(),
            inline_fields: settings
                .metadata
                .inline
                .iter()
                .map(|p| Ok((p.field, compile("metadata.inline", &p.pattern)?)))
                .collect::<Result<_, ConfigError>>()?,
            title_skip: compile_all("title.skip_patterns", &settings.title.skip_patterns)?,
            title_strip: compile_all("title.strip_patterns", &settings.title.strip_patterns)?,
            timestamps: compile_all("timeline.timestamp_patterns", &settings.timeline.timestamp_patterns)?,
            day_headers: compile_all("timeline.day_header_patterns", &settings.timeline.day_header_patterns)?,
            timeline_skip_prefixes: settings.timeline.skip_prefixes.clone(),
            join: settings.timeline.join,
            placeholder_lines: settings
                .segmenter
                .placeholder_lines
                .iter()
                .map(|l| l.trim().to_string())
                .collect(),
            action_item,
            link_prefix: settings.index.link_prefix.clone(),
            download_prefix: settings.index.download_prefix.clone(),
            template,
        })
    }

    /// The embedded default tables, without environment overrides.
    #[cfg(test)]
    pub fn builtin() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Self::compile_with_template(&settings, DEFAULT_TEMPLATE.to_string())
    }

    pub fn heading(&self, line: &str) -> Option<SectionId> {
        self.headings.get(&normalize_heading(line)).copied()
    }

    pub fn label(&self, line: &str) -> Option<MetaField> {
        self.labels.get(&normalize_label(line)).copied()
    }

    pub fn section(&self, id: SectionId) -> &SectionSpec {
        &self.sections[id]
    }

    /// A `Pacific Time (US & Canada).` style line: names a zone and ends a sentence.
    pub fn is_timezone_description(&self, line: &str) -> bool {
        line.ends_with('.')
            && self
                .timezone_indicators
                .iter()
                .any(|indicator| line.contains(indicator.as_str()))
    }

    pub fn heading_count(&self) -> usize {
        self.headings.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_all(field: &'static str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns.iter().map(|p| compile(field, p)).collect()
}
