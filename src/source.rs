//! Source discovery and text extraction.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DocumentError;

/// PDF text layers often break URLs after the scheme.
static SPLIT_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(https?://)\s+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Text,
    /// Already MyST/markdown; passed through with frontmatter fixes only.
    Markdown,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "txt" => Some(SourceKind::Text),
            "md" => Some(SourceKind::Markdown),
            _ => None,
        }
    }
}

/// One source file's text, split into lines, plus the names derived from its path.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub file_name: String,
    pub stem: String,
    pub kind: SourceKind,
    pub lines: Vec<String>,
}

impl RawDocument {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let kind = SourceKind::from_path(path).unwrap_or(SourceKind::Text);
        let text = match kind {
            SourceKind::Pdf => {
                let bytes = fs::read(path).map_err(DocumentError::Read)?;
                pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| DocumentError::Extraction(e.to_string()))?
            }
            SourceKind::Text | SourceKind::Markdown => {
                fs::read_to_string(path).map_err(DocumentError::Read)?
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_text(&file_name, kind, &text))
    }

    pub fn from_text(file_name: &str, kind: SourceKind, text: &str) -> Self {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = match kind {
            SourceKind::Markdown => text.replace("\r\n", "\n"),
            SourceKind::Pdf | SourceKind::Text => normalize_extracted(text),
        };
        RawDocument {
            file_name: file_name.to_string(),
            stem,
            kind,
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }
}

/// Undo the usual text-layer damage: CRLF, page breaks, non-breaking spaces,
/// ligatures and URLs split after the scheme.
pub fn normalize_extracted(text: &str) -> String {
    let text = text
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FEFF}', "");
    SPLIT_URL_RE.replace_all(&text, "$1").into_owned()
}

/// Supported sources in `dir`, ordered by file name so runs are reproducible.
pub fn discover(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && SourceKind::from_path(p).is_some())
        .collect();
    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(found)
}
