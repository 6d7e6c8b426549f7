//! The batch: discover sources, convert each one independently, write the
//! outputs, then fold every surviving entry into the index table.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::Rules;
use crate::document::{self, Flag};
use crate::error::DocumentError;
use crate::index::{IndexEntry, ReportIndex};
use crate::parser;
use crate::passthrough;
use crate::render;
use crate::source::{self, RawDocument, SourceKind};

/// A document ready to be written.
#[derive(Debug, Clone)]
pub struct Converted {
    pub slug: String,
    pub content: String,
    pub entry: IndexEntry,
    pub flags: Vec<Flag>,
}

pub fn convert(raw: &RawDocument, rules: &Rules) -> Result<Converted, DocumentError> {
    match raw.kind {
        SourceKind::Markdown => {
            let p = passthrough::convert(raw, rules)?;
            Ok(Converted {
                slug: p.slug,
                content: p.content,
                entry: p.entry,
                flags: p.flags,
            })
        }
        SourceKind::Pdf | SourceKind::Text => {
            let extraction = parser::extract_document(&raw.lines, rules)?;
            let doc = document::assemble(raw, extraction, rules)?;
            Ok(Converted {
                content: render::render(&doc, rules),
                entry: doc.index_entry(),
                slug: doc.slug,
                flags: doc.flags,
            })
        }
    }
}

#[derive(Debug)]
pub enum Status {
    Converted,
    Degraded(Vec<Flag>),
    Skipped(DocumentError),
}

#[derive(Debug)]
pub struct Outcome {
    pub source_file: String,
    pub status: Status,
    pub entry: Option<IndexEntry>,
}

#[derive(Debug, Clone)]
pub struct RunPaths {
    pub reports_dir: PathBuf,
    pub output_dir: PathBuf,
    pub index_file: PathBuf,
}

#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
    pub index_path: PathBuf,
    pub indexed: usize,
}

impl RunReport {
    pub fn converted(&self) -> usize {
        self.count(|s| matches!(s, Status::Converted))
    }

    pub fn degraded(&self) -> usize {
        self.count(|s| matches!(s, Status::Degraded(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, Status::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&Status) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    /// One row per source in processing order, then the totals line.
    pub fn render(&self) -> String {
        let mut out = format!("{:<40} | {:<8} | {:<16} | {}\n", "Source", "Result", "Stage", "Detail");
        out.push_str(&"-".repeat(100));
        out.push('\n');
        for o in &self.outcomes {
            let (result, stage, detail) = match &o.status {
                Status::Converted => ("ok", String::new(), String::new()),
                Status::Degraded(flags) => (
                    "degraded",
                    String::new(),
                    flags.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(", "),
                ),
                Status::Skipped(err) => ("skipped", err.stage().to_string(), err.to_string()),
            };
            let row = format!("{:<40} | {:<8} | {:<16} | {}", truncate(&o.source_file, 40), result, stage, detail);
            out.push_str(row.trim_end());
            out.push('\n');
        }
        out.push_str(&format!(
            "\nConverted {} reports ({} need review), skipped {}. Index: {} rows in {}\n",
            self.converted() + self.degraded(),
            self.degraded(),
            self.skipped(),
            self.indexed,
            self.index_path.display(),
        ));
        out
    }
}

pub fn run(rules: &Rules, paths: &RunPaths) -> anyhow::Result<RunReport> {
    let sources = source::discover(&paths.reports_dir)
        .with_context(|| format!("cannot list {}", paths.reports_dir.display()))?;
    fs::create_dir_all(&paths.output_dir)
        .with_context(|| format!("cannot create {}", paths.output_dir.display()))?;
    info!(count = sources.len(), dir = %paths.reports_dir.display(), "converting reports");

    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    // slug -> source file that claimed it
    let mut claimed: BTreeMap<String, String> = BTreeMap::new();
    let mut outcomes = Vec::with_capacity(sources.len());
    for path in &sources {
        let outcome = process(path, rules, &paths.output_dir, &mut claimed);
        match &outcome.status {
            Status::Converted => debug!(source = %outcome.source_file, "converted"),
            Status::Degraded(flags) => warn!(source = %outcome.source_file, ?flags, "converted with placeholders"),
            Status::Skipped(err) => {
                warn!(source = %outcome.source_file, stage = %err.stage(), error = %err, "skipped")
            }
        }
        outcomes.push(outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let index = ReportIndex::build(outcomes.iter().filter_map(|o| o.entry.clone()));
    let index_path = paths.output_dir.join(&paths.index_file);
    fs::write(&index_path, index.render(&rules.link_prefix))
        .with_context(|| format!("cannot write {}", index_path.display()))?;
    info!(rows = index.len(), path = %index_path.display(), "wrote index");

    Ok(RunReport {
        outcomes,
        index_path,
        indexed: index.len(),
    })
}

fn process(
    path: &Path,
    rules: &Rules,
    output_dir: &Path,
    claimed: &mut BTreeMap<String, String>,
) -> Outcome {
    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let result = RawDocument::load(path)
        .and_then(|raw| convert(&raw, rules))
        .and_then(|c| {
            if let Some(other) = claimed.get(&c.slug) {
                return Err(DocumentError::DuplicateSlug {
                    slug: c.slug.clone(),
                    other: other.clone(),
                });
            }
            fs::write(output_dir.join(format!("{}.md", c.slug)), &c.content).map_err(DocumentError::Write)?;
            claimed.insert(c.slug.clone(), source_file.clone());
            Ok(c)
        });

    match result {
        Ok(c) => Outcome {
            source_file,
            status: if c.flags.is_empty() {
                Status::Converted
            } else {
                Status::Degraded(c.flags)
            },
            entry: Some(c.entry),
        },
        Err(err) => Outcome {
            source_file,
            status: Status::Skipped(err),
            entry: None,
        },
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const OOM: &str = "2025-10-16-oom-quota-enforcer.txt";
    const NODE_POOL: &str = "2024-03-01-node-pool-exhaustion.md";

    fn reports() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in [OOM, NODE_POOL] {
            fs::copy(format!("tests/fixtures/{}", name), dir.path().join(name)).unwrap();
        }
        fs::write(
            dir.path().join("2024-05-20-untitled.txt"),
            "Status: Draft\nOverview\nSomething broke and was fixed.\n",
        )
        .unwrap();
        fs::write(dir.path().join("2023-01-01-meeting-notes.txt"), "Agenda\nLunch\n").unwrap();
        fs::write(dir.path().join("2022-02-02-empty.txt"), "\n\n").unwrap();
        dir
    }

    fn run_into(src: &Path, out: &Path) -> RunReport {
        let rules = Rules::builtin().unwrap();
        let paths = RunPaths {
            reports_dir: src.to_path_buf(),
            output_dir: out.to_path_buf(),
            index_file: PathBuf::from("report-table.txt"),
        };
        run(&rules, &paths).unwrap()
    }

    #[test]
    fn batch_converts_and_indexes() {
        let src = reports();
        let out = tempfile::tempdir().unwrap();
        let report = run_into(src.path(), out.path());

        assert_eq!(report.converted(), 2);
        assert_eq!(report.degraded(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.indexed, 3);

        let skipped: Vec<(&str, String)> = report
            .outcomes
            .iter()
            .filter_map(|o| match &o.status {
                Status::Skipped(e) => Some((o.source_file.as_str(), e.stage().to_string())),
                _ => None,
            })
            .collect();
        assert_eq!(
            skipped,
            vec![
                ("2022-02-02-empty.txt", "text extraction".to_string()),
                ("2023-01-01-meeting-notes.txt", "segmentation".to_string()),
            ]
        );

        let table = fs::read_to_string(out.path().join("report-table.txt")).unwrap();
        assert_eq!(
            table,
            "| Date | Report | Status | Duration |\n\
             | --- | --- | --- | --- |\n\
             | 2025-10-16 | [OOM kills on the quota enforcer take down hub spawning](./report/2025-10-16-oom-quota-enforcer) | Reviewed | 1h 52m |\n\
             | 2024-05-20 | [Untitled](./report/2024-05-20-untitled) | Draft |  |\n\
             | 2024-03-01 | [Node pool exhaustion on the shared cluster](./report/2024-03-01-node-pool-exhaustion) | Resolved | 3h 10m |\n"
        );
        assert!(!out.path().join("2023-01-01-meeting-notes.md").exists());
    }

    #[test]
    fn report_lists_every_source() {
        let src = reports();
        let out = tempfile::tempdir().unwrap();
        let report = run_into(src.path(), out.path());
        let text = report.render();

        let rows: Vec<&str> = text.lines().skip(2).take_while(|l| !l.is_empty()).collect();
        assert_eq!(rows.len(), report.outcomes.len());
        for (row, o) in rows.iter().zip(&report.outcomes) {
            assert!(row.starts_with(&o.source_file), "{row}");
        }
        assert!(text.contains(&format!("{:<40} | ok", OOM)));
        assert!(text.contains(&format!("{:<40} | ok", NODE_POOL)));
        assert!(text.contains(&format!("{:<40} | degraded | {:<16} | placeholder title", "2024-05-20-untitled.txt", "")));
        assert!(text.contains(&format!("{:<40} | skipped  | segmentation", "2023-01-01-meeting-notes.txt")));
        assert!(text.ends_with(&format!(
            "\nConverted 3 reports (1 need review), skipped 2. Index: 3 rows in {}\n",
            report.index_path.display()
        )));
    }

    #[test]
    fn rendered_report_from_export() {
        let src = reports();
        let out = tempfile::tempdir().unwrap();
        run_into(src.path(), out.path());

        let md = fs::read_to_string(out.path().join("2025-10-16-oom-quota-enforcer.md")).unwrap();
        assert!(md.starts_with(
            "---\ntitle: \"OOM kills on the quota enforcer take down hub spawning\"\ndate: 2025-10-16\nstatus: \"Reviewed\"\n"
        ));
        assert!(md.contains("  - file: \"../../reports/2025-10-16-oom-quota-enforcer.txt\"\n"));
        assert!(md.contains("| **Review Owner** | Jordan Rivera |"));
        assert!(md.contains("| **Timezone** | Pacific Time (US & Canada) |"));
        assert!(!md.contains("Where We Got Lucky"));
        assert!(md.contains("## Action Items\n\n- [ ] Add a memory alert for the quota enforcer\n- [x] Raise"));
        assert!(md.contains("### October 16, 2025\n\n| Time | Event |"));
        assert!(md.contains("| 3:41 PM | Engineer notices pods restarting with<br>\"OOMKilled\" |"));
        assert!(!md.contains("INCIDENT #4821"));
        assert!(!md.contains(":::{note}"));
    }

    #[test]
    fn missing_title_renders_with_placeholder_and_note() {
        let src = reports();
        let out = tempfile::tempdir().unwrap();
        let report = run_into(src.path(), out.path());

        let outcome = report
            .outcomes
            .iter()
            .find(|o| o.source_file == "2024-05-20-untitled.txt")
            .unwrap();
        assert!(matches!(&outcome.status, Status::Degraded(flags) if flags == &vec![Flag::PlaceholderTitle]));

        let md = fs::read_to_string(out.path().join("2024-05-20-untitled.md")).unwrap();
        assert!(md.contains("title: \"Untitled\""));
        assert!(md.contains(":::{note}"));
        assert!(md.contains("## Overview\n\nSomething broke and was fixed.\n"));
    }

    #[test]
    fn runs_are_byte_identical() {
        let src = reports();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        run_into(src.path(), first.path());
        run_into(src.path(), second.path());

        let mut names: Vec<_> = fs::read_dir(first.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        names.sort();
        assert_eq!(names.len(), 4);
        for name in names {
            let a = fs::read(first.path().join(&name)).unwrap();
            let b = fs::read(second.path().join(&name)).unwrap();
            assert_eq!(a, b, "{:?} differs between runs", name);
        }
    }

    #[test]
    fn colliding_slugs_keep_the_first_source() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("2024-01-01-x.md"), "# From markdown\n").unwrap();
        fs::write(src.path().join("2024-01-01-x.txt"), "From text\nStatus: Draft\nOverview\ny\n").unwrap();
        let out = tempfile::tempdir().unwrap();
        let report = run_into(src.path(), out.path());

        assert_eq!(report.indexed, 1);
        assert!(matches!(
            &report.outcomes[1].status,
            Status::Skipped(DocumentError::DuplicateSlug { other, .. }) if other == "2024-01-01-x.md"
        ));
        let md = fs::read_to_string(out.path().join("2024-01-01-x.md")).unwrap();
        assert!(md.contains("# From markdown"));
    }

    #[test]
    fn truncates_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
