//! The aggregate report table.

use chrono::NaiveDate;
use serde::Serialize;

/// One converted report as it appears in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub date: Option<NaiveDate>,
    pub title: String,
    pub status: Option<String>,
    pub duration: Option<String>,
    pub slug: String,
    pub source_file: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReportIndex {
    entries: Vec<IndexEntry>,
}

impl ReportIndex {
    /// Newest first. Undated reports sink to the bottom; ties go by source
    /// file name so the table is stable across runs.
    pub fn build(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut entries: Vec<IndexEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.source_file.cmp(&b.source_file))
        });
        ReportIndex { entries }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, link_prefix: &str) -> String {
        let mut out = String::from("| Date | Report | Status | Duration |\n| --- | --- | --- | --- |\n");
        for e in &self.entries {
            let date = e.date.map(|d| d.to_string()).unwrap_or_default();
            out.push_str(&format!(
                "| {} | [{}]({}{}) | {} | {} |\n",
                date,
                link_text(&e.title),
                link_prefix,
                e.slug,
                cell(e.status.as_deref().unwrap_or("")),
                cell(e.duration.as_deref().unwrap_or("")),
            ));
        }
        out
    }
}

fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

fn link_text(title: &str) -> String {
    cell(title).replace('[', "\\[").replace(']', "\\]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(date: Option<(i32, u32, u32)>, source: &str) -> IndexEntry {
        let stem = source.split('.').next().unwrap();
        IndexEntry {
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            title: stem.to_string(),
            status: None,
            duration: None,
            slug: stem.to_string(),
            source_file: source.to_string(),
        }
    }

    #[test]
    fn newest_first_undated_last() {
        let index = ReportIndex::build(vec![
            entry(None, "undated.txt"),
            entry(Some((2024, 2, 11)), "older.pdf"),
            entry(Some((2025, 10, 16)), "newer.pdf"),
        ]);
        let order: Vec<&str> = index.entries().iter().map(|e| e.source_file.as_str()).collect();
        assert_eq!(order, vec!["newer.pdf", "older.pdf", "undated.txt"]);
    }

    #[test]
    fn same_date_ties_by_file_name() {
        let index = ReportIndex::build(vec![
            entry(Some((2025, 1, 1)), "b.pdf"),
            entry(None, "z.txt"),
            entry(Some((2025, 1, 1)), "a.pdf"),
            entry(None, "m.txt"),
        ]);
        let order: Vec<&str> = index.entries().iter().map(|e| e.source_file.as_str()).collect();
        assert_eq!(order, vec!["a.pdf", "b.pdf", "m.txt", "z.txt"]);
    }

    #[test]
    fn table_rows() {
        let index = ReportIndex::build(vec![IndexEntry {
            date: NaiveDate::from_ymd_opt(2025, 10, 16),
            title: "[hub] OOM | quota".to_string(),
            status: Some("Reviewed".to_string()),
            duration: Some("1h 52m".to_string()),
            slug: "2025-10-16-oom".to_string(),
            source_file: "2025-10-16-oom.pdf".to_string(),
        }]);
        assert_eq!(
            index.render("./report/"),
            "| Date | Report | Status | Duration |\n\
             | --- | --- | --- | --- |\n\
             | 2025-10-16 | [\\[hub\\] OOM \\| quota](./report/2025-10-16-oom) | Reviewed | 1h 52m |\n"
        );
    }

    #[test]
    fn empty_index_is_header_only() {
        let index = ReportIndex::build(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.render("./report/").lines().count(), 2);
    }
}
