use super::lines::{Line, Tag};
use crate::config::Rules;
use crate::utils::collapse_whitespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSpan {
    /// `None` signals a missing title; the assembler substitutes a placeholder.
    pub title: Option<String>,
    /// First word after the status marker.
    pub status: Option<String>,
    pub cursor: usize,
}

/// Collect the title between the metadata block and the status marker.
///
/// Without a status marker ahead of the first heading, only the first
/// qualifying line is taken; the rest stays in the stream as preamble.
pub fn extract(lines: &[Line], cursor: usize, rules: &Rules) -> TitleSpan {
    let rest = &lines[cursor..];
    let boundary = rest
        .iter()
        .position(|l| matches!(l.tag, Tag::Status(_) | Tag::Heading(_)));

    if let Some(end) = boundary {
        if let Tag::Status(value) = &rest[end].tag {
            let parts: Vec<&str> = rest[..end]
                .iter()
                .filter(|l| qualifies(l, rules))
                .map(|l| l.text.as_str())
                .collect();
            return TitleSpan {
                title: clean_title(&parts.join(" "), rules),
                status: value.split_whitespace().next().map(str::to_string),
                cursor: cursor + end + 1,
            };
        }
    }

    let end = boundary.unwrap_or(rest.len());
    match rest[..end].iter().position(|l| qualifies(l, rules)) {
        Some(p) => TitleSpan {
            title: clean_title(&rest[p].text, rules),
            status: None,
            cursor: cursor + p + 1,
        },
        None => TitleSpan {
            title: None,
            status: None,
            cursor,
        },
    }
}

fn qualifies(line: &Line, rules: &Rules) -> bool {
    line.tag == Tag::Body
        && !rules.is_timezone_description(&line.text)
        && !rules.title_skip.iter().any(|re| re.is_match(&line.text))
}

/// Drop known export prefixes and collapse whitespace.
pub fn clean_title(raw: &str, rules: &Rules) -> Option<String> {
    let mut title = collapse_whitespace(raw);
    for re in &rules.title_strip {
        title = re.replace(&title, "").trim().to_string();
    }
    let title = collapse_whitespace(&title);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lines::classify_lines;

    fn title_of(text: &str) -> TitleSpan {
        let rules = Rules::builtin().unwrap();
        let raw: Vec<&str> = text.lines().collect();
        let lines = classify_lines(&raw, &rules);
        extract(&lines, 0, &rules)
    }

    fn title(text: &str) -> Option<String> {
        title_of(text).title
    }

    #[test]
    fn single_line_title() {
        let span = title_of("Core node restarts on LEAP\nStatus: Draft\nOverview");
        assert_eq!(span.title.as_deref(), Some("Core node restarts on LEAP"));
        assert_eq!(span.status.as_deref(), Some("Draft"));
        assert_eq!(span.cursor, 2);
    }

    #[test]
    fn multiline_title() {
        let text = "Starting Server of users with 2i2c admin emails from admin panel fails\non earthscope\nStatus: Draft\nOverview";
        assert_eq!(
            title(text).as_deref(),
            Some("Starting Server of users with 2i2c admin emails from admin panel fails on earthscope")
        );
    }

    #[test]
    fn export_header_line_is_skipped() {
        let text = "Postmortem Report - [dubois:ephemeral] Unable to start servers - PagerDuty https://example.pagerduty.com/postmortems/1893/export\n[dubois:ephemeral] Unable to start servers\nStatus: Closed\nOverview";
        let span = title_of(text);
        assert_eq!(span.title.as_deref(), Some("[dubois:ephemeral] Unable to start servers"));
        assert_eq!(span.status.as_deref(), Some("Closed"));
    }

    #[test]
    fn no_status_marker_takes_first_line() {
        let span = title_of("Custom Incident Report\nThis is a custom document without status field\nOverview");
        assert_eq!(span.title.as_deref(), Some("Custom Incident Report"));
        assert_eq!(span.status, None);
        assert_eq!(span.cursor, 1);
    }

    #[test]
    fn blank_lines_before_status() {
        assert_eq!(title("My Incident Title\n\n\nStatus: Draft").as_deref(), Some("My Incident Title"));
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(
            title("  Title with extra    spaces\nStatus: Draft").as_deref(),
            Some("Title with extra spaces")
        );
    }

    #[test]
    fn known_prefixes_are_stripped() {
        assert_eq!(
            title("Incident report July 21 2025 - Openscapes hub pods dying\nStatus: Draft").as_deref(),
            Some("Openscapes hub pods dying")
        );
        assert_eq!(
            title("Postmortem Report - Core node restarts\nStatus: Draft").as_deref(),
            Some("Core node restarts")
        );
        assert_eq!(
            title("## EarthScope Investigation\nOverview\nThis is an addendum").as_deref(),
            Some("EarthScope Investigation")
        );
    }

    #[test]
    fn timezone_description_lines_are_not_title() {
        let text = "Hub outage\nPacific Time (US & Canada).\non staging\nStatus: Reviewed";
        assert_eq!(title(text).as_deref(), Some("Hub outage on staging"));
    }

    #[test]
    fn status_only_first_word() {
        assert_eq!(title_of("T\nStatus: Draft Reviewed").status.as_deref(), Some("Draft"));
    }

    #[test]
    fn missing_title() {
        let span = title_of("Status: Draft\nOverview\nbody");
        assert_eq!(span.title, None);
        assert_eq!(span.status.as_deref(), Some("Draft"));
        assert_eq!(span.cursor, 1);
    }
}
