use crate::config::{MetaField, Rules, SectionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Blank,
    /// A recognized metadata label such as `OWNER OF REVIEW PROCESS`.
    Label(MetaField),
    /// A recognized section heading.
    Heading(SectionId),
    /// `Status: Draft`, carrying everything after the marker.
    Status(String),
    /// `*All times listed in ...`
    Disclaimer,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub tag: Tag,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.tag == Tag::Blank
    }
}

/// Tag every line. Never fails: anything unrecognized is body text.
pub fn classify_lines<S: AsRef<str>>(lines: &[S], rules: &Rules) -> Vec<Line> {
    lines
        .iter()
        .map(|raw| {
            let text = raw.as_ref().trim();
            Line {
                tag: classify(text, rules),
                text: text.to_string(),
            }
        })
        .collect()
}

fn classify(text: &str, rules: &Rules) -> Tag {
    if text.is_empty() {
        return Tag::Blank;
    }
    if let Some(rest) = strip_prefix_ignore_case(text, &rules.status_marker) {
        return Tag::Status(rest.trim().to_string());
    }
    if text.starts_with(&rules.disclaimer_prefix) {
        return Tag::Disclaimer;
    }
    if let Some(id) = rules.heading(text) {
        return Tag::Heading(id);
    }
    if let Some(field) = rules.label(text) {
        return Tag::Label(field);
    }
    Tag::Body
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<Tag> {
        let rules = Rules::builtin().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        classify_lines(&lines, &rules).into_iter().map(|l| l.tag).collect()
    }

    #[test]
    fn blank_and_body() {
        assert_eq!(tags("hello\n   \nworld"), vec![Tag::Body, Tag::Blank, Tag::Body]);
    }

    #[test]
    fn labels_are_case_and_punctuation_tolerant() {
        assert_eq!(
            tags("OWNER OF REVIEW PROCESS\nowner of review process:\nDuration"),
            vec![
                Tag::Label(MetaField::Owner),
                Tag::Label(MetaField::Owner),
                Tag::Label(MetaField::Duration)
            ]
        );
    }

    #[test]
    fn status_marker_keeps_value() {
        assert_eq!(tags("Status: Draft"), vec![Tag::Status("Draft".to_string())]);
        assert_eq!(tags("STATUS: Reviewed"), vec![Tag::Status("Reviewed".to_string())]);
    }

    #[test]
    fn bare_status_label_is_a_label() {
        assert_eq!(tags("STATUS"), vec![Tag::Label(MetaField::Status)]);
    }

    #[test]
    fn disclaimer() {
        assert_eq!(tags("*All times listed in Pacific Time (US & Canada)."), vec![Tag::Disclaimer]);
    }

    #[test]
    fn headings() {
        let rules = Rules::builtin().unwrap();
        let overview = rules.heading("Overview").unwrap();
        let well = rules.heading("What Went Well?").unwrap();
        assert_eq!(
            tags("Overview\n## What went well\nWhat went well, mostly, was luck"),
            vec![Tag::Heading(overview), Tag::Heading(well), Tag::Body]
        );
    }

    #[test]
    fn text_is_trimmed() {
        let rules = Rules::builtin().unwrap();
        let lines = classify_lines(&["   indented body  "], &rules);
        assert_eq!(lines[0].text, "indented body");
    }
}
