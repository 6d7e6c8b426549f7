use serde::Serialize;

use crate::config::Rules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionItem {
    pub done: bool,
    pub text: String,
}

/// Checkbox lines become items; any other line in the section is ignored.
pub fn parse(lines: &[String], rules: &Rules) -> Vec<ActionItem> {
    lines
        .iter()
        .filter_map(|line| {
            let caps = rules.action_item.captures(line.trim())?;
            let text = caps.get(2)?.as_str().trim();
            if text.is_empty() {
                return None;
            }
            Some(ActionItem {
                done: caps
                    .get(1)
                    .is_some_and(|m| m.as_str().trim().eq_ignore_ascii_case("x")),
                text: text.to_string(),
            })
        })
        .collect()
}
