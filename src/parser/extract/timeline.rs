use serde::Serialize;

use crate::config::Rules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// Day header (`October 16, 2025`) the entry appeared under, if any.
    pub day: Option<String>,
    /// Display text only. Source timezones and formats vary too much to parse.
    pub timestamp: String,
    pub event: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    /// Text ahead of the first timestamp.
    pub lead: Vec<String>,
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.lead.is_empty() && self.entries.is_empty()
    }
}

/// Entries keep source order; out-of-order timestamps are left alone.
pub fn parse(lines: &[String], rules: &Rules) -> Timeline {
    let mut timeline = Timeline::default();
    let mut day: Option<String> = None;
    let sep = rules.join.separator();

    for line in lines {
        let text = line.trim();
        if text.is_empty()
            || rules
                .timeline_skip_prefixes
                .iter()
                .any(|p| text.starts_with(p.as_str()))
        {
            continue;
        }

        if rules.day_headers.iter().any(|re| re.is_match(text)) {
            day = Some(text.to_string());
            continue;
        }

        if let Some(m) = rules.timestamps.iter().find_map(|re| re.find(text)) {
            let event = text[m.end()..]
                .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '|' | ':' | '\u{2013}' | '\u{2014}'));
            timeline.entries.push(TimelineEntry {
                day: day.clone(),
                timestamp: m.as_str().trim().to_string(),
                event: event.trim_end().to_string(),
            });
            continue;
        }

        match timeline.entries.last_mut() {
            Some(entry) => {
                if !entry.event.is_empty() {
                    entry.event.push_str(sep);
                }
                entry.event.push_str(text);
            }
            None => timeline.lead.push(text.to_string()),
        }
    }

    timeline
}
