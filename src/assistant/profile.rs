//! Profile summarizer
//!
//! Compresses settings, routines and diary data into the short persona string
//! stored under `aeryth_profile_summary`.

use crate::model::{DiaryBook, DiaryEntry, Routine, Settings};

const MAX_SUMMARY_CHARS: usize = 400;
const MAX_LISTED_ROUTINES: usize = 3;
const EXCERPT_CHARS: usize = 60;

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn who(settings: &Settings) -> String {
    let name = settings.user_info.name.trim();
    let occupation = settings.user_info.occupation.trim();
    let mut who = match (name.is_empty(), occupation.is_empty()) {
        (false, false) => format!("{} ({})", name, occupation),
        (false, true) => name.to_string(),
        (true, false) => format!("A {}", occupation),
        (true, true) => "The user".to_string(),
    };

    let goals = settings.user_info.goals.trim().trim_end_matches('.');
    if !goals.is_empty() {
        who.push_str(", working toward ");
        who.push_str(goals);
    }
    who.push('.');
    who
}

fn routines_line(routines: &[Routine]) -> Option<String> {
    if routines.is_empty() {
        return None;
    }
    let listed: Vec<String> = routines
        .iter()
        .take(MAX_LISTED_ROUTINES)
        .map(|r| format!("{} ({}-{})", r.name.trim(), r.start_time, r.end_time))
        .collect();
    let mut line = format!("Keeps routines: {}", listed.join(", "));
    if routines.len() > MAX_LISTED_ROUTINES {
        line.push_str(&format!(" and {} more", routines.len() - MAX_LISTED_ROUTINES));
    }
    line.push('.');
    Some(line)
}

fn diary_line(diary: &DiaryBook) -> Option<String> {
    let entries: Vec<&DiaryEntry> = diary
        .values()
        .flat_map(|days| days.values())
        .flatten()
        .collect();
    let latest = entries.iter().max_by_key(|e| e.timestamp)?;

    let noun = if entries.len() == 1 { "entry" } else { "entries" };
    Some(format!(
        "Has written {} diary {}; latest: \"{}\".",
        entries.len(),
        noun,
        truncate_chars(latest.text.trim(), EXCERPT_CHARS)
    ))
}

pub fn summarize_profile(settings: &Settings, routines: &[Routine], diary: &DiaryBook) -> String {
    let mut parts = vec![
        who(settings),
        format!("Prefers a {} tone.", settings.aeryth_tone.adjective()),
    ];
    if let Some(line) = routines_line(routines) {
        parts.push(line);
    }
    let criteria = settings.routine_criteria.trim().trim_end_matches('.');
    if !criteria.is_empty() {
        parts.push(format!("Routine focus: {}.", criteria));
    }
    if let Some(line) = diary_line(diary) {
        parts.push(line);
    }
    truncate_chars(&parts.join(" "), MAX_SUMMARY_CHARS)
}
