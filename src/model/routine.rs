//! Routines, diary entries, event statuses and notification chat logs

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A recurring routine the user wants reminders for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// "HH:MM", local time
    pub start_time: String,
    /// "HH:MM", local time
    pub end_time: String,
    /// Days the routine runs; empty means every day
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Routine {
    pub fn start(&self) -> Option<NaiveTime> {
        parse_hhmm(&self.start_time)
    }

    pub fn end(&self) -> Option<NaiveTime> {
        parse_hhmm(&self.end_time)
    }

    pub fn runs_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mood: Option<String>,
}

/// routine id -> date (YYYY-MM-DD) -> entries
pub type DiaryBook = BTreeMap<String, BTreeMap<String, Vec<DiaryEntry>>>;

/// Progress of one routine on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Skipped,
}

/// routine id -> date (YYYY-MM-DD) -> status
pub type StatusBook = BTreeMap<String, BTreeMap<String, EventStatus>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Aeryth,
}

/// One line of the notification chat log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLogEntry {
    pub id: Uuid,
    pub routine_id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatLogEntry {
    pub fn new(routine_id: impl Into<String>, role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            routine_id: routine_id.into(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_routine_from_json() {
        let routine: Routine = serde_json::from_value(json!({
            "id": "r1",
            "name": "Morning run",
            "startTime": "07:30",
            "endTime": "08:15",
            "days": ["Mon", "Wed"]
        }))
        .unwrap();
        assert_eq!(routine.start(), NaiveTime::from_hms_opt(7, 30, 0));
        assert!(routine.runs_on(Weekday::Wed));
        assert!(!routine.runs_on(Weekday::Tue));
    }

    #[test]
    fn test_bad_time() {
        let routine = Routine {
            id: "r".into(),
            name: "x".into(),
            description: String::new(),
            start_time: "25:00".into(),
            end_time: "soon".into(),
            days: Vec::new(),
            color: None,
        };
        assert!(routine.start().is_none());
        assert!(routine.end().is_none());
        assert!(routine.runs_on(Weekday::Sun));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(EventStatus::InProgress).unwrap(), json!("in-progress"));
        assert_eq!(serde_json::to_value(EventStatus::NotStarted).unwrap(), json!("not-started"));
        let book: StatusBook =
            serde_json::from_value(json!({"r1": {"2024-05-01": "skipped"}})).unwrap();
        assert_eq!(book["r1"]["2024-05-01"], EventStatus::Skipped);
    }
}
