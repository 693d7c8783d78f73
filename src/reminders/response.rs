//! Notification responses
//!
//! Maps notification buttons to event-status changes and writes them back
//! through the persistence manager.

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::model::{ChatLogEntry, ChatRole, EventStatus};
use crate::reminders::{AlarmEdge, ReminderError, ReminderScheduler};
use crate::storage::{fields, PersistenceManager};

/// A button pressed on a routine notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Started,
    Skipped,
    Completed,
    /// Remind again after this many minutes
    Snooze(u32),
}

impl NotificationAction {
    fn label(&self) -> String {
        match self {
            NotificationAction::Started => "Started".to_string(),
            NotificationAction::Skipped => "Skipped".to_string(),
            NotificationAction::Completed => "Completed".to_string(),
            NotificationAction::Snooze(minutes) => format!("Snoozed for {} min", minutes),
        }
    }
}

impl FromStr for NotificationAction {
    type Err = ReminderError;

    /// Accepts `started`, `skipped`, `completed`, `snooze` (10 minutes) and
    /// `snooze:<minutes>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "started" | "start" => Ok(NotificationAction::Started),
            "skipped" | "skip" => Ok(NotificationAction::Skipped),
            "completed" | "done" => Ok(NotificationAction::Completed),
            "snooze" => Ok(NotificationAction::Snooze(10)),
            other => other
                .strip_prefix("snooze:")
                .and_then(|m| m.parse::<u32>().ok())
                .filter(|m| *m > 0)
                .map(NotificationAction::Snooze)
                .ok_or_else(|| ReminderError::UnknownAction(s.to_string())),
        }
    }
}

/// Status a button moves the routine to; snoozing leaves it unchanged.
pub fn status_for(action: NotificationAction) -> Option<EventStatus> {
    match action {
        NotificationAction::Started => Some(EventStatus::InProgress),
        NotificationAction::Skipped => Some(EventStatus::Skipped),
        NotificationAction::Completed => Some(EventStatus::Completed),
        NotificationAction::Snooze(_) => None,
    }
}

/// Apply a notification response: update the day's status (or re-arm the
/// alarm for a snooze) and append the response to the chat log.
///
/// Both fields are edited in place as raw JSON, so entries this crate does
/// not model (other statuses, foreign chat shapes) are kept as they are.
pub async fn record_response(
    manager: &PersistenceManager,
    scheduler: &ReminderScheduler,
    routine_id: &str,
    edge: AlarmEdge,
    date: NaiveDate,
    action: NotificationAction,
) -> Result<Option<EventStatus>, ReminderError> {
    let status = status_for(action);

    let book = match status {
        Some(status) => {
            let book = manager.load(fields::EVENT_STATUSES, Value::Null).await;
            Some(with_status(book, routine_id, date, status)?)
        }
        None => None,
    };

    let chats = manager.load(fields::NOTIFICATION_CHATS, Value::Null).await;
    let entry = ChatLogEntry::new(routine_id, ChatRole::User, action.label());
    let chats = with_chat(chats, &entry)?;

    if let NotificationAction::Snooze(minutes) = action {
        scheduler.snooze(routine_id, edge, minutes, Utc::now()).await?;
    }

    if let (Some(book), Some(status)) = (book, status) {
        manager.save(fields::EVENT_STATUSES, book).await;
        tracing::info!("Routine {} on {} is now {:?}", routine_id, date, status);
    }
    manager.save(fields::NOTIFICATION_CHATS, chats).await;

    Ok(status)
}

/// Set `book[routine_id][date]`, leaving every other entry untouched.
fn with_status(
    mut book: Value,
    routine_id: &str,
    date: NaiveDate,
    status: EventStatus,
) -> Result<Value, ReminderError> {
    if book.is_null() {
        book = Value::Object(Map::new());
    }
    let routines = book
        .as_object_mut()
        .ok_or_else(|| ReminderError::MalformedField(fields::EVENT_STATUSES.to_string()))?;

    let days = routines
        .entry(routine_id.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if days.is_null() {
        *days = Value::Object(Map::new());
    }
    let days = days.as_object_mut().ok_or_else(|| {
        ReminderError::MalformedField(format!("{}.{}", fields::EVENT_STATUSES, routine_id))
    })?;

    days.insert(date.format("%Y-%m-%d").to_string(), serde_json::to_value(status)?);
    Ok(book)
}

fn with_chat(mut chats: Value, entry: &ChatLogEntry) -> Result<Value, ReminderError> {
    if chats.is_null() {
        chats = Value::Array(Vec::new());
    }
    chats
        .as_array_mut()
        .ok_or_else(|| ReminderError::MalformedField(fields::NOTIFICATION_CHATS.to_string()))?
        .push(serde_json::to_value(entry)?);
    Ok(chats)
}
