//! Routine reminders
//!
//! Plans alarm times for routine start/end, arms them through an
//! [`AlarmSink`], and turns notification button responses into event-status
//! changes stored in the Document.

pub mod alarm;
pub mod response;

use thiserror::Error;

pub use alarm::{
    alarm_name, next_occurrence, parse_alarm_name, AlarmEdge, AlarmFired, AlarmSink,
    ReminderScheduler, TokioAlarmSink,
};
pub use response::{record_response, status_for, NotificationAction};

/// Reminder errors
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Routine {0} has no valid time for this alarm")]
    InvalidTime(String),
    #[error("Routine {0} never runs")]
    NoOccurrence(String),
    #[error("Unknown notification action: {0}")]
    UnknownAction(String),
    #[error("Stored field {0} has an unexpected shape, refusing to overwrite it")]
    MalformedField(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
