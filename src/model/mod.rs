//! Typed records
//!
//! Serde types for the known Document fields. The Document itself stays
//! untyped JSON; these are views used by the reminder and assistant code.

pub mod routine;
pub mod settings;

pub use routine::{
    ChatLogEntry, ChatRole, DiaryBook, DiaryEntry, EventStatus, Routine, StatusBook,
};
pub use settings::{Settings, Tone, UserInfo};
