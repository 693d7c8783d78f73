//! Aeryth Library
//!
//! Core library for the Aeryth productivity assistant: persistence of the
//! user's Document, routine reminders and the assistant fallbacks.

pub mod assistant;
pub mod logging;
pub mod model;
pub mod reminders;
pub mod storage;
