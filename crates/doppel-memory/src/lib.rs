//! # doppel-memory
//!
//! Persistent memory for Doppel (SQLite-backed): person profiles,
//! conversation log, recaps, safety rules, todos, and reminders.

pub mod store;
pub mod style;

pub use store::{
    MemoryStats, PersonPatch, PersonProfile, Reminder, SafetyRule, Store, TodoItem, Turn,
};
pub use style::{CommunicationStyle, Topic};
