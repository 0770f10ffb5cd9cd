//! # doppel-channels
//!
//! Messaging channel integrations for Doppel. Real WhatsApp/Instagram
//! transports plug in behind the `Channel` trait; the console channel ships
//! for local use.

pub mod console;
