//! # doppel-core
//!
//! Core types, traits, configuration, and error handling for the Doppel persona.

pub mod annotation;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod traits;
