//! # doppel-providers
//!
//! External collaborators for Doppel: the Gemini LLM, web and video search,
//! link previews, text-to-speech, and LLM-backed summarization/translation.

pub mod gemini;
pub mod link;
pub mod llm;
pub mod search;
pub mod tts;
pub mod youtube;
