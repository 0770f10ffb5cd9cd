//! Serde default functions shared by the config sections.

pub(super) fn default_true() -> bool {
    true
}
pub(super) fn default_data_dir() -> String {
    "~/.doppel".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_persona_name() -> String {
    "Manthan".to_string()
}
pub(super) fn default_bot_id() -> String {
    "bot".to_string()
}
pub(super) fn default_utc_offset() -> i32 {
    330
}
pub(super) fn default_persona_description() -> String {
    "You are Manthan, texting from your own phone. You're a developer who loves tech, AI, \
     bikes, chess and music. You talk like a real person in your twenties: short messages, \
     casual, a bit witty, Hinglish when the other person uses it."
        .to_string()
}
pub(super) fn default_silence_window() -> u64 {
    30
}
pub(super) fn default_takeover_gc() -> u64 {
    300
}
pub(super) fn default_max_group_reply() -> usize {
    600
}
pub(super) fn default_typing_base() -> u64 {
    1000
}
pub(super) fn default_typing_per_char() -> u64 {
    300
}
pub(super) fn default_typing_max() -> u64 {
    5000
}
pub(super) fn default_maintenance_interval() -> u64 {
    30
}
pub(super) fn default_temp_audio_max_age() -> u64 {
    3600
}
pub(super) fn default_db_path() -> String {
    "~/.doppel/data/memory.db".to_string()
}
pub(super) fn default_max_context() -> usize {
    10
}
pub(super) fn default_recap_threshold() -> usize {
    15
}
pub(super) fn default_recap_keep_recent() -> usize {
    5
}
pub(super) fn default_retention_days() -> i64 {
    7
}
pub(super) fn default_poll_interval() -> u64 {
    30
}
pub(super) fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}
pub(super) fn default_llm_timeout() -> u64 {
    20
}
pub(super) fn default_lookup_timeout() -> u64 {
    10
}
pub(super) fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".to_string()
}
pub(super) fn default_max_results() -> usize {
    3
}
pub(super) fn default_tts_chunk_budget() -> usize {
    200
}
pub(super) fn default_max_audio_bytes() -> usize {
    16 * 1024 * 1024
}
pub(super) fn default_console_sender() -> String {
    "console-user".to_string()
}
