//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Chorus".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_human_label() -> String {
    "You".to_string()
}

pub fn default_room() -> String {
    "main".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_context_capacity() -> usize {
    50
}

pub fn default_generation_window() -> usize {
    20
}

pub fn default_max_queue_len() -> usize {
    500
}

pub fn default_drain_pacing_ms() -> u64 {
    50
}

pub fn default_sleep_threshold() -> u32 {
    12
}

pub fn default_generation_timeout_secs() -> u64 {
    60
}

pub fn default_human_priority() -> i32 {
    1000
}

pub fn default_human_min_ms() -> u64 {
    1200
}

pub fn default_human_max_ms() -> u64 {
    4000
}

pub fn default_background_min_ms() -> u64 {
    2500
}

pub fn default_background_max_ms() -> u64 {
    8000
}

pub fn default_min_gap_ms() -> u64 {
    800
}

pub fn default_max_gap_ms() -> u64 {
    1600
}

pub fn default_mention_floor_ms() -> u64 {
    400
}

pub fn default_mention_discount() -> f64 {
    0.35
}

pub fn default_catch_up_scale_ms() -> u64 {
    1500
}

pub fn default_retry_interval_secs() -> u64 {
    30
}

pub fn default_autonomous_min_secs() -> u64 {
    20
}

pub fn default_autonomous_max_secs() -> u64 {
    60
}

pub fn default_silence_timeout_secs() -> u64 {
    120
}

pub fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

pub fn default_ollama_model() -> String {
    "llama3".to_string()
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

pub fn default_provider_kind() -> String {
    "scripted".to_string()
}
