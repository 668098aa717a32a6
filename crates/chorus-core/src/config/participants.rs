use serde::{Deserialize, Serialize};

use super::defaults::*;

/// One entry of the static participant registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub id: String,
    pub alias: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub emoji: String,
    /// Model override for the bound generator.
    #[serde(default)]
    pub model: Option<String>,
    /// Generator backend: "ollama", "openai", or "scripted".
    #[serde(default = "default_provider_kind")]
    pub provider: String,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Canned replies for the scripted backend.
    #[serde(default)]
    pub lines: Vec<String>,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            alias: String::new(),
            display_name: None,
            name: None,
            emoji: String::new(),
            model: None,
            provider: default_provider_kind(),
            persona: None,
            active: true,
            lines: Vec::new(),
        }
    }
}
