use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::ParticipantConfig, error::ChorusError};

/// Lowercase and strip everything except `[a-z0-9]`.
///
/// Mention handles, aliases, and display names are all compared in this form.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// A simulated chat participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    /// Handle used in `@mentions` and as the sender label.
    pub alias: String,
    pub normalized_alias: String,
    /// Optional longer display name (may contain spaces, e.g. "Claude Sonnet").
    #[serde(default)]
    pub display_name: Option<String>,
    /// Optional raw name from the registry.
    #[serde(default)]
    pub name: Option<String>,
    /// Model / reference key of the bound generator.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub persona: Option<String>,
    pub active: bool,
    /// True while exactly one generation call is outstanding.
    pub generating: bool,
    #[serde(default)]
    pub last_response_at: Option<DateTime<Utc>>,
    /// Only meaningful inside a background pass.
    #[serde(default)]
    pub just_responded: bool,
}

impl Participant {
    /// Create an active, idle participant.
    pub fn new(id: impl Into<String>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            id: id.into(),
            normalized_alias: normalize(&alias),
            alias,
            display_name: None,
            name: None,
            model: None,
            emoji: String::new(),
            persona: None,
            active: true,
            generating: false,
            last_response_at: None,
            just_responded: false,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Build a participant from its registry entry.
    ///
    /// Fails when the id is blank or the alias has no `[a-z0-9]` characters,
    /// since such a participant could never be addressed.
    pub fn from_config(cfg: &ParticipantConfig) -> Result<Self, ChorusError> {
        if cfg.id.trim().is_empty() {
            return Err(ChorusError::Config(format!(
                "participant '{}' has an empty id",
                cfg.alias
            )));
        }
        let normalized_alias = normalize(&cfg.alias);
        if normalized_alias.is_empty() {
            return Err(ChorusError::Config(format!(
                "participant '{}' has an unusable alias '{}'",
                cfg.id, cfg.alias
            )));
        }
        Ok(Self {
            id: cfg.id.clone(),
            alias: cfg.alias.clone(),
            normalized_alias,
            display_name: cfg.display_name.clone(),
            name: cfg.name.clone(),
            model: cfg.model.clone(),
            emoji: cfg.emoji.clone(),
            persona: cfg.persona.clone(),
            active: cfg.active,
            generating: false,
            last_response_at: None,
            just_responded: false,
        })
    }

    /// Label shown in transports, e.g. "🤖 claude".
    pub fn label(&self) -> String {
        if self.emoji.is_empty() {
            self.alias.clone()
        } else {
            format!("{} {}", self.emoji, self.alias)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("Claude,"), "claude");
        assert_eq!(normalize("GPT-4o"), "gpt4o");
        assert_eq!(normalize("  Claude Sonnet! "), "claudesonnet");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_from_config_rejects_unusable_alias() {
        let cfg = ParticipantConfig {
            id: "p1".into(),
            alias: "***".into(),
            ..Default::default()
        };
        assert!(matches!(
            Participant::from_config(&cfg),
            Err(ChorusError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_empty_id() {
        let cfg = ParticipantConfig {
            id: " ".into(),
            alias: "claude".into(),
            ..Default::default()
        };
        assert!(Participant::from_config(&cfg).is_err());
    }

    #[test]
    fn test_from_config_copies_fields() {
        let cfg = ParticipantConfig {
            id: "p1".into(),
            alias: "Claude".into(),
            display_name: Some("Claude Sonnet".into()),
            emoji: "🤖".into(),
            active: true,
            ..Default::default()
        };
        let p = Participant::from_config(&cfg).unwrap();
        assert_eq!(p.normalized_alias, "claude");
        assert_eq!(p.label(), "🤖 Claude");
        assert!(p.active);
        assert!(!p.generating);
    }
}
