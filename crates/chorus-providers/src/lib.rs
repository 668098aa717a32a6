//! # chorus-providers
//!
//! Generation backends for Chorus participants.

pub mod ollama;
pub mod openai;
pub mod scripted;

use chorus_core::{
    config::{ParticipantConfig, ProviderConfig},
    error::ChorusError,
    traits::Generator,
};
use std::sync::Arc;

use ollama::OllamaGenerator;
use openai::OpenAiGenerator;
use scripted::ScriptedGenerator;

/// Build the generator a participant's `provider` key asks for.
pub fn build_generator(
    participant: &ParticipantConfig,
    providers: &ProviderConfig,
) -> Result<Arc<dyn Generator>, ChorusError> {
    match participant.provider.as_str() {
        "scripted" => Ok(Arc::new(ScriptedGenerator::new(participant.lines.clone()))),
        "ollama" => {
            let cfg = providers.ollama.clone().unwrap_or_default();
            Ok(Arc::new(OllamaGenerator::from_config(cfg.base_url, cfg.model)))
        }
        "openai" => {
            let cfg = providers.openai.as_ref().ok_or_else(|| {
                ChorusError::Config(format!(
                    "participant '{}' uses openai but [provider.openai] is missing",
                    participant.id
                ))
            })?;
            if cfg.api_key.is_empty() {
                return Err(ChorusError::Config(
                    "provider.openai.api_key is empty".into(),
                ));
            }
            Ok(Arc::new(OpenAiGenerator::from_config(
                cfg.base_url.clone(),
                cfg.api_key.clone(),
                cfg.model.clone(),
            )))
        }
        other => Err(ChorusError::Config(format!(
            "participant '{}': unsupported provider '{other}'",
            participant.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::config::OpenAiConfig;

    fn participant(provider: &str) -> ParticipantConfig {
        ParticipantConfig {
            id: "p1".into(),
            alias: "claude".into(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_known_providers() {
        let providers = ProviderConfig {
            ollama: None,
            openai: Some(OpenAiConfig {
                api_key: "sk-test".into(),
                ..Default::default()
            }),
        };
        assert_eq!(build_generator(&participant("scripted"), &providers).unwrap().name(), "scripted");
        assert_eq!(build_generator(&participant("ollama"), &providers).unwrap().name(), "ollama");
        assert_eq!(build_generator(&participant("openai"), &providers).unwrap().name(), "openai");
    }

    #[test]
    fn test_build_rejects_bad_setup() {
        let providers = ProviderConfig::default();
        assert!(build_generator(&participant("openai"), &providers).is_err());
        assert!(build_generator(&participant("carrier-pigeon"), &providers).is_err());

        let no_key = ProviderConfig {
            ollama: None,
            openai: Some(OpenAiConfig::default()),
        };
        assert!(build_generator(&participant("openai"), &no_key).is_err());
    }
}
