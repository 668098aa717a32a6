//! Ollama local model backend.
//!
//! Connects to a locally running Ollama server. No API key required.

use async_trait::async_trait;
use chorus_core::{
    context::{ChatMessage, GenerationContext},
    error::ChorusError,
    traits::Generator,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Ollama generator backed by a local server.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    /// Create from config values.
    pub fn from_config(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
        }
    }
}

// --- Serde types ---

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaChatMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct OllamaChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaChatMessage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
}

/// Build Ollama-format messages, system prompt first.
fn build_ollama_messages(system: &str, history: &[ChatMessage]) -> Vec<OllamaChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !system.is_empty() {
        messages.push(OllamaChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    for m in history {
        messages.push(OllamaChatMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        });
    }
    messages
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, context: &GenerationContext) -> Result<String, ChorusError> {
        let (system, history) = context.to_chat_messages();
        let effective_model = context.model.as_deref().unwrap_or(&self.model);
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let start = Instant::now();

        let body = OllamaChatRequest {
            model: effective_model.to_string(),
            messages: build_ollama_messages(&system, &history),
            stream: false,
        };

        debug!("ollama: POST {url} model={effective_model} speaker={}", context.speaker);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChorusError::Generation(format!("ollama request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ChorusError::Generation(format!(
                "ollama returned {status}: {text}"
            )));
        }

        let parsed: OllamaChatResponse = resp.json().await.map_err(|e| {
            ChorusError::Generation(format!("ollama: failed to parse response: {e}"))
        })?;

        let tokens = match (parsed.eval_count, parsed.prompt_eval_count) {
            (Some(e), Some(p)) => Some(e + p),
            (Some(e), None) => Some(e),
            _ => None,
        };
        debug!(
            "ollama: {} replied in {}ms (model={:?}, tokens={tokens:?})",
            context.speaker,
            start.elapsed().as_millis(),
            parsed.model
        );

        parsed
            .message
            .map(|m| m.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ChorusError::Generation("ollama returned no content".into()))
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("ollama not available: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_generator_name() {
        let g = OllamaGenerator::from_config("http://localhost:11434".into(), "llama3".into());
        assert_eq!(g.name(), "ollama");
    }

    #[test]
    fn test_ollama_request_serialization() {
        let history = vec![ChatMessage {
            role: "user".into(),
            content: "You: Hello".into(),
        }];
        let body = OllamaChatRequest {
            model: "llama3".into(),
            messages: build_ollama_messages("Be brief.", &history),
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3");
        assert!(!json["stream"].as_bool().unwrap());
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "You: Hello");
    }

    #[test]
    fn test_empty_system_prompt_is_skipped() {
        let messages = build_ollama_messages("", &[]);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_ollama_response_parsing() {
        let json = r#"{"message":{"role":"assistant","content":"Hi there!"},"model":"llama3","eval_count":42,"prompt_eval_count":10}"#;
        let resp: OllamaChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.message.as_ref().unwrap().content, "Hi there!");
        assert_eq!(resp.model, Some("llama3".into()));
        assert_eq!(resp.eval_count, Some(42));
    }
}
