use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Message, SenderKind};

/// A single entry in the conversation window.
///
/// A reduced projection of a [`Message`]; entries are never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: SenderKind,
    /// Display label of the author.
    pub sender: String,
    /// Participant id when the author is an agent.
    #[serde(default)]
    pub sender_id: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Normalized mention targets carried over from the message.
    #[serde(default)]
    pub mentions: Vec<String>,
}

impl From<&Message> for ContextEntry {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.kind,
            sender: msg.sender.clone(),
            sender_id: msg.sender_id.clone(),
            content: msg.content.clone(),
            timestamp: msg.timestamp,
            mentions: msg.mentions.clone(),
        }
    }
}

/// A structured chat message for API-based generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// Everything a generator needs to produce one participant's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    /// Id of the participant that is speaking.
    pub participant_id: String,
    /// Alias of the participant that is speaking.
    pub speaker: String,
    /// Optional persona text from the participant's configuration.
    #[serde(default)]
    pub persona: Option<String>,
    /// Current conversation topic, if one was set.
    #[serde(default)]
    pub topic: Option<String>,
    /// Stance directive for this turn.
    pub directive: String,
    /// Recent conversation (oldest first).
    pub history: Vec<ContextEntry>,
    /// Override the generator's default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GenerationContext {
    /// System prompt: persona, topic, and the stance directive.
    pub fn system_prompt(&self) -> String {
        let mut parts = Vec::new();
        match self.persona {
            Some(ref persona) if !persona.trim().is_empty() => parts.push(persona.clone()),
            _ => parts.push(format!(
                "You are {}, one of several participants in a group chat. \
                 Keep replies short and conversational.",
                self.speaker
            )),
        }
        if let Some(ref topic) = self.topic {
            parts.push(format!("Current topic: {topic}"));
        }
        parts.push(self.directive.clone());
        parts.join("\n\n")
    }

    /// Convert the context to structured chat messages.
    ///
    /// Returns `(system_prompt, messages)`. The speaker's own turns become
    /// `assistant` messages; everyone else's turns are `user` messages
    /// prefixed with the author's label so the model can tell voices apart.
    pub fn to_chat_messages(&self) -> (String, Vec<ChatMessage>) {
        let messages = self
            .history
            .iter()
            .map(|entry| {
                let own = entry.sender_id.as_deref() == Some(self.participant_id.as_str());
                if own {
                    ChatMessage {
                        role: "assistant".to_string(),
                        content: entry.content.clone(),
                    }
                } else {
                    ChatMessage {
                        role: "user".to_string(),
                        content: format!("{}: {}", entry.sender, entry.content),
                    }
                }
            })
            .collect();
        (self.system_prompt(), messages)
    }
}
