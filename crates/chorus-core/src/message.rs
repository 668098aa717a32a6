use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    Human,
    Agent,
    System,
}

impl SenderKind {
    /// Chat role used when the message is handed to a generation backend.
    pub fn role(&self) -> &'static str {
        match self {
            Self::Human => "user",
            Self::Agent => "assistant",
            Self::System => "system",
        }
    }
}

/// A chat message flowing through the dispatch queue.
///
/// `id`, `timestamp` and (for human messages) `priority` are overwritten
/// when the message is enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    /// Display label of the sender (human label, participant alias, "system").
    pub sender: String,
    /// Participant id for agent-authored messages.
    #[serde(default)]
    pub sender_id: Option<String>,
    pub kind: SenderKind,
    pub content: String,
    /// Room identifier; the scheduler is single-room but carries it through.
    pub room: String,
    #[serde(default)]
    pub priority: i32,
    pub timestamp: DateTime<Utc>,
    /// Normalized mention targets, in discovery order, without duplicates.
    #[serde(default)]
    pub mentions: Vec<String>,
    /// Internal messages never enter the conversation context window.
    #[serde(default)]
    pub internal: bool,
}

impl Message {
    /// Create a message with default priority, no mentions, and a fresh id.
    pub fn new(kind: SenderKind, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            sender_id: None,
            kind,
            content: content.into(),
            room: String::new(),
            priority: 0,
            timestamp: Utc::now(),
            mentions: Vec::new(),
            internal: false,
        }
    }

    pub fn human(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(SenderKind::Human, sender, content)
    }

    /// An agent-authored message; `sender_id` is the participant id.
    pub fn agent(
        sender_id: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::new(SenderKind::Agent, sender, content);
        msg.sender_id = Some(sender_id.into());
        msg
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SenderKind::System, "system", content)
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    /// Mark the message as a directive that must stay out of the context window.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn is_human(&self) -> bool {
        self.kind == SenderKind::Human
    }

    pub fn is_agent(&self) -> bool {
        self.kind == SenderKind::Agent
    }
}
