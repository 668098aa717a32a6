//! Scripted backend: rotates through canned lines.
//!
//! Needs no network, so it drives demos and offline runs. Lines may use
//! `{speaker}`, `{topic}` and `{last}` (the most recent other speaker).

use async_trait::async_trait;
use chorus_core::{context::GenerationContext, error::ChorusError, traits::Generator};
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_LINES: &[&str] = &[
    "Interesting point, {last}. I'd push it a bit further though.",
    "I'm not sure I agree, {last}. What makes you think so?",
    "Can we get back to {topic} for a second?",
    "{last}, what would change your mind here?",
    "Speaking as {speaker}: I think we're overcomplicating this.",
];

pub struct ScriptedGenerator {
    lines: Vec<String>,
    next: AtomicUsize,
}

impl ScriptedGenerator {
    /// Use `lines`, or a small built-in set when empty.
    pub fn new(lines: Vec<String>) -> Self {
        let lines = if lines.iter().all(|l| l.trim().is_empty()) {
            DEFAULT_LINES.iter().map(|l| l.to_string()).collect()
        } else {
            lines.into_iter().filter(|l| !l.trim().is_empty()).collect()
        };
        Self {
            lines,
            next: AtomicUsize::new(0),
        }
    }
}

fn render(line: &str, context: &GenerationContext) -> String {
    let last = context
        .history
        .iter()
        .rev()
        .find(|e| e.sender_id.as_deref() != Some(context.participant_id.as_str()))
        .map(|e| e.sender.as_str())
        .unwrap_or("everyone");
    line.replace("{speaker}", &context.speaker)
        .replace("{topic}", context.topic.as_deref().unwrap_or("the topic"))
        .replace("{last}", last)
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, context: &GenerationContext) -> Result<String, ChorusError> {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.lines.len();
        Ok(render(&self.lines[i], context))
    }
}
