//! Timer callbacks: run one participant's generation and feed the reply back.

use chorus_core::{context::GenerationContext, error::ChorusError, message::Message};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::pass::ResponsePlan;
use super::Orchestrator;
use crate::events::ChorusEvent;

impl Orchestrator {
    /// Fire an armed response.
    ///
    /// Eligibility is checked again because the world may have changed since
    /// the pass: the participant may be gone, deactivated, busy, or everyone
    /// may have fallen asleep. The generating flag is always cleared, whether
    /// the backend succeeds, fails, times out, or panics.
    pub(super) async fn fire(self: Arc<Self>, plan: ResponsePlan) {
        let (generator, context, alias) = {
            let mut guard = self.state.lock().await;
            let st = &mut *guard;
            if !st.disarm(plan.timer_id) || self.is_shutting_down() {
                return;
            }
            if st.sleep.is_asleep() {
                debug!("generation: {} skipped, asleep", plan.participant_id);
                return;
            }
            let Some(generator) = st.generators.get(&plan.participant_id).cloned() else {
                return;
            };
            let history = st
                .context
                .window(self.config.scheduler.generation_window)
                .into_iter()
                .cloned()
                .collect();
            let topic = st.topic.clone();
            let Some(p) = st.participant_mut(&plan.participant_id) else {
                return;
            };
            if !p.active || p.generating {
                debug!("generation: {} no longer eligible", p.alias);
                return;
            }
            p.generating = true;
            let context = GenerationContext {
                participant_id: p.id.clone(),
                speaker: p.alias.clone(),
                persona: p.persona.clone(),
                topic,
                directive: plan.directive.clone(),
                history,
                model: p.model.clone(),
            };
            (generator, context, p.alias.clone())
        };

        info!(
            "generation: {alias} started ({}, {})",
            plan.stance,
            generator.name()
        );
        self.events.emit(ChorusEvent::GenerationStarted {
            participant_id: plan.participant_id.clone(),
            alias: alias.clone(),
        });

        let result = self.generate(generator, context).await;

        let registered = {
            let mut st = self.state.lock().await;
            match st.participant_mut(&plan.participant_id) {
                Some(p) => {
                    p.generating = false;
                    true
                }
                None => false,
            }
        };
        self.events.emit(ChorusEvent::GenerationStopped {
            participant_id: plan.participant_id.clone(),
            alias: alias.clone(),
        });
        if !registered {
            debug!("generation: {alias} was removed, result discarded");
            return;
        }

        let text = match result {
            Ok(text) => strip_speaker_prefix(&text, &alias).to_string(),
            Err(e) => {
                warn!("generation: {alias} failed: {e}");
                self.events.emit(ChorusEvent::Error {
                    participant_id: Some(plan.participant_id),
                    error: e.to_string(),
                });
                return;
            }
        };
        if text.is_empty() {
            warn!("generation: {alias} returned an empty reply");
            self.events.emit(ChorusEvent::Error {
                participant_id: Some(plan.participant_id),
                error: "empty reply".into(),
            });
            return;
        }

        let reply = Message::agent(plan.participant_id, alias.clone(), text)
            .with_room(self.config.chorus.room.clone());
        match self.ingest(reply).await {
            Ok(id) => debug!("generation: {alias} reply queued as {id}"),
            Err(ChorusError::ShuttingDown) => {}
            Err(e) => warn!("generation: {alias} reply dropped: {e}"),
        }
    }

    /// Call the backend on its own task, bounded by the generation timeout.
    ///
    /// A panicking backend surfaces as a generation error instead of tearing
    /// down the caller.
    async fn generate(
        &self,
        generator: Arc<dyn chorus_core::traits::Generator>,
        context: GenerationContext,
    ) -> Result<String, ChorusError> {
        let limit = Duration::from_secs(self.config.scheduler.generation_timeout_secs.max(1));
        let call = tokio::spawn(async move {
            tokio::time::timeout(limit, generator.generate(&context)).await
        });
        match call.await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ChorusError::Generation(format!(
                "timed out after {}s",
                limit.as_secs()
            ))),
            Err(e) => Err(ChorusError::Generation(format!("backend task failed: {e}"))),
        }
    }
}

/// Drop a leading "alias:" that some models echo back.
fn strip_speaker_prefix<'a>(text: &'a str, alias: &str) -> &'a str {
    let trimmed = text.trim();
    match trimmed.split_once(':') {
        Some((head, rest)) if head.trim().eq_ignore_ascii_case(alias) => rest.trim(),
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::strip_speaker_prefix;

    #[test]
    fn test_strip_speaker_prefix() {
        assert_eq!(strip_speaker_prefix("claude: hello", "claude"), "hello");
        assert_eq!(strip_speaker_prefix("  Claude:hi ", "claude"), "hi");
        assert_eq!(strip_speaker_prefix("note: hello", "claude"), "note: hello");
        assert_eq!(strip_speaker_prefix("plain", "claude"), "plain");
    }
}
