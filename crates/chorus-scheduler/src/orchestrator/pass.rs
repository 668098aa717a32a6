//! Scheduling passes: pick responders, decide their stance, arm timers.

use std::sync::Arc;
use tracing::debug;

use super::{Orchestrator, State};
use crate::delay::{compute_delay, TimerHandle};
use crate::events::ChorusEvent;
use crate::selector::{is_eligible, select_responders, PassKind, Trigger};
use crate::strategy::{self, Stance, StrategyInput, RECENT_WINDOW};

/// What a fired timer needs to start its generation.
#[derive(Debug, Clone)]
pub(super) struct ResponsePlan {
    pub(super) timer_id: u64,
    pub(super) participant_id: String,
    pub(super) stance: Stance,
    pub(super) directive: String,
}

impl Orchestrator {
    /// Run one pass for `trigger`. Returns how many responses were armed.
    ///
    /// Nothing is scheduled while asleep or shutting down. In a background
    /// pass the trigger's author sits out.
    pub(super) fn run_pass(self: &Arc<Self>, st: &mut State, trigger: &Trigger, pass: PassKind) -> usize {
        if self.is_shutting_down() || st.sleep.is_asleep() {
            debug!("pass: skipped ({pass:?}), asleep or shutting down");
            return 0;
        }

        if pass == PassKind::Background {
            for p in st.participants.iter_mut() {
                p.just_responded = trigger.sender_id.as_deref() == Some(p.id.as_str());
            }
        }

        // A participant with a response already armed counts as busy.
        let scheduled = st.scheduled_ids();
        let eligible: Vec<_> = st
            .participants
            .iter()
            .filter(|p| is_eligible(p, pass) && !scheduled.contains(&p.id))
            .collect();
        let decisions = select_responders(&eligible, &trigger.mentions, pass, &mut st.rng);

        let recent = st.context.window(RECENT_WINDOW);
        let mut plans = Vec::with_capacity(decisions.len());
        for decision in &decisions {
            let Some(responder) = st
                .participants
                .iter()
                .find(|p| p.id == decision.participant_id)
            else {
                continue;
            };
            let input = StrategyInput {
                responder,
                mentioned: decision.mentioned,
                trigger,
                pass,
                recent: &recent,
                participants: &st.participants,
            };
            let strategy = strategy::decide(&input, &mut st.rng);
            let delay = compute_delay(
                &self.config.delay,
                decision.index,
                decision.mentioned,
                pass,
                &mut st.rng,
            );
            debug!(
                "pass: {} #{} {} in {}ms{}",
                responder.alias,
                decision.index,
                strategy.stance,
                delay.as_millis(),
                if decision.mentioned { " (mentioned)" } else { "" }
            );
            self.events.emit(ChorusEvent::ResponseScheduled {
                participant_id: responder.id.clone(),
                alias: responder.alias.clone(),
                delay_ms: delay.as_millis() as u64,
                stance: strategy.stance,
                mentioned: decision.mentioned,
            });
            plans.push((delay, decision.participant_id.clone(), strategy));
        }
        drop(recent);

        let count = plans.len();
        for (delay, participant_id, strategy) in plans {
            let orch = Arc::clone(self);
            let id = participant_id.clone();
            st.arm(&id, move |timer_id| {
                let plan = ResponsePlan {
                    timer_id,
                    participant_id,
                    stance: strategy.stance,
                    directive: strategy.directive,
                };
                TimerHandle::schedule(delay, async move { orch.fire(plan).await })
            });
        }

        if pass == PassKind::Background {
            for p in st.participants.iter_mut() {
                p.just_responded = false;
            }
        }
        count
    }
}
