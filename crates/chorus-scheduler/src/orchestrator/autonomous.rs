//! Autonomous chatter: periodic background passes while the room is awake.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

use super::Orchestrator;
use crate::selector::{PassKind, Trigger};

/// Why a background tick did not schedule anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Idle {
    Asleep,
    Stale,
    NoContext,
}

impl Orchestrator {
    /// Start the driver loop if autonomy is enabled and none is running.
    pub(super) fn ensure_driver(self: &Arc<Self>) {
        if !self.config.autonomous.enabled || self.is_shutting_down() {
            return;
        }
        let orch = Arc::clone(self);
        if self
            .driver
            .ensure_running(move || tokio::spawn(orch.autonomous_loop()))
        {
            info!("autonomous: driver started");
        }
    }

    /// Sleep, tick, repeat. Asleep or empty rooms are polled at the retry
    /// interval; stale rooms skip the tick and wait again.
    async fn autonomous_loop(self: Arc<Self>) {
        loop {
            let wait = {
                let mut st = self.state.lock().await;
                let idle_room = st.sleep.is_asleep() || !st.participants.iter().any(|p| p.active);
                if idle_room {
                    None
                } else {
                    Some(self.timing.next_wait(&mut st.rng))
                }
            };
            let Some(wait) = wait else {
                tokio::time::sleep(self.timing.retry_interval).await;
                continue;
            };
            tokio::time::sleep(wait).await;
            if self.is_shutting_down() {
                return;
            }

            match self.background_tick().await {
                Ok(count) => debug!("autonomous: tick scheduled {count} responders"),
                Err(Idle::Asleep) => debug!("autonomous: fell asleep during wait"),
                Err(Idle::NoContext) => debug!("autonomous: nothing to talk about yet"),
                Err(Idle::Stale) => debug!("autonomous: conversation is quiet, skipping"),
            }
        }
    }

    /// One background pass against the newest context entry.
    pub(crate) async fn background_tick(self: &Arc<Self>) -> Result<usize, Idle> {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        if st.sleep.is_asleep() {
            return Err(Idle::Asleep);
        }
        if self.timing.is_stale(st.sleep.idle_for(Instant::now())) {
            return Err(Idle::Stale);
        }
        let Some(trigger) = st.context.last().map(Trigger::from) else {
            return Err(Idle::NoContext);
        };
        Ok(self.run_pass(st, &trigger, PassKind::Background))
    }
}
