//! Autonomous conversation driver: lifecycle and timing.
//!
//! The loop itself lives on the orchestrator (it needs the participant
//! table); this module owns the single task handle so restarts never create
//! two concurrent loops.

use chorus_core::config::AutonomousConfig;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Timing parameters of the self-rescheduling loop.
#[derive(Debug, Clone)]
pub struct DriverTiming {
    pub retry_interval: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub silence_timeout: Duration,
}

impl From<&AutonomousConfig> for DriverTiming {
    fn from(cfg: &AutonomousConfig) -> Self {
        Self {
            retry_interval: Duration::from_secs(cfg.retry_interval_secs.max(1)),
            min_delay: Duration::from_secs(cfg.min_delay_secs),
            max_delay: Duration::from_secs(cfg.max_delay_secs.max(cfg.min_delay_secs)),
            silence_timeout: Duration::from_secs(cfg.silence_timeout_secs),
        }
    }
}

impl DriverTiming {
    /// Uniform wait before the next background pass.
    pub fn next_wait<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.max_delay > self.min_delay {
            rng.gen_range(self.min_delay..=self.max_delay)
        } else {
            self.min_delay
        }
    }

    /// Chatter that has been idle longer than the silence timeout is stale.
    pub fn is_stale(&self, idle: Duration) -> bool {
        idle > self.silence_timeout
    }
}

/// Owner of the driver task.
#[derive(Debug, Default)]
pub struct AutonomousDriver {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AutonomousDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the loop unless one is already running. Returns whether `spawn` ran.
    pub fn ensure_running<F>(&self, spawn: F) -> bool
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        *guard = Some(spawn());
        true
    }

    /// Abort the loop, cancelling any pending wait.
    pub fn stop(&self) {
        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        let guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().is_some_and(|h| !h.is_finished())
    }
}
