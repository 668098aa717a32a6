//! Sleep/wake throttling.
//!
//! Participants go to sleep after too many agent messages without a human
//! in the loop, and wake on human activity or an explicit wake.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SleepReason {
    /// The unattended counter reached the threshold.
    LimitReached,
    /// Administrative sleep.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WakeReason {
    HumanActivity,
    /// Administrative wake.
    Manual,
}

/// A state change the orchestrator should announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Slept(SleepReason),
    Woke(WakeReason),
}

#[derive(Debug)]
pub struct SleepState {
    unattended: u32,
    threshold: u32,
    asleep: bool,
    sleep_reason: Option<SleepReason>,
    last_reset: DateTime<Utc>,
    /// Monotonic mirror of `last_reset` for idle computations.
    last_reset_at: Instant,
    last_agent_message_at: Option<Instant>,
}

impl SleepState {
    /// Awake, counter at zero.
    pub fn new(threshold: u32) -> Self {
        Self {
            unattended: 0,
            threshold: threshold.max(1),
            asleep: false,
            sleep_reason: None,
            last_reset: Utc::now(),
            last_reset_at: Instant::now(),
            last_agent_message_at: None,
        }
    }

    /// Count one produced agent message; falls asleep at the threshold.
    pub fn record_agent_message(&mut self) -> Option<Transition> {
        self.last_agent_message_at = Some(Instant::now());
        self.unattended = self.unattended.saturating_add(1);
        if !self.asleep && self.unattended >= self.threshold {
            self.asleep = true;
            self.sleep_reason = Some(SleepReason::LimitReached);
            return Some(Transition::Slept(SleepReason::LimitReached));
        }
        None
    }

    /// Reset the counter and wake up.
    pub fn record_human_activity(&mut self) -> Option<Transition> {
        self.reset(WakeReason::HumanActivity)
    }

    /// Administrative wake; same transition, no message side effects.
    pub fn wake(&mut self) -> Option<Transition> {
        self.reset(WakeReason::Manual)
    }

    /// Administrative sleep. The counter is left untouched.
    pub fn sleep(&mut self) -> Option<Transition> {
        if self.asleep {
            return None;
        }
        self.asleep = true;
        self.sleep_reason = Some(SleepReason::Manual);
        Some(Transition::Slept(SleepReason::Manual))
    }

    fn reset(&mut self, reason: WakeReason) -> Option<Transition> {
        self.unattended = 0;
        self.last_reset = Utc::now();
        self.last_reset_at = Instant::now();
        self.last_agent_message_at = None;
        if self.asleep {
            self.asleep = false;
            self.sleep_reason = None;
            Some(Transition::Woke(reason))
        } else {
            None
        }
    }

    /// Time since the last agent message, or since the last reset if no
    /// agent has spoken since.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_agent_message_at.unwrap_or(self.last_reset_at))
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn unattended(&self) -> u32 {
        self.unattended
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reason(&self) -> Option<SleepReason> {
        self.sleep_reason
    }

    pub fn last_reset(&self) -> DateTime<Utc> {
        self.last_reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleeps_exactly_at_threshold() {
        let mut s = SleepState::new(3);
        assert_eq!(s.record_agent_message(), None);
        assert_eq!(s.record_agent_message(), None);
        assert!(!s.is_asleep());
        assert_eq!(
            s.record_agent_message(),
            Some(Transition::Slept(SleepReason::LimitReached))
        );
        assert!(s.is_asleep());
        assert_eq!(s.reason(), Some(SleepReason::LimitReached));
        // Further messages do not re-announce.
        assert_eq!(s.record_agent_message(), None);
        assert_eq!(s.unattended(), 4);
    }

    #[test]
    fn test_human_activity_resets_and_wakes() {
        let mut s = SleepState::new(1);
        s.record_agent_message();
        assert!(s.is_asleep());
        assert_eq!(
            s.record_human_activity(),
            Some(Transition::Woke(WakeReason::HumanActivity))
        );
        assert!(!s.is_asleep());
        assert_eq!(s.unattended(), 0);
        assert_eq!(s.record_human_activity(), None, "already awake");
    }

    #[test]
    fn test_manual_sleep_keeps_counter_and_wake_clears_it() {
        let mut s = SleepState::new(10);
        s.record_agent_message();
        assert_eq!(s.sleep(), Some(Transition::Slept(SleepReason::Manual)));
        assert_eq!(s.sleep(), None);
        assert_eq!(s.unattended(), 1);
        assert_eq!(s.wake(), Some(Transition::Woke(WakeReason::Manual)));
        assert_eq!(s.unattended(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_measured_from_last_agent_message() {
        let mut s = SleepState::new(10);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(s.idle_for(Instant::now()), Duration::from_secs(5));
        s.record_agent_message();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(s.idle_for(Instant::now()), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_restarts_idle_clock() {
        let mut s = SleepState::new(1);
        s.record_agent_message();
        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(s.idle_for(Instant::now()), Duration::from_secs(600));
        s.wake();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(s.idle_for(Instant::now()), Duration::from_secs(3));
        s.record_human_activity();
        assert_eq!(s.idle_for(Instant::now()), Duration::ZERO);
    }
}
