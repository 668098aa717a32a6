//! Structured events emitted for the transport layer.
//!
//! Delivered over a `tokio::sync::broadcast` channel so every subscriber
//! sees every event. Slow subscribers lag and drop the oldest events rather
//! than blocking the scheduler.

use chorus_core::message::Message;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::sleep::{SleepReason, WakeReason};
use crate::strategy::Stance;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChorusEvent {
    /// A message left the dispatch queue and entered the conversation.
    MessageAccepted { message: Message },
    /// A responder was picked and its timer armed.
    ResponseScheduled {
        participant_id: String,
        alias: String,
        delay_ms: u64,
        stance: Stance,
        mentioned: bool,
    },
    GenerationStarted { participant_id: String, alias: String },
    GenerationStopped { participant_id: String, alias: String },
    ResponseProduced { message: Message },
    Error {
        participant_id: Option<String>,
        error: String,
    },
    Slept { reason: SleepReason },
    Woke { reason: WakeReason },
    TopicChanged { topic: String, author: String },
}

/// Sender side of the event channel; detachable at teardown.
#[derive(Debug)]
pub struct EventSink {
    tx: std::sync::Mutex<Option<broadcast::Sender<ChorusEvent>>>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx: std::sync::Mutex::new(Some(tx)),
        }
    }

    /// Subscribe to future events. After [`EventSink::close`] the receiver
    /// is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChorusEvent> {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                rx
            }
        }
    }

    /// Emit an event. Having no subscribers is not an error.
    pub fn emit(&self, event: ChorusEvent) {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Drop the sender, detaching every subscriber.
    pub fn close(&self) {
        let mut guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }
}
