//! Orchestrator: the single owner of scheduling state.
//!
//! Incoming messages go through the dispatch queue, are drained one at a
//! time into the conversation context, and start scheduling passes that arm
//! per-responder timers. Timers fire generations; produced replies re-enter
//! the queue like any other message.

mod autonomous;
mod generation;
mod pass;


use chorus_core::{
    config::Config,
    context::ContextEntry,
    error::ChorusError,
    message::{Message, SenderKind},
    participant::Participant,
    traits::Generator,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::ContextStore;
use crate::delay::TimerHandle;
use crate::driver::{AutonomousDriver, DriverTiming};
use crate::events::{ChorusEvent, EventSink, DEFAULT_EVENT_CAPACITY};
use crate::mentions;
use crate::queue::{DispatchQueue, Enqueued};
use crate::selector::{PassKind, Trigger};
use crate::sleep::{SleepReason, SleepState, Transition};

/// A participant paired with the backend that speaks for it.
pub struct Registration {
    pub participant: Participant,
    pub generator: Arc<dyn Generator>,
}

impl Registration {
    pub fn new(participant: Participant, generator: Arc<dyn Generator>) -> Self {
        Self {
            participant,
            generator,
        }
    }
}

/// Point-in-time view of the scheduler for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub queue_depth: usize,
    pub asleep: bool,
    pub sleep_reason: Option<SleepReason>,
    pub unattended: u32,
    pub threshold: u32,
    pub participants: usize,
    pub active: usize,
    pub generating: Vec<String>,
    pub pending_responses: usize,
    pub context_len: usize,
    pub topic: Option<String>,
    pub driver_running: bool,
}

/// A timer waiting to start a generation.
struct PendingResponse {
    participant_id: String,
    timer: TimerHandle,
}

/// Everything behind the orchestrator lock.
pub(super) struct State {
    pub(super) queue: DispatchQueue,
    pub(super) context: ContextStore,
    pub(super) participants: Vec<Participant>,
    pub(super) generators: HashMap<String, Arc<dyn Generator>>,
    pub(super) sleep: SleepState,
    pub(super) rng: StdRng,
    pending: HashMap<u64, PendingResponse>,
    next_timer_id: u64,
    pub(super) topic: Option<String>,
}

impl State {
    fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    fn participant_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    /// Ids with a response already armed but not yet fired.
    pub(super) fn scheduled_ids(&self) -> HashSet<String> {
        self.pending
            .values()
            .map(|p| p.participant_id.clone())
            .collect()
    }

    pub(super) fn arm(&mut self, participant_id: &str, timer: impl FnOnce(u64) -> TimerHandle) {
        let timer_id = self.next_timer_id;
        self.next_timer_id += 1;
        self.pending.insert(
            timer_id,
            PendingResponse {
                participant_id: participant_id.to_string(),
                timer: timer(timer_id),
            },
        );
    }

    /// Forget a timer that has fired. Returns false if it was cancelled.
    pub(super) fn disarm(&mut self, timer_id: u64) -> bool {
        self.pending.remove(&timer_id).is_some()
    }

    fn cancel_where(&mut self, keep: impl Fn(&str) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| {
            if keep(&pending.participant_id) {
                true
            } else {
                pending.timer.cancel();
                false
            }
        });
        before - self.pending.len()
    }
}

/// The conversation scheduler.
pub struct Orchestrator {
    pub(super) config: Config,
    pub(super) timing: DriverTiming,
    pub(super) state: Mutex<State>,
    pub(super) events: EventSink,
    pub(super) driver: AutonomousDriver,
    pub(super) shutting_down: AtomicBool,
}

impl Orchestrator {
    /// Build an orchestrator from a config and the participants that passed
    /// validation. Duplicate ids or aliases are excluded with a warning.
    pub fn new(config: Config, registrations: Vec<Registration>) -> Arc<Self> {
        let config = config.validated();
        let (admitted, rejected) = Self::admit(registrations);
        for err in &rejected {
            warn!("orchestrator: participant excluded: {err}");
        }

        let mut participants = Vec::with_capacity(admitted.len());
        let mut generators = HashMap::with_capacity(admitted.len());
        for reg in admitted {
            generators.insert(reg.participant.id.clone(), reg.generator);
            participants.push(reg.participant);
        }

        let rng = match config.chorus.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = State {
            queue: DispatchQueue::new(
                config.scheduler.human_priority,
                config.scheduler.max_queue_len,
            ),
            context: ContextStore::new(config.scheduler.context_capacity),
            participants,
            generators,
            sleep: SleepState::new(config.scheduler.sleep_threshold),
            rng,
            pending: HashMap::new(),
            next_timer_id: 0,
            topic: None,
        };

        info!(
            "orchestrator: {} participants, sleep threshold {}",
            state.participants.len(),
            state.sleep.threshold()
        );

        Arc::new(Self {
            timing: DriverTiming::from(&config.autonomous),
            config,
            state: Mutex::new(state),
            events: EventSink::new(DEFAULT_EVENT_CAPACITY),
            driver: AutonomousDriver::new(),
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Split registrations into admitted and rejected, rejecting the later
    /// of any two that share an id or a normalized alias.
    pub fn admit(registrations: Vec<Registration>) -> (Vec<Registration>, Vec<ChorusError>) {
        let mut ids = HashSet::new();
        let mut aliases = HashSet::new();
        let mut admitted = Vec::new();
        let mut rejected = Vec::new();
        for reg in registrations {
            let p = &reg.participant;
            if p.id.trim().is_empty() || p.normalized_alias.is_empty() {
                rejected.push(ChorusError::Config(format!(
                    "participant '{}' has no usable id or alias",
                    p.alias
                )));
            } else if !ids.insert(p.id.clone()) {
                rejected.push(ChorusError::Config(format!("duplicate participant id '{}'", p.id)));
            } else if !aliases.insert(p.normalized_alias.clone()) {
                rejected.push(ChorusError::Config(format!(
                    "duplicate alias '{}' (participant '{}')",
                    p.alias, p.id
                )));
            } else {
                admitted.push(reg);
            }
        }
        (admitted, rejected)
    }

    /// Start background machinery. Safe to call more than once.
    pub fn start(self: &Arc<Self>) {
        self.ensure_driver();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChorusEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(super) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Accept a message into the dispatch queue and make sure it drains.
    ///
    /// Returns the id stamped on the queued message.
    pub async fn ingest(self: &Arc<Self>, msg: Message) -> Result<Uuid, ChorusError> {
        if self.is_shutting_down() {
            return Err(ChorusError::ShuttingDown);
        }
        let (id, start_drain) = {
            let mut st = self.state.lock().await;
            let id = match st.queue.enqueue(msg) {
                Enqueued::Queued(id) => id,
                Enqueued::Evicted { id, evicted } => {
                    warn!(
                        "queue: full, dropped message from {} (priority {})",
                        evicted.sender, evicted.priority
                    );
                    self.events.emit(ChorusEvent::Error {
                        participant_id: evicted.sender_id,
                        error: "dispatch queue full, message dropped".into(),
                    });
                    id
                }
                Enqueued::Rejected(rejected) => {
                    warn!("queue: full, rejected message from {}", rejected.sender);
                    self.events.emit(ChorusEvent::Error {
                        participant_id: rejected.sender_id,
                        error: "dispatch queue full, message rejected".into(),
                    });
                    return Err(ChorusError::InvalidMessage("dispatch queue is full".into()));
                }
            };
            (id, st.queue.begin_drain())
        };
        if start_drain {
            tokio::spawn(self.clone().drain());
        }
        Ok(id)
    }

    /// Convenience for transports: ingest a human-authored line.
    pub async fn ingest_human(self: &Arc<Self>, content: &str) -> Result<Uuid, ChorusError> {
        let msg = Message::human(self.config.chorus.human_label.clone(), content)
            .with_room(self.config.chorus.room.clone());
        self.ingest(msg).await
    }

    /// Process queued messages in order until the queue is empty.
    ///
    /// Boxed so the drain task type does not depend on the generation
    /// futures that spawn it.
    fn drain(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let pacing = Duration::from_millis(self.config.scheduler.drain_pacing_ms);
            loop {
                let next = {
                    let mut st = self.state.lock().await;
                    st.queue.next_or_finish()
                };
                let Some(msg) = next else {
                    debug!("queue: drained");
                    break;
                };
                let sender_id = msg.sender_id.clone();
                if let Err(e) = self.handle_message(msg).await {
                    warn!("queue: message failed: {e}");
                    self.events.emit(ChorusEvent::Error {
                        participant_id: sender_id,
                        error: e.to_string(),
                    });
                }
                if !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
            }
        })
    }

    /// Admit one dequeued message into the conversation and react to it.
    async fn handle_message(self: &Arc<Self>, mut msg: Message) -> Result<(), ChorusError> {
        if msg.content.trim().is_empty() {
            return Err(ChorusError::InvalidMessage("empty content".into()));
        }
        if self.is_shutting_down() {
            return Err(ChorusError::ShuttingDown);
        }

        let mut guard = self.state.lock().await;
        let st = &mut *guard;

        if msg.kind == SenderKind::Agent {
            let author = match msg.sender_id.as_deref() {
                Some(id) => st.participant(id).map(|p| p.id.clone()),
                None => mentions::resolve(&msg.sender, &st.participants).map(|p| p.id.clone()),
            };
            let Some(author) = author else {
                return Err(ChorusError::InvalidMessage(format!(
                    "unknown agent author '{}'",
                    msg.sender
                )));
            };
            msg.sender_id = Some(author);
        }
        if msg.room.is_empty() {
            msg.room = self.config.chorus.room.clone();
        }

        let mut found = mentions::resolve_mentions(&msg.content, &st.participants);
        for m in std::mem::take(&mut msg.mentions) {
            let m = chorus_core::participant::normalize(&m);
            if !m.is_empty() && !found.contains(&m) {
                found.push(m);
            }
        }
        msg.mentions = found;

        st.context.add(&msg);
        debug!(
            "context: {} from {} ({} entries)",
            msg.kind.role(),
            msg.sender,
            st.context.len()
        );

        match msg.kind {
            SenderKind::Human => {
                self.events.emit(ChorusEvent::MessageAccepted {
                    message: msg.clone(),
                });
                if let Some(t) = st.sleep.record_human_activity() {
                    self.announce(t);
                }
                self.ensure_driver();
                let trigger = Trigger::from(&msg);
                let scheduled = self.run_pass(st, &trigger, PassKind::Human);
                info!("pass: human message from {}, {scheduled} responders", msg.sender);
            }
            SenderKind::Agent => {
                self.events.emit(ChorusEvent::ResponseProduced {
                    message: msg.clone(),
                });
                let author = msg.sender_id.clone().unwrap_or_default();
                if let Some(p) = st.participant_mut(&author) {
                    p.last_response_at = Some(msg.timestamp);
                }
                if let Some(t) = st.sleep.record_agent_message() {
                    self.announce(t);
                }
                let addresses_others = msg.mentions.iter().any(|m| {
                    mentions::resolve(m, &st.participants).is_some_and(|p| p.id != author)
                });
                if addresses_others && !st.sleep.is_asleep() {
                    let trigger = Trigger::from(&msg);
                    let scheduled = self.run_pass(st, &trigger, PassKind::Background);
                    debug!("pass: {} addressed others, {scheduled} responders", msg.sender);
                }
            }
            SenderKind::System => {
                self.events.emit(ChorusEvent::MessageAccepted { message: msg });
            }
        }
        Ok(())
    }

    pub(super) fn announce(&self, transition: Transition) {
        match transition {
            Transition::Slept(reason) => {
                info!("sleep: participants asleep ({reason:?})");
                self.events.emit(ChorusEvent::Slept { reason });
            }
            Transition::Woke(reason) => {
                info!("sleep: participants awake ({reason:?})");
                self.events.emit(ChorusEvent::Woke { reason });
            }
        }
    }

    /// Record a new topic and post a system message announcing it.
    pub async fn change_topic(
        self: &Arc<Self>,
        topic: &str,
        author: &str,
    ) -> Result<Uuid, ChorusError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ChorusError::InvalidMessage("empty topic".into()));
        }
        {
            let mut st = self.state.lock().await;
            st.topic = Some(topic.to_string());
        }
        info!("topic: {author} set '{topic}'");
        self.events.emit(ChorusEvent::TopicChanged {
            topic: topic.to_string(),
            author: author.to_string(),
        });
        let announcement = Message::system(format!("{author} changed the topic to: {topic}"))
            .with_priority(self.config.scheduler.human_priority)
            .with_room(self.config.chorus.room.clone());
        self.ingest(announcement).await
    }

    /// Administrative wake: reset the counter and restart the driver.
    pub async fn wake(self: &Arc<Self>) {
        let transition = self.state.lock().await.sleep.wake();
        if let Some(t) = transition {
            self.announce(t);
        }
        self.ensure_driver();
    }

    /// Administrative sleep. Armed timers stay armed but find everyone asleep.
    pub async fn sleep(&self) {
        let transition = self.state.lock().await.sleep.sleep();
        if let Some(t) = transition {
            self.announce(t);
        }
    }

    pub async fn status(&self) -> StatusSnapshot {
        let st = self.state.lock().await;
        StatusSnapshot {
            queue_depth: st.queue.len(),
            asleep: st.sleep.is_asleep(),
            sleep_reason: st.sleep.reason(),
            unattended: st.sleep.unattended(),
            threshold: st.sleep.threshold(),
            participants: st.participants.len(),
            active: st.participants.iter().filter(|p| p.active).count(),
            generating: st
                .participants
                .iter()
                .filter(|p| p.generating)
                .map(|p| p.id.clone())
                .collect(),
            pending_responses: st.pending.len(),
            context_len: st.context.len(),
            topic: st.topic.clone(),
            driver_running: self.driver.is_running(),
        }
    }

    pub async fn participants(&self) -> Vec<Participant> {
        self.state.lock().await.participants.clone()
    }

    /// The most recent `limit` context entries, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<ContextEntry> {
        let st = self.state.lock().await;
        st.context.window(limit).into_iter().cloned().collect()
    }

    /// Toggle whether a participant can be selected.
    pub async fn set_active(&self, participant_id: &str, active: bool) -> Result<(), ChorusError> {
        let mut st = self.state.lock().await;
        let p = st
            .participant_mut(participant_id)
            .ok_or_else(|| ChorusError::UnknownParticipant(participant_id.to_string()))?;
        p.active = active;
        info!("participant {participant_id}: active={active}");
        Ok(())
    }

    /// Remove a participant and cancel its armed timers. A generation
    /// already in flight finishes but its result is discarded.
    pub async fn remove_participant(&self, participant_id: &str) -> Result<Participant, ChorusError> {
        let mut st = self.state.lock().await;
        let pos = st
            .participants
            .iter()
            .position(|p| p.id == participant_id)
            .ok_or_else(|| ChorusError::UnknownParticipant(participant_id.to_string()))?;
        let removed = st.participants.remove(pos);
        st.generators.remove(participant_id);
        let cancelled = st.cancel_where(|id| id != participant_id);
        info!("participant {participant_id}: removed, {cancelled} timers cancelled");
        Ok(removed)
    }

    /// Stop the driver, cancel armed timers, empty the room, detach subscribers.
    pub async fn teardown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.driver.stop();
        let mut st = self.state.lock().await;
        let cancelled = st.cancel_where(|_| false);
        st.queue.clear();
        st.context.clear();
        st.participants.clear();
        st.generators.clear();
        drop(st);
        self.events.close();
        info!("orchestrator: shut down, {cancelled} timers cancelled");
    }
}
