//! Priority-ordered dispatch queue.
//!
//! Messages are kept sorted by non-increasing priority. A new message goes in
//! front of the first queued message with strictly lower priority, so equal
//! priorities stay in arrival order.

use chorus_core::message::Message;
use chrono::Utc;
use std::collections::VecDeque;
use uuid::Uuid;

/// What happened to an enqueued message.
#[derive(Debug)]
pub enum Enqueued {
    Queued(Uuid),
    /// The queue was full; the lowest-priority newest message was dropped.
    Evicted { id: Uuid, evicted: Message },
    /// The queue was full and nothing queued had lower priority.
    Rejected(Message),
}

#[derive(Debug)]
pub struct DispatchQueue {
    items: VecDeque<Message>,
    human_priority: i32,
    max_len: usize,
    draining: bool,
}

impl DispatchQueue {
    pub fn new(human_priority: i32, max_len: usize) -> Self {
        Self {
            items: VecDeque::new(),
            human_priority,
            max_len: max_len.max(1),
            draining: false,
        }
    }

    /// Stamp the message and insert it at its priority position.
    pub fn enqueue(&mut self, mut msg: Message) -> Enqueued {
        msg.id = Uuid::new_v4();
        msg.timestamp = Utc::now();
        if msg.is_human() {
            msg.priority = self.human_priority;
        }

        let id = msg.id;
        let mut outcome = Enqueued::Queued(id);
        if self.items.len() >= self.max_len {
            match self.items.back() {
                Some(tail) if msg.priority > tail.priority => {
                    if let Some(evicted) = self.items.pop_back() {
                        outcome = Enqueued::Evicted { id, evicted };
                    }
                }
                _ => return Enqueued::Rejected(msg),
            }
        }

        let pos = self
            .items
            .iter()
            .position(|queued| queued.priority < msg.priority)
            .unwrap_or(self.items.len());
        self.items.insert(pos, msg);
        outcome
    }

    /// Claim the drain loop. Returns `false` if a drain is already running.
    pub fn begin_drain(&mut self) -> bool {
        if self.draining {
            return false;
        }
        self.draining = true;
        true
    }

    /// Pop the head, or release the drain claim when the queue is empty.
    ///
    /// Doing both under one borrow means a message enqueued concurrently is
    /// either popped by the running loop or starts a new one, never neither.
    pub fn next_or_finish(&mut self) -> Option<Message> {
        let next = self.items.pop_front();
        if next.is_none() {
            self.draining = false;
        }
        next
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
