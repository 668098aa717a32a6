//! Bounded sliding window of recent conversation.

use chorus_core::{context::ContextEntry, message::Message};
use std::collections::VecDeque;

#[derive(Debug)]
pub struct ContextStore {
    entries: VecDeque<ContextEntry>,
    capacity: usize,
}

impl ContextStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message; internal messages are ignored. Evicts oldest first.
    pub fn add(&mut self, msg: &Message) {
        if msg.internal {
            return;
        }
        self.entries.push_back(ContextEntry::from(msg));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// The most recent `limit` entries, oldest first.
    pub fn window(&self, limit: usize) -> Vec<&ContextEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).collect()
    }

    pub fn last(&self) -> Option<&ContextEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(n: usize) -> Message {
        Message::human("You", n.to_string())
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut store = ContextStore::new(3);
        for n in 0..5 {
            store.add(&msg(n));
            assert!(store.len() <= 3);
        }
        let contents: Vec<_> = store.window(10).iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_internal_messages_are_ignored() {
        let mut store = ContextStore::new(3);
        store.add(&Message::system("directive").internal());
        assert!(store.is_empty());
        assert!(store.last().is_none());
    }

    #[test]
    fn test_window_returns_most_recent() {
        let mut store = ContextStore::new(10);
        for n in 0..6 {
            store.add(&msg(n));
        }
        let window = store.window(2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "4");
        assert_eq!(window[1].content, "5");
        assert_eq!(store.last().unwrap().content, "5");
        assert_eq!(store.window(0).len(), 0);
    }

    #[test]
    fn test_clear() {
        let mut store = ContextStore::new(2);
        store.add(&msg(1));
        store.clear();
        assert!(store.is_empty());
    }
}
