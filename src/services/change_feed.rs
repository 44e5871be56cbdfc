// src/services/change_feed.rs

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;

use crate::models::{
    board::{ChangeEvent, ChangeKind},
    collection::CollectionCase,
};

/// Quem acompanha o quadro de fora. Disparado depois de toda mutação
/// otimista e de todo rollback; o último evento de um id é o estado vigente.
pub trait RecordObserver: Send + Sync {
    fn on_record_changed(&self, case: &CollectionCase);
    fn on_record_removed(&self, id: &str);
}

pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// Feed em memória com número de sequência, consultado por `GET /changes`.
#[derive(Debug)]
pub struct ChangeFeed {
    inner: Mutex<FeedState>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct FeedState {
    events: VecDeque<ChangeEvent>,
    next_seq: u64,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(FeedState {
                events: VecDeque::with_capacity(capacity.min(DEFAULT_FEED_CAPACITY)),
                next_seq: 1,
            }),
            capacity: capacity.max(1),
        }
    }

    fn push(&self, kind: ChangeKind) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let seq = state.next_seq;
        state.next_seq += 1;
        if state.events.len() == self.capacity {
            state.events.pop_front();
        }
        state.events.push_back(ChangeEvent { seq, kind, at: Utc::now() });
    }

    /// Eventos com sequência maior que `after`, em ordem.
    pub fn since(&self, after: u64) -> Vec<ChangeEvent> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.events.iter().filter(|e| e.seq > after).cloned().collect()
    }

    pub fn latest_seq(&self) -> u64 {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.next_seq - 1
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl RecordObserver for ChangeFeed {
    fn on_record_changed(&self, case: &CollectionCase) {
        self.push(ChangeKind::Changed { case: case.clone() });
    }

    fn on_record_removed(&self, id: &str) {
        self.push(ChangeKind::Removed { id: id.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_drops_oldest() {
        let feed = ChangeFeed::new(2);
        feed.on_record_changed(&CollectionCase::new("1", "Ana", "2025-01"));
        feed.on_record_changed(&CollectionCase::new("2", "Bia", "2025-01"));
        feed.on_record_removed("1");

        assert_eq!(feed.latest_seq(), 3);
        let events = feed.since(0);
        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
        assert_eq!(events[1].kind, ChangeKind::Removed { id: "1".into() });

        assert!(feed.since(3).is_empty());
    }
}
