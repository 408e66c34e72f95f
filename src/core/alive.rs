//! # Bridge liveness tracker with sequence-based ordering.
//!
//! Maintains which bridges are currently alive, using event sequence numbers to
//! handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! BridgeActor ──► Bus ──► Host listener ──► AliveTracker::update()
//!                                                  │
//!                                                  ▼
//!                                       HashMap<Arc<str>, BridgeState>
//!                                            (name → {seq, alive})
//! ```
//!
//! ## Rules
//! - Only `BridgeStarted` and terminal events change alive state
//! - Other events **update seq** but don't affect alive status
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone)]
struct BridgeState {
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of alive bridges.
///
/// Feeds the stuck list reported when shutdown exceeds its grace period.
pub(crate) struct AliveTracker {
    state: RwLock<HashMap<Arc<str>, BridgeState>>,
}

impl AliveTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies `ev` if it is newer than the last event seen for its bridge.
    ///
    /// Returns `true` when the alive state changed.
    /// ```text
    /// update(BridgeFinished, seq=100) → alive=false, last_seq=100
    /// update(BridgeStarted,  seq=99)  → rejected (stale)
    /// ```
    pub(crate) async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.bridge.as_ref() else {
            return false;
        };
        let tracked = ev.kind == EventKind::BridgeStarted || ev.kind.is_terminal();
        let mut state = self.state.write().await;
        if !tracked && !state.contains_key(name) {
            return false;
        }

        let entry = state.entry(Arc::clone(name)).or_insert(BridgeState {
            last_seq: 0,
            alive: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;
        match ev.kind {
            EventKind::BridgeStarted => {
                entry.alive = true;
                true
            }
            kind if kind.is_terminal() => {
                entry.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Sorted names of bridges currently alive.
    pub(crate) async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, st)| st.alive)
            .map(|(name, _)| name.to_string())
            .collect();
        alive.sort_unstable();
        alive
    }

    pub(crate) async fn is_alive(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .get(name)
            .map(|st| st.alive)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_start_and_terminal_events() {
        let alive = AliveTracker::new();
        assert!(alive.update(&Event::new(EventKind::BridgeStarted).with_bridge("b")).await);
        assert!(alive.update(&Event::new(EventKind::BridgeStarted).with_bridge("a")).await);
        assert_eq!(alive.snapshot().await, vec!["a", "b"]);

        assert!(alive.update(&Event::new(EventKind::BridgeAborted).with_bridge("a")).await);
        assert!(!alive.is_alive("a").await);
        assert!(alive.is_alive("b").await);
    }

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let alive = AliveTracker::new();
        let started = Event::new(EventKind::BridgeStarted).with_bridge("b");
        let finished = Event::new(EventKind::BridgeFinished).with_bridge("b");
        assert!(alive.update(&finished).await);
        assert!(!alive.update(&started).await);
        assert!(alive.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let alive = AliveTracker::new();
        assert!(!alive.update(&Event::new(EventKind::ShutdownRequested)).await);
        assert!(
            !alive
                .update(&Event::subscriber_overflow("log", "full"))
                .await
        );
        assert!(alive.snapshot().await.is_empty());
    }
}
