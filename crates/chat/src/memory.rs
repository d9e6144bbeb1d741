//! Conversation memory and session registry.
//!
//! Each session owns exactly one [`ConversationMemory`]; the registry hands
//! out the per-session lock so that two requests for the same session are
//! serialized while requests for different sessions proceed without
//! contention.

use crate::types::ConversationTurn;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Append-only ordered log of turns with a bounded recall window.
#[derive(Debug)]
pub struct ConversationMemory {
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
}

impl ConversationMemory {
    /// Create an empty memory bounded at `max_turns`.
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// Append a completed turn, evicting the oldest turn when full.
    ///
    /// This is the only mutator; eviction never reorders surviving turns.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// The last `n` turns in chronological order, oldest first.
    ///
    /// This ordering becomes prompt history for the response generator.
    pub fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    /// Every stored turn in chronological order.
    pub fn all(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    /// Number of stored turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when no turns are stored.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every stored turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Session-scoped memory store.
///
/// Memories are created on first use and torn down explicitly; there is no
/// process-wide shared conversation state.
pub struct SessionRegistry {
    max_turns: usize,
    sessions: RwLock<HashMap<String, Arc<Mutex<ConversationMemory>>>>,
}

impl SessionRegistry {
    /// Create a registry whose sessions are bounded at `max_turns`.
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a session's memory, creating it on first use.
    ///
    /// The returned lock serializes requests for the same session.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<ConversationMemory>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(memory) = sessions.get(session_id) {
                return Arc::clone(memory);
            }
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(ConversationMemory::new(self.max_turns)))),
        )
    }

    /// Fetch a session's memory without creating it.
    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<ConversationMemory>>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Tear down a session. Other sessions are unaffected.
    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;
    use crate::types::Message;

    fn turn(label: &str) -> ConversationTurn {
        ConversationTurn {
            user: Message::user(format!("q-{}", label)),
            assistant: Message::assistant(format!("a-{}", label)),
            intent: Intent::General,
            context: Vec::new(),
        }
    }

    #[test]
    fn test_append_then_recent_returns_just_appended() {
        let mut memory = ConversationMemory::new(5);
        memory.append(turn("only"));

        let recent = memory.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user.text, "q-only");
    }

    #[test]
    fn test_recent_is_chronological_oldest_first() {
        let mut memory = ConversationMemory::new(5);
        memory.append(turn("1"));
        memory.append(turn("2"));
        memory.append(turn("3"));

        let recent = memory.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].user.text, "q-2");
        assert_eq!(recent[1].user.text, "q-3");
    }

    #[test]
    fn test_fifo_eviction_drops_oldest() {
        let max = 3;
        let mut memory = ConversationMemory::new(max);
        for i in 0..=max {
            memory.append(turn(&i.to_string()));
        }

        assert_eq!(memory.len(), max);
        let all = memory.recent(max);
        // Turn 0 was evicted, order of the rest preserved
        assert_eq!(all[0].user.text, "q-1");
        assert_eq!(all[2].user.text, "q-3");
    }

    #[test]
    fn test_clear_resets_to_empty() {
        let mut memory = ConversationMemory::new(5);
        memory.append(turn("x"));
        memory.clear();
        assert!(memory.is_empty());
        assert!(memory.recent(5).is_empty());
    }

    #[tokio::test]
    async fn test_registry_creates_on_first_use() {
        let registry = SessionRegistry::new(5);
        assert_eq!(registry.count().await, 0);

        let memory = registry.get_or_create("session-a").await;
        memory.lock().await.append(turn("a"));

        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_registry_sessions_are_isolated() {
        let registry = SessionRegistry::new(5);

        let a = registry.get_or_create("session-a").await;
        a.lock().await.append(turn("a"));

        let b = registry.get_or_create("session-b").await;
        assert!(b.lock().await.is_empty());

        // Clearing one session leaves the other intact
        a.lock().await.clear();
        let a_again = registry.get_or_create("session-a").await;
        assert!(a_again.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_registry_remove_tears_down_one_session() {
        let registry = SessionRegistry::new(5);
        registry.get_or_create("session-a").await;
        registry.get_or_create("session-b").await;

        assert!(registry.remove("session-a").await);
        assert!(!registry.remove("session-a").await);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_registry_same_session_shares_memory() {
        let registry = SessionRegistry::new(5);

        let first = registry.get_or_create("session-a").await;
        first.lock().await.append(turn("a"));

        let second = registry.get_or_create("session-a").await;
        assert_eq!(second.lock().await.len(), 1);
    }
}
