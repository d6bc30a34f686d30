//! Conversation Threads
//!
//! A thread id correlates successive invocations so the model sees earlier
//! turns. History lives in a [`ThreadStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::Conversation;

/// Opaque conversation identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ThreadId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_string(s))
    }
}

/// Stored conversation state for one thread
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,

    pub conversation: Conversation,

    /// User the thread was opened for
    pub user_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(id: ThreadId) -> Self {
        let now = Utc::now();
        Self {
            id,
            conversation: Conversation::new(),
            user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Number of completed user turns
    pub fn turns(&self) -> usize {
        self.conversation.with_role(crate::message::Role::User).count()
    }
}

/// Thread persistence
pub trait ThreadStore: Send + Sync {
    fn save(&self, thread: &Thread) -> Result<()>;

    fn load(&self, id: &ThreadId) -> Result<Option<Thread>>;

    fn delete(&self, id: &ThreadId) -> Result<()>;

    /// Most recently updated threads first
    fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<Thread>>;
}

/// In-memory thread store; history lives for the process lifetime
#[derive(Default)]
pub struct MemoryThreadStore {
    threads: RwLock<HashMap<ThreadId, Thread>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E>(_: E) -> AgentError {
    AgentError::Thread("thread store lock poisoned".into())
}

impl ThreadStore for MemoryThreadStore {
    fn save(&self, thread: &Thread) -> Result<()> {
        let mut threads = self.threads.write().map_err(poisoned)?;
        threads.insert(thread.id.clone(), thread.clone());
        Ok(())
    }

    fn load(&self, id: &ThreadId) -> Result<Option<Thread>> {
        let threads = self.threads.read().map_err(poisoned)?;
        Ok(threads.get(id).cloned())
    }

    fn delete(&self, id: &ThreadId) -> Result<()> {
        let mut threads = self.threads.write().map_err(poisoned)?;
        threads.remove(id);
        Ok(())
    }

    fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<Thread>> {
        let threads = self.threads.read().map_err(poisoned)?;
        let mut result: Vec<_> = threads
            .values()
            .filter(|t| user_id.is_none_or(|uid| t.user_id.as_deref() == Some(uid)))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_thread_id_is_transparent() {
        let id = ThreadId::from_string("1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1\"");
        assert_eq!("1".parse::<ThreadId>().unwrap(), id);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryThreadStore::new();
        let mut thread = Thread::new(ThreadId::from_string("1"));
        thread.conversation.push(Message::user("What is my stock?"));
        store.save(&thread).unwrap();

        let loaded = store.load(&thread.id).unwrap().unwrap();
        assert_eq!(loaded.turns(), 1);

        store.delete(&thread.id).unwrap();
        assert!(store.load(&thread.id).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_by_user() {
        let store = MemoryThreadStore::new();
        for (id, user) in [("a", "jake"), ("b", "jack"), ("c", "jake")] {
            let mut thread = Thread::new(ThreadId::from_string(id));
            thread.user_id = Some(user.into());
            store.save(&thread).unwrap();
        }

        assert_eq!(store.list(Some("jake"), 10).unwrap().len(), 2);
        assert_eq!(store.list(None, 1).unwrap().len(), 1);
    }
}
