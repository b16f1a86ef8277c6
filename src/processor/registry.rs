//! Registry of per-user message processors

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{GenerationGuard, MessageProcessor};

/// Outcome of submitting one inbound message.
#[derive(Debug)]
pub struct Submission {
    /// The user's processor
    pub processor: Arc<MessageProcessor>,
    /// Present when this submission became the active generation
    pub guard: Option<GenerationGuard>,
}

impl Submission {
    /// Whether the message was buffered behind a running generation.
    pub fn is_deferred(&self) -> bool {
        self.guard.is_none()
    }
}

/// Creates processors on first contact and evicts them once idle.
///
/// Appends and evictions are serialized by the map mutex, so a message can
/// never land in a processor that has just been removed.
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    processors: Mutex<HashMap<String, Arc<MessageProcessor>>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<MessageProcessor>>> {
        self.processors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(
        map: &mut HashMap<String, Arc<MessageProcessor>>,
        user_id: &str,
    ) -> Arc<MessageProcessor> {
        Arc::clone(map.entry(user_id.to_string()).or_insert_with(|| {
            debug!(user_id, "Creating message processor");
            Arc::new(MessageProcessor::new(user_id))
        }))
    }

    /// Return the user's processor, creating it if needed.
    pub fn get_or_create(&self, user_id: &str) -> Arc<MessageProcessor> {
        Self::entry(&mut self.map(), user_id)
    }

    /// Return the user's processor if one exists.
    pub fn get(&self, user_id: &str) -> Option<Arc<MessageProcessor>> {
        self.map().get(user_id).cloned()
    }

    /// Buffer a message for the user without attempting a generation.
    pub fn append(&self, user_id: &str, text: &str) {
        let mut map = self.map();
        Self::entry(&mut map, user_id).append(text);
    }

    /// Buffer a message and try to become the user's active generation.
    pub fn submit(&self, user_id: &str, text: &str) -> Submission {
        let mut map = self.map();
        let processor = Self::entry(&mut map, user_id);
        let guard = processor.append_and_try_acquire(text);
        Submission { processor, guard }
    }

    /// Remove the user's processor iff its buffer is empty and its lock is
    /// free. Safe to call speculatively; returns whether it was removed.
    pub fn evict(&self, user_id: &str) -> bool {
        let mut map = self.map();
        let evictable = map
            .get(user_id)
            .map(|processor| processor.is_evictable())
            .unwrap_or(false);
        if evictable {
            map.remove(user_id);
            debug!(user_id, "Evicted message processor");
        }
        evictable
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.map().contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// User ids with a live processor, sorted.
    pub fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_reuses_entry() {
        let registry = ProcessorRegistry::new();
        let a = registry.get_or_create("u1");
        let b = registry.get_or_create("u1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("u2").is_none());
    }

    #[test]
    fn test_submit_first_acquires_second_defers() {
        let registry = ProcessorRegistry::new();
        let first = registry.submit("u1", "hi");
        assert!(!first.is_deferred());

        let second = registry.submit("u1", "how are you");
        assert!(second.is_deferred());
        assert_eq!(first.processor.snapshot(), vec!["hi", "how are you"]);
    }

    #[test]
    fn test_evict_refuses_busy_processor() {
        let registry = ProcessorRegistry::new();
        let submission = registry.submit("u1", "hi");
        assert!(!registry.evict("u1"));

        let guard = submission.guard.unwrap();
        submission.processor.release(guard);
        assert!(registry.evict("u1"));
        assert!(!registry.contains("u1"));
    }

    #[test]
    fn test_evict_refuses_nonempty_unlocked() {
        let registry = ProcessorRegistry::new();
        registry.append("u1", "buffered");
        assert!(!registry.evict("u1"));
        assert!(registry.contains("u1"));
    }

    #[test]
    fn test_evict_unknown_is_noop() {
        let registry = ProcessorRegistry::new();
        assert!(!registry.evict("ghost"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_users_are_independent() {
        let registry = ProcessorRegistry::new();
        let a = registry.submit("alice", "x");
        let b = registry.submit("bob", "y");
        assert!(!a.is_deferred());
        assert!(!b.is_deferred());
        assert_eq!(registry.user_ids(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_submit_after_eviction_creates_fresh_processor() {
        let registry = ProcessorRegistry::new();
        let first = registry.submit("u1", "one");
        first.processor.release(first.guard.unwrap());
        assert!(registry.evict("u1"));

        let second = registry.submit("u1", "two");
        assert!(!Arc::ptr_eq(&first.processor, &second.processor));
        assert_eq!(second.processor.snapshot(), vec!["two"]);
    }
}
