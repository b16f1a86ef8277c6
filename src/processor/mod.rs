//! Per-user message buffering and generation locking
//!
//! A [`MessageProcessor`] holds the inbound texts a user has sent since the
//! last settled generation, plus an exclusive non-reentrant lock marking the
//! one generation allowed to run for that user.
//!
//! Lock order is registry map, then buffer, then generation lock (try only).
//! Neither std mutex is held across an `.await`.

mod registry;

pub use registry::{ProcessorRegistry, Submission};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

/// Proof that the holder is the single active generation for a user.
///
/// Dropping the guard releases the lock without touching the buffer; use
/// [`MessageProcessor::settle`] or [`MessageProcessor::release`] to end a
/// generation.
#[derive(Debug)]
pub struct GenerationGuard {
    _lock: OwnedMutexGuard<()>,
}

/// Pending inbound messages and the generation lock for one user.
#[derive(Debug)]
pub struct MessageProcessor {
    user_id: String,
    pending: Mutex<Vec<String>>,
    generation: Arc<tokio::sync::Mutex<()>>,
}

impl MessageProcessor {
    /// Create an empty, unlocked processor.
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            pending: Mutex::new(Vec::new()),
            generation: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock_generation(&self) -> Option<GenerationGuard> {
        Arc::clone(&self.generation)
            .try_lock_owned()
            .ok()
            .map(|lock| GenerationGuard { _lock: lock })
    }

    /// Append a message to the tail of the buffer. Never blocks on a
    /// running generation.
    pub fn append(&self, text: &str) {
        self.buffer().push(text.to_string());
    }

    /// Append a message and, in the same critical section, try to become
    /// the active generation.
    pub fn append_and_try_acquire(&self, text: &str) -> Option<GenerationGuard> {
        let mut pending = self.buffer();
        pending.push(text.to_string());
        self.try_lock_generation()
    }

    /// Copy of the buffer, in arrival order.
    pub fn snapshot(&self) -> Vec<String> {
        self.buffer().clone()
    }

    /// Empty the buffer.
    pub fn clear(&self) {
        self.buffer().clear();
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    pub fn has_messages(&self) -> bool {
        !self.is_empty()
    }

    /// Whether a generation currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.generation.try_lock().is_err()
    }

    /// Try to become the active generation without blocking.
    pub fn try_acquire(&self) -> Option<GenerationGuard> {
        self.try_lock_generation()
    }

    /// Whether messages beyond the first `threshold` have arrived.
    pub fn has_newer_than(&self, threshold: usize) -> bool {
        self.len() > threshold
    }

    /// End a successful generation built from the first `threshold` messages.
    ///
    /// If more messages arrived, returns the guard so the caller can restart
    /// with a fresh snapshot. Otherwise clears the buffer and releases the
    /// lock. Both happen under the buffer mutex, so an append can never land
    /// between the check and the clear.
    pub fn settle(&self, guard: GenerationGuard, threshold: usize) -> Result<(), GenerationGuard> {
        let mut pending = self.buffer();
        if pending.len() > threshold {
            return Err(guard);
        }
        pending.clear();
        drop(guard);
        Ok(())
    }

    /// End a generation unconditionally: clear the buffer and release the
    /// lock.
    pub fn release(&self, guard: GenerationGuard) {
        let mut pending = self.buffer();
        pending.clear();
        drop(guard);
    }

    /// Whether the buffer is empty and no generation holds the lock.
    pub fn is_evictable(&self) -> bool {
        let pending = self.buffer();
        pending.is_empty() && self.generation.try_lock().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_processor_is_idle() {
        let processor = MessageProcessor::new("u1");
        assert_eq!(processor.user_id(), "u1");
        assert!(!processor.has_messages());
        assert!(!processor.is_locked());
        assert!(processor.is_evictable());
    }

    #[test]
    fn test_append_preserves_order() {
        let processor = MessageProcessor::new("u1");
        processor.append("hi");
        processor.append("how are you");
        processor.append("hi");
        assert_eq!(processor.snapshot(), vec!["hi", "how are you", "hi"]);
        assert_eq!(processor.len(), 3);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let processor = MessageProcessor::new("u1");
        processor.append("a");
        let snapshot = processor.snapshot();
        processor.append("b");
        assert_eq!(snapshot, vec!["a"]);
        assert_eq!(processor.len(), 2);
    }

    #[test]
    fn test_lock_is_exclusive() {
        let processor = MessageProcessor::new("u1");
        let guard = processor.try_acquire().unwrap();
        assert!(processor.is_locked());
        assert!(processor.try_acquire().is_none());
        assert!(processor.append_and_try_acquire("x").is_none());
        assert!(!processor.is_evictable());

        drop(guard);
        assert!(!processor.is_locked());
    }

    #[test]
    fn test_settle_clears_and_releases() {
        let processor = MessageProcessor::new("u1");
        let guard = processor.append_and_try_acquire("hello").unwrap();
        assert!(processor.settle(guard, 1).is_ok());
        assert!(!processor.has_messages());
        assert!(!processor.is_locked());
        assert!(processor.is_evictable());
    }

    #[test]
    fn test_settle_returns_guard_when_newer_messages() {
        let processor = MessageProcessor::new("u1");
        let guard = processor.append_and_try_acquire("hi").unwrap();
        processor.append("how are you");
        assert!(processor.has_newer_than(1));

        let guard = processor.settle(guard, 1).unwrap_err();
        assert!(processor.is_locked());
        assert_eq!(processor.snapshot(), vec!["hi", "how are you"]);

        assert!(processor.settle(guard, 2).is_ok());
        assert!(processor.is_evictable());
    }

    #[test]
    fn test_release_clears_unconditionally() {
        let processor = MessageProcessor::new("u1");
        let guard = processor.append_and_try_acquire("a").unwrap();
        processor.append("b");
        processor.release(guard);
        assert!(!processor.has_messages());
        assert!(!processor.is_locked());
    }

    #[test]
    fn test_append_never_blocks_while_locked() {
        let processor = MessageProcessor::new("u1");
        let _guard = processor.try_acquire().unwrap();
        processor.append("queued");
        assert_eq!(processor.snapshot(), vec!["queued"]);
    }
}
