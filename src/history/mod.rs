//! History module - Persisted conversation state
//!
//! This module provides:
//! - The [`HistoryStore`] trait the generation coordinator fetches history through
//! - [`ConversationStore`], an in-memory store with optional JSON-file persistence
//! - [`HistoryFormatter`], which projects history plus a system prompt into a prompt
//!
//! # Example
//!
//! ```
//! use turnstile::history::{ConversationStore, HistoryStore, Turn};
//!
//! # tokio_test::block_on(async {
//! let store = ConversationStore::new_memory();
//! store.append("user-1", &[Turn::user("Hello!")]).await.unwrap();
//!
//! let history = store.fetch_history("user-1").await.unwrap();
//! assert_eq!(history.len(), 1);
//! # });
//! ```

pub mod formatter;
pub mod types;

pub use formatter::HistoryFormatter;
pub use types::{Conversation, Role, ToolCallRequest, ToolCallResult, Turn};

use crate::config::Config;
use crate::error::{Result, TurnstileError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Persisted conversation history, keyed by user id.
///
/// Implementations may fail; a failed `fetch_history` ends the current
/// generation attempt.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fetch the full persisted history for a user, in original order.
    ///
    /// Unknown users have an empty history.
    async fn fetch_history(&self, user_id: &str) -> Result<Vec<Turn>>;

    /// Append turns to a user's history, preserving their order.
    async fn append(&self, user_id: &str, turns: &[Turn]) -> Result<()>;

    /// Delete a user's history.
    async fn clear(&self, user_id: &str) -> Result<()>;

    /// List user ids that have persisted history, sorted.
    async fn users(&self) -> Result<Vec<String>>;
}

/// Conversation store with an in-memory cache and optional file persistence.
///
/// When a storage directory is configured, each conversation is written to
/// `<dir>/<sanitized user id>.json` after every append.
///
/// The store uses `Arc<RwLock>` internally, so clones share the same cache.
/// Writes for one user are serialized by a per-user lock held from the cache
/// update through the file write.
#[derive(Clone, Default)]
pub struct ConversationStore {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
    write_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    storage_path: Option<PathBuf>,
}

impl ConversationStore {
    /// Create a store persisting to `~/.turnstile/conversations/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_path(Config::dir().join("conversations"))
    }

    /// Create an in-memory store without persistence.
    pub fn new_memory() -> Self {
        Self::default()
    }

    /// Create a store persisting to a custom directory.
    ///
    /// # Example
    /// ```no_run
    /// use turnstile::history::ConversationStore;
    /// use std::path::PathBuf;
    ///
    /// let store = ConversationStore::with_path(PathBuf::from("/tmp/conversations")).unwrap();
    /// ```
    pub fn with_path(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            storage_path: Some(path),
            ..Self::default()
        })
    }

    /// Build the store described by the `history` config section.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.history.backend {
            crate::config::HistoryBackend::Memory => Ok(Self::new_memory()),
            crate::config::HistoryBackend::File => match &config.history.path {
                Some(path) => Self::with_path(path.clone()),
                None => Self::new(),
            },
        }
    }

    /// The storage directory, if persistence is enabled.
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Get a user's full conversation record, if one exists.
    pub async fn get(&self, user_id: &str) -> Result<Option<Conversation>> {
        {
            let conversations = self.conversations.read().await;
            if let Some(conversation) = conversations.get(user_id) {
                return Ok(Some(conversation.clone()));
            }
        }

        let Some(conversation) = self.load_from_disk(user_id).await? else {
            return Ok(None);
        };

        let mut conversations = self.conversations.write().await;
        let cached = conversations
            .entry(user_id.to_string())
            .or_insert(conversation);
        Ok(Some(cached.clone()))
    }

    async fn load_from_disk(&self, user_id: &str) -> Result<Option<Conversation>> {
        let Some(ref storage_path) = self.storage_path else {
            return Ok(None);
        };
        let file_path = Self::file_path(storage_path, user_id);
        if !file_path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&file_path).await?;
        let conversation: Conversation = serde_json::from_str(&content).map_err(|e| {
            TurnstileError::History(format!(
                "corrupt conversation file {}: {}",
                file_path.display(),
                e
            ))
        })?;
        Ok(Some(conversation))
    }

    async fn write_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Write the conversation file atomically (temp file + rename).
    async fn persist(&self, conversation: &Conversation) -> Result<()> {
        if let Some(ref storage_path) = self.storage_path {
            let file_path = Self::file_path(storage_path, &conversation.user_id);
            let tmp = file_path.with_extension("tmp");
            let content = serde_json::to_string_pretty(conversation)?;
            tokio::fs::write(&tmp, content).await?;
            tokio::fs::rename(&tmp, &file_path).await?;
        }
        Ok(())
    }

    fn file_path(dir: &Path, user_id: &str) -> PathBuf {
        dir.join(format!("{}.json", Self::sanitize_key(user_id)))
    }

    /// Sanitize a user id for use as a filename.
    ///
    /// Percent-encoding keeps the mapping one-to-one, so distinct ids never
    /// share a file.
    fn sanitize_key(key: &str) -> String {
        let mut result = String::with_capacity(key.len() * 3);
        for c in key.chars() {
            match c {
                '/' => result.push_str("%2F"),
                '\\' => result.push_str("%5C"),
                ':' => result.push_str("%3A"),
                '*' => result.push_str("%2A"),
                '?' => result.push_str("%3F"),
                '"' => result.push_str("%22"),
                '<' => result.push_str("%3C"),
                '>' => result.push_str("%3E"),
                '|' => result.push_str("%7C"),
                '.' => result.push_str("%2E"),
                '%' => result.push_str("%25"),
                c => result.push(c),
            }
        }
        result
    }
}

#[async_trait]
impl HistoryStore for ConversationStore {
    async fn fetch_history(&self, user_id: &str) -> Result<Vec<Turn>> {
        Ok(self
            .get(user_id)
            .await?
            .map(|conversation| conversation.turns)
            .unwrap_or_default())
    }

    async fn append(&self, user_id: &str, turns: &[Turn]) -> Result<()> {
        let lock = self.write_lock(user_id).await;
        let _write = lock.lock().await;

        // Warm the cache from disk before taking the cache write lock.
        self.get(user_id).await?;

        let snapshot = {
            let mut conversations = self.conversations.write().await;
            let conversation = conversations
                .entry(user_id.to_string())
                .or_insert_with(|| Conversation::new(user_id));
            conversation.extend(turns);
            conversation.clone()
        };

        self.persist(&snapshot).await
    }

    async fn clear(&self, user_id: &str) -> Result<()> {
        let lock = self.write_lock(user_id).await;
        let _write = lock.lock().await;

        {
            let mut conversations = self.conversations.write().await;
            conversations.remove(user_id);
        }

        if let Some(ref storage_path) = self.storage_path {
            let file_path = Self::file_path(storage_path, user_id);
            if file_path.exists() {
                tokio::fs::remove_file(&file_path).await?;
            }
        }

        Ok(())
    }

    async fn users(&self) -> Result<Vec<String>> {
        let mut users: Vec<String> = {
            let conversations = self.conversations.read().await;
            conversations.keys().cloned().collect()
        };

        // Read each file for the real user id rather than reversing the filename.
        if let Some(ref storage_path) = self.storage_path {
            let mut entries = tokio::fs::read_dir(storage_path).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    if let Ok(content) = tokio::fs::read_to_string(&path).await {
                        if let Ok(conversation) = serde_json::from_str::<Conversation>(&content) {
                            if !users.contains(&conversation.user_id) {
                                users.push(conversation.user_id);
                            }
                        }
                    }
                }
            }
        }

        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unknown_user_has_empty_history() {
        let store = ConversationStore::new_memory();
        assert!(store.fetch_history("nobody").await.unwrap().is_empty());
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = ConversationStore::new_memory();
        store.append("u1", &[Turn::user("one")]).await.unwrap();
        store
            .append("u1", &[Turn::assistant("two"), Turn::user("three")])
            .await
            .unwrap();

        let history = store.fetch_history("u1").await.unwrap();
        let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_clear_and_users() {
        let store = ConversationStore::new_memory();
        store.append("bob", &[Turn::user("hi")]).await.unwrap();
        store.append("alice", &[Turn::user("hi")]).await.unwrap();
        assert_eq!(store.users().await.unwrap(), vec!["alice", "bob"]);

        store.clear("bob").await.unwrap();
        assert_eq!(store.users().await.unwrap(), vec!["alice"]);
        assert!(store.fetch_history("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_persistence_survives_new_store() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().to_path_buf();

        {
            let store = ConversationStore::with_path(path.clone()).unwrap();
            store
                .append("telegram:42", &[Turn::user("persist me")])
                .await
                .unwrap();
        }

        let reopened = ConversationStore::with_path(path.clone()).unwrap();
        let history = reopened.fetch_history("telegram:42").await.unwrap();
        assert_eq!(history, vec![Turn::user("persist me")]);
        assert_eq!(reopened.users().await.unwrap(), vec!["telegram:42"]);
        assert!(path.join("telegram%3A42.json").exists());
    }

    #[tokio::test]
    async fn test_file_clear_removes_file() {
        let temp = TempDir::new().unwrap();
        let store = ConversationStore::with_path(temp.path().to_path_buf()).unwrap();
        store.append("u1", &[Turn::user("x")]).await.unwrap();
        assert!(temp.path().join("u1.json").exists());

        store.clear("u1").await.unwrap();
        assert!(!temp.path().join("u1.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_history_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.json"), "{not json").unwrap();

        let store = ConversationStore::with_path(temp.path().to_path_buf()).unwrap();
        let err = store.fetch_history("broken").await.unwrap_err();
        assert!(matches!(err, TurnstileError::History(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_file_readable() {
        let temp = TempDir::new().unwrap();
        let store = ConversationStore::with_path(temp.path().to_path_buf()).unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let turn = Turn::user(&format!("message {} {}", i, "x".repeat(i * 64)));
                store.append("U", &[turn]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = ConversationStore::with_path(temp.path().to_path_buf()).unwrap();
        let history = reopened.fetch_history("U").await.unwrap();
        assert_eq!(history.len(), 8);
        assert_eq!(history, store.fetch_history("U").await.unwrap());
        assert!(!temp.path().join("U.tmp").exists());
    }

    #[test]
    fn test_sanitize_key_is_injective() {
        assert_eq!(ConversationStore::sanitize_key("a/b"), "a%2Fb");
        assert_eq!(ConversationStore::sanitize_key("a:b"), "a%3Ab");
        assert_eq!(ConversationStore::sanitize_key("../x"), "%2E%2E%2Fx");
        assert_ne!(
            ConversationStore::sanitize_key("a%2Fb"),
            ConversationStore::sanitize_key("a/b")
        );
    }
}
