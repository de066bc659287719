//! # Concierge - graph-backed memory and habits for personal assistants
//!
//! Persists user memories, detected habits, intents and actions in a
//! graph encoded over SQLite, and assembles that context into prompt
//! documents for a chat model. See `Assistant` for the public surface.

pub mod context;
pub mod error;
pub mod habits;
pub mod intents;
pub mod memory;
pub mod store;
pub mod types;

pub use context::{ChatModel, ContextAssembler, EchoModel, UserContext};
pub use error::{AssistantError, Result};
pub use habits::{
    HabitEngine, CONFIDENCE_CEILING, CONFIDENCE_FLOOR, CONFIDENCE_STEP, PROMOTION_THRESHOLD,
};
pub use intents::IntentLog;
pub use memory::MemoryStore;
pub use store::GraphStore;
pub use types::{
    ActionId, ActionObservation, ActionRecord, Event, Habit, Intent, IntentId, Memory, MemoryId,
    Reminder, Task, UserProfile,
};

use std::path::Path;
use std::sync::Arc;

/// Default minimum confidence when listing habits
pub const DEFAULT_MIN_CONFIDENCE: f64 = habits::CONFIDENCE_FLOOR;

/// The assistant backend: one graph store, one of each component
#[derive(Clone)]
pub struct Assistant {
    store: Arc<GraphStore>,
    memories: MemoryStore,
    intents: IntentLog,
    habits: HabitEngine,
    context: ContextAssembler,
    chat_model: Option<Arc<dyn ChatModel>>,
    data_dir: std::path::PathBuf,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Assistant {
    /// Open (or create) the assistant backend in the given data
    /// directory. The schema is ensured before this returns.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let store = GraphStore::connect(data_dir.join("assistant.db")).await?;
        Ok(Self::wire(store, data_dir))
    }

    /// In-memory backend for tests
    pub async fn open_in_memory() -> Self {
        let store = GraphStore::connect_in_memory().await;
        Self::wire(store, std::path::PathBuf::from(":memory:"))
    }

    fn wire(store: Arc<GraphStore>, data_dir: std::path::PathBuf) -> Self {
        let memories = MemoryStore::new(Arc::clone(&store));
        let intents = IntentLog::new(Arc::clone(&store));
        let habits = HabitEngine::new(Arc::clone(&store));
        let context =
            ContextAssembler::new(Arc::clone(&store), memories.clone(), habits.clone());

        Self {
            store,
            memories,
            intents,
            habits,
            context,
            chat_model: None,
            data_dir,
        }
    }

    /// Attach a chat model; required only for `chat`
    pub fn with_chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    // ─── Memory ───────────────────────────────────────────────────────

    /// Store a new memory; returns its id
    pub async fn store_memory(
        &self,
        user_id: &str,
        content: &str,
        context_type: &str,
        entities: &[String],
        embedding: &[f32],
    ) -> Result<MemoryId> {
        self.memories
            .store(user_id, content, context_type, entities, embedding)
            .await
    }

    /// Recall memories, newest first; see `MemoryStore::recall` for
    /// filter precedence
    pub async fn recall_memories(
        &self,
        user_id: &str,
        context_type: Option<&str>,
        entity: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Memory>> {
        self.memories.recall(user_id, context_type, entity, limit).await
    }

    /// Delete a memory and its links; idempotent
    pub async fn delete_memory(&self, memory_id: &str) -> Result<()> {
        self.memories.delete(memory_id).await
    }

    // ─── Intents and actions ──────────────────────────────────────────

    /// Log an intent. Also records an action observation for the habit
    /// engine, with `intent_type` as the action and `raw_input` as its
    /// context.
    pub async fn log_intent(
        &self,
        user_id: &str,
        raw_input: &str,
        intent_type: &str,
        confidence: f64,
        triggered_memory_id: Option<&str>,
    ) -> Result<IntentId> {
        let intent_id = self
            .intents
            .log_intent(user_id, raw_input, intent_type, confidence, triggered_memory_id)
            .await?;
        self.habits.record_action(user_id, intent_type, raw_input).await?;
        Ok(intent_id)
    }

    /// Log an action resulting from an existing intent
    pub async fn log_action(
        &self,
        intent_id: &str,
        action_type: &str,
        payload: &serde_json::Value,
        status: &str,
    ) -> Result<ActionId> {
        self.intents.log_action(intent_id, action_type, payload, status).await
    }

    // ─── Habits ───────────────────────────────────────────────────────

    /// Record one occurrence of (action_type, context) for a user
    pub async fn record_action(
        &self,
        user_id: &str,
        action_type: &str,
        context: &str,
    ) -> Result<()> {
        self.habits.record_action(user_id, action_type, context).await
    }

    /// Get habits at or above `min_confidence`, most entrenched first
    pub async fn get_habits(&self, user_id: &str, min_confidence: f64) -> Result<Vec<Habit>> {
        self.habits.get_habits(user_id, min_confidence).await
    }

    // ─── Context and chat ─────────────────────────────────────────────

    /// Assemble the full user context document
    pub async fn get_full_context(&self, user_id: &str) -> Result<UserContext> {
        self.context.full_context(user_id).await
    }

    /// One chat turn: assemble context, ask the model, persist the
    /// exchange as a conversation memory and log the intent
    pub async fn chat(&self, user_id: &str, message: &str) -> Result<String> {
        let model = self.chat_model.as_ref().ok_or_else(|| {
            AssistantError::Configuration("no chat model attached".to_string())
        })?;

        let context = self.context.full_context(user_id).await?;
        let prompt = context.render_prompt();
        let reply = model.complete(&prompt, message).await?;

        self.store_memory(
            user_id,
            &format!("User said: {message} | Assistant replied: {reply}"),
            "conversation",
            &[],
            &[],
        )
        .await?;
        self.log_intent(user_id, message, "conversation", 1.0, None).await?;

        tracing::info!(user_id, "chat turn persisted");
        Ok(reply)
    }

    // ─── Lifecycle and access ─────────────────────────────────────────

    /// Get the underlying graph store
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Close the store; part of explicit shutdown
    pub async fn close(&self) {
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_intent_records_action_observation() {
        let assistant = Assistant::open_in_memory().await;

        for _ in 0..3 {
            assistant
                .log_intent("u1", "snooze", "snooze_alarm", 1.0, None)
                .await
                .unwrap();
        }

        // intent_type/raw_input doubled as the observation triple
        let habits = assistant.get_habits("u1", DEFAULT_MIN_CONFIDENCE).await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].action_type, "snooze_alarm");
        assert_eq!(habits[0].context, "snooze");
    }

    #[tokio::test]
    async fn test_chat_requires_model() {
        let assistant = Assistant::open_in_memory().await;
        let err = assistant.chat("u1", "hello").await.unwrap_err();
        assert!(matches!(err, AssistantError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_chat_persists_conversation_memory_and_intent() {
        let assistant = Assistant::open_in_memory()
            .await
            .with_chat_model(Arc::new(EchoModel));

        let reply = assistant.chat("u1", "hello there").await.unwrap();
        assert!(reply.contains("hello there"));

        let memories = assistant
            .recall_memories("u1", Some("conversation"), None, 10)
            .await
            .unwrap();
        assert_eq!(memories.len(), 1);
        assert!(memories[0].content.contains("User said: hello there"));
        assert!(memories[0].content.contains(&reply));

        // The conversation intent was observed by the habit engine
        let obs = assistant
            .habits
            .observation("u1", "conversation", "hello there")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(obs.count, 1);
    }

    #[tokio::test]
    async fn test_full_context_after_chat() {
        let assistant = Assistant::open_in_memory()
            .await
            .with_chat_model(Arc::new(EchoModel));

        assistant.chat("u1", "good morning").await.unwrap();
        let ctx = assistant.get_full_context("u1").await.unwrap();

        assert_eq!(ctx.recent_memories.len(), 1);
        assert!(ctx.render_prompt().contains("User said: good morning"));
    }

    #[tokio::test]
    async fn test_deleted_memory_never_recalled() {
        let assistant = Assistant::open_in_memory().await;
        let id = assistant
            .store_memory("u1", "ephemeral", "note", &[], &[])
            .await
            .unwrap();

        assistant.delete_memory(&id).await.unwrap();
        let memories = assistant.recall_memories("u1", None, None, 10).await.unwrap();
        assert!(memories.iter().all(|m| m.memory_id != id));
    }

    #[tokio::test]
    async fn test_file_backed_assistant_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::new(dir.path()).await.unwrap();

        let id = assistant
            .store_memory("u1", "persisted", "note", &[], &[])
            .await
            .unwrap();
        assistant.close().await;

        // Reopen against the same directory; schema init is idempotent
        let assistant = Assistant::new(dir.path()).await.unwrap();
        let memories = assistant.recall_memories("u1", None, None, 10).await.unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].memory_id, id);
    }
}
