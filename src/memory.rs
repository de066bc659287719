//! Memory store: CRUD for user memories and their entity links

use crate::error::{AssistantError, Result};
use crate::store::GraphStore;
use crate::types::{Memory, MemoryId};

use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

const MEMORY_COLUMNS: &str = "memory_id, user_id, content, context_type, embedding, \
                              created_at, access_count, last_accessed, strength";

/// Create/read/delete operations on Memory nodes
#[derive(Debug, Clone)]
pub struct MemoryStore {
    store: Arc<GraphStore>,
}

impl MemoryStore {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Store a new memory for a user, linking every named entity.
    ///
    /// The user and entities are upserted; the memory itself is always a
    /// new node with `access_count = 0` and link strength 1.0. Content is
    /// never mutated after creation.
    pub async fn store(
        &self,
        user_id: &str,
        content: &str,
        context_type: &str,
        entities: &[String],
        embedding: &[f32],
    ) -> Result<MemoryId> {
        let memory_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let embedding_json = serde_json::to_string(embedding)
            .map_err(|e| AssistantError::Serialization(e.to_string()))?;

        self.store.upsert_user(user_id).await?;

        sqlx::query(
            r#"
            INSERT INTO memories (
                memory_id, user_id, content, context_type, embedding,
                created_at, access_count, last_accessed, strength
            )
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, 1.0)
            "#,
        )
        .bind(&memory_id)
        .bind(user_id)
        .bind(content)
        .bind(context_type)
        .bind(&embedding_json)
        .bind(now)
        .bind(now)
        .execute(self.store.pool())
        .await?;

        for entity_name in entities {
            sqlx::query("INSERT INTO entities (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
                .bind(entity_name)
                .execute(self.store.pool())
                .await?;

            sqlx::query(
                r#"
                INSERT INTO memory_entities (memory_id, entity_name)
                VALUES (?, ?)
                ON CONFLICT(memory_id, entity_name) DO NOTHING
                "#,
            )
            .bind(&memory_id)
            .bind(entity_name)
            .execute(self.store.pool())
            .await?;
        }

        tracing::debug!(%memory_id, user_id, context_type, "memory stored");
        Ok(memory_id)
    }

    /// Recall a user's memories, newest first.
    ///
    /// At most one filter applies: `entity` takes precedence over
    /// `context_type` when both are supplied; with neither, the most
    /// recent `limit` memories are returned.
    pub async fn recall(
        &self,
        user_id: &str,
        context_type: Option<&str>,
        entity: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Memory>> {
        let rows = if let Some(entity) = entity {
            let query_str = format!(
                "SELECT {MEMORY_COLUMNS} \
                 FROM memories JOIN memory_entities USING (memory_id) \
                 WHERE user_id = ? AND entity_name = ? \
                 ORDER BY created_at DESC LIMIT ?"
            );
            sqlx::query(&query_str)
                .bind(user_id)
                .bind(entity)
                .bind(limit)
                .fetch_all(self.store.pool())
                .await?
        } else if let Some(context_type) = context_type {
            let query_str = format!(
                "SELECT {MEMORY_COLUMNS} \
                 FROM memories \
                 WHERE user_id = ? AND context_type = ? \
                 ORDER BY created_at DESC LIMIT ?"
            );
            sqlx::query(&query_str)
                .bind(user_id)
                .bind(context_type)
                .bind(limit)
                .fetch_all(self.store.pool())
                .await?
        } else {
            let query_str = format!(
                "SELECT {MEMORY_COLUMNS} \
                 FROM memories \
                 WHERE user_id = ? \
                 ORDER BY created_at DESC LIMIT ?"
            );
            sqlx::query(&query_str)
                .bind(user_id)
                .bind(limit)
                .fetch_all(self.store.pool())
                .await?
        };

        Ok(rows.iter().map(row_to_memory).collect())
    }

    /// Delete a memory and all its incident links atomically.
    ///
    /// Idempotent: deleting an unknown id is not an error.
    pub async fn delete(&self, memory_id: &str) -> Result<()> {
        let mut tx = self.store.pool().begin().await?;

        sqlx::query("DELETE FROM memory_entities WHERE memory_id = ?")
            .bind(memory_id)
            .execute(&mut *tx)
            .await?;

        // Cleanup is total: the trigger link on intents is an incident
        // edge of the memory and must not dangle
        sqlx::query("UPDATE intents SET triggered_memory_id = NULL WHERE triggered_memory_id = ?")
            .bind(memory_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM memories WHERE memory_id = ?")
            .bind(memory_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() > 0 {
            tracing::debug!(memory_id, "memory deleted");
        }
        Ok(())
    }
}

/// Helper: Convert database row to Memory
pub(crate) fn row_to_memory(row: &sqlx::sqlite::SqliteRow) -> Memory {
    let embedding_json: String = row.try_get("embedding").unwrap_or_default();
    let embedding: Vec<f32> = serde_json::from_str(&embedding_json).unwrap_or_default();

    Memory {
        memory_id: row.try_get("memory_id").unwrap_or_default(),
        user_id: row.try_get("user_id").unwrap_or_default(),
        content: row.try_get("content").unwrap_or_default(),
        context_type: row.try_get("context_type").unwrap_or_default(),
        embedding,
        created_at: row.try_get("created_at").unwrap_or_else(|_| Utc::now()),
        access_count: row.try_get("access_count").unwrap_or(0),
        last_accessed: row.try_get("last_accessed").unwrap_or_else(|_| Utc::now()),
        strength: row.try_get("strength").unwrap_or(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn memory_store() -> MemoryStore {
        MemoryStore::new(GraphStore::connect_in_memory().await)
    }

    #[tokio::test]
    async fn test_store_then_recall_single_memory() {
        let store = memory_store().await;

        let id = store
            .store("u1", "hello", "conversation", &[], &[])
            .await
            .unwrap();

        let memories = store.recall("u1", None, None, 10).await.unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].memory_id, id);
        assert_eq!(memories[0].content, "hello");
        assert_eq!(memories[0].access_count, 0);
        assert!((memories[0].strength - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_recall_orders_newest_first_and_honors_limit() {
        let store = memory_store().await;

        for i in 0..5 {
            store
                .store("u1", &format!("memory {i}"), "note", &[], &[])
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let memories = store.recall("u1", None, None, 3).await.unwrap();
        assert_eq!(memories.len(), 3);
        assert_eq!(memories[0].content, "memory 4");
        assert_eq!(memories[1].content, "memory 3");
        assert_eq!(memories[2].content, "memory 2");
    }

    #[tokio::test]
    async fn test_recall_is_read_idempotent() {
        let store = memory_store().await;
        store.store("u1", "stable", "note", &[], &[]).await.unwrap();

        let first = store.recall("u1", None, None, 10).await.unwrap();
        let second = store.recall("u1", None, None, 10).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recall_filters_by_context_type() {
        let store = memory_store().await;
        store.store("u1", "a chat", "conversation", &[], &[]).await.unwrap();
        store.store("u1", "a note", "note", &[], &[]).await.unwrap();

        let memories = store.recall("u1", Some("note"), None, 10).await.unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].content, "a note");
    }

    #[tokio::test]
    async fn test_entity_filter_takes_precedence() {
        let store = memory_store().await;
        store
            .store("u1", "about coffee", "note", &["coffee".into()], &[])
            .await
            .unwrap();
        store.store("u1", "plain note", "note", &[], &[]).await.unwrap();

        // Both filters supplied: entity wins
        let memories = store
            .recall("u1", Some("conversation"), Some("coffee"), 10)
            .await
            .unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].content, "about coffee");
    }

    #[tokio::test]
    async fn test_entities_are_deduplicated_across_memories() {
        let store = memory_store().await;
        store
            .store("u1", "first", "note", &["tea".into()], &[])
            .await
            .unwrap();
        store
            .store("u2", "second", "note", &["tea".into()], &[])
            .await
            .unwrap();

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities WHERE name = 'tea'")
            .fetch_one(store.store.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_memory_and_links() {
        let store = memory_store().await;
        let id = store
            .store("u1", "linked", "note", &["plant".into()], &[])
            .await
            .unwrap();

        store.delete(&id).await.unwrap();

        let memories = store.recall("u1", None, None, 10).await.unwrap();
        assert!(memories.is_empty());

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memory_entities")
            .fetch_one(store.store.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }

    #[tokio::test]
    async fn test_delete_clears_trigger_links_on_intents() {
        let graph = GraphStore::connect_in_memory().await;
        let store = MemoryStore::new(Arc::clone(&graph));
        let log = crate::intents::IntentLog::new(graph);

        let memory_id = store
            .store("u1", "likes jazz", "preference", &[], &[])
            .await
            .unwrap();
        let intent_id = log
            .log_intent("u1", "play some music", "play_music", 0.8, Some(&memory_id))
            .await
            .unwrap();

        store.delete(&memory_id).await.unwrap();

        // The intent survives, but its edge to the deleted memory is gone
        let intent = log.intent(&intent_id).await.unwrap().unwrap();
        assert!(intent.triggered_memory_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = memory_store().await;
        store.delete("no-such-memory").await.unwrap();
    }

    #[tokio::test]
    async fn test_embedding_round_trips() {
        let store = memory_store().await;
        let id = store
            .store("u1", "vec", "note", &[], &[0.25, -0.5, 1.0])
            .await
            .unwrap();

        let memories = store.recall("u1", None, None, 1).await.unwrap();
        assert_eq!(memories[0].memory_id, id);
        assert_eq!(memories[0].embedding, vec![0.25, -0.5, 1.0]);
    }
}
