//! Intent/action log: causal chain of user intents and executed actions

use crate::error::{AssistantError, Result};
use crate::store::GraphStore;
use crate::types::{ActionId, ActionRecord, Intent, IntentId};

use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

/// Append-only log of Intent and Action nodes
#[derive(Debug, Clone)]
pub struct IntentLog {
    store: Arc<GraphStore>,
}

impl IntentLog {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Log a new intent for a user. Every call creates a distinct node,
    /// never deduplicated.
    ///
    /// When `memory_id` is supplied and resolves to an existing memory it
    /// is stored as the trigger link; an unresolved id is silently
    /// skipped (traced at debug level).
    pub async fn log_intent(
        &self,
        user_id: &str,
        raw_input: &str,
        intent_type: &str,
        confidence: f64,
        memory_id: Option<&str>,
    ) -> Result<IntentId> {
        let intent_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.store.upsert_user(user_id).await?;

        let triggered_memory_id = match memory_id {
            Some(id) => {
                let exists = sqlx::query("SELECT memory_id FROM memories WHERE memory_id = ?")
                    .bind(id)
                    .fetch_optional(self.store.pool())
                    .await?
                    .is_some();
                if exists {
                    Some(id)
                } else {
                    tracing::debug!(memory_id = id, "trigger memory not found, skipping link");
                    None
                }
            }
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO intents (
                intent_id, user_id, raw_input, intent_type, confidence,
                triggered_memory_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&intent_id)
        .bind(user_id)
        .bind(raw_input)
        .bind(intent_type)
        .bind(confidence)
        .bind(triggered_memory_id)
        .bind(now)
        .execute(self.store.pool())
        .await?;

        tracing::debug!(%intent_id, user_id, intent_type, "intent logged");
        Ok(intent_id)
    }

    /// Log an action that resulted from an existing intent.
    ///
    /// Fails with `NotFound` (and writes nothing) when the intent does
    /// not exist. The payload is serialized to stable JSON text.
    pub async fn log_action(
        &self,
        intent_id: &str,
        action_type: &str,
        payload: &serde_json::Value,
        status: &str,
    ) -> Result<ActionId> {
        let intent_exists = sqlx::query("SELECT intent_id FROM intents WHERE intent_id = ?")
            .bind(intent_id)
            .fetch_optional(self.store.pool())
            .await?
            .is_some();
        if !intent_exists {
            return Err(AssistantError::NotFound(format!("intent {intent_id}")));
        }

        let action_id = Uuid::new_v4().to_string();
        let payload_text = serde_json::to_string(payload)
            .map_err(|e| AssistantError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO actions (action_id, intent_id, action_type, payload, status, executed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&action_id)
        .bind(intent_id)
        .bind(action_type)
        .bind(&payload_text)
        .bind(status)
        .bind(Utc::now())
        .execute(self.store.pool())
        .await?;

        tracing::debug!(%action_id, intent_id, action_type, status, "action logged");
        Ok(action_id)
    }

    /// Load an intent by id
    pub async fn intent(&self, intent_id: &str) -> Result<Option<Intent>> {
        let row = sqlx::query(
            r#"
            SELECT intent_id, user_id, raw_input, intent_type, confidence,
                   triggered_memory_id, created_at
            FROM intents
            WHERE intent_id = ?
            "#,
        )
        .bind(intent_id)
        .fetch_optional(self.store.pool())
        .await?;

        Ok(row.map(|row| Intent {
            intent_id: row.try_get("intent_id").unwrap_or_default(),
            user_id: row.try_get("user_id").unwrap_or_default(),
            raw_input: row.try_get("raw_input").unwrap_or_default(),
            intent_type: row.try_get("intent_type").unwrap_or_default(),
            confidence: row.try_get("confidence").unwrap_or(0.0),
            triggered_memory_id: row
                .try_get::<Option<String>, _>("triggered_memory_id")
                .ok()
                .flatten(),
            created_at: row.try_get("created_at").unwrap_or_else(|_| Utc::now()),
        }))
    }

    /// Load the actions an intent resulted in, oldest first
    pub async fn actions_for(&self, intent_id: &str) -> Result<Vec<ActionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT action_id, intent_id, action_type, payload, status, executed_at
            FROM actions
            WHERE intent_id = ?
            ORDER BY executed_at ASC
            "#,
        )
        .bind(intent_id)
        .fetch_all(self.store.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| ActionRecord {
                action_id: row.try_get("action_id").unwrap_or_default(),
                intent_id: row.try_get("intent_id").unwrap_or_default(),
                action_type: row.try_get("action_type").unwrap_or_default(),
                payload: row.try_get("payload").unwrap_or_default(),
                status: row.try_get("status").unwrap_or_default(),
                executed_at: row.try_get("executed_at").unwrap_or_else(|_| Utc::now()),
            })
            .collect())
    }
}
