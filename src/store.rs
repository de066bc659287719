//! Graph store adapter over SQLite
//!
//! The assistant graph (Users, Memories, Entities, Intents, Actions,
//! Habits and their edges) is encoded relationally: one table per node
//! label, with 1:N edges folded into the N-side table and edges that
//! carry attributes (PERFORMED) or are many-to-many (REFERENCES) given
//! their own table.

use crate::error::Result;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// Idempotent schema declarations, executed in order on every startup.
/// Primary keys carry the uniqueness constraints of the graph schema.
const SCHEMA_STATEMENTS: &[&str] = &[
    // Node tables
    "CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        name    TEXT,
        age     INTEGER,
        city    TEXT
    )",
    "CREATE TABLE IF NOT EXISTS memories (
        memory_id     TEXT PRIMARY KEY,
        user_id       TEXT NOT NULL,
        content       TEXT NOT NULL,
        context_type  TEXT NOT NULL,
        embedding     TEXT NOT NULL DEFAULT '[]',
        created_at    TEXT NOT NULL,
        access_count  INTEGER NOT NULL DEFAULT 0,
        last_accessed TEXT NOT NULL,
        strength      REAL NOT NULL DEFAULT 1.0
    )",
    "CREATE TABLE IF NOT EXISTS entities (
        name TEXT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS memory_entities (
        memory_id   TEXT NOT NULL,
        entity_name TEXT NOT NULL,
        PRIMARY KEY (memory_id, entity_name)
    )",
    "CREATE TABLE IF NOT EXISTS performed (
        user_id     TEXT NOT NULL,
        action_type TEXT NOT NULL,
        context     TEXT NOT NULL,
        count       INTEGER NOT NULL DEFAULT 1,
        first_seen  TEXT NOT NULL,
        last_seen   TEXT NOT NULL,
        PRIMARY KEY (user_id, action_type, context)
    )",
    "CREATE TABLE IF NOT EXISTS habits (
        user_id     TEXT NOT NULL,
        action_type TEXT NOT NULL,
        context     TEXT NOT NULL,
        frequency   INTEGER NOT NULL,
        confidence  REAL NOT NULL,
        PRIMARY KEY (user_id, action_type, context)
    )",
    "CREATE TABLE IF NOT EXISTS intents (
        intent_id           TEXT PRIMARY KEY,
        user_id             TEXT NOT NULL,
        raw_input           TEXT NOT NULL,
        intent_type         TEXT NOT NULL,
        confidence          REAL NOT NULL,
        triggered_memory_id TEXT,
        created_at          TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS actions (
        action_id   TEXT PRIMARY KEY,
        intent_id   TEXT NOT NULL,
        action_type TEXT NOT NULL,
        payload     TEXT NOT NULL,
        status      TEXT NOT NULL,
        executed_at TEXT NOT NULL
    )",
    // Dataset tables populated by the external bulk import, read-only
    // at runtime
    "CREATE TABLE IF NOT EXISTS tasks (
        task_id  TEXT PRIMARY KEY,
        user_id  TEXT NOT NULL,
        title    TEXT NOT NULL,
        priority TEXT NOT NULL,
        status   TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS events (
        event_id   TEXT PRIMARY KEY,
        user_id    TEXT NOT NULL,
        title      TEXT NOT NULL,
        location   TEXT NOT NULL,
        start_time TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS reminders (
        reminder_id    TEXT PRIMARY KEY,
        user_id        TEXT NOT NULL,
        text           TEXT NOT NULL,
        scheduled_time TEXT NOT NULL,
        status         TEXT NOT NULL DEFAULT 'pending'
    )",
    "CREATE TABLE IF NOT EXISTS time_contexts (
        time_id  TEXT PRIMARY KEY,
        day_type TEXT NOT NULL,
        period   TEXT NOT NULL
    )",
    // Secondary indexes
    "CREATE INDEX IF NOT EXISTS idx_memories_created_at ON memories (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_memories_context_type ON memories (context_type)",
    "CREATE INDEX IF NOT EXISTS idx_memories_user ON memories (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_habits_frequency ON habits (frequency)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_user ON events (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_reminders_user ON reminders (user_id)",
];

/// Session factory for the assistant graph. Created once at startup and
/// shared by every component; concurrency is delegated to the pool.
#[derive(Clone)]
pub struct GraphStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl GraphStore {
    /// Open (or create) the store at the given database file and ensure
    /// the schema exists before any traffic
    pub async fn connect(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        let store = Arc::new(Self { pool });
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Declare constraints, tables and indexes idempotently. Safe to
    /// call on every process start regardless of existing state.
    pub async fn ensure_schema(&self) -> Result<()> {
        for stmt in SCHEMA_STATEMENTS {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        tracing::info!("graph schema ready");
        Ok(())
    }

    /// Create-if-absent upsert of a user node. Users are created lazily
    /// on first reference and never deleted by this system.
    pub async fn upsert_user(&self, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO users (user_id) VALUES (?) ON CONFLICT(user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Close the pool; part of explicit shutdown
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create an in-memory store for testing
    pub async fn connect_in_memory() -> Arc<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .create_if_missing(true);

        let pool = sqlx::pool::PoolOptions::<sqlx::Sqlite>::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("in-memory SQLite");

        let store = Arc::new(Self { pool });
        store.ensure_schema().await.expect("schema");
        store
    }
}
