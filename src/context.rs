//! Context assembly and the chat model seam
//!
//! Downstream reads compose everything the graph knows about a user into
//! one document used for prompt construction. The language model itself
//! is an opaque collaborator behind the `ChatModel` trait.

use crate::error::Result;
use crate::habits::{HabitEngine, CONFIDENCE_FLOOR};
use crate::memory::MemoryStore;
use crate::store::GraphStore;
use crate::types::{Event, Habit, Memory, Reminder, Task, UserProfile};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::sync::Arc;

/// How many of each collection the context carries
const CONTEXT_LIMIT: i64 = 5;

/// Everything the assistant knows about a user, in one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub profile: Option<UserProfile>,
    pub recent_memories: Vec<Memory>,
    pub habits: Vec<Habit>,
    pub recent_tasks: Vec<Task>,
    pub recent_events: Vec<Event>,
    pub recent_reminders: Vec<Reminder>,
}

impl UserContext {
    /// Render the system prompt handed to the chat model
    pub fn render_prompt(&self) -> String {
        let profile_text = match &self.profile {
            Some(p) => format!(
                "Name: {}, Age: {}, City: {}",
                p.name.as_deref().unwrap_or("unknown"),
                p.age.map_or_else(|| "unknown".to_string(), |a| a.to_string()),
                p.city.as_deref().unwrap_or("unknown"),
            ),
            None => "Unknown user".to_string(),
        };

        let memory_text = bullet_list(&self.recent_memories, "No previous memories.", |m| {
            format!("- {}", m.content)
        });
        let habit_text = bullet_list(&self.habits, "No habits detected yet.", |h| {
            format!("- {}: {}", h.action_type, h.context)
        });
        let task_text = bullet_list(&self.recent_tasks, "No tasks found.", |t| {
            format!("- {} ({} priority, {})", t.title, t.priority, t.status)
        });
        let reminder_text = bullet_list(&self.recent_reminders, "No reminders found.", |r| {
            format!("- {} at {}", r.text, r.scheduled_time)
        });
        let event_text = bullet_list(&self.recent_events, "No events found.", |e| {
            format!("- {} at {} on {}", e.title, e.location, e.start_time)
        });

        format!(
            "You are a personal AI assistant with persistent memory.\n\
             You know this user personally and remember everything about them.\n\
             \n\
             User Profile:\n{profile_text}\n\
             \n\
             User's recent memories:\n{memory_text}\n\
             \n\
             User's detected habits:\n{habit_text}\n\
             \n\
             User's tasks:\n{task_text}\n\
             \n\
             User's upcoming reminders:\n{reminder_text}\n\
             \n\
             User's events:\n{event_text}\n\
             \n\
             Use all this context to give personalized, helpful responses.\n\
             Address the user by their name. Keep responses concise and natural."
        )
    }
}

fn bullet_list<T>(items: &[T], empty: &str, line: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.iter().map(line).collect::<Vec<_>>().join("\n")
    }
}

/// Assembles the full user context from the graph
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    store: Arc<GraphStore>,
    memories: MemoryStore,
    habits: HabitEngine,
}

impl ContextAssembler {
    pub fn new(store: Arc<GraphStore>, memories: MemoryStore, habits: HabitEngine) -> Self {
        Self {
            store,
            memories,
            habits,
        }
    }

    /// Assemble everything the graph knows about a user: profile, the 5
    /// most recent memories, all habits at or above the confidence
    /// floor, and 5 each of the imported tasks, events and reminders.
    pub async fn full_context(&self, user_id: &str) -> Result<UserContext> {
        let profile = self.profile(user_id).await?;
        let recent_memories = self
            .memories
            .recall(user_id, None, None, CONTEXT_LIMIT)
            .await?;
        let habits = self.habits.get_habits(user_id, CONFIDENCE_FLOOR).await?;
        let recent_tasks = self.tasks(user_id).await?;
        let recent_events = self.events(user_id).await?;
        let recent_reminders = self.reminders(user_id).await?;

        Ok(UserContext {
            profile,
            recent_memories,
            habits,
            recent_tasks,
            recent_events,
            recent_reminders,
        })
    }

    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT user_id, name, age, city FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.store.pool())
            .await?;

        Ok(row.map(|row| UserProfile {
            user_id: row.try_get("user_id").unwrap_or_default(),
            name: row.try_get::<Option<String>, _>("name").ok().flatten(),
            age: row.try_get::<Option<i64>, _>("age").ok().flatten(),
            city: row.try_get::<Option<String>, _>("city").ok().flatten(),
        }))
    }

    async fn tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT task_id, title, priority, status FROM tasks WHERE user_id = ? LIMIT ?",
        )
        .bind(user_id)
        .bind(CONTEXT_LIMIT)
        .fetch_all(self.store.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| Task {
                task_id: row.try_get("task_id").unwrap_or_default(),
                title: row.try_get("title").unwrap_or_default(),
                priority: row.try_get("priority").unwrap_or_default(),
                status: row.try_get("status").unwrap_or_default(),
            })
            .collect())
    }

    async fn events(&self, user_id: &str) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT event_id, title, location, start_time FROM events WHERE user_id = ? LIMIT ?",
        )
        .bind(user_id)
        .bind(CONTEXT_LIMIT)
        .fetch_all(self.store.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| Event {
                event_id: row.try_get("event_id").unwrap_or_default(),
                title: row.try_get("title").unwrap_or_default(),
                location: row.try_get("location").unwrap_or_default(),
                start_time: row.try_get("start_time").unwrap_or_default(),
            })
            .collect())
    }

    async fn reminders(&self, user_id: &str) -> Result<Vec<Reminder>> {
        let rows = sqlx::query(
            "SELECT reminder_id, text, scheduled_time, status FROM reminders \
             WHERE user_id = ? LIMIT ?",
        )
        .bind(user_id)
        .bind(CONTEXT_LIMIT)
        .fetch_all(self.store.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| Reminder {
                reminder_id: row.try_get("reminder_id").unwrap_or_default(),
                text: row.try_get("text").unwrap_or_default(),
                scheduled_time: row.try_get("scheduled_time").unwrap_or_default(),
                status: row.try_get("status").unwrap_or_default(),
            })
            .collect())
    }
}

/// Opaque text-completion collaborator: takes the rendered context and
/// the user message, returns the reply
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, message: &str) -> Result<String>;
}

/// Deterministic offline model, used by tests and as the server default
/// until a real completion client is plugged in
#[derive(Debug, Default, Clone)]
pub struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    async fn complete(&self, _system_prompt: &str, message: &str) -> Result<String> {
        Ok(format!("Noted. You said: {message}"))
    }
}
