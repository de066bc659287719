//! Node and edge types of the assistant graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for memories
pub type MemoryId = String;

/// Unique identifier for intents
pub type IntentId = String;

/// Unique identifier for actions
pub type ActionId = String;

/// A persisted user memory, linked to the user that owns it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Memory {
    /// Unique identifier
    pub memory_id: MemoryId,
    /// Owning user
    pub user_id: String,
    /// The memory content (immutable after creation)
    pub content: String,
    /// Open-ended category, e.g. "conversation", "preference"
    pub context_type: String,
    /// Optional embedding vector; empty when no embedder was involved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// When the memory was created
    pub created_at: DateTime<Utc>,
    /// Number of times accessed
    pub access_count: i64,
    /// When the memory was last accessed
    pub last_accessed: DateTime<Utc>,
    /// Strength of the user-to-memory link (1.0 at creation)
    pub strength: f64,
}

/// A promoted habit: a repeated action observation that crossed the
/// promotion threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    /// Owning user
    pub user_id: String,
    /// What the user keeps doing
    pub action_type: String,
    /// In which context they keep doing it
    pub context: String,
    /// Total observation count at the last promotion
    pub frequency: i64,
    /// Entrenchment score, ratcheted within [0.6, 0.95]
    pub confidence: f64,
}

/// Raw repeated-action observation backing habit promotion (the
/// PERFORMED edge of the graph)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionObservation {
    pub user_id: String,
    pub action_type: String,
    pub context: String,
    /// Monotonically increasing occurrence count
    pub count: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A logged user intent (one per utterance or trigger, never deduplicated)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    pub intent_id: IntentId,
    pub user_id: String,
    /// The raw user input that produced this intent
    pub raw_input: String,
    pub intent_type: String,
    /// Classifier confidence for this intent (1.0 for direct input)
    pub confidence: f64,
    /// Memory that triggered this intent, when one resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_memory_id: Option<MemoryId>,
    pub created_at: DateTime<Utc>,
}

/// An executed effect of an intent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    pub action_id: ActionId,
    /// The intent this action resulted from
    pub intent_id: IntentId,
    pub action_type: String,
    /// Structured payload serialized as JSON text
    pub payload: String,
    pub status: String,
    pub executed_at: DateTime<Utc>,
}

impl ActionRecord {
    /// Deserialize the payload back into structured form
    pub fn payload_json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.payload).ok()
    }
}

/// User profile attributes, populated by the bulk dataset import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub city: Option<String>,
}

/// A task from the imported dataset (read-only at runtime)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub task_id: String,
    pub title: String,
    pub priority: String,
    pub status: String,
}

/// An event from the imported dataset (read-only at runtime)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub title: String,
    pub location: String,
    pub start_time: String,
}

/// A reminder from the imported dataset (read-only at runtime)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub reminder_id: String,
    pub text: String,
    pub scheduled_time: String,
    pub status: String,
}
