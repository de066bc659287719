use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct MemoryRequest {
    pub user_id: String,
    pub content: String,
    pub context_type: String,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct RecallParams {
    pub context_type: Option<String>,
    pub entity: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub user_id: String,
    pub raw_input: String,
    pub intent_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub triggered_memory_id: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub intent_id: String,
    pub action_type: String,
    pub payload: serde_json::Value,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "success".to_string()
}

#[derive(Debug, Deserialize)]
pub struct HabitParams {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    0.6
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StoreMemoryResponse {
    pub memory_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub intent_id: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub action_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MemoriesResponse {
    pub memories: Vec<concierge::Memory>,
}

#[derive(Debug, Serialize)]
pub struct HabitsResponse {
    pub habits: Vec<concierge::Habit>,
}
