use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use concierge::{AssistantError, UserContext};
use std::sync::Arc;

use crate::models::{
    ActionRequest, ActionResponse, ChatRequest, ChatResponse, HabitParams, HabitsResponse,
    IntentRequest, IntentResponse, MemoriesResponse, MemoryRequest, RecallParams, StatusResponse,
    StoreMemoryResponse,
};
use crate::state::AppState;

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

fn error_status(err: &AssistantError) -> StatusCode {
    match err {
        AssistantError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    match state.assistant.chat(&payload.user_id, &payload.message).await {
        Ok(reply) => Ok(Json(ChatResponse {
            reply,
            status: "success".to_string(),
        })),
        Err(e) => {
            tracing::error!("Chat failed: {}", e);
            Err(error_status(&e))
        }
    }
}

pub async fn store_memory(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MemoryRequest>,
) -> Result<Json<StoreMemoryResponse>, StatusCode> {
    match state
        .assistant
        .store_memory(
            &payload.user_id,
            &payload.content,
            &payload.context_type,
            &payload.entities,
            &payload.embedding,
        )
        .await
    {
        Ok(memory_id) => Ok(Json(StoreMemoryResponse {
            memory_id,
            status: "stored".to_string(),
        })),
        Err(e) => {
            tracing::error!("Failed to store memory: {}", e);
            Err(error_status(&e))
        }
    }
}

pub async fn recall_memory(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(params): Query<RecallParams>,
) -> Result<Json<MemoriesResponse>, StatusCode> {
    match state
        .assistant
        .recall_memories(
            &user_id,
            params.context_type.as_deref(),
            params.entity.as_deref(),
            params.limit,
        )
        .await
    {
        Ok(memories) => Ok(Json(MemoriesResponse { memories })),
        Err(e) => {
            tracing::error!("Recall failed: {}", e);
            Err(error_status(&e))
        }
    }
}

pub async fn delete_memory(
    State(state): State<Arc<AppState>>,
    Path(memory_id): Path<String>,
) -> Result<Json<StatusResponse>, StatusCode> {
    match state.assistant.delete_memory(&memory_id).await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "deleted".to_string(),
        })),
        Err(e) => {
            tracing::error!("Delete failed: {}", e);
            Err(error_status(&e))
        }
    }
}

pub async fn log_intent(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IntentRequest>,
) -> Result<Json<IntentResponse>, StatusCode> {
    match state
        .assistant
        .log_intent(
            &payload.user_id,
            &payload.raw_input,
            &payload.intent_type,
            payload.confidence,
            payload.triggered_memory_id.as_deref(),
        )
        .await
    {
        Ok(intent_id) => Ok(Json(IntentResponse { intent_id })),
        Err(e) => {
            tracing::error!("Failed to log intent: {}", e);
            Err(error_status(&e))
        }
    }
}

pub async fn log_action(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, StatusCode> {
    match state
        .assistant
        .log_action(
            &payload.intent_id,
            &payload.action_type,
            &payload.payload,
            &payload.status,
        )
        .await
    {
        Ok(action_id) => Ok(Json(ActionResponse { action_id })),
        Err(e) => {
            tracing::error!("Failed to log action: {}", e);
            Err(error_status(&e))
        }
    }
}

pub async fn get_habits(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(params): Query<HabitParams>,
) -> Result<Json<HabitsResponse>, StatusCode> {
    match state.assistant.get_habits(&user_id, params.min_confidence).await {
        Ok(habits) => Ok(Json(HabitsResponse { habits })),
        Err(e) => {
            tracing::error!("Failed to fetch habits: {}", e);
            Err(error_status(&e))
        }
    }
}

pub async fn get_full_context(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserContext>, StatusCode> {
    match state.assistant.get_full_context(&user_id).await {
        Ok(context) => Ok(Json(context)),
        Err(e) => {
            tracing::error!("Failed to assemble context: {}", e);
            Err(error_status(&e))
        }
    }
}
