use axum::{
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use concierge::{Assistant, EchoModel};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod models;
mod state;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "concierge-server")]
#[command(about = "HTTP API for the Concierge assistant backend")]
struct Args {
    /// Path to data directory
    #[arg(short, long, default_value = "./concierge_data")]
    data_dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,concierge=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Initializing Concierge backend...");

    let assistant = Assistant::new(&args.data_dir)
        .await
        .expect("Failed to initialize assistant")
        .with_chat_model(Arc::new(EchoModel));
    let state = Arc::new(AppState {
        assistant: Arc::new(assistant),
    });

    // Build Router
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/chat", post(api::chat))
        .route("/memory/store", post(api::store_memory))
        .route("/memory/recall/:user_id", get(api::recall_memory))
        .route("/memory/:memory_id", delete(api::delete_memory))
        .route("/intent/log", post(api::log_intent))
        .route("/action/log", post(api::log_action))
        .route("/habits/:user_id", get(api::get_habits))
        .route("/user/:user_id/context", get(api::get_full_context))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Run Server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("Concierge server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
