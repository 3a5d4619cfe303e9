use crate::history::HistoryStore;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::get,
    Router,
    Json,
    extract::{State, Path},
    response::IntoResponse,
    http::StatusCode,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use log::{info, error};

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

#[derive(Clone)]
pub struct AppState {
    pub history: Arc<dyn HistoryStore>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chats/{chat_id}", get(conversation_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    http_port: u16,
    history: Arc<dyn HistoryStore>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(AppState { history });

    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    error!("HTTP server error: {}", e);
                }
            },
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            }
        }
    });

    info!("HTTP server started");
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn conversation_handler(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> impl IntoResponse {
    match state.history.get_conversation(&chat_id).await {
        Ok(Some(exchanges)) => (StatusCode::OK, Json(exchanges)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(ErrorBody {
            success: false,
            message: format!("No history for {}", chat_id),
        })).into_response(),
        Err(e) => {
            error!("Failed to read history for {}: {}", chat_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody {
                success: false,
                message: "History store unavailable".into(),
            })).into_response()
        }
    }
}
