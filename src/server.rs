//! HTTP front door.
//!
//! `POST /roast` takes `{"username", "selectedLanguage"}` and answers
//! `{"roast"}`. Errors are `{"error"}` bodies: 400 for invalid input,
//! 404 for unknown users and 500 when generation fails.

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::roast::{RoastError, RoastRequest, RoastResult, RoastService};

pub fn router(service: Arc<RoastService>) -> Router {
    Router::new()
        .route("/roast", post(create_roast).get(reject_get))
        .route("/health", get(health))
        .with_state(service)
}

async fn create_roast(
    State(service): State<Arc<RoastService>>,
    Json(request): Json<RoastRequest>,
) -> Result<Json<RoastResult>, RoastError> {
    service.roast(&request).await.map(Json)
}

async fn reject_get() -> Response {
    error_response(StatusCode::BAD_REQUEST, "No GET request allowed!")
}

async fn health() -> &'static str {
    "OK"
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for RoastError {
    fn into_response(self) -> Response {
        match self {
            RoastError::InputValidation(message) => error_response(StatusCode::BAD_REQUEST, &message),
            RoastError::NotFound => error_response(StatusCode::NOT_FOUND, "User not found"),
            RoastError::Generation(e) => {
                error!("❌ Error generando roast: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate roast")
            }
        }
    }
}

pub async fn serve(addr: SocketAddr, service: Arc<RoastService>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("📡 Escuchando en: {}", addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Error al registrar Ctrl+C: {:?}", e);
        return;
    }
    info!("⚠️ Señal de shutdown recibida, cerrando...");
}
