//! # HTTP Surface
//!
//! Thin axum shell over the engine. The chat endpoints mirror the client
//! contract exactly; the admin endpoints expose read-only snapshots. All
//! wire payloads are camelCase JSON with ISO-8601 UTC timestamps.
//!
//! | Route                              | Method | Purpose                   |
//! |------------------------------------|--------|---------------------------|
//! | `/api/Chat/create`                 | POST   | Create or return session  |
//! | `/api/Chat/:session_id/poll`       | POST   | Liveness poll             |
//! | `/api/Chat/health`                 | GET    | Health + admission flag   |
//! | `/api/Chat/admin/sessions`         | GET    | All sessions              |
//! | `/api/Chat/admin/queue-status`     | GET    | Queues, limits, agents    |
//! | `/api/Chat/admin/sessions/active`  | GET    | Live sessions             |
//! | `/api/Chat/admin/sessions/inactive`| GET    | Inactivated sessions      |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::AdminApi;
use crate::clock::Clock;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, Result};
use crate::orchestrator::DispatchEngine;
use crate::session::{SessionId, SessionStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChatRequest {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateChatResponse {
    session_id: String,
    status: SessionStatus,
    message: String,
    is_accepted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PollResponse {
    session_id: String,
    success: bool,
    message: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    is_healthy: bool,
    can_accept_new_chats: bool,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    message: String,
}

/// Build the HTTP router over a shared engine
pub fn router(engine: Arc<DispatchEngine>) -> Router {
    Router::new()
        .route("/api/Chat/create", post(create_chat))
        .route("/api/Chat/:session_id/poll", post(poll_chat))
        .route("/api/Chat/health", get(health))
        .route("/api/Chat/admin/sessions", get(admin_sessions))
        .route("/api/Chat/admin/queue-status", get(admin_queue_status))
        .route("/api/Chat/admin/sessions/active", get(admin_active_sessions))
        .route("/api/Chat/admin/sessions/inactive", get(admin_inactive_sessions))
        .with_state(engine)
}

async fn create_chat(
    State(engine): State<Arc<DispatchEngine>>,
    Json(request): Json<CreateChatRequest>,
) -> Response {
    let Some(user_id) = request.user_id.filter(|id| !id.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { message: "userId is required".to_string() }),
        )
            .into_response();
    };

    match engine.create_session(&user_id).await {
        Ok(session) => {
            let is_accepted = session.status != SessionStatus::Refused;
            let message = if is_accepted {
                "Chat session created".to_string()
            } else {
                "All queues are at capacity; please try again later".to_string()
            };
            Json(CreateChatResponse {
                session_id: session.id.to_string(),
                status: session.status,
                message,
                is_accepted,
            })
            .into_response()
        }
        Err(DispatchError::InvalidInput(message)) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
        }
        Err(e) => {
            error!("❌ create failed for user {user_id}: {e}");
            internal_error()
        }
    }
}

async fn poll_chat(
    State(engine): State<Arc<DispatchEngine>>,
    Path(session_id): Path<String>,
) -> Response {
    let timestamp = engine.clock().now();
    let parsed: Option<SessionId> = session_id.parse().ok();

    let success = match parsed {
        Some(id) => match engine.poll(&id).await {
            Ok(found) => found,
            Err(e) => {
                error!("❌ poll failed for session {session_id}: {e}");
                return internal_error();
            }
        },
        None => false,
    };

    Json(PollResponse {
        session_id,
        success,
        message: if success {
            "Poll recorded".to_string()
        } else {
            "Session not found".to_string()
        },
        timestamp,
    })
    .into_response()
}

async fn health(State(engine): State<Arc<DispatchEngine>>) -> Response {
    match engine.can_accept().await {
        Ok(can_accept_new_chats) => Json(HealthResponse {
            is_healthy: true,
            can_accept_new_chats,
            timestamp: engine.clock().now(),
            message: None,
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse {
                is_healthy: false,
                can_accept_new_chats: false,
                timestamp: engine.clock().now(),
                message: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}

async fn admin_sessions(State(engine): State<Arc<DispatchEngine>>) -> Response {
    snapshot(AdminApi::new(engine).sessions().await)
}

async fn admin_queue_status(State(engine): State<Arc<DispatchEngine>>) -> Response {
    snapshot(AdminApi::new(engine).queue_status().await)
}

async fn admin_active_sessions(State(engine): State<Arc<DispatchEngine>>) -> Response {
    snapshot(AdminApi::new(engine).active_sessions().await)
}

async fn admin_inactive_sessions(State(engine): State<Arc<DispatchEngine>>) -> Response {
    snapshot(AdminApi::new(engine).inactive_sessions().await)
}

fn snapshot<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            error!("❌ admin snapshot failed: {e}");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { message: "Internal error".to_string() }),
    )
        .into_response()
}

/// Engine plus HTTP listener, run as one unit
///
/// # Examples
///
/// ```no_run
/// use chatdesk_engine::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let server = DispatchServerBuilder::new()
///     .with_config(DispatchConfig::default())
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct DispatchServer {
    engine: Arc<DispatchEngine>,
    bind_addr: SocketAddr,
}

impl DispatchServer {
    /// The engine behind this server
    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    /// Start the background loops and serve HTTP until the process ends
    pub async fn run(&self) -> Result<()> {
        self.engine.start();
        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| DispatchError::internal(format!("bind {}: {e}", self.bind_addr)))?;
        info!("🌐 HTTP surface listening on {}", self.bind_addr);
        axum::serve(listener, router(Arc::clone(&self.engine)))
            .await
            .map_err(|e| DispatchError::internal(format!("serve: {e}")))
    }
}

/// Builder for [`DispatchServer`]
pub struct DispatchServerBuilder {
    config: DispatchConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl DispatchServerBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        Self { config: DispatchConfig::default(), clock: None }
    }

    /// Replace the configuration tree
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject a clock (tests)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and construct the server
    pub async fn build(self) -> Result<DispatchServer> {
        let bind_addr = self.config.general.bind_addr;
        let engine = DispatchEngine::new(self.config, self.clock).await?;
        Ok(DispatchServer { engine, bind_addr })
    }
}

impl Default for DispatchServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
