//! HTTP surface: the axum router and handlers for the build endpoint.
//!
//! `POST /task` binds the inbound JSON to [`BuildRequest`], validates the
//! round number before any side effect, and runs the pipeline. A secret
//! mismatch maps to 401; any other pipeline failure maps to a generic 500 —
//! diagnostics are logged here and never leaked to the external caller.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pageforge_core::config::Config;
use pageforge_core::contract::{BuildError, BuildRequest, RepoHost, Vcs};
use pageforge_core::notify::BackoffPolicy;
use pageforge_core::orchestrate::{run_build, RepoLocks};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared server state: the process-wide configuration and the concrete
/// components the pipeline runs against. Host and vcs are trait objects so
/// tests can inject mocks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub host: Arc<dyn RepoHost>,
    pub vcs: Arc<dyn Vcs>,
    pub locks: Arc<RepoLocks>,
    pub http: reqwest::Client,
    pub backoff: BackoffPolicy,
}

/// Assemble the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/task", post(accept_task))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "pageforge listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET / - health & usage info.
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "pageforge build & deploy API. POST /task with the JSON request to trigger a build.",
    }))
}

/// POST /task - run the build pipeline for one request.
async fn accept_task(State(state): State<AppState>, Json(req): Json<BuildRequest>) -> Response {
    if req.round < 1 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "round must be >= 1"})),
        )
            .into_response();
    }

    match run_build(
        &state.config,
        state.host.as_ref(),
        state.vcs.as_ref(),
        &state.locks,
        &state.http,
        &state.backoff,
        &req,
    )
    .await
    {
        Ok(response) => Json(response).into_response(),
        Err(BuildError::Unauthorized) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid secret"})),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, task = %req.task, "Build pipeline failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "build failed"})),
            )
                .into_response()
        }
    }
}
