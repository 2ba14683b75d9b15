//! HTTP server.
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/api/runs` | submit `{workflow \| template, input}` |
//! | GET | `/api/runs` | list runs |
//! | GET | `/api/runs/{id}` | run with its traces |
//! | GET | `/api/runs/{id}/events` | server-sent `trace` events, then `complete` or `error` |
//! | POST | `/api/runs/{id}/cancel` | request cancellation |
//! | POST | `/api/workflows/validate` | validation result and summary |
//! | GET | `/api/templates` | built-in templates |
//! | GET | `/api/templates/{id}` | one template definition |
//! | GET | `/api/health` | liveness |

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use switchboard_config::{TEMPLATE_IDS, WorkflowDef, WorkflowSummary, template};
use switchboard_runtime::{ExecutionRun, RunEvent, RunStatus};
use switchboard_workflow::{ValidationResult, validate};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::registry::{RunRegistry, RunSummary};

#[derive(Clone)]
struct AppState {
  registry: RunRegistry,
  keep_alive: Duration,
}

/// Serves a [`RunRegistry`] over HTTP.
pub struct GatewayServer {
  registry: RunRegistry,
  config: GatewayConfig,
}

impl GatewayServer {
  pub fn new(registry: RunRegistry, config: GatewayConfig) -> Self {
    Self { registry, config }
  }

  pub fn router(&self) -> Router {
    let state = AppState {
      registry: self.registry.clone(),
      keep_alive: self.config.keep_alive(),
    };

    Router::new()
      .route("/api/health", get(health))
      .route("/api/runs", post(submit_run).get(list_runs))
      .route("/api/runs/{id}", get(get_run))
      .route("/api/runs/{id}/events", get(stream_run))
      .route("/api/runs/{id}/cancel", post(cancel_run))
      .route("/api/workflows/validate", post(validate_workflow))
      .route("/api/templates", get(list_templates))
      .route("/api/templates/{id}", get(get_template))
      .layer(TraceLayer::new_for_http())
      .layer(CorsLayer::permissive())
      .with_state(state)
  }

  /// Serve until `shutdown` is cancelled.
  pub async fn serve(self, shutdown: CancellationToken) -> Result<(), GatewayError> {
    let address = self.config.address();
    let listener = tokio::net::TcpListener::bind(&address)
      .await
      .map_err(|source| GatewayError::Bind {
        address: address.clone(),
        source,
      })?;

    info!(address = %address, "gateway_listening");
    axum::serve(listener, self.router())
      .with_graceful_shutdown(async move { shutdown.cancelled().await })
      .await
      .map_err(GatewayError::Serve)?;
    info!("gateway_stopped");
    Ok(())
  }
}

async fn health() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct SubmitRunRequest {
  #[serde(default, alias = "graph")]
  workflow: Option<WorkflowDef>,
  #[serde(default)]
  template: Option<String>,
  #[serde(default)]
  input: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SubmitRunResponse {
  run_id: String,
  status: RunStatus,
}

async fn submit_run(
  State(state): State<AppState>,
  Json(request): Json<SubmitRunRequest>,
) -> Result<(StatusCode, Json<SubmitRunResponse>), GatewayError> {
  let def = match (request.workflow, request.template) {
    (Some(def), _) => def,
    (None, Some(id)) => template(&id).ok_or(GatewayError::UnknownTemplate(id))?,
    (None, None) => return Err(GatewayError::MissingWorkflow),
  };

  let run_id = state
    .registry
    .submit(def, request.input)
    .map_err(GatewayError::InvalidWorkflow)?;
  let status = state.registry.handle(&run_id)?.status();

  Ok((StatusCode::ACCEPTED, Json(SubmitRunResponse { run_id, status })))
}

async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunSummary>> {
  Json(state.registry.list())
}

async fn get_run(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<ExecutionRun>, GatewayError> {
  Ok(Json(state.registry.get(&id)?))
}

async fn cancel_run(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), GatewayError> {
  let cancelled = state.registry.cancel(&id)?;
  let status = state.registry.handle(&id)?.status();
  Ok((
    StatusCode::ACCEPTED,
    Json(serde_json::json!({
      "run_id": id,
      "cancelled": cancelled,
      "status": status,
    })),
  ))
}

async fn stream_run(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, GatewayError> {
  let events = state.registry.subscribe(&id)?.map(|event| Ok::<_, Infallible>(to_sse(&event)));
  Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive).text("keepalive")))
}

fn to_sse(event: &RunEvent) -> Event {
  match Event::default().event(event.name()).json_data(event) {
    Ok(sse) => sse,
    Err(e) => {
      warn!(error = %e, "failed to encode run event");
      Event::default()
        .event("error")
        .data(serde_json::json!({ "error": e.to_string() }).to_string())
    }
  }
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
  #[serde(flatten)]
  validation: ValidationResult,
  summary: WorkflowSummary,
}

async fn validate_workflow(Json(def): Json<WorkflowDef>) -> Json<ValidateResponse> {
  Json(ValidateResponse {
    validation: validate(&def),
    summary: def.summary(),
  })
}

#[derive(Debug, Serialize)]
struct TemplateInfo {
  id: &'static str,
  name: String,
  description: String,
  summary: WorkflowSummary,
}

async fn list_templates() -> Json<Vec<TemplateInfo>> {
  let templates = TEMPLATE_IDS
    .iter()
    .filter_map(|&id| {
      template(id).map(|def| TemplateInfo {
        id,
        summary: def.summary(),
        name: def.name,
        description: def.description,
      })
    })
    .collect();
  Json(templates)
}

async fn get_template(Path(id): Path<String>) -> Result<Json<WorkflowDef>, GatewayError> {
  template(&id)
    .map(Json)
    .ok_or(GatewayError::UnknownTemplate(id))
}
