//! Gateway error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use switchboard_runtime::RuntimeError;
use switchboard_workflow::ValidationResult;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("invalid workflow graph: {0}")]
  InvalidWorkflow(ValidationResult),

  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  #[error("unknown template '{0}'")]
  UnknownTemplate(String),

  #[error("request must contain a workflow or a template id")]
  MissingWorkflow,

  #[error("failed to bind {address}: {source}")]
  Bind {
    address: String,
    #[source]
    source: std::io::Error,
  },

  #[error("server error: {0}")]
  Serve(#[source] std::io::Error),
}

impl GatewayError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      GatewayError::InvalidWorkflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
      GatewayError::Runtime(RuntimeError::UnknownRun { .. }) => StatusCode::NOT_FOUND,
      GatewayError::Runtime(_) => StatusCode::INTERNAL_SERVER_ERROR,
      GatewayError::UnknownTemplate(_) => StatusCode::NOT_FOUND,
      GatewayError::MissingWorkflow => StatusCode::BAD_REQUEST,
      GatewayError::Bind { .. } | GatewayError::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for GatewayError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    let body = match &self {
      GatewayError::InvalidWorkflow(validation) => serde_json::json!({
        "error": self.to_string(),
        "validation": validation,
      }),
      _ => serde_json::json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
