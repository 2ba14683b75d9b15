//! HTTP route tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use switchboard_executor::NodeExecutors;
use switchboard_executor::scripted::ScriptedClient;
use switchboard_gateway::{GatewayConfig, GatewayServer, RunRegistry};
use switchboard_runtime::{Runtime, RuntimeConfig};
use tower::ServiceExt;

fn app_with(runtime: Runtime) -> (Router, RunRegistry) {
  let registry = RunRegistry::new(runtime);
  let server = GatewayServer::new(registry.clone(), GatewayConfig::default());
  (server.router(), registry)
}

fn app() -> (Router, RunRegistry) {
  app_with(Runtime::simulated(RuntimeConfig::default()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let body = response.into_body().collect().await.unwrap().to_bytes();
  (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
  let (status, body) = send(app, request).await;
  (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
  Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
  Request::post(uri)
    .header("content-type", "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

fn linear_workflow() -> Value {
  json!({
    "workflow_id": "wf",
    "name": "Linear",
    "nodes": [
      {"node_id": "T", "type": "trigger", "trigger_type": "api"},
      {"node_id": "A", "type": "agent", "instructions": "Echo {{ input.payload.text }}"},
      {"node_id": "X", "type": "tool", "name": "lookup"}
    ],
    "edges": [
      {"source": "T", "target": "A"},
      {"source": "A", "target": "X"}
    ]
  })
}

#[tokio::test]
async fn test_health() {
  let (app, _) = app();
  let (status, body) = send_json(&app, get("/api/health")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_submit_then_stream_events() {
  let (app, registry) = app();

  let (status, body) = send_json(
    &app,
    post("/api/runs", json!({"workflow": linear_workflow(), "input": {"text": "hello"}})),
  )
  .await;
  assert_eq!(status, StatusCode::ACCEPTED);
  let run_id = body["run_id"].as_str().unwrap().to_string();

  let (status, body) = send(&app, get(&format!("/api/runs/{}/events", run_id))).await;
  assert_eq!(status, StatusCode::OK);
  let text = String::from_utf8(body).unwrap();

  let names: Vec<&str> = text
    .lines()
    .filter_map(|line| line.strip_prefix("event: "))
    .collect();
  assert_eq!(names.len(), 7);
  assert!(names[..6].iter().all(|name| *name == "trace"));
  assert_eq!(names[6], "complete");

  let first: Value = text
    .lines()
    .find_map(|line| line.strip_prefix("data: "))
    .map(|data| serde_json::from_str(data).unwrap())
    .unwrap();
  assert_eq!(first["event"], json!("trace"));
  assert_eq!(first["node_id"], json!("T"));
  assert_eq!(first["phase"], json!("start"));

  let run = registry.get(&run_id).unwrap();
  assert_eq!(run.traces.len(), 6);

  let (status, body) = send_json(&app, get(&format!("/api/runs/{}", run_id))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], json!("completed"));
  assert_eq!(body["traces"].as_array().unwrap().len(), 6);

  let (_, body) = send_json(&app, get("/api/runs")).await;
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["id"], json!(run_id));
}

#[tokio::test]
async fn test_submit_template_by_id() {
  let (app, _) = app();
  let (status, body) = send_json(
    &app,
    post("/api/runs", json!({"template": "customer-support", "input": {"message": "hi"}})),
  )
  .await;
  assert_eq!(status, StatusCode::ACCEPTED);
  assert!(body["run_id"].is_string());

  let (status, _) = send_json(&app, post("/api/runs", json!({"template": "nope"}))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send_json(&app, post("/api/runs", json!({"input": {}}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_invalid_graph() {
  let (app, registry) = app();
  let workflow = json!({
    "workflow_id": "wf",
    "name": "Broken",
    "nodes": [{"node_id": "A", "type": "agent", "instructions": "hi"}],
    "edges": [{"source": "A", "target": "ghost"}]
  });

  let (status, body) = send_json(&app, post("/api/runs", json!({"graph": workflow}))).await;

  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["validation"]["is_valid"], json!(false));
  let codes: Vec<&str> = body["validation"]["errors"]
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["code"].as_str().unwrap())
    .collect();
  assert!(codes.contains(&"no_trigger"));
  assert!(codes.contains(&"dangling_edge"));
  assert!(registry.list().is_empty());
}

#[tokio::test]
async fn test_cancel_run() {
  let client = Arc::new(ScriptedClient::new().delay("A", Duration::from_secs(3600)));
  let runtime = Runtime::new(NodeExecutors::new(client.clone(), client), RuntimeConfig::default());
  let (app, registry) = app_with(runtime);

  let (_, body) = send_json(&app, post("/api/runs", json!({"workflow": linear_workflow()}))).await;
  let run_id = body["run_id"].as_str().unwrap().to_string();

  let (status, body) = send_json(&app, post(&format!("/api/runs/{}/cancel", run_id), json!({}))).await;
  assert_eq!(status, StatusCode::ACCEPTED);
  assert_eq!(body["cancelled"], json!(true));
  assert_eq!(body["status"], json!("cancelled"));

  let (_, body) = send_json(&app, post(&format!("/api/runs/{}/cancel", run_id), json!({}))).await;
  assert_eq!(body["cancelled"], json!(false));

  let (_, body) = send(&app, get(&format!("/api/runs/{}/events", run_id))).await;
  let text = String::from_utf8(body).unwrap();
  assert!(text.contains("event: complete"));
  assert!(text.contains("\"status\":\"cancelled\""));
  assert!(registry.get(&run_id).unwrap().end_traces().all(|t| t.node_id != "A"));
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
  let (app, _) = app();
  let (status, body) = send_json(&app, get("/api/runs/missing")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], json!("unknown run 'missing'"));

  let (status, _) = send_json(&app, post("/api/runs/missing/cancel", json!({}))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validate_workflow() {
  let (app, _) = app();
  let (status, body) = send_json(&app, post("/api/workflows/validate", linear_workflow())).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["is_valid"], json!(true));
  assert_eq!(body["summary"]["node_count"], json!(3));
  assert_eq!(body["summary"]["edge_count"], json!(2));
  let warnings: Vec<&str> = body["warnings"]
    .as_array()
    .unwrap()
    .iter()
    .map(|w| w["code"].as_str().unwrap())
    .collect();
  assert!(warnings.is_empty());
}

#[tokio::test]
async fn test_templates() {
  let (app, _) = app();
  let (status, body) = send_json(&app, get("/api/templates")).await;
  assert_eq!(status, StatusCode::OK);
  let ids: Vec<&str> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|t| t["id"].as_str().unwrap())
    .collect();
  assert_eq!(ids, vec!["customer-support", "content-creation"]);

  let (status, body) = send_json(&app, get("/api/templates/content-creation")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["workflow_id"], json!("content-creation"));

  let (status, _) = send_json(&app, get("/api/templates/unknown")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
