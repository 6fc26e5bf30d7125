use std::sync::Arc;

use implodesc_engine::{AnalysisEngine, EngineConfig};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, no process-wide keys, ephemeral port.
        let engine = Arc::new(AnalysisEngine::new(EngineConfig::default()));
        let app = implodesc_api::app::build_app(engine);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start(client: &reqwest::Client, srv: &TestServer, item_name: &str) -> Value {
    let res = client
        .post(srv.url("/analysis/start"))
        .json(&json!({"query": {"item_name": item_name, "quantity": 2}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn analysis_lifecycle_with_reference_model() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let started = start(&client, &srv, "Cotton T-Shirt").await;
    let session_id = started["session_id"].as_str().unwrap().to_string();
    assert_eq!(
        started["message"],
        "Please provide clarifications to proceed with analysis"
    );
    let questions = started["clarifications"].as_array().unwrap();
    assert!(questions.iter().any(|q| q["type"] == "material"));

    let status: Value = client
        .get(srv.url(&format!("/analysis/{session_id}/status")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "pending");
    assert_eq!(status["progress_percentage"], 0);

    let early = client
        .get(srv.url(&format!("/analysis/{session_id}/result")))
        .send()
        .await
        .unwrap();
    assert_eq!(early.status(), StatusCode::CONFLICT);
    let early: Value = early.json().await.unwrap();
    assert_eq!(early["error"], "not_ready");

    let res = client
        .post(srv.url("/analysis/clarify"))
        .json(&json!({
            "session_id": session_id,
            "clarifications": [
                {"question_id": "use_case", "answer": "Personal use"},
                {"question_id": "quantity", "answer": "3"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let submitted: Value = res.json().await.unwrap();
    assert_eq!(submitted["status"], "completed");
    assert_eq!(submitted["estimated_completion_time"], 30);

    let status: Value = client
        .get(srv.url(&format!("/analysis/{session_id}/status")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "completed");
    assert_eq!(status["progress_percentage"], 100);
    assert_eq!(status["estimated_time_remaining"], 0);
    assert_eq!(status["message"], "Analysis completed successfully");

    let res = client
        .get(srv.url(&format!("/analysis/{session_id}/result")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let result: Value = res.json().await.unwrap();
    assert_eq!(result["item_name"], "Cotton T-Shirt");
    assert_eq!(result["clarifications_used"]["quantity"], "3");
    let analysis = &result["analysis_result"];
    assert_eq!(analysis["provider"], "mock");
    assert_eq!(analysis["degraded"], false);
    assert_eq!(analysis["session_metadata"]["quantity"], 3);
    assert!(analysis["materials"].as_array().is_some_and(|m| !m.is_empty()));
    assert!(analysis["carbon_footprint"]["total_co2e"].as_f64().is_some_and(|t| t > 0.0));
    assert!(!analysis["key_insights"].as_array().unwrap().is_empty());

    // Default policy: a repeat submission reports the current status.
    let again: Value = client
        .post(srv.url("/analysis/clarify"))
        .json(&json!({"session_id": session_id, "clarifications": []}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["status"], "completed");
}

#[tokio::test]
async fn invalid_requests_map_to_client_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let blank = client
        .post(srv.url("/analysis/start"))
        .json(&json!({"query": {"item_name": "   "}}))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    let body: Value = blank.json().await.unwrap();
    assert_eq!(body["error"], "invalid_input");

    let malformed = client
        .get(srv.url("/analysis/not-a-session/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let unknown_id = uuid_like();
    let missing = client
        .get(srv.url(&format!("/analysis/{unknown_id}/result")))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let clarify_missing = client
        .post(srv.url("/analysis/clarify"))
        .json(&json!({"session_id": unknown_id, "clarifications": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(clarify_missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_credentials_change_available_providers() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let started = start(&client, &srv, "Mug").await;
    let session_id = started["session_id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/analysis/{session_id}/credentials")))
        .json(&json!({"api_keys": {"openai": "not-a-key", "anthropic": "sk-ant-test-0123"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["accepted"], json!(["anthropic"]));

    let scoped: Value = client
        .get(srv.url(&format!("/providers?session_id={session_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scoped, json!({"openai": false, "anthropic": true, "mock": true}));

    let global: Value = client
        .get(srv.url("/providers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(global["anthropic"], false);
    assert_eq!(global["mock"], true);
}

/// A well-formed id no session will ever have.
fn uuid_like() -> String {
    implodesc_core::SessionId::new().to_string()
}
