//! HTTP API round trips over loopback
//!
//! Boots the real application router on an ephemeral port and drives it with
//! a plain HTTP client, the way the editor does.

use serde_json::{json, Value};
use wireflow::config::{Config, EngineConfig, ServerConfig};
use wireflow::server::create_app;

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        engine: EngineConfig {
            max_steps: 1000,
            default_delay_ms: 1,
            request_timeout_secs: 5,
            relay_url: None,
        },
    }
}

async fn spawn_app() -> String {
    let app = create_app(test_config()).await.unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    format!("http://{}", addr)
}

fn demo_workflow(id: &str) -> Value {
    json!({
        "workflow": {
            "id": id,
            "name": "Increment",
            "lastModified": 1700000000000i64,
            "nodes": [
                {"id": "s", "type": "START", "position": {"x": 0.0, "y": 0.0},
                 "data": {"label": "Start", "initValue": "{\"value\":5}"}},
                {"id": "sc", "type": "SCRIPT", "position": {"x": 200.0, "y": 0.0},
                 "data": {"label": "Inc", "code": "return {value = input.value + 1}"}},
                {"id": "e", "type": "END", "position": {"x": 400.0, "y": 0.0},
                 "data": {"label": "End"}}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "sc"},
                {"id": "e2", "source": "sc", "target": "e"}
            ]
        }
    })
}

#[tokio::test]
async fn healthz_answers_ok() {
    let base = spawn_app().await;
    let body = reqwest::get(format!("{}/healthz", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn workflow_crud_round_trip() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    // Create
    let created = client
        .post(format!("{}/api/workflows", base))
        .json(&demo_workflow("wf-crud"))
        .send()
        .await
        .unwrap();
    assert!(created.status().is_success());

    // Duplicate id conflicts
    let duplicate = client
        .post(format!("{}/api/workflows", base))
        .json(&demo_workflow("wf-crud"))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 409);

    // List contains the summary
    let listing: Value = client
        .get(format!("{}/api/workflows", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let workflows = listing["workflows"].as_array().unwrap();
    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0]["id"], json!("wf-crud"));
    assert_eq!(workflows[0]["nodes"], json!(3));

    // Fetch returns the full document
    let fetched: Value = client
        .get(format!("{}/api/workflows/wf-crud", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["name"], json!("Increment"));
    assert_eq!(fetched["nodes"].as_array().unwrap().len(), 3);

    // Delete, then fetch 404s
    let deleted = client
        .delete(format!("{}/api/workflows/wf-crud", base))
        .send()
        .await
        .unwrap();
    assert!(deleted.status().is_success());
    let gone = client
        .get(format!("{}/api/workflows/wf-crud", base))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn registration_rejects_invalid_graphs() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    // No START node
    let no_start = json!({
        "workflow": {
            "id": "wf-bad",
            "name": "Bad",
            "nodes": [
                {"id": "e", "type": "END", "position": {"x": 0.0, "y": 0.0}, "data": {"label": ""}}
            ],
            "edges": []
        }
    });
    let response = client
        .post(format!("{}/api/workflows", base))
        .json(&no_start)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("START"));
}

#[tokio::test]
async fn executing_a_registered_workflow_returns_the_trace() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/workflows", base))
        .json(&demo_workflow("wf-run"))
        .send()
        .await
        .unwrap();

    let report: Value = client
        .post(format!("{}/api/workflows/wf-run/execute", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["status"], json!("completed"));
    assert!(report["runId"].as_str().is_some());

    let trace = report["trace"].as_array().unwrap();
    assert_eq!(trace.len(), 3);
    assert_eq!(trace[0]["nodeId"], json!("s"));
    assert_eq!(trace[1]["output"], json!({"value": 6}));
    assert_eq!(trace[2]["status"], json!("success"));
}

#[tokio::test]
async fn executing_an_unknown_workflow_404s() {
    let base = spawn_app().await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/workflows/ghost/execute", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn inline_execution_runs_without_registration() {
    let base = spawn_app().await;
    let report: Value = reqwest::Client::new()
        .post(format!("{}/api/executions", base))
        .json(&demo_workflow("wf-inline"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["status"], json!("completed"));
    assert_eq!(report["trace"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn failed_runs_answer_422_with_the_partial_trace() {
    let base = spawn_app().await;
    let failing = json!({
        "workflow": {
            "id": "wf-fail",
            "name": "Fails",
            "nodes": [
                {"id": "s", "type": "START", "position": {"x": 0.0, "y": 0.0}, "data": {"label": ""}},
                {"id": "bad", "type": "SCRIPT", "position": {"x": 200.0, "y": 0.0},
                 "data": {"label": "", "code": "error('kaboom')"}}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "bad"}
            ]
        }
    });

    let response = reqwest::Client::new()
        .post(format!("{}/api/executions", base))
        .json(&failing)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    let report: Value = response.json().await.unwrap();
    assert_eq!(report["status"], json!("failed"));
    assert!(report["error"].as_str().unwrap().contains("kaboom"));

    let trace = report["trace"].as_array().unwrap();
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[1]["nodeId"], json!("bad"));
    assert_eq!(trace[1]["status"], json!("error"));
}
