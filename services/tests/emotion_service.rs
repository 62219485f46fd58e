//! Emotion skill routes and the intent adapter in front of them.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use dhagent_emotion::{EmotionAnalyzer, EmotionError, EmotionSkill};
use dhagent_services::{AdapterConfig, adapter, emotion};

struct Fixed(&'static str);

impl EmotionAnalyzer for Fixed {
    fn emotion_result(&self, _image_base64: &str) -> dhagent_emotion::Result<String> {
        Ok(self.0.to_string())
    }
}

struct Failing;

impl EmotionAnalyzer for Failing {
    fn emotion_result(&self, _image_base64: &str) -> dhagent_emotion::Result<String> {
        Err(EmotionError::Model("session gone".into()))
    }
}

fn emotion_app(analyzer: impl EmotionAnalyzer + 'static) -> Router {
    emotion::router(EmotionSkill::new(Arc::new(analyzer)))
}

async fn call(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn manifest_and_health() {
    let (status, manifest) = call(emotion_app(Fixed("")), "GET", "/manifest", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(manifest["name"], "emotion_analysis");

    let (_, health) = call(emotion_app(Fixed("")), "GET", "/health", "").await;
    assert_eq!(health, json!({"status": "healthy"}));
}

#[tokio::test]
async fn execute_rejects_empty_body() {
    for body in ["", "{}", "not json"] {
        let (status, out) = call(emotion_app(Fixed("")), "POST", "/execute", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(out, json!({"success": false, "error": "请求体不能为空", "result": null}));
    }
}

#[tokio::test]
async fn execute_runs_skill() {
    let app = emotion_app(Fixed("情绪分析：高兴（置信度：0.900）"));
    let (status, out) = call(app, "POST", "/execute", r#"{"image_base64":"AAAA"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], true);
    assert_eq!(out["result"], "情绪分析：高兴（置信度：0.900）");

    let (_, failed) = call(emotion_app(Failing), "POST", "/execute", r#"{"image_base64":"AAAA"}"#).await;
    assert_eq!(failed["success"], false);
    assert!(failed["result"].is_null());
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn intent_body(intents: Value, parts: Value) -> String {
    json!({"message": {"metadata": {"intentInfos": intents}, "parts": parts}}).to_string()
}

#[tokio::test]
async fn adapter_routes_emotion_intent_to_service() {
    let url = spawn(emotion_app(Fixed("情绪分析：中性（置信度：0.700）"))).await;
    let app = adapter::router(AdapterConfig {
        emotion_service_url: url,
        ..AdapterConfig::default()
    });

    let body = intent_body(
        json!([
            {"intent": "emotion-analysis", "slots": [{"name": "image_base64", "value": "AAAA"}]},
            {"intent": "weather"}
        ]),
        json!([]),
    );
    let (status, out) = call(app, "POST", "/process-intent", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], true);
    assert_eq!(out["responses"][0]["intent"], "emotion-analysis");
    assert_eq!(out["responses"][0]["response"]["result"], "情绪分析：中性（置信度：0.700）");
    assert_eq!(out["responses"][1]["response"]["error"], "不支持的意图: weather");
}

#[tokio::test]
async fn adapter_edge_cases() {
    let app = adapter::router(AdapterConfig::default());

    let (status, _) = call(app.clone(), "POST", "/process-intent", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, out) = call(app.clone(), "POST", "/process-intent", &intent_body(json!([]), json!([]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["error"], "未检测到意图信息");

    let body = intent_body(json!([{"intent": "emotion-analysis", "slots": []}]), json!([]));
    let (_, out) = call(app, "POST", "/process-intent", &body).await;
    assert_eq!(out["responses"][0]["response"]["error"], "未提供图片数据");
}

#[tokio::test]
async fn adapter_reports_unreachable_service() {
    // Nothing listens on port 9 of localhost.
    let app = adapter::router(AdapterConfig {
        emotion_service_url: "http://127.0.0.1:9".into(),
        ..AdapterConfig::default()
    });
    let body = intent_body(
        json!([{"intent": "emotion-analysis"}]),
        json!([{"kind": "image", "data": "AAAA"}]),
    );
    let (_, out) = call(app, "POST", "/process-intent", &body).await;
    let response = &out["responses"][0]["response"];
    assert_eq!(response["success"], false);
    assert!(response["error"].as_str().unwrap().starts_with("调用服务时发生异常: "));
}

#[tokio::test]
async fn adapter_agent_cards() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("card.json");
    std::fs::write(&path, r#"{"name":"from-file"}"#).unwrap();

    let app = adapter::router(AdapterConfig {
        public_url: "http://agent.test".into(),
        agentcard_path: path,
        ..AdapterConfig::default()
    });
    let (_, card) = call(app.clone(), "GET", "/agentCard", "").await;
    assert_eq!(card["services"][0]["endpoint"], "http://agent.test");
    let (_, doc) = call(app.clone(), "GET", "/.well-known/agent.json", "").await;
    assert_eq!(doc["agentCard"]["protocolVersion"], "0.2.5");
    let (status, file) = call(app, "GET", "/agentcard", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(file["name"], "from-file");

    let missing = adapter::router(AdapterConfig {
        agentcard_path: dir.path().join("missing.json"),
        ..AdapterConfig::default()
    });
    let (status, err) = call(missing, "GET", "/agentcard", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err["error"].as_str().unwrap().starts_with("读取AgentCard文件时出错"));
}
