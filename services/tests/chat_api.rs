//! Chat API routes against a scripted upstream.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use dhagent_audio::{b64, wav};
use dhagent_dashscope::{
    Error, GenerationRequest, GenerationResponse, MultiModalRequest, Result,
};
use dhagent_emotion::EmotionAnalyzer;
use dhagent_services::{ChatApi, ChatUpstream, chat::SERVICE_UNAVAILABLE_REPLY};

#[derive(Default)]
struct Scripted {
    reply: Option<String>,
    pcm: Vec<u8>,
    /// Serialized requests, in call order.
    calls: Mutex<Vec<Value>>,
    voices: Mutex<Vec<String>>,
}

impl Scripted {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            pcm: vec![1, 0, 2, 0],
            ..Self::default()
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn result(&self) -> Result<String> {
        self.reply
            .clone()
            .ok_or_else(|| Error::api("InvalidApiKey", "Invalid API-key provided.", 401))
    }

    fn last_call(&self) -> Value {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatUpstream for Scripted {
    async fn call(&self, req: GenerationRequest) -> Result<GenerationResponse> {
        self.calls.lock().unwrap().push(serde_json::to_value(&req).unwrap());
        let text = self.result()?;
        Ok(serde_json::from_value(json!({
            "request_id": "req-1",
            "output": {"choices": [{"finish_reason": "stop", "message": {"role": "assistant", "content": text}}]},
            "usage": {"input_tokens": 30, "output_tokens": 2, "total_tokens": 32}
        }))
        .unwrap())
    }

    async fn converse(&self, req: MultiModalRequest) -> Result<String> {
        self.calls.lock().unwrap().push(serde_json::to_value(&req).unwrap());
        self.result()
    }

    async fn speak(&self, _text: &str, voice: &str) -> Result<Vec<u8>> {
        self.voices.lock().unwrap().push(voice.to_string());
        if self.reply.is_none() {
            return Err(Error::Connection("tts down".into()));
        }
        Ok(self.pcm.clone())
    }
}

struct Sad;

impl EmotionAnalyzer for Sad {
    fn emotion_result(&self, _image_base64: &str) -> dhagent_emotion::Result<String> {
        Ok("情绪分析：悲伤（置信度：0.800）".to_string())
    }
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, bytes) = post(app, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn completions_prepend_intent_prompt() {
    let upstream = Scripted::replying("你好！");
    let app = ChatApi::new(upstream.clone()).router();

    let (status, out) = post_json(
        app,
        "/v1/chat/completions",
        json!({"messages": [{"role": "user", "content": "你好"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["id"], "chatcmpl-123");
    assert_eq!(out["model"], "qwen-plus-2025-12-01");
    assert_eq!(out["choices"][0]["message"]["content"], "你好！");
    assert_eq!(out["usage"]["total_tokens"], 21);

    let call = upstream.last_call();
    assert_eq!(call["model"], "qwen-plus-2025-12-01");
    assert_eq!(call["input"]["messages"][0]["role"], "system");
    assert!(call["input"]["messages"][0]["content"].as_str().unwrap().contains("返回0"));
    assert_eq!(call["input"]["messages"][1], json!({"role": "user", "content": "你好"}));
}

#[tokio::test]
async fn completions_stream_one_chunk_per_char() {
    let app = ChatApi::new(Scripted::replying("好的")).router();
    let (status, body) = post(
        app,
        "/v1/chat/completions",
        json!({"model": "qwen-plus", "stream": true, "messages": []}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    let events: Vec<&str> = text
        .split("\n\n")
        .filter_map(|e| e.strip_prefix("data: "))
        .collect();
    assert_eq!(events.len(), 4);
    let first: Value = serde_json::from_str(events[0]).unwrap();
    assert_eq!(first["choices"][0]["delta"]["content"], "好");
    assert_eq!(first["model"], "qwen-plus");
    let end: Value = serde_json::from_str(events[2]).unwrap();
    assert_eq!(end["id"], "chatcmpl-end");
    assert_eq!(end["choices"][0]["finish_reason"], "stop");
    assert_eq!(events[3], "[DONE]");
}

#[tokio::test]
async fn completions_upstream_error() {
    let app = ChatApi::new(Scripted::failing()).router();
    let (status, out) = post_json(app, "/v1/chat/completions", json!({"messages": []})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(out["error"]["type"], "api_error");
    assert_eq!(
        out["error"]["message"],
        "API调用出错: InvalidApiKey, Invalid API-key provided."
    );
}

#[tokio::test]
async fn completions_vl_uses_multimodal_messages() {
    let upstream = Scripted::replying("一只猫");
    let app = ChatApi::new(upstream.clone()).router();
    let (status, out) = post_json(
        app,
        "/v1/chat/completions-vl",
        json!({"messages": [{"role": "user", "content": [
            {"image": "https://example.test/cat.jpg"},
            {"text": "这是什么"}
        ]}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["model"], "qwen-vl-plus");

    let call = upstream.last_call();
    let messages = call["input"]["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(
        messages[1]["content"],
        json!([{"image": "https://example.test/cat.jpg"}, {"text": "这是什么"}])
    );
}

#[tokio::test]
async fn speech_returns_wav() {
    let upstream = Scripted::replying("");
    let app = ChatApi::new(upstream.clone()).with_voice("Cherry").router();
    let (status, out) = post_json(app, "/v1/audio/speech", json!({"input": "你好"})).await;
    assert_eq!(status, StatusCode::OK);

    let file = b64::decode(out["audio"].as_str().unwrap()).unwrap();
    let (format, pcm) = wav::decode(&file).unwrap();
    assert_eq!(format.sample_rate, 24000);
    assert_eq!(pcm, vec![1, 0, 2, 0]);
    assert_eq!(upstream.voices.lock().unwrap().as_slice(), ["Cherry"]);

    let app = ChatApi::new(Scripted::replying("")).router();
    let (status, _) = post_json(app, "/v1/audio/speech", json!({"input": " "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn conversation_requires_text_or_image() {
    let app = ChatApi::new(Scripted::replying("x")).router();
    let (status, out) = post_json(app, "/v1/text-image-conversation", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(out["error"], "至少需要提供文本或图片之一");
}

#[tokio::test]
async fn conversation_text_goes_to_prompt_generation() {
    let upstream = Scripted::replying("北京今天晴。");
    let app = ChatApi::new(upstream.clone()).router();
    let (status, out) = post_json(
        app,
        "/v1/text-image-conversation",
        json!({"text": "天气怎么样", "messages": [{"role": "user", "content": "在吗"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], true);
    assert_eq!(out["data"]["response"], "北京今天晴。");
    assert_eq!(out["data"]["messages"].as_array().unwrap().len(), 2);
    assert!(out["data"].get("audio").is_none());

    let call = upstream.last_call();
    assert_eq!(call["model"], "qwen-max");
    assert_eq!(call["input"]["prompt"], "天气怎么样");
    assert_eq!(call["parameters"]["max_tokens"], 2000);
}

#[tokio::test]
async fn conversation_image_adds_emotion_and_speech() {
    let upstream = Scripted::replying("别难过。");
    let app = ChatApi::new(upstream.clone())
        .with_emotion(Arc::new(Sad))
        .with_spoken_replies(true)
        .router();
    let (status, out) = post_json(
        app,
        "/v1/text-image-conversation",
        json!({"image_base64": "data:image/png;base64,AAAA"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(out["data"]["audio"].as_str().is_some());

    let call = upstream.last_call();
    assert_eq!(call["model"], "qwen3-omni-flash-2025-12-01");
    let user = &call["input"]["messages"][1]["content"];
    assert_eq!(user[0]["image"], "data:image/jpeg;base64,AAAA");
    assert_eq!(user[1]["text"], "请描述这张图片情绪分析：悲伤（置信度：0.800）");
}

#[tokio::test]
async fn conversation_falls_back_when_model_fails() {
    let app = ChatApi::new(Scripted::failing())
        .with_spoken_replies(true)
        .router();
    let (status, out) = post_json(app, "/v1/text-image-conversation", json!({"text": "你好"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["data"]["response"], SERVICE_UNAVAILABLE_REPLY);
    assert!(out["data"].get("audio").is_none());
}

#[tokio::test]
async fn dashscope_completions_keep_request_id_and_usage() {
    let upstream = Scripted::replying("0");
    let app = ChatApi::new(upstream.clone()).router();

    let (status, out) = post_json(
        app,
        "/dashscope/chat/completions",
        json!({"messages": [{"role": "user", "content": "帮我看看我现在的心情"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["request_id"], "req-1");
    assert_eq!(out["output"], json!({"text": "0", "finish_reason": "stop"}));
    assert_eq!(
        out["usage"],
        json!({"input_tokens": 30, "output_tokens": 2, "total_tokens": 32})
    );

    let call = upstream.last_call();
    assert_eq!(call["model"], "qwen-plus-2025-12-01");
    assert_eq!(call["input"]["messages"][0]["role"], "system");
}

#[tokio::test]
async fn dashscope_completions_upstream_error() {
    let app = ChatApi::new(Scripted::failing()).router();
    let (status, out) = post_json(app, "/dashscope/chat/completions", json!({"messages": []})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(out["error"]["code"], "InvalidApiKey");
    assert_eq!(out["error"]["type"], "api_error");
}

#[tokio::test]
async fn conversation_turn_wraps_single_message() {
    let upstream = Scripted::replying("你好，有什么可以帮你？");
    let app = ChatApi::new(upstream.clone()).router();

    let (status, out) = post_json(
        app,
        "/v1/conversation",
        json!({"message": "你好", "model": "qwen-plus"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], true);
    assert_eq!(out["data"]["response"], "你好，有什么可以帮你？");
    assert_eq!(
        out["data"]["messages"],
        json!([
            {"role": "user", "content": "你好"},
            {"role": "assistant", "content": "你好，有什么可以帮你？"}
        ])
    );
    assert_eq!(out["data"]["request_id"], "req-1");
    assert_eq!(out["data"]["usage"]["total_tokens"], 32);

    let call = upstream.last_call();
    assert_eq!(call["model"], "qwen-plus");
    assert_eq!(call["input"]["messages"][1], json!({"role": "user", "content": "你好"}));
}

#[tokio::test]
async fn conversation_turn_requires_message() {
    let upstream = Scripted::replying("unused");
    let app = ChatApi::new(upstream.clone()).router();
    let (status, out) = post_json(app, "/v1/conversation", json!({"message": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(out, json!({"error": "缺少消息内容"}));
    assert!(upstream.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn conversation_turn_upstream_error() {
    let app = ChatApi::new(Scripted::failing()).router();
    let (status, out) = post_json(
        app,
        "/v1/conversation",
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(out["success"], false);
    assert_eq!(out["error"]["code"], "InvalidApiKey");
}

#[tokio::test]
async fn models_list() {
    let app = ChatApi::new(Scripted::replying("")).router();
    let req = Request::builder().uri("/v1/models").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let out: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(out["object"], "list");
    assert_eq!(out["data"][1]["id"], "qwen-vl-plus");
}
