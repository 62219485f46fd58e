//! Chat client, router and intent tests against local mocks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Json, Router as AxumRouter,
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::StreamExt;
use serde_json::{Value, json};

use dhagent_llm::{
    ArkResponsesClient, ChatBackend, ChatMessage, ChatOptions, ChatResponse, Error, Intent,
    IntentDetector, OpenAICompatClient, OpenAIConfig, Result, Router,
    intent::{FALLBACK_CHAT_REPLY, INTENT_SYSTEM_PROMPT},
    router::{ASSISTANT_SYSTEM_PROMPT, EMPTY_REPLY, NETWORK_FAILURE_REPLY},
};

async fn serve(router: AxumRouter) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn openai(base: &str) -> OpenAICompatClient {
    OpenAICompatClient::with_provider(
        "deepseek",
        OpenAIConfig {
            api_key: "sk-test".into(),
            base_url: base.into(),
            model: "deepseek-chat".into(),
        },
    )
}

#[tokio::test]
async fn openai_chat_reads_first_choice() {
    let router = AxumRouter::new().route(
        "/chat/completions",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["model"], "deepseek-chat");
            assert_eq!(body["stream"], false);
            Json(json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "你好"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
            }))
        }),
    );
    let base = serve(router).await;

    let resp = openai(&base)
        .chat(&[ChatMessage::user("hi")], &ChatOptions::default())
        .await
        .unwrap();
    assert_eq!(resp.text, "你好");
    assert_eq!(resp.usage.total_tokens, 4);
}

#[tokio::test]
async fn openai_chat_surfaces_error_body() {
    let router = AxumRouter::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
    );
    let base = serve(router).await;

    let err = openai(&base)
        .chat(&[ChatMessage::user("hi")], &ChatOptions::default())
        .await
        .unwrap_err();
    match err {
        Error::Api { provider, status, body } => {
            assert_eq!(provider, "deepseek");
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn openai_stream_yields_deltas_until_done() {
    let router = AxumRouter::new().route(
        "/chat/completions",
        post(|| async {
            let mut sse = String::new();
            for c in ["你", "好"] {
                sse.push_str(&format!(
                    "data: {}\n\n",
                    json!({"choices": [{"index": 0, "delta": {"content": c}, "finish_reason": null}]})
                ));
            }
            sse.push_str("data: [DONE]\n\n");
            sse.push_str(&format!(
                "data: {}\n\n",
                json!({"choices": [{"delta": {"content": "never"}}]})
            ));
            Response::builder()
                .header(header::CONTENT_TYPE, "text/event-stream")
                .body(Body::from(sse))
                .unwrap()
                .into_response()
        }),
    );
    let base = serve(router).await;

    let stream = openai(&base)
        .chat_stream(&[ChatMessage::user("hi")], &ChatOptions::default())
        .await
        .unwrap();
    let parts: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(parts, vec!["你".to_string(), "好".to_string()]);
}

#[tokio::test]
async fn ark_describe_joins_output_text() {
    let router = AxumRouter::new().route(
        "/responses",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["input"][0]["content"][0]["type"], "input_image");
            Json(json!({
                "output": [
                    {"type": "reasoning", "summary": []},
                    {"type": "message", "content": [{"type": "output_text", "text": "一只猫"}]}
                ]
            }))
        }),
    );
    let base = serve(router).await;

    let text = ArkResponsesClient::new("ak")
        .with_base_url(base)
        .describe("https://example.com/cat.jpg", "这是什么")
        .await
        .unwrap();
    assert_eq!(text, "一只猫");
}

/// Backend that records calls and replays a fixed outcome.
struct MockBackend {
    reply: Option<String>,
    calls: AtomicUsize,
    last: std::sync::Mutex<Vec<ChatMessage>>,
}

impl MockBackend {
    fn new(reply: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
            last: std::sync::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-1"
    }

    async fn chat(&self, messages: &[ChatMessage], _opts: &ChatOptions) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = messages.to_vec();
        match &self.reply {
            Some(text) => Ok(ChatResponse {
                text: text.clone(),
                ..Default::default()
            }),
            None => Err(Error::Config("offline".into())),
        }
    }
}

#[tokio::test]
async fn router_wraps_history_and_trims() {
    let backend = MockBackend::new(Some("  今天晴天。 \n"));
    let router = Router::new(backend.clone());

    let history = vec![ChatMessage::user("早"), ChatMessage::assistant("早上好")];
    let reply = router.generate_response("天气怎么样", &history).await;
    assert_eq!(reply, "今天晴天。");

    let sent = backend.last.lock().unwrap().clone();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0], ChatMessage::system(ASSISTANT_SYSTEM_PROMPT));
    assert_eq!(sent[3], ChatMessage::user("天气怎么样"));
}

#[tokio::test]
async fn router_falls_back_on_failure_and_empty() {
    let failing = Router::new(MockBackend::new(None));
    assert_eq!(failing.generate_response("hi", &[]).await, NETWORK_FAILURE_REPLY);

    let empty = Router::new(MockBackend::new(Some("   ")));
    assert_eq!(empty.generate_response("hi", &[]).await, EMPTY_REPLY);
}

#[tokio::test]
async fn intent_uses_model_reply() {
    let backend = MockBackend::new(Some("0"));
    let detector = IntentDetector::new(backend.clone());
    assert_eq!(detector.detect("这是什么").await, Intent::Vision);
    assert_eq!(
        backend.last.lock().unwrap()[0],
        ChatMessage::system(INTENT_SYSTEM_PROMPT)
    );

    let chatty = IntentDetector::new(MockBackend::new(Some("你好，有什么可以帮你？")));
    assert_eq!(
        chatty.detect("你好").await,
        Intent::Chat("你好，有什么可以帮你？".into())
    );
}

#[tokio::test]
async fn intent_falls_back_to_keywords() {
    let detector = IntentDetector::new(MockBackend::new(None));
    assert_eq!(detector.detect("你看前面风景怎么样").await, Intent::Vision);
    assert_eq!(
        detector.detect("讲个故事").await,
        Intent::Chat(FALLBACK_CHAT_REPLY.into())
    );
}
