//! OpenAI-style chat API over DashScope.
//!
//! - `POST /v1/chat/completions`: intent-prompted chat, optionally streamed
//! - `POST /v1/chat/completions-vl`: the same over a vision-language model
//! - `POST /v1/text-image-conversation`: text and/or image turn with emotion
//!   context and optional spoken reply
//! - `POST /v1/audio/speech`: TTS to base64 WAV
//! - `POST /v1/conversation`: intent-prompted chat returning the updated history
//! - `POST /dashscope/chat/completions`: intent-prompted chat in DashScope's shape
//! - `GET /v1/models`

mod conversation;
pub mod openai;
mod upstream;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use dhagent_audio::{Format, b64, wav};
use dhagent_dashscope::{
    GenerationRequest, GenerationResponse, MODEL_QWEN_VL_PLUS, Message, MultiModalMessage, MultiModalRequest,
    TTS_SAMPLE_RATE,
};
use dhagent_emotion::EmotionAnalyzer;
use dhagent_llm::intent::{DEFAULT_INTENT_MODEL, INTENT_SYSTEM_PROMPT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{debug, error};

pub use conversation::{OMNI_SYSTEM_PROMPT, SERVICE_UNAVAILABLE_REPLY};
pub use upstream::{ChatUpstream, DashScopeUpstream};

use crate::chat::openai::{
    completion, end_chunk, invalid_request, models, multimodal_messages, text_messages,
    upstream_error, upstream_error_response,
};

/// The chat API and the services it calls.
#[derive(Clone)]
pub struct ChatApi {
    upstream: Arc<dyn ChatUpstream>,
    emotion: Option<Arc<dyn EmotionAnalyzer>>,
    voice: String,
    speak_replies: bool,
}

impl ChatApi {
    pub fn new(upstream: Arc<dyn ChatUpstream>) -> Self {
        Self {
            upstream,
            emotion: None,
            voice: String::new(),
            speak_replies: false,
        }
    }

    /// Adds emotion context to image turns.
    pub fn with_emotion(mut self, analyzer: Arc<dyn EmotionAnalyzer>) -> Self {
        self.emotion = Some(analyzer);
        self
    }

    /// Voice for synthesized replies and speech requests that name none.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Attaches spoken audio to conversation replies.
    pub fn with_spoken_replies(mut self, enabled: bool) -> Self {
        self.speak_replies = enabled;
        self
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/chat/completions-vl", post(chat_completions_vl))
            .route("/v1/text-image-conversation", post(conversation::text_image_conversation))
            .route("/v1/audio/speech", post(speech))
            .route("/v1/conversation", post(conversation_turn))
            .route("/dashscope/chat/completions", post(dashscope_completions))
            .route("/v1/models", get(list_models))
            .layer(CorsLayer::permissive())
            .with_state(self)
    }

    /// Synthesizes `text` and returns it as a base64 WAV file.
    pub(crate) async fn speak_wav_base64(&self, text: &str, voice: &str) -> dhagent_dashscope::Result<String> {
        let voice = if voice.is_empty() { self.voice.as_str() } else { voice };
        let pcm = self.upstream.speak(text, voice).await?;
        Ok(b64::encode(&wav::encode(Format::mono(TTS_SAMPLE_RATE), &pcm)))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionRequest {
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stream: bool,
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| invalid_request(&format!("invalid request body: {}", e)))
}

/// The intent system prompt followed by the caller's messages.
fn intent_request(model: &str, raw: &[Value]) -> GenerationRequest {
    let mut messages = Vec::with_capacity(raw.len() + 1);
    messages.push(Message::system(INTENT_SYSTEM_PROMPT));
    messages.extend(text_messages(raw));
    GenerationRequest::new(model, messages)
}

async fn chat_completions(State(api): State<ChatApi>, body: Bytes) -> Response {
    let req: CompletionRequest = match parse(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let model = req.model.unwrap_or_else(|| DEFAULT_INTENT_MODEL.to_string());
    let reply = api.upstream.generate(intent_request(&model, &req.messages)).await;

    if req.stream {
        return stream_reply(model, reply).into_response();
    }
    match reply {
        Ok(content) => Json(completion(&model, &content)).into_response(),
        Err(e) => {
            error!("chat completion failed: {}", e);
            upstream_error_response(&e)
        }
    }
}

/// Replays a finished reply as SSE, one character per chunk.
fn stream_reply(
    model: String,
    reply: dhagent_dashscope::Result<String>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        match reply {
            Ok(content) => {
                for (i, ch) in content.chars().enumerate() {
                    let chunk = openai::chunk(i, &model, &ch.to_string());
                    yield Ok(Event::default().data(chunk.to_string()));
                }
                let total = content.chars().count();
                yield Ok(Event::default().data(end_chunk(&model, total).to_string()));
                yield Ok(Event::default().data("[DONE]"));
            }
            Err(e) => {
                error!("chat completion stream failed: {}", e);
                yield Ok(Event::default().data(upstream_error(&e).to_string()));
            }
        }
    };
    Sse::new(stream)
}

async fn chat_completions_vl(State(api): State<ChatApi>, body: Bytes) -> Response {
    let req: CompletionRequest = match parse(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let model = req.model.unwrap_or_else(|| MODEL_QWEN_VL_PLUS.to_string());

    let mut messages = Vec::with_capacity(req.messages.len() + 1);
    messages.push(MultiModalMessage::system(INTENT_SYSTEM_PROMPT));
    messages.extend(multimodal_messages(&req.messages));
    match api.upstream.converse(MultiModalRequest::new(&model, messages)).await {
        Ok(content) => Json(completion(&model, &content)).into_response(),
        Err(e) => {
            error!("vision completion failed: {}", e);
            upstream_error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpeechRequest {
    #[serde(default)]
    input: String,
    #[serde(default)]
    voice: String,
}

async fn speech(State(api): State<ChatApi>, body: Bytes) -> Response {
    let req: SpeechRequest = match parse(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    if req.input.trim().is_empty() {
        return invalid_request("input must be non-empty");
    }
    debug!("speech request: {} chars", req.input.chars().count());
    match api.speak_wav_base64(&req.input, &req.voice).await {
        Ok(audio) => Json(json!({"audio": audio})).into_response(),
        Err(e) => {
            error!("speech synthesis failed: {}", e);
            upstream_error_response(&e)
        }
    }
}

fn usage_json(resp: &GenerationResponse) -> Value {
    let usage = resp.usage.clone().unwrap_or_default();
    json!({
        "input_tokens": usage.input_tokens,
        "output_tokens": usage.output_tokens,
        "total_tokens": usage.total_tokens
    })
}

async fn dashscope_completions(State(api): State<ChatApi>, body: Bytes) -> Response {
    let req: CompletionRequest = match parse(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let model = req.model.unwrap_or_else(|| DEFAULT_INTENT_MODEL.to_string());
    match api.upstream.call(intent_request(&model, &req.messages)).await {
        Ok(resp) => Json(json!({
            "request_id": resp.request_id,
            "output": {"text": resp.text().unwrap_or_default(), "finish_reason": "stop"},
            "usage": usage_json(&resp)
        }))
        .into_response(),
        Err(e) => {
            error!("dashscope completion failed: {}", e);
            upstream_error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConversationTurn {
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

async fn conversation_turn(State(api): State<ChatApi>, body: Bytes) -> Response {
    let req: ConversationTurn = match parse(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut messages = req.messages;
    if messages.is_empty() {
        match req.message.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                messages.push(json!({"role": "user", "content": text}));
            }
            _ => {
                return (StatusCode::BAD_REQUEST, Json(json!({"error": "缺少消息内容"})))
                    .into_response();
            }
        }
    }
    let model = req.model.unwrap_or_else(|| DEFAULT_INTENT_MODEL.to_string());

    match api.upstream.call(intent_request(&model, &messages)).await {
        Ok(resp) => {
            let reply = resp.text().unwrap_or_default().to_string();
            let usage = usage_json(&resp);
            messages.push(json!({"role": "assistant", "content": reply}));
            Json(json!({
                "success": true,
                "data": {
                    "response": reply,
                    "messages": messages,
                    "request_id": resp.request_id,
                    "usage": usage
                }
            }))
            .into_response()
        }
        Err(e) => {
            error!("conversation turn failed: {}", e);
            let mut body = upstream_error(&e);
            body["success"] = json!(false);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn list_models() -> Json<Value> {
    Json(models(&[DEFAULT_INTENT_MODEL, MODEL_QWEN_VL_PLUS]))
}
