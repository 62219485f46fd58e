//! `POST /v1/text-image-conversation`.
//!
//! Image turns go to the omni model with the emotion analysis appended to the
//! question; text-only turns go to `qwen-max` as a bare prompt. A failed
//! model call is answered with [`SERVICE_UNAVAILABLE_REPLY`] rather than an
//! error, and the reply can carry synthesized speech.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dhagent_audio::b64::strip_data_url;
use dhagent_dashscope::{
    GenerationRequest, MODEL_QWEN_MAX, MODEL_QWEN3_OMNI_FLASH, MultiModalMessage,
    MultiModalRequest,
};
use dhagent_emotion::{ANALYSIS_PREFIX, EmotionAnalyzer};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::ChatApi;

pub const OMNI_SYSTEM_PROMPT: &str = concat!(
    "你是一个对话机器人，并按照以下要求尽可能的简答问题（最好在20个字之内），返回助手的回答，",
    "如果识别到用户想让你通过图片回答则根据图片回答问题,如：1，这是什么 2，你看前边风景怎么样形容一下？3，你面前有几个人 ，4，他在做什么 ， 我穿了什么颜色的衣服。，其他时候你是一个对话系统，并尽可能简要的回答问题，",
    "如果我的输入中有情绪的七维向量值不要把它显示出来，只需要根据情绪值分析我的情绪并给我回复就行了。",
    "如果情绪中平静最大则无需根据情绪回答，只需要回答我的问题就行了."
);

pub const SERVICE_UNAVAILABLE_REPLY: &str = "我理解您的问题，但目前服务暂时不可用，请稍后再试。";

const DESCRIBE_IMAGE_PROMPT: &str = "请描述这张图片";
const MISSING_INPUT_ERROR: &str = "至少需要提供文本或图片之一";

#[derive(Debug, Default, Deserialize)]
struct ConversationRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    image_base64: Option<String>,
    /// Prior turns, echoed back with the reply appended.
    #[serde(default)]
    messages: Vec<Value>,
}

pub(super) async fn text_image_conversation(State(api): State<ChatApi>, body: Bytes) -> Response {
    let req: ConversationRequest = serde_json::from_slice(&body).unwrap_or_default();
    let image = req
        .image_base64
        .as_deref()
        .map(strip_data_url)
        .filter(|s| !s.is_empty());
    debug!(
        "conversation turn: {} chars of text, image: {}",
        req.text.chars().count(),
        image.is_some()
    );

    if req.text.is_empty() && image.is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": MISSING_INPUT_ERROR}))).into_response();
    }

    let reply = match image {
        Some(image) => {
            let emotion = match &api.emotion {
                Some(analyzer) => emotion_context(analyzer.clone(), image.to_string()).await,
                None => String::new(),
            };
            let question = if req.text.is_empty() {
                DESCRIBE_IMAGE_PROMPT
            } else {
                req.text.as_str()
            };
            let messages = vec![
                MultiModalMessage::system(OMNI_SYSTEM_PROMPT),
                MultiModalMessage::user_image(
                    format!("data:image/jpeg;base64,{}", image),
                    format!("{}{}", question, emotion),
                ),
            ];
            api.upstream
                .converse(MultiModalRequest::new(MODEL_QWEN3_OMNI_FLASH, messages))
                .await
        }
        None => {
            let req = GenerationRequest::with_prompt(MODEL_QWEN_MAX, &req.text)
                .temperature(0.7)
                .max_tokens(2000);
            api.upstream.generate(req).await
        }
    };
    let reply = reply.unwrap_or_else(|e| {
        warn!("conversation model call failed, using fallback reply: {}", e);
        SERVICE_UNAVAILABLE_REPLY.to_string()
    });

    let audio = if api.speak_replies {
        match api.speak_wav_base64(&reply, "").await {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!("reply synthesis failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    info!("conversation reply: {} chars", reply.chars().count());
    Json(reply_body(reply, req.messages, audio)).into_response()
}

/// The emotion line for an image, or empty when there is no face or the
/// analysis fails.
async fn emotion_context(analyzer: Arc<dyn EmotionAnalyzer>, image: String) -> String {
    match tokio::task::spawn_blocking(move || analyzer.emotion_result(&image)).await {
        Ok(Ok(text)) if text.starts_with(ANALYSIS_PREFIX) => text,
        Ok(Ok(_)) => String::new(),
        Ok(Err(e)) => {
            warn!("emotion analysis failed: {}", e);
            String::new()
        }
        Err(e) => {
            warn!("emotion analysis task failed: {}", e);
            String::new()
        }
    }
}

fn reply_body(reply: String, mut history: Vec<Value>, audio: Option<String>) -> Value {
    history.push(json!({"role": "assistant", "content": reply}));
    let mut data = json!({
        "response": reply,
        "messages": history,
        "usage": {"input_tokens": 0, "output_tokens": 0, "total_tokens": 0}
    });
    if let Some(audio) = audio {
        data["audio"] = Value::String(audio);
    }
    json!({"success": true, "data": data})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_body_appends_history() {
        let body = reply_body(
            "好的".to_string(),
            vec![json!({"role": "user", "content": "你好"})],
            None,
        );
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["response"], "好的");
        assert_eq!(body["data"]["messages"][1], json!({"role": "assistant", "content": "好的"}));
        assert!(body["data"].get("audio").is_none());

        let with_audio = reply_body("a".into(), Vec::new(), Some("UklGRg==".into()));
        assert_eq!(with_audio["data"]["audio"], "UklGRg==");
    }
}
