//! Agent descriptors for the multimodal interaction kit's A2A integration.

use std::path::Path;

use serde_json::{Value, json};

use crate::adapter::EMOTION_INTENT;

const A2A_PROTOCOL_URI: &str = "https://help.aliyun.com/zh/model-studio/multimodal-integration-a2a-protocol";
const A2A_INTENT_URI: &str = "https://help.aliyun.com/zh/model-studio/multimodal-integration-a2a-intent";

fn image_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "image_base64": {
                "type": "string",
                "description": "Base64编码的图片数据，用于情绪分析"
            }
        },
        "required": ["image_base64"]
    })
}

/// The compact card served at `/agentCard`.
pub fn agent_card(public_url: &str) -> Value {
    json!({
        "name": "emotion_analysis_agent",
        "description": "情绪分析智能代理，能够分析图片中人脸的情绪状态",
        "version": "1.0.0",
        "author": "Emotion Analysis Team",
        "capabilities": {
            "extensions": [{
                "uri": A2A_INTENT_URI,
                "params": {
                    "skills": [{"id": EMOTION_INTENT, "inputSchema": image_input_schema()}]
                }
            }]
        },
        "services": [{
            "id": "emotion-mcp-service",
            "name": "情绪分析MCP服务",
            "description": "提供情绪分析能力的MCP服务",
            "endpoint": public_url,
            "type": "mcp"
        }],
        "metadata": {
            "category": "image-processing",
            "tags": ["emotion-detection", "ai", "image-analysis", "multimodal"]
        }
    })
}

/// The full agent document served at `/.well-known/agent.json`.
pub fn agent_document(public_url: &str) -> Value {
    json!({
        "agentCard": {
            "skills": [{
                "examples": ["示例: 分析这张图片中人脸的情绪"],
                "name": "情绪分析",
                "description": "分析图片中人脸的情绪状态",
                "id": EMOTION_INTENT,
                "tags": ["emotion", "image-analysis", "ai"]
            }],
            "security": [],
            "capabilities": {
                "extensions": [
                    {"uri": A2A_PROTOCOL_URI},
                    {
                        "params": {
                            "skills": [{"inputSchema": image_input_schema(), "id": EMOTION_INTENT}]
                        },
                        "uri": A2A_INTENT_URI
                    }
                ],
                "streaming": false
            },
            "defaultOutputModes": ["text/plain"],
            "name": "情绪分析AI助手",
            "description": "可以分析图片中人脸的情绪状态，支持悲伤、厌恶、生气、中性、恐惧、惊讶、高兴等情绪识别",
            "protocolVersion": "0.2.5",
            "version": "1.0.0",
            "defaultInputModes": ["text/plain"],
            "url": public_url
        },
        "skillValidation": [{
            "valid": true,
            "id": EMOTION_INTENT,
            "supportExtension": true
        }],
        "agentValidation": {
            "valid": true,
            "extensionTags": {
                A2A_PROTOCOL_URI: "protocol",
                A2A_INTENT_URI: "intent"
            },
            "supportExtension": true
        }
    })
}

/// Reads a card JSON file. The error text is returned to clients as is.
pub fn load_card(path: &Path) -> Result<Value, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("读取AgentCard文件时出错: {}", e))?;
    serde_json::from_str(&raw).map_err(|e| format!("读取AgentCard文件时出错: {}", e))
}
