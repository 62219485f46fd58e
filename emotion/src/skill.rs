//! The emotion-analysis skill exposed to agents over HTTP.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::error;

use crate::detector::{ANALYSIS_PREFIX, EmotionDetector, decode_base64_image};
use crate::error::Result;
use crate::text::clean_multimodal_text;

pub const SKILL_NAME: &str = "emotion_analysis";
pub const NO_FACE_TEXT: &str = "图片中未检测到人脸，无法进行情绪分析";
pub const MISSING_IMAGE_TEXT: &str = "缺少必需参数: image_base64";

/// Produces the user-facing emotion result for an image.
pub trait EmotionAnalyzer: Send + Sync {
    /// `情绪分析：...`, or [`NO_FACE_TEXT`] when the image has no face.
    fn emotion_result(&self, image_base64: &str) -> Result<String>;
}

impl EmotionAnalyzer for EmotionDetector {
    fn emotion_result(&self, image_base64: &str) -> Result<String> {
        let image = decode_base64_image(image_base64)?;
        if !self.has_face(&image)? {
            return Ok(NO_FACE_TEXT.to_string());
        }
        let text = clean_multimodal_text(&self.predict(&image)?.analysis_text());
        Ok(format!("{ANALYSIS_PREFIX}{text}"))
    }
}

#[derive(Clone)]
pub struct EmotionSkill {
    analyzer: Arc<dyn EmotionAnalyzer>,
}

impl EmotionSkill {
    pub fn new(analyzer: Arc<dyn EmotionAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub fn manifest() -> Value {
        json!({
            "name": SKILL_NAME,
            "description": "分析图片中的人脸情绪",
            "parameters": {
                "type": "object",
                "properties": {
                    "image_base64": {
                        "type": "string",
                        "description": "base64编码的图片数据"
                    }
                },
                "required": ["image_base64"]
            }
        })
    }

    /// Runs the skill on `{"image_base64": ...}`.
    pub fn call(&self, params: &Value) -> Value {
        let image = params["image_base64"].as_str().unwrap_or_default();
        if image.is_empty() {
            return json!({"success": false, "error": MISSING_IMAGE_TEXT, "result": null});
        }
        match self.analyzer.emotion_result(image) {
            Ok(result) => json!({
                "success": true,
                "result": result,
                "metadata": {
                    "skill": SKILL_NAME,
                    "input_type": "image",
                    "output_type": "text"
                }
            }),
            Err(e) => {
                error!("emotion skill failed: {}", e);
                json!({"success": false, "error": e.to_string(), "result": null})
            }
        }
    }
}
