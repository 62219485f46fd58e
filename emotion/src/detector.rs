use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use tracing::{debug, error};

use crate::error::Result;
use crate::face::{AcceptAll, FaceDetector};
use crate::model::{EmotionModel, OnnxEmotionModel};
use crate::prediction::Prediction;
use crate::preprocess::{PreprocessorConfig, preprocess};
use crate::text::clean_multimodal_text;

/// Prefix put in front of analysis text handed to the dialog model.
pub const ANALYSIS_PREFIX: &str = "情绪分析：";

/// Reported when the model fails on an image that has a face.
pub const DETECTION_FAILED_TEXT: &str = "情绪检测失败";

/// Decodes a base64 (or `data:image/...;base64,`) image.
pub fn decode_base64_image(image_base64: &str) -> Result<DynamicImage> {
    let payload = match image_base64.split_once(";base64,") {
        Some((head, payload)) if head.starts_with("data:") => payload,
        _ => image_base64,
    };
    let bytes = STANDARD.decode(payload.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Facial emotion classifier with an optional face gate.
pub struct EmotionDetector {
    model: Box<dyn EmotionModel>,
    config: PreprocessorConfig,
    faces: Box<dyn FaceDetector>,
}

impl EmotionDetector {
    pub fn new(model: impl EmotionModel + 'static, config: PreprocessorConfig) -> Self {
        Self {
            model: Box::new(model),
            config,
            faces: Box::new(AcceptAll),
        }
    }

    /// Loads the ONNX model and, when present, its `preprocessor_config.json`.
    pub fn from_files(model_path: impl AsRef<Path>, config_path: Option<&Path>) -> Result<Self> {
        let config = PreprocessorConfig::from_file_or_default(config_path)?;
        Ok(Self::new(OnnxEmotionModel::from_file(model_path)?, config))
    }

    pub fn with_face_detector(mut self, faces: impl FaceDetector + 'static) -> Self {
        self.faces = Box::new(faces);
        self
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    pub fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
        let logits = self.model.logits(preprocess(image, &self.config))?;
        let prediction = Prediction::from_logits(&logits)?;
        debug!(
            "predicted {} ({:.3})",
            prediction.emotion, prediction.confidence
        );
        Ok(prediction)
    }

    pub fn predict_bytes(&self, data: &[u8]) -> Result<Prediction> {
        self.predict(&image::load_from_memory(data)?)
    }

    pub fn predict_path(&self, path: impl AsRef<Path>) -> Result<Prediction> {
        self.predict(&image::open(path)?)
    }

    pub fn predict_base64(&self, image_base64: &str) -> Result<Prediction> {
        self.predict(&decode_base64_image(image_base64)?)
    }

    pub fn has_face(&self, image: &DynamicImage) -> Result<bool> {
        self.faces.has_face(image)
    }

    pub fn has_face_base64(&self, image_base64: &str) -> Result<bool> {
        self.has_face(&decode_base64_image(image_base64)?)
    }

    /// `高兴（置信度：0.912）`, or an empty string when no face is found.
    pub fn analysis_text_base64(&self, image_base64: &str) -> Result<String> {
        let image = decode_base64_image(image_base64)?;
        if !self.has_face(&image)? {
            return Ok(String::new());
        }
        Ok(self.predict(&image)?.analysis_text())
    }

    /// Cleaned analysis text for prompts.
    ///
    /// `""` when the image cannot be decoded or holds no face;
    /// [`DETECTION_FAILED_TEXT`] when the model fails on a face image.
    pub fn detect_emotion(&self, image_base64: &str, include_prefix: bool) -> String {
        let face = decode_base64_image(image_base64)
            .and_then(|image| self.has_face(&image).map(|found| (image, found)));
        let text = match face {
            Ok((image, true)) => match self.predict(&image) {
                Ok(p) => clean_multimodal_text(&p.analysis_text()),
                Err(e) => {
                    error!("emotion detection failed: {}", e);
                    DETECTION_FAILED_TEXT.to_string()
                }
            },
            Ok((_, false)) => return String::new(),
            Err(e) => {
                error!("emotion detection failed: {}", e);
                return String::new();
            }
        };
        if include_prefix && !text.is_empty() {
            format!("{ANALYSIS_PREFIX}{text}")
        } else {
            text
        }
    }
}
