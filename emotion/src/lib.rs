//! Facial emotion classification.
//!
//! The pipeline:
//!
//! 1. [`preprocess`]: image -> `[1, 3, 224, 224]` ViT input
//! 2. [`EmotionModel::logits`]: input -> 7 logits (ONNX Runtime)
//! 3. [`Prediction::from_logits`]: softmax + argmax -> [`Emotion`]
//!
//! [`EmotionDetector`] ties these together with a [`FaceDetector`] gate,
//! and [`EmotionSkill`] wraps the detector in the agent skill JSON shape.
//!
//! ```rust,ignore
//! use dhagent_emotion::EmotionDetector;
//!
//! let detector = EmotionDetector::from_files("emotion_model.onnx", None)?;
//! let text = detector.detect_emotion(&image_base64, true);
//! ```

mod detector;
mod error;
mod face;
mod labels;
mod model;
mod prediction;
mod preprocess;
pub mod report;
mod skill;
mod text;

pub use detector::{ANALYSIS_PREFIX, DETECTION_FAILED_TEXT, EmotionDetector, decode_base64_image};
pub use error::{EmotionError, Result};
pub use face::{AcceptAll, DEFAULT_FACE_THRESHOLD, FaceDetector, UltraFace};
pub use labels::Emotion;
pub use model::{EmotionModel, OnnxEmotionModel};
pub use prediction::{Prediction, argmax, softmax};
pub use preprocess::{INPUT_SIZE, PreprocessorConfig, preprocess};
pub use report::{DEFAULT_REPORT_FILE, FolderReport, predict_folder};
pub use skill::{EmotionAnalyzer, EmotionSkill, MISSING_IMAGE_TEXT, NO_FACE_TEXT, SKILL_NAME};
pub use text::clean_multimodal_text;
