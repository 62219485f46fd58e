//! Subcommands.

mod ask;
mod bridge;
mod classify;
mod services;

pub use ask::AskCommand;
pub use bridge::{BridgeCommand, GatewayCommand};
pub use classify::ClassifyCommand;
pub use services::{ChatCommand, EmotionCommand, IntentCommand};

use std::sync::Arc;

use dhagent_emotion::{EmotionDetector, UltraFace};
use tracing::info;

use crate::config::EmotionFiles;

/// Loads the emotion model, with the face gate when a face model is configured.
pub(crate) fn load_detector(files: &EmotionFiles) -> anyhow::Result<Arc<EmotionDetector>> {
    let model = files
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("emotion model path is required (--model or emotion.model)"))?;
    let mut detector = EmotionDetector::from_files(model, files.preprocessor_config.as_deref())?;
    if let Some(face) = &files.face_model {
        detector = detector.with_face_detector(UltraFace::from_file(face)?);
        info!("face gate: {}", face.display());
    }
    info!("emotion model: {}", model.display());
    Ok(Arc::new(detector))
}
