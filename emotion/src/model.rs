//! ONNX Runtime sessions.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tracing::info;

use crate::error::{EmotionError, Result};

/// Maps a preprocessed `[1, 3, 224, 224]` image to per-class logits.
///
/// Implementations must be safe for concurrent use.
pub trait EmotionModel: Send + Sync {
    fn logits(&self, input: Array4<f32>) -> Result<Vec<f32>>;
}

/// A single-input ONNX session. Inference takes the lock, so concurrent
/// callers are serialized.
pub(crate) struct OnnxSession {
    session: Mutex<Session>,
    input_name: String,
    output_names: Vec<String>,
}

impl OnnxSession {
    pub(crate) fn from_file(path: &Path) -> Result<Self> {
        let session = Session::builder()
            .map_err(EmotionError::model)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(EmotionError::model)?
            .commit_from_file(path)
            .map_err(EmotionError::model)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| EmotionError::Model(format!("{} has no inputs", path.display())))?;
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        if output_names.is_empty() {
            return Err(EmotionError::Model(format!("{} has no outputs", path.display())));
        }

        info!(
            "loaded {} (input {}, outputs {:?})",
            path.display(),
            input_name,
            output_names
        );
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_names,
        })
    }

    /// Runs the model and returns the flattened f32 data of output `index`.
    pub(crate) fn run(&self, input: Array4<f32>, index: usize) -> Result<Vec<f32>> {
        let output_name = self
            .output_names
            .get(index)
            .ok_or_else(|| EmotionError::Model(format!("no output #{index}")))?;
        let tensor = Tensor::from_array(input).map_err(EmotionError::model)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmotionError::Model("session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(EmotionError::model)?;
        let (_, data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(EmotionError::model)?;
        Ok(data.to_vec())
    }
}

/// The ViT facial emotion classifier exported to ONNX.
pub struct OnnxEmotionModel {
    session: OnnxSession,
}

impl OnnxEmotionModel {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            session: OnnxSession::from_file(path.as_ref())?,
        })
    }
}

impl EmotionModel for OnnxEmotionModel {
    fn logits(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        // Output 0 is [1, 7]; batch is always 1.
        self.session.run(input, 0)
    }
}
