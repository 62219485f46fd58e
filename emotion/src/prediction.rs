use serde::Serialize;

use crate::error::{EmotionError, Result};
use crate::labels::Emotion;

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Index of the largest value. Ties go to the first.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// A classified image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub emotion: Emotion,
    pub confidence: f32,
    /// Per-class probabilities in [`Emotion::ALL`] order.
    pub probabilities: Vec<f32>,
}

impl Prediction {
    pub fn from_logits(logits: &[f32]) -> Result<Self> {
        if logits.len() != Emotion::COUNT {
            return Err(EmotionError::OutputShape {
                expected: Emotion::COUNT,
                got: logits.len(),
            });
        }
        let probabilities = softmax(logits);
        let best = argmax(&probabilities).unwrap_or(0);
        Ok(Self {
            emotion: Emotion::ALL[best],
            confidence: probabilities[best],
            probabilities,
        })
    }

    /// `高兴（置信度：0.912）`
    pub fn analysis_text(&self) -> String {
        format!("{}（置信度：{:.3}）", self.emotion.cn(), self.confidence)
    }

    /// `(label, probability)` pairs in class order.
    pub fn details(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().copied().zip(self.probabilities.iter().copied())
    }
}
