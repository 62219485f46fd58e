//! Face presence gating.
//!
//! Emotion is only reported for images that contain a face. [`AcceptAll`]
//! skips the check; [`UltraFace`] runs the Ultra-Light-Fast RFB-320 detector.

use std::path::Path;

use image::DynamicImage;
use image::imageops::FilterType;
use ndarray::Array4;

use crate::error::Result;
use crate::model::OnnxSession;

pub trait FaceDetector: Send + Sync {
    /// Reports whether at least one face is present.
    fn has_face(&self, image: &DynamicImage) -> Result<bool>;
}

/// Treats every image as containing a face.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl FaceDetector for AcceptAll {
    fn has_face(&self, _image: &DynamicImage) -> Result<bool> {
        Ok(true)
    }
}

pub const ULTRAFACE_WIDTH: u32 = 320;
pub const ULTRAFACE_HEIGHT: u32 = 240;
pub const DEFAULT_FACE_THRESHOLD: f32 = 0.7;

/// Ultra-Light-Fast-Generic-Face-Detector (`version-RFB-320.onnx`).
///
/// Input `[1, 3, 240, 320]` normalized as `(px - 127) / 128`; output 0 is
/// `scores [1, N, 2]` with the face probability in column 1.
pub struct UltraFace {
    session: OnnxSession,
    threshold: f32,
}

impl UltraFace {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            session: OnnxSession::from_file(path.as_ref())?,
            threshold: DEFAULT_FACE_THRESHOLD,
        })
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl FaceDetector for UltraFace {
    fn has_face(&self, image: &DynamicImage) -> Result<bool> {
        let scores = self.session.run(ultraface_input(image), 0)?;
        Ok(any_face(&scores, self.threshold))
    }
}

pub(crate) fn ultraface_input(image: &DynamicImage) -> Array4<f32> {
    let rgb = image::imageops::resize(
        &image.to_rgb8(),
        ULTRAFACE_WIDTH,
        ULTRAFACE_HEIGHT,
        FilterType::Triangle,
    );
    let mut out = Array4::<f32>::zeros((1, 3, ULTRAFACE_HEIGHT as usize, ULTRAFACE_WIDTH as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            out[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - 127.0) / 128.0;
        }
    }
    out
}

/// Scans `[background, face]` score pairs.
pub(crate) fn any_face(scores: &[f32], threshold: f32) -> bool {
    scores.chunks_exact(2).any(|pair| pair[1] > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_accept_all() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        assert!(AcceptAll.has_face(&img).unwrap());
    }

    #[test]
    fn test_any_face() {
        assert!(!any_face(&[0.9, 0.1, 0.8, 0.2], 0.7));
        assert!(any_face(&[0.9, 0.1, 0.2, 0.8], 0.7));
        assert!(!any_face(&[], 0.7));
    }

    #[test]
    fn test_ultraface_input() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(64, 48));
        let t = ultraface_input(&img);
        assert_eq!(t.shape(), &[1, 3, 240, 320]);
        assert!((t[[0, 0, 0, 0]] + 127.0 / 128.0).abs() < 1e-6);
    }
}
