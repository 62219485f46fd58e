//! ViT image preprocessing.
//!
//! Mirrors the HuggingFace `ViTImageProcessor` pipeline the model was
//! exported with: RGB, resize to 224x224, HWC to CHW, rescale, normalize.

use std::path::Path;

use image::DynamicImage;
use image::imageops::FilterType;
use ndarray::Array4;
use serde::Deserialize;

use crate::error::Result;

pub const INPUT_SIZE: u32 = 224;

/// Preprocessing parameters, loadable from `preprocessor_config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    pub image_mean: [f32; 3],
    pub image_std: [f32; 3],
    pub do_normalize: bool,
    pub do_rescale: bool,
    pub rescale_factor: f32,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            image_mean: [0.5; 3],
            image_std: [0.5; 3],
            do_normalize: true,
            do_rescale: true,
            rescale_factor: 1.0 / 255.0,
        }
    }
}

impl PreprocessorConfig {
    /// Reads a HuggingFace preprocessor config. Unknown keys are ignored,
    /// missing ones take the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn from_file_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            _ => Ok(Self::default()),
        }
    }
}

/// Converts an image into a `[1, 3, 224, 224]` float tensor.
pub fn preprocess(image: &DynamicImage, config: &PreprocessorConfig) -> Array4<f32> {
    let size = INPUT_SIZE as usize;
    let rgb = image::imageops::resize(
        &image.to_rgb8(),
        INPUT_SIZE,
        INPUT_SIZE,
        FilterType::CatmullRom,
    );

    let mut out = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let mut v = pixel[c] as f32;
            if config.do_rescale {
                v *= config.rescale_factor;
            }
            if config.do_normalize {
                v = (v - config.image_mean[c]) / config.image_std[c];
            }
            out[[0, c, y as usize, x as usize]] = v;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_default_config() {
        let c = PreprocessorConfig::default();
        assert_eq!(c.image_mean, [0.5; 3]);
        assert!((c.rescale_factor - 0.003_921_568_6).abs() < 1e-9);
    }

    #[test]
    fn test_config_from_json_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor_config.json");
        std::fs::write(
            &path,
            r#"{"image_processor_type": "ViTImageProcessor", "image_mean": [0.4, 0.5, 0.6], "do_normalize": false}"#,
        )
        .unwrap();
        let c = PreprocessorConfig::from_file(&path).unwrap();
        assert_eq!(c.image_mean, [0.4, 0.5, 0.6]);
        assert_eq!(c.image_std, [0.5; 3]);
        assert!(!c.do_normalize);
        assert!(c.do_rescale);

        let missing = PreprocessorConfig::from_file_or_default(Some(&dir.path().join("nope.json")));
        assert_eq!(missing.unwrap(), PreprocessorConfig::default());
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 30, Rgb([255, 255, 255])));
        let t = preprocess(&white, &PreprocessorConfig::default());
        assert_eq!(t.shape(), &[1, 3, 224, 224]);
        assert!(t.iter().all(|v| (v - 1.0).abs() < 1e-5));

        let black = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let t = preprocess(&black, &PreprocessorConfig::default());
        assert!(t.iter().all(|v| (v + 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_preprocess_channel_order() {
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));
        let t = preprocess(&red, &PreprocessorConfig::default());
        assert!((t[[0, 0, 100, 100]] - 1.0).abs() < 1e-5);
        assert!((t[[0, 1, 100, 100]] + 1.0).abs() < 1e-5);
        assert!((t[[0, 2, 100, 100]] + 1.0).abs() < 1e-5);
    }
}
