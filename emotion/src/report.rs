//! Folder batch classification with a plain-text report.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::detector::EmotionDetector;
use crate::error::{EmotionError, Result};
use crate::prediction::Prediction;

pub const DEFAULT_REPORT_FILE: &str = "emotion_results_onnx.txt";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif"];

#[derive(Debug, Clone, PartialEq)]
pub struct FolderReport {
    /// Where the report was written (inside the folder).
    pub path: PathBuf,
    pub total: usize,
    pub failed: usize,
}

/// Image files directly inside `folder`, sorted by name.
pub fn list_images(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Classifies every image in `folder` and writes `output_file` next to them.
pub fn predict_folder(
    detector: &EmotionDetector,
    folder: &Path,
    output_file: &str,
) -> Result<FolderReport> {
    let images = list_images(folder)?;
    if images.is_empty() {
        return Err(EmotionError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no images found in {}", folder.display()),
        )));
    }
    info!("found {} images in {}", images.len(), folder.display());

    let mut out = String::new();
    let _ = writeln!(out, "情绪识别结果 (ONNX版本)");
    let _ = writeln!(out, "文件夹: {}", folder.display());
    let _ = writeln!(out, "总共 {} 张图片", images.len());
    let _ = writeln!(out, "{}\n", "=".repeat(50));

    let mut failed = 0;
    for (i, path) in images.iter().enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "图片 {}: {}", i + 1, name);
        match detector.predict_path(path) {
            Ok(p) => write_prediction(&mut out, &p),
            Err(e) => {
                warn!("{}: {}", name, e);
                failed += 1;
                let _ = writeln!(out, "错误: 处理图片 {} 时出错: {}\n", name, e);
            }
        }
    }

    let path = folder.join(output_file);
    std::fs::write(&path, out)?;
    info!("report written to {}", path.display());
    Ok(FolderReport {
        path,
        total: images.len(),
        failed,
    })
}

fn write_prediction(out: &mut String, p: &Prediction) {
    let _ = writeln!(out, "情绪: {}", p.emotion);
    let _ = writeln!(
        out,
        "置信度: {:.3} ({:.1}%)",
        p.confidence,
        p.confidence * 100.0
    );
    let _ = writeln!(out, "各类别概率:");
    for (emotion, prob) in p.details() {
        let marker = if emotion == p.emotion { " >>> " } else { "     " };
        let _ = writeln!(
            out,
            "{}{:8}: {:.4} ({:.1}%)",
            marker,
            emotion.as_str(),
            prob,
            prob * 100.0
        );
    }
    out.push('\n');
}
