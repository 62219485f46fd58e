//! Vision-language questions.

use std::path::Path;

use clap::Args;
use serde::Serialize;

use dhagent_audio::b64;
use dhagent_dashscope::{MODEL_QWEN3_VL_PLUS, MultiModalMessage, MultiModalRequest};

use super::{create_client, get_context, output, pick, print_verbose};
use crate::Cli;

/// Ask a vision-language model about an image.
#[derive(Args)]
pub struct VlCommand {
    /// Image file or http(s) URL
    #[arg(long)]
    image: String,
    /// Question about the image
    #[arg(long, default_value = "请描述这张图片")]
    prompt: String,
    #[arg(long)]
    model: Option<String>,
    /// Optional system prompt
    #[arg(long)]
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct VlResult {
    model: String,
    text: String,
}

/// MIME type by file extension; JPEG when unknown.
fn image_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "image/jpeg",
    }
}

/// URLs pass through; local files become `data:` URLs.
fn image_source(image: &str) -> anyhow::Result<String> {
    if image.starts_with("http://") || image.starts_with("https://") || image.starts_with("data:") {
        return Ok(image.to_string());
    }
    let path = Path::new(image);
    let data = std::fs::read(path)?;
    Ok(b64::data_url(image_mime(path), &data))
}

impl VlCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(&ctx)?;
        let model = pick(self.model.as_deref(), "", MODEL_QWEN3_VL_PLUS);

        let image = image_source(&self.image)?;
        print_verbose(cli, &format!("model: {}, image: {} chars", model, image.len()));

        let mut messages = Vec::new();
        if let Some(system) = &self.system {
            messages.push(MultiModalMessage::system(system));
        }
        messages.push(MultiModalMessage::user_image(image, &self.prompt));

        let text = client
            .multimodal()
            .text(&MultiModalRequest::new(&model, messages))
            .await?;
        output(cli).write(&VlResult { model, text })
    }
}
