//! Result output for CLI commands.

use std::path::Path;

use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Where and how a command prints its result.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub format: OutputFormat,
    pub file: Option<String>,
}

impl Output {
    pub fn new(format: OutputFormat, file: Option<String>) -> Self {
        Self { format, file }
    }

    /// Renders a value in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        Ok(match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        })
    }

    /// Writes the value to the output file, or stdout when none is set.
    pub fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let rendered = self.render(value)?;
        match &self.file {
            Some(path) => std::fs::write(path, rendered)?,
            None => println!("{}", rendered),
        }
        Ok(())
    }
}

/// Writes binary data (e.g. a WAV file) to `path`.
pub fn write_binary(data: &[u8], path: impl AsRef<Path>) -> anyhow::Result<()> {
    std::fs::write(path, data)?;
    Ok(())
}

/// Maps an audio response format to a file extension.
pub fn guess_extension(format: &str) -> &'static str {
    match format.to_lowercase().as_str() {
        "mp3" => "mp3",
        "wav" => "wav",
        "pcm" => "pcm",
        "opus" => "opus",
        "png" => "png",
        "jpg" | "jpeg" => "jpg",
        _ => "bin",
    }
}
