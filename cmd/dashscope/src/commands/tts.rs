//! Qwen TTS realtime synthesis.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use dhagent_audio::{Format, wav};
use dhagent_cli::{Paths, write_binary};
use dhagent_dashscope::TTS_SAMPLE_RATE;

use super::{create_client, get_context, output, pick, print_success, print_verbose};
use crate::Cli;

/// Synthesize speech and save it as a 24 kHz WAV file.
///
/// Without -o the file goes to ~/.dhagent/dashscope/output/tts.wav.
#[derive(Args)]
pub struct TtsCommand {
    /// Text to speak
    text: String,
    /// Voice (overrides the context default)
    #[arg(long)]
    voice: Option<String>,
}

#[derive(Debug, Serialize)]
struct TtsResult {
    file: String,
    bytes: usize,
    duration_ms: u128,
}

impl TtsCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(&ctx)?;
        let voice = pick(self.voice.as_deref(), &ctx.default_voice, "");
        print_verbose(cli, &format!("voice: {}", if voice.is_empty() { "(default)" } else { &voice }));

        let pcm = client.tts().synthesize(&self.text, &voice).await?;
        let format = Format::mono(TTS_SAMPLE_RATE);
        let file = wav::encode(format, &pcm);

        let path = match &cli.output {
            Some(p) => PathBuf::from(p),
            None => Paths::new("dashscope")?.output_path("tts.wav")?,
        };
        write_binary(&file, &path)?;
        print_success(&format!("wrote {}", path.display()));

        // The WAV went to -o; the summary goes to stdout.
        let summary = TtsResult {
            file: path.display().to_string(),
            bytes: file.len(),
            duration_ms: format.duration(pcm.len()).as_millis(),
        };
        let mut out = output(cli);
        out.file = None;
        out.write(&summary)
    }
}
