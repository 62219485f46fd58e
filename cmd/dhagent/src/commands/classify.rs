//! Folder batch classification.

use std::path::PathBuf;

use clap::Args;

use dhagent_emotion::{DEFAULT_REPORT_FILE, predict_folder};

use super::load_detector;
use super::services::ModelArgs;
use crate::Cli;
use crate::config::ServerConfig;

/// Classify every image in FOLDER and write a text report inside it.
#[derive(Args)]
pub struct ClassifyCommand {
    /// Folder of images
    folder: PathBuf,
    #[command(flatten)]
    models: ModelArgs,
    /// Report file name, written inside FOLDER
    #[arg(long, default_value = DEFAULT_REPORT_FILE)]
    report: String,
}

impl ClassifyCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = ServerConfig::load(cli.config.as_deref())?;
        let detector = load_detector(&self.models.merge(cfg.emotion))?;
        let folder = self.folder.clone();
        let report = self.report.clone();
        let result =
            tokio::task::spawn_blocking(move || predict_folder(&detector, &folder, &report))
                .await??;
        println!(
            "{} images, {} failed, report: {}",
            result.total,
            result.failed,
            result.path.display()
        );
        Ok(())
    }
}
