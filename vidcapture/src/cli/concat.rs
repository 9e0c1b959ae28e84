use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::concat::concatenate_key;
use crate::config::AppConfig;
use crate::queue::BlobQueue;

#[derive(Parser, Debug)]
pub struct ConcatCommand {
    /// Queue key to read clips from (defaults to the video key)
    #[arg(long)]
    pub key: Option<String>,

    /// Output file
    #[arg(short, long, default_value = "concat.mp4")]
    pub output: PathBuf,
}

impl ConcatCommand {
    pub fn run(self, config: &AppConfig, queue: &dyn BlobQueue) -> Result<()> {
        let key = self.key.as_deref().unwrap_or(&config.keys.video);
        let (bytes, report) = concatenate_key(queue, key, &config.capture.av_format)?;

        std::fs::write(&self.output, &bytes)
            .with_context(|| format!("failed to write {}", self.output.display()))?;

        println!(
            "Joined {} clip(s), {} packets -> {} ({} bytes)",
            report.clips,
            report.packets,
            self.output.display(),
            report.bytes
        );
        Ok(())
    }
}
