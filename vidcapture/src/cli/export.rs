use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::AppConfig;
use crate::export::export_all;
use crate::queue::BlobQueue;

#[derive(Parser, Debug)]
pub struct ExportCommand {
    /// Directory to write output{i}.* files into
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

impl ExportCommand {
    pub fn run(self, config: &AppConfig, queue: &dyn BlobQueue) -> Result<()> {
        let written = export_all(queue, &config.keys, &config.capture, &self.dir)?;

        println!("Exported {} file(s) to {}", written.len(), self.dir.display());
        for path in &written {
            println!("  {}", path.display());
        }
        Ok(())
    }
}
