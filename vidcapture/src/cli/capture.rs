use anyhow::{Result, bail};
use clap::Parser;

use crate::capture::CaptureSession;
use crate::config::AppConfig;
use crate::queue::BlobQueue;

#[derive(Parser, Debug)]
pub struct CaptureCommand {
    /// Input URL or path (rtsp://, file, ...)
    pub url: String,

    /// Capture length in seconds
    #[arg(allow_negative_numbers = true)]
    pub seconds: i64,
}

impl CaptureCommand {
    pub fn run(self, config: &AppConfig, queue: &dyn BlobQueue) -> Result<()> {
        let mut session = CaptureSession::new(queue, &config.keys, &config.capture);
        let report = session.run(&self.url, self.seconds)?;

        println!(
            "Captured {:.1}s (bound {:.1}s)",
            report.elapsed.as_secs_f64(),
            report.bound.as_secs_f64()
        );
        println!(
            "  {}: {} bytes, {} video / {} audio packets",
            config.capture.av_format,
            report.av_bytes,
            report.mux.video_packets,
            report.mux.encoded_audio_packets
        );
        println!(
            "  {}: {} bytes, {} packets",
            config.capture.audio_format, report.audio_bytes, report.mux.copied_audio_packets
        );
        match report.thumbnail_bytes {
            Some(bytes) => println!("  thumbnail: {bytes} bytes"),
            None => println!("  thumbnail: none"),
        }

        for outcome in &report.persisted {
            match &outcome.error {
                None => println!("  stored {} bytes under {}", outcome.bytes, outcome.key),
                Some(e) => println!("  FAILED to store under {}: {e}", outcome.key),
            }
        }

        if !report.fully_persisted() {
            bail!("some artifacts were not stored");
        }
        Ok(())
    }
}
