use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod capture;
mod concat;
mod export;

pub use capture::CaptureCommand;
pub use concat::ConcatCommand;
pub use export::ExportCommand;

use crate::config::AppConfig;
use crate::queue::RedisQueue;

#[derive(Parser, Debug)]
#[command(name = "vidcapture")]
#[command(about = "Bounded camera capture with thumbnail extraction and clip concatenation")]
pub struct Args {
    /// Path to the JSON configuration file
    #[arg(long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// Default log level; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture a bounded segment from a camera and store its artifacts
    Capture(CaptureCommand),
    /// Join every stored clip under a key into one file
    Concat(ConcatCommand),
    /// Write every stored artifact to numbered files
    Export(ExportCommand),
}

impl Args {
    pub fn run(self) -> Result<()> {
        let _ = tracing_subscriber::fmt::fmt()
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(self.log_level.into())
                    .from_env_lossy(),
            )
            .try_init();

        let config = AppConfig::load(&self.config)?;
        ffmpeg_next::util::log::set_level(config.ffmpeg_log_level.to_ffmpeg());

        let queue = RedisQueue::new(&config.redis)?;

        match self.command {
            Command::Capture(cmd) => cmd.run(&config, &queue),
            Command::Concat(cmd) => cmd.run(&config, &queue),
            Command::Export(cmd) => cmd.run(&config, &queue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_takes_url_and_seconds() {
        let args = Args::try_parse_from([
            "vidcapture",
            "capture",
            "rtsp://admin:pw@10.0.0.2:554/live",
            "30",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("config.json"));
        match args.command {
            Command::Capture(cmd) => {
                assert_eq!(cmd.url, "rtsp://admin:pw@10.0.0.2:554/live");
                assert_eq!(cmd.seconds, 30);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let args = Args::try_parse_from([
            "vidcapture",
            "export",
            "--dir",
            "/tmp/out",
            "--config",
            "/etc/vidcapture.json",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("/etc/vidcapture.json"));
        assert_eq!(args.log_level, LevelFilter::DEBUG);
        assert!(matches!(
            args.command,
            Command::Export(cmd) if cmd.dir == PathBuf::from("/tmp/out")
        ));
    }

    #[test]
    fn a_subcommand_is_required() {
        assert!(Args::try_parse_from(["vidcapture"]).is_err());
    }
}
