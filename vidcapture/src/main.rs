use anyhow::Result;
use clap::Parser;

use vidcapture::cli::Args;

fn main() -> Result<()> {
    Args::parse().run()
}
