//! prewarm - opcache preload script generator
//!
//! prewarm provides:
//! - Rule-based source file discovery (include/exclude paths, regex
//!   exclusions, extension whitelist)
//! - Deterministic preload script generation (require / precompile)
//! - composer.json "extra.preload" configuration loading

use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod core;
mod error;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::run(cli)
}
