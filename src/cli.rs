use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

#[derive(Debug, Parser)]
#[command(
    name = "clipcast",
    version,
    about = "Watch a Twitch channel for new clips and post them to a Discord webhook"
)]
pub struct Cli {
    /// Config file (defaults to <config dir>/clipcast/config.toml)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll for new clips forever (default)
    Watch,
    /// Validate config and credentials, then print the broadcaster id
    Check,
    /// List clips in the lookback window
    Recent,
    /// Post a test message to the webhook
    TestWebhook,
}
