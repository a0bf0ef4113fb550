mod app;
mod cli;
mod config;
mod http;
mod logging;
mod notify;
mod paths;
mod seen;
mod twitch;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init_logging(cli.log_format)?;
    app::run(cli)
}
