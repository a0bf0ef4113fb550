mod watch;


use anyhow::{Context, Result};
use chrono::{Local, Utc};
use tracing::info;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::notify::{DiscordWebhook, format_test_message};

use self::watch::ClipWatcher;

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Check) => run_check(&config)?,
        Some(Command::Recent) => run_recent(&config)?,
        Some(Command::TestWebhook) => run_test_webhook(&config)?,
        Some(Command::Watch) | None => run_watch(&config)?,
    }

    Ok(())
}

fn run_watch(config: &Config) -> Result<()> {
    info!(
        channel = %config.twitch.login(),
        interval_secs = config.poll.interval_secs,
        lookback_minutes = config.poll.lookback_minutes,
        "starting Twitch clip monitor"
    );
    let mut watcher = ClipWatcher::connect(config)?;
    watcher.run()
}

fn run_check(config: &Config) -> Result<()> {
    let watcher = ClipWatcher::connect(config)?;
    println!("Config OK.");
    println!("  Channel: {}", config.twitch.login());
    println!("  Broadcaster ID: {}", watcher.broadcaster_id());
    println!(
        "  Polling every {}s, looking back {} minute(s)",
        config.poll.interval_secs, config.poll.lookback_minutes
    );
    Ok(())
}

fn run_recent(config: &Config) -> Result<()> {
    let mut watcher = ClipWatcher::connect(config)?;
    let clips = watcher
        .recent_clips(Utc::now())
        .context("failed to fetch recent clips")?;
    if clips.is_empty() {
        println!(
            "No clips in the last {} minute(s).",
            config.poll.lookback_minutes
        );
        return Ok(());
    }

    println!(
        "{:<20} {:<40} {:<20} {:<28}",
        "CREATED", "TITLE", "CREATOR", "URL"
    );
    for clip in clips {
        println!(
            "{:<20} {:<40} {:<20} {:<28}",
            clip.created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            truncate(&clip.title, 40),
            truncate(&clip.creator_name, 20),
            clip.url
        );
    }
    Ok(())
}

fn run_test_webhook(config: &Config) -> Result<()> {
    let webhook = DiscordWebhook::new(&config.discord, config.http.retry_policy());
    webhook
        .post_message(&format_test_message(config.twitch.channel.trim()))
        .context("failed to post test message to Discord")?;
    println!("Test message posted.");
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}
