use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::notify::DiscordWebhook;
use crate::seen::SeenClips;
use crate::twitch::{Clip, TwitchClient, TwitchError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PollReport {
    pub(crate) fetched: usize,
    pub(crate) new: usize,
    pub(crate) delivered: usize,
}

#[derive(Debug)]
pub(crate) struct ClipWatcher {
    channel: String,
    broadcaster_id: String,
    lookback: TimeDelta,
    interval: Duration,
    notify_delay: Duration,
    twitch: TwitchClient,
    webhook: DiscordWebhook,
    seen: SeenClips,
}

impl ClipWatcher {
    pub(crate) fn connect(config: &Config) -> Result<Self> {
        let policy = config.http.retry_policy();
        let mut twitch = TwitchClient::new(&config.twitch, policy.clone());
        twitch
            .authenticate()
            .context("failed to obtain initial Twitch access token")?;

        let login = config.twitch.login();
        let broadcaster_id = twitch
            .resolve_broadcaster_id(&login)
            .with_context(|| format!("failed to resolve broadcaster id for `{login}`"))?;
        info!(channel = %login, broadcaster_id = %broadcaster_id, "resolved broadcaster");

        Ok(Self {
            channel: config.twitch.channel.trim().to_string(),
            broadcaster_id,
            lookback: config.lookback(),
            interval: config.interval(),
            notify_delay: config.notify_delay(),
            twitch,
            webhook: DiscordWebhook::new(&config.discord, policy),
            seen: SeenClips::new(),
        })
    }

    pub(crate) fn broadcaster_id(&self) -> &str {
        &self.broadcaster_id
    }

    pub(crate) fn recent_clips(&mut self, now: DateTime<Utc>) -> Result<Vec<Clip>, TwitchError> {
        let started_at = now.checked_sub_signed(self.lookback).unwrap_or(now);
        self.twitch.clips_since(&self.broadcaster_id, started_at)
    }

    // A failed fetch primes nothing.
    pub(crate) fn prime(&mut self, now: DateTime<Utc>) -> usize {
        info!(
            lookback_minutes = self.lookback.num_minutes(),
            "priming known clips from the lookback window"
        );
        match self.recent_clips(now) {
            Ok(clips) => {
                let primed = self.seen.prime(&clips);
                info!(primed, "primed known clips, monitoring for new ones");
                primed
            }
            Err(err) => {
                warn!(error = %err, "initial clip scan failed, starting with an empty seen-set");
                0
            }
        }
    }

    pub(crate) fn poll_once(&mut self, now: DateTime<Utc>) -> Result<PollReport, TwitchError> {
        info!(channel = %self.channel, "checking for new clips");
        let clips = self.recent_clips(now)?;
        let fresh = self
            .seen
            .unseen(&clips)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        let mut report = PollReport {
            fetched: clips.len(),
            new: fresh.len(),
            delivered: 0,
        };
        if fresh.is_empty() {
            info!(fetched = report.fetched, "no new clips");
            return Ok(report);
        }

        for (index, clip) in fresh.iter().enumerate() {
            if index > 0 && !self.notify_delay.is_zero() {
                thread::sleep(self.notify_delay);
            }
            info!(clip_id = %clip.id, title = %clip.title, url = %clip.url, "new clip found");
            match self.webhook.announce_clip(&self.channel, clip) {
                Ok(()) => {
                    report.delivered += 1;
                    info!(clip_id = %clip.id, "posted clip to Discord");
                }
                Err(err) => {
                    error!(clip_id = %clip.id, error = %err, "failed to post clip to Discord");
                }
            }
            // Marked even on failure: a clip is announced at most once.
            self.seen.insert(&clip.id);
        }

        info!(
            new = report.new,
            delivered = report.delivered,
            known = self.seen.len(),
            "poll cycle finished"
        );
        Ok(report)
    }

    pub(crate) fn run(&mut self) -> Result<()> {
        self.prime(Utc::now());

        loop {
            info!(
                interval_secs = self.interval.as_secs(),
                "waiting before next check"
            );
            thread::sleep(self.interval);

            if let Err(err) = self.poll_once(Utc::now()) {
                error!(error = %err, "poll cycle failed");
            }
        }
    }
}
