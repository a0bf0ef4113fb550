use serde_json::json;

use crate::config::DiscordConfig;
use crate::http::{HttpError, Request, RetryPolicy, send_with_retries};
use crate::twitch::Clip;

pub(crate) fn format_clip_message(channel: &str, clip: &Clip) -> String {
    format!(
        "🎬 New clip from **{channel}**!\n**{}**\n{}",
        clip.title.trim(),
        clip.url
    )
}

pub(crate) fn format_test_message(channel: &str) -> String {
    format!("✅ clipcast is set up to announce new clips from **{channel}**.")
}

#[derive(Debug, Clone)]
pub(crate) struct DiscordWebhook {
    url: String,
    username: Option<String>,
    policy: RetryPolicy,
}

impl DiscordWebhook {
    pub(crate) fn new(config: &DiscordConfig, policy: RetryPolicy) -> Self {
        Self {
            url: config.webhook_url.trim().to_string(),
            username: config
                .username
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            policy,
        }
    }

    pub(crate) fn announce_clip(&self, channel: &str, clip: &Clip) -> Result<(), HttpError> {
        self.post_message(&format_clip_message(channel, clip))
    }

    pub(crate) fn post_message(&self, content: &str) -> Result<(), HttpError> {
        let mut payload = json!({ "content": content });
        if let Some(username) = &self.username {
            payload["username"] = json!(username);
        }
        let request = Request::post(&self.url)
            .secret_path()
            .json(payload.to_string());
        send_with_retries(&request, &self.policy)?;
        Ok(())
    }
}
