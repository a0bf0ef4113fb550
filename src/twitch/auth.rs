use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

use super::TwitchError;
use super::types::TokenResponse;
use crate::http::{Request, RetryPolicy, send_with_retries};

const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + TimeDelta::seconds(EXPIRY_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

/// Single app access token slot, filled lazily via the client-credentials grant.
#[derive(Debug)]
pub(crate) struct TokenManager {
    auth_url: String,
    credentials: Credentials,
    policy: RetryPolicy,
    slot: Option<AccessToken>,
}

impl TokenManager {
    pub(crate) fn new(auth_url: String, credentials: Credentials, policy: RetryPolicy) -> Self {
        Self {
            auth_url,
            credentials,
            policy,
            slot: None,
        }
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    pub(crate) fn token(&mut self) -> Result<String, TwitchError> {
        self.token_at(Utc::now())
    }

    pub(crate) fn token_at(&mut self, now: DateTime<Utc>) -> Result<String, TwitchError> {
        if let Some(token) = &self.slot
            && token.is_usable_at(now)
        {
            return Ok(token.value.clone());
        }

        let token = self.exchange(now)?;
        let value = token.value.clone();
        self.slot = Some(token);
        Ok(value)
    }

    pub(crate) fn invalidate(&mut self) {
        self.slot = None;
    }

    fn exchange(&self, now: DateTime<Utc>) -> Result<AccessToken, TwitchError> {
        let request = Request::post(&self.auth_url)
            .query("client_id", self.credentials.client_id.as_str())
            .query("client_secret", self.credentials.client_secret.as_str())
            .query("grant_type", "client_credentials");
        let raw = send_with_retries(&request, &self.policy)?;
        let parsed: TokenResponse =
            serde_json::from_str(&raw).map_err(TwitchError::decode("access token"))?;

        let expires_at = parsed
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(TimeDelta::try_seconds)
            .map(|lifetime| now + lifetime);
        info!(
            expires_at = expires_at.map(|at| at.to_rfc3339()).as_deref(),
            "obtained Twitch app access token"
        );
        Ok(AccessToken {
            value: parsed.access_token,
            expires_at,
        })
    }
}
