use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use super::TwitchError;
use super::auth::{Credentials, TokenManager};
use super::types::{Clip, ClipsPage, UsersPage};
use crate::config::TwitchConfig;
use crate::http::{HttpError, Request, RetryPolicy, send_with_retries};

#[derive(Debug)]
pub(crate) struct TwitchClient {
    api_base_url: String,
    tokens: TokenManager,
    policy: RetryPolicy,
    page_size: u32,
    max_pages: u32,
}

impl TwitchClient {
    pub(crate) fn new(config: &TwitchConfig, policy: RetryPolicy) -> Self {
        let credentials = Credentials {
            client_id: config.client_id.trim().to_string(),
            client_secret: config.client_secret.trim().to_string(),
        };
        Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens: TokenManager::new(config.auth_url.clone(), credentials, policy.clone()),
            policy,
            page_size: config.page_size,
            max_pages: config.max_pages.max(1),
        }
    }

    pub(crate) fn authenticate(&mut self) -> Result<(), TwitchError> {
        self.tokens.token().map(|_| ())
    }

    pub(crate) fn resolve_broadcaster_id(&mut self, login: &str) -> Result<String, TwitchError> {
        let raw = self.helix_get("users", &[("login", login.to_string())])?;
        let page: UsersPage = serde_json::from_str(&raw).map_err(TwitchError::decode("users"))?;
        page.data
            .into_iter()
            .next()
            .map(|user| user.id)
            .ok_or_else(|| TwitchError::UnknownChannel(login.to_string()))
    }

    pub(crate) fn clips_since(
        &mut self,
        broadcaster_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Vec<Clip>, TwitchError> {
        let started_at = started_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut clips = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=self.max_pages {
            let mut query = vec![
                ("broadcaster_id", broadcaster_id.to_string()),
                ("started_at", started_at.clone()),
                ("first", self.page_size.to_string()),
            ];
            if let Some(after) = &cursor {
                query.push(("after", after.clone()));
            }

            let raw = self.helix_get("clips", &query)?;
            let page: ClipsPage =
                serde_json::from_str(&raw).map_err(TwitchError::decode("clips"))?;
            debug!(page = page_number, count = page.data.len(), "fetched clips page");
            clips.extend(page.data);

            match page.pagination.cursor.filter(|next| !next.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        clips.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(clips)
    }

    // A 401 drops the token and retries once; a second 401 is returned.
    fn helix_get(&mut self, path: &str, query: &[(&str, String)]) -> Result<String, TwitchError> {
        let url = format!("{}/{}", self.api_base_url, path);
        let token = self.tokens.token()?;

        match self.send_helix(&url, query, &token) {
            Err(err) if err.is_unauthorized() => {
                warn!(path, "Twitch API returned 401, refreshing access token");
                self.tokens.invalidate();
                let token = self.tokens.token()?;
                Ok(self.send_helix(&url, query, &token)?)
            }
            result => Ok(result?),
        }
    }

    fn send_helix(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<String, HttpError> {
        let mut request = Request::get(url)
            .header("Client-ID", self.tokens.client_id())
            .header("Authorization", format!("Bearer {token}"));
        for (key, value) in query {
            request = request.query(*key, value.as_str());
        }
        send_with_retries(&request, &self.policy)
    }
}
