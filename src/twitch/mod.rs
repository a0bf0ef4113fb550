mod api;
mod auth;
mod types;

use thiserror::Error;

use crate::http::HttpError;

pub(crate) use api::TwitchClient;
pub(crate) use types::Clip;

#[derive(Debug, Error)]
pub(crate) enum TwitchError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("failed to decode {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("no Twitch user found for channel `{0}`")]
    UnknownChannel(String),
}

impl TwitchError {
    pub(crate) fn decode(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Decode { what, source }
    }
}
