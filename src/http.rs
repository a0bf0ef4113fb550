use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

const ERROR_BODY_LIMIT: usize = 240;

#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) retry_delay: Duration,
}

#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("request failed after {attempts} attempt(s): HTTP status {status}{}", body_suffix(.body))]
    Status {
        status: u16,
        body: String,
        attempts: usize,
    },
    #[error("request failed after {attempts} attempt(s): transport error: {message}")]
    Transport { attempts: usize, message: String },
    #[error("request failed: response decode failed: {0}")]
    Decode(String),
}

impl HttpError {
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

// Query strings (and, for webhooks, the path) carry credentials; logs and
// errors only ever see `target()`.
#[derive(Debug, Clone)]
pub(crate) struct Request<'a> {
    method: Method,
    url: &'a str,
    headers: Vec<(&'a str, String)>,
    query: Vec<(&'a str, String)>,
    json_body: Option<String>,
    secret_path: bool,
}

impl<'a> Request<'a> {
    pub(crate) fn get(url: &'a str) -> Self {
        Self::new(Method::Get, url)
    }

    pub(crate) fn post(url: &'a str) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: &'a str) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            query: Vec::new(),
            json_body: None,
            secret_path: false,
        }
    }

    pub(crate) fn secret_path(mut self) -> Self {
        self.secret_path = true;
        self
    }

    fn target(&self) -> String {
        match url::Url::parse(self.url) {
            Ok(parsed) => {
                let origin = parsed.origin().ascii_serialization();
                if self.secret_path {
                    format!("{origin}/<redacted>")
                } else {
                    format!("{origin}{}", parsed.path())
                }
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }

    pub(crate) fn header(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub(crate) fn query(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub(crate) fn json(mut self, body: String) -> Self {
        self.json_body = Some(body);
        self
    }
}

fn describe_transport(target: &str, err: &ureq::Transport) -> String {
    // `Transport`'s Display embeds the full URL, query included.
    match std::error::Error::source(err) {
        Some(source) => format!("{target}: {}: {source}", err.kind()),
        None => format!("{target}: {}", err.kind()),
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn send_with_retries(
    request: &Request<'_>,
    policy: &RetryPolicy,
) -> Result<String, HttpError> {
    let attempts = policy.attempts.max(1);
    let target = request.target();
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    for attempt in 1..=attempts {
        let mut call = agent.request(request.method.as_str(), request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        for (key, value) in &request.query {
            call = call.query(key, value);
        }

        debug!(
            method = request.method.as_str(),
            endpoint = %target,
            attempt,
            "sending request"
        );
        let result = match &request.json_body {
            Some(body) => call
                .set("Content-Type", "application/json")
                .send_string(body),
            None => call.call(),
        };

        match result {
            Ok(response) => {
                return response
                    .into_string()
                    .map_err(|err| HttpError::Decode(err.to_string()));
            }
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body
                    .trim()
                    .chars()
                    .take(ERROR_BODY_LIMIT)
                    .collect::<String>();

                if should_retry_http_status(status) && attempt < attempts {
                    warn!(
                        endpoint = %target,
                        status, attempt, attempts, "retryable HTTP status, retrying"
                    );
                    thread::sleep(policy.retry_delay);
                    continue;
                }

                return Err(HttpError::Status {
                    status,
                    body,
                    attempts: attempt,
                });
            }
            Err(ureq::Error::Transport(err)) => {
                let message = describe_transport(&target, &err);
                if attempt < attempts {
                    warn!(
                        endpoint = %target,
                        error = %message,
                        attempt,
                        attempts,
                        "transport error, retrying"
                    );
                    thread::sleep(policy.retry_delay);
                    continue;
                }
                return Err(HttpError::Transport {
                    attempts,
                    message,
                });
            }
        }
    }

    Err(HttpError::Transport {
        attempts,
        message: "exhausted attempts without a concrete error".to_string(),
    })
}
