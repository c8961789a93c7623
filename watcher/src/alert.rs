//! Delivery of alerts to a human, for the events worth waking someone up for.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

pub const SLACK_API_URL: &str = "https://slack.com/api/chat.postMessage";

const SLACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum AlertError {
    HttpClient(reqwest::Error),
    InvalidUrl(String),
    /// The alert service refused the message.
    Rejected(String),
}

impl From<reqwest::Error> for AlertError {
    fn from(e: reqwest::Error) -> Self {
        AlertError::HttpClient(e)
    }
}

impl fmt::Display for AlertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[async_trait]
pub trait Alert: Send + Sync {
    async fn send_message(&self, message: &str) -> Result<(), AlertError>;
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts alerts to a Slack channel through the `chat.postMessage` Web API method.
pub struct Slack {
    client: reqwest::Client,
    url: Url,
    channel: String,
    token: String,
}

impl Slack {
    pub fn new(channel: String, token: String) -> Result<Self, AlertError> {
        let url = Url::parse(SLACK_API_URL).map_err(|e| AlertError::InvalidUrl(e.to_string()))?;
        Ok(Self::with_url(url, channel, token))
    }

    pub fn with_url(url: Url, channel: String, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            channel,
            token,
        }
    }
}

#[async_trait]
impl Alert for Slack {
    async fn send_message(&self, message: &str) -> Result<(), AlertError> {
        let response: PostMessageResponse = self
            .client
            .post(self.url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .timeout(SLACK_TIMEOUT)
            .json(&PostMessage {
                channel: &self.channel,
                text: message,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.ok {
            Ok(())
        } else {
            Err(AlertError::Rejected(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}
