use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};

/// Outbound SMS transport. Returns the provider message id of the sent message.
pub trait SmsSender: Send + Sync {
    fn send(&self, to: &str, text: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Deserialize)]
struct ClickatellResponse {
    #[serde(default)]
    messages: Vec<ClickatellMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClickatellMessage {
    api_message_id: Option<String>,
    accepted: bool,
    error: Option<String>,
}

#[derive(Clone)]
pub struct ClickatellClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl ClickatellClient {
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl SmsSender for ClickatellClient {
    async fn send(&self, to: &str, text: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::Gateway("outbound SMS is not configured".into()));
        };

        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", api_key)
            .json(&json!({ "content": text, "to": [to] }))
            .send()
            .await?;

        let status = resp.status();
        let body: ClickatellResponse = resp.json().await?;
        if let Some(err) = body.error {
            return Err(Error::Gateway(format!("{} ({})", err, status)));
        }

        let message = body
            .messages
            .into_iter()
            .next()
            .ok_or_else(|| Error::Gateway(format!("empty response ({})", status)))?;
        if !message.accepted {
            return Err(Error::Gateway(
                message.error.unwrap_or_else(|| "message rejected".to_string()),
            ));
        }

        let message_id = message
            .api_message_id
            .ok_or_else(|| Error::Gateway("response is missing apiMessageId".into()))?;
        tracing::info!(to, message_id = %message_id, "SMS accepted by Clickatell");
        Ok(message_id)
    }
}
