use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use intake_core::config::WhatsAppConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "en_US";

#[derive(Clone, Debug, PartialEq)]
pub enum OutboundMessage {
    Text { body: String },
    Image { link: String, caption: Option<String> },
    Template { name: String, language_code: String, components: Option<Vec<Value>> },
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn image(link: impl Into<String>, caption: Option<String>) -> Self {
        Self::Image { link: link.into(), caption: caption.filter(|c| !c.is_empty()) }
    }

    pub fn template(name: impl Into<String>) -> Self {
        Self::Template {
            name: name.into(),
            language_code: DEFAULT_TEMPLATE_LANGUAGE.to_string(),
            components: None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Template { .. } => "template",
        }
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("messaging transport failure: {0}")]
    Transport(String),
    #[error("messaging API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("recipient phone number is empty")]
    EmptyRecipient,
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, message: OutboundMessage) -> Result<(), SendError>;

    async fn send_text(&self, to: &str, body: &str) -> Result<(), SendError> {
        self.send(to, OutboundMessage::text(body)).await
    }
}

/// Drops a single leading `+`; the API expects bare digits.
pub fn normalize_recipient(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('+').unwrap_or(trimmed)
}

pub fn build_payload(to: &str, message: &OutboundMessage) -> Value {
    let mut payload = json!({
        "messaging_product": "whatsapp",
        "to": to,
    });

    match message {
        OutboundMessage::Text { body } => {
            payload["recipient_type"] = json!("individual");
            payload["type"] = json!("text");
            payload["text"] = json!({ "body": body });
        }
        OutboundMessage::Image { link, caption } => {
            payload["recipient_type"] = json!("individual");
            payload["type"] = json!("image");
            payload["image"] = json!({ "link": link });
            if let Some(caption) = caption {
                payload["image"]["caption"] = json!(caption);
            }
        }
        OutboundMessage::Template { name, language_code, components } => {
            payload["type"] = json!("template");
            payload["template"] = json!({
                "name": name,
                "language": { "code": language_code },
            });
            if let Some(components) = components {
                payload["template"]["components"] = json!(components);
            }
        }
    }

    payload
}

/// Sends through the Graph API `/{phone_number_id}/messages` endpoint.
pub struct CloudApiSender {
    client: Client,
    endpoint: String,
    access_token: SecretString,
}

impl CloudApiSender {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, SendError> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| SendError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &WhatsAppConfig) -> Self {
        let endpoint = format!(
            "{}/{}/{}/messages",
            config.api_base_url.trim_end_matches('/'),
            config.api_version.trim_matches('/'),
            config.phone_number_id.trim()
        );
        Self { client, endpoint, access_token: config.access_token.clone() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MessageSender for CloudApiSender {
    async fn send(&self, to: &str, message: OutboundMessage) -> Result<(), SendError> {
        let recipient = normalize_recipient(to);
        if recipient.is_empty() {
            return Err(SendError::EmptyRecipient);
        }
        let payload = build_payload(recipient, &message);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.access_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "whatsapp.send.rejected",
                recipient = %recipient,
                message_type = message.kind(),
                status = status.as_u16(),
                "WhatsApp API rejected outbound message"
            );
            return Err(SendError::Rejected { status: status.as_u16(), body });
        }

        info!(
            event_name = "whatsapp.send.delivered",
            recipient = %recipient,
            message_type = message.kind(),
            "WhatsApp message sent"
        );
        Ok(())
    }
}

/// Keeps every outbound message in memory instead of calling the API.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    fail_with_status: Option<u16>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the attempt, then reports the given status as a rejection.
    pub fn failing(status: u16) -> Self {
        Self { sent: Mutex::new(Vec::new()), fail_with_status: Some(status) }
    }

    pub async fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().await.clone()
    }

    pub async fn last_text(&self) -> Option<String> {
        self.sent.lock().await.iter().rev().find_map(|(_, message)| match message {
            OutboundMessage::Text { body } => Some(body.clone()),
            _ => None,
        })
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, to: &str, message: OutboundMessage) -> Result<(), SendError> {
        self.sent.lock().await.push((normalize_recipient(to).to_string(), message));
        match self.fail_with_status {
            Some(status) => Err(SendError::Rejected { status, body: String::new() }),
            None => Ok(()),
        }
    }
}
