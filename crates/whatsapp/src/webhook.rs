use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// The first message of an inbound webhook event.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    /// `from` as sent by the platform (digits, no leading `+`).
    pub sender: String,
    /// Body of a `text` message; `None` for every other message type.
    pub text: Option<String>,
    /// The message carries an `image` attachment.
    pub has_image: bool,
    pub raw: Value,
}

impl InboundMessage {
    /// Text with surrounding whitespace removed, or `""` when absent.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }

    /// True for any non-empty body, whitespace included.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|text| !text.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("webhook body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("webhook message is malformed: {0}")]
    MalformedMessage(String),
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
struct Change {
    #[serde(default)]
    value: Option<ChangeValue>,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    from: String,
    #[serde(default)]
    text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    body: String,
}

/// Extracts the first message from a webhook body.
///
/// Only `entry[0].changes[0].value.messages[0]` is considered. Status
/// callbacks and other envelopes without messages yield `Ok(None)`.
pub fn parse_envelope(body: &[u8]) -> Result<Option<InboundMessage>, EnvelopeError> {
    let payload: Value = serde_json::from_slice(body).map_err(EnvelopeError::InvalidJson)?;
    first_message(&payload)
}

pub fn first_message(payload: &Value) -> Result<Option<InboundMessage>, EnvelopeError> {
    let envelope: Envelope = serde_json::from_value(payload.clone())
        .map_err(|e| EnvelopeError::MalformedMessage(e.to_string()))?;

    let raw = envelope
        .entry
        .into_iter()
        .next()
        .and_then(|entry| entry.changes.into_iter().next())
        .and_then(|change| change.value)
        .and_then(|value| value.messages)
        .and_then(|messages| messages.into_iter().next());

    let Some(raw) = raw else {
        return Ok(None);
    };

    let message: RawMessage = serde_json::from_value(raw.clone())
        .map_err(|e| EnvelopeError::MalformedMessage(e.to_string()))?;
    let has_image = raw.get("image").is_some();

    Ok(Some(InboundMessage {
        sender: message.from,
        text: message.text.map(|text| text.body),
        has_image,
        raw,
    }))
}
