//! Inbound webhook payload (Instagram messaging) and the events extracted from it.

use serde::Deserialize;

/// One user message to answer: who sent it and what they wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingEvent {
    pub sender_id: String,
    pub message_text: String,
}

/// Webhook POST body: `{ object, entry: [ { messaging: [...] } ] }`. Other keys are ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub messaging: Option<Vec<RawMessaging>>,
}

/// One messaging item. Only items with `message.text` are user messages; receipts, reactions
/// and reads arrive in the same list without text.
#[derive(Debug, Deserialize)]
pub struct RawMessaging {
    pub sender: WebhookUser,
    #[serde(default)]
    pub message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    /// Platform message id; only used to identify skipped items in logs.
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Set when the platform reflects a message the business account sent itself.
    #[serde(default)]
    pub is_echo: bool,
}

/// Why a webhook body could not be turned into events.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("invalid webhook body: {0}")]
    Json(String),
    #[error("webhook body has no entry")]
    MissingEntry,
    #[error("webhook entry has no messaging list")]
    MissingMessaging,
}

impl WebhookPayload {
    /// Parse a raw POST body.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(body).map_err(|e| PayloadError::Json(e.to_string()))
    }

    /// Messaging items of the first entry, in delivery order.
    pub fn messaging(&self) -> Result<&[RawMessaging], PayloadError> {
        let first = self
            .entry
            .as_deref()
            .and_then(|entries| entries.first())
            .ok_or(PayloadError::MissingEntry)?;
        first
            .messaging
            .as_deref()
            .ok_or(PayloadError::MissingMessaging)
    }

    /// User messages of the first entry, in order. Items without text and echoes are dropped.
    pub fn events(&self) -> Result<Vec<MessagingEvent>, PayloadError> {
        Ok(self
            .messaging()?
            .iter()
            .filter_map(RawMessaging::to_event)
            .collect())
    }
}

impl RawMessaging {
    /// The event to answer, or None for non-text items and echoes.
    pub fn to_event(&self) -> Option<MessagingEvent> {
        let msg = self.message.as_ref()?;
        let mid = msg.mid.as_deref().unwrap_or("-");
        if msg.is_echo {
            log::debug!("inbound: skipping echo {} from {}", mid, self.sender.id);
            return None;
        }
        let Some(text) = msg.text.as_ref() else {
            log::debug!("inbound: skipping non-text item {} from {}", mid, self.sender.id);
            return None;
        };
        Some(MessagingEvent {
            sender_id: self.sender.id.clone(),
            message_text: text.clone(),
        })
    }
}
