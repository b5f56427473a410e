//! Outbound reply delivery seam.

use async_trait::async_trait;

/// Why a reply could not be delivered. Callers log it; the webhook still answers 200.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("send request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("send api error: {0}")]
    Api(String),
    #[error("{0} not configured")]
    NotConfigured(&'static str),
}

/// Delivers reply text to a platform user. Shared across request handlers.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Channel id for logs (e.g. "instagram").
    fn id(&self) -> &str;
    /// Send `text` to `recipient_id`. One attempt, no retry.
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), DeliveryError>;
}
