//! Instagram channel: send replies through the Graph API messages endpoint.

use crate::channels::sender::{DeliveryError, ReplySender};
use crate::config::Config;
use async_trait::async_trait;
use serde::Serialize;

const GRAPH_API_BASE: &str = "https://graph.facebook.com";
const GRAPH_API_VERSION: &str = "v15.0";

/// Body for POST /{version}/{business-id}/messages.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub recipient: Recipient<'a>,
    pub message: OutgoingText<'a>,
}

#[derive(Debug, Serialize)]
pub struct Recipient<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OutgoingText<'a> {
    pub text: &'a str,
}

impl<'a> SendMessageRequest<'a> {
    pub fn new(recipient_id: &'a str, text: &'a str) -> Self {
        Self {
            recipient: Recipient { id: recipient_id },
            message: OutgoingText { text },
        }
    }
}

/// Graph API sender for one Instagram business account.
pub struct InstagramGateway {
    id: String,
    api_base: String,
    api_version: String,
    access_token: Option<String>,
    business_id: Option<String>,
    client: reqwest::Client,
}

impl InstagramGateway {
    pub fn new(access_token: Option<String>, business_id: Option<String>) -> Self {
        Self {
            id: "instagram".to_string(),
            api_base: GRAPH_API_BASE.to_string(),
            api_version: GRAPH_API_VERSION.to_string(),
            access_token,
            business_id,
            client: reqwest::Client::new(),
        }
    }

    /// Build from the instagram section as given (env overrides are applied before this).
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.instagram.access_token(),
            config.instagram.business_id(),
        )
        .with_api_base(&config.instagram.graph_api_base)
        .with_api_version(&config.instagram.api_version)
    }

    /// Point at another Graph API host (tests, proxies).
    pub fn with_api_base(mut self, base: &str) -> Self {
        let base = base.trim().trim_end_matches('/');
        if !base.is_empty() {
            self.api_base = base.to_string();
        }
        self
    }

    pub fn with_api_version(mut self, version: &str) -> Self {
        let version = version.trim().trim_matches('/');
        if !version.is_empty() {
            self.api_version = version.to_string();
        }
        self
    }

    /// Messages endpoint for the configured business account.
    fn messages_url(&self) -> Result<String, DeliveryError> {
        let business_id = self
            .business_id
            .as_ref()
            .ok_or(DeliveryError::NotConfigured("business id"))?;
        Ok(format!(
            "{}/{}/{}/messages",
            self.api_base, self.api_version, business_id
        ))
    }

    /// POST a text reply to `recipient_id`. The access token travels as a query parameter.
    pub async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), DeliveryError> {
        let token = self
            .access_token
            .as_ref()
            .ok_or(DeliveryError::NotConfigured("access token"))?;
        let url = self.messages_url()?;
        let res = self
            .client
            .post(&url)
            .query(&[("access_token", token.as_str())])
            .json(&SendMessageRequest::new(recipient_id, text))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Api(format!("{} {}", status, body)));
        }
        let body = res.text().await.unwrap_or_default();
        log::info!("instagram: message sent to {}: {}", recipient_id, body);
        Ok(())
    }
}

#[async_trait]
impl ReplySender for InstagramGateway {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.send_message(recipient_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_body_shape() {
        let v = serde_json::to_value(SendMessageRequest::new("u1", "hello")).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "recipient": { "id": "u1" }, "message": { "text": "hello" } })
        );
    }

    #[test]
    fn messages_url_uses_version_and_business_id() {
        let gw = InstagramGateway::new(Some("tok".to_string()), Some("1784".to_string()));
        assert_eq!(
            gw.messages_url().unwrap(),
            "https://graph.facebook.com/v15.0/1784/messages"
        );
        let gw = gw.with_api_base("http://127.0.0.1:9/").with_api_version("/v19.0/");
        assert_eq!(gw.messages_url().unwrap(), "http://127.0.0.1:9/v19.0/1784/messages");
    }

    #[tokio::test]
    async fn unconfigured_gateway_fails_without_request() {
        let gw = InstagramGateway::new(None, Some("1784".to_string()));
        let err = gw.send("u1", "hi").await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured("access token")));

        let gw = InstagramGateway::new(Some("tok".to_string()), None);
        let err = gw.send("u1", "hi").await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured("business id")));
    }

    #[test]
    fn from_config_reads_given_section_only() {
        let mut config = Config::default();
        config.instagram.access_token = Some(" page-token ".to_string());
        config.instagram.business_id = Some("1784".to_string());
        config.instagram.graph_api_base = "http://127.0.0.1:9".to_string();
        let gw = crate::config::with_env(
            &[
                ("INSTAGRAM_ACCESS_TOKEN", Some("env-token")),
                ("INSTAGRAM_BUSINESS_ID", Some("9999")),
            ],
            || InstagramGateway::from_config(&config),
        );
        assert_eq!(gw.access_token.as_deref(), Some("page-token"));
        assert_eq!(gw.messages_url().unwrap(), "http://127.0.0.1:9/v15.0/1784/messages");
    }

    #[test]
    fn channel_id() {
        let gw = InstagramGateway::new(None, None);
        assert_eq!(ReplySender::id(&gw), "instagram");
    }
}
