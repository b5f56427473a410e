//! Messaging channels.
//!
//! Inbound: the platform's webhook payload, reduced to `MessagingEvent`s.
//! Outbound: `ReplySender` delivers reply text to a recipient; `InstagramGateway` is the Graph API sender.

mod inbound;
mod instagram;
mod sender;

pub use inbound::{
    MessagingEvent, PayloadError, RawMessage, RawMessaging, WebhookEntry, WebhookPayload,
    WebhookUser,
};
pub use instagram::{InstagramGateway, OutgoingText, Recipient, SendMessageRequest};
pub use sender::{DeliveryError, ReplySender};
