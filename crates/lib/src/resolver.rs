//! Reply resolution: answer product questions from the catalog, everything else from the completion backend.

use crate::catalog::ProductCatalog;
use crate::llm::CompletionBackend;
use std::sync::Arc;

/// Substrings (case-sensitive) that mark a message as a product inquiry.
const PRODUCT_KEYWORDS: [&str; 2] = ["price", "available"];

/// Product every inquiry is answered about; names are not extracted from the message yet.
pub const PLACEHOLDER_PRODUCT: &str = "Product A";

/// Sent instead of a generated reply when the completion backend fails.
pub const COMPLETION_FALLBACK: &str = "Sorry, I couldn't process your request at the moment.";

/// True if the text asks about price or availability.
pub fn is_product_inquiry(text: &str) -> bool {
    PRODUCT_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Catalog answer for one product name.
pub fn product_reply(catalog: &ProductCatalog, name: &str) -> String {
    match catalog.lookup(name) {
        Some(p) if p.available => {
            format!("The price of {} is ${}. It is available.", p.name, p.price)
        }
        Some(p) => format!("Sorry, {} is out of stock.", p.name),
        None => format!("Sorry, I couldn't find information for {}.", name),
    }
}

/// Decides the reply text for one inbound message.
#[derive(Clone)]
pub struct ResponseResolver {
    catalog: Arc<ProductCatalog>,
    backend: Arc<dyn CompletionBackend>,
    placeholder_product: String,
}

impl ResponseResolver {
    pub fn new(catalog: Arc<ProductCatalog>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            catalog,
            backend,
            placeholder_product: PLACEHOLDER_PRODUCT.to_string(),
        }
    }

    /// Answer inquiries about `name` instead of the default placeholder product.
    pub fn with_placeholder_product(mut self, name: impl Into<String>) -> Self {
        self.placeholder_product = name.into();
        self
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Reply for `text`. Never fails: provider errors become [`COMPLETION_FALLBACK`].
    pub async fn resolve(&self, text: &str) -> String {
        if is_product_inquiry(text) {
            log::debug!("resolver: product inquiry, answering for {}", self.placeholder_product);
            return product_reply(&self.catalog, &self.placeholder_product);
        }
        match self.backend.complete(text).await {
            Ok(generated) => generated.trim().to_string(),
            Err(e) => {
                log::warn!("resolver: completion failed, sending fallback: {}", e);
                COMPLETION_FALLBACK.to_string()
            }
        }
    }
}
