//! Gateway HTTP server (webhook verification + event ingestion).

use crate::catalog::ProductCatalog;
use crate::channels::{InstagramGateway, MessagingEvent, ReplySender, WebhookPayload};
use crate::config::Config;
use crate::llm::CompletionClient;
use crate::resolver::ResponseResolver;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Body returned with 403 when the handshake token does not match.
pub const VERIFY_MISMATCH_BODY: &str = "Verification token mismatch";

/// Body returned with 200 once every event of a delivery has been attempted.
const EVENT_RECEIVED_BODY: &str = "EVENT_RECEIVED";

/// Shared state for the webhook handlers. Read-only after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// Secret the platform must echo in `hub.verify_token`. None rejects every handshake.
    pub verify_token: Option<String>,
    pub resolver: ResponseResolver,
    pub sender: Arc<dyn ReplySender>,
}

impl GatewayState {
    pub fn new(
        config: Config,
        resolver: ResponseResolver,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        let verify_token = config.instagram.verify_token();
        Self {
            config: Arc::new(config),
            verify_token,
            resolver,
            sender,
        }
    }

    /// Production wiring: built-in catalog, completion client and Instagram sender from config.
    pub fn from_config(config: Config) -> Self {
        let completion = Arc::new(CompletionClient::from_config(&config));
        let resolver = ResponseResolver::new(Arc::new(ProductCatalog::builtin()), completion);
        let sender = Arc::new(InstagramGateway::from_config(&config));
        Self::new(config, resolver, sender)
    }

    /// True if `provided` matches the configured verification secret.
    fn token_matches(&self, provided: Option<&str>) -> bool {
        match (self.verify_token.as_deref(), provided) {
            (Some(expected), Some(p)) => p == expected,
            _ => false,
        }
    }
}

/// Query of the subscription handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Routes: `GET /` health, `GET /webhook` handshake, `POST /webhook` events.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Callers apply env overrides first (`config::apply_env_overrides`); the port is used as given.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    if config.instagram.verify_token().is_none() {
        log::warn!("no verify token configured (VERIFY_TOKEN); webhook subscription will be refused");
    }
    if config.completion.api_key().is_none() {
        log::warn!("no completion api key configured (OPENAI_API_KEY); general questions get the fallback reply");
    }
    if config.instagram.access_token().is_none() || config.instagram.business_id().is_none()
    {
        log::warn!("instagram access token or business id missing; replies cannot be delivered");
    }

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let state = GatewayState::from_config(config);
    log::info!(
        "completion model {}, catalog of {} product(s)",
        state.config.completion.model,
        state.resolver.catalog().len()
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for liveness checks).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}

/// GET /webhook — subscription handshake: echo `hub.challenge` when `hub.verify_token` matches.
async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    if state.token_matches(params.verify_token.as_deref()) {
        log::info!(
            "webhook verified (mode {})",
            params.mode.as_deref().unwrap_or("-")
        );
        let challenge = params.challenge.unwrap_or_default();
        return (StatusCode::OK, challenge).into_response();
    }
    log::warn!("webhook verification failed: token mismatch");
    (StatusCode::FORBIDDEN, VERIFY_MISMATCH_BODY).into_response()
}

/// POST /webhook — resolve and send a reply for each messaging event, in order.
/// Answers 200 once all events were attempted; 400 only when the body itself is unusable.
async fn receive_webhook(State(state): State<GatewayState>, body: Bytes) -> Response {
    let payload = match WebhookPayload::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("webhook: rejecting body: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    let events = match payload.events() {
        Ok(events) => events,
        Err(e) => {
            log::warn!("webhook: rejecting body: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    log::info!(
        "webhook: received {} event(s) (object {})",
        events.len(),
        payload.object.as_deref().unwrap_or("-")
    );
    for event in &events {
        process_event(&state, event).await;
    }
    (StatusCode::OK, EVENT_RECEIVED_BODY).into_response()
}

/// Resolve a reply for one event and deliver it. Delivery failures are logged, never returned.
async fn process_event(state: &GatewayState, event: &MessagingEvent) {
    let reply = state.resolver.resolve(&event.message_text).await;
    match state.sender.send(&event.sender_id, &reply).await {
        Ok(()) => log::debug!("{}: replied to {}", state.sender.id(), event.sender_id),
        Err(e) => log::warn!(
            "{}: reply to {} failed: {}",
            state.sender.id(),
            event.sender_id,
            e
        ),
    }
}
