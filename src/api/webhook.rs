//! Webhook receiver for GitHub deliveries

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};

use crate::SharedState;
use crate::utils::verify_github_signature;
use crate::webhook::WebhookEvent;

const EVENT_HEADER: &str = "X-GitHub-Event";
const DELIVERY_HEADER: &str = "X-GitHub-Delivery";
const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const LEGACY_SIGNATURE_HEADER: &str = "X-Hub-Signature";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Handles the GitHub webhook POST request.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery_id = header(&headers, DELIVERY_HEADER).map(String::from);

    // Signature validation, when a secret is configured
    if let Some(secret) = state.config.webhook_secret() {
        let Some(signature) =
            header(&headers, SIGNATURE_HEADER).or_else(|| header(&headers, LEGACY_SIGNATURE_HEADER))
        else {
            warn!("Delivery {:?} has no signature header", delivery_id);
            return StatusCode::UNAUTHORIZED.into_response();
        };
        if !verify_github_signature(secret, &body, signature) {
            error!("Signature verification failed for delivery {:?}", delivery_id);
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let Some(event_name) = header(&headers, EVENT_HEADER) else {
        info!("Delivery {:?} has no {} header", delivery_id, EVENT_HEADER);
        return StatusCode::BAD_REQUEST.into_response();
    };

    let event = match WebhookEvent::parse(event_name, delivery_id, &body) {
        Ok(event) => event,
        Err(e) => {
            info!("Could not parse {} payload: {}", event_name, e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    debug!(
        "Received {} event, delivery {:?}",
        event.key(),
        event.delivery_id
    );

    match state
        .registry
        .dispatch(&event, &state.clients, &state.config)
        .await
    {
        Some(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
