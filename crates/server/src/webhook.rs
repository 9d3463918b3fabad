//! WhatsApp webhook endpoints.
//!
//! - `GET  /webhook` (and `/`) - subscription handshake
//! - `POST /webhook` (and `/`) - inbound message events

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use intake_whatsapp::{parse_envelope, tokens_match, verify_signature, SIGNATURE_HEADER};

use crate::app::AppState;

const SUBSCRIBE_MODE: &str = "subscribe";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(verify).post(ingest))
        .route("/webhook", get(verify).post(ingest))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookAck {
    fn ok(status: &'static str) -> Json<Self> {
        Json(Self { status, message: None })
    }

    fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self { status: "error", message: Some(message.into()) })
    }
}

pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    let mode_ok = params.mode.as_deref() == Some(SUBSCRIBE_MODE);
    let token_ok = params
        .verify_token
        .as_deref()
        .is_some_and(|token| tokens_match(state.verify_token.expose_secret(), token));

    if mode_ok && token_ok {
        info!(event_name = "webhook.verify.accepted", "webhook subscription verified");
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        warn!(
            event_name = "webhook.verify.rejected",
            mode = params.mode.as_deref().unwrap_or(""),
            "webhook verification failed"
        );
        (StatusCode::FORBIDDEN, "Forbidden".to_string())
    }
}

pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookAck>) {
    let correlation_id = Uuid::new_v4().to_string();

    if let Some(secret) = &state.app_secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
        if !verify_signature(secret.expose_secret(), signature, &body) {
            warn!(
                event_name = "webhook.ingest.bad_signature",
                correlation_id = %correlation_id,
                "rejecting unsigned or mis-signed webhook body"
            );
            return (StatusCode::UNAUTHORIZED, WebhookAck::error("invalid signature"));
        }
    }

    let message = match parse_envelope(&body) {
        Ok(Some(message)) => message,
        Ok(None) => return (StatusCode::OK, WebhookAck::ok("ignored")),
        Err(parse_error) => {
            error!(
                event_name = "webhook.ingest.invalid_envelope",
                correlation_id = %correlation_id,
                error = %parse_error,
                "webhook body could not be parsed"
            );
            return (StatusCode::INTERNAL_SERVER_ERROR, WebhookAck::error(parse_error.to_string()));
        }
    };

    match state.dialogue.route(&message, &correlation_id).await {
        Ok(outcome) => {
            info!(
                event_name = "webhook.ingest.processed",
                correlation_id = %correlation_id,
                customer_phone = %message.sender,
                intent = %outcome.intent,
                delivered = outcome.delivered,
                "inbound message processed"
            );
            (StatusCode::OK, WebhookAck::ok("success"))
        }
        Err(turn_error) => {
            error!(
                event_name = "webhook.ingest.failed",
                correlation_id = %correlation_id,
                customer_phone = %message.sender,
                error = %turn_error,
                "inbound message processing failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, WebhookAck::error(turn_error.to_string()))
        }
    }
}
