//! Processor webhook handler

use axum::{extract::State, Json};
use std::str::FromStr;

use core_kernel::PublicLinkId;

use crate::dto::public::{WebhookAck, WebhookEvent};
use crate::error::ApiError;
use crate::AppState;

const SESSION_COMPLETED: &str = "checkout.session.completed";

/// Receives processor push events
///
/// `checkout.session.completed` feeds the same `confirm_completion` the
/// redirect poll uses; the session status is still re-verified with the
/// processor, never taken from the payload. Unknown event types are
/// acknowledged and dropped. A transient processor outage returns 503 so
/// the processor redelivers the event; any other failure (late event for
/// an expired link, unknown token) is logged and acknowledged, since
/// redelivery cannot fix it.
pub async fn processor_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<Json<WebhookAck>, ApiError> {
    if event.event_type != SESSION_COMPLETED {
        tracing::debug!(event_type = %event.event_type, "Ignoring webhook event");
        return Ok(Json(WebhookAck { received: true }));
    }

    let session_id = event.data.object.id;
    let token = event
        .data
        .object
        .metadata
        .get("public_link_id")
        .and_then(|raw| PublicLinkId::from_str(raw).ok());

    let Some(token) = token else {
        tracing::warn!(
            session_id = %session_id,
            "Completed session event without a usable link token"
        );
        return Ok(Json(WebhookAck { received: true }));
    };

    match state
        .settlement
        .confirm_completion(&token, Some(session_id.as_str()))
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                %token,
                session_id = %session_id,
                completed = outcome.is_completed(),
                "Webhook confirmation processed"
            );
            Ok(Json(WebhookAck { received: true }))
        }
        Err(err) if err.is_transient() => Err(err.into()),
        Err(err) => {
            tracing::warn!(%token, session_id = %session_id, error = %err, "Webhook confirmation rejected");
            Ok(Json(WebhookAck { received: true }))
        }
    }
}
