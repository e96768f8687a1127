//! Public payment page handlers
//!
//! These routes are unauthenticated; the unguessable link token is the
//! only credential. They power the hosted payment page: load the link,
//! start checkout, and poll for completion after the redirect.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use core_kernel::{CheckoutSession, PublicLinkId};
use domain_settlement::CompletionOutcome;

use crate::dto::public::{PublicLinkResponse, VerifySuccessQuery};
use crate::error::ApiError;
use crate::AppState;

/// Loads a payment link for the public page, counting the view
pub async fn get_link(
    State(state): State<AppState>,
    Path(token): Path<PublicLinkId>,
) -> Result<Json<PublicLinkResponse>, ApiError> {
    state.links.record_view(&token).await?;

    let link = state
        .links
        .get_by_token(&token)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("payment link {token}")))?;

    let debtor_name = state
        .ledger
        .account(link.debtor_id)
        .map(|a| a.full_name)
        .unwrap_or_default();

    Ok(Json(PublicLinkResponse {
        amount: link.amount,
        description: link.description,
        debtor_name,
        status: link.status,
        expires_at: link.expires_at,
    }))
}

/// Opens a processor checkout session and returns the redirect URL
pub async fn start_checkout(
    State(state): State<AppState>,
    Path(token): Path<PublicLinkId>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let session = state.links.start_checkout(&token).await?;
    Ok(Json(session))
}

/// One completion confirmation attempt, called by the redirect page poll
///
/// Returns `completed` with the settled record once the processor
/// confirms, `pending` while it has not. The page retries on its own
/// cadence; a transient processor outage surfaces as 503 and counts as a
/// failed poll on the client side.
pub async fn verify_success(
    State(state): State<AppState>,
    Path(token): Path<PublicLinkId>,
    Query(query): Query<VerifySuccessQuery>,
) -> Result<Json<CompletionOutcome>, ApiError> {
    let outcome = state
        .settlement
        .confirm_completion(&token, query.session_id.as_deref())
        .await?;
    Ok(Json(outcome))
}
