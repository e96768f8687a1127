//! Payment link handlers (staff surface)

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use validator::Validate;

use core_kernel::{Currency, Money, PaymentLinkId};
use domain_links::{CreateLinksRequest, LinkAnalytics, LinkFilter, LinkSummary};

use crate::auth::{has_role, roles, Claims};
use crate::dto::links::{
    GenerateLinksRequest, LinkCreationResponse, LinkResponse, ListLinksQuery,
};
use crate::error::ApiError;
use crate::AppState;

/// Creates payment links for a batch of debtors and dispatches the
/// requested notifications
pub async fn generate_links(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<GenerateLinksRequest>,
) -> Result<Json<Vec<LinkCreationResponse>>, ApiError> {
    if !has_role(&claims, roles::TEAM) {
        return Err(ApiError::Forbidden(
            "link generation requires a staff role".to_string(),
        ));
    }
    let staff = claims.sub.parse().map_err(|_| ApiError::Unauthorized)?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let amount = Money::new(request.amount, request.currency.unwrap_or(Currency::USD));
    let creations = state
        .links
        .create_links(
            CreateLinksRequest {
                debtor_ids: request.debtor_ids,
                amount,
                description: request.description,
                expires_in_days: request.expires_in_days,
                notify_email: request.send_email,
                notify_sms: request.send_sms,
            },
            staff,
        )
        .await?;

    let responses = creations
        .into_iter()
        .map(|creation| {
            let url = state.links.payment_url(&creation.link.public_link_id);
            LinkCreationResponse::from_creation(creation, url)
        })
        .collect();
    Ok(Json(responses))
}

/// Lists links, filterable by status and debtor
pub async fn list_links(
    State(state): State<AppState>,
    Query(query): Query<ListLinksQuery>,
) -> Result<Json<Vec<LinkResponse>>, ApiError> {
    let filter = LinkFilter {
        status: query.status,
        debtor_id: query.debtor_id,
    };
    let links = state
        .links
        .list(&filter)
        .await
        .into_iter()
        .map(|link| {
            let url = state.links.payment_url(&link.public_link_id);
            LinkResponse::from_link(link, url)
        })
        .collect();
    Ok(Json(links))
}

/// Aggregate link counts and total collected
pub async fn links_summary(State(state): State<AppState>) -> Result<Json<LinkSummary>, ApiError> {
    Ok(Json(state.links.summary().await))
}

/// One link by id
pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<PaymentLinkId>,
) -> Result<Json<LinkResponse>, ApiError> {
    let entry = state
        .links
        .entry(id)
        .ok_or_else(|| ApiError::NotFound(format!("payment link {id}")))?;
    let link = entry.lock().await.clone();
    let url = state.links.payment_url(&link.public_link_id);
    Ok(Json(LinkResponse::from_link(link, url)))
}

/// View/click/completion analytics for one link
pub async fn link_analytics(
    State(state): State<AppState>,
    Path(id): Path<PaymentLinkId>,
) -> Result<Json<LinkAnalytics>, ApiError> {
    Ok(Json(state.links.analytics(id).await?))
}

/// Cancels an active link
pub async fn cancel_link(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<PaymentLinkId>,
) -> Result<Json<LinkResponse>, ApiError> {
    if !has_role(&claims, roles::TEAM) {
        return Err(ApiError::Forbidden(
            "link cancellation requires a staff role".to_string(),
        ));
    }
    let link = state.links.cancel(id).await?;
    let url = state.links.payment_url(&link.public_link_id);
    Ok(Json(LinkResponse::from_link(link, url)))
}
