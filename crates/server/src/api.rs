//! JSON API for the quoting workflow.
//!
//! Routes:
//! - `POST /api/service-requests`                    — create request + fan-out
//! - `GET  /api/service-requests`                    — requester's own requests
//! - `GET  /api/service-requests/{id}`               — request detail (quotes for owner)
//! - `POST /api/service-requests/{id}/quote`         — submit a quote
//! - `POST /api/service-requests/{id}/select-quote`  — select a quote, create booking
//! - `POST /api/service-requests/{id}/cancel`        — requester cancellation
//! - `POST /api/service-requests/{id}/cancel-quote`  — provider quote withdrawal
//! - `GET  /api/provider/service-requests`           — provider actionable feed
//! - `GET  /api/provider/notifications`              — provider inbox

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use fixbid_core::domain::notification::ProviderNotification;
use fixbid_core::domain::quote::{ProviderQuote, QuoteId};
use fixbid_core::domain::request::{ServiceRequest, ServiceRequestId, Urgency};
use fixbid_core::errors::Rejection;
use fixbid_core::geo::GeoPoint;

use crate::identity::Identity;
use crate::workflow::{FeedItem, NewQuoteInput, NewRequestInput, RequestWorkflow};

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

pub fn router(workflow: Arc<RequestWorkflow>) -> Router {
    Router::new()
        .route("/api/service-requests", post(create_request).get(list_requests))
        .route("/api/service-requests/{id}", get(get_request))
        .route("/api/service-requests/{id}/quote", post(submit_quote))
        .route("/api/service-requests/{id}/select-quote", post(select_quote))
        .route("/api/service-requests/{id}/cancel", post(cancel_request))
        .route("/api/service-requests/{id}/cancel-quote", post(withdraw_quote))
        .route("/api/provider/service-requests", get(provider_feed))
        .route("/api/provider/notifications", get(provider_notifications))
        .with_state(workflow)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub service_type: String,
    pub work_description: String,
    /// Human-readable address.
    pub location: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub urgency: Option<Urgency>,
    pub preferred_date: Option<DateTime<Utc>>,
    pub preferred_time: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub voice_note_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuoteBody {
    pub price: Decimal,
    #[serde(default)]
    pub estimated_duration: String,
    pub quote_notes: Option<String>,
    #[serde(default)]
    pub quote_images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectQuoteBody {
    pub quote_id: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_request(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
    Json(body): Json<CreateRequestBody>,
) -> ApiResult {
    let location = match (body.lat, body.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
        _ => None,
    };

    let input = NewRequestInput {
        category: body.service_type,
        description: body.work_description,
        address: body.location,
        location,
        urgency: body.urgency,
        preferred_date: body.preferred_date,
        preferred_time_slot: body.preferred_time,
        images: body.images,
        voice_note_url: body.voice_note_url,
    };

    let created =
        workflow.create_request(&identity.user_id, input).await.map_err(into_response)?;

    Ok(Json(json!({
        "success": true,
        "request_id": created.request.id.0,
        "notified_providers": created.notified_providers,
        "message": "Service request created successfully",
    })))
}

async fn list_requests(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let requests = workflow
        .list_requests(&identity.user_id, query.limit)
        .await
        .map_err(into_response)?;

    Ok(Json(json!({
        "service_requests": requests.iter().map(request_view).collect::<Vec<_>>(),
    })))
}

async fn get_request(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult {
    let detail = workflow
        .get_request(&identity.user_id, identity.is_provider(), &ServiceRequestId(id))
        .await
        .map_err(into_response)?;

    Ok(Json(json!({
        "service_request": request_view(&detail.request),
        "quotes": detail.quotes.iter().map(quote_view).collect::<Vec<_>>(),
    })))
}

async fn submit_quote(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<SubmitQuoteBody>,
) -> ApiResult {
    require_provider(&identity)?;

    let input = NewQuoteInput {
        price: body.price,
        estimated_duration: body.estimated_duration,
        notes: body.quote_notes,
        images: body.quote_images,
    };

    let quote = workflow
        .submit_quote(&identity.user_id, &ServiceRequestId(id), input)
        .await
        .map_err(into_response)?;

    Ok(Json(json!({
        "success": true,
        "quote_id": quote.id.0,
        "message": "Quote submitted successfully",
    })))
}

async fn select_quote(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<SelectQuoteBody>,
) -> ApiResult {
    let outcome = workflow
        .select_quote(&identity.user_id, &ServiceRequestId(id), &QuoteId(body.quote_id))
        .await
        .map_err(into_response)?;

    Ok(Json(json!({
        "success": true,
        "booking_id": outcome.booking.id.0,
        "message": "Quote selected successfully",
    })))
}

async fn cancel_request(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult {
    workflow
        .cancel_request(&identity.user_id, &ServiceRequestId(id))
        .await
        .map_err(into_response)?;

    Ok(Json(json!({
        "success": true,
        "message": "Service request cancelled successfully",
    })))
}

async fn withdraw_quote(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult {
    require_provider(&identity)?;

    workflow
        .withdraw_quote(&identity.user_id, &ServiceRequestId(id))
        .await
        .map_err(into_response)?;

    Ok(Json(json!({
        "success": true,
        "message": "Quote cancelled successfully",
    })))
}

async fn provider_feed(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
) -> ApiResult {
    require_provider(&identity)?;

    let feed = workflow.provider_feed(&identity.user_id).await.map_err(into_response)?;

    Ok(Json(json!({
        "success": true,
        "service_requests": feed.iter().map(feed_view).collect::<Vec<_>>(),
        "total": feed.len(),
    })))
}

async fn provider_notifications(
    State(workflow): State<Arc<RequestWorkflow>>,
    identity: Identity,
) -> ApiResult {
    require_provider(&identity)?;

    let inbox = workflow.provider_inbox(&identity.user_id).await.map_err(into_response)?;

    Ok(Json(json!({
        "success": true,
        "notifications": inbox.iter().map(notification_view).collect::<Vec<_>>(),
        "total": inbox.len(),
    })))
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

fn request_view(request: &ServiceRequest) -> Value {
    json!({
        "id": request.id.0,
        "title": request.title,
        "description": request.description,
        "service_category": request.category,
        "urgency": request.urgency.as_str(),
        "location": request.address,
        "images": request.images,
        "preferred_date": request.preferred_date.map(|dt| dt.to_rfc3339()),
        "preferred_time_slot": request.preferred_time_slot,
        "status": request.status,
        "created_at": request.created_at.to_rfc3339(),
        "quote_deadline": request.quote_deadline.to_rfc3339(),
        "expires_at": request.expires_at.to_rfc3339(),
    })
}

fn quote_view(quote: &ProviderQuote) -> Value {
    json!({
        "id": quote.id.0,
        "provider_name": quote.snapshot.name,
        "provider_rating": quote.snapshot.rating,
        "price": quote.price,
        "currency": quote.currency,
        "estimated_duration": quote.estimated_duration,
        "quote_notes": quote.notes,
        "quote_images": quote.images,
        "status": quote.status,
        "submitted_at": quote.submitted_at.to_rfc3339(),
    })
}

fn feed_view(item: &FeedItem) -> Value {
    let mut view = request_view(&item.request);
    view["distance"] = json!(item.distance_km);
    view["has_quoted"] = json!(item.has_quoted);
    view["quote_status"] = json!(item.quote_status);
    view
}

fn notification_view(notification: &ProviderNotification) -> Value {
    json!({
        "id": notification.id.0,
        "type": notification.kind.as_str(),
        "title": notification.title,
        "message": notification.message,
        "is_read": notification.is_read,
        "created_at": notification.created_at.to_rfc3339(),
        "service_request_id": notification.request_id.0,
    })
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn require_provider(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_provider() {
        Ok(())
    } else {
        Err(into_response(Rejection::Forbidden))
    }
}

fn into_response(rejection: Rejection) -> ApiError {
    let mut body = json!({
        "error": rejection.user_message(),
        "code": rejection.code(),
    });

    match &rejection {
        Rejection::UnpaidBooking { booking_id } => {
            body["unpaid_booking_id"] = json!(booking_id.0);
        }
        Rejection::DepositShortfall { required, balance } => {
            body["required"] = json!(required);
            body["balance"] = json!(balance);
            body["shortfall"] = json!(required - balance);
        }
        Rejection::RequestClosed { status } | Rejection::CancelNotAllowed { status } => {
            body["status"] = json!(status);
        }
        Rejection::QuoteUnavailable { status } | Rejection::WithdrawNotAllowed { status } => {
            body["status"] = json!(status);
        }
        _ => {}
    }

    let status = match rejection {
        Rejection::MissingField(_)
        | Rejection::NonPositivePrice
        | Rejection::MissingDuration => StatusCode::BAD_REQUEST,
        Rejection::Unauthenticated => StatusCode::UNAUTHORIZED,
        Rejection::Forbidden => StatusCode::FORBIDDEN,
        Rejection::NotFound(_) => StatusCode::NOT_FOUND,
        Rejection::Storage(_) | Rejection::Domain(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::CONFLICT,
    };

    (status, Json(body))
}
