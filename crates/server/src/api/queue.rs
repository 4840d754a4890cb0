//! Queue API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use figaro_core::queue::{DashboardView, PositionView, QueueStats, Ticket};
use figaro_core::{JoinReceipt, JoinRequest, QueueError};

use crate::metrics::{
    QUEUE_CANCELLATIONS_TOTAL, QUEUE_COMPLETIONS_TOTAL, QUEUE_JOINS_REJECTED_TOTAL,
    QUEUE_JOINS_TOTAL,
};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for joining the queue
#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub customer_name: String,
    pub phone_number: String,
    pub services: Vec<String>,
    #[serde(default)]
    pub is_priority: bool,
}

/// Query parameters for the staff dashboard
#[derive(Debug, Deserialize)]
pub struct ActiveParams {
    /// Day to inspect (`YYYY-MM-DD`), defaults to today
    pub date: Option<String>,
}

/// Error response. Duplicate joins also carry the existing ticket's
/// number and position so the customer can be told where they stand.
#[derive(Debug, Serialize)]
pub struct QueueErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

pub(super) type QueueErrorResponse = (StatusCode, Json<QueueErrorBody>);

pub(super) fn error_response(error: QueueError) -> QueueErrorResponse {
    let status = match &error {
        QueueError::Validation(_) | QueueError::ShopClosed | QueueError::AlreadyQueued { .. } => {
            StatusCode::BAD_REQUEST
        }
        QueueError::NotInQueue | QueueError::TicketNotFound(_) => StatusCode::NOT_FOUND,
        QueueError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let (queue_number, position) = match &error {
        QueueError::AlreadyQueued {
            queue_number,
            position,
        } => (Some(*queue_number), Some(*position)),
        _ => (None, None),
    };

    (
        status,
        Json(QueueErrorBody {
            error: error.to_string(),
            queue_number,
            position,
        }),
    )
}

fn rejection_reason(error: &QueueError) -> Option<&'static str> {
    match error {
        QueueError::Validation(_) => Some("validation"),
        QueueError::ShopClosed => Some("shop_closed"),
        QueueError::AlreadyQueued { .. } => Some("already_queued"),
        _ => None,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Join the queue
pub async fn join(
    State(state): State<Arc<AppState>>,
    Json(body): Json<JoinBody>,
) -> Result<(StatusCode, Json<JoinReceipt>), QueueErrorResponse> {
    let request = JoinRequest {
        customer_name: body.customer_name,
        phone_number: body.phone_number,
        services: body.services,
        is_priority: body.is_priority,
    };

    match state.engine().join(request).await {
        Ok(receipt) => {
            QUEUE_JOINS_TOTAL.inc();
            Ok((StatusCode::CREATED, Json(receipt)))
        }
        Err(e) => {
            if let Some(reason) = rejection_reason(&e) {
                QUEUE_JOINS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
            }
            Err(error_response(e))
        }
    }
}

/// Look up the caller's position by phone number
pub async fn position(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> Result<Json<PositionView>, QueueErrorResponse> {
    state
        .engine()
        .position(&phone)
        .map(Json)
        .map_err(error_response)
}

/// Public queue statistics
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QueueStats>, QueueErrorResponse> {
    state.engine().stats().map(Json).map_err(error_response)
}

/// Staff dashboard for a day
pub async fn active(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActiveParams>,
) -> Result<Json<DashboardView>, QueueErrorResponse> {
    state
        .engine()
        .dashboard(params.date.as_deref())
        .map(Json)
        .map_err(error_response)
}

/// Call a ticket to the chair
pub async fn mark_serving(
    State(state): State<Arc<AppState>>,
    Path(number): Path<u32>,
) -> Result<Json<Ticket>, QueueErrorResponse> {
    state
        .engine()
        .mark_serving(number)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Complete a ticket's service
pub async fn mark_complete(
    State(state): State<Arc<AppState>>,
    Path(number): Path<u32>,
) -> Result<Json<Ticket>, QueueErrorResponse> {
    match state.engine().mark_complete(number) {
        Ok(ticket) => {
            QUEUE_COMPLETIONS_TOTAL.inc();
            Ok(Json(ticket))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// Cancel the caller's active ticket
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> Result<Json<Ticket>, QueueErrorResponse> {
    match state.engine().cancel(&phone) {
        Ok(ticket) => {
            QUEUE_CANCELLATIONS_TOTAL.inc();
            Ok(Json(ticket))
        }
        Err(e) => Err(error_response(e)),
    }
}
