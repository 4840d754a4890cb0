//! Shop gate handlers.

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use figaro_core::queue::ShopStatus;

use crate::api::middleware::AuthUser;
use crate::api::queue::{error_response, QueueErrorResponse};
use crate::state::AppState;

/// Request body for flipping the gate
#[derive(Debug, Deserialize)]
pub struct SetShopStatusBody {
    pub is_open: bool,
}

/// Current gate state (public: customers check before walking over)
pub async fn get_shop_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ShopStatus>, QueueErrorResponse> {
    state
        .engine()
        .shop_status()
        .map(Json)
        .map_err(error_response)
}

/// Open or close the shop (staff)
pub async fn set_shop_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<SetShopStatusBody>,
) -> Result<Json<ShopStatus>, QueueErrorResponse> {
    state
        .engine()
        .set_shop_status(body.is_open, &user)
        .map(Json)
        .map_err(error_response)
}
