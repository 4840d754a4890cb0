use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::{auth_middleware, metrics_middleware};
use super::{handlers, queue, shop, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Customer-facing routes, no credentials required
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/queue/join", post(queue::join))
        .route("/queue/position/{phone}", get(queue::position))
        .route("/queue/stats", get(queue::stats))
        .route("/queue/cancel/{phone}", delete(queue::cancel))
        .route("/queue/shop-status", get(shop::get_shop_status))
        .route("/ws", get(ws::ws_handler));

    // Staff routes behind the authenticator
    let staff_routes = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        .route("/queue/active", get(queue::active))
        .route("/queue/serving/{number}", patch(queue::mark_serving))
        .route("/queue/complete/{number}", patch(queue::mark_complete))
        .route("/queue/shop-status", post(shop::set_shop_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(staff_routes).with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
