use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;

use drivebid::directory::ProfileDirectory;
use drivebid::engines::auction::{auction_router, AuctionRouterState, AuctionStore};
use drivebid::engines::verification::{
    verification_router, DocumentVault, VerificationRouterState, VerificationStore,
};
use drivebid::identity::TokenVerifier;

/// Merges both engine routers with the operational endpoints.
pub(crate) fn marketplace_routes<AS, VS, V, P, T>(
    auction_state: AuctionRouterState<AS, P, T>,
    verification_state: VerificationRouterState<VS, V, P, T>,
) -> axum::Router
where
    AS: AuctionStore + 'static,
    VS: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    auction_router(auction_state)
        .merge(verification_router(verification_state))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
