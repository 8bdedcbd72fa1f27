use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::directory::{DirectoryError, ProfileDirectory, VerificationTier};
use crate::identity::{Authenticator, TokenVerifier};

use super::domain::{AuctionDraft, AuctionId, VehicleId};
use super::repository::{AuctionStore, AuctionStoreError};
use super::service::{AuctionEngine, AuctionError};

/// Shared state for the auction endpoints.
pub struct AuctionRouterState<S, P, T> {
    pub engine: Arc<AuctionEngine<S, P>>,
    pub auth: Arc<Authenticator<T, P>>,
}

impl<S, P, T> Clone for AuctionRouterState<S, P, T> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Router builder exposing the auction HTTP surface.
pub fn auction_router<S, P, T>(state: AuctionRouterState<S, P, T>) -> Router
where
    S: AuctionStore + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    Router::new()
        .route("/auctions", post(create_auction_handler::<S, P, T>))
        .route("/auctions/live", get(live_auctions_handler::<S, P, T>))
        .route("/auctions/:id", get(get_auction_handler::<S, P, T>))
        .route(
            "/auctions/:id/bid-history",
            get(bid_history_handler::<S, P, T>),
        )
        .route("/auctions/:id/bids", post(place_bid_handler::<S, P, T>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateAuctionRequest {
    pub(crate) vehicle_id: String,
    pub(crate) starting_bid: u64,
    #[serde(default)]
    pub(crate) min_verification_tier: VerificationTier,
    pub(crate) starts_at: chrono::DateTime<chrono::Utc>,
    pub(crate) ends_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaceBidRequest {
    pub(crate) amount: u64,
}

pub(crate) async fn create_auction_handler<S, P, T>(
    State(state): State<AuctionRouterState<S, P, T>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<CreateAuctionRequest>,
) -> Response
where
    S: AuctionStore + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    let operator = match state.auth.require_staff(&headers) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    let draft = AuctionDraft {
        vehicle_id: VehicleId(payload.vehicle_id),
        starting_bid: payload.starting_bid,
        min_verification_tier: payload.min_verification_tier,
        starts_at: payload.starts_at,
        ends_at: payload.ends_at,
    };

    match state.engine.create_auction(&operator.user_id, draft) {
        Ok(auction) => (StatusCode::CREATED, axum::Json(auction)).into_response(),
        // The creation endpoint reports both missing and unavailable vehicles
        // as a bad request rather than a 404.
        Err(
            err @ (AuctionError::VehicleNotFound { .. } | AuctionError::VehicleNotAvailable { .. }),
        ) => business_rule_response(err),
        Err(other) => auction_error_response(other),
    }
}

pub(crate) async fn live_auctions_handler<S, P, T>(
    State(state): State<AuctionRouterState<S, P, T>>,
) -> Response
where
    S: AuctionStore + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    match state.engine.live_auctions() {
        Ok(auctions) => (StatusCode::OK, axum::Json(auctions)).into_response(),
        Err(err) => auction_error_response(err),
    }
}

pub(crate) async fn get_auction_handler<S, P, T>(
    State(state): State<AuctionRouterState<S, P, T>>,
    Path(auction_id): Path<String>,
) -> Response
where
    S: AuctionStore + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    match state.engine.get_auction(&AuctionId(auction_id)) {
        Ok(auction) => (StatusCode::OK, axum::Json(auction)).into_response(),
        Err(err) => auction_error_response(err),
    }
}

pub(crate) async fn bid_history_handler<S, P, T>(
    State(state): State<AuctionRouterState<S, P, T>>,
    Path(auction_id): Path<String>,
) -> Response
where
    S: AuctionStore + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    match state.engine.bid_history(&AuctionId(auction_id)) {
        Ok(bids) => (StatusCode::OK, axum::Json(bids)).into_response(),
        Err(err) => auction_error_response(err),
    }
}

pub(crate) async fn place_bid_handler<S, P, T>(
    State(state): State<AuctionRouterState<S, P, T>>,
    headers: HeaderMap,
    Path(auction_id): Path<String>,
    axum::Json(payload): axum::Json<PlaceBidRequest>,
) -> Response
where
    S: AuctionStore + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    let bidder = match state.auth.identify(&headers) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    match state
        .engine
        .place_bid(&bidder.user_id, &AuctionId(auction_id), payload.amount)
    {
        Ok(bid) => (StatusCode::CREATED, axum::Json(bid)).into_response(),
        Err(err) => auction_error_response(err),
    }
}

fn business_rule_response(err: AuctionError) -> Response {
    let payload = json!({ "message": err.to_string() });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn auction_error_response(err: AuctionError) -> Response {
    match err {
        AuctionError::AuctionNotFound { .. }
        | AuctionError::VehicleNotFound { .. }
        | AuctionError::BidderProfileMissing { .. } => {
            let payload = json!({ "message": err.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        AuctionError::Directory(DirectoryError::NotFound) => {
            let payload = json!({ "message": "Bidder profile not found." });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        AuctionError::VehicleNotAvailable { .. }
        | AuctionError::AuctionNotLive { .. }
        | AuctionError::BidTooLow { .. }
        | AuctionError::TierInsufficient { .. } => business_rule_response(err),
        AuctionError::Store(AuctionStoreError::BidBelowCurrent { current_bid }) => {
            business_rule_response(AuctionError::BidTooLow { current_bid })
        }
        other => {
            let payload = json!({
                "message": "An unexpected error occurred",
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
