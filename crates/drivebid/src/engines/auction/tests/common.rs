use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap};
use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::directory::{
    DirectoryError, Profile, ProfileDirectory, Role, UserId, VerificationStatus, VerificationTier,
};
use crate::engines::auction::domain::{
    Auction, AuctionDraft, AuctionId, Bid, VehicleId, VehicleSnapshot, VehicleStatus,
};
use crate::engines::auction::repository::{AuctionStore, AuctionStoreError};
use crate::engines::auction::router::{auction_router, AuctionRouterState};
use crate::engines::auction::service::AuctionEngine;
use crate::identity::{Authenticator, Identity, TokenError, TokenVerifier};

#[derive(Default)]
struct StoreInner {
    vehicles: HashMap<VehicleId, VehicleSnapshot>,
    auctions: BTreeMap<AuctionId, Auction>,
    bids: Vec<Bid>,
}

/// In-memory auction store. One mutex guards all three tables so the two
/// mutating calls are atomic, matching the trait contract.
#[derive(Default)]
pub(super) struct MemoryAuctionStore {
    inner: Mutex<StoreInner>,
}

impl MemoryAuctionStore {
    pub(super) fn insert_vehicle(&self, vehicle: VehicleSnapshot) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.vehicles.insert(vehicle.id.clone(), vehicle);
    }

    pub(super) fn vehicle_status(&self, id: &VehicleId) -> Option<VehicleStatus> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.vehicles.get(id).map(|vehicle| vehicle.status)
    }

    pub(super) fn auction_count(&self) -> usize {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.auctions.len()
    }
}

impl AuctionStore for MemoryAuctionStore {
    fn fetch_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleSnapshot>, AuctionStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.vehicles.get(id).cloned())
    }

    fn create_auction(&self, auction: Auction) -> Result<Auction, AuctionStoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");

        let vehicle = inner
            .vehicles
            .get_mut(&auction.vehicle_id)
            .ok_or(AuctionStoreError::VehicleNotFound)?;
        if vehicle.status != VehicleStatus::Available {
            return Err(AuctionStoreError::VehicleNotAvailable {
                status: vehicle.status,
            });
        }
        vehicle.status = VehicleStatus::Pending;

        if inner.auctions.contains_key(&auction.id) {
            return Err(AuctionStoreError::Conflict);
        }
        inner.auctions.insert(auction.id.clone(), auction.clone());
        Ok(auction)
    }

    fn fetch_auction(&self, id: &AuctionId) -> Result<Option<Auction>, AuctionStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.auctions.get(id).cloned())
    }

    fn live_auctions(&self) -> Result<Vec<Auction>, AuctionStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut live: Vec<Auction> = inner
            .auctions
            .values()
            .filter(|auction| auction.status == crate::engines::auction::AuctionStatus::Live)
            .cloned()
            .collect();
        live.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        Ok(live)
    }

    fn bid_history(&self, id: &AuctionId) -> Result<Vec<Bid>, AuctionStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut history: Vec<Bid> = inner
            .bids
            .iter()
            .filter(|bid| &bid.auction_id == id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(history)
    }

    fn commit_bid(&self, bid: Bid) -> Result<Auction, AuctionStoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");

        let auction = inner
            .auctions
            .get_mut(&bid.auction_id)
            .ok_or(AuctionStoreError::AuctionNotFound)?;
        if bid.amount <= auction.current_bid {
            return Err(AuctionStoreError::BidBelowCurrent {
                current_bid: auction.current_bid,
            });
        }

        auction.current_bid = bid.amount;
        auction.bid_count += 1;
        let updated = auction.clone();
        inner.bids.push(bid);
        Ok(updated)
    }
}

/// Store double that fails every call, for 500-path assertions.
pub(super) struct UnavailableStore;

impl AuctionStore for UnavailableStore {
    fn fetch_vehicle(&self, _: &VehicleId) -> Result<Option<VehicleSnapshot>, AuctionStoreError> {
        Err(AuctionStoreError::Unavailable("store offline".to_string()))
    }

    fn create_auction(&self, _: Auction) -> Result<Auction, AuctionStoreError> {
        Err(AuctionStoreError::Unavailable("store offline".to_string()))
    }

    fn fetch_auction(&self, _: &AuctionId) -> Result<Option<Auction>, AuctionStoreError> {
        Err(AuctionStoreError::Unavailable("store offline".to_string()))
    }

    fn live_auctions(&self) -> Result<Vec<Auction>, AuctionStoreError> {
        Err(AuctionStoreError::Unavailable("store offline".to_string()))
    }

    fn bid_history(&self, _: &AuctionId) -> Result<Vec<Bid>, AuctionStoreError> {
        Err(AuctionStoreError::Unavailable("store offline".to_string()))
    }

    fn commit_bid(&self, _: Bid) -> Result<Auction, AuctionStoreError> {
        Err(AuctionStoreError::Unavailable("store offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    profiles: Mutex<HashMap<UserId, Profile>>,
}

impl MemoryDirectory {
    pub(super) fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.user_id.clone(), profile);
    }
}

impl ProfileDirectory for MemoryDirectory {
    fn fetch(&self, user_id: &UserId) -> Result<Option<Profile>, DirectoryError> {
        Ok(self
            .profiles
            .lock()
            .expect("directory mutex poisoned")
            .get(user_id)
            .cloned())
    }

    fn set_verification(
        &self,
        user_id: &UserId,
        tier: VerificationTier,
        status: VerificationStatus,
    ) -> Result<(), DirectoryError> {
        let mut guard = self.profiles.lock().expect("directory mutex poisoned");
        let profile = guard.get_mut(user_id).ok_or(DirectoryError::NotFound)?;
        profile.verification_tier = tier;
        profile.verification_status = status;
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct StaticVerifier {
    tokens: Mutex<HashMap<String, UserId>>,
}

impl StaticVerifier {
    pub(super) fn register(&self, token: &str, user_id: UserId) {
        self.tokens
            .lock()
            .expect("verifier mutex poisoned")
            .insert(token.to_string(), user_id);
    }
}

impl TokenVerifier for StaticVerifier {
    fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.tokens
            .lock()
            .expect("verifier mutex poisoned")
            .get(token)
            .cloned()
            .map(|user_id| Identity { user_id })
            .ok_or(TokenError::Invalid)
    }
}

pub(super) fn profile(user: &str, role: Role, tier: VerificationTier) -> Profile {
    Profile {
        user_id: UserId(user.to_string()),
        role,
        verification_tier: tier,
        verification_status: if tier == VerificationTier::None {
            VerificationStatus::Unverified
        } else {
            VerificationStatus::Verified
        },
    }
}

pub(super) fn available_vehicle(id: &str) -> VehicleSnapshot {
    VehicleSnapshot {
        id: VehicleId(id.to_string()),
        status: VehicleStatus::Available,
    }
}

/// A draft whose window covers now, so creation yields a live auction.
pub(super) fn live_draft(vehicle: &str, starting_bid: u64, tier: VerificationTier) -> AuctionDraft {
    AuctionDraft {
        vehicle_id: VehicleId(vehicle.to_string()),
        starting_bid,
        min_verification_tier: tier,
        starts_at: Utc::now() - Duration::hours(1),
        ends_at: Utc::now() + Duration::days(3),
    }
}

pub(super) struct Fixture {
    pub(super) store: Arc<MemoryAuctionStore>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) verifier: Arc<StaticVerifier>,
    pub(super) engine: Arc<AuctionEngine<MemoryAuctionStore, MemoryDirectory>>,
    pub(super) auth: Arc<Authenticator<StaticVerifier, MemoryDirectory>>,
}

impl Fixture {
    pub(super) fn router(&self) -> axum::Router {
        auction_router(AuctionRouterState {
            engine: Arc::clone(&self.engine),
            auth: Arc::clone(&self.auth),
        })
    }
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(MemoryAuctionStore::default());
    let directory = Arc::new(MemoryDirectory::default());
    let verifier = Arc::new(StaticVerifier::default());
    let engine = Arc::new(AuctionEngine::new(
        Arc::clone(&store),
        Arc::clone(&directory),
    ));
    let auth = Arc::new(Authenticator::new(
        Arc::clone(&verifier),
        Arc::clone(&directory),
    ));

    Fixture {
        store,
        directory,
        verifier,
        engine,
        auth,
    }
}

pub(super) fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().expect("header value"),
    );
    headers
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}
