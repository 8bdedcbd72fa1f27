//! Shared doubles and fixtures for the workflow tests. Each adapter
//! implements one capability trait against plain in-memory tables.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use drivebid::directory::{
    DirectoryError, Profile, ProfileDirectory, Role, UserId, VerificationStatus, VerificationTier,
};
use drivebid::engines::auction::{
    auction_router, Auction, AuctionDraft, AuctionEngine, AuctionId, AuctionRouterState,
    AuctionStatus, AuctionStore, AuctionStoreError, Bid, VehicleId, VehicleSnapshot, VehicleStatus,
};
use drivebid::engines::verification::{
    verification_router, AppealStatus, ApplicationId, ApplicationStatus, DocumentVault,
    StatusChange, VaultError, VerificationAppeal, VerificationApplication, VerificationChecklist,
    VerificationDocument, VerificationEngine, VerificationRouterState, VerificationStore,
    VerificationStoreError,
};
use drivebid::identity::{Authenticator, Identity, TokenError, TokenVerifier};

#[derive(Default)]
struct AuctionTables {
    vehicles: HashMap<VehicleId, VehicleSnapshot>,
    auctions: BTreeMap<AuctionId, Auction>,
    bids: Vec<Bid>,
}

/// In-memory auction store. One mutex guards all tables so the mutating
/// calls honor the trait's atomicity contract.
#[derive(Default)]
pub struct MemoryAuctionStore {
    inner: Mutex<AuctionTables>,
}

impl MemoryAuctionStore {
    pub fn insert_vehicle(&self, vehicle: VehicleSnapshot) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.vehicles.insert(vehicle.id.clone(), vehicle);
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
            .filter(|auction| auction.status == AuctionStatus::Live)
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

#[derive(Default)]
struct VerificationTables {
    applications: BTreeMap<ApplicationId, VerificationApplication>,
    checklists: HashMap<ApplicationId, VerificationChecklist>,
    documents: Vec<VerificationDocument>,
    appeals: Vec<VerificationAppeal>,
}

#[derive(Default)]
pub struct MemoryVerificationStore {
    inner: Mutex<VerificationTables>,
}

impl MemoryVerificationStore {
    pub fn document_count(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").documents.len()
    }

    pub fn appeal_count(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").appeals.len()
    }
}

impl VerificationStore for MemoryVerificationStore {
    fn insert_application(
        &self,
        application: VerificationApplication,
    ) -> Result<VerificationApplication, VerificationStoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.applications.contains_key(&application.id) {
            return Err(VerificationStoreError::Conflict);
        }
        if inner
            .applications
            .values()
            .any(|row| row.user_id == application.user_id && row.status.is_active())
        {
            return Err(VerificationStoreError::ActiveApplicationExists);
        }
        inner
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_owned_application(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
    ) -> Result<Option<VerificationApplication>, VerificationStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .applications
            .get(application_id)
            .filter(|application| &application.user_id == user_id)
            .cloned())
    }

    fn fetch_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<VerificationApplication>, VerificationStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.applications.get(application_id).cloned())
    }

    fn pending_applications(
        &self,
    ) -> Result<Vec<VerificationApplication>, VerificationStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .applications
            .values()
            .filter(|application| application.status == ApplicationStatus::Submitted)
            .cloned()
            .collect())
    }

    fn transition_status(
        &self,
        application_id: &ApplicationId,
        allowed_from: &[ApplicationStatus],
        change: StatusChange,
    ) -> Result<VerificationApplication, VerificationStoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let application = inner
            .applications
            .get_mut(application_id)
            .ok_or(VerificationStoreError::NotFound)?;

        if !allowed_from.contains(&application.status) {
            return Err(VerificationStoreError::InvalidTransition {
                from: application.status,
            });
        }

        application.status = change.to;
        application.rejection_reason = change.rejection_reason;
        application.reviewed_at = change.reviewed_at;
        Ok(application.clone())
    }

    fn upsert_checklist(
        &self,
        checklist: VerificationChecklist,
    ) -> Result<VerificationChecklist, VerificationStoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .checklists
            .insert(checklist.application_id.clone(), checklist.clone());
        Ok(checklist)
    }

    fn fetch_checklist(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<VerificationChecklist>, VerificationStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.checklists.get(application_id).cloned())
    }

    fn insert_document(
        &self,
        document: VerificationDocument,
    ) -> Result<VerificationDocument, VerificationStoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.documents.push(document.clone());
        Ok(document)
    }

    fn insert_appeal(
        &self,
        appeal: VerificationAppeal,
    ) -> Result<VerificationAppeal, VerificationStoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.appeals.push(appeal.clone());
        Ok(appeal)
    }

    fn pending_appeals(&self) -> Result<Vec<VerificationAppeal>, VerificationStoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .appeals
            .iter()
            .filter(|appeal| appeal.status == AppealStatus::Submitted)
            .cloned()
            .collect())
    }
}

/// Vault double recording stored paths so tests can assert the namespacing.
#[derive(Default)]
pub struct MemoryVault {
    stored: Mutex<Vec<(String, usize, String)>>,
}

impl MemoryVault {
    pub fn stored(&self) -> Vec<(String, usize, String)> {
        self.stored.lock().expect("vault mutex poisoned").clone()
    }
}

impl DocumentVault for MemoryVault {
    fn store(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), VaultError> {
        self.stored
            .lock()
            .expect("vault mutex poisoned")
            .push((path.to_string(), bytes.len(), content_type.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    profiles: Mutex<HashMap<UserId, Profile>>,
}

impl MemoryDirectory {
    pub fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.user_id.clone(), profile);
    }

    pub fn tier_of(&self, user_id: &UserId) -> Option<VerificationTier> {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .get(user_id)
            .map(|profile| profile.verification_tier)
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
pub struct StaticVerifier {
    tokens: Mutex<HashMap<String, UserId>>,
}

impl StaticVerifier {
    pub fn register(&self, token: &str, user_id: UserId) {
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

pub fn profile(user: &str, role: Role, tier: VerificationTier) -> Profile {
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

pub fn available_vehicle(id: &str) -> VehicleSnapshot {
    VehicleSnapshot {
        id: VehicleId(id.to_string()),
        status: VehicleStatus::Available,
    }
}

/// A draft whose window covers now, so creation yields a live auction.
pub fn live_draft(vehicle: &str, starting_bid: u64, tier: VerificationTier) -> AuctionDraft {
    AuctionDraft {
        vehicle_id: VehicleId(vehicle.to_string()),
        starting_bid,
        min_verification_tier: tier,
        starts_at: Utc::now() - Duration::hours(1),
        ends_at: Utc::now() + Duration::days(3),
    }
}

pub struct AuctionFixture {
    pub store: Arc<MemoryAuctionStore>,
    pub directory: Arc<MemoryDirectory>,
    pub verifier: Arc<StaticVerifier>,
    pub engine: Arc<AuctionEngine<MemoryAuctionStore, MemoryDirectory>>,
    pub auth: Arc<Authenticator<StaticVerifier, MemoryDirectory>>,
}

impl AuctionFixture {
    pub fn new() -> Self {
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

        Self {
            store,
            directory,
            verifier,
            engine,
            auth,
        }
    }

    pub fn router(&self) -> axum::Router {
        auction_router(AuctionRouterState {
            engine: Arc::clone(&self.engine),
            auth: Arc::clone(&self.auth),
        })
    }
}

pub struct VerificationFixture {
    pub store: Arc<MemoryVerificationStore>,
    pub vault: Arc<MemoryVault>,
    pub directory: Arc<MemoryDirectory>,
    pub verifier: Arc<StaticVerifier>,
    pub engine: Arc<VerificationEngine<MemoryVerificationStore, MemoryVault, MemoryDirectory>>,
    pub auth: Arc<Authenticator<StaticVerifier, MemoryDirectory>>,
}

impl VerificationFixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryVerificationStore::default());
        let vault = Arc::new(MemoryVault::default());
        let directory = Arc::new(MemoryDirectory::default());
        let verifier = Arc::new(StaticVerifier::default());
        let engine = Arc::new(VerificationEngine::new(
            Arc::clone(&store),
            Arc::clone(&vault),
            Arc::clone(&directory),
        ));
        let auth = Arc::new(Authenticator::new(
            Arc::clone(&verifier),
            Arc::clone(&directory),
        ));

        Self {
            store,
            vault,
            directory,
            verifier,
            engine,
            auth,
        }
    }

    pub fn router(&self) -> axum::Router {
        verification_router(VerificationRouterState {
            engine: Arc::clone(&self.engine),
            auth: Arc::clone(&self.auth),
        })
    }
}

/// Builds a JSON request, optionally authenticated with a bearer token.
pub fn bearer_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    payload: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&payload).expect("encodes")))
        .expect("request builds")
}

pub async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}
