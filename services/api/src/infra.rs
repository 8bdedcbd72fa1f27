use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use drivebid::directory::{
    DirectoryError, Profile, ProfileDirectory, Role, UserId, VerificationStatus, VerificationTier,
};
use drivebid::engines::auction::{
    Auction, AuctionId, AuctionStatus, AuctionStore, AuctionStoreError, Bid, VehicleId,
    VehicleSnapshot, VehicleStatus,
};
use drivebid::engines::verification::{
    AppealStatus, ApplicationId, ApplicationStatus, DocumentVault, StatusChange, VaultError,
    VerificationAppeal, VerificationApplication, VerificationChecklist, VerificationDocument,
    VerificationStore, VerificationStoreError,
};
use drivebid::identity::{Identity, TokenError, TokenVerifier};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Fallback bound for adapters built outside `AppConfig` (the demo).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Bounded acquisition of an adapter's serialization guard. In-memory calls
/// complete synchronously once the lock is held, so the configured request
/// timeout applies to the wait for the guard itself.
fn acquire<'a, T>(
    lock: &'a Mutex<T>,
    timeout: Duration,
    what: &str,
) -> Result<MutexGuard<'a, T>, String> {
    let deadline = Instant::now() + timeout;
    loop {
        match lock.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(_)) => return Err(format!("{what} mutex poisoned")),
            Err(TryLockError::WouldBlock) if Instant::now() >= deadline => {
                return Err(format!(
                    "{what} request timed out after {}ms",
                    timeout.as_millis()
                ))
            }
            Err(TryLockError::WouldBlock) => std::thread::yield_now(),
        }
    }
}

#[derive(Default)]
struct AuctionTables {
    vehicles: HashMap<VehicleId, VehicleSnapshot>,
    auctions: BTreeMap<AuctionId, Auction>,
    bids: Vec<Bid>,
}

/// Auction adapter for single-process deployments. A single mutex spans all
/// tables so `create_auction` and `commit_bid` are atomic as the trait
/// requires.
#[derive(Clone)]
pub(crate) struct InMemoryAuctionStore {
    inner: Arc<Mutex<AuctionTables>>,
    request_timeout: Duration,
}

impl Default for InMemoryAuctionStore {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl InMemoryAuctionStore {
    pub(crate) fn new(request_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuctionTables::default())),
            request_timeout,
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, AuctionTables>, AuctionStoreError> {
        acquire(&self.inner, self.request_timeout, "auction store")
            .map_err(AuctionStoreError::Unavailable)
    }

    pub(crate) fn insert_vehicle(&self, vehicle: VehicleSnapshot) {
        let mut inner = self.inner.lock().expect("auction store mutex poisoned");
        inner.vehicles.insert(vehicle.id.clone(), vehicle);
    }
}

impl AuctionStore for InMemoryAuctionStore {
    fn fetch_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleSnapshot>, AuctionStoreError> {
        let inner = self.guard()?;
        Ok(inner.vehicles.get(id).cloned())
    }

    fn create_auction(&self, auction: Auction) -> Result<Auction, AuctionStoreError> {
        let mut inner = self.guard()?;

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
        let inner = self.guard()?;
        Ok(inner.auctions.get(id).cloned())
    }

    fn live_auctions(&self) -> Result<Vec<Auction>, AuctionStoreError> {
        let inner = self.guard()?;
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
        let inner = self.guard()?;
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
        let mut inner = self.guard()?;

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

#[derive(Clone)]
pub(crate) struct InMemoryVerificationStore {
    inner: Arc<Mutex<VerificationTables>>,
    request_timeout: Duration,
}

impl Default for InMemoryVerificationStore {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl InMemoryVerificationStore {
    pub(crate) fn new(request_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VerificationTables::default())),
            request_timeout,
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, VerificationTables>, VerificationStoreError> {
        acquire(&self.inner, self.request_timeout, "verification store")
            .map_err(VerificationStoreError::Unavailable)
    }
}

impl VerificationStore for InMemoryVerificationStore {
    fn insert_application(
        &self,
        application: VerificationApplication,
    ) -> Result<VerificationApplication, VerificationStoreError> {
        let mut inner = self.guard()?;
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
        let inner = self.guard()?;
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
        let inner = self.guard()?;
        Ok(inner.applications.get(application_id).cloned())
    }

    fn pending_applications(
        &self,
    ) -> Result<Vec<VerificationApplication>, VerificationStoreError> {
        let inner = self.guard()?;
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
        let mut inner = self.guard()?;
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
        let mut inner = self.guard()?;
        inner
            .checklists
            .insert(checklist.application_id.clone(), checklist.clone());
        Ok(checklist)
    }

    fn fetch_checklist(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<VerificationChecklist>, VerificationStoreError> {
        let inner = self.guard()?;
        Ok(inner.checklists.get(application_id).cloned())
    }

    fn insert_document(
        &self,
        document: VerificationDocument,
    ) -> Result<VerificationDocument, VerificationStoreError> {
        let mut inner = self.guard()?;
        inner.documents.push(document.clone());
        Ok(document)
    }

    fn insert_appeal(
        &self,
        appeal: VerificationAppeal,
    ) -> Result<VerificationAppeal, VerificationStoreError> {
        let mut inner = self.guard()?;
        inner.appeals.push(appeal.clone());
        Ok(appeal)
    }

    fn pending_appeals(&self) -> Result<Vec<VerificationAppeal>, VerificationStoreError> {
        let inner = self.guard()?;
        Ok(inner
            .appeals
            .iter()
            .filter(|appeal| appeal.status == AppealStatus::Submitted)
            .cloned()
            .collect())
    }
}

/// Document vault keeping uploads in process memory, keyed by the
/// bucket-relative path.
#[derive(Clone)]
pub(crate) struct InMemoryDocumentVault {
    objects: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
    request_timeout: Duration,
}

impl Default for InMemoryDocumentVault {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl InMemoryDocumentVault {
    pub(crate) fn new(request_timeout: Duration) -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            request_timeout,
        }
    }

    pub(crate) fn object_count(&self) -> usize {
        self.objects.lock().expect("vault mutex poisoned").len()
    }
}

impl DocumentVault for InMemoryDocumentVault {
    fn store(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), VaultError> {
        let mut guard = acquire(&self.objects, self.request_timeout, "document vault")
            .map_err(VaultError::Unavailable)?;
        guard.insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileDirectory {
    profiles: Arc<Mutex<HashMap<UserId, Profile>>>,
}

impl InMemoryProfileDirectory {
    pub(crate) fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.user_id.clone(), profile);
    }

    pub(crate) fn fetch_profile(&self, user_id: &UserId) -> Option<Profile> {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .get(user_id)
            .cloned()
    }
}

impl ProfileDirectory for InMemoryProfileDirectory {
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

/// Token verifier backed by a static token table. Suitable for local
/// development only; production deployments supply a JWT-backed verifier.
#[derive(Default, Clone)]
pub(crate) struct StaticTokenVerifier {
    tokens: Arc<Mutex<HashMap<String, UserId>>>,
}

impl StaticTokenVerifier {
    pub(crate) fn register(&self, token: &str, user_id: UserId) {
        self.tokens
            .lock()
            .expect("verifier mutex poisoned")
            .insert(token.to_string(), user_id);
    }
}

impl TokenVerifier for StaticTokenVerifier {
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


/// Seeds the in-memory deployment with an admin, two customers, and a pair
/// of sellable vehicles so the surface is usable straight after startup.
pub(crate) fn seed_marketplace(
    directory: &InMemoryProfileDirectory,
    verifier: &StaticTokenVerifier,
    auctions: &InMemoryAuctionStore,
) {
    let seeds = [
        ("admin-token", "admin-1", Role::Admin, VerificationTier::None),
        (
            "buyer-basic-token",
            "buyer-1",
            Role::Customer,
            VerificationTier::Basic,
        ),
        (
            "buyer-new-token",
            "buyer-2",
            Role::Customer,
            VerificationTier::None,
        ),
    ];

    for (token, user, role, tier) in seeds {
        let user_id = UserId(user.to_string());
        directory.insert(Profile {
            user_id: user_id.clone(),
            role,
            verification_tier: tier,
            verification_status: if tier == VerificationTier::None {
                VerificationStatus::Unverified
            } else {
                VerificationStatus::Verified
            },
        });
        verifier.register(token, user_id);
    }

    for vehicle in ["veh-falcon", "veh-meridian"] {
        auctions.insert_vehicle(VehicleSnapshot {
            id: VehicleId(vehicle.to_string()),
            status: VehicleStatus::Available,
        });
    }
}
