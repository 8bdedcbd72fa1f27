use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::directory::{DirectoryError, ProfileDirectory, UserId, VerificationTier};

use super::domain::{
    Auction, AuctionDraft, AuctionId, AuctionStatus, Bid, BidId, VehicleId, VehicleStatus,
};
use super::repository::{AuctionStore, AuctionStoreError};

static AUCTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static BID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_auction_id() -> AuctionId {
    let id = AUCTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AuctionId(format!("auc-{id:06}"))
}

fn next_bid_id() -> BidId {
    let id = BID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BidId(format!("bid-{id:06}"))
}

/// Service owning the auction lifecycle and the bid-acceptance protocol.
pub struct AuctionEngine<S, P> {
    store: Arc<S>,
    directory: Arc<P>,
}

impl<S, P> AuctionEngine<S, P>
where
    S: AuctionStore + 'static,
    P: ProfileDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<P>) -> Self {
        Self { store, directory }
    }

    /// Opens an auction for a vehicle that is currently `Available`. The
    /// insert and the vehicle's `Available -> Pending` flip land as one unit
    /// in the store.
    pub fn create_auction(
        &self,
        operator: &UserId,
        draft: AuctionDraft,
    ) -> Result<Auction, AuctionError> {
        let vehicle = self
            .store
            .fetch_vehicle(&draft.vehicle_id)?
            .ok_or_else(|| AuctionError::VehicleNotFound {
                vehicle_id: draft.vehicle_id.clone(),
            })?;

        if vehicle.status != VehicleStatus::Available {
            return Err(AuctionError::VehicleNotAvailable {
                vehicle_id: vehicle.id,
                status: vehicle.status,
            });
        }

        let now = Utc::now();
        let status = if draft.starts_at <= now && now < draft.ends_at {
            AuctionStatus::Live
        } else {
            AuctionStatus::Scheduled
        };

        let auction = Auction {
            id: next_auction_id(),
            vehicle_id: draft.vehicle_id,
            status,
            current_bid: draft.starting_bid,
            bid_count: 0,
            min_verification_tier: draft.min_verification_tier,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            created_at: now,
        };

        let stored = self.store.create_auction(auction)?;
        info!(
            auction = %stored.id.0,
            vehicle = %stored.vehicle_id.0,
            operator = %operator.0,
            status = stored.status.label(),
            "auction created"
        );
        Ok(stored)
    }

    /// All currently live auctions, in the store's documented stable order.
    pub fn live_auctions(&self) -> Result<Vec<Auction>, AuctionError> {
        Ok(self.store.live_auctions()?)
    }

    pub fn get_auction(&self, auction_id: &AuctionId) -> Result<Auction, AuctionError> {
        self.store
            .fetch_auction(auction_id)?
            .ok_or_else(|| AuctionError::AuctionNotFound {
                auction_id: auction_id.clone(),
            })
    }

    /// Full bid history for the auction, newest first.
    pub fn bid_history(&self, auction_id: &AuctionId) -> Result<Vec<Bid>, AuctionError> {
        Ok(self.store.bid_history(auction_id)?)
    }

    /// The bid-acceptance protocol. Eligibility checks run against a read of
    /// the auction; the price comparison is then re-run inside `commit_bid`
    /// so two bidders racing past the same read cannot both land at the old
    /// price.
    pub fn place_bid(
        &self,
        bidder: &UserId,
        auction_id: &AuctionId,
        amount: u64,
    ) -> Result<Bid, AuctionError> {
        let auction = self.get_auction(auction_id)?;

        let profile = self
            .directory
            .fetch(bidder)?
            .ok_or_else(|| AuctionError::BidderProfileMissing {
                user_id: bidder.clone(),
            })?;

        if auction.status != AuctionStatus::Live {
            return Err(AuctionError::AuctionNotLive {
                status: auction.status,
            });
        }

        if amount <= auction.current_bid {
            return Err(AuctionError::BidTooLow {
                current_bid: auction.current_bid,
            });
        }

        if !profile.verification_tier.allows(auction.min_verification_tier) {
            return Err(AuctionError::TierInsufficient {
                required: auction.min_verification_tier,
                held: profile.verification_tier,
            });
        }

        let bid = Bid {
            id: next_bid_id(),
            auction_id: auction.id.clone(),
            bidder_id: bidder.clone(),
            amount,
            verification_tier: profile.verification_tier,
            created_at: Utc::now(),
        };

        let updated = match self.store.commit_bid(bid.clone()) {
            Ok(updated) => updated,
            // Lost the race: surface the winner's price, not our stale read.
            Err(AuctionStoreError::BidBelowCurrent { current_bid }) => {
                return Err(AuctionError::BidTooLow { current_bid });
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            auction = %updated.id.0,
            bidder = %bid.bidder_id.0,
            amount = bid.amount,
            bid_count = updated.bid_count,
            "bid accepted"
        );
        Ok(bid)
    }
}

/// Error raised by the auction engine. Business outcomes stay distinct from
/// store connectivity failures so the boundary maps them to different codes.
#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    #[error("Auction with id {auction_id} not found.", auction_id = .auction_id.0)]
    AuctionNotFound { auction_id: AuctionId },
    #[error("Vehicle with id {vehicle_id} not found.", vehicle_id = .vehicle_id.0)]
    VehicleNotFound { vehicle_id: VehicleId },
    #[error(
        "Vehicle {vehicle_id} is not available for auction (current status: {status}).",
        vehicle_id = .vehicle_id.0,
        status = .status.label()
    )]
    VehicleNotAvailable {
        vehicle_id: VehicleId,
        status: VehicleStatus,
    },
    #[error("Bidder profile for user {user_id} not found.", user_id = .user_id.0)]
    BidderProfileMissing { user_id: UserId },
    #[error("Auction is not live (current status: {status}).", status = .status.label())]
    AuctionNotLive { status: AuctionStatus },
    #[error("Bid must be greater than the current bid of {current_bid}.")]
    BidTooLow { current_bid: u64 },
    #[error(
        "Verification tier {held} does not meet the auction minimum of {required}.",
        held = .held.label(),
        required = .required.label()
    )]
    TierInsufficient {
        required: VerificationTier,
        held: VerificationTier,
    },
    #[error(transparent)]
    Store(#[from] AuctionStoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
