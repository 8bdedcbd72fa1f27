use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::{UserId, VerificationTier};

/// Identifier wrapper for auctions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuctionId(pub String);

/// Identifier wrapper for accepted bids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidId(pub String);

/// Identifier wrapper for the externally owned vehicle record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

/// One-directional auction lifecycle. `Cancelled` is reachable from
/// `Scheduled` and `Live` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Scheduled,
    Live,
    Ended,
    Cancelled,
}

impl AuctionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AuctionStatus::Scheduled => "scheduled",
            AuctionStatus::Live => "live",
            AuctionStatus::Ended => "ended",
            AuctionStatus::Cancelled => "cancelled",
        }
    }
}

/// Vehicle listing states the auction engine reads. Only the
/// `Available -> Pending` transition is ever written here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    Available,
    Pending,
    Sold,
    Archived,
}

impl VehicleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VehicleStatus::Available => "Available",
            VehicleStatus::Pending => "Pending",
            VehicleStatus::Sold => "Sold",
            VehicleStatus::Archived => "Archived",
        }
    }
}

/// Read view of the externally owned vehicle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub status: VehicleStatus,
}

/// An auction row. `current_bid` only moves through an accepted bid and never
/// decreases while the auction is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub vehicle_id: VehicleId,
    pub status: AuctionStatus,
    pub current_bid: u64,
    pub bid_count: u32,
    pub min_verification_tier: VerificationTier,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Operator-supplied fields for a new auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionDraft {
    pub vehicle_id: VehicleId,
    pub starting_bid: u64,
    #[serde(default)]
    pub min_verification_tier: VerificationTier,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// An accepted bid. Immutable once created; the tier is a snapshot of the
/// bidder at acceptance time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub auction_id: AuctionId,
    pub bidder_id: UserId,
    pub amount: u64,
    pub verification_tier: VerificationTier,
    pub created_at: DateTime<Utc>,
}
