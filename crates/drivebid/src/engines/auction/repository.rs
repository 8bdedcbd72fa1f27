use super::domain::{Auction, AuctionId, Bid, VehicleId, VehicleSnapshot, VehicleStatus};

/// Storage abstraction over the auction, bid, and vehicle tables.
///
/// The two mutating calls are each a single atomic unit: `create_auction`
/// serializes the vehicle-status flip with the insert, and `commit_bid`
/// serializes the price comparison with the write so concurrent bidders race
/// on the store, not in the engine.
pub trait AuctionStore: Send + Sync {
    fn fetch_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleSnapshot>, AuctionStoreError>;

    /// Inserts the auction and flips the vehicle from `Available` to
    /// `Pending` in one unit, re-checking availability under the same guard.
    fn create_auction(&self, auction: Auction) -> Result<Auction, AuctionStoreError>;

    fn fetch_auction(&self, id: &AuctionId) -> Result<Option<Auction>, AuctionStoreError>;

    /// All auctions currently live, ordered by `starts_at` then id so pages
    /// render stably.
    fn live_auctions(&self) -> Result<Vec<Auction>, AuctionStoreError>;

    /// Full bid history for an auction, newest first.
    fn bid_history(&self, id: &AuctionId) -> Result<Vec<Bid>, AuctionStoreError>;

    /// Conditionally appends the bid: re-checks `bid.amount` against the
    /// auction's `current_bid` under the store's serialization guard, then
    /// records the bid, raises `current_bid`, and increments `bid_count`.
    /// A concurrent loser observes `BidBelowCurrent` carrying the fresh price.
    fn commit_bid(&self, bid: Bid) -> Result<Auction, AuctionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuctionStoreError {
    #[error("auction record already exists")]
    Conflict,
    #[error("auction not found")]
    AuctionNotFound,
    #[error("vehicle not found")]
    VehicleNotFound,
    #[error("vehicle is not available (current status: {status})", status = .status.label())]
    VehicleNotAvailable { status: VehicleStatus },
    #[error("bid is not above the current bid of {current_bid}")]
    BidBelowCurrent { current_bid: u64 },
    #[error("auction store unavailable: {0}")]
    Unavailable(String),
}
