//! Auction engine: lifecycle, live listings, bid history, and the
//! transactional bid-acceptance protocol.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Auction, AuctionDraft, AuctionId, AuctionStatus, Bid, BidId, VehicleId, VehicleSnapshot,
    VehicleStatus,
};
pub use repository::{AuctionStore, AuctionStoreError};
pub use router::{auction_router, AuctionRouterState};
pub use service::{AuctionEngine, AuctionError};
