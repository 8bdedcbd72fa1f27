use crate::infra::{
    seed_marketplace, InMemoryAuctionStore, InMemoryDocumentVault, InMemoryProfileDirectory,
    InMemoryVerificationStore, StaticTokenVerifier,
};
use chrono::{Duration, Utc};
use clap::Args;
use std::sync::Arc;

use drivebid::directory::UserId;
use drivebid::engines::auction::{AuctionDraft, AuctionEngine, VehicleId};
use drivebid::engines::verification::{
    ApplicationType, ChecklistSubmission, DocumentUpload, VerificationEngine,
};
use drivebid::error::AppError;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Starting bid for the demo auction, in whole currency units.
    #[arg(long, default_value_t = 12_000)]
    pub(crate) starting_bid: u64,
    /// Skip the verification portion of the demo.
    #[arg(long)]
    pub(crate) skip_verification: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        starting_bid,
        skip_verification,
    } = args;

    let auction_store = Arc::new(InMemoryAuctionStore::default());
    let verification_store = Arc::new(InMemoryVerificationStore::default());
    let vault = Arc::new(InMemoryDocumentVault::default());
    let directory = Arc::new(InMemoryProfileDirectory::default());
    let verifier = StaticTokenVerifier::default();

    seed_marketplace(&directory, &verifier, &auction_store);

    let admin = UserId("admin-1".to_string());
    let verified_buyer = UserId("buyer-1".to_string());
    let new_buyer = UserId("buyer-2".to_string());

    println!("Vehicle marketplace demo");

    if !skip_verification {
        println!("\nVerification workflow");
        let verification = VerificationEngine::new(
            Arc::clone(&verification_store),
            Arc::clone(&vault),
            Arc::clone(&directory),
        );

        let application = verification
            .submit_application(&new_buyer, ApplicationType::Premium)
            .map_err(|err| AppError::Demo(err.to_string()))?;
        println!(
            "- {} submitted a {} application -> {} ({})",
            application.user_id.0,
            application.application_type.label(),
            application.id.0,
            application.status.label()
        );

        let document = verification
            .upload_document(
                &new_buyer,
                &application.id,
                DocumentUpload {
                    file_name: "bank-statement.pdf".to_string(),
                    document_type: "bank_statement".to_string(),
                    content_type: None,
                    bytes: b"demo statement contents".to_vec(),
                },
            )
            .map_err(|err| AppError::Demo(err.to_string()))?;
        println!(
            "- Stored {} at {} ({} bytes, {} objects in the vault)",
            document.file_name,
            document.file_path,
            document.file_size,
            vault.object_count()
        );

        verification
            .review_application(
                &admin,
                &application.id,
                ChecklistSubmission {
                    identity_verified: true,
                    income_verified: true,
                    address_verified: true,
                    banking_verified: true,
                    background_check_passed: true,
                    notes: Some("demo review".to_string()),
                },
            )
            .map_err(|err| AppError::Demo(err.to_string()))?;

        let approved = verification
            .approve_application(&application.id)
            .map_err(|err| AppError::Demo(err.to_string()))?;
        println!(
            "- {} reviewed and approved application {}",
            admin.0, approved.id.0
        );

        let access = verification
            .access_level(&new_buyer)
            .map_err(|err| AppError::Demo(err.to_string()))?;
        println!(
            "- {} now holds the {} tier (can sell: {})",
            access.user_id.0,
            access.verification_tier.label(),
            access.can_sell
        );
    }

    println!("\nAuction workflow");
    let auctions = AuctionEngine::new(Arc::clone(&auction_store), Arc::clone(&directory));

    let auction = auctions
        .create_auction(
            &admin,
            AuctionDraft {
                vehicle_id: VehicleId("veh-falcon".to_string()),
                starting_bid,
                min_verification_tier: drivebid::directory::VerificationTier::Basic,
                starts_at: Utc::now() - Duration::hours(1),
                ends_at: Utc::now() + Duration::days(3),
            },
        )
        .map_err(|err| AppError::Demo(err.to_string()))?;
    println!(
        "- {} opened auction {} on {} at {} ({})",
        admin.0,
        auction.id.0,
        auction.vehicle_id.0,
        auction.current_bid,
        auction.status.label()
    );

    let first = auctions
        .place_bid(&verified_buyer, &auction.id, starting_bid + 500)
        .map_err(|err| AppError::Demo(err.to_string()))?;
    println!("- {} bid {} -> accepted", first.bidder_id.0, first.amount);

    match auctions.place_bid(&new_buyer, &auction.id, starting_bid + 250) {
        Ok(bid) => println!("- {} bid {} -> accepted", bid.bidder_id.0, bid.amount),
        Err(err) => println!("- {} bid {} -> rejected: {}", new_buyer.0, starting_bid + 250, err),
    }

    match auctions.place_bid(&new_buyer, &auction.id, starting_bid + 1_000) {
        Ok(bid) => println!("- {} bid {} -> accepted", bid.bidder_id.0, bid.amount),
        Err(err) => println!(
            "- {} bid {} -> rejected: {}",
            new_buyer.0,
            starting_bid + 1_000,
            err
        ),
    }

    let history = auctions
        .bid_history(&auction.id)
        .map_err(|err| AppError::Demo(err.to_string()))?;
    println!("- Bid history (newest first):");
    for bid in &history {
        println!("    {} by {} ({})", bid.amount, bid.bidder_id.0, bid.id.0);
    }

    let final_state = auctions
        .get_auction(&auction.id)
        .map_err(|err| AppError::Demo(err.to_string()))?;
    match serde_json::to_string_pretty(&final_state) {
        Ok(json) => println!("- Final auction state:\n{json}"),
        Err(err) => println!("- Final auction state unavailable: {err}"),
    }

    Ok(())
}
