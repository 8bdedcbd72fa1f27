use crate::cli::ServeArgs;
use crate::infra::{
    seed_marketplace, AppState, InMemoryAuctionStore, InMemoryDocumentVault,
    InMemoryProfileDirectory, InMemoryVerificationStore, StaticTokenVerifier,
};
use crate::routes::marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use drivebid::config::AppConfig;
use drivebid::engines::auction::{AuctionEngine, AuctionRouterState};
use drivebid::engines::verification::{VerificationEngine, VerificationRouterState};
use drivebid::error::AppError;
use drivebid::identity::Authenticator;
use drivebid::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    // The in-memory adapters serve every call from process memory, so the
    // configured timeout bounds how long a call may wait on the store guard.
    let store_timeout = config.store.request_timeout();
    let auction_store = Arc::new(InMemoryAuctionStore::new(store_timeout));
    let verification_store = Arc::new(InMemoryVerificationStore::new(store_timeout));
    let vault = Arc::new(InMemoryDocumentVault::new(store_timeout));
    let directory = Arc::new(InMemoryProfileDirectory::default());
    let verifier = Arc::new(StaticTokenVerifier::default());

    seed_marketplace(&directory, &verifier, &auction_store);

    let auth = Arc::new(Authenticator::new(
        Arc::clone(&verifier),
        Arc::clone(&directory),
    ));
    let auction_engine = Arc::new(AuctionEngine::new(
        Arc::clone(&auction_store),
        Arc::clone(&directory),
    ));
    let verification_engine = Arc::new(VerificationEngine::new(
        Arc::clone(&verification_store),
        Arc::clone(&vault),
        Arc::clone(&directory),
    ));

    let app = marketplace_routes(
        AuctionRouterState {
            engine: auction_engine,
            auth: Arc::clone(&auth),
        },
        VerificationRouterState {
            engine: verification_engine,
            auth,
        },
    )
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "vehicle marketplace backend ready");

    axum::serve(listener, app).await?;
    Ok(())
}
