//! HTTP API server for carts, checkout and orders.
//!
//! A thin axum layer over the domain services and the checkout
//! coordinator, with structured logging (tracing) and Prometheus metrics.
//! Buyers are identified by the `x-buyer-id` header.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::ReservationCoordinator;
use common::Money;
use domain::{CartService, OrderService, TracingNotifier};
use event_store::EventStore;
use inventory::{CatalogError, InMemoryCatalog, InMemoryStockLedger, ProductOffering};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/items", post(routes::cart::add_line::<S>))
        .route(
            "/cart/items/{sku}",
            put(routes::cart::update_line::<S>).delete(routes::cart::remove_line::<S>),
        )
        .route(
            "/orders",
            post(routes::orders::commit::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/orders/{id}/transition",
            post(routes::orders::transition::<S>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/products/{sku}", get(routes::products::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the services over `event_store` and in-memory stock and catalog
/// collaborators, seeding `offerings` into both.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
    offerings: &[ProductOffering],
) -> Result<Arc<AppState<S>>, CatalogError> {
    let ledger = InMemoryStockLedger::from_offerings(offerings);
    let catalog = InMemoryCatalog::from_offerings(offerings)?;
    let retry = config.retry_policy();

    let carts = CartService::new(event_store.clone(), ledger.clone(), catalog.clone())
        .with_retry_policy(retry);
    let orders = OrderService::new(event_store, ledger.clone())
        .with_notifier(Arc::new(TracingNotifier))
        .with_retry_policy(retry);
    let coordinator = ReservationCoordinator::new(
        Arc::new(carts),
        Arc::new(orders),
        ledger.clone(),
        catalog.clone(),
    );

    Ok(Arc::new(AppState {
        coordinator,
        ledger,
        catalog,
    }))
}

/// Application state per `config`, with the demo catalog if enabled.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
) -> Result<Arc<AppState<S>>, CatalogError> {
    let offerings = if config.seed_demo_catalog {
        demo_offerings()
    } else {
        Vec::new()
    };
    create_state(event_store, config, &offerings)
}

/// A small catalog for local runs.
pub fn demo_offerings() -> Vec<ProductOffering> {
    vec![
        ProductOffering::new("PHONE-1", "Smartphone", Money::from_minor(49_900), 5),
        ProductOffering::new("CASE-1", "Phone case", Money::from_minor(990), 40),
        ProductOffering::new("CHARGER-1", "USB-C charger", Money::from_minor(2_490), 15),
        ProductOffering::new("CABLE-1", "USB-C cable, 1 m", Money::from_minor(790), 60),
        ProductOffering::new("EARBUDS-1", "Wireless earbuds", Money::from_minor(12_900), 8),
    ]
}
