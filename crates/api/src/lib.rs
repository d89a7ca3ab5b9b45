//! HTTP API server composing the item, order and payment services.
//!
//! One binary hosts all three services over a shared event bus, with
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use choreography::{Items, Orders, Payments, Platform, Stores};
use domain::InMemoryPaymentGateway;
use event_bus::InMemoryEventBus;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, StoreBackend};
use error::StartupError;

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub items: Arc<Items>,
    pub orders: Arc<Orders>,
    pub payments: Arc<Payments>,
}

impl AppState {
    pub fn new(platform: &Platform) -> Self {
        Self {
            items: Arc::clone(&platform.items),
            orders: Arc::clone(&platform.orders),
            payments: Arc::clone(&platform.payments),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/items",
            post(routes::items::create).get(routes::items::list),
        )
        .route(
            "/items/{id}",
            put(routes::items::update).get(routes::items::show),
        )
        .route("/orders", get(routes::orders::list))
        .route(
            "/orders/{id}",
            post(routes::orders::create)
                .get(routes::orders::show)
                .delete(routes::orders::cancel),
        )
        .route("/payments/{id}", post(routes::payments::create))
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

/// Opens the configured store backend and wires the services over a fresh
/// bus.
pub async fn build_platform(config: &Config) -> Result<Platform, StartupError> {
    let stores = match config.store_backend {
        StoreBackend::Memory => Stores::in_memory(),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(StartupError::MissingDatabaseUrl)?;
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;
            Stores::postgres(pool).await?
        }
    };

    let bus = InMemoryEventBus::new(config.bus_config());
    Ok(Platform::new(
        stores,
        Arc::new(bus),
        Arc::new(InMemoryPaymentGateway::new()),
    ))
}
