//! Larder API Library
//!
//! Movement-ledger based inventory tracking for multi-location restaurant
//! operations: append-only stock movements, derived stock levels and alerts,
//! inter-store transfers, and count reconciliation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tenant;
pub mod tracing;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// All /api/v1 routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/stock", handlers::stock::router())
        .nest("/movements", handlers::movements::router())
        .nest("/counts", handlers::counts::router())
        .nest("/transfers", handlers::transfers::router())
        .merge(handlers::catalog::router())
}

/// Full application router: status/health, the v1 API, Swagger UI, and the
/// tracing/request-id stack. CORS and timeouts are layered on by the binary
/// since they come from config.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "larder-api up" }))
        .merge(handlers::health::router())
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn(tracing::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(tracing::RequestSpanMaker::default()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
