//! MachShop genealogy library
//!
//! Lot and serial traceability for manufactured units: forward and backward
//! traces, bounded genealogy graphs and acyclic parent/component edges.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod dto;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::repositories::{GenealogyStore, SeaOrmGenealogyStore};
use crate::services::GenealogyService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub genealogy: Arc<GenealogyService>,
    /// Present when the store is database backed; used by readiness checks
    pub db: Option<Arc<DatabaseConnection>>,
}

impl AppState {
    /// State over an arbitrary store, with graph depths taken from `config`.
    pub fn new(config: AppConfig, store: Arc<dyn GenealogyStore>) -> Self {
        let genealogy = GenealogyService::new(store)
            .with_graph_depths(config.default_graph_depth, config.max_graph_depth)
            .with_fetch_concurrency(config.db_max_connections as usize);
        Self {
            config: Arc::new(config),
            genealogy: Arc::new(genealogy),
            db: None,
        }
    }

    /// State backed by [`SeaOrmGenealogyStore`] on `db`.
    pub fn with_database(config: AppConfig, db: Arc<DatabaseConnection>) -> Self {
        let store: Arc<dyn GenealogyStore> = Arc::new(SeaOrmGenealogyStore::new(db.clone()));
        Self {
            db: Some(db),
            ..Self::new(config, store)
        }
    }
}

/// Full HTTP surface: traceability API, health probes and the OpenAPI document,
/// wrapped in request-id and trace layers.
pub fn app_router(state: AppState) -> Router {
    let router = Router::new()
        .nest(
            "/api/v1/traceability",
            handlers::traceability::traceability_routes(),
        )
        .merge(health::health_routes())
        .merge(openapi::openapi_routes())
        .layer(crate::tracing::configure_http_tracing());
    middleware_helpers::with_request_ids(router).with_state(state)
}
