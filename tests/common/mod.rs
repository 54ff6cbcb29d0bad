#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use machshop_genealogy::{
    app_router,
    config::AppConfig,
    db::{self, DbConfig},
    migrator,
    models::{Part, PartType, SerializedPart},
    repositories::{GenealogyStore, InMemoryGenealogyStore},
    services::GenealogyService,
    AppState,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub fn test_config() -> AppConfig {
    AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    )
}

/// In-memory genealogy built up one unit and one link at a time.
pub struct Fixture {
    pub store: Arc<InMemoryGenealogyStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryGenealogyStore::new()),
        }
    }

    pub fn service(&self) -> GenealogyService {
        GenealogyService::new(self.store.clone() as Arc<dyn GenealogyStore>)
    }

    pub async fn add(&self, part: SerializedPart) -> SerializedPart {
        self.store.insert_part(part.clone()).await;
        part
    }

    pub async fn unit(&self, serial: &str, part_type: PartType) -> SerializedPart {
        let part = Part::new(format!("PN-{serial}"), format!("Part {serial}"), part_type);
        self.add(SerializedPart::new(serial, part)).await
    }

    /// Writes `parent -> component` without validation.
    pub async fn link(&self, parent: &SerializedPart, component: &SerializedPart) {
        self.store.insert_edge(parent.id, component.id).await;
    }

    pub async fn link_ids(&self, parent: Uuid, component: Uuid) {
        self.store.insert_edge(parent, component).await;
    }
}

/// Fresh, migrated in-memory SQLite database. A single connection keeps
/// every query on the same memory database.
pub async fn sqlite_db() -> Arc<DatabaseConnection> {
    let cfg = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let db = db::establish_connection_with_config(&cfg)
        .await
        .expect("failed to open sqlite memory database");
    migrator::run_migrations(&db)
        .await
        .expect("failed to run migrations");
    Arc::new(db)
}

/// Router over an in-memory store, driven with `oneshot`.
pub struct TestApp {
    router: Router,
    pub fixture: Fixture,
}

impl TestApp {
    pub fn new() -> Self {
        let fixture = Fixture::new();
        let state = AppState::new(test_config(), fixture.store.clone());
        Self {
            router: app_router(state),
            fixture,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self.request(Method::GET, uri, None).await;
        (status, body)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self.request(Method::POST, uri, Some(body)).await;
        (status, body)
    }
}
