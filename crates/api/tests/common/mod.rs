//! Shared helpers for integration tests against a real PostgreSQL database.
//!
//! Tests call [`test_pool`] first and return early when `TEST_DATABASE_URL`
//! is not set, so `cargo test` passes on machines without a database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use domain::models::{
    LocalizedText, Organization, OrganizationRecord, Product, ProductRecord, TerminalGroupRecord,
};
use domain::services::{MockActivationNotifier, MockPosGateway};
use domain::store::CatalogStore;
use iiko_bridge_api::app::{create_app, AppState};
use iiko_bridge_api::config::{
    Config, DatabaseConfig, LogFormat, LoggingConfig, NotificationsConfig, PosConfig, ServerConfig,
    SyncConfig,
};
use persistence::db::{self, PoolSettings};
use persistence::PgStore;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

/// Connect and migrate, or `None` when no test database is configured.
pub async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = db::connect(&database_url, &PoolSettings::default())
        .await
        .expect("Failed to connect to test database");

    db::migrate(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
            cors_origins: vec![],
        },
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        },
        pos: PosConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_login: "test-login".to_string(),
            request_timeout_ms: 1_000,
            token_ttl_secs: 3600,
            token_safety_margin_secs: 600,
            order_type_id: None,
            create_order_path: "/api/1/order/create".to_string(),
        },
        sync: SyncConfig::default(),
        notifications: NotificationsConfig::default(),
    }
}

/// Router over PostgreSQL with a scripted POS.
pub fn test_app(pool: PgPool, gateway: MockPosGateway) -> Router {
    let database_url = std::env::var("TEST_DATABASE_URL").unwrap_or_default();
    let state = AppState::new(
        test_config(&database_url),
        pool,
        Arc::new(gateway),
        Arc::new(MockActivationNotifier::new()),
    );
    create_app(state)
}

/// Unique external id so tests sharing a database never collide.
pub fn unique_external_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

pub async fn seed_organization(store: &PgStore) -> Organization {
    store
        .upsert_organization(OrganizationRecord {
            external_id: unique_external_id("org"),
            name: "Test Cafe".to_string(),
            country: Some("Uzbekistan".to_string()),
            restaurant_address: None,
            use_uae_addressing: false,
            timezone: Some("Asia/Tashkent".to_string()),
        })
        .await
        .expect("Failed to seed organization")
        .entity
}

pub async fn seed_terminal_group(store: &PgStore, organization_id: Uuid) {
    store
        .upsert_terminal_group(TerminalGroupRecord {
            external_id: unique_external_id("tg"),
            organization_id,
            name: "Main hall".to_string(),
        })
        .await
        .expect("Failed to seed terminal group");
}

pub async fn seed_product(store: &PgStore, organization_id: Uuid, name: &str, price: i64) -> Product {
    store
        .upsert_product(ProductRecord {
            external_id: unique_external_id("product"),
            organization_id,
            group_id: None,
            name: LocalizedText::uniform(name),
            description: LocalizedText::default(),
            price: Decimal::from(price),
            images: vec![],
        })
        .await
        .expect("Failed to seed product")
        .entity
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send a request and return the status with the parsed JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (axum::http::StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
