//! Shared helpers for handler tests.
//!
//! Builds the full router over the in-memory store so API tests exercise the
//! same code path as production without a database.

use std::sync::Arc;

use axum_test::TestServer;

use crate::ai::AiClients;
use crate::config::Config;
use crate::store::memory::MemoryStore;
use crate::store::Store;
use crate::types::UserId;
use crate::{build_router, AppState};

/// Header name used by the default test configuration.
pub const USER_HEADER: &str = "x-sprintctl-user";

/// Build a test server over a fresh in-memory store with the given config.
pub fn create_test_app_with_config(config: Config) -> (TestServer, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn Store> = store.clone();
    let ai_clients = Arc::new(AiClients::from_config(&config.ai));

    let state = AppState::builder()
        .store(dyn_store)
        .config(config)
        .ai_clients(ai_clients)
        .build();

    let router = build_router(state).expect("router should build");
    let server = TestServer::new(router).expect("test server should start");

    (server, store)
}

/// Build a test server with default configuration (metrics off, no providers).
pub fn create_test_app() -> (TestServer, Arc<MemoryStore>) {
    let config = Config {
        enable_metrics: false,
        ..Config::default()
    };
    create_test_app_with_config(config)
}

/// A fresh caller id for the trusted proxy header.
pub fn test_user() -> UserId {
    uuid::Uuid::new_v4()
}
