//! # sprintctl: AI-usage governance and delivery analytics
//!
//! `sprintctl` is the backend control layer of an agile project-tracking
//! platform. It owns the pieces of the product that need server-side policy:
//! governing access to paid AI providers (per-user daily quotas, a response
//! cache, an append-only usage ledger) and computing delivery analytics
//! (sprint metrics, velocity, burndown, epic progress, workload) from the
//! team's sprint and story records.
//!
//! ## Request Flow
//!
//! An assistant call (`POST /api/v1/assistant/chat`) runs the governance
//! pipeline in order: feature toggles and provider/model validation first,
//! then the daily rate-limit check, then a response-cache lookup, and only
//! then the paid provider call. Every provider attempt is recorded in the
//! usage log; successful responses are cached and counted against the
//! caller's daily quota. The quota is a soft cap: the check and the increment
//! are separate store operations by design (see [`usage`]).
//!
//! Analytics calls (`GET /api/v1/sprints/{id}/metrics` and friends) are pure
//! reads recomputed from current store state on every request.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer. Persistence goes through the [`store::Store`] trait with a
//! PostgreSQL implementation for production and an in-memory implementation
//! for tests. Caller identity arrives in a trusted proxy header; there is no
//! session machinery here.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use sprintctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = sprintctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     sprintctl::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod metrics;
mod openapi;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod usage;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use bon::Builder;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::ai::AiClients;
use crate::metrics::AiMetrics;
use crate::openapi::ApiDoc;
use crate::store::{postgres::PgStore, Store};

pub use config::Config;
pub use types::{EpicId, ProjectId, SprintId, StoryId, UserId};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub ai_clients: Arc<AiClients>,
    pub metrics: Option<AiMetrics>,
}

/// Get the sprintctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    if config.cors.allowed_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::new().allow_origin(Any));
    }

    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }

    Ok(CorsLayer::new().allow_origin(origins))
}

/// Build the main application router with all endpoints and middleware.
///
/// This constructs the complete Axum router with:
/// - Assistant routes (chat, quota, usage history)
/// - Backlog routes (sprints, stories, epics)
/// - Analytics routes (metrics, burndown, velocity, progress, workload)
/// - OpenAPI document and interactive docs
/// - Optional Prometheus metrics endpoint
/// - CORS and tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Assistant
        .route("/assistant/chat", post(api::handlers::assistant::chat))
        .route("/assistant/rate-limit", get(api::handlers::assistant::rate_limit))
        .route("/assistant/usage", get(api::handlers::assistant::list_usage))
        // Sprints
        .route("/sprints", post(api::handlers::backlog::create_sprint))
        .route("/sprints", get(api::handlers::backlog::list_sprints))
        .route("/sprints/{id}", get(api::handlers::backlog::get_sprint))
        .route("/sprints/{id}/metrics", get(api::handlers::analytics::sprint_metrics))
        .route("/sprints/{id}/burndown", get(api::handlers::analytics::burndown))
        // Stories
        .route("/stories", post(api::handlers::backlog::create_story))
        .route("/stories", get(api::handlers::backlog::list_stories))
        .route("/stories/{id}", patch(api::handlers::backlog::update_story))
        // Epics
        .route("/epics", post(api::handlers::backlog::create_epic))
        .route("/epics", get(api::handlers::backlog::list_epics))
        // Project analytics
        .route("/projects/{id}/velocity", get(api::handlers::analytics::velocity))
        .route("/projects/{id}/team-metrics", get(api::handlers::analytics::team_metrics))
        .route("/projects/{id}/epic-progress", get(api::handlers::analytics::epic_progress))
        .route("/projects/{id}/workload", get(api::handlers::analytics::workload));

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .route(
            "/api-docs/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );

    // Expose the Prometheus registry when metrics are enabled
    if let Some(metrics) = state.metrics.clone() {
        router = router.route(
            "/internal/metrics",
            get(move || async move {
                use prometheus::{Encoder, TextEncoder};

                let encoder = TextEncoder::new();
                let families = metrics.registry().gather();
                let mut buffer = vec![];
                encoder.encode(&families, &mut buffer).unwrap();
                String::from_utf8_lossy(&buffer).to_string()
            }),
        );
    }

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.with_state(state).layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled application: a bound listener plus the configured router.
pub struct Application {
    router: Router,
    listener: TcpListener,
}

impl Application {
    /// Connect to PostgreSQL, run migrations, and assemble the router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.pool.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.database.pool.acquire_timeout_secs))
            .connect(&config.database.url)
            .await?;

        migrator().run(&pool).await?;

        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
        Self::with_store(config, store).await
    }

    /// Assemble the application over an existing store. Used directly by
    /// tests with the in-memory backend.
    pub async fn with_store(config: Config, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        let metrics = if config.enable_metrics {
            let registry = prometheus::Registry::new();
            Some(AiMetrics::new(&registry).map_err(|e| anyhow::anyhow!("Failed to create AI metrics: {e}"))?)
        } else {
            None
        };

        let ai_clients = Arc::new(AiClients::from_config(&config.ai));

        let bind_address = config.bind_address();

        let state = AppState::builder()
            .store(store)
            .config(config)
            .ai_clients(ai_clients)
            .maybe_metrics(metrics)
            .build();

        let router = build_router(state)?;

        let listener = TcpListener::bind(&bind_address).await?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self { router, listener })
    }

    /// Address the listener is bound to (useful when binding port 0).
    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the shutdown future resolves.
    pub async fn serve(self, shutdown: impl std::future::Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router).with_graceful_shutdown(shutdown).await?;
        Ok(())
    }
}
