//! HTTP request handlers for all API endpoints.
//!
//! Axum route handlers organized by resource type. Each handler is
//! responsible for request validation, identity extraction, business logic
//! via the store and service layers, and response serialization.
//!
//! # Handler Modules
//!
//! - [`assistant`]: governed AI chat, quota status, usage history
//! - [`analytics`]: sprint metrics, burndown, velocity, team metrics,
//!   epic progress, workload
//! - [`backlog`]: sprint/story/epic ingest and reads
//!
//! # Authentication
//!
//! All handlers require the caller id stamped by the upstream proxy; see
//! [`crate::auth::CurrentUser`].

pub mod analytics;
pub mod assistant;
pub mod backlog;
