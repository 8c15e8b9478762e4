//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Assistant** (`/api/v1/assistant/*`): governed AI chat, quota status,
//!   usage history
//! - **Backlog** (`/api/v1/sprints/*`, `/api/v1/stories/*`, `/api/v1/epics/*`):
//!   sprint/story/epic ingest and reads
//! - **Analytics** (`/api/v1/sprints/{id}/*`, `/api/v1/projects/{id}/*`):
//!   derived delivery metrics
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! Interactive docs are served at `/docs` when the server is running.

pub mod handlers;
pub mod models;
