//! API request and response data models.
//!
//! Data structures used for HTTP request deserialization and response
//! serialization. These define the public API contract and are distinct from
//! the store records in [`crate::store::models`], so the API and the storage
//! representation can evolve independently. All models carry `utoipa`
//! annotations for the generated OpenAPI document.

pub mod assistant;
pub mod backlog;
pub mod pagination;
