//! Caller identity.
//!
//! The service runs behind an identity-aware proxy that authenticates the
//! user and stamps their id on every request in a trusted header (name
//! configurable via `auth.user_header`). The [`CurrentUser`] extractor reads
//! that header; there are no sessions, cookies, or passwords in this layer.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::instrument;

use crate::errors::{Error, Result};
use crate::types::UserId;
use crate::AppState;

/// The authenticated caller, as asserted by the upstream proxy.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: UserId,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header_name = &state.config.auth.user_header;

        let value = parts.headers.get(header_name).ok_or(Error::Unauthenticated {
            message: Some(format!("Missing {header_name} header")),
        })?;

        let value = value.to_str().map_err(|_| Error::Unauthenticated {
            message: Some(format!("Invalid {header_name} header")),
        })?;

        let id: UserId = value.parse().map_err(|_| Error::Unauthenticated {
            message: Some(format!("{header_name} header is not a valid user id")),
        })?;

        Ok(CurrentUser { id })
    }
}
