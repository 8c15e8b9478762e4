use crate::ai::AiError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Caller identity missing or unparseable
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Daily AI quota exhausted (soft cap)
    #[error("Too many requests: {message}")]
    TooManyRequests { message: String },

    /// Assistant feature switched off in configuration
    #[error("Feature {feature} is disabled")]
    FeatureDisabled { feature: String },

    /// AI provider layer failure
    #[error(transparent)]
    Provider(#[from] AiError),

    /// Store operation error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::FeatureDisabled { .. } => StatusCode::FORBIDDEN,
            Error::Provider(ai_err) => match ai_err {
                AiError::NotConfigured { .. } | AiError::ModelNotAllowed { .. } => StatusCode::BAD_REQUEST,
                AiError::Http { .. } | AiError::Api { .. } | AiError::EmptyResponse { .. } => StatusCode::BAD_GATEWAY,
            },
            Error::Store(store_err) => match store_err {
                StoreError::NotFound => StatusCode::NOT_FOUND,
                StoreError::UniqueViolation { .. } => StatusCode::CONFLICT,
                StoreError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                StoreError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                StoreError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::TooManyRequests { message } => message.clone(),
            Error::FeatureDisabled { feature } => format!("The {feature} feature is currently disabled"),
            Error::Provider(ai_err) => match ai_err {
                AiError::NotConfigured { provider } => format!("Provider {provider} is not configured"),
                AiError::ModelNotAllowed { provider, model } => format!("Model {model} is not available for provider {provider}"),
                AiError::Http { provider, .. } | AiError::Api { provider, .. } | AiError::EmptyResponse { provider } => {
                    format!("The {provider} provider request failed. Please try again.")
                }
            },
            Error::Store(store_err) => match store_err {
                StoreError::NotFound => "Resource not found".to_string(),
                StoreError::UniqueViolation { .. } => "Resource already exists".to_string(),
                StoreError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                StoreError::CheckViolation { .. } => "Invalid data provided".to_string(),
                StoreError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Store(StoreError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Provider(_) => {
                tracing::warn!("AI provider error: {:#}", self);
            }
            Error::Store(_) => {
                tracing::warn!("Store constraint error: {}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authentication error: {}", self);
            }
            Error::TooManyRequests { .. } | Error::FeatureDisabled { .. } => {
                tracing::info!("Policy rejection: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
