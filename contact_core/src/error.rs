//! Contact gate error types and their HTTP mapping

use crate::middleware::rate_limit::RateLimitStatus;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContactError>;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";
pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields";
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";
pub const NOT_CONFIGURED_MESSAGE: &str = "SMTP environment variables are not configured";
pub const DISPATCH_FAILED_MESSAGE: &str = "Failed to send message";

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("Rate limit exceeded, window resets in {}s", .0.reset_seconds())]
    RateLimited(RateLimitStatus),

    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Mail transport is not configured: {0}")]
    Configuration(String),

    #[error("Mail dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ContactError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContactError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ContactError::MissingFields | ContactError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ContactError::Configuration(_)
            | ContactError::DispatchFailed(_)
            | ContactError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller. Transport details never leave the server.
    pub fn public_message(&self) -> &'static str {
        match self {
            ContactError::RateLimited(_) => RATE_LIMITED_MESSAGE,
            ContactError::MissingFields => MISSING_FIELDS_MESSAGE,
            ContactError::InvalidBody(_) => INVALID_BODY_MESSAGE,
            ContactError::Configuration(_) => NOT_CONFIGURED_MESSAGE,
            ContactError::DispatchFailed(_) => DISPATCH_FAILED_MESSAGE,
            ContactError::IoError(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        match &self {
            ContactError::RateLimited(_) | ContactError::MissingFields => {}
            ContactError::InvalidBody(msg) => {
                tracing::debug!("Rejected contact body: {}", msg);
            }
            ContactError::Configuration(msg) => {
                tracing::error!("Mail transport misconfigured: {}", msg);
            }
            ContactError::DispatchFailed(cause) => {
                tracing::error!("Contact API error: {}", cause);
            }
            ContactError::IoError(err) => {
                tracing::error!("IO error: {:?}", err);
            }
        }

        let status = self.status_code();
        let body = Json(json!({ "error": self.public_message() }));
        let mut response = (status, body).into_response();

        if let ContactError::RateLimited(limit) = &self {
            limit.apply_headers(response.headers_mut());
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(limit.reset_seconds()),
            );
        }

        response
    }
}
