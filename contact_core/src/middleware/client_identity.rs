//! Caller identity derived from proxy forwarding headers

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

/// Identity used when no forwarding header is present.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Headers consulted in order. Edge-set headers come first; none are verified,
/// so the result is only as trustworthy as the proxy in front of the server.
pub const FORWARDING_HEADERS: [&str; 4] = [
    "x-forwarded-for",
    "x-real-ip",
    "cf-connecting-ip",
    "x-vercel-forwarded-for",
];

pub fn client_identity(headers: &HeaderMap) -> String {
    FORWARDING_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_IDENTITY)
        .to_string()
}

/// Extractor wrapping [`client_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIdentity(client_identity(&parts.headers)))
    }
}
