//! Middleware components for the contact server

pub mod client_identity;
pub mod cors;
pub mod logging;
pub mod rate_limit;
