//! Route table

use super::{contact::handle_contact, health::handle_health};
use crate::{middleware::rate_limit::rate_limit_middleware, AppState};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

pub const CONTACT_PATH: &str = "/api/contact";

pub fn create_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            CONTACT_PATH,
            post(handle_contact).route_layer(axum_middleware::from_fn_with_state(
                state.rate_limiter.clone(),
                rate_limit_middleware,
            )),
        )
        .route("/health", get(handle_health))
}
