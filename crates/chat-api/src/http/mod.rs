use std::collections::HashSet;
use std::net::IpAddr;

use axum::routing::{get, post};
use axum::{Router, middleware};
use booking::booking::BookingEngine;

mod chat;
mod errors;
mod health;
mod observability;
mod rate_limit;

pub use rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub engine: BookingEngine,
    pub rate_limiter: RateLimiter,
    pub trusted_proxy_ips: HashSet<IpAddr>,
}

pub fn build_router(app_state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/api/chat", post(chat::chat))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit::chat_rate_limit_middleware,
        ))
        .with_state(app_state.clone());

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .with_state(app_state)
        .merge(chat_routes)
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
}
