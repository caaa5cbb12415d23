//! Route definitions for the Gatehouse HTTP API.
//!
//! All routes are mounted under `/api`.

use axum::Router;
use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth_routes(&state))
        .merge(health_routes());

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Login, renewal, logout, and the caller's own session.
fn auth_routes(state: &AppState) -> Router<AppState> {
    let parse_token = from_fn_with_state(state.clone(), middleware::auth::parse_token);
    let authenticated = from_fn_with_state(state.clone(), middleware::auth::authenticated);
    let with_user = from_fn_with_state(state.clone(), middleware::auth::authenticated_with_user);

    Router::new()
        .route(
            "/auth/login",
            post(handlers::auth::login)
                .put(handlers::auth::renew)
                .delete(handlers::auth::logout.layer(parse_token.clone())),
        )
        .route("/auth/renew", post(handlers::auth::renew))
        .route(
            "/auth/logout",
            post(handlers::auth::logout.layer(parse_token.clone())),
        )
        .route(
            "/auth/session",
            get(handlers::auth::session
                .layer(authenticated)
                .layer(parse_token.clone())),
        )
        .route(
            "/auth/me",
            get(handlers::auth::me.layer(with_user).layer(parse_token)),
        )
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
