pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use handlers::AppState;

pub fn create_app(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout));

    let user_routes = Router::new()
        .route("/me", get(handlers::user::me))
        .route(
            "/api-key",
            get(handlers::user::get_api_key)
                .post(handlers::user::create_api_key)
                .delete(handlers::user::delete_api_key),
        )
        .route("/usage", get(handlers::user::usage))
        .route("/plan", post(handlers::user::change_plan));

    let box_routes = Router::new()
        .route("/action", post(handlers::review::apply_action))
        .route("/due", get(handlers::review::due_reviews))
        .route("/:word_id", get(handlers::review::get_review));

    // Every request to these routes is counted before the handler runs.
    let word_routes = Router::new()
        .route("/:word", get(handlers::words::lookup_word))
        .route("/id/:word_id", get(handlers::words::lookup_word_by_id))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::quota::track_usage,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/user", user_routes)
        .nest("/box", box_routes)
        .nest("/words", word_routes);

    Router::new()
        .route("/health", get(handlers::health::liveness))
        .route("/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
