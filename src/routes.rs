// src/routes.rs
use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{handlers, state::SharedState};

pub fn create_routes(state: SharedState) -> Router {
    let media = ServeDir::new(state.media.root());

    Router::new()
        .route("/", get(handlers::index))
        .route("/questions/{question_id}", get(handlers::detail))
        .route("/questions/{question_id}/results", get(handlers::results))
        .route("/questions/{question_id}/vote", post(handlers::vote))
        .route("/register", get(handlers::register_form).post(handlers::register))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout).post(handlers::logout))
        .route("/profile", get(handlers::profile).post(handlers::profile_action))
        .route(
            "/profile/edit",
            get(handlers::edit_profile_form).post(handlers::edit_profile),
        )
        .route("/create", get(handlers::create_form).post(handlers::create))
        .nest_service("/media", media)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
