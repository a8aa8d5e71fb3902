use crate::{
    AppState,
    handlers::{auth, testimonials},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Wrapped in the `authenticate` layer: every handler here receives a verified
/// `AuthUser`, whatever its role.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/profile",
            get(auth::get_profile).put(auth::update_profile),
        )
        .route("/auth/change-password", put(auth::change_password))
        // Patients' stories are accepted from any signed-in account and queued for review.
        .route("/testimonials", post(testimonials::create_testimonial))
}
