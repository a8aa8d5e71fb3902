use crate::{
    AppState,
    handlers::{doctors, testimonials, treatments},
};
use axum::{
    Router,
    routing::{post, put},
};

/// Staff Router Module
///
/// Content maintenance for admins and hospital managers. Wrapped in `authenticate`
/// followed by `require_roles(STAFF)`.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/doctors", post(doctors::create_doctor))
        .route(
            "/doctors/{id}",
            put(doctors::update_doctor).delete(doctors::delete_doctor),
        )
        .route("/treatments", post(treatments::create_treatment))
        .route(
            "/treatments/{id}",
            put(treatments::update_treatment).delete(treatments::delete_treatment),
        )
        .route(
            "/testimonials/{id}",
            put(testimonials::update_testimonial).delete(testimonials::delete_testimonial),
        )
}
