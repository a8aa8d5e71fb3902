use crate::{
    AppState,
    handlers::{hospitals, specialties, testimonials, treatments},
};
use axum::{
    Router,
    routing::{delete, patch, post, put},
};

/// Admin Router Module
///
/// Directory structure and moderation: hospitals, specialties, their assignments,
/// featured treatments and testimonial approval. Wrapped in `authenticate` followed by
/// `require_roles(ADMIN_ONLY)`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/hospitals", post(hospitals::create_hospital))
        .route(
            "/hospitals/{id}",
            put(hospitals::update_hospital).delete(hospitals::delete_hospital),
        )
        .route(
            "/hospitals/{id}/specialties",
            post(hospitals::attach_specialties),
        )
        .route(
            "/hospitals/{id}/specialties/{specialty_id}",
            delete(hospitals::detach_specialty),
        )
        .route("/specialties", post(specialties::create_specialty))
        .route(
            "/specialties/{id}",
            put(specialties::update_specialty).delete(specialties::delete_specialty),
        )
        .route(
            "/treatments/{id}/toggle-popular",
            patch(treatments::toggle_popular),
        )
        .route(
            "/testimonials/{id}/approve",
            patch(testimonials::approve_testimonial),
        )
}
