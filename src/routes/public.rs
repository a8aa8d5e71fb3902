use crate::{
    AppState,
    handlers::{auth, doctors, hospitals, specialties, testimonials, treatments},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Read endpoints for the directory and the two credential gateways. Inactive rows are
/// filtered out here unless the optional bearer token belongs to an admin.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // --- Hospitals ---
        .route("/hospitals", get(hospitals::list_hospitals))
        // Static segments win over `{id}`, so these never shadow the id routes.
        .route(
            "/hospitals/specialty-combinations",
            get(hospitals::specialty_combinations),
        )
        .route("/hospitals/slug/{slug}", get(hospitals::get_hospital_by_slug))
        .route("/hospitals/{id}", get(hospitals::get_hospital))
        .route(
            "/hospitals/{id}/specialties",
            get(hospitals::hospital_specialties),
        )
        // GET /hospitals/{hospitalSlug}/{specialtySlug}
        // The first segment shares the `{id}` name with its siblings, as the router requires.
        .route(
            "/hospitals/{id}/{specialty_slug}",
            get(hospitals::hospital_specialty_page),
        )
        // --- Specialties ---
        .route("/specialties", get(specialties::list_specialties))
        .route("/specialties/{id}", get(specialties::get_specialty))
        // GET /specialties/{slug}/hospitals
        .route(
            "/specialties/{id}/hospitals",
            get(specialties::specialty_hospitals),
        )
        // --- Doctors ---
        .route("/doctors", get(doctors::list_doctors))
        .route("/doctors/{id}", get(doctors::get_doctor))
        // --- Treatments ---
        .route("/treatments", get(treatments::list_treatments))
        .route("/treatments/popular", get(treatments::popular_treatments))
        .route("/treatments/{id}", get(treatments::get_treatment))
        // --- Testimonials ---
        .route("/testimonials", get(testimonials::list_testimonials))
        .route("/testimonials/{id}", get(testimonials::get_testimonial))
}
