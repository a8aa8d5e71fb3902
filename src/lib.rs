use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, HeaderValue, Method, Uri, header},
    middleware::{self, Next},
};
use serde_json::{Value, json};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod payload;
pub mod repository;
pub mod slug;
pub mod storage;

// Router groups by access level (public, authenticated, staff, admin).
pub mod routes;
use routes::{admin, authenticated, public, staff};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, StorageState};

use auth::{ADMIN_ONLY, STAFF, authenticate, require_roles};
use handlers::{
    auth as auth_handlers, doctors, hospitals, specialties, testimonials, treatments,
};

/// ApiDoc
///
/// OpenAPI document for every `/api` route, served at `/api-docs/openapi.json` and
/// browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        auth_handlers::register, auth_handlers::login, auth_handlers::get_profile,
        auth_handlers::update_profile, auth_handlers::change_password,
        hospitals::list_hospitals, hospitals::get_hospital, hospitals::get_hospital_by_slug,
        hospitals::create_hospital, hospitals::update_hospital, hospitals::delete_hospital,
        hospitals::attach_specialties, hospitals::detach_specialty,
        hospitals::hospital_specialties, hospitals::specialty_combinations,
        hospitals::hospital_specialty_page,
        specialties::list_specialties, specialties::get_specialty,
        specialties::specialty_hospitals, specialties::create_specialty,
        specialties::update_specialty, specialties::delete_specialty,
        doctors::list_doctors, doctors::get_doctor, doctors::create_doctor,
        doctors::update_doctor, doctors::delete_doctor,
        treatments::list_treatments, treatments::popular_treatments, treatments::get_treatment,
        treatments::create_treatment, treatments::update_treatment,
        treatments::delete_treatment, treatments::toggle_popular,
        testimonials::list_testimonials, testimonials::get_testimonial,
        testimonials::create_testimonial, testimonials::update_testimonial,
        testimonials::delete_testimonial, testimonials::approve_testimonial,
    ),
    components(
        schemas(
            models::Role, models::Hospital, models::Specialty, models::HospitalSpecialty,
            models::Doctor, models::Treatment, models::Testimonial, models::HospitalRef,
            models::SpecialtyRef, models::DoctorRef, models::HospitalDetail,
            models::SpecialtyDetail, models::DoctorDetail, models::TreatmentDetail,
            models::TestimonialView, models::HospitalSpecialtyPage,
            models::SpecialtyCombination, models::HospitalWithTreatments,
            models::SpecialtyHospitals, models::Pagination, models::HospitalList,
            models::SpecialtyList, models::DoctorList, models::TreatmentList,
            models::TestimonialList, models::RegisterRequest, models::LoginRequest,
            models::UpdateProfileRequest, models::ChangePasswordRequest, models::UserProfile,
            models::AuthPayload, models::HospitalInput, models::SpecialtyInput,
            models::DoctorInput, models::TreatmentInput, models::TestimonialInput,
            models::AttachSpecialtiesRequest,
        )
    ),
    tags(
        (name = "medcast", description = "Medical tourism directory API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, immutable container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory for tests and demos.
    pub repo: RepositoryState,
    /// Upload sink for entity images.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

// Headroom for the multipart framing and text fields around the largest allowed image.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// create_router
///
/// Assembles the `/api` route groups with their access layers, the static upload
/// directory, health and docs endpoints, then wraps everything in the observability
/// and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // 1. CORS Configuration
    let cors = cors_layer(&config.allowed_origins);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Assembly
    // `route_layer` wraps in reverse order of addition: `authenticate` runs first, then
    // the role check reads the identity it attached.
    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                config.clone(),
                authenticate,
            )),
        )
        .merge(
            staff::staff_routes()
                .route_layer(middleware::from_fn(|request: Request, next: Next| {
                    require_roles(STAFF, request, next)
                }))
                .route_layer(middleware::from_fn_with_state(
                    config.clone(),
                    authenticate,
                )),
        )
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn(|request: Request, next: Next| {
                    require_roles(ADMIN_ONLY, request, next)
                }))
                .route_layer(middleware::from_fn_with_state(
                    config.clone(),
                    authenticate,
                )),
        );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", axum::routing::get(health))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&config.upload.path))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(
            config.upload.max_file_size + BODY_LIMIT_SLACK,
        ))
        .layer(middleware::from_fn_with_state(
            config.clone(),
            error::expose_error_detail,
        ))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// cors_layer
///
/// `*` (or an empty list) opens the API to every origin; otherwise only the listed
/// origins are allowed. Entries that are not valid header values are skipped.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Server is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("Not Found - {}", uri.path()))
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: every log line of a request carries its method, URI
/// and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
