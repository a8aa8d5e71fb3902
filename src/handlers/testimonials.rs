use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{
    DEFAULT_PAGE_SIZE, active_hospital, ensure_active_doctor, is_admin, reject_blank, required,
    scope_active, store_upload, visible,
};
use crate::{
    AppState,
    auth::AuthUser,
    catalog,
    error::{AppError, AppResult},
    models::{
        ApiResponse, NewTestimonial, PageRequest, Testimonial, TestimonialFilter,
        TestimonialInput, TestimonialList, TestimonialView,
    },
    payload::FormPayload,
};

/// list_testimonials
///
/// [Public Route] Public callers only see approved, active stories; admins may filter on
/// `isApproved` and `isActive` to work the moderation queue.
#[utoipa::path(
    get,
    path = "/api/testimonials",
    params(TestimonialFilter),
    responses((status = 200, description = "Testimonials", body = TestimonialList))
)]
pub async fn list_testimonials(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Query(mut filter): Query<TestimonialFilter>,
) -> AppResult<Json<ApiResponse<TestimonialList>>> {
    filter.is_active = scope_active(&caller, filter.is_active);
    if !is_admin(&caller) {
        filter.is_approved = Some(true);
    }
    let page = PageRequest::new(filter.page, filter.limit, DEFAULT_PAGE_SIZE);

    let (testimonials, total) = state.repo.list_testimonials(&filter, page).await?;
    Ok(Json(ApiResponse::ok(TestimonialList {
        testimonials,
        pagination: page.describe(total),
    })))
}

#[utoipa::path(
    get,
    path = "/api/testimonials/{id}",
    responses(
        (status = 200, description = "Testimonial", body = TestimonialView),
        (status = 404, description = "Testimonial not found")
    )
)]
pub async fn get_testimonial(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<TestimonialView>>> {
    let repo = state.repo.as_ref();
    let testimonial = visible(
        repo.find_testimonial(id).await?,
        |t| t.is_active && t.is_approved,
        &caller,
        "Testimonial not found",
    )?;

    Ok(Json(ApiResponse::ok(catalog::testimonial_view(repo, testimonial).await?)))
}

/// create_testimonial
///
/// [Authenticated Route] Stories enter the moderation queue unapproved, whatever the
/// caller sends.
#[utoipa::path(
    post,
    path = "/api/testimonials",
    request_body = TestimonialInput,
    responses(
        (status = 201, description = "Created, pending approval", body = Testimonial),
        (status = 404, description = "Hospital or doctor not found")
    )
)]
pub async fn create_testimonial(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    FormPayload {
        fields,
        image,
        folder,
    }: FormPayload<TestimonialInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Testimonial>>)> {
    let hospital_id = required(fields.hospital_id, "Hospital ID")?;
    let patient_name = required(fields.patient_name, "Patient name")?;
    let treatment = required(fields.treatment, "Treatment")?;
    let rating = fields
        .rating
        .ok_or_else(|| AppError::validation("Rating is required"))?;
    let story = required(fields.story, "Story")?;

    let repo = state.repo.as_ref();
    active_hospital(repo, hospital_id).await?;
    if let Some(doctor_id) = fields.doctor_id {
        ensure_active_doctor(repo, doctor_id).await?;
    }

    let uploaded = store_upload(&state, folder.as_deref(), image.as_ref()).await?;
    let testimonial = repo
        .create_testimonial(NewTestimonial {
            hospital_id,
            doctor_id: fields.doctor_id,
            patient_name,
            age: fields.age,
            country: fields.country,
            treatment,
            rating,
            story,
            image: uploaded.or(fields.image),
            date: fields.date,
        })
        .await?;

    tracing::info!(testimonial_id = testimonial.id, submitted_by = user_id, "testimonial submitted");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Testimonial created successfully and pending approval",
            testimonial,
        )),
    ))
}

#[utoipa::path(
    put,
    path = "/api/testimonials/{id}",
    request_body = TestimonialInput,
    responses(
        (status = 200, description = "Updated", body = Testimonial),
        (status = 404, description = "Testimonial, hospital or doctor not found")
    )
)]
pub async fn update_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    FormPayload {
        mut fields,
        image,
        folder,
    }: FormPayload<TestimonialInput>,
) -> AppResult<Json<ApiResponse<Testimonial>>> {
    for (value, field) in [
        (&fields.patient_name, "Patient name"),
        (&fields.treatment, "Treatment"),
        (&fields.story, "Story"),
    ] {
        reject_blank(value, field)?;
    }

    let repo = state.repo.as_ref();
    repo.find_testimonial(id)
        .await?
        .ok_or_else(|| AppError::not_found("Testimonial not found"))?;

    if let Some(hospital_id) = fields.hospital_id {
        active_hospital(repo, hospital_id).await?;
    }
    if let Some(doctor_id) = fields.doctor_id {
        ensure_active_doctor(repo, doctor_id).await?;
    }
    if let Some(url) = store_upload(&state, folder.as_deref(), image.as_ref()).await? {
        fields.image = Some(url);
    }

    let testimonial = repo
        .update_testimonial(id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Testimonial not found"))?;

    Ok(Json(ApiResponse::with_message(
        "Testimonial updated successfully",
        testimonial,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/testimonials/{id}",
    responses(
        (status = 200, description = "Deactivated"),
        (status = 404, description = "Testimonial not found")
    )
)]
pub async fn delete_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse>> {
    if !state.repo.soft_delete_testimonial(id).await? {
        return Err(AppError::not_found("Testimonial not found"));
    }

    tracing::info!(testimonial_id = id, "testimonial deactivated");
    Ok(Json(ApiResponse::message("Testimonial deleted successfully")))
}

/// approve_testimonial
///
/// [Admin Route] Publishes a story. Approving twice is harmless.
#[utoipa::path(
    patch,
    path = "/api/testimonials/{id}/approve",
    responses(
        (status = 200, description = "Approved", body = Testimonial),
        (status = 404, description = "Testimonial not found")
    )
)]
pub async fn approve_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Testimonial>>> {
    let testimonial = state
        .repo
        .approve_testimonial(id)
        .await?
        .ok_or_else(|| AppError::not_found("Testimonial not found"))?;

    tracing::info!(testimonial_id = id, "testimonial approved");
    Ok(Json(ApiResponse::with_message(
        "Testimonial approved successfully",
        testimonial,
    )))
}
