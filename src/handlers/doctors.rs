use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{
    DEFAULT_PAGE_SIZE, active_hospital, active_specialty, reject_blank, renamed, required,
    scope_active, store_upload, visible,
};
use crate::{
    AppState,
    auth::AuthUser,
    catalog,
    error::{AppError, AppResult},
    models::{
        ApiResponse, Doctor, DoctorDetail, DoctorFilter, DoctorInput, DoctorList, NewDoctor,
        PageRequest,
    },
    payload::FormPayload,
    slug::{SlugTable, resolve_unique},
};

/// list_doctors
///
/// [Public Route] Paged doctor listing, newest first. `search` matches name or
/// specialization; `hospitalId` and `specialtyId` narrow the result.
#[utoipa::path(
    get,
    path = "/api/doctors",
    params(DoctorFilter),
    responses((status = 200, description = "Doctors", body = DoctorList))
)]
pub async fn list_doctors(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Query(mut filter): Query<DoctorFilter>,
) -> AppResult<Json<ApiResponse<DoctorList>>> {
    filter.is_active = scope_active(&caller, filter.is_active);
    let page = PageRequest::new(filter.page, filter.limit, DEFAULT_PAGE_SIZE);

    let (doctors, total) = state.repo.list_doctors(&filter, page).await?;
    Ok(Json(ApiResponse::ok(DoctorList {
        doctors,
        pagination: page.describe(total),
    })))
}

#[utoipa::path(
    get,
    path = "/api/doctors/{id}",
    responses(
        (status = 200, description = "Doctor", body = DoctorDetail),
        (status = 404, description = "Doctor not found")
    )
)]
pub async fn get_doctor(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<DoctorDetail>>> {
    let repo = state.repo.as_ref();
    let doctor = visible(
        repo.find_doctor(id).await?,
        |d| d.is_active,
        &caller,
        "Doctor not found",
    )?;

    Ok(Json(ApiResponse::ok(catalog::doctor_detail(repo, doctor).await?)))
}

/// create_doctor
///
/// [Staff Route] The doctor's hospital and specialty must both exist and be active.
/// `expertise` and `availableDays` may arrive as arrays, JSON text or comma lists.
#[utoipa::path(
    post,
    path = "/api/doctors",
    request_body = DoctorInput,
    responses(
        (status = 201, description = "Created", body = Doctor),
        (status = 404, description = "Hospital or specialty not found")
    )
)]
pub async fn create_doctor(
    State(state): State<AppState>,
    FormPayload {
        fields,
        image,
        folder,
    }: FormPayload<DoctorInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Doctor>>)> {
    let hospital_id = required(fields.hospital_id, "Hospital ID")?;
    let specialty_id = required(fields.specialty_id, "Specialty ID")?;
    let name = required(fields.name, "Name")?.trim().to_string();
    let specialization = required(fields.specialization, "Specialization")?;
    let experience = required(fields.experience, "Experience")?;

    let repo = state.repo.as_ref();
    active_hospital(repo, hospital_id).await?;
    active_specialty(repo, specialty_id).await?;

    let uploaded = store_upload(&state, folder.as_deref(), image.as_ref()).await?;
    let slug = resolve_unique(repo, SlugTable::Doctors, &name, None).await?;

    let doctor = repo
        .create_doctor(NewDoctor {
            hospital_id,
            specialty_id,
            name,
            slug,
            specialization,
            experience,
            patients_treated: fields.patients_treated,
            rating: fields.rating.unwrap_or(0.0),
            reviews: fields.reviews,
            image: uploaded.or(fields.image),
            qualifications: fields.qualifications,
            expertise: fields.expertise.unwrap_or_default(),
            bio: fields.bio,
            email: fields.email,
            phone: fields.phone,
            consultation_fee: fields.consultation_fee,
            available_days: fields.available_days.unwrap_or_default(),
        })
        .await?;

    tracing::info!(doctor_id = doctor.id, hospital_id, specialty_id, "doctor created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Doctor created successfully", doctor)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/doctors/{id}",
    request_body = DoctorInput,
    responses(
        (status = 200, description = "Updated", body = Doctor),
        (status = 404, description = "Doctor, hospital or specialty not found")
    )
)]
pub async fn update_doctor(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    FormPayload {
        mut fields,
        image,
        folder,
    }: FormPayload<DoctorInput>,
) -> AppResult<Json<ApiResponse<Doctor>>> {
    for (value, field) in [
        (&fields.name, "Name"),
        (&fields.specialization, "Specialization"),
        (&fields.experience, "Experience"),
    ] {
        reject_blank(value, field)?;
    }

    let repo = state.repo.as_ref();
    let current = repo
        .find_doctor(id)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor not found"))?;

    if let Some(hospital_id) = fields.hospital_id {
        active_hospital(repo, hospital_id).await?;
    }
    if let Some(specialty_id) = fields.specialty_id {
        active_specialty(repo, specialty_id).await?;
    }

    if let Some(name) = renamed(fields.name.as_deref(), &current.name) {
        fields.slug = Some(resolve_unique(repo, SlugTable::Doctors, name, Some(id)).await?);
    }
    fields.name = fields.name.map(|name| name.trim().to_string());
    if let Some(url) = store_upload(&state, folder.as_deref(), image.as_ref()).await? {
        fields.image = Some(url);
    }

    let doctor = repo
        .update_doctor(id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor not found"))?;

    Ok(Json(ApiResponse::with_message("Doctor updated successfully", doctor)))
}

#[utoipa::path(
    delete,
    path = "/api/doctors/{id}",
    responses(
        (status = 200, description = "Deactivated"),
        (status = 404, description = "Doctor not found")
    )
)]
pub async fn delete_doctor(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse>> {
    if !state.repo.soft_delete_doctor(id).await? {
        return Err(AppError::not_found("Doctor not found"));
    }

    tracing::info!(doctor_id = id, "doctor deactivated");
    Ok(Json(ApiResponse::message("Doctor deleted successfully")))
}
