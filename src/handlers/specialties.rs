use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{reject_blank, renamed, required, scope_active, store_upload, visible};
use crate::{
    AppState,
    auth::AuthUser,
    catalog,
    error::{AppError, AppResult},
    models::{
        ApiResponse, NewSpecialty, PageRequest, Specialty, SpecialtyDetail, SpecialtyFilter,
        SpecialtyHospitals, SpecialtyInput, SpecialtyList,
    },
    payload::FormPayload,
    repository::Repository,
    slug::{SlugTable, resolve_unique},
};

// The specialty catalogue is small; one page usually holds all of it.
const SPECIALTY_PAGE_SIZE: i64 = 50;

const NAME_TAKEN: &str = "Specialty with this name already exists";

async fn ensure_name_free(repo: &dyn Repository, name: &str, own_id: Option<i32>) -> AppResult<()> {
    match repo.find_specialty_by_name(name).await? {
        Some(existing) if Some(existing.id) != own_id => {
            Err(AppError::Conflict(NAME_TAKEN.to_string()))
        }
        _ => Ok(()),
    }
}

#[utoipa::path(
    get,
    path = "/api/specialties",
    params(SpecialtyFilter),
    responses((status = 200, description = "Specialties", body = SpecialtyList))
)]
pub async fn list_specialties(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Query(mut filter): Query<SpecialtyFilter>,
) -> AppResult<Json<ApiResponse<SpecialtyList>>> {
    filter.is_active = scope_active(&caller, filter.is_active);
    let page = PageRequest::new(filter.page, filter.limit, SPECIALTY_PAGE_SIZE);

    let (specialties, total) = state.repo.list_specialties(&filter, page).await?;
    Ok(Json(ApiResponse::ok(SpecialtyList {
        specialties,
        pagination: page.describe(total),
    })))
}

/// get_specialty
///
/// [Public Route] One specialty with its active doctors and treatments.
#[utoipa::path(
    get,
    path = "/api/specialties/{id}",
    responses(
        (status = 200, description = "Specialty", body = SpecialtyDetail),
        (status = 404, description = "Specialty not found")
    )
)]
pub async fn get_specialty(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<SpecialtyDetail>>> {
    let repo = state.repo.as_ref();
    let specialty = visible(
        repo.find_specialty(id).await?,
        |s| s.is_active,
        &caller,
        "Specialty not found",
    )?;

    Ok(Json(ApiResponse::ok(catalog::specialty_detail(repo, specialty).await?)))
}

/// specialty_hospitals
///
/// [Public Route] Hospitals offering the specialty, best rated first, each with the
/// treatments it provides in that specialty.
#[utoipa::path(
    get,
    path = "/api/specialties/{slug}/hospitals",
    responses(
        (status = 200, description = "Hospitals", body = SpecialtyHospitals),
        (status = 404, description = "Specialty not found")
    )
)]
pub async fn specialty_hospitals(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<SpecialtyHospitals>>> {
    Ok(Json(ApiResponse::ok(
        catalog::specialty_hospitals(state.repo.as_ref(), &slug).await?,
    )))
}

/// create_specialty
///
/// [Admin Route] Names are unique, exact match. An uploaded image lands in `imageUrl`.
#[utoipa::path(
    post,
    path = "/api/specialties",
    request_body = SpecialtyInput,
    responses(
        (status = 201, description = "Created", body = Specialty),
        (status = 400, description = "Name missing or already taken")
    )
)]
pub async fn create_specialty(
    State(state): State<AppState>,
    FormPayload {
        fields,
        image,
        folder,
    }: FormPayload<SpecialtyInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Specialty>>)> {
    let name = required(fields.name, "Name")?.trim().to_string();
    let repo = state.repo.as_ref();
    ensure_name_free(repo, &name, None).await?;

    let uploaded = store_upload(&state, folder.as_deref(), image.as_ref()).await?;
    let slug = resolve_unique(repo, SlugTable::Specialties, &name, None).await?;

    let specialty = repo
        .create_specialty(NewSpecialty {
            name,
            slug,
            description: fields.description,
            icon: fields.icon,
            clinics_count: fields.clinics_count.unwrap_or(0),
            bg_color: fields.bg_color,
            icon_bg: fields.icon_bg,
            icon_color: fields.icon_color,
            image_url: uploaded.or(fields.image_url),
        })
        .await?;

    tracing::info!(specialty_id = specialty.id, slug = %specialty.slug, "specialty created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Specialty created successfully", specialty)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/specialties/{id}",
    request_body = SpecialtyInput,
    responses(
        (status = 200, description = "Updated", body = Specialty),
        (status = 404, description = "Specialty not found")
    )
)]
pub async fn update_specialty(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    FormPayload {
        mut fields,
        image,
        folder,
    }: FormPayload<SpecialtyInput>,
) -> AppResult<Json<ApiResponse<Specialty>>> {
    reject_blank(&fields.name, "Name")?;

    let repo = state.repo.as_ref();
    let current = repo
        .find_specialty(id)
        .await?
        .ok_or_else(|| AppError::not_found("Specialty not found"))?;

    if let Some(name) = renamed(fields.name.as_deref(), &current.name) {
        ensure_name_free(repo, name, Some(id)).await?;
        fields.slug = Some(resolve_unique(repo, SlugTable::Specialties, name, Some(id)).await?);
    }
    fields.name = fields.name.map(|name| name.trim().to_string());
    if let Some(url) = store_upload(&state, folder.as_deref(), image.as_ref()).await? {
        fields.image_url = Some(url);
    }

    let specialty = repo
        .update_specialty(id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Specialty not found"))?;

    Ok(Json(ApiResponse::with_message("Specialty updated successfully", specialty)))
}

#[utoipa::path(
    delete,
    path = "/api/specialties/{id}",
    responses(
        (status = 200, description = "Deactivated"),
        (status = 404, description = "Specialty not found")
    )
)]
pub async fn delete_specialty(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse>> {
    if !state.repo.soft_delete_specialty(id).await? {
        return Err(AppError::not_found("Specialty not found"));
    }

    tracing::info!(specialty_id = id, "specialty deactivated");
    Ok(Json(ApiResponse::message("Specialty deleted successfully")))
}
