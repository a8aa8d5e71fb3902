use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{
    DEFAULT_PAGE_SIZE, reject_blank, renamed, required, scope_active, store_upload, visible,
};
use crate::{
    AppState,
    auth::AuthUser,
    catalog,
    error::{AppError, AppResult},
    models::{
        ApiResponse, AttachSpecialtiesRequest, Hospital, HospitalDetail, HospitalFilter,
        HospitalInput, HospitalList, HospitalSpecialtyPage, NewHospital, PageRequest, Specialty,
        SpecialtyCombination,
    },
    payload::{FormPayload, ValidatedJson},
    slug::{SlugTable, resolve_unique},
};

const DEFAULT_COUNTRY: &str = "India";

/// list_hospitals
///
/// [Public Route] Paged hospital listing, newest first. `search` matches name, location
/// or the specialty summary; `city` is an exact, case-insensitive match.
#[utoipa::path(
    get,
    path = "/api/hospitals",
    params(HospitalFilter),
    responses((status = 200, description = "Hospitals", body = HospitalList))
)]
pub async fn list_hospitals(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Query(mut filter): Query<HospitalFilter>,
) -> AppResult<Json<ApiResponse<HospitalList>>> {
    filter.is_active = scope_active(&caller, filter.is_active);
    let page = PageRequest::new(filter.page, filter.limit, DEFAULT_PAGE_SIZE);

    let (hospitals, total) = state.repo.list_hospitals(&filter, page).await?;
    Ok(Json(ApiResponse::ok(HospitalList {
        hospitals,
        pagination: page.describe(total),
    })))
}

/// get_hospital
///
/// [Public Route] One hospital with its active doctors, treatments and approved
/// testimonials. Deactivated hospitals are only visible to admins.
#[utoipa::path(
    get,
    path = "/api/hospitals/{id}",
    responses(
        (status = 200, description = "Hospital", body = HospitalDetail),
        (status = 404, description = "Hospital not found")
    )
)]
pub async fn get_hospital(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<HospitalDetail>>> {
    let repo = state.repo.as_ref();
    let hospital = visible(
        repo.find_hospital(id).await?,
        |h| h.is_active,
        &caller,
        "Hospital not found",
    )?;

    Ok(Json(ApiResponse::ok(catalog::hospital_detail(repo, hospital).await?)))
}

#[utoipa::path(
    get,
    path = "/api/hospitals/slug/{slug}",
    responses(
        (status = 200, description = "Hospital", body = HospitalDetail),
        (status = 404, description = "Hospital not found")
    )
)]
pub async fn get_hospital_by_slug(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<HospitalDetail>>> {
    let repo = state.repo.as_ref();
    let hospital = visible(
        repo.find_hospital_by_slug(&slug).await?,
        |h| h.is_active,
        &caller,
        "Hospital not found",
    )?;

    Ok(Json(ApiResponse::ok(catalog::hospital_detail(repo, hospital).await?)))
}

/// create_hospital
///
/// [Admin Route] Accepts JSON or multipart. The slug is derived from the name and made
/// unique across hospitals.
#[utoipa::path(
    post,
    path = "/api/hospitals",
    request_body = HospitalInput,
    responses((status = 201, description = "Created", body = Hospital))
)]
pub async fn create_hospital(
    State(state): State<AppState>,
    FormPayload {
        fields,
        image,
        folder,
    }: FormPayload<HospitalInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Hospital>>)> {
    let name = required(fields.name, "Name")?.trim().to_string();
    let location = required(fields.location, "Location")?;
    let city = required(fields.city, "City")?;
    let state_name = required(fields.state, "State")?;
    let specialty = required(fields.specialty, "Specialty")?;

    let uploaded = store_upload(&state, folder.as_deref(), image.as_ref()).await?;
    let repo = state.repo.as_ref();
    let slug = resolve_unique(repo, SlugTable::Hospitals, &name, None).await?;

    let hospital = repo
        .create_hospital(NewHospital {
            name,
            slug,
            location,
            city,
            state: state_name,
            country: fields
                .country
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            rating: fields.rating.unwrap_or(0.0),
            specialty,
            description: fields.description,
            image: uploaded.or(fields.image),
            accreditation: fields.accreditation,
            address: fields.address,
            phone: fields.phone,
            email: fields.email,
            website: fields.website,
            established_year: fields.established_year,
            bed_capacity: fields.bed_capacity,
            map_embed_url: fields.map_embed_url,
            airport_distance: fields.airport_distance,
        })
        .await?;

    tracing::info!(hospital_id = hospital.id, slug = %hospital.slug, "hospital created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Hospital created successfully", hospital)),
    ))
}

/// update_hospital
///
/// [Admin Route] Partial update. A new slug is only generated when the name actually
/// changes, and the row's own slug never counts as a collision.
#[utoipa::path(
    put,
    path = "/api/hospitals/{id}",
    request_body = HospitalInput,
    responses(
        (status = 200, description = "Updated", body = Hospital),
        (status = 404, description = "Hospital not found")
    )
)]
pub async fn update_hospital(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    FormPayload {
        mut fields,
        image,
        folder,
    }: FormPayload<HospitalInput>,
) -> AppResult<Json<ApiResponse<Hospital>>> {
    for (value, field) in [
        (&fields.name, "Name"),
        (&fields.location, "Location"),
        (&fields.city, "City"),
        (&fields.state, "State"),
        (&fields.specialty, "Specialty"),
    ] {
        reject_blank(value, field)?;
    }

    let repo = state.repo.as_ref();
    let current = repo
        .find_hospital(id)
        .await?
        .ok_or_else(|| AppError::not_found("Hospital not found"))?;

    if let Some(name) = renamed(fields.name.as_deref(), &current.name) {
        fields.slug = Some(resolve_unique(repo, SlugTable::Hospitals, name, Some(id)).await?);
    }
    fields.name = fields.name.map(|name| name.trim().to_string());
    if let Some(url) = store_upload(&state, folder.as_deref(), image.as_ref()).await? {
        fields.image = Some(url);
    }

    let hospital = repo
        .update_hospital(id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Hospital not found"))?;

    Ok(Json(ApiResponse::with_message("Hospital updated successfully", hospital)))
}

#[utoipa::path(
    delete,
    path = "/api/hospitals/{id}",
    responses(
        (status = 200, description = "Deactivated"),
        (status = 404, description = "Hospital not found")
    )
)]
pub async fn delete_hospital(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse>> {
    if !state.repo.soft_delete_hospital(id).await? {
        return Err(AppError::not_found("Hospital not found"));
    }

    tracing::info!(hospital_id = id, "hospital deactivated");
    Ok(Json(ApiResponse::message("Hospital deleted successfully")))
}

/// attach_specialties
///
/// [Admin Route] Assigns specialties to a hospital. Every id must exist; when one does
/// not, nothing is written. Pairs that were detached earlier come back active.
#[utoipa::path(
    post,
    path = "/api/hospitals/{id}/specialties",
    request_body = AttachSpecialtiesRequest,
    responses(
        (status = 200, description = "Attached"),
        (status = 400, description = "Empty or unknown specialty ids"),
        (status = 404, description = "Hospital not found")
    )
)]
pub async fn attach_specialties(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<AttachSpecialtiesRequest>,
) -> AppResult<Json<ApiResponse>> {
    if payload.specialty_ids.is_empty() {
        return Err(AppError::validation(
            "specialtyIds must be a non-empty array",
        ));
    }

    let repo = state.repo.as_ref();
    repo.find_hospital(id)
        .await?
        .ok_or_else(|| AppError::not_found("Hospital not found"))?;

    let mut unique = payload.specialty_ids.clone();
    unique.sort_unstable();
    unique.dedup();
    if repo.count_existing_specialties(&unique).await? != unique.len() as i64 {
        return Err(AppError::validation("One or more specialty IDs are invalid"));
    }

    repo.attach_specialties(id, &unique).await?;

    tracing::info!(hospital_id = id, specialties = ?unique, "specialties attached");
    Ok(Json(ApiResponse::message(
        "Specialties added to hospital successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/hospitals/{id}/specialties/{specialty_id}",
    responses(
        (status = 200, description = "Detached"),
        (status = 404, description = "Hospital or specialty not found")
    )
)]
pub async fn detach_specialty(
    State(state): State<AppState>,
    Path((id, specialty_id)): Path<(i32, i32)>,
) -> AppResult<Json<ApiResponse>> {
    let repo = state.repo.as_ref();
    repo.find_hospital(id)
        .await?
        .ok_or_else(|| AppError::not_found("Hospital not found"))?;
    repo.find_specialty(specialty_id)
        .await?
        .ok_or_else(|| AppError::not_found("Specialty not found"))?;

    repo.detach_specialty(id, specialty_id).await?;

    Ok(Json(ApiResponse::message(
        "Specialty removed from hospital successfully",
    )))
}

/// hospital_specialties
///
/// [Public Route] The active specialties a hospital offers, by name.
#[utoipa::path(
    get,
    path = "/api/hospitals/{id}/specialties",
    responses(
        (status = 200, description = "Specialties", body = [Specialty]),
        (status = 404, description = "Hospital not found")
    )
)]
pub async fn hospital_specialties(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Specialty>>>> {
    let repo = state.repo.as_ref();
    visible(
        repo.find_hospital(id).await?,
        |h| h.is_active,
        &caller,
        "Hospital not found",
    )?;

    Ok(Json(ApiResponse::ok(repo.specialties_of_hospital(id).await?)))
}

/// specialty_combinations
///
/// [Public Route] Every live hospital/specialty pairing, for building landing-page links.
#[utoipa::path(
    get,
    path = "/api/hospitals/specialty-combinations",
    responses((status = 200, description = "Combinations", body = [SpecialtyCombination]))
)]
pub async fn specialty_combinations(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<SpecialtyCombination>>>> {
    Ok(Json(ApiResponse::ok(state.repo.specialty_combinations().await?)))
}

/// hospital_specialty_page
///
/// [Public Route] Landing page for one hospital + specialty pair.
#[utoipa::path(
    get,
    path = "/api/hospitals/{hospital_slug}/{specialty_slug}",
    responses(
        (status = 200, description = "Landing data", body = HospitalSpecialtyPage),
        (status = 404, description = "Combination not found or not active")
    )
)]
pub async fn hospital_specialty_page(
    State(state): State<AppState>,
    Path((hospital_slug, specialty_slug)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<HospitalSpecialtyPage>>> {
    let page =
        catalog::hospital_specialty_page(state.repo.as_ref(), &hospital_slug, &specialty_slug)
            .await?;
    Ok(Json(ApiResponse::ok(page)))
}
