use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{
    DEFAULT_PAGE_SIZE, active_hospital, active_specialty, reject_blank, renamed, required,
    scope_active, visible,
};
use crate::{
    AppState,
    auth::AuthUser,
    catalog,
    error::{AppError, AppResult},
    models::{
        ApiResponse, NewTreatment, PageRequest, Treatment, TreatmentDetail, TreatmentFilter,
        TreatmentInput, TreatmentList,
    },
    payload::ValidatedJson,
    slug::{SlugTable, resolve_unique},
};

#[utoipa::path(
    get,
    path = "/api/treatments",
    params(TreatmentFilter),
    responses((status = 200, description = "Treatments", body = TreatmentList))
)]
pub async fn list_treatments(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Query(mut filter): Query<TreatmentFilter>,
) -> AppResult<Json<ApiResponse<TreatmentList>>> {
    filter.is_active = scope_active(&caller, filter.is_active);
    let page = PageRequest::new(filter.page, filter.limit, DEFAULT_PAGE_SIZE);

    let (treatments, total) = state.repo.list_treatments(&filter, page).await?;
    Ok(Json(ApiResponse::ok(TreatmentList {
        treatments,
        pagination: page.describe(total),
    })))
}

/// popular_treatments
///
/// [Public Route] The featured treatments. Never more than three.
#[utoipa::path(
    get,
    path = "/api/treatments/popular",
    responses((status = 200, description = "Popular treatments", body = [Treatment]))
)]
pub async fn popular_treatments(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Treatment>>>> {
    Ok(Json(ApiResponse::ok(state.repo.popular_treatments().await?)))
}

#[utoipa::path(
    get,
    path = "/api/treatments/{id}",
    responses(
        (status = 200, description = "Treatment", body = TreatmentDetail),
        (status = 404, description = "Treatment not found")
    )
)]
pub async fn get_treatment(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<TreatmentDetail>>> {
    let repo = state.repo.as_ref();
    let treatment = visible(
        repo.find_treatment(id).await?,
        |t| t.is_active,
        &caller,
        "Treatment not found",
    )?;

    Ok(Json(ApiResponse::ok(catalog::treatment_detail(repo, treatment).await?)))
}

/// create_treatment
///
/// [Staff Route] New treatments are never popular; featuring one goes through
/// `toggle_popular`.
#[utoipa::path(
    post,
    path = "/api/treatments",
    request_body = TreatmentInput,
    responses(
        (status = 201, description = "Created", body = Treatment),
        (status = 404, description = "Hospital or specialty not found")
    )
)]
pub async fn create_treatment(
    State(state): State<AppState>,
    ValidatedJson(fields): ValidatedJson<TreatmentInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Treatment>>)> {
    let hospital_id = required(fields.hospital_id, "Hospital ID")?;
    let specialty_id = required(fields.specialty_id, "Specialty ID")?;
    let name = required(fields.name, "Name")?.trim().to_string();
    let cost = required(fields.cost, "Cost")?;

    let repo = state.repo.as_ref();
    active_hospital(repo, hospital_id).await?;
    active_specialty(repo, specialty_id).await?;

    let slug = resolve_unique(repo, SlugTable::Treatments, &name, None).await?;
    let treatment = repo
        .create_treatment(NewTreatment {
            hospital_id,
            specialty_id,
            name,
            slug,
            cost,
            description: fields.description,
            duration: fields.duration,
            stay: fields.stay,
            success_rate: fields.success_rate,
            procedure_type: fields.procedure_type,
        })
        .await?;

    tracing::info!(treatment_id = treatment.id, hospital_id, specialty_id, "treatment created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Treatment created successfully", treatment)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/treatments/{id}",
    request_body = TreatmentInput,
    responses(
        (status = 200, description = "Updated", body = Treatment),
        (status = 400, description = "Invalid input, or reactivation would exceed the popular limit"),
        (status = 404, description = "Treatment, hospital or specialty not found")
    )
)]
pub async fn update_treatment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(mut fields): ValidatedJson<TreatmentInput>,
) -> AppResult<Json<ApiResponse<Treatment>>> {
    reject_blank(&fields.name, "Name")?;
    reject_blank(&fields.cost, "Cost")?;

    let repo = state.repo.as_ref();
    let current = repo
        .find_treatment(id)
        .await?
        .ok_or_else(|| AppError::not_found("Treatment not found"))?;

    if let Some(hospital_id) = fields.hospital_id {
        active_hospital(repo, hospital_id).await?;
    }
    if let Some(specialty_id) = fields.specialty_id {
        active_specialty(repo, specialty_id).await?;
    }

    if let Some(name) = renamed(fields.name.as_deref(), &current.name) {
        fields.slug = Some(resolve_unique(repo, SlugTable::Treatments, name, Some(id)).await?);
    }
    fields.name = fields.name.map(|name| name.trim().to_string());

    let treatment = repo
        .update_treatment(id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Treatment not found"))?;

    Ok(Json(ApiResponse::with_message("Treatment updated successfully", treatment)))
}

#[utoipa::path(
    delete,
    path = "/api/treatments/{id}",
    responses(
        (status = 200, description = "Deactivated"),
        (status = 404, description = "Treatment not found")
    )
)]
pub async fn delete_treatment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse>> {
    if !state.repo.soft_delete_treatment(id).await? {
        return Err(AppError::not_found("Treatment not found"));
    }

    tracing::info!(treatment_id = id, "treatment deactivated");
    Ok(Json(ApiResponse::message("Treatment deleted successfully")))
}

/// toggle_popular
///
/// [Admin Route] Flips the popular flag. Marking a fourth treatment fails with 400 and
/// leaves the row as it was; unmarking always succeeds.
#[utoipa::path(
    patch,
    path = "/api/treatments/{id}/toggle-popular",
    responses(
        (status = 200, description = "Toggled", body = Treatment),
        (status = 400, description = "Popular limit reached"),
        (status = 404, description = "Treatment not found")
    )
)]
pub async fn toggle_popular(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Treatment>>> {
    let treatment = state
        .repo
        .toggle_popular(id)
        .await?
        .ok_or_else(|| AppError::not_found("Treatment not found"))?;

    let message = if treatment.is_popular {
        "Treatment marked as popular successfully"
    } else {
        "Treatment unmarked from popular successfully"
    };
    tracing::info!(treatment_id = id, is_popular = treatment.is_popular, "popularity toggled");
    Ok(Json(ApiResponse::with_message(message, treatment)))
}
