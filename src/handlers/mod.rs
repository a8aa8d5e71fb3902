//! HTTP handlers, one module per resource.
//!
//! Handlers stay thin: decode, check references, call the repository, wrap the result in
//! `ApiResponse`. Everything they return as an error goes through `AppError`.

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Hospital, Specialty},
    payload::UploadedImage,
    repository::Repository,
};

pub mod auth;
pub mod doctors;
pub mod hospitals;
pub mod specialties;
pub mod testimonials;
pub mod treatments;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upload sub-directory used when the form does not name one.
pub const DEFAULT_UPLOAD_FOLDER: &str = "general";

/// required
///
/// Unwraps a field the create path cannot do without. Blank text counts as missing.
pub(crate) fn required<T: Present>(value: Option<T>, field: &str) -> AppResult<T> {
    value
        .filter(Present::is_present)
        .ok_or_else(|| AppError::validation(format!("{} is required", field)))
}

pub(crate) trait Present {
    fn is_present(&self) -> bool;
}

impl Present for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Present for i32 {
    fn is_present(&self) -> bool {
        true
    }
}

/// Only admins may look at deactivated rows or pass visibility filters.
pub(crate) fn is_admin(caller: &Option<AuthUser>) -> bool {
    caller.as_ref().is_some_and(AuthUser::is_admin)
}

/// Visibility filter for list endpoints: public callers only ever see active rows.
pub(crate) fn scope_active(caller: &Option<AuthUser>, requested: Option<bool>) -> Option<bool> {
    if is_admin(caller) { requested } else { Some(true) }
}

/// Rejects a present but blank text field on update paths.
pub(crate) fn reject_blank(value: &Option<String>, field: &str) -> AppResult<()> {
    match value {
        Some(text) if text.trim().is_empty() => {
            Err(AppError::validation(format!("{} is required", field)))
        }
        _ => Ok(()),
    }
}

/// visible
///
/// Resolves a by-id lookup for the caller. Inactive rows read as missing unless the caller
/// is an admin.
pub(crate) fn visible<T>(
    row: Option<T>,
    is_active: impl Fn(&T) -> bool,
    caller: &Option<AuthUser>,
    missing: &str,
) -> AppResult<T> {
    row.filter(|r| is_active(r) || is_admin(caller))
        .ok_or_else(|| AppError::not_found(missing))
}

/// store_upload
///
/// Persists the optional image part and returns its public URL.
pub(crate) async fn store_upload(
    state: &AppState,
    folder: Option<&str>,
    image: Option<&UploadedImage>,
) -> AppResult<Option<String>> {
    let Some(image) = image else {
        return Ok(None);
    };

    let folder = folder
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_UPLOAD_FOLDER);
    let url = state.storage.store_image(folder, image).await?;
    Ok(Some(url))
}

pub(crate) async fn active_hospital(repo: &dyn Repository, id: i32) -> AppResult<Hospital> {
    repo.find_hospital(id)
        .await?
        .filter(|h| h.is_active)
        .ok_or_else(|| AppError::not_found("Hospital not found"))
}

pub(crate) async fn active_specialty(repo: &dyn Repository, id: i32) -> AppResult<Specialty> {
    repo.find_specialty(id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::not_found("Specialty not found"))
}

/// A referenced doctor must exist and be active.
pub(crate) async fn ensure_active_doctor(repo: &dyn Repository, id: i32) -> AppResult<()> {
    repo.find_doctor(id)
        .await?
        .filter(|d| d.is_active)
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Doctor not found"))
}

/// Trims a new name and reports whether it differs from the stored one.
pub(crate) fn renamed<'a>(proposed: Option<&'a str>, current: &str) -> Option<&'a str> {
    proposed.map(str::trim).filter(|name| *name != current)
}
