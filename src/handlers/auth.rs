use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{AuthUser, hash_password, issue_token, placeholder_digest, verify_password},
    error::{AppError, AppResult},
    models::{
        ApiResponse, AuthPayload, ChangePasswordRequest, HospitalRef, LoginRequest, NewUser,
        RegisterRequest, Role, UpdateProfileRequest, User, UserProfile,
    },
    payload::ValidatedJson,
    repository::Repository,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Profile with the assigned hospital resolved, when there is one.
async fn profile_of(repo: &dyn Repository, user: &User) -> AppResult<UserProfile> {
    let mut profile = UserProfile::from(user);
    if let Some(hospital_id) = user.hospital_id {
        profile.hospital = repo
            .find_hospital(hospital_id)
            .await?
            .map(|h| HospitalRef::from(&h));
    }
    Ok(profile)
}

/// register
///
/// [Public Route] Creates an account and signs the caller in. Self-service sign-up may
/// pick `hospital_manager` or `doctor`; admin accounts only come from bootstrap.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthPayload),
        (status = 400, description = "Validation failed or email taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    let role = payload.role.unwrap_or_default();
    if role == Role::Admin {
        return Err(AppError::validation("Cannot register with the admin role"));
    }

    let repo = state.repo.as_ref();
    if repo.find_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }
    if let Some(hospital_id) = payload.hospital_id {
        repo.find_hospital(hospital_id)
            .await?
            .ok_or_else(|| AppError::not_found("Hospital not found"))?;
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost).await?;
    let user = repo
        .create_user(NewUser {
            email: payload.email,
            password_hash,
            name: payload.name.trim().to_string(),
            role,
            hospital_id: payload.hospital_id,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "user registered");

    let token = issue_token(user.id, user.role, &state.config)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User registered successfully",
            AuthPayload {
                user: UserProfile::from(&user),
                token,
            },
        )),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for a session token. Unknown email and
/// wrong password answer identically; the deactivation notice is only given to a caller
/// who already proved the password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthPayload),
        (status = 401, description = "Invalid credentials or deactivated account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    let repo = state.repo.as_ref();
    let Some(user) = repo.find_user_by_email(&payload.email).await? else {
        // Same bcrypt work as a wrong password, so timing does not reveal unknown emails.
        let digest = placeholder_digest(state.config.bcrypt_cost).await?;
        verify_password(&payload.password, digest).await;
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&payload.password, &user.password_hash).await {
        tracing::debug!(user_id = user.id, "login rejected: password mismatch");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }
    if !user.is_active {
        return Err(AppError::Unauthorized("Account is deactivated".to_string()));
    }

    let token = issue_token(user.id, user.role, &state.config)?;
    let profile = profile_of(repo, &user).await?;

    Ok(Json(ApiResponse::with_message(
        "Login successful",
        AuthPayload {
            user: profile,
            token,
        },
    )))
}

/// get_profile
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let repo = state.repo.as_ref();
    let user = repo
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(profile_of(repo, &user).await?)))
}

#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Profile updated", body = UserProfile))
)]
pub async fn update_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let repo = state.repo.as_ref();
    let user = repo
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    // Only a real change of address needs the uniqueness check.
    let email = payload.email.filter(|email| *email != user.email);
    if let Some(email) = &email {
        if repo.find_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }
    }
    let name = payload.name.map(|name| name.trim().to_string());

    let updated = repo
        .update_user_profile(id, name, email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        profile_of(repo, &updated).await?,
    )))
}

/// change_password
///
/// [Authenticated Route] Requires the current password. Existing tokens stay valid.
#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is incorrect")
    )
)]
pub async fn change_password(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse>> {
    let repo = state.repo.as_ref();
    let user = repo
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !verify_password(&payload.current_password, &user.password_hash).await {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let password_hash = hash_password(&payload.new_password, state.config.bcrypt_cost).await?;
    if !repo.update_user_password(id, &password_hash).await? {
        return Err(AppError::not_found("User not found"));
    }

    tracing::info!(user_id = id, "password changed");
    Ok(Json(ApiResponse::message("Password changed successfully")))
}
