use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::Role,
};

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const STAFF: &[Role] = &[Role::Admin, Role::HospitalManager];

/// Claims
///
/// Payload of a session token. Signed with the configured HS256 secret; the server keeps
/// no session record, so a token stays valid until `exp` or until the secret rotates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: i32,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// hash_password
///
/// Salted bcrypt digest at the configured cost. Runs on the blocking pool since a
/// realistic cost factor takes tens of milliseconds.
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    let digest = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(AppError::unexpected)??;
    Ok(digest)
}

/// verify_password
///
/// Compares through bcrypt only. A stored value that is not a valid bcrypt digest
/// counts as a mismatch rather than an error.
pub async fn verify_password(password: &str, hashed: &str) -> bool {
    let password = password.to_owned();
    let hashed = hashed.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed).unwrap_or(false))
        .await
        .unwrap_or(false)
}

static PLACEHOLDER_DIGEST: OnceCell<String> = OnceCell::const_new();

/// placeholder_digest
///
/// A real bcrypt digest of a random secret, built once at `cost`. Logins for unknown
/// emails verify against it so they spend the same bcrypt time as a wrong password.
pub async fn placeholder_digest(cost: u32) -> AppResult<&'static str> {
    let digest = PLACEHOLDER_DIGEST
        .get_or_try_init(|| async move {
            let secret = uuid::Uuid::new_v4().to_string();
            hash_password(&secret, cost).await
        })
        .await?;
    Ok(digest.as_str())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// issue_token
///
/// Signs `{sub, role, iat, exp}` with `exp = now + jwt_expires_in`.
pub fn issue_token(user_id: i32, role: Role, config: &AppConfig) -> AppResult<String> {
    let iat = now_secs();
    let claims = Claims {
        sub: user_id,
        role,
        iat,
        exp: iat + config.jwt_expires_in.as_secs(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::unexpected(format!("token signing failed: {}", e)))
}

/// verify_token
///
/// Checks signature and expiry. Malformed, expired and forged tokens all yield `None`;
/// the caller never learns which check failed.
pub fn verify_token(token: &str, config: &AppConfig) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!("rejected session token: {}", e);
            None
        }
    }
}

/// AuthUser
///
/// The identity resolved from a verified token. Inserted into request extensions by
/// `authenticate`; handlers take it as an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            id: claims.sub,
            role: claims.role,
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// AuthUser Extractor
///
/// Reuses the identity `authenticate` already attached when present, otherwise walks the
/// same token checks itself so the extractor also works on routes without the layer.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }

        let config = AppConfig::from_ref(state);
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

        verify_token(token, &config)
            .map(AuthUser::from)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

/// Optional identity for public routes that reveal more to privileged callers.
/// A missing or unusable token simply yields `None`.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(Some(*user));
        }

        let config = AppConfig::from_ref(state);
        Ok(bearer_token(parts)
            .and_then(|token| verify_token(token, &config))
            .map(AuthUser::from))
    }
}

/// authenticate
///
/// Gate middleware: resolves the bearer token and attaches `AuthUser` to the request.
/// Rejects with 401 when the header is absent or the token does not verify.
pub async fn authenticate(
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let user = <AuthUser as FromRequestParts<AppConfig>>::from_request_parts(&mut parts, &config)
        .await?;

    tracing::debug!(user_id = user.id, role = %user.role, "request authenticated");

    parts.extensions.insert(user);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// require_roles
///
/// Runs after `authenticate`. 401 when no identity was attached, 403 when the role is
/// not one of `allowed`.
pub async fn require_roles(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    if !allowed.contains(&user.role) {
        tracing::warn!(user_id = user.id, role = %user.role, "role not permitted for route");
        return Err(AppError::Forbidden("Insufficient permissions".to_string()));
    }

    Ok(next.run(request).await)
}
