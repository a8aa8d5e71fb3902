mod common;

use axum::http::StatusCode;
use common::{empty, get, json, spawn_app};
use jsonwebtoken::{EncodingKey, Header, encode};
use medcast_directory::{
    AppConfig,
    auth::{
        Claims, hash_password, issue_token, placeholder_digest, verify_password, verify_token,
    },
    models::Role,
};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

// --- Credential engine ---

#[tokio::test]
async fn hashed_password_verifies_and_is_salted() {
    let first = hash_password("correct horse", 4).await.unwrap();
    let second = hash_password("correct horse", 4).await.unwrap();

    assert_ne!(first, "correct horse");
    assert_ne!(first, second, "each digest carries its own salt");
    assert!(verify_password("correct horse", &first).await);
    assert!(!verify_password("wrong horse", &first).await);
}

#[tokio::test]
async fn garbage_digest_is_a_mismatch_not_an_error() {
    assert!(!verify_password("anything", "not-a-bcrypt-digest").await);
}

#[tokio::test]
async fn placeholder_digest_is_real_bcrypt_that_matches_nothing() {
    let digest = placeholder_digest(4).await.unwrap();

    // A parseable digest makes bcrypt do the full work instead of failing fast.
    assert_eq!(bcrypt::verify("anything", digest).ok(), Some(false));
    assert!(digest.starts_with("$2"));
    assert!(!verify_password("", digest).await);
    assert_eq!(placeholder_digest(4).await.unwrap(), digest);
}

#[test]
fn issued_token_round_trips_identity() {
    let config = AppConfig::default();
    let token = issue_token(42, Role::HospitalManager, &config).unwrap();

    let claims = verify_token(&token, &config).expect("fresh token verifies");
    assert_eq!(claims.sub, 42);
    assert_eq!(claims.role, Role::HospitalManager);
    assert_eq!(claims.exp - claims.iat, config.jwt_expires_in.as_secs());
}

#[test]
fn token_signed_with_another_secret_is_rejected() {
    let config = AppConfig::default();
    let other = AppConfig {
        jwt_secret: "a-completely-different-secret".to_string(),
        ..AppConfig::default()
    };
    let token = issue_token(1, Role::Admin, &other).unwrap();

    assert!(verify_token(&token, &config).is_none());
}

#[test]
fn expired_token_is_rejected() {
    let config = AppConfig::default();
    let issued = now() - 7200;
    let claims = Claims {
        sub: 1,
        role: Role::Admin,
        iat: issued,
        exp: issued + 60,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .unwrap();

    assert!(verify_token(&token, &config).is_none());
}

#[test]
fn malformed_token_is_rejected() {
    assert!(verify_token("not.a.token", &AppConfig::default()).is_none());
}

// --- Access control gate ---

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let app = spawn_app();
    let (status, body) = app.send(get("/api/auth/profile", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No token provided");
}

#[tokio::test]
async fn protected_route_with_forged_token_is_401() {
    let app = spawn_app();
    let (status, body) = app.send(get("/api/auth/profile", Some("forged.token.value"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn manager_cannot_use_admin_routes() {
    let app = spawn_app();
    let token = app.manager_token();

    let (status, body) = app
        .send(json("POST", "/api/hospitals", Some(&token), json!({ "name": "X" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Insufficient permissions");

    let (status, _) = app
        .send(empty("PATCH", "/api/treatments/1/toggle-popular", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn doctor_role_cannot_use_staff_routes() {
    let app = spawn_app();
    let token = app.doctor_token();

    let (status, _) = app
        .send(json("POST", "/api/doctors", Some(&token), json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_passes_the_gate_and_reaches_the_handler() {
    let app = spawn_app();
    let token = app.admin_token();

    // Gate passed: the handler itself answers with its own 404.
    let (status, body) = app
        .send(empty("DELETE", "/api/hospitals/999", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Hospital not found");
}

#[tokio::test]
async fn unauthenticated_write_is_401_before_role_check() {
    let app = spawn_app();
    let (status, body) = app
        .send(json("POST", "/api/specialties", None, json!({ "name": "X" })))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token provided");
}
