use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

use crate::payload::lenient;

// --- Core Entities (Mapped to Database) ---

/// Role
///
/// The RBAC field carried by every user and every session token.
/// Stored as the Postgres enum `user_role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    HospitalManager,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::HospitalManager => "hospital_manager",
            Role::Doctor => "doctor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User
///
/// An account able to sign in. `password_hash` is a bcrypt digest and is never serialized;
/// outbound payloads use `UserProfile`.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    // Staff assignment. Weak reference, the hospital does not own the account.
    pub hospital_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Hospital
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Hospital {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub location: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub rating: f64,
    // Free-text summary kept from the first version of the listings.
    pub specialty: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub accreditation: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub established_year: Option<i32>,
    pub bed_capacity: Option<i32>,
    pub map_embed_url: Option<String>,
    pub airport_distance: Option<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Specialty
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Specialty {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub clinics_count: i32,
    pub bg_color: Option<String>,
    pub icon_bg: Option<String>,
    pub icon_color: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// HospitalSpecialty
///
/// Junction row. Exactly one row exists per (hospital_id, specialty_id) pair; detaching
/// flips `is_active` instead of removing it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HospitalSpecialty {
    pub id: i32,
    pub hospital_id: i32,
    pub specialty_id: i32,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// DoctorRow
///
/// Raw database row. `expertise` and `available_days` are JSON-encoded text columns;
/// they are decoded into `Doctor` at the repository edge and never leave it as strings.
#[derive(Debug, Clone, FromRow)]
pub struct DoctorRow {
    pub id: i32,
    pub hospital_id: i32,
    pub specialty_id: i32,
    pub name: String,
    pub slug: String,
    pub specialization: String,
    pub experience: String,
    pub patients_treated: Option<String>,
    pub rating: f64,
    pub reviews: Option<String>,
    pub image: Option<String>,
    pub qualifications: Option<String>,
    pub expertise: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub consultation_fee: Option<f64>,
    pub available_days: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Doctor
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Doctor {
    pub id: i32,
    pub hospital_id: i32,
    pub specialty_id: i32,
    pub name: String,
    pub slug: String,
    pub specialization: String,
    pub experience: String,
    pub patients_treated: Option<String>,
    pub rating: f64,
    pub reviews: Option<String>,
    pub image: Option<String>,
    pub qualifications: Option<String>,
    pub expertise: Vec<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub consultation_fee: Option<f64>,
    pub available_days: Vec<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Doctor {
            id: row.id,
            hospital_id: row.hospital_id,
            specialty_id: row.specialty_id,
            name: row.name,
            slug: row.slug,
            specialization: row.specialization,
            experience: row.experience,
            patients_treated: row.patients_treated,
            rating: row.rating,
            reviews: row.reviews,
            image: row.image,
            qualifications: row.qualifications,
            expertise: decode_string_list(row.expertise.as_deref()),
            bio: row.bio,
            email: row.email,
            phone: row.phone,
            consultation_fee: row.consultation_fee,
            available_days: decode_string_list(row.available_days.as_deref()),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Encodes an ordered string list for a text column.
pub fn encode_string_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// decode_string_list
///
/// Inverse of `encode_string_list`. NULL, empty or corrupt column values all read as an
/// empty list so callers never see a missing sequence.
pub fn decode_string_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(text) if !text.trim().is_empty() => serde_json::from_str(text).unwrap_or_else(|e| {
            tracing::warn!("discarding undecodable string list {:?}: {}", text, e);
            Vec::new()
        }),
        _ => Vec::new(),
    }
}

/// Treatment
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Treatment {
    pub id: i32,
    pub hospital_id: i32,
    pub specialty_id: i32,
    pub name: String,
    pub slug: String,
    // Display text such as "$5,000 - $7,000".
    pub cost: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub stay: Option<String>,
    pub success_rate: Option<f64>,
    pub procedure_type: Option<String>,
    pub is_popular: bool,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Testimonial
///
/// Patient story. Born unapproved; only approved and active rows are publicly visible.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Testimonial {
    pub id: i32,
    pub hospital_id: i32,
    pub doctor_id: Option<i32>,
    pub patient_name: String,
    pub age: Option<i32>,
    pub country: Option<String>,
    pub treatment: String,
    pub rating: i32,
    pub story: String,
    pub image: Option<String>,
    pub date: Option<String>,
    pub is_approved: bool,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Slim references embedded in composite responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HospitalRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub location: String,
    pub city: String,
    pub image: Option<String>,
}

impl From<&Hospital> for HospitalRef {
    fn from(h: &Hospital) -> Self {
        HospitalRef {
            id: h.id,
            name: h.name.clone(),
            slug: h.slug.clone(),
            location: h.location.clone(),
            city: h.city.clone(),
            image: h.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SpecialtyRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub image_url: Option<String>,
}

impl From<&Specialty> for SpecialtyRef {
    fn from(s: &Specialty) -> Self {
        SpecialtyRef {
            id: s.id,
            name: s.name.clone(),
            slug: s.slug.clone(),
            icon: s.icon.clone(),
            image_url: s.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DoctorRef {
    pub id: i32,
    pub name: String,
    pub specialization: String,
}

impl From<&Doctor> for DoctorRef {
    fn from(d: &Doctor) -> Self {
        DoctorRef {
            id: d.id,
            name: d.name.clone(),
            specialization: d.specialization.clone(),
        }
    }
}

// --- Composite Read Models (Output) ---

/// HospitalDetail
///
/// Hospital with its active doctors, active treatments and approved testimonials.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalDetail {
    #[serde(flatten)]
    pub hospital: Hospital,
    pub doctors: Vec<Doctor>,
    pub treatments: Vec<Treatment>,
    pub testimonials: Vec<Testimonial>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyDetail {
    #[serde(flatten)]
    pub specialty: Specialty,
    pub doctors: Vec<Doctor>,
    pub treatments: Vec<Treatment>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDetail {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub hospital: Option<Hospital>,
    pub specialty: Option<Specialty>,
    pub testimonials: Vec<Testimonial>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentDetail {
    #[serde(flatten)]
    pub treatment: Treatment,
    pub hospital: Option<Hospital>,
    pub specialty: Option<Specialty>,
}

/// TestimonialView
///
/// A testimonial plus its doctor attribution, when one resolves.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialView {
    #[serde(flatten)]
    pub testimonial: Testimonial,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital: Option<HospitalRef>,
    pub doctor: Option<DoctorRef>,
}

/// HospitalSpecialtyPage
///
/// Landing data for one hospital + specialty pair.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalSpecialtyPage {
    pub hospital: Hospital,
    pub specialty: Specialty,
    pub doctors: Vec<Doctor>,
    pub treatments: Vec<Treatment>,
    pub testimonials: Vec<TestimonialView>,
}

/// An active hospital/specialty assignment with both sides resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyCombination {
    pub id: i32,
    pub hospital_id: i32,
    pub specialty_id: i32,
    pub created_at: DateTime<Utc>,
    pub hospital: HospitalRef,
    pub specialty: SpecialtyRef,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalWithTreatments {
    #[serde(flatten)]
    pub hospital: Hospital,
    pub treatments: Vec<Treatment>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyHospitals {
    pub specialty: Specialty,
    pub hospitals: Vec<HospitalWithTreatments>,
    pub count: usize,
}

// --- Pagination ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

/// Upper bound on `limit` for every list endpoint.
pub const MAX_PAGE_SIZE: i64 = 100;

/// PageRequest
///
/// Normalized page/limit pair. `page` is 1-based; `limit` lies in `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(1),
            limit: limit
                .filter(|l| *l >= 1)
                .unwrap_or(default_limit)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Saturates instead of overflowing for absurd page numbers; such a page is simply empty.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn describe(&self, total: i64) -> Pagination {
        let total = total.max(0);
        Pagination {
            total,
            page: self.page,
            pages: total.div_euclid(self.limit) + i64::from(total.rem_euclid(self.limit) > 0),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HospitalList {
    pub hospitals: Vec<Hospital>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpecialtyList {
    pub specialties: Vec<Specialty>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DoctorList {
    pub doctors: Vec<Doctor>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TreatmentList {
    pub treatments: Vec<Treatment>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestimonialList {
    pub testimonials: Vec<Testimonial>,
    pub pagination: Pagination,
}

// --- List Filters (Query Parameters) ---

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct HospitalFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Partial match on name, location or specialty summary.
    pub search: Option<String>,
    pub city: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Partial match on name or description.
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DoctorFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Partial match on name or specialization.
    pub search: Option<String>,
    pub hospital_id: Option<i32>,
    pub specialty_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Partial match on name or description.
    pub search: Option<String>,
    pub hospital_id: Option<i32>,
    pub specialty_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub hospital_id: Option<i32>,
    pub doctor_id: Option<i32>,
    pub is_approved: Option<bool>,
    pub is_active: Option<bool>,
}

// --- Request Payloads (Input Schemas) ---
//
// The same payload type serves create and update. Create handlers check the required
// fields before building the `NewX` row; update paths apply whatever is present. Numeric, boolean and
// list fields go through `lenient` so multipart text values are accepted too.

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub role: Option<Role>,
    pub hospital_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// UserProfile
///
/// Outbound view of a `User`. Carries no credential material.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub hospital_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital: Option<HospitalRef>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            is_active: user.is_active,
            hospital_id: user.hospital_id,
            hospital: None,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthPayload {
    pub user: UserProfile,
    pub token: String,
}

/// Insert-ready account. `password_hash` is already a bcrypt digest.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub hospital_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HospitalInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: Option<f64>,
    pub specialty: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub accreditation: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub established_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 0, message = "Bed capacity cannot be negative"))]
    pub bed_capacity: Option<i32>,
    pub map_embed_url: Option<String>,
    pub airport_distance: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
    /// Set by the slug generator, never by the caller.
    #[serde(skip)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHospital {
    pub name: String,
    pub slug: String,
    pub location: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub rating: f64,
    pub specialty: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub accreditation: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub established_year: Option<i32>,
    pub bed_capacity: Option<i32>,
    pub map_embed_url: Option<String>,
    pub airport_distance: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 0, message = "Clinics count cannot be negative"))]
    pub clinics_count: Option<i32>,
    pub bg_color: Option<String>,
    pub icon_bg: Option<String>,
    pub icon_color: Option<String>,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
    #[serde(skip)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSpecialty {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub clinics_count: i32,
    pub bg_color: Option<String>,
    pub icon_bg: Option<String>,
    pub icon_color: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DoctorInput {
    #[serde(default, deserialize_with = "lenient::number")]
    pub hospital_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub specialty_id: Option<i32>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub experience: Option<String>,
    pub patients_treated: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: Option<f64>,
    pub reviews: Option<String>,
    pub image: Option<String>,
    pub qualifications: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub expertise: Option<Vec<String>>,
    pub bio: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 0.0, message = "Consultation fee cannot be negative"))]
    pub consultation_fee: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub available_days: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
    #[serde(skip)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub hospital_id: i32,
    pub specialty_id: i32,
    pub name: String,
    pub slug: String,
    pub specialization: String,
    pub experience: String,
    pub patients_treated: Option<String>,
    pub rating: f64,
    pub reviews: Option<String>,
    pub image: Option<String>,
    pub qualifications: Option<String>,
    pub expertise: Vec<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub consultation_fee: Option<f64>,
    pub available_days: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentInput {
    #[serde(default, deserialize_with = "lenient::number")]
    pub hospital_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub specialty_id: Option<i32>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    pub cost: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub stay: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 0.0, max = 100.0, message = "Success rate must be between 0 and 100"))]
    pub success_rate: Option<f64>,
    pub procedure_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
    #[serde(skip)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTreatment {
    pub hospital_id: i32,
    pub specialty_id: i32,
    pub name: String,
    pub slug: String,
    pub cost: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub stay: Option<String>,
    pub success_rate: Option<f64>,
    pub procedure_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialInput {
    #[serde(default, deserialize_with = "lenient::number")]
    pub hospital_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub doctor_id: Option<i32>,
    #[validate(length(min = 1, message = "Patient name is required"))]
    pub patient_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
    pub country: Option<String>,
    pub treatment: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    pub story: Option<String>,
    pub image: Option<String>,
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewTestimonial {
    pub hospital_id: i32,
    pub doctor_id: Option<i32>,
    pub patient_name: String,
    pub age: Option<i32>,
    pub country: Option<String>,
    pub treatment: String,
    pub rating: i32,
    pub story: String,
    pub image: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttachSpecialtiesRequest {
    #[serde(default)]
    pub specialty_ids: Vec<i32>,
}

/// ApiResponse
///
/// The envelope every endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}
