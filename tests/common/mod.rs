#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use medcast_directory::{
    AppConfig, AppState, InMemoryRepository, MockStorageService, create_router,
    auth::{hash_password, issue_token},
    models::{
        Doctor, Hospital, NewDoctor, NewHospital, NewSpecialty, NewTestimonial, NewTreatment,
        NewUser, Role, Specialty, Testimonial, Treatment, User,
    },
    repository::{
        DoctorRepository, HospitalRepository, RepositoryState, SpecialtyRepository,
        TestimonialRepository, TreatmentRepository, UserRepository,
    },
    storage::StorageState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret123";

/// TestApp
///
/// A router over a fresh in-memory store and mock storage. `repo` shares its tables with
/// the router, so fixtures inserted through it are visible to requests.
pub struct TestApp {
    pub router: Router,
    pub repo: InMemoryRepository,
    pub config: AppConfig,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_storage(MockStorageService::new())
}

pub fn spawn_app_with_storage(storage: MockStorageService) -> TestApp {
    let repo = InMemoryRepository::new();
    let config = AppConfig::default();

    let state = AppState {
        repo: Arc::new(repo.clone()) as RepositoryState,
        storage: Arc::new(storage) as StorageState,
        config: config.clone(),
    };

    TestApp {
        router: create_router(state),
        repo,
        config,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub fn token_for(&self, user_id: i32, role: Role) -> String {
        issue_token(user_id, role, &self.config).expect("token signs")
    }

    pub fn admin_token(&self) -> String {
        self.token_for(1, Role::Admin)
    }

    pub fn manager_token(&self) -> String {
        self.token_for(2, Role::HospitalManager)
    }

    pub fn doctor_token(&self) -> String {
        self.token_for(3, Role::Doctor)
    }
}

// --- Request builders ---

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request builds")
}

pub fn json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub fn empty(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request builds")
}

pub const BOUNDARY: &str = "medcast-test-boundary";

/// Builds a `multipart/form-data` body from text parts and an optional file part.
pub fn multipart(
    method: &str,
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).expect("request builds")
}

// --- Fixtures ---

pub async fn seed_user(repo: &InMemoryRepository, email: &str, role: Role) -> User {
    let password_hash = hash_password(PASSWORD, 4).await.expect("hashes");
    repo.create_user(NewUser {
        email: email.to_string(),
        password_hash,
        name: "Test User".to_string(),
        role,
        hospital_id: None,
    })
    .await
    .expect("user inserts")
}

pub fn new_hospital(name: &str, slug: &str) -> NewHospital {
    NewHospital {
        name: name.to_string(),
        slug: slug.to_string(),
        location: "Sarita Vihar".to_string(),
        city: "New Delhi".to_string(),
        state: "Delhi".to_string(),
        country: "India".to_string(),
        rating: 4.5,
        specialty: "Multi-specialty care".to_string(),
        description: None,
        image: None,
        accreditation: None,
        address: None,
        phone: None,
        email: None,
        website: None,
        established_year: None,
        bed_capacity: None,
        map_embed_url: None,
        airport_distance: None,
    }
}

pub async fn seed_hospital(repo: &InMemoryRepository, name: &str, slug: &str) -> Hospital {
    repo.create_hospital(new_hospital(name, slug))
        .await
        .expect("hospital inserts")
}

pub fn new_specialty(name: &str, slug: &str) -> NewSpecialty {
    NewSpecialty {
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
        icon: None,
        clinics_count: 0,
        bg_color: None,
        icon_bg: None,
        icon_color: None,
        image_url: None,
    }
}

pub async fn seed_specialty(repo: &InMemoryRepository, name: &str, slug: &str) -> Specialty {
    repo.create_specialty(new_specialty(name, slug))
        .await
        .expect("specialty inserts")
}

pub fn new_doctor(hospital_id: i32, specialty_id: i32, name: &str, slug: &str) -> NewDoctor {
    NewDoctor {
        hospital_id,
        specialty_id,
        name: name.to_string(),
        slug: slug.to_string(),
        specialization: "Interventional Cardiology".to_string(),
        experience: "15 years".to_string(),
        patients_treated: None,
        rating: 4.8,
        reviews: None,
        image: None,
        qualifications: None,
        expertise: Vec::new(),
        bio: None,
        email: None,
        phone: None,
        consultation_fee: None,
        available_days: Vec::new(),
    }
}

pub async fn seed_doctor(
    repo: &InMemoryRepository,
    hospital_id: i32,
    specialty_id: i32,
    name: &str,
    slug: &str,
) -> Doctor {
    repo.create_doctor(new_doctor(hospital_id, specialty_id, name, slug))
        .await
        .expect("doctor inserts")
}

pub async fn seed_treatment(
    repo: &InMemoryRepository,
    hospital_id: i32,
    specialty_id: i32,
    name: &str,
    slug: &str,
) -> Treatment {
    repo.create_treatment(NewTreatment {
        hospital_id,
        specialty_id,
        name: name.to_string(),
        slug: slug.to_string(),
        cost: "$5,000 - $7,000".to_string(),
        description: None,
        duration: None,
        stay: None,
        success_rate: None,
        procedure_type: None,
    })
    .await
    .expect("treatment inserts")
}

pub async fn seed_testimonial(
    repo: &InMemoryRepository,
    hospital_id: i32,
    doctor_id: Option<i32>,
    patient_name: &str,
) -> Testimonial {
    repo.create_testimonial(NewTestimonial {
        hospital_id,
        doctor_id,
        patient_name: patient_name.to_string(),
        age: Some(54),
        country: Some("Kenya".to_string()),
        treatment: "Knee Replacement".to_string(),
        rating: 5,
        story: "Walking again after six weeks.".to_string(),
        image: None,
        date: None,
    })
    .await
    .expect("testimonial inserts")
}
