mod common;

use axum::http::StatusCode;
use common::{
    PASSWORD, empty, get, json, multipart, seed_doctor, seed_hospital, seed_specialty,
    seed_testimonial, seed_treatment, seed_user, spawn_app, spawn_app_with_storage,
};
use medcast_directory::{
    MockStorageService,
    models::Role,
    repository::{HospitalRepository, TestimonialRepository},
};
use serde_json::json;

// --- Service surface ---

#[tokio::test]
async fn health_reports_running() {
    let app = spawn_app();
    let (status, body) = app.send(get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Server is running");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_route_answers_with_the_envelope() {
    let app = spawn_app();
    let (status, body) = app.send(get("/nowhere", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not Found - /nowhere");
}

// --- Accounts ---

#[tokio::test]
async fn register_returns_profile_and_token_without_password() {
    let app = spawn_app();
    let (status, body) = app
        .send(json(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "coord@clinic.in", "password": "hunter22", "name": "Coordinator" }),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["data"]["user"]["email"], "coord@clinic.in");
    assert_eq!(body["data"]["user"]["role"], "hospital_manager");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["data"]["user"].get("password").is_none());
    assert!(body["data"]["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn register_rejects_duplicates_and_the_admin_role() {
    let app = spawn_app();
    seed_user(&app.repo, "taken@clinic.in", Role::Doctor).await;

    let (status, body) = app
        .send(json(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "taken@clinic.in", "password": "hunter22", "name": "Again" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User with this email already exists");

    let (status, body) = app
        .send(json(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "boss@clinic.in", "password": "hunter22", "name": "Boss", "role": "admin" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot register with the admin role");
}

#[tokio::test]
async fn register_validates_email_and_password_length() {
    let app = spawn_app();
    let (status, body) = app
        .send(json(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "not-an-email", "password": "123", "name": "X" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Please provide a valid email"));
    assert!(message.contains("Password must be at least 6 characters"));
}

#[tokio::test]
async fn login_does_not_reveal_which_credential_was_wrong() {
    let app = spawn_app();
    seed_user(&app.repo, "doc@clinic.in", Role::Doctor).await;

    let (status, wrong_password) = app
        .send(json(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "doc@clinic.in", "password": "nope-nope" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_email) = app
        .send(json(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "ghost@clinic.in", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], "Invalid credentials");
    assert_eq!(unknown_email["message"], "Invalid credentials");
}

#[tokio::test]
async fn login_then_read_profile() {
    let app = spawn_app();
    seed_user(&app.repo, "doc@clinic.in", Role::Doctor).await;

    let (status, body) = app
        .send(json(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "doc@clinic.in", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, profile) = app.send(get("/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["data"]["email"], "doc@clinic.in");
    assert_eq!(profile["data"]["role"], "doctor");
}

#[tokio::test]
async fn change_password_checks_the_current_one() {
    let app = spawn_app();
    let user = seed_user(&app.repo, "doc@clinic.in", Role::Doctor).await;
    let token = app.token_for(user.id, Role::Doctor);

    let (status, body) = app
        .send(json(
            "PUT",
            "/api/auth/change-password",
            Some(&token),
            json!({ "currentPassword": "wrong-one", "newPassword": "brand-new" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, body) = app
        .send(json(
            "PUT",
            "/api/auth/change-password",
            Some(&token),
            json!({ "currentPassword": PASSWORD, "newPassword": "brand-new" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully");

    let (status, _) = app
        .send(json(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "doc@clinic.in", "password": "brand-new" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_email_cannot_take_another_accounts_address() {
    let app = spawn_app();
    seed_user(&app.repo, "first@clinic.in", Role::Doctor).await;
    let second = seed_user(&app.repo, "second@clinic.in", Role::Doctor).await;
    let token = app.token_for(second.id, Role::Doctor);

    let (status, body) = app
        .send(json(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            json!({ "email": "first@clinic.in" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already in use");
}

// --- Hospitals ---

#[tokio::test]
async fn admin_creates_hospital_with_generated_slug_and_default_country() {
    let app = spawn_app();
    let token = app.admin_token();

    let (status, body) = app
        .send(json(
            "POST",
            "/api/hospitals",
            Some(&token),
            json!({
                "name": "  Apollo Hospitals  ",
                "location": "Sarita Vihar",
                "city": "New Delhi",
                "state": "Delhi",
                "specialty": "Cardiac care",
                "rating": 4.7
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "Apollo Hospitals");
    assert_eq!(body["data"]["slug"], "apollo-hospitals");
    assert_eq!(body["data"]["country"], "India");
    assert_eq!(body["data"]["isActive"], true);
}

#[tokio::test]
async fn hospital_create_names_the_missing_field() {
    let app = spawn_app();
    let token = app.admin_token();

    let (status, body) = app
        .send(json(
            "POST",
            "/api/hospitals",
            Some(&token),
            json!({ "name": "Apollo", "location": "Sarita Vihar", "state": "Delhi", "specialty": "x" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "City is required");
}

#[tokio::test]
async fn multipart_create_stores_the_image_under_the_requested_folder() {
    let app = spawn_app_with_storage(MockStorageService::new());
    let token = app.admin_token();
    let fields = [
        ("name", "Fortis Memorial"),
        ("location", "Sector 44"),
        ("city", "Gurugram"),
        ("state", "Haryana"),
        ("specialty", "Transplants"),
        ("rating", "4.4"),
        ("folder", "hospitals"),
    ];

    let (status, body) = app
        .send(multipart(
            "POST",
            "/api/hospitals",
            Some(&token),
            &fields,
            Some(("front.png", "image/png", b"\x89PNG fake bytes")),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["rating"], 4.4);
    let image = body["data"]["image"].as_str().unwrap();
    assert!(image.starts_with("/uploads/hospitals/"), "got {}", image);
    assert!(image.ends_with(".png"));
}

#[tokio::test]
async fn multipart_without_folder_uses_the_general_folder() {
    let app = spawn_app();
    let token = app.admin_token();

    let (status, body) = app
        .send(multipart(
            "POST",
            "/api/specialties",
            Some(&token),
            &[("name", "Dermatology")],
            Some(("icon.jpg", "image/jpeg", b"jpeg bytes")),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let image = body["data"]["imageUrl"].as_str().unwrap();
    assert!(image.starts_with("/uploads/general/"), "got {}", image);
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let app = spawn_app();
    let token = app.admin_token();

    let (status, body) = app
        .send(multipart(
            "POST",
            "/api/specialties",
            Some(&token),
            &[("name", "Dermatology")],
            Some(("notes.txt", "text/plain", b"hello")),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only image files are allowed");
}

#[tokio::test]
async fn storage_failure_is_a_generic_500() {
    let app = spawn_app_with_storage(MockStorageService::new_failing());
    let token = app.admin_token();

    let (status, body) = app
        .send(multipart(
            "POST",
            "/api/specialties",
            Some(&token),
            &[("name", "Dermatology")],
            Some(("icon.png", "image/png", b"png")),
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Something went wrong");
    assert!(body.get("error").is_none(), "detail stays hidden outside development");
}

#[tokio::test]
async fn renaming_a_hospital_regenerates_its_slug() {
    let app = spawn_app();
    let token = app.admin_token();
    let hospital = seed_hospital(&app.repo, "Max Saket", "max-saket").await;
    seed_hospital(&app.repo, "Max Super Speciality", "max-super-speciality").await;

    let uri = format!("/api/hospitals/{}", hospital.id);
    let (status, body) = app
        .send(json("PUT", &uri, Some(&token), json!({ "name": "Max Super Speciality" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "max-super-speciality-1");

    let (_, body) = app
        .send(json("PUT", &uri, Some(&token), json!({ "name": "Max Super Speciality", "city": "Delhi" })))
        .await;
    assert_eq!(body["data"]["slug"], "max-super-speciality-1", "same name keeps the slug");
    assert_eq!(body["data"]["city"], "Delhi");
}

#[tokio::test]
async fn deleted_hospital_is_hidden_from_public_but_not_from_admins() {
    let app = spawn_app();
    let token = app.admin_token();
    seed_hospital(&app.repo, "Open", "open").await;
    let closed = seed_hospital(&app.repo, "Closed", "closed").await;

    let (status, body) = app
        .send(empty("DELETE", &format!("/api/hospitals/{}", closed.id), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hospital deleted successfully");

    let (_, list) = app.send(get("/api/hospitals", None)).await;
    assert_eq!(list["data"]["pagination"]["total"], 1);
    assert_eq!(list["data"]["hospitals"][0]["slug"], "open");

    let uri = format!("/api/hospitals/{}", closed.id);
    let (status, _) = app.send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.send(get(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);
}

#[tokio::test]
async fn hospital_list_paginates_and_filters_by_city() {
    let app = spawn_app();
    for i in 0..3 {
        seed_hospital(&app.repo, &format!("Delhi {}", i), &format!("delhi-{}", i)).await;
    }
    let mut mumbai = common::new_hospital("Lilavati", "lilavati");
    mumbai.city = "Mumbai".to_string();
    app.repo.create_hospital(mumbai).await.unwrap();

    let (_, body) = app.send(get("/api/hospitals?limit=2&page=2", None)).await;
    assert_eq!(body["data"]["pagination"]["total"], 4);
    assert_eq!(body["data"]["pagination"]["page"], 2);
    assert_eq!(body["data"]["pagination"]["pages"], 2);
    assert_eq!(body["data"]["hospitals"].as_array().unwrap().len(), 2);

    let (_, body) = app.send(get("/api/hospitals?city=mumbai", None)).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["hospitals"][0]["slug"], "lilavati");
}

#[tokio::test]
async fn oversized_page_and_limit_are_answered_not_dropped() {
    let app = spawn_app();
    seed_hospital(&app.repo, "Apollo", "apollo").await;
    seed_hospital(&app.repo, "Fortis", "fortis").await;

    let max = i64::MAX;
    let (status, body) = app.send(get(&format!("/api/hospitals?limit={}", max), None)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["pagination"]["total"], 2);
    assert_eq!(body["data"]["pagination"]["pages"], 1);
    assert_eq!(body["data"]["hospitals"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .send(get(&format!("/api/hospitals?limit={}&page={}", max, max), None))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["pagination"]["page"], max);
    assert!(body["data"]["hospitals"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn hospital_detail_nests_active_children_and_approved_stories() {
    let app = spawn_app();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Cardiology", "cardiology").await;
    seed_doctor(&app.repo, hospital.id, specialty.id, "Dr. Rao", "dr-rao").await;
    seed_treatment(&app.repo, hospital.id, specialty.id, "Bypass", "bypass").await;
    let shown = seed_testimonial(&app.repo, hospital.id, None, "Shown").await;
    seed_testimonial(&app.repo, hospital.id, None, "Pending").await;
    app.repo.approve_testimonial(shown.id).await.unwrap();

    let (status, body) = app.send(get("/api/hospitals/slug/apollo", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Apollo");
    assert_eq!(body["data"]["doctors"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["treatments"].as_array().unwrap().len(), 1);
    let stories = body["data"]["testimonials"].as_array().unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0]["patientName"], "Shown");
}

// --- Hospital / specialty assignments ---

#[tokio::test]
async fn attach_rejects_empty_and_unknown_ids() {
    let app = spawn_app();
    let token = app.admin_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Cardiology", "cardiology").await;
    let uri = format!("/api/hospitals/{}/specialties", hospital.id);

    let (status, body) = app
        .send(json("POST", &uri, Some(&token), json!({ "specialtyIds": [] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "specialtyIds must be a non-empty array");

    let (status, body) = app
        .send(json("POST", &uri, Some(&token), json!({ "specialtyIds": [specialty.id, 999] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "One or more specialty IDs are invalid");
    assert!(app.repo.specialties_of_hospital(hospital.id).await.unwrap().is_empty());

    let (status, _) = app
        .send(json("POST", "/api/hospitals/999/specialties", Some(&token), json!({ "specialtyIds": [specialty.id] })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn landing_page_exists_only_while_the_pair_is_assigned() {
    let app = spawn_app();
    let token = app.admin_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Cardiology", "cardiology").await;
    seed_doctor(&app.repo, hospital.id, specialty.id, "Dr. Rao", "dr-rao").await;

    let (status, body) = app.send(get("/api/hospitals/apollo/cardiology", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Hospital-Specialty combination not found or not active");

    let (status, body) = app
        .send(json(
            "POST",
            &format!("/api/hospitals/{}/specialties", hospital.id),
            Some(&token),
            json!({ "specialtyIds": [specialty.id] }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = app.send(get("/api/hospitals/apollo/cardiology", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hospital"]["slug"], "apollo");
    assert_eq!(body["data"]["specialty"]["slug"], "cardiology");
    assert_eq!(body["data"]["doctors"][0]["name"], "Dr. Rao");

    let (_, combos) = app.send(get("/api/hospitals/specialty-combinations", None)).await;
    assert_eq!(combos["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(empty(
            "DELETE",
            &format!("/api/hospitals/{}/specialties/{}", hospital.id, specialty.id),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(get("/api/hospitals/apollo/cardiology", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn landing_page_lists_recent_approved_stories_scoped_to_the_pair() {
    let app = spawn_app();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let other_hospital = seed_hospital(&app.repo, "Fortis", "fortis").await;
    let cardiology = seed_specialty(&app.repo, "Cardiology", "cardiology").await;
    let neurology = seed_specialty(&app.repo, "Neurology", "neurology").await;
    app.repo
        .attach_specialties(hospital.id, &[cardiology.id, neurology.id])
        .await
        .unwrap();

    let rao = seed_doctor(&app.repo, hospital.id, cardiology.id, "Dr. Rao", "dr-rao").await;
    let sen = seed_doctor(&app.repo, hospital.id, neurology.id, "Dr. Sen", "dr-sen").await;
    seed_treatment(&app.repo, hospital.id, cardiology.id, "Bypass", "bypass").await;
    seed_treatment(&app.repo, hospital.id, neurology.id, "Spine Fusion", "spine-fusion").await;

    // Twelve approved stories; every third is credited to the neurology doctor.
    for i in 0..12 {
        let doctor = match i % 3 {
            0 => Some(sen.id),
            1 => Some(rao.id),
            _ => None,
        };
        let story =
            seed_testimonial(&app.repo, hospital.id, doctor, &format!("Patient {}", i)).await;
        app.repo.approve_testimonial(story.id).await.unwrap();
    }
    let withdrawn = seed_testimonial(&app.repo, hospital.id, None, "Withdrawn").await;
    app.repo.approve_testimonial(withdrawn.id).await.unwrap();
    app.repo.soft_delete_testimonial(withdrawn.id).await.unwrap();
    let elsewhere = seed_testimonial(&app.repo, other_hospital.id, None, "Elsewhere").await;
    app.repo.approve_testimonial(elsewhere.id).await.unwrap();
    seed_testimonial(&app.repo, hospital.id, Some(rao.id), "Pending").await;

    let (status, body) = app.send(get("/api/hospitals/apollo/cardiology", None)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let page = &body["data"];

    let doctors: Vec<&str> = page["doctors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(doctors, vec!["Dr. Rao"]);
    let treatments: Vec<&str> = page["treatments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(treatments, vec!["Bypass"]);

    let stories = page["testimonials"].as_array().unwrap();
    let names: Vec<&str> = stories
        .iter()
        .map(|t| t["patientName"].as_str().unwrap())
        .collect();
    let expected: Vec<String> = (2..12).rev().map(|i| format!("Patient {}", i)).collect();
    assert_eq!(names, expected);

    let by_name = |name: &str| stories.iter().find(|t| t["patientName"] == name).unwrap();
    assert_eq!(by_name("Patient 10")["doctor"]["name"], "Dr. Rao");
    assert!(by_name("Patient 9")["doctor"].is_null());
    assert_eq!(by_name("Patient 9")["doctorId"], sen.id);
    assert!(by_name("Patient 11")["doctor"].is_null());
}

#[tokio::test]
async fn specialty_hospitals_lists_assigned_hospitals_by_slug() {
    let app = spawn_app();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Cardiology", "cardiology").await;
    app.repo.attach_specialties(hospital.id, &[specialty.id]).await.unwrap();
    seed_treatment(&app.repo, hospital.id, specialty.id, "Bypass", "bypass").await;

    let (status, body) = app.send(get("/api/specialties/cardiology/hospitals", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["hospitals"][0]["slug"], "apollo");
    assert_eq!(body["data"]["hospitals"][0]["treatments"][0]["name"], "Bypass");
}

// --- Specialties ---

#[tokio::test]
async fn specialty_names_are_unique() {
    let app = spawn_app();
    let token = app.admin_token();
    seed_specialty(&app.repo, "Cardiology", "cardiology").await;

    let (status, body) = app
        .send(json("POST", "/api/specialties", Some(&token), json!({ "name": "Cardiology" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Specialty with this name already exists");
}

// --- Doctors ---

#[tokio::test]
async fn manager_creates_doctor_with_list_fields() {
    let app = spawn_app();
    let token = app.manager_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Cardiology", "cardiology").await;

    let (status, body) = app
        .send(json(
            "POST",
            "/api/doctors",
            Some(&token),
            json!({
                "hospitalId": hospital.id,
                "specialtyId": specialty.id,
                "name": "Dr. Meera Iyer",
                "specialization": "Electrophysiology",
                "experience": "12 years",
                "expertise": ["Ablation", "Pacemakers"]
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["slug"], "dr-meera-iyer");
    assert_eq!(body["data"]["expertise"], json!(["Ablation", "Pacemakers"]));
    assert_eq!(body["data"]["availableDays"], json!([]));
}

#[tokio::test]
async fn doctor_cannot_join_an_inactive_hospital() {
    let app = spawn_app();
    let token = app.manager_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Cardiology", "cardiology").await;
    app.repo.soft_delete_hospital(hospital.id).await.unwrap();

    let (status, body) = app
        .send(json(
            "POST",
            "/api/doctors",
            Some(&token),
            json!({
                "hospitalId": hospital.id,
                "specialtyId": specialty.id,
                "name": "Dr. X",
                "specialization": "Y",
                "experience": "1 year"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Hospital not found");
}

#[tokio::test]
async fn multipart_doctor_accepts_text_lists() {
    let app = spawn_app();
    let token = app.manager_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Cardiology", "cardiology").await;
    let hospital_id = hospital.id.to_string();
    let specialty_id = specialty.id.to_string();

    let (status, body) = app
        .send(multipart(
            "POST",
            "/api/doctors",
            Some(&token),
            &[
                ("hospitalId", hospital_id.as_str()),
                ("specialtyId", specialty_id.as_str()),
                ("name", "Dr. Sen"),
                ("specialization", "Cardiology"),
                ("experience", "20 years"),
                ("availableDays", "Mon, Wed ,Fri"),
                ("consultationFee", "75.5"),
            ],
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["availableDays"], json!(["Mon", "Wed", "Fri"]));
    assert_eq!(body["data"]["consultationFee"], 75.5);
}

// --- Treatments ---

#[tokio::test]
async fn fourth_popular_toggle_is_refused() {
    let app = spawn_app();
    let token = app.admin_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Orthopedics", "orthopedics").await;

    let mut ids = Vec::new();
    for i in 0..4 {
        let name = format!("Knee {}", i);
        let slug = format!("knee-{}", i);
        ids.push(seed_treatment(&app.repo, hospital.id, specialty.id, &name, &slug).await.id);
    }

    for id in &ids[..3] {
        let (status, body) = app
            .send(empty("PATCH", &format!("/api/treatments/{}/toggle-popular", id), Some(&token)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Treatment marked as popular successfully");
    }

    let (status, body) = app
        .send(empty("PATCH", &format!("/api/treatments/{}/toggle-popular", ids[3]), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Maximum of 3 treatments can be marked as popular. Please unmark another treatment first."
    );

    let (_, popular) = app.send(get("/api/treatments/popular", None)).await;
    assert_eq!(popular["data"].as_array().unwrap().len(), 3);

    let (status, body) = app
        .send(empty("PATCH", &format!("/api/treatments/{}/toggle-popular", ids[0]), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Treatment unmarked from popular successfully");
}

#[tokio::test]
async fn reactivating_a_popular_treatment_keeps_the_cap() {
    let app = spawn_app();
    let admin = app.admin_token();
    let manager = app.manager_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Orthopedics", "orthopedics").await;

    let mut ids = Vec::new();
    for i in 0..4 {
        let name = format!("Knee {}", i);
        let slug = format!("knee-{}", i);
        ids.push(seed_treatment(&app.repo, hospital.id, specialty.id, &name, &slug).await.id);
    }
    for id in &ids[..3] {
        app.send(empty("PATCH", &format!("/api/treatments/{}/toggle-popular", id), Some(&admin)))
            .await;
    }

    let (status, _) = app
        .send(empty("DELETE", &format!("/api/treatments/{}", ids[0]), Some(&manager)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(empty("PATCH", &format!("/api/treatments/{}/toggle-popular", ids[3]), Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(json(
            "PUT",
            &format!("/api/treatments/{}", ids[0]),
            Some(&manager),
            json!({ "isActive": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Maximum of 3 treatments can be marked as popular. Please unmark another treatment first."
    );

    let (_, listed) = app.send(get("/api/treatments?limit=50", None)).await;
    let featured = listed["data"]["treatments"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|t| t["isPopular"] == true && t["isActive"] == true)
        .count();
    assert_eq!(featured, 3);
}

#[tokio::test]
async fn treatment_create_requires_cost() {
    let app = spawn_app();
    let token = app.manager_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let specialty = seed_specialty(&app.repo, "Orthopedics", "orthopedics").await;

    let (status, body) = app
        .send(json(
            "POST",
            "/api/treatments",
            Some(&token),
            json!({ "hospitalId": hospital.id, "specialtyId": specialty.id, "name": "Hip" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cost is required");
}

// --- Testimonials ---

#[tokio::test]
async fn testimonial_flow_from_submission_to_approval() {
    let app = spawn_app();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;
    let story = json!({
        "hospitalId": hospital.id,
        "patientName": "Grace",
        "treatment": "Hip Replacement",
        "rating": 5,
        "story": "Back to hiking."
    });

    let (status, _) = app
        .send(json("POST", "/api/testimonials", None, story.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.doctor_token();
    let (status, body) = app
        .send(json("POST", "/api/testimonials", Some(&token), story))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Testimonial created successfully and pending approval");
    assert_eq!(body["data"]["isApproved"], false);
    let id = body["data"]["id"].as_i64().unwrap();

    let (_, public) = app.send(get("/api/testimonials", None)).await;
    assert_eq!(public["data"]["pagination"]["total"], 0);
    let (status, _) = app.send(get(&format!("/api/testimonials/{}", id), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let admin = app.admin_token();
    let (status, body) = app
        .send(empty("PATCH", &format!("/api/testimonials/{}/approve", id), Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Testimonial approved successfully");

    let (_, public) = app.send(get("/api/testimonials", None)).await;
    assert_eq!(public["data"]["pagination"]["total"], 1);
    assert_eq!(public["data"]["testimonials"][0]["patientName"], "Grace");
}

#[tokio::test]
async fn testimonial_rating_must_be_one_to_five() {
    let app = spawn_app();
    let token = app.doctor_token();
    let hospital = seed_hospital(&app.repo, "Apollo", "apollo").await;

    let (status, body) = app
        .send(json(
            "POST",
            "/api/testimonials",
            Some(&token),
            json!({
                "hospitalId": hospital.id,
                "patientName": "Grace",
                "treatment": "Hip",
                "rating": 9,
                "story": "..."
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Rating must be between 1 and 5");
}
