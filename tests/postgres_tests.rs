mod common;

use common::{new_hospital, new_specialty};
use medcast_directory::{
    AppError, PostgresRepository,
    models::{NewTreatment, PageRequest, Treatment, TreatmentFilter, TreatmentInput},
    repository::{
        HospitalRepository, POPULAR_LIMIT_MESSAGE, SpecialtyRepository, TreatmentRepository,
    },
};
use serial_test::serial;
use sqlx::PgPool;

// --- Test Context and Setup ---

/// Holds a pool on a freshly truncated database. Tests in this file run only when
/// `DATABASE_URL` points at a disposable Postgres instance.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping Postgres test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        sqlx::query(
            "TRUNCATE testimonials, treatments, doctors, hospital_specialties, users, \
             specialties, hospitals RESTART IDENTITY CASCADE",
        )
        .execute(&pool)
        .await
        .expect("Failed to reset tables.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

async fn seed_treatments(repo: &PostgresRepository, names: &[&str]) -> Vec<Treatment> {
    let hospital = repo
        .create_hospital(new_hospital("Apollo", "apollo"))
        .await
        .expect("hospital inserts");
    let specialty = repo
        .create_specialty(new_specialty("Orthopedics", "orthopedics"))
        .await
        .expect("specialty inserts");

    let mut rows = Vec::new();
    for name in names {
        let treatment = repo
            .create_treatment(NewTreatment {
                hospital_id: hospital.id,
                specialty_id: specialty.id,
                name: name.to_string(),
                slug: name.to_lowercase().replace(' ', "-"),
                cost: "$5,000".to_string(),
                description: None,
                duration: None,
                stay: None,
                success_rate: None,
                procedure_type: None,
            })
            .await
            .expect("treatment inserts");
        rows.push(treatment);
    }
    rows
}

#[tokio::test]
#[serial]
async fn reactivation_is_refused_when_the_popular_cap_is_full() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let ids: Vec<i32> = seed_treatments(&repo, &["Knee 0", "Knee 1", "Knee 2", "Knee 3"])
        .await
        .iter()
        .map(|t| t.id)
        .collect();

    for id in &ids[..3] {
        repo.toggle_popular(*id).await.unwrap();
    }
    repo.soft_delete_treatment(ids[0]).await.unwrap();
    repo.toggle_popular(ids[3]).await.unwrap();

    let reactivate = TreatmentInput {
        is_active: Some(true),
        ..Default::default()
    };
    let err = repo.update_treatment(ids[0], &reactivate).await.unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(ref m) if m == POPULAR_LIMIT_MESSAGE));

    let featured: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM treatments WHERE is_popular = true AND is_active = true",
    )
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(featured, 3);

    repo.toggle_popular(ids[3]).await.unwrap();
    let back = repo.update_treatment(ids[0], &reactivate).await.unwrap().unwrap();
    assert!(back.is_active && back.is_popular);
}

#[tokio::test]
#[serial]
async fn search_wildcards_match_literally() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    seed_treatments(&repo, &["Knee Replacement", "Hip 100% Recovery"]).await;

    let search = |term: &str| TreatmentFilter {
        search: Some(term.to_string()),
        ..Default::default()
    };
    let page = PageRequest::new(None, None, 10);

    let (rows, total) = repo.list_treatments(&search("%"), page).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].name, "Hip 100% Recovery");

    let (_, total) = repo.list_treatments(&search("_"), page).await.unwrap();
    assert_eq!(total, 0);
}
