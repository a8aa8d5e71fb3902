//! Startup provisioning: the admin account and the starter specialty catalogue.

use crate::{
    auth::hash_password,
    config::AppConfig,
    error::AppResult,
    models::{NewSpecialty, NewUser, PageRequest, Role, SpecialtyFilter},
    repository::Repository,
};

const ADMIN_NAME: &str = "System Administrator";

struct SeedSpecialty {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    icon: &'static str,
    clinics_count: i32,
    bg_color: &'static str,
    icon_bg: &'static str,
    icon_color: &'static str,
    image_url: Option<&'static str>,
}

const DEFAULT_SPECIALTIES: &[SeedSpecialty] = &[
    SeedSpecialty {
        name: "Cardiac Surgery",
        slug: "cardiac-surgery",
        description: "Specialized surgical procedures for heart conditions",
        icon: "Heart",
        clinics_count: 896,
        bg_color: "bg-green-50",
        icon_bg: "bg-green-100",
        icon_color: "text-green-600",
        image_url: Some("/images/Cardio.png"),
    },
    SeedSpecialty {
        name: "Neurology",
        slug: "neurology",
        description: "Diagnosis and treatment of nervous system disorders",
        icon: "Brain",
        clinics_count: 788,
        bg_color: "bg-blue-50",
        icon_bg: "bg-blue-100",
        icon_color: "text-blue-600",
        image_url: Some("/images/Neuro.png"),
    },
    SeedSpecialty {
        name: "Oncology",
        slug: "oncology",
        description: "Cancer diagnosis, treatment, and care",
        icon: "Shield",
        clinics_count: 585,
        bg_color: "bg-red-50",
        icon_bg: "bg-red-100",
        icon_color: "text-red-600",
        image_url: Some("/images/oncology-new.png"),
    },
    SeedSpecialty {
        name: "Orthopedics",
        slug: "orthopedics",
        description: "Treatment of musculoskeletal system conditions",
        icon: "Bone",
        clinics_count: 884,
        bg_color: "bg-yellow-50",
        icon_bg: "bg-yellow-100",
        icon_color: "text-yellow-600",
        image_url: Some("/images/Ortho.png"),
    },
    SeedSpecialty {
        name: "BMT",
        slug: "bmt",
        description: "Bone Marrow Transplantation services",
        icon: "Activity",
        clinics_count: 120,
        bg_color: "bg-purple-50",
        icon_bg: "bg-purple-100",
        icon_color: "text-purple-600",
        image_url: None,
    },
    SeedSpecialty {
        name: "GI Surgery",
        slug: "gi-surgery",
        description: "Gastrointestinal surgical procedures",
        icon: "Stethoscope",
        clinics_count: 456,
        bg_color: "bg-indigo-50",
        icon_bg: "bg-indigo-100",
        icon_color: "text-indigo-600",
        image_url: None,
    },
];

/// ensure_admin
///
/// Creates the configured admin account when no user holds that email yet. An existing
/// account is left untouched, whatever its role or password.
pub async fn ensure_admin(repo: &dyn Repository, config: &AppConfig) -> AppResult<()> {
    if repo.find_user_by_email(&config.admin_email).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(&config.admin_password, config.bcrypt_cost).await?;
    let admin = repo
        .create_user(NewUser {
            email: config.admin_email.clone(),
            password_hash,
            name: ADMIN_NAME.to_string(),
            role: Role::Admin,
            hospital_id: None,
        })
        .await?;

    tracing::warn!(
        user_id = admin.id,
        email = %admin.email,
        "default admin account created, change its password after first login"
    );
    Ok(())
}

/// seed_specialties
///
/// Loads the starter catalogue into an empty specialty table. Returns how many rows
/// were inserted; zero when the table already had any row, active or not.
pub async fn seed_specialties(repo: &dyn Repository) -> AppResult<usize> {
    let (_, existing) = repo
        .list_specialties(&SpecialtyFilter::default(), PageRequest::new(None, Some(1), 1))
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    for seed in DEFAULT_SPECIALTIES {
        repo.create_specialty(NewSpecialty {
            name: seed.name.to_string(),
            slug: seed.slug.to_string(),
            description: Some(seed.description.to_string()),
            icon: Some(seed.icon.to_string()),
            clinics_count: seed.clinics_count,
            bg_color: Some(seed.bg_color.to_string()),
            icon_bg: Some(seed.icon_bg.to_string()),
            icon_color: Some(seed.icon_color.to_string()),
            image_url: seed.image_url.map(str::to_string),
        })
        .await?;
    }

    tracing::info!(count = DEFAULT_SPECIALTIES.len(), "default specialties created");
    Ok(DEFAULT_SPECIALTIES.len())
}

/// Runs every startup provisioning step.
pub async fn run(repo: &dyn Repository, config: &AppConfig) -> AppResult<()> {
    ensure_admin(repo, config).await?;
    seed_specialties(repo).await?;
    Ok(())
}
