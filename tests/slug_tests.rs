mod common;

use common::{new_doctor, seed_hospital, seed_specialty};
use medcast_directory::{
    InMemoryRepository,
    repository::DoctorRepository,
    slug::{SlugTable, normalize, resolve_unique},
};

#[test]
fn normalize_lowercases_and_joins_words() {
    assert_eq!(normalize("Apollo Hospitals"), "apollo-hospitals");
    assert_eq!(normalize("  Max   Super  Speciality "), "max-super-speciality");
}

#[test]
fn normalize_spells_out_ampersand_and_drops_punctuation() {
    assert_eq!(normalize("Ear, Nose & Throat"), "ear-nose-and-throat");
    assert_eq!(normalize("Dr. O'Neil"), "dr-oneil");
}

#[test]
fn normalize_folds_diacritics() {
    assert_eq!(
        normalize("Clínica Médica São Paulo"),
        "clinica-medica-sao-paulo"
    );
}

#[test]
fn normalize_treats_hyphens_as_separators() {
    assert_eq!(
        normalize("Bone-Marrow  Transplant (BMT)"),
        "bone-marrow-transplant-bmt"
    );
    assert_eq!(normalize("--GI -- Surgery--"), "gi-surgery");
}

#[test]
fn normalize_of_symbols_only_is_empty() {
    assert_eq!(normalize("!!!"), "");
}

#[tokio::test]
async fn resolve_unique_appends_counters_on_collision() {
    let repo = InMemoryRepository::new();

    let first = resolve_unique(&repo, SlugTable::Hospitals, "Fortis Hospital", None)
        .await
        .unwrap();
    assert_eq!(first, "fortis-hospital");
    seed_hospital(&repo, "Fortis Hospital", &first).await;

    let second = resolve_unique(&repo, SlugTable::Hospitals, "Fortis Hospital", None)
        .await
        .unwrap();
    assert_eq!(second, "fortis-hospital-1");
    seed_hospital(&repo, "Fortis Hospital", &second).await;

    let third = resolve_unique(&repo, SlugTable::Hospitals, "Fortis  hospital!", None)
        .await
        .unwrap();
    assert_eq!(third, "fortis-hospital-2");
}

#[tokio::test]
async fn resolve_unique_ignores_the_row_being_renamed() {
    let repo = InMemoryRepository::new();
    let hospital = seed_hospital(&repo, "Medanta", "medanta").await;

    let slug = resolve_unique(&repo, SlugTable::Hospitals, "Medanta", Some(hospital.id))
        .await
        .unwrap();
    assert_eq!(slug, "medanta");
}

#[tokio::test]
async fn slug_namespaces_are_per_table() {
    let repo = InMemoryRepository::new();
    let hospital = seed_hospital(&repo, "Oncology", "oncology").await;
    let specialty = seed_specialty(&repo, "Oncology", "oncology").await;
    repo.create_doctor(new_doctor(hospital.id, specialty.id, "Oncology", "oncology"))
        .await
        .unwrap();

    let treatment = resolve_unique(&repo, SlugTable::Treatments, "Oncology", None)
        .await
        .unwrap();
    assert_eq!(treatment, "oncology");

    let doctor = resolve_unique(&repo, SlugTable::Doctors, "Oncology", None)
        .await
        .unwrap();
    assert_eq!(doctor, "oncology-1");
}

#[tokio::test]
async fn unsluggable_names_fall_back_to_the_entity_word() {
    let repo = InMemoryRepository::new();

    let slug = resolve_unique(&repo, SlugTable::Doctors, "***", None)
        .await
        .unwrap();
    assert_eq!(slug, "doctor");
}
