//! Read-side composition: assembles nested detail views from the entity repositories.
//! Every function here is read-only.

use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::{
        Doctor, DoctorDetail, DoctorRef, Hospital, HospitalDetail, HospitalRef,
        HospitalSpecialtyPage, HospitalWithTreatments, Specialty, SpecialtyDetail,
        SpecialtyHospitals, Testimonial, TestimonialView, Treatment, TreatmentDetail,
    },
    repository::Repository,
};

pub const COMBINATION_NOT_FOUND: &str = "Hospital-Specialty combination not found or not active";

/// Testimonials shown on a hospital + specialty landing page.
pub const LANDING_TESTIMONIAL_LIMIT: i64 = 10;

/// hospital_detail
///
/// The hospital with its active doctors, active treatments and every approved, active
/// testimonial.
pub async fn hospital_detail(repo: &dyn Repository, hospital: Hospital) -> AppResult<HospitalDetail> {
    let doctors = repo.active_doctors(Some(hospital.id), None).await?;
    let treatments = repo.active_treatments(Some(hospital.id), None).await?;
    let testimonials = repo
        .approved_testimonials(Some(hospital.id), None, None)
        .await?;

    Ok(HospitalDetail {
        hospital,
        doctors,
        treatments,
        testimonials,
    })
}

pub async fn specialty_detail(
    repo: &dyn Repository,
    specialty: Specialty,
) -> AppResult<SpecialtyDetail> {
    let doctors = repo.active_doctors(None, Some(specialty.id)).await?;
    let treatments = repo.active_treatments(None, Some(specialty.id)).await?;

    Ok(SpecialtyDetail {
        specialty,
        doctors,
        treatments,
    })
}

pub async fn doctor_detail(repo: &dyn Repository, doctor: Doctor) -> AppResult<DoctorDetail> {
    let hospital = repo.find_hospital(doctor.hospital_id).await?;
    let specialty = repo.find_specialty(doctor.specialty_id).await?;
    let testimonials = repo
        .approved_testimonials(None, Some(doctor.id), None)
        .await?;

    Ok(DoctorDetail {
        doctor,
        hospital,
        specialty,
        testimonials,
    })
}

pub async fn treatment_detail(
    repo: &dyn Repository,
    treatment: Treatment,
) -> AppResult<TreatmentDetail> {
    let hospital = repo.find_hospital(treatment.hospital_id).await?;
    let specialty = repo.find_specialty(treatment.specialty_id).await?;

    Ok(TreatmentDetail {
        treatment,
        hospital,
        specialty,
    })
}

pub async fn testimonial_view(
    repo: &dyn Repository,
    testimonial: Testimonial,
) -> AppResult<TestimonialView> {
    let hospital = repo
        .find_hospital(testimonial.hospital_id)
        .await?
        .map(|h| HospitalRef::from(&h));
    let doctor = match testimonial.doctor_id {
        Some(id) => repo.find_doctor(id).await?.map(|d| DoctorRef::from(&d)),
        None => None,
    };

    Ok(TestimonialView {
        testimonial,
        hospital,
        doctor,
    })
}

/// hospital_specialty_page
///
/// Landing data for one hospital + specialty pair. Both sides must be active and actively
/// assigned to each other, otherwise the pair does not exist as far as callers can tell.
///
/// Testimonials belong to the hospital, not the specialty. A testimonial's doctor is
/// attached only when that doctor practices this specialty; the testimonial itself is
/// listed either way.
pub async fn hospital_specialty_page(
    repo: &dyn Repository,
    hospital_slug: &str,
    specialty_slug: &str,
) -> AppResult<HospitalSpecialtyPage> {
    let not_found = || AppError::not_found(COMBINATION_NOT_FOUND);

    let hospital = repo
        .find_hospital_by_slug(hospital_slug)
        .await?
        .filter(|h| h.is_active)
        .ok_or_else(not_found)?;
    let specialty = repo
        .find_specialty_by_slug(specialty_slug)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(not_found)?;
    repo.find_assignment(hospital.id, specialty.id)
        .await?
        .filter(|a| a.is_active)
        .ok_or_else(not_found)?;

    let doctors = repo
        .active_doctors(Some(hospital.id), Some(specialty.id))
        .await?;
    let treatments = repo
        .active_treatments(Some(hospital.id), Some(specialty.id))
        .await?;
    let recent = repo
        .approved_testimonials(Some(hospital.id), None, Some(LANDING_TESTIMONIAL_LIMIT))
        .await?;

    let mut attributed: HashMap<i32, Option<DoctorRef>> = HashMap::new();
    let mut testimonials = Vec::with_capacity(recent.len());
    for testimonial in recent {
        let doctor = match testimonial.doctor_id {
            Some(doctor_id) => {
                if !attributed.contains_key(&doctor_id) {
                    let found = repo
                        .find_doctor(doctor_id)
                        .await?
                        .filter(|d| d.specialty_id == specialty.id)
                        .map(|d| DoctorRef::from(&d));
                    attributed.insert(doctor_id, found);
                }
                attributed.get(&doctor_id).cloned().flatten()
            }
            None => None,
        };
        testimonials.push(TestimonialView {
            testimonial,
            hospital: None,
            doctor,
        });
    }

    Ok(HospitalSpecialtyPage {
        hospital,
        specialty,
        doctors,
        treatments,
        testimonials,
    })
}

/// specialty_hospitals
///
/// Active hospitals offering the active specialty `slug`, best rated first, each with
/// its active treatments in that specialty.
pub async fn specialty_hospitals(repo: &dyn Repository, slug: &str) -> AppResult<SpecialtyHospitals> {
    let specialty = repo
        .find_specialty_by_slug(slug)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::not_found("Specialty not found"))?;

    let mut hospitals = Vec::new();
    for hospital in repo.hospitals_for_specialty(specialty.id).await? {
        let treatments = repo
            .active_treatments(Some(hospital.id), Some(specialty.id))
            .await?;
        hospitals.push(HospitalWithTreatments {
            hospital,
            treatments,
        });
    }

    Ok(SpecialtyHospitals {
        count: hospitals.len(),
        specialty,
        hospitals,
    })
}
