use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        Doctor, DoctorFilter, DoctorInput, Hospital, HospitalFilter, HospitalInput,
        HospitalSpecialty, NewDoctor, NewHospital, NewSpecialty, NewTestimonial, NewTreatment,
        NewUser, PageRequest, Specialty, SpecialtyCombination, SpecialtyFilter, SpecialtyInput,
        Testimonial, TestimonialFilter, TestimonialInput, Treatment, TreatmentFilter,
        TreatmentInput, User,
    },
    slug::SlugTable,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Most treatments that may carry `is_popular` at once.
pub const POPULAR_TREATMENT_LIMIT: i64 = 3;

pub const POPULAR_LIMIT_MESSAGE: &str =
    "Maximum of 3 treatments can be marked as popular. Please unmark another treatment first.";

// Every list method returns the requested page together with the unpaged total.
pub type Page<T> = (Vec<T>, i64);

/// SlugStore
///
/// Read-only collision check used by the slug generator.
#[async_trait]
pub trait SlugStore: Send + Sync {
    /// True when `slug` already belongs to a row of `table` other than `exclude_id`.
    async fn slug_taken(&self, table: SlugTable, slug: &str, exclude_id: Option<i32>)
    -> AppResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: i32) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    /// Partial update; `None` leaves the column as it is.
    async fn update_user_profile(
        &self,
        id: i32,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<Option<User>>;
    async fn update_user_password(&self, id: i32, password_hash: &str) -> AppResult<bool>;
}

/// HospitalRepository
///
/// Hospitals plus the hospital/specialty junction. The junction is only ever touched
/// through `attach_specialties` and `detach_specialty`.
#[async_trait]
pub trait HospitalRepository: Send + Sync {
    /// Filtered page ordered by `created_at DESC`. `filter.is_active` is applied when set.
    async fn list_hospitals(&self, filter: &HospitalFilter, page: PageRequest)
    -> AppResult<Page<Hospital>>;
    async fn find_hospital(&self, id: i32) -> AppResult<Option<Hospital>>;
    async fn find_hospital_by_slug(&self, slug: &str) -> AppResult<Option<Hospital>>;
    async fn create_hospital(&self, hospital: NewHospital) -> AppResult<Hospital>;
    /// Applies the fields present in `changes`. `Ok(None)` when the row does not exist.
    async fn update_hospital(&self, id: i32, changes: &HospitalInput)
    -> AppResult<Option<Hospital>>;
    /// Sets `is_active = false`. Returns false only when the row does not exist.
    async fn soft_delete_hospital(&self, id: i32) -> AppResult<bool>;

    /// Inserts missing pairs and re-activates inactive ones, in one unit of work.
    /// Callers validate every id first.
    async fn attach_specialties(&self, hospital_id: i32, specialty_ids: &[i32]) -> AppResult<()>;
    /// Flips the pair inactive. A missing pair is not an error.
    async fn detach_specialty(&self, hospital_id: i32, specialty_id: i32) -> AppResult<()>;
    async fn find_assignment(
        &self,
        hospital_id: i32,
        specialty_id: i32,
    ) -> AppResult<Option<HospitalSpecialty>>;
    /// Active specialties on active assignments of the hospital, by name.
    async fn specialties_of_hospital(&self, hospital_id: i32) -> AppResult<Vec<Specialty>>;
    /// Active hospitals actively assigned to the specialty, by rating then name.
    async fn hospitals_for_specialty(&self, specialty_id: i32) -> AppResult<Vec<Hospital>>;
    /// Every active assignment whose hospital and specialty are both active.
    async fn specialty_combinations(&self) -> AppResult<Vec<SpecialtyCombination>>;
}

#[async_trait]
pub trait SpecialtyRepository: Send + Sync {
    /// Filtered page ordered by name.
    async fn list_specialties(&self, filter: &SpecialtyFilter, page: PageRequest)
    -> AppResult<Page<Specialty>>;
    async fn find_specialty(&self, id: i32) -> AppResult<Option<Specialty>>;
    async fn find_specialty_by_slug(&self, slug: &str) -> AppResult<Option<Specialty>>;
    /// Exact, case-sensitive name lookup.
    async fn find_specialty_by_name(&self, name: &str) -> AppResult<Option<Specialty>>;
    /// How many of `ids` exist, active or not. Duplicates in `ids` are counted once.
    async fn count_existing_specialties(&self, ids: &[i32]) -> AppResult<i64>;
    async fn create_specialty(&self, specialty: NewSpecialty) -> AppResult<Specialty>;
    async fn update_specialty(&self, id: i32, changes: &SpecialtyInput)
    -> AppResult<Option<Specialty>>;
    async fn soft_delete_specialty(&self, id: i32) -> AppResult<bool>;
}

#[async_trait]
pub trait DoctorRepository: Send + Sync {
    async fn list_doctors(&self, filter: &DoctorFilter, page: PageRequest)
    -> AppResult<Page<Doctor>>;
    async fn find_doctor(&self, id: i32) -> AppResult<Option<Doctor>>;
    /// Active doctors, newest first, narrowed by whichever owners are given.
    async fn active_doctors(
        &self,
        hospital_id: Option<i32>,
        specialty_id: Option<i32>,
    ) -> AppResult<Vec<Doctor>>;
    async fn create_doctor(&self, doctor: NewDoctor) -> AppResult<Doctor>;
    async fn update_doctor(&self, id: i32, changes: &DoctorInput) -> AppResult<Option<Doctor>>;
    async fn soft_delete_doctor(&self, id: i32) -> AppResult<bool>;
}

#[async_trait]
pub trait TreatmentRepository: Send + Sync {
    async fn list_treatments(&self, filter: &TreatmentFilter, page: PageRequest)
    -> AppResult<Page<Treatment>>;
    async fn find_treatment(&self, id: i32) -> AppResult<Option<Treatment>>;
    async fn active_treatments(
        &self,
        hospital_id: Option<i32>,
        specialty_id: Option<i32>,
    ) -> AppResult<Vec<Treatment>>;
    /// Popular and active treatments, newest first. Never more than the cap.
    async fn popular_treatments(&self) -> AppResult<Vec<Treatment>>;
    async fn create_treatment(&self, treatment: NewTreatment) -> AppResult<Treatment>;
    async fn update_treatment(&self, id: i32, changes: &TreatmentInput)
    -> AppResult<Option<Treatment>>;
    async fn soft_delete_treatment(&self, id: i32) -> AppResult<bool>;

    /// toggle_popular
    ///
    /// Flips `is_popular`. Turning it on first counts popular and active rows and fails
    /// with `CapacityExceeded` at the cap, leaving the row untouched. The count and the
    /// write happen atomically with respect to other toggles.
    /// `Ok(None)` when the treatment does not exist.
    async fn toggle_popular(&self, id: i32) -> AppResult<Option<Treatment>>;
}

#[async_trait]
pub trait TestimonialRepository: Send + Sync {
    async fn list_testimonials(&self, filter: &TestimonialFilter, page: PageRequest)
    -> AppResult<Page<Testimonial>>;
    async fn find_testimonial(&self, id: i32) -> AppResult<Option<Testimonial>>;
    /// Approved and active testimonials, newest first.
    async fn approved_testimonials(
        &self,
        hospital_id: Option<i32>,
        doctor_id: Option<i32>,
        limit: Option<i64>,
    ) -> AppResult<Vec<Testimonial>>;
    /// New rows always start unapproved.
    async fn create_testimonial(&self, testimonial: NewTestimonial) -> AppResult<Testimonial>;
    async fn update_testimonial(&self, id: i32, changes: &TestimonialInput)
    -> AppResult<Option<Testimonial>>;
    async fn soft_delete_testimonial(&self, id: i32) -> AppResult<bool>;
    async fn approve_testimonial(&self, id: i32) -> AppResult<Option<Testimonial>>;
}

/// Repository
///
/// The full persistence contract handed to the HTTP layer. Implemented automatically for
/// any store that implements every entity repository.
pub trait Repository:
    SlugStore
    + UserRepository
    + HospitalRepository
    + SpecialtyRepository
    + DoctorRepository
    + TreatmentRepository
    + TestimonialRepository
{
}

impl<T> Repository for T where
    T: SlugStore
        + UserRepository
        + HospitalRepository
        + SpecialtyRepository
        + DoctorRepository
        + TreatmentRepository
        + TestimonialRepository
{
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
