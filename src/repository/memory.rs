//! In-memory repository for tests and `DB_DIALECT=memory` runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    DoctorRepository, HospitalRepository, POPULAR_LIMIT_MESSAGE, POPULAR_TREATMENT_LIMIT, Page,
    SlugStore, SpecialtyRepository, TestimonialRepository, TreatmentRepository, UserRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Doctor, DoctorFilter, DoctorInput, DoctorRow, Hospital, HospitalFilter, HospitalInput,
        HospitalRef, HospitalSpecialty, NewDoctor, NewHospital, NewSpecialty, NewTestimonial,
        NewTreatment, NewUser, PageRequest, Specialty, SpecialtyCombination, SpecialtyFilter,
        SpecialtyInput, SpecialtyRef, Testimonial, TestimonialFilter, TestimonialInput, Treatment,
        TreatmentFilter, TreatmentInput, User, encode_string_list,
    },
    slug::SlugTable,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    hospitals: BTreeMap<i32, Hospital>,
    specialties: BTreeMap<i32, Specialty>,
    hospital_specialties: BTreeMap<i32, HospitalSpecialty>,
    // Rows keep the encoded list columns, same as the database.
    doctors: BTreeMap<i32, DoctorRow>,
    treatments: BTreeMap<i32, Treatment>,
    testimonials: BTreeMap<i32, Testimonial>,
}

/// InMemoryRepository
///
/// Mirrors the Postgres store's behavior, unique indexes included, on top of ordered
/// maps behind a single `RwLock`. Every operation holds the lock for its whole
/// check-then-write sequence.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| AppError::unexpected(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| AppError::unexpected(format!("Failed to acquire write lock: {}", e)))
    }
}

fn next_id<T>(rows: &BTreeMap<i32, T>) -> i32 {
    rows.keys().next_back().copied().unwrap_or(0) + 1
}

fn duplicate(constraint: &str) -> AppError {
    AppError::Conflict(format!("Duplicate value violates {}", constraint))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn contains_ci_opt(haystack: &Option<String>, needle: &str) -> bool {
    haystack.as_deref().is_some_and(|h| contains_ci(h, needle))
}

fn search_term(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn paginate<T>(rows: Vec<T>, page: PageRequest) -> Page<T> {
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (rows, total)
}

fn active_popular(t: &Tables) -> i64 {
    t.treatments
        .values()
        .filter(|tr| tr.is_popular && tr.is_active)
        .count() as i64
}

fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

fn set_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *slot = value.clone();
    }
}

// Newest first; ids break ties between rows created within the same instant.
macro_rules! newest_first {
    ($rows:expr) => {
        $rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
    };
}

#[async_trait]
impl SlugStore for InMemoryRepository {
    async fn slug_taken(
        &self,
        table: SlugTable,
        slug: &str,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        let t = self.read()?;
        let other = |id: i32| exclude_id != Some(id);
        Ok(match table {
            SlugTable::Hospitals => t.hospitals.values().any(|r| r.slug == slug && other(r.id)),
            SlugTable::Specialties => t.specialties.values().any(|r| r.slug == slug && other(r.id)),
            SlugTable::Doctors => t.doctors.values().any(|r| r.slug == slug && other(r.id)),
            SlugTable::Treatments => t.treatments.values().any(|r| r.slug == slug && other(r.id)),
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_user(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut t = self.write()?;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(duplicate("users_email_key"));
        }

        let now = Utc::now();
        let row = User {
            id: next_id(&t.users),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            is_active: true,
            hospital_id: user.hospital_id,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_user_profile(
        &self,
        id: i32,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<Option<User>> {
        let mut t = self.write()?;
        if let Some(email) = &email {
            if t.users.values().any(|u| &u.email == email && u.id != id) {
                return Err(duplicate("users_email_key"));
            }
        }

        let Some(user) = t.users.get_mut(&id) else {
            return Ok(None);
        };
        set(&mut user.name, &name);
        set(&mut user.email, &email);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_user_password(&self, id: i32, password_hash: &str) -> AppResult<bool> {
        let mut t = self.write()?;
        Ok(match t.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl HospitalRepository for InMemoryRepository {
    async fn list_hospitals(
        &self,
        filter: &HospitalFilter,
        page: PageRequest,
    ) -> AppResult<Page<Hospital>> {
        let t = self.read()?;
        let search = search_term(&filter.search);
        let city = search_term(&filter.city);

        let mut rows: Vec<Hospital> = t
            .hospitals
            .values()
            .filter(|h| filter.is_active.is_none_or(|active| h.is_active == active))
            .filter(|h| city.as_deref().is_none_or(|c| h.city.to_lowercase() == c))
            .filter(|h| {
                search.as_deref().is_none_or(|s| {
                    contains_ci(&h.name, s) || contains_ci(&h.location, s) || contains_ci(&h.specialty, s)
                })
            })
            .cloned()
            .collect();
        newest_first!(rows);
        Ok(paginate(rows, page))
    }

    async fn find_hospital(&self, id: i32) -> AppResult<Option<Hospital>> {
        Ok(self.read()?.hospitals.get(&id).cloned())
    }

    async fn find_hospital_by_slug(&self, slug: &str) -> AppResult<Option<Hospital>> {
        Ok(self.read()?.hospitals.values().find(|h| h.slug == slug).cloned())
    }

    async fn create_hospital(&self, new: NewHospital) -> AppResult<Hospital> {
        let mut t = self.write()?;
        if t.hospitals.values().any(|h| h.slug == new.slug) {
            return Err(duplicate("hospitals_slug_key"));
        }

        let now = Utc::now();
        let row = Hospital {
            id: next_id(&t.hospitals),
            name: new.name,
            slug: new.slug,
            location: new.location,
            city: new.city,
            state: new.state,
            country: new.country,
            rating: new.rating,
            specialty: new.specialty,
            description: new.description,
            image: new.image,
            accreditation: new.accreditation,
            address: new.address,
            phone: new.phone,
            email: new.email,
            website: new.website,
            established_year: new.established_year,
            bed_capacity: new.bed_capacity,
            map_embed_url: new.map_embed_url,
            airport_distance: new.airport_distance,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.hospitals.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_hospital(
        &self,
        id: i32,
        changes: &HospitalInput,
    ) -> AppResult<Option<Hospital>> {
        let mut t = self.write()?;
        if let Some(slug) = &changes.slug {
            if t.hospitals.values().any(|h| &h.slug == slug && h.id != id) {
                return Err(duplicate("hospitals_slug_key"));
            }
        }

        let Some(h) = t.hospitals.get_mut(&id) else {
            return Ok(None);
        };
        set(&mut h.name, &changes.name);
        set(&mut h.slug, &changes.slug);
        set(&mut h.location, &changes.location);
        set(&mut h.city, &changes.city);
        set(&mut h.state, &changes.state);
        set(&mut h.country, &changes.country);
        set(&mut h.rating, &changes.rating);
        set(&mut h.specialty, &changes.specialty);
        set_opt(&mut h.description, &changes.description);
        set_opt(&mut h.image, &changes.image);
        set_opt(&mut h.accreditation, &changes.accreditation);
        set_opt(&mut h.address, &changes.address);
        set_opt(&mut h.phone, &changes.phone);
        set_opt(&mut h.email, &changes.email);
        set_opt(&mut h.website, &changes.website);
        set_opt(&mut h.established_year, &changes.established_year);
        set_opt(&mut h.bed_capacity, &changes.bed_capacity);
        set_opt(&mut h.map_embed_url, &changes.map_embed_url);
        set_opt(&mut h.airport_distance, &changes.airport_distance);
        set(&mut h.is_active, &changes.is_active);
        h.updated_at = Utc::now();
        Ok(Some(h.clone()))
    }

    async fn soft_delete_hospital(&self, id: i32) -> AppResult<bool> {
        let mut t = self.write()?;
        Ok(match t.hospitals.get_mut(&id) {
            Some(h) => {
                h.is_active = false;
                h.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn attach_specialties(&self, hospital_id: i32, specialty_ids: &[i32]) -> AppResult<()> {
        let mut t = self.write()?;
        let mut seen = HashSet::new();
        let now = Utc::now();

        for &specialty_id in specialty_ids.iter().filter(|id| seen.insert(**id)) {
            let existing = t
                .hospital_specialties
                .values_mut()
                .find(|hs| hs.hospital_id == hospital_id && hs.specialty_id == specialty_id);

            match existing {
                Some(hs) => {
                    if !hs.is_active {
                        hs.is_active = true;
                        hs.updated_at = now;
                    }
                }
                None => {
                    let id = next_id(&t.hospital_specialties);
                    t.hospital_specialties.insert(
                        id,
                        HospitalSpecialty {
                            id,
                            hospital_id,
                            specialty_id,
                            is_active: true,
                            created_at: now,
                            updated_at: now,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn detach_specialty(&self, hospital_id: i32, specialty_id: i32) -> AppResult<()> {
        let mut t = self.write()?;
        if let Some(hs) = t
            .hospital_specialties
            .values_mut()
            .find(|hs| hs.hospital_id == hospital_id && hs.specialty_id == specialty_id)
        {
            hs.is_active = false;
            hs.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_assignment(
        &self,
        hospital_id: i32,
        specialty_id: i32,
    ) -> AppResult<Option<HospitalSpecialty>> {
        Ok(self
            .read()?
            .hospital_specialties
            .values()
            .find(|hs| hs.hospital_id == hospital_id && hs.specialty_id == specialty_id)
            .cloned())
    }

    async fn specialties_of_hospital(&self, hospital_id: i32) -> AppResult<Vec<Specialty>> {
        let t = self.read()?;
        let mut rows: Vec<Specialty> = t
            .hospital_specialties
            .values()
            .filter(|hs| hs.hospital_id == hospital_id && hs.is_active)
            .filter_map(|hs| t.specialties.get(&hs.specialty_id))
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn hospitals_for_specialty(&self, specialty_id: i32) -> AppResult<Vec<Hospital>> {
        let t = self.read()?;
        let mut rows: Vec<Hospital> = t
            .hospital_specialties
            .values()
            .filter(|hs| hs.specialty_id == specialty_id && hs.is_active)
            .filter_map(|hs| t.hospitals.get(&hs.hospital_id))
            .filter(|h| h.is_active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.rating.total_cmp(&a.rating).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    async fn specialty_combinations(&self) -> AppResult<Vec<SpecialtyCombination>> {
        let t = self.read()?;
        let mut rows: Vec<SpecialtyCombination> = t
            .hospital_specialties
            .values()
            .filter(|hs| hs.is_active)
            .filter_map(|hs| {
                let hospital = t.hospitals.get(&hs.hospital_id).filter(|h| h.is_active)?;
                let specialty = t.specialties.get(&hs.specialty_id).filter(|s| s.is_active)?;
                Some(SpecialtyCombination {
                    id: hs.id,
                    hospital_id: hs.hospital_id,
                    specialty_id: hs.specialty_id,
                    created_at: hs.created_at,
                    hospital: HospitalRef::from(hospital),
                    specialty: SpecialtyRef::from(specialty),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.hospital
                .name
                .cmp(&b.hospital.name)
                .then_with(|| a.specialty.name.cmp(&b.specialty.name))
        });
        Ok(rows)
    }
}

#[async_trait]
impl SpecialtyRepository for InMemoryRepository {
    async fn list_specialties(
        &self,
        filter: &SpecialtyFilter,
        page: PageRequest,
    ) -> AppResult<Page<Specialty>> {
        let t = self.read()?;
        let search = search_term(&filter.search);
        let mut rows: Vec<Specialty> = t
            .specialties
            .values()
            .filter(|s| filter.is_active.is_none_or(|active| s.is_active == active))
            .filter(|s| {
                search
                    .as_deref()
                    .is_none_or(|q| contains_ci(&s.name, q) || contains_ci_opt(&s.description, q))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(rows, page))
    }

    async fn find_specialty(&self, id: i32) -> AppResult<Option<Specialty>> {
        Ok(self.read()?.specialties.get(&id).cloned())
    }

    async fn find_specialty_by_slug(&self, slug: &str) -> AppResult<Option<Specialty>> {
        Ok(self.read()?.specialties.values().find(|s| s.slug == slug).cloned())
    }

    async fn find_specialty_by_name(&self, name: &str) -> AppResult<Option<Specialty>> {
        Ok(self.read()?.specialties.values().find(|s| s.name == name).cloned())
    }

    async fn count_existing_specialties(&self, ids: &[i32]) -> AppResult<i64> {
        let t = self.read()?;
        let unique: HashSet<i32> = ids.iter().copied().collect();
        Ok(unique.iter().filter(|id| t.specialties.contains_key(id)).count() as i64)
    }

    async fn create_specialty(&self, new: NewSpecialty) -> AppResult<Specialty> {
        let mut t = self.write()?;
        if t.specialties.values().any(|s| s.name == new.name) {
            return Err(duplicate("specialties_name_key"));
        }
        if t.specialties.values().any(|s| s.slug == new.slug) {
            return Err(duplicate("specialties_slug_key"));
        }

        let now = Utc::now();
        let row = Specialty {
            id: next_id(&t.specialties),
            name: new.name,
            slug: new.slug,
            description: new.description,
            icon: new.icon,
            clinics_count: new.clinics_count,
            bg_color: new.bg_color,
            icon_bg: new.icon_bg,
            icon_color: new.icon_color,
            image_url: new.image_url,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.specialties.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_specialty(
        &self,
        id: i32,
        changes: &SpecialtyInput,
    ) -> AppResult<Option<Specialty>> {
        let mut t = self.write()?;
        if let Some(name) = &changes.name {
            if t.specialties.values().any(|s| &s.name == name && s.id != id) {
                return Err(duplicate("specialties_name_key"));
            }
        }
        if let Some(slug) = &changes.slug {
            if t.specialties.values().any(|s| &s.slug == slug && s.id != id) {
                return Err(duplicate("specialties_slug_key"));
            }
        }

        let Some(s) = t.specialties.get_mut(&id) else {
            return Ok(None);
        };
        set(&mut s.name, &changes.name);
        set(&mut s.slug, &changes.slug);
        set_opt(&mut s.description, &changes.description);
        set_opt(&mut s.icon, &changes.icon);
        set(&mut s.clinics_count, &changes.clinics_count);
        set_opt(&mut s.bg_color, &changes.bg_color);
        set_opt(&mut s.icon_bg, &changes.icon_bg);
        set_opt(&mut s.icon_color, &changes.icon_color);
        set_opt(&mut s.image_url, &changes.image_url);
        set(&mut s.is_active, &changes.is_active);
        s.updated_at = Utc::now();
        Ok(Some(s.clone()))
    }

    async fn soft_delete_specialty(&self, id: i32) -> AppResult<bool> {
        let mut t = self.write()?;
        Ok(match t.specialties.get_mut(&id) {
            Some(s) => {
                s.is_active = false;
                s.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl DoctorRepository for InMemoryRepository {
    async fn list_doctors(
        &self,
        filter: &DoctorFilter,
        page: PageRequest,
    ) -> AppResult<Page<Doctor>> {
        let t = self.read()?;
        let search = search_term(&filter.search);
        let mut rows: Vec<DoctorRow> = t
            .doctors
            .values()
            .filter(|d| filter.is_active.is_none_or(|active| d.is_active == active))
            .filter(|d| filter.hospital_id.is_none_or(|id| d.hospital_id == id))
            .filter(|d| filter.specialty_id.is_none_or(|id| d.specialty_id == id))
            .filter(|d| {
                search
                    .as_deref()
                    .is_none_or(|q| contains_ci(&d.name, q) || contains_ci(&d.specialization, q))
            })
            .cloned()
            .collect();
        newest_first!(rows);
        let (rows, total) = paginate(rows, page);
        Ok((rows.into_iter().map(Doctor::from).collect(), total))
    }

    async fn find_doctor(&self, id: i32) -> AppResult<Option<Doctor>> {
        Ok(self.read()?.doctors.get(&id).cloned().map(Doctor::from))
    }

    async fn active_doctors(
        &self,
        hospital_id: Option<i32>,
        specialty_id: Option<i32>,
    ) -> AppResult<Vec<Doctor>> {
        let t = self.read()?;
        let mut rows: Vec<DoctorRow> = t
            .doctors
            .values()
            .filter(|d| d.is_active)
            .filter(|d| hospital_id.is_none_or(|id| d.hospital_id == id))
            .filter(|d| specialty_id.is_none_or(|id| d.specialty_id == id))
            .cloned()
            .collect();
        newest_first!(rows);
        Ok(rows.into_iter().map(Doctor::from).collect())
    }

    async fn create_doctor(&self, new: NewDoctor) -> AppResult<Doctor> {
        let mut t = self.write()?;
        if t.doctors.values().any(|d| d.slug == new.slug) {
            return Err(duplicate("doctors_slug_key"));
        }

        let now = Utc::now();
        let row = DoctorRow {
            id: next_id(&t.doctors),
            hospital_id: new.hospital_id,
            specialty_id: new.specialty_id,
            name: new.name,
            slug: new.slug,
            specialization: new.specialization,
            experience: new.experience,
            patients_treated: new.patients_treated,
            rating: new.rating,
            reviews: new.reviews,
            image: new.image,
            qualifications: new.qualifications,
            expertise: Some(encode_string_list(&new.expertise)),
            bio: new.bio,
            email: new.email,
            phone: new.phone,
            consultation_fee: new.consultation_fee,
            available_days: Some(encode_string_list(&new.available_days)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.doctors.insert(row.id, row.clone());
        Ok(row.into())
    }

    async fn update_doctor(&self, id: i32, changes: &DoctorInput) -> AppResult<Option<Doctor>> {
        let mut t = self.write()?;
        if let Some(slug) = &changes.slug {
            if t.doctors.values().any(|d| &d.slug == slug && d.id != id) {
                return Err(duplicate("doctors_slug_key"));
            }
        }

        let Some(d) = t.doctors.get_mut(&id) else {
            return Ok(None);
        };
        set(&mut d.hospital_id, &changes.hospital_id);
        set(&mut d.specialty_id, &changes.specialty_id);
        set(&mut d.name, &changes.name);
        set(&mut d.slug, &changes.slug);
        set(&mut d.specialization, &changes.specialization);
        set(&mut d.experience, &changes.experience);
        set_opt(&mut d.patients_treated, &changes.patients_treated);
        set(&mut d.rating, &changes.rating);
        set_opt(&mut d.reviews, &changes.reviews);
        set_opt(&mut d.image, &changes.image);
        set_opt(&mut d.qualifications, &changes.qualifications);
        if let Some(expertise) = &changes.expertise {
            d.expertise = Some(encode_string_list(expertise));
        }
        set_opt(&mut d.bio, &changes.bio);
        set_opt(&mut d.email, &changes.email);
        set_opt(&mut d.phone, &changes.phone);
        set_opt(&mut d.consultation_fee, &changes.consultation_fee);
        if let Some(days) = &changes.available_days {
            d.available_days = Some(encode_string_list(days));
        }
        set(&mut d.is_active, &changes.is_active);
        d.updated_at = Utc::now();
        Ok(Some(d.clone().into()))
    }

    async fn soft_delete_doctor(&self, id: i32) -> AppResult<bool> {
        let mut t = self.write()?;
        Ok(match t.doctors.get_mut(&id) {
            Some(d) => {
                d.is_active = false;
                d.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl TreatmentRepository for InMemoryRepository {
    async fn list_treatments(
        &self,
        filter: &TreatmentFilter,
        page: PageRequest,
    ) -> AppResult<Page<Treatment>> {
        let t = self.read()?;
        let search = search_term(&filter.search);
        let mut rows: Vec<Treatment> = t
            .treatments
            .values()
            .filter(|tr| filter.is_active.is_none_or(|active| tr.is_active == active))
            .filter(|tr| filter.hospital_id.is_none_or(|id| tr.hospital_id == id))
            .filter(|tr| filter.specialty_id.is_none_or(|id| tr.specialty_id == id))
            .filter(|tr| {
                search
                    .as_deref()
                    .is_none_or(|q| contains_ci(&tr.name, q) || contains_ci_opt(&tr.description, q))
            })
            .cloned()
            .collect();
        newest_first!(rows);
        Ok(paginate(rows, page))
    }

    async fn find_treatment(&self, id: i32) -> AppResult<Option<Treatment>> {
        Ok(self.read()?.treatments.get(&id).cloned())
    }

    async fn active_treatments(
        &self,
        hospital_id: Option<i32>,
        specialty_id: Option<i32>,
    ) -> AppResult<Vec<Treatment>> {
        let t = self.read()?;
        let mut rows: Vec<Treatment> = t
            .treatments
            .values()
            .filter(|tr| tr.is_active)
            .filter(|tr| hospital_id.is_none_or(|id| tr.hospital_id == id))
            .filter(|tr| specialty_id.is_none_or(|id| tr.specialty_id == id))
            .cloned()
            .collect();
        newest_first!(rows);
        Ok(rows)
    }

    async fn popular_treatments(&self) -> AppResult<Vec<Treatment>> {
        let t = self.read()?;
        let mut rows: Vec<Treatment> = t
            .treatments
            .values()
            .filter(|tr| tr.is_popular && tr.is_active)
            .cloned()
            .collect();
        newest_first!(rows);
        rows.truncate(POPULAR_TREATMENT_LIMIT as usize);
        Ok(rows)
    }

    async fn create_treatment(&self, new: NewTreatment) -> AppResult<Treatment> {
        let mut t = self.write()?;
        if t.treatments.values().any(|tr| tr.slug == new.slug) {
            return Err(duplicate("treatments_slug_key"));
        }

        let now = Utc::now();
        let row = Treatment {
            id: next_id(&t.treatments),
            hospital_id: new.hospital_id,
            specialty_id: new.specialty_id,
            name: new.name,
            slug: new.slug,
            cost: new.cost,
            description: new.description,
            duration: new.duration,
            stay: new.stay,
            success_rate: new.success_rate,
            procedure_type: new.procedure_type,
            is_popular: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.treatments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_treatment(
        &self,
        id: i32,
        changes: &TreatmentInput,
    ) -> AppResult<Option<Treatment>> {
        let mut t = self.write()?;
        if let Some(slug) = &changes.slug {
            if t.treatments.values().any(|tr| &tr.slug == slug && tr.id != id) {
                return Err(duplicate("treatments_slug_key"));
            }
        }

        // Reactivating a popular row brings it back into the cap count.
        let reactivates_popular = changes.is_active == Some(true)
            && t.treatments.get(&id).is_some_and(|tr| tr.is_popular && !tr.is_active);
        if reactivates_popular && active_popular(&t) >= POPULAR_TREATMENT_LIMIT {
            return Err(AppError::CapacityExceeded(POPULAR_LIMIT_MESSAGE.to_string()));
        }

        let Some(tr) = t.treatments.get_mut(&id) else {
            return Ok(None);
        };
        set(&mut tr.hospital_id, &changes.hospital_id);
        set(&mut tr.specialty_id, &changes.specialty_id);
        set(&mut tr.name, &changes.name);
        set(&mut tr.slug, &changes.slug);
        set(&mut tr.cost, &changes.cost);
        set_opt(&mut tr.description, &changes.description);
        set_opt(&mut tr.duration, &changes.duration);
        set_opt(&mut tr.stay, &changes.stay);
        set_opt(&mut tr.success_rate, &changes.success_rate);
        set_opt(&mut tr.procedure_type, &changes.procedure_type);
        set(&mut tr.is_active, &changes.is_active);
        tr.updated_at = Utc::now();
        Ok(Some(tr.clone()))
    }

    async fn soft_delete_treatment(&self, id: i32) -> AppResult<bool> {
        let mut t = self.write()?;
        Ok(match t.treatments.get_mut(&id) {
            Some(tr) => {
                tr.is_active = false;
                tr.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn toggle_popular(&self, id: i32) -> AppResult<Option<Treatment>> {
        // Count and flip under one write guard so two toggles cannot both pass the cap.
        let mut t = self.write()?;
        let popular = active_popular(&t);

        let Some(tr) = t.treatments.get_mut(&id) else {
            return Ok(None);
        };
        if !tr.is_popular && popular >= POPULAR_TREATMENT_LIMIT {
            return Err(AppError::CapacityExceeded(POPULAR_LIMIT_MESSAGE.to_string()));
        }

        tr.is_popular = !tr.is_popular;
        tr.updated_at = Utc::now();
        Ok(Some(tr.clone()))
    }
}

#[async_trait]
impl TestimonialRepository for InMemoryRepository {
    async fn list_testimonials(
        &self,
        filter: &TestimonialFilter,
        page: PageRequest,
    ) -> AppResult<Page<Testimonial>> {
        let t = self.read()?;
        let mut rows: Vec<Testimonial> = t
            .testimonials
            .values()
            .filter(|r| filter.is_active.is_none_or(|active| r.is_active == active))
            .filter(|r| filter.is_approved.is_none_or(|approved| r.is_approved == approved))
            .filter(|r| filter.hospital_id.is_none_or(|id| r.hospital_id == id))
            .filter(|r| filter.doctor_id.is_none_or(|id| r.doctor_id == Some(id)))
            .cloned()
            .collect();
        newest_first!(rows);
        Ok(paginate(rows, page))
    }

    async fn find_testimonial(&self, id: i32) -> AppResult<Option<Testimonial>> {
        Ok(self.read()?.testimonials.get(&id).cloned())
    }

    async fn approved_testimonials(
        &self,
        hospital_id: Option<i32>,
        doctor_id: Option<i32>,
        limit: Option<i64>,
    ) -> AppResult<Vec<Testimonial>> {
        let t = self.read()?;
        let mut rows: Vec<Testimonial> = t
            .testimonials
            .values()
            .filter(|r| r.is_active && r.is_approved)
            .filter(|r| hospital_id.is_none_or(|id| r.hospital_id == id))
            .filter(|r| doctor_id.is_none_or(|id| r.doctor_id == Some(id)))
            .cloned()
            .collect();
        newest_first!(rows);
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn create_testimonial(&self, new: NewTestimonial) -> AppResult<Testimonial> {
        let mut t = self.write()?;
        let now = Utc::now();
        let row = Testimonial {
            id: next_id(&t.testimonials),
            hospital_id: new.hospital_id,
            doctor_id: new.doctor_id,
            patient_name: new.patient_name,
            age: new.age,
            country: new.country,
            treatment: new.treatment,
            rating: new.rating,
            story: new.story,
            image: new.image,
            date: new.date,
            is_approved: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.testimonials.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_testimonial(
        &self,
        id: i32,
        changes: &TestimonialInput,
    ) -> AppResult<Option<Testimonial>> {
        let mut t = self.write()?;
        let Some(r) = t.testimonials.get_mut(&id) else {
            return Ok(None);
        };
        set(&mut r.hospital_id, &changes.hospital_id);
        set_opt(&mut r.doctor_id, &changes.doctor_id);
        set(&mut r.patient_name, &changes.patient_name);
        set_opt(&mut r.age, &changes.age);
        set_opt(&mut r.country, &changes.country);
        set(&mut r.treatment, &changes.treatment);
        set(&mut r.rating, &changes.rating);
        set(&mut r.story, &changes.story);
        set_opt(&mut r.image, &changes.image);
        set_opt(&mut r.date, &changes.date);
        set(&mut r.is_active, &changes.is_active);
        r.updated_at = Utc::now();
        Ok(Some(r.clone()))
    }

    async fn soft_delete_testimonial(&self, id: i32) -> AppResult<bool> {
        let mut t = self.write()?;
        Ok(match t.testimonials.get_mut(&id) {
            Some(r) => {
                r.is_active = false;
                r.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn approve_testimonial(&self, id: i32) -> AppResult<Option<Testimonial>> {
        let mut t = self.write()?;
        let Some(r) = t.testimonials.get_mut(&id) else {
            return Ok(None);
        };
        r.is_approved = true;
        r.updated_at = Utc::now();
        Ok(Some(r.clone()))
    }
}
