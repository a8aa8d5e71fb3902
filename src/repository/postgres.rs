use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::future::Future;

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
    slug::{SlugTable, resolve_unique},
};

// Inserts that lose a slug race are re-resolved this many times in total.
const SLUG_ATTEMPTS: u32 = 3;

// Arbitrary key for the advisory lock that serializes popularity toggles.
const POPULAR_TOGGLE_LOCK: i64 = 0x6d65_6463_6173_7401;

/// PostgresRepository
///
/// The production store. Queries are checked at runtime (`query_as`, `QueryBuilder`);
/// the schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// with_slug_retry
    ///
    /// Runs `write` with `slug`. When the statement trips the table's slug unique index
    /// (another request claimed the slug after it was resolved), resolves a fresh slug
    /// from `name` and tries again.
    async fn with_slug_retry<T, F, Fut>(
        &self,
        table: SlugTable,
        name: Option<&str>,
        exclude_id: Option<i32>,
        mut slug: Option<String>,
        write: F,
    ) -> AppResult<T>
    where
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 1;
        loop {
            match write(slug.clone()).await {
                Err(err) if attempt < SLUG_ATTEMPTS && is_slug_conflict(&err) => {
                    let Some(name) = name else {
                        return Err(err.into());
                    };
                    tracing::warn!(
                        table = table.table_name(),
                        attempt,
                        "slug claimed concurrently, resolving again"
                    );
                    slug = Some(resolve_unique(self, table, name, exclude_id).await?);
                    attempt += 1;
                }
                result => return result.map_err(AppError::from),
            }
        }
    }
}

fn is_slug_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint().is_some_and(|c| c.ends_with("_slug_key"))
        }
        _ => false,
    }
}

/// like_pattern
///
/// Wraps `term` for a substring `ILIKE ... ESCAPE '\'`, escaping the backslash and both
/// wildcards so `%` and `_` in user input match themselves.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn search_pattern(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern)
}

/// Appends `AND (col1 ILIKE $n ESCAPE '\' OR col2 ILIKE $n ESCAPE '\' ...)`.
fn push_search(builder: &mut QueryBuilder<'_, Postgres>, columns: &[&str], pattern: &str) {
    builder.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder
            .push(*column)
            .push(" ILIKE ")
            .push_bind(pattern.to_string())
            .push(r" ESCAPE '\'");
    }
    builder.push(")");
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    builder
        .push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
}

fn hospital_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &HospitalFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(active);
    }
    if let Some(city) = filter.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        builder
            .push(" AND LOWER(city) = LOWER(")
            .push_bind(city.to_string())
            .push(")");
    }
    if let Some(pattern) = search_pattern(&filter.search) {
        push_search(builder, &["name", "location", "specialty"], &pattern);
    }
}

fn specialty_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &SpecialtyFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(active);
    }
    if let Some(pattern) = search_pattern(&filter.search) {
        push_search(builder, &["name", "description"], &pattern);
    }
}

fn doctor_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &DoctorFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(active);
    }
    if let Some(id) = filter.hospital_id {
        builder.push(" AND hospital_id = ").push_bind(id);
    }
    if let Some(id) = filter.specialty_id {
        builder.push(" AND specialty_id = ").push_bind(id);
    }
    if let Some(pattern) = search_pattern(&filter.search) {
        push_search(builder, &["name", "specialization"], &pattern);
    }
}

fn treatment_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TreatmentFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(active);
    }
    if let Some(id) = filter.hospital_id {
        builder.push(" AND hospital_id = ").push_bind(id);
    }
    if let Some(id) = filter.specialty_id {
        builder.push(" AND specialty_id = ").push_bind(id);
    }
    if let Some(pattern) = search_pattern(&filter.search) {
        push_search(builder, &["name", "description"], &pattern);
    }
}

fn testimonial_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TestimonialFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(active);
    }
    if let Some(approved) = filter.is_approved {
        builder.push(" AND is_approved = ").push_bind(approved);
    }
    if let Some(id) = filter.hospital_id {
        builder.push(" AND hospital_id = ").push_bind(id);
    }
    if let Some(id) = filter.doctor_id {
        builder.push(" AND doctor_id = ").push_bind(id);
    }
}

fn dedup(ids: &[i32]) -> Vec<i32> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

#[async_trait]
impl SlugStore for PostgresRepository {
    async fn slug_taken(
        &self,
        table: SlugTable,
        slug: &str,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        // The table name comes from a closed enum, never from input.
        let mut builder = QueryBuilder::<Postgres>::new("SELECT EXISTS (SELECT 1 FROM ");
        builder
            .push(table.table_name())
            .push(" WHERE slug = ")
            .push_bind(slug.to_string());
        if let Some(id) = exclude_id {
            builder.push(" AND id <> ").push_bind(id);
        }
        builder.push(")");

        let taken: bool = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(taken)
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn find_user(&self, id: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (email, password_hash, name, role, hospital_id)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.hospital_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_user_profile(
        &self,
        id: i32,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user_password(&self, id: i32, password_hash: &str) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(FromRow)]
struct CombinationRow {
    id: i32,
    hospital_id: i32,
    specialty_id: i32,
    created_at: DateTime<Utc>,
    hospital_name: String,
    hospital_slug: String,
    hospital_location: String,
    hospital_city: String,
    hospital_image: Option<String>,
    specialty_name: String,
    specialty_slug: String,
    specialty_icon: Option<String>,
    specialty_image_url: Option<String>,
}

impl From<CombinationRow> for SpecialtyCombination {
    fn from(row: CombinationRow) -> Self {
        SpecialtyCombination {
            id: row.id,
            hospital_id: row.hospital_id,
            specialty_id: row.specialty_id,
            created_at: row.created_at,
            hospital: HospitalRef {
                id: row.hospital_id,
                name: row.hospital_name,
                slug: row.hospital_slug,
                location: row.hospital_location,
                city: row.hospital_city,
                image: row.hospital_image,
            },
            specialty: SpecialtyRef {
                id: row.specialty_id,
                name: row.specialty_name,
                slug: row.specialty_slug,
                icon: row.specialty_icon,
                image_url: row.specialty_image_url,
            },
        }
    }
}

#[async_trait]
impl HospitalRepository for PostgresRepository {
    /// list_hospitals
    ///
    /// Filter predicates are assembled with `QueryBuilder` and bound, never interpolated.
    /// The same predicates drive the count and the page query.
    async fn list_hospitals(
        &self,
        filter: &HospitalFilter,
        page: PageRequest,
    ) -> AppResult<Page<Hospital>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM hospitals");
        hospital_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM hospitals");
        hospital_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut select, page);
        let rows = select
            .build_query_as::<Hospital>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn find_hospital(&self, id: i32) -> AppResult<Option<Hospital>> {
        let row = sqlx::query_as::<_, Hospital>("SELECT * FROM hospitals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_hospital_by_slug(&self, slug: &str) -> AppResult<Option<Hospital>> {
        let row = sqlx::query_as::<_, Hospital>("SELECT * FROM hospitals WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_hospital(&self, new: NewHospital) -> AppResult<Hospital> {
        let new = &new;
        self.with_slug_retry(
            SlugTable::Hospitals,
            Some(&new.name),
            None,
            Some(new.slug.clone()),
            |slug| async move {
                sqlx::query_as::<_, Hospital>(
                    r#"INSERT INTO hospitals (
                           name, slug, location, city, state, country, rating, specialty,
                           description, image, accreditation, address, phone, email, website,
                           established_year, bed_capacity, map_embed_url, airport_distance
                       )
                       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
                       RETURNING *"#,
                )
                .bind(&new.name)
                .bind(slug)
                .bind(&new.location)
                .bind(&new.city)
                .bind(&new.state)
                .bind(&new.country)
                .bind(new.rating)
                .bind(&new.specialty)
                .bind(&new.description)
                .bind(&new.image)
                .bind(&new.accreditation)
                .bind(&new.address)
                .bind(&new.phone)
                .bind(&new.email)
                .bind(&new.website)
                .bind(new.established_year)
                .bind(new.bed_capacity)
                .bind(&new.map_embed_url)
                .bind(&new.airport_distance)
                .fetch_one(&self.pool)
                .await
            },
        )
        .await
    }

    /// update_hospital
    ///
    /// Partial update through `COALESCE`: a column only changes when its field is present.
    async fn update_hospital(
        &self,
        id: i32,
        changes: &HospitalInput,
    ) -> AppResult<Option<Hospital>> {
        self.with_slug_retry(
            SlugTable::Hospitals,
            changes.name.as_deref(),
            Some(id),
            changes.slug.clone(),
            |slug| async move {
                sqlx::query_as::<_, Hospital>(
                    r#"UPDATE hospitals
                       SET name = COALESCE($2, name),
                           slug = COALESCE($3, slug),
                           location = COALESCE($4, location),
                           city = COALESCE($5, city),
                           state = COALESCE($6, state),
                           country = COALESCE($7, country),
                           rating = COALESCE($8, rating),
                           specialty = COALESCE($9, specialty),
                           description = COALESCE($10, description),
                           image = COALESCE($11, image),
                           accreditation = COALESCE($12, accreditation),
                           address = COALESCE($13, address),
                           phone = COALESCE($14, phone),
                           email = COALESCE($15, email),
                           website = COALESCE($16, website),
                           established_year = COALESCE($17, established_year),
                           bed_capacity = COALESCE($18, bed_capacity),
                           map_embed_url = COALESCE($19, map_embed_url),
                           airport_distance = COALESCE($20, airport_distance),
                           is_active = COALESCE($21, is_active),
                           updated_at = NOW()
                       WHERE id = $1
                       RETURNING *"#,
                )
                .bind(id)
                .bind(&changes.name)
                .bind(slug)
                .bind(&changes.location)
                .bind(&changes.city)
                .bind(&changes.state)
                .bind(&changes.country)
                .bind(changes.rating)
                .bind(&changes.specialty)
                .bind(&changes.description)
                .bind(&changes.image)
                .bind(&changes.accreditation)
                .bind(&changes.address)
                .bind(&changes.phone)
                .bind(&changes.email)
                .bind(&changes.website)
                .bind(changes.established_year)
                .bind(changes.bed_capacity)
                .bind(&changes.map_embed_url)
                .bind(&changes.airport_distance)
                .bind(changes.is_active)
                .fetch_optional(&self.pool)
                .await
            },
        )
        .await
    }

    async fn soft_delete_hospital(&self, id: i32) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE hospitals SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// attach_specialties
    ///
    /// One statement: new pairs are inserted, existing ones re-activated through the
    /// `(hospital_id, specialty_id)` unique constraint.
    async fn attach_specialties(&self, hospital_id: i32, specialty_ids: &[i32]) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO hospital_specialties (hospital_id, specialty_id)
               SELECT $1, UNNEST($2::int4[])
               ON CONFLICT (hospital_id, specialty_id)
               DO UPDATE SET is_active = true, updated_at = NOW()"#,
        )
        .bind(hospital_id)
        .bind(dedup(specialty_ids))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn detach_specialty(&self, hospital_id: i32, specialty_id: i32) -> AppResult<()> {
        sqlx::query(
            r#"UPDATE hospital_specialties
               SET is_active = false, updated_at = NOW()
               WHERE hospital_id = $1 AND specialty_id = $2"#,
        )
        .bind(hospital_id)
        .bind(specialty_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_assignment(
        &self,
        hospital_id: i32,
        specialty_id: i32,
    ) -> AppResult<Option<HospitalSpecialty>> {
        let row = sqlx::query_as::<_, HospitalSpecialty>(
            "SELECT * FROM hospital_specialties WHERE hospital_id = $1 AND specialty_id = $2",
        )
        .bind(hospital_id)
        .bind(specialty_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn specialties_of_hospital(&self, hospital_id: i32) -> AppResult<Vec<Specialty>> {
        let rows = sqlx::query_as::<_, Specialty>(
            r#"SELECT s.*
               FROM specialties s
               JOIN hospital_specialties hs ON hs.specialty_id = s.id
               WHERE hs.hospital_id = $1 AND hs.is_active = true AND s.is_active = true
               ORDER BY s.name ASC"#,
        )
        .bind(hospital_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn hospitals_for_specialty(&self, specialty_id: i32) -> AppResult<Vec<Hospital>> {
        let rows = sqlx::query_as::<_, Hospital>(
            r#"SELECT h.*
               FROM hospitals h
               JOIN hospital_specialties hs ON hs.hospital_id = h.id
               WHERE hs.specialty_id = $1 AND hs.is_active = true AND h.is_active = true
               ORDER BY h.rating DESC, h.name ASC"#,
        )
        .bind(specialty_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn specialty_combinations(&self) -> AppResult<Vec<SpecialtyCombination>> {
        let rows = sqlx::query_as::<_, CombinationRow>(
            r#"SELECT hs.id, hs.hospital_id, hs.specialty_id, hs.created_at,
                      h.name AS hospital_name, h.slug AS hospital_slug,
                      h.location AS hospital_location, h.city AS hospital_city,
                      h.image AS hospital_image,
                      s.name AS specialty_name, s.slug AS specialty_slug,
                      s.icon AS specialty_icon, s.image_url AS specialty_image_url
               FROM hospital_specialties hs
               JOIN hospitals h ON h.id = hs.hospital_id
               JOIN specialties s ON s.id = hs.specialty_id
               WHERE hs.is_active = true AND h.is_active = true AND s.is_active = true
               ORDER BY h.name ASC, s.name ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SpecialtyCombination::from).collect())
    }
}

#[async_trait]
impl SpecialtyRepository for PostgresRepository {
    async fn list_specialties(
        &self,
        filter: &SpecialtyFilter,
        page: PageRequest,
    ) -> AppResult<Page<Specialty>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM specialties");
        specialty_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM specialties");
        specialty_filters(&mut select, filter);
        select.push(" ORDER BY name ASC");
        push_page(&mut select, page);
        let rows = select
            .build_query_as::<Specialty>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn find_specialty(&self, id: i32) -> AppResult<Option<Specialty>> {
        let row = sqlx::query_as::<_, Specialty>("SELECT * FROM specialties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_specialty_by_slug(&self, slug: &str) -> AppResult<Option<Specialty>> {
        let row = sqlx::query_as::<_, Specialty>("SELECT * FROM specialties WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_specialty_by_name(&self, name: &str) -> AppResult<Option<Specialty>> {
        let row = sqlx::query_as::<_, Specialty>("SELECT * FROM specialties WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn count_existing_specialties(&self, ids: &[i32]) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM specialties WHERE id = ANY($1)")
            .bind(dedup(ids))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_specialty(&self, new: NewSpecialty) -> AppResult<Specialty> {
        let new = &new;
        self.with_slug_retry(
            SlugTable::Specialties,
            Some(&new.name),
            None,
            Some(new.slug.clone()),
            |slug| async move {
                sqlx::query_as::<_, Specialty>(
                    r#"INSERT INTO specialties (
                           name, slug, description, icon, clinics_count,
                           bg_color, icon_bg, icon_color, image_url
                       )
                       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                       RETURNING *"#,
                )
                .bind(&new.name)
                .bind(slug)
                .bind(&new.description)
                .bind(&new.icon)
                .bind(new.clinics_count)
                .bind(&new.bg_color)
                .bind(&new.icon_bg)
                .bind(&new.icon_color)
                .bind(&new.image_url)
                .fetch_one(&self.pool)
                .await
            },
        )
        .await
    }

    async fn update_specialty(
        &self,
        id: i32,
        changes: &SpecialtyInput,
    ) -> AppResult<Option<Specialty>> {
        self.with_slug_retry(
            SlugTable::Specialties,
            changes.name.as_deref(),
            Some(id),
            changes.slug.clone(),
            |slug| async move {
                sqlx::query_as::<_, Specialty>(
                    r#"UPDATE specialties
                       SET name = COALESCE($2, name),
                           slug = COALESCE($3, slug),
                           description = COALESCE($4, description),
                           icon = COALESCE($5, icon),
                           clinics_count = COALESCE($6, clinics_count),
                           bg_color = COALESCE($7, bg_color),
                           icon_bg = COALESCE($8, icon_bg),
                           icon_color = COALESCE($9, icon_color),
                           image_url = COALESCE($10, image_url),
                           is_active = COALESCE($11, is_active),
                           updated_at = NOW()
                       WHERE id = $1
                       RETURNING *"#,
                )
                .bind(id)
                .bind(&changes.name)
                .bind(slug)
                .bind(&changes.description)
                .bind(&changes.icon)
                .bind(changes.clinics_count)
                .bind(&changes.bg_color)
                .bind(&changes.icon_bg)
                .bind(&changes.icon_color)
                .bind(&changes.image_url)
                .bind(changes.is_active)
                .fetch_optional(&self.pool)
                .await
            },
        )
        .await
    }

    async fn soft_delete_specialty(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE specialties SET is_active = false, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DoctorRepository for PostgresRepository {
    async fn list_doctors(
        &self,
        filter: &DoctorFilter,
        page: PageRequest,
    ) -> AppResult<Page<Doctor>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM doctors");
        doctor_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM doctors");
        doctor_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut select, page);
        let rows = select
            .build_query_as::<DoctorRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Doctor::from).collect(), total))
    }

    async fn find_doctor(&self, id: i32) -> AppResult<Option<Doctor>> {
        let row = sqlx::query_as::<_, DoctorRow>("SELECT * FROM doctors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Doctor::from))
    }

    async fn active_doctors(
        &self,
        hospital_id: Option<i32>,
        specialty_id: Option<i32>,
    ) -> AppResult<Vec<Doctor>> {
        let rows = sqlx::query_as::<_, DoctorRow>(
            r#"SELECT * FROM doctors
               WHERE is_active = true
                 AND ($1::int4 IS NULL OR hospital_id = $1)
                 AND ($2::int4 IS NULL OR specialty_id = $2)
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(hospital_id)
        .bind(specialty_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Doctor::from).collect())
    }

    async fn create_doctor(&self, new: NewDoctor) -> AppResult<Doctor> {
        let new = &new;
        let expertise = encode_string_list(&new.expertise);
        let available_days = encode_string_list(&new.available_days);
        let (expertise, available_days) = (&expertise, &available_days);

        let row = self
            .with_slug_retry(
                SlugTable::Doctors,
                Some(&new.name),
                None,
                Some(new.slug.clone()),
                |slug| async move {
                    sqlx::query_as::<_, DoctorRow>(
                        r#"INSERT INTO doctors (
                               hospital_id, specialty_id, name, slug, specialization, experience,
                               patients_treated, rating, reviews, image, qualifications, expertise,
                               bio, email, phone, consultation_fee, available_days
                           )
                           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                           RETURNING *"#,
                    )
                    .bind(new.hospital_id)
                    .bind(new.specialty_id)
                    .bind(&new.name)
                    .bind(slug)
                    .bind(&new.specialization)
                    .bind(&new.experience)
                    .bind(&new.patients_treated)
                    .bind(new.rating)
                    .bind(&new.reviews)
                    .bind(&new.image)
                    .bind(&new.qualifications)
                    .bind(expertise)
                    .bind(&new.bio)
                    .bind(&new.email)
                    .bind(&new.phone)
                    .bind(new.consultation_fee)
                    .bind(available_days)
                    .fetch_one(&self.pool)
                    .await
                },
            )
            .await?;
        Ok(row.into())
    }

    async fn update_doctor(&self, id: i32, changes: &DoctorInput) -> AppResult<Option<Doctor>> {
        let expertise = changes.expertise.as_ref().map(|v| encode_string_list(v));
        let available_days = changes.available_days.as_ref().map(|v| encode_string_list(v));
        let (expertise, available_days) = (&expertise, &available_days);

        let row = self
            .with_slug_retry(
                SlugTable::Doctors,
                changes.name.as_deref(),
                Some(id),
                changes.slug.clone(),
                |slug| async move {
                    sqlx::query_as::<_, DoctorRow>(
                        r#"UPDATE doctors
                           SET hospital_id = COALESCE($2, hospital_id),
                               specialty_id = COALESCE($3, specialty_id),
                               name = COALESCE($4, name),
                               slug = COALESCE($5, slug),
                               specialization = COALESCE($6, specialization),
                               experience = COALESCE($7, experience),
                               patients_treated = COALESCE($8, patients_treated),
                               rating = COALESCE($9, rating),
                               reviews = COALESCE($10, reviews),
                               image = COALESCE($11, image),
                               qualifications = COALESCE($12, qualifications),
                               expertise = COALESCE($13, expertise),
                               bio = COALESCE($14, bio),
                               email = COALESCE($15, email),
                               phone = COALESCE($16, phone),
                               consultation_fee = COALESCE($17, consultation_fee),
                               available_days = COALESCE($18, available_days),
                               is_active = COALESCE($19, is_active),
                               updated_at = NOW()
                           WHERE id = $1
                           RETURNING *"#,
                    )
                    .bind(id)
                    .bind(changes.hospital_id)
                    .bind(changes.specialty_id)
                    .bind(&changes.name)
                    .bind(slug)
                    .bind(&changes.specialization)
                    .bind(&changes.experience)
                    .bind(&changes.patients_treated)
                    .bind(changes.rating)
                    .bind(&changes.reviews)
                    .bind(&changes.image)
                    .bind(&changes.qualifications)
                    .bind(expertise)
                    .bind(&changes.bio)
                    .bind(&changes.email)
                    .bind(&changes.phone)
                    .bind(changes.consultation_fee)
                    .bind(available_days)
                    .bind(changes.is_active)
                    .fetch_optional(&self.pool)
                    .await
                },
            )
            .await?;
        Ok(row.map(Doctor::from))
    }

    async fn soft_delete_doctor(&self, id: i32) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE doctors SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TreatmentRepository for PostgresRepository {
    async fn list_treatments(
        &self,
        filter: &TreatmentFilter,
        page: PageRequest,
    ) -> AppResult<Page<Treatment>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM treatments");
        treatment_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM treatments");
        treatment_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut select, page);
        let rows = select
            .build_query_as::<Treatment>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn find_treatment(&self, id: i32) -> AppResult<Option<Treatment>> {
        let row = sqlx::query_as::<_, Treatment>("SELECT * FROM treatments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn active_treatments(
        &self,
        hospital_id: Option<i32>,
        specialty_id: Option<i32>,
    ) -> AppResult<Vec<Treatment>> {
        let rows = sqlx::query_as::<_, Treatment>(
            r#"SELECT * FROM treatments
               WHERE is_active = true
                 AND ($1::int4 IS NULL OR hospital_id = $1)
                 AND ($2::int4 IS NULL OR specialty_id = $2)
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(hospital_id)
        .bind(specialty_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn popular_treatments(&self) -> AppResult<Vec<Treatment>> {
        let rows = sqlx::query_as::<_, Treatment>(
            r#"SELECT * FROM treatments
               WHERE is_popular = true AND is_active = true
               ORDER BY created_at DESC, id DESC
               LIMIT $1"#,
        )
        .bind(POPULAR_TREATMENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_treatment(&self, new: NewTreatment) -> AppResult<Treatment> {
        let new = &new;
        self.with_slug_retry(
            SlugTable::Treatments,
            Some(&new.name),
            None,
            Some(new.slug.clone()),
            |slug| async move {
                sqlx::query_as::<_, Treatment>(
                    r#"INSERT INTO treatments (
                           hospital_id, specialty_id, name, slug, cost, description,
                           duration, stay, success_rate, procedure_type
                       )
                       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                       RETURNING *"#,
                )
                .bind(new.hospital_id)
                .bind(new.specialty_id)
                .bind(&new.name)
                .bind(slug)
                .bind(&new.cost)
                .bind(&new.description)
                .bind(&new.duration)
                .bind(&new.stay)
                .bind(new.success_rate)
                .bind(&new.procedure_type)
                .fetch_one(&self.pool)
                .await
            },
        )
        .await
    }

    async fn update_treatment(
        &self,
        id: i32,
        changes: &TreatmentInput,
    ) -> AppResult<Option<Treatment>> {
        // A reactivation holds the popular-cap lock until the row is written, so it
        // serializes with toggle_popular.
        let cap_guard = if changes.is_active == Some(true) {
            let mut tx = self.pool.begin().await?;
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(POPULAR_TOGGLE_LOCK)
                .execute(&mut *tx)
                .await?;

            let reactivates_popular: bool = sqlx::query_scalar(
                r#"SELECT EXISTS (
                       SELECT 1 FROM treatments WHERE id = $1 AND is_popular AND NOT is_active
                   )"#,
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if reactivates_popular {
                let popular: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM treatments WHERE is_popular = true AND is_active = true",
                )
                .fetch_one(&mut *tx)
                .await?;

                if popular >= POPULAR_TREATMENT_LIMIT {
                    return Err(AppError::CapacityExceeded(POPULAR_LIMIT_MESSAGE.to_string()));
                }
            }
            Some(tx)
        } else {
            None
        };

        let updated = self.with_slug_retry(
            SlugTable::Treatments,
            changes.name.as_deref(),
            Some(id),
            changes.slug.clone(),
            |slug| async move {
                sqlx::query_as::<_, Treatment>(
                    r#"UPDATE treatments
                       SET hospital_id = COALESCE($2, hospital_id),
                           specialty_id = COALESCE($3, specialty_id),
                           name = COALESCE($4, name),
                           slug = COALESCE($5, slug),
                           cost = COALESCE($6, cost),
                           description = COALESCE($7, description),
                           duration = COALESCE($8, duration),
                           stay = COALESCE($9, stay),
                           success_rate = COALESCE($10, success_rate),
                           procedure_type = COALESCE($11, procedure_type),
                           is_active = COALESCE($12, is_active),
                           updated_at = NOW()
                       WHERE id = $1
                       RETURNING *"#,
                )
                .bind(id)
                .bind(changes.hospital_id)
                .bind(changes.specialty_id)
                .bind(&changes.name)
                .bind(slug)
                .bind(&changes.cost)
                .bind(&changes.description)
                .bind(&changes.duration)
                .bind(&changes.stay)
                .bind(changes.success_rate)
                .bind(&changes.procedure_type)
                .bind(changes.is_active)
                .fetch_optional(&self.pool)
                .await
            },
        )
        .await?;

        if let Some(tx) = cap_guard {
            tx.commit().await?;
        }
        Ok(updated)
    }

    async fn soft_delete_treatment(&self, id: i32) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE treatments SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// toggle_popular
    ///
    /// Count-then-flip inside one transaction holding a transaction-scoped advisory lock,
    /// so concurrent toggles are serialized and the cap cannot be overshot.
    async fn toggle_popular(&self, id: i32) -> AppResult<Option<Treatment>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(POPULAR_TOGGLE_LOCK)
            .execute(&mut *tx)
            .await?;

        let Some(current) =
            sqlx::query_as::<_, Treatment>("SELECT * FROM treatments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };

        if !current.is_popular {
            let popular: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM treatments WHERE is_popular = true AND is_active = true",
            )
            .fetch_one(&mut *tx)
            .await?;

            if popular >= POPULAR_TREATMENT_LIMIT {
                return Err(AppError::CapacityExceeded(POPULAR_LIMIT_MESSAGE.to_string()));
            }
        }

        let updated = sqlx::query_as::<_, Treatment>(
            r#"UPDATE treatments
               SET is_popular = NOT is_popular, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }
}

#[async_trait]
impl TestimonialRepository for PostgresRepository {
    async fn list_testimonials(
        &self,
        filter: &TestimonialFilter,
        page: PageRequest,
    ) -> AppResult<Page<Testimonial>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM testimonials");
        testimonial_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM testimonials");
        testimonial_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut select, page);
        let rows = select
            .build_query_as::<Testimonial>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn find_testimonial(&self, id: i32) -> AppResult<Option<Testimonial>> {
        let row = sqlx::query_as::<_, Testimonial>("SELECT * FROM testimonials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn approved_testimonials(
        &self,
        hospital_id: Option<i32>,
        doctor_id: Option<i32>,
        limit: Option<i64>,
    ) -> AppResult<Vec<Testimonial>> {
        // LIMIT NULL means no limit in Postgres.
        let rows = sqlx::query_as::<_, Testimonial>(
            r#"SELECT * FROM testimonials
               WHERE is_active = true AND is_approved = true
                 AND ($1::int4 IS NULL OR hospital_id = $1)
                 AND ($2::int4 IS NULL OR doctor_id = $2)
               ORDER BY created_at DESC, id DESC
               LIMIT $3"#,
        )
        .bind(hospital_id)
        .bind(doctor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_testimonial(&self, new: NewTestimonial) -> AppResult<Testimonial> {
        let row = sqlx::query_as::<_, Testimonial>(
            r#"INSERT INTO testimonials (
                   hospital_id, doctor_id, patient_name, age, country, treatment,
                   rating, story, image, date
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(new.hospital_id)
        .bind(new.doctor_id)
        .bind(&new.patient_name)
        .bind(new.age)
        .bind(&new.country)
        .bind(&new.treatment)
        .bind(new.rating)
        .bind(&new.story)
        .bind(&new.image)
        .bind(&new.date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_testimonial(
        &self,
        id: i32,
        changes: &TestimonialInput,
    ) -> AppResult<Option<Testimonial>> {
        let row = sqlx::query_as::<_, Testimonial>(
            r#"UPDATE testimonials
               SET hospital_id = COALESCE($2, hospital_id),
                   doctor_id = COALESCE($3, doctor_id),
                   patient_name = COALESCE($4, patient_name),
                   age = COALESCE($5, age),
                   country = COALESCE($6, country),
                   treatment = COALESCE($7, treatment),
                   rating = COALESCE($8, rating),
                   story = COALESCE($9, story),
                   image = COALESCE($10, image),
                   date = COALESCE($11, date),
                   is_active = COALESCE($12, is_active),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(changes.hospital_id)
        .bind(changes.doctor_id)
        .bind(&changes.patient_name)
        .bind(changes.age)
        .bind(&changes.country)
        .bind(&changes.treatment)
        .bind(changes.rating)
        .bind(&changes.story)
        .bind(&changes.image)
        .bind(&changes.date)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn soft_delete_testimonial(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE testimonials SET is_active = false, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn approve_testimonial(&self, id: i32) -> AppResult<Option<Testimonial>> {
        let row = sqlx::query_as::<_, Testimonial>(
            r#"UPDATE testimonials
               SET is_approved = true, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
