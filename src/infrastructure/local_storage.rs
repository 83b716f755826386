//! Local SQLite storage for CVs, entitlement state and preferences.
//!
//! Section rows reference their CV with `ON DELETE CASCADE`, so deleting a
//! CV removes every entry it owns in the same statement.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::domain::{
    AppError, Cv, Education, EntitlementState, Experience, PersonalInfo, PreferenceKey, Result,
    Skill, MAX_SKILL_LEVEL, MIN_SKILL_LEVEL,
};

/// Tables holding ordered CV sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionTable {
    Experiences,
    Educations,
    Skills,
}

impl SectionTable {
    const fn name(self) -> &'static str {
        match self {
            Self::Experiences => "experiences",
            Self::Educations => "educations",
            Self::Skills => "skills",
        }
    }
}

const CV_COLUMNS: &str = "id, name, full_name, job_title, email, phone, location, website, \
     linkedin, summary, photo, template_id, created_at, updated_at";

/// Local storage repository using SQLite.
pub struct LocalStorage {
    conn: Connection,
}

impl LocalStorage {
    /// Opens or creates the local storage database.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::storage)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(AppError::storage)?;

        let storage = Self { conn };
        storage.init_schema()?;

        tracing::debug!(path = %path.display(), "Storage opened");
        Ok(storage)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r"
            CREATE TABLE IF NOT EXISTS cvs (
                id BLOB PRIMARY KEY,
                name TEXT NOT NULL,
                full_name TEXT NOT NULL DEFAULT '',
                job_title TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                website TEXT NOT NULL DEFAULT '',
                linkedin TEXT NOT NULL DEFAULT '',
                summary TEXT NOT NULL DEFAULT '',
                photo BLOB,
                template_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS experiences (
                id BLOB PRIMARY KEY,
                cv_id BLOB NOT NULL REFERENCES cvs(id) ON DELETE CASCADE,
                job_title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT '',
                start_date TEXT NOT NULL,
                end_date TEXT,
                is_current INTEGER NOT NULL DEFAULT 0,
                description TEXT NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS educations (
                id BLOB PRIMARY KEY,
                cv_id BLOB NOT NULL REFERENCES cvs(id) ON DELETE CASCADE,
                degree TEXT NOT NULL,
                institution TEXT NOT NULL,
                field_of_study TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                start_date TEXT NOT NULL,
                end_date TEXT,
                is_current INTEGER NOT NULL DEFAULT 0,
                gpa TEXT NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS skills (
                id BLOB PRIMARY KEY,
                cv_id BLOB NOT NULL REFERENCES cvs(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'technical',
                level INTEGER NOT NULL DEFAULT 3,
                sort_order INTEGER NOT NULL DEFAULT 0
            );

            -- Single-row entitlement state
            CREATE TABLE IF NOT EXISTS entitlement (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                is_premium INTEGER NOT NULL DEFAULT 0,
                exports_used INTEGER NOT NULL DEFAULT 0,
                period TEXT NOT NULL,
                free_export_limit INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS purchased_templates (
                template_id TEXT PRIMARY KEY,
                purchased_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cvs_updated ON cvs(updated_at DESC);
            CREATE INDEX IF NOT EXISTS idx_experiences_cv ON experiences(cv_id, sort_order);
            CREATE INDEX IF NOT EXISTS idx_educations_cv ON educations(cv_id, sort_order);
            CREATE INDEX IF NOT EXISTS idx_skills_cv ON skills(cv_id, sort_order);
            ",
            )
            .map_err(AppError::storage)?;

        Ok(())
    }

    // ---- CVs ----

    /// Insert a new CV row (sections are stored separately).
    pub fn insert_cv(&self, cv: &Cv) -> Result<()> {
        let p = &cv.personal;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO cvs ({CV_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    cv.id,
                    &cv.name,
                    &p.full_name,
                    &p.job_title,
                    &p.email,
                    &p.phone,
                    &p.location,
                    &p.website,
                    &p.linkedin,
                    &p.summary,
                    &cv.photo,
                    &cv.template_id,
                    cv.created_at,
                    cv.updated_at,
                ],
            )
            .map_err(AppError::storage)?;

        Ok(())
    }

    /// Update the scalar fields of a CV. Returns false if it does not exist.
    pub fn update_cv(&self, cv: &Cv) -> Result<bool> {
        let p = &cv.personal;
        let changed = self
            .conn
            .execute(
                r"
            UPDATE cvs SET
                name = ?2, full_name = ?3, job_title = ?4, email = ?5, phone = ?6,
                location = ?7, website = ?8, linkedin = ?9, summary = ?10,
                photo = ?11, template_id = ?12, updated_at = ?13
            WHERE id = ?1
            ",
                params![
                    cv.id,
                    &cv.name,
                    &p.full_name,
                    &p.job_title,
                    &p.email,
                    &p.phone,
                    &p.location,
                    &p.website,
                    &p.linkedin,
                    &p.summary,
                    &cv.photo,
                    &cv.template_id,
                    cv.updated_at,
                ],
            )
            .map_err(AppError::storage)?;

        Ok(changed > 0)
    }

    /// Delete a CV and, by cascade, all of its sections.
    pub fn delete_cv(&self, id: Uuid) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM cvs WHERE id = ?1", [id])
            .map_err(AppError::storage)?;
        Ok(changed > 0)
    }

    /// Load one CV including its sections.
    pub fn get_cv(&self, id: Uuid) -> Result<Option<Cv>> {
        let cv = self
            .conn
            .query_row(
                &format!("SELECT {CV_COLUMNS} FROM cvs WHERE id = ?1"),
                [id],
                Self::row_to_cv,
            )
            .optional()
            .map_err(AppError::storage)?;

        cv.map(|cv| self.with_sections(cv)).transpose()
    }

    /// All CVs with sections, most recently updated first.
    pub fn list_cvs(&self) -> Result<Vec<Cv>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {CV_COLUMNS} FROM cvs ORDER BY updated_at DESC, name ASC"
            ))
            .map_err(AppError::storage)?;

        let cvs = stmt
            .query_map([], Self::row_to_cv)
            .map_err(AppError::storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AppError::storage)?;

        cvs.into_iter().map(|cv| self.with_sections(cv)).collect()
    }

    fn with_sections(&self, mut cv: Cv) -> Result<Cv> {
        cv.experiences = self.list_experiences(cv.id)?;
        cv.educations = self.list_educations(cv.id)?;
        cv.skills = self.list_skills(cv.id)?;
        Ok(cv)
    }

    /// Convert a row to a CV without sections.
    fn row_to_cv(row: &Row) -> rusqlite::Result<Cv> {
        Ok(Cv {
            id: row.get(0)?,
            name: row.get(1)?,
            personal: PersonalInfo {
                full_name: row.get(2)?,
                job_title: row.get(3)?,
                email: row.get(4)?,
                phone: row.get(5)?,
                location: row.get(6)?,
                website: row.get(7)?,
                linkedin: row.get(8)?,
                summary: row.get(9)?,
            },
            photo: row.get(10)?,
            template_id: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
            experiences: Vec::new(),
            educations: Vec::new(),
            skills: Vec::new(),
        })
    }

    // ---- Sections ----

    /// Experiences of a CV by sort order.
    pub fn list_experiences(&self, cv_id: Uuid) -> Result<Vec<Experience>> {
        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT id, cv_id, job_title, company, location, start_date, end_date,
                   is_current, description, sort_order
            FROM experiences WHERE cv_id = ?1
            ORDER BY sort_order ASC, start_date DESC
            ",
            )
            .map_err(AppError::storage)?;

        let rows = stmt
            .query_map([cv_id], |row| {
                Ok(Experience {
                    id: row.get(0)?,
                    cv_id: row.get(1)?,
                    job_title: row.get(2)?,
                    company: row.get(3)?,
                    location: row.get(4)?,
                    start_date: row.get(5)?,
                    end_date: row.get(6)?,
                    is_current: row.get(7)?,
                    description: row.get(8)?,
                    sort_order: row.get(9)?,
                })
            })
            .map_err(AppError::storage)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AppError::storage)
    }

    /// Insert or replace an experience.
    pub fn upsert_experience(&self, e: &Experience) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT INTO experiences
                (id, cv_id, job_title, company, location, start_date, end_date,
                 is_current, description, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                job_title = excluded.job_title,
                company = excluded.company,
                location = excluded.location,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                is_current = excluded.is_current,
                description = excluded.description,
                sort_order = excluded.sort_order
            ",
                params![
                    e.id,
                    e.cv_id,
                    &e.job_title,
                    &e.company,
                    &e.location,
                    e.start_date,
                    e.end_date,
                    e.is_current,
                    &e.description,
                    e.sort_order,
                ],
            )
            .map_err(AppError::storage)?;

        Ok(())
    }

    /// Educations of a CV by sort order.
    pub fn list_educations(&self, cv_id: Uuid) -> Result<Vec<Education>> {
        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT id, cv_id, degree, institution, field_of_study, location,
                   start_date, end_date, is_current, gpa, sort_order
            FROM educations WHERE cv_id = ?1
            ORDER BY sort_order ASC, start_date DESC
            ",
            )
            .map_err(AppError::storage)?;

        let rows = stmt
            .query_map([cv_id], |row| {
                Ok(Education {
                    id: row.get(0)?,
                    cv_id: row.get(1)?,
                    degree: row.get(2)?,
                    institution: row.get(3)?,
                    field_of_study: row.get(4)?,
                    location: row.get(5)?,
                    start_date: row.get(6)?,
                    end_date: row.get(7)?,
                    is_current: row.get(8)?,
                    gpa: row.get(9)?,
                    sort_order: row.get(10)?,
                })
            })
            .map_err(AppError::storage)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AppError::storage)
    }

    /// Insert or replace an education entry.
    pub fn upsert_education(&self, e: &Education) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT INTO educations
                (id, cv_id, degree, institution, field_of_study, location,
                 start_date, end_date, is_current, gpa, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                degree = excluded.degree,
                institution = excluded.institution,
                field_of_study = excluded.field_of_study,
                location = excluded.location,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                is_current = excluded.is_current,
                gpa = excluded.gpa,
                sort_order = excluded.sort_order
            ",
                params![
                    e.id,
                    e.cv_id,
                    &e.degree,
                    &e.institution,
                    &e.field_of_study,
                    &e.location,
                    e.start_date,
                    e.end_date,
                    e.is_current,
                    &e.gpa,
                    e.sort_order,
                ],
            )
            .map_err(AppError::storage)?;

        Ok(())
    }

    /// Skills of a CV by sort order.
    pub fn list_skills(&self, cv_id: Uuid) -> Result<Vec<Skill>> {
        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT id, cv_id, name, category, level, sort_order
            FROM skills WHERE cv_id = ?1
            ORDER BY sort_order ASC, name ASC
            ",
            )
            .map_err(AppError::storage)?;

        let rows = stmt
            .query_map([cv_id], |row| {
                let category: String = row.get(3)?;
                let level: i64 = row.get(4)?;
                Ok(Skill {
                    id: row.get(0)?,
                    cv_id: row.get(1)?,
                    name: row.get(2)?,
                    category: category.parse().unwrap_or_default(),
                    level: u8::try_from(level.clamp(
                        i64::from(MIN_SKILL_LEVEL),
                        i64::from(MAX_SKILL_LEVEL),
                    ))
                    .unwrap_or(MIN_SKILL_LEVEL),
                    sort_order: row.get(5)?,
                })
            })
            .map_err(AppError::storage)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AppError::storage)
    }

    /// Insert or replace a skill.
    pub fn upsert_skill(&self, s: &Skill) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT INTO skills (id, cv_id, name, category, level, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                level = excluded.level,
                sort_order = excluded.sort_order
            ",
                params![
                    s.id,
                    s.cv_id,
                    &s.name,
                    s.category.as_str(),
                    s.level,
                    s.sort_order,
                ],
            )
            .map_err(AppError::storage)?;

        Ok(())
    }

    /// Delete one section entry. Returns false if it did not exist.
    pub fn delete_entry(&self, table: SectionTable, id: Uuid) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1", table.name()),
                [id],
            )
            .map_err(AppError::storage)?;
        Ok(changed > 0)
    }

    /// Number of entries a CV has in a section.
    pub fn count_entries(&self, table: SectionTable, cv_id: Uuid) -> Result<i64> {
        self.conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE cv_id = ?1", table.name()),
                [cv_id],
                |row| row.get(0),
            )
            .map_err(AppError::storage)
    }

    /// Run `f` in one transaction. Its writes land together or not at all.
    ///
    /// `f` must not open a transaction of its own.
    pub fn atomically<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(AppError::storage)?;
        let value = f(self)?;
        tx.commit().map_err(AppError::storage)?;
        Ok(value)
    }

    /// Rewrite sort orders as 0..n following `ordered_ids`.
    ///
    /// Callers run this inside [`Self::atomically`].
    pub fn renumber(&self, table: SectionTable, ordered_ids: &[Uuid]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "UPDATE {} SET sort_order = ?1 WHERE id = ?2",
                table.name()
            ))
            .map_err(AppError::storage)?;

        for (position, id) in (0_i64..).zip(ordered_ids) {
            stmt.execute(params![position, id])
                .map_err(AppError::storage)?;
        }
        Ok(())
    }

    /// Touch a CV's `updated_at`.
    pub fn touch_cv(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute("UPDATE cvs SET updated_at = ?1 WHERE id = ?2", params![at, id])
            .map_err(AppError::storage)?;
        Ok(())
    }

    // ---- Entitlement ----

    /// Stored entitlement state, if any has been saved.
    pub fn load_entitlement(&self) -> Result<Option<EntitlementState>> {
        let row = self
            .conn
            .query_row(
                "SELECT is_premium, exports_used, period, free_export_limit \
                 FROM entitlement WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, bool>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(AppError::storage)?;

        let Some((is_premium, exports_used, period, free_export_limit)) = row else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT template_id FROM purchased_templates ORDER BY template_id")
            .map_err(AppError::storage)?;
        let purchased_template_ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(AppError::storage)?
            .collect::<rusqlite::Result<BTreeSet<_>>>()
            .map_err(AppError::storage)?;

        Ok(Some(EntitlementState {
            is_premium,
            purchased_template_ids,
            exports_used,
            period,
            free_export_limit,
        }))
    }

    /// Persist the entitlement state and purchase set in one transaction.
    pub fn save_entitlement(&self, state: &EntitlementState) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(AppError::storage)?;

        tx.execute(
            r"
            INSERT INTO entitlement (id, is_premium, exports_used, period, free_export_limit)
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                is_premium = excluded.is_premium,
                exports_used = excluded.exports_used,
                period = excluded.period,
                free_export_limit = excluded.free_export_limit
            ",
            params![
                state.is_premium,
                state.exports_used,
                &state.period,
                state.free_export_limit,
            ],
        )
        .map_err(AppError::storage)?;

        let now = Utc::now();
        for template_id in &state.purchased_template_ids {
            tx.execute(
                "INSERT OR IGNORE INTO purchased_templates (template_id, purchased_at) \
                 VALUES (?1, ?2)",
                params![template_id, now],
            )
            .map_err(AppError::storage)?;
        }

        tx.commit().map_err(AppError::storage)
    }

    // ---- Preferences ----

    pub fn get_preference(&self, key: PreferenceKey) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(AppError::storage)
    }

    pub fn set_preference(&self, key: PreferenceKey, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key.as_str(), value],
            )
            .map_err(AppError::storage)?;
        Ok(())
    }

    /// Get total storage size in bytes.
    pub fn get_storage_size(&self) -> Result<u64> {
        let path = match self.conn.path() {
            Some(p) if !p.is_empty() => Path::new(p),
            _ => return Ok(0),
        };
        let metadata =
            std::fs::metadata(path).map_err(|e| AppError::io("Failed to get storage size", e))?;
        Ok(metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SkillCategory;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn open_temp() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("test.db")).unwrap();
        (dir, storage)
    }

    fn experience(cv_id: Uuid, title: &str, sort_order: i64) -> Experience {
        Experience {
            id: Uuid::new_v4(),
            cv_id,
            job_title: title.into(),
            company: "Acme".into(),
            location: String::new(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: None,
            is_current: true,
            description: String::new(),
            sort_order,
        }
    }

    #[test]
    fn test_open_creates_schema() {
        let (_dir, storage) = open_temp();

        let count: i64 = storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert!(count >= 7);
    }

    #[test]
    fn test_cv_roundtrip_with_photo() {
        let (_dir, storage) = open_temp();
        let mut cv = Cv::new("Backend", "modern");
        cv.personal.full_name = "Ada".into();
        cv.photo = Some(vec![0xFF, 0xD8, 0xFF]);

        storage.insert_cv(&cv).unwrap();
        let loaded = storage.get_cv(cv.id).unwrap().unwrap();

        assert_eq!(loaded.name, "Backend");
        assert_eq!(loaded.personal.full_name, "Ada");
        assert_eq!(loaded.photo, cv.photo);
        assert_eq!(loaded.template_id, "modern");
    }

    #[test]
    fn test_delete_cascades_to_sections() {
        let (_dir, storage) = open_temp();
        let cv = Cv::new("Doomed", "classic");
        storage.insert_cv(&cv).unwrap();
        storage.upsert_experience(&experience(cv.id, "Dev", 0)).unwrap();
        storage
            .upsert_skill(&Skill {
                id: Uuid::new_v4(),
                cv_id: cv.id,
                name: "SQL".into(),
                category: SkillCategory::Tools,
                level: 4,
                sort_order: 0,
            })
            .unwrap();

        assert!(storage.delete_cv(cv.id).unwrap());

        let orphans: i64 = storage
            .conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM experiences) + (SELECT COUNT(*) FROM skills)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(storage.get_cv(cv.id).unwrap().is_none());
    }

    #[test]
    fn test_renumber_is_dense() {
        let (_dir, storage) = open_temp();
        let cv = Cv::new("Order", "classic");
        storage.insert_cv(&cv).unwrap();

        let a = experience(cv.id, "A", 5);
        let b = experience(cv.id, "B", 9);
        storage.upsert_experience(&a).unwrap();
        storage.upsert_experience(&b).unwrap();

        storage
            .renumber(SectionTable::Experiences, &[b.id, a.id])
            .unwrap();

        let listed = storage.list_experiences(cv.id).unwrap();
        let titles: Vec<_> = listed.iter().map(|e| e.job_title.as_str()).collect();
        let orders: Vec<_> = listed.iter().map(|e| e.sort_order).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let (_dir, storage) = open_temp();
        let cv = Cv::new("Tx", "classic");
        storage.insert_cv(&cv).unwrap();

        let result: Result<()> = storage.atomically(|s| {
            s.upsert_experience(&experience(cv.id, "Lost", 0))?;
            Err(AppError::not_found("CV", "gone"))
        });

        assert!(result.is_err());
        assert!(storage.list_experiences(cv.id).unwrap().is_empty());

        storage
            .atomically(|s| s.upsert_experience(&experience(cv.id, "Kept", 0)))
            .unwrap();
        assert_eq!(storage.list_experiences(cv.id).unwrap().len(), 1);
    }

    #[test]
    fn test_out_of_range_skill_level_is_clamped() {
        let (_dir, storage) = open_temp();
        let cv = Cv::new("Skills", "classic");
        storage.insert_cv(&cv).unwrap();

        for (name, level) in [("High", 200_i64), ("Low", -4)] {
            storage
                .conn
                .execute(
                    "INSERT INTO skills (id, cv_id, name, category, level, sort_order)
                     VALUES (?1, ?2, ?3, 'technical', ?4, 0)",
                    params![Uuid::new_v4(), cv.id, name, level],
                )
                .unwrap();
        }

        let skills = storage.list_skills(cv.id).unwrap();
        let high = skills.iter().find(|s| s.name == "High").unwrap();
        let low = skills.iter().find(|s| s.name == "Low").unwrap();
        assert_eq!(high.level, MAX_SKILL_LEVEL);
        assert_eq!(high.percentage(), 100);
        assert_eq!(low.level, MIN_SKILL_LEVEL);
    }

    #[test]
    fn test_entitlement_roundtrip() {
        let (_dir, storage) = open_temp();
        assert!(storage.load_entitlement().unwrap().is_none());

        let mut state = EntitlementState::default();
        state.exports_used = 2;
        state.purchased_template_ids.insert("executive".into());
        storage.save_entitlement(&state).unwrap();

        assert_eq!(storage.load_entitlement().unwrap(), Some(state));
    }

    #[test]
    fn test_preferences_default_if_absent() {
        let (_dir, storage) = open_temp();
        assert!(storage
            .get_preference(PreferenceKey::SelectedTemplate)
            .unwrap()
            .is_none());

        storage
            .set_preference(PreferenceKey::SelectedTemplate, "modern")
            .unwrap();
        storage
            .set_preference(PreferenceKey::SelectedTemplate, "minimal")
            .unwrap();

        assert_eq!(
            storage
                .get_preference(PreferenceKey::SelectedTemplate)
                .unwrap()
                .as_deref(),
            Some("minimal")
        );
    }
}
