//! CV aggregate store: create, read, update, delete and duplicate.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{AppError, AppEvent, Cv, Result};
use crate::infrastructure::LocalStorage;

use super::events::EventBus;
use super::preferences::Preferences;

/// Service owning the collection of CVs.
pub struct CvService<'a> {
    storage: &'a LocalStorage,
    events: &'a EventBus,
    prefs: Preferences<'a>,
}

impl<'a> CvService<'a> {
    #[must_use]
    pub const fn new(
        storage: &'a LocalStorage,
        events: &'a EventBus,
        prefs: Preferences<'a>,
    ) -> Self {
        Self {
            storage,
            events,
            prefs,
        }
    }

    /// Create a CV using the default template, pre-filled from the last
    /// saved personal info.
    ///
    /// # Errors
    /// Returns error if the CV cannot be stored.
    pub fn create(&self, name: &str) -> Result<Cv> {
        let template = self.prefs.selected_template()?;
        let mut cv = Cv::new(name.trim(), template.id);
        if let Some(info) = self.prefs.cached_personal_info()? {
            cv.personal = info;
        }

        self.storage.insert_cv(&cv)?;
        tracing::info!(id = %cv.id, name = %cv.name, template = template.id, "CV created");
        self.events.publish(AppEvent::CvCreated(cv.id));

        Ok(cv)
    }

    /// All CVs, most recently updated first.
    pub fn fetch_all(&self) -> Result<Vec<Cv>> {
        let cvs = self.storage.list_cvs()?;
        tracing::debug!(count = cvs.len(), "Fetched CVs");
        Ok(cvs)
    }

    /// Load one CV with its sections.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if it does not exist.
    pub fn get(&self, id: Uuid) -> Result<Cv> {
        self.storage
            .get_cv(id)?
            .ok_or_else(|| AppError::not_found("CV", id.to_string()))
    }

    /// Find a CV by 1-based list position, full id or id prefix.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` when nothing matches, or
    /// `AppError::Config` when a prefix is ambiguous.
    pub fn resolve(&self, selector: &str) -> Result<Cv> {
        let selector = selector.trim();
        if let Ok(id) = Uuid::parse_str(selector) {
            return self.get(id);
        }

        let cvs = self.fetch_all()?;

        if let Ok(number) = selector.parse::<usize>() {
            if (1..=cvs.len()).contains(&number) {
                return Ok(cvs[number - 1].clone());
            }
        }

        let needle = selector.replace('-', "").to_lowercase();
        let matches: Vec<&Cv> = cvs
            .iter()
            .filter(|cv| !needle.is_empty() && cv.id.simple().to_string().starts_with(&needle))
            .collect();

        match matches.as_slice() {
            [cv] => Ok((*cv).clone()),
            [] => Err(AppError::not_found("CV", selector)),
            _ => Err(AppError::Config {
                message: format!("CV id '{selector}' is ambiguous ({} matches)", matches.len()),
            }),
        }
    }

    /// Persist the scalar fields of `cv` and bump its `updated_at`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the CV was deleted meanwhile.
    pub fn update(&self, cv: &mut Cv) -> Result<()> {
        let previous = cv.updated_at;
        cv.updated_at = Utc::now();

        match self.storage.update_cv(cv) {
            Ok(true) => {}
            Ok(false) => {
                cv.updated_at = previous;
                return Err(AppError::not_found("CV", cv.id.to_string()));
            }
            Err(e) => {
                cv.updated_at = previous;
                return Err(e);
            }
        }

        tracing::info!(id = %cv.id, "CV updated");
        self.events.publish(AppEvent::CvUpdated(cv.id));
        Ok(())
    }

    /// Rename a CV.
    pub fn rename(&self, cv: &mut Cv, name: &str) -> Result<()> {
        let previous = std::mem::replace(&mut cv.name, name.trim().to_string());
        self.update(cv).inspect_err(|_| cv.name = previous)
    }

    /// Delete a CV and everything it owns.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if it does not exist.
    pub fn delete(&self, cv: &Cv) -> Result<()> {
        if !self.storage.delete_cv(cv.id)? {
            return Err(AppError::not_found("CV", cv.id.to_string()));
        }

        tracing::info!(id = %cv.id, name = %cv.name, "CV deleted");
        self.events.publish(AppEvent::CvDeleted(cv.id));
        Ok(())
    }

    /// Store a copy of the scalar fields of `cv` as a new CV.
    ///
    /// Experiences, educations and skills are not copied.
    pub fn duplicate(&self, cv: &Cv) -> Result<Cv> {
        let copy = cv.duplicate();
        self.storage.insert_cv(&copy)?;

        tracing::info!(source = %cv.id, id = %copy.id, "CV duplicated");
        self.events.publish(AppEvent::CvCreated(copy.id));
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::drain;
    use crate::domain::{AppConfig, PersonalInfo, SectionDraft, SkillDraft};
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        storage: LocalStorage,
        config: AppConfig,
        events: EventBus,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
            Self {
                _dir: dir,
                storage,
                config: AppConfig::default(),
                events: EventBus::default(),
            }
        }

        fn service(&self) -> CvService<'_> {
            CvService::new(
                &self.storage,
                &self.events,
                Preferences::new(&self.storage, &self.config),
            )
        }
    }

    #[test]
    fn test_create_and_fetch() {
        let fx = Fixture::new();
        let mut rx = fx.events.subscribe();
        let svc = fx.service();

        let cv = svc.create("  Resume A ").unwrap();
        assert_eq!(cv.name, "Resume A");
        assert_eq!(cv.template_id, "classic");

        let all = svc.fetch_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, cv.id);
        assert_eq!(drain(&mut rx), vec![AppEvent::CvCreated(cv.id)]);
    }

    #[test]
    fn test_create_prefills_cached_info() {
        let fx = Fixture::new();
        let prefs = Preferences::new(&fx.storage, &fx.config);
        let info = PersonalInfo {
            full_name: "Grace Hopper".into(),
            ..Default::default()
        };
        prefs.cache_personal_info(&info).unwrap();

        let cv = fx.service().create("Navy").unwrap();
        assert_eq!(cv.personal, info);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let fx = Fixture::new();
        let svc = fx.service();

        let mut original = svc.create("Resume A").unwrap();
        original.personal.full_name = "Ada".into();
        original.personal.summary = "Numbers".into();
        svc.update(&mut original).unwrap();

        let skill = SkillDraft {
            name: "Rust".into(),
            ..Default::default()
        }
        .reduce(original.id, 0);
        fx.storage.upsert_skill(&skill).unwrap();

        let mut copy = svc.duplicate(&original).unwrap();
        assert_eq!(copy.name, "Resume A (Copy)");
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.personal, original.personal);
        assert!(svc.get(copy.id).unwrap().skills.is_empty());

        copy.personal.full_name = "Changed".into();
        svc.update(&mut copy).unwrap();
        assert_eq!(svc.get(original.id).unwrap().personal.full_name, "Ada");
    }

    #[test]
    fn test_delete_removes_sections() {
        let fx = Fixture::new();
        let svc = fx.service();
        let cv = svc.create("Temp").unwrap();
        let skill = SkillDraft {
            name: "SQL".into(),
            ..Default::default()
        }
        .reduce(cv.id, 0);
        fx.storage.upsert_skill(&skill).unwrap();

        svc.delete(&cv).unwrap();

        assert!(matches!(svc.get(cv.id), Err(AppError::NotFound { .. })));
        assert!(fx.storage.list_skills(cv.id).unwrap().is_empty());
        assert!(matches!(svc.delete(&cv), Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_update_missing_keeps_timestamp() {
        let fx = Fixture::new();
        let svc = fx.service();
        let mut ghost = Cv::new("Ghost", "classic");
        let stamp = ghost.updated_at;

        assert!(matches!(svc.update(&mut ghost), Err(AppError::NotFound { .. })));
        assert_eq!(ghost.updated_at, stamp);
    }

    #[test]
    fn test_resolve_by_index_and_prefix() {
        let fx = Fixture::new();
        let svc = fx.service();
        let cv = svc.create("Only").unwrap();

        assert_eq!(svc.resolve("1").unwrap().id, cv.id);
        assert_eq!(svc.resolve(&cv.short_id()).unwrap().id, cv.id);
        assert_eq!(svc.resolve(&cv.id.to_string()).unwrap().id, cv.id);
        assert!(matches!(svc.resolve("zzzz"), Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_rename() {
        let fx = Fixture::new();
        let svc = fx.service();
        let mut cv = svc.create("Old").unwrap();

        svc.rename(&mut cv, " New ").unwrap();
        assert_eq!(svc.get(cv.id).unwrap().name, "New");
    }
}
