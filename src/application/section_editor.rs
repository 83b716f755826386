//! Editors for the ordered sections of a CV and its personal info.
//!
//! Entries of one section always carry dense sort orders `0..n`: new entries
//! go last, deletes and moves renumber what is left.

use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    AppError, AppEvent, Cv, DraftMode, Education, EducationDraft, Experience, ExperienceDraft,
    PersonalInfo, PersonalInfoDraft, Result, SaveOutcome, Section, SectionDraft, Skill,
    SkillDraft,
};
use crate::infrastructure::{LocalStorage, SectionTable};

use super::events::EventBus;
use super::preferences::Preferences;

/// A stored, ordered entry of a CV section.
pub trait SectionEntry: Clone + Sized {
    type Draft: SectionDraft<Entity = Self> + Default + for<'e> From<&'e Self>;

    const SECTION: Section;
    const TABLE: SectionTable;
    /// Singular label for messages.
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
    fn sort_order(&self) -> i64;
    fn load(storage: &LocalStorage, cv_id: Uuid) -> Result<Vec<Self>>;
    fn store(&self, storage: &LocalStorage) -> Result<()>;
}

impl SectionEntry for Experience {
    type Draft = ExperienceDraft;

    const SECTION: Section = Section::Experience;
    const TABLE: SectionTable = SectionTable::Experiences;
    const LABEL: &'static str = "Experience";

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_order(&self) -> i64 {
        self.sort_order
    }

    fn load(storage: &LocalStorage, cv_id: Uuid) -> Result<Vec<Self>> {
        storage.list_experiences(cv_id)
    }

    fn store(&self, storage: &LocalStorage) -> Result<()> {
        storage.upsert_experience(self)
    }
}

impl SectionEntry for Education {
    type Draft = EducationDraft;

    const SECTION: Section = Section::Education;
    const TABLE: SectionTable = SectionTable::Educations;
    const LABEL: &'static str = "Education";

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_order(&self) -> i64 {
        self.sort_order
    }

    fn load(storage: &LocalStorage, cv_id: Uuid) -> Result<Vec<Self>> {
        storage.list_educations(cv_id)
    }

    fn store(&self, storage: &LocalStorage) -> Result<()> {
        storage.upsert_education(self)
    }
}

impl SectionEntry for Skill {
    type Draft = SkillDraft;

    const SECTION: Section = Section::Skills;
    const TABLE: SectionTable = SectionTable::Skills;
    const LABEL: &'static str = "Skill";

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_order(&self) -> i64 {
        self.sort_order
    }

    fn load(storage: &LocalStorage, cv_id: Uuid) -> Result<Vec<Self>> {
        storage.list_skills(cv_id)
    }

    fn store(&self, storage: &LocalStorage) -> Result<()> {
        storage.upsert_skill(self)
    }
}

/// Editor for one section of one CV.
pub struct SectionEditor<'a, E: SectionEntry> {
    storage: &'a LocalStorage,
    events: &'a EventBus,
    cv_id: Uuid,
    _entry: PhantomData<E>,
}

pub type ExperienceEditor<'a> = SectionEditor<'a, Experience>;
pub type EducationEditor<'a> = SectionEditor<'a, Education>;
pub type SkillEditor<'a> = SectionEditor<'a, Skill>;

impl<'a, E: SectionEntry> SectionEditor<'a, E> {
    /// Open the editor for `cv_id`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the CV does not exist.
    pub fn open(storage: &'a LocalStorage, events: &'a EventBus, cv_id: Uuid) -> Result<Self> {
        if storage.get_cv(cv_id)?.is_none() {
            return Err(AppError::not_found("CV", cv_id.to_string()));
        }
        Ok(Self {
            storage,
            events,
            cv_id,
            _entry: PhantomData,
        })
    }

    /// Entries in display order.
    pub fn entries(&self) -> Result<Vec<E>> {
        E::load(self.storage, self.cv_id)
    }

    /// Blank draft for a new entry.
    #[must_use]
    pub fn new_draft(&self) -> E::Draft {
        E::Draft::default()
    }

    /// Draft pre-filled from an existing entry.
    #[must_use]
    pub fn edit(&self, entry: &E) -> E::Draft {
        E::Draft::from(entry)
    }

    /// Find an entry by 1-based position or id prefix.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` when nothing (or more than one) matches.
    pub fn find(&self, selector: &str) -> Result<E> {
        let selector = selector.trim();
        let entries = self.entries()?;

        if let Ok(number) = selector.parse::<usize>() {
            if (1..=entries.len()).contains(&number) {
                return Ok(entries[number - 1].clone());
            }
        }

        let needle = selector.replace('-', "").to_lowercase();
        let mut matches = entries
            .into_iter()
            .filter(|e| !needle.is_empty() && e.id().simple().to_string().starts_with(&needle));

        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(entry),
            _ => Err(AppError::not_found(E::LABEL, selector)),
        }
    }

    /// Validate and persist a draft.
    ///
    /// New entries are appended; edited entries keep their position.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if an edited entry no longer belongs to
    /// this CV, or a storage error.
    pub fn save(&self, draft: &E::Draft) -> Result<SaveOutcome<E>> {
        if let Some(message) = draft.validation_message() {
            tracing::debug!(section = %E::SECTION, message, "Draft rejected");
            return Ok(SaveOutcome::Invalid(message));
        }

        let sort_order = match draft.mode() {
            DraftMode::Creating => self.storage.count_entries(E::TABLE, self.cv_id)?,
            DraftMode::Editing(id) => self
                .entries()?
                .iter()
                .find(|e| e.id() == id)
                .map(E::sort_order)
                .ok_or_else(|| AppError::not_found(E::LABEL, id.to_string()))?,
        };

        let entry = draft.reduce(self.cv_id, sort_order);
        self.write(|storage| entry.store(storage))?;

        tracing::info!(cv_id = %self.cv_id, section = %E::SECTION, id = %entry.id(), "Entry saved");
        Ok(SaveOutcome::Saved(entry))
    }

    /// Delete an entry and close the gap in sort orders.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the entry does not exist.
    pub fn delete(&self, entry: &E) -> Result<()> {
        self.write(|storage| {
            if !storage.delete_entry(E::TABLE, entry.id())? {
                return Err(AppError::not_found(E::LABEL, entry.id().to_string()));
            }
            let remaining: Vec<Uuid> =
                E::load(storage, self.cv_id)?.iter().map(E::id).collect();
            storage.renumber(E::TABLE, &remaining)
        })?;

        tracing::info!(cv_id = %self.cv_id, section = %E::SECTION, id = %entry.id(), "Entry deleted");
        Ok(())
    }

    /// Move an entry to `index` (0-based, clamped to the end).
    ///
    /// Returns the entries in their new order.
    pub fn move_to(&self, entry: &E, index: usize) -> Result<Vec<E>> {
        let mut entries = self.entries()?;
        let from = entries
            .iter()
            .position(|e| e.id() == entry.id())
            .ok_or_else(|| AppError::not_found(E::LABEL, entry.id().to_string()))?;

        let moved = entries.remove(from);
        let to = index.min(entries.len());
        entries.insert(to, moved);

        let ids: Vec<Uuid> = entries.iter().map(E::id).collect();
        self.write(|storage| storage.renumber(E::TABLE, &ids))?;

        tracing::info!(section = %E::SECTION, from, to, "Entry moved");
        self.entries()
    }

    /// Apply `change` and touch the CV in one transaction, then notify.
    fn write(&self, change: impl FnOnce(&LocalStorage) -> Result<()>) -> Result<()> {
        self.storage.atomically(|storage| {
            change(storage)?;
            storage.touch_cv(self.cv_id, Utc::now())
        })?;
        self.events.publish(AppEvent::SectionChanged {
            cv_id: self.cv_id,
            section: E::SECTION,
        });
        Ok(())
    }
}

/// Editor for the personal info block and photo of a CV.
pub struct PersonalInfoEditor<'a> {
    storage: &'a LocalStorage,
    events: &'a EventBus,
    prefs: Preferences<'a>,
    max_photo_bytes: u64,
}

impl<'a> PersonalInfoEditor<'a> {
    #[must_use]
    pub const fn new(
        storage: &'a LocalStorage,
        events: &'a EventBus,
        prefs: Preferences<'a>,
        max_photo_bytes: u64,
    ) -> Self {
        Self {
            storage,
            events,
            prefs,
            max_photo_bytes,
        }
    }

    #[must_use]
    pub fn draft(&self, cv: &Cv) -> PersonalInfoDraft {
        PersonalInfoDraft {
            info: cv.personal.clone(),
        }
    }

    /// Validate and store personal info, refreshing the auto-fill cache.
    pub fn save(&self, cv: &mut Cv, draft: &PersonalInfoDraft) -> Result<SaveOutcome<PersonalInfo>> {
        if let Some(message) = draft.validation_message() {
            return Ok(SaveOutcome::Invalid(message));
        }

        let info = draft.reduce();
        let previous = std::mem::replace(&mut cv.personal, info.clone());
        if let Err(e) = self.persist(cv) {
            cv.personal = previous;
            return Err(e);
        }

        if let Err(e) = self.prefs.cache_personal_info(&info) {
            tracing::warn!(error = %e, "Could not cache personal info");
        }

        Ok(SaveOutcome::Saved(info))
    }

    /// Attach a photo read from `path`.
    ///
    /// # Errors
    /// Returns `AppError::PhotoTooLarge` if the file exceeds the size cap.
    pub fn set_photo(&self, cv: &mut Cv, path: &Path) -> Result<()> {
        let size = fs::metadata(path)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?
            .len();

        if size > self.max_photo_bytes {
            return Err(AppError::PhotoTooLarge {
                path: path.to_path_buf(),
                size_kb: size.div_ceil(1024),
                max_kb: self.max_photo_bytes / 1024,
            });
        }

        let bytes = fs::read(path)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;

        let previous = cv.photo.replace(bytes);
        self.persist(cv).inspect_err(|_| cv.photo = previous)?;
        tracing::info!(cv_id = %cv.id, bytes = size, "Photo attached");
        Ok(())
    }

    pub fn clear_photo(&self, cv: &mut Cv) -> Result<()> {
        let previous = cv.photo.take();
        self.persist(cv).inspect_err(|_| cv.photo = previous)
    }

    fn persist(&self, cv: &mut Cv) -> Result<()> {
        cv.updated_at = Utc::now();
        if !self.storage.update_cv(cv)? {
            return Err(AppError::not_found("CV", cv.id.to_string()));
        }
        self.events.publish(AppEvent::SectionChanged {
            cv_id: cv.id,
            section: Section::PersonalInfo,
        });
        Ok(())
    }
}
