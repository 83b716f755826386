//! Edit drafts for CV sections.
//!
//! A draft is either creating a new entry or editing an existing one. The
//! reducer (`SectionDraft::reduce`) turns a validated draft into an entity:
//! it trims text fields and drops the end date of anything marked current.
//! A dated entry needs a start date and either an end date or the current
//! flag.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::models::{
    Education, Experience, PersonalInfo, Skill, SkillCategory, MAX_SKILL_LEVEL, MIN_SKILL_LEVEL,
};

/// Whether a draft creates a new entry or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Creating,
    Editing(Uuid),
}

impl DraftMode {
    /// Id the reduced entity will carry.
    #[must_use]
    pub fn entity_id(self) -> Uuid {
        match self {
            Self::Creating => Uuid::new_v4(),
            Self::Editing(id) => id,
        }
    }
}

/// Result of saving a draft. Validation failures are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome<T> {
    Saved(T),
    Invalid(&'static str),
}

/// Draft of one section entry.
pub trait SectionDraft {
    type Entity;

    fn mode(&self) -> DraftMode;

    /// First reason the draft cannot be saved, if any.
    fn validation_message(&self) -> Option<&'static str>;

    /// Pure draft → entity reduction.
    fn reduce(&self, cv_id: Uuid, sort_order: i64) -> Self::Entity;
}

fn clean(s: &str) -> String {
    s.trim().to_string()
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Shared date checks for experience and education drafts.
fn period_message(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    is_current: bool,
) -> Option<&'static str> {
    let Some(start) = start else {
        return Some("Start date is required");
    };
    if is_current {
        return None;
    }
    match end {
        None => Some("End date is required unless current"),
        Some(end) if end < start => Some("End date is before start date"),
        Some(_) => None,
    }
}

/// Start date of a reduced entry. Validation guarantees it is set.
fn start_or_today(start: Option<NaiveDate>) -> NaiveDate {
    start.unwrap_or_else(|| Utc::now().date_naive())
}

/// Experience form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceDraft {
    pub mode: DraftMode,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub description: String,
}

impl Default for ExperienceDraft {
    fn default() -> Self {
        Self {
            mode: DraftMode::Creating,
            job_title: String::new(),
            company: String::new(),
            location: String::new(),
            start_date: None,
            end_date: None,
            is_current: false,
            description: String::new(),
        }
    }
}

impl From<&Experience> for ExperienceDraft {
    fn from(e: &Experience) -> Self {
        Self {
            mode: DraftMode::Editing(e.id),
            job_title: e.job_title.clone(),
            company: e.company.clone(),
            location: e.location.clone(),
            start_date: Some(e.start_date),
            end_date: e.end_date,
            is_current: e.is_current,
            description: e.description.clone(),
        }
    }
}

impl SectionDraft for ExperienceDraft {
    type Entity = Experience;

    fn mode(&self) -> DraftMode {
        self.mode
    }

    fn validation_message(&self) -> Option<&'static str> {
        if blank(&self.job_title) {
            Some("Job title is required")
        } else if blank(&self.company) {
            Some("Company is required")
        } else {
            period_message(self.start_date, self.end_date, self.is_current)
        }
    }

    fn reduce(&self, cv_id: Uuid, sort_order: i64) -> Experience {
        Experience {
            id: self.mode.entity_id(),
            cv_id,
            job_title: clean(&self.job_title),
            company: clean(&self.company),
            location: clean(&self.location),
            start_date: start_or_today(self.start_date),
            end_date: if self.is_current { None } else { self.end_date },
            is_current: self.is_current,
            description: clean(&self.description),
            sort_order,
        }
    }
}

/// Education form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EducationDraft {
    pub mode: DraftMode,
    pub degree: String,
    pub institution: String,
    pub field_of_study: String,
    pub location: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub gpa: String,
}

impl Default for EducationDraft {
    fn default() -> Self {
        Self {
            mode: DraftMode::Creating,
            degree: String::new(),
            institution: String::new(),
            field_of_study: String::new(),
            location: String::new(),
            start_date: None,
            end_date: None,
            is_current: false,
            gpa: String::new(),
        }
    }
}

impl From<&Education> for EducationDraft {
    fn from(e: &Education) -> Self {
        Self {
            mode: DraftMode::Editing(e.id),
            degree: e.degree.clone(),
            institution: e.institution.clone(),
            field_of_study: e.field_of_study.clone(),
            location: e.location.clone(),
            start_date: Some(e.start_date),
            end_date: e.end_date,
            is_current: e.is_current,
            gpa: e.gpa.clone(),
        }
    }
}

impl SectionDraft for EducationDraft {
    type Entity = Education;

    fn mode(&self) -> DraftMode {
        self.mode
    }

    fn validation_message(&self) -> Option<&'static str> {
        if blank(&self.degree) {
            Some("Degree is required")
        } else if blank(&self.institution) {
            Some("Institution is required")
        } else {
            period_message(self.start_date, self.end_date, self.is_current)
        }
    }

    fn reduce(&self, cv_id: Uuid, sort_order: i64) -> Education {
        Education {
            id: self.mode.entity_id(),
            cv_id,
            degree: clean(&self.degree),
            institution: clean(&self.institution),
            field_of_study: clean(&self.field_of_study),
            location: clean(&self.location),
            start_date: start_or_today(self.start_date),
            end_date: if self.is_current { None } else { self.end_date },
            is_current: self.is_current,
            gpa: clean(&self.gpa),
            sort_order,
        }
    }
}

/// Skill form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDraft {
    pub mode: DraftMode,
    pub name: String,
    pub category: SkillCategory,
    pub level: u8,
}

impl Default for SkillDraft {
    fn default() -> Self {
        Self {
            mode: DraftMode::Creating,
            name: String::new(),
            category: SkillCategory::default(),
            level: 3,
        }
    }
}

impl From<&Skill> for SkillDraft {
    fn from(s: &Skill) -> Self {
        Self {
            mode: DraftMode::Editing(s.id),
            name: s.name.clone(),
            category: s.category,
            level: s.level,
        }
    }
}

impl SectionDraft for SkillDraft {
    type Entity = Skill;

    fn mode(&self) -> DraftMode {
        self.mode
    }

    fn validation_message(&self) -> Option<&'static str> {
        if blank(&self.name) {
            Some("Skill name is required")
        } else {
            None
        }
    }

    fn reduce(&self, cv_id: Uuid, sort_order: i64) -> Skill {
        Skill {
            id: self.mode.entity_id(),
            cv_id,
            name: clean(&self.name),
            category: self.category,
            level: self.level.clamp(MIN_SKILL_LEVEL, MAX_SKILL_LEVEL),
            sort_order,
        }
    }
}

/// Personal info form state. Always edits the CV it was opened from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalInfoDraft {
    pub info: PersonalInfo,
}

impl PersonalInfoDraft {
    #[must_use]
    pub fn validation_message(&self) -> Option<&'static str> {
        let email = self.info.email.trim();
        if !email.is_empty() && !email.contains('@') {
            Some("Email address is not valid")
        } else {
            None
        }
    }

    /// Trimmed copy of the edited fields.
    #[must_use]
    pub fn reduce(&self) -> PersonalInfo {
        let i = &self.info;
        PersonalInfo {
            full_name: clean(&i.full_name),
            job_title: clean(&i.job_title),
            email: clean(&i.email),
            phone: clean(&i.phone),
            location: clean(&i.location),
            website: clean(&i.website),
            linkedin: clean(&i.linkedin),
            summary: clean(&i.summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_experience_reducer_trims_and_clears_end_date() {
        let draft = ExperienceDraft {
            job_title: "  Staff Engineer ".into(),
            company: "\tAcme\n".into(),
            start_date: Some(date(2021, 3)),
            end_date: Some(date(2023, 1)),
            is_current: true,
            ..Default::default()
        };

        let cv_id = Uuid::new_v4();
        let exp = draft.reduce(cv_id, 2);

        assert_eq!(exp.job_title, "Staff Engineer");
        assert_eq!(exp.company, "Acme");
        assert_eq!(exp.end_date, None);
        assert!(exp.is_current);
        assert_eq!(exp.cv_id, cv_id);
        assert_eq!(exp.sort_order, 2);
    }

    #[test]
    fn test_experience_requires_title_and_company() {
        let mut draft = ExperienceDraft {
            job_title: "   ".into(),
            company: "Acme".into(),
            ..Default::default()
        };
        assert_eq!(draft.validation_message(), Some("Job title is required"));

        draft.job_title = "Engineer".into();
        draft.company = String::new();
        assert_eq!(draft.validation_message(), Some("Company is required"));

        draft.company = "Acme".into();
        assert_eq!(draft.validation_message(), Some("Start date is required"));

        draft.start_date = Some(date(2020, 1));
        draft.is_current = true;
        assert_eq!(draft.validation_message(), None);
    }

    #[test]
    fn test_experience_needs_end_unless_current() {
        let mut draft = ExperienceDraft {
            job_title: "Engineer".into(),
            company: "Acme".into(),
            start_date: Some(date(2020, 1)),
            ..Default::default()
        };
        assert_eq!(
            draft.validation_message(),
            Some("End date is required unless current")
        );

        draft.end_date = Some(date(2022, 6));
        assert_eq!(draft.validation_message(), None);
        let exp = draft.reduce(Uuid::new_v4(), 0);
        assert!(!exp.is_current);
        assert_eq!(exp.end_date, Some(date(2022, 6)));
        assert_eq!(exp.start_date, date(2020, 1));
    }

    #[test]
    fn test_education_needs_start_and_end() {
        let mut draft = EducationDraft {
            degree: "BSc".into(),
            institution: "MIT".into(),
            ..Default::default()
        };
        assert_eq!(draft.validation_message(), Some("Start date is required"));

        draft.start_date = Some(date(2016, 9));
        assert_eq!(
            draft.validation_message(),
            Some("End date is required unless current")
        );

        draft.is_current = true;
        assert_eq!(draft.validation_message(), None);
    }

    #[test]
    fn test_end_before_start_ignored_when_current() {
        let mut draft = EducationDraft {
            degree: "BSc".into(),
            institution: "MIT".into(),
            start_date: Some(date(2020, 9)),
            end_date: Some(date(2019, 6)),
            ..Default::default()
        };
        assert_eq!(
            draft.validation_message(),
            Some("End date is before start date")
        );

        draft.is_current = true;
        assert_eq!(draft.validation_message(), None);
        assert_eq!(draft.reduce(Uuid::new_v4(), 0).end_date, None);
    }

    #[test]
    fn test_editing_keeps_identity() {
        let id = Uuid::new_v4();
        let draft = SkillDraft {
            mode: DraftMode::Editing(id),
            name: " Rust ".into(),
            level: 9,
            ..Default::default()
        };

        let skill = draft.reduce(Uuid::new_v4(), 0);
        assert_eq!(skill.id, id);
        assert_eq!(skill.name, "Rust");
        assert_eq!(skill.level, MAX_SKILL_LEVEL);
    }

    #[test]
    fn test_skill_level_floor() {
        let draft = SkillDraft {
            name: "Go".into(),
            level: 0,
            ..Default::default()
        };
        assert_eq!(draft.reduce(Uuid::new_v4(), 0).level, MIN_SKILL_LEVEL);
    }

    #[test]
    fn test_personal_info_draft() {
        let draft = PersonalInfoDraft {
            info: PersonalInfo {
                full_name: " Ada Lovelace ".into(),
                email: "ada.example.com".into(),
                ..Default::default()
            },
        };
        assert_eq!(draft.validation_message(), Some("Email address is not valid"));
        assert_eq!(draft.reduce().full_name, "Ada Lovelace");
    }
}
