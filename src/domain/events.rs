//! Mutation events published after successful writes.

use uuid::Uuid;

/// Which section of a CV changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    PersonalInfo,
    Experience,
    Education,
    Skills,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonalInfo => write!(f, "personal info"),
            Self::Experience => write!(f, "experience"),
            Self::Education => write!(f, "education"),
            Self::Skills => write!(f, "skills"),
        }
    }
}

/// Something observable changed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    CvCreated(Uuid),
    CvUpdated(Uuid),
    CvDeleted(Uuid),
    SectionChanged { cv_id: Uuid, section: Section },
    TemplateSelected { cv_id: Option<Uuid>, template_id: String },
    EntitlementChanged,
    Exported { cv_id: Uuid },
}
