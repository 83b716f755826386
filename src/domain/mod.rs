//! Domain layer - core résumé types, drafts, templates and entitlements.
//!
//! This layer holds pure types and rules without any I/O.

pub mod config;
pub mod draft;
pub mod entitlement;
pub mod error;
pub mod events;
pub mod models;
pub mod purchase;
pub mod template;

pub use config::{AppConfig, PreferenceKey};
pub use draft::{
    DraftMode, EducationDraft, ExperienceDraft, PersonalInfoDraft, SaveOutcome, SectionDraft,
    SkillDraft,
};
pub use entitlement::{EntitlementState, PREMIUM_PRODUCT_ID};
pub use error::{AppError, Result};
pub use events::{AppEvent, Section};
pub use models::{
    Cv, DatedEntry, Education, Experience, PersonalInfo, Skill, SkillCategory, MAX_SKILL_LEVEL,
    MIN_SKILL_LEVEL,
};
pub use purchase::PurchaseBackend;
pub use template::{
    all_templates, find_template, template_for_product, FontFamily, HeaderAlign, PageSize,
    SectionKind, Template, DEFAULT_TEMPLATE_ID,
};
