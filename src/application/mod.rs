//! Application layer - use cases and orchestration.
//!
//! Services borrow the local store, the event bus and the configuration;
//! each one owns one slice of the CV workflow.

pub mod cv_service;
pub mod entitlement_service;
pub mod events;
pub mod export_service;
pub mod formatter;
pub mod preferences;
pub mod section_editor;
pub mod template_service;

pub use cv_service::CvService;
pub use entitlement_service::EntitlementService;
pub use events::{drain, EventBus};
pub use export_service::{ExportOptions, ExportReport, ExportService};
pub use formatter::{
    format_cv_json, format_cv_markdown, format_cv_table, format_education_table,
    format_entitlement, format_experience_table, format_export_report, format_skill_table,
    format_templates_table, OutputFormat,
};
pub use preferences::Preferences;
pub use section_editor::{
    EducationEditor, ExperienceEditor, PersonalInfoEditor, SectionEditor, SectionEntry,
    SkillEditor,
};
pub use template_service::{Selection, TemplateListing, TemplateService};
