//! Domain models for résumé data.
//!
//! A [`Cv`] owns its experiences, educations and skills. Entries carry the
//! id of their owning CV and a per-collection sort order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Suffix appended to the name of a duplicated CV.
pub const COPY_SUFFIX: &str = " (Copy)";

/// Owner-entered profile fields shown in the CV header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub summary: String,
}

impl PersonalInfo {
    /// Whether every field is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contact_lines().is_empty()
            && self.full_name.trim().is_empty()
            && self.job_title.trim().is_empty()
            && self.summary.trim().is_empty()
    }

    /// Non-empty contact fields, in display order.
    #[must_use]
    pub fn contact_lines(&self) -> Vec<&str> {
        [
            &self.email,
            &self.phone,
            &self.location,
            &self.website,
            &self.linkedin,
        ]
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
    }
}

/// A résumé document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cv {
    pub id: Uuid,
    /// Document name shown in listings (not the owner's name).
    pub name: String,
    #[serde(default)]
    pub personal: PersonalInfo,
    #[serde(default, skip_serializing)]
    pub photo: Option<Vec<u8>>,
    pub template_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

impl Cv {
    /// Create an empty CV with a fresh identity.
    #[must_use]
    pub fn new(name: impl Into<String>, template_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            personal: PersonalInfo::default(),
            photo: None,
            template_id: template_id.into(),
            created_at: now,
            updated_at: now,
            experiences: Vec::new(),
            educations: Vec::new(),
            skills: Vec::new(),
        }
    }

    /// Copy of the scalar fields under a new identity.
    ///
    /// Sections are not carried over.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: format!("{}{COPY_SUFFIX}", self.name),
            personal: self.personal.clone(),
            photo: self.photo.clone(),
            template_id: self.template_id.clone(),
            created_at: now,
            updated_at: now,
            experiences: Vec::new(),
            educations: Vec::new(),
            skills: Vec::new(),
        }
    }

    /// Short id prefix used in listings.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    /// Total number of section entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.experiences.len() + self.educations.len() + self.skills.len()
    }

    /// File-system safe name for exports.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let cleaned: String = self
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        let stem = cleaned
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();

        if stem.is_empty() {
            format!("cv_{}", self.short_id())
        } else {
            stem
        }
    }
}

/// A dated entry that can be "current" (ongoing).
pub trait DatedEntry {
    fn start_date(&self) -> NaiveDate;
    fn end_date(&self) -> Option<NaiveDate>;
    fn is_current(&self) -> bool;

    /// Human-readable range such as `Jan 2020 – Present`.
    fn date_range_label(&self) -> String {
        let start = self.start_date().format("%b %Y");
        match (self.is_current(), self.end_date()) {
            (true, _) | (false, None) => format!("{start} – Present"),
            (false, Some(end)) => format!("{start} – {}", end.format("%b %Y")),
        }
    }
}

/// Work experience entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub job_title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i64,
}

impl DatedEntry for Experience {
    fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    fn is_current(&self) -> bool {
        self.is_current
    }
}

/// Education entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub location: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    /// Free text, e.g. `3.8/4.0`.
    #[serde(default)]
    pub gpa: String,
    #[serde(default)]
    pub sort_order: i64,
}

impl DatedEntry for Education {
    fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    fn is_current(&self) -> bool {
        self.is_current
    }
}

/// Skill grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    #[default]
    Technical,
    Soft,
    Language,
    Tools,
    Other,
}

impl SkillCategory {
    pub const ALL: [Self; 5] = [
        Self::Technical,
        Self::Soft,
        Self::Language,
        Self::Tools,
        Self::Other,
    ];

    /// Stable storage key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Soft => "soft",
            Self::Language => "language",
            Self::Tools => "tools",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Technical => write!(f, "Technical"),
            Self::Soft => write!(f, "Soft Skills"),
            Self::Language => write!(f, "Languages"),
            Self::Tools => write!(f, "Tools"),
            Self::Other => write!(f, "Other"),
        }
    }
}

impl std::str::FromStr for SkillCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "technical" | "tech" => Ok(Self::Technical),
            "soft" => Ok(Self::Soft),
            "language" | "languages" | "lang" => Ok(Self::Language),
            "tools" | "tool" => Ok(Self::Tools),
            "other" => Ok(Self::Other),
            _ => Err(format!(
                "Unknown skill category: {s}. Use: technical, soft, language, tools, other"
            )),
        }
    }
}

/// Lowest and highest proficiency level.
pub const MIN_SKILL_LEVEL: u8 = 1;
pub const MAX_SKILL_LEVEL: u8 = 5;

/// Skill entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub category: SkillCategory,
    /// Proficiency, 1..=5.
    pub level: u8,
    #[serde(default)]
    pub sort_order: i64,
}

impl Skill {
    /// Proficiency as a fraction of the maximum level.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        f32::from(self.level) / f32::from(MAX_SKILL_LEVEL)
    }

    /// Proficiency as a whole percentage.
    #[must_use]
    pub const fn percentage(&self) -> u8 {
        let pct = self.level.saturating_mul(100 / MAX_SKILL_LEVEL);
        if pct > 100 {
            100
        } else {
            pct
        }
    }
}
