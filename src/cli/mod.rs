//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{
    EducationDraft, ExperienceDraft, PageSize, PersonalInfoDraft, SkillCategory, SkillDraft,
};

/// cvforge - build résumés locally and export them as PDF.
///
/// Quick start: cvforge new "Backend roles" | info 1 --full-name "Ada" | export 1
#[derive(Parser, Debug)]
#[command(name = "cvforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory (defaults to ~/.cvforge).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Make the simulated store cancel every purchase.
    #[arg(long, global = true, hide = true)]
    pub simulate_cancel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new CV.
    New {
        /// Document name, e.g. "Backend roles".
        name: String,
    },

    /// List all CVs, most recently updated first.
    List,

    /// Show a CV in detail.
    Show {
        /// CV id, id prefix or list number.
        cv: String,

        /// Output format: markdown or json.
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Rename a CV.
    Rename {
        cv: String,
        name: String,
    },

    /// Delete a CV and all of its entries.
    Delete { cv: String },

    /// Copy a CV's personal info and template into a new CV.
    Duplicate { cv: String },

    /// Edit personal info and photo.
    Info(InfoArgs),

    /// Manage work experience.
    #[command(subcommand)]
    Experience(ExperienceCommand),

    /// Manage education.
    #[command(subcommand)]
    Education(EducationCommand),

    /// Manage skills.
    #[command(subcommand)]
    Skill(SkillCommand),

    /// List available templates.
    Templates,

    /// Choose the default template, optionally applying it to a CV.
    SelectTemplate {
        /// Template id, e.g. "modern".
        template: String,

        /// Also apply to this CV.
        #[arg(long)]
        cv: Option<String>,

        /// Purchase the template first if it is locked.
        #[arg(long)]
        buy: bool,
    },

    /// Premium subscription and purchases.
    #[command(subcommand)]
    Premium(PremiumCommand),

    /// Export a CV as PDF.
    Export {
        cv: String,

        /// Output file (defaults to <data dir>/exports/<name>.pdf).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Page size: a4, letter or legal. Remembered for later exports.
        #[arg(short, long)]
        page_size: Option<PageSize>,
    },

    /// Configuration file management.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Personal info fields. Omitted fields keep their value.
#[derive(Args, Debug)]
pub struct InfoArgs {
    pub cv: String,

    #[arg(long)]
    pub full_name: Option<String>,
    #[arg(long)]
    pub job_title: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub website: Option<String>,
    #[arg(long)]
    pub linkedin: Option<String>,
    #[arg(long)]
    pub summary: Option<String>,

    /// Attach a photo (JPEG or PNG).
    #[arg(long, conflicts_with = "clear_photo")]
    pub photo: Option<PathBuf>,

    /// Remove the photo.
    #[arg(long)]
    pub clear_photo: bool,
}

impl InfoArgs {
    /// Whether any personal info field was given.
    pub const fn has_fields(&self) -> bool {
        self.full_name.is_some()
            || self.job_title.is_some()
            || self.email.is_some()
            || self.phone.is_some()
            || self.location.is_some()
            || self.website.is_some()
            || self.linkedin.is_some()
            || self.summary.is_some()
    }

    pub fn apply(&self, draft: &mut PersonalInfoDraft) {
        let info = &mut draft.info;
        let fields = [
            (&self.full_name, &mut info.full_name),
            (&self.job_title, &mut info.job_title),
            (&self.email, &mut info.email),
            (&self.phone, &mut info.phone),
            (&self.location, &mut info.location),
            (&self.website, &mut info.website),
            (&self.linkedin, &mut info.linkedin),
            (&self.summary, &mut info.summary),
        ];
        for (value, target) in fields {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }
    }
}

/// A CV and one of its entries.
#[derive(Args, Debug)]
pub struct EntryArgs {
    pub cv: String,
    /// Entry number or id prefix.
    pub entry: String,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    pub cv: String,
    pub entry: String,
    /// New 1-based position.
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub position: u16,
}

#[derive(Subcommand, Debug)]
pub enum ExperienceCommand {
    /// List entries.
    List { cv: String },
    /// Add an entry.
    Add {
        cv: String,
        #[command(flatten)]
        fields: ExperienceFields,
    },
    /// Edit an entry.
    Edit {
        #[command(flatten)]
        target: EntryArgs,
        #[command(flatten)]
        fields: ExperienceFields,
    },
    /// Delete an entry.
    Delete(EntryArgs),
    /// Move an entry to another position.
    Move(MoveArgs),
}

#[derive(Args, Debug)]
pub struct ExperienceFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// Start date, YYYY-MM or YYYY-MM-DD.
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,
    /// End date; clears "current".
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,
    /// Still working here.
    #[arg(long, conflicts_with = "end")]
    pub current: bool,
    #[arg(long)]
    pub description: Option<String>,
}

impl ExperienceFields {
    pub fn apply(self, draft: &mut ExperienceDraft) {
        set(&mut draft.job_title, self.title);
        set(&mut draft.company, self.company);
        set(&mut draft.location, self.location);
        set(&mut draft.description, self.description);
        if self.start.is_some() {
            draft.start_date = self.start;
        }
        apply_period(
            &mut draft.end_date,
            &mut draft.is_current,
            self.end,
            self.current,
        );
    }
}

#[derive(Subcommand, Debug)]
pub enum EducationCommand {
    /// List entries.
    List { cv: String },
    /// Add an entry.
    Add {
        cv: String,
        #[command(flatten)]
        fields: EducationFields,
    },
    /// Edit an entry.
    Edit {
        #[command(flatten)]
        target: EntryArgs,
        #[command(flatten)]
        fields: EducationFields,
    },
    /// Delete an entry.
    Delete(EntryArgs),
    /// Move an entry to another position.
    Move(MoveArgs),
}

#[derive(Args, Debug)]
pub struct EducationFields {
    #[arg(long)]
    pub degree: Option<String>,
    #[arg(long)]
    pub institution: Option<String>,
    /// Field of study.
    #[arg(long)]
    pub field: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// Start date, YYYY-MM or YYYY-MM-DD.
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,
    /// End date; clears "current".
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,
    /// Still studying here.
    #[arg(long, conflicts_with = "end")]
    pub current: bool,
    #[arg(long)]
    pub gpa: Option<String>,
}

impl EducationFields {
    pub fn apply(self, draft: &mut EducationDraft) {
        set(&mut draft.degree, self.degree);
        set(&mut draft.institution, self.institution);
        set(&mut draft.field_of_study, self.field);
        set(&mut draft.location, self.location);
        set(&mut draft.gpa, self.gpa);
        if self.start.is_some() {
            draft.start_date = self.start;
        }
        apply_period(
            &mut draft.end_date,
            &mut draft.is_current,
            self.end,
            self.current,
        );
    }
}

#[derive(Subcommand, Debug)]
pub enum SkillCommand {
    /// List entries.
    List { cv: String },
    /// Add an entry.
    Add {
        cv: String,
        #[command(flatten)]
        fields: SkillFields,
    },
    /// Edit an entry.
    Edit {
        #[command(flatten)]
        target: EntryArgs,
        #[command(flatten)]
        fields: SkillFields,
    },
    /// Delete an entry.
    Delete(EntryArgs),
    /// Move an entry to another position.
    Move(MoveArgs),
}

#[derive(Args, Debug)]
pub struct SkillFields {
    #[arg(long)]
    pub name: Option<String>,
    /// technical, soft, language, tools or other.
    #[arg(long)]
    pub category: Option<SkillCategory>,
    /// Proficiency from 1 to 5.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub level: Option<u8>,
}

impl SkillFields {
    pub fn apply(self, draft: &mut SkillDraft) {
        set(&mut draft.name, self.name);
        if let Some(category) = self.category {
            draft.category = category;
        }
        if let Some(level) = self.level {
            draft.level = level;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum PremiumCommand {
    /// Show plan, export quota and purchases.
    Status,
    /// Subscribe to premium.
    Buy,
    /// Buy a single premium template.
    BuyTemplate { template: String },
    /// Restore previous purchases.
    Restore,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the default configuration file.
    Init,
    /// Show the effective configuration and paths.
    Show,
    /// Change one setting, e.g. `config set export.default_page_size letter`.
    Set { key: String, value: String },
}

fn set(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn apply_period(
    end_date: &mut Option<NaiveDate>,
    is_current: &mut bool,
    end: Option<NaiveDate>,
    current: bool,
) {
    if current {
        *is_current = true;
        *end_date = None;
    } else if let Some(end) = end {
        *is_current = false;
        *end_date = Some(end);
    }
}

/// Parse `YYYY-MM-DD` or `YYYY-MM` (first of the month).
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
        .map_err(|_| format!("Invalid date: {s}. Use YYYY-MM or YYYY-MM-DD"))
}
