//! Output formatting for CVs, sections, templates and entitlement.
//!
//! Listings are comfy-table tables; a single CV renders as Markdown or JSON.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{
    Cv, DatedEntry, Education, EntitlementState, Experience, Skill, MAX_SKILL_LEVEL,
};

use super::export_service::ExportReport;
use super::template_service::TemplateListing;

/// Output format for `show`.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable Markdown.
    #[default]
    Markdown,
    /// JSON for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: markdown, json")),
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header);
    table
}

fn or_dash(s: &str) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

/// Table of CVs, numbered for quick selection.
pub fn format_cv_table(cvs: &[Cv]) -> String {
    let mut table = new_table(vec!["#", "ID", "Name", "Owner", "Template", "Entries", "Updated"]);

    for (i, cv) in cvs.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            cv.short_id(),
            truncate(&cv.name, 30),
            or_dash(&truncate(&cv.personal.full_name, 24)),
            cv.template_id.clone(),
            cv.entry_count().to_string(),
            cv.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    table.to_string()
}

/// A full CV as Markdown.
pub fn format_cv_markdown(cv: &Cv) -> String {
    let mut out = String::new();
    let p = &cv.personal;

    let heading = if p.full_name.is_empty() {
        cv.name.clone()
    } else {
        p.full_name.clone()
    };
    out.push_str(&format!("# {heading}\n\n"));
    if !p.job_title.is_empty() {
        out.push_str(&format!("*{}*\n\n", p.job_title));
    }

    let contacts = p.contact_lines();
    if !contacts.is_empty() {
        out.push_str(&contacts.join(" · "));
        out.push_str("\n\n");
    }

    out.push_str(&format!(
        "**CV:** {} ({})  \n**Template:** {}  \n**Photo:** {}  \n**Updated:** {}\n\n",
        cv.name,
        cv.short_id(),
        cv.template_id,
        if cv.photo.is_some() { "yes" } else { "no" },
        cv.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    if !p.summary.is_empty() {
        out.push_str("## Summary\n\n");
        out.push_str(&p.summary);
        out.push_str("\n\n");
    }

    if !cv.experiences.is_empty() {
        out.push_str("## Experience\n\n");
        for e in &cv.experiences {
            out.push_str(&format!("### {} - {}\n\n", e.job_title, e.company));
            out.push_str(&format!("*{}*", e.date_range_label()));
            if !e.location.is_empty() {
                out.push_str(&format!(" · {}", e.location));
            }
            out.push_str("\n\n");
            if !e.description.is_empty() {
                out.push_str(&e.description);
                out.push_str("\n\n");
            }
        }
    }

    if !cv.educations.is_empty() {
        out.push_str("## Education\n\n");
        for e in &cv.educations {
            let subject = if e.field_of_study.is_empty() {
                e.degree.clone()
            } else {
                format!("{} in {}", e.degree, e.field_of_study)
            };
            out.push_str(&format!("### {subject} - {}\n\n", e.institution));
            out.push_str(&format!("*{}*", e.date_range_label()));
            if !e.gpa.is_empty() {
                out.push_str(&format!(" · GPA {}", e.gpa));
            }
            out.push_str("\n\n");
        }
    }

    if !cv.skills.is_empty() {
        out.push_str("## Skills\n\n");
        for s in &cv.skills {
            out.push_str(&format!(
                "- **{}** ({}) {}/{MAX_SKILL_LEVEL}\n",
                s.name, s.category, s.level
            ));
        }
        out.push('\n');
    }

    out
}

/// A full CV as JSON. The photo is omitted.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_cv_json(cv: &Cv) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(cv)
}

pub fn format_experience_table(entries: &[Experience]) -> String {
    let mut table = new_table(vec!["#", "Title", "Company", "Dates", "Location"]);
    for (i, e) in entries.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            truncate(&e.job_title, 30),
            truncate(&e.company, 25),
            e.date_range_label(),
            or_dash(&e.location),
        ]);
    }
    table.to_string()
}

pub fn format_education_table(entries: &[Education]) -> String {
    let mut table = new_table(vec!["#", "Degree", "Institution", "Dates", "GPA"]);
    for (i, e) in entries.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            truncate(&e.degree, 30),
            truncate(&e.institution, 25),
            e.date_range_label(),
            or_dash(&e.gpa),
        ]);
    }
    table.to_string()
}

pub fn format_skill_table(entries: &[Skill]) -> String {
    let mut table = new_table(vec!["#", "Skill", "Category", "Level"]);
    for (i, s) in entries.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            truncate(&s.name, 30),
            s.category.to_string(),
            format!("{}/{MAX_SKILL_LEVEL} ({}%)", s.level, s.percentage()),
        ]);
    }
    table.to_string()
}

/// Template catalog with price and availability.
pub fn format_templates_table(listings: &[TemplateListing]) -> String {
    let mut table = new_table(vec!["ID", "Name", "Price", "Status", "Description"]);

    for l in listings {
        let status = match (l.selected, l.unlocked) {
            (true, _) => "selected",
            (false, true) => "available",
            (false, false) => "locked",
        };
        table.add_row(vec![
            l.template.id.to_string(),
            l.template.name.to_string(),
            l.template.price_label(),
            status.to_string(),
            l.template.description.to_string(),
        ]);
    }

    table.to_string()
}

/// Entitlement summary for display.
pub fn format_entitlement(state: &EntitlementState) -> String {
    let plan = if state.is_premium {
        "Premium".green().bold()
    } else {
        "Free".yellow().bold()
    };

    let exports = match state.exports_remaining() {
        None => "unlimited".green().to_string(),
        Some(left) => format!(
            "{} of {} left ({})",
            left.to_string().cyan(),
            state.free_export_limit,
            state.period
        ),
    };

    let templates = if state.purchased_template_ids.is_empty() {
        "-".to_string()
    } else {
        state
            .purchased_template_ids
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "{}\n  Plan: {}\n  Exports: {}\n  Watermark: {}\n  Purchased templates: {}",
        "💳 Entitlement".bold(),
        plan,
        exports,
        if state.should_watermark() { "yes" } else { "no" },
        templates
    )
}

pub fn format_export_report(report: &ExportReport) -> String {
    let mut out = format!(
        "{} Exported {} ({} KB, {}, template {})",
        "✓".green().bold(),
        report.path.display(),
        report.bytes.div_ceil(1024),
        report.page_size,
        report.template_id
    );

    if report.watermarked {
        out.push_str(&format!("\n  {}", "Free version: watermark added".yellow()));
    }
    if let Some(left) = report.exports_remaining {
        out.push_str(&format!("\n  Free exports left this month: {left}"));
    }

    out
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{find_template, PageSize, PersonalInfo, SkillCategory};
    use chrono::{NaiveDate, Utc};
    use std::path::PathBuf;
    use uuid::Uuid;

    fn sample_cv() -> Cv {
        let mut cv = Cv::new("Backend roles", "modern");
        cv.personal = PersonalInfo {
            full_name: "Ada Lovelace".into(),
            job_title: "Engineer".into(),
            email: "ada@example.com".into(),
            summary: "Writes programs.".into(),
            ..Default::default()
        };
        cv.experiences.push(Experience {
            id: Uuid::new_v4(),
            cv_id: cv.id,
            job_title: "Analyst".into(),
            company: "Babbage & Co".into(),
            location: String::new(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: None,
            is_current: true,
            description: String::new(),
            sort_order: 0,
        });
        cv.skills.push(Skill {
            id: Uuid::new_v4(),
            cv_id: cv.id,
            name: "Rust".into(),
            category: SkillCategory::Technical,
            level: 4,
            sort_order: 0,
        });
        cv
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world!", 8), "hello...");
        assert_eq!(truncate("résumé builder", 7), "résu...");
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!(
            "markdown".parse::<OutputFormat>(),
            Ok(OutputFormat::Markdown)
        ));
        assert!(matches!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_cv_markdown_sections() {
        let md = format_cv_markdown(&sample_cv());
        assert!(md.starts_with("# Ada Lovelace"));
        assert!(md.contains("## Summary"));
        assert!(md.contains("Analyst - Babbage & Co"));
        assert!(md.contains("Jan 2020 – Present"));
        assert!(md.contains("**Rust** (Technical) 4/5"));
        assert!(!md.contains("## Education"));
    }

    #[test]
    fn test_cv_table_numbers_rows() {
        let table = format_cv_table(&[sample_cv()]);
        assert!(table.contains("Backend roles"));
        assert!(table.contains("modern"));
    }

    #[test]
    fn test_entitlement_summary() {
        let mut state = EntitlementState::new(3, Utc::now());
        state.exports_used = 1;
        let text = format_entitlement(&state);
        assert!(text.contains("of 3 left"));
        assert!(text.contains("Watermark: yes"));
    }

    #[test]
    fn test_templates_table_status() {
        let listings = [
            TemplateListing {
                template: find_template("classic").unwrap(),
                unlocked: true,
                selected: true,
            },
            TemplateListing {
                template: find_template("executive").unwrap(),
                unlocked: false,
                selected: false,
            },
        ];
        let table = format_templates_table(&listings);
        assert!(table.contains("selected"));
        assert!(table.contains("locked"));
        assert!(table.contains("$2.99"));
    }

    #[test]
    fn test_export_report() {
        let report = ExportReport {
            path: PathBuf::from("/tmp/cv.pdf"),
            bytes: 2048,
            page_size: PageSize::A4,
            template_id: "classic",
            watermarked: true,
            exports_remaining: Some(2),
        };
        let text = format_export_report(&report);
        assert!(text.contains("/tmp/cv.pdf"));
        assert!(text.contains("2 KB"));
        assert!(text.contains("left this month: 2"));
    }
}
