//! cvforge - a local résumé builder.
//!
//! CVs, their sections and the user's purchases live in a local `SQLite`
//! database. Any CV can be rendered to PDF with one of the built-in
//! templates; free users get a monthly export quota and a watermark.
//!
//! QUICK START:
//!   cvforge new "Backend roles"                  # Create a CV
//!   cvforge info 1 --full-name "Ada Lovelace"     # Fill in personal info
//!   cvforge experience add 1 --title Engineer --company Acme --start 2021-03 --current
//!   cvforge templates                             # Browse templates
//!   cvforge export 1 --page-size letter           # Write a PDF

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    drain, format_cv_json, format_cv_markdown, format_cv_table, format_education_table,
    format_entitlement, format_experience_table, format_export_report, format_skill_table,
    format_templates_table, CvService, EducationEditor, EntitlementService, EventBus,
    ExperienceEditor, ExportOptions, ExportReport, ExportService, OutputFormat,
    PersonalInfoEditor, Preferences, SectionEditor, SectionEntry, Selection, SkillEditor,
    TemplateService,
};
use cli::{
    Cli, Commands, ConfigCommand, EducationCommand, EntryArgs, ExperienceCommand, InfoArgs,
    MoveArgs, PremiumCommand, SkillCommand,
};
use domain::{AppConfig, AppError, PageSize, SaveOutcome};
use infrastructure::{
    ensure_config_exists, load_config, save_config, LocalStorage, SimulatedStore, StoreBehavior,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(hint) = hint_for(&e) {
            eprintln!("{} {}", "Hint:".yellow(), hint);
        }
        std::process::exit(1);
    }
}

/// Opened store plus the long-lived collaborators every command borrows.
struct App {
    config: AppConfig,
    storage: LocalStorage,
    events: EventBus,
    store: SimulatedStore,
}

impl App {
    fn open(config: AppConfig, simulate_cancel: bool) -> domain::Result<Self> {
        let storage = LocalStorage::open(&config.storage_db_path())?;
        let behavior = if simulate_cancel {
            StoreBehavior::Cancel
        } else {
            StoreBehavior::Approve
        };
        let store = SimulatedStore::new(config.store_ledger_path(), behavior);

        Ok(Self {
            config,
            storage,
            events: EventBus::default(),
            store,
        })
    }

    const fn prefs(&self) -> Preferences<'_> {
        Preferences::new(&self.storage, &self.config)
    }

    const fn cvs(&self) -> CvService<'_> {
        CvService::new(&self.storage, &self.events, self.prefs())
    }

    fn entitlements(&self) -> EntitlementService<'_> {
        EntitlementService::new(
            &self.storage,
            &self.events,
            &self.store,
            self.config.export.free_export_limit,
        )
    }

    fn editor<E: SectionEntry>(&self, cv_selector: &str) -> domain::Result<SectionEditor<'_, E>> {
        let cv = self.cvs().resolve(cv_selector)?;
        SectionEditor::open(&self.storage, &self.events, cv.id)
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let config = load_config(cli.data_dir.as_deref())?;

    // Config commands work without opening the database.
    if let Commands::Config(command) = &cli.command {
        return cmd_config(&config, command);
    }

    let app = App::open(config, cli.simulate_cancel)?;
    let mut events = app.events.subscribe();
    let opens = app.prefs().record_open()?;
    tracing::debug!(opens, "Recorded launch");

    match cli.command {
        Commands::New { name } => cmd_new(&app, &name)?,
        Commands::List => cmd_list(&app)?,
        Commands::Show { cv, format } => {
            let format = format
                .parse::<OutputFormat>()
                .map_err(|message| AppError::Config { message })?;
            cmd_show(&app, &cv, format)?;
        }
        Commands::Rename { cv, name } => {
            let mut cv = app.cvs().resolve(&cv)?;
            app.cvs().rename(&mut cv, &name)?;
            println!("{} Renamed to {}", "✓".green().bold(), cv.name.cyan());
        }
        Commands::Delete { cv } => {
            let cv = app.cvs().resolve(&cv)?;
            app.cvs().delete(&cv)?;
            println!("{} Deleted {}", "✓".green().bold(), cv.name.cyan());
        }
        Commands::Duplicate { cv } => {
            let cv = app.cvs().resolve(&cv)?;
            let copy = app.cvs().duplicate(&cv)?;
            println!(
                "{} Created {} ({})",
                "✓".green().bold(),
                copy.name.cyan(),
                copy.short_id()
            );
        }
        Commands::Info(args) => cmd_info(&app, &args)?,
        Commands::Experience(command) => cmd_experience(&app, command)?,
        Commands::Education(command) => cmd_education(&app, command)?,
        Commands::Skill(command) => cmd_skill(&app, command)?,
        Commands::Templates => cmd_templates(&app)?,
        Commands::SelectTemplate { template, cv, buy } => {
            cmd_select_template(&app, &template, cv.as_deref(), buy).await?;
        }
        Commands::Premium(command) => cmd_premium(&app, &command).await?,
        Commands::Export {
            cv,
            output,
            page_size,
        } => {
            let report = cmd_export(&app, &cv, output, page_size)?;
            println!("{}", format_export_report(&report));
        }
        Commands::Config(_) => {}
    }

    let published = drain(&mut events);
    tracing::debug!(count = published.len(), "Command finished");

    if app.prefs().take_review_prompt()? {
        println!();
        println!(
            "{} Enjoying cvforge? A quick review helps other people find it.",
            "★".yellow()
        );
    }

    Ok(())
}

fn cmd_new(app: &App, name: &str) -> domain::Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Config {
            message: "CV name cannot be empty".into(),
        });
    }

    let cv = app.cvs().create(name)?;
    println!(
        "{} Created {} ({}) with template {}",
        "✓".green().bold(),
        cv.name.cyan(),
        cv.short_id(),
        cv.template_id
    );
    if !cv.personal.is_empty() {
        println!("  Personal info pre-filled from your last CV.");
    }
    Ok(())
}

fn cmd_list(app: &App) -> domain::Result<()> {
    let cvs = app.cvs().fetch_all()?;
    if cvs.is_empty() {
        println!("No CVs yet. Create one with: cvforge new \"My CV\"");
        return Ok(());
    }

    println!("{}", format_cv_table(&cvs));
    println!();
    println!("Total: {} CV(s)", cvs.len());
    Ok(())
}

fn cmd_show(app: &App, selector: &str, format: OutputFormat) -> domain::Result<()> {
    let cv = app.cvs().resolve(selector)?;
    let output = match format {
        OutputFormat::Markdown => format_cv_markdown(&cv),
        OutputFormat::Json => format_cv_json(&cv).map_err(AppError::json_parse)?,
    };
    println!("{output}");
    Ok(())
}

/// Export a CV. An explicit page size becomes the default once the export
/// has succeeded.
fn cmd_export(
    app: &App,
    selector: &str,
    output: Option<PathBuf>,
    page_size: Option<PageSize>,
) -> domain::Result<ExportReport> {
    let cv = app.cvs().resolve(selector)?;
    let prefs = app.prefs();
    let options = ExportOptions {
        page_size: page_size.map_or_else(|| prefs.page_size(), Ok)?,
        output,
    };

    let entitlements = app.entitlements();
    let exporter = ExportService::new(&app.events, &entitlements, app.config.exports_dir());
    let report = exporter.export(&cv, &options)?;

    if let Some(size) = page_size {
        prefs.set_page_size(size)?;
    }
    Ok(report)
}

fn cmd_info(app: &App, args: &InfoArgs) -> domain::Result<()> {
    let mut cv = app.cvs().resolve(&args.cv)?;
    let editor = PersonalInfoEditor::new(
        &app.storage,
        &app.events,
        app.prefs(),
        app.config.max_photo_bytes(),
    );

    if let Some(path) = &args.photo {
        editor.set_photo(&mut cv, path)?;
        println!("{} Photo attached", "✓".green().bold());
    } else if args.clear_photo {
        editor.clear_photo(&mut cv)?;
        println!("{} Photo removed", "✓".green().bold());
    }

    if args.has_fields() {
        let mut draft = editor.draft(&cv);
        args.apply(&mut draft);
        report_outcome("Personal info", &editor.save(&mut cv, &draft)?);
    } else if args.photo.is_none() && !args.clear_photo {
        println!("{}", format_cv_markdown(&cv));
    }

    Ok(())
}

fn cmd_experience(app: &App, command: ExperienceCommand) -> domain::Result<()> {
    match command {
        ExperienceCommand::List { cv } => {
            let editor: ExperienceEditor<'_> = app.editor(&cv)?;
            print_entries(&editor.entries()?, format_experience_table);
        }
        ExperienceCommand::Add { cv, fields } => {
            let editor: ExperienceEditor<'_> = app.editor(&cv)?;
            let mut draft = editor.new_draft();
            fields.apply(&mut draft);
            report_outcome("Experience", &editor.save(&draft)?);
        }
        ExperienceCommand::Edit { target, fields } => {
            let editor: ExperienceEditor<'_> = app.editor(&target.cv)?;
            let mut draft = editor.edit(&editor.find(&target.entry)?);
            fields.apply(&mut draft);
            report_outcome("Experience", &editor.save(&draft)?);
        }
        ExperienceCommand::Delete(args) => delete_entry::<domain::Experience>(app, &args)?,
        ExperienceCommand::Move(args) => {
            let editor: ExperienceEditor<'_> = app.editor(&args.cv)?;
            print_entries(&move_entry(&editor, &args)?, format_experience_table);
        }
    }
    Ok(())
}

fn cmd_education(app: &App, command: EducationCommand) -> domain::Result<()> {
    match command {
        EducationCommand::List { cv } => {
            let editor: EducationEditor<'_> = app.editor(&cv)?;
            print_entries(&editor.entries()?, format_education_table);
        }
        EducationCommand::Add { cv, fields } => {
            let editor: EducationEditor<'_> = app.editor(&cv)?;
            let mut draft = editor.new_draft();
            fields.apply(&mut draft);
            report_outcome("Education", &editor.save(&draft)?);
        }
        EducationCommand::Edit { target, fields } => {
            let editor: EducationEditor<'_> = app.editor(&target.cv)?;
            let mut draft = editor.edit(&editor.find(&target.entry)?);
            fields.apply(&mut draft);
            report_outcome("Education", &editor.save(&draft)?);
        }
        EducationCommand::Delete(args) => delete_entry::<domain::Education>(app, &args)?,
        EducationCommand::Move(args) => {
            let editor: EducationEditor<'_> = app.editor(&args.cv)?;
            print_entries(&move_entry(&editor, &args)?, format_education_table);
        }
    }
    Ok(())
}

fn cmd_skill(app: &App, command: SkillCommand) -> domain::Result<()> {
    match command {
        SkillCommand::List { cv } => {
            let editor: SkillEditor<'_> = app.editor(&cv)?;
            print_entries(&editor.entries()?, format_skill_table);
        }
        SkillCommand::Add { cv, fields } => {
            let editor: SkillEditor<'_> = app.editor(&cv)?;
            let mut draft = editor.new_draft();
            fields.apply(&mut draft);
            report_outcome("Skill", &editor.save(&draft)?);
        }
        SkillCommand::Edit { target, fields } => {
            let editor: SkillEditor<'_> = app.editor(&target.cv)?;
            let mut draft = editor.edit(&editor.find(&target.entry)?);
            fields.apply(&mut draft);
            report_outcome("Skill", &editor.save(&draft)?);
        }
        SkillCommand::Delete(args) => delete_entry::<domain::Skill>(app, &args)?,
        SkillCommand::Move(args) => {
            let editor: SkillEditor<'_> = app.editor(&args.cv)?;
            print_entries(&move_entry(&editor, &args)?, format_skill_table);
        }
    }
    Ok(())
}

fn delete_entry<E: SectionEntry>(app: &App, args: &EntryArgs) -> domain::Result<()> {
    let editor = app.editor::<E>(&args.cv)?;
    let entry = editor.find(&args.entry)?;
    editor.delete(&entry)?;
    println!("{} {} deleted", "✓".green().bold(), E::LABEL);
    Ok(())
}

fn move_entry<E: SectionEntry>(
    editor: &SectionEditor<'_, E>,
    args: &MoveArgs,
) -> domain::Result<Vec<E>> {
    let entry = editor.find(&args.entry)?;
    editor.move_to(&entry, usize::from(args.position) - 1)
}

fn print_entries<E>(entries: &[E], format: fn(&[E]) -> String) {
    if entries.is_empty() {
        println!("No entries yet.");
    } else {
        println!("{}", format(entries));
    }
}

fn report_outcome<T>(label: &str, outcome: &SaveOutcome<T>) {
    match outcome {
        SaveOutcome::Saved(_) => println!("{} {label} saved", "✓".green().bold()),
        SaveOutcome::Invalid(message) => {
            println!("{} {label} not saved: {message}", "✗".red().bold());
        }
    }
}

fn cmd_templates(app: &App) -> domain::Result<()> {
    let entitlements = app.entitlements();
    let templates = TemplateService::new(&app.storage, &app.events, app.prefs(), &entitlements);

    println!("{}", format_templates_table(&templates.listings()?));
    println!();
    println!("Select with: cvforge select-template <id> [--cv <cv>] [--buy]");
    Ok(())
}

async fn cmd_select_template(
    app: &App,
    template_id: &str,
    cv_selector: Option<&str>,
    buy: bool,
) -> domain::Result<()> {
    let mut cv = cv_selector.map(|s| app.cvs().resolve(s)).transpose()?;
    let entitlements = app.entitlements();
    let templates = TemplateService::new(&app.storage, &app.events, app.prefs(), &entitlements);

    let outcome = if buy {
        templates.purchase_and_select(template_id, cv.as_mut()).await?
    } else {
        templates.select(template_id, cv.as_mut())?
    };

    match outcome {
        Selection::Applied(template) => {
            let target = cv.map_or_else(|| "default".to_string(), |cv| cv.name);
            println!(
                "{} Template {} selected for {}",
                "✓".green().bold(),
                template.name.cyan(),
                target
            );
        }
        Selection::PurchaseRequired(template) => {
            println!(
                "{} {} is a premium template ({}). Nothing was changed.",
                "🔒".bold(),
                template.name.cyan(),
                template.price_label()
            );
            println!("   Buy it with --buy, or unlock everything with: cvforge premium buy");
        }
        Selection::Cancelled => {
            println!("{} Purchase cancelled; selection unchanged", "✗".yellow());
        }
    }
    Ok(())
}

async fn cmd_premium(app: &App, command: &PremiumCommand) -> domain::Result<()> {
    let entitlements = app.entitlements();

    match command {
        PremiumCommand::Status => {}
        PremiumCommand::Buy => {
            if entitlements.purchase_premium().await? {
                println!("{} Premium unlocked", "✓".green().bold());
            } else {
                println!("{} Purchase cancelled", "✗".yellow());
            }
        }
        PremiumCommand::BuyTemplate { template } => {
            let templates =
                TemplateService::new(&app.storage, &app.events, app.prefs(), &entitlements);
            let template = templates.get(template)?;
            if entitlements.purchase_template(template).await? {
                println!("{} {} unlocked", "✓".green().bold(), template.name.cyan());
            } else {
                println!("{} Purchase cancelled", "✗".yellow());
            }
        }
        PremiumCommand::Restore => {
            if entitlements.restore().await? {
                println!("{} Purchases restored", "✓".green().bold());
            } else {
                println!("Nothing to restore.");
            }
        }
    }

    println!("{}", format_entitlement(&entitlements.state()?));
    Ok(())
}

fn cmd_config(config: &AppConfig, command: &ConfigCommand) -> domain::Result<()> {
    match command {
        ConfigCommand::Init => {
            let (path, created) = ensure_config_exists(config)?;
            if created {
                println!("{} Created {}", "✓".green().bold(), path.display());
            } else {
                println!("Config already exists: {}", path.display());
            }
        }
        ConfigCommand::Show => {
            let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
                message: format!("Failed to serialize config: {e}"),
            })?;
            println!("{}", "⚙ Configuration".bold());
            println!("{content}");

            let db_path = config.storage_db_path();
            let db_size = if db_path.exists() {
                LocalStorage::open(&db_path)?.get_storage_size()?
            } else {
                0
            };
            println!("{}", "📂 Paths".bold());
            println!("  Config:   {}", config.config_file_path().display());
            println!(
                "  Database: {} ({} KB)",
                db_path.display(),
                db_size.div_ceil(1024)
            );
            println!("  Exports:  {}", config.exports_dir().display());
            println!("  Receipts: {}", config.store_ledger_path().display());
        }
        ConfigCommand::Set { key, value } => {
            let mut updated = config.clone();
            updated
                .set(key, value)
                .map_err(|message| AppError::Config { message })?;
            save_config(&updated)?;
            println!("{} {key} = {value}", "✓".green().bold());
        }
    }
    Ok(())
}

/// Follow-up suggestion for errors the user can act on.
fn hint_for(error: &AppError) -> Option<&'static str> {
    match error {
        AppError::ExportLimitReached { .. } => {
            Some("Upgrade with `cvforge premium buy` for unlimited, watermark-free exports")
        }
        AppError::TemplateLocked { .. } => {
            Some("Unlock it with `cvforge select-template <id> --buy` or `cvforge premium buy`")
        }
        AppError::NotFound { kind: "CV", .. } => Some("List CVs with `cvforge list`"),
        _ => None,
    }
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntitlementState;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_page_size_remembered_only_after_export() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.data_dir = Some(dir.path().to_path_buf());
        let app = App::open(config, false).unwrap();
        app.cvs().create("Resume").unwrap();

        let mut spent = EntitlementState::new(3, Utc::now());
        spent.exports_used = 3;
        app.storage.save_entitlement(&spent).unwrap();

        let err = cmd_export(&app, "1", None, Some(PageSize::Legal)).unwrap_err();
        assert!(matches!(err, AppError::ExportLimitReached { .. }));
        assert_eq!(app.prefs().page_size().unwrap(), PageSize::A4);

        app.storage
            .save_entitlement(&EntitlementState::new(3, Utc::now()))
            .unwrap();
        let report = cmd_export(&app, "1", None, Some(PageSize::Legal)).unwrap();
        assert_eq!(report.page_size, PageSize::Legal);
        assert_eq!(app.prefs().page_size().unwrap(), PageSize::Legal);
    }
}
