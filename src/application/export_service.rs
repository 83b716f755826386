//! PDF export pipeline: gate, render, write, count.

use std::path::PathBuf;

use crate::domain::{
    find_template, AppError, AppEvent, Cv, PageSize, Result, Template, DEFAULT_TEMPLATE_ID,
};
use crate::infrastructure::{stage_document, PdfRenderer};

use super::entitlement_service::EntitlementService;
use super::events::EventBus;

/// Per-export settings.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub page_size: PageSize,
    /// Explicit output path; defaults to the exports directory.
    pub output: Option<PathBuf>,
}

/// What an export produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub path: PathBuf,
    pub bytes: usize,
    pub page_size: PageSize,
    pub template_id: &'static str,
    pub watermarked: bool,
    /// Free exports left this month; `None` for premium.
    pub exports_remaining: Option<u32>,
}

pub struct ExportService<'a> {
    events: &'a EventBus,
    entitlements: &'a EntitlementService<'a>,
    renderer: PdfRenderer,
    exports_dir: PathBuf,
}

impl<'a> ExportService<'a> {
    #[must_use]
    pub fn new(
        events: &'a EventBus,
        entitlements: &'a EntitlementService<'a>,
        exports_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            events,
            entitlements,
            renderer: PdfRenderer::new(),
            exports_dir: exports_dir.into(),
        }
    }

    /// Default output path for `cv`.
    #[must_use]
    pub fn default_path(&self, cv: &Cv) -> PathBuf {
        self.exports_dir.join(format!("{}.pdf", cv.file_stem()))
    }

    /// Export `cv` as a PDF.
    ///
    /// The document is staged beside its target, counted, then moved into
    /// place. A failed move puts the counter back.
    ///
    /// # Errors
    /// - `AppError::ExportLimitReached` when the monthly quota is spent
    /// - `AppError::TemplateLocked` for a premium template not unlocked
    /// - `AppError::Export` when rendering or writing fails
    pub fn export(&self, cv: &Cv, options: &ExportOptions) -> Result<ExportReport> {
        let template = Self::template_of(cv)?;
        let state = self.entitlements.state()?;

        if !state.can_export() {
            tracing::info!(
                used = state.exports_used,
                limit = state.free_export_limit,
                "Export blocked by quota"
            );
            return Err(AppError::ExportLimitReached {
                used: state.exports_used,
                limit: state.free_export_limit,
            });
        }
        if !state.is_unlocked(template) {
            return Err(AppError::TemplateLocked {
                template_id: template.id.to_string(),
            });
        }

        let watermarked = state.should_watermark();
        let bytes = self
            .renderer
            .render(cv, template, options.page_size, watermarked)?;

        let path = options
            .output
            .clone()
            .unwrap_or_else(|| self.default_path(cv));
        let staged = stage_document(&path, &bytes)?;

        let after = self.entitlements.record_export()?;
        if let Err(e) = staged.commit() {
            if let Err(revert) = self.entitlements.revert_to(&state) {
                tracing::warn!(error = %revert, "Failed to restore export counter");
            }
            return Err(e);
        }
        self.events.publish(AppEvent::Exported { cv_id: cv.id });
        tracing::info!(
            cv_id = %cv.id,
            path = %path.display(),
            bytes = bytes.len(),
            watermarked,
            "Export written"
        );

        Ok(ExportReport {
            path,
            bytes: bytes.len(),
            page_size: options.page_size,
            template_id: template.id,
            watermarked,
            exports_remaining: after.exports_remaining(),
        })
    }

    fn template_of(cv: &Cv) -> Result<&'static Template> {
        if let Some(template) = find_template(&cv.template_id) {
            return Ok(template);
        }
        tracing::warn!(template = %cv.template_id, "Unknown template on CV, using default");
        find_template(DEFAULT_TEMPLATE_ID)
            .ok_or_else(|| AppError::not_found("Template", DEFAULT_TEMPLATE_ID))
    }
}
