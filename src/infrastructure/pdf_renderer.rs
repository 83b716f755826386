//! PDF rendering with `printpdf` built-in fonts.
//!
//! Layout is a single column flowed top to bottom; when a block does not
//! fit, a new page is started. Coordinates are tracked in points and
//! converted to millimetres at the `printpdf` boundary.

use printpdf::image_crate::{self, GenericImageView};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rgb,
};

use crate::domain::{
    AppError, Cv, DatedEntry, FontFamily, HeaderAlign, PageSize, Result, SectionKind,
    SkillCategory, Template, MAX_SKILL_LEVEL,
};

const MARGIN: f32 = 48.0;
const NAME_SIZE: f32 = 22.0;
const TITLE_SIZE: f32 = 13.0;
const HEADING_SIZE: f32 = 12.5;
const BODY_SIZE: f32 = 10.0;
const SMALL_SIZE: f32 = 9.0;
const LINE_GAP: f32 = 1.35;
const PHOTO_WIDTH_PT: f32 = 72.0;
const PHOTO_DPI: f32 = 300.0;

/// Text stamped on documents exported without premium.
pub const WATERMARK_TEXT: &str = "Created with cvforge - free version";

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn render_failed(context: &str, err: impl std::fmt::Debug) -> AppError {
    AppError::Export {
        message: format!("{context}: {err:?}"),
        source: None,
    }
}

/// Greedy word wrap to at most `max_chars` per line.
///
/// Words longer than a line are split.
#[must_use]
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let head: String = word.chars().take(max_chars).collect();
                word = word.chars().skip(max_chars).collect();
                lines.push(head);
            }

            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };

            if needed > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines
}

/// Built-in fonts only cover WinAnsi; fold common typographic characters.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '–' | '—' => '-',
            '‘' | '’' => '\'',
            '“' | '”' => '"',
            '•' => '*',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}

const fn fonts_for(family: FontFamily) -> (BuiltinFont, BuiltinFont) {
    match family {
        FontFamily::Helvetica => (BuiltinFont::Helvetica, BuiltinFont::HelveticaBold),
        FontFamily::Times => (BuiltinFont::TimesRoman, BuiltinFont::TimesBold),
        FontFamily::Courier => (BuiltinFont::Courier, BuiltinFont::CourierBold),
    }
}

/// Average glyph width as a fraction of the font size.
const fn char_width_factor(family: FontFamily) -> f32 {
    match family {
        FontFamily::Helvetica => 0.5,
        FontFamily::Times => 0.45,
        FontFamily::Courier => 0.6,
    }
}

#[derive(Clone, Copy)]
enum Weight {
    Regular,
    Bold,
}

/// Flowing writer over a growing document.
struct PageFlow<'a> {
    doc: &'a PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    width: f32,
    height: f32,
    /// Baseline of the next line, in points from the page bottom.
    cursor: f32,
    family: FontFamily,
    accent: (f32, f32, f32),
    watermark: bool,
    pages: usize,
}

impl PageFlow<'_> {
    fn content_width(&self) -> f32 {
        self.width - 2.0 * MARGIN
    }

    // A partial glyph does not fit, so truncate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn max_chars(&self, size: f32) -> usize {
        let per_char = size * char_width_factor(self.family);
        (self.content_width() / per_char) as usize
    }

    fn set_color(&self, (r, g, b): (f32, f32, f32)) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn stamp_watermark(&self) {
        if !self.watermark {
            return;
        }
        self.set_color((0.75, 0.75, 0.75));
        let x = MARGIN;
        self.layer.use_text(
            WATERMARK_TEXT,
            SMALL_SIZE,
            mm(x),
            mm(MARGIN / 2.0),
            &self.regular,
        );
        self.layer.use_text(
            WATERMARK_TEXT.to_uppercase(),
            HEADING_SIZE,
            mm(x),
            mm(self.height / 2.0),
            &self.bold,
        );
        self.set_color((0.0, 0.0, 0.0));
    }

    /// Start a new page when fewer than `needed` points remain.
    fn ensure_space(&mut self, needed: f32) {
        if self.cursor - needed >= MARGIN {
            return;
        }
        let (page, layer) = self.doc.add_page(
            mm(self.width),
            mm(self.height),
            format!("Page {}", self.pages + 1),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.cursor = self.height - MARGIN;
        self.stamp_watermark();
    }

    fn text_at(&mut self, text: &str, size: f32, weight: Weight, x: f32) {
        self.ensure_space(size * LINE_GAP);
        let font = match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        };
        self.layer
            .use_text(pdf_safe(text), size, mm(x), mm(self.cursor), font);
        self.cursor -= size * LINE_GAP;
    }

    fn line(&mut self, text: &str, size: f32, weight: Weight) {
        self.text_at(text, size, weight, MARGIN);
    }

    fn centered(&mut self, text: &str, size: f32, weight: Weight) {
        #[allow(clippy::cast_precision_loss)]
        let text_width = text.chars().count() as f32 * size * char_width_factor(self.family);
        let x = ((self.width - text_width) / 2.0).max(MARGIN);
        self.text_at(text, size, weight, x);
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        for line in wrap_text(text, self.max_chars(size)) {
            self.line(&line, size, Weight::Regular);
        }
    }

    fn gap(&mut self, pt: f32) {
        self.cursor -= pt;
    }

    fn heading(&mut self, text: &str) {
        self.gap(6.0);
        self.ensure_space(HEADING_SIZE * LINE_GAP * 3.0);
        self.set_color(self.accent);
        self.line(&text.to_uppercase(), HEADING_SIZE, Weight::Bold);
        self.set_color((0.0, 0.0, 0.0));
        self.gap(2.0);
    }
}

/// Renders CVs to PDF bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

impl PdfRenderer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Render `cv` with `template` on pages of `page_size`.
    ///
    /// # Errors
    /// Returns `AppError::Export` if the photo cannot be decoded or the
    /// document cannot be serialized.
    pub fn render(
        &self,
        cv: &Cv,
        template: &Template,
        page_size: PageSize,
        add_watermark: bool,
    ) -> Result<Vec<u8>> {
        let photo = cv
            .photo
            .as_deref()
            .map(image_crate::load_from_memory)
            .transpose()
            .map_err(|e| AppError::export("Photo data could not be decoded", e))?;

        let (width, height) = page_size.points();
        let title = if cv.personal.full_name.is_empty() {
            cv.name.clone()
        } else {
            format!("{} - {}", cv.personal.full_name, cv.name)
        };
        let (doc, page, layer) = PdfDocument::new(title, mm(width), mm(height), "Page 1");

        let style = template.style;
        let (regular, bold) = fonts_for(style.font);
        let regular = doc
            .add_builtin_font(regular)
            .map_err(|e| render_failed("Failed to load font", e))?;
        let bold = doc
            .add_builtin_font(bold)
            .map_err(|e| render_failed("Failed to load font", e))?;

        let mut flow = PageFlow {
            doc: &doc,
            regular,
            bold,
            layer: doc.get_page(page).get_layer(layer),
            width,
            height,
            cursor: height - MARGIN,
            family: style.font,
            accent: style.accent,
            watermark: add_watermark,
            pages: 1,
        };
        flow.stamp_watermark();

        if let Some(photo) = photo {
            #[allow(clippy::cast_precision_loss)]
            let (px_width, px_height) = (photo.width() as f32, photo.height() as f32);
            let natural_width = px_width / PHOTO_DPI * 72.0;
            let scale = PHOTO_WIDTH_PT / natural_width.max(1.0);
            let photo_height = px_height / PHOTO_DPI * 72.0 * scale;
            Image::from_dynamic_image(&photo).add_to_layer(
                flow.layer.clone(),
                ImageTransform {
                    translate_x: Some(mm(width - MARGIN - PHOTO_WIDTH_PT)),
                    translate_y: Some(mm(height - MARGIN - photo_height)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(PHOTO_DPI),
                    ..Default::default()
                },
            );
        }

        render_header(&mut flow, cv, style.header_align);

        for section in style.sections {
            match section {
                SectionKind::Summary => render_summary(&mut flow, cv),
                SectionKind::Experience => render_experience(&mut flow, cv),
                SectionKind::Education => render_education(&mut flow, cv),
                SectionKind::Skills => render_skills(&mut flow, cv, style.skill_bars),
            }
        }

        let pages = flow.pages;
        drop(flow);

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| render_failed("Failed to serialize PDF", e))?;

        tracing::debug!(
            template = template.id,
            pages,
            bytes = bytes.len(),
            watermark = add_watermark,
            "Rendered PDF"
        );

        Ok(bytes)
    }
}

fn render_header(flow: &mut PageFlow<'_>, cv: &Cv, align: HeaderAlign) {
    let p = &cv.personal;
    let name = if p.full_name.is_empty() {
        cv.name.as_str()
    } else {
        p.full_name.as_str()
    };
    let contact = p.contact_lines().join("  |  ");

    flow.set_color(flow.accent);
    match align {
        HeaderAlign::Left => flow.line(name, NAME_SIZE, Weight::Bold),
        HeaderAlign::Center => flow.centered(name, NAME_SIZE, Weight::Bold),
    }
    flow.set_color((0.0, 0.0, 0.0));

    if !p.job_title.is_empty() {
        match align {
            HeaderAlign::Left => flow.line(&p.job_title, TITLE_SIZE, Weight::Regular),
            HeaderAlign::Center => flow.centered(&p.job_title, TITLE_SIZE, Weight::Regular),
        }
    }
    if !contact.is_empty() {
        match align {
            HeaderAlign::Left => flow.line(&contact, SMALL_SIZE, Weight::Regular),
            HeaderAlign::Center => flow.centered(&contact, SMALL_SIZE, Weight::Regular),
        }
    }
    flow.gap(4.0);
}

fn render_summary(flow: &mut PageFlow<'_>, cv: &Cv) {
    if cv.personal.summary.is_empty() {
        return;
    }
    flow.heading("Profile");
    flow.paragraph(&cv.personal.summary, BODY_SIZE);
}

fn render_experience(flow: &mut PageFlow<'_>, cv: &Cv) {
    if cv.experiences.is_empty() {
        return;
    }
    flow.heading("Experience");
    for e in &cv.experiences {
        flow.ensure_space(BODY_SIZE * LINE_GAP * 3.0);
        flow.line(
            &format!("{} - {}", e.job_title, e.company),
            BODY_SIZE + 0.5,
            Weight::Bold,
        );
        let mut meta = e.date_range_label();
        if !e.location.is_empty() {
            meta.push_str(&format!("  |  {}", e.location));
        }
        flow.line(&meta, SMALL_SIZE, Weight::Regular);
        if !e.description.is_empty() {
            flow.paragraph(&e.description, BODY_SIZE);
        }
        flow.gap(4.0);
    }
}

fn render_education(flow: &mut PageFlow<'_>, cv: &Cv) {
    if cv.educations.is_empty() {
        return;
    }
    flow.heading("Education");
    for e in &cv.educations {
        flow.ensure_space(BODY_SIZE * LINE_GAP * 3.0);
        let degree = if e.field_of_study.is_empty() {
            e.degree.clone()
        } else {
            format!("{}, {}", e.degree, e.field_of_study)
        };
        flow.line(
            &format!("{degree} - {}", e.institution),
            BODY_SIZE + 0.5,
            Weight::Bold,
        );
        let mut meta = e.date_range_label();
        if !e.location.is_empty() {
            meta.push_str(&format!("  |  {}", e.location));
        }
        if !e.gpa.is_empty() {
            meta.push_str(&format!("  |  GPA {}", e.gpa));
        }
        flow.line(&meta, SMALL_SIZE, Weight::Regular);
        flow.gap(4.0);
    }
}

/// `[###--]` style gauge for a skill level.
fn level_bar(level: u8) -> String {
    let filled = usize::from(level.min(MAX_SKILL_LEVEL));
    let empty = usize::from(MAX_SKILL_LEVEL) - filled;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(empty))
}

fn render_skills(flow: &mut PageFlow<'_>, cv: &Cv, bars: bool) {
    if cv.skills.is_empty() {
        return;
    }
    flow.heading("Skills");
    for category in SkillCategory::ALL {
        let skills: Vec<String> = cv
            .skills
            .iter()
            .filter(|s| s.category == category)
            .map(|s| {
                if bars {
                    format!("{} {}", s.name, level_bar(s.level))
                } else {
                    format!("{} ({}/{MAX_SKILL_LEVEL})", s.name, s.level)
                }
            })
            .collect();
        if skills.is_empty() {
            continue;
        }
        flow.paragraph(&format!("{category}: {}", skills.join(", ")), BODY_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{find_template, Experience, Skill};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn sample_cv() -> Cv {
        let mut cv = Cv::new("Backend", "modern");
        cv.personal.full_name = "Ada Lovelace".into();
        cv.personal.job_title = "Engineer".into();
        cv.personal.email = "ada@example.com".into();
        cv.personal.summary = "Analytical engine enthusiast. ".repeat(20);
        cv.experiences.push(Experience {
            id: Uuid::new_v4(),
            cv_id: cv.id,
            job_title: "Programmer".into(),
            company: "Babbage & Co".into(),
            location: "London".into(),
            start_date: NaiveDate::from_ymd_opt(1842, 1, 1).unwrap(),
            end_date: None,
            is_current: true,
            description: "Wrote the first algorithm.".into(),
            sort_order: 0,
        });
        cv.skills.push(Skill {
            id: Uuid::new_v4(),
            cv_id: cv.id,
            name: "Mathematics".into(),
            category: SkillCategory::Technical,
            level: 5,
            sort_order: 0,
        });
        cv
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_level_bar() {
        assert_eq!(level_bar(3), "[###--]");
        assert_eq!(level_bar(9), "[#####]");
    }

    #[test]
    fn test_pdf_safe_folds_dashes() {
        assert_eq!(pdf_safe("Jan 2020 – Present"), "Jan 2020 - Present");
    }

    #[test]
    fn test_render_produces_pdf() {
        let cv = sample_cv();
        for template in crate::domain::all_templates() {
            let bytes = PdfRenderer::new()
                .render(&cv, template, PageSize::Letter, true)
                .unwrap();
            assert!(bytes.starts_with(b"%PDF"), "{}", template.id);
        }
    }

    /// Whether `text` is drawn anywhere in the page content of `pdf`.
    fn draws_text(pdf: &[u8], text: &str) -> bool {
        let hex: String = text.bytes().map(|b| format!("{b:02X}")).collect();
        pdf.windows(hex.len()).any(|w| w == hex.as_bytes())
    }

    #[test]
    fn test_watermark_only_when_requested() {
        let cv = sample_cv();
        let template = find_template("classic").unwrap();
        let renderer = PdfRenderer::new();

        let stamped = renderer.render(&cv, template, PageSize::A4, true).unwrap();
        let clean = renderer.render(&cv, template, PageSize::A4, false).unwrap();

        assert!(draws_text(&stamped, "Ada Lovelace"));
        assert!(draws_text(&clean, "Ada Lovelace"));
        assert!(draws_text(&stamped, WATERMARK_TEXT));
        assert!(!draws_text(&clean, WATERMARK_TEXT));
        assert!(!draws_text(&clean, &WATERMARK_TEXT.to_uppercase()));
    }

    #[test]
    fn test_long_cv_spans_pages() {
        let mut cv = sample_cv();
        let first = cv.experiences[0].clone();
        for i in 0..60 {
            let mut e = first.clone();
            e.id = Uuid::new_v4();
            e.sort_order = i;
            cv.experiences.push(e);
        }
        let template = find_template("classic").unwrap();
        let bytes = PdfRenderer::new()
            .render(&cv, template, PageSize::A4, false)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_malformed_photo_fails() {
        let mut cv = sample_cv();
        cv.photo = Some(b"definitely not an image".to_vec());

        let template = find_template("modern").unwrap();
        let err = PdfRenderer::new()
            .render(&cv, template, PageSize::A4, false)
            .unwrap_err();
        assert!(matches!(err, AppError::Export { .. }));
    }
}
