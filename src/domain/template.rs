//! Template catalog and page formats.
//!
//! The catalog is compiled in and immutable; entitlement decides which
//! premium entries a user may pick.

use serde::{Deserialize, Serialize};

/// Template used for new CVs and as the fallback default.
pub const DEFAULT_TEMPLATE_ID: &str = "classic";

/// Product id prefix for per-template purchases.
pub const TEMPLATE_PRODUCT_PREFIX: &str = "template.";

/// Built-in font families available to templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

/// Header placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAlign {
    Left,
    Center,
}

/// Section order on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Summary,
    Experience,
    Education,
    Skills,
}

/// Layout parameters consumed by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateStyle {
    pub font: FontFamily,
    /// Accent colour as RGB in 0.0..=1.0.
    pub accent: (f32, f32, f32),
    pub header_align: HeaderAlign,
    pub sections: &'static [SectionKind],
    /// Render skill levels as a bar instead of `n/5`.
    pub skill_bars: bool,
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub is_premium: bool,
    /// Display price in cents; zero for free templates.
    pub price_cents: u32,
    pub style: TemplateStyle,
}

impl Template {
    /// Store product id used to purchase this template.
    #[must_use]
    pub fn product_id(&self) -> String {
        format!("{TEMPLATE_PRODUCT_PREFIX}{}", self.id)
    }

    /// Price formatted for display.
    #[must_use]
    pub fn price_label(&self) -> String {
        if self.is_premium {
            format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
        } else {
            "Free".to_string()
        }
    }
}

const STANDARD_ORDER: &[SectionKind] = &[
    SectionKind::Summary,
    SectionKind::Experience,
    SectionKind::Education,
    SectionKind::Skills,
];

const SKILLS_FIRST: &[SectionKind] = &[
    SectionKind::Summary,
    SectionKind::Skills,
    SectionKind::Experience,
    SectionKind::Education,
];

const EDUCATION_FIRST: &[SectionKind] = &[
    SectionKind::Summary,
    SectionKind::Education,
    SectionKind::Experience,
    SectionKind::Skills,
];

static CATALOG: [Template; 6] = [
    Template {
        id: "classic",
        name: "Classic",
        description: "Traditional single-column layout",
        is_premium: false,
        price_cents: 0,
        style: TemplateStyle {
            font: FontFamily::Times,
            accent: (0.0, 0.0, 0.0),
            header_align: HeaderAlign::Center,
            sections: STANDARD_ORDER,
            skill_bars: false,
        },
    },
    Template {
        id: "modern",
        name: "Modern",
        description: "Clean sans-serif with a blue accent",
        is_premium: false,
        price_cents: 0,
        style: TemplateStyle {
            font: FontFamily::Helvetica,
            accent: (0.16, 0.38, 0.71),
            header_align: HeaderAlign::Left,
            sections: STANDARD_ORDER,
            skill_bars: true,
        },
    },
    Template {
        id: "minimal",
        name: "Minimal",
        description: "Sparse layout, skills up front",
        is_premium: false,
        price_cents: 0,
        style: TemplateStyle {
            font: FontFamily::Helvetica,
            accent: (0.3, 0.3, 0.3),
            header_align: HeaderAlign::Left,
            sections: SKILLS_FIRST,
            skill_bars: false,
        },
    },
    Template {
        id: "executive",
        name: "Executive",
        description: "Serif headings with a deep green accent",
        is_premium: true,
        price_cents: 299,
        style: TemplateStyle {
            font: FontFamily::Times,
            accent: (0.09, 0.36, 0.25),
            header_align: HeaderAlign::Center,
            sections: STANDARD_ORDER,
            skill_bars: true,
        },
    },
    Template {
        id: "creative",
        name: "Creative",
        description: "Bold coral accent for design roles",
        is_premium: true,
        price_cents: 299,
        style: TemplateStyle {
            font: FontFamily::Helvetica,
            accent: (0.91, 0.33, 0.27),
            header_align: HeaderAlign::Left,
            sections: SKILLS_FIRST,
            skill_bars: true,
        },
    },
    Template {
        id: "academic",
        name: "Academic",
        description: "Education-first layout for research CVs",
        is_premium: true,
        price_cents: 399,
        style: TemplateStyle {
            font: FontFamily::Courier,
            accent: (0.35, 0.2, 0.5),
            header_align: HeaderAlign::Center,
            sections: EDUCATION_FIRST,
            skill_bars: false,
        },
    },
];

/// All templates, free first.
#[must_use]
pub fn all_templates() -> &'static [Template] {
    &CATALOG
}

/// Look up a template by id.
#[must_use]
pub fn find_template(id: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|t| t.id.eq_ignore_ascii_case(id))
}

/// Template referenced by a product id, if any.
#[must_use]
pub fn template_for_product(product_id: &str) -> Option<&'static Template> {
    product_id
        .strip_prefix(TEMPLATE_PRODUCT_PREFIX)
        .and_then(find_template)
}

/// Output page format, sized in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageSize {
    /// Width and height in points (1/72 inch).
    #[must_use]
    pub const fn points(self) -> (f32, f32) {
        match self {
            Self::A4 => (595.0, 842.0),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A4 => "a4",
            Self::Letter => "letter",
            Self::Legal => "legal",
        }
    }
}

impl std::fmt::Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A4 => write!(f, "A4"),
            Self::Letter => write!(f, "Letter"),
            Self::Legal => write!(f, "Legal"),
        }
    }
}

impl std::str::FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "letter" | "us-letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            _ => Err(format!("Unknown page size: {s}. Use: a4, letter, legal")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_default_and_unique_ids() {
        assert!(find_template(DEFAULT_TEMPLATE_ID).is_some_and(|t| !t.is_premium));

        let mut ids: Vec<_> = all_templates().iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all_templates().len());
    }

    #[test]
    fn test_free_templates_cost_nothing() {
        for t in all_templates() {
            assert_eq!(t.is_premium, t.price_cents > 0, "{}", t.id);
        }
    }

    #[test]
    fn test_product_id_roundtrip() {
        let t = find_template("executive").unwrap();
        assert_eq!(t.product_id(), "template.executive");
        assert_eq!(template_for_product("template.executive").map(|t| t.id), Some("executive"));
        assert!(template_for_product("premium.monthly").is_none());
    }

    #[test]
    fn test_price_label() {
        assert_eq!(find_template("academic").unwrap().price_label(), "$3.99");
        assert_eq!(find_template("classic").unwrap().price_label(), "Free");
    }

    #[test]
    fn test_page_size_points() {
        assert_eq!(PageSize::A4.points(), (595.0, 842.0));
        assert_eq!("Letter".parse(), Ok(PageSize::Letter));
        assert_eq!(PageSize::Legal.points().1, 1008.0);
        assert!("a3".parse::<PageSize>().is_err());
    }
}
