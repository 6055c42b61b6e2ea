//! # Layout Configuration
//!
//! Every page constant the layout uses lives here: page size, margins, image
//! target width, spacing, and the fonts for each kind of text block. All
//! lengths are in layout units (`unit`, millimetres by default); font sizes
//! are always in points.
//!
//! The struct deserializes with `#[serde(default)]`, so a config file only
//! needs to name the fields it overrides:
//!
//! ```json
//! { "imageTargetWidth": 150, "pageNumbers": true }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::font::FontKey;

/// The unit layout coordinates are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Pt,
    In,
}

impl Unit {
    /// How many PDF points one layout unit spans.
    pub fn points_per_unit(self) -> f64 {
        match self {
            Unit::Mm => 72.0 / 25.4,
            Unit::Pt => 1.0,
            Unit::In => 72.0,
        }
    }
}

/// Font selection for one kind of text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FontSpec {
    pub family: String,
    /// Size in points.
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Helvetica".to_string(),
            size: 11.0,
            bold: false,
            italic: false,
        }
    }
}

impl FontSpec {
    pub fn new(family: &str, size: f64, bold: bool) -> Self {
        Self {
            family: family.to_string(),
            size,
            bold,
            italic: false,
        }
    }

    pub fn weight(&self) -> u32 {
        if self.bold {
            700
        } else {
            400
        }
    }

    /// The registry key the PDF writer and metrics lookups use.
    pub fn key(&self) -> FontKey {
        FontKey {
            family: self.family.clone(),
            weight: self.weight(),
            italic: self.italic,
        }
    }
}

/// Page geometry, spacing, and typography for a practice-set build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub unit: Unit,
    pub page_width: f64,
    pub page_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    /// Every question image is scaled to exactly this width.
    pub image_target_width: f64,
    /// Column width label text is wrapped to.
    pub body_width: f64,
    /// Vertical gap added after every placed block.
    pub block_spacing: f64,
    /// Extra gap after the last block of each question.
    pub question_spacing: f64,
    /// Line height as a multiple of the font size.
    pub line_height: f64,
    pub title_font: FontSpec,
    pub subtitle_font: FontSpec,
    pub heading_font: FontSpec,
    pub body_font: FontSpec,
    /// Heading placed above every question's topic label.
    pub label_heading: String,
    /// Label used when a question carries no topics.
    pub empty_topics_label: String,
    /// Place the question's own text (wrapped) after its image.
    pub include_question_text: bool,
    /// Prefix each question with a "Question N" heading.
    pub number_questions: bool,
    /// Add a "Page N of M" footer in the bottom margin.
    pub page_numbers: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            unit: Unit::Mm,
            page_width: 210.0,
            page_height: 297.0,
            margin_top: 10.0,
            margin_bottom: 17.0,
            margin_left: 15.0,
            image_target_width: 180.0,
            body_width: 180.0,
            block_spacing: 2.0,
            question_spacing: 10.0,
            line_height: 1.15,
            title_font: FontSpec::new("Helvetica", 16.0, true),
            subtitle_font: FontSpec::new("Helvetica", 12.0, false),
            heading_font: FontSpec::new("Helvetica", 11.0, true),
            body_font: FontSpec::new("Helvetica", 11.0, false),
            label_heading: "Topic Classification:".to_string(),
            empty_topics_label: "No prediction".to_string(),
            include_question_text: false,
            number_questions: false,
            page_numbers: false,
        }
    }
}

impl LayoutConfig {
    /// Parse a (possibly partial) config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LayoutConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// The lowest y a block may reach before it has to move to a new page.
    pub fn max_page_height(&self) -> f64 {
        self.page_height - self.margin_bottom
    }

    /// Height of one line of text in the given font, in layout units.
    pub fn line_height_of(&self, font: &FontSpec) -> f64 {
        font.size * self.line_height / self.unit.points_per_unit()
    }

    /// Convert a width measured in points into layout units.
    pub fn points_to_units(&self, points: f64) -> f64 {
        points / self.unit.points_per_unit()
    }

    /// Reject geometry that cannot hold any content.
    pub fn validate(&self) -> Result<()> {
        let lengths = [
            ("pageWidth", self.page_width),
            ("pageHeight", self.page_height),
            ("imageTargetWidth", self.image_target_width),
            ("bodyWidth", self.body_width),
            ("lineHeight", self.line_height),
        ];
        for (name, value) in lengths {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }

        let offsets = [
            ("marginTop", self.margin_top),
            ("marginBottom", self.margin_bottom),
            ("marginLeft", self.margin_left),
            ("blockSpacing", self.block_spacing),
            ("questionSpacing", self.question_spacing),
        ];
        for (name, value) in offsets {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::Config(format!("{name} must not be negative, got {value}")));
            }
        }

        if self.margin_top >= self.max_page_height() {
            return Err(Error::Config(format!(
                "margins leave no content area (top {} vs bottom limit {})",
                self.margin_top,
                self.max_page_height()
            )));
        }
        if self.margin_left + self.image_target_width > self.page_width {
            return Err(Error::Config(format!(
                "marginLeft + imageTargetWidth ({}) exceeds pageWidth {}",
                self.margin_left + self.image_target_width,
                self.page_width
            )));
        }
        if self.margin_left + self.body_width > self.page_width {
            return Err(Error::Config(format!(
                "marginLeft + bodyWidth ({}) exceeds pageWidth {}",
                self.margin_left + self.body_width,
                self.page_width
            )));
        }

        for font in [
            &self.title_font,
            &self.subtitle_font,
            &self.heading_font,
            &self.body_font,
        ] {
            if !(font.size.is_finite() && font.size > 0.0) {
                return Err(Error::Config(format!(
                    "font size for {} must be positive, got {}",
                    font.family, font.size
                )));
            }
        }

        Ok(())
    }
}
