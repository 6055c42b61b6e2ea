//! # Document Builder
//!
//! Turns a question set into a paginated [`Document`]. Building has two
//! phases:
//!
//! 1. **Sizing.** Each record is decoded and measured into [`FlowItem`]s:
//!    the image block, the "Topic Classification:" heading, one block per
//!    wrapped label line, and a spacing gap. Nothing is positioned yet.
//! 2. **Placement.** The items are folded through the layout cursor
//!    ([`paginate`]), which assigns every block a page and a position.
//!
//! Any image that fails to decode aborts the whole build; no partial
//! document is ever returned.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::{FontSpec, LayoutConfig};
use crate::error::{Error, Result};
use crate::font::FontContext;
use crate::image_loader::{load_image, LoadedImage};
use crate::layout::{
    paginate, ContentBlock, DrawCommand, FlowItem, LayoutElement, LayoutPage, LayoutWarning,
    PageBreak, Pagination,
};
use crate::model::{Metadata, QuestionRecord};
use crate::pdf::PdfWriter;
use crate::text::wrap;

/// A cooperative cancellation signal shared between a build and its caller.
///
/// Cancelling never interrupts a block; the build notices at the next record
/// boundary (or just before finalizing) and returns [`Error::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A finished, paginated document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub pages: Vec<LayoutPage>,
    /// Every page break, in order. `pages.len() == page_breaks.len() + 1`.
    pub page_breaks: Vec<PageBreak>,
    pub warnings: Vec<LayoutWarning>,
    pub metadata: Metadata,
    config: LayoutConfig,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialize the document to PDF bytes.
    pub fn to_pdf(&self) -> Vec<u8> {
        PdfWriter::new(self.config.unit).write(&self.pages, &self.metadata, &FontContext::new())
    }

    /// Serialize and write the document to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_pdf())?;
        Ok(())
    }
}

/// Sizes question records and lays them out with a fixed configuration.
pub struct DocumentBuilder {
    config: LayoutConfig,
    fonts: FontContext,
}

impl DocumentBuilder {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            fonts: FontContext::new(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Build a document synchronously, decoding images on the calling thread.
    pub fn build(&self, title: &str, subtitle: &str, questions: &[QuestionRecord]) -> Result<Document> {
        let items = self.plan(title, subtitle, questions)?;
        Ok(self.finalize(title, subtitle, questions.len(), self.paginate(items)))
    }

    /// Build a document, decoding each image on tokio's blocking pool.
    ///
    /// Decodes are awaited one at a time in question order. `cancel` is
    /// checked before each record and before the document is finalized.
    pub async fn build_async(
        &self,
        title: &str,
        subtitle: &str,
        questions: &[QuestionRecord],
        cancel: &CancelFlag,
    ) -> Result<Document> {
        let mut items = self.header_items(title, subtitle);

        for (index, record) in questions.iter().enumerate() {
            cancel.check()?;
            let decode_error = |source| Error::Decode {
                id: record.id.clone(),
                source,
            };
            let image = match &record.image_data {
                Some(source) => {
                    let data = source.bytes().map_err(decode_error)?.into_owned();
                    let decoded = tokio::task::spawn_blocking(move || load_image(&data)).await?;
                    Some(decoded.map_err(decode_error)?)
                }
                None => None,
            };
            items.extend(self.question_items(index + 1, record, image));
        }

        cancel.check()?;
        let pagination = self.paginate(items);
        cancel.check()?;
        Ok(self.finalize(title, subtitle, questions.len(), pagination))
    }

    /// The sizing phase: decode every image and map the whole set to flow
    /// items, in document order.
    pub fn plan(&self, title: &str, subtitle: &str, questions: &[QuestionRecord]) -> Result<Vec<FlowItem>> {
        let mut items = self.header_items(title, subtitle);
        for (index, record) in questions.iter().enumerate() {
            let image = decode_record_image(record)?;
            items.extend(self.question_items(index + 1, record, image));
        }
        Ok(items)
    }

    /// The placement phase.
    pub fn paginate(&self, items: Vec<FlowItem>) -> Pagination {
        paginate(items, &self.config)
    }

    /// Title and subtitle, each centered. Empty strings are skipped.
    pub fn header_items(&self, title: &str, subtitle: &str) -> Vec<FlowItem> {
        [(title, &self.config.title_font), (subtitle, &self.config.subtitle_font)]
            .into_iter()
            .filter(|(text, _)| !text.trim().is_empty())
            .map(|(text, font)| FlowItem::centered(self.text_line(text, font)))
            .collect()
    }

    /// Size one question. `number` is the 1-based position in the set and
    /// only shows up when question numbering is on.
    pub fn question_items(
        &self,
        number: usize,
        record: &QuestionRecord,
        image: Option<LoadedImage>,
    ) -> Vec<FlowItem> {
        let config = &self.config;
        let mut items = Vec::new();

        if config.number_questions {
            let heading = format!("Question {number}");
            items.push(FlowItem::left(self.text_line(&heading, &config.heading_font)));
        }

        if let Some(image) = image {
            let scaled = image.scaled(config.image_target_width);
            debug!(
                "question {}: image {}x{}px -> {:.2}x{:.2}",
                record.id, image.width_px, image.height_px, scaled.width, scaled.height
            );
            items.push(FlowItem::left(ContentBlock::Image {
                width: scaled.width,
                height: scaled.height,
                image,
            }));
        }

        if config.include_question_text {
            if let Some(text) = record.text.as_deref() {
                items.extend(self.wrapped_lines(text, &config.body_font).map(FlowItem::left));
            }
        }

        items.push(FlowItem::centered(
            self.text_line(&config.label_heading, &config.heading_font),
        ));
        let label = record.topic_label(&config.empty_topics_label);
        items.extend(self.wrapped_lines(&label, &config.body_font).map(FlowItem::left));

        items.push(FlowItem::Gap(config.question_spacing));
        items
    }

    fn text_line(&self, content: &str, font: &FontSpec) -> ContentBlock {
        ContentBlock::TextLine {
            content: content.to_string(),
            font: font.clone(),
            width: self.config.points_to_units(self.fonts.measure(content, font)),
            height: self.config.line_height_of(font),
        }
    }

    fn wrapped_lines<'a>(
        &'a self,
        text: &'a str,
        font: &'a FontSpec,
    ) -> impl Iterator<Item = ContentBlock> + 'a {
        let measure = move |line: &str| self.config.points_to_units(self.fonts.measure(line, font));
        wrap(text, self.config.body_width, measure).map(move |line| self.text_line(&line, font))
    }

    fn finalize(&self, title: &str, subtitle: &str, question_count: usize, pagination: Pagination) -> Document {
        let Pagination {
            mut pages,
            page_breaks,
            mut warnings,
        } = pagination;

        if question_count == 0 {
            warn!("{}", LayoutWarning::EmptyInput);
            warnings.insert(0, LayoutWarning::EmptyInput);
        }

        if self.config.page_numbers {
            self.inject_page_numbers(&mut pages);
        }

        info!(
            "laid out {} question(s) on {} page(s) with {} break(s)",
            question_count,
            pages.len(),
            page_breaks.len()
        );

        Document {
            pages,
            page_breaks,
            warnings,
            metadata: Metadata {
                title: non_empty(title),
                subject: non_empty(subtitle),
                creator: None,
            },
            config: self.config.clone(),
        }
    }

    /// Add a centered "Page N of M" line in each page's bottom margin.
    fn inject_page_numbers(&self, pages: &mut [LayoutPage]) {
        let total = pages.len();
        let font = &self.config.body_font;
        let margin_bottom = self.config.margin_bottom;
        let footer_top = self.config.max_page_height();

        for (i, page) in pages.iter_mut().enumerate() {
            let content = format!("Page {} of {}", i + 1, total);
            let width = self.config.points_to_units(self.fonts.measure(&content, font));
            let height = self.config.line_height_of(font);
            page.elements.push(LayoutElement {
                x: (page.width - width) / 2.0,
                y: footer_top + ((margin_bottom - height) / 2.0).max(0.0),
                width,
                height,
                draw: DrawCommand::Text {
                    content,
                    font: font.clone(),
                },
            });
        }
    }
}

/// Decode a record's image, base64 first. Any failure names the record.
fn decode_record_image(record: &QuestionRecord) -> Result<Option<LoadedImage>> {
    let Some(source) = &record.image_data else {
        return Ok(None);
    };
    source
        .bytes()
        .and_then(|data| load_image(&data))
        .map(Some)
        .map_err(|source| Error::Decode {
            id: record.id.clone(),
            source,
        })
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
