//! # examset
//!
//! A page-native layout engine for exam-question practice sets.
//!
//! A practice set is an ordered list of questions, each an image of the
//! question plus the syllabus topics it was classified under. examset scales
//! every image to a fixed width, wraps the topic labels to the text column,
//! and flows the result onto fixed-size pages. Blocks are atomic: a page
//! break always happens *before* a block that would cross the bottom margin,
//! never through it.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON)
//!       ↓
//!   [model]     Question records and the question set
//!       ↓
//!   [builder]   Size every record into flow items
//!       ↓         (image_loader, text, font)
//!   [layout]    Fold the flow through the page cursor
//!       ↓
//!   [pdf]       Serialize to PDF bytes
//! ```
//!
//! Layout is deterministic: the same input and configuration always produce
//! the same pages and the same placements.

pub mod builder;
pub mod config;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod text;

pub use builder::{CancelFlag, Document, DocumentBuilder};
pub use config::LayoutConfig;
pub use error::{DecodeError, Error, Result};
pub use model::{ImageSource, QuestionRecord, QuestionSet};

/// Lay out a question set and return the paginated document.
pub fn build(set: &QuestionSet, config: &LayoutConfig) -> Result<Document> {
    config.validate()?;
    DocumentBuilder::new(config.clone()).build(&set.title, &set.subtitle, &set.questions)
}

/// Render a question set to PDF bytes.
///
/// This is the primary entry point. Any image that fails to decode fails the
/// whole render; no partial PDF is produced.
pub fn render(set: &QuestionSet, config: &LayoutConfig) -> Result<Vec<u8>> {
    Ok(build(set, config)?.to_pdf())
}

/// Render a question set described as JSON to PDF bytes.
pub fn render_json(json: &str, config: &LayoutConfig) -> Result<Vec<u8>> {
    let set = QuestionSet::from_json(json)?;
    render(&set, config)
}

/// Render on a tokio runtime, decoding images on the blocking pool.
///
/// Returns [`Error::Cancelled`] if `cancel` fires before the document is
/// finalized.
pub async fn render_async(
    set: &QuestionSet,
    config: &LayoutConfig,
    cancel: &CancelFlag,
) -> Result<Vec<u8>> {
    config.validate()?;
    let builder = DocumentBuilder::new(config.clone());
    let document = builder
        .build_async(&set.title, &set.subtitle, &set.questions, cancel)
        .await?;
    Ok(document.to_pdf())
}
