//! # Page-Aware Layout
//!
//! Layout runs in two phases. The builder first sizes every question into an
//! ordered list of [`FlowItem`]s: atomic content blocks with known heights,
//! plus spacing gaps. Nothing is drawn at this point. The list is then folded
//! through [`page_break::LayoutState`], which decides for each block whether
//! it fits on the current page or has to open a new one.
//!
//! Blocks are never split. A page break always comes before a block, never
//! in the middle of one:
//!
//! 1. Ask: does `cursor_y + height` stay within the page's bottom limit?
//! 2. If it does, place the block at `cursor_y` and move the cursor past it.
//! 3. If it doesn't and the page already holds content, close the page and
//!    place the block at the top margin of a fresh one.
//! 4. If the page is still empty, the block is taller than a whole page.
//!    It is placed anyway and overflows; the overflow is reported as a
//!    warning.

pub mod flow;
pub mod page_break;

pub use flow::{paginate, PageFlow, Pagination};
pub use page_break::{BreakDecision, FlowLimits, LayoutState, Step};

use crate::config::FontSpec;
use crate::image_loader::LoadedImage;

/// An atomic, non-splittable unit of content with a known size.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Image {
        width: f64,
        height: f64,
        image: LoadedImage,
    },
    TextLine {
        content: String,
        font: FontSpec,
        width: f64,
        height: f64,
    },
}

impl ContentBlock {
    pub fn width(&self) -> f64 {
        match self {
            ContentBlock::Image { width, .. } | ContentBlock::TextLine { width, .. } => *width,
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            ContentBlock::Image { height, .. } | ContentBlock::TextLine { height, .. } => *height,
        }
    }

    /// The text of a text-line block.
    pub fn text(&self) -> Option<&str> {
        match self {
            ContentBlock::TextLine { content, .. } => Some(content),
            ContentBlock::Image { .. } => None,
        }
    }
}

/// Horizontal placement of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    /// At the left margin.
    #[default]
    Left,
    /// Centered on the page width.
    Center,
}

/// One step of the sizing phase's output.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowItem {
    Place { block: ContentBlock, align: Align },
    /// Move the cursor down without placing anything. Never breaks a page.
    Gap(f64),
}

impl FlowItem {
    pub fn left(block: ContentBlock) -> Self {
        FlowItem::Place {
            block,
            align: Align::Left,
        }
    }

    pub fn centered(block: ContentBlock) -> Self {
        FlowItem::Place {
            block,
            align: Align::Center,
        }
    }
}

/// A fully laid-out page ready for PDF serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// A positioned element on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutElement {
    /// Absolute position on the page (top-left corner), in layout units.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

/// What to actually draw for this element.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Image { image_data: LoadedImage },
    Text { content: String, font: FontSpec },
}

impl From<ContentBlock> for DrawCommand {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Image { image, .. } => DrawCommand::Image { image_data: image },
            ContentBlock::TextLine { content, font, .. } => DrawCommand::Text { content, font },
        }
    }
}

impl LayoutElement {
    pub fn text(&self) -> Option<&str> {
        match &self.draw {
            DrawCommand::Text { content, .. } => Some(content),
            DrawCommand::Image { .. } => None,
        }
    }
}

/// A recorded page break: the block at `before_block` (counting placed
/// blocks from zero across the whole document) opened page `page_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBreak {
    pub before_block: usize,
    pub page_index: usize,
}

/// Non-fatal conditions noticed while building a document.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutWarning {
    /// No question records were supplied; the document holds only the header.
    EmptyInput,
    /// A block taller than the page's content area was placed anyway and
    /// extends past the bottom limit.
    Overflow {
        page_index: usize,
        height: f64,
        available: f64,
    },
}

impl std::fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutWarning::EmptyInput => {
                write!(f, "no questions supplied; document contains only the header")
            }
            LayoutWarning::Overflow {
                page_index,
                height,
                available,
            } => write!(
                f,
                "block of height {height:.1} overflows page {} (content area {available:.1})",
                page_index + 1
            ),
        }
    }
}
