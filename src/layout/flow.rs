//! # Page Flow
//!
//! [`PageFlow`] drives a [`LayoutState`] through a document. It collects the
//! positioned elements of the open page, closes pages when the state breaks,
//! and records every break and overflow along the way.

use log::{debug, warn};

use super::page_break::{BreakDecision, FlowLimits, LayoutState};
use super::{
    Align, ContentBlock, FlowItem, LayoutElement, LayoutPage, LayoutWarning, PageBreak,
};
use crate::config::LayoutConfig;

/// The result of paginating a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    pub pages: Vec<LayoutPage>,
    pub page_breaks: Vec<PageBreak>,
    pub warnings: Vec<LayoutWarning>,
}

/// Owns the layout cursor for a single build.
pub struct PageFlow {
    limits: FlowLimits,
    page_width: f64,
    page_height: f64,
    margin_left: f64,
    state: LayoutState,
    pages: Vec<LayoutPage>,
    elements: Vec<LayoutElement>,
    page_breaks: Vec<PageBreak>,
    warnings: Vec<LayoutWarning>,
    blocks_placed: usize,
}

impl PageFlow {
    pub fn new(config: &LayoutConfig) -> Self {
        let limits = FlowLimits::from_config(config);
        Self {
            limits,
            page_width: config.page_width,
            page_height: config.page_height,
            margin_left: config.margin_left,
            state: LayoutState::initial(&limits),
            pages: Vec::new(),
            elements: Vec::new(),
            page_breaks: Vec::new(),
            warnings: Vec::new(),
            blocks_placed: 0,
        }
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// Place a block at the left margin.
    pub fn place(&mut self, block: ContentBlock) {
        self.place_aligned(block, Align::Left);
    }

    /// Place a block centered on the page width.
    pub fn place_centered(&mut self, block: ContentBlock) {
        self.place_aligned(block, Align::Center);
    }

    pub fn place_aligned(&mut self, block: ContentBlock, align: Align) {
        let width = block.width();
        let height = block.height();
        let step = self.state.place(height, &self.limits);

        if step.decision == BreakDecision::MoveToNextPage {
            self.close_page();
            self.page_breaks.push(PageBreak {
                before_block: self.blocks_placed,
                page_index: step.page_index,
            });
            debug!(
                "page break before block {} -> page {}",
                self.blocks_placed,
                step.page_index + 1
            );
        } else if step.decision == BreakDecision::PlaceAtTop && step.top < self.state.cursor_y {
            debug!(
                "dropped leading gap on page {} for block {}",
                step.page_index + 1,
                self.blocks_placed
            );
        }

        if step.overflows {
            warn!(
                "block {} (height {:.1}) overflows page {}",
                self.blocks_placed,
                height,
                step.page_index + 1
            );
            self.warnings.push(LayoutWarning::Overflow {
                page_index: step.page_index,
                height,
                available: self.limits.max_page_height - step.top,
            });
        }

        let x = match align {
            Align::Left => self.margin_left,
            Align::Center => (self.page_width - width) / 2.0,
        };
        debug!(
            "placed block {} on page {} at ({x:.2}, {:.2}) size {width:.2}x{height:.2}",
            self.blocks_placed,
            step.page_index + 1,
            step.top
        );

        self.elements.push(LayoutElement {
            x,
            y: step.top,
            width,
            height,
            draw: block.into(),
        });
        self.state = step.next;
        self.blocks_placed += 1;
    }

    /// Move the cursor down without placing anything.
    pub fn advance(&mut self, gap: f64) {
        self.state = self.state.advance(gap);
    }

    /// Close the current page regardless of remaining space.
    pub fn finish(mut self) -> Pagination {
        self.close_page();
        Pagination {
            pages: self.pages,
            page_breaks: self.page_breaks,
            warnings: self.warnings,
        }
    }

    fn close_page(&mut self) {
        self.pages.push(LayoutPage {
            width: self.page_width,
            height: self.page_height,
            elements: std::mem::take(&mut self.elements),
        });
    }
}

/// Fold a sized flow through the layout cursor.
pub fn paginate(items: impl IntoIterator<Item = FlowItem>, config: &LayoutConfig) -> Pagination {
    let mut flow = PageFlow::new(config);
    for item in items {
        match item {
            FlowItem::Place { block, align } => flow.place_aligned(block, align),
            FlowItem::Gap(gap) => flow.advance(gap),
        }
    }
    flow.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontSpec;

    fn line(content: &str, width: f64, height: f64) -> ContentBlock {
        ContentBlock::TextLine {
            content: content.to_string(),
            font: FontSpec::default(),
            width,
            height,
        }
    }

    #[test]
    fn empty_flow_still_has_one_page() {
        let result = paginate(Vec::new(), &LayoutConfig::default());
        assert_eq!(result.pages.len(), 1);
        assert!(result.pages[0].elements.is_empty());
        assert!(result.page_breaks.is_empty());
    }

    #[test]
    fn centered_block_x() {
        let mut flow = PageFlow::new(&LayoutConfig::default());
        flow.place_centered(line("Practice Set", 50.0, 7.0));
        let result = flow.finish();
        let el = &result.pages[0].elements[0];
        assert_eq!(el.x, 80.0);
        assert_eq!(el.y, 10.0);
    }

    #[test]
    fn left_block_uses_margin() {
        let mut flow = PageFlow::new(&LayoutConfig::default());
        flow.place(line("No prediction", 30.0, 5.0));
        let result = flow.finish();
        assert_eq!(result.pages[0].elements[0].x, 15.0);
    }

    #[test]
    fn breaks_before_overflowing_block() {
        let items = vec![
            FlowItem::left(line("a", 10.0, 200.0)),
            FlowItem::left(line("b", 10.0, 100.0)),
            FlowItem::left(line("c", 10.0, 10.0)),
        ];
        let result = paginate(items, &LayoutConfig::default());
        assert_eq!(result.pages.len(), 2);
        assert_eq!(
            result.page_breaks,
            vec![PageBreak {
                before_block: 1,
                page_index: 1
            }]
        );
        let second = &result.pages[1].elements;
        assert_eq!(second[0].text(), Some("b"));
        assert_eq!(second[0].y, 10.0);
        assert_eq!(second[1].y, 112.0);
    }

    #[test]
    fn gap_moves_cursor_without_breaking() {
        let mut flow = PageFlow::new(&LayoutConfig::default());
        flow.place(line("a", 10.0, 5.0));
        flow.advance(10.0);
        assert_eq!(flow.state().cursor_y, 27.0);
        assert_eq!(flow.state().page_index, 0);
    }

    #[test]
    fn leading_gap_never_pushes_first_block_past_limit() {
        let items = vec![FlowItem::Gap(265.0), FlowItem::left(line("a", 10.0, 20.0))];
        let result = paginate(items, &LayoutConfig::default());
        assert_eq!(result.pages.len(), 1);
        assert!(result.page_breaks.is_empty());
        assert!(result.warnings.is_empty());
        let el = &result.pages[0].elements[0];
        assert_eq!(el.y, 10.0);
        assert!(el.y + el.height <= 280.0);
    }

    #[test]
    fn oversized_block_is_placed_with_warning() {
        let items = vec![
            FlowItem::left(line("title", 10.0, 8.0)),
            FlowItem::left(line("huge", 10.0, 500.0)),
        ];
        let result = paginate(items, &LayoutConfig::default());
        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.pages[1].elements[0].y, 10.0);
        assert!(matches!(
            result.warnings.as_slice(),
            [LayoutWarning::Overflow { page_index: 1, .. }]
        ));
    }
}
