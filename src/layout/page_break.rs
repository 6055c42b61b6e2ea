//! # Page Break Decisions
//!
//! The layout cursor as a value. [`LayoutState`] is `Copy`; every transition
//! returns a new state instead of mutating one, so the pagination fold can be
//! driven and tested without any rendering dependency.

use crate::config::LayoutConfig;

/// The vertical bounds a page offers to flowing content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowLimits {
    /// Where the cursor starts on every page.
    pub top_margin: f64,
    /// The lowest y a block may reach.
    pub max_page_height: f64,
    /// Gap added after every placed block.
    pub block_spacing: f64,
}

impl FlowLimits {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            top_margin: config.margin_top,
            max_page_height: config.max_page_height(),
            block_spacing: config.block_spacing,
        }
    }

    /// Height available to blocks on an empty page.
    pub fn content_height(&self) -> f64 {
        self.max_page_height - self.top_margin
    }
}

/// What to do with the next block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// Place the block on the current page at the cursor.
    Place,
    /// The page holds no blocks yet but doesn't fit this one below the
    /// cursor: drop any leading gap and place at the top margin.
    PlaceAtTop,
    /// Close the current page and place the block at the top of the next.
    MoveToNextPage,
}

/// Decide whether a block of `height` can go on the current page.
///
/// A block that would cross `max_page_height` moves to the next page. On a
/// page with no blocks yet it restarts at the top margin instead, and only
/// overflows if it is taller than the whole content area.
pub fn decide_break(state: &LayoutState, height: f64, limits: &FlowLimits) -> BreakDecision {
    if state.cursor_y + height <= limits.max_page_height {
        BreakDecision::Place
    } else if state.blocks_on_page == 0 {
        BreakDecision::PlaceAtTop
    } else {
        BreakDecision::MoveToNextPage
    }
}

/// The layout cursor: where the next block goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutState {
    pub cursor_y: f64,
    pub page_index: usize,
    pub blocks_on_page: usize,
}

/// The outcome of placing one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub decision: BreakDecision,
    /// Page the block lands on.
    pub page_index: usize,
    /// The block's top edge.
    pub top: f64,
    /// The block extends past `max_page_height`.
    pub overflows: bool,
    /// Cursor state after the block and its trailing spacing.
    pub next: LayoutState,
}

impl LayoutState {
    /// `OnPage(top_margin, 0)`.
    pub fn initial(limits: &FlowLimits) -> Self {
        Self {
            cursor_y: limits.top_margin,
            page_index: 0,
            blocks_on_page: 0,
        }
    }

    /// Place a block of `height`, breaking the page first if it doesn't fit.
    ///
    /// Panics on a NaN, infinite, or negative height.
    pub fn place(self, height: f64, limits: &FlowLimits) -> Step {
        assert!(
            height.is_finite() && height >= 0.0,
            "block height must be finite and non-negative, got {height}"
        );

        let decision = decide_break(&self, height, limits);
        let start = match decision {
            BreakDecision::Place => self,
            BreakDecision::PlaceAtTop => Self {
                cursor_y: limits.top_margin,
                ..self
            },
            BreakDecision::MoveToNextPage => self.next_page(limits),
        };

        let top = start.cursor_y;
        Step {
            decision,
            page_index: start.page_index,
            top,
            overflows: top + height > limits.max_page_height,
            next: LayoutState {
                cursor_y: top + height + limits.block_spacing,
                page_index: start.page_index,
                blocks_on_page: start.blocks_on_page + 1,
            },
        }
    }

    /// Move the cursor down by `gap` without placing anything.
    pub fn advance(self, gap: f64) -> Self {
        assert!(
            gap.is_finite() && gap >= 0.0,
            "gap must be finite and non-negative, got {gap}"
        );
        Self {
            cursor_y: self.cursor_y + gap,
            ..self
        }
    }

    fn next_page(self, limits: &FlowLimits) -> Self {
        Self {
            cursor_y: limits.top_margin,
            page_index: self.page_index + 1,
            blocks_on_page: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> FlowLimits {
        FlowLimits {
            top_margin: 10.0,
            max_page_height: 280.0,
            block_spacing: 2.0,
        }
    }

    #[test]
    fn initial_state_is_top_of_first_page() {
        let state = LayoutState::initial(&limits());
        assert_eq!(state.cursor_y, 10.0);
        assert_eq!(state.page_index, 0);
        assert_eq!(state.blocks_on_page, 0);
    }

    #[test]
    fn fitting_block_is_placed() {
        let step = LayoutState::initial(&limits()).place(100.0, &limits());
        assert_eq!(step.decision, BreakDecision::Place);
        assert_eq!(step.top, 10.0);
        assert_eq!(step.next.cursor_y, 112.0);
        assert!(!step.overflows);
    }

    #[test]
    fn exact_fit_does_not_break() {
        let state = LayoutState {
            cursor_y: 180.0,
            page_index: 0,
            blocks_on_page: 3,
        };
        let step = state.place(100.0, &limits());
        assert_eq!(step.decision, BreakDecision::Place);
        assert_eq!(step.page_index, 0);
    }

    #[test]
    fn overflowing_block_moves_to_next_page() {
        let state = LayoutState {
            cursor_y: 200.0,
            page_index: 2,
            blocks_on_page: 4,
        };
        let step = state.place(100.0, &limits());
        assert_eq!(step.decision, BreakDecision::MoveToNextPage);
        assert_eq!(step.page_index, 3);
        assert_eq!(step.top, 10.0);
        assert_eq!(step.next.blocks_on_page, 1);
        assert_eq!(step.next.cursor_y, 112.0);
    }

    #[test]
    fn oversized_block_on_empty_page_stays_and_overflows() {
        let step = LayoutState::initial(&limits()).place(400.0, &limits());
        assert_eq!(step.decision, BreakDecision::PlaceAtTop);
        assert_eq!(step.page_index, 0);
        assert_eq!(step.top, 10.0);
        assert!(step.overflows);
    }

    #[test]
    fn leading_gap_is_dropped_when_first_block_would_cross_limit() {
        let state = LayoutState::initial(&limits()).advance(265.0);
        assert_eq!(state.blocks_on_page, 0);
        let step = state.place(20.0, &limits());
        assert_eq!(step.decision, BreakDecision::PlaceAtTop);
        assert_eq!(step.page_index, 0);
        assert_eq!(step.top, 10.0);
        assert!(!step.overflows);
        assert_eq!(step.next.cursor_y, 32.0);
    }

    #[test]
    fn leading_gap_is_kept_when_first_block_fits() {
        let step = LayoutState::initial(&limits()).advance(30.0).place(20.0, &limits());
        assert_eq!(step.decision, BreakDecision::Place);
        assert_eq!(step.top, 40.0);
    }

    #[test]
    fn oversized_block_after_content_gets_fresh_page() {
        let first = LayoutState::initial(&limits()).place(20.0, &limits());
        let step = first.next.place(400.0, &limits());
        assert_eq!(step.decision, BreakDecision::MoveToNextPage);
        assert_eq!(step.top, 10.0);
        assert!(step.overflows);
    }

    #[test]
    fn advance_never_breaks() {
        let state = LayoutState {
            cursor_y: 275.0,
            page_index: 0,
            blocks_on_page: 1,
        };
        let moved = state.advance(50.0);
        assert_eq!(moved.cursor_y, 325.0);
        assert_eq!(moved.page_index, 0);
    }

    #[test]
    #[should_panic(expected = "block height must be finite")]
    fn nan_height_panics() {
        LayoutState::initial(&limits()).place(f64::NAN, &limits());
    }

    #[test]
    fn limits_from_default_config() {
        let limits = FlowLimits::from_config(&LayoutConfig::default());
        assert_eq!(limits.max_page_height, 280.0);
        assert_eq!(limits.content_height(), 270.0);
    }
}
