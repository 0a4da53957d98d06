//! Row height estimation and the measured-height cache.
//!
//! A row's height is first *estimated* from its display width and the
//! container geometry, then *measured* once the renderer has actually laid
//! it out; the measurement replaces the estimate for all subsequent layout.
//! A container width change invalidates everything: estimates are recomputed
//! and measurements discarded until rows are rendered again.

use crate::model::LineBuffer;
use crate::view_state::height_index::HeightIndex;
use unicode_width::UnicodeWidthStr;

/// Geometry inputs for height estimation.
///
/// Expressed in abstract height/width units so the estimator is testable
/// with non-trivial geometry; the terminal instantiation is one cell per
/// character column, one unit per text row, no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutParams {
    /// Total container width in units.
    pub container_width: usize,
    /// Width consumed by horizontal chrome (borders, gutters).
    pub horizontal_padding: usize,
    /// Average width of one character, in units.
    pub average_char_width: usize,
    /// Height of one text line, in units.
    pub line_height: usize,
    /// Height consumed by vertical chrome per row.
    pub vertical_padding: usize,
    /// Lower bound on any row's height.
    pub min_row_height: usize,
}

impl LayoutParams {
    /// Terminal-cell geometry for the given width in columns.
    pub fn terminal(container_width: usize) -> Self {
        Self {
            container_width,
            horizontal_padding: 0,
            average_char_width: 1,
            line_height: 1,
            vertical_padding: 0,
            min_row_height: 1,
        }
    }

    /// Usable characters per wrapped line under this geometry.
    pub fn chars_per_line(&self) -> usize {
        let usable = self.container_width.saturating_sub(self.horizontal_padding);
        (usable / self.average_char_width.max(1)).max(1)
    }
}

/// Estimate a row's height for `text` under `params`.
///
/// `max(min_row_height, ceil(display_width / chars_per_line) * line_height
/// + vertical_padding)`, with at least one line. Width is display columns
/// (wide characters count double), the same measure the renderer wraps by.
/// Text with embedded newlines is estimated per segment.
pub fn estimate_height(text: &str, params: &LayoutParams) -> usize {
    let chars_per_line = params.chars_per_line();
    let lines: usize = text
        .split('\n')
        .map(|segment| segment.width().div_ceil(chars_per_line).max(1))
        .sum();
    (lines.max(1) * params.line_height + params.vertical_padding).max(params.min_row_height)
}

/// A cached row height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowHeight {
    /// Derived from the estimate formula; provisional.
    Estimated(usize),
    /// Reported by the renderer; authoritative until the next resize.
    Measured(usize),
}

impl RowHeight {
    fn value(self) -> usize {
        match self {
            RowHeight::Estimated(h) | RowHeight::Measured(h) => h,
        }
    }
}

/// Per-row heights plus the prefix-sum index, kept in lockstep.
///
/// The layout is rebuilt from the buffer on a width change and extended
/// incrementally on append; measured heights flow in from the renderer via
/// [`record_measured`](Self::record_measured).
#[derive(Debug)]
pub struct RowLayout {
    params: LayoutParams,
    heights: Vec<RowHeight>,
    index: HeightIndex,
}

impl RowLayout {
    /// Empty layout for the given geometry.
    pub fn new(params: LayoutParams) -> Self {
        Self {
            params,
            heights: Vec::new(),
            index: HeightIndex::default(),
        }
    }

    /// Current geometry.
    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Number of rows laid out.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// True when no rows are laid out.
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Append a row, estimating its height. Returns the estimate.
    pub fn push_line(&mut self, text: &str) -> usize {
        let height = estimate_height(text, &self.params);
        self.heights.push(RowHeight::Estimated(height));
        self.index.push(height);
        height
    }

    /// Record the actual rendered height of row `index`.
    ///
    /// Replaces the estimate (or a stale measurement) for all subsequent
    /// layout computations; offsets of later rows shift consistently.
    /// Out-of-range indices are ignored.
    pub fn record_measured(&mut self, index: usize, height: usize) {
        let Some(slot) = self.heights.get_mut(index) else {
            return;
        };
        let height = height.max(self.params.min_row_height);
        if *slot == RowHeight::Measured(height) {
            return;
        }
        *slot = RowHeight::Measured(height);
        self.index.set(index, height);
    }

    /// Height of row `index` (measured if available, estimated otherwise).
    pub fn height(&self, index: usize) -> usize {
        self.heights[index].value()
    }

    /// Vertical offset of the top of row `index`.
    pub fn offset_of(&self, index: usize) -> usize {
        self.index.offset_of(index)
    }

    /// Row containing vertical offset `y`, if any.
    pub fn row_at(&self, y: usize) -> Option<usize> {
        self.index.lower_bound(y)
    }

    /// Total scrollable extent: the sum of all row heights.
    pub fn total_extent(&self) -> usize {
        self.index.total()
    }

    /// Re-layout for a new container width.
    ///
    /// Recomputes every cached height from the buffer text; measurements are
    /// discarded (wrapping changed, they no longer hold) until the renderer
    /// reports fresh ones.
    pub fn set_container_width(&mut self, width: usize, buffer: &LineBuffer) {
        if width == self.params.container_width {
            return;
        }
        self.params.container_width = width;
        self.heights.clear();
        self.index = HeightIndex::with_capacity(buffer.len());
        for line in buffer.iter() {
            let height = estimate_height(line.text(), &self.params);
            self.heights.push(RowHeight::Estimated(height));
            self.index.push(height);
        }
    }
}
