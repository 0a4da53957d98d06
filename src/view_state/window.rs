//! Pure visible-window computation.
//!
//! Given the row layout, viewport geometry, scroll offset, and overscan,
//! compute which rows to materialize and where they sit. The rendering layer
//! is a thin adapter over this function; nothing here touches a terminal.

use crate::view_state::height::RowLayout;

/// One row the renderer should materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualItem {
    /// Buffer index of the row.
    pub index: usize,
    /// Absolute vertical offset of the row's top.
    pub offset: usize,
    /// Current height (measured if known, estimated otherwise).
    pub height: usize,
}

/// The materialized slice of the document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualWindow {
    /// First materialized row (inclusive).
    pub start: usize,
    /// Past-the-end materialized row (exclusive).
    pub end: usize,
    /// Descriptors for rows in `start..end`, in order.
    pub items: Vec<VirtualItem>,
    /// Sum of all row heights, rendered or not; sizes the scrollable area.
    pub total_extent: usize,
}

impl VirtualWindow {
    /// Number of materialized rows.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is materialized.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Compute the window of rows intersecting
/// `[scroll_offset, scroll_offset + viewport_height)`, expanded by
/// `overscan` rows on each side.
///
/// Rows outside the window are not constructed. `total_extent` is
/// independent of how many rows are materialized. An empty layout, or a
/// scroll offset past the end of the content, yields an empty window (with
/// the true extent preserved).
pub fn compute_window(
    layout: &RowLayout,
    viewport_height: usize,
    scroll_offset: usize,
    overscan: usize,
) -> VirtualWindow {
    let total_extent = layout.total_extent();
    if layout.is_empty() || scroll_offset >= total_extent {
        return VirtualWindow {
            total_extent,
            ..VirtualWindow::default()
        };
    }

    let first_visible = layout
        .row_at(scroll_offset)
        .expect("offset below total extent resolves to a row");
    let last_offset = scroll_offset + viewport_height.max(1) - 1;
    let last_visible = layout.row_at(last_offset).unwrap_or(layout.len() - 1);

    let start = first_visible.saturating_sub(overscan);
    let end = (last_visible + overscan + 1).min(layout.len());

    let items = (start..end)
        .map(|index| VirtualItem {
            index,
            offset: layout.offset_of(index),
            height: layout.height(index),
        })
        .collect();

    VirtualWindow {
        start,
        end,
        items,
        total_extent,
    }
}
