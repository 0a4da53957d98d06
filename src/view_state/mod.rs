//! Pure layout state for the windowed viewer.
//!
//! Everything here is renderer-agnostic: heights, prefix sums, and window
//! computation take explicit geometry inputs and return plain descriptors,
//! so the whole layer is unit-testable without a terminal.

pub mod height;
pub mod height_index;
pub mod window;

pub use height::{LayoutParams, RowLayout};
pub use height_index::HeightIndex;
pub use window::{compute_window, VirtualItem, VirtualWindow};
