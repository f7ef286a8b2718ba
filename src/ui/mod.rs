/// UI components module
///
/// This module contains:
/// - The photo grid canvas with drag-to-reorder (grid.rs)

pub mod grid;
