/// State management module
///
/// This module handles all application state, including:
/// - Photo records and rendered slots (data.rs)
/// - Grid geometry and drop resolution (layout.rs)
/// - Reordering with dense positions (reorder.rs)
/// - The member's photo session against the store (session.rs)

pub mod data;
pub mod layout;
pub mod reorder;
pub mod session;
