/// Image media module
///
/// This module handles:
/// - Fetching and decoding the image bytes behind a photo url (loader.rs)
/// - The native file picker and confirmation dialogs (picker.rs)

pub mod loader;
pub mod picker;
