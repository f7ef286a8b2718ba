/// Native picker and dialogs
///
/// Wraps rfd's async dialogs. The picker result is reduced to the three
/// cases the grid cares about: nothing picked, an error to show, or an
/// asset with its pixel size.

use log::{info, warn};
use rfd::{AsyncFileDialog, AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};
use std::path::{Path, PathBuf};
use tokio::task;

use crate::error::MediaError;

/// Image formats offered by the picker
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff"];

/// A picked image
#[derive(Debug, Clone, PartialEq)]
pub struct PickedAsset {
    pub uri: String,
    pub width: u32,
    pub height: u32,
}

impl PickedAsset {
    /// Read the pixel size of an image file without decoding all of it
    pub fn from_path(path: &Path) -> Result<Self, MediaError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|source| MediaError::Decode {
                uri: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            uri: format!("file://{}", path.display()),
            width,
            height,
        })
    }
}

/// What came back from the picker
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// Dialog dismissed, or nothing usable was selected
    Cancelled,
    /// Human-readable reason the pick failed
    Failed(String),
    Picked(PickedAsset),
}

impl PickOutcome {
    /// Resolve a picker selection into an outcome
    pub fn from_selection(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            info!("User cancelled image picker");
            return Self::Cancelled;
        };

        match PickedAsset::from_path(&path) {
            Ok(asset) => {
                info!("🖼️  Picked {} ({}x{})", asset.uri, asset.width, asset.height);
                Self::Picked(asset)
            }
            Err(e) => {
                warn!("⚠️  Picker error: {}", e);
                Self::Failed(e.to_string())
            }
        }
    }
}

/// Show the native image picker
pub async fn pick_photo() -> PickOutcome {
    let picked = AsyncFileDialog::new()
        .set_title("Choose a photo")
        .add_filter("Images", &IMAGE_EXTENSIONS)
        .pick_file()
        .await;

    let path = picked.map(|handle| handle.path().to_path_buf());

    // Reading the header touches the disk
    task::spawn_blocking(move || PickOutcome::from_selection(path))
        .await
        .unwrap_or_else(|e| PickOutcome::Failed(format!("Task join error: {}", e)))
}

/// Ask before deleting a photo
pub async fn confirm_delete() -> bool {
    let answer = AsyncMessageDialog::new()
        .set_level(MessageLevel::Warning)
        .set_title("Delete Photo")
        .set_description("Are you sure you want to delete this photo?")
        .set_buttons(MessageButtons::OkCancel)
        .show()
        .await;

    matches!(answer, MessageDialogResult::Ok | MessageDialogResult::Yes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_cancel_is_noop() {
        assert_eq!(PickOutcome::from_selection(None), PickOutcome::Cancelled);
    }

    #[test]
    fn test_picked_image_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbImage::from_pixel(12, 5, Rgb([0, 0, 0])).save(&path).unwrap();

        match PickOutcome::from_selection(Some(path.clone())) {
            PickOutcome::Picked(asset) => {
                assert_eq!((asset.width, asset.height), (12, 5));
                assert_eq!(asset.uri, format!("file://{}", path.display()));
            }
            other => panic!("expected a picked asset, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_pick_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        assert!(matches!(
            PickOutcome::from_selection(Some(path)),
            PickOutcome::Failed(_)
        ));
    }
}
