/// Focal-point fill cropping
///
/// Maps a source image of any aspect ratio onto a fixed-size grid cell:
/// - The image is scaled by the larger of the two axis ratios, so the cell
///   is always fully covered (fill, not fit)
/// - The image is then translated so the focal point lands on the cell center
///
/// The translation is never clamped. If the focal point sits near an edge,
/// part of the cell may show past the image border; the cell clip handles
/// everything outside the frame.

use crate::error::TransformError;

/// Size of one grid cell in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl CellSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// How to draw a source image inside a cell
///
/// Translation is relative to the cell's top-left corner; the image is drawn
/// at `(translate_x, translate_y)` with size `scaled_width` x `scaled_height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    pub scaled_width: f32,
    pub scaled_height: f32,
}

/// Compute the fill-crop transform for one photo
///
/// # Arguments
/// * `source_width`, `source_height` - native pixel size of the photo
/// * `focal_x`, `focal_y` - focal point in source pixel coordinates
/// * `cell` - target cell size
///
/// # Errors
/// Fails when either source dimension (or cell dimension) is not a positive
/// finite number, instead of producing an infinite or NaN scale.
pub fn compute_fill_transform(
    source_width: f32,
    source_height: f32,
    focal_x: f32,
    focal_y: f32,
    cell: CellSize,
) -> Result<Transform, TransformError> {
    if !is_positive(source_width) || !is_positive(source_height) {
        return Err(TransformError::NonPositiveSource {
            width: source_width,
            height: source_height,
        });
    }
    if !is_positive(cell.width) || !is_positive(cell.height) {
        return Err(TransformError::NonPositiveCell {
            width: cell.width,
            height: cell.height,
        });
    }

    // Larger factor covers the whole cell
    let scale_x = cell.width / source_width;
    let scale_y = cell.height / source_height;
    let scale = scale_x.max(scale_y);

    let scaled_width = source_width * scale;
    let scaled_height = source_height * scale;

    // Put the scaled focal point on the cell center
    let translate_x = cell.width / 2.0 - focal_x * scale;
    let translate_y = cell.height / 2.0 - focal_y * scale;

    Ok(Transform {
        scale,
        translate_x,
        translate_y,
        scaled_width,
        scaled_height,
    })
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
