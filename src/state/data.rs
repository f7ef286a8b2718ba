/// Shared data structures for the grid state
///
/// These structs represent the data model that flows between
/// the photo store, the session and the UI layer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransformError;
use crate::geometry::{compute_fill_transform, CellSize, Transform};

/// Identifier of the member owning a grid
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned photo identifier (opaque)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhotoId(pub String);

impl PhotoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted photo in a member's grid
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: PhotoId,
    pub member_id: MemberId,
    /// Where the image bytes live (http(s) URL or local file URI)
    pub url: String,
    /// Native pixel width
    pub width: f32,
    /// Native pixel height
    pub height: f32,
    /// Focal point, source pixel coordinates
    pub center_x: f32,
    pub center_y: f32,
    /// 0-based rank within the member's grid
    pub position: u32,
}

impl Photo {
    /// Fill-crop transform for drawing this photo into `cell`
    pub fn transform(&self, cell: CellSize) -> Result<Transform, TransformError> {
        compute_fill_transform(self.width, self.height, self.center_x, self.center_y, cell)
    }

    /// Swap in a new image while keeping identity and rank
    pub fn replaced_with(&self, staged: &NewPhoto) -> Photo {
        Photo {
            id: self.id.clone(),
            member_id: self.member_id,
            url: staged.url.clone(),
            width: staged.width,
            height: staged.height,
            center_x: staged.center_x,
            center_y: staged.center_y,
            position: self.position,
        }
    }
}

/// A photo staged on the client that the store has not assigned an id to yet
///
/// This is the body of `POST /member/{id}/photos`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub url: String,
    pub width: f32,
    pub height: f32,
    pub position: u32,
    pub center_x: f32,
    pub center_y: f32,
}

impl NewPhoto {
    /// Stage an image with its focal point at the geometric center
    pub fn centered(url: impl Into<String>, width: f32, height: f32, position: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
            position,
            center_x: width / 2.0,
            center_y: height / 2.0,
        }
    }

    /// Reject images that could never be fitted into a cell
    pub fn validate(&self) -> Result<(), TransformError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(TransformError::NonPositiveSource {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Key of a rendered slot
///
/// Placeholder keys can never collide with photo keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    Photo(PhotoId),
    Placeholder(usize),
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photo(id) => write!(f, "photo-{}", id),
            Self::Placeholder(i) => write!(f, "placeholder-{}", i),
        }
    }
}

/// How an occupied slot should be drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotContent {
    /// Draw the image with this transform
    Image(Transform),
    /// Draw the fixed error placeholder
    Failed,
}

/// One cell of the rendered grid
#[derive(Debug, Clone, PartialEq)]
pub enum GridSlot<'a> {
    Occupied {
        photo: &'a Photo,
        content: SlotContent,
    },
    Placeholder {
        index: usize,
    },
}

impl GridSlot<'_> {
    pub fn key(&self) -> SlotKey {
        match self {
            Self::Occupied { photo, .. } => SlotKey::Photo(photo.id.clone()),
            Self::Placeholder { index } => SlotKey::Placeholder(*index),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}
