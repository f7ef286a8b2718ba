/// Error types for the photo grid
///
/// Each layer gets its own enum:
/// - `TransformError` - a photo cannot be fitted into a cell
/// - `StoreError` - the remote photo store call failed
/// - `GridError` - a session operation failed (wraps the two above)
/// - `MediaError` - picking or loading image bytes failed
/// - `ConfigError` - the config file could not be used

use std::path::PathBuf;
use thiserror::Error;

use crate::state::data::PhotoId;

/// The fill transform could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TransformError {
    #[error("source image must have positive dimensions (got {width}x{height})")]
    NonPositiveSource { width: f32, height: f32 },

    #[error("cell must have positive dimensions (got {width}x{height})")]
    NonPositiveCell { width: f32, height: f32 },
}

/// A call to the remote photo store failed
///
/// Carries strings rather than the underlying error so it can be cloned
/// into UI messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{method} {url} returned HTTP {status}")]
    Http {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("background task failed: {0}")]
    Task(String),
}

/// Which remote mutation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Add,
    Delete,
    Replace,
}

impl std::fmt::Display for MutationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Add => "add photo",
            Self::Delete => "delete photo",
            Self::Replace => "replace photo",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by grid session operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("failed to load photos: {0}")]
    Load(#[source] StoreError),

    #[error("failed to {op}: {source}")]
    Mutation {
        op: MutationOp,
        #[source]
        source: StoreError,
    },

    #[error("{failed} of {attempted} position updates failed: {first}")]
    PartialSave {
        attempted: usize,
        failed: usize,
        first: StoreError,
    },

    #[error("the grid already holds {capacity} photos")]
    GridFull { capacity: usize },

    #[error("invalid photo: {0}")]
    InvalidPhoto(#[from] TransformError),

    #[error("no photo with id {0}")]
    UnknownPhoto(PhotoId),

    #[error("index {index} is out of range for {len} photos")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no member is loaded")]
    NoMember,
}

/// Picking a file or loading image bytes failed
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {uri}: {source}")]
    Decode {
        uri: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The config file exists but could not be used
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{var} must be a member id, got {value:?}")]
    InvalidMemberId { var: &'static str, value: String },
}
