/// Photo image loader
///
/// Fetches the bytes behind a photo url and decodes them into RGBA pixels
/// ready for upload. Supported sources:
/// - `http://` and `https://` urls
/// - `file://` uris and bare filesystem paths
///
/// A failure here is an image-load error for that one photo; the grid shows
/// an error cell for it and does not retry.

use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;

use crate::error::MediaError;

/// Largest image body we are willing to download
const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;

/// Decoded image pixels
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8
    pub rgba: Vec<u8>,
}

/// Where the bytes of a photo come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Http(String),
    File(PathBuf),
}

impl ImageSource {
    pub fn parse(url: &str) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            Self::Http(url.to_string())
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            Self::File(PathBuf::from(path))
        }
    }
}

/// Load and decode the image behind `url`
pub async fn load_image(url: String, timeout: Duration) -> Result<DecodedImage, MediaError> {
    // Spawn blocking because both the download and the decode are blocking
    task::spawn_blocking(move || load_image_blocking(&url, timeout)).await?
}

/// Blocking implementation of image loading
fn load_image_blocking(url: &str, timeout: Duration) -> Result<DecodedImage, MediaError> {
    let bytes = match ImageSource::parse(url) {
        ImageSource::Http(url) => fetch_http(&url, timeout)?,
        ImageSource::File(path) => read_file(&path)?,
    };
    decode(url, &bytes)
}

fn fetch_http(url: &str, timeout: Duration) -> Result<Vec<u8>, MediaError> {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    let agent: ureq::Agent = config.into();

    let fetch_error = |reason: String| MediaError::Fetch {
        url: url.to_string(),
        reason,
    };

    let mut response = agent.get(url).call().map_err(|e| fetch_error(e.to_string()))?;
    let bytes = response
        .body_mut()
        .with_config()
        .limit(MAX_IMAGE_BYTES)
        .read_to_vec()
        .map_err(|e| fetch_error(e.to_string()))?;

    if bytes.is_empty() {
        return Err(fetch_error("empty response body".to_string()));
    }
    debug!("Fetched {} KB from {}", bytes.len() / 1024, url);
    Ok(bytes)
}

fn read_file(path: &Path) -> Result<Vec<u8>, MediaError> {
    std::fs::read(path).map_err(|source| MediaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode image bytes of any format the `image` crate knows
pub fn decode(uri: &str, bytes: &[u8]) -> Result<DecodedImage, MediaError> {
    let img = image::load_from_memory(bytes).map_err(|source| MediaError::Decode {
        uri: uri.to_string(),
        source,
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}
