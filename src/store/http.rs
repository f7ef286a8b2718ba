use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use ureq::http::Response;
use ureq::Body;

use super::{PhotoStore, StoreResult};
use crate::config::Config;
use crate::error::StoreError;
use crate::state::data::{MemberId, NewPhoto, Photo, PhotoId};

/// JSON-over-HTTP client for the photo API
///
/// Routes:
/// - `GET    {base}/member/{member}/photos`
/// - `POST   {base}/member/{member}/photos`
/// - `PUT    {base}/photos/{id}`
/// - `DELETE {base}/photos/{id}`
///
/// ureq is blocking, so every call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct HttpPhotoStore {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpPhotoStore {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = config.into();

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { agent, base_url }
    }

    /// Create a client from the app configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn member_photos_url(&self, member_id: MemberId) -> String {
        format!("{}/member/{}/photos", self.base_url, member_id)
    }

    fn photo_url(&self, id: &PhotoId) -> String {
        format!("{}/photos/{}", self.base_url, id)
    }
}

impl PhotoStore for HttpPhotoStore {
    fn list(&self, member_id: MemberId) -> impl Future<Output = StoreResult<Vec<Photo>>> + Send {
        let agent = self.agent.clone();
        let url = self.member_photos_url(member_id);
        blocking(move || {
            debug!("GET {}", url);
            let response = agent.get(&url).call().map_err(|e| transport(&url, e))?;
            read_json(check_status("GET", &url, response)?, &url)
        })
    }

    fn create(
        &self,
        member_id: MemberId,
        photo: NewPhoto,
    ) -> impl Future<Output = StoreResult<Photo>> + Send {
        let agent = self.agent.clone();
        let url = self.member_photos_url(member_id);
        blocking(move || {
            debug!("POST {}", url);
            let response = agent
                .post(&url)
                .send_json(&photo)
                .map_err(|e| transport(&url, e))?;
            read_json(check_status("POST", &url, response)?, &url)
        })
    }

    fn update(&self, photo: Photo) -> impl Future<Output = StoreResult<Photo>> + Send {
        let agent = self.agent.clone();
        let url = self.photo_url(&photo.id);
        blocking(move || {
            debug!("PUT {} (position {})", url, photo.position);
            let response = agent
                .put(&url)
                .send_json(&photo)
                .map_err(|e| transport(&url, e))?;
            read_json(check_status("PUT", &url, response)?, &url)
        })
    }

    fn delete(&self, id: PhotoId) -> impl Future<Output = StoreResult<()>> + Send {
        let agent = self.agent.clone();
        let url = self.photo_url(&id);
        blocking(move || {
            debug!("DELETE {}", url);
            let response = agent.delete(&url).call().map_err(|e| transport(&url, e))?;
            check_status("DELETE", &url, response)?;
            Ok(())
        })
    }
}

impl std::fmt::Debug for HttpPhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPhotoStore")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Run a blocking request on the blocking pool
async fn blocking<T, F>(request: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(request)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

fn check_status(
    method: &'static str,
    url: &str,
    response: Response<Body>,
) -> StoreResult<Response<Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    warn!("⚠️  {} {} returned {}", method, url, status);
    Err(StoreError::Http {
        method,
        url: url.to_string(),
        status: status.as_u16(),
    })
}

fn read_json<T: DeserializeOwned>(mut response: Response<Body>, url: &str) -> StoreResult<T> {
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|e| StoreError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

fn transport(url: &str, err: ureq::Error) -> StoreError {
    StoreError::Transport {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
