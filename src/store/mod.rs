/// Remote photo store
///
/// The store owns the persisted photo records and assigns ids:
/// - `http.rs` - JSON-over-HTTP client for the photo API
///
/// The session only talks to the `PhotoStore` trait, so tests can swap in
/// an in-memory store.

pub mod http;

use std::future::Future;

use crate::error::StoreError;
use crate::state::data::{MemberId, NewPhoto, Photo, PhotoId};

pub use http::HttpPhotoStore;

/// Result type for store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD over one member's photos
///
/// Futures must be `Send + 'static`-friendly because the UI runs them as
/// background tasks; implementations take owned arguments for that reason.
pub trait PhotoStore: Send + Sync + 'static {
    /// All photos of a member, in no particular order
    fn list(&self, member_id: MemberId) -> impl Future<Output = StoreResult<Vec<Photo>>> + Send;

    /// Persist a staged photo; the returned record carries the assigned id
    fn create(
        &self,
        member_id: MemberId,
        photo: NewPhoto,
    ) -> impl Future<Output = StoreResult<Photo>> + Send;

    /// Overwrite a photo record
    fn update(&self, photo: Photo) -> impl Future<Output = StoreResult<Photo>> + Send;

    /// Remove a photo record
    fn delete(&self, id: PhotoId) -> impl Future<Output = StoreResult<()>> + Send;
}
