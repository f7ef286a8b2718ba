/// Grid session
///
/// Owns the ordered photo collection of one member and keeps it in step
/// with the remote store.
///
/// State changes go through a pure reducer, `apply(state, &event)`. The
/// session methods apply the local part of an operation immediately and hand
/// back a future for the remote part; the future resolves to an `Event`
/// that is fed back through `handle`. In the UI those futures run as iced
/// tasks, in tests they are simply awaited.
///
/// Optimism per operation:
/// - load, add, replace: local state changes only once the store answers
/// - delete, move: local state changes first, remote failures are reported
///   but not rolled back

use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

use super::data::{GridSlot, MemberId, NewPhoto, Photo, PhotoId, SlotContent};
use super::layout::MAX_PHOTOS;
use super::reorder::{is_dense, reorder};
use crate::error::{GridError, MutationOp, StoreError};
use crate::geometry::CellSize;
use crate::store::PhotoStore;

/// Where the session is in its load lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Empty,
    Loading,
    Ready,
    LoadFailed,
}

/// Everything the UI needs to draw the grid
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    /// Member the grid belongs to; load results for other members are dropped
    pub member_id: Option<MemberId>,
    pub status: SessionStatus,
    /// Photos in display order, never more than `MAX_PHOTOS`
    pub photos: Vec<Photo>,
    /// Photos whose image bytes could not be loaded
    pub failed_images: HashSet<PhotoId>,
    /// Adds sent to the store and not answered yet
    pub pending_adds: usize,
    /// Deletes, position saves and replacements not answered yet
    pub pending_writes: usize,
}

impl SessionState {
    pub fn has_pending_writes(&self) -> bool {
        self.pending_adds + self.pending_writes > 0
    }

    /// Free slots, counting adds that are still in flight as taken
    pub fn free_slots(&self) -> usize {
        MAX_PHOTOS.saturating_sub(self.photos.len() + self.pending_adds)
    }

    pub fn index_of(&self, id: &PhotoId) -> Option<usize> {
        self.photos.iter().position(|p| &p.id == id)
    }
}

/// Something that happened to the session
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LoadStarted(MemberId),
    Loaded {
        member_id: MemberId,
        result: Result<Vec<Photo>, StoreError>,
    },
    AddStarted,
    /// Store answer to an add issued for `member_id`
    Added {
        member_id: MemberId,
        result: Result<Photo, StoreError>,
    },
    /// Local removal, applied before the remote delete
    Removed(PhotoId),
    Deleted {
        id: PhotoId,
        result: Result<(), StoreError>,
    },
    /// Local reorder, applied before the position writes
    Moved { from: usize, to: usize },
    PositionsSaved {
        attempted: usize,
        failures: Vec<StoreError>,
    },
    ReplaceStarted,
    Replaced {
        member_id: MemberId,
        result: Result<Photo, StoreError>,
    },
    ImageFailed(PhotoId),
}

/// Pure state transition
pub fn apply(mut state: SessionState, event: &Event) -> SessionState {
    match event {
        Event::LoadStarted(member_id) => {
            if state.member_id != Some(*member_id) {
                // New member: nothing of the old grid carries over
                state = SessionState {
                    member_id: Some(*member_id),
                    ..SessionState::default()
                };
            }
            state.status = SessionStatus::Loading;
        }
        Event::Loaded { member_id, result } => {
            if state.member_id != Some(*member_id) {
                return state;
            }
            match result {
                Ok(photos) => {
                    let mut photos = photos.clone();
                    // The store does not promise any order
                    photos.sort_by_key(|p| p.position);
                    photos.truncate(MAX_PHOTOS);
                    state
                        .failed_images
                        .retain(|id| photos.iter().any(|p| &p.id == id));
                    state.photos = photos;
                    state.status = SessionStatus::Ready;
                }
                Err(_) => state.status = SessionStatus::LoadFailed,
            }
        }
        Event::AddStarted => state.pending_adds += 1,
        Event::Added { member_id, result } => {
            // Issued for a grid that has since been replaced
            if state.member_id != Some(*member_id) {
                return state;
            }
            state.pending_adds = state.pending_adds.saturating_sub(1);
            if let Ok(photo) = result {
                if photo.member_id == *member_id
                    && state.photos.len() < MAX_PHOTOS
                    && state.index_of(&photo.id).is_none()
                {
                    state.photos.push(photo.clone());
                }
            }
        }
        Event::Removed(id) => {
            let before = state.photos.len();
            state.photos.retain(|p| &p.id != id);
            state.failed_images.remove(id);
            if state.photos.len() != before {
                state.pending_writes += 1;
            }
        }
        Event::Deleted { .. } => {
            state.pending_writes = state.pending_writes.saturating_sub(1);
        }
        Event::Moved { from, to } => {
            let before = positions_by_id(&state.photos);
            state.photos = reorder(std::mem::take(&mut state.photos), *from, *to);
            state.pending_writes += changed_since(&before, &state.photos).count();
        }
        Event::PositionsSaved { attempted, .. } => {
            state.pending_writes = state.pending_writes.saturating_sub(*attempted);
        }
        Event::ReplaceStarted => state.pending_writes += 1,
        Event::Replaced { member_id, result } => {
            if state.member_id != Some(*member_id) {
                return state;
            }
            state.pending_writes = state.pending_writes.saturating_sub(1);
            if let Ok(photo) = result {
                if photo.member_id != *member_id {
                    return state;
                }
                if let Some(index) = state.index_of(&photo.id) {
                    state.failed_images.remove(&photo.id);
                    state.photos[index] = photo.clone();
                }
            }
        }
        Event::ImageFailed(id) => {
            if state.index_of(id).is_some() {
                state.failed_images.insert(id.clone());
            }
        }
    }
    state
}

fn positions_by_id(photos: &[Photo]) -> HashMap<PhotoId, u32> {
    photos.iter().map(|p| (p.id.clone(), p.position)).collect()
}

/// Photos whose position is not what it was in `before`
fn changed_since<'a>(
    before: &'a HashMap<PhotoId, u32>,
    after: &'a [Photo],
) -> impl Iterator<Item = &'a Photo> + 'a {
    after
        .iter()
        .filter(move |p| before.get(&p.id) != Some(&p.position))
}

/// Coordinates the session state with a photo store
pub struct GridSession<S> {
    store: Arc<S>,
    state: SessionState,
    reload_after_mutation_error: bool,
}

impl<S: PhotoStore> GridSession<S> {
    pub fn new(store: S) -> Self {
        Self::with_store(Arc::new(store))
    }

    pub fn with_store(store: Arc<S>) -> Self {
        Self {
            store,
            state: SessionState::default(),
            reload_after_mutation_error: false,
        }
    }

    /// Ask the caller to reload after failed deletes and position saves
    pub fn reload_after_mutation_error(mut self, enabled: bool) -> Self {
        self.reload_after_mutation_error = enabled;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn photos(&self) -> &[Photo] {
        &self.state.photos
    }

    pub fn member_id(&self) -> Option<MemberId> {
        self.state.member_id
    }

    /// Whether the grid still has room for another photo
    pub fn can_add(&self) -> bool {
        self.state.free_slots() > 0
    }

    fn dispatch(&mut self, event: &Event) {
        let state = std::mem::take(&mut self.state);
        self.state = apply(state, event);
    }

    /// Start loading a member's photos
    ///
    /// Earlier loads are not cancelled; their results are dropped if the
    /// active member changed in the meantime.
    pub fn load(&mut self, member_id: MemberId) -> impl Future<Output = Event> + Send + 'static {
        info!("🔍 Loading photos for member {}", member_id);
        self.dispatch(&Event::LoadStarted(member_id));

        let store = Arc::clone(&self.store);
        async move {
            let result = store.list(member_id).await;
            Event::Loaded { member_id, result }
        }
    }

    /// Reload the active member
    pub fn refresh(&mut self) -> Result<impl Future<Output = Event> + Send + 'static, GridError> {
        let member_id = self.state.member_id.ok_or(GridError::NoMember)?;
        Ok(self.load(member_id))
    }

    /// Stage a new photo at the end of the grid and send it to the store
    ///
    /// The focal point defaults to the image center. Nothing is shown until
    /// the store confirms the photo.
    pub fn add(
        &mut self,
        url: impl Into<String>,
        width: f32,
        height: f32,
    ) -> Result<impl Future<Output = Event> + Send + 'static, GridError> {
        let member_id = self.state.member_id.ok_or(GridError::NoMember)?;
        if !self.can_add() {
            return Err(GridError::GridFull {
                capacity: MAX_PHOTOS,
            });
        }

        let position = (self.state.photos.len() + self.state.pending_adds) as u32;
        let staged = NewPhoto::centered(url, width, height, position);
        staged.validate()?;

        info!("➕ Adding photo at position {}: {}", position, staged.url);
        self.dispatch(&Event::AddStarted);

        let store = Arc::clone(&self.store);
        Ok(async move {
            let result = store.create(member_id, staged).await;
            Event::Added { member_id, result }
        })
    }

    /// Remove a photo locally, then delete it remotely
    pub fn delete(
        &mut self,
        id: &PhotoId,
    ) -> Result<impl Future<Output = Event> + Send + 'static, GridError> {
        if self.state.index_of(id).is_none() {
            return Err(GridError::UnknownPhoto(id.clone()));
        }

        info!("🗑️  Deleting photo {}", id);
        self.dispatch(&Event::Removed(id.clone()));

        let store = Arc::clone(&self.store);
        let id = id.clone();
        Ok(async move {
            let result = store.delete(id.clone()).await;
            Event::Deleted { id, result }
        })
    }

    /// Move a photo from one grid index to another
    ///
    /// The new order is applied locally right away. The returned future
    /// writes every photo whose position changed, all at once. Targets past
    /// the last photo land on the last photo; `Ok(None)` means nothing moved.
    pub fn move_photo(
        &mut self,
        from: usize,
        to: usize,
    ) -> Result<Option<impl Future<Output = Event> + Send + 'static>, GridError> {
        let len = self.state.photos.len();
        if from >= len {
            return Err(GridError::IndexOutOfRange { index: from, len });
        }
        if to >= MAX_PHOTOS {
            return Err(GridError::IndexOutOfRange {
                index: to,
                len: MAX_PHOTOS,
            });
        }
        let to = to.min(len - 1);
        if from == to {
            return Ok(None);
        }

        if !is_dense(&self.state.photos) {
            debug!("Closing position gaps left by earlier deletes");
        }
        let before = positions_by_id(&self.state.photos);
        self.dispatch(&Event::Moved { from, to });

        let changed: Vec<Photo> = changed_since(&before, &self.state.photos)
            .cloned()
            .collect();
        info!(
            "🔀 Moved photo {} -> {}, saving {} positions",
            from,
            to,
            changed.len()
        );

        let store = Arc::clone(&self.store);
        Ok(Some(save_positions(store, changed)))
    }

    /// Swap the image of an existing photo, keeping its id and position
    ///
    /// The focal point resets to the new image's center. Like `add`, the
    /// local record only changes once the store confirms.
    pub fn replace(
        &mut self,
        id: &PhotoId,
        url: impl Into<String>,
        width: f32,
        height: f32,
    ) -> Result<impl Future<Output = Event> + Send + 'static, GridError> {
        let member_id = self.state.member_id.ok_or(GridError::NoMember)?;
        let current = self
            .state
            .photos
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| GridError::UnknownPhoto(id.clone()))?;

        let staged = NewPhoto::centered(url, width, height, current.position);
        staged.validate()?;
        let updated = current.replaced_with(&staged);

        info!("🔁 Replacing photo {} with {}", id, updated.url);
        self.dispatch(&Event::ReplaceStarted);

        let store = Arc::clone(&self.store);
        Ok(async move {
            let result = store.update(updated).await;
            Event::Replaced { member_id, result }
        })
    }

    /// Flag a photo whose image could not be loaded
    pub fn mark_image_failed(&mut self, id: &PhotoId) {
        warn!("⚠️  Image failed to load for photo {}", id);
        self.dispatch(&Event::ImageFailed(id.clone()));
    }

    /// Feed back the event a session future resolved to
    ///
    /// Returns the error the caller should surface, if any. Local state has
    /// already been updated either way.
    pub fn handle(&mut self, event: Event) -> Result<(), GridError> {
        if let Event::Added { member_id, .. } | Event::Replaced { member_id, .. } = &event {
            if self.state.member_id != Some(*member_id) {
                debug!("Dropping store answer meant for member {}", member_id);
                return Ok(());
            }
        }

        let error = match &event {
            Event::Loaded { member_id, result } => {
                if self.state.member_id != Some(*member_id) {
                    debug!("Dropping stale load for member {}", member_id);
                    return Ok(());
                }
                match result {
                    Ok(photos) => {
                        if photos.len() > MAX_PHOTOS {
                            warn!(
                                "⚠️  Store returned {} photos, keeping the first {}",
                                photos.len(),
                                MAX_PHOTOS
                            );
                        }
                        info!("✅ Loaded {} photos", photos.len().min(MAX_PHOTOS));
                        None
                    }
                    Err(e) => Some(GridError::Load(e.clone())),
                }
            }
            Event::Added {
                result: Ok(photo), ..
            } => {
                if self.state.photos.len() >= MAX_PHOTOS {
                    warn!("⚠️  Store accepted photo {} but the grid is full", photo.id);
                    Some(GridError::GridFull {
                        capacity: MAX_PHOTOS,
                    })
                } else {
                    info!("✅ Added photo {}", photo.id);
                    None
                }
            }
            Event::Added { result: Err(e), .. } => Some(mutation(MutationOp::Add, e)),
            Event::Deleted { result: Err(e), .. } => Some(mutation(MutationOp::Delete, e)),
            Event::PositionsSaved {
                attempted,
                failures,
            } => failures.first().map(|first| GridError::PartialSave {
                attempted: *attempted,
                failed: failures.len(),
                first: first.clone(),
            }),
            Event::Replaced { result: Err(e), .. } => Some(mutation(MutationOp::Replace, e)),
            _ => None,
        };

        self.dispatch(&event);

        match error {
            Some(err) => {
                warn!("⚠️  {}", err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Whether `err` should be followed by a reconciling reload
    pub fn should_reconcile(&self, err: &GridError) -> bool {
        self.reload_after_mutation_error
            && matches!(
                err,
                GridError::Mutation {
                    op: MutationOp::Delete,
                    ..
                } | GridError::PartialSave { .. }
            )
    }

    /// The grid as rendered: always `MAX_PHOTOS` slots, photos first
    pub fn slots(&self, cell: CellSize) -> Vec<GridSlot<'_>> {
        slots(&self.state, cell)
    }
}

/// Build the rendered slot sequence for a state
pub fn slots(state: &SessionState, cell: CellSize) -> Vec<GridSlot<'_>> {
    let occupied = state.photos.iter().take(MAX_PHOTOS).map(|photo| {
        let content = if state.failed_images.contains(&photo.id) {
            SlotContent::Failed
        } else {
            match photo.transform(cell) {
                Ok(transform) => SlotContent::Image(transform),
                Err(e) => {
                    debug!("Photo {} cannot be drawn: {}", photo.id, e);
                    SlotContent::Failed
                }
            }
        };
        GridSlot::Occupied { photo, content }
    });

    let placeholders = (0..MAX_PHOTOS.saturating_sub(state.photos.len()))
        .map(|index| GridSlot::Placeholder { index });

    occupied.chain(placeholders).collect()
}

/// Write positions concurrently and collect every failure
async fn save_positions<S: PhotoStore>(store: Arc<S>, photos: Vec<Photo>) -> Event {
    let attempted = photos.len();
    let mut writes = JoinSet::new();
    for photo in photos {
        let store = Arc::clone(&store);
        writes.spawn(async move { store.update(photo).await });
    }

    let mut failures = Vec::new();
    while let Some(joined) = writes.join_next().await {
        match joined {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => failures.push(e),
            Err(e) => failures.push(StoreError::Task(e.to_string())),
        }
    }

    Event::PositionsSaved {
        attempted,
        failures,
    }
}

fn mutation(op: MutationOp, source: &StoreError) -> GridError {
    GridError::Mutation {
        op,
        source: source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreResult;
    use std::sync::Mutex;

    const MEMBER: MemberId = MemberId(1);

    fn cell() -> CellSize {
        CellSize::new(100.0, 140.0)
    }

    fn photo(id: &str, position: u32) -> Photo {
        Photo {
            id: PhotoId::new(id),
            member_id: MEMBER,
            url: format!("https://cdn.example.com/{}.jpg", id),
            width: 1000.0,
            height: 500.0,
            center_x: 500.0,
            center_y: 250.0,
            position,
        }
    }

    fn ids(photos: &[Photo]) -> Vec<&str> {
        photos.iter().map(|p| p.id.as_str()).collect()
    }

    fn refused(method: &'static str) -> StoreError {
        StoreError::Http {
            method,
            url: "http://store.test".to_string(),
            status: 500,
        }
    }

    /// In-memory store with switchable failures
    #[derive(Default)]
    struct FakeStore {
        photos: Mutex<Vec<Photo>>,
        next_id: Mutex<usize>,
        fail_list: Mutex<bool>,
        fail_create: Mutex<bool>,
        fail_delete: Mutex<bool>,
        fail_update: Mutex<HashSet<PhotoId>>,
        updates: Mutex<Vec<Photo>>,
    }

    impl FakeStore {
        fn with_photos(photos: Vec<Photo>) -> Arc<Self> {
            let store = Self::default();
            *store.photos.lock().unwrap() = photos;
            Arc::new(store)
        }
    }

    impl PhotoStore for FakeStore {
        fn list(&self, member_id: MemberId) -> impl Future<Output = StoreResult<Vec<Photo>>> + Send {
            let result = if *self.fail_list.lock().unwrap() {
                Err(refused("GET"))
            } else {
                Ok(self
                    .photos
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|p| p.member_id == member_id)
                    .cloned()
                    .collect())
            };
            async move { result }
        }

        fn create(
            &self,
            member_id: MemberId,
            staged: NewPhoto,
        ) -> impl Future<Output = StoreResult<Photo>> + Send {
            let result = if *self.fail_create.lock().unwrap() {
                Err(refused("POST"))
            } else {
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                let created = Photo {
                    id: PhotoId::new(format!("new-{}", next_id)),
                    member_id,
                    url: staged.url,
                    width: staged.width,
                    height: staged.height,
                    center_x: staged.center_x,
                    center_y: staged.center_y,
                    position: staged.position,
                };
                self.photos.lock().unwrap().push(created.clone());
                Ok(created)
            };
            async move { result }
        }

        fn update(&self, photo: Photo) -> impl Future<Output = StoreResult<Photo>> + Send {
            self.updates.lock().unwrap().push(photo.clone());
            let result = if self.fail_update.lock().unwrap().contains(&photo.id) {
                Err(refused("PUT"))
            } else {
                let mut photos = self.photos.lock().unwrap();
                if let Some(stored) = photos.iter_mut().find(|p| p.id == photo.id) {
                    *stored = photo.clone();
                }
                Ok(photo)
            };
            async move { result }
        }

        fn delete(&self, id: PhotoId) -> impl Future<Output = StoreResult<()>> + Send {
            let result = if *self.fail_delete.lock().unwrap() {
                Err(refused("DELETE"))
            } else {
                self.photos.lock().unwrap().retain(|p| p.id != id);
                Ok(())
            };
            async move { result }
        }
    }

    async fn loaded(store: &Arc<FakeStore>) -> GridSession<FakeStore> {
        let mut session = GridSession::with_store(Arc::clone(store));
        let event = session.load(MEMBER).await;
        session.handle(event).unwrap();
        session
    }

    #[tokio::test]
    async fn test_load_sorts_by_position() {
        let store = FakeStore::with_photos(vec![photo("C", 2), photo("A", 0), photo("B", 1)]);
        let session = loaded(&store).await;

        assert_eq!(session.state().status, SessionStatus::Ready);
        assert_eq!(ids(session.photos()), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_photos() {
        let store = FakeStore::with_photos(vec![photo("A", 0), photo("B", 1)]);
        let mut session = loaded(&store).await;
        let before = session.photos().to_vec();

        *store.fail_list.lock().unwrap() = true;
        let event = session.refresh().unwrap().await;
        let result = session.handle(event);

        assert!(matches!(result, Err(GridError::Load(_))));
        assert_eq!(session.state().status, SessionStatus::LoadFailed);
        assert_eq!(session.photos(), before.as_slice());

        // Retrying goes back through Loading
        *store.fail_list.lock().unwrap() = false;
        let retry = session.refresh().unwrap();
        assert_eq!(session.state().status, SessionStatus::Loading);
        session.handle(retry.await).unwrap();
        assert_eq!(session.state().status, SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_load_caps_at_capacity() {
        let photos = (0..12).map(|i| photo(&format!("p{}", i), i)).collect();
        let store = FakeStore::with_photos(photos);
        let session = loaded(&store).await;

        assert_eq!(session.photos().len(), MAX_PHOTOS);
        assert_eq!(session.photos()[8].id.as_str(), "p8");
    }

    #[tokio::test]
    async fn test_stale_load_is_dropped() {
        let mut other = photo("Z", 0);
        other.member_id = MemberId(2);
        let store = FakeStore::with_photos(vec![photo("A", 0), other]);
        let mut session = GridSession::with_store(Arc::clone(&store));

        let first = session.load(MEMBER);
        let second = session.load(MemberId(2));

        session.handle(second.await).unwrap();
        session.handle(first.await).unwrap();

        assert_eq!(session.member_id(), Some(MemberId(2)));
        assert_eq!(ids(session.photos()), vec!["Z"]);
    }

    #[tokio::test]
    async fn test_add_waits_for_store() {
        let store = FakeStore::with_photos(vec![photo("A", 0)]);
        let mut session = loaded(&store).await;

        let pending = session.add("file:///tmp/b.jpg", 800.0, 600.0).unwrap();
        // No optimistic entry
        assert_eq!(session.photos().len(), 1);
        assert_eq!(session.state().pending_adds, 1);

        session.handle(pending.await).unwrap();

        let added = &session.photos()[1];
        assert_eq!(added.id.as_str(), "new-1");
        assert_eq!(added.position, 1);
        assert_eq!(added.center_x, 400.0);
        assert_eq!(added.center_y, 300.0);
        assert_eq!(session.state().pending_adds, 0);
    }

    #[tokio::test]
    async fn test_add_failure_changes_nothing() {
        let store = FakeStore::with_photos(vec![photo("A", 0)]);
        let mut session = loaded(&store).await;
        let before = session.state().clone();

        *store.fail_create.lock().unwrap() = true;
        let event = session.add("file:///tmp/b.jpg", 800.0, 600.0).unwrap().await;
        let result = session.handle(event);

        assert!(matches!(
            result,
            Err(GridError::Mutation {
                op: MutationOp::Add,
                ..
            })
        ));
        assert_eq!(session.state(), &before);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_and_full() {
        let store = FakeStore::with_photos(vec![]);
        let mut session = loaded(&store).await;
        assert!(matches!(
            session.add("file:///tmp/a.jpg", 0.0, 600.0),
            Err(GridError::InvalidPhoto(_))
        ));

        let photos = (0..9).map(|i| photo(&format!("p{}", i), i)).collect();
        let store = FakeStore::with_photos(photos);
        let mut session = loaded(&store).await;
        assert!(!session.can_add());
        assert!(matches!(
            session.add("file:///tmp/a.jpg", 10.0, 10.0),
            Err(GridError::GridFull { capacity: 9 })
        ));
    }

    #[tokio::test]
    async fn test_pending_adds_reserve_slots() {
        let photos = (0..8).map(|i| photo(&format!("p{}", i), i)).collect();
        let store = FakeStore::with_photos(photos);
        let mut session = loaded(&store).await;

        let pending = session.add("file:///tmp/a.jpg", 10.0, 10.0).unwrap();
        assert!(matches!(
            session.add("file:///tmp/b.jpg", 10.0, 10.0),
            Err(GridError::GridFull { .. })
        ));
        session.handle(pending.await).unwrap();
        assert_eq!(session.photos().len(), 9);
    }

    #[tokio::test]
    async fn test_add_requires_member() {
        let mut session = GridSession::new(FakeStore::default());
        assert!(matches!(
            session.add("file:///tmp/a.jpg", 10.0, 10.0),
            Err(GridError::NoMember)
        ));
    }

    #[tokio::test]
    async fn test_delete_is_optimistic() {
        let store = FakeStore::with_photos(vec![photo("A", 0), photo("B", 1), photo("C", 2)]);
        let mut session = loaded(&store).await;

        *store.fail_delete.lock().unwrap() = true;
        let pending = session.delete(&PhotoId::new("B")).unwrap();
        assert_eq!(ids(session.photos()), vec!["A", "C"]);

        let result = session.handle(pending.await);
        assert!(matches!(
            result,
            Err(GridError::Mutation {
                op: MutationOp::Delete,
                ..
            })
        ));
        // Not rolled back, not compacted
        assert_eq!(ids(session.photos()), vec!["A", "C"]);
        assert_eq!(session.photos()[1].position, 2);
        assert!(!session.state().has_pending_writes());
    }

    #[tokio::test]
    async fn test_delete_unknown_photo() {
        let store = FakeStore::with_photos(vec![photo("A", 0)]);
        let mut session = loaded(&store).await;
        assert!(matches!(
            session.delete(&PhotoId::new("nope")),
            Err(GridError::UnknownPhoto(_))
        ));
    }

    #[tokio::test]
    async fn test_move_first_to_last() {
        let store = FakeStore::with_photos(vec![photo("A", 0), photo("B", 1), photo("C", 2)]);
        let mut session = loaded(&store).await;

        let pending = session.move_photo(0, 2).unwrap().unwrap();
        // Local order is applied before any write is issued
        assert_eq!(ids(session.photos()), vec!["B", "C", "A"]);
        assert_eq!(store.updates.lock().unwrap().len(), 0);
        assert_eq!(session.state().pending_writes, 3);

        session.handle(pending.await).unwrap();

        let positions: Vec<u32> = session.photos().iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(store.updates.lock().unwrap().len(), 3);
        assert_eq!(session.state().pending_writes, 0);
    }

    #[tokio::test]
    async fn test_move_saves_only_changed_positions() {
        let store = FakeStore::with_photos(vec![
            photo("A", 0),
            photo("B", 1),
            photo("C", 2),
            photo("D", 3),
        ]);
        let mut session = loaded(&store).await;

        let pending = session.move_photo(0, 1).unwrap().unwrap();
        session.handle(pending.await).unwrap();

        let mut saved: Vec<String> = store
            .updates
            .lock()
            .unwrap()
            .iter()
            .map(|p| format!("{}@{}", p.id, p.position))
            .collect();
        saved.sort();
        assert_eq!(saved, vec!["A@1", "B@0"]);
    }

    #[tokio::test]
    async fn test_move_failure_keeps_local_order() {
        let store = FakeStore::with_photos(vec![photo("A", 0), photo("B", 1), photo("C", 2)]);
        let mut session = loaded(&store).await;
        store.fail_update.lock().unwrap().insert(PhotoId::new("B"));

        let pending = session.move_photo(0, 2).unwrap().unwrap();
        let result = session.handle(pending.await);

        match result {
            Err(GridError::PartialSave {
                attempted, failed, ..
            }) => {
                assert_eq!(attempted, 3);
                assert_eq!(failed, 1);
            }
            other => panic!("expected partial save, got {:?}", other),
        }
        assert_eq!(ids(session.photos()), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_move_onto_placeholder_goes_to_end() {
        let store = FakeStore::with_photos(vec![photo("A", 0), photo("B", 1), photo("C", 2)]);
        let mut session = loaded(&store).await;

        let pending = session.move_photo(0, 7).unwrap().unwrap();
        session.handle(pending.await).unwrap();
        assert_eq!(ids(session.photos()), vec!["B", "C", "A"]);

        // Last photo dropped further into the tail stays where it is
        assert!(session.move_photo(2, 8).unwrap().is_none());
        assert!(matches!(
            session.move_photo(5, 0),
            Err(GridError::IndexOutOfRange { index: 5, len: 3 })
        ));
    }

    #[tokio::test]
    async fn test_replace_keeps_identity() {
        let store = FakeStore::with_photos(vec![photo("A", 0), photo("B", 1)]);
        let mut session = loaded(&store).await;
        session.mark_image_failed(&PhotoId::new("B"));

        let pending = session
            .replace(&PhotoId::new("B"), "file:///tmp/new.jpg", 300.0, 900.0)
            .unwrap();
        // Not optimistic
        assert_eq!(session.photos()[1].width, 1000.0);

        session.handle(pending.await).unwrap();
        let replaced = &session.photos()[1];
        assert_eq!(replaced.id.as_str(), "B");
        assert_eq!(replaced.position, 1);
        assert_eq!(replaced.url, "file:///tmp/new.jpg");
        assert_eq!(replaced.center_y, 450.0);
        assert!(!session.state().failed_images.contains(&replaced.id));
    }

    #[tokio::test]
    async fn test_slots_always_fill_the_grid() {
        let store = FakeStore::with_photos(vec![]);
        let session = loaded(&store).await;
        let slots = session.slots(cell());
        assert_eq!(slots.len(), MAX_PHOTOS);
        assert!(slots.iter().all(|s| s.is_placeholder()));

        let keys: HashSet<_> = slots.iter().map(|s| s.key()).collect();
        assert_eq!(keys.len(), MAX_PHOTOS);

        let photos = (0..9).map(|i| photo(&format!("p{}", i), i)).collect();
        let store = FakeStore::with_photos(photos);
        let session = loaded(&store).await;
        let slots = session.slots(cell());
        assert_eq!(slots.len(), MAX_PHOTOS);
        assert!(!slots.iter().any(|s| s.is_placeholder()));
    }

    #[tokio::test]
    async fn test_broken_photos_render_error_slots() {
        let mut broken = photo("B", 1);
        broken.height = 0.0;
        let store = FakeStore::with_photos(vec![photo("A", 0), broken, photo("C", 2)]);
        let mut session = loaded(&store).await;
        session.mark_image_failed(&PhotoId::new("C"));

        let slots = session.slots(cell());
        assert_eq!(slots.len(), MAX_PHOTOS);

        let contents: Vec<_> = slots
            .iter()
            .filter_map(|s| match s {
                GridSlot::Occupied { content, .. } => Some(*content),
                GridSlot::Placeholder { .. } => None,
            })
            .collect();
        assert!(matches!(contents[0], SlotContent::Image(_)));
        assert_eq!(contents[1], SlotContent::Failed);
        assert_eq!(contents[2], SlotContent::Failed);
    }

    #[tokio::test]
    async fn test_switching_member_clears_grid() {
        let store = FakeStore::with_photos(vec![photo("A", 0)]);
        let mut session = loaded(&store).await;
        session.mark_image_failed(&PhotoId::new("A"));

        let _pending = session.load(MemberId(2));
        assert!(session.photos().is_empty());
        assert!(session.state().failed_images.is_empty());
        assert_eq!(session.state().status, SessionStatus::Loading);
    }

    #[test]
    fn test_should_reconcile() {
        let session = GridSession::new(FakeStore::default());
        let delete_failed = mutation(MutationOp::Delete, &refused("DELETE"));
        assert!(!session.should_reconcile(&delete_failed));

        let session = session.reload_after_mutation_error(true);
        assert!(session.should_reconcile(&delete_failed));
        assert!(!session.should_reconcile(&mutation(MutationOp::Add, &refused("POST"))));
        assert!(!session.should_reconcile(&mutation(MutationOp::Replace, &refused("PUT"))));
    }

    #[tokio::test]
    async fn test_failed_move_asks_for_reload_when_enabled() {
        let store = FakeStore::with_photos(vec![photo("A", 0), photo("B", 1), photo("C", 2)]);
        let mut session = loaded(&store).await.reload_after_mutation_error(true);
        store.fail_update.lock().unwrap().insert(PhotoId::new("C"));

        let pending = session.move_photo(2, 0).unwrap().unwrap();
        let err = session.handle(pending.await).unwrap_err();

        assert!(matches!(err, GridError::PartialSave { failed: 1, .. }));
        assert!(session.should_reconcile(&err));
    }

    fn other_member_photo(id: &str) -> Photo {
        Photo {
            member_id: MemberId(2),
            ..photo(id, 0)
        }
    }

    #[tokio::test]
    async fn test_add_finishing_after_member_switch_is_dropped() {
        let store = FakeStore::with_photos(vec![photo("A", 0), other_member_photo("Z")]);
        let mut session = loaded(&store).await;

        let pending = session.add("file:///tmp/late.jpg", 400.0, 300.0).unwrap();
        let switch = session.load(MemberId(2));
        session.handle(switch.await).unwrap();

        assert_eq!(session.handle(pending.await), Ok(()));
        assert_eq!(session.member_id(), Some(MemberId(2)));
        assert_eq!(ids(session.photos()), vec!["Z"]);
        assert!(session.photos().iter().all(|p| p.member_id == MemberId(2)));
        assert!(!session.state().has_pending_writes());
    }

    #[tokio::test]
    async fn test_replace_finishing_after_member_switch_is_dropped() {
        let store = FakeStore::with_photos(vec![photo("A", 0), other_member_photo("Z")]);
        let mut session = loaded(&store).await;

        let pending = session
            .replace(&PhotoId::new("A"), "file:///tmp/late.jpg", 400.0, 300.0)
            .unwrap();
        let switch = session.load(MemberId(2));
        session.handle(switch.await).unwrap();

        assert_eq!(session.handle(pending.await), Ok(()));
        assert_eq!(session.photos(), [other_member_photo("Z")].as_slice());
        assert!(!session.state().has_pending_writes());
    }

    #[test]
    fn test_apply_ignores_answers_for_other_members() {
        let state = SessionState {
            member_id: Some(MemberId(2)),
            status: SessionStatus::Ready,
            ..SessionState::default()
        };

        let added = apply(
            state.clone(),
            &Event::Added {
                member_id: MEMBER,
                result: Ok(photo("A", 0)),
            },
        );
        assert_eq!(added, state);

        // An answer tagged for the active member but carrying someone
        // else's record is not shown either
        let mismatched = apply(
            state.clone(),
            &Event::Added {
                member_id: MemberId(2),
                result: Ok(photo("A", 0)),
            },
        );
        assert!(mismatched.photos.is_empty());
    }

    #[test]
    fn test_apply_ignores_image_failure_for_unknown_photo() {
        let state = apply(SessionState::default(), &Event::ImageFailed(PhotoId::new("x")));
        assert!(state.failed_images.is_empty());
    }
}
