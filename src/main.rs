use iced::widget::image::Handle;
use iced::widget::{button, canvas, column, container, horizontal_space, row, scrollable, text};
use iced::{window, Alignment, Element, Length, Size, Subscription, Task, Theme};
use log::{info, warn};
use std::collections::HashMap;

mod config;
mod error;
mod geometry;
mod media;
mod state;
mod store;
mod ui;

use config::Config;
use media::loader;
use media::picker::{self, PickOutcome};
use state::data::PhotoId;
use state::layout::{GridLayout, EDGE_PADDING, MAX_PHOTOS};
use state::session::{Event, GridSession, SessionStatus};
use store::HttpPhotoStore;

/// Main application state
struct PhotoGrid {
    session: GridSession<HttpPhotoStore>,
    config: Config,
    /// Cell geometry, follows the window width
    layout: GridLayout,
    /// Decoded images ready to draw
    images: HashMap<PhotoId, Handle>,
    /// The url each photo's image was requested from
    requested: HashMap<PhotoId, String>,
    /// Last thing worth telling the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// A session future resolved
    Session(Event),
    /// Background image load finished
    ImageLoaded {
        id: PhotoId,
        url: String,
        result: Result<Handle, String>,
    },
    /// User tapped an empty slot
    AddRequested,
    PhotoPicked(PickOutcome),
    /// User tapped a photo to swap its image
    ReplaceRequested(PhotoId),
    ReplacementPicked { id: PhotoId, outcome: PickOutcome },
    /// User tapped a photo's delete button
    DeleteRequested(PhotoId),
    DeleteConfirmed { id: PhotoId, confirmed: bool },
    /// A drag was released over another cell
    MovePhoto { from: usize, to: usize },
    Refresh,
    WindowResized(Size),
}

impl Message {
    /// Whether this message is the user kicking off a new operation
    fn starts_operation(&self) -> bool {
        matches!(
            self,
            Message::AddRequested
                | Message::ReplaceRequested(_)
                | Message::DeleteConfirmed {
                    confirmed: true,
                    ..
                }
                | Message::MovePhoto { .. }
                | Message::Refresh
        )
    }
}

impl PhotoGrid {
    /// Create a new instance of the application and start the first load
    fn new(config: Config) -> (Self, Task<Message>) {
        let store = HttpPhotoStore::from_config(&config);
        info!("🎨 Photo grid using {}", store.base_url());

        let mut session =
            GridSession::new(store).reload_after_mutation_error(config.reload_after_mutation_error);
        let load = session.load(config.member_id);

        let app = PhotoGrid {
            session,
            layout: config.layout(),
            config,
            images: HashMap::new(),
            requested: HashMap::new(),
            status: String::new(),
        };

        (app, Task::perform(load, Message::Session))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        // The last error stays up until the user does something else
        if message.starts_operation() {
            self.status.clear();
        }

        match message {
            Message::Session(event) => {
                let task = match self.session.handle(event) {
                    Ok(()) => Task::none(),
                    Err(err) => {
                        self.status = err.to_string();
                        if self.session.should_reconcile(&err) {
                            info!("🔄 Reloading to reconcile with the store");
                            self.refresh()
                        } else {
                            Task::none()
                        }
                    }
                };
                Task::batch([task, self.sync_images()])
            }
            Message::ImageLoaded { id, url, result } => {
                // A replace may have superseded this request
                if self.requested.get(&id) != Some(&url) {
                    return Task::none();
                }
                match result {
                    Ok(handle) => {
                        self.images.insert(id, handle);
                    }
                    Err(reason) => {
                        warn!("⚠️  {}", reason);
                        self.images.remove(&id);
                        self.session.mark_image_failed(&id);
                    }
                }
                Task::none()
            }
            Message::AddRequested => {
                if !self.session.can_add() {
                    return Task::none();
                }
                Task::perform(picker::pick_photo(), Message::PhotoPicked)
            }
            Message::PhotoPicked(outcome) => match outcome {
                PickOutcome::Cancelled => Task::none(),
                PickOutcome::Failed(reason) => {
                    self.status = reason;
                    Task::none()
                }
                PickOutcome::Picked(asset) => {
                    match self
                        .session
                        .add(asset.uri, asset.width as f32, asset.height as f32)
                    {
                        Ok(future) => Task::perform(future, Message::Session),
                        Err(err) => {
                            self.status = err.to_string();
                            Task::none()
                        }
                    }
                }
            },
            Message::ReplaceRequested(id) => {
                Task::perform(picker::pick_photo(), move |outcome| {
                    Message::ReplacementPicked {
                        id: id.clone(),
                        outcome,
                    }
                })
            }
            Message::ReplacementPicked { id, outcome } => match outcome {
                PickOutcome::Cancelled => Task::none(),
                PickOutcome::Failed(reason) => {
                    self.status = reason;
                    Task::none()
                }
                PickOutcome::Picked(asset) => {
                    match self.session.replace(
                        &id,
                        asset.uri,
                        asset.width as f32,
                        asset.height as f32,
                    ) {
                        Ok(future) => Task::perform(future, Message::Session),
                        Err(err) => {
                            self.status = err.to_string();
                            Task::none()
                        }
                    }
                }
            },
            Message::DeleteRequested(id) => {
                Task::perform(picker::confirm_delete(), move |confirmed| {
                    Message::DeleteConfirmed {
                        id: id.clone(),
                        confirmed,
                    }
                })
            }
            Message::DeleteConfirmed { id, confirmed } => {
                if !confirmed {
                    return Task::none();
                }
                match self.session.delete(&id) {
                    Ok(future) => Task::batch([
                        Task::perform(future, Message::Session),
                        self.sync_images(),
                    ]),
                    Err(err) => {
                        self.status = err.to_string();
                        Task::none()
                    }
                }
            }
            Message::MovePhoto { from, to } => match self.session.move_photo(from, to) {
                Ok(Some(future)) => Task::perform(future, Message::Session),
                Ok(None) => Task::none(),
                Err(err) => {
                    self.status = err.to_string();
                    Task::none()
                }
            },
            Message::Refresh => self.refresh(),
            Message::WindowResized(size) => {
                self.layout = GridLayout::for_surface_width(size.width, self.config.gap);
                Task::none()
            }
        }
    }

    fn refresh(&mut self) -> Task<Message> {
        match self.session.refresh() {
            Ok(future) => Task::perform(future, Message::Session),
            Err(err) => {
                self.status = err.to_string();
                Task::none()
            }
        }
    }

    /// Forget images of photos that are gone and start loading new ones
    fn sync_images(&mut self) -> Task<Message> {
        let photos = self.session.photos();
        let current: HashMap<&PhotoId, &str> =
            photos.iter().map(|p| (&p.id, p.url.as_str())).collect();

        self.requested
            .retain(|id, url| current.get(id) == Some(&url.as_str()));
        let requested = &self.requested;
        self.images.retain(|id, _| requested.contains_key(id));

        let timeout = self.config.request_timeout();
        let mut loads = Vec::new();
        for photo in photos {
            if self.requested.contains_key(&photo.id) {
                continue;
            }
            self.requested.insert(photo.id.clone(), photo.url.clone());

            let id = photo.id.clone();
            let url = photo.url.clone();
            loads.push(Task::perform(
                loader::load_image(url.clone(), timeout),
                move |result| Message::ImageLoaded {
                    id: id.clone(),
                    url: url.clone(),
                    result: result
                        .map(|image| Handle::from_rgba(image.width, image.height, image.rgba))
                        .map_err(|e| e.to_string()),
                },
            ));
        }

        Task::batch(loads)
    }

    fn status_line(&self) -> String {
        let state = self.session.state();
        if !self.status.is_empty() {
            return self.status.clone();
        }
        match state.status {
            SessionStatus::Empty | SessionStatus::Loading => "Loading photos...".to_string(),
            SessionStatus::LoadFailed => "Could not load photos".to_string(),
            SessionStatus::Ready if state.has_pending_writes() => "Saving...".to_string(),
            SessionStatus::Ready => format!("{} of {} photos", state.photos.len(), MAX_PHOTOS),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let grid_size = self.layout.grid_size();
        let grid = canvas(ui::grid::PhotoGridCanvas {
            slots: self.session.slots(self.layout.cell),
            layout: self.layout,
            images: &self.images,
            can_add: self.session.member_id().is_some() && self.session.can_add(),
        })
        .width(Length::Fixed(grid_size.x))
        .height(Length::Fixed(grid_size.y));

        let header = row![
            text("Media").size(24),
            horizontal_space(),
            button("Refresh").on_press(Message::Refresh).padding(6),
        ]
        .align_y(Alignment::Center);

        let content = column![header, grid, text(self.status_line()).size(14)]
            .spacing(16)
            .padding(EDGE_PADDING);

        container(scrollable(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn subscription(&self) -> Subscription<Message> {
        window::resize_events().map(|(_id, size)| Message::WindowResized(size))
    }
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("photo_grid=info"))
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        warn!("⚠️  {}, using defaults", e);
        Config::default()
    });
    let grid_height = config.layout().grid_size().y + 120.0;
    let window_size = Size::new(config.surface_width, grid_height);

    iced::application("Photo Grid", PhotoGrid::update, PhotoGrid::view)
        .theme(PhotoGrid::theme)
        .subscription(PhotoGrid::subscription)
        .window_size(window_size)
        .centered()
        .run_with(move || PhotoGrid::new(config))
}
