use cgmath::Vector2;
use iced::alignment;
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, LineDash, Path, Program, Stroke, Text};
use iced::widget::image::Handle;
use iced::{Color, Pixels, Point, Rectangle, Renderer, Size, Theme};
use std::collections::HashMap;

use crate::state::data::{GridSlot, PhotoId, SlotContent, SlotKey};
use crate::state::layout::GridLayout;
use crate::Message;

/// Pointer travel before a press turns into a drag
const DRAG_THRESHOLD: f32 = 4.0;
const CORNER_RADIUS: f32 = 12.0;
const BUTTON_RADIUS: f32 = 14.0;
const BUTTON_INSET: f32 = 8.0;

const CELL_BACKGROUND: Color = Color::from_rgb(0.94, 0.94, 0.94);
const PLACEHOLDER_FILL: Color = Color::from_rgb(0.88, 0.88, 0.88);
const PLACEHOLDER_BORDER: Color = Color::from_rgb(0.46, 0.46, 0.46);
const ADD_BUTTON: Color = Color::from_rgb(1.0, 0.345, 0.392);
const ERROR_FILL: Color = Color::from_rgb(1.0, 0.92, 0.93);
const ERROR_TEXT: Color = Color::from_rgb(0.776, 0.157, 0.157);
const BUTTON_TEXT: Color = Color::from_rgb(0.2, 0.2, 0.2);

/// Canvas program drawing the photo grid and turning pointer input into
/// grid messages
///
/// Press and drag an occupied cell to move it; tap it to swap its image;
/// tap its ✕ to delete; tap a placeholder to add.
pub struct PhotoGridCanvas<'a> {
    pub slots: Vec<GridSlot<'a>>,
    pub layout: GridLayout,
    /// Decoded images by photo id; missing entries are still loading
    pub images: &'a HashMap<PhotoId, Handle>,
    /// Whether tapping a placeholder may add a photo
    pub can_add: bool,
}

impl PhotoGridCanvas<'_> {
    fn photo_at(&self, index: usize) -> Option<&PhotoId> {
        match self.slots.get(index)? {
            GridSlot::Occupied { photo, .. } => Some(&photo.id),
            GridSlot::Placeholder { .. } => None,
        }
    }

    /// Whether the slot a press started on still holds the same thing
    fn still_under(&self, press: &Press) -> bool {
        self.slots.get(press.index).map(GridSlot::key).as_ref() == Some(&press.key)
    }

    /// Turn a finished press into a grid message
    ///
    /// Gestures whose slot changed underneath them (a reload or delete
    /// landed mid-drag) resolve to nothing.
    fn resolve(&self, press: &Press, dragging: bool, current: Point) -> Option<Message> {
        if !self.still_under(press) {
            return None;
        }

        if dragging {
            let displacement = Vector2::new(current.x - press.origin.x, current.y - press.origin.y);
            return self
                .layout
                .drop_target(press.index, displacement)
                .map(|to| Message::MovePhoto {
                    from: press.index,
                    to,
                });
        }

        let id = self.photo_at(press.index)?.clone();
        Some(if press.on_button {
            Message::DeleteRequested(id)
        } else {
            Message::ReplaceRequested(id)
        })
    }

    fn cell_rect(&self, index: usize, offset: Vector2<f32>) -> Rectangle {
        let origin = self.layout.cell_origin(index) + offset;
        Rectangle::new(
            Point::new(origin.x, origin.y),
            Size::new(self.layout.cell.width, self.layout.cell.height),
        )
    }

    fn button_center(&self, cell: Rectangle) -> Point {
        Point::new(
            cell.x + cell.width - BUTTON_INSET - BUTTON_RADIUS,
            cell.y + cell.height - BUTTON_INSET - BUTTON_RADIUS,
        )
    }

    fn hits_button(&self, index: usize, point: Point) -> bool {
        let center = self.button_center(self.cell_rect(index, Vector2::new(0.0, 0.0)));
        center.distance(point) <= BUTTON_RADIUS
    }

    fn draw_slot(
        &self,
        frame: &mut canvas::Frame,
        index: usize,
        offset: Vector2<f32>,
        alpha: f32,
    ) {
        let rect = self.cell_rect(index, offset);
        let outline = Path::rounded_rectangle(rect.position(), rect.size(), CORNER_RADIUS.into());

        match &self.slots[index] {
            GridSlot::Occupied { photo, content } => {
                frame.fill(&outline, CELL_BACKGROUND.scale_alpha(alpha));

                match (content, self.images.get(&photo.id)) {
                    (SlotContent::Image(transform), Some(handle)) => {
                        // The cell clip crops whatever the transform pushes outside
                        frame.with_clip(rect, |frame| {
                            frame.draw_image(
                                Rectangle::new(
                                    Point::new(transform.translate_x, transform.translate_y),
                                    Size::new(transform.scaled_width, transform.scaled_height),
                                ),
                                canvas::Image::new(handle.clone()).opacity(alpha),
                            );
                        });
                    }
                    // Still loading
                    (SlotContent::Image(_), None) => {}
                    (SlotContent::Failed, _) => {
                        frame.fill(&outline, ERROR_FILL.scale_alpha(alpha));
                        frame.fill_text(Text {
                            content: "Failed to load".to_string(),
                            position: rect.center(),
                            color: ERROR_TEXT.scale_alpha(alpha),
                            size: Pixels(10.0),
                            horizontal_alignment: alignment::Horizontal::Center,
                            vertical_alignment: alignment::Vertical::Center,
                            ..Text::default()
                        });
                    }
                }

                self.draw_button(frame, rect, Color::WHITE.scale_alpha(alpha), "✕", BUTTON_TEXT);
            }
            GridSlot::Placeholder { .. } => {
                frame.fill(&outline, PLACEHOLDER_FILL);
                frame.stroke(
                    &outline,
                    Stroke {
                        line_dash: LineDash {
                            segments: &[6.0, 4.0],
                            offset: 0,
                        },
                        ..Stroke::default()
                            .with_color(PLACEHOLDER_BORDER)
                            .with_width(2.0)
                    },
                );
                if self.can_add {
                    self.draw_button(frame, rect, ADD_BUTTON, "+", Color::WHITE);
                }
            }
        }
    }

    fn draw_button(
        &self,
        frame: &mut canvas::Frame,
        cell: Rectangle,
        fill: Color,
        label: &str,
        label_color: Color,
    ) {
        let center = self.button_center(cell);
        frame.fill(&Path::circle(center, BUTTON_RADIUS), fill);
        frame.fill_text(Text {
            content: label.to_string(),
            position: center,
            color: label_color,
            size: Pixels(18.0),
            horizontal_alignment: alignment::Horizontal::Center,
            vertical_alignment: alignment::Vertical::Center,
            ..Text::default()
        });
    }
}

impl Program<Message> for PhotoGridCanvas<'_> {
    type State = DragState;

    fn draw(
        &self,
        state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let lifted = state
            .lifted()
            .filter(|_| state.press.as_ref().is_some_and(|press| self.still_under(press)));

        for index in 0..self.slots.len() {
            if Some(index) != lifted.map(|(i, _)| i) {
                self.draw_slot(&mut frame, index, Vector2::new(0.0, 0.0), 1.0);
            }
        }

        // The dragged photo follows the pointer, above everything else
        if let Some((index, displacement)) = lifted {
            self.draw_slot(&mut frame, index, displacement, 0.8);
        }

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        match event {
            // Mouse button press - remember what is under the pointer
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let Some(point) = cursor.position_in(bounds) else {
                    return (canvas::event::Status::Ignored, None);
                };
                let Some(index) = self.layout.index_at(Vector2::new(point.x, point.y)) else {
                    return (canvas::event::Status::Ignored, None);
                };

                let slot = &self.slots[index];
                if slot.is_placeholder() {
                    let message = self.can_add.then_some(Message::AddRequested);
                    return (canvas::event::Status::Captured, message);
                }

                state.press = Some(Press {
                    key: slot.key(),
                    index,
                    origin: point,
                    on_button: self.hits_button(index, point),
                });
                state.current = Some(point);
                state.dragging = false;
                return (canvas::event::Status::Captured, None);
            }

            // Mouse move - drag once past the threshold
            canvas::Event::Mouse(mouse::Event::CursorMoved { position }) => {
                if let Some(press) = &state.press {
                    let point = Point::new(position.x - bounds.x, position.y - bounds.y);
                    state.current = Some(point);
                    if !state.dragging && press.origin.distance(point) > DRAG_THRESHOLD {
                        state.dragging = true;
                    }
                    return (canvas::event::Status::Captured, None);
                }
            }

            // Mouse button release - resolve the gesture
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                let Some(press) = state.press.take() else {
                    return (canvas::event::Status::Ignored, None);
                };
                let dragging = std::mem::take(&mut state.dragging);
                let current = state.current.take().unwrap_or(press.origin);

                let message = self.resolve(&press, dragging, current);
                return (canvas::event::Status::Captured, message);
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if state.dragging {
            return mouse::Interaction::Grabbing;
        }
        let Some(point) = cursor.position_in(bounds) else {
            return mouse::Interaction::default();
        };
        match self.layout.index_at(Vector2::new(point.x, point.y)) {
            Some(index) if self.photo_at(index).is_some() => {
                if self.hits_button(index, point) {
                    mouse::Interaction::Pointer
                } else {
                    mouse::Interaction::Grab
                }
            }
            Some(_) if self.can_add => mouse::Interaction::Pointer,
            _ => mouse::Interaction::default(),
        }
    }
}

/// Where a press started
#[derive(Debug, Clone)]
pub struct Press {
    /// What the pressed slot held at the time
    pub key: SlotKey,
    pub index: usize,
    pub origin: Point,
    /// The press landed on the delete button
    pub on_button: bool,
}

/// State for drag interactions
#[derive(Debug, Clone, Default)]
pub struct DragState {
    pub press: Option<Press>,
    pub current: Option<Point>,
    pub dragging: bool,
}

impl DragState {
    /// The cell being dragged and how far it has travelled
    pub fn lifted(&self) -> Option<(usize, Vector2<f32>)> {
        if !self.dragging {
            return None;
        }
        let press = self.press.as_ref()?;
        let current = self.current?;
        Some((
            press.index,
            Vector2::new(current.x - press.origin.x, current.y - press.origin.y),
        ))
    }
}
