//! egui adapter for [`AppointmentGrid`].
//!
//! Translates egui input into [`PointerEvent`]s, keeps the controller's view
//! size and gutter width in sync with the allocated rect, paints the frame's
//! draw list and asks egui to repaint when the next timer is due.

use std::time::Duration;

use egui::{Color32, Event, FontId, PointerButton, Pos2, Rect, Response, Sense, Ui};

use super::controller::AppointmentGrid;
use super::gesture::PointerEvent;
use super::palette::GridPalette;
use super::renderer::{self, hour_label};
use crate::utils::date::HOURS_PER_DAY;

pub struct GridWidget;

impl GridWidget {
    /// Fills the available space with the grid.
    pub fn show(ui: &mut Ui, grid: &mut AppointmentGrid) -> Response {
        let size = ui.available_size();
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let now_ms = ui.input(|i| (i.time * 1000.0).max(0.0) as u64);

        grid.set_view_size(rect.size());
        grid.set_hour_label_width(measure_hour_labels(ui, grid.config().hour_font_size));

        for event in pointer_events(ui, rect, grid.is_pressed(), now_ms) {
            grid.handle_pointer(event);
        }
        if response.hovered() {
            let wheel = ui.input(|i| i.smooth_scroll_delta);
            grid.scroll_by(wheel);
        }

        grid.tick(now_ms);

        let palette = GridPalette::from_visuals(ui.visuals());
        let list = grid.render(&palette);
        renderer::paint(&ui.painter_at(rect), rect.min, &list);

        if let Some(due) = grid.next_wakeup(now_ms) {
            ui.ctx()
                .request_repaint_after(Duration::from_millis(due.saturating_sub(now_ms)));
        }

        response
    }
}

/// Width of the widest "HH:00" label at `font_size`.
fn measure_hour_labels(ui: &Ui, font_size: f32) -> f32 {
    let font = FontId::proportional(font_size);
    ui.fonts(|fonts| {
        (0..HOURS_PER_DAY)
            .map(|hour| {
                fonts
                    .layout_no_wrap(hour_label(hour), font.clone(), Color32::WHITE)
                    .size()
                    .x
            })
            .fold(0.0, f32::max)
    })
}

/// Pointer events for this frame, relative to `rect.min`.
///
/// egui does not timestamp individual input events, so every event carries
/// the frame time `now_ms`.
///
/// Presses only start inside `rect`; once pressed, moves and the release are
/// followed anywhere so a drag can leave the widget.
fn pointer_events(ui: &Ui, rect: Rect, pressed: bool, now_ms: u64) -> Vec<PointerEvent> {
    let origin = rect.min.to_vec2();
    let relative = |pos: Pos2| pos - origin;
    let mut pressed = pressed;
    let mut events = Vec::new();

    ui.input(|input| {
        for event in &input.events {
            match event {
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: true,
                    ..
                } if rect.contains(*pos) && !pressed => {
                    pressed = true;
                    events.push(PointerEvent::Down {
                        pos: relative(*pos),
                        time_ms: now_ms,
                    });
                }
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: false,
                    ..
                } if pressed => {
                    pressed = false;
                    events.push(PointerEvent::Up {
                        pos: relative(*pos),
                        time_ms: now_ms,
                    });
                }
                Event::PointerMoved(pos) if pressed => {
                    events.push(PointerEvent::Move {
                        pos: relative(*pos),
                        time_ms: now_ms,
                    });
                }
                Event::PointerGone if pressed => {
                    pressed = false;
                    events.push(PointerEvent::Cancel { time_ms: now_ms });
                }
                _ => {}
            }
        }
    });

    events
}
