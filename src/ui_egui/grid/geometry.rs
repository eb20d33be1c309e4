//! Geometry engine for the appointment grid.
//!
//! Two coordinate spaces are used throughout the grid:
//!
//! * **content x**: the hour gutter occupies `[0, gutter)` and column `i`
//!   starts at `gutter + i * column_pitch`. Horizontal scrolling moves the
//!   columns only; the gutter stays put.
//! * **grid y**: `0` is the top of hour 0, directly below the header band.
//!   Vertical scrolling moves the rows only; the header stays put.
//!
//! Appointment scratch rects (`Appointment::layout`) are stored in these
//! coordinates so they stay valid while the view scrolls.

use egui::{pos2, vec2, Pos2, Rect, Vec2};

use crate::models::appointment::Appointment;
use crate::models::resource::ResourceList;
use crate::models::settings::GridConfig;
use crate::utils::date::{HOURS_PER_DAY, MINUTES_PER_DAY, MINUTES_PER_HOUR};

/// Derived sizes for one view size and column set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub view_size: Vec2,
    pub gutter_width: f32,
    pub header_height: f32,
    pub row_height: f32,
    pub hour_gap: f32,
    pub column_gap: f32,
    pub cell_width: f32,
    pub column_count: usize,
    pub shown_columns: usize,
}

impl GridMetrics {
    /// `gutter_width` is the measured hour-label width; it never shrinks
    /// below the configured gutter.
    pub fn new(
        config: &GridConfig,
        view_size: Vec2,
        column_count: usize,
        shown_columns: usize,
        gutter_width: f32,
    ) -> Self {
        let shown = shown_columns.max(1);
        let gutter_width = gutter_width.max(config.hour_gutter_width);
        let grid_width = view_size.x - gutter_width;
        let cell_width =
            ((grid_width - shown as f32 * config.column_gap) / shown as f32).floor().max(0.0);

        Self {
            view_size,
            gutter_width,
            header_height: config.header_height,
            row_height: config.row_height,
            hour_gap: config.hour_gap,
            column_gap: config.column_gap,
            cell_width,
            column_count,
            shown_columns: shown,
        }
    }

    pub fn row_pitch(&self) -> f32 {
        self.row_height + self.hour_gap
    }

    pub fn column_pitch(&self) -> f32 {
        self.cell_width + self.column_gap
    }

    /// Left edge of column `index` in content x. `index == column_count`
    /// gives the right edge of the last column.
    pub fn column_left(&self, index: usize) -> f32 {
        self.gutter_width + index as f32 * self.column_pitch()
    }

    pub fn content_width(&self) -> f32 {
        self.column_gap + self.column_count as f32 * self.column_pitch() + self.gutter_width
    }

    pub fn content_height(&self) -> f32 {
        self.hour_gap + HOURS_PER_DAY as f32 * self.row_pitch() + self.header_height
    }

    /// Largest scroll offset on each axis; zero when the content fits.
    pub fn max_scroll(&self) -> Vec2 {
        vec2(
            (self.content_width() - self.view_size.x).max(0.0),
            (self.content_height() - self.view_size.y).max(0.0),
        )
    }

    /// Grid y of the top edge of `hour`'s separator line.
    pub fn hour_top(&self, hour: u32) -> f32 {
        hour as f32 * self.row_pitch()
    }

    /// Grid y of a minute-of-day, skipping the separator lines above it.
    pub fn minute_y(&self, minute: u32) -> f32 {
        self.hour_gap
            + minute as f32 * self.row_height / MINUTES_PER_HOUR as f32
            + (minute / MINUTES_PER_HOUR) as f32 * self.hour_gap
    }

    /// Highlight rectangle of one cell, in content x / grid y.
    pub fn cell_rect(&self, column: usize, hour: u32) -> Rect {
        let top = self.hour_top(hour) + self.hour_gap;
        Rect::from_min_max(
            pos2(self.column_left(column) + 1.0, top),
            pos2(
                self.column_left(column + 1) + 1.0 - self.column_gap,
                top + self.row_height,
            ),
        )
    }

    pub fn content_to_screen(&self, point: Pos2, scroll: Vec2) -> Pos2 {
        pos2(point.x - scroll.x, point.y + self.header_height - scroll.y)
    }

    pub fn rect_to_screen(&self, rect: Rect, scroll: Vec2) -> Rect {
        Rect::from_min_max(
            self.content_to_screen(rect.min, scroll),
            self.content_to_screen(rect.max, scroll),
        )
    }
}

/// Computes an appointment's rectangle within one column of `day`.
///
/// Returns `None` when the appointment does not touch `day`. Parts that fall
/// on neighbouring days are clamped to the `[0, 24h)` window; the
/// appointment itself is not modified.
pub fn rect_for(
    config: &GridConfig,
    day: i32,
    left: f32,
    row_top: f32,
    cell_width: f32,
    appointment: &Appointment,
) -> Option<Rect> {
    if appointment.start_day > day || appointment.end_day < day {
        return None;
    }

    let start_minute = if appointment.start_day < day {
        0
    } else {
        appointment.start_minute
    };
    let end_minute = if appointment.end_day > day {
        MINUTES_PER_DAY
    } else {
        appointment.end_minute
    };

    let start_hour = (start_minute / MINUTES_PER_HOUR) as f32;
    let mut end_hour = (end_minute / MINUTES_PER_HOUR) as i32;
    if end_hour as u32 * MINUTES_PER_HOUR == end_minute {
        end_hour -= 1;
    }

    let minute_offset = |minute: u32| minute as f32 * config.row_height / MINUTES_PER_HOUR as f32;
    let top = row_top + minute_offset(start_minute) + start_hour * config.hour_gap;
    let bottom = (row_top + minute_offset(end_minute) + end_hour as f32 * config.hour_gap - 1.0)
        .max(top + config.min_appointment_height);

    let right = left + cell_width - 2.0 * config.column_gap;
    Some(Rect::from_min_max(pos2(left, top), pos2(right, bottom)))
}

/// Writes the scratch rect of every appointment for `day`. Appointments that
/// are not on the day get `Rect::NOTHING` and are skipped by picking and
/// rendering.
pub fn layout_appointments(
    config: &GridConfig,
    metrics: &GridMetrics,
    resources: &ResourceList,
    day: i32,
    appointments: &mut [Appointment],
) {
    for appointment in appointments.iter_mut() {
        let column = resources.column_for(appointment);
        let left = metrics.column_left(column) + 1.0;
        appointment.layout = rect_for(
            config,
            day,
            left,
            metrics.hour_gap,
            metrics.cell_width - 2.0,
            appointment,
        )
        .unwrap_or(Rect::NOTHING);
    }
}

pub fn is_laid_out(appointment: &Appointment) -> bool {
    appointment.layout.is_finite()
}

/// Rectangle overlap against the appointment's scratch rect, edges inclusive
/// on the far side.
pub fn intersects(appointment: &Appointment, region: Rect) -> bool {
    let rect = appointment.layout;
    rect.left() < region.right()
        && rect.right() >= region.left()
        && rect.top() < region.bottom()
        && rect.bottom() >= region.top()
}

/// Distance from a point to the appointment's scratch rect, `0` inside it.
pub fn distance(point: Pos2, appointment: &Appointment) -> f32 {
    let rect = appointment.layout;
    let dx = if point.x < rect.left() {
        rect.left() - point.x
    } else if point.x > rect.right() {
        point.x - rect.right()
    } else {
        0.0
    };
    let dy = if point.y < rect.top() {
        rect.top() - point.y
    } else if point.y > rect.bottom() {
        point.y - rect.bottom()
    } else {
        0.0
    };

    if dx == 0.0 {
        dy
    } else if dy == 0.0 {
        dx
    } else {
        (dx * dx + dy * dy).sqrt()
    }
}
