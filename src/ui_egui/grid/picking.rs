//! Selection and picking: pointer position to (column, hour, appointment).
//!
//! Everything here is a pure function of its inputs. A trial pick that must
//! not disturb the current selection simply discards the returned [`Pick`].

use egui::{pos2, vec2, Pos2, Rect, Vec2};

use super::geometry::{self, GridMetrics};
use crate::models::appointment::Appointment;
use crate::models::resource::ResourceList;
use crate::utils::date::HOURS_PER_DAY;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    Hidden,
    Pressed,
    Selected,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub column: usize,
    pub hour: u32,
    pub mode: SelectionMode,
}

impl Selection {
    pub fn new(column: usize, hour: u32) -> Self {
        Self {
            column,
            hour,
            mode: SelectionMode::Hidden,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.mode != SelectionMode::Hidden
    }

    /// True when the selection is showing and `pick` lands on the same cell.
    pub fn is_pressed_by(&self, pick: &Pick) -> bool {
        self.is_visible() && self.column == pick.column && self.hour == pick.hour
    }
}

/// Result of resolving a pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub column: usize,
    pub hour: u32,
    /// Index of the nearest appointment in the current list, if any.
    pub appointment: Option<usize>,
}

/// Converts a view-relative pointer position into content x / grid y.
///
/// Positions over the header band are invalid; positions over the hour
/// gutter are pulled onto the first visible column.
pub fn to_content(metrics: &GridMetrics, scroll: Vec2, pointer: Pos2) -> Option<Pos2> {
    if pointer.y < metrics.header_height {
        return None;
    }
    Some(pos2(
        pointer.x.max(metrics.gutter_width) + scroll.x,
        pointer.y - metrics.header_height + scroll.y,
    ))
}

/// The (column, hour) cell under a content point.
pub fn cell_at(metrics: &GridMetrics, point: Pos2) -> (usize, u32) {
    let pitch = metrics.column_pitch().max(1.0);
    let column = ((point.x - metrics.gutter_width) / pitch).floor().max(0.0) as usize;
    let hour = (point.y / metrics.row_pitch()).floor().max(0.0) as u32;
    (
        column.min(metrics.column_count.saturating_sub(1)),
        hour.min(HOURS_PER_DAY - 1),
    )
}

pub fn resolve_position(metrics: &GridMetrics, scroll: Vec2, pointer: Pos2) -> Option<(usize, u32)> {
    to_content(metrics, scroll, pointer).map(|point| cell_at(metrics, point))
}

/// Index of the laid-out appointment nearest to `point` among those whose
/// rect touches the square of half-size `radius` around it. Ties keep the
/// earliest appointment in list order.
pub fn find_nearest(appointments: &[Appointment], point: Pos2, radius: f32) -> Option<usize> {
    let region = Rect::from_center_size(point, vec2(radius * 2.0, radius * 2.0));

    let mut nearest: Option<(usize, f32)> = None;
    for (index, appointment) in appointments.iter().enumerate() {
        if !geometry::is_laid_out(appointment) || !geometry::intersects(appointment, region) {
            continue;
        }
        let distance = geometry::distance(point, appointment);
        if nearest.map_or(true, |(_, best)| distance < best) {
            nearest = Some((index, distance));
        }
    }
    nearest.map(|(index, _)| index)
}

/// Pulls `hour` into the rows an appointment occupies on `day`.
pub fn clamp_hour(appointment: &Appointment, day: i32, hour: u32) -> u32 {
    let (start_hour, end_hour) = appointment.hour_rows_on(day);
    if hour < start_hour {
        start_hour
    } else if hour > end_hour {
        end_hour
    } else {
        hour
    }
}

/// Resolves a pointer position to a cell and, when one is close enough, an
/// appointment. A found appointment decides the column and bounds the hour.
pub fn pick(
    metrics: &GridMetrics,
    scroll: Vec2,
    pointer: Pos2,
    appointments: &[Appointment],
    resources: &ResourceList,
    day: i32,
    radius: f32,
) -> Option<Pick> {
    let point = to_content(metrics, scroll, pointer)?;
    let (column, hour) = cell_at(metrics, point);

    let result = match find_nearest(appointments, point, radius) {
        Some(index) => {
            let appointment = &appointments[index];
            Pick {
                column: resources.column_for(appointment),
                hour: clamp_hour(appointment, day, hour),
                appointment: Some(index),
            }
        }
        None => Pick {
            column,
            hour,
            appointment: None,
        },
    };

    log::debug!(
        "Picked column {} hour {} appointment {:?}",
        result.column,
        result.hour,
        result.appointment
    );
    Some(result)
}
