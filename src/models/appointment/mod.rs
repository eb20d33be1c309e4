// Appointment module
// A single booked slot shown in one resource column of the grid

use chrono::{DateTime, TimeZone, Utc};
use egui::Rect;

use crate::utils::date::{
    julian_day_of, minutes_since_midnight, HOURS_PER_DAY, MINUTES_PER_DAY, MINUTES_PER_HOUR,
};

/// Identifier used for an appointment that has not been saved yet.
pub const DRAFT_ID: i64 = -1;

/// An appointment as displayed by the grid.
///
/// The `start_day`/`end_day` and `start_minute`/`end_minute` fields are the
/// zone-local projection of `start`/`end`, computed once at construction so
/// geometry and picking compare plain integers.
///
/// `layout` is scratch space written by the render pipeline on every pass;
/// it is not part of the appointment's identity and is ignored by equality.
#[derive(Debug, Clone)]
pub struct Appointment {
    pub id: i64,
    pub title: String,
    pub location: Option<String>,
    /// Explicit owning resource. When absent, the title-match shim in
    /// `models::resource` decides the column.
    pub resource: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_day: i32,
    pub end_day: i32,
    pub start_minute: u32,
    pub end_minute: u32,
    /// Hex colour (`#RRGGBB`)
    pub color: Option<String>,
    pub layout: Rect,
}

impl PartialEq for Appointment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.location == other.location
            && self.resource == other.resource
            && self.start == other.start
            && self.end == other.end
            && self.color == other.color
    }
}

impl Appointment {
    /// Create an appointment, projecting its instants into `zone`.
    ///
    /// # Returns
    /// Returns `Err` when the title is blank or `end` precedes `start`.
    /// Zero-length appointments are allowed.
    ///
    /// # Examples
    /// ```
    /// use appointment_grid::models::appointment::Appointment;
    /// use chrono::TimeZone;
    ///
    /// let zone = chrono_tz::UTC;
    /// let start = zone.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
    /// let end = zone.with_ymd_and_hms(2024, 5, 10, 10, 30, 0).unwrap();
    /// let appointment = Appointment::new(7, "Karos", start, end).unwrap();
    /// assert_eq!(appointment.start_minute, 540);
    /// assert_eq!(appointment.end_minute, 630);
    /// ```
    pub fn new<Tz: TimeZone>(
        id: i64,
        title: impl Into<String>,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Self, String> {
        let title = title.into();

        if title.trim().is_empty() {
            return Err("Appointment title cannot be empty".to_string());
        }

        if end < start {
            return Err("Appointment end time must not precede start time".to_string());
        }

        Ok(Self {
            id,
            title,
            location: None,
            resource: None,
            start_day: julian_day_of(&start),
            end_day: julian_day_of(&end),
            start_minute: minutes_since_midnight(&start),
            end_minute: minutes_since_midnight(&end),
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
            color: None,
            layout: Rect::NOTHING,
        })
    }

    /// The one-hour unsaved appointment offered for an empty cell.
    pub fn draft<Tz: TimeZone>(julian_day: i32, start: DateTime<Tz>, start_minute: u32) -> Self {
        let start = start.with_timezone(&Utc);
        Self {
            id: DRAFT_ID,
            title: String::new(),
            location: None,
            resource: None,
            start,
            end: start + chrono::Duration::hours(1),
            start_day: julian_day,
            end_day: julian_day,
            start_minute,
            end_minute: start_minute + MINUTES_PER_HOUR,
            color: None,
            layout: Rect::NOTHING,
        }
    }

    /// Create a builder for constructing appointments with optional fields
    pub fn builder() -> AppointmentBuilder {
        AppointmentBuilder::new()
    }

    pub fn is_draft(&self) -> bool {
        self.id == DRAFT_ID
    }

    /// First and last hour rows the appointment occupies on `day`.
    ///
    /// Parts falling on other days are cut at midnight, so an appointment
    /// continuing from yesterday starts at row 0 and one running into
    /// tomorrow reaches row 23. An appointment ending exactly on the hour
    /// does not reach into the following row.
    pub fn hour_rows_on(&self, day: i32) -> (u32, u32) {
        let start_minute = if self.start_day < day {
            0
        } else {
            self.start_minute
        };
        let end_minute = if self.end_day > day {
            MINUTES_PER_DAY
        } else {
            self.end_minute
        };

        let start_hour = start_minute / MINUTES_PER_HOUR;
        let end_hour = if start_minute < end_minute {
            (end_minute - 1) / MINUTES_PER_HOUR
        } else {
            end_minute / MINUTES_PER_HOUR
        };
        (start_hour, end_hour.min(HOURS_PER_DAY - 1))
    }

    /// Recomputes the day and minute fields as seen from `zone`.
    pub fn project_into<Tz: TimeZone>(&mut self, zone: &Tz) {
        let start = self.start.with_timezone(zone);
        let end = self.end.with_timezone(zone);
        self.start_day = julian_day_of(&start);
        self.end_day = julian_day_of(&end);
        self.start_minute = minutes_since_midnight(&start);
        self.end_minute = minutes_since_midnight(&end);
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Builder for creating appointments with optional fields
pub struct AppointmentBuilder {
    id: i64,
    title: Option<String>,
    location: Option<String>,
    resource: Option<String>,
    start: Option<DateTime<chrono_tz::Tz>>,
    end: Option<DateTime<chrono_tz::Tz>>,
    color: Option<String>,
}

impl AppointmentBuilder {
    pub fn new() -> Self {
        Self {
            id: DRAFT_ID,
            title: None,
            location: None,
            resource: None,
            start: None,
            end: None,
            color: None,
        }
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn start(mut self, start: DateTime<chrono_tz::Tz>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<chrono_tz::Tz>) -> Self {
        self.end = Some(end);
        self
    }

    /// Set the colour (hex format)
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn build(self) -> Result<Appointment, String> {
        let title = self.title.ok_or("Appointment title is required")?;
        let start = self.start.ok_or("Appointment start time is required")?;
        let end = self.end.ok_or("Appointment end time is required")?;

        if let Some(ref color) = self.color {
            if !color.starts_with('#') || color.len() != 7 {
                return Err("Color must be in hex format (#RRGGBB)".to_string());
            }
        }

        let mut appointment = Appointment::new(self.id, title, start, end)?;
        appointment.location = self.location;
        appointment.resource = self.resource;
        appointment.color = self.color;
        Ok(appointment)
    }
}

impl Default for AppointmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use test_case::test_case;

    fn zone() -> Tz {
        chrono_tz::Europe::London
    }

    fn at(hour: u32, minute: u32) -> DateTime<Tz> {
        zone().with_ymd_and_hms(2024, 5, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_new_projects_into_zone() {
        let appointment = Appointment::new(1, "Colin", at(9, 15), at(10, 0)).unwrap();
        assert_eq!(appointment.start_minute, 9 * 60 + 15);
        assert_eq!(appointment.end_minute, 600);
        assert_eq!(appointment.start_day, appointment.end_day);
    }

    #[test]
    fn test_new_rejects_reversed_times() {
        let result = Appointment::new(1, "Colin", at(10, 0), at(9, 0));
        assert_eq!(
            result.unwrap_err(),
            "Appointment end time must not precede start time"
        );
    }

    #[test]
    fn test_new_allows_zero_length() {
        assert!(Appointment::new(1, "Colin", at(10, 0), at(10, 0)).is_ok());
    }

    #[test]
    fn test_new_rejects_blank_title() {
        assert!(Appointment::new(1, "  ", at(9, 0), at(10, 0)).is_err());
    }

    #[test]
    fn test_spanning_midnight_keeps_both_days() {
        let start = at(23, 0);
        let end = zone().with_ymd_and_hms(2024, 5, 11, 1, 0, 0).unwrap();
        let appointment = Appointment::new(1, "Tom", start, end).unwrap();
        assert_eq!(appointment.end_day - appointment.start_day, 1);
        assert_eq!(appointment.end_minute, 60);
    }

    #[test_case(120, 180, 2 ; "ends exactly on the hour")]
    #[test_case(120, 181, 3 ; "spills one minute past the hour")]
    #[test_case(120, 120, 2 ; "zero length")]
    #[test_case(90, 150, 2 ; "crosses one boundary")]
    fn test_end_hour(start_minute: u32, end_minute: u32, expected: u32) {
        let mut appointment = Appointment::new(1, "Jay", at(0, 0), at(0, 0)).unwrap();
        appointment.start_minute = start_minute;
        appointment.end_minute = end_minute;
        assert_eq!(appointment.hour_rows_on(appointment.start_day).1, expected);
    }

    #[test]
    fn test_hour_rows_are_cut_at_midnight() {
        let start = at(22, 0);
        let end = zone().with_ymd_and_hms(2024, 5, 11, 2, 0, 0).unwrap();
        let appointment = Appointment::new(5, "Karos", start, end).unwrap();

        assert_eq!(appointment.hour_rows_on(appointment.start_day), (22, 23));
        assert_eq!(appointment.hour_rows_on(appointment.end_day), (0, 1));
    }

    #[test]
    fn test_draft_is_one_hour() {
        let draft = Appointment::draft(2_460_441, at(14, 0), 14 * 60);
        assert!(draft.is_draft());
        assert_eq!(draft.duration(), chrono::Duration::hours(1));
        assert_eq!(draft.end_minute - draft.start_minute, 60);
    }

    #[test]
    fn test_builder_with_optional_fields() {
        let appointment = Appointment::builder()
            .id(42)
            .title("Haircut")
            .location("Chair 2")
            .resource("Mechelle")
            .color("#FF5733")
            .start(at(11, 0))
            .end(at(12, 0))
            .build()
            .unwrap();

        assert_eq!(appointment.id, 42);
        assert_eq!(appointment.location.as_deref(), Some("Chair 2"));
        assert_eq!(appointment.resource.as_deref(), Some("Mechelle"));
        assert_eq!(appointment.color.as_deref(), Some("#FF5733"));
    }

    #[test]
    fn test_builder_missing_start() {
        let result = Appointment::builder().title("Haircut").end(at(12, 0)).build();
        assert_eq!(result.unwrap_err(), "Appointment start time is required");
    }

    #[test]
    fn test_builder_invalid_color() {
        let result = Appointment::builder()
            .title("Haircut")
            .start(at(11, 0))
            .end(at(12, 0))
            .color("red")
            .build();
        assert!(result.unwrap_err().contains("hex format"));
    }

    #[test]
    fn test_project_into_other_zone() {
        let mut appointment = Appointment::new(1, "Rita", at(23, 30), at(23, 45)).unwrap();
        let london_day = appointment.start_day;
        // 23:30 BST is 07:30 the next morning in Tokyo.
        appointment.project_into(&chrono_tz::Asia::Tokyo);
        assert_eq!(appointment.start_day, london_day + 1);
        assert_eq!(appointment.start_minute, 7 * 60 + 30);
    }

    #[test]
    fn test_equality_ignores_layout() {
        let a = Appointment::new(1, "Will", at(9, 0), at(10, 0)).unwrap();
        let mut b = a.clone();
        b.layout = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(10.0, 10.0));
        assert_eq!(a, b);
    }
}
