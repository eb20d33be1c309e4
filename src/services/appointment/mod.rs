// Appointment service module
// Day-scoped reads and simple inserts against the appointment store

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use rusqlite::{self, params, Connection, Row};

use crate::models::appointment::Appointment;
use crate::utils::date::day_window;

pub struct AppointmentService<'a> {
    conn: &'a Connection,
}

/// Fields needed to store a new appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub title: String,
    pub location: Option<String>,
    pub resource: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub color: Option<String>,
}

impl<'a> AppointmentService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert an appointment and return its id.
    pub fn create(&self, appointment: &NewAppointment) -> Result<i64> {
        if appointment.title.trim().is_empty() {
            return Err(anyhow!("Appointment title cannot be empty"));
        }
        if appointment.end < appointment.start {
            return Err(anyhow!("Appointment end time must not precede start time"));
        }

        self.conn
            .execute(
                "INSERT INTO appointments (title, location, resource, start_datetime, end_datetime, color)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    appointment.title,
                    appointment.location,
                    appointment.resource,
                    to_stored(&appointment.start),
                    to_stored(&appointment.end),
                    appointment.color,
                ],
            )
            .context("Failed to insert appointment")?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Appointments overlapping the local day `date` in `zone`, ordered by start.
    ///
    /// Appointments touching the day boundary from either side are included,
    /// the geometry engine clamps them to the visible window.
    pub fn find_by_day(&self, date: NaiveDate, zone: &Tz) -> Result<Vec<Appointment>> {
        let (day_start, day_end) =
            day_window(zone, date).ok_or_else(|| anyhow!("No local midnight for {}", date))?;

        let mut stmt = self.conn.prepare(
            "SELECT id, title, location, resource, start_datetime, end_datetime, color
             FROM appointments
             WHERE start_datetime < ?1 AND end_datetime >= ?2
             ORDER BY start_datetime ASC, id ASC",
        )?;

        let appointments = stmt
            .query_map(
                [
                    to_stored(&day_end.with_timezone(&Utc)),
                    to_stored(&day_start.with_timezone(&Utc)),
                ],
                |row| map_appointment_row(row, zone),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to load appointments for {}", date))?;

        Ok(appointments)
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))
            .context("Failed to count appointments")
    }

    /// Populate an empty store with a handful of appointments on `date`,
    /// spread across the given resources. Returns how many were written.
    pub fn seed_demo_day(&self, resources: &[String], date: NaiveDate, zone: &Tz) -> Result<usize> {
        if self.count()? > 0 {
            return Ok(0);
        }

        const SLOTS: [(u32, u32, u32, u32, &str, Option<&str>, &str); 6] = [
            (9, 0, 10, 0, "Cut & style", Some("Chair 1"), "#4A90D9"),
            (10, 30, 11, 15, "Beard trim", None, "#7CB342"),
            (13, 0, 14, 30, "Colour consultation", Some("Back room"), "#F4511E"),
            (8, 15, 8, 45, "Quick check-in", None, "#8E24AA"),
            (15, 0, 17, 0, "Bridal party", Some("Suite"), "#00897B"),
            (11, 0, 12, 0, "Kids cut", Some("Chair 3"), "#FDD835"),
        ];

        let mut written = 0;
        for (index, (sh, sm, eh, em, title, location, color)) in SLOTS.iter().enumerate() {
            let Some(resource) = resources.get(index % resources.len().max(1)) else {
                break;
            };
            let (Some(start), Some(end)) = (
                date.and_hms_opt(*sh, *sm, 0)
                    .and_then(|naive| zone.from_local_datetime(&naive).earliest()),
                date.and_hms_opt(*eh, *em, 0)
                    .and_then(|naive| zone.from_local_datetime(&naive).earliest()),
            ) else {
                continue;
            };

            self.create(&NewAppointment {
                title: title.to_string(),
                location: location.map(str::to_string),
                resource: Some(resource.clone()),
                start: start.with_timezone(&Utc),
                end: end.with_timezone(&Utc),
                color: Some(color.to_string()),
            })?;
            written += 1;
        }

        log::info!("Seeded {} demo appointments on {}", written, date);
        Ok(written)
    }
}

fn to_stored(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn to_zoned(value: String, zone: &Tz) -> Result<DateTime<Tz>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(zone))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn map_appointment_row(row: &Row<'_>, zone: &Tz) -> Result<Appointment, rusqlite::Error> {
    let start = to_zoned(row.get::<_, String>(4)?, zone)?;
    let end = to_zoned(row.get::<_, String>(5)?, zone)?;

    let mut appointment = Appointment::new(row.get(0)?, row.get::<_, String>(1)?, start, end)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(e.into()))?;
    appointment.location = row.get(2)?;
    appointment.resource = row.get(3)?;
    appointment.color = row.get(6)?;
    Ok(appointment)
}
