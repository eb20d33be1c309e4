// Grid state service
// Host-side persistence of the selected instant across restarts

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{self, params, Connection};

const SELECTED_INSTANT_KEY: &str = "selected_instant";

pub struct GridStateService<'a> {
    conn: &'a Connection,
}

impl<'a> GridStateService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// The instant saved by the last [`save_selected_instant`](Self::save_selected_instant).
    /// A missing or unreadable value yields `None`.
    pub fn selected_instant(&self) -> Result<Option<DateTime<Utc>>> {
        let result = self.conn.query_row(
            "SELECT value FROM grid_state WHERE key = ?",
            [SELECTED_INSTANT_KEY],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => match DateTime::parse_from_rfc3339(&value) {
                Ok(instant) => Ok(Some(instant.with_timezone(&Utc))),
                Err(err) => {
                    log::warn!("Ignoring unreadable saved instant '{}': {}", value, err);
                    Ok(None)
                }
            },
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to read saved instant"),
        }
    }

    pub fn save_selected_instant(&self, instant: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO grid_state (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
                params![
                    SELECTED_INSTANT_KEY,
                    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
                ],
            )
            .context("Failed to save selected instant")?;
        Ok(())
    }
}
