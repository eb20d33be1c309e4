use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_appointments_table(conn)?;
    run_appointment_migrations(conn)?;
    create_grid_state_table(conn)?;
    Ok(())
}

fn create_appointments_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            location TEXT,
            start_datetime TEXT NOT NULL,
            end_datetime TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create appointments table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appointments_start ON appointments(start_datetime)",
        [],
    )
    .context("Failed to create appointments index")?;

    Ok(())
}

/// Stores created before resources were explicit only know the title.
fn run_appointment_migrations(conn: &Connection) -> Result<()> {
    migrations::ensure_column(
        conn,
        "appointments",
        "resource",
        "ALTER TABLE appointments ADD COLUMN resource TEXT",
    )?;

    migrations::ensure_column(
        conn,
        "appointments",
        "color",
        "ALTER TABLE appointments ADD COLUMN color TEXT",
    )?;

    Ok(())
}

fn create_grid_state_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS grid_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create grid_state table")?;

    Ok(())
}
