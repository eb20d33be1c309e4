// Settings module
// Immutable sizing/timing configuration for the grid and the host config file

use serde::{Deserialize, Serialize};

/// Sizing and timing constants for one grid instance.
///
/// All lengths are logical pixels, all durations milliseconds. The struct is
/// handed to the geometry engine and renderer at construction and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub row_height: f32,
    pub header_height: f32,
    pub hour_gutter_width: f32,
    pub hours_left_margin: f32,
    pub hours_right_margin: f32,
    pub hours_top_margin: f32,
    pub column_gap: f32,
    pub hour_gap: f32,
    pub min_appointment_height: f32,
    pub proximity_radius: f32,

    pub appointment_rect_top_margin: f32,
    pub appointment_rect_bottom_margin: f32,
    pub appointment_rect_left_margin: f32,
    pub appointment_rect_right_margin: f32,
    pub appointment_corner_radius: f32,
    pub text_horizontal_margin: f32,
    pub text_vertical_margin: f32,
    pub min_text_width: f32,
    pub max_text_len: usize,

    pub appointment_font_size: f32,
    pub header_font_size: f32,
    pub hour_font_size: f32,
    pub header_right_margin: f32,
    pub header_bottom_margin: f32,

    pub new_hint_margin: f32,
    pub new_hint_stroke: f32,
    pub new_hint_max_length: f32,
    pub current_time_side_buffer: f32,
    pub current_time_top_offset: f32,
    pub current_time_thickness: f32,
    pub glow_max_height: f32,

    pub click_display_ms: u64,
    pub tap_timeout_ms: u64,
    pub long_press_timeout_ms: u64,
    pub touch_slop: f32,
    pub min_fling_velocity: f32,
    pub max_fling_velocity: f32,
    /// Exponential decay rate of a fling, per second.
    pub fling_friction: f32,
    pub glow_fade_ms: u64,
    pub frame_interval_ms: u64,
    pub current_time_refresh_ms: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_height: 100.0,
            header_height: 45.0,
            hour_gutter_width: 40.0,
            hours_left_margin: 2.0,
            hours_right_margin: 4.0,
            hours_top_margin: 2.0,
            column_gap: 1.0,
            hour_gap: 1.0,
            min_appointment_height: 24.0,
            proximity_radius: 10.0,

            appointment_rect_top_margin: 1.0,
            appointment_rect_bottom_margin: 0.0,
            appointment_rect_left_margin: 1.0,
            appointment_rect_right_margin: 0.0,
            appointment_corner_radius: 5.0,
            text_horizontal_margin: 6.0,
            text_vertical_margin: 2.0,
            min_text_width: 20.0,
            max_text_len: 500,

            appointment_font_size: 12.0,
            header_font_size: 20.0,
            hour_font_size: 12.0,
            header_right_margin: 4.0,
            header_bottom_margin: 3.0,

            new_hint_margin: 4.0,
            new_hint_stroke: 2.0,
            new_hint_max_length: 16.0,
            current_time_side_buffer: 4.0,
            current_time_top_offset: 2.0,
            current_time_thickness: 2.0,
            glow_max_height: 24.0,

            click_display_ms: 50,
            tap_timeout_ms: 100,
            long_press_timeout_ms: 500,
            touch_slop: 8.0,
            min_fling_velocity: 50.0,
            max_fling_velocity: 8_000.0,
            fling_friction: 4.2,
            glow_fade_ms: 400,
            frame_interval_ms: 16,
            current_time_refresh_ms: 300_000,
        }
    }
}

impl GridConfig {
    /// Vertical distance between the tops of two consecutive hour rows.
    pub fn row_pitch(&self) -> f32 {
        self.row_height + self.hour_gap
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.row_height <= 0.0 {
            return Err("Row height must be positive".to_string());
        }
        if self.header_height < 0.0 || self.hour_gutter_width < 0.0 {
            return Err("Header height and hour gutter width cannot be negative".to_string());
        }
        if self.fling_friction <= 0.0 {
            return Err("Fling friction must be positive".to_string());
        }
        if self.min_fling_velocity > self.max_fling_velocity {
            return Err("Minimum fling velocity exceeds maximum".to_string());
        }
        Ok(())
    }
}

/// Host application configuration, read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub resources: Vec<String>,
    /// Number of columns visible without horizontal scrolling.
    pub shown_columns: usize,
    /// Resource selected when a day is first shown.
    pub login_resource: String,
    /// IANA zone name; the system zone is used when absent.
    pub timezone: Option<String>,
    /// SQLite store path; a per-user data directory is used when absent.
    pub database_path: Option<String>,
    pub seed_demo_data: bool,
    pub grid: GridConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            resources: [
                "Karos", "Colin", "Mechelle", "Tom", "Jay", "Will", "Benly", "Alisa", "Noah",
                "Jackie", "Rita",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            shown_columns: 4,
            login_resource: "Karos".to_string(),
            timezone: None,
            database_path: None,
            seed_demo_data: true,
            grid: GridConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.resources.is_empty() {
            return Err("At least one resource is required".to_string());
        }
        if self.shown_columns == 0 {
            return Err("Shown column count must be at least 1".to_string());
        }
        self.grid.validate()
    }
}
