// Property-based tests for grid geometry, picking and scroll clamping
// Checks the invariants with random appointments, points and drags

use appointment_grid::models::appointment::Appointment;
use appointment_grid::models::settings::GridConfig;
use appointment_grid::ui_egui::grid::geometry::{distance, rect_for, GridMetrics};
use appointment_grid::ui_egui::grid::picking::{cell_at, find_nearest, resolve_position};
use appointment_grid::ui_egui::grid::scroll::ScrollPhysics;
use chrono::{Duration, TimeZone};
use egui::{pos2, vec2, Pos2, Rect};
use proptest::prelude::*;

fn appointment_at(start_minute: u32, length: u32) -> Appointment {
    let zone = chrono_tz::UTC;
    let midnight = zone.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
    let start = midnight + Duration::minutes(start_minute as i64);
    let end = start + Duration::minutes(length as i64);
    Appointment::new(1, "Karos", start, end).unwrap()
}

fn laid_out(rect: Rect) -> Appointment {
    let mut appointment = appointment_at(0, 60);
    appointment.layout = rect;
    appointment
}

proptest! {
    /// Property: a same-day rect is ordered, at least the minimum height,
    /// and otherwise as tall as its minutes plus the hour lines it crosses.
    #[test]
    fn prop_rect_height_follows_duration(
        start_minute in 0u32..1380,
        length in 0u32..60,
    ) {
        let config = GridConfig::default();
        let appointment = appointment_at(start_minute, length);
        let day = appointment.start_day;
        let rect = rect_for(&config, day, 0.0, 0.0, 190.0, &appointment).unwrap();

        prop_assert!(rect.top() <= rect.bottom());
        prop_assert!(rect.height() >= config.min_appointment_height);

        let end_minute = start_minute + length;
        let mut end_hour = end_minute / 60;
        if end_hour * 60 == end_minute {
            end_hour = end_hour.saturating_sub(1);
        }
        let natural = length as f32 * config.row_height / 60.0
            + (end_hour as f32 - (start_minute / 60) as f32) * config.hour_gap
            - 1.0;
        let expected = natural.max(config.min_appointment_height);
        prop_assert!((rect.height() - expected).abs() < 0.01);
    }

    /// Property: appointments not touching the day are never placed.
    #[test]
    fn prop_other_days_have_no_rect(start_minute in 0u32..1380, offset in 1i32..30) {
        let config = GridConfig::default();
        let appointment = appointment_at(start_minute, 30);
        prop_assert!(rect_for(&config, appointment.start_day + offset, 0.0, 0.0, 190.0, &appointment).is_none());
        prop_assert!(rect_for(&config, appointment.start_day - offset, 0.0, 0.0, 190.0, &appointment).is_none());
    }

    /// Property: distance is zero inside and grows along any outward ray.
    #[test]
    fn prop_distance_monotonic(
        x in 0.0f32..100.0,
        y in 0.0f32..100.0,
        angle in 0.0f32..std::f32::consts::TAU,
        step in 0.5f32..50.0,
    ) {
        let appointment = laid_out(Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0)));
        let inside = pos2(x, y);
        prop_assert_eq!(distance(inside, &appointment), 0.0);

        let direction = vec2(angle.cos(), angle.sin());
        let mut previous = 0.0;
        for i in 1..20 {
            let point = inside + direction * step * i as f32;
            let current = distance(point, &appointment);
            prop_assert!(current + 1e-3 >= previous);
            previous = current;
        }
    }

    /// Property: equally close candidates resolve to the first in list order.
    #[test]
    fn prop_find_nearest_prefers_first(count in 2usize..8, x in 0.0f32..50.0, y in 0.0f32..50.0) {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(50.0, 50.0));
        let appointments: Vec<_> = (0..count).map(|_| laid_out(rect)).collect();
        let point = pos2(x, y);

        prop_assert_eq!(find_nearest(&appointments, point, 10.0), Some(0));
        prop_assert_eq!(
            find_nearest(&appointments, point, 10.0),
            find_nearest(&appointments, point, 10.0)
        );
    }

    /// Property: any pointer below the header resolves to a cell in range.
    #[test]
    fn prop_resolved_cells_in_range(
        px in -500.0f32..3000.0,
        py in 45.0f32..3000.0,
        sx in 0.0f32..400.0,
        sy in 0.0f32..2000.0,
        columns in 1usize..12,
    ) {
        let config = GridConfig::default();
        let metrics = GridMetrics::new(&config, vec2(800.0, 600.0), columns, 4, 40.0);
        let (column, hour) = resolve_position(&metrics, vec2(sx, sy), pos2(px, py)).unwrap();
        prop_assert!(column < columns);
        prop_assert!(hour < 24);

        let (column, hour) = cell_at(&metrics, Pos2::new(px, py));
        prop_assert!(column < columns);
        prop_assert!(hour < 24);
    }

    /// Property: the offset stays in bounds for drags of any size, flings
    /// included.
    #[test]
    fn prop_scroll_offset_clamped(
        drags in prop::collection::vec((-1.0e6f32..1.0e6, -1.0e6f32..1.0e6), 1..20),
        velocity in (-8000.0f32..8000.0, -8000.0f32..8000.0),
    ) {
        let config = GridConfig::default();
        let metrics = GridMetrics::new(&config, vec2(800.0, 600.0), 11, 4, 40.0);
        let max = metrics.max_scroll();
        let mut physics = ScrollPhysics::new(&config);
        physics.set_bounds(max, metrics.view_size);

        let in_bounds = |physics: &ScrollPhysics| {
            let offset = physics.offset();
            offset.x >= 0.0 && offset.x <= max.x && offset.y >= 0.0 && offset.y <= max.y
        };

        for (i, (dx, dy)) in drags.iter().enumerate() {
            physics.drag_horizontal(*dx, i as u64);
            physics.drag_vertical(*dy, i as u64);
            prop_assert!(in_bounds(&physics));
        }

        physics.fling(vec2(velocity.0, velocity.1), 100);
        for frame in 0..200u64 {
            physics.tick(100 + frame * 16);
            prop_assert!(in_bounds(&physics));
        }
    }
}
